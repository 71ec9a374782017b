use navstack::prelude::*;
use navstack::core::NullLogger;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
enum Route {
    Home,
    Page(u32),
    Settings,
    Banner(String),
}

impl Destination for Route {
    fn method(&self) -> PresentationMethod {
        match self {
            Route::Settings => PresentationMethod::Cover,
            Route::Banner(_) => PresentationMethod::BroadcastOnly,
            _ => PresentationMethod::Push,
        }
    }
}

fn navigator(config: NavigatorConfig) -> Navigator<Route> {
    Navigator::with_logger(config, Arc::new(NullLogger))
}

#[test]
fn home_checkpoint_pops_back_to_empty() {
    let mut nav = navigator(NavigatorConfig::default());
    let root = nav.spawn_root(Some("main"));
    nav.tree_mut().add_checkpoint(root, "home");
    nav.navigate(root, Route::Page(2));

    assert!(nav.tree_mut().return_to_checkpoint(root, "home"));
    assert_eq!(nav.tree().path_len(root), 0);
}

#[test]
fn locked_tree_refuses_dismiss_all() {
    let mut nav = navigator(NavigatorConfig::default());
    let root = nav.spawn_root(None);
    nav.navigate(root, Route::Settings);
    let cover = nav.spawn_child(root, None, Some(ModalKind::Cover)).unwrap();
    nav.tree_mut().add_lock(cover, "payment");

    assert_eq!(
        nav.tree_mut().dismiss_all(cover),
        Err(NavigationError::NavigationLocked)
    );
    nav.tree_mut().remove_lock(cover, "payment");
    assert_eq!(nav.tree_mut().dismiss_all(cover), Ok(true));
    assert!(!nav.tree().is_presented(cover));
    assert_eq!(nav.tree().get(root).unwrap().cover, None);
}

#[tokio::test(start_paused = true)]
async fn deep_link_plays_then_state_survives_restart() {
    let store = MemorySnapshotStore::new();
    let config = NavigatorConfig::default().with_restoration_key("build-42");

    let mut first = navigator(config.clone());
    let root = first.spawn_root(Some("main"));
    first.auto_receive(root);
    let link = |uri: &str| -> Option<Vec<Payload>> {
        let id: u32 = uri.strip_prefix("app://page/")?.parse().ok()?;
        Some(vec![Payload::new(Route::Home), Payload::new(Route::Page(id))])
    };
    assert!(first.open_url(root, "app://page/5", &[&link]));
    first.run_pending().await;
    assert_eq!(
        first.tree().path(root).unwrap(),
        &[Route::Home, Route::Page(5)]
    );
    assert!(first.persist(&store, root).await.unwrap());

    let mut second = navigator(config);
    let restored = second.spawn_root(Some("main"));
    assert!(second.restore(&store, restored).await.unwrap());
    assert_eq!(
        second.tree().path(restored).unwrap(),
        &[Route::Home, Route::Page(5)]
    );
}

#[test]
fn banners_never_enter_the_path() {
    let mut nav = navigator(NavigatorConfig::default());
    let root = nav.spawn_root(None);
    let seen = Arc::new(std::sync::atomic::AtomicUsize::new(0));
    let counter = seen.clone();
    nav.on_receive::<Route, _>(root, move |route, _| {
        if matches!(route, Route::Banner(_)) {
            counter.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        }
        ResumeDirective::Pause
    });
    nav.navigate(root, Route::Banner("saved".into()));
    assert_eq!(nav.tree().path_len(root), 0);
    assert_eq!(seen.load(std::sync::atomic::Ordering::SeqCst), 1);
}
