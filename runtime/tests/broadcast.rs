use navstack_core::{Destination, NavigatorConfig, NodeId, NullLogger, PresentationMethod};
use navstack_runtime::{Navigator, Payload, ResumeDirective};
use parking_lot::Mutex;
use proptest::prelude::*;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// What receivers saw, in delivery order.
#[derive(Clone, Default)]
struct Log(Arc<Mutex<Vec<String>>>);

impl Log {
    fn push(&self, entry: impl Into<String>) {
        self.0.lock().push(entry.into());
    }

    fn entries(&self) -> Vec<String> {
        self.0.lock().clone()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum Screen {
    Home,
    Login,
    Account,
    Orders,
}

impl Destination for Screen {
    fn method(&self) -> PresentationMethod {
        match self {
            Screen::Login => PresentationMethod::Sheet,
            _ => PresentationMethod::Push,
        }
    }
}

fn navigator() -> Navigator<Screen> {
    Navigator::with_logger(NavigatorConfig::default(), Arc::new(NullLogger))
}

fn letters(values: &[&'static str]) -> Vec<Payload> {
    values.iter().map(|v| Payload::new(v.to_string())).collect()
}

/// Subscribe a recorder answering with `directive(value)`.
fn record_strings<F>(nav: &mut Navigator<Screen>, node: NodeId, log: &Log, directive: F)
where
    F: Fn(&str) -> ResumeDirective + Send + 'static,
{
    let log = log.clone();
    nav.on_receive::<String, _>(node, move |value, _| {
        log.push(value.clone());
        directive(value)
    });
}

#[test]
fn first_value_is_delivered_synchronously_and_tail_waits() {
    let mut nav = navigator();
    let root = nav.spawn_root(None);
    let log = Log::default();
    record_strings(&mut nav, root, &log, |_| ResumeDirective::Pause);

    nav.send_all(root, letters(&["A", "B", "C"]));
    assert_eq!(log.entries(), vec!["A"]);
    assert_eq!(nav.channel(root).unwrap().pending_len(), 2);

    assert!(nav.resume(root, ResumeDirective::Immediately));
    assert_eq!(log.entries(), vec!["A", "B"]);
    assert_eq!(nav.channel(root).unwrap().pending_len(), 1);
}

#[test]
fn immediately_delivers_next_before_anything_queued_later() {
    let mut nav = navigator();
    let root = nav.spawn_root(None);
    let log = Log::default();
    record_strings(&mut nav, root, &log, |v| match v {
        "A" | "B" => ResumeDirective::Immediately,
        _ => ResumeDirective::Pause,
    });

    nav.send_all(root, letters(&["A", "B", "C"]));
    log.push("later");
    assert_eq!(log.entries(), vec!["A", "B", "C", "later"]);
    assert!(!nav.channel(root).unwrap().has_pending());
}

#[test]
fn cancel_discards_the_tail_until_a_new_send() {
    let mut nav = navigator();
    let root = nav.spawn_root(None);
    let log = Log::default();
    record_strings(&mut nav, root, &log, |v| match v {
        "A" => ResumeDirective::Cancel,
        _ => ResumeDirective::Pause,
    });

    nav.send_all(root, letters(&["A", "B"]));
    assert!(!nav.resume(root, ResumeDirective::Immediately));
    assert_eq!(log.entries(), vec!["A"]);

    nav.send_all(root, letters(&["C"]));
    assert_eq!(log.entries(), vec!["A", "C"]);
}

#[test]
fn single_send_replaces_pending_sequence() {
    let mut nav = navigator();
    let root = nav.spawn_root(None);
    let log = Log::default();
    record_strings(&mut nav, root, &log, |_| ResumeDirective::Pause);

    nav.send_all(root, letters(&["A", "B", "C"]));
    nav.send(root, "X".to_string());
    assert_eq!(nav.channel(root).unwrap().pending_len(), 0);
    assert!(!nav.resume(root, ResumeDirective::Immediately));
    assert_eq!(log.entries(), vec!["A", "X"]);
}

#[test]
fn cancel_wins_over_other_receivers() {
    let mut nav = navigator();
    let root = nav.spawn_root(None);
    let child = nav.spawn_child(root, None, None).unwrap();
    let log = Log::default();
    record_strings(&mut nav, root, &log, |_| ResumeDirective::Immediately);
    record_strings(&mut nav, child, &log, |_| ResumeDirective::Cancel);

    nav.send_all(root, letters(&["A", "B"]));
    assert_eq!(log.entries(), vec!["A", "A"]);
    assert!(!nav.channel(root).unwrap().has_pending());
}

#[test]
fn unreceived_values_stay_pending() {
    let mut nav = navigator();
    let root = nav.spawn_root(None);
    assert!(!nav.send_all(root, letters(&["A", "B"])));
    assert_eq!(nav.channel(root).unwrap().pending_len(), 1);
    nav.cancel(root);
    assert!(!nav.cancel(root));
}

#[test]
fn gate_injects_steps_with_resume_with() {
    let mut nav = navigator();
    let root = nav.spawn_root(None);
    let signed_in = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let gate = signed_in.clone();
    nav.on_receive::<Screen, _>(root, move |screen, cx| {
        let node = cx.node();
        if *screen == Screen::Account && !gate.load(std::sync::atomic::Ordering::SeqCst) {
            return ResumeDirective::Pause;
        }
        cx.tree_mut().navigate(node, screen.clone(), screen.method());
        ResumeDirective::Immediately
    });

    nav.send_all(root, [Payload::new(Screen::Account), Payload::new(Screen::Orders)]);
    assert_eq!(nav.tree().path_len(root), 0);

    let mut steps: Vec<Payload> = vec![Screen::Login.into()];
    steps.extend(nav.pending(root));
    signed_in.store(true, std::sync::atomic::Ordering::SeqCst);
    assert!(nav.resume_with(root, steps, ResumeDirective::Immediately));

    assert_eq!(nav.tree().get(root).unwrap().sheet, Some(Screen::Login));
    assert_eq!(nav.tree().path(root).unwrap(), &[Screen::Orders]);
}

#[tokio::test(start_paused = true)]
async fn auto_resumes_after_configured_delay() {
    let mut nav = navigator();
    let root = nav.spawn_root(None);
    nav.auto_receive(root);
    let start = Instant::now();

    nav.send_all(
        root,
        [
            Payload::new(Screen::Home),
            Payload::new(Screen::Account),
            Payload::new(Screen::Orders),
        ],
    );
    assert_eq!(nav.tree().path_len(root), 1);
    assert_eq!(
        nav.next_deadline(),
        Some(start + nav.config().auto_resume_delay)
    );

    nav.run_pending().await;
    assert_eq!(
        nav.tree().path(root).unwrap(),
        &[Screen::Home, Screen::Account, Screen::Orders]
    );
    assert!(Instant::now() - start >= nav.config().auto_resume_delay * 2);
    assert_eq!(nav.next_deadline(), None);
}

#[tokio::test(start_paused = true)]
async fn explicit_delay_is_honoured() {
    let mut nav = navigator();
    let root = nav.spawn_root(None);
    let log = Log::default();
    record_strings(&mut nav, root, &log, |_| {
        ResumeDirective::After(Duration::from_millis(100))
    });
    let start = Instant::now();
    nav.send_all(root, letters(&["A", "B"]));

    assert_eq!(nav.tick(start + Duration::from_millis(99)), 0);
    assert_eq!(log.entries(), vec!["A"]);
    tokio::time::advance(Duration::from_millis(100)).await;
    assert_eq!(nav.tick(Instant::now()), 1);
    assert_eq!(log.entries(), vec!["A", "B"]);
}

#[tokio::test(start_paused = true)]
async fn replaced_queue_invalidates_scheduled_resume() {
    let mut nav = navigator();
    let root = nav.spawn_root(None);
    let log = Log::default();
    record_strings(&mut nav, root, &log, |v| match v {
        "A" => ResumeDirective::Auto,
        _ => ResumeDirective::Pause,
    });

    nav.send_all(root, letters(&["A", "B"]));
    nav.send_all(root, letters(&["X", "Y"]));
    tokio::time::advance(Duration::from_secs(1)).await;

    assert_eq!(nav.tick(Instant::now()), 0);
    assert_eq!(log.entries(), vec!["A", "X"]);
    assert_eq!(nav.channel(root).unwrap().pending_len(), 1);
}

#[tokio::test(start_paused = true)]
async fn manual_resume_supersedes_scheduled_one() {
    let mut nav = navigator();
    let root = nav.spawn_root(None);
    let log = Log::default();
    record_strings(&mut nav, root, &log, |v| match v {
        "A" => ResumeDirective::Auto,
        _ => ResumeDirective::Pause,
    });

    nav.send_all(root, letters(&["A", "B", "C"]));
    assert!(nav.resume(root, ResumeDirective::Immediately));
    nav.run_pending().await;

    assert_eq!(log.entries(), vec!["A", "B"]);
    assert_eq!(nav.channel(root).unwrap().pending_len(), 1);
}

proptest! {
    #[test]
    fn immediate_receivers_see_every_value_once_in_order(
        values in proptest::collection::vec(any::<u16>(), 1..24),
    ) {
        let mut nav = navigator();
        let root = nav.spawn_root(None);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        nav.on_receive::<u16, _>(root, move |v, _| {
            sink.lock().push(*v);
            ResumeDirective::Immediately
        });
        nav.send_all(root, values.iter().copied().map(Payload::new));
        prop_assert_eq!(seen.lock().clone(), values);
    }
}
