use anyhow::Result;
use navstack::prelude::*;
use navstack::core::LogLevel;
use navstack::telemetry::init_stdout_tracing;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

// --- Destinations ---
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
enum Route {
    Catalog,
    Product(u32),
    Login,
    Review,
    Payment,
}

impl Destination for Route {
    fn method(&self) -> PresentationMethod {
        match self {
            Route::Login => PresentationMethod::Sheet,
            _ => PresentationMethod::Push,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Rating(u8);

// --- Deep links ---
fn product_links(uri: &str) -> Option<Vec<Payload>> {
    let id: u32 = uri.strip_prefix("shop://product/")?.parse().ok()?;
    Some(vec![Payload::new(Route::Catalog), Payload::new(Route::Product(id))])
}

// --- Checkout flow ---
#[derive(Debug, Clone, Copy, PartialEq)]
enum Checkout {
    Reviewing,
    Paying,
    Done,
}

struct CheckoutFlow;

impl Flow for CheckoutFlow {
    type Value = Checkout;
    type Destination = Route;
    type Error = String;

    fn step(&mut self, value: &Checkout) -> FlowStep<Route, String> {
        match value {
            Checkout::Reviewing => FlowStep::Destination(Route::Review),
            Checkout::Paying => FlowStep::Destination(Route::Payment),
            Checkout::Done => FlowStep::Complete,
        }
    }
}

fn print_path(label: &str, nav: &Navigator<Route>, node: NodeId) {
    println!("[{label}] path = {:?}", nav.tree().path(node).unwrap_or_default());
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = NavigatorConfig::from_env()?.with_restoration_key("deep-link-demo");
    init_stdout_tracing(config.log_level);

    let mut nav: Navigator<Route> = Navigator::new(config.clone());
    let root = nav.spawn_root(Some("shop"));

    // Products require a signed-in user; the gate parks the route until then.
    let signed_in = Arc::new(AtomicBool::new(false));
    let held: Arc<Mutex<Vec<Payload>>> = Arc::default();
    let (gate, parked) = (signed_in.clone(), held.clone());
    nav.on_receive::<Route, _>(root, move |route, cx| {
        let node = cx.node();
        if matches!(route, Route::Product(_)) && !gate.load(Ordering::SeqCst) {
            println!("[gate] {route:?} needs a login");
            parked.lock().push(Payload::new(route.clone()));
            return ResumeDirective::Pause;
        }
        cx.tree_mut().navigate(node, route.clone(), route.method());
        ResumeDirective::Auto
    });

    println!("\n--- Deep link ---");
    nav.open_url(root, "shop://product/42", &[&product_links]);
    nav.run_pending().await;
    print_path("deep link", &nav, root);

    let mut steps = vec![Payload::new(Route::Login)];
    steps.append(&mut held.lock());
    steps.extend(nav.pending(root));
    signed_in.store(true, Ordering::SeqCst);
    nav.resume_with(root, steps, ResumeDirective::Immediately);
    nav.run_pending().await;
    nav.tree_mut().dismiss_presented_views(root);
    print_path("after login", &nav, root);

    println!("\n--- Checkpoint with value ---");
    nav.add_checkpoint_with_value::<Rating, _>(root, "product", |rating| {
        println!("[checkpoint] received {rating:?}");
    });
    nav.tree_mut().push(root, Route::Review);
    print_path("reviewing", &nav, root);
    nav.return_to_checkpoint_with_value(root, "product", Rating(5));
    print_path("returned", &nav, root);

    println!("\n--- Checkout flow ---");
    let mut checkout = FlowEngine::new(CheckoutFlow, Checkout::Reviewing)
        .on_complete(|value| println!("[flow] complete with {value:?}"));
    checkout.start(&mut nav, root)?;
    checkout.next(&mut nav, Checkout::Paying)?;
    print_path("checkout", &nav, root);
    checkout.next(&mut nav, Checkout::Done)?;
    print_path("after checkout", &nav, root);

    println!("\n--- Persistence ---");
    let store = MemorySnapshotStore::new();
    nav.persist(&store, root).await?;
    let mut restarted: Navigator<Route> = Navigator::new(config.with_log_level(LogLevel::Warning));
    let restored = restarted.spawn_root(Some("shop"));
    restarted.restore(&store, restored).await?;
    print_path("restored", &restarted, restored);

    Ok(())
}
