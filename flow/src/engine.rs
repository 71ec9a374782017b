//! FlowEngine - drives a [`Flow`] over a node's path.
//!
//! Each step's UI hands the engine an updated copy of the flow's value via
//! [`FlowEngine::next`]. Non-terminal steps navigate the owner node; terminal
//! steps unwind the owner back to where the flow started and fire exactly
//! one terminal callback.

use crate::state::{FlowState, FlowStatus, FlowStep};
use navstack_core::{Destination, LogCategory, LogLevel, ModalKind, NodeId};
use navstack_runtime::Navigator;
use thiserror::Error;

/// A multi-step sequence driven by a value the steps mutate.
pub trait Flow {
    type Value;
    type Destination: Destination;
    type Error;

    /// Decide what comes next for the current value.
    fn step(&mut self, value: &Self::Value) -> FlowStep<Self::Destination, Self::Error>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum FlowError {
    #[error("flow already started (status {0:?})")]
    AlreadyStarted(FlowStatus),
    #[error("flow is not running (status {0:?})")]
    NotRunning(FlowStatus),
    #[error("flow owner node is stale")]
    StaleOwner,
}

type CompleteFn<V> = Box<dyn FnOnce(&V) + Send>;
type CancelFn = Box<dyn FnOnce() + Send>;
type ErrorFn<E> = Box<dyn FnOnce(E) + Send>;

pub struct FlowEngine<F: Flow> {
    flow: F,
    value: F::Value,
    status: FlowStatus,
    state: Option<FlowState>,
    on_complete: Option<CompleteFn<F::Value>>,
    on_cancel: Option<CancelFn>,
    on_error: Option<ErrorFn<F::Error>>,
}

impl<F> std::fmt::Debug for FlowEngine<F>
where
    F: Flow,
    F::Value: std::fmt::Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlowEngine")
            .field("value", &self.value)
            .field("status", &self.status)
            .field("state", &self.state)
            .finish()
    }
}

impl<F: Flow> FlowEngine<F> {
    pub fn new(flow: F, initial: F::Value) -> Self {
        FlowEngine {
            flow,
            value: initial,
            status: FlowStatus::NotStarted,
            state: None,
            on_complete: None,
            on_cancel: None,
            on_error: None,
        }
    }

    pub fn on_complete(mut self, callback: impl FnOnce(&F::Value) + Send + 'static) -> Self {
        self.on_complete = Some(Box::new(callback));
        self
    }

    pub fn on_cancel(mut self, callback: impl FnOnce() + Send + 'static) -> Self {
        self.on_cancel = Some(Box::new(callback));
        self
    }

    pub fn on_error(mut self, callback: impl FnOnce(F::Error) + Send + 'static) -> Self {
        self.on_error = Some(Box::new(callback));
        self
    }

    pub fn status(&self) -> FlowStatus {
        self.status
    }

    pub fn state(&self) -> Option<FlowState> {
        self.state
    }

    pub fn value(&self) -> &F::Value {
        &self.value
    }

    /// Capture the owner's path length and open modals, then evaluate the
    /// first step.
    pub fn start(
        &mut self,
        nav: &mut Navigator<F::Destination>,
        owner: NodeId,
    ) -> Result<FlowStatus, FlowError> {
        if self.status != FlowStatus::NotStarted {
            return Err(FlowError::AlreadyStarted(self.status));
        }
        if !nav.tree().contains(owner) {
            return Err(FlowError::StaleOwner);
        }
        let start_index = nav.tree().path_len(owner);
        let showing =
            |kind: ModalKind| nav.tree().get(owner).is_some_and(|n| n.slot(kind).is_some());
        self.state = Some(FlowState {
            start_index,
            owner,
            sheet_was_open: showing(ModalKind::Sheet),
            cover_was_open: showing(ModalKind::Cover),
        });
        self.status = FlowStatus::Running;
        nav.tree().log(
            LogCategory::Navigation,
            LogLevel::Info,
            Some(owner),
            format!("flow started at {start_index}"),
        );
        Ok(self.evaluate(nav))
    }

    /// Replace the carried value and evaluate the next step.
    pub fn next(
        &mut self,
        nav: &mut Navigator<F::Destination>,
        value: F::Value,
    ) -> Result<FlowStatus, FlowError> {
        if !self.status.is_running() {
            return Err(FlowError::NotRunning(self.status));
        }
        self.value = value;
        Ok(self.evaluate(nav))
    }

    fn evaluate(&mut self, nav: &mut Navigator<F::Destination>) -> FlowStatus {
        let Some(state) = self.state else {
            return self.status;
        };
        match self.flow.step(&self.value) {
            FlowStep::Destination(destination) => {
                nav.navigate(state.owner, destination);
            }
            FlowStep::Complete => {
                self.finish(nav, state, FlowStatus::Complete);
                if let Some(callback) = self.on_complete.take() {
                    callback(&self.value);
                }
            }
            FlowStep::Cancel => {
                self.finish(nav, state, FlowStatus::Cancelled);
                if let Some(callback) = self.on_cancel.take() {
                    callback();
                }
            }
            FlowStep::Error(error) => {
                self.finish(nav, state, FlowStatus::Errored);
                if let Some(callback) = self.on_error.take() {
                    callback(error);
                }
            }
        }
        self.status
    }

    /// Pop back to the start index and dismiss the modals the flow opened.
    fn finish(
        &mut self,
        nav: &mut Navigator<F::Destination>,
        state: FlowState,
        status: FlowStatus,
    ) {
        self.status = status;
        let mut tree = nav.tree_mut();
        if tree.contains(state.owner) {
            for kind in [ModalKind::Sheet, ModalKind::Cover] {
                if !state.was_open(kind) {
                    tree.dismiss_modal(state.owner, kind);
                }
            }
            tree.pop_to(state.owner, state.start_index);
            tree.log(
                LogCategory::Navigation,
                LogLevel::Info,
                Some(state.owner),
                format!("flow {status:?}, unwound to {}", state.start_index),
            );
        } else {
            tree.log(
                LogCategory::Navigation,
                LogLevel::Warning,
                Some(state.owner),
                format!("flow {status:?} after its owner was despawned"),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use navstack_core::{NavigatorConfig, NullLogger, PresentationMethod};
    use parking_lot::Mutex;
    use std::sync::Arc;

    #[derive(Debug, Clone, PartialEq, Eq, Hash)]
    enum Step {
        Name,
        Email,
        Terms,
    }

    impl Destination for Step {
        fn method(&self) -> PresentationMethod {
            match self {
                Step::Terms => PresentationMethod::Sheet,
                _ => PresentationMethod::Push,
            }
        }
    }

    #[derive(Debug, Clone, Default, PartialEq)]
    struct Signup {
        name: Option<String>,
        email: Option<String>,
        accepted: Option<bool>,
    }

    struct SignupFlow;

    impl Flow for SignupFlow {
        type Value = Signup;
        type Destination = Step;
        type Error = String;

        fn step(&mut self, value: &Signup) -> FlowStep<Step, String> {
            match value {
                Signup { name: None, .. } => FlowStep::Destination(Step::Name),
                Signup { email: None, .. } => FlowStep::Destination(Step::Email),
                Signup { email: Some(e), .. } if !e.contains('@') => {
                    FlowStep::Error(format!("bad email {e}"))
                }
                Signup { accepted: None, .. } => FlowStep::Destination(Step::Terms),
                Signup { accepted: Some(true), .. } => FlowStep::Complete,
                Signup { accepted: Some(false), .. } => FlowStep::Cancel,
            }
        }
    }

    fn navigator() -> Navigator<Step> {
        Navigator::with_logger(NavigatorConfig::default(), Arc::new(NullLogger))
    }

    #[test]
    fn completes_and_unwinds_modals() {
        let mut nav = navigator();
        let root = nav.spawn_root(None);
        let done = Arc::new(Mutex::new(None));
        let sink = done.clone();
        let mut engine = FlowEngine::new(SignupFlow, Signup::default())
            .on_complete(move |v: &Signup| *sink.lock() = v.name.clone());

        assert_eq!(engine.start(&mut nav, root), Ok(FlowStatus::Running));
        let mut value = Signup {
            name: Some("ada".into()),
            ..Signup::default()
        };
        engine.next(&mut nav, value.clone()).unwrap();
        value.email = Some("ada@example.com".into());
        engine.next(&mut nav, value.clone()).unwrap();
        assert_eq!(nav.tree().get(root).unwrap().sheet, Some(Step::Terms));

        value.accepted = Some(true);
        assert_eq!(engine.next(&mut nav, value), Ok(FlowStatus::Complete));
        assert_eq!(nav.tree().path_len(root), 0);
        assert_eq!(nav.tree().get(root).unwrap().sheet, None);
        assert_eq!(done.lock().as_deref(), Some("ada"));
    }

    #[test]
    fn modals_open_before_the_flow_survive_it() {
        let mut nav = navigator();
        let root = nav.spawn_root(None);
        nav.tree_mut().push(root, Step::Name);
        nav.navigate(root, Step::Terms);
        let mut engine = FlowEngine::new(SignupFlow, Signup::default());

        engine.start(&mut nav, root).unwrap();
        engine
            .next(
                &mut nav,
                Signup {
                    name: Some("ada".into()),
                    ..Signup::default()
                },
            )
            .unwrap();
        assert_eq!(nav.tree().path_len(root), 3);

        let cancelled = Signup {
            name: Some("ada".into()),
            email: Some("ada@example.com".into()),
            accepted: Some(false),
        };
        assert_eq!(engine.next(&mut nav, cancelled), Ok(FlowStatus::Cancelled));
        assert_eq!(nav.tree().path(root).unwrap(), &[Step::Name]);
        assert_eq!(nav.tree().get(root).unwrap().sheet, Some(Step::Terms));
    }

    #[test]
    fn error_fires_only_error_callback() {
        let mut nav = navigator();
        let root = nav.spawn_root(None);
        let calls = Arc::new(Mutex::new(Vec::new()));
        let (c1, c2, c3) = (calls.clone(), calls.clone(), calls.clone());
        let mut engine = FlowEngine::new(SignupFlow, Signup::default())
            .on_complete(move |_| c1.lock().push("complete".to_string()))
            .on_cancel(move || c2.lock().push("cancel".to_string()))
            .on_error(move |e| c3.lock().push(e));
        engine.start(&mut nav, root).unwrap();
        let value = Signup {
            name: Some("bob".into()),
            email: Some("nope".into()),
            accepted: None,
        };
        assert_eq!(engine.next(&mut nav, value), Ok(FlowStatus::Errored));
        assert_eq!(*calls.lock(), vec!["bad email nope".to_string()]);
    }

    #[test]
    fn lifecycle_guards() {
        let mut nav = navigator();
        let root = nav.spawn_root(None);
        let mut engine = FlowEngine::new(SignupFlow, Signup::default());
        assert_eq!(
            engine.next(&mut nav, Signup::default()),
            Err(FlowError::NotRunning(FlowStatus::NotStarted))
        );
        engine.start(&mut nav, root).unwrap();
        assert_eq!(
            engine.start(&mut nav, root),
            Err(FlowError::AlreadyStarted(FlowStatus::Running))
        );
    }

    #[test]
    fn stale_owner_cannot_start() {
        let mut nav = navigator();
        let root = nav.spawn_root(None);
        nav.despawn(root);
        let mut engine = FlowEngine::new(SignupFlow, Signup::default());
        assert_eq!(engine.start(&mut nav, root), Err(FlowError::StaleOwner));
        assert_eq!(engine.status(), FlowStatus::NotStarted);
    }
}
