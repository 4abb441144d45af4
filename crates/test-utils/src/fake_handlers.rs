#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use mediaflow::errors::OperationError;
use mediaflow::handler::{HandlerCapabilities, HandlerResult, OperationHandler};
use mediaflow::model::{MediaPackage, OperationResult, WorkflowInstance};
use mediaflow::types::{Properties, WorkflowId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallKind {
    Start,
    Resume,
    Destroy,
}

/// One handler invocation as seen by the handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub handler: String,
    pub kind: CallKind,
    pub workflow: WorkflowId,
    pub position: Option<usize>,
    pub properties: Properties,
}

/// Ordered record of handler calls, shared between handlers.
#[derive(Debug, Clone, Default)]
pub struct CallLog {
    calls: Arc<Mutex<Vec<Call>>>,
}

impl CallLog {
    pub fn new() -> Self {
        Self::default()
    }

    fn record(
        &self,
        handler: &str,
        kind: CallKind,
        workflow: &WorkflowInstance,
        properties: &Properties,
    ) {
        self.calls.lock().unwrap().push(Call {
            handler: handler.to_string(),
            kind,
            workflow: workflow.id,
            position: workflow.current,
            properties: properties.clone(),
        });
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    /// Handler ids of every call of `kind`, in call order.
    pub fn handlers(&self, kind: CallKind) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|c| c.kind == kind)
            .map(|c| c.handler)
            .collect()
    }

    pub fn count(&self, handler: &str, kind: CallKind) -> usize {
        self.calls()
            .iter()
            .filter(|c| c.handler == handler && c.kind == kind)
            .count()
    }
}

/// What a scripted handler does on its next call.
#[derive(Debug, Clone)]
pub enum Step {
    Continue,
    /// Return no result at all.
    Nothing,
    ContinueWith(Properties),
    ReplaceMediaPackage(MediaPackage),
    Pause,
    Skip,
    Fail(String),
}

impl Step {
    fn outcome(self) -> HandlerResult {
        match self {
            Step::Continue => Ok(Some(OperationResult::proceed())),
            Step::Nothing => Ok(None),
            Step::ContinueWith(properties) => {
                Ok(Some(OperationResult::proceed().with_properties(properties)))
            }
            Step::ReplaceMediaPackage(mp) => {
                Ok(Some(OperationResult::proceed().with_media_package(mp)))
            }
            Step::Pause => Ok(Some(OperationResult::pause())),
            Step::Skip => Ok(Some(OperationResult::skip())),
            Step::Fail(message) => Err(OperationError::new(message)),
        }
    }
}

/// Handler that replays a script of steps, one per start/resume call, and
/// falls back to a fixed step once the script is used up.
pub struct ScriptedHandler {
    id: String,
    capabilities: HandlerCapabilities,
    steps: Mutex<VecDeque<Step>>,
    fallback: Step,
    hold_ui: Option<String>,
    hold_ui_error: Option<String>,
    destroy_error: Option<String>,
    log: CallLog,
}

impl ScriptedHandler {
    pub fn new(id: &str, log: &CallLog) -> Self {
        Self {
            id: id.to_string(),
            capabilities: HandlerCapabilities::NONE,
            steps: Mutex::new(VecDeque::new()),
            fallback: Step::Continue,
            hold_ui: None,
            hold_ui_error: None,
            destroy_error: None,
            log: log.clone(),
        }
    }

    pub fn resumable(mut self) -> Self {
        self.capabilities = HandlerCapabilities::RESUMABLE;
        self
    }

    pub fn hold(mut self, ui: &str) -> Self {
        self.capabilities = HandlerCapabilities::HOLD;
        self.hold_ui = Some(ui.to_string());
        self
    }

    /// Fail every lookup of the hold state UI.
    pub fn hold_ui_fails(mut self, message: &str) -> Self {
        self.hold_ui_error = Some(message.to_string());
        self
    }

    /// Fail every cleanup call. The call is still recorded.
    pub fn destroy_fails(mut self, message: &str) -> Self {
        self.destroy_error = Some(message.to_string());
        self
    }

    pub fn then(self, step: Step) -> Self {
        self.steps.lock().unwrap().push_back(step);
        self
    }

    pub fn otherwise(mut self, step: Step) -> Self {
        self.fallback = step;
        self
    }

    fn next_step(&self) -> Step {
        self.steps
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone())
    }
}

impl OperationHandler for ScriptedHandler {
    fn id(&self) -> &str {
        &self.id
    }

    fn description(&self) -> &str {
        "scripted test handler"
    }

    fn capabilities(&self) -> HandlerCapabilities {
        self.capabilities
    }

    fn start(&self, workflow: &WorkflowInstance) -> HandlerResult {
        self.log
            .record(&self.id, CallKind::Start, workflow, &Properties::new());
        self.next_step().outcome()
    }

    fn resume(&self, workflow: &WorkflowInstance, properties: &Properties) -> HandlerResult {
        self.log.record(&self.id, CallKind::Resume, workflow, properties);
        self.next_step().outcome()
    }

    fn destroy(&self, workflow: &WorkflowInstance) -> Result<(), OperationError> {
        self.log
            .record(&self.id, CallKind::Destroy, workflow, &Properties::new());
        match &self.destroy_error {
            Some(message) => Err(OperationError::new(message.clone())),
            None => Ok(()),
        }
    }

    fn hold_state_ui(
        &self,
        _workflow: &WorkflowInstance,
    ) -> Result<Option<String>, OperationError> {
        match &self.hold_ui_error {
            Some(message) => Err(OperationError::new(message.clone())),
            None => Ok(self.hold_ui.clone()),
        }
    }

    fn hold_action_title(&self) -> Option<String> {
        self.hold_ui.as_ref().map(|_| "Approve".to_string())
    }
}

/// Handler whose `start` blocks until the test releases it.
pub struct GatedHandler {
    id: String,
    failure: Option<String>,
    pause: bool,
    entered_tx: mpsc::Sender<WorkflowId>,
    release_rx: Mutex<mpsc::Receiver<()>>,
    log: CallLog,
}

/// Test side of a [`GatedHandler`].
pub struct Gate {
    entered_rx: mpsc::Receiver<WorkflowId>,
    release_tx: mpsc::Sender<()>,
}

impl Gate {
    /// Wait until a workflow entered the handler.
    pub fn wait_entered(&self) -> WorkflowId {
        self.entered_rx
            .recv_timeout(Duration::from_secs(5))
            .expect("gated handler was never entered")
    }

    pub fn release(&self) {
        self.release_tx.send(()).expect("gated handler dropped");
    }
}

pub fn gated(id: &str, log: &CallLog) -> (GatedHandler, Gate) {
    let (entered_tx, entered_rx) = mpsc::channel();
    let (release_tx, release_rx) = mpsc::channel();
    (
        GatedHandler {
            id: id.to_string(),
            failure: None,
            pause: false,
            entered_tx,
            release_rx: Mutex::new(release_rx),
            log: log.clone(),
        },
        Gate {
            entered_rx,
            release_tx,
        },
    )
}

impl GatedHandler {
    /// Fail with `message` once released instead of continuing.
    pub fn failing(mut self, message: &str) -> Self {
        self.failure = Some(message.to_string());
        self
    }

    /// Pause once released instead of continuing. Makes the handler
    /// resumable.
    pub fn pausing(mut self) -> Self {
        self.pause = true;
        self
    }
}

impl OperationHandler for GatedHandler {
    fn id(&self) -> &str {
        &self.id
    }

    fn capabilities(&self) -> HandlerCapabilities {
        if self.pause {
            HandlerCapabilities::RESUMABLE
        } else {
            HandlerCapabilities::NONE
        }
    }

    fn resume(&self, workflow: &WorkflowInstance, properties: &Properties) -> HandlerResult {
        self.log.record(&self.id, CallKind::Resume, workflow, properties);
        Ok(Some(OperationResult::proceed()))
    }

    fn start(&self, workflow: &WorkflowInstance) -> HandlerResult {
        self.log
            .record(&self.id, CallKind::Start, workflow, &Properties::new());
        let _ = self.entered_tx.send(workflow.id);

        let release = self.release_rx.lock().unwrap();
        if release.recv_timeout(Duration::from_secs(5)).is_err() {
            return Err(OperationError::new("gate was never released"));
        }
        match &self.failure {
            Some(message) => Err(OperationError::new(message.clone())),
            None if self.pause => Ok(Some(OperationResult::pause())),
            None => Ok(Some(OperationResult::proceed())),
        }
    }
}
