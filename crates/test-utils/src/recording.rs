#![allow(dead_code)]

use std::sync::{Condvar, Mutex};
use std::time::{Duration, Instant};

use mediaflow::engine::WorkflowListener;
use mediaflow::model::{WorkflowInstance, WorkflowState};
use mediaflow::types::WorkflowId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notified {
    State,
    Operation,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListenerEvent {
    pub kind: Notified,
    pub workflow: WorkflowId,
    pub state: WorkflowState,
    pub position: Option<usize>,
}

/// Listener that records every callback and lets tests wait for them.
#[derive(Debug, Default)]
pub struct RecordingListener {
    events: Mutex<Vec<ListenerEvent>>,
    changed: Condvar,
}

impl RecordingListener {
    pub fn new() -> Self {
        Self::default()
    }

    fn record(&self, kind: Notified, workflow: &WorkflowInstance) {
        self.events.lock().unwrap().push(ListenerEvent {
            kind,
            workflow: workflow.id,
            state: workflow.state,
            position: workflow.current,
        });
        self.changed.notify_all();
    }

    pub fn events(&self) -> Vec<ListenerEvent> {
        self.events.lock().unwrap().clone()
    }

    /// Block until `pred` holds for the recorded events or 5 seconds pass.
    pub fn wait_until<F>(&self, pred: F) -> Vec<ListenerEvent>
    where
        F: Fn(&[ListenerEvent]) -> bool,
    {
        let deadline = Instant::now() + Duration::from_secs(5);
        let mut events = self.events.lock().unwrap();
        while !pred(&events) {
            let now = Instant::now();
            if now >= deadline {
                panic!("listener condition not met; recorded: {:?}", *events);
            }
            events = self.changed.wait_timeout(events, deadline - now).unwrap().0;
        }
        events.clone()
    }

    /// States reported through `on_state_changed`, in order.
    pub fn states(&self) -> Vec<WorkflowState> {
        self.events()
            .into_iter()
            .filter(|e| e.kind == Notified::State)
            .map(|e| e.state)
            .collect()
    }
}

impl WorkflowListener for RecordingListener {
    fn on_state_changed(&self, workflow: &WorkflowInstance) {
        self.record(Notified::State, workflow);
    }

    fn on_operation_changed(&self, workflow: &WorkflowInstance) {
        self.record(Notified::Operation, workflow);
    }
}
