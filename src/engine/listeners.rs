// src/engine/listeners.rs

//! Fire-and-forget change notifications.
//!
//! Every listener gets its own unbounded channel drained by a dedicated
//! thread, so a slow listener delays only itself and never the state
//! machine. Panics inside a callback are logged and the listener keeps
//! receiving.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::errors::Result;
use crate::model::WorkflowInstance;

pub trait WorkflowListener: Send + Sync {
    /// The workflow moved to a different state.
    fn on_state_changed(&self, workflow: &WorkflowInstance) {
        let _ = workflow;
    }

    /// The state is unchanged but the current operation changed.
    fn on_operation_changed(&self, workflow: &WorkflowInstance) {
        let _ = workflow;
    }
}

#[derive(Debug, Clone)]
enum Notification {
    StateChanged(WorkflowInstance),
    OperationChanged(WorkflowInstance),
}

#[derive(Debug, Default)]
pub struct ListenerFanout {
    senders: Mutex<Vec<mpsc::UnboundedSender<Notification>>>,
}

impl ListenerFanout {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, listener: Arc<dyn WorkflowListener>) -> Result<()> {
        let (tx, mut rx) = mpsc::unbounded_channel::<Notification>();

        std::thread::Builder::new()
            .name("workflow-listener".to_string())
            .spawn(move || {
                while let Some(notification) = rx.blocking_recv() {
                    deliver(listener.as_ref(), notification);
                }
                debug!("listener channel closed");
            })?;

        self.senders
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(tx);
        Ok(())
    }

    /// Notify every listener about the transition from `previous` to
    /// `current`. At most one callback per listener and call.
    pub fn notify(&self, previous: Option<&WorkflowInstance>, current: &WorkflowInstance) {
        let notification = match previous {
            None => Notification::StateChanged(current.clone()),
            Some(prev) if prev.state != current.state => {
                Notification::StateChanged(current.clone())
            }
            Some(prev) if prev.current_operation() != current.current_operation() => {
                Notification::OperationChanged(current.clone())
            }
            Some(_) => return,
        };

        let mut senders = self.senders.lock().unwrap_or_else(PoisonError::into_inner);
        senders.retain(|tx| tx.send(notification.clone()).is_ok());
    }
}

fn deliver(listener: &dyn WorkflowListener, notification: Notification) {
    let outcome = catch_unwind(AssertUnwindSafe(|| match &notification {
        Notification::StateChanged(workflow) => listener.on_state_changed(workflow),
        Notification::OperationChanged(workflow) => listener.on_operation_changed(workflow),
    }));
    if outcome.is_err() {
        warn!("workflow listener panicked; notification dropped");
    }
}
