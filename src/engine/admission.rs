// src/engine/admission.rs

use tracing::{debug, warn};

use crate::dispatch::{Job, JobOperation, JobStatus, JOB_TYPE};
use crate::engine::WorkflowService;

impl WorkflowService {
    /// Whether `job` may be started now.
    ///
    /// Only `START_WORKFLOW` jobs are limited: once the number of running
    /// workflow jobs reaches the cap, new workflows are refused and expected
    /// to be offered again later. The count is advisory and not atomic with
    /// the claim that follows. Lookup errors admit the job.
    pub fn is_ready_to_accept(&self, job: &Job) -> bool {
        if job.operation != JobOperation::StartWorkflow {
            return true;
        }

        let cap = match self.options.max_concurrent_workflows {
            Some(cap) => cap,
            None => match self.dispatcher.max_load() {
                Ok(load) => load,
                Err(err) => {
                    warn!(error = %err, "cannot determine max load; accepting job");
                    return true;
                }
            },
        };

        match self
            .dispatcher
            .count(JOB_TYPE, Some(JobOperation::StartWorkflow), JobStatus::Running)
        {
            Ok(running) if running >= cap => {
                debug!(job = job.id, running, cap, "refusing new workflow");
                false
            }
            Ok(_) => true,
            Err(err) => {
                warn!(error = %err, "cannot count running workflows; accepting job");
                true
            }
        }
    }
}
