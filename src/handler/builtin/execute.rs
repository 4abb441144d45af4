// src/handler/builtin/execute.rs

use std::collections::BTreeMap;
use std::process::{Command, Stdio};

use anyhow::{bail, Context};
use tracing::{debug, info, warn};

use crate::handler::{HandlerResult, OperationHandler};
use crate::model::{OperationResult, WorkflowInstance};

/// Runs a shell command.
///
/// Configuration:
/// - `command` (required): run through `sh -c` (`cmd /C` on Windows).
/// - `output-property`: store trimmed stdout in this workflow property.
///
/// A non-zero exit status fails the operation.
#[derive(Debug, Default)]
pub struct ExecuteHandler;

impl OperationHandler for ExecuteHandler {
    fn id(&self) -> &str {
        "execute"
    }

    fn description(&self) -> &str {
        "Runs a shell command"
    }

    fn configuration_options(&self) -> BTreeMap<String, String> {
        BTreeMap::from([
            ("command".to_string(), "Shell command to run".to_string()),
            (
                "output-property".to_string(),
                "Workflow property receiving the command's stdout".to_string(),
            ),
        ])
    }

    fn start(&self, workflow: &WorkflowInstance) -> HandlerResult {
        Ok(Some(run_command(workflow)?))
    }
}

fn run_command(workflow: &WorkflowInstance) -> anyhow::Result<OperationResult> {
    let operation = workflow
        .current_operation()
        .context("workflow has no current operation")?;
    let command_line = operation
        .config("command")
        .filter(|c| !c.trim().is_empty())
        .context("missing 'command' configuration")?;

    info!(
        workflow = workflow.id,
        position = operation.position,
        cmd = %command_line,
        "executing command"
    );

    let mut cmd = if cfg!(windows) {
        let mut c = Command::new("cmd");
        c.arg("/C").arg(command_line);
        c
    } else {
        let mut c = Command::new("sh");
        c.arg("-c").arg(command_line);
        c
    };

    let output = cmd
        .stdin(Stdio::null())
        .output()
        .with_context(|| format!("spawning '{command_line}'"))?;

    let stderr = String::from_utf8_lossy(&output.stderr);
    if !stderr.trim().is_empty() {
        warn!(workflow = workflow.id, stderr = %stderr.trim(), "command wrote to stderr");
    }

    if !output.status.success() {
        bail!(
            "'{command_line}' exited with {}",
            output
                .status
                .code()
                .map_or_else(|| "a signal".to_string(), |c| format!("code {c}"))
        );
    }

    let mut result = OperationResult::proceed();
    if let Some(key) = operation.config("output-property") {
        let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
        debug!(workflow = workflow.id, property = %key, "captured command output");
        result = result.with_property(key, stdout);
    }
    Ok(result)
}
