// tests/external_override.rs

use std::error::Error;
use std::sync::Arc;
use std::thread;

use mediaflow::dispatch::{JobDispatcher, JobStatus};
use mediaflow::model::{OperationState, WorkflowState};
use mediaflow::types::Properties;
use mediaflow_test_utils::builders::{DefinitionBuilder, MediaPackageBuilder};
use mediaflow_test_utils::fake_handlers::{CallKind, CallLog, Gate, ScriptedHandler, gated};
use mediaflow_test_utils::harness::TestService;
use mediaflow_test_utils::init_tracing;

type TestResult = Result<(), Box<dyn Error>>;

/// `slow` blocks until released, `next` continues immediately.
fn slow_then_next(log: &CallLog, operations: &[&str]) -> (Arc<TestService>, Gate) {
    let ts = TestService::new();
    let (slow, gate) = gated("slow", log);
    ts.handler(slow).handler(ScriptedHandler::new("next", log));
    let definition = operations
        .iter()
        .fold(DefinitionBuilder::new("default"), |builder, op| builder.op(op));
    ts.define(definition.build());
    (Arc::new(ts), gate)
}

/// Run the next job on another thread while `during` executes against the
/// blocked handler.
fn while_slow_runs<F>(ts: &Arc<TestService>, gate: &Gate, during: F)
where
    F: FnOnce(u64),
{
    let runner = {
        let ts = Arc::clone(ts);
        thread::spawn(move || ts.run_next().map(|p| p.result.is_ok()))
    };
    let id = gate.wait_entered();
    during(id);
    gate.release();
    assert_eq!(runner.join().expect("runner thread"), Some(true));
}

#[test]
fn external_pause_wins_over_continue() -> TestResult {
    init_tracing();
    let log = CallLog::new();
    let (ts, gate) = slow_then_next(&log, &["slow", "next"]);

    let wf = ts.start("default", MediaPackageBuilder::new("mp-1").build());
    ts.run_next().expect("start workflow job");

    while_slow_runs(&ts, &gate, |id| {
        let suspended = ts.service.suspend(id).expect("suspend");
        assert_eq!(suspended.state, WorkflowState::Paused);
    });

    let paused = ts.workflow(wf.id);
    assert_eq!(paused.state, WorkflowState::Paused);
    assert_eq!(paused.operations[0].state, OperationState::Succeeded);
    assert_eq!(paused.operations[1].state, OperationState::Instantiated);
    assert_eq!(paused.operations[1].job_id, None, "next operation not dispatched");
    assert_eq!(ts.dispatcher.get_job(wf.id)?.status, JobStatus::Paused);
    assert!(ts.run_until_idle().is_empty());
    assert_eq!(log.count("next", CallKind::Start), 0);

    let resumed = ts.service.resume(wf.id, Properties::new())?;
    assert_eq!(resumed.state, WorkflowState::Running);
    ts.drain();

    let done = ts.workflow(wf.id);
    assert_eq!(done.state, WorkflowState::Succeeded);
    assert_eq!(log.count("next", CallKind::Start), 1);
    Ok(())
}

#[test]
fn stop_wins_over_a_pause_returned_afterwards() -> TestResult {
    init_tracing();
    let log = CallLog::new();
    let ts = Arc::new(TestService::new());
    let (review, gate) = gated("review", &log);
    ts.handler(review.pausing())
        .handler(ScriptedHandler::new("next", &log));
    ts.define(DefinitionBuilder::new("default").op("review").op("next").build());

    let wf = ts.start("default", MediaPackageBuilder::new("mp-1").build());
    ts.run_next().expect("start workflow job");

    while_slow_runs(&ts, &gate, |id| {
        ts.service.stop(id).expect("stop");
    });

    let stopped = ts.workflow(wf.id);
    assert_eq!(stopped.state, WorkflowState::Stopped);
    assert_eq!(stopped.operations[0].state, OperationState::Paused);
    assert_eq!(ts.dispatcher.get_job(wf.id)?.status, JobStatus::Deleted);
    assert!(ts.service.resume(wf.id, Properties::new()).is_err());
    assert!(ts.run_until_idle().is_empty());
    assert_eq!(log.count("review", CallKind::Resume), 0);
    assert_eq!(log.count("next", CallKind::Start), 0);
    Ok(())
}

#[test]
fn stop_while_running_discards_the_rest_of_the_workflow() {
    init_tracing();
    let log = CallLog::new();
    let (ts, gate) = slow_then_next(&log, &["slow", "next"]);

    let wf = ts.start("default", MediaPackageBuilder::new("mp-1").build());
    ts.run_next().expect("start workflow job");

    while_slow_runs(&ts, &gate, |id| {
        ts.service.stop(id).expect("stop");
    });

    let done = ts.workflow(wf.id);
    assert_eq!(done.state, WorkflowState::Stopped);
    assert_eq!(done.operations[0].state, OperationState::Succeeded);
    assert_eq!(done.operations[1].job_id, None);
    assert!(ts.run_until_idle().is_empty());
    assert_eq!(log.count("next", CallKind::Start), 0);
}

#[test]
fn stop_during_the_last_operation_keeps_the_workflow_stopped() {
    init_tracing();
    let log = CallLog::new();
    let (ts, gate) = slow_then_next(&log, &["slow"]);

    let wf = ts.start("default", MediaPackageBuilder::new("mp-1").build());
    ts.run_next().expect("start workflow job");

    while_slow_runs(&ts, &gate, |id| {
        ts.service.stop(id).expect("stop");
    });

    let done = ts.workflow(wf.id);
    assert_eq!(done.state, WorkflowState::Stopped);
    assert_eq!(done.current, None);
    assert_eq!(done.operations[0].state, OperationState::Succeeded);
}

#[test]
fn suspended_workflow_finishes_the_queued_operation_only() -> TestResult {
    init_tracing();
    let log = CallLog::new();
    let ts = TestService::new();
    ts.handler(ScriptedHandler::new("first", &log))
        .handler(ScriptedHandler::new("second", &log));
    ts.define(DefinitionBuilder::new("default").op("first").op("second").build());

    let wf = ts.start("default", MediaPackageBuilder::new("mp-1").build());
    ts.run_next().expect("start workflow job");
    ts.service.suspend(wf.id)?;
    ts.drain();

    let paused = ts.workflow(wf.id);
    assert_eq!(paused.state, WorkflowState::Paused);
    assert_eq!(log.handlers(CallKind::Start), vec!["first"]);

    ts.service.resume(wf.id, Properties::new())?;
    ts.drain();
    assert_eq!(ts.workflow(wf.id).state, WorkflowState::Succeeded);
    assert_eq!(log.handlers(CallKind::Start), vec!["first", "second"]);
    Ok(())
}

#[test]
fn resume_before_the_queued_operation_ran_does_not_queue_it_twice() -> TestResult {
    init_tracing();
    let log = CallLog::new();
    let ts = TestService::new();
    ts.handler(ScriptedHandler::new("first", &log))
        .handler(ScriptedHandler::new("second", &log));
    ts.define(DefinitionBuilder::new("default").op("first").op("second").build());

    let wf = ts.start("default", MediaPackageBuilder::new("mp-1").build());
    ts.run_next().expect("start workflow job");
    let queued = ts.workflow(wf.id).operations[0].job_id;

    ts.service.suspend(wf.id)?;
    ts.service.resume(wf.id, Properties::new())?;
    assert_eq!(ts.workflow(wf.id).operations[0].job_id, queued);

    ts.drain();
    assert_eq!(ts.workflow(wf.id).state, WorkflowState::Succeeded);
    assert_eq!(log.handlers(CallKind::Start), vec!["first", "second"]);
    Ok(())
}
