// tests/hold_and_resume.rs

use std::error::Error;
use std::sync::Arc;

use mediaflow::dispatch::{JobDispatcher, JobOperation, JobStatus};
use mediaflow::errors::WorkflowError;
use mediaflow::handler::builtin::HoldHandler;
use mediaflow::model::{OperationState, WorkflowState};
use mediaflow::types::Properties;
use mediaflow_test_utils::builders::{DefinitionBuilder, MediaPackageBuilder, OperationBuilder};
use mediaflow_test_utils::fake_handlers::{CallKind, CallLog, ScriptedHandler, Step};
use mediaflow_test_utils::harness::TestService;
use mediaflow_test_utils::init_tracing;

type TestResult = Result<(), Box<dyn Error>>;

fn review_service(log: &CallLog) -> TestService {
    let ts = TestService::new();
    ts.handler(HoldHandler)
        .handler(ScriptedHandler::new("publish", log));
    ts.define(
        DefinitionBuilder::new("review")
            .with(
                OperationBuilder::new("hold")
                    .config("ui", "/admin/review/${reviewer}")
                    .build(),
            )
            .op("publish")
            .build(),
    );
    ts
}

fn approval() -> Properties {
    Properties::from([("approved".to_string(), "yes".to_string())])
}

#[test]
fn hold_pauses_with_ui_and_action_title() -> TestResult {
    init_tracing();
    let log = CallLog::new();
    let ts = review_service(&log);

    let wf = ts.start_with(
        "review",
        MediaPackageBuilder::new("mp-1").build(),
        Properties::from([("reviewer".to_string(), "alice".to_string())]),
    );
    ts.drain();

    let paused = ts.workflow(wf.id);
    assert_eq!(paused.state, WorkflowState::Paused);
    assert_eq!(paused.current, Some(0));

    let hold = &paused.operations[0];
    assert_eq!(hold.state, OperationState::Paused);
    assert_eq!(hold.hold_state_ui.as_deref(), Some("/admin/review/alice"));
    assert_eq!(hold.hold_action_title.as_deref(), Some("Continue"));
    assert!(hold.continuable);
    assert!(hold.abortable);
    assert!(hold.date_completed.is_none());

    let job = ts.dispatcher.get_job(hold.job_id.expect("hold job"))?;
    assert_eq!(job.status, JobStatus::Paused);
    assert_eq!(job.operation, JobOperation::Resume);
    assert_eq!(ts.dispatcher.get_job(wf.id)?.status, JobStatus::Paused);
    assert_eq!(log.count("publish", CallKind::Start), 0);
    Ok(())
}

#[test]
fn resume_requeues_the_paused_job_with_the_properties() -> TestResult {
    init_tracing();
    let log = CallLog::new();
    let ts = review_service(&log);
    let wf = ts.start("review", MediaPackageBuilder::new("mp-1").build());
    ts.drain();
    let hold_job = ts.workflow(wf.id).operations[0].job_id.expect("hold job");

    let resumed = ts.service.resume(wf.id, approval())?;
    // The workflow turns RUNNING when the dispatcher picks the job up.
    assert_eq!(resumed.state, WorkflowState::Paused);
    let job = ts.dispatcher.get_job(hold_job)?;
    assert_eq!(job.status, JobStatus::Queued);
    assert_eq!(job.arguments.last().map(String::as_str), Some(r#"{"approved":"yes"}"#));
    assert_eq!(ts.dispatcher.get_job(wf.id)?.status, JobStatus::Running);

    ts.drain();

    let done = ts.workflow(wf.id);
    assert_eq!(done.state, WorkflowState::Succeeded);
    assert_eq!(done.property("approved"), Some("yes"));
    let hold = &done.operations[0];
    assert_eq!(hold.state, OperationState::Succeeded);
    assert_eq!(hold.hold_state_ui, None);
    assert_eq!(ts.dispatcher.get_job(hold_job)?.status, JobStatus::Finished);
    assert_eq!(log.count("publish", CallKind::Start), 1);
    Ok(())
}

#[test]
fn resume_of_a_stopped_hold_is_rejected() -> TestResult {
    init_tracing();
    let log = CallLog::new();
    let ts = review_service(&log);
    let wf = ts.start("review", MediaPackageBuilder::new("mp-1").build());
    ts.drain();
    let hold_job = ts.workflow(wf.id).operations[0].job_id.expect("hold job");

    ts.service.stop(wf.id)?;
    assert_eq!(ts.dispatcher.get_job(hold_job)?.status, JobStatus::Deleted);

    let err = ts.service.resume(wf.id, approval()).unwrap_err();
    assert!(matches!(err, WorkflowError::IllegalState(_)));

    assert!(ts.run_until_idle().is_empty());
    let done = ts.workflow(wf.id);
    assert_eq!(done.state, WorkflowState::Stopped);
    assert_eq!(done.operations[0].state, OperationState::Paused);
    assert_eq!(log.count("publish", CallKind::Start), 0);
    Ok(())
}

#[test]
fn resume_requires_a_paused_workflow() {
    let log = CallLog::new();
    let ts = review_service(&log);
    let wf = ts.start("review", MediaPackageBuilder::new("mp-1").build());

    let err = ts.service.resume(wf.id, Properties::new()).unwrap_err();
    assert!(matches!(err, WorkflowError::IllegalState(_)));

    let err = ts.service.resume(9999, Properties::new()).unwrap_err();
    assert!(matches!(err, WorkflowError::WorkflowNotFound(9999)));
}

#[test]
fn handler_can_pause_again_on_resume() -> TestResult {
    init_tracing();
    let log = CallLog::new();
    let ts = TestService::new();
    ts.handler(
        ScriptedHandler::new("approve", &log)
            .hold("/approve")
            .then(Step::Pause)
            .then(Step::Pause)
            .then(Step::Continue),
    );
    ts.define(DefinitionBuilder::new("default").op("approve").build());

    let wf = ts.start("default", MediaPackageBuilder::new("mp-1").build());
    ts.drain();
    assert_eq!(ts.workflow(wf.id).state, WorkflowState::Paused);

    ts.service.resume(wf.id, approval())?;
    ts.drain();
    let paused_again = ts.workflow(wf.id);
    assert_eq!(paused_again.state, WorkflowState::Paused);
    assert_eq!(paused_again.operations[0].hold_action_title.as_deref(), Some("Approve"));

    ts.service.resume(wf.id, Properties::new())?;
    ts.drain();
    assert_eq!(ts.workflow(wf.id).state, WorkflowState::Succeeded);

    let resumes: Vec<Properties> = log
        .calls()
        .into_iter()
        .filter(|c| c.kind == CallKind::Resume)
        .map(|c| c.properties)
        .collect();
    assert_eq!(resumes, vec![approval(), Properties::new()]);
    Ok(())
}

#[test]
fn pause_from_a_handler_that_cannot_resume_is_a_fault() {
    init_tracing();
    let log = CallLog::new();
    let ts = TestService::new();
    ts.handler(ScriptedHandler::new("confused", &log).then(Step::Pause));
    ts.define(DefinitionBuilder::new("default").op("confused").build());

    let wf = ts.start("default", MediaPackageBuilder::new("mp-1").build());
    let processed = ts.run_until_idle();

    let err = processed
        .iter()
        .find_map(|p| p.result.as_ref().err())
        .expect("operation job fails");
    assert!(err.is_fatal());

    let done = ts.workflow(wf.id);
    assert_eq!(done.state, WorkflowState::Failed);
    assert_eq!(done.operations[0].state, OperationState::Failed);
    assert_eq!(done.errors.len(), 1);
}

#[test]
fn listeners_report_pause_and_resume() -> TestResult {
    use mediaflow_test_utils::recording::RecordingListener;

    init_tracing();
    let log = CallLog::new();
    let ts = review_service(&log);
    let listener = Arc::new(RecordingListener::new());
    ts.service.add_listener(listener.clone())?;

    let wf = ts.start("review", MediaPackageBuilder::new("mp-1").build());
    ts.drain();
    ts.service.resume(wf.id, approval())?;
    ts.drain();

    listener.wait_until(|events| events.iter().any(|e| e.state == WorkflowState::Succeeded));
    assert_eq!(
        listener.states(),
        vec![
            WorkflowState::Instantiated,
            WorkflowState::Running,
            WorkflowState::Paused,
            WorkflowState::Running,
            WorkflowState::Succeeded
        ]
    );
    Ok(())
}

#[test]
fn second_resume_of_the_same_hold_is_rejected() -> TestResult {
    init_tracing();
    let log = CallLog::new();
    let ts = TestService::new();
    ts.handler(
        ScriptedHandler::new("approve", &log)
            .hold("/admin/approve")
            .then(Step::Pause),
    )
    .handler(ScriptedHandler::new("publish", &log));
    ts.define(DefinitionBuilder::new("review").op("approve").op("publish").build());

    let wf = ts.start("review", MediaPackageBuilder::new("mp-1").build());
    ts.drain();
    let hold_job = ts.workflow(wf.id).operations[0].job_id.expect("hold job");

    ts.service.resume(wf.id, approval())?;
    let queued = ts.dispatcher.get_job(hold_job)?;
    assert_eq!(queued.status, JobStatus::Queued);

    // Queued again, not yet claimed.
    assert!(matches!(
        ts.service.resume(wf.id, Properties::new()),
        Err(WorkflowError::IllegalState(_))
    ));
    assert_eq!(ts.dispatcher.get_job(hold_job)?.arguments, queued.arguments);

    // Claimed, but the workflow has not been marked RUNNING yet.
    let claimed = ts.dispatcher.claim(hold_job)?.expect("claim resume job");
    assert_eq!(ts.workflow(wf.id).state, WorkflowState::Paused);
    assert!(matches!(
        ts.service.resume(wf.id, Properties::new()),
        Err(WorkflowError::IllegalState(_))
    ));
    assert_eq!(ts.dispatcher.get_job(hold_job)?.status, JobStatus::Running);
    assert_eq!(ts.dispatcher.get_job(wf.id)?.status, JobStatus::Running);

    ts.service.process(claimed)?;
    ts.drain();

    assert_eq!(ts.workflow(wf.id).state, WorkflowState::Succeeded);
    assert_eq!(log.count("approve", CallKind::Resume), 1);
    assert_eq!(log.count("publish", CallKind::Start), 1);
    Ok(())
}
