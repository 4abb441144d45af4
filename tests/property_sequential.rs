// tests/property_sequential.rs

use std::sync::{Arc, Mutex};

use proptest::prelude::*;

use mediaflow::errors::OperationError;
use mediaflow::handler::{HandlerCapabilities, HandlerResult, OperationHandler};
use mediaflow::model::{OperationResult, OperationState, WorkflowInstance, WorkflowState};
use mediaflow::types::Properties;
use mediaflow_test_utils::builders::{DefinitionBuilder, MediaPackageBuilder, OperationBuilder};
use mediaflow_test_utils::harness::TestService;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Continue,
    Skip,
    Fail,
    Pause,
    /// `if` condition evaluates to false; the handler is never called.
    Disabled,
}

impl Kind {
    fn action(self) -> &'static str {
        match self {
            Kind::Continue | Kind::Disabled => "continue",
            Kind::Skip => "skip",
            Kind::Fail => "fail",
            Kind::Pause => "pause",
        }
    }

    fn final_state(self) -> OperationState {
        match self {
            Kind::Continue | Kind::Pause => OperationState::Succeeded,
            Kind::Skip | Kind::Disabled => OperationState::Skipped,
            Kind::Fail => OperationState::Failed,
        }
    }
}

fn kind_strategy() -> impl Strategy<Value = Kind> {
    prop_oneof![
        3 => Just(Kind::Continue),
        1 => Just(Kind::Skip),
        1 => Just(Kind::Fail),
        1 => Just(Kind::Pause),
        1 => Just(Kind::Disabled),
    ]
}

#[derive(Debug, Default)]
struct Observed {
    /// Positions in the order the handler saw them, starts only.
    started: Vec<usize>,
    violations: Vec<String>,
}

/// Handler acting on its `action` config that checks, on every call, that
/// only the current operation is in flight.
#[derive(Clone, Default)]
struct OrderChecker {
    observed: Arc<Mutex<Observed>>,
}

impl OrderChecker {
    fn check(&self, workflow: &WorkflowInstance) -> Option<usize> {
        let mut observed = self.observed.lock().unwrap();
        let Some(position) = workflow.current else {
            observed.violations.push("handler called without a cursor".to_string());
            return None;
        };

        for op in &workflow.operations[..position] {
            if !op.state.is_terminal() {
                observed.violations.push(format!(
                    "position {} is {} while {position} runs",
                    op.position, op.state
                ));
            }
        }
        if workflow.operations[position].state != OperationState::Running {
            observed.violations.push(format!(
                "current position {position} is {}",
                workflow.operations[position].state
            ));
        }
        for op in &workflow.operations[position + 1..] {
            if op.state != OperationState::Instantiated {
                observed.violations.push(format!(
                    "later position {} is {} while {position} runs",
                    op.position, op.state
                ));
            }
        }
        Some(position)
    }
}

impl OperationHandler for OrderChecker {
    fn id(&self) -> &str {
        "step"
    }

    fn capabilities(&self) -> HandlerCapabilities {
        HandlerCapabilities::RESUMABLE
    }

    fn start(&self, workflow: &WorkflowInstance) -> HandlerResult {
        let Some(position) = self.check(workflow) else {
            return Ok(None);
        };
        self.observed.lock().unwrap().started.push(position);

        match workflow.operations[position].config("action") {
            Some("skip") => Ok(Some(OperationResult::skip())),
            Some("pause") => Ok(Some(OperationResult::pause())),
            Some("fail") => Err(OperationError::new(format!("step {position} failed"))),
            _ => Ok(Some(OperationResult::proceed())),
        }
    }

    fn resume(&self, workflow: &WorkflowInstance, _properties: &Properties) -> HandlerResult {
        self.check(workflow);
        Ok(Some(OperationResult::proceed()))
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn operations_execute_strictly_in_order(
        kinds in proptest::collection::vec(kind_strategy(), 1..12)
    ) {
        let checker = OrderChecker::default();
        let ts = TestService::new();
        ts.handler(checker.clone());

        let definition = kinds.iter().fold(DefinitionBuilder::new("random"), |def, kind| {
            let op = OperationBuilder::new("step").config("action", kind.action());
            let op = if *kind == Kind::Disabled { op.execute_if("false") } else { op };
            def.with(op.build())
        });
        ts.define(definition.build());

        let wf = ts.start("random", MediaPackageBuilder::new("mp-prop").build());
        let pauses = kinds.iter().filter(|k| **k == Kind::Pause).count();

        ts.drain();
        for _ in 0..pauses {
            prop_assert_eq!(ts.workflow(wf.id).state, WorkflowState::Paused);
            ts.service.resume(wf.id, Properties::new()).unwrap();
            ts.drain();
        }

        let finished = ts.workflow(wf.id);
        prop_assert_eq!(finished.state, WorkflowState::Succeeded);
        prop_assert_eq!(finished.current, None);

        let states: Vec<OperationState> = finished.operations.iter().map(|op| op.state).collect();
        let expected: Vec<OperationState> = kinds.iter().map(|k| k.final_state()).collect();
        prop_assert_eq!(states, expected);

        let observed = checker.observed.lock().unwrap();
        prop_assert!(observed.violations.is_empty(), "{:?}", observed.violations);

        let expected_starts: Vec<usize> = kinds
            .iter()
            .enumerate()
            .filter(|(_, k)| **k != Kind::Disabled)
            .map(|(position, _)| position)
            .collect();
        prop_assert_eq!(&observed.started, &expected_starts);

        let failures = kinds.iter().filter(|k| **k == Kind::Fail).count();
        prop_assert_eq!(finished.errors.len(), failures);
    }
}
