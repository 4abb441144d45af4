// tests/queries.rs

use std::error::Error;
use std::sync::Arc;

use mediaflow::dispatch::InMemoryDispatcher;
use mediaflow::engine::{ServiceOptions, WorkflowService};
use mediaflow::metadata::MetadataProviders;
use mediaflow::model::{MediaPackage, WorkflowState};
use mediaflow::store::{InMemoryStore, WorkflowQuery};
use mediaflow::types::{Properties, WorkflowId};
use mediaflow_test_utils::builders::{DefinitionBuilder, MediaPackageBuilder};
use mediaflow_test_utils::fake_handlers::{CallLog, ScriptedHandler, Step};
use mediaflow_test_utils::harness::TestService;
use mediaflow_test_utils::init_tracing;

type TestResult = Result<(), Box<dyn Error>>;

struct Fixture {
    ts: TestService,
    algebra: WorkflowId,
    biology: WorkflowId,
    archived: WorkflowId,
    queued: WorkflowId,
}

fn in_series(identifier: &str, title: &str, series: Option<&str>) -> MediaPackage {
    let mut mp = MediaPackageBuilder::new(identifier).title(title).build();
    mp.series = series.map(str::to_string);
    mp
}

/// Two ingests paused in review, one finished archive, one archive not yet
/// run.
fn fixture() -> Fixture {
    init_tracing();
    let log = CallLog::new();
    let ts = TestService::new();
    ts.handler(ScriptedHandler::new("inspect", &log))
        .handler(
            ScriptedHandler::new("review", &log)
                .resumable()
                .otherwise(Step::Pause),
        )
        .handler(ScriptedHandler::new("publish", &log));
    ts.define(
        DefinitionBuilder::new("ingest")
            .title("Ingest lecture")
            .op("inspect")
            .op("review")
            .op("publish")
            .build(),
    )
    .define(DefinitionBuilder::new("archive").title("Archive").op("publish").build());

    let algebra = ts.start("ingest", in_series("mp-a", "Algebra", Some("s1"))).id;
    let biology = ts.start("ingest", in_series("mp-b", "Biology", Some("s2"))).id;
    let archived = ts.start("archive", in_series("mp-a", "Algebra", None)).id;
    ts.drain();
    let queued = ts.start("archive", in_series("mp-d", "Drawing", None)).id;

    Fixture {
        ts,
        algebra,
        biology,
        archived,
        queued,
    }
}

fn ids(fx: &Fixture, query: WorkflowQuery) -> Vec<WorkflowId> {
    fx.ts
        .service
        .get_workflows(&query)
        .expect("query")
        .into_iter()
        .map(|w| w.id)
        .collect()
}

#[test]
fn fixture_states_are_as_expected() {
    let fx = fixture();
    assert_eq!(fx.ts.workflow(fx.algebra).state, WorkflowState::Paused);
    assert_eq!(fx.ts.workflow(fx.biology).state, WorkflowState::Paused);
    assert_eq!(fx.ts.workflow(fx.archived).state, WorkflowState::Succeeded);
    assert_eq!(fx.ts.workflow(fx.queued).state, WorkflowState::Instantiated);
}

#[test]
fn queries_filter_by_state() {
    let fx = fixture();

    assert_eq!(
        ids(&fx, WorkflowQuery::new().with_state(WorkflowState::Paused)),
        vec![fx.algebra, fx.biology]
    );
    assert_eq!(
        ids(&fx, WorkflowQuery::new().without_state(WorkflowState::Paused)),
        vec![fx.archived, fx.queued]
    );
    assert_eq!(
        ids(
            &fx,
            WorkflowQuery::new()
                .with_state(WorkflowState::Succeeded)
                .with_state(WorkflowState::Instantiated)
        ),
        vec![fx.archived, fx.queued]
    );
}

#[test]
fn queries_filter_by_definition_media_package_and_series() {
    let fx = fixture();

    assert_eq!(
        ids(&fx, WorkflowQuery::new().with_definition("archive")),
        vec![fx.archived, fx.queued]
    );
    assert_eq!(
        ids(&fx, WorkflowQuery::new().with_media_package("mp-a")),
        vec![fx.algebra, fx.archived]
    );
    assert_eq!(ids(&fx, WorkflowQuery::new().with_series("s1")), vec![fx.algebra]);
    assert_eq!(
        ids(
            &fx,
            WorkflowQuery::new()
                .with_media_package("mp-a")
                .with_definition("ingest")
        ),
        vec![fx.algebra]
    );
}

#[test]
fn queries_filter_by_current_operation_and_text() {
    let fx = fixture();

    assert_eq!(
        ids(&fx, WorkflowQuery::new().with_current_operation("review")),
        vec![fx.algebra, fx.biology]
    );
    assert_eq!(
        ids(&fx, WorkflowQuery::new().with_current_operation("publish")),
        vec![fx.queued],
        "finished workflows have no current operation"
    );
    assert_eq!(ids(&fx, WorkflowQuery::new().with_text("bio")), vec![fx.biology]);
    assert_eq!(
        ids(&fx, WorkflowQuery::new().with_text("ARCHIVE")),
        vec![fx.archived, fx.queued]
    );
    assert!(ids(&fx, WorkflowQuery::new().with_text("chemistry")).is_empty());
}

#[test]
fn queries_are_paged_in_id_order() {
    let fx = fixture();

    assert_eq!(
        ids(&fx, WorkflowQuery::new().with_page(1, 2)),
        vec![fx.biology, fx.archived]
    );
    assert_eq!(ids(&fx, WorkflowQuery::new().with_page(3, 0)), vec![fx.queued]);
    assert!(ids(&fx, WorkflowQuery::new().with_page(10, 5)).is_empty());
}

#[test]
fn instances_are_counted_by_state_and_operation() -> TestResult {
    let fx = fixture();
    let service = &fx.ts.service;

    assert_eq!(service.count_workflow_instances(None, None)?, 4);
    assert_eq!(
        service.count_workflow_instances(Some(WorkflowState::Paused), Some("review"))?,
        2
    );
    assert_eq!(service.count_workflow_instances(None, Some("publish"))?, 1);
    assert_eq!(
        service.count_workflow_instances(Some(WorkflowState::Running), None)?,
        0
    );
    Ok(())
}

#[test]
fn statistics_break_down_states_and_operations() -> TestResult {
    let fx = fixture();
    let stats = fx.ts.service.get_statistics()?;

    assert_eq!(stats.total, 4);
    assert_eq!(stats.count(WorkflowState::Paused), 2);
    assert_eq!(stats.count(WorkflowState::Succeeded), 1);
    assert_eq!(stats.count(WorkflowState::Failed), 0);

    let ingest = &stats.definitions["ingest"];
    assert_eq!(ingest.total, 2);
    assert_eq!(ingest.operations.get("review"), Some(&2));

    let archive = &stats.definitions["archive"];
    assert_eq!(archive.total, 2);
    assert_eq!(archive.states.get(&WorkflowState::Succeeded), Some(&1));
    assert_eq!(archive.operations.get("publish"), Some(&1));
    Ok(())
}

#[test]
fn removed_workflows_disappear_from_queries() -> TestResult {
    let fx = fixture();

    assert!(fx.ts.service.remove(fx.algebra).is_err(), "paused workflows stay");
    fx.ts.service.remove(fx.archived)?;

    assert_eq!(
        ids(&fx, WorkflowQuery::new().with_definition("archive")),
        vec![fx.queued]
    );
    assert_eq!(fx.ts.service.count_workflow_instances(None, None)?, 3);
    Ok(())
}

fn metadata_service() -> WorkflowService {
    init_tracing();
    let dispatcher = Arc::new(InMemoryDispatcher::new(usize::MAX));
    let store = Arc::new(InMemoryStore::new());
    let service = WorkflowService::new(dispatcher, store, ServiceOptions::default())
        .with_metadata(MetadataProviders::catalogs());
    service
        .register_definition(DefinitionBuilder::new("ingest").op("inspect").build())
        .expect("register definition");
    service
}

#[test]
fn catalog_metadata_is_copied_onto_the_media_package() -> TestResult {
    let service = metadata_service();
    let definition = service.get_definition("ingest")?;
    let mp = MediaPackageBuilder::new("mp-1")
        .episode_catalog(&[
            ("title", "Linear Algebra, Lecture 1"),
            ("isPartOf", "math-101"),
            ("creator", "Ada, Grace"),
            ("language", "en"),
        ])
        .series_catalog(&[("identifier", "ignored"), ("title", "Mathematics 101")])
        .build();

    let wf = service.start(&definition, mp, None, Properties::new())?;

    let stored = service.get_workflow(wf.id)?.media_package;
    assert_eq!(stored.title.as_deref(), Some("Linear Algebra, Lecture 1"));
    assert_eq!(stored.series.as_deref(), Some("math-101"), "episode catalog wins");
    assert_eq!(stored.series_title.as_deref(), Some("Mathematics 101"));
    assert_eq!(stored.language.as_deref(), Some("en"));
    assert_eq!(stored.creators, vec!["Ada".to_string(), "Grace".to_string()]);
    Ok(())
}

#[test]
fn metadata_already_on_the_media_package_is_kept() -> TestResult {
    let service = metadata_service();
    let definition = service.get_definition("ingest")?;
    let mp = MediaPackageBuilder::new("mp-1")
        .title("Edited title")
        .episode_catalog(&[("title", "Catalog title"), ("license", "CC-BY")])
        .build();

    let wf = service.start(&definition, mp, None, Properties::new())?;

    let stored = service.get_workflow(wf.id)?.media_package;
    assert_eq!(stored.title.as_deref(), Some("Edited title"));
    assert_eq!(stored.license.as_deref(), Some("CC-BY"));
    Ok(())
}

#[test]
fn ambiguous_episode_catalogs_are_skipped() -> TestResult {
    let service = metadata_service();
    let definition = service.get_definition("ingest")?;
    let mp = MediaPackageBuilder::new("mp-1")
        .catalog("one", "dublincore/episode", &[("title", "First")])
        .catalog("two", "dublincore/episode", &[("title", "Second")])
        .series_catalog(&[("title", "Series")])
        .build();

    let wf = service.start(&definition, mp, None, Properties::new())?;

    let stored = service.get_workflow(wf.id)?.media_package;
    assert_eq!(stored.title, None);
    assert_eq!(stored.series_title.as_deref(), Some("Series"));
    Ok(())
}
