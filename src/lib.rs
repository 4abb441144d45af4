// src/lib.rs

pub mod cli;
pub mod config;
pub mod dispatch;
pub mod engine;
pub mod errors;
pub mod handler;
pub mod logging;
pub mod metadata;
pub mod model;
pub mod registry;
pub mod store;
pub mod types;

use std::fs;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result, anyhow, bail};
use chrono::Utc;
use tracing::{debug, info, warn};

use crate::cli::CliArgs;
use crate::config::loader::load_and_validate;
use crate::config::model::ConfigFile;
use crate::dispatch::{DispatchLoop, DispatchSummary, InMemoryDispatcher};
use crate::engine::WorkflowService;
use crate::metadata::MetadataProviders;
use crate::model::{MediaPackage, WorkflowInstance, WorkflowState};
use crate::store::InMemoryStore;
use crate::types::Properties;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading
/// - dispatcher, store and workflow service
/// - built-in operation handlers and configured definitions
/// - the dispatch loop (until idle)
/// - Ctrl-C handling
pub async fn run(args: CliArgs) -> Result<()> {
    let cfg = load_and_validate(&args.config)?;

    let dispatcher = Arc::new(InMemoryDispatcher::new(cfg.max_load()));
    let store = Arc::new(InMemoryStore::new());
    let service = Arc::new(build_service(&cfg, dispatcher.clone(), store)?);

    if args.dry_run {
        print_dry_run(&cfg, &service);
        return Ok(());
    }

    let workflow_id = args
        .workflow
        .as_deref()
        .ok_or_else(|| anyhow!("--workflow is required unless --dry-run is given"))?;
    let definition = service.get_definition(workflow_id)?;

    let media_package = match args.media_package.as_deref() {
        Some(path) => load_media_package(Path::new(path))?,
        None => MediaPackage::new(format!("mp-{}", Utc::now().timestamp_millis())),
    };
    let properties: Properties = args.properties.iter().cloned().collect();

    if !service.is_runnable(&definition) {
        warn!(workflow = %definition.id, "definition references unknown operation handlers");
    }

    let dispatch = DispatchLoop::new(
        dispatcher,
        Arc::clone(&service),
        cfg.dispatch_options(true),
    )?;

    // Ctrl-C → graceful shutdown.
    {
        let handle = dispatch.handle();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                eprintln!("failed to listen for Ctrl+C: {e}");
                return;
            }
            handle.shutdown().await;
        });
    }

    let workflow = service.start(&definition, media_package, None, properties)?;
    info!(workflow = workflow.id, definition = %definition.id, "workflow submitted");

    let summary = dispatch.run().await?;
    let workflow = service.get_workflow(workflow.id)?;
    print_report(&workflow, &summary);

    if workflow.state == WorkflowState::Failed {
        bail!("workflow {} failed", workflow.id);
    }
    Ok(())
}

/// Service with the catalog metadata providers, the built-in handlers and
/// every configured definition registered.
pub fn build_service(
    cfg: &ConfigFile,
    dispatcher: Arc<InMemoryDispatcher>,
    store: Arc<InMemoryStore>,
) -> Result<WorkflowService> {
    let service = WorkflowService::new(dispatcher, store, cfg.service_options())
        .with_metadata(MetadataProviders::catalogs());

    for handler in handler::builtin::all() {
        service.register_handler(handler)?;
    }
    for definition in cfg.workflows.values() {
        service.register_definition(definition.clone())?;
    }
    debug!(definitions = cfg.workflows.len(), "service ready");
    Ok(service)
}

fn load_media_package(path: &Path) -> Result<MediaPackage> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("reading media package {}", path.display()))?;
    serde_json::from_str(&contents)
        .with_context(|| format!("parsing media package {}", path.display()))
}

/// Print definitions, their operations and whether every handler exists.
fn print_dry_run(cfg: &ConfigFile, service: &WorkflowService) {
    println!("mediaflow dry-run");
    match cfg.service.max_concurrent_workflows {
        Some(cap) => println!("  service.max_concurrent_workflows = {cap}"),
        None => println!("  service.max_concurrent_workflows = (max load {})", cfg.max_load()),
    }
    println!("  dispatch.workers = {}", cfg.dispatch.workers);
    println!();

    let handlers = service.list_operation_handlers();
    println!("handlers ({}):", handlers.len());
    for info in &handlers {
        println!("  - {}: {}", info.id, info.description);
    }
    println!();

    println!("workflows ({}):", cfg.workflows.len());
    for definition in service.list_definitions() {
        let runnable = service.is_runnable(&definition);
        println!("  - {} ({}) runnable: {runnable}", definition.id, definition.title);
        for (position, op) in definition.operations.iter().enumerate() {
            println!("      {position}: {}", op.template);
            if op.fail_on_error {
                println!("         fail_on_error: true");
            }
            if let Some(ref handler) = op.exception_handler_workflow {
                println!("         exception_handler_workflow: {handler}");
            }
            if let Some(ref cond) = op.execute_condition {
                println!("         if: {cond}");
            }
            if let Some(ref cond) = op.skip_condition {
                println!("         unless: {cond}");
            }
        }
    }

    debug!("dry-run complete (no execution)");
}

fn print_report(workflow: &WorkflowInstance, summary: &DispatchSummary) {
    println!(
        "workflow {} ({}) finished in state {}",
        workflow.id, workflow.definition_id, workflow.state
    );
    for op in &workflow.operations {
        println!("  {:>3} {:<24} {}", op.position, op.template, op.state);
    }
    if !workflow.errors.is_empty() {
        println!("errors:");
        for error in &workflow.errors {
            println!("  - {error}");
        }
    }
    if workflow.state == WorkflowState::Paused {
        println!("workflow is paused; no operation will run until it is resumed");
    }
    println!(
        "jobs: {} processed, {} failed, {} deferred",
        summary.processed, summary.failed, summary.deferred
    );
}
