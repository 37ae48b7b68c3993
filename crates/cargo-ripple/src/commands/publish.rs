use std::path::Path;

use ripple_manifest::PinLedger;
use ripple_operations::operations::{
    PlanOperation, PublishOrchestrator, ReleasePlan, tag_published, write_release_versions,
};
use ripple_operations::providers::{
    CargoPackageManager, FileSystemProjectProvider, FileSystemRunStateStore, Git2Provider,
    SparseIndexRegistry,
};
use ripple_operations::traits::RunStateStore;
use ripple_operations::{PackageStatus, PublishSettings, RunState};
use tracing::info;

use super::PublishArgs;
use crate::error::{CliError, Result};
use crate::output::{PlainTextFormatter, ReportFormatter};
use crate::signal::restore_pins_on_interrupt;

fn settings(args: &PublishArgs, plan: &ReleasePlan) -> PublishSettings {
    let config = &plan.config;
    PublishSettings {
        concurrency: args.concurrency.unwrap_or(config.concurrency()),
        dry_run: args.dry_run,
        smoke_test: args.smoke_test || config.smoke_test(),
        fresh: args.fresh,
        poll_interval: config.poll_interval(),
        poll_timeout: config.poll_timeout(),
        staging_dir: plan.project.root.join(config.staging_dir()),
        registry: config.registry().map(str::to_string),
    }
}

pub(crate) async fn run(args: PublishArgs, start_path: &Path) -> Result<()> {
    let operation = PlanOperation::new(FileSystemProjectProvider::new(), Git2Provider::new());
    let plan = operation.execute(start_path, &args.versioning.plan_input())?;
    let root = plan.project.root.clone();

    let store = FileSystemRunStateStore::for_project(&root, plan.config.state_file());
    let registry =
        SparseIndexRegistry::with_index(&args.index_url, plan.config.registry().map(str::to_string))?;
    let ledger = PinLedger::new();
    let orchestrator = PublishOrchestrator::new(
        CargoPackageManager::new(),
        registry,
        store,
        settings(&args, &plan),
    )
    .with_ledger(ledger.clone());

    let initial = match orchestrator.resumable_state(&plan.commit)? {
        Some(state) => {
            println!("Resuming publish run started at {}.", state.started_at());
            state
        }
        None => RunState::new(
            plan.commit.clone(),
            &plan.project.packages,
            &plan.versions,
            &plan.levels,
        )?,
    };

    let done = |status: PackageStatus| matches!(status, PackageStatus::Published | PackageStatus::Skipped);
    if initial.entries().all(|(_, entry)| done(entry.status)) {
        println!("Nothing to publish.");
        return Ok(());
    }

    if args.dry_run {
        println!("Dry run - manifests keep their versions and nothing is uploaded.\n");
    } else {
        let written = write_release_versions(&plan.project.packages, &initial)?;
        info!(manifests = written.len(), "release versions written");
    }

    restore_pins_on_interrupt(ledger);
    let result = orchestrator.run(&plan.project.packages, initial).await?;
    print!("{}", PlainTextFormatter.format_result(&result));

    if !result.is_success() {
        return Err(CliError::PublishIncomplete {
            failed: result.failed.len(),
            pending: result.pending.len(),
        });
    }
    if args.dry_run {
        return Ok(());
    }

    if args.tag {
        let tags = tag_published(
            &Git2Provider::new(),
            &root,
            plan.config.tag_format(),
            &result,
        )?;
        for tag in &tags {
            println!("Tagged {}", tag.name);
        }
    }

    orchestrator.store().clear()?;
    Ok(())
}
