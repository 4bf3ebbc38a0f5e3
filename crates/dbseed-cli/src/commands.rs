use std::sync::Arc;

use anyhow::Context;
use colored::Colorize;
use serde::Serialize;

use dbseed::core::reconcile;
use dbseed::store::{BucketConfig, ObjectStore, SqliteStore};
use dbseed::sync::{
    find_duplicates, verify_convergence, ConvergenceResult, ItemStatus, LocalDirectory, SyncAction,
};
use dbseed::{Plan, SeedReport, Seeder, SeederConfig};

use crate::cli::*;

pub async fn run_command(cli: Cli) -> anyhow::Result<()> {
    let store = open_store(&cli)?;
    let config = SeederConfig::for_target(&cli.target_dir).with_policy(cli.policy);

    match cli.command.unwrap_or(Command::Seed) {
        Command::Seed => cmd_seed(store, config, cli.format).await,
        Command::Plan => cmd_plan(store, config, cli.format).await,
        Command::Verify => cmd_verify(store, config, cli.format).await,
    }
}

fn open_store(cli: &Cli) -> anyhow::Result<SqliteStore> {
    let bucket = BucketConfig::named(&cli.bucket).with_chunk_size(cli.chunk_size);
    let path = cli.database_path();
    tracing::debug!(database = %path.display(), bucket = %bucket.name, "opening store");
    SqliteStore::open(&path, bucket)
        .with_context(|| format!("opening database {}", path.display()))
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// seed
// ─────────────────────────────────────────────────────────────────────────────

async fn cmd_seed(store: SqliteStore, config: SeederConfig, format: OutputFormat) -> anyhow::Result<()> {
    let store = Arc::new(store);
    let report = Seeder::from_shared(Arc::clone(&store), config)
        .run()
        .await
        .context("seeding failed")?;

    match format {
        OutputFormat::Json => print_json(&report)?,
        OutputFormat::Text => print_seed_report(&report),
    }

    let duplicates = find_duplicates(&*store).await?;
    for (name, copies) in &duplicates {
        tracing::warn!(name = %name, copies, "object stored more than once");
    }
    Ok(())
}

fn print_seed_report(report: &SeedReport) {
    for name in &report.dropped {
        println!("  {} {}", "dropped".dimmed(), name);
    }
    for (collection, count) in &report.inserted {
        println!("  {} {} ({} records)", "inserted".green(), collection.bold(), count);
    }

    for outcome in &report.sync.outcomes {
        let label = match &outcome.status {
            ItemStatus::Deleted(_) => "deleted".yellow(),
            ItemStatus::Missing => "absent".dimmed(),
            ItemStatus::Uploaded(_) => "uploaded".green(),
            ItemStatus::Failed(cause) => {
                let action = match outcome.action {
                    SyncAction::Delete => "delete",
                    SyncAction::Upload => "upload",
                };
                println!("  {} {} {}: {}", "failed".red().bold(), action, outcome.name, cause);
                continue;
            }
        };
        println!("  {} {}", label, outcome.name);
    }

    let counts = report.sync.counts();
    let mark = if counts.failed == 0 {
        "✓".green().bold()
    } else {
        "!".red().bold()
    };
    println!(
        "{} Seeded {} records; files ({}): {} uploaded, {} deleted, {} failed",
        mark,
        report.total_inserted.to_string().bold(),
        report.sync.policy.to_string().cyan(),
        counts.uploaded,
        counts.deleted,
        counts.failed,
    );
}

// ─────────────────────────────────────────────────────────────────────────────
// plan
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Serialize)]
struct PlanOutput {
    policy: dbseed::ReconciliationPolicy,
    resets_bucket: bool,
    plan: Plan,
}

async fn cmd_plan(store: SqliteStore, config: SeederConfig, format: OutputFormat) -> anyhow::Result<()> {
    let source = LocalDirectory::new(&config.upload_dir);
    let local = source.list_names().await?;

    // Under AlwaysUpload the seeding run empties the bucket before syncing.
    let stored = if config.policy.resets_bucket() {
        Default::default()
    } else {
        store.list_names().await?
    };
    let output = PlanOutput {
        policy: config.policy,
        resets_bucket: config.policy.resets_bucket(),
        plan: reconcile(&stored, &local, config.policy),
    };

    match format {
        OutputFormat::Json => print_json(&output)?,
        OutputFormat::Text => {
            if output.resets_bucket {
                println!("  {} bucket {}", "reset".yellow(), store.bucket().name);
            }
            for name in &output.plan.to_delete {
                println!("  {} {}", "delete".red(), name);
            }
            for name in &output.plan.to_upload {
                println!("  {} {}", "upload".green(), name);
            }
            println!(
                "Plan ({}): {} to delete, {} to upload",
                output.policy.to_string().cyan(),
                output.plan.to_delete.len(),
                output.plan.to_upload.len(),
            );
        }
    }
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// verify
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Serialize)]
struct VerifyOutput {
    convergence: ConvergenceResult,
    duplicates: Vec<(String, usize)>,
}

async fn cmd_verify(store: SqliteStore, config: SeederConfig, format: OutputFormat) -> anyhow::Result<()> {
    let source = LocalDirectory::new(&config.upload_dir);
    let output = VerifyOutput {
        convergence: verify_convergence(&store, &source).await?,
        duplicates: find_duplicates(&store).await?,
    };

    match format {
        OutputFormat::Json => print_json(&output)?,
        OutputFormat::Text => {
            match &output.convergence {
                ConvergenceResult::Converged => {
                    println!("{} Bucket matches {}", "✓".green().bold(), source.root().display());
                }
                ConvergenceResult::Diverged { missing, extra } => {
                    for name in missing {
                        println!("  {} {}", "missing".yellow(), name);
                    }
                    for name in extra {
                        println!("  {} {}", "extra".red(), name);
                    }
                    println!("{} Bucket differs from {}", "!".red().bold(), source.root().display());
                }
            }
            for (name, copies) in &output.duplicates {
                println!("  {} {} ({} copies)", "duplicate".yellow(), name, copies);
            }
        }
    }
    Ok(())
}
