//! `lattice apply` - execute the plan against the cloud.

use super::{load_and_plan, plan::display_plan};
use crate::cli::ApplyArgs;
use anyhow::{Result, bail};
use colored::Colorize;
use graphkit::{ExecResult, ExecutorConfig, GraphvizTracer, ParallelExecutor, SerialExecutor};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

pub async fn run(args: ApplyArgs) -> Result<()> {
    let ctx = load_and_plan(&args.plan).await?;
    display_plan(&ctx.plan);

    if ctx.plan.is_noop() {
        return Ok(());
    }

    if !args.yes && !args.dry_run && !confirm_proceed()? {
        println!();
        println!("  {} Aborted", "✗".red());
        return Ok(());
    }

    let tracer = Arc::new(GraphvizTracer::new());
    let config = ExecutorConfig {
        dry_run: args.dry_run,
        error_strategy: args.error_strategy.into(),
        timeout: Duration::from_secs(args.timeout),
        wait_for_orphans_timeout: Duration::from_secs(args.wait_orphans_timeout),
        max_workers: args.jobs,
        tracer: Some(tracer.clone()),
    };

    let cancel = CancellationToken::new();
    let actions = ctx.plan.into_actions();
    let outcome = if args.parallel {
        ParallelExecutor::new(ctx.cloud.clone(), actions, config)?
            .run(&cancel)
            .await
    } else {
        SerialExecutor::new(ctx.cloud.clone(), actions, config)?
            .run(&cancel)
            .await
    };

    match outcome {
        Ok(result) => {
            print_summary(&result, args.dry_run);
            Ok(())
        }
        Err(err) => {
            let Some(result) = err.into_result() else {
                bail!("apply failed before executing any action");
            };
            print_summary(&result, args.dry_run);
            log::debug!("action trace:\n{}", tracer.to_dot());
            bail!(
                "apply incomplete: {} failed, {} never became runnable",
                result.errors.len(),
                result.pending.len()
            )
        }
    }
}

fn confirm_proceed() -> Result<bool> {
    use dialoguer::Confirm;

    let confirmed = Confirm::new()
        .with_prompt("Continue?")
        .default(true)
        .interact()?;

    Ok(confirmed)
}

fn print_summary(result: &ExecResult, dry_run: bool) {
    println!();
    if dry_run {
        println!(
            "  {} Dry run - {} actions walked, no changes made",
            "ℹ".blue(),
            result.completed.len()
        );
        return;
    }

    if result.is_clean() {
        println!("  {} All {} actions completed", "✓".green().bold(), result.completed.len());
        return;
    }

    println!("  {} Apply finished with problems", "⚠".yellow().bold());
    if !result.completed.is_empty() {
        println!("    • {} actions completed", result.completed.len());
    }
    for failed in &result.errors {
        println!(
            "    {} {}: {}",
            "✗".red(),
            failed.action.metadata(),
            failed.error
        );
    }
    for pending in &result.pending {
        let waits: Vec<String> = pending
            .pending_events()
            .iter()
            .map(ToString::to_string)
            .collect();
        println!(
            "    {} {} still waiting on {}",
            "…".dimmed(),
            pending.metadata(),
            waits.join(", ")
        );
    }
}
