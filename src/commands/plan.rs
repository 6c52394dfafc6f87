//! `lattice plan` - show the computed diff and action plan.

use super::load_and_plan;
use crate::cli::PlanArgs;
use anyhow::Result;
use colored::Colorize;
use graphkit::Operation;

pub async fn run(args: PlanArgs) -> Result<()> {
    let ctx = load_and_plan(&args).await?;
    let scope = ctx.graph.scope();
    println!(
        "  {} resources across {}",
        ctx.graph.len(),
        scope
            .projects
            .iter()
            .map(|p| format!("project {p}"))
            .collect::<Vec<_>>()
            .join(", ")
    );
    display_plan(&ctx.plan);
    Ok(())
}

pub fn display_plan(plan: &graphkit::Plan) {
    if plan.is_noop() {
        println!();
        println!("  {} No changes needed", "✓".green());
        return;
    }

    println!();
    for diff in plan.diffs() {
        let symbol = match &diff.operation {
            Operation::Nop => continue,
            Operation::Create => "+".green(),
            Operation::Update(_) => "~".yellow(),
            Operation::Recreate(_) => "±".red(),
            Operation::Delete => "-".red(),
        };
        println!("  {} {:<10} {}", symbol, diff.operation.to_string(), diff.id);
        if let Operation::Update(report) | Operation::Recreate(report) = &diff.operation {
            for item in &report.items {
                println!("      {}", item.path.to_string().dimmed());
            }
        }
    }
    for diff in plan.diffs() {
        for diag in &diff.diagnostics {
            println!("  {} {}: {}", "⚠".yellow(), diff.id, diag);
        }
    }

    let counts = plan.counts();
    println!();
    println!(
        "  {} to create, {} to update, {} to recreate, {} to delete",
        counts.create.to_string().green(),
        counts.update.to_string().yellow(),
        counts.recreate.to_string().red(),
        counts.delete.to_string().red(),
    );
}
