//! `lattice graph` - dump the planned action graph as Graphviz dot.

use super::load_and_plan;
use crate::cli::PlanArgs;
use anyhow::Result;

pub async fn run(args: PlanArgs) -> Result<()> {
    let ctx = load_and_plan(&args).await?;
    print!("{}", ctx.plan.graphviz());
    Ok(())
}
