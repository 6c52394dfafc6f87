pub mod apply;
pub mod graph;
pub mod plan;

use crate::cli::PlanArgs;
use crate::spec::{GraphSpec, StateSeed};
use anyhow::Result;
use graphkit::{MockCloud, Plan, SyncOutcome, sync};
use std::sync::Arc;

/// Everything a command needs after loading the input files: the desired
/// graph, the seeded offline cloud, and the plan against observed state.
pub struct PlanContext {
    pub cloud: Arc<MockCloud>,
    pub graph: graphkit::Graph,
    pub plan: Plan,
}

pub async fn load_and_plan(args: &PlanArgs) -> Result<PlanContext> {
    let spec = GraphSpec::load(&args.spec)?;
    let cloud = Arc::new(MockCloud::new());
    if let Some(state) = &args.state {
        StateSeed::load(state)?.apply(&cloud, &spec.project);
    }

    let graph = spec.build_graph()?;
    let SyncOutcome { graph: observed, failures } = sync(cloud.as_ref(), &graph).await?;
    for failure in &failures {
        log::warn!("sync {}: {}", failure.id, failure.error);
    }
    let plan = graphkit::plan(&graph, &observed)?;
    Ok(PlanContext { cloud, graph, plan })
}
