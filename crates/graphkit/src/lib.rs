//! # graphkit
//!
//! A declarative resource graph engine for cloud networking objects.
//!
//! Callers describe a desired set of interdependent resources as a graph of
//! typed nodes; the engine fetches the live state, computes a minimal action
//! plan that respects inter-resource dependencies, and executes it under
//! configurable ordering, concurrency, error-strategy, and timeout contracts.
//!
//! ## Core concepts
//!
//! - **[`ResourceID`]**: `(project, collection, key)` — node identity,
//!   rendered as a self-link URL inside resource bodies.
//! - **[`Resource`]**: version-tagged immutable resource body; mutation goes
//!   through [`Mutable`] and is validated by `freeze()`.
//! - **[`Node`] / [`Graph`]**: desired or observed state of one resource,
//!   collected into an immutable graph with reference edges.
//! - **[`plan`]**: diff of desired against observed state, expressed as
//!   actions wired together by [`Event`]s.
//! - **[`SerialExecutor`] / [`ParallelExecutor`]**: drive actions to
//!   completion; unresolvable dependencies surface as pending actions.
//!
//! ## Flow
//!
//! ```ignore
//! let want: Graph = /* GraphBuilder + TypedBuilder<K> per resource */;
//! let observed = sync(&cloud, &want).await?.graph;
//! let plan = plan(&want, &observed)?;
//! let executor = ParallelExecutor::new(cloud, plan.into_actions(), config)?;
//! let result = executor.run(&cancel).await?;
//! ```

pub mod actions;
pub mod cloud;
pub mod diff;
pub mod exec;
pub mod graph;
pub mod meta;
pub mod node;
pub mod path;
pub mod plan;
pub mod resource;
pub mod sync;
pub mod traits;
pub mod value;

#[cfg(test)]
pub(crate) mod testkind;

pub use cloud::{
    CloudClient, CloudError, FixedVersionResolver, MockCloud, MockOp, ProjectRouter,
    SingleProjectRouter, VersionResolver,
};
pub use diff::{DiffError, NodeDiff, Operation, diff_nodes};
pub use exec::{
    Action, ActionError, ActionKind, ActionMetadata, ErrorStrategy, Event, ExecError, ExecResult,
    ExecutorConfig, GraphvizTracer, ParallelExecutor, ParallelQueue, SerialExecutor, TraceEntry,
    TraceOutcome, Tracer,
};
pub use graph::{Graph, GraphBuilder, GraphError, GraphScope};
pub use meta::{ApiGroup, Key, LinkError, ResourceID, Scope, Version};
pub use node::{Node, NodeBuilder, NodeState, Ownership, TypedBuilder, TypedNode};
pub use path::{Path, PathError, Step};
pub use plan::{Plan, PlanCounts, PlanError, plan};
pub use resource::{
    Mutable, RefError, Resource, ResourceError, ResourceKind, ResourceRef, link_ref,
    value_list_refs, value_str_ref,
};
pub use sync::{SyncError, SyncFailure, SyncOutcome, SyncStrategy, sync, sync_with};
pub use traits::{FieldRole, FieldTraits};
pub use value::{ConversionError, DiffItem, DiffReport};
