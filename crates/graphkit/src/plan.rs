//! The planner: desired graph + observed graph → dependency-ordered actions.
//!
//! Ordering is derived from the reference edges, never hand-coded per type:
//! creates wait for their referents to exist, deletes wait for their
//! referrers to let go, and recreates are split into a delete and a create
//! joined by an internal event. Resources already in their desired state
//! still contribute an event-only action so dependents' waits resolve.

use crate::actions::{CreateAction, DeleteAction, EventAction, UpdateAction};
use crate::diff::{DiffError, NodeDiff, Operation, diff_nodes};
use crate::exec::Event;
use crate::exec::action::Action;
use crate::graph::Graph;
use crate::meta::ResourceID;
use crate::node::{Node, NodeState, Ownership};
use std::collections::HashMap;
use std::fmt;
use std::fmt::Write as _;
use std::sync::Arc;
use thiserror::Error;

/// Planner failure.
#[derive(Debug, Error)]
pub enum PlanError {
    #[error(transparent)]
    Diff(#[from] DiffError),
    #[error("{id}: resource body is missing")]
    MissingBody { id: ResourceID },
}

/// Per-operation counts, for display.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlanCounts {
    pub create: usize,
    pub update: usize,
    pub recreate: usize,
    pub delete: usize,
    pub nop: usize,
}

impl PlanCounts {
    pub fn changes(&self) -> usize {
        self.create + self.update + self.recreate + self.delete
    }
}

/// An ordered action set plus the per-node diffs it was derived from.
#[derive(Debug)]
pub struct Plan {
    actions: Vec<Arc<dyn Action>>,
    diffs: Vec<NodeDiff>,
}

impl Plan {
    pub fn actions(&self) -> &[Arc<dyn Action>] {
        &self.actions
    }

    pub fn into_actions(self) -> Vec<Arc<dyn Action>> {
        self.actions
    }

    pub fn diffs(&self) -> &[NodeDiff] {
        &self.diffs
    }

    /// True when the desired graph is already satisfied.
    pub fn is_noop(&self) -> bool {
        self.diffs.iter().all(|d| d.operation.is_nop())
    }

    pub fn counts(&self) -> PlanCounts {
        let mut counts = PlanCounts::default();
        for diff in &self.diffs {
            match diff.operation {
                Operation::Nop => counts.nop += 1,
                Operation::Create => counts.create += 1,
                Operation::Update(_) => counts.update += 1,
                Operation::Recreate(_) => counts.recreate += 1,
                Operation::Delete => counts.delete += 1,
            }
        }
        counts
    }

    /// Dot-graph of the planned actions and their event dependencies.
    pub fn graphviz(&self) -> String {
        let mut out = String::from("digraph plan {\n  rankdir=LR;\n  node [shape=box];\n");
        for (i, action) in self.actions.iter().enumerate() {
            let _ = writeln!(out, "  n{i} [label=\"{}\"];", action.metadata().name);
        }
        for (i, from) in self.actions.iter().enumerate() {
            for emit in from.emits() {
                for (j, to) in self.actions.iter().enumerate() {
                    if i != j && to.wants().contains(&emit) {
                        let _ = writeln!(out, "  n{i} -> n{j} [label=\"{emit}\"];");
                    }
                }
            }
        }
        out.push_str("}\n");
        out
    }
}

impl fmt::Display for Plan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let counts = self.counts();
        writeln!(
            f,
            "plan: {} to create, {} to update, {} to recreate, {} to delete, {} unchanged",
            counts.create, counts.update, counts.recreate, counts.delete, counts.nop
        )?;
        for diff in &self.diffs {
            if diff.operation.is_nop() && diff.diagnostics.is_empty() {
                continue;
            }
            writeln!(f, "  {} {}", diff.operation, diff.id)?;
            for diag in &diff.diagnostics {
                writeln!(f, "    note: {diag}")?;
            }
        }
        Ok(())
    }
}

/// Diff every node and derive the action set with its event wiring.
pub fn plan(want: &Graph, observed: &Graph) -> Result<Plan, PlanError> {
    let mut diffs: Vec<NodeDiff> = Vec::with_capacity(want.len());
    for node in want.all() {
        let got = observed.get(node.id());
        diffs.push(diff_nodes(node, got)?);
    }
    let ops: HashMap<&ResourceID, &Operation> =
        diffs.iter().map(|d| (&d.id, &d.operation)).collect();

    let mut actions: Vec<Arc<dyn Action>> = Vec::new();
    for (node, diff) in want.all().zip(diffs.iter()) {
        actions.extend(node_actions(node, diff, observed, &ops)?);
    }

    Ok(Plan { actions, diffs })
}

fn node_actions(
    node: &dyn Node,
    diff: &NodeDiff,
    observed: &Graph,
    ops: &HashMap<&ResourceID, &Operation>,
) -> Result<Vec<Arc<dyn Action>>, PlanError> {
    let id = node.id().clone();
    let version = node.version();

    let actions: Vec<Arc<dyn Action>> = match &diff.operation {
        Operation::Nop => {
            let observed_state = observed
                .get(&id)
                .map(|n| n.state())
                .unwrap_or(NodeState::DoesNotExist);
            // Satisfied nodes still publish their state so dependents'
            // waits resolve. External resources are assumed present.
            if node.ownership() == Ownership::External
                || (node.state() == NodeState::Exists && observed_state == NodeState::Exists)
            {
                vec![Arc::new(EventAction::new(
                    id.clone(),
                    vec![Event::Exists(id)],
                ))]
            } else if node.state() == NodeState::DoesNotExist
                && observed_state == NodeState::DoesNotExist
            {
                vec![Arc::new(EventAction::new(
                    id.clone(),
                    vec![Event::NotExists(id)],
                ))]
            } else {
                Vec::new()
            }
        }
        Operation::Create => {
            let body = node
                .resource_value()
                .cloned()
                .ok_or(PlanError::MissingBody { id: id.clone() })?;
            vec![Arc::new(CreateAction::new(
                id.clone(),
                version,
                body,
                referent_waits(node),
                vec![Event::Exists(id)],
            ))]
        }
        Operation::Update(_) => {
            let body = diff
                .merged
                .clone()
                .or_else(|| node.resource_value().cloned())
                .ok_or(PlanError::MissingBody { id: id.clone() })?;

            // Added references impose a wait; removed ones release a wait
            // that the referent's delete may be blocked on.
            let observed_refs: Vec<&ResourceID> = observed
                .get(&id)
                .map(|n| n.out_refs().iter().map(|r| &r.to).collect())
                .unwrap_or_default();
            let mut wants = Vec::new();
            for edge in node.out_refs() {
                if !observed_refs.contains(&&edge.to) {
                    push_unique(&mut wants, Event::Exists(edge.to.clone()));
                }
            }
            let mut emits = vec![Event::Exists(id.clone())];
            let desired_refs: Vec<&ResourceID> =
                node.out_refs().iter().map(|r| &r.to).collect();
            for dropped in observed_refs
                .iter()
                .filter(|to| !desired_refs.contains(to))
            {
                push_unique(
                    &mut emits,
                    Event::RefDropped {
                        from: id.clone(),
                        to: (*dropped).clone(),
                    },
                );
            }
            vec![Arc::new(UpdateAction::new(id, version, body, wants, emits))]
        }
        Operation::Delete => {
            vec![Arc::new(DeleteAction::new(
                id.clone(),
                version,
                referrer_waits(&id, observed, ops, false),
                vec![Event::NotExists(id)],
            ))]
        }
        Operation::Recreate(_) => {
            let body = diff
                .merged
                .clone()
                .or_else(|| node.resource_value().cloned())
                .ok_or(PlanError::MissingBody { id: id.clone() })?;
            // Referrers that keep their reference through the recreate do
            // not block the delete half; the window of absence is inherent
            // to recreating in place.
            let delete = DeleteAction::new(
                id.clone(),
                version,
                referrer_waits(&id, observed, ops, true),
                vec![Event::NotExists(id.clone()), Event::Recreated(id.clone())],
            );
            let mut create_wants = vec![Event::Recreated(id.clone())];
            for event in referent_waits(node) {
                push_unique(&mut create_wants, event);
            }
            let create = CreateAction::new(
                id.clone(),
                version,
                body,
                create_wants,
                vec![Event::Exists(id)],
            );
            vec![Arc::new(delete), Arc::new(create)]
        }
    };
    Ok(actions)
}

/// Events a node's create waits for: every referent must exist.
fn referent_waits(node: &dyn Node) -> Vec<Event> {
    let mut wants = Vec::new();
    for edge in node.out_refs() {
        push_unique(&mut wants, Event::Exists(edge.to.clone()));
    }
    wants
}

/// Events a node's delete waits for: every observed referrer must have been
/// deleted or have dropped its reference. With `recreating`, referrers that
/// keep their reference are skipped.
fn referrer_waits(
    id: &ResourceID,
    observed: &Graph,
    ops: &HashMap<&ResourceID, &Operation>,
    recreating: bool,
) -> Vec<Event> {
    let mut wants = Vec::new();
    for edge in observed.in_refs(id) {
        let holder = &edge.from;
        match ops.get(holder) {
            Some(Operation::Delete) | Some(Operation::Recreate(_)) => {
                push_unique(&mut wants, Event::NotExists(holder.clone()));
            }
            _ if recreating => {}
            _ => {
                // Satisfied only if the holder's update actually drops the
                // reference; otherwise this wait surfaces the conflict as a
                // pending action.
                push_unique(
                    &mut wants,
                    Event::RefDropped {
                        from: holder.clone(),
                        to: id.clone(),
                    },
                );
            }
        }
    }
    wants
}

fn push_unique(events: &mut Vec<Event>, event: Event) {
    if !events.contains(&event) {
        events.push(event);
    }
}
