//! Execution tracing and dot-graph rendering.
//!
//! Tracers receive one entry per action attempt (and one per action left
//! pending at the end of a run). They must be self-synchronizing: parallel
//! executor workers record concurrently.

use crate::exec::action::{Action, ActionKind};
use crate::exec::event::Event;
use std::fmt;
use std::fmt::Write as _;
use std::sync::Mutex;
use std::time::Duration;

/// How an action attempt ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TraceOutcome {
    Success,
    /// Synthetic success: the run was skipped and declared events emitted.
    DryRun,
    Error(String),
    /// Never ran; left pending when the executor returned.
    Pending,
}

/// One event delivery observed while signaling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceSignal {
    pub event: Event,
    /// Name of the action that received the event.
    pub action: String,
}

/// Record of one action attempt.
#[derive(Debug, Clone)]
pub struct TraceEntry {
    pub name: String,
    pub kind: ActionKind,
    pub wants: Vec<Event>,
    pub emits: Vec<Event>,
    pub outcome: TraceOutcome,
    pub duration: Duration,
    pub signaled: Vec<TraceSignal>,
}

impl TraceEntry {
    pub fn new(
        action: &dyn Action,
        outcome: TraceOutcome,
        duration: Duration,
        signaled: Vec<TraceSignal>,
    ) -> TraceEntry {
        TraceEntry {
            name: action.metadata().name.clone(),
            kind: action.metadata().kind,
            wants: action.wants(),
            emits: action.emits(),
            outcome,
            duration,
            signaled,
        }
    }
}

/// Sink for trace entries.
pub trait Tracer: Send + Sync + fmt::Debug {
    fn record(&self, entry: TraceEntry);
}

/// Accumulates entries and renders them as a Graphviz digraph, one node per
/// action, one edge per matched want/emit pair, colored by outcome.
#[derive(Debug, Default)]
pub struct GraphvizTracer {
    entries: Mutex<Vec<TraceEntry>>,
}

impl GraphvizTracer {
    pub fn new() -> GraphvizTracer {
        GraphvizTracer::default()
    }

    pub fn entries(&self) -> Vec<TraceEntry> {
        self.entries.lock().unwrap().clone()
    }

    pub fn to_dot(&self) -> String {
        let entries = self.entries.lock().unwrap();
        let mut out = String::from("digraph actions {\n  rankdir=LR;\n  node [shape=box];\n");
        for (i, entry) in entries.iter().enumerate() {
            let color = match &entry.outcome {
                TraceOutcome::Success => "green",
                TraceOutcome::DryRun => "blue",
                TraceOutcome::Error(_) => "red",
                TraceOutcome::Pending => "gray",
            };
            let label = match &entry.outcome {
                TraceOutcome::Error(err) => format!("{}\\n{}", entry.name, err),
                _ => entry.name.clone(),
            };
            let _ = writeln!(out, "  n{i} [label=\"{label}\" color={color}];");
        }
        for (i, from) in entries.iter().enumerate() {
            for emit in &from.emits {
                for (j, to) in entries.iter().enumerate() {
                    if i != j && to.wants.contains(emit) {
                        let _ = writeln!(out, "  n{i} -> n{j} [label=\"{emit}\"];");
                    }
                }
            }
        }
        out.push_str("}\n");
        out
    }
}

impl Tracer for GraphvizTracer {
    fn record(&self, entry: TraceEntry) {
        self.entries.lock().unwrap().push(entry);
    }
}

impl fmt::Display for GraphvizTracer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_dot())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(name: &str, wants: Vec<Event>, emits: Vec<Event>, outcome: TraceOutcome) -> TraceEntry {
        TraceEntry {
            name: name.to_string(),
            kind: ActionKind::Meta,
            wants,
            emits,
            outcome,
            duration: Duration::ZERO,
            signaled: Vec::new(),
        }
    }

    #[test]
    fn test_dot_output_edges_and_colors() {
        let tracer = GraphvizTracer::new();
        tracer.record(entry(
            "A",
            vec![],
            vec![Event::str("a")],
            TraceOutcome::Success,
        ));
        tracer.record(entry(
            "B",
            vec![Event::str("a")],
            vec![],
            TraceOutcome::Error("boom".into()),
        ));
        tracer.record(entry("C", vec![Event::str("b")], vec![], TraceOutcome::Pending));

        let dot = tracer.to_dot();
        assert!(dot.contains("n0 [label=\"A\" color=green]"));
        assert!(dot.contains("n1 [label=\"B\\nboom\" color=red]"));
        assert!(dot.contains("n2 [label=\"C\" color=gray]"));
        assert!(dot.contains("n0 -> n1 [label=\"a\"]"));
        assert!(!dot.contains("n0 -> n2"));
    }
}
