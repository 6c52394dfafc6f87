//! Test helpers: actions built from a compact graph notation.
//!
//! `"A -> B -> C; A -> C"` declares actions A, B, C where an edge `X -> Y`
//! means Y waits for X's event. A `!` prefix (`"A -> !B"`) makes the action
//! fail when run.

use crate::cloud::CloudClient;
use crate::exec::action::{Action, ActionError, ActionKind, ActionMetadata, EventWaiter};
use crate::exec::event::Event;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug)]
pub(crate) struct TestAction {
    metadata: ActionMetadata,
    waiter: EventWaiter,
    events: Vec<Event>,
    fail: bool,
    delay: Duration,
}

#[async_trait]
impl Action for TestAction {
    fn metadata(&self) -> &ActionMetadata {
        &self.metadata
    }

    fn wants(&self) -> Vec<Event> {
        self.waiter.wants()
    }

    fn pending_events(&self) -> Vec<Event> {
        self.waiter.pending()
    }

    fn emits(&self) -> Vec<Event> {
        self.events.clone()
    }

    fn can_run(&self) -> bool {
        self.waiter.can_run()
    }

    fn signal(&self, event: &Event) -> bool {
        self.waiter.signal(event)
    }

    async fn run(&self, _cloud: &dyn CloudClient) -> Result<Vec<Event>, ActionError> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.fail {
            return Err(ActionError::Failed(format!(
                "action {} failed",
                self.metadata.name
            )));
        }
        Ok(self.events.clone())
    }
}

/// An action with explicit wants/emits and an artificial run duration.
pub(crate) fn delayed_action(
    name: &str,
    wants: Vec<Event>,
    emits: Vec<Event>,
    delay: Duration,
) -> Arc<dyn Action> {
    Arc::new(TestAction {
        metadata: ActionMetadata::named(name, ActionKind::Meta),
        waiter: EventWaiter::new(wants),
        events: emits,
        fail: false,
        delay,
    })
}

/// Build the action set for a graph string.
pub(crate) fn actions_from_graph(graph: &str) -> Vec<Arc<dyn Action>> {
    // First-appearance order of names, with wants collected per node.
    let mut order: Vec<String> = Vec::new();
    let mut wants: Vec<(String, Vec<Event>)> = Vec::new();
    let mut failing: Vec<String> = Vec::new();

    let mut node = |raw: &str, wants_list: &mut Vec<(String, Vec<Event>)>,
                    order: &mut Vec<String>,
                    failing: &mut Vec<String>|
     -> String {
        let name = raw.trim_start_matches('!').to_string();
        if raw.starts_with('!') && !failing.contains(&name) {
            failing.push(name.clone());
        }
        if !order.contains(&name) {
            order.push(name.clone());
            wants_list.push((name.clone(), Vec::new()));
        }
        name
    };

    for chain in graph.split(';') {
        let chain = chain.trim();
        if chain.is_empty() {
            continue;
        }
        let mut prev: Option<String> = None;
        for raw in chain.split("->") {
            let name = node(raw.trim(), &mut wants, &mut order, &mut failing);
            if let Some(prev) = prev {
                let entry = wants
                    .iter_mut()
                    .find(|(n, _)| *n == name)
                    .expect("node registered above");
                let event = Event::str(prev);
                if !entry.1.contains(&event) {
                    entry.1.push(event);
                }
            }
            prev = Some(name);
        }
    }

    order
        .into_iter()
        .map(|name| {
            let want = wants
                .iter()
                .find(|(n, _)| *n == name)
                .map(|(_, w)| w.clone())
                .unwrap_or_default();
            Arc::new(TestAction {
                metadata: ActionMetadata::named(&name, ActionKind::Meta),
                waiter: EventWaiter::new(want),
                events: vec![Event::str(&name)],
                fail: failing.contains(&name),
                delay: Duration::ZERO,
            }) as Arc<dyn Action>
        })
        .collect()
}

/// Sorted action names, for comparisons.
pub(crate) fn names(actions: &[Arc<dyn Action>]) -> Vec<String> {
    let mut names: Vec<String> = actions
        .iter()
        .map(|a| a.metadata().name.clone())
        .collect();
    names.sort();
    names
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_graph_parsing() {
        let actions = actions_from_graph("A -> !B -> C; A -> C");
        assert_eq!(names(&actions), vec!["A", "B", "C"]);

        let a = &actions[0];
        let b = &actions[1];
        let c = &actions[2];
        assert!(a.can_run());
        assert!(!b.can_run());
        assert_eq!(b.wants(), vec![Event::str("A")]);
        assert_eq!(c.wants(), vec![Event::str("B"), Event::str("A")]);
    }

    #[test]
    fn test_empty_graph() {
        assert!(actions_from_graph("").is_empty());
        assert!(actions_from_graph("  ;  ").is_empty());
    }

    #[tokio::test]
    async fn test_failing_action() {
        let actions = actions_from_graph("!A");
        let cloud = crate::cloud::MockCloud::new();
        let err = actions[0].run(&cloud).await.unwrap_err();
        assert!(matches!(err, ActionError::Failed(_)));
    }
}
