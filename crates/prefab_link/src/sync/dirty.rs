use std::collections::HashMap;
use std::time::Duration;

use crate::graph::{Component, Node, NodeId, SceneHost};

use super::config::SyncConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComparisonOptions {
    pub compare_names: bool,
    /// Ignore the structural component on the two top nodes.
    pub ignore_top_transform: bool,
}

impl ComparisonOptions {
    pub fn from_config(config: &SyncConfig) -> Self {
        Self {
            compare_names: config.change_names,
            ignore_top_transform: config.skip_top_transform,
        }
    }
}

/// Deep comparison of two subtrees. Link components on the top pair are
/// always ignored since they describe the relation being checked.
pub fn subtrees_equal<H: SceneHost + ?Sized>(
    host: &H,
    a: NodeId,
    b: NodeId,
    options: ComparisonOptions,
) -> bool {
    match (host.node(a), host.node(b)) {
        (Some(left), Some(right)) => nodes_equal(host, left, right, options, true),
        _ => false,
    }
}

fn nodes_equal<H: SceneHost + ?Sized>(
    host: &H,
    left: &Node,
    right: &Node,
    options: ComparisonOptions,
    top: bool,
) -> bool {
    if options.compare_names && left.name() != right.name() {
        return false;
    }

    let compared = |component: &&Component| {
        if !top {
            return true;
        }
        !(component.ty().is_prefab_link()
            || (options.ignore_top_transform && component.ty().is_transform()))
    };
    let left_components: Vec<&Component> = left.components().iter().filter(compared).collect();
    let right_components: Vec<&Component> = right.components().iter().filter(compared).collect();
    if left_components.len() != right_components.len() {
        return false;
    }
    // Component order is not compared: adding requirements first may
    // reorder a reconciled node.
    let mut unmatched = right_components;
    for l in left_components {
        match unmatched
            .iter()
            .position(|r| l.ty() == r.ty() && host.component_data_equal(l, r))
        {
            Some(index) => {
                unmatched.swap_remove(index);
            }
            None => return false,
        }
    }

    if left.children().len() != right.children().len() {
        return false;
    }
    left.children()
        .iter()
        .zip(right.children())
        .all(|(l, r)| match (host.node(*l), host.node(*r)) {
            (Some(l), Some(r)) => nodes_equal(host, l, r, options, false),
            _ => false,
        })
}

/// True when `node`'s subtree differs from its linked root. Nodes without a
/// resolvable root are never dirty.
pub fn compute_dirty<H: SceneHost + ?Sized>(host: &H, node: NodeId, config: &SyncConfig) -> bool {
    match host.resolve_linked_origin(node) {
        Some(root) => !subtrees_equal(host, node, root, ComparisonOptions::from_config(config)),
        None => false,
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct DirtyState {
    dirty: bool,
    last_checked: Option<Duration>,
}

/// Cached dirty flags with per-node rate limiting. Times are offsets from
/// an arbitrary start, e.g. time since the host started.
#[derive(Debug, Default)]
pub struct DirtyTracker {
    states: HashMap<NodeId, DirtyState>,
}

impl DirtyTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Recomputes the flag if the node's check interval has elapsed and
    /// returns the (possibly cached) result.
    pub fn poll<H: SceneHost + ?Sized>(
        &mut self,
        host: &H,
        node: NodeId,
        config: &SyncConfig,
        now: Duration,
    ) -> bool {
        let state = self.states.entry(node).or_default();
        let due = match (config.dirty_check_interval(), state.last_checked) {
            (None, _) => false,
            (Some(_), None) => true,
            (Some(interval), Some(last)) => now.saturating_sub(last) > interval,
        };
        if due {
            state.dirty = compute_dirty(host, node, config);
            state.last_checked = Some(now);
        }
        state.dirty
    }

    /// Manual check, ignoring the rate limit.
    pub fn refresh<H: SceneHost + ?Sized>(
        &mut self,
        host: &H,
        node: NodeId,
        config: &SyncConfig,
        now: Duration,
    ) -> bool {
        let dirty = compute_dirty(host, node, config);
        self.states.insert(
            node,
            DirtyState {
                dirty,
                last_checked: Some(now),
            },
        );
        dirty
    }

    pub fn is_dirty(&self, node: NodeId) -> bool {
        self.states.get(&node).is_some_and(|state| state.dirty)
    }

    pub fn dirty_nodes(&self) -> Vec<NodeId> {
        let mut nodes: Vec<NodeId> = self
            .states
            .iter()
            .filter(|(_, state)| state.dirty)
            .map(|(id, _)| *id)
            .collect();
        nodes.sort();
        nodes
    }

    pub fn retain_live<H: SceneHost + ?Sized>(&mut self, host: &H) {
        self.states.retain(|id, _| host.node(*id).is_some());
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::graph::SceneGraph;

    fn linked_pair() -> (SceneGraph, NodeId, NodeId) {
        let mut graph = SceneGraph::new();
        let root = graph.spawn_asset("lamp");
        graph.attach(root, "Light", json!({ "range": 5 })).expect("light");
        let scene = graph.spawn("lamp", None).expect("scene");
        graph.set_link(scene, Some(root)).expect("link");
        graph.attach(scene, "Light", json!({ "range": 5 })).expect("light");
        (graph, root, scene)
    }

    #[test]
    fn identical_content_is_clean_despite_link_and_transform() {
        let (mut graph, _, scene) = linked_pair();
        graph
            .set_transform(scene, json!({ "position": [4.0, 0.0, 1.0] }))
            .expect("move");
        assert!(!compute_dirty(&graph, scene, &SyncConfig::default()));

        let strict = SyncConfig {
            skip_top_transform: false,
            ..SyncConfig::default()
        };
        assert!(compute_dirty(&graph, scene, &strict));
    }

    #[test]
    fn data_change_marks_dirty() {
        let (mut graph, _, scene) = linked_pair();
        let light = graph.node(scene).expect("scene").components()[2].id();
        graph
            .set_component_data(scene, light, &json!({ "range": 9 }))
            .expect("edit");
        assert!(compute_dirty(&graph, scene, &SyncConfig::default()));
    }

    #[test]
    fn extra_child_marks_dirty() {
        let (mut graph, _, scene) = linked_pair();
        graph.spawn("bulb", Some(scene)).expect("child");
        assert!(compute_dirty(&graph, scene, &SyncConfig::default()));
    }

    #[test]
    fn name_difference_only_counts_when_names_sync() {
        let (mut graph, _, scene) = linked_pair();
        graph.set_name(scene, "lamp (1)").expect("rename");
        assert!(compute_dirty(&graph, scene, &SyncConfig::default()));
        let ignore_names = SyncConfig {
            change_names: false,
            ..SyncConfig::default()
        };
        assert!(!compute_dirty(&graph, scene, &ignore_names));
    }

    #[test]
    fn component_order_is_not_significant() {
        let (mut graph, root, scene) = linked_pair();
        graph.attach(root, "Rigidbody", json!({ "mass": 1 })).expect("rb");
        graph.attach(root, "Collider", json!({})).expect("col");
        graph.attach(scene, "Collider", json!({})).expect("col");
        graph.attach(scene, "Rigidbody", json!({ "mass": 1 })).expect("rb");
        assert!(!compute_dirty(&graph, scene, &SyncConfig::default()));
    }

    #[test]
    fn unlinked_node_is_never_dirty() {
        let mut graph = SceneGraph::new();
        let loose = graph.spawn("loose", None).expect("spawn");
        assert!(!compute_dirty(&graph, loose, &SyncConfig::default()));
    }

    #[test]
    fn poll_is_rate_limited() {
        let (mut graph, _, scene) = linked_pair();
        let config = SyncConfig::default();
        let mut tracker = DirtyTracker::new();

        assert!(!tracker.poll(&graph, scene, &config, Duration::from_millis(0)));
        graph.spawn("bulb", Some(scene)).expect("child");

        assert!(!tracker.poll(&graph, scene, &config, Duration::from_millis(500)));
        assert!(tracker.poll(&graph, scene, &config, Duration::from_millis(1_200)));
        assert_eq!(tracker.dirty_nodes(), vec![scene]);
    }

    #[test]
    fn zero_rate_only_updates_on_refresh() {
        let (mut graph, _, scene) = linked_pair();
        let config = SyncConfig {
            dirty_checks_per_second: 0.0,
            ..SyncConfig::default()
        };
        let mut tracker = DirtyTracker::new();
        graph.spawn("bulb", Some(scene)).expect("child");

        assert!(!tracker.poll(&graph, scene, &config, Duration::from_secs(10)));
        assert!(tracker.refresh(&graph, scene, &config, Duration::from_secs(10)));
        assert!(tracker.is_dirty(scene));
    }

    #[test]
    fn retain_live_forgets_destroyed_nodes() {
        let (mut graph, _, scene) = linked_pair();
        let mut tracker = DirtyTracker::new();
        tracker.refresh(&graph, scene, &SyncConfig::default(), Duration::ZERO);
        graph.destroy_node(scene).expect("destroy");
        tracker.retain_live(&graph);
        assert!(tracker.dirty_nodes().is_empty());
        assert!(!tracker.is_dirty(scene));
    }
}
