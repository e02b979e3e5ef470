use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use crate::graph::{NodeId, SceneHost};

/// Cache of which scene nodes are linked to which root. Only as fresh as
/// the last `rebuild`.
#[derive(Debug, Clone, Default)]
pub struct LinkRegistry {
    instances: BTreeMap<NodeId, BTreeSet<NodeId>>,
}

impl LinkRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn build<H: SceneHost + ?Sized>(host: &H) -> Self {
        let mut registry = Self::new();
        registry.rebuild(host);
        registry
    }

    pub fn rebuild<H: SceneHost + ?Sized>(&mut self, host: &H) {
        self.clear();
        for id in host.node_ids() {
            let carries_link = host
                .node(id)
                .is_some_and(|node| node.link_component().is_some());
            if !carries_link {
                continue;
            }
            if let Some(root) = host.resolve_linked_origin(id) {
                self.instances.entry(root).or_default().insert(id);
            }
        }
        debug!(
            roots = self.instances.len(),
            instances = self.instance_count(),
            "link_registry_rebuilt"
        );
    }

    pub fn instances_of(&self, root: NodeId) -> Vec<NodeId> {
        self.instances
            .get(&root)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn roots(&self) -> Vec<NodeId> {
        self.instances.keys().copied().collect()
    }

    pub fn root_of(&self, instance: NodeId) -> Option<NodeId> {
        self.instances
            .iter()
            .find(|(_, members)| members.contains(&instance))
            .map(|(root, _)| *root)
    }

    pub fn instance_count(&self) -> usize {
        self.instances.values().map(BTreeSet::len).sum()
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    pub fn clear(&mut self) {
        self.instances.clear();
    }
}
