use std::collections::{BTreeMap, BTreeSet};

use serde_json::{json, Value};
use thiserror::Error;

use super::host::{HostError, SceneHost, UndoableMutation};
use super::ids::{ComponentId, ComponentType, IdAllocator, NodeId};
use super::node::{link_data, Component, Node};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    #[error("node id {0} appears more than once")]
    DuplicateNode(NodeId),
    #[error("node {node} references parent {parent} which is not declared before it")]
    UnknownParent { node: NodeId, parent: NodeId },
    #[error("asset node {node} cannot live under scene node {parent}")]
    AssetUnderSceneNode { node: NodeId, parent: NodeId },
    #[error("node {node} declares more than one {ty} component")]
    DuplicateStructuralComponent { node: NodeId, ty: ComponentType },
}

/// Node description used to restore a graph with caller-chosen ids.
#[derive(Debug, Clone)]
pub struct NodeSeed {
    pub id: NodeId,
    pub name: String,
    pub parent: Option<NodeId>,
    pub asset: bool,
    pub components: Vec<(ComponentType, Value)>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UndoRecord {
    pub label: &'static str,
    pub mutation: UndoableMutation,
}

pub fn default_transform_data() -> Value {
    json!({ "position": [0.0, 0.0, 0.0] })
}

/// In-memory arena host. Every node carries a structural `Transform`
/// component at index 0.
#[derive(Debug)]
pub struct SceneGraph {
    node_ids: IdAllocator,
    component_ids: IdAllocator,
    nodes: BTreeMap<NodeId, Node>,
    pinned_nodes: BTreeSet<NodeId>,
    pinned_components: BTreeSet<ComponentId>,
    pending_undo: Vec<UndoRecord>,
    undo_groups: Vec<Vec<UndoRecord>>,
    modified: BTreeSet<NodeId>,
}

impl Default for SceneGraph {
    fn default() -> Self {
        Self {
            node_ids: IdAllocator::starting_at(1),
            component_ids: IdAllocator::starting_at(1),
            nodes: BTreeMap::new(),
            pinned_nodes: BTreeSet::new(),
            pinned_components: BTreeSet::new(),
            pending_undo: Vec::new(),
            undo_groups: Vec::new(),
            modified: BTreeSet::new(),
        }
    }
}

impl SceneGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_seeds(seeds: Vec<NodeSeed>) -> Result<Self, GraphError> {
        let mut graph = Self::default();
        for seed in seeds {
            if graph.nodes.contains_key(&seed.id) {
                return Err(GraphError::DuplicateNode(seed.id));
            }
            if let Some(parent) = seed.parent {
                let parent_node = graph.nodes.get(&parent).ok_or(GraphError::UnknownParent {
                    node: seed.id,
                    parent,
                })?;
                if seed.asset && !parent_node.asset {
                    return Err(GraphError::AssetUnderSceneNode {
                        node: seed.id,
                        parent,
                    });
                }
            }

            let mut components = Vec::with_capacity(seed.components.len() + 1);
            let mut transform_seen = false;
            for (ty, data) in seed.components {
                if ty.is_transform() {
                    if transform_seen {
                        return Err(GraphError::DuplicateStructuralComponent { node: seed.id, ty });
                    }
                    transform_seen = true;
                }
                components.push(Component::new(
                    ComponentId(graph.component_ids.allocate()),
                    ty,
                    data,
                ));
            }
            if !transform_seen {
                components.insert(
                    0,
                    Component::new(
                        ComponentId(graph.component_ids.allocate()),
                        ComponentType::transform(),
                        default_transform_data(),
                    ),
                );
            }

            graph.node_ids.reserve_past(seed.id.0);
            if let Some(parent) = seed.parent {
                if let Some(parent_node) = graph.nodes.get_mut(&parent) {
                    parent_node.children.push(seed.id);
                }
            }
            graph.nodes.insert(
                seed.id,
                Node {
                    id: seed.id,
                    name: seed.name,
                    components,
                    children: Vec::new(),
                    parent: seed.parent,
                    asset: seed.asset,
                },
            );
        }
        Ok(graph)
    }

    /// Seeds in pre-order, so `from_seeds(graph.to_seeds())` restores the
    /// same hierarchy.
    pub fn to_seeds(&self) -> Vec<NodeSeed> {
        let mut seeds = Vec::with_capacity(self.nodes.len());
        for root in self.roots() {
            for id in self.walk(root) {
                if let Some(node) = self.nodes.get(&id) {
                    seeds.push(NodeSeed {
                        id,
                        name: node.name.clone(),
                        parent: node.parent,
                        asset: node.asset,
                        components: node
                            .components
                            .iter()
                            .map(|component| (component.ty.clone(), component.data.clone()))
                            .collect(),
                    });
                }
            }
        }
        seeds
    }

    pub fn spawn(&mut self, name: &str, parent: Option<NodeId>) -> Result<NodeId, HostError> {
        let asset = match parent {
            Some(parent) => self.require(parent)?.asset,
            None => false,
        };
        Ok(self.spawn_internal(name, parent, asset))
    }

    pub fn spawn_asset(&mut self, name: &str) -> NodeId {
        self.spawn_internal(name, None, true)
    }

    fn spawn_internal(&mut self, name: &str, parent: Option<NodeId>, asset: bool) -> NodeId {
        let id = NodeId(self.node_ids.allocate());
        let transform = Component::new(
            ComponentId(self.component_ids.allocate()),
            ComponentType::transform(),
            default_transform_data(),
        );
        self.nodes.insert(
            id,
            Node {
                id,
                name: name.to_string(),
                components: vec![transform],
                children: Vec::new(),
                parent,
                asset,
            },
        );
        if let Some(parent) = parent {
            if let Some(parent_node) = self.nodes.get_mut(&parent) {
                parent_node.children.push(id);
            }
        }
        id
    }

    pub fn attach(
        &mut self,
        node: NodeId,
        ty: impl Into<ComponentType>,
        data: Value,
    ) -> Result<ComponentId, HostError> {
        self.add_component(node, &ty.into(), &data)
    }

    pub fn set_transform(&mut self, node: NodeId, data: Value) -> Result<(), HostError> {
        let transform = self
            .require(node)?
            .transform()
            .map(Component::id)
            .ok_or(HostError::Unsupported("node_without_transform"))?;
        self.set_component_data(node, transform, &data)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn roots(&self) -> Vec<NodeId> {
        self.nodes
            .values()
            .filter(|node| node.parent.is_none())
            .map(Node::id)
            .collect()
    }

    /// Pre-order ids of the subtree rooted at `root`.
    pub fn walk(&self, root: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            if let Some(node) = self.nodes.get(&id) {
                out.push(id);
                stack.extend(node.children.iter().rev().copied());
            }
        }
        out
    }

    pub fn pin_node(&mut self, id: NodeId) {
        self.pinned_nodes.insert(id);
    }

    pub fn pin_component(&mut self, id: ComponentId) {
        self.pinned_components.insert(id);
    }

    pub fn pending_undo(&self) -> &[UndoRecord] {
        &self.pending_undo
    }

    pub fn undo_groups(&self) -> &[Vec<UndoRecord>] {
        &self.undo_groups
    }

    pub fn modified(&self) -> &BTreeSet<NodeId> {
        &self.modified
    }

    fn require(&self, id: NodeId) -> Result<&Node, HostError> {
        self.nodes.get(&id).ok_or(HostError::NodeNotFound(id))
    }

    fn require_mut(&mut self, id: NodeId) -> Result<&mut Node, HostError> {
        self.nodes.get_mut(&id).ok_or(HostError::NodeNotFound(id))
    }

    fn push_undo(&mut self, label: &'static str, mutation: UndoableMutation) {
        self.pending_undo.push(UndoRecord { label, mutation });
    }

    fn clone_subtree(
        &mut self,
        source: NodeId,
        parent: Option<NodeId>,
        asset: bool,
    ) -> Result<NodeId, HostError> {
        let template = self.require(source)?.clone();
        let id = NodeId(self.node_ids.allocate());
        let components = template
            .components
            .iter()
            .map(|component| {
                Component::new(
                    ComponentId(self.component_ids.allocate()),
                    component.ty.clone(),
                    component.data.clone(),
                )
            })
            .collect();
        self.nodes.insert(
            id,
            Node {
                id,
                name: template.name.clone(),
                components,
                children: Vec::new(),
                parent,
                asset,
            },
        );
        if let Some(parent) = parent {
            self.require_mut(parent)?.children.push(id);
        }
        for child in &template.children {
            self.clone_subtree(*child, Some(id), asset)?;
        }
        Ok(id)
    }

    fn remove_subtree(&mut self, id: NodeId) {
        for descendant in self.walk(id) {
            self.nodes.remove(&descendant);
        }
    }

    fn retarget_links(&mut self, from: NodeId, to: NodeId) {
        for node in self.nodes.values_mut() {
            for component in &mut node.components {
                if component.link_target() == Some(from) {
                    component.data = link_data(Some(to));
                }
            }
        }
    }
}

impl SceneHost for SceneGraph {
    fn node_ids(&self) -> Vec<NodeId> {
        self.nodes.keys().copied().collect()
    }

    fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    fn instantiate_subtree(
        &mut self,
        source: NodeId,
        parent: NodeId,
    ) -> Result<NodeId, HostError> {
        let asset = self.require(parent)?.asset;
        self.require(source)?;
        let id = self.clone_subtree(source, Some(parent), asset)?;
        self.modified.insert(parent);
        Ok(id)
    }

    fn destroy_node(&mut self, id: NodeId) -> Result<(), HostError> {
        self.require(id)?;
        if let Some(pinned) = self
            .walk(id)
            .into_iter()
            .find(|descendant| self.pinned_nodes.contains(descendant))
        {
            return Err(HostError::NodePinned(pinned));
        }

        let parent = self.require(id)?.parent;
        if let Some(parent) = parent {
            if let Some(parent_node) = self.nodes.get_mut(&parent) {
                parent_node.children.retain(|child| *child != id);
            }
            self.modified.insert(parent);
        }
        self.remove_subtree(id);
        self.push_undo("destroy node", UndoableMutation::DestroyedNode(id));
        Ok(())
    }

    fn destroy_component(
        &mut self,
        node: NodeId,
        component: ComponentId,
    ) -> Result<(), HostError> {
        if self.pinned_components.contains(&component) {
            return Err(HostError::ComponentPinned { node, component });
        }
        let owner = self.require_mut(node)?;
        let index = owner
            .components
            .iter()
            .position(|candidate| candidate.id == component)
            .ok_or(HostError::ComponentNotFound { node, component })?;
        if owner.components[index].ty.is_transform() {
            return Err(HostError::Unsupported("destroy_transform"));
        }
        owner.components.remove(index);
        self.modified.insert(node);
        self.push_undo(
            "destroy component",
            UndoableMutation::DestroyedComponent { node, component },
        );
        Ok(())
    }

    fn add_component(
        &mut self,
        node: NodeId,
        ty: &ComponentType,
        data: &Value,
    ) -> Result<ComponentId, HostError> {
        if ty.is_transform() && self.require(node)?.transform().is_some() {
            return Err(HostError::Unsupported("duplicate_transform"));
        }
        let id = ComponentId(self.component_ids.allocate());
        self.require_mut(node)?
            .components
            .push(Component::new(id, ty.clone(), data.clone()));
        self.modified.insert(node);
        Ok(id)
    }

    fn set_component_data(
        &mut self,
        node: NodeId,
        component: ComponentId,
        data: &Value,
    ) -> Result<(), HostError> {
        let target = self
            .require_mut(node)?
            .components
            .iter_mut()
            .find(|candidate| candidate.id == component)
            .ok_or(HostError::ComponentNotFound { node, component })?;
        target.data = data.clone();
        self.modified.insert(node);
        Ok(())
    }

    fn set_name(&mut self, node: NodeId, name: &str) -> Result<(), HostError> {
        self.require_mut(node)?.name = name.to_string();
        self.modified.insert(node);
        Ok(())
    }

    fn set_link(&mut self, node: NodeId, target: Option<NodeId>) -> Result<(), HostError> {
        let existing = self.require(node)?.link_component().map(Component::id);
        match existing {
            Some(component) => self.set_component_data(node, component, &link_data(target)),
            None => self
                .add_component(node, &ComponentType::prefab_link(), &link_data(target))
                .map(|_| ()),
        }
    }

    fn resolve_linked_origin(&self, node: NodeId) -> Option<NodeId> {
        self.nodes
            .get(&node)?
            .link_target()
            .filter(|target| *target != node && self.nodes.contains_key(target))
    }

    fn create_asset_root(&mut self, source: NodeId, name: &str) -> Result<NodeId, HostError> {
        let root = self.clone_subtree(source, None, true)?;
        self.require_mut(root)?.name = name.to_string();
        Ok(root)
    }

    fn native_apply(&mut self, scene: NodeId, root: NodeId) -> Result<NodeId, HostError> {
        if !self.require(root)?.asset {
            return Err(HostError::NotAnAsset(root));
        }
        let root_name = self.require(root)?.name.clone();
        let replacement = self.clone_subtree(scene, None, true)?;
        self.require_mut(replacement)?.name = root_name;
        self.remove_subtree(root);
        self.retarget_links(root, replacement);
        self.modified.insert(replacement);
        Ok(replacement)
    }

    fn native_revert(&mut self, scene: NodeId) -> Result<(), HostError> {
        let origin = self
            .resolve_linked_origin(scene)
            .ok_or(HostError::Unsupported("native_revert_without_origin"))?;
        let children = self.require(scene)?.children.clone();
        for child in children {
            self.remove_subtree(child);
        }

        let kept: Vec<Component> = self
            .require(scene)?
            .components
            .iter()
            .filter(|component| component.ty.is_transform() || component.ty.is_prefab_link())
            .cloned()
            .collect();
        let template = self.require(origin)?.clone();
        let mut components = kept;
        for component in &template.components {
            if component.ty.is_transform() || component.ty.is_prefab_link() {
                continue;
            }
            components.push(Component::new(
                ComponentId(self.component_ids.allocate()),
                component.ty.clone(),
                component.data.clone(),
            ));
        }
        let scene_asset = {
            let node = self.require_mut(scene)?;
            node.components = components;
            node.children.clear();
            node.asset
        };
        for child in &template.children {
            self.clone_subtree(*child, Some(scene), scene_asset)?;
        }
        self.modified.insert(scene);
        Ok(())
    }

    fn record_undo(&mut self, label: &'static str, mutation: UndoableMutation) {
        self.push_undo(label, mutation);
    }

    fn mark_modified(&mut self, node: NodeId) {
        self.modified.insert(node);
    }

    fn flush_undo(&mut self) {
        if !self.pending_undo.is_empty() {
            let group = std::mem::take(&mut self.pending_undo);
            self.undo_groups.push(group);
        }
    }
}
