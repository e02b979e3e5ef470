use serde_json::Value;
use thiserror::Error;

use super::ids::{ComponentId, ComponentType, NodeId};
use super::node::{Component, Node};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HostError {
    #[error("node {0} does not exist")]
    NodeNotFound(NodeId),
    #[error("component {component} does not exist on node {node}")]
    ComponentNotFound { node: NodeId, component: ComponentId },
    #[error("node {0} is pinned and cannot be destroyed")]
    NodePinned(NodeId),
    #[error("component {component} on node {node} is pinned and cannot be destroyed")]
    ComponentPinned { node: NodeId, component: ComponentId },
    #[error("node {0} is not an asset root")]
    NotAnAsset(NodeId),
    #[error("unsupported host operation: {0}")]
    Unsupported(&'static str),
}

#[derive(Debug, Clone, PartialEq)]
pub enum UndoableMutation {
    CreatedNode(NodeId),
    DestroyedNode(NodeId),
    DestroyedComponent { node: NodeId, component: ComponentId },
    FullHierarchy(NodeId),
}

/// Operations the synchronizer needs from the environment that owns the
/// scene graph. Node and component lifetimes belong to the host; the
/// synchronizer only requests changes and tolerates refusals.
pub trait SceneHost {
    fn node_ids(&self) -> Vec<NodeId>;

    fn node(&self, id: NodeId) -> Option<&Node>;

    /// Deep clone of `source` created as the last child of `parent`.
    fn instantiate_subtree(&mut self, source: NodeId, parent: NodeId)
        -> Result<NodeId, HostError>;

    fn destroy_node(&mut self, id: NodeId) -> Result<(), HostError>;

    fn destroy_component(&mut self, node: NodeId, component: ComponentId)
        -> Result<(), HostError>;

    fn add_component(
        &mut self,
        node: NodeId,
        ty: &ComponentType,
        data: &Value,
    ) -> Result<ComponentId, HostError>;

    fn set_component_data(
        &mut self,
        node: NodeId,
        component: ComponentId,
        data: &Value,
    ) -> Result<(), HostError>;

    fn set_name(&mut self, node: NodeId, name: &str) -> Result<(), HostError>;

    /// Points the node's link edge at `target`, adding a link component when
    /// the node has none.
    fn set_link(&mut self, node: NodeId, target: Option<NodeId>) -> Result<(), HostError>;

    /// What the node was instantiated from, if that still resolves to a
    /// live root other than the node itself.
    fn resolve_linked_origin(&self, node: NodeId) -> Option<NodeId>;

    fn is_asset(&self, node: NodeId) -> bool {
        self.node(node).is_some_and(Node::is_asset)
    }

    /// Clones `source` into a new detached asset root named `name`.
    fn create_asset_root(&mut self, source: NodeId, name: &str) -> Result<NodeId, HostError>;

    /// Replaces the asset `root` with the content of `scene`. May produce a
    /// new root identity.
    fn native_apply(&mut self, _scene: NodeId, _root: NodeId) -> Result<NodeId, HostError> {
        Err(HostError::Unsupported("native_apply"))
    }

    fn native_revert(&mut self, _scene: NodeId) -> Result<(), HostError> {
        Err(HostError::Unsupported("native_revert"))
    }

    fn record_undo(&mut self, _label: &'static str, _mutation: UndoableMutation) {}

    fn mark_modified(&mut self, _node: NodeId) {}

    fn flush_undo(&mut self) {}

    fn component_data_equal(&self, a: &Component, b: &Component) -> bool {
        a.ty() == b.ty() && a.data() == b.data()
    }
}
