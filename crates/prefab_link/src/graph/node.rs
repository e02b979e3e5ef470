use serde_json::{json, Value};

use super::ids::{ComponentId, ComponentType, NodeId};

#[derive(Debug, Clone, PartialEq)]
pub struct Component {
    pub(crate) id: ComponentId,
    pub(crate) ty: ComponentType,
    pub(crate) data: Value,
}

impl Component {
    pub fn new(id: ComponentId, ty: ComponentType, data: Value) -> Self {
        Self { id, ty, data }
    }

    pub fn id(&self) -> ComponentId {
        self.id
    }

    pub fn ty(&self) -> &ComponentType {
        &self.ty
    }

    pub fn data(&self) -> &Value {
        &self.data
    }

    /// Target of the link edge when this is a link component.
    pub fn link_target(&self) -> Option<NodeId> {
        if !self.ty.is_prefab_link() {
            return None;
        }
        self.data
            .get("target")
            .and_then(Value::as_u64)
            .map(NodeId)
    }
}

pub fn link_data(target: Option<NodeId>) -> Value {
    json!({ "target": target.map(|id| id.0) })
}

#[derive(Debug, Clone)]
pub struct Node {
    pub(crate) id: NodeId,
    pub(crate) name: String,
    pub(crate) components: Vec<Component>,
    pub(crate) children: Vec<NodeId>,
    pub(crate) parent: Option<NodeId>,
    pub(crate) asset: bool,
}

impl Node {
    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn components(&self) -> &[Component] {
        &self.components
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn is_asset(&self) -> bool {
        self.asset
    }

    pub fn component_of_type(&self, ty: &ComponentType) -> Option<&Component> {
        self.components.iter().find(|component| &component.ty == ty)
    }

    pub fn has_component(&self, ty: &ComponentType) -> bool {
        self.component_of_type(ty).is_some()
    }

    pub fn transform(&self) -> Option<&Component> {
        self.components
            .iter()
            .find(|component| component.ty.is_transform())
    }

    pub fn link_component(&self) -> Option<&Component> {
        self.components
            .iter()
            .find(|component| component.ty.is_prefab_link())
    }

    pub fn link_target(&self) -> Option<NodeId> {
        self.link_component().and_then(Component::link_target)
    }
}
