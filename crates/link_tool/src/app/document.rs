use std::collections::HashSet;
use std::fs;
use std::path::Path;

use prefab_link::graph::{ComponentType, NodeId, NodeSeed, SceneGraph};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use super::atomic_io::write_text_atomic;
use super::error::{parse_json, ToolError};

pub(crate) const SCENE_DOCUMENT_VERSION: u32 = 1;

/// On-disk scene: nodes in pre-order, parents before children.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct SceneDocument {
    pub(crate) version: u32,
    pub(crate) nodes: Vec<NodeRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct NodeRecord {
    pub(crate) id: NodeId,
    pub(crate) name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) parent: Option<NodeId>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub(crate) asset: bool,
    #[serde(default)]
    pub(crate) components: Vec<ComponentRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct ComponentRecord {
    #[serde(rename = "type")]
    pub(crate) ty: ComponentType,
    #[serde(default)]
    pub(crate) data: Value,
}

fn is_false(value: &bool) -> bool {
    !*value
}

impl SceneDocument {
    pub(crate) fn from_graph(graph: &SceneGraph) -> Self {
        let nodes = graph
            .to_seeds()
            .into_iter()
            .map(|seed| NodeRecord {
                id: seed.id,
                name: seed.name,
                parent: seed.parent,
                asset: seed.asset,
                components: seed
                    .components
                    .into_iter()
                    .map(|(ty, data)| ComponentRecord { ty, data })
                    .collect(),
            })
            .collect();
        Self {
            version: SCENE_DOCUMENT_VERSION,
            nodes,
        }
    }

    pub(crate) fn into_graph(self) -> Result<SceneGraph, ToolError> {
        let seeds = self
            .nodes
            .into_iter()
            .map(|record| NodeSeed {
                id: record.id,
                name: record.name,
                parent: record.parent,
                asset: record.asset,
                components: record
                    .components
                    .into_iter()
                    .map(|component| (component.ty, component.data))
                    .collect(),
            })
            .collect();
        Ok(SceneGraph::from_seeds(seeds)?)
    }

    fn validate(&self) -> Result<(), ToolError> {
        if self.version != SCENE_DOCUMENT_VERSION {
            return Err(ToolError::validation(
                "version",
                format!(
                    "expected {SCENE_DOCUMENT_VERSION}, got {}",
                    self.version
                ),
            ));
        }

        let ids: HashSet<NodeId> = self.nodes.iter().map(|node| node.id).collect();
        for (index, node) in self.nodes.iter().enumerate() {
            if node.name.trim().is_empty() {
                return Err(ToolError::validation(
                    format!("nodes[{index}].name"),
                    "must not be empty",
                ));
            }
            for (slot, component) in node.components.iter().enumerate() {
                let path = format!("nodes[{index}].components[{slot}]");
                if component.ty.as_str().trim().is_empty() {
                    return Err(ToolError::validation(format!("{path}.type"), "must not be empty"));
                }
                if component.ty.is_prefab_link() {
                    validate_link_data(&component.data, &ids, &format!("{path}.data"))?;
                }
            }
        }
        Ok(())
    }
}

fn validate_link_data(data: &Value, ids: &HashSet<NodeId>, path: &str) -> Result<(), ToolError> {
    let Some(object) = data.as_object() else {
        return Err(ToolError::validation(path, "expected an object with a 'target' field"));
    };
    match object.get("target") {
        None | Some(Value::Null) => Ok(()),
        Some(Value::Number(number)) => match number.as_u64() {
            Some(target) if ids.contains(&NodeId(target)) => Ok(()),
            Some(target) => Err(ToolError::validation(
                format!("{path}.target"),
                format!("links to unknown node {}", NodeId(target)),
            )),
            None => Err(ToolError::validation(
                format!("{path}.target"),
                "expected a node id",
            )),
        },
        Some(other) => Err(ToolError::validation(
            format!("{path}.target"),
            format!("expected a node id or null, got {other}"),
        )),
    }
}

pub(crate) fn parse_scene_document(raw: &str) -> Result<SceneDocument, ToolError> {
    let document = parse_json::<SceneDocument>("scene", raw)?;
    document.validate()?;
    Ok(document)
}

pub(crate) fn load_scene(path: &Path) -> Result<SceneGraph, ToolError> {
    let raw = fs::read_to_string(path).map_err(|source| ToolError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let graph = parse_scene_document(&raw)?.into_graph()?;
    info!(path = %path.display(), nodes = graph.len(), "scene_loaded");
    Ok(graph)
}

pub(crate) fn save_scene(path: &Path, graph: &SceneGraph) -> Result<(), ToolError> {
    let document = SceneDocument::from_graph(graph);
    let mut text = serde_json::to_string_pretty(&document).map_err(|error| ToolError::Parse {
        what: "scene",
        path: String::new(),
        message: error.to_string(),
    })?;
    text.push('\n');
    write_text_atomic(path, &text).map_err(|source| ToolError::Write {
        path: path.to_path_buf(),
        source,
    })?;
    info!(path = %path.display(), nodes = document.nodes.len(), "scene_saved");
    Ok(())
}
