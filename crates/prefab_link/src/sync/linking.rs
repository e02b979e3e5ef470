use tracing::{debug, info};

use crate::graph::{NodeId, SceneHost};

use super::reconcile::SyncError;

/// Clones `scene` into a new asset root, links the scene to it and makes
/// the root's own link reflexive.
pub fn create_linked_root<H: SceneHost + ?Sized>(
    host: &mut H,
    scene: NodeId,
    name: &str,
) -> Result<NodeId, SyncError> {
    if host.node(scene).is_none() {
        return Err(SyncError::MissingNode(scene));
    }
    let root = host.create_asset_root(scene, name)?;
    host.set_link(scene, Some(root))?;
    host.set_link(root, Some(root))?;
    info!(scene = %scene, root = %root, name, "linked_root_created");
    Ok(root)
}

/// Wires up a root that was just created from `instance` outside the
/// synchronizer. An instance already linked elsewhere hands its target to
/// the new root; otherwise both point at the new root.
pub fn adopt_new_root<H: SceneHost + ?Sized>(
    host: &mut H,
    new_root: NodeId,
    instance: NodeId,
) -> Result<(), SyncError> {
    let root_node = host.node(new_root).ok_or(SyncError::MissingNode(new_root))?;
    if root_node.link_component().is_none() || root_node.link_target().is_some() {
        return Ok(());
    }
    let instance_node = host.node(instance).ok_or(SyncError::MissingNode(instance))?;
    if instance_node.link_component().is_none() {
        return Ok(());
    }

    match instance_node.link_target() {
        Some(existing) => host.set_link(new_root, Some(existing))?,
        None => {
            host.set_link(instance, Some(new_root))?;
            host.set_link(new_root, Some(new_root))?;
        }
    }
    info!(root = %new_root, instance = %instance, "new_root_adopted");
    Ok(())
}

/// Strips a trailing duplicate index such as `" (3)"`.
pub fn strip_duplicate_index(name: &str) -> &str {
    let Some(open) = name.rfind(" (") else {
        return name;
    };
    let Some(digits) = name[open + 2..].strip_suffix(')') else {
        return name;
    };
    if digits.chars().all(|c| c.is_ascii_digit()) {
        &name[..open]
    } else {
        name
    }
}

/// Links each node to the candidate root sharing its name, falling back to
/// the name without its duplicate index. Already linked nodes are left
/// alone. Returns the links that were made.
pub fn link_by_name<H: SceneHost + ?Sized>(
    host: &mut H,
    nodes: &[NodeId],
    candidates: &[NodeId],
) -> Result<Vec<(NodeId, NodeId)>, SyncError> {
    let mut linked = Vec::new();
    for node in nodes {
        let Some(scene_node) = host.node(*node) else {
            continue;
        };
        if scene_node.link_target().is_some() {
            continue;
        }
        let name = scene_node.name().to_string();
        let by_name = |wanted: &str| {
            candidates.iter().copied().find(|candidate| {
                *candidate != *node
                    && host
                        .node(*candidate)
                        .is_some_and(|root| root.name() == wanted)
            })
        };
        let found = by_name(&name).or_else(|| by_name(strip_duplicate_index(&name)));
        match found {
            Some(root) => {
                host.set_link(*node, Some(root))?;
                linked.push((*node, root));
            }
            None => debug!(node = %node, name = %name, "link_by_name_no_match"),
        }
    }
    Ok(linked)
}

/// `base`, or the first `base (N)` not present in `existing`.
pub fn unique_name<'a>(existing: impl IntoIterator<Item = &'a str>, base: &str) -> String {
    let taken: Vec<&str> = existing.into_iter().collect();
    if !taken.contains(&base) {
        return base.to_string();
    }
    (1u32..)
        .map(|index| format!("{base} ({index})"))
        .find(|candidate| !taken.contains(&candidate.as_str()))
        .unwrap_or_else(|| base.to_string())
}
