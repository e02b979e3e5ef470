use std::collections::HashMap;

use thiserror::Error;

use crate::graph::ComponentType;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequirementError {
    #[error("requirements for component type '{0}' are already registered")]
    Duplicate(ComponentType),
    #[error("component type '{0}' cannot require itself")]
    SelfRequirement(ComponentType),
}

/// Static "requires component" metadata, keyed by component type.
#[derive(Debug, Clone, Default)]
pub struct RequirementTable {
    required_by_type: HashMap<ComponentType, Vec<ComponentType>>,
}

const BUILTIN_REQUIREMENTS: &[(&str, &[&str])] = &[
    ("Collider", &["Rigidbody"]),
    ("HingeJoint", &["Rigidbody"]),
    ("PlayerController", &["Rigidbody"]),
    ("EnemyBrick", &["NavMeshAgent", "Rigidbody", "Holdable"]),
];

impl RequirementTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_builtin_types() -> Self {
        let mut table = Self::new();
        for (ty, requires) in BUILTIN_REQUIREMENTS {
            let requires = requires.iter().map(|name| ComponentType::new(*name));
            if let Err(error) = table.register(ComponentType::new(*ty), requires) {
                tracing::warn!(error = %error, "builtin_requirement_rejected");
            }
        }
        table
    }

    pub fn register(
        &mut self,
        ty: ComponentType,
        requires: impl IntoIterator<Item = ComponentType>,
    ) -> Result<(), RequirementError> {
        if self.required_by_type.contains_key(&ty) {
            return Err(RequirementError::Duplicate(ty));
        }
        let mut required = Vec::new();
        for candidate in requires {
            if candidate == ty {
                return Err(RequirementError::SelfRequirement(ty));
            }
            if !required.contains(&candidate) {
                required.push(candidate);
            }
        }
        self.required_by_type.insert(ty, required);
        Ok(())
    }

    /// Types that must exist on the same node before `ty` can be added.
    pub fn required_types(&self, ty: &ComponentType) -> &[ComponentType] {
        self.required_by_type
            .get(ty)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn requires(&self, ty: &ComponentType, dependency: &ComponentType) -> bool {
        self.required_types(ty).contains(dependency)
    }

    pub fn len(&self) -> usize {
        self.required_by_type.len()
    }

    pub fn is_empty(&self) -> bool {
        self.required_by_type.is_empty()
    }
}
