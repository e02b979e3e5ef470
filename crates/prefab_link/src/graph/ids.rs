use std::fmt;

use serde::{Deserialize, Serialize};

pub const TRANSFORM: &str = "Transform";
pub const PREFAB_LINK: &str = "PrefabLink";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub u64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ComponentId(pub u64);

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "c{}", self.0)
    }
}

/// Type tag of a component. Requirements and exemptions are keyed by it.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ComponentType(String);

impl ComponentType {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn transform() -> Self {
        Self::new(TRANSFORM)
    }

    pub fn prefab_link() -> Self {
        Self::new(PREFAB_LINK)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_transform(&self) -> bool {
        self.0 == TRANSFORM
    }

    pub fn is_prefab_link(&self) -> bool {
        self.0 == PREFAB_LINK
    }
}

impl fmt::Display for ComponentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ComponentType {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

#[derive(Debug, Default)]
pub(crate) struct IdAllocator {
    next: u64,
}

impl IdAllocator {
    pub(crate) fn starting_at(next: u64) -> Self {
        Self { next }
    }

    pub(crate) fn allocate(&mut self) -> u64 {
        let id = self.next;
        self.next = self.next.saturating_add(1);
        id
    }

    pub(crate) fn reserve_past(&mut self, used: u64) {
        self.next = self.next.max(used.saturating_add(1));
    }
}
