//! Identifiers for bodies, anchors and agents
//!
//! Bodies live in an arena owned by the world; these ids are arena indices, so they are
//! cheap to copy, totally ordered, and never hold a reference back into the world.

use serde::{Deserialize, Serialize};

/// Index of a body in the world arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BodyId(u32);

impl BodyId {
    pub fn from_raw(id: u32) -> Self {
        BodyId(id)
    }

    pub fn raw(&self) -> u32 {
        self.0
    }

    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

impl std::fmt::Display for BodyId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Body({})", self.0)
    }
}

/// Anchor `index` of body `body`
///
/// Voxels number their anchors by vertex, rigid bodies by polygon vertex.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AnchorId {
    pub body: BodyId,
    pub index: u8,
}

impl AnchorId {
    pub fn new(body: BodyId, index: u8) -> Self {
        Self { body, index }
    }
}

impl std::fmt::Display for AnchorId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Anchor({}.{})", self.body.0, self.index)
    }
}

/// Agent registered with an engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AgentId(u32);

impl AgentId {
    pub fn from_raw(id: u32) -> Self {
        AgentId(id)
    }

    pub fn raw(&self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for AgentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Agent({})", self.0)
    }
}
