//! Core of the voxel soft-robot simulator
//!
//! This crate contains:
//! - The action/outcome protocol every interaction with the world goes through
//! - Voxel, rigid and unmovable bodies with their anchors
//! - The attachment graph of links between anchors
//! - The agent and engine contracts, plus a kinematic reference engine

pub mod action;
pub mod agent;
pub mod body;
pub mod engine;
pub mod ids;
pub mod kinematic;
pub mod nfc;
pub mod topology;
pub mod world;

pub use action::{Action, ActionError, ActionOutcome, ActionValue};
pub use agent::{Agent, BrainIo, EmbodiedAgent, RangedValues};
pub use body::{Body, BodyKind, InvalidMaterial, Material, RigidBody, Side, UnmovableBody, Vertex, Voxel};
pub use engine::{
    ActionPerformer, AgentSnapshot, BodySnapshot, Engine, EngineError, Snapshot, WorldAccess,
};
pub use ids::{AgentId, AnchorId, BodyId};
pub use kinematic::{EngineConfig, KinematicEngine};
pub use nfc::{NfcBuffer, NfcMessage};
pub use topology::{AttachmentGraph, Link, LinkType, TopologyError};
pub use world::{side_anchors, World};
