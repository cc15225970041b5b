//! Kinema Physics
//!
//! A kinematic capsule controller for platformer agents. Given the
//! displacement an agent wants this tick, the controller works out how far
//! it can actually go: sliding along walls, climbing small steps, refusing
//! steep slopes, resolving leftover penetration and snapping to the ground.
//!
//! # Architecture
//!
//! - **Collision**: the [`CollisionQueries`] port (rays, shape casts,
//!   overlaps, penetration) and [`CollisionWorld`], a parry3d implementation
//! - **Movement**: [`EntityController`], which turns a desired displacement
//!   into a resolved one using only the port
//!
//! The caller owns the agent's [`Pose`]; the controller owns the shape,
//! ignore set and scratch buffers. Identical inputs always produce identical
//! results.

pub mod collision;
pub mod movement;

// Re-export commonly used types
pub use collision::{
    CapsuleSegment, CollisionLayers, CollisionQueries, CollisionWorld, Penetration, QueryFilter, SweepHit,
    VolumeFlags, VolumeId,
};
pub use movement::{
    CapsuleShape, CollisionSides, ConfigError, ContactState, ControllerConfig, EntityController, GroundHit, Pose,
    SolverTuning,
};
