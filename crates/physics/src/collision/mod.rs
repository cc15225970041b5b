//! Collision queries and the reference collision world.
//!
//! # Key Types
//!
//! - [`CollisionQueries`]: the query port the entity controller depends on
//! - [`CollisionWorld`]: a parry3d-backed implementation of that port
//! - [`SweepHit`]: first obstruction found by a ray or shape cast
//! - [`QueryFilter`]: layer mask, trigger policy and self exclusion
//!
//! Volumes are identified by opaque [`VolumeId`]s. Layers select which
//! volumes a query sees; [`VolumeFlags`] carry gameplay properties such as
//! triggers and platforms.

mod flags;
mod query;
mod world;

pub use flags::{CollisionLayers, VolumeFlags};
pub use query::{CapsuleSegment, CollisionQueries, Penetration, QueryFilter, SweepHit, VolumeId};
pub use world::{CollisionVolume, CollisionWorld};
