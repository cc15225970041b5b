//! Entity controller movement.
//!
//! # Pipeline
//!
//! Every [`EntityController::move_by`] call runs, in order:
//!
//! 1. Split the displacement into lateral and vertical parts (local frame)
//! 2. [`slide_move`](slide_move) the lateral part, stepping over low obstacles
//! 3. [`slide_move`](slide_move) the vertical part, stopping on walkable ground
//! 4. Push out of any remaining penetration
//! 5. Snap onto ground reached by the capsule core
//! 6. Probe for ground so callers can poll [`ContactState`]

mod config;
mod controller;
mod gap;
mod ignore;
mod penetration;
mod shape;
mod slide_move;
mod state;

pub use config::{ConfigError, ControllerConfig, SolverTuning};
pub use controller::EntityController;
pub use ignore::IgnoreSet;
pub use shape::CapsuleShape;
pub use slide_move::{project_on_plane, surface_angle, SlidePass};
pub use state::{CollisionSides, ContactState, GroundHit, Pose};
