//! Kinema Game Logic
//!
//! A small deterministic sandbox that drives [`EntityController`]s the way
//! a platformer would:
//!
//! - Agent state: gravity, jumping, facing and respawning
//! - Input commands per tick
//! - Level geometry and trigger volumes
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────┐
//! │                       Simulation                          │
//! │  ┌─────────┐    ┌────────────────┐    ┌────────────────┐  │
//! │  │ Agent   │───►│ Entity         │───►│ Level          │  │
//! │  │ Input   │    │ Controller     │    │ (collision,    │  │
//! │  └─────────┘    │ (collide/slide)│    │  triggers)     │  │
//! │                 └────────────────┘    └────────────────┘  │
//! └───────────────────────────────────────────────────────────┘
//! ```

pub mod agent;
pub mod input;
pub mod level;
pub mod simulation;

// Re-export main types
pub use agent::{Agent, AgentState, AgentStats, EntityId};
pub use input::AgentInput;
pub use level::Level;
pub use simulation::{Simulation, SimulationConfig};

// Re-export physics types for convenience
pub use kinema_physics::{CollisionWorld, ContactState, ControllerConfig, EntityController, Pose};
