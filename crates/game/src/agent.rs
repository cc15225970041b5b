//! Agent entity and state.

use std::sync::Arc;

use glam::{Quat, Vec3};
use kinema_physics::{CollisionWorld, ConfigError, ControllerConfig, EntityController, Pose};
use serde::{Deserialize, Serialize};

use crate::input::AgentInput;

/// Unique identifier for entities.
pub type EntityId = u32;

/// Movement tuning for an agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentStats {
    /// Horizontal speed (units/sec).
    pub move_speed: f32,

    /// Initial upward velocity of a jump (units/sec).
    pub jump_speed: f32,

    /// Downward acceleration (units/sec²).
    pub gravity: f32,

    /// Terminal fall speed (units/sec).
    pub max_fall_speed: f32,
}

impl Default for AgentStats {
    fn default() -> Self {
        Self {
            move_speed: 6.0,
            jump_speed: 7.0,
            gravity: 20.0,
            max_fall_speed: 30.0,
        }
    }
}

/// Lifecycle of an agent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum AgentState {
    /// Moving and colliding.
    Active,
    /// Waiting to reappear at a spawn point.
    Respawning {
        /// Seconds since the agent was removed.
        elapsed: f32,
    },
}

/// A controller-driven agent.
#[derive(Debug, Clone)]
pub struct Agent {
    /// Unique agent ID.
    pub id: EntityId,

    /// Agent name/handle.
    pub name: String,

    /// Pose moved by the controller.
    pub pose: Pose,

    /// Current velocity (units/sec).
    pub velocity: Vec3,

    /// Movement tuning.
    pub stats: AgentStats,

    /// Lifecycle state.
    pub state: AgentState,

    /// Times this agent has been removed by the kill plane.
    pub deaths: u32,

    controller: EntityController<Arc<CollisionWorld>>,
}

impl Agent {
    /// Create an agent at the given spawn position and facing.
    pub fn new(
        id: EntityId,
        name: String,
        world: Arc<CollisionWorld>,
        config: ControllerConfig,
        stats: AgentStats,
        position: Vec3,
        facing: f32,
    ) -> Result<Self, ConfigError> {
        let controller = EntityController::new(world, config)?;

        Ok(Self {
            id,
            name,
            pose: Pose::new(position, Quat::from_rotation_y(facing)),
            velocity: Vec3::ZERO,
            stats,
            state: AgentState::Active,
            deaths: 0,
            controller,
        })
    }

    /// Get the agent's current position.
    #[inline]
    pub fn position(&self) -> Vec3 {
        self.pose.position
    }

    /// Get the direction the agent faces.
    #[inline]
    pub fn forward_direction(&self) -> Vec3 {
        self.pose.forward()
    }

    #[inline]
    pub fn is_alive(&self) -> bool {
        self.state == AgentState::Active
    }

    /// Check if the agent stood on walkable ground after its last move.
    #[inline]
    pub fn on_ground(&self) -> bool {
        self.controller.is_grounded()
    }

    pub fn controller(&self) -> &EntityController<Arc<CollisionWorld>> {
        &self.controller
    }

    pub fn controller_mut(&mut self) -> &mut EntityController<Arc<CollisionWorld>> {
        &mut self.controller
    }

    /// Advance the agent by one tick.
    ///
    /// Returns the displacement the controller applied.
    pub fn update(&mut self, input: &AgentInput, delta_time: f32) -> Vec3 {
        if !self.is_alive() {
            return Vec3::ZERO;
        }

        let direction = input.move_direction();
        if direction != Vec3::ZERO {
            self.pose.rotation = Quat::from_rotation_y(direction.x.atan2(direction.z));
        }

        self.velocity.x = direction.x * self.stats.move_speed;
        self.velocity.z = direction.z * self.stats.move_speed;

        let grounded = self.controller.is_grounded();
        if grounded && self.velocity.y < 0.0 {
            self.velocity.y = 0.0;
        }
        if grounded && input.jump {
            self.velocity.y = self.stats.jump_speed;
            log::trace!("agent {} jumped", self.id);
        }

        self.velocity.y = (self.velocity.y - self.stats.gravity * delta_time).max(-self.stats.max_fall_speed);

        let applied = self.controller.move_by(&mut self.pose, self.velocity * delta_time);

        let contacts = self.controller.contacts();
        if contacts.hit_ceiling() && self.velocity.y > 0.0 {
            self.velocity.y = 0.0;
        }
        if contacts.is_grounded() && self.velocity.y < 0.0 {
            self.velocity.y = 0.0;
        }

        applied
    }

    /// Take the agent out of play until [`Agent::respawn`].
    pub fn kill(&mut self) {
        if !self.is_alive() {
            return;
        }

        self.deaths += 1;
        self.velocity = Vec3::ZERO;
        self.state = AgentState::Respawning { elapsed: 0.0 };
        self.controller.set_enabled(false);
        log::debug!("agent {} removed at {:?}", self.id, self.pose.position);
    }

    /// Advance the respawn timer. Returns `true` once `delay` has elapsed.
    pub fn tick_respawn(&mut self, delta_time: f32, delay: f32) -> bool {
        match &mut self.state {
            AgentState::Respawning { elapsed } => {
                *elapsed += delta_time;
                *elapsed >= delay
            }
            AgentState::Active => false,
        }
    }

    /// Put the agent back into play at a new position.
    pub fn respawn(&mut self, position: Vec3, facing: f32) {
        self.pose = Pose::new(position, Quat::from_rotation_y(facing));
        self.velocity = Vec3::ZERO;
        self.state = AgentState::Active;
        self.controller.set_enabled(true);
        log::debug!("agent {} respawned at {:?}", self.id, position);
    }
}
