//! Agent input handling.
//!
//! Inputs are world-relative: forward is +Z and right is +X.

use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Input for a single agent for a single tick.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentInput {
    /// Movement keys pressed.
    pub movement: MovementInput,

    /// Jump pressed this tick.
    pub jump: bool,

    /// Frame number this input was generated.
    pub frame: u32,
}

/// Movement key states.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct MovementInput {
    pub forward: bool,
    pub backward: bool,
    pub left: bool,
    pub right: bool,
}

impl AgentInput {
    /// Horizontal move direction in world space, at most unit length.
    pub fn move_direction(&self) -> Vec3 {
        let mut direction = Vec3::ZERO;

        if self.movement.forward {
            direction.z += 1.0;
        }
        if self.movement.backward {
            direction.z -= 1.0;
        }
        if self.movement.right {
            direction.x += 1.0;
        }
        if self.movement.left {
            direction.x -= 1.0;
        }

        // Normalize diagonal movement
        direction.normalize_or_zero()
    }

    /// Check if any movement input is active.
    pub fn has_movement(&self) -> bool {
        self.movement.forward || self.movement.backward || self.movement.left || self.movement.right
    }
}
