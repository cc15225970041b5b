//! Agent pose and the contact state polled after each move.

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

use crate::collision::VolumeId;

/// Position and orientation of an agent. Owned by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    pub position: Vec3,
    pub rotation: Quat,
}

impl Pose {
    pub fn new(position: Vec3, rotation: Quat) -> Self {
        Self { position, rotation }
    }

    pub fn at(position: Vec3) -> Self {
        Self::new(position, Quat::IDENTITY)
    }

    /// Local up axis in world space.
    #[inline]
    pub fn up(&self) -> Vec3 {
        self.rotation * Vec3::Y
    }

    /// Local forward axis (+Z) in world space.
    #[inline]
    pub fn forward(&self) -> Vec3 {
        self.rotation * Vec3::Z
    }
}

impl Default for Pose {
    fn default() -> Self {
        Self::at(Vec3::ZERO)
    }
}

/// Which sides of the shape touched something during the last move.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollisionSides(pub u16);

impl CollisionSides {
    /// The vertical pass landed on walkable ground.
    pub const BELOW: u16 = 1 << 0;

    /// The lateral pass was blocked or redirected.
    pub const SIDES: u16 = 1 << 1;

    /// Upward motion hit a ceiling.
    pub const ABOVE: u16 = 1 << 2;

    /// Residual penetration was corrected.
    pub const PENETRATION: u16 = 1 << 3;

    /// The agent was lifted off a platform it was squeezed against.
    pub const PLATFORM_NUDGE: u16 = 1 << 4;

    /// The ground snap moved the agent.
    pub const GROUND_SNAP: u16 = 1 << 5;

    /// Lateral motion stopped at an inside corner.
    pub const GAP: u16 = 1 << 6;

    /// Check if a flag is set.
    #[inline]
    pub fn has(self, flag: u16) -> bool {
        (self.0 & flag) != 0
    }

    /// Set or clear a flag.
    #[inline]
    pub fn set(&mut self, flag: u16, value: bool) {
        if value {
            self.0 |= flag;
        } else {
            self.0 &= !flag;
        }
    }

    #[inline]
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

/// Ground found below the shape by the ground probe.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GroundHit {
    /// Gap between the bottom of the shape and the ground (meters).
    pub distance: f32,
    /// Effective surface normal.
    pub normal: Vec3,
    /// Angle between the normal and up (degrees).
    pub angle: f32,
    /// Whether the angle is within the slope limit.
    pub walkable: bool,
    pub volume: VolumeId,
}

/// Contact information gathered during the last move.
///
/// Reset at the start of every move and read back by game logic instead of
/// subscribing to collision events.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ContactState {
    pub sides: CollisionSides,
    /// Normal of the last surface the sweeps stopped against.
    pub last_normal: Option<Vec3>,
    /// Volume of the last surface the sweeps stopped against.
    pub last_volume: Option<VolumeId>,
    /// Result of the ground probe after the move.
    pub ground: Option<GroundHit>,
}

impl ContactState {
    /// Standing on walkable ground.
    pub fn is_grounded(&self) -> bool {
        self.ground.is_some_and(|g| g.walkable)
    }

    /// Normal of the walkable ground, if grounded.
    pub fn ground_normal(&self) -> Option<Vec3> {
        self.ground.filter(|g| g.walkable).map(|g| g.normal)
    }

    pub fn hit_ceiling(&self) -> bool {
        self.sides.has(CollisionSides::ABOVE)
    }

    pub fn hit_wall(&self) -> bool {
        self.sides.has(CollisionSides::SIDES)
    }
}
