//! Layer and volume flags for collision filtering.
//!
//! Layers decide which volumes a query can see at all. Volume flags carry
//! per-volume properties the controller reacts to (triggers are skipped,
//! platforms get special penetration handling).

use serde::{Deserialize, Serialize};

/// Collision layers a volume belongs to, also used as a query mask.
///
/// A query sees a volume when the volume's layers intersect the query mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct CollisionLayers(pub u32);

impl CollisionLayers {
    /// No layers.
    pub const NONE: Self = Self(0);

    /// Static level geometry: floors, walls, steps.
    pub const DEFAULT: Self = Self(1 << 0);

    /// Moving or carried geometry such as platforms and elevators.
    pub const MOVING: Self = Self(1 << 1);

    /// Volumes that should never be hit by controller queries.
    pub const IGNORE_QUERIES: Self = Self(1 << 2);

    /// Agent bodies (players, enemies).
    pub const AGENTS: Self = Self(1 << 3);

    /// Volumes that only exist for gameplay checks (pickups, hazards).
    pub const GAMEPLAY: Self = Self(1 << 4);

    /// Every layer.
    pub const ALL: Self = Self(u32::MAX);

    /// Standard mask for controller queries: everything except
    /// [`CollisionLayers::IGNORE_QUERIES`].
    pub const MASK_CONTROLLER: Self = Self(u32::MAX & !Self::IGNORE_QUERIES.0);

    /// Check if these layers contain all of `other`.
    #[inline]
    pub fn contains(self, other: Self) -> bool {
        (self.0 & other.0) == other.0
    }

    /// Check if any of the given layers are set.
    #[inline]
    pub fn intersects(self, other: Self) -> bool {
        (self.0 & other.0) != 0
    }

    /// Remove layers from this set.
    #[inline]
    pub fn difference(self, other: Self) -> Self {
        Self(self.0 & !other.0)
    }
}

impl std::ops::BitOr for CollisionLayers {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl std::ops::BitAnd for CollisionLayers {
    type Output = Self;
    fn bitand(self, rhs: Self) -> Self {
        Self(self.0 & rhs.0)
    }
}

/// Per-volume properties.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct VolumeFlags(pub u32);

impl VolumeFlags {
    /// No special properties.
    pub const NONE: Self = Self(0);

    /// Trigger volume. Reported only to queries that include triggers.
    pub const TRIGGER: Self = Self(1 << 0);

    /// Thin, usually moving, platform. Being squeezed against one lifts the
    /// agent on top instead of pushing it through.
    pub const PLATFORM: Self = Self(1 << 1);

    /// Hurts agents that touch it.
    pub const HAZARD: Self = Self(1 << 2);

    /// Check if these flags contain a specific flag.
    #[inline]
    pub fn contains(self, other: Self) -> bool {
        (self.0 & other.0) == other.0
    }
}

impl std::ops::BitOr for VolumeFlags {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}
