//! Geometry query port used by the entity controller.
//!
//! The controller never talks to a physics engine directly. Everything it
//! needs from the world goes through [`CollisionQueries`], so any backend
//! (the bundled [`CollisionWorld`](super::CollisionWorld), an engine
//! adapter, a test double) can drive it.
//!
//! # Query semantics
//!
//! All implementations must agree on these rules:
//!
//! - Direction vectors need not be normalized. A zero direction or a
//!   non-positive distance never hits.
//! - Casts do not report volumes that already overlap the cast shape at its
//!   starting pose, and rays do not report volumes containing their origin.
//! - Hit distances are measured along the normalized direction.
//! - Overlap queries write at most `results.len()` ids and return the count.

use std::sync::Arc;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::flags::{CollisionLayers, VolumeFlags};

/// Opaque identifier of a collision volume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct VolumeId(pub u32);

/// First obstruction reported by a ray or shape cast.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SweepHit {
    /// Distance travelled along the normalized direction before contact.
    pub distance: f32,
    /// Contact point in world space.
    pub point: Vec3,
    /// Surface normal at the contact, pointing away from the hit volume.
    pub normal: Vec3,
    /// The volume that was hit.
    pub volume: VolumeId,
}

/// Separation needed to push a shape out of a volume.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Penetration {
    /// Unit direction to move the shape along.
    pub direction: Vec3,
    /// Distance to move. Always positive.
    pub distance: f32,
}

/// A capsule posed in world space: a segment swept by a sphere.
///
/// When both endpoints coincide this is a sphere.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CapsuleSegment {
    pub a: Vec3,
    pub b: Vec3,
    pub radius: f32,
}

impl CapsuleSegment {
    pub fn new(a: Vec3, b: Vec3, radius: f32) -> Self {
        Self { a, b, radius }
    }

    pub fn sphere(center: Vec3, radius: f32) -> Self {
        Self {
            a: center,
            b: center,
            radius,
        }
    }

    /// Whether the segment has (near) zero length.
    #[inline]
    pub fn is_sphere(&self) -> bool {
        self.a.distance_squared(self.b) <= f32::EPSILON
    }

    /// Midpoint of the segment.
    #[inline]
    pub fn center(&self) -> Vec3 {
        (self.a + self.b) * 0.5
    }
}

/// Which volumes a query is allowed to see.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryFilter {
    /// Layer mask the volume must intersect.
    pub layers: CollisionLayers,
    /// Whether trigger volumes are reported.
    pub include_triggers: bool,
    /// A single volume never reported, typically the querying agent's body.
    pub exclude: Option<VolumeId>,
}

impl QueryFilter {
    /// Filter that sees solid volumes on the given layers.
    pub fn new(layers: CollisionLayers) -> Self {
        Self {
            layers,
            include_triggers: false,
            exclude: None,
        }
    }

    pub fn with_triggers(mut self) -> Self {
        self.include_triggers = true;
        self
    }

    pub fn excluding(mut self, volume: Option<VolumeId>) -> Self {
        self.exclude = volume;
        self
    }

    /// Check a volume against this filter.
    pub fn accepts(&self, volume: VolumeId, layers: CollisionLayers, flags: VolumeFlags) -> bool {
        if self.exclude == Some(volume) {
            return false;
        }
        if !self.include_triggers && flags.contains(VolumeFlags::TRIGGER) {
            return false;
        }
        layers.intersects(self.layers)
    }
}

impl Default for QueryFilter {
    fn default() -> Self {
        Self::new(CollisionLayers::MASK_CONTROLLER)
    }
}

/// Primitive geometric queries the entity controller is built on.
pub trait CollisionQueries {
    /// Cast a ray and return the closest hit.
    fn raycast(
        &self,
        origin: Vec3,
        direction: Vec3,
        max_distance: f32,
        filter: &QueryFilter,
    ) -> Option<SweepHit>;

    /// Sweep a sphere and return the first obstruction.
    fn sphere_cast(
        &self,
        center: Vec3,
        radius: f32,
        direction: Vec3,
        max_distance: f32,
        filter: &QueryFilter,
    ) -> Option<SweepHit>;

    /// Sweep a capsule spanning `point1..point2` and return the first obstruction.
    fn capsule_cast(
        &self,
        point1: Vec3,
        point2: Vec3,
        radius: f32,
        direction: Vec3,
        max_distance: f32,
        filter: &QueryFilter,
    ) -> Option<SweepHit>;

    /// Collect volumes overlapping a sphere.
    fn overlap_sphere(
        &self,
        center: Vec3,
        radius: f32,
        filter: &QueryFilter,
        results: &mut [VolumeId],
    ) -> usize;

    /// Collect volumes overlapping a capsule.
    fn overlap_capsule(
        &self,
        point1: Vec3,
        point2: Vec3,
        radius: f32,
        filter: &QueryFilter,
        results: &mut [VolumeId],
    ) -> usize;

    /// Separation between `shape` and `volume`, if they overlap.
    fn compute_penetration(&self, shape: &CapsuleSegment, volume: VolumeId) -> Option<Penetration>;

    /// Gameplay flags of a volume. Unknown volumes have no flags.
    fn volume_flags(&self, volume: VolumeId) -> VolumeFlags;

    /// Cast a ray between two points.
    fn linecast(&self, start: Vec3, end: Vec3, filter: &QueryFilter) -> Option<SweepHit> {
        let delta = end - start;
        self.raycast(start, delta, delta.length(), filter)
    }
}

impl<T: CollisionQueries + ?Sized> CollisionQueries for &T {
    fn raycast(&self, origin: Vec3, direction: Vec3, max_distance: f32, filter: &QueryFilter) -> Option<SweepHit> {
        (**self).raycast(origin, direction, max_distance, filter)
    }

    fn sphere_cast(
        &self,
        center: Vec3,
        radius: f32,
        direction: Vec3,
        max_distance: f32,
        filter: &QueryFilter,
    ) -> Option<SweepHit> {
        (**self).sphere_cast(center, radius, direction, max_distance, filter)
    }

    fn capsule_cast(
        &self,
        point1: Vec3,
        point2: Vec3,
        radius: f32,
        direction: Vec3,
        max_distance: f32,
        filter: &QueryFilter,
    ) -> Option<SweepHit> {
        (**self).capsule_cast(point1, point2, radius, direction, max_distance, filter)
    }

    fn overlap_sphere(&self, center: Vec3, radius: f32, filter: &QueryFilter, results: &mut [VolumeId]) -> usize {
        (**self).overlap_sphere(center, radius, filter, results)
    }

    fn overlap_capsule(
        &self,
        point1: Vec3,
        point2: Vec3,
        radius: f32,
        filter: &QueryFilter,
        results: &mut [VolumeId],
    ) -> usize {
        (**self).overlap_capsule(point1, point2, radius, filter, results)
    }

    fn compute_penetration(&self, shape: &CapsuleSegment, volume: VolumeId) -> Option<Penetration> {
        (**self).compute_penetration(shape, volume)
    }

    fn volume_flags(&self, volume: VolumeId) -> VolumeFlags {
        (**self).volume_flags(volume)
    }
}

impl<T: CollisionQueries + ?Sized> CollisionQueries for Arc<T> {
    fn raycast(&self, origin: Vec3, direction: Vec3, max_distance: f32, filter: &QueryFilter) -> Option<SweepHit> {
        (**self).raycast(origin, direction, max_distance, filter)
    }

    fn sphere_cast(
        &self,
        center: Vec3,
        radius: f32,
        direction: Vec3,
        max_distance: f32,
        filter: &QueryFilter,
    ) -> Option<SweepHit> {
        (**self).sphere_cast(center, radius, direction, max_distance, filter)
    }

    fn capsule_cast(
        &self,
        point1: Vec3,
        point2: Vec3,
        radius: f32,
        direction: Vec3,
        max_distance: f32,
        filter: &QueryFilter,
    ) -> Option<SweepHit> {
        (**self).capsule_cast(point1, point2, radius, direction, max_distance, filter)
    }

    fn overlap_sphere(&self, center: Vec3, radius: f32, filter: &QueryFilter, results: &mut [VolumeId]) -> usize {
        (**self).overlap_sphere(center, radius, filter, results)
    }

    fn overlap_capsule(
        &self,
        point1: Vec3,
        point2: Vec3,
        radius: f32,
        filter: &QueryFilter,
        results: &mut [VolumeId],
    ) -> usize {
        (**self).overlap_capsule(point1, point2, radius, filter, results)
    }

    fn compute_penetration(&self, shape: &CapsuleSegment, volume: VolumeId) -> Option<Penetration> {
        (**self).compute_penetration(shape, volume)
    }

    fn volume_flags(&self, volume: VolumeId) -> VolumeFlags {
        (**self).volume_flags(volume)
    }
}
