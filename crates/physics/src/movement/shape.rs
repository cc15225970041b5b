//! Capsule shape model.
//!
//! The agent is a vertical capsule in its local frame: a segment along the
//! up axis swept by a sphere. When the height does not exceed the diameter
//! the segment collapses to a point and the shape is a sphere.

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

use crate::collision::CapsuleSegment;

use super::state::Pose;

/// Clamped capsule dimensions in the agent's local frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CapsuleShape {
    pub radius: f32,
    pub height: f32,
    /// Center offset from the pose position, local space.
    pub center: Vec3,
}

impl CapsuleShape {
    /// Build a shape, flooring the radius at `skin_width` and the height at
    /// the resulting diameter.
    pub fn new(radius: f32, height: f32, center: Vec3, skin_width: f32) -> Self {
        let radius = radius.max(skin_width);
        let height = height.max(radius * 2.0);
        Self { radius, height, center }
    }

    /// The physical collider: every dimension shrunk by the skin width.
    pub fn collider(&self, skin_width: f32) -> Self {
        Self::new(self.radius - skin_width, self.height - skin_width, self.center, 0.0)
    }

    #[inline]
    pub fn is_spherical(&self) -> bool {
        self.height <= self.radius * 2.0
    }

    /// Distance from the center to either segment endpoint.
    #[inline]
    pub fn half_segment(&self) -> f32 {
        (self.height * 0.5 - self.radius).max(0.0)
    }

    /// Center of the shape in world space.
    #[inline]
    pub fn world_center(&self, pose: &Pose) -> Vec3 {
        pose.position + pose.rotation * self.center
    }

    /// Offset from the center to the upper segment endpoint, world space.
    #[inline]
    pub fn segment_offset(&self, rotation: Quat) -> Vec3 {
        rotation * Vec3::Y * self.half_segment()
    }

    /// The shape posed in world space.
    pub fn segment(&self, pose: &Pose) -> CapsuleSegment {
        let center = self.world_center(pose);
        let offset = self.segment_offset(pose.rotation);
        CapsuleSegment::new(center - offset, center + offset, self.radius)
    }

    /// World-space axis-aligned bounding box `(min, max)`.
    pub fn bounds(&self, pose: &Pose) -> (Vec3, Vec3) {
        let segment = self.segment(pose);
        let extent = Vec3::splat(self.radius);
        (segment.a.min(segment.b) - extent, segment.a.max(segment.b) + extent)
    }
}
