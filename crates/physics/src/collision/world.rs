//! Collision world containing all static and kinematic geometry.
//!
//! The collision world stores collidable volumes and answers the primitive
//! queries of [`CollisionQueries`] by testing every volume in insertion
//! order. There is no broad phase; levels are expected to be small.

use glam::{Quat, Vec3};
use parry3d::math::{Isometry, Point, Real, Vector};
use parry3d::na::{Quaternion, Translation3, UnitQuaternion};
use parry3d::query::{self, Ray, ShapeCastOptions};
use parry3d::shape::SharedShape;

use super::flags::{CollisionLayers, VolumeFlags};
use super::query::{CapsuleSegment, CollisionQueries, Penetration, QueryFilter, SweepHit, VolumeId};

/// A piece of collision geometry in the world.
#[derive(Debug, Clone)]
pub struct CollisionVolume {
    /// Unique identifier for this volume.
    pub id: VolumeId,
    /// The collision shape.
    pub shape: SharedShape,
    /// Position and orientation in world space.
    pub transform: Isometry<Real>,
    /// Layers used for query filtering.
    pub layers: CollisionLayers,
    /// Gameplay flags (trigger, platform, ...).
    pub flags: VolumeFlags,
}

/// The collision world containing all geometry.
///
/// # Thread Safety
///
/// Queries take `&self`, so a finished world can be shared behind an `Arc`
/// by every controller in a level.
#[derive(Debug, Default)]
pub struct CollisionWorld {
    volumes: Vec<CollisionVolume>,
    next_id: u32,
}

impl CollisionWorld {
    /// Create an empty collision world.
    pub fn new() -> Self {
        Self {
            volumes: Vec::new(),
            next_id: 0,
        }
    }

    /// Add an axis-aligned box.
    ///
    /// # Arguments
    ///
    /// * `center` - Center position of the box in world space
    /// * `half_extents` - Half-size in each axis (x, y, z)
    /// * `layers` - Layers the box lives on
    pub fn add_box(&mut self, center: Vec3, half_extents: Vec3, layers: CollisionLayers) -> VolumeId {
        self.add_oriented_box(center, half_extents, Quat::IDENTITY, layers)
    }

    /// Add a box with an arbitrary orientation.
    pub fn add_oriented_box(
        &mut self,
        center: Vec3,
        half_extents: Vec3,
        rotation: Quat,
        layers: CollisionLayers,
    ) -> VolumeId {
        let shape = SharedShape::cuboid(half_extents.x, half_extents.y, half_extents.z);
        self.add_volume(shape, center, rotation, layers)
    }

    /// Add a slab tilted about the Z axis so its top face rises towards +X.
    ///
    /// `angle_degrees` is the angle between the top face normal and +Y.
    pub fn add_ramp(
        &mut self,
        center: Vec3,
        half_extents: Vec3,
        angle_degrees: f32,
        layers: CollisionLayers,
    ) -> VolumeId {
        let rotation = Quat::from_rotation_z(angle_degrees.to_radians());
        self.add_oriented_box(center, half_extents, rotation, layers)
    }

    /// Add any parry shape.
    pub fn add_volume(
        &mut self,
        shape: SharedShape,
        position: Vec3,
        rotation: Quat,
        layers: CollisionLayers,
    ) -> VolumeId {
        let id = VolumeId(self.next_id);
        self.next_id += 1;

        self.volumes.push(CollisionVolume {
            id,
            shape,
            transform: isometry(position, rotation),
            layers,
            flags: VolumeFlags::NONE,
        });

        id
    }

    /// Replace the flags of a volume. Returns `false` for unknown ids.
    pub fn set_flags(&mut self, id: VolumeId, flags: VolumeFlags) -> bool {
        match self.volumes.iter_mut().find(|v| v.id == id) {
            Some(volume) => {
                volume.flags = flags;
                true
            }
            None => false,
        }
    }

    /// Move a volume, e.g. a platform between ticks.
    pub fn set_transform(&mut self, id: VolumeId, position: Vec3, rotation: Quat) -> bool {
        match self.volumes.iter_mut().find(|v| v.id == id) {
            Some(volume) => {
                volume.transform = isometry(position, rotation);
                true
            }
            None => false,
        }
    }

    /// Remove a volume. Returns `false` for unknown ids.
    pub fn remove(&mut self, id: VolumeId) -> bool {
        let before = self.volumes.len();
        self.volumes.retain(|v| v.id != id);
        self.volumes.len() != before
    }

    pub fn volume(&self, id: VolumeId) -> Option<&CollisionVolume> {
        self.volumes.iter().find(|v| v.id == id)
    }

    /// Remove all collision geometry.
    pub fn clear(&mut self) {
        self.volumes.clear();
    }

    /// Get the number of collision volumes.
    pub fn volume_count(&self) -> usize {
        self.volumes.len()
    }

    fn candidates<'a>(&'a self, filter: &'a QueryFilter) -> impl Iterator<Item = &'a CollisionVolume> + 'a {
        self.volumes
            .iter()
            .filter(move |v| filter.accepts(v.id, v.layers, v.flags))
    }

    /// Sweep `segment` and keep the closest hit.
    fn cast(
        &self,
        segment: &CapsuleSegment,
        direction: Vec3,
        max_distance: f32,
        filter: &QueryFilter,
    ) -> Option<SweepHit> {
        let dir = direction.normalize_or_zero();
        if dir == Vec3::ZERO || max_distance <= 0.0 {
            return None;
        }

        let (shape, pose) = parry_shape(segment);
        let velocity = vector(dir);
        let at_rest = Vector::<Real>::zeros();
        let mut closest: Option<SweepHit> = None;

        for volume in self.candidates(filter) {
            let options = ShapeCastOptions::with_max_time_of_impact(max_distance);

            let estimate = match query::cast_shapes(
                &pose,
                &velocity,
                shape.as_ref(),
                &volume.transform,
                &at_rest,
                volume.shape.as_ref(),
                options,
            ) {
                Ok(Some(hit)) => hit,
                Ok(None) => continue,
                Err(_) => {
                    log::trace!("shape cast unsupported against volume {:?}", volume.id);
                    continue;
                }
            };

            let hit = if volume.is_convex() {
                volume.refine_cast(segment, dir, estimate.time_of_impact, max_distance)
            } else if estimate.time_of_impact <= 0.0 {
                // Volumes overlapping the start pose are not obstructions.
                None
            } else {
                let point = volume.transform * estimate.witness2;
                let normal = volume.transform.rotation * estimate.normal2.into_inner();
                Some(SweepHit {
                    distance: estimate.time_of_impact,
                    point: vec3(&point.coords),
                    normal: vec3(&normal),
                    volume: volume.id,
                })
            };

            if let Some(hit) = hit {
                if closest.map_or(true, |c| hit.distance < c.distance) {
                    closest = Some(hit);
                }
            }
        }

        closest
    }

    fn overlap(&self, segment: &CapsuleSegment, filter: &QueryFilter, results: &mut [VolumeId]) -> usize {
        let mut count = 0;

        for volume in self.candidates(filter) {
            if count == results.len() {
                break;
            }

            if volume.overlaps(segment) {
                results[count] = volume.id;
                count += 1;
            }
        }

        count
    }
}

// ============================================================================
// Exact convex queries
// ============================================================================

/// Iterations of the golden-section search along a segment.
const SEGMENT_SEARCH_ITERATIONS: usize = 40;

/// A refined cast stops once the remaining gap is below this.
const CONTACT_TOLERANCE: f32 = 1e-6;

/// Conservative-advancement steps taken from the coarse cast estimate.
const ADVANCE_ITERATIONS: usize = 16;

/// Bisection steps taken when the coarse estimate overshoots.
const BISECT_ITERATIONS: usize = 24;

/// Closest approach between a segment and the surface of a volume.
#[derive(Debug, Clone, Copy)]
struct SurfaceContact {
    /// Point on the segment nearest the surface.
    segment_point: Vec3,
    /// Nearest point on the volume surface.
    surface_point: Vec3,
    /// Signed distance, negative when `segment_point` is inside the volume.
    distance: f32,
}

impl SurfaceContact {
    /// Unit normal pointing out of the volume towards the segment.
    fn normal(&self) -> Option<Vec3> {
        let offset = self.segment_point - self.surface_point;
        let length = offset.length();
        if length <= f32::EPSILON {
            return None;
        }
        let normal = offset / length;
        Some(if self.distance < 0.0 { -normal } else { normal })
    }
}

impl CollisionVolume {
    /// Convex volumes are answered from exact point projections. GJK against
    /// large cuboids loses millimeters in `f32`, which is a sizeable share of
    /// a skin width.
    fn is_convex(&self) -> bool {
        self.shape.is_convex()
    }

    fn surface_contact(&self, p: Vec3) -> SurfaceContact {
        let projection = self.shape.project_point(&self.transform, &point(p), false);
        let surface_point = vec3(&projection.point.coords);
        let distance = p.distance(surface_point);

        SurfaceContact {
            segment_point: p,
            surface_point,
            distance: if projection.is_inside { -distance } else { distance },
        }
    }

    /// Closest approach of the segment `a..b`.
    ///
    /// Signed distance to a convex volume is convex along a segment, so a
    /// golden-section search finds the global minimum.
    fn closest_to_segment(&self, a: Vec3, b: Vec3) -> SurfaceContact {
        let at = |t: f32| self.surface_contact(a.lerp(b, t));
        if a.distance_squared(b) <= f32::EPSILON {
            return at(0.0);
        }

        let ratio = 0.618_034_f32;
        let (mut lo, mut hi) = (0.0_f32, 1.0_f32);
        let (mut left_t, mut right_t) = (1.0 - ratio, ratio);
        let (mut left, mut right) = (at(left_t), at(right_t));

        for _ in 0..SEGMENT_SEARCH_ITERATIONS {
            if left.distance <= right.distance {
                hi = right_t;
                right = left;
                right_t = left_t;
                left_t = hi - ratio * (hi - lo);
                left = at(left_t);
            } else {
                lo = left_t;
                left = right;
                left_t = right_t;
                right_t = lo + ratio * (hi - lo);
                right = at(right_t);
            }
        }

        // Endpoints tie with the interior on faces parallel to the segment.
        [at(0.0), at(1.0), right]
            .into_iter()
            .fold(left, |best, c| if c.distance < best.distance { c } else { best })
    }

    fn overlaps(&self, segment: &CapsuleSegment) -> bool {
        if self.is_convex() {
            return self.closest_to_segment(segment.a, segment.b).distance < segment.radius;
        }

        let (shape, pose) = parry_shape(segment);
        matches!(
            query::intersection_test(&pose, shape.as_ref(), &self.transform, self.shape.as_ref()),
            Ok(true)
        )
    }

    fn penetration(&self, segment: &CapsuleSegment) -> Option<Penetration> {
        if self.is_convex() {
            let closest = self.closest_to_segment(segment.a, segment.b);
            let depth = segment.radius - closest.distance;
            if depth <= 0.0 {
                return None;
            }
            if let Some(direction) = closest.normal() {
                return Some(Penetration {
                    direction,
                    distance: depth,
                });
            }
        }

        let (shape, pose) = parry_shape(segment);
        match query::contact(&pose, shape.as_ref(), &self.transform, self.shape.as_ref(), 0.0) {
            // Negative dist means penetration; normal1 points out of the agent.
            Ok(Some(contact)) if contact.dist < 0.0 => Some(Penetration {
                direction: -vec3(&contact.normal1),
                distance: -contact.dist,
            }),
            _ => None,
        }
    }

    /// Turn a coarse time of impact into an exact one.
    ///
    /// The gap between a translating segment and a convex volume is convex
    /// in the travelled distance, so advancing by the current gap never
    /// tunnels and bisection has a single crossing to find.
    fn refine_cast(
        &self,
        segment: &CapsuleSegment,
        dir: Vec3,
        estimate: f32,
        max_distance: f32,
    ) -> Option<SweepHit> {
        let gap = |s: f32| {
            let contact = self.closest_to_segment(segment.a + dir * s, segment.b + dir * s);
            (contact.distance - segment.radius, contact)
        };

        // Volumes overlapping the start pose are not obstructions.
        if gap(0.0).0 <= 0.0 {
            return None;
        }

        let mut s = estimate.clamp(0.0, max_distance);
        let (mut remaining, mut contact) = gap(s);

        if remaining < 0.0 {
            let (mut lo, mut hi) = (0.0, s);
            for _ in 0..BISECT_ITERATIONS {
                let mid = 0.5 * (lo + hi);
                if gap(mid).0 > 0.0 {
                    lo = mid;
                } else {
                    hi = mid;
                }
            }
            s = lo;
            contact = gap(s).1;
        } else {
            for _ in 0..ADVANCE_ITERATIONS {
                if remaining <= CONTACT_TOLERANCE {
                    break;
                }
                s += remaining;
                if s > max_distance {
                    return None;
                }
                (remaining, contact) = gap(s);
            }
        }

        Some(SweepHit {
            distance: s,
            point: contact.surface_point,
            normal: contact.normal().unwrap_or(-dir),
            volume: self.id,
        })
    }
}

impl CollisionQueries for CollisionWorld {
    fn raycast(&self, origin: Vec3, direction: Vec3, max_distance: f32, filter: &QueryFilter) -> Option<SweepHit> {
        let dir = direction.normalize_or_zero();
        if dir == Vec3::ZERO || max_distance <= 0.0 {
            return None;
        }

        let ray = Ray::new(point(origin), vector(dir));
        let mut closest: Option<SweepHit> = None;

        for volume in self.candidates(filter) {
            let Some(hit) = volume
                .shape
                .cast_ray_and_get_normal(&volume.transform, &ray, max_distance, true)
            else {
                continue;
            };

            // A solid ray starting inside the volume reports zero.
            if hit.time_of_impact <= 0.0 {
                continue;
            }

            if closest.map_or(true, |c| hit.time_of_impact < c.distance) {
                closest = Some(SweepHit {
                    distance: hit.time_of_impact,
                    point: origin + dir * hit.time_of_impact,
                    normal: vec3(&hit.normal),
                    volume: volume.id,
                });
            }
        }

        closest
    }

    fn sphere_cast(
        &self,
        center: Vec3,
        radius: f32,
        direction: Vec3,
        max_distance: f32,
        filter: &QueryFilter,
    ) -> Option<SweepHit> {
        self.cast(&CapsuleSegment::sphere(center, radius), direction, max_distance, filter)
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
        self.cast(&CapsuleSegment::new(point1, point2, radius), direction, max_distance, filter)
    }

    fn overlap_sphere(&self, center: Vec3, radius: f32, filter: &QueryFilter, results: &mut [VolumeId]) -> usize {
        self.overlap(&CapsuleSegment::sphere(center, radius), filter, results)
    }

    fn overlap_capsule(
        &self,
        point1: Vec3,
        point2: Vec3,
        radius: f32,
        filter: &QueryFilter,
        results: &mut [VolumeId],
    ) -> usize {
        self.overlap(&CapsuleSegment::new(point1, point2, radius), filter, results)
    }

    fn compute_penetration(&self, shape: &CapsuleSegment, volume: VolumeId) -> Option<Penetration> {
        self.volume(volume)?.penetration(shape)
    }

    fn volume_flags(&self, volume: VolumeId) -> VolumeFlags {
        self.volume(volume).map_or(VolumeFlags::NONE, |v| v.flags)
    }
}

/// Parry shape and pose for a segment, as a ball when it is degenerate.
fn parry_shape(segment: &CapsuleSegment) -> (SharedShape, Isometry<Real>) {
    if segment.is_sphere() {
        let center = segment.center();
        (
            SharedShape::ball(segment.radius),
            Isometry::translation(center.x, center.y, center.z),
        )
    } else {
        (
            SharedShape::capsule(point(segment.a), point(segment.b), segment.radius),
            Isometry::identity(),
        )
    }
}

fn point(v: Vec3) -> Point<Real> {
    Point::new(v.x, v.y, v.z)
}

fn vector(v: Vec3) -> Vector<Real> {
    Vector::new(v.x, v.y, v.z)
}

fn vec3(v: &Vector<Real>) -> Vec3 {
    Vec3::new(v.x, v.y, v.z)
}

fn isometry(position: Vec3, rotation: Quat) -> Isometry<Real> {
    let rotation = UnitQuaternion::from_quaternion(Quaternion::new(rotation.w, rotation.x, rotation.y, rotation.z));
    Isometry::from_parts(Translation3::new(position.x, position.y, position.z), rotation)
}
