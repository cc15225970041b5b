//! Collide-and-slide sweep solver.
//!
//! Each call to [`slide_move`] resolves one pass of a move: the lateral part
//! or the vertical part of the requested displacement. A pass repeatedly
//! sweeps the shape along the remaining motion, advances to just short of
//! the first obstruction and redirects what is left along the contact
//! plane. The vertical pass treats walkable ground as a stop rather than a
//! plane to slide along, so agents do not creep down gentle slopes.

use glam::{Quat, Vec3};

use crate::collision::{CollisionQueries, QueryFilter, SweepHit};

use super::config::ControllerConfig;
use super::gap;
use super::ignore::IgnoreSet;
use super::shape::CapsuleShape;
use super::state::{CollisionSides, ContactState, Pose};

/// Which component of the displacement a pass resolves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlidePass {
    Lateral,
    Vertical,
}

/// Everything a solver stage reads, borrowed from the controller for one move.
pub(crate) struct SolverContext<'a, Q: ?Sized> {
    pub queries: &'a Q,
    pub config: &'a ControllerConfig,
    pub shape: &'a CapsuleShape,
    pub collider: &'a CapsuleShape,
    pub ignored: &'a IgnoreSet,
    pub filter: QueryFilter,
    pub rotation: Quat,
}

impl<Q: CollisionQueries + ?Sized> SolverContext<'_, Q> {
    #[inline]
    pub fn up(&self) -> Vec3 {
        self.rotation * Vec3::Y
    }

    #[inline]
    pub fn pose(&self, position: Vec3) -> Pose {
        Pose::new(position, self.rotation)
    }

    /// World-space center of the shape at `position`.
    #[inline]
    pub fn center(&self, position: Vec3) -> Vec3 {
        self.shape.world_center(&self.pose(position))
    }

    /// Offset from the center to the upper capsule point.
    #[inline]
    pub fn capsule_offset(&self) -> Vec3 {
        self.shape.segment_offset(self.rotation)
    }

    /// Drop hits on ignored volumes.
    #[inline]
    pub fn unignored(&self, hit: Option<SweepHit>) -> Option<SweepHit> {
        hit.filter(|h| !self.ignored.contains(h.volume))
    }

    /// Sweep the shape, falling back to a ray for geometry thin enough for
    /// the swept volume to straddle.
    pub fn sweep_test(
        &self,
        origin: Vec3,
        point1: Vec3,
        point2: Vec3,
        direction: Vec3,
        distance: f32,
    ) -> Option<SweepHit> {
        let radius = self.shape.radius;
        let swept = if self.shape.is_spherical() {
            self.queries.sphere_cast(origin, radius, direction, distance, &self.filter)
        } else {
            self.queries
                .capsule_cast(point1, point2, radius, direction, distance, &self.filter)
        };

        swept.or_else(|| self.queries.raycast(origin, direction, distance, &self.filter))
    }

    /// Normal of the surface under a hit point.
    ///
    /// Shape casts report the normal of the contact between the rounded cap
    /// and the obstacle, which on step edges is tilted. A short ray back into
    /// the surface recovers the face normal.
    pub fn surface_normal(&self, hit: &SweepHit) -> Vec3 {
        let tuning = &self.config.tuning;
        let origin = hit.point + hit.normal * tuning.normal_probe_offset;

        self.queries
            .raycast(origin, -hit.normal, tuning.normal_probe_distance, &self.filter)
            .map_or(hit.normal, |probe| probe.normal)
    }

    /// Whether the surface normal probe applies to this pass.
    #[inline]
    pub fn probes_surface_normal(&self, pass: SlidePass) -> bool {
        pass == SlidePass::Vertical && self.config.handle_steps && !self.shape.is_spherical()
    }
}

/// Angle between two directions in degrees. Zero when either is degenerate.
pub fn surface_angle(up: Vec3, normal: Vec3) -> f32 {
    let denominator = (up.length_squared() * normal.length_squared()).sqrt();
    if denominator < 1e-15 {
        return 0.0;
    }
    let cos = (up.dot(normal) / denominator).clamp(-1.0, 1.0);
    cos.acos().to_degrees()
}

/// Project `vector` onto the plane with the given (not necessarily unit) normal.
pub fn project_on_plane(vector: Vec3, normal: Vec3) -> Vec3 {
    let length_squared = normal.length_squared();
    if length_squared < f32::EPSILON {
        return vector;
    }
    vector - normal * (vector.dot(normal) / length_squared)
}

/// Resolve one pass of a move.
///
/// # Arguments
///
/// * `ctx` - Shape, configuration and queries for this move
/// * `position` - Pose position at the start of the pass
/// * `motion` - Displacement this pass should apply
/// * `pass` - Lateral or vertical
/// * `contacts` - Receives the surfaces touched
///
/// # Returns
///
/// The position after the pass.
pub(crate) fn slide_move<Q: CollisionQueries + ?Sized>(
    ctx: &SolverContext<'_, Q>,
    mut position: Vec3,
    mut motion: Vec3,
    pass: SlidePass,
    contacts: &mut ContactState,
) -> Vec3 {
    let config = ctx.config;
    let radius = ctx.shape.radius;
    let skin_width = config.skin_width;
    let up = ctx.up();
    let lateral = pass == SlidePass::Lateral;

    for _ in 0..config.tuning.max_slide_iterations {
        let move_distance = motion.length();
        if move_distance <= f32::EPSILON {
            break;
        }

        if lateral && gap::moving_towards_gap(ctx, position) {
            log::trace!("inside corner ahead of {:?}, lateral motion stopped", position);
            contacts.sides.set(CollisionSides::GAP, true);
            break;
        }

        let move_direction = motion / move_distance;
        let mut distance = move_distance + radius - skin_width;
        let mut origin = ctx.center(position) - move_direction * radius;
        let mut point1 = origin - ctx.capsule_offset();
        let point2 = origin + ctx.capsule_offset();

        if lateral {
            distance += config.tuning.lateral_epsilon;

            if config.handle_steps && !ctx.shape.is_spherical() {
                // Lift the lower point so the cast clears risers up to the step offset.
                point1 += up * config.step_offset;
            } else {
                origin += up * (0.5 * config.step_offset);
            }
        }

        let Some(hit) = ctx.unignored(ctx.sweep_test(origin, point1, point2, move_direction, distance)) else {
            position += motion;
            break;
        };

        let safe_distance = hit.distance - skin_width - radius;
        let offset = move_direction * safe_distance;
        position += offset;

        let normal = if ctx.probes_surface_normal(pass) {
            ctx.surface_normal(&hit)
        } else {
            hit.normal
        };
        let angle = surface_angle(up, normal);
        let walkable = angle <= config.slope_limit;

        record_contact(contacts, pass, &hit, normal, walkable, move_direction.dot(up));

        // Landing on walkable ground ends redirection for this pass.
        if walkable && !lateral {
            continue;
        }

        motion = project_on_plane(motion - offset, normal);

        if lateral && angle >= config.slope_limit && up.dot(normal) > 0.0 {
            motion -= up * motion.dot(up);
        }
    }

    position
}

fn record_contact(
    contacts: &mut ContactState,
    pass: SlidePass,
    hit: &SweepHit,
    normal: Vec3,
    walkable: bool,
    rise: f32,
) {
    contacts.last_normal = Some(normal);
    contacts.last_volume = Some(hit.volume);

    let side = match pass {
        SlidePass::Lateral => CollisionSides::SIDES,
        SlidePass::Vertical if walkable && rise < 0.0 => CollisionSides::BELOW,
        SlidePass::Vertical if rise > 0.0 => CollisionSides::ABOVE,
        SlidePass::Vertical => CollisionSides::SIDES,
    };
    contacts.sides.set(side, true);
}
