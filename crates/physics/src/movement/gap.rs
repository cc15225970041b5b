//! Inside-corner detection.
//!
//! Where two walls meet at an inside corner, the lateral sweep keeps
//! hitting one wall, sliding into the other and trying to step up between
//! them, which shows up as jitter. Two short rays fanned around the
//! forward axis detect that situation so the lateral pass can stop.

use glam::{Quat, Vec3};

use crate::collision::CollisionQueries;

use super::slide_move::SolverContext;

/// Whether the agent at `position` faces an inside corner.
///
/// Both rays, of length one diameter, must hit un-ignored volumes with
/// normals that differ beyond the tuning tolerance.
pub(crate) fn moving_towards_gap<Q: CollisionQueries + ?Sized>(ctx: &SolverContext<'_, Q>, position: Vec3) -> bool {
    let tuning = &ctx.config.tuning;
    let distance = ctx.shape.radius * 2.0;
    let up = ctx.up();
    let forward = ctx.rotation * Vec3::Z;
    let origin = ctx.center(position);
    let angle = tuning.gap_angle.to_radians();

    let first_direction = Quat::from_axis_angle(up, angle) * forward;
    let Some(first) = ctx.unignored(ctx.queries.raycast(origin, first_direction, distance, &ctx.filter)) else {
        return false;
    };

    let second_direction = Quat::from_axis_angle(up, -angle) * forward;
    let Some(second) = ctx.unignored(ctx.queries.raycast(origin, second_direction, distance, &ctx.filter)) else {
        return false;
    };

    !first.normal.abs_diff_eq(second.normal, tuning.gap_normal_tolerance)
}
