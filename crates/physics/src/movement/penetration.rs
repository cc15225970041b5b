//! Post-sweep corrections: residual penetration and ground snapping.

use glam::Vec3;

use crate::collision::{CollisionQueries, VolumeFlags, VolumeId};

use super::slide_move::SolverContext;
use super::state::{CollisionSides, ContactState};

/// Push the shape out of every volume it still overlaps.
///
/// Overlaps are gathered once with the full radius into `overlaps`; each
/// correction is then computed for the shrunken collider at the position
/// left by the previous correction.
pub(crate) fn resolve_penetration<Q: CollisionQueries + ?Sized>(
    ctx: &SolverContext<'_, Q>,
    mut position: Vec3,
    overlaps: &mut [VolumeId],
    contacts: &mut ContactState,
) -> Vec3 {
    let origin = ctx.center(position);
    let offset = ctx.capsule_offset();
    let radius = ctx.shape.radius;

    let count = if ctx.shape.is_spherical() {
        ctx.queries.overlap_sphere(origin, radius, &ctx.filter, overlaps)
    } else {
        ctx.queries
            .overlap_capsule(origin - offset, origin + offset, radius, &ctx.filter, overlaps)
    };

    for &volume in overlaps.iter().take(count) {
        if ctx.ignored.contains(volume) || ctx.filter.exclude == Some(volume) {
            continue;
        }

        let collider = ctx.collider.segment(&ctx.pose(position));
        let Some(penetration) = ctx.queries.compute_penetration(&collider, volume) else {
            continue;
        };

        let center = ctx.center(position);
        if ctx.queries.volume_flags(volume).contains(VolumeFlags::PLATFORM)
            && ctx
                .sweep_test(
                    center,
                    center - offset,
                    center + offset,
                    penetration.direction,
                    penetration.distance,
                )
                .is_some()
        {
            // Squeezed between a platform and something else: pushing out
            // would go through the other obstacle, so climb on top instead.
            log::debug!("agent squeezed against platform {:?}, lifting", volume);
            position += ctx.up() * (0.5 * ctx.shape.height);
            contacts.sides.set(CollisionSides::PLATFORM_NUDGE, true);
            continue;
        }

        log::debug!(
            "penetrating {:?} by {:.4} along {:?}",
            volume,
            penetration.distance,
            penetration.direction
        );
        position += penetration.direction * penetration.distance;
        contacts.sides.set(CollisionSides::PENETRATION, true);
    }

    position
}

/// Pull the shape down onto ground found inside its core segment.
///
/// Skin-width slack lets an agent sink a little each frame; when the core
/// segment of the capsule reaches a surface, the shape is moved so its
/// lowest point rests one skin width above the hit.
pub(crate) fn snap_to_ground<Q: CollisionQueries + ?Sized>(
    ctx: &SolverContext<'_, Q>,
    position: Vec3,
    contacts: &mut ContactState,
) -> Vec3 {
    let up = ctx.up();
    let origin = ctx.center(position);
    let offset = ctx.capsule_offset();
    let skin_offset = up * ctx.config.skin_width;

    let top = origin + offset - skin_offset;
    let bottom = origin - offset + skin_offset;

    // Spheres and very short capsules have no core segment to test.
    if (top - bottom).dot(up) <= 0.0 {
        return position;
    }

    let Some(hit) = ctx.unignored(ctx.queries.linecast(top, bottom, &ctx.filter)) else {
        return position;
    };

    let lowest = origin - up * (0.5 * ctx.shape.height);
    let target = hit.point + skin_offset;
    let lift = (target - lowest).dot(up);

    log::debug!("ground snap onto {:?} by {:.4}", hit.volume, lift);
    contacts.sides.set(CollisionSides::GROUND_SNAP, true);
    position + up * lift
}
