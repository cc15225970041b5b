//! Entity controller - main movement entry point.
//!
//! The controller owns the shape, the ignore set and the query port, and
//! moves a caller-owned [`Pose`] through the world each tick.

use glam::{Quat, Vec3};

use crate::collision::{CapsuleSegment, CollisionLayers, CollisionQueries, QueryFilter, VolumeId};

use super::config::{ConfigError, ControllerConfig};
use super::ignore::IgnoreSet;
use super::penetration::{resolve_penetration, snap_to_ground};
use super::shape::CapsuleShape;
use super::slide_move::{slide_move, surface_angle, SlidePass, SolverContext};
use super::state::{ContactState, GroundHit, Pose};

/// Kinematic capsule controller for a single agent.
///
/// Generic over the query port so the same solver runs against the bundled
/// [`CollisionWorld`](crate::CollisionWorld), a shared `Arc` of it, or any
/// other backend.
#[derive(Debug, Clone)]
pub struct EntityController<Q> {
    queries: Q,
    config: ControllerConfig,
    shape: CapsuleShape,
    collider: CapsuleShape,
    ignored: IgnoreSet,
    self_volume: Option<VolumeId>,
    overlaps: Vec<VolumeId>,
    contacts: ContactState,
    enabled: bool,
}

impl<Q: CollisionQueries> EntityController<Q> {
    /// Create a controller after validating its configuration.
    pub fn new(queries: Q, config: ControllerConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let shape = CapsuleShape::new(config.radius, config.height, config.center, config.skin_width);
        let collider = shape.collider(config.skin_width);
        let overlaps = vec![VolumeId::default(); config.tuning.overlap_capacity];

        Ok(Self {
            queries,
            config,
            shape,
            collider,
            ignored: IgnoreSet::new(),
            self_volume: None,
            overlaps,
            contacts: ContactState::default(),
            enabled: true,
        })
    }

    /// Exclude the agent's own body volume from every query.
    pub fn with_self_volume(mut self, volume: VolumeId) -> Self {
        self.self_volume = Some(volume);
        self
    }

    // ========================================================================
    // Movement
    // ========================================================================

    /// Move `pose` by `displacement`, sliding along and stepping over
    /// geometry.
    ///
    /// Returns the displacement actually applied. Contact information for
    /// the move is available from [`EntityController::contacts`] afterwards.
    pub fn move_by(&mut self, pose: &mut Pose, displacement: Vec3) -> Vec3 {
        if !self.enabled {
            return Vec3::ZERO;
        }

        self.contacts = ContactState::default();
        let start = pose.position;

        if !self.config.handle_collision {
            pose.position += displacement;
            return displacement;
        }

        let local = pose.rotation.inverse() * displacement;
        let lateral = pose.rotation * Vec3::new(local.x, 0.0, local.z);
        let vertical = pose.rotation * Vec3::new(0.0, local.y, 0.0);

        let filter = self.filter();
        let ctx = SolverContext {
            queries: &self.queries,
            config: &self.config,
            shape: &self.shape,
            collider: &self.collider,
            ignored: &self.ignored,
            filter,
            rotation: pose.rotation,
        };

        let mut position = slide_move(&ctx, start, lateral, SlidePass::Lateral, &mut self.contacts);
        position = slide_move(&ctx, position, vertical, SlidePass::Vertical, &mut self.contacts);
        position = resolve_penetration(&ctx, position, &mut self.overlaps, &mut self.contacts);
        position = snap_to_ground(&ctx, position, &mut self.contacts);

        pose.position = position;
        self.contacts.ground = self.probe_ground(pose, self.config.tuning.ground_probe_distance);

        position - start
    }

    /// Change the height, keeping the bottom of the shape in place.
    pub fn resize(&mut self, height: f32) {
        let previous = self.shape.height;
        self.config.height = height;
        self.refresh_shape();

        let delta = self.shape.height - previous;
        self.config.center += Vec3::Y * (0.5 * delta);
        self.refresh_shape();

        log::debug!("resized from {:.3} to {:.3}", previous, self.shape.height);
    }

    /// Add or remove a volume from the ignore set.
    pub fn ignore_collider(&mut self, volume: VolumeId, ignore: bool) {
        self.ignored.set(volume, ignore);
    }

    pub fn is_ignoring(&self, volume: VolumeId) -> bool {
        self.ignored.contains(volume)
    }

    // ========================================================================
    // Probes
    // ========================================================================

    /// Look for ground at most `max_distance` below the shape.
    pub fn probe_ground(&self, pose: &Pose, max_distance: f32) -> Option<GroundHit> {
        let filter = self.filter();
        let radius = self.shape.radius;
        let skin_width = self.config.skin_width;
        let up = pose.up();

        // Start one radius above the lower cap so a shape resting within the
        // skin does not begin the cast overlapping the ground.
        let lower = self.shape.world_center(pose) - self.shape.segment_offset(pose.rotation);
        let origin = lower + up * radius;
        let distance = radius + skin_width + max_distance;

        let hit = self
            .queries
            .sphere_cast(origin, radius, -up, distance, &filter)
            .filter(|hit| !self.ignored.contains(hit.volume))?;

        let ctx = SolverContext {
            queries: &self.queries,
            config: &self.config,
            shape: &self.shape,
            collider: &self.collider,
            ignored: &self.ignored,
            filter,
            rotation: pose.rotation,
        };
        let normal = if ctx.probes_surface_normal(SlidePass::Vertical) {
            ctx.surface_normal(&hit)
        } else {
            hit.normal
        };
        let angle = surface_angle(up, normal);

        Some(GroundHit {
            distance: hit.distance - radius,
            normal,
            angle,
            walkable: angle <= self.config.slope_limit,
            volume: hit.volume,
        })
    }

    /// Whether the shape can grow to `height` without hitting a ceiling.
    ///
    /// The bottom stays in place on [`EntityController::resize`], so only the
    /// space above the current top needs to be clear.
    pub fn has_headroom(&self, pose: &Pose, height: f32) -> bool {
        let target = CapsuleShape::new(self.config.radius, height, Vec3::ZERO, self.config.skin_width);
        let radius = self.shape.radius;
        let growth = target.height - self.shape.height;
        if growth <= 0.0 {
            return true;
        }

        let upper = self.shape.world_center(pose) + self.shape.segment_offset(pose.rotation);
        let filter = self.filter();
        self.queries
            .sphere_cast(upper, radius, pose.up(), growth, &filter)
            .filter(|hit| !self.ignored.contains(hit.volume))
            .is_none()
    }

    // ========================================================================
    // Shape
    // ========================================================================

    /// Radius, floored at the skin width.
    pub fn radius(&self) -> f32 {
        self.shape.radius
    }

    /// Height, floored at the diameter.
    pub fn height(&self) -> f32 {
        self.shape.height
    }

    pub fn center(&self) -> Vec3 {
        self.config.center
    }

    pub fn skin_width(&self) -> f32 {
        self.config.skin_width
    }

    pub fn is_spherical(&self) -> bool {
        self.shape.is_spherical()
    }

    /// The physical collider, shrunk by the skin width.
    pub fn collider(&self) -> &CapsuleShape {
        &self.collider
    }

    /// The collider posed in world space.
    pub fn collider_segment(&self, pose: &Pose) -> CapsuleSegment {
        self.collider.segment(pose)
    }

    /// World-space bounds `(min, max)` of the collider.
    pub fn bounds(&self, pose: &Pose) -> (Vec3, Vec3) {
        self.collider.bounds(pose)
    }

    /// Offset from the shape center to the upper capsule point.
    pub fn capsule_offset(&self, rotation: Quat) -> Vec3 {
        self.shape.segment_offset(rotation)
    }

    pub fn set_radius(&mut self, radius: f32) -> Result<(), ConfigError> {
        self.reconfigure(|config| config.radius = radius)
    }

    pub fn set_height(&mut self, height: f32) -> Result<(), ConfigError> {
        self.reconfigure(|config| config.height = height)
    }

    pub fn set_center(&mut self, center: Vec3) -> Result<(), ConfigError> {
        self.reconfigure(|config| config.center = center)
    }

    pub fn set_skin_width(&mut self, skin_width: f32) -> Result<(), ConfigError> {
        self.reconfigure(|config| config.skin_width = skin_width)
    }

    pub fn set_slope_limit(&mut self, degrees: f32) -> Result<(), ConfigError> {
        self.reconfigure(|config| config.slope_limit = degrees)
    }

    pub fn set_step_offset(&mut self, step_offset: f32) -> Result<(), ConfigError> {
        self.reconfigure(|config| config.step_offset = step_offset)
    }

    pub fn set_layers(&mut self, layers: CollisionLayers) {
        self.config.layers = layers;
    }

    pub fn set_handle_collision(&mut self, handle_collision: bool) {
        self.config.handle_collision = handle_collision;
    }

    pub fn set_handle_steps(&mut self, handle_steps: bool) {
        self.config.handle_steps = handle_steps;
    }

    // ========================================================================
    // State
    // ========================================================================

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    pub fn queries(&self) -> &Q {
        &self.queries
    }

    pub fn contacts(&self) -> &ContactState {
        &self.contacts
    }

    pub fn is_grounded(&self) -> bool {
        self.contacts.is_grounded()
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// A disabled controller ignores every move.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    fn filter(&self) -> QueryFilter {
        QueryFilter::new(self.config.layers).excluding(self.self_volume)
    }

    /// Apply a config change, rolling it back if it breaks an invariant.
    fn reconfigure(&mut self, change: impl FnOnce(&mut ControllerConfig)) -> Result<(), ConfigError> {
        let mut config = self.config.clone();
        change(&mut config);
        config.validate()?;
        self.config = config;
        self.refresh_shape();
        Ok(())
    }

    fn refresh_shape(&mut self) {
        let config = &self.config;
        self.shape = CapsuleShape::new(config.radius, config.height, config.center, config.skin_width);
        self.collider = self.shape.collider(config.skin_width);
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collision::{CollisionWorld, Penetration, SweepHit, VolumeFlags};
    use crate::movement::state::CollisionSides;

    /// Resting height of the default capsule center above a floor at y=0.
    const REST_Y: f32 = 1.01;

    /// Face of the wall in [`create_wall_world`].
    const WALL_FACE_X: f32 = 2.5;

    fn create_test_world() -> CollisionWorld {
        let mut world = CollisionWorld::new();

        // Floor at y=0
        world.add_box(
            Vec3::new(0.0, -0.5, 0.0),
            Vec3::new(50.0, 0.5, 50.0),
            CollisionLayers::DEFAULT,
        );

        world
    }

    /// Floor plus a wall whose face is at x=2.5.
    fn create_wall_world() -> (CollisionWorld, VolumeId) {
        let mut world = create_test_world();
        let wall = world.add_box(
            Vec3::new(3.0, 1.5, 0.0),
            Vec3::new(0.5, 1.5, 5.0),
            CollisionLayers::DEFAULT,
        );
        (world, wall)
    }

    fn controller<Q: CollisionQueries>(queries: Q) -> EntityController<Q> {
        EntityController::new(queries, ControllerConfig::default()).unwrap()
    }

    /// Check the collider against the fixture geometry directly: the floor
    /// top at y=0 and, when `wall_face` is set, a wall face at that x.
    fn assert_clear_of_fixtures(controller: &EntityController<&CollisionWorld>, pose: &Pose, wall_face: Option<f32>) {
        let collider = controller.collider_segment(pose);
        let lowest = collider.a.y.min(collider.b.y) - collider.radius;
        assert!(lowest > -1e-4, "collider sunk {} into the floor", -lowest);

        if let Some(face) = wall_face {
            let front = collider.a.x.max(collider.b.x) + collider.radius;
            assert!(front < face + 1e-4, "collider sunk {} into the wall", front - face);
        }
    }

    // ========================================================================
    // Flat ground
    // ========================================================================

    #[test]
    fn test_flat_ground_move() {
        let world = create_test_world();
        let mut controller = controller(&world);
        let mut pose = Pose::at(Vec3::new(0.0, REST_Y, 0.0));

        let applied = controller.move_by(&mut pose, Vec3::new(1.0, 0.0, 0.0));

        assert!((pose.position.x - 1.0).abs() < 1e-3, "x={}", pose.position.x);
        assert!((pose.position.y - REST_Y).abs() < 1e-6);
        assert_eq!(pose.position.z, 0.0);
        assert!((applied - Vec3::X).length() < 1e-3);
        assert!(controller.is_grounded());
    }

    #[test]
    fn test_zero_motion_is_idempotent() {
        let world = create_test_world();
        let mut controller = controller(&world);
        let mut pose = Pose::at(Vec3::new(0.0, REST_Y, 0.0));

        for _ in 0..5 {
            let applied = controller.move_by(&mut pose, Vec3::ZERO);
            assert_eq!(applied, Vec3::ZERO);
        }
        assert_eq!(pose.position, Vec3::new(0.0, REST_Y, 0.0));
    }

    #[test]
    fn test_yawed_agent_moves_in_world_space() {
        let world = create_test_world();
        let mut controller = controller(&world);
        let mut pose = Pose::new(Vec3::new(0.0, REST_Y, 0.0), Quat::from_rotation_y(0.5));

        controller.move_by(&mut pose, Vec3::new(1.0, 0.0, 0.0));

        assert!((pose.position.x - 1.0).abs() < 1e-3);
        assert!(pose.position.z.abs() < 1e-4);
    }

    #[test]
    fn test_falls_onto_ground() {
        let world = create_test_world();
        let mut controller = controller(&world);
        let mut pose = Pose::at(Vec3::new(0.0, 3.0, 0.0));

        controller.move_by(&mut pose, Vec3::new(0.0, -0.5, 0.0));
        assert!((pose.position.y - 2.5).abs() < 1e-5);
        assert!(!controller.is_grounded());

        controller.move_by(&mut pose, Vec3::new(0.0, -5.0, 0.0));
        assert!((pose.position.y - REST_Y).abs() < 1e-5, "y={}", pose.position.y);
        assert!(controller.is_grounded());
        assert!(controller.contacts().sides.has(CollisionSides::BELOW));
    }

    #[test]
    fn test_sunk_agent_is_pushed_onto_large_floor() {
        let world = create_test_world();
        let mut controller = controller(&world);
        let mut pose = Pose::at(Vec3::new(0.0, 0.8, 0.0));

        controller.move_by(&mut pose, Vec3::ZERO);

        // Collider bottom sits 0.995 below the center
        assert!(pose.position.y > 0.995 - 1e-4, "y={}", pose.position.y);
        assert!(pose.position.y < REST_Y + 1e-4, "y={}", pose.position.y);
        assert!(pose.position.x.abs() < 1e-5 && pose.position.z.abs() < 1e-5);
        assert!(controller.contacts().sides.has(CollisionSides::PENETRATION));
        assert_clear_of_fixtures(&controller, &pose, None);
    }

    // ========================================================================
    // Walls and steps
    // ========================================================================

    #[test]
    fn test_wall_blocks() {
        let (world, wall) = create_wall_world();
        let mut controller = controller(&world);
        let mut pose = Pose::at(Vec3::new(0.0, REST_Y, 0.0));

        controller.move_by(&mut pose, Vec3::new(5.0, 0.0, 0.0));

        assert!((pose.position.x - 1.99).abs() < 2e-3, "x={}", pose.position.x);
        assert!((pose.position.y - REST_Y).abs() < 1e-3);
        assert!(controller.contacts().hit_wall());
        assert_eq!(controller.contacts().last_volume, Some(wall));
        assert_clear_of_fixtures(&controller, &pose, Some(WALL_FACE_X));
    }

    #[test]
    fn test_wall_slide() {
        let (world, _) = create_wall_world();
        let mut controller = controller(&world);
        let mut pose = Pose::at(Vec3::new(0.0, REST_Y, 0.0));

        controller.move_by(&mut pose, Vec3::new(5.0, 0.0, 5.0));

        assert!(pose.position.x > 1.9 && pose.position.x < 2.0, "x={}", pose.position.x);
        assert!((pose.position.z - 5.0).abs() < 1e-2, "z={}", pose.position.z);
    }

    #[test]
    fn test_step_up() {
        let mut world = create_test_world();
        // 0.25 high step spanning x=1..4
        world.add_box(
            Vec3::new(2.5, 0.125, 0.0),
            Vec3::new(1.5, 0.125, 2.0),
            CollisionLayers::DEFAULT,
        );
        let mut controller = controller(&world);
        let mut pose = Pose::at(Vec3::new(0.0, REST_Y, 0.0));

        controller.move_by(&mut pose, Vec3::new(2.0, 0.0, 0.0));

        assert!((pose.position.x - 2.0).abs() < 1e-3, "x={}", pose.position.x);
        assert!((pose.position.y - 1.245).abs() < 1e-2, "y={}", pose.position.y);
        assert!(controller.is_grounded());
    }

    #[test]
    fn test_step_at_step_offset_is_climbed() {
        let mut world = create_test_world();
        // Riser exactly as tall as the default step offset
        world.add_box(
            Vec3::new(2.5, 0.15, 0.0),
            Vec3::new(1.5, 0.15, 2.0),
            CollisionLayers::DEFAULT,
        );
        let mut controller = controller(&world);
        let mut pose = Pose::at(Vec3::new(0.0, REST_Y, 0.0));

        controller.move_by(&mut pose, Vec3::new(2.0, 0.0, 0.0));

        assert!((pose.position.x - 2.0).abs() < 1e-3, "x={}", pose.position.x);
        assert!((pose.position.y - 1.295).abs() < 1e-2, "y={}", pose.position.y);
        assert!(controller.is_grounded());
    }

    #[test]
    fn test_tall_step_blocks() {
        let mut world = create_test_world();
        // 0.5 high block spanning x=1..4
        world.add_box(
            Vec3::new(2.5, 0.25, 0.0),
            Vec3::new(1.5, 0.25, 2.0),
            CollisionLayers::DEFAULT,
        );
        let mut controller = controller(&world);
        let mut pose = Pose::at(Vec3::new(0.0, REST_Y, 0.0));

        controller.move_by(&mut pose, Vec3::new(2.0, 0.0, 0.0));

        assert!(pose.position.x < 0.7, "x={}", pose.position.x);
        assert!(pose.position.y < 1.05, "y={}", pose.position.y);
    }

    #[test]
    fn test_corner_suppression() {
        let mut world = create_test_world();
        world.add_box(Vec3::new(1.5, 1.5, 0.0), Vec3::new(0.5, 1.5, 5.0), CollisionLayers::DEFAULT);
        world.add_box(Vec3::new(0.0, 1.5, 1.5), Vec3::new(5.0, 1.5, 0.5), CollisionLayers::DEFAULT);
        let mut controller = controller(&world);

        let start = Vec3::new(0.3, REST_Y, 0.3);
        let mut pose = Pose::new(start, Quat::from_rotation_y(45f32.to_radians()));

        controller.move_by(&mut pose, Vec3::new(0.5, 0.0, 0.5));

        assert_eq!(pose.position, start);
        assert!(controller.contacts().sides.has(CollisionSides::GAP));
    }

    #[test]
    fn test_trigger_does_not_block() {
        let mut world = create_test_world();
        let trigger = world.add_box(Vec3::new(2.0, 1.0, 0.0), Vec3::splat(0.5), CollisionLayers::GAMEPLAY);
        world.set_flags(trigger, VolumeFlags::TRIGGER);
        let mut controller = controller(&world);
        let mut pose = Pose::at(Vec3::new(0.0, REST_Y, 0.0));

        controller.move_by(&mut pose, Vec3::new(4.0, 0.0, 0.0));

        assert!((pose.position.x - 4.0).abs() < 1e-3);
    }

    #[test]
    fn test_spherical_controller() {
        let (world, _) = create_wall_world();
        let config = ControllerConfig {
            height: 1.0,
            ..Default::default()
        };
        let mut controller = EntityController::new(&world, config).unwrap();
        assert!(controller.is_spherical());

        let mut pose = Pose::at(Vec3::new(0.0, 0.51, 0.0));
        controller.move_by(&mut pose, Vec3::new(1.0, 0.0, 0.0));
        assert!((pose.position.x - 1.0).abs() < 1e-3);

        controller.move_by(&mut pose, Vec3::new(3.0, 0.0, 0.0));
        assert!((pose.position.x - 1.99).abs() < 2e-3, "x={}", pose.position.x);
        assert!((pose.position.y - 0.51).abs() < 1e-3);
    }

    // ========================================================================
    // Ignore set and penetration
    // ========================================================================

    #[test]
    fn test_ignored_volume_is_passed_through() {
        let (world, wall) = create_wall_world();
        let mut controller = controller(&world);
        let mut pose = Pose::at(Vec3::new(0.0, REST_Y, 0.0));

        controller.ignore_collider(wall, true);
        controller.ignore_collider(wall, true);
        assert!(controller.is_ignoring(wall));

        controller.move_by(&mut pose, Vec3::new(2.9, 0.0, 0.0));
        assert!((pose.position.x - 2.9).abs() < 1e-6, "x={}", pose.position.x);

        // Still overlapping, but ignored volumes are never corrected
        controller.move_by(&mut pose, Vec3::ZERO);
        assert!((pose.position.x - 2.9).abs() < 1e-6);

        controller.ignore_collider(wall, false);
        assert!(!controller.is_ignoring(wall));

        controller.move_by(&mut pose, Vec3::ZERO);
        assert!((pose.position.x - 2.01).abs() < 1e-2, "x={}", pose.position.x);
        assert!(controller.contacts().sides.has(CollisionSides::PENETRATION));
        assert_clear_of_fixtures(&controller, &pose, Some(WALL_FACE_X));
    }

    #[test]
    fn test_no_penetration_after_moves() {
        let (world, _) = create_wall_world();
        let mut controller = controller(&world);

        // Embedded in both the floor and the wall
        let mut pose = Pose::at(Vec3::new(2.2, 0.9, 0.0));
        controller.move_by(&mut pose, Vec3::ZERO);
        assert_clear_of_fixtures(&controller, &pose, Some(WALL_FACE_X));
        assert!(pose.position.x < 2.1);
        assert!(pose.position.y > 0.95);

        for motion in [
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(0.3, -0.2, 0.4),
            Vec3::new(0.5, -1.0, -0.5),
            Vec3::new(-0.2, -0.1, 0.0),
        ] {
            controller.move_by(&mut pose, motion);
            assert_clear_of_fixtures(&controller, &pose, Some(WALL_FACE_X));
        }
    }

    #[test]
    fn test_self_volume_is_excluded() {
        let mut world = create_test_world();
        let body = world.add_volume(
            parry3d::shape::SharedShape::capsule_y(0.5, 0.5),
            Vec3::new(0.3, REST_Y, 0.0),
            Quat::IDENTITY,
            CollisionLayers::AGENTS,
        );

        let mut pose = Pose::at(Vec3::new(0.0, REST_Y, 0.0));
        let mut excluded = controller(&world).with_self_volume(body);
        excluded.move_by(&mut pose, Vec3::ZERO);
        assert_eq!(pose.position, Vec3::new(0.0, REST_Y, 0.0));

        let mut included = controller(&world);
        included.move_by(&mut pose, Vec3::ZERO);
        assert!(pose.position.x < -0.5, "x={}", pose.position.x);
    }

    #[test]
    fn test_determinism() {
        let mut world = create_test_world();
        world.add_box(Vec3::new(3.0, 1.5, 0.0), Vec3::new(0.5, 1.5, 5.0), CollisionLayers::DEFAULT);
        world.add_box(Vec3::new(-2.0, 0.125, 0.0), Vec3::new(1.0, 0.125, 2.0), CollisionLayers::DEFAULT);
        world.add_ramp(Vec3::new(0.0, 0.0, -4.0), Vec3::new(2.0, 0.5, 1.5), 25.0, CollisionLayers::DEFAULT);

        let mut a = controller(&world);
        let mut b = controller(&world);
        let mut pose_a = Pose::at(Vec3::new(0.0, REST_Y, 0.0));
        let mut pose_b = pose_a;

        for i in 0..60 {
            let t = i as f32 * 0.3;
            let motion = Vec3::new(t.cos() * 0.3, -0.1, t.sin() * 0.3);
            let rotation = Quat::from_rotation_y(t);
            pose_a.rotation = rotation;
            pose_b.rotation = rotation;

            a.move_by(&mut pose_a, motion);
            b.move_by(&mut pose_b, motion);
            assert_eq!(pose_a.position, pose_b.position);
            assert_eq!(a.contacts(), b.contacts());
        }
    }

    // ========================================================================
    // Controller state
    // ========================================================================

    #[test]
    fn test_handle_collision_disabled() {
        let (world, _) = create_wall_world();
        let mut controller = controller(&world);
        controller.set_handle_collision(false);
        let mut pose = Pose::at(Vec3::new(0.0, REST_Y, 0.0));

        controller.move_by(&mut pose, Vec3::new(5.0, -3.0, 0.0));

        assert_eq!(pose.position, Vec3::new(5.0, REST_Y - 3.0, 0.0));
    }

    #[test]
    fn test_disabled_controller_does_not_move() {
        let world = create_test_world();
        let mut controller = controller(&world);
        controller.set_enabled(false);
        let mut pose = Pose::at(Vec3::new(0.0, REST_Y, 0.0));

        assert_eq!(controller.move_by(&mut pose, Vec3::X), Vec3::ZERO);
        assert_eq!(pose.position, Vec3::new(0.0, REST_Y, 0.0));

        controller.set_enabled(true);
        controller.move_by(&mut pose, Vec3::X);
        assert!((pose.position.x - 1.0).abs() < 1e-3);
    }

    #[test]
    fn test_resize_keeps_bottom() {
        let world = create_test_world();
        let mut controller = controller(&world);
        let pose = Pose::at(Vec3::new(0.0, REST_Y, 0.0));
        let (before, _) = controller.bounds(&pose);

        controller.resize(1.2);
        let (after, _) = controller.bounds(&pose);
        assert!((controller.height() - 1.2).abs() < 1e-6);
        assert!((controller.center().y + 0.4).abs() < 1e-6);
        assert!((before.y - after.y).abs() < 1e-5);
        assert!(!controller.is_spherical());

        // Clamped to the diameter
        controller.resize(0.2);
        assert_eq!(controller.height(), 1.0);
        assert!(controller.is_spherical());

        controller.resize(2.0);
        assert!(controller.center().y.abs() < 1e-6);
    }

    #[test]
    fn test_has_headroom() {
        let mut world = create_test_world();
        // Ceiling at y=2.5
        world.add_box(Vec3::new(0.0, 3.0, 0.0), Vec3::new(5.0, 0.5, 5.0), CollisionLayers::DEFAULT);
        let controller = controller(&world);
        let pose = Pose::at(Vec3::new(0.0, REST_Y, 0.0));

        assert!(controller.has_headroom(&pose, 1.0));
        assert!(controller.has_headroom(&pose, 2.4));
        assert!(!controller.has_headroom(&pose, 3.0));
    }

    #[test]
    fn test_probe_ground() {
        let world = create_test_world();
        let controller = controller(&world);

        let resting = Pose::at(Vec3::new(0.0, REST_Y, 0.0));
        let ground = controller.probe_ground(&resting, 0.1).expect("ground below");
        assert!((ground.distance - 0.01).abs() < 1e-5, "distance={}", ground.distance);
        assert!(ground.walkable);
        assert!((ground.normal - Vec3::Y).length() < 1e-3);

        let airborne = Pose::at(Vec3::new(0.0, 3.0, 0.0));
        assert!(controller.probe_ground(&airborne, 0.1).is_none());
    }

    #[test]
    fn test_setters_validate() {
        let world = create_test_world();
        let mut controller = controller(&world);

        assert!(matches!(
            controller.set_skin_width(0.6),
            Err(ConfigError::RadiusWithinSkin { .. })
        ));
        assert_eq!(controller.skin_width(), 0.01);

        controller.set_radius(0.4).unwrap();
        assert_eq!(controller.radius(), 0.4);
        assert!((controller.collider().radius - 0.39).abs() < 1e-6);

        assert!(controller.set_slope_limit(-1.0).is_err());
        controller.set_step_offset(0.5).unwrap();
        assert_eq!(controller.config().step_offset, 0.5);
    }

    // ========================================================================
    // Edge cases against scripted queries
    // ========================================================================

    /// Answers straight-down sweeps with a fixed hit and nothing else.
    struct SlopeQueries {
        normal: Vec3,
    }

    impl SlopeQueries {
        fn hit(&self, direction: Vec3) -> Option<SweepHit> {
            (direction.normalize().dot(Vec3::NEG_Y) > 0.999).then_some(SweepHit {
                distance: 0.6,
                point: Vec3::ZERO,
                normal: self.normal,
                volume: VolumeId(1),
            })
        }
    }

    impl CollisionQueries for SlopeQueries {
        fn raycast(&self, _: Vec3, _: Vec3, _: f32, _: &QueryFilter) -> Option<SweepHit> {
            None
        }

        fn sphere_cast(&self, _: Vec3, _: f32, direction: Vec3, _: f32, _: &QueryFilter) -> Option<SweepHit> {
            self.hit(direction)
        }

        fn capsule_cast(&self, _: Vec3, _: Vec3, _: f32, direction: Vec3, _: f32, _: &QueryFilter) -> Option<SweepHit> {
            self.hit(direction)
        }

        fn overlap_sphere(&self, _: Vec3, _: f32, _: &QueryFilter, _: &mut [VolumeId]) -> usize {
            0
        }

        fn overlap_capsule(&self, _: Vec3, _: Vec3, _: f32, _: &QueryFilter, _: &mut [VolumeId]) -> usize {
            0
        }

        fn compute_penetration(&self, _: &CapsuleSegment, _: VolumeId) -> Option<Penetration> {
            None
        }

        fn volume_flags(&self, _: VolumeId) -> VolumeFlags {
            VolumeFlags::NONE
        }
    }

    fn slope_normal(degrees: f32) -> Vec3 {
        let radians = degrees.to_radians();
        Vec3::new(radians.sin(), radians.cos(), 0.0)
    }

    #[test]
    fn test_slope_at_limit_is_walkable() {
        let normal = slope_normal(40.0);
        let config = ControllerConfig {
            slope_limit: surface_angle(Vec3::Y, normal),
            ..Default::default()
        };
        let mut controller = EntityController::new(SlopeQueries { normal }, config).unwrap();
        let mut pose = Pose::default();

        controller.move_by(&mut pose, Vec3::new(0.0, -1.0, 0.0));

        // Two clamped iterations, no sliding
        assert_eq!(pose.position.x, 0.0);
        assert_eq!(pose.position.z, 0.0);
        assert!((pose.position.y + 0.18).abs() < 1e-5, "y={}", pose.position.y);
        assert!(controller.contacts().sides.has(CollisionSides::BELOW));
    }

    #[test]
    fn test_slope_past_limit_slides() {
        let normal = slope_normal(40.0);
        let config = ControllerConfig {
            slope_limit: surface_angle(Vec3::Y, normal) - 0.01,
            ..Default::default()
        };
        let mut controller = EntityController::new(SlopeQueries { normal }, config).unwrap();
        let mut pose = Pose::default();

        controller.move_by(&mut pose, Vec3::new(0.0, -1.0, 0.0));

        assert!(pose.position.x > 0.3, "x={}", pose.position.x);
        assert!(!controller.contacts().sides.has(CollisionSides::BELOW));
    }

    /// One overlapping volume that needs a -X push, optionally backed by an
    /// obstacle in that direction.
    struct SqueezeQueries {
        flags: VolumeFlags,
        blocked: bool,
    }

    impl CollisionQueries for SqueezeQueries {
        fn raycast(&self, _: Vec3, _: Vec3, _: f32, _: &QueryFilter) -> Option<SweepHit> {
            None
        }

        fn sphere_cast(&self, _: Vec3, _: f32, _: Vec3, _: f32, _: &QueryFilter) -> Option<SweepHit> {
            None
        }

        fn capsule_cast(&self, _: Vec3, _: Vec3, _: f32, direction: Vec3, _: f32, _: &QueryFilter) -> Option<SweepHit> {
            (self.blocked && direction.x < -0.5).then_some(SweepHit {
                distance: 0.1,
                point: Vec3::ZERO,
                normal: Vec3::X,
                volume: VolumeId(2),
            })
        }

        fn overlap_sphere(&self, _: Vec3, _: f32, _: &QueryFilter, results: &mut [VolumeId]) -> usize {
            results[0] = VolumeId(7);
            1
        }

        fn overlap_capsule(&self, _: Vec3, _: Vec3, _: f32, _: &QueryFilter, results: &mut [VolumeId]) -> usize {
            results[0] = VolumeId(7);
            1
        }

        fn compute_penetration(&self, _: &CapsuleSegment, volume: VolumeId) -> Option<Penetration> {
            (volume == VolumeId(7)).then_some(Penetration {
                direction: Vec3::NEG_X,
                distance: 0.2,
            })
        }

        fn volume_flags(&self, _: VolumeId) -> VolumeFlags {
            self.flags
        }
    }

    fn squeeze(flags: VolumeFlags, blocked: bool) -> (Pose, ContactState) {
        let queries = SqueezeQueries { flags, blocked };
        let mut controller = EntityController::new(queries, ControllerConfig::default()).unwrap();
        let mut pose = Pose::default();
        controller.move_by(&mut pose, Vec3::ZERO);
        (pose, *controller.contacts())
    }

    #[test]
    fn test_platform_squeeze_lifts_agent() {
        let (pose, contacts) = squeeze(VolumeFlags::PLATFORM, true);
        assert_eq!(pose.position, Vec3::new(0.0, 1.0, 0.0));
        assert!(contacts.sides.has(CollisionSides::PLATFORM_NUDGE));
    }

    #[test]
    fn test_unblocked_platform_is_pushed_out() {
        let (pose, contacts) = squeeze(VolumeFlags::PLATFORM, false);
        assert_eq!(pose.position, Vec3::new(-0.2, 0.0, 0.0));
        assert!(contacts.sides.has(CollisionSides::PENETRATION));
    }

    #[test]
    fn test_solid_volume_is_pushed_out_even_when_blocked() {
        let (pose, _) = squeeze(VolumeFlags::NONE, true);
        assert_eq!(pose.position, Vec3::new(-0.2, 0.0, 0.0));
    }

    #[test]
    fn test_ignored_overlap_is_not_corrected() {
        let queries = SqueezeQueries {
            flags: VolumeFlags::NONE,
            blocked: false,
        };
        let mut controller = EntityController::new(queries, ControllerConfig::default()).unwrap();
        controller.ignore_collider(VolumeId(7), true);
        let mut pose = Pose::default();

        controller.move_by(&mut pose, Vec3::ZERO);

        assert_eq!(pose.position, Vec3::ZERO);
    }
}
