//! Level geometry, spawn points and triggers.

use std::sync::Arc;

use glam::Vec3;
use kinema_physics::{CollisionLayers, CollisionQueries, CollisionWorld, QueryFilter, VolumeFlags, VolumeId};
use serde::{Deserialize, Serialize};

/// Capacity of the trigger overlap buffer.
const MAX_TRIGGER_OVERLAPS: usize = 16;

/// A level: shared collision geometry plus gameplay markers.
///
/// The collision world is wrapped in an [`Arc`] so every agent's controller
/// can hold a handle to it.
#[derive(Debug)]
pub struct Level {
    /// Level identifier.
    pub id: String,

    /// Display name.
    pub name: String,

    /// Collision world shared by all controllers.
    pub collision: Arc<CollisionWorld>,

    /// Agent spawn points.
    pub spawn_points: Vec<SpawnPoint>,

    /// Trigger volumes.
    pub triggers: Vec<TriggerVolume>,
}

/// A spawn point for agents.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SpawnPoint {
    /// Pose position in world space.
    pub position: Vec3,

    /// Initial facing direction (yaw in radians).
    pub facing: f32,
}

/// A trigger volume that fires events when entered.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriggerVolume {
    /// Collision volume tagged [`VolumeFlags::TRIGGER`].
    pub volume: VolumeId,

    /// Trigger identifier for events.
    pub trigger_id: String,

    /// Whether this trigger can fire multiple times.
    pub repeatable: bool,

    /// Whether this trigger has been activated.
    pub activated: bool,
}

impl TriggerVolume {
    /// Add a trigger box to `world` on the gameplay layer.
    pub fn add_box(
        world: &mut CollisionWorld,
        center: Vec3,
        half_extents: Vec3,
        trigger_id: &str,
        repeatable: bool,
    ) -> Self {
        let volume = world.add_box(center, half_extents, CollisionLayers::GAMEPLAY);
        world.set_flags(volume, VolumeFlags::TRIGGER);

        Self {
            volume,
            trigger_id: trigger_id.to_string(),
            repeatable,
            activated: false,
        }
    }
}

impl Level {
    /// Create a level around finished collision geometry.
    pub fn new(id: &str, name: &str, collision: CollisionWorld) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            collision: Arc::new(collision),
            spawn_points: Vec::new(),
            triggers: Vec::new(),
        }
    }

    /// Create an empty level.
    pub fn empty(id: &str, name: &str) -> Self {
        Self::new(id, name, CollisionWorld::new())
    }

    /// Create a test level exercising every controller feature.
    ///
    /// The floor top is at `y = 0`. Spawn points are in open space with
    /// nothing ahead of them along +Z for several meters.
    pub fn test_arena() -> Self {
        let mut world = CollisionWorld::new();
        let solid = CollisionLayers::DEFAULT;

        // Floor
        world.add_box(Vec3::new(0.0, -0.5, 0.0), Vec3::new(50.0, 0.5, 50.0), solid);

        // Walls
        let wall_height = 5.0;
        let wall_thickness = 0.5;
        let arena_size = 50.0;

        // North wall
        world.add_box(
            Vec3::new(0.0, wall_height / 2.0, -arena_size),
            Vec3::new(arena_size, wall_height / 2.0, wall_thickness),
            solid,
        );

        // South wall
        world.add_box(
            Vec3::new(0.0, wall_height / 2.0, arena_size),
            Vec3::new(arena_size, wall_height / 2.0, wall_thickness),
            solid,
        );

        // East wall
        world.add_box(
            Vec3::new(arena_size, wall_height / 2.0, 0.0),
            Vec3::new(wall_thickness, wall_height / 2.0, arena_size),
            solid,
        );

        // West wall
        world.add_box(
            Vec3::new(-arena_size, wall_height / 2.0, 0.0),
            Vec3::new(wall_thickness, wall_height / 2.0, arena_size),
            solid,
        );

        // Central pillar
        world.add_box(Vec3::new(0.0, 2.0, 0.0), Vec3::new(2.0, 2.0, 2.0), solid);

        // Stairs rising towards +X, each step within the default step offset
        let step_rise = 0.25;
        for i in 0..4 {
            let top = step_rise * (i + 1) as f32;
            world.add_box(
                Vec3::new(10.5 + i as f32, top / 2.0, -20.0),
                Vec3::new(0.5, top / 2.0, 3.0),
                solid,
            );
        }

        // Walkable and steep ramps, sunk into the floor so only the top face shows
        world.add_ramp(Vec3::new(-10.0, 0.0, -20.0), Vec3::new(4.0, 0.5, 3.0), 25.0, solid);
        world.add_ramp(Vec3::new(-25.0, 0.0, -20.0), Vec3::new(3.0, 0.5, 3.0), 60.0, solid);

        // Inside corner
        world.add_box(Vec3::new(30.25, 1.5, 17.5), Vec3::new(0.25, 1.5, 2.5), solid);
        world.add_box(Vec3::new(27.5, 1.5, 20.25), Vec3::new(2.5, 1.5, 0.25), solid);

        // Platform slab
        let platform = world.add_box(Vec3::new(-20.0, 1.5, 20.0), Vec3::new(2.0, 0.25, 2.0), CollisionLayers::MOVING);
        world.set_flags(platform, VolumeFlags::PLATFORM);

        let goal = TriggerVolume::add_box(
            &mut world,
            Vec3::new(0.0, 1.0, 20.0),
            Vec3::new(2.0, 1.0, 2.0),
            "arena_goal",
            false,
        );

        let mut level = Self::new("test_arena", "Test Arena", world);
        level.triggers.push(goal);

        // Spawn points
        level.spawn_points.push(SpawnPoint {
            position: Vec3::new(-20.0, 1.01, 0.0),
            facing: 0.0,
        });
        level.spawn_points.push(SpawnPoint {
            position: Vec3::new(20.0, 1.01, 0.0),
            facing: std::f32::consts::PI,
        });

        level
    }

    /// Get a spawn point, wrapping around the available ones.
    pub fn spawn_point(&self, index: usize) -> Option<&SpawnPoint> {
        if self.spawn_points.is_empty() {
            return None;
        }
        self.spawn_points.get(index % self.spawn_points.len())
    }

    /// Get the number of spawn points.
    pub fn spawn_count(&self) -> usize {
        self.spawn_points.len()
    }

    /// Fire every trigger a sphere at `position` overlaps.
    ///
    /// Returns the ids of the triggers that fired.
    pub fn check_triggers(&mut self, position: Vec3, radius: f32) -> Vec<String> {
        let filter = QueryFilter::new(CollisionLayers::GAMEPLAY).with_triggers();
        let mut overlaps = [VolumeId::default(); MAX_TRIGGER_OVERLAPS];
        let count = self.collision.overlap_sphere(position, radius, &filter, &mut overlaps);

        let mut triggered = Vec::new();
        for trigger in &mut self.triggers {
            if trigger.activated && !trigger.repeatable {
                continue;
            }

            if overlaps[..count].contains(&trigger.volume) {
                trigger.activated = true;
                triggered.push(trigger.trigger_id.clone());
            }
        }

        triggered
    }
}
