//! Controller configuration.
//!
//! Shape dimensions, slope and step limits, and the tuned constants of the
//! solver are grouped here for easy tuning. Values use metric units and
//! degrees.

use glam::Vec3;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::collision::CollisionLayers;

/// Errors from building or reconfiguring a controller.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("skin width must be positive, got {0}")]
    NonPositiveSkinWidth(f32),

    #[error("radius {radius} must be larger than skin width {skin_width}")]
    RadiusWithinSkin { radius: f32, skin_width: f32 },

    #[error("slope limit must be within 0..=180 degrees, got {0}")]
    SlopeLimitOutOfRange(f32),

    #[error("step offset must not be negative, got {0}")]
    NegativeStepOffset(f32),

    #[error("{0} must be a finite number")]
    NonFinite(&'static str),

    #[error("solver needs at least one slide iteration")]
    NoSlideIterations,

    #[error("overlap buffer capacity must be non-zero")]
    EmptyOverlapBuffer,
}

/// Configuration of an entity controller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControllerConfig {
    // ========================================================================
    // Shape
    // ========================================================================
    /// Capsule radius (meters). Floored at `skin_width` when read.
    pub radius: f32,

    /// Capsule height including both caps (meters). Floored at the diameter.
    pub height: f32,

    /// Offset of the capsule center from the pose position, in local space.
    pub center: Vec3,

    /// Shrink margin kept between the shape and obstacles (meters).
    pub skin_width: f32,

    // ========================================================================
    // Slopes and Steps
    // ========================================================================
    /// Steepest walkable surface, as degrees between its normal and up.
    pub slope_limit: f32,

    /// Tallest obstacle climbed without vertical input (meters).
    pub step_offset: f32,

    // ========================================================================
    // Behavior
    // ========================================================================
    /// Layers the controller collides with.
    pub layers: CollisionLayers,

    /// When false, motion is applied directly without any queries.
    pub handle_collision: bool,

    /// Enables step climbing and the surface-normal probe.
    pub handle_steps: bool,

    /// Tuned solver constants.
    #[serde(default)]
    pub tuning: SolverTuning,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            radius: 0.5,
            height: 2.0,
            center: Vec3::ZERO,
            skin_width: 0.01,

            slope_limit: 45.0,
            step_offset: 0.3,

            layers: CollisionLayers::MASK_CONTROLLER,
            handle_collision: true,
            handle_steps: true,

            tuning: SolverTuning::default(),
        }
    }
}

impl ControllerConfig {
    /// Check the invariants the solver relies on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("radius", self.radius),
            ("height", self.height),
            ("skin_width", self.skin_width),
            ("slope_limit", self.slope_limit),
            ("step_offset", self.step_offset),
        ] {
            if !value.is_finite() {
                return Err(ConfigError::NonFinite(name));
            }
        }
        if !self.center.is_finite() {
            return Err(ConfigError::NonFinite("center"));
        }

        if self.skin_width <= 0.0 {
            return Err(ConfigError::NonPositiveSkinWidth(self.skin_width));
        }
        if self.radius <= self.skin_width {
            return Err(ConfigError::RadiusWithinSkin {
                radius: self.radius,
                skin_width: self.skin_width,
            });
        }
        if !(0.0..=180.0).contains(&self.slope_limit) {
            return Err(ConfigError::SlopeLimitOutOfRange(self.slope_limit));
        }
        if self.step_offset < 0.0 {
            return Err(ConfigError::NegativeStepOffset(self.step_offset));
        }

        self.tuning.validate()
    }
}

/// Tuned constants of the sweep solver and its probes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverTuning {
    /// Clamp-and-redirect iterations per pass.
    pub max_slide_iterations: usize,

    /// Extra lateral sweep distance against grazing-angle tunneling (meters).
    pub lateral_epsilon: f32,

    /// How far above a hit point the surface-normal probe starts (meters).
    pub normal_probe_offset: f32,

    /// Length of the surface-normal probe (meters).
    pub normal_probe_distance: f32,

    /// Angle of the inside-corner rays around forward (degrees).
    pub gap_angle: f32,

    /// Per-component tolerance when comparing the corner ray normals.
    pub gap_normal_tolerance: f32,

    /// Capacity of the overlap result buffer.
    pub overlap_capacity: usize,

    /// Distance below the shape searched for ground after each move (meters).
    pub ground_probe_distance: f32,
}

impl Default for SolverTuning {
    fn default() -> Self {
        Self {
            max_slide_iterations: 2,
            lateral_epsilon: 0.01,
            normal_probe_offset: 0.01,
            normal_probe_distance: 0.02,
            gap_angle: 35.0,
            gap_normal_tolerance: 1e-5,
            overlap_capacity: 128,
            ground_probe_distance: 0.1,
        }
    }
}

impl SolverTuning {
    fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("lateral_epsilon", self.lateral_epsilon),
            ("normal_probe_offset", self.normal_probe_offset),
            ("normal_probe_distance", self.normal_probe_distance),
            ("gap_angle", self.gap_angle),
            ("gap_normal_tolerance", self.gap_normal_tolerance),
            ("ground_probe_distance", self.ground_probe_distance),
        ] {
            if !value.is_finite() {
                return Err(ConfigError::NonFinite(name));
            }
        }
        if self.max_slide_iterations == 0 {
            return Err(ConfigError::NoSlideIterations);
        }
        if self.overlap_capacity == 0 {
            return Err(ConfigError::EmptyOverlapBuffer);
        }
        Ok(())
    }
}
