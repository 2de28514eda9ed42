//! Smooth camera motion from continuous axis values.
//!
//! Translation is integrated through an eased velocity expressed in the
//! camera's own frame. Rotation is applied as a damped incremental quaternion
//! composed onto the current orientation, so the device always rotates the
//! view relative to where it currently points.

use glam::{DQuat, DVec3};
use tracing::debug;

use super::axis::AxisSample;
use super::pose::{Pose, REFERENCE_DISTANCE};

/// Tuning for [`PoseIntegrator`]
#[derive(Clone, Debug)]
pub struct IntegratorSettings {
    /// Velocity decay per second
    pub movement_easing: f64,
    /// Acceleration at full deflection for a camera at `reference_distance`
    pub movement_acceleration: f64,
    pub reference_distance: f64,
    /// Frames longer than this reset the velocity
    pub stall_threshold_ms: f64,
    /// Radians per tick at full deflection
    pub rotation_sensitivity: f64,
    /// Rotation channels below this magnitude are ignored
    pub rotation_epsilon: f64,
    pub invert_pitch: bool,
    pub roll_enabled: bool,
}

impl Default for IntegratorSettings {
    fn default() -> Self {
        Self {
            movement_easing: 3.0,
            movement_acceleration: 700.0,
            reference_distance: REFERENCE_DISTANCE,
            stall_threshold_ms: 200.0,
            rotation_sensitivity: 0.05,
            rotation_epsilon: 1e-4,
            invert_pitch: false,
            roll_enabled: true,
        }
    }
}

/// What a single integration step changed
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Motion {
    /// World space displacement of the target
    pub translation: DVec3,
    pub rotated: bool,
}

impl Motion {
    pub fn is_still(&self) -> bool {
        !self.rotated && self.translation == DVec3::ZERO
    }
}

#[derive(Debug)]
pub struct PoseIntegrator {
    settings: IntegratorSettings,
    pose: Pose,
    // Camera-local velocity in world units per second
    velocity: DVec3,
    last_external_activity: Option<f64>,
}

impl PoseIntegrator {
    pub fn new(settings: IntegratorSettings) -> Self {
        Self {
            settings,
            pose: Pose::default(),
            velocity: DVec3::ZERO,
            last_external_activity: None,
        }
    }

    pub fn settings(&self) -> &IntegratorSettings {
        &self.settings
    }

    pub fn pose(&self) -> &Pose {
        &self.pose
    }

    pub fn velocity(&self) -> DVec3 {
        self.velocity
    }

    pub fn last_external_activity(&self) -> Option<f64> {
        self.last_external_activity
    }

    /// Adopts a pose that was changed by someone else and records the time
    pub fn adopt_external(&mut self, pose: Pose, now_ms: f64) {
        self.pose = pose;
        self.last_external_activity = Some(now_ms);
    }

    /// Acceleration scaled linearly with the look distance, so far away
    /// cameras travel proportionally faster
    pub fn acceleration(&self) -> f64 {
        if self.settings.reference_distance <= 0.0 {
            return self.settings.movement_acceleration;
        }
        self.settings.movement_acceleration * self.pose.distance / self.settings.reference_distance
    }

    /// Advances the pose by one tick
    pub fn tick(
        &mut self,
        axes: &AxisSample,
        dt_ms: f64,
        do_translate: bool,
        do_rotate: bool,
    ) -> Motion {
        let mut motion = Motion::default();

        if do_rotate {
            motion.rotated = self.update_rotation(axes);
        }
        if do_translate {
            motion.translation = self.update_position(axes, dt_ms.max(0.0));
        }

        motion
    }

    fn update_position(&mut self, axes: &AxisSample, dt_ms: f64) -> DVec3 {
        if dt_ms > self.settings.stall_threshold_ms {
            debug!(
                "Tick took {:.1}ms (> {:.1}ms), resetting velocity",
                dt_ms, self.settings.stall_threshold_ms
            );
            self.velocity = DVec3::ZERO;
            return DVec3::ZERO;
        }

        let dt = dt_ms / 1000.0;
        self.velocity -= self.velocity * self.settings.movement_easing * dt;
        self.velocity += axes.translation() * self.acceleration() * dt;

        let displacement = self.pose.orientation * (self.velocity * dt);
        self.pose.target += displacement;
        displacement
    }

    fn update_rotation(&mut self, axes: &AxisSample) -> bool {
        let eps = self.settings.rotation_epsilon;
        let mut delta = axes.rotation();
        if delta.x.abs() < eps {
            delta.x = 0.0;
        }
        if delta.y.abs() < eps {
            delta.y = 0.0;
        }
        if delta.z.abs() < eps {
            delta.z = 0.0;
        }
        if self.settings.invert_pitch {
            delta.x = -delta.x;
        }
        if !self.settings.roll_enabled {
            delta.z = 0.0;
        }

        // An idle device never touches the orientation, so a pulled host
        // camera survives until the device actually rotates.
        if delta == DVec3::ZERO {
            return false;
        }

        delta *= self.settings.rotation_sensitivity;
        // Pitch, then yaw, then roll
        let increment = DQuat::from_rotation_x(delta.x)
            * DQuat::from_rotation_y(delta.y)
            * DQuat::from_rotation_z(delta.z);
        self.pose.orientation = (self.pose.orientation * increment).normalize();
        true
    }
}
