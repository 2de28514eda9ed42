use glam::{DMat3, DQuat, DVec3};

/// Squared distance below which two camera vectors are considered equal
pub const EPS_SQUARED: f64 = 1e-6;

/// Look distance the base acceleration is tuned for
pub const REFERENCE_DISTANCE: f64 = 254.6;

/// Camera pose as exchanged with the host: eye position, look target and up vector
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct CameraFrame {
    pub position: DVec3,
    pub target: DVec3,
    pub up: DVec3,
}

impl CameraFrame {
    pub fn new(position: DVec3, target: DVec3, up: DVec3) -> Self {
        Self {
            position,
            target,
            up,
        }
    }

    /// True when any vector differs from `other` by at least `eps_sq` (squared)
    pub fn differs_from(&self, other: &CameraFrame, eps_sq: f64) -> bool {
        self.position.distance_squared(other.position) >= eps_sq
            || self.target.distance_squared(other.target) >= eps_sq
            || self.up.distance_squared(other.up) >= eps_sq
    }

    pub fn is_finite(&self) -> bool {
        self.position.is_finite() && self.target.is_finite() && self.up.is_finite()
    }
}

/// Virtual camera pose.
///
/// The eye position is derived from the target, so
/// `position = target - orientation * forward * distance` always holds.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Pose {
    pub target: DVec3,
    pub orientation: DQuat,
    pub distance: f64,
}

impl Default for Pose {
    fn default() -> Self {
        Self {
            target: DVec3::ZERO,
            orientation: DQuat::IDENTITY,
            distance: REFERENCE_DISTANCE,
        }
    }
}

impl Pose {
    /// Unit look vector in world space
    pub fn forward(&self) -> DVec3 {
        self.orientation * DVec3::Z
    }

    pub fn up(&self) -> DVec3 {
        self.orientation * DVec3::Y
    }

    pub fn position(&self) -> DVec3 {
        self.target - self.forward() * self.distance
    }

    pub fn to_frame(&self) -> CameraFrame {
        CameraFrame::new(self.position(), self.target, self.up())
    }

    /// Rebuilds a pose from a host camera frame.
    ///
    /// Returns `None` for degenerate frames (coincident eye and target, zero
    /// or look-parallel up vector) since no orientation can be derived.
    pub fn from_frame(frame: &CameraFrame) -> Option<Self> {
        if !frame.is_finite() {
            return None;
        }

        let look = frame.target - frame.position;
        let distance = look.length();
        let look = look.try_normalize()?;
        let right = frame.up.cross(look).try_normalize()?;
        let up = look.cross(right);

        let basis = DMat3::from_cols(right, up, look);
        Some(Self {
            target: frame.target,
            orientation: DQuat::from_mat3(&basis).normalize(),
            distance,
        })
    }
}
