//! Reconciliation between the integrator pose and the host-owned camera.
//!
//! Both directions compare against the last frame known to be in the host,
//! which is updated immediately after either a pull or a push. A frame we
//! just wrote can therefore never be read back as an external change.

use tracing::debug;

use super::integrator::PoseIntegrator;
use super::pose::{CameraFrame, Pose, EPS_SQUARED};
use crate::host::{CameraStore, HostError};

#[derive(Debug, Default)]
pub struct CameraSync {
    last: Option<CameraFrame>,
}

impl CameraSync {
    pub fn new() -> Self {
        Self::default()
    }

    /// Frame last read from or written to the host
    pub fn last_known(&self) -> Option<&CameraFrame> {
        self.last.as_ref()
    }

    /// Takes over an externally changed camera.
    ///
    /// Returns `true` when the host moved the camera since the last pull or
    /// push, in which case the integrator pose is rebuilt from `frame`.
    pub fn pull_external(
        &mut self,
        frame: &CameraFrame,
        integrator: &mut PoseIntegrator,
        now_ms: f64,
    ) -> bool {
        if let Some(last) = &self.last {
            if !frame.differs_from(last, EPS_SQUARED) {
                return false;
            }
        }

        let Some(pose) = Pose::from_frame(frame) else {
            debug!("Ignoring degenerate camera read: {:?}", frame);
            return false;
        };

        debug!(
            "External camera change: target={:.3?} distance={:.3}",
            pose.target, pose.distance
        );
        self.last = Some(*frame);
        integrator.adopt_external(pose, now_ms);
        true
    }

    /// Publishes the integrator pose to the host if it moved noticeably
    pub fn push_to_external(
        &mut self,
        integrator: &PoseIntegrator,
        store: &mut dyn CameraStore,
    ) -> Result<bool, HostError> {
        // Nothing was ever pulled, the host camera is still unknown
        let Some(last) = &self.last else {
            return Ok(false);
        };

        let frame = integrator.pose().to_frame();
        if !frame.differs_from(last, EPS_SQUARED) {
            return Ok(false);
        }

        store.write(&frame)?;
        self.last = Some(frame);
        Ok(true)
    }
}
