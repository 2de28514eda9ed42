//! Stand-alone host used when no application is attached.
//!
//! The camera lives in memory and every outbound message ends up in the log,
//! so the binary can be run against a real device to watch the motion.

use std::time::{Duration, Instant};

use tracing::{debug, info};

use super::{
    ActionSink, CameraStore, Collaborators, EditScope, HostError, HostInput, Modifiers,
    NavigatorAction, NotificationSink, SelectionProvider, SnapProvider, Transformable,
};
use crate::navigation::pose::{CameraFrame, Pose};

/// Lets an event through at most once per interval
#[derive(Debug)]
pub struct RateLimiter {
    min_interval: Duration,
    last_event_time: Option<Instant>,
}

impl RateLimiter {
    pub fn new(min_interval_ms: u64) -> Self {
        Self {
            min_interval: Duration::from_millis(min_interval_ms),
            last_event_time: None,
        }
    }

    pub fn should_process(&mut self) -> bool {
        let now = Instant::now();
        match self.last_event_time {
            Some(last) if now.duration_since(last) < self.min_interval => false,
            _ => {
                self.last_event_time = Some(now);
                true
            }
        }
    }
}

#[derive(Debug)]
pub struct HeadlessCamera {
    frame: CameraFrame,
    writes: u64,
    log_limiter: RateLimiter,
}

impl HeadlessCamera {
    pub fn new(frame: CameraFrame) -> Self {
        Self {
            frame,
            writes: 0,
            log_limiter: RateLimiter::new(1000),
        }
    }

    pub fn writes(&self) -> u64 {
        self.writes
    }
}

impl Default for HeadlessCamera {
    fn default() -> Self {
        Self::new(Pose::default().to_frame())
    }
}

impl CameraStore for HeadlessCamera {
    fn read(&mut self) -> Result<CameraFrame, HostError> {
        Ok(self.frame)
    }

    fn write(&mut self, frame: &CameraFrame) -> Result<(), HostError> {
        if !frame.is_finite() {
            return Err(HostError::Rejected(format!("non-finite camera frame {:?}", frame)));
        }
        self.frame = *frame;
        self.writes += 1;

        if self.log_limiter.should_process() {
            info!(
                "Camera position=({:.2}, {:.2}, {:.2}) target=({:.2}, {:.2}, {:.2})",
                frame.position.x,
                frame.position.y,
                frame.position.z,
                frame.target.x,
                frame.target.y,
                frame.target.z
            );
        } else {
            debug!("Camera frame written: {:?}", frame);
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct EmptySelection;

impl SelectionProvider for EmptySelection {
    fn selection(&mut self) -> Result<Vec<&mut dyn Transformable>, HostError> {
        Ok(Vec::new())
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FixedSnap(pub f64);

impl SnapProvider for FixedSnap {
    fn snap_size(&mut self) -> Result<f64, HostError> {
        Ok(self.0)
    }
}

#[derive(Debug, Default)]
pub struct LoggingEditScope {
    open: bool,
}

impl EditScope for LoggingEditScope {
    fn begin_scope(&mut self) {
        self.open = true;
        info!("Edit scope opened");
    }

    fn end_scope(&mut self) {
        if self.open {
            info!("Edit scope closed");
        }
        self.open = false;
    }
}

#[derive(Debug, Default)]
pub struct LogNotifications;

impl NotificationSink for LogNotifications {
    fn notify(&mut self, text: &str) {
        info!("[notice] {}", text);
    }
}

#[derive(Debug, Default)]
pub struct LogActions;

impl ActionSink for LogActions {
    fn dispatch(&mut self, action: NavigatorAction) {
        match action {
            NavigatorAction::Button(_) => debug!("Action: {}", action),
            _ => info!("Action: {}", action),
        }
    }
}

/// A host that is always focused with no modifiers held
#[derive(Debug, Default)]
pub struct AlwaysFocused;

impl HostInput for AlwaysFocused {
    fn is_focused(&self) -> bool {
        true
    }

    fn modifiers(&self) -> Modifiers {
        Modifiers::default()
    }
}

pub fn headless_collaborators(snap: f64) -> Collaborators {
    Collaborators {
        camera: Box::new(HeadlessCamera::default()),
        selection: Box::new(EmptySelection),
        snap: Box::new(FixedSnap(snap)),
        edit_scope: Box::new(LoggingEditScope::default()),
        notifications: Box::new(LogNotifications),
        actions: Box::new(LogActions),
        input: Box::new(AlwaysFocused),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::DVec3;

    #[test]
    fn test_rate_limiter() {
        let mut limiter = RateLimiter::new(60_000);
        assert!(limiter.should_process());
        assert!(!limiter.should_process());

        let mut open = RateLimiter::new(0);
        assert!(open.should_process());
        assert!(open.should_process());
    }

    #[test]
    fn test_camera_rejects_non_finite_frames() {
        let mut camera = HeadlessCamera::default();
        let before = camera.read().unwrap();

        let mut broken = before;
        broken.position.x = f64::NAN;
        assert!(camera.write(&broken).is_err());
        assert_eq!(camera.read().unwrap(), before);

        let moved = CameraFrame::new(DVec3::new(0.0, -10.0, 0.0), DVec3::ZERO, DVec3::Z);
        camera.write(&moved).unwrap();
        assert_eq!(camera.read().unwrap(), moved);
        assert_eq!(camera.writes(), 1);
    }

    #[test]
    fn test_headless_selection_is_empty() {
        let mut collaborators = headless_collaborators(0.5);
        assert!(collaborators.selection.selection().unwrap().is_empty());
        assert_eq!(collaborators.snap.snap_size().unwrap(), 0.5);
        assert!(collaborators.input.is_focused());
    }
}
