//! Navigation core: axis mapping, smooth camera motion, camera reconciliation
//! and discrete nudging of the selection.

pub mod axis;
pub mod camera_sync;
pub mod integrator;
pub mod mode;
pub mod nudge;
pub mod pose;

pub use axis::{AxisMapping, AxisSample, GenericPreMap};
pub use camera_sync::CameraSync;
pub use integrator::{IntegratorSettings, Motion, PoseIntegrator};
pub use mode::{ControlBinding, ControlBindings, Mode, ModeSelector};
pub use nudge::{NudgeEngine, NudgeSettings, NudgeTransform};
pub use pose::{CameraFrame, Pose};
