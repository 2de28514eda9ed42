//! One explicit context value owning every navigation component.
//!
//! A tick runs in a fixed order:
//!
//! ```text
//! focus gate ─► presence ─► AxisMapping ─► ButtonEdgeDetector ─► CameraSync::pull
//!     ─► ModeSelector ─┬─► camera: PoseIntegrator ─► CameraSync::push
//!                      └─► nudge:  NudgeEngine
//! ```

use tracing::{debug, info};

use crate::config::Configuration;
use crate::controller::{ButtonEdgeDetector, ButtonSettings, DeviceSample};
use crate::host::{Collaborator, Collaborators, FaultLog, NavigatorAction, Notifier};
use crate::navigation::{
    AxisMapping, AxisSample, CameraSync, IntegratorSettings, Mode, ModeSelector, NudgeEngine,
    NudgeSettings, NudgeTransform, PoseIntegrator,
};

pub const DEVICE_MISSING: &str = "SpaceMouse not found. Plug it in and press some buttons.";
pub const DEVICE_CONNECTED: &str = "SpaceMouse connected.";

/// What a single tick did
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct TickReport {
    /// The host was not focused, nothing ran
    pub skipped: bool,
    pub device_present: bool,
    pub mode: Option<Mode>,
    pub button_edges: usize,
    pub external_change: bool,
    pub camera_pushed: bool,
    pub nudge: Option<NudgeTransform>,
}

#[derive(Debug)]
pub struct Navigator {
    mapping: AxisMapping,
    integrator: PoseIntegrator,
    sync: CameraSync,
    nudge: NudgeEngine,
    modes: ModeSelector,
    buttons: ButtonEdgeDetector,
    notifier: Notifier,
    faults: FaultLog,
    /// Angle tolerance when only the dominant channel drives the camera
    dominant_only: Option<f64>,
    last_tick_ms: Option<f64>,
    device_present: Option<bool>,
}

impl Navigator {
    pub fn new(
        mapping: AxisMapping,
        integrator: IntegratorSettings,
        nudge: NudgeSettings,
        buttons: ButtonSettings,
        modes: ModeSelector,
        dominant_only: Option<f64>,
    ) -> Self {
        Self {
            mapping,
            integrator: PoseIntegrator::new(integrator),
            sync: CameraSync::new(),
            nudge: NudgeEngine::new(nudge),
            modes,
            buttons: ButtonEdgeDetector::new(buttons),
            notifier: Notifier::new(),
            faults: FaultLog::new(),
            dominant_only,
            last_tick_ms: None,
            device_present: None,
        }
    }

    pub fn from_config(config: &Configuration) -> Self {
        let dominant_only = config
            .navigation
            .dominant_axis_only
            .then_some(config.navigation.dominant_axis_angle_deg);

        Self::new(
            config.axis_mapping(),
            config.integrator_settings(),
            config.nudge_settings(),
            config.button_settings(),
            config.mode_selector(),
            dominant_only,
        )
    }

    pub fn integrator(&self) -> &PoseIntegrator {
        &self.integrator
    }

    pub fn nudge(&self) -> &NudgeEngine {
        &self.nudge
    }

    pub fn buttons(&self) -> &ButtonEdgeDetector {
        &self.buttons
    }

    pub fn tick(
        &mut self,
        now_ms: f64,
        sample: Option<DeviceSample>,
        host: &mut Collaborators,
    ) -> TickReport {
        let mut report = TickReport::default();

        if !host.input.is_focused() {
            debug!("Host not focused, skipping tick");
            report.skipped = true;
            return report;
        }

        let dt_ms = self.last_tick_ms.map_or(0.0, |last| now_ms - last);
        self.last_tick_ms = Some(now_ms);

        report.device_present = sample.is_some();
        self.track_presence(report.device_present, host);

        let (axes, pressed) = match &sample {
            Some(sample) => (self.mapping.map(&sample.axes), sample.buttons.as_slice()),
            None => (AxisSample::ZERO, &[][..]),
        };

        let edges = self.buttons.update(pressed);
        report.button_edges = edges.len();
        for edge in edges {
            debug!("Button {} {}", edge.index, edge.kind);
            let bound = self.modes.action_for(&edge);
            host.actions.dispatch(NavigatorAction::Button(edge));
            if let Some(action) = bound {
                info!("Dispatching {}", action);
                host.actions.dispatch(action);
            }
        }

        let camera_read = self.faults.check(Collaborator::Camera, host.camera.read());
        if let Some(frame) = &camera_read {
            report.external_change = self.sync.pull_external(frame, &mut self.integrator, now_ms);
        }

        let modifiers = host.input.modifiers();
        let Some(mut selection) = self
            .faults
            .check(Collaborator::Selection, host.selection.selection())
        else {
            // Unknown selection: keep the current mode and retry next tick
            return report;
        };

        let mode = self.modes.select(&self.buttons, &modifiers, selection.is_empty());
        report.mode = Some(mode);

        match mode {
            Mode::Camera { translate, rotate } => {
                self.nudge.reset(host.edit_scope.as_mut());
                if camera_read.is_none() {
                    // Pushing without a fresh read could overwrite a host change
                    return report;
                }

                let axes = match self.dominant_only {
                    Some(angle) => axes.dominant_only(angle),
                    None => axes,
                };
                self.integrator.tick(&axes, dt_ms, translate, rotate);

                let pushed = self.sync.push_to_external(&self.integrator, host.camera.as_mut());
                report.camera_pushed = self
                    .faults
                    .check(Collaborator::Camera, pushed)
                    .unwrap_or(false);
            }
            Mode::Nudge => {
                let snap = self
                    .faults
                    .check(Collaborator::Snap, host.snap.snap_size())
                    .unwrap_or(0.0);
                let fine = self.modes.is_fine(&self.buttons, &modifiers);

                report.nudge = self.nudge.tick(
                    &axes,
                    now_ms,
                    self.integrator.pose().orientation,
                    &mut selection,
                    snap,
                    fine,
                    host.edit_scope.as_mut(),
                );
            }
        }

        report
    }

    fn track_presence(&mut self, present: bool, host: &mut Collaborators) {
        if self.device_present == Some(present) {
            return;
        }
        let previous = self.device_present.replace(present);

        if !present {
            info!("Input device not available");
            self.notifier.notify(host.notifications.as_mut(), DEVICE_MISSING);
        } else if previous == Some(false) {
            info!("Input device available");
            self.notifier.notify(host.notifications.as_mut(), DEVICE_CONNECTED);
        }
    }
}
