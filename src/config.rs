//! # Configuration
//!
//! TOML configuration stored at `<config dir>/spacenav/config.toml`.
//!
//! Loading never fails the application: a missing file is created with the
//! defaults, an unreadable or unparsable file falls back to the defaults and
//! out-of-range values are clamped with a warning. The component settings
//! (integrator, nudge, buttons, device) are derived from the loaded
//! configuration once, before the driver starts.
//!
//! ```toml
//! [navigation]
//! tick_rate_hz = 30.0
//! fly_mode = false
//! swap_yz = true
//!
//! [nudge]
//! first_repeat_ms = 250.0
//! next_repeat_ms = 75.0
//!
//! [device]
//! accept_generic = false
//!
//! [bindings]
//! translate_only = ["shift", "1"]
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::controller::{ButtonSettings, DeviceSettings};
use crate::navigation::axis::{AxisMapping, GenericPreMap, AXIS_COUNT};
use crate::navigation::integrator::IntegratorSettings;
use crate::navigation::mode::{ControlBindings, ModeSelector};
use crate::navigation::nudge::{NudgeSettings, DEFAULT_SNAP};
use crate::navigation::pose::REFERENCE_DISTANCE;

const CONFIG_DIR: &str = "spacenav";
const CONFIG_FILE: &str = "config.toml";

/// Base rotation per tick at full deflection, scaled by the speed multiplier
const BASE_ROTATION_SENSITIVITY: f64 = 0.05;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to access config file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Could not determine the user config directory")]
    NoConfigDir,
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct NavigationConfig {
    pub tick_rate_hz: f64,
    /// Treat the selection as absent and always move the camera
    pub always_move: bool,
    pub fly_mode: bool,
    pub swap_yz: bool,
    pub rotation_speed_multiplier: f64,
    pub invert_pitch: bool,
    pub roll_enabled: bool,
    /// Only the strongest channel drives the camera
    pub dominant_axis_only: bool,
    /// Angle tolerance for dominant axis detection; 90 accepts any winner
    pub dominant_axis_angle_deg: f64,
    pub movement_acceleration: f64,
    pub movement_easing: f64,
    pub stall_threshold_ms: f64,
}

impl Default for NavigationConfig {
    fn default() -> Self {
        Self {
            tick_rate_hz: 30.0,
            always_move: false,
            fly_mode: false,
            swap_yz: true,
            rotation_speed_multiplier: 1.0,
            invert_pitch: false,
            roll_enabled: true,
            dominant_axis_only: false,
            dominant_axis_angle_deg: 90.0,
            movement_acceleration: 700.0,
            movement_easing: 3.0,
            stall_threshold_ms: 200.0,
        }
    }
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct NudgeConfig {
    pub first_repeat_ms: f64,
    /// `0` fires once per push
    pub next_repeat_ms: f64,
    pub threshold_on: f64,
    /// Off threshold as a fraction of the on threshold
    pub hysteresis_ratio: f64,
    pub angle_deg: f64,
    pub default_snap: f64,
}

impl Default for NudgeConfig {
    fn default() -> Self {
        Self {
            first_repeat_ms: 250.0,
            next_repeat_ms: 75.0,
            threshold_on: 0.3,
            hysteresis_ratio: 0.67,
            angle_deg: 22.5,
            default_snap: DEFAULT_SNAP,
        }
    }
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct DeviceConfig {
    pub accept_generic: bool,
    /// Reorders and inverts the raw channels of a generic joystick
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pre_map: Option<GenericPreMap>,
    pub release_debounce_count: u32,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            accept_generic: false,
            pre_map: None,
            release_debounce_count: 2,
        }
    }
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq)]
#[serde(default)]
pub struct Configuration {
    pub navigation: NavigationConfig,
    pub nudge: NudgeConfig,
    pub device: DeviceConfig,
    pub bindings: ControlBindings,
}

fn clamp(name: &str, value: f64, min: f64, max: f64, fallback: f64) -> f64 {
    if !value.is_finite() {
        warn!("{} is not a number, using {}", name, fallback);
        return fallback;
    }
    let clamped = value.clamp(min, max);
    if clamped != value {
        warn!("{} = {} out of range, clamped to {}", name, value, clamped);
    }
    clamped
}

impl Configuration {
    /// Default location of the configuration file
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        let mut path = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        path.push(CONFIG_DIR);
        path.push(CONFIG_FILE);
        Ok(path)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Configuration = toml::from_str(content)?;
        Ok(config.sanitized())
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Writes the defaults to `path` unless a file already exists there
    pub async fn ensure_default(path: &Path) -> Result<bool, ConfigError> {
        let io = |source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        };

        if tokio::fs::try_exists(path).await.map_err(io)? {
            return Ok(false);
        }

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(io)?;
        }
        let content = Configuration::default().to_toml_string()?;
        tokio::fs::write(path, content).await.map_err(io)?;
        info!("Created default configuration at {}", path.display());
        Ok(true)
    }

    /// Reads and sanitizes the file at `path`
    pub async fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ConfigError::Io {
                path: path.to_path_buf(),
                source,
            })?;
        debug!("Read {} bytes from {}", content.len(), path.display());
        Self::from_toml_str(&content)
    }

    /// Loads `path`, creating it first if missing. Any failure yields the defaults.
    pub async fn load_or_default(path: &Path) -> Self {
        if let Err(e) = Self::ensure_default(path).await {
            warn!("Could not create default configuration: {}", e);
        }

        match Self::load(path).await {
            Ok(config) => {
                info!("Loaded configuration from {}", path.display());
                config
            }
            Err(e) => {
                warn!("{}, using defaults", e);
                Self::default()
            }
        }
    }

    /// Returns a copy with every value clamped into its valid range
    pub fn sanitized(mut self) -> Self {
        let defaults = Configuration::default();

        let nav = &mut self.navigation;
        let d = &defaults.navigation;
        nav.tick_rate_hz = clamp("navigation.tick_rate_hz", nav.tick_rate_hz, 1.0, 120.0, d.tick_rate_hz);
        nav.rotation_speed_multiplier = clamp(
            "navigation.rotation_speed_multiplier",
            nav.rotation_speed_multiplier,
            0.0,
            20.0,
            d.rotation_speed_multiplier,
        );
        nav.dominant_axis_angle_deg = clamp(
            "navigation.dominant_axis_angle_deg",
            nav.dominant_axis_angle_deg,
            0.0,
            90.0,
            d.dominant_axis_angle_deg,
        );
        nav.movement_acceleration = clamp(
            "navigation.movement_acceleration",
            nav.movement_acceleration,
            0.0,
            100_000.0,
            d.movement_acceleration,
        );
        nav.movement_easing = clamp("navigation.movement_easing", nav.movement_easing, 0.0, 100.0, d.movement_easing);
        nav.stall_threshold_ms = clamp(
            "navigation.stall_threshold_ms",
            nav.stall_threshold_ms,
            1.0,
            5000.0,
            d.stall_threshold_ms,
        );

        let nudge = &mut self.nudge;
        let d = &defaults.nudge;
        nudge.first_repeat_ms = clamp("nudge.first_repeat_ms", nudge.first_repeat_ms, 0.0, 5000.0, d.first_repeat_ms);
        nudge.next_repeat_ms = clamp("nudge.next_repeat_ms", nudge.next_repeat_ms, 0.0, 5000.0, d.next_repeat_ms);
        nudge.threshold_on = clamp("nudge.threshold_on", nudge.threshold_on, 0.01, 1.0, d.threshold_on);
        nudge.hysteresis_ratio = clamp("nudge.hysteresis_ratio", nudge.hysteresis_ratio, 0.05, 1.0, d.hysteresis_ratio);
        nudge.angle_deg = clamp("nudge.angle_deg", nudge.angle_deg, 0.1, 180.0, d.angle_deg);
        if !(nudge.default_snap.is_finite() && nudge.default_snap > 0.0) {
            warn!("nudge.default_snap = {} must be positive, using {}", nudge.default_snap, d.default_snap);
            nudge.default_snap = d.default_snap;
        }

        let device = &mut self.device;
        if device.release_debounce_count > 30 {
            warn!(
                "device.release_debounce_count = {} out of range, clamped to 30",
                device.release_debounce_count
            );
            device.release_debounce_count = 30;
        }
        if let Some(pre) = device.pre_map.as_mut() {
            for (i, axis) in pre.axes.iter_mut().enumerate() {
                if *axis >= AXIS_COUNT {
                    warn!("device.pre_map.axes[{}] = {} out of range, using {}", i, axis, i);
                    *axis = i;
                }
            }
        }

        self
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.navigation.tick_rate_hz.clamp(1.0, 120.0))
    }

    pub fn axis_mapping(&self) -> AxisMapping {
        AxisMapping::from_options(
            self.navigation.fly_mode,
            self.navigation.swap_yz,
            self.device.pre_map.clone(),
        )
    }

    pub fn integrator_settings(&self) -> IntegratorSettings {
        let nav = &self.navigation;
        IntegratorSettings {
            movement_easing: nav.movement_easing,
            movement_acceleration: nav.movement_acceleration,
            reference_distance: REFERENCE_DISTANCE,
            stall_threshold_ms: nav.stall_threshold_ms,
            rotation_sensitivity: BASE_ROTATION_SENSITIVITY * nav.rotation_speed_multiplier,
            invert_pitch: nav.invert_pitch,
            roll_enabled: nav.roll_enabled,
            ..Default::default()
        }
    }

    pub fn nudge_settings(&self) -> NudgeSettings {
        let nudge = &self.nudge;
        NudgeSettings {
            threshold_on: nudge.threshold_on,
            threshold_off: nudge.threshold_on * nudge.hysteresis_ratio,
            first_repeat_ms: nudge.first_repeat_ms,
            next_repeat_ms: nudge.next_repeat_ms,
            angle: nudge.angle_deg.to_radians(),
            default_snap: nudge.default_snap,
            dominant_axis_angle_deg: self.navigation.dominant_axis_angle_deg,
        }
    }

    pub fn button_settings(&self) -> ButtonSettings {
        ButtonSettings {
            release_debounce_count: self.device.release_debounce_count,
        }
    }

    pub fn device_settings(&self) -> DeviceSettings {
        DeviceSettings {
            accept_generic: self.device.accept_generic,
        }
    }

    pub fn mode_selector(&self) -> ModeSelector {
        ModeSelector::new(self.bindings.clone(), self.navigation.always_move)
    }
}
