use std::fmt;

/// One polled snapshot of a 6DOF device
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DeviceSample {
    /// Raw analog channels in device order
    pub axes: Vec<f64>,
    pub buttons: Vec<bool>,
}

/// Source of device snapshots. `None` means no device is connected.
pub trait InputDevice: Send + fmt::Debug {
    fn poll(&mut self) -> Option<DeviceSample>;
}

#[derive(Debug, thiserror::Error)]
pub enum DeviceError {
    #[error("Failed to initialize input backend: {0}")]
    InitializationError(String),
}

/// Device selection options
#[derive(Clone, Debug, Default)]
pub struct DeviceSettings {
    /// Accept any gamepad when no SpaceMouse is connected
    pub accept_generic: bool,
}
