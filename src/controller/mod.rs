//! Input device access and button handling
//!
//! ```text
//! SpaceMouse ──► GilrsDevice ──► DeviceSample ──► ButtonEdgeDetector
//!                 (polled)        (raw axes)       (debounced edges)
//! ```
//!
//! [`device::InputDevice`] is the seam between the navigator and the
//! hardware; [`gilrs_device`] implements it over gilrs.

pub mod buttons;
pub mod device;
pub mod gilrs_device;

pub use buttons::{ButtonEdge, ButtonEdgeDetector, ButtonSettings, EdgeKind};
pub use device::{DeviceError, DeviceSample, DeviceSettings, InputDevice};
pub use gilrs_device::GilrsDevice;
