//! Runs the navigator at a fixed rate on tokio.
//!
//! [`navigator::Navigator`] holds all per-tick state and is fully synchronous;
//! [`handle::DriverHandle`] owns it together with the device and the host
//! collaborators inside a single spawned task.

pub mod handle;
pub mod navigator;

pub use handle::{DriverError, DriverHandle, DriverStats, NavigationDriver};
pub use navigator::{Navigator, TickReport, DEVICE_CONNECTED, DEVICE_MISSING};
