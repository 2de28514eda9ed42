//! 6DOF navigation for 3D editors.
//!
//! Turns SpaceMouse samples into smooth camera motion or snapped nudges of
//! the current selection, while staying in sync with a camera the host
//! application may move at any time.

pub mod config;
pub mod controller;
pub mod driver;
pub mod host;
pub mod navigation;
