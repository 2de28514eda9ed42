//! Host application collaborators
//!
//! The navigator never reaches into the host's object graph. Everything it
//! needs from the host goes through the small capability traits below:
//!
//! ```text
//!              ┌─► CameraStore        (read/write camera frame)
//!              ├─► SelectionProvider  (objects to nudge)
//! Navigator ───┼─► SnapProvider       (grid size)
//!              ├─► EditScope          (undo grouping)
//!              ├─► NotificationSink   (user facing messages)
//!              ├─► ActionSink         (fit/home/button edges)
//!              └─► HostInput          (focus, modifier keys)
//! ```
//!
//! [`headless`] provides stand-alone implementations used by the binary.

pub mod headless;

use std::collections::HashSet;
use std::fmt;

use glam::{DMat4, DVec3};
use tracing::{debug, info, warn};

use crate::controller::buttons::ButtonEdge;
use crate::navigation::pose::CameraFrame;

/// Errors reported by host collaborators
#[derive(Debug, thiserror::Error)]
pub enum HostError {
    /// The collaborator cannot be reached right now
    #[error("Collaborator unavailable: {0}")]
    Unavailable(String),

    /// The host refused the requested operation
    #[error("Host rejected operation: {0}")]
    Rejected(String),
}

/// Externally owned camera pose
pub trait CameraStore: Send + fmt::Debug {
    fn read(&mut self) -> Result<CameraFrame, HostError>;
    fn write(&mut self, frame: &CameraFrame) -> Result<(), HostError>;
}

/// World space bounding sphere of a selected object
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct BoundingSphere {
    pub center: DVec3,
    pub radius: f64,
}

/// A selected object that can be nudged
pub trait Transformable {
    /// Premultiplies `matrix` onto the object's world transform
    fn apply_transform(&mut self, matrix: &DMat4);
    fn bounding_sphere(&self) -> BoundingSphere;
}

pub trait SelectionProvider: Send + fmt::Debug {
    fn selection(&mut self) -> Result<Vec<&mut dyn Transformable>, HostError>;
}

/// Grid snap setting; `0.0` means "use the default"
pub trait SnapProvider: Send + fmt::Debug {
    fn snap_size(&mut self) -> Result<f64, HostError>;
}

/// Groups a sequence of nudges into one undoable unit
pub trait EditScope: Send + fmt::Debug {
    fn begin_scope(&mut self);
    fn end_scope(&mut self);
}

/// Fire-and-forget user facing messages
pub trait NotificationSink: Send + fmt::Debug {
    fn notify(&mut self, text: &str);
}

/// Outbound actions triggered by device buttons
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NavigatorAction {
    FitView,
    HomeView,
    /// Every raw button edge, bound or not
    Button(ButtonEdge),
}

impl fmt::Display for NavigatorAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NavigatorAction::FitView => write!(f, "fit-view"),
            NavigatorAction::HomeView => write!(f, "home-view"),
            NavigatorAction::Button(edge) => write!(f, "button-{}-{}", edge.index, edge.kind),
        }
    }
}

pub trait ActionSink: Send + fmt::Debug {
    fn dispatch(&mut self, action: NavigatorAction);
}

/// Keyboard modifiers currently held in the host
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
}

pub trait HostInput: Send + fmt::Debug {
    /// Ticks are skipped while the host window is not focused
    fn is_focused(&self) -> bool;
    fn modifiers(&self) -> Modifiers;
}

/// The full set of collaborators a navigator talks to
#[derive(Debug)]
pub struct Collaborators {
    pub camera: Box<dyn CameraStore>,
    pub selection: Box<dyn SelectionProvider>,
    pub snap: Box<dyn SnapProvider>,
    pub edit_scope: Box<dyn EditScope>,
    pub notifications: Box<dyn NotificationSink>,
    pub actions: Box<dyn ActionSink>,
    pub input: Box<dyn HostInput>,
}

/// De-duplicates notifications against the immediately preceding message
#[derive(Debug, Default)]
pub struct Notifier {
    last: Option<String>,
}

impl Notifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if the message was forwarded
    pub fn notify(&mut self, sink: &mut dyn NotificationSink, text: &str) -> bool {
        if self.last.as_deref() == Some(text) {
            return false;
        }
        debug!("Forwarding notification: {}", text);
        sink.notify(text);
        self.last = Some(text.to_string());
        true
    }
}

/// Collaborators whose failures are tracked by [`FaultLog`]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Collaborator {
    Camera,
    Selection,
    Snap,
}

impl fmt::Display for Collaborator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Collaborator::Camera => write!(f, "camera store"),
            Collaborator::Selection => write!(f, "selection provider"),
            Collaborator::Snap => write!(f, "snap provider"),
        }
    }
}

/// Turns collaborator failures into "nothing to do this tick".
///
/// The first failure of a collaborator is logged as a warning, repeats only
/// at debug level until it succeeds again.
#[derive(Debug, Default)]
pub struct FaultLog {
    failing: HashSet<Collaborator>,
}

impl FaultLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn check<T>(&mut self, who: Collaborator, result: Result<T, HostError>) -> Option<T> {
        match result {
            Ok(value) => {
                if self.failing.remove(&who) {
                    info!("{} reachable again", who);
                }
                Some(value)
            }
            Err(e) => {
                if self.failing.insert(who) {
                    warn!("{} failed, skipping this tick: {}", who, e);
                } else {
                    debug!("{} still failing: {}", who, e);
                }
                None
            }
        }
    }
}
