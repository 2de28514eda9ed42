//! Per-tick choice between moving the camera and nudging the selection.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::controller::buttons::{ButtonEdge, ButtonEdgeDetector, EdgeKind};
use crate::host::{Modifiers, NavigatorAction};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum BindingParseError {
    #[error("Unknown control binding '{0}', expected 'none', a button index or shift/ctrl/alt")]
    Unknown(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ModifierKey {
    Shift,
    Ctrl,
    Alt,
}

/// A control that can hold a mode or trigger an action
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ControlBinding {
    None,
    /// Raw device button index
    Button(usize),
    Key(ModifierKey),
}

impl ControlBinding {
    pub fn is_active(&self, buttons: &ButtonEdgeDetector, modifiers: &Modifiers) -> bool {
        match self {
            ControlBinding::None => false,
            ControlBinding::Button(index) => buttons.is_pressed(*index),
            ControlBinding::Key(ModifierKey::Shift) => modifiers.shift,
            ControlBinding::Key(ModifierKey::Ctrl) => modifiers.ctrl,
            ControlBinding::Key(ModifierKey::Alt) => modifiers.alt,
        }
    }

    pub fn is_button(&self, index: usize) -> bool {
        matches!(self, ControlBinding::Button(i) if *i == index)
    }
}

impl FromStr for ControlBinding {
    type Err = BindingParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        match trimmed.to_ascii_lowercase().as_str() {
            "none" | "" => Ok(ControlBinding::None),
            "shift" => Ok(ControlBinding::Key(ModifierKey::Shift)),
            "ctrl" | "control" => Ok(ControlBinding::Key(ModifierKey::Ctrl)),
            "alt" => Ok(ControlBinding::Key(ModifierKey::Alt)),
            other => other
                .parse::<usize>()
                .map(ControlBinding::Button)
                .map_err(|_| BindingParseError::Unknown(trimmed.to_string())),
        }
    }
}

impl TryFrom<String> for ControlBinding {
    type Error = BindingParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl fmt::Display for ControlBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControlBinding::None => write!(f, "none"),
            ControlBinding::Button(index) => write!(f, "{}", index),
            ControlBinding::Key(ModifierKey::Shift) => write!(f, "shift"),
            ControlBinding::Key(ModifierKey::Ctrl) => write!(f, "ctrl"),
            ControlBinding::Key(ModifierKey::Alt) => write!(f, "alt"),
        }
    }
}

impl From<ControlBinding> for String {
    fn from(binding: ControlBinding) -> Self {
        binding.to_string()
    }
}

/// Which controls drive which mode or action. Any binding in a list activates it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlBindings {
    pub translate_only: Vec<ControlBinding>,
    pub rotate_only: Vec<ControlBinding>,
    pub always_move: Vec<ControlBinding>,
    pub fit_view: Vec<ControlBinding>,
    pub home_view: Vec<ControlBinding>,
    pub fine_nudge: Vec<ControlBinding>,
}

impl Default for ControlBindings {
    fn default() -> Self {
        Self {
            translate_only: vec![ControlBinding::Key(ModifierKey::Shift), ControlBinding::Button(1)],
            rotate_only: vec![ControlBinding::Key(ModifierKey::Ctrl), ControlBinding::Button(2)],
            always_move: vec![ControlBinding::Button(3)],
            fit_view: vec![ControlBinding::Button(4)],
            home_view: vec![ControlBinding::Button(5)],
            fine_nudge: vec![ControlBinding::Button(9)],
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    Camera { translate: bool, rotate: bool },
    Nudge,
}

impl Mode {
    pub fn is_nudge(&self) -> bool {
        matches!(self, Mode::Nudge)
    }
}

#[derive(Debug, Clone)]
pub struct ModeSelector {
    bindings: ControlBindings,
    always_move: bool,
}

impl ModeSelector {
    pub fn new(bindings: ControlBindings, always_move: bool) -> Self {
        Self {
            bindings,
            always_move,
        }
    }

    pub fn bindings(&self) -> &ControlBindings {
        &self.bindings
    }

    pub fn select(
        &self,
        buttons: &ButtonEdgeDetector,
        modifiers: &Modifiers,
        selection_empty: bool,
    ) -> Mode {
        let active = |list: &[ControlBinding]| list.iter().any(|b| b.is_active(buttons, modifiers));

        let translate_only = active(&self.bindings.translate_only);
        let rotate_only = active(&self.bindings.rotate_only);

        if self.always_move
            || active(&self.bindings.always_move)
            || translate_only
            || rotate_only
            || selection_empty
        {
            Mode::Camera {
                translate: !rotate_only,
                rotate: !translate_only,
            }
        } else {
            Mode::Nudge
        }
    }

    pub fn is_fine(&self, buttons: &ButtonEdgeDetector, modifiers: &Modifiers) -> bool {
        self.bindings
            .fine_nudge
            .iter()
            .any(|b| b.is_active(buttons, modifiers))
    }

    /// Maps a button press to the view action bound to it
    pub fn action_for(&self, edge: &ButtonEdge) -> Option<NavigatorAction> {
        if edge.kind != EdgeKind::Down {
            return None;
        }
        if self.bindings.fit_view.iter().any(|b| b.is_button(edge.index)) {
            Some(NavigatorAction::FitView)
        } else if self.bindings.home_view.iter().any(|b| b.is_button(edge.index)) {
            Some(NavigatorAction::HomeView)
        } else {
            None
        }
    }
}
