//! Debounced button edges.
//!
//! Presses are reported on the first tick they are observed. Releases have
//! to be observed for `release_debounce_count` consecutive ticks, which
//! rejects single-tick dropouts from noisy hardware.

use std::fmt;

use tracing::debug;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EdgeKind {
    Down,
    Up,
}

impl fmt::Display for EdgeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EdgeKind::Down => write!(f, "down"),
            EdgeKind::Up => write!(f, "up"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ButtonEdge {
    pub index: usize,
    pub kind: EdgeKind,
}

impl ButtonEdge {
    pub fn down(index: usize) -> Self {
        Self {
            index,
            kind: EdgeKind::Down,
        }
    }

    pub fn up(index: usize) -> Self {
        Self {
            index,
            kind: EdgeKind::Up,
        }
    }
}

#[derive(Clone, Debug)]
pub struct ButtonSettings {
    pub release_debounce_count: u32,
}

impl Default for ButtonSettings {
    fn default() -> Self {
        Self {
            release_debounce_count: 2,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
struct ButtonState {
    pressed: bool,
    release_ticks: u32,
}

#[derive(Debug, Default)]
pub struct ButtonEdgeDetector {
    settings: ButtonSettings,
    // Grows lazily, never shrinks
    buttons: Vec<ButtonState>,
}

impl ButtonEdgeDetector {
    pub fn new(settings: ButtonSettings) -> Self {
        Self {
            settings,
            buttons: Vec::new(),
        }
    }

    /// Debounced pressed state of a button
    pub fn is_pressed(&self, index: usize) -> bool {
        self.buttons.get(index).is_some_and(|b| b.pressed)
    }

    /// Feeds one tick of raw button states.
    ///
    /// Buttons missing from `pressed` are observed as released, so an empty
    /// slice walks every known button towards its neutral state.
    pub fn update(&mut self, pressed: &[bool]) -> Vec<ButtonEdge> {
        if pressed.len() > self.buttons.len() {
            self.buttons.resize(pressed.len(), ButtonState::default());
        }

        let mut edges = Vec::new();
        let debounce = self.settings.release_debounce_count;

        for (index, state) in self.buttons.iter_mut().enumerate() {
            let now_pressed = pressed.get(index).copied().unwrap_or(false);

            match (state.pressed, now_pressed) {
                (false, true) => {
                    state.pressed = true;
                    state.release_ticks = 0;
                    edges.push(ButtonEdge::down(index));
                }
                (true, false) => {
                    state.release_ticks += 1;
                    if state.release_ticks >= debounce {
                        state.pressed = false;
                        state.release_ticks = 0;
                        edges.push(ButtonEdge::up(index));
                    }
                }
                (true, true) => {
                    if state.release_ticks > 0 {
                        debug!(
                            "Button {} dropout of {} tick(s) ignored",
                            index, state.release_ticks
                        );
                    }
                    state.release_ticks = 0;
                }
                (false, false) => {}
            }
        }

        edges
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detector(count: u32) -> ButtonEdgeDetector {
        ButtonEdgeDetector::new(ButtonSettings {
            release_debounce_count: count,
        })
    }

    fn with_button(index: usize, pressed: bool) -> Vec<bool> {
        let mut buttons = vec![false; 6];
        buttons[index] = pressed;
        buttons
    }

    #[test]
    fn test_press_fires_immediately() {
        let mut buttons = detector(2);
        assert_eq!(buttons.update(&with_button(1, true)), vec![ButtonEdge::down(1)]);
        assert!(buttons.is_pressed(1));
        assert!(buttons.update(&with_button(1, true)).is_empty());
    }

    #[test]
    fn test_release_waits_for_debounce() {
        let mut buttons = detector(2);
        buttons.update(&with_button(0, true));

        assert!(buttons.update(&with_button(0, false)).is_empty());
        assert!(buttons.is_pressed(0));
        assert_eq!(buttons.update(&with_button(0, false)), vec![ButtonEdge::up(0)]);
        assert!(!buttons.is_pressed(0));
        assert!(buttons.update(&with_button(0, false)).is_empty());
    }

    #[test]
    fn test_single_tick_dropout_never_releases() {
        let mut buttons = detector(2);
        let mut edges = buttons.update(&with_button(3, true));
        edges.extend(buttons.update(&with_button(3, false)));
        edges.extend(buttons.update(&with_button(3, true)));
        edges.extend(buttons.update(&with_button(3, true)));

        assert_eq!(edges, vec![ButtonEdge::down(3)]);
        assert!(buttons.is_pressed(3));
    }

    #[test]
    fn test_missing_device_releases_known_buttons() {
        let mut buttons = detector(1);
        buttons.update(&with_button(2, true));
        assert_eq!(buttons.update(&[]), vec![ButtonEdge::up(2)]);
        assert!(!buttons.is_pressed(5));
        assert!(!buttons.is_pressed(42));
    }
}
