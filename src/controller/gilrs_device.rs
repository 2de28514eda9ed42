use chrono::Local;
use gilrs::{Axis, Button, Event, EventType, Gamepad, GamepadId, Gilrs};
use statum::{machine, state};
use tracing::{debug, error, info, warn};

use super::device::{DeviceError, DeviceSample, DeviceSettings, InputDevice};

/// Analog channels in raw device order
const RAW_AXES: [Axis; 6] = [
    Axis::LeftStickX,
    Axis::LeftStickY,
    Axis::LeftZ,
    Axis::RightStickX,
    Axis::RightStickY,
    Axis::RightZ,
];

/// Buttons in standard gamepad index order
const RAW_BUTTONS: [Button; 17] = [
    Button::South,
    Button::East,
    Button::West,
    Button::North,
    Button::LeftTrigger,
    Button::RightTrigger,
    Button::LeftTrigger2,
    Button::RightTrigger2,
    Button::Select,
    Button::Start,
    Button::LeftThumb,
    Button::RightThumb,
    Button::DPadUp,
    Button::DPadDown,
    Button::DPadLeft,
    Button::DPadRight,
    Button::Mode,
];

const NAME_HINTS: [&str; 4] = ["spacenavigator", "space navigator", "spacemouse", "space mouse"];
const LOGITECH_VENDOR: u16 = 0x046d;

/// True for 3Dconnexion devices, matched by name or by the Logitech
/// vendor id with a `c6xx` product id.
pub fn is_space_mouse(name: &str, vendor: Option<u16>, product: Option<u16>) -> bool {
    let name = name.to_ascii_lowercase();
    if NAME_HINTS.iter().any(|hint| name.contains(hint)) {
        return true;
    }
    matches!((vendor, product), (Some(LOGITECH_VENDOR), Some(p)) if p >> 8 == 0xc6)
}

#[state]
#[derive(Debug, Clone)]
pub enum GamepadLifecycle {
    Opening,
    Open,
}

#[machine]
#[derive(Debug)]
pub struct GilrsDevice<S: GamepadLifecycle> {
    gilrs: Gilrs,
    active: Option<GamepadId>,
    settings: DeviceSettings,
}

impl<S: GamepadLifecycle> GilrsDevice<S> {
    fn find_device(&self) -> Option<GamepadId> {
        let gamepads: Vec<(GamepadId, Gamepad<'_>)> = self.gilrs.gamepads().collect();

        let space_mouse = gamepads
            .iter()
            .find(|(_, gamepad)| {
                is_space_mouse(gamepad.name(), gamepad.vendor_id(), gamepad.product_id())
            })
            .map(|(id, _)| *id);

        if space_mouse.is_some() || !self.settings.accept_generic {
            return space_mouse;
        }
        gamepads.first().map(|(id, _)| *id)
    }
}

impl GilrsDevice<Opening> {
    pub fn create(settings: DeviceSettings) -> Result<Self, DeviceError> {
        info!("Initializing gilrs input backend");
        let gilrs = match Gilrs::new() {
            Ok(g) => g,
            Err(e) => {
                error!("Failed to initialize gilrs: {}", e);
                return Err(DeviceError::InitializationError(e.to_string()));
            }
        };

        debug!("Creating GilrsDevice with settings: {:?}", settings);
        Ok(Self::new(gilrs, None, settings))
    }

    pub fn open(mut self) -> GilrsDevice<Open> {
        for (id, gamepad) in self.gilrs.gamepads() {
            info!(
                "  Gamepad {}: {} (vendor {:04x?}, product {:04x?})",
                id,
                gamepad.name(),
                gamepad.vendor_id(),
                gamepad.product_id()
            );
        }

        self.active = self.find_device();
        match self.active {
            Some(id) => info!("Using input device {}", id),
            None => warn!("No SpaceMouse connected, waiting for one"),
        }
        self.transition()
    }
}

impl GilrsDevice<Open> {
    fn pump_events(&mut self) {
        while let Some(Event { id, event, .. }) = self.gilrs.next_event() {
            match event {
                EventType::Connected => {
                    info!(
                        "Gamepad {} connected at {}",
                        id,
                        Local::now().format("%H:%M:%S%.3f")
                    );
                }
                EventType::Disconnected if self.active == Some(id) => {
                    warn!("Active input device {} disconnected", id);
                    self.active = None;
                }
                _ => {}
            }
        }
    }
}

impl InputDevice for GilrsDevice<Open> {
    fn poll(&mut self) -> Option<DeviceSample> {
        self.pump_events();

        if self.active.is_none() {
            self.active = self.find_device();
            if let Some(id) = self.active {
                info!("Input device {} selected", id);
            }
        }

        let gamepad = self.gilrs.connected_gamepad(self.active?)?;

        let axes = RAW_AXES
            .iter()
            .enumerate()
            .map(|(i, axis)| {
                let value = gamepad.value(*axis) as f64;
                // gilrs reports Y axes up-positive, the device reports them down-positive
                if i == 1 || i == 4 {
                    -value
                } else {
                    value
                }
            })
            .collect();
        let buttons = RAW_BUTTONS.iter().map(|b| gamepad.is_pressed(*b)).collect();

        Some(DeviceSample { axes, buttons })
    }
}
