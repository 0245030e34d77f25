//! State machine of the status light: how commands move color, mode, speed and status.

use shared::{
    domain::{Color, Mode, Status, StatusOption, MAX_ALPHA, MAX_SPEED, MIN_SPEED},
    error::ConfigRejection,
    protocol::{ConfigCommand, StateSnapshot},
};
use tracing::{debug, info};

/// Longest custom status the device keeps, in characters.
pub const MAX_CUSTOM_STATUS_CHARS: usize = 79;
/// Status colors raise alpha to at least this so the light stays visible.
pub const MIN_STATUS_ALPHA: u8 = 50;
pub const PARTY_MIN_SPEED: u8 = 3;

pub const LOW_BRIGHTNESS: u8 = 25;
pub const MEDIUM_BRIGHTNESS: u8 = 50;
pub const HIGH_BRIGHTNESS: u8 = MAX_ALPHA;

pub const SLOW_SPEED: u8 = MIN_SPEED;
pub const MEDIUM_SPEED: u8 = 3;
pub const FAST_SPEED: u8 = MAX_SPEED;

const FREE_COLOR: (u8, u8, u8) = (0, 255, 0);
const BUSY_COLOR: (u8, u8, u8) = (255, 0, 255);
const DND_COLOR: (u8, u8, u8) = (255, 0, 0);

/// Animation modes in cycling order; `Off` is not part of the cycle.
const CYCLE: [Mode; 7] = [
    Mode::Solid,
    Mode::Breath,
    Mode::Marquee,
    Mode::Theater,
    Mode::Rainbow,
    Mode::RainbowMarquee,
    Mode::RainbowTheater,
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceStatus {
    Free,
    Busy,
    Dnd,
    Unknown,
    Party,
    Custom(String),
}

impl DeviceStatus {
    fn is_color_status(&self) -> bool {
        matches!(self, DeviceStatus::Free | DeviceStatus::Busy | DeviceStatus::Dnd)
    }

    fn to_status(&self) -> Status {
        match self {
            DeviceStatus::Free => StatusOption::Free.into(),
            DeviceStatus::Busy => StatusOption::Busy.into(),
            DeviceStatus::Dnd => StatusOption::Dnd.into(),
            DeviceStatus::Unknown => StatusOption::Unknown.into(),
            DeviceStatus::Party => StatusOption::Party.into(),
            DeviceStatus::Custom(text) => Status::new(text.clone()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Device {
    rgb: (u8, u8, u8),
    alpha: u8,
    mode: Mode,
    /// Last mode that was not `Off`, used when the light turns back on.
    last_active: Mode,
    speed: u8,
    status: DeviceStatus,
}

impl Default for Device {
    fn default() -> Self {
        Self {
            rgb: FREE_COLOR,
            alpha: MIN_STATUS_ALPHA,
            mode: Mode::Off,
            last_active: Mode::Solid,
            speed: MEDIUM_SPEED,
            status: DeviceStatus::Unknown,
        }
    }
}

impl Device {
    pub fn snapshot(&self) -> StateSnapshot {
        let (r, g, b) = self.rgb;
        StateSnapshot {
            color: Some(Color::new(r, g, b, self.alpha)),
            mode_num: Some(self.mode.index()),
            mode: Some(self.mode),
            brightness: Some(self.alpha),
            speed: Some(self.speed),
            status: Some(self.status.to_status()),
        }
    }

    pub fn status(&self) -> Status {
        self.status.to_status()
    }

    /// Applies a `POST /config` body. Invalid requests leave the device untouched.
    pub fn apply(&mut self, command: &ConfigCommand) -> Result<StateSnapshot, ConfigRejection> {
        if command.is_empty() {
            return Err(ConfigRejection::MissingSetting);
        }

        let requested_mode = match (&command.mode, command.mode_num) {
            (Some(name), _) => Some(self.mode_named(name)?),
            (None, Some(index)) => Some(mode_at(index)?),
            (None, None) => None,
        };

        match requested_mode {
            Some(mode) => self.set_mode(mode),
            None if self.mode == Mode::Off => {
                if command.brightness.is_some() {
                    self.set_mode(self.last_active);
                } else if command.color.is_some() {
                    let mode = if self.last_active.is_rainbow() {
                        Mode::Solid
                    } else {
                        self.last_active
                    };
                    self.set_mode(mode);
                }
            }
            None => {}
        }

        let mut alpha = None;
        let color_changed = command.color.is_some();
        if let Some([r, g, b, a]) = command.color {
            self.rgb = (channel(r), channel(g), channel(b));
            alpha = Some(a);
            if self.mode.is_rainbow() {
                self.set_mode(Mode::Solid);
            }
        }
        if let Some(brightness) = command.brightness {
            alpha = Some(brightness);
        }
        if let Some(alpha) = alpha {
            self.alpha = alpha.clamp(0, i64::from(MAX_ALPHA)) as u8;
        }

        if let Some(speed) = command.speed {
            self.speed = speed.clamp(i64::from(MIN_SPEED), i64::from(MAX_SPEED)) as u8;
        }

        let mut verify = true;
        if let Some(status) = &command.status {
            verify = self.set_status(status);
            info!(status = %self.status.to_status(), "status set");
        }
        if verify {
            self.verify_status(color_changed);
        }

        debug!(?command, snapshot = ?self.snapshot(), "applied config command");
        Ok(self.snapshot())
    }

    /// Sets the status by label; returns whether the status must be checked against the mode
    /// afterwards.
    fn set_status(&mut self, label: &str) -> bool {
        match StatusOption::from_label(label) {
            Some(StatusOption::Free) => self.show_status(DeviceStatus::Free, FREE_COLOR),
            Some(StatusOption::Busy) => self.show_status(DeviceStatus::Busy, BUSY_COLOR),
            Some(StatusOption::Dnd) => self.show_status(DeviceStatus::Dnd, DND_COLOR),
            Some(StatusOption::Unknown) => {
                self.status = DeviceStatus::Unknown;
                return false;
            }
            Some(StatusOption::Party) => self.party(),
            Some(StatusOption::Custom) | None => {
                self.status = DeviceStatus::Custom(
                    label.chars().take(MAX_CUSTOM_STATUS_CHARS).collect(),
                );
                return false;
            }
        }
        true
    }

    fn show_status(&mut self, status: DeviceStatus, rgb: (u8, u8, u8)) {
        self.rgb = rgb;
        self.status = status;
        self.alpha = self.alpha.max(MIN_STATUS_ALPHA);
        // Anything past theater, including off, has no use for a status color.
        if self.mode.is_rainbow() || self.mode == Mode::Off {
            self.set_mode(Mode::Solid);
        }
    }

    fn party(&mut self) {
        self.status = DeviceStatus::Party;
        self.alpha = MAX_ALPHA;
        self.set_mode(Mode::RainbowMarquee);
        self.speed = self.speed.max(PARTY_MIN_SPEED);
    }

    fn verify_status(&mut self, color_changed: bool) {
        let leaving_party = self.status == DeviceStatus::Party && !self.mode.is_rainbow();
        if self.mode == Mode::Off
            || (color_changed && self.status.is_color_status())
            || leaving_party
        {
            self.status = DeviceStatus::Unknown;
        } else if self.mode.is_rainbow() && !matches!(self.status, DeviceStatus::Custom(_)) {
            self.status = DeviceStatus::Party;
        }
    }

    fn set_mode(&mut self, mode: Mode) {
        self.mode = mode;
        if mode != Mode::Off {
            self.last_active = mode;
        }
    }

    fn mode_named(&self, name: &str) -> Result<Mode, ConfigRejection> {
        if name == "on" {
            return Ok(self.last_active);
        }
        Mode::from_label(name).ok_or(ConfigRejection::InvalidMode)
    }

    pub fn switch_mode(&mut self, mode: Mode) -> StateSnapshot {
        self.set_mode(mode);
        self.verify_status(false);
        self.snapshot()
    }

    pub fn power_on(&mut self) -> StateSnapshot {
        self.switch_mode(self.last_active)
    }

    pub fn power_off(&mut self) -> StateSnapshot {
        self.switch_mode(Mode::Off)
    }

    pub fn toggle_power(&mut self) -> StateSnapshot {
        if self.mode == Mode::Off {
            self.power_on()
        } else {
            self.power_off()
        }
    }

    /// Steps through the animation cycle; from off, `next` starts at the first mode and `prev`
    /// at the last.
    pub fn next_mode(&mut self) -> StateSnapshot {
        let next = match CYCLE.iter().position(|mode| *mode == self.mode) {
            Some(i) => CYCLE[(i + 1) % CYCLE.len()],
            None => CYCLE[0],
        };
        self.switch_mode(next)
    }

    pub fn prev_mode(&mut self) -> StateSnapshot {
        let prev = match CYCLE.iter().position(|mode| *mode == self.mode) {
            Some(0) | None => CYCLE[CYCLE.len() - 1],
            Some(i) => CYCLE[i - 1],
        };
        self.switch_mode(prev)
    }

    pub fn set_speed(&mut self, speed: u8) -> StateSnapshot {
        self.speed = speed.clamp(MIN_SPEED, MAX_SPEED);
        self.snapshot()
    }

    /// Brightness shortcuts also turn the light back on.
    pub fn set_brightness(&mut self, alpha: u8) -> StateSnapshot {
        self.alpha = alpha.min(MAX_ALPHA);
        if self.mode == Mode::Off {
            self.set_mode(self.last_active);
        }
        self.snapshot()
    }

    /// Status shortcuts skip the mode check that full config requests go through.
    pub fn set_status_shortcut(&mut self, option: StatusOption) -> StateSnapshot {
        self.set_status(option.label());
        self.snapshot()
    }
}

fn mode_at(index: i64) -> Result<Mode, ConfigRejection> {
    u8::try_from(index)
        .ok()
        .and_then(Mode::from_index)
        .ok_or(ConfigRejection::InvalidMode)
}

fn channel(value: i64) -> u8 {
    value.clamp(0, 255) as u8
}

#[cfg(test)]
#[path = "tests/device_tests.rs"]
mod tests;
