use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Device alpha maximum; the light never uses the full 0..=255 range.
pub const MAX_ALPHA: u8 = 150;
pub const MIN_SPEED: u8 = 1;
pub const MAX_SPEED: u8 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "[u8; 4]", into = "[u8; 4]")]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    /// Device scale, `0..=MAX_ALPHA`.
    pub a: u8,
}

impl Color {
    pub fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self {
            r,
            g,
            b,
            a: a.min(MAX_ALPHA),
        }
    }

    pub fn to_fraction(self) -> RgbaFraction {
        RgbaFraction {
            r: self.r,
            g: self.g,
            b: self.b,
            alpha: alpha_to_fraction(self.a),
        }
    }

    pub fn from_fraction(color: RgbaFraction) -> Self {
        Self::new(color.r, color.g, color.b, fraction_to_alpha(color.alpha))
    }
}

impl From<[u8; 4]> for Color {
    fn from([r, g, b, a]: [u8; 4]) -> Self {
        Self::new(r, g, b, a)
    }
}

impl From<Color> for [u8; 4] {
    fn from(color: Color) -> Self {
        [color.r, color.g, color.b, color.a]
    }
}

/// Picker-facing color: channels in 0..=255, alpha as a 0..=1 opacity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RgbaFraction {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub alpha: f64,
}

impl fmt::Display for RgbaFraction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rgba({},{},{},{})", self.r, self.g, self.b, self.alpha)
    }
}

pub fn alpha_to_fraction(alpha: u8) -> f64 {
    f64::from(alpha.min(MAX_ALPHA)) / f64::from(MAX_ALPHA)
}

pub fn fraction_to_alpha(fraction: f64) -> u8 {
    if fraction.is_nan() {
        return 0;
    }
    (fraction.clamp(0.0, 1.0) * f64::from(MAX_ALPHA)).round() as u8
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    Off,
    Solid,
    Breath,
    Marquee,
    Theater,
    Rainbow,
    RainbowMarquee,
    RainbowTheater,
}

impl Mode {
    pub const ALL: [Mode; 8] = [
        Mode::Off,
        Mode::Solid,
        Mode::Breath,
        Mode::Marquee,
        Mode::Theater,
        Mode::Rainbow,
        Mode::RainbowMarquee,
        Mode::RainbowTheater,
    ];

    /// Index reported by the device as `mode_num`. Off sits outside the animation range.
    pub const OFF_INDEX: u8 = 10;

    pub fn as_str(self) -> &'static str {
        match self {
            Mode::Off => "off",
            Mode::Solid => "solid",
            Mode::Breath => "breath",
            Mode::Marquee => "marquee",
            Mode::Theater => "theater",
            Mode::Rainbow => "rainbow",
            Mode::RainbowMarquee => "rainbow_marquee",
            Mode::RainbowTheater => "rainbow_theater",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|mode| mode.as_str() == label)
    }

    pub fn index(self) -> u8 {
        match self {
            Mode::Off => Self::OFF_INDEX,
            Mode::Solid => 0,
            Mode::Breath => 1,
            Mode::Marquee => 2,
            Mode::Theater => 3,
            Mode::Rainbow => 4,
            Mode::RainbowMarquee => 5,
            Mode::RainbowTheater => 6,
        }
    }

    pub fn from_index(index: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|mode| mode.index() == index)
    }

    /// Animation modes that ignore the configured color.
    pub fn is_rainbow(self) -> bool {
        matches!(
            self,
            Mode::Rainbow | Mode::RainbowMarquee | Mode::RainbowTheater
        )
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Options offered by the status control. `Custom` is a sentinel standing in for free text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusOption {
    Free,
    Busy,
    Dnd,
    Unknown,
    Party,
    Custom,
}

impl StatusOption {
    pub const ALL: [StatusOption; 6] = [
        StatusOption::Free,
        StatusOption::Busy,
        StatusOption::Dnd,
        StatusOption::Unknown,
        StatusOption::Party,
        StatusOption::Custom,
    ];

    pub fn label(self) -> &'static str {
        match self {
            StatusOption::Free => "Free",
            StatusOption::Busy => "Busy",
            StatusOption::Dnd => "DND",
            StatusOption::Unknown => "Unknown",
            StatusOption::Party => "Party!",
            StatusOption::Custom => "Custom",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|option| option.label() == label)
    }
}

/// Status as carried on the wire: an enumerated label or arbitrary free text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Status(String);

impl Status {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn option(&self) -> Option<StatusOption> {
        StatusOption::from_label(&self.0)
    }

    pub fn is_custom(&self) -> bool {
        self.option().is_none()
    }

    pub fn is_party(&self) -> bool {
        self.option() == Some(StatusOption::Party)
    }
}

impl From<StatusOption> for Status {
    fn from(option: StatusOption) -> Self {
        Self::new(option.label())
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ConfigKey {
    Speed,
    Status,
    Mode,
    Brightness,
}

impl ConfigKey {
    /// Dimensions rendered as option groups, in display order.
    pub const GROUPS: [ConfigKey; 3] = [ConfigKey::Speed, ConfigKey::Status, ConfigKey::Mode];

    pub fn as_str(self) -> &'static str {
        match self {
            ConfigKey::Speed => "speed",
            ConfigKey::Status => "status",
            ConfigKey::Mode => "mode",
            ConfigKey::Brightness => "brightness",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        [
            ConfigKey::Speed,
            ConfigKey::Status,
            ConfigKey::Mode,
            ConfigKey::Brightness,
        ]
        .into_iter()
        .find(|key| key.as_str() == label)
    }
}

impl fmt::Display for ConfigKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Last confirmed device state. Fields stay `None` until a snapshot provides them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeviceState {
    pub color: Option<Color>,
    pub brightness: Option<u8>,
    pub mode: Option<Mode>,
    pub status: Option<Status>,
    pub speed: Option<u8>,
    pub mode_num: Option<u8>,
}

impl DeviceState {
    /// Stored value of a dimension in its JSON form, as the device reports it.
    pub fn value_of(&self, key: ConfigKey) -> Option<Value> {
        match key {
            ConfigKey::Speed => self.speed.map(Value::from),
            ConfigKey::Brightness => self.brightness.map(Value::from),
            ConfigKey::Mode => self.mode.map(|mode| Value::from(mode.as_str())),
            ConfigKey::Status => self.status.as_ref().map(|s| Value::from(s.as_str())),
        }
    }
}
