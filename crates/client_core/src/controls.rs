//! Seams to the presentation layer: the control surface, the error signal and change events.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use shared::domain::{ConfigKey, RgbaFraction};
use tracing::{info, warn};

/// Change notifications raised by controls, whether the change came from the user or from
/// reconciliation selecting an option programmatically.
#[derive(Debug, Clone, PartialEq)]
pub enum ControlEvent {
    OptionSelected { key: ConfigKey, label: String },
    BrightnessChanged(String),
    ColorChanged { color: RgbaFraction, picker_open: bool },
    CustomStatusEdited(String),
    RefreshRequested,
}

/// The widgets a session drives. Implementations must be cheap and non-blocking.
pub trait ControlSurface: Send + Sync {
    fn set_picker_color(&self, color: RgbaFraction);
    fn set_rainbow(&self, enabled: bool);
    fn set_swatch_muted(&self, muted: bool);
    fn set_brightness(&self, brightness: u8);
    /// Selects `label` in the option group of `key`. A selection that changes the group raises
    /// [`ControlEvent::OptionSelected`], exactly like a click would.
    fn select_option(&self, key: ConfigKey, label: &str);
    fn set_custom_status_visible(&self, visible: bool);
    fn set_custom_status_text(&self, text: &str);
    fn custom_status_text(&self) -> String;
    fn scroll_offset(&self) -> f64;
    fn restore_scroll_offset(&self, offset: f64);
    fn set_title(&self, title: &str);
}

/// Presents and dismisses the communication error.
pub trait ErrorSignal: Send + Sync {
    fn present(&self);
    fn dismiss(&self);
}

/// Error signal that records its state and logs transitions.
#[derive(Default)]
pub struct ErrorFlag {
    active: AtomicBool,
    presented: AtomicUsize,
    dismissed: AtomicUsize,
}

impl ErrorFlag {
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    pub fn presented_count(&self) -> usize {
        self.presented.load(Ordering::SeqCst)
    }

    pub fn dismissed_count(&self) -> usize {
        self.dismissed.load(Ordering::SeqCst)
    }
}

impl ErrorSignal for ErrorFlag {
    fn present(&self) {
        self.presented.fetch_add(1, Ordering::SeqCst);
        if !self.active.swap(true, Ordering::SeqCst) {
            warn!("communication error: make sure the device is powered on and on the same network");
        }
    }

    fn dismiss(&self) {
        self.dismissed.fetch_add(1, Ordering::SeqCst);
        if self.active.swap(false, Ordering::SeqCst) {
            info!("device communication restored");
        }
    }
}
