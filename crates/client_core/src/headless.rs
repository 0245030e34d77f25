//! In-memory control surface used by the command-line front end and the tests.

use std::{
    collections::BTreeMap,
    sync::{Mutex, MutexGuard},
};

use shared::domain::{ConfigKey, RgbaFraction};
use tokio::sync::mpsc;

use crate::controls::{ControlEvent, ControlSurface};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct HeadlessView {
    pub selections: BTreeMap<ConfigKey, String>,
    pub picker: Option<RgbaFraction>,
    pub picker_updates: usize,
    pub rainbow: bool,
    pub swatch_muted: bool,
    pub brightness: Option<u8>,
    pub custom_status_visible: bool,
    pub custom_status_visibility_changes: usize,
    pub custom_status_text: String,
    pub scroll_offset: f64,
    pub title: Option<String>,
}

impl HeadlessView {
    pub fn selection(&self, key: ConfigKey) -> Option<&str> {
        self.selections.get(&key).map(String::as_str)
    }
}

/// Behaves like a page of radio groups: selecting an option that is not already selected
/// raises a change event, re-selecting the current option does nothing.
pub struct HeadlessSurface {
    view: Mutex<HeadlessView>,
    events: mpsc::UnboundedSender<ControlEvent>,
}

impl HeadlessSurface {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ControlEvent>) {
        let (events, rx) = mpsc::unbounded_channel();
        (
            Self {
                view: Mutex::new(HeadlessView::default()),
                events,
            },
            rx,
        )
    }

    pub fn view(&self) -> HeadlessView {
        self.lock().clone()
    }

    /// Simulates a user clicking an option and returns the resulting change event without
    /// queueing it, for callers that drive the session directly.
    pub fn pick(&self, key: ConfigKey, label: &str) -> ControlEvent {
        self.lock().selections.insert(key, label.to_string());
        ControlEvent::OptionSelected {
            key,
            label: label.to_string(),
        }
    }

    /// Simulates a user click and queues the change event.
    pub fn user_select(&self, key: ConfigKey, label: &str) {
        let event = self.pick(key, label);
        let _ = self.events.send(event);
    }

    pub fn user_drag_color(&self, color: RgbaFraction) {
        let _ = self.events.send(ControlEvent::ColorChanged {
            color,
            picker_open: true,
        });
    }

    pub fn user_type_custom_status(&self, text: &str) {
        self.lock().custom_status_text = text.to_string();
        let _ = self
            .events
            .send(ControlEvent::CustomStatusEdited(text.to_string()));
    }

    pub fn user_set_brightness(&self, value: &str) {
        let _ = self
            .events
            .send(ControlEvent::BrightnessChanged(value.to_string()));
    }

    pub fn user_refresh(&self) {
        let _ = self.events.send(ControlEvent::RefreshRequested);
    }

    pub fn user_scroll_to(&self, offset: f64) {
        self.lock().scroll_offset = offset;
    }

    fn lock(&self) -> MutexGuard<'_, HeadlessView> {
        self.view
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl ControlSurface for HeadlessSurface {
    fn set_picker_color(&self, color: RgbaFraction) {
        let mut view = self.lock();
        view.picker = Some(color);
        view.picker_updates += 1;
    }

    fn set_rainbow(&self, enabled: bool) {
        self.lock().rainbow = enabled;
    }

    fn set_swatch_muted(&self, muted: bool) {
        self.lock().swatch_muted = muted;
    }

    fn set_brightness(&self, brightness: u8) {
        self.lock().brightness = Some(brightness);
    }

    fn select_option(&self, key: ConfigKey, label: &str) {
        let changed = {
            let mut view = self.lock();
            let changed = view.selection(key) != Some(label);
            if changed {
                view.selections.insert(key, label.to_string());
            }
            changed
        };
        if changed {
            let _ = self.events.send(ControlEvent::OptionSelected {
                key,
                label: label.to_string(),
            });
        }
    }

    fn set_custom_status_visible(&self, visible: bool) {
        let mut view = self.lock();
        view.custom_status_visible = visible;
        view.custom_status_visibility_changes += 1;
    }

    fn set_custom_status_text(&self, text: &str) {
        self.lock().custom_status_text = text.to_string();
    }

    fn custom_status_text(&self) -> String {
        self.lock().custom_status_text.clone()
    }

    fn scroll_offset(&self) -> f64 {
        self.lock().scroll_offset
    }

    fn restore_scroll_offset(&self, offset: f64) {
        self.lock().scroll_offset = offset;
    }

    fn set_title(&self, title: &str) {
        self.lock().title = Some(title.to_string());
    }
}
