use std::sync::Arc;

use shared::{
    domain::{ConfigKey, DeviceState, Mode, Status},
    protocol::StateSnapshot,
};
use tracing::debug;

use crate::{
    controls::ControlSurface,
    custom_status::CustomValueHandler,
    store::{StateReader, StateWriter},
};

/// Applies device snapshots: the only writer of the state store, and the only code that drives
/// controls to match confirmed state.
pub struct Reconciler {
    state: StateWriter,
    surface: Arc<dyn ControlSurface>,
    custom: Arc<CustomValueHandler>,
}

impl Reconciler {
    pub fn new(
        state: StateWriter,
        surface: Arc<dyn ControlSurface>,
        custom: Arc<CustomValueHandler>,
    ) -> Self {
        Self {
            state,
            surface,
            custom,
        }
    }

    pub fn reader(&self) -> StateReader {
        self.state.reader()
    }

    /// `update_picker` is false when the snapshot answers a command that came from the picker
    /// itself, which already shows the color.
    pub fn apply(&self, snapshot: &StateSnapshot, update_picker: bool) -> DeviceState {
        if let Some(color) = snapshot.color {
            if update_picker {
                self.surface.set_picker_color(color.to_fraction());
            }
            let party = snapshot.status.as_ref().is_some_and(Status::is_party);
            self.surface.set_rainbow(party);
            self.surface
                .set_swatch_muted(party || snapshot.mode == Some(Mode::Off));
        }

        let state = self.state.apply(snapshot);

        let scroll_offset = self.surface.scroll_offset();

        if let Some(brightness) = state.brightness {
            self.surface.set_brightness(brightness);
        }

        let status_selection = state.status.as_ref().map(|status| self.show_status(status));

        for key in ConfigKey::GROUPS {
            let label = match key {
                ConfigKey::Status => status_selection.clone(),
                _ => option_label(&state, key),
            };
            if let Some(label) = label {
                self.surface.select_option(key, &label);
            }
        }

        self.surface.restore_scroll_offset(scroll_offset);
        debug!(?state, update_picker, "reconciled device state");
        state
    }

    /// Puts one control back on the confirmed value after a command for it was not applied.
    /// The re-selected option matches the store, so its change event is suppressed on dispatch.
    pub fn restore(&self, key: ConfigKey) {
        let state = self.state.reader().snapshot();
        match key {
            ConfigKey::Brightness => {
                if let Some(brightness) = state.brightness {
                    self.surface.set_brightness(brightness);
                }
            }
            ConfigKey::Status => {
                if let Some(status) = &state.status {
                    let label = self.show_status(status);
                    self.surface.select_option(key, &label);
                }
            }
            ConfigKey::Speed | ConfigKey::Mode => {
                if let Some(label) = option_label(&state, key) {
                    self.surface.select_option(key, &label);
                }
            }
        }
        debug!(%key, "restored control to confirmed state");
    }

    fn show_status(&self, status: &Status) -> String {
        let classified = CustomValueHandler::classify(status);
        self.custom.ensure_visible(classified.is_custom);
        if classified.is_custom {
            self.custom.show_text(&classified.display_value);
        }
        classified.selection.label().to_string()
    }
}

fn option_label(state: &DeviceState, key: ConfigKey) -> Option<String> {
    match key {
        ConfigKey::Speed => state.speed.map(|speed| speed.to_string()),
        ConfigKey::Mode => state.mode.map(|mode| mode.as_str().to_string()),
        ConfigKey::Status | ConfigKey::Brightness => None,
    }
}
