use std::sync::Arc;

use serde_json::Value;
use shared::{
    domain::{Color, ConfigKey, Mode, RgbaFraction, StatusOption},
    protocol::ConfigCommand,
};
use tracing::{debug, warn};

use crate::{
    cache::StateCache,
    custom_status::CustomValueHandler,
    debounce::{InputSource, TrailingDebouncer, WindowDebouncer},
    error::Result,
    reconciler::Reconciler,
    remote::RemoteClient,
    store::StateReader,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Command sent and its response reconciled.
    Sent,
    /// The value already matches confirmed state, or is an empty custom status.
    Suppressed,
    /// The value cannot be expressed as a device command.
    Rejected,
    /// Dropped by the time-window debouncer.
    Debounced,
    /// Picker change that did not come from the user.
    Ignored,
}

/// Turns control changes into device commands. Reads the state store, never writes it.
pub struct CommandDispatcher {
    state: StateReader,
    remote: RemoteClient,
    reconciler: Arc<Reconciler>,
    custom: Arc<CustomValueHandler>,
    cache: Arc<dyn StateCache>,
    color_window: WindowDebouncer<InputSource>,
    custom_status_delay: TrailingDebouncer<InputSource>,
}

impl CommandDispatcher {
    pub fn new(
        remote: RemoteClient,
        reconciler: Arc<Reconciler>,
        custom: Arc<CustomValueHandler>,
        cache: Arc<dyn StateCache>,
        color_window: WindowDebouncer<InputSource>,
        custom_status_delay: TrailingDebouncer<InputSource>,
    ) -> Self {
        Self {
            state: reconciler.reader(),
            remote,
            reconciler,
            custom,
            cache,
            color_window,
            custom_status_delay,
        }
    }

    pub async fn dispatch(&self, key: ConfigKey, raw_value: &str) -> Result<DispatchOutcome> {
        let custom_selected =
            key == ConfigKey::Status && raw_value == StatusOption::Custom.label();
        let value = if custom_selected {
            self.custom.current_text()
        } else {
            raw_value.to_string()
        };

        // Reconciliation selects options through the same change path as the user does, so this
        // check is what keeps a reconciled value from being sent straight back to the device.
        if loosely_equal(&value, self.state.value_of(key).as_ref()) {
            debug!(%key, value, "suppressed command matching confirmed state");
            return Ok(DispatchOutcome::Suppressed);
        }

        let is_custom = key == ConfigKey::Status
            && (custom_selected || StatusOption::from_label(&value).is_none());
        if key == ConfigKey::Status {
            self.custom.ensure_visible(is_custom);
            if is_custom && value.is_empty() {
                debug!("suppressed empty custom status");
                return Ok(DispatchOutcome::Suppressed);
            }
        }

        let Some(command) = command_for(key, &value) else {
            warn!(%key, value, "rejected value that is not a valid device setting");
            self.reconciler.restore(key);
            return Ok(DispatchOutcome::Rejected);
        };

        debug!(%key, value, "sending config command");
        let snapshot = match self.remote.send_config(&command).await {
            Ok(snapshot) => snapshot,
            Err(error) => {
                self.reconciler.restore(key);
                return Err(error);
            }
        };
        self.reconciler.apply(&snapshot, true);
        if is_custom {
            if let Err(error) = self.cache.store_custom_status(&value) {
                warn!(%error, "failed to cache custom status");
            }
        }
        Ok(DispatchOutcome::Sent)
    }

    /// Color changes from the picker. Only user-driven changes (picker open) are sent, at most
    /// one per color window.
    pub async fn dispatch_color(
        &self,
        color: RgbaFraction,
        picker_open: bool,
    ) -> Result<DispatchOutcome> {
        if !picker_open {
            return Ok(DispatchOutcome::Ignored);
        }
        if !self.color_window.try_acquire(InputSource::ColorPicker) {
            return Ok(DispatchOutcome::Debounced);
        }

        let color = Color::from_fraction(color);
        debug!(?color, "sending color command");
        let snapshot = self.remote.send_config(&ConfigCommand::color(color)).await?;
        self.reconciler.apply(&snapshot, false);
        Ok(DispatchOutcome::Sent)
    }

    /// Free-text status edits. Every edit restarts the delay; only the last text is sent, and it
    /// is cached once the device accepts it. Clearing the field cancels the pending send.
    pub fn edit_custom_status(self: &Arc<Self>, text: &str) {
        if text.is_empty() {
            self.custom_status_delay.cancel(&InputSource::CustomStatus);
            return;
        }

        let dispatcher = Arc::clone(self);
        let text = text.to_string();
        self.custom_status_delay
            .schedule(InputSource::CustomStatus, async move {
                if let Err(error) = dispatcher.dispatch(ConfigKey::Status, &text).await {
                    debug!(%error, "custom status command failed");
                }
            });
    }

    pub fn custom_status_pending(&self) -> bool {
        self.custom_status_delay
            .is_pending(&InputSource::CustomStatus)
    }
}

/// Deliberately loose comparison between a control value and the stored one.
///
/// Controls hand over text while the device reports numbers, so a number is compared with the
/// text's numeric reading (blank text reads as 0). Text compares exactly, and an unknown stored
/// value never matches.
pub fn loosely_equal(candidate: &str, stored: Option<&Value>) -> bool {
    match stored {
        Some(Value::Number(number)) => match (coerce_number(candidate), number.as_f64()) {
            (Some(candidate), Some(stored)) => candidate == stored,
            _ => false,
        },
        Some(Value::String(stored)) => stored == candidate,
        Some(Value::Bool(stored)) => match candidate {
            "true" => *stored,
            "false" => !*stored,
            _ => false,
        },
        _ => false,
    }
}

fn coerce_number(text: &str) -> Option<f64> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Some(0.0);
    }
    trimmed.parse::<f64>().ok().filter(|value| value.is_finite())
}

fn command_for(key: ConfigKey, value: &str) -> Option<ConfigCommand> {
    match key {
        ConfigKey::Speed => value.trim().parse::<u8>().ok().map(ConfigCommand::speed),
        ConfigKey::Brightness => value
            .trim()
            .parse::<u8>()
            .ok()
            .map(ConfigCommand::brightness),
        ConfigKey::Mode => Mode::from_label(value).map(ConfigCommand::mode),
        ConfigKey::Status => Some(ConfigCommand::status(value)),
    }
}
