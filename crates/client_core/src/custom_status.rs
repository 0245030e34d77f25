use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use shared::domain::{Status, StatusOption};
use tracing::debug;

use crate::controls::ControlSurface;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub is_custom: bool,
    /// Text shown for the status: the free text when custom, the label otherwise.
    pub display_value: String,
    /// Option the status group must show; `Custom` for free text.
    pub selection: StatusOption,
}

/// Decides whether a status is enumerated or free text and owns the free-text field's visibility.
pub struct CustomValueHandler {
    surface: Arc<dyn ControlSurface>,
    shown: AtomicBool,
}

impl CustomValueHandler {
    pub fn new(surface: Arc<dyn ControlSurface>) -> Self {
        Self {
            surface,
            shown: AtomicBool::new(false),
        }
    }

    pub fn classify(status: &Status) -> Classification {
        match status.option() {
            Some(option) => Classification {
                is_custom: false,
                display_value: status.as_str().to_string(),
                selection: option,
            },
            None => Classification {
                is_custom: true,
                display_value: status.as_str().to_string(),
                selection: StatusOption::Custom,
            },
        }
    }

    /// Shows or hides the free-text field. Acts only when visibility actually changes and
    /// returns whether it did.
    pub fn ensure_visible(&self, is_custom: bool) -> bool {
        let was_shown = self.shown.swap(is_custom, Ordering::SeqCst);
        if was_shown == is_custom {
            return false;
        }
        debug!(visible = is_custom, "custom status field visibility changed");
        self.surface.set_custom_status_visible(is_custom);
        true
    }

    pub fn current_text(&self) -> String {
        self.surface.custom_status_text()
    }

    pub fn show_text(&self, text: &str) {
        self.surface.set_custom_status_text(text);
    }
}
