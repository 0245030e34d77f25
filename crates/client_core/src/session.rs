//! Wires the protocol components together and routes control events through them.

use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use shared::domain::{ConfigKey, DeviceState};
use tokio::{
    sync::mpsc,
    time::{interval_at, Instant, Interval, MissedTickBehavior},
};
use tracing::{debug, info, warn};

use crate::{
    cache::StateCache,
    controls::{ControlEvent, ControlSurface, ErrorSignal},
    custom_status::CustomValueHandler,
    debounce::{TrailingDebouncer, WindowDebouncer, COLOR_WINDOW, CUSTOM_STATUS_DELAY},
    dispatcher::{CommandDispatcher, DispatchOutcome},
    error::Result,
    reconciler::Reconciler,
    remote::{DeviceTransport, RemoteClient},
    store::{StateReader, StateStore},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    pub color_window: Duration,
    pub custom_status_delay: Duration,
    /// Periodic state refresh; `None` disables polling.
    pub poll_interval: Option<Duration>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            color_window: COLOR_WINDOW,
            custom_status_delay: CUSTOM_STATUS_DELAY,
            poll_interval: None,
        }
    }
}

pub struct Session {
    remote: RemoteClient,
    dispatcher: Arc<CommandDispatcher>,
    reconciler: Arc<Reconciler>,
    state: StateReader,
    surface: Arc<dyn ControlSurface>,
    cache: Arc<dyn StateCache>,
    errors: Arc<dyn ErrorSignal>,
    hostname: Mutex<Option<String>>,
    config: SessionConfig,
}

impl Session {
    pub fn new(
        transport: Arc<dyn DeviceTransport>,
        surface: Arc<dyn ControlSurface>,
        errors: Arc<dyn ErrorSignal>,
        cache: Arc<dyn StateCache>,
        config: SessionConfig,
    ) -> Arc<Self> {
        let remote = RemoteClient::new(transport, Arc::clone(&errors));
        let custom = Arc::new(CustomValueHandler::new(Arc::clone(&surface)));
        let (writer, state) = StateStore::new().split();
        let reconciler = Arc::new(Reconciler::new(
            writer,
            Arc::clone(&surface),
            Arc::clone(&custom),
        ));
        let dispatcher = Arc::new(CommandDispatcher::new(
            remote.clone(),
            Arc::clone(&reconciler),
            custom,
            Arc::clone(&cache),
            WindowDebouncer::new(config.color_window),
            TrailingDebouncer::new(config.custom_status_delay),
        ));

        Arc::new(Self {
            remote,
            dispatcher,
            reconciler,
            state,
            surface,
            cache,
            errors,
            hostname: Mutex::new(None),
            config,
        })
    }

    pub fn state(&self) -> DeviceState {
        self.state.snapshot()
    }

    pub fn dispatcher(&self) -> &Arc<CommandDispatcher> {
        &self.dispatcher
    }

    pub fn reconciler(&self) -> &Arc<Reconciler> {
        &self.reconciler
    }

    /// Paints cached values, then asks the device for its hostname and full state.
    pub async fn start(&self) -> Result<()> {
        if let Some(hostname) = self.cache.hostname() {
            self.show_hostname(&hostname);
        }
        if let Some(custom_status) = self.cache.custom_status() {
            self.surface.set_custom_status_text(&custom_status);
        }

        if let Err(error) = self.update_hostname().await {
            debug!(%error, "hostname lookup failed during startup");
        }
        self.refresh().await
    }

    /// Re-reads the full device state; on success the error signal is dismissed.
    pub async fn refresh(&self) -> Result<()> {
        let snapshot = self.remote.fetch_state().await?;
        self.reconciler.apply(&snapshot, true);
        self.errors.dismiss();
        Ok(())
    }

    pub async fn update_hostname(&self) -> Result<()> {
        let hostname = self.remote.fetch_hostname().await?;
        self.show_hostname(&hostname);
        Ok(())
    }

    fn show_hostname(&self, hostname: &str) {
        let Some(title) = title_for(hostname) else {
            return;
        };
        {
            let mut current = self
                .hostname
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            if current.as_deref() == Some(hostname) {
                return;
            }
            *current = Some(hostname.to_string());
        }
        if let Err(error) = self.cache.store_hostname(hostname) {
            warn!(%error, "failed to cache hostname");
        }
        info!(hostname, "device hostname");
        self.surface.set_title(&title);
    }

    pub async fn handle_event(&self, event: ControlEvent) -> Result<DispatchOutcome> {
        match event {
            ControlEvent::OptionSelected { key, label } => {
                self.dispatcher.dispatch(key, &label).await
            }
            ControlEvent::BrightnessChanged(value) => {
                self.dispatcher
                    .dispatch(ConfigKey::Brightness, &value)
                    .await
            }
            ControlEvent::ColorChanged { color, picker_open } => {
                self.dispatcher.dispatch_color(color, picker_open).await
            }
            ControlEvent::CustomStatusEdited(text) => {
                self.dispatcher.edit_custom_status(&text);
                Ok(DispatchOutcome::Ignored)
            }
            ControlEvent::RefreshRequested => {
                self.refresh().await?;
                Ok(DispatchOutcome::Sent)
            }
        }
    }

    /// Event loop. Each event is handled on its own task so slow device responses never hold
    /// up further input. Returns once every event sender is gone.
    pub async fn run(self: Arc<Self>, mut events: mpsc::UnboundedReceiver<ControlEvent>) {
        let mut poll = self.config.poll_interval.map(|period| {
            let mut ticks = interval_at(Instant::now() + period, period);
            ticks.set_missed_tick_behavior(MissedTickBehavior::Skip);
            ticks
        });

        loop {
            tokio::select! {
                event = events.recv() => {
                    let Some(event) = event else {
                        break;
                    };
                    let session = Arc::clone(&self);
                    tokio::spawn(async move {
                        match session.handle_event(event).await {
                            Ok(outcome) => debug!(?outcome, "handled control event"),
                            Err(error) => debug!(%error, "control event failed"),
                        }
                    });
                }
                _ = next_tick(&mut poll) => {
                    let session = Arc::clone(&self);
                    tokio::spawn(async move {
                        if let Err(error) = session.poll().await {
                            debug!(%error, "state poll failed");
                        }
                    });
                }
            }
        }
    }

    /// Polling applies fresh state but leaves an active error for the user to dismiss by refreshing.
    async fn poll(&self) -> Result<()> {
        let snapshot = self.remote.fetch_state().await?;
        self.reconciler.apply(&snapshot, true);
        Ok(())
    }
}

async fn next_tick(poll: &mut Option<Interval>) {
    match poll {
        Some(ticks) => {
            ticks.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}

/// `"desk"` becomes `"Desk's Status Light"`.
pub fn title_for(hostname: &str) -> Option<String> {
    let mut chars = hostname.chars();
    let first = chars.next()?;
    Some(format!(
        "{}{}'s Status Light",
        first.to_uppercase(),
        chars.as_str()
    ))
}

#[cfg(test)]
#[path = "tests/session_tests.rs"]
mod tests;
