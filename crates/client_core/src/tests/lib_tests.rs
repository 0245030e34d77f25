use super::*;
use async_trait::async_trait;
use serde_json::Value;
use shared::{
    domain::{Color, ConfigKey, DeviceState, Mode, RgbaFraction, Status},
    protocol::{ConfigCommand, HostnameResponse, StateSnapshot},
};
use std::sync::{Arc, Mutex};
use tokio::{net::TcpListener, sync::mpsc};

/// Device double that applies commands literally and records every request.
pub(crate) struct FakeDevice {
    state: Mutex<StateSnapshot>,
    hostname: String,
    requests: Mutex<Vec<(String, Option<ConfigCommand>)>>,
    failing: Mutex<bool>,
}

impl FakeDevice {
    pub(crate) fn new(initial: StateSnapshot) -> Self {
        Self {
            state: Mutex::new(initial),
            hostname: "desk".to_string(),
            requests: Mutex::new(Vec::new()),
            failing: Mutex::new(false),
        }
    }

    pub(crate) fn set_failing(&self, failing: bool) {
        *self.failing.lock().expect("lock") = failing;
    }

    pub(crate) fn set_state(&self, snapshot: StateSnapshot) {
        *self.state.lock().expect("lock") = snapshot;
    }

    pub(crate) fn requests(&self) -> Vec<(String, Option<ConfigCommand>)> {
        self.requests.lock().expect("lock").clone()
    }

    pub(crate) fn commands(&self) -> Vec<ConfigCommand> {
        self.requests()
            .into_iter()
            .filter_map(|(_, body)| body)
            .collect()
    }
}

#[async_trait]
impl DeviceTransport for FakeDevice {
    async fn exchange(
        &self,
        path: &str,
        body: Option<&ConfigCommand>,
    ) -> error::Result<Value> {
        self.requests
            .lock()
            .expect("lock")
            .push((path.to_string(), body.cloned()));
        if *self.failing.lock().expect("lock") {
            return Err(ClientError::communication(path, "connection refused"));
        }

        if path == "/hostname" {
            return Ok(serde_json::to_value(HostnameResponse {
                hostname: self.hostname.clone(),
            })
            .expect("json"));
        }

        let mut state = self.state.lock().expect("lock");
        if let Some(command) = body {
            if let Some([r, g, b, a]) = command.color {
                state.color = Some(Color::new(r as u8, g as u8, b as u8, a as u8));
            }
            if let Some(brightness) = command.brightness {
                state.brightness = Some(brightness as u8);
            }
            if let Some(mode) = &command.mode {
                state.mode = Mode::from_label(mode);
            }
            if let Some(speed) = command.speed {
                state.speed = Some(speed as u8);
            }
            if let Some(status) = &command.status {
                state.status = Some(Status::new(status.clone()));
            }
        }
        Ok(serde_json::to_value(&*state).expect("json"))
    }
}

pub(crate) struct Harness {
    pub(crate) device: Arc<FakeDevice>,
    pub(crate) surface: Arc<HeadlessSurface>,
    pub(crate) events: mpsc::UnboundedReceiver<ControlEvent>,
    pub(crate) errors: Arc<ErrorFlag>,
    pub(crate) cache: Arc<MemoryCache>,
    pub(crate) session: Arc<Session>,
}

pub(crate) fn harness_with(
    initial: StateSnapshot,
    cache: MemoryCache,
    config: SessionConfig,
) -> Harness {
    let device = Arc::new(FakeDevice::new(initial));
    let (surface, events) = HeadlessSurface::new();
    let surface = Arc::new(surface);
    let errors = Arc::new(ErrorFlag::default());
    let cache = Arc::new(cache);
    let session = Session::new(
        device.clone(),
        surface.clone(),
        errors.clone(),
        cache.clone(),
        config,
    );
    Harness {
        device,
        surface,
        events,
        errors,
        cache,
        session,
    }
}

pub(crate) fn harness(initial: StateSnapshot) -> Harness {
    harness_with(initial, MemoryCache::default(), SessionConfig::default())
}

pub(crate) fn busy_solid() -> StateSnapshot {
    StateSnapshot {
        color: Some(Color::new(10, 20, 30, 150)),
        mode_num: Some(0),
        mode: Some(Mode::Solid),
        brightness: Some(80),
        speed: Some(3),
        status: Some(Status::new("Busy")),
    }
}

/// Feeds every queued change notification back through the session, as a page would.
async fn deliver_pending_events(h: &mut Harness) -> Vec<DispatchOutcome> {
    let mut outcomes = Vec::new();
    while let Ok(event) = h.events.try_recv() {
        outcomes.push(h.session.handle_event(event).await.expect("event"));
    }
    outcomes
}

#[tokio::test]
async fn initial_state_drives_every_control() {
    let h = harness(busy_solid());
    h.session.refresh().await.expect("refresh");

    let view = h.surface.view();
    assert_eq!(view.selection(ConfigKey::Speed), Some("3"));
    assert_eq!(view.selection(ConfigKey::Status), Some("Busy"));
    assert_eq!(view.selection(ConfigKey::Mode), Some("solid"));
    assert_eq!(view.brightness, Some(80));
    assert_eq!(
        view.picker.expect("picker color").to_string(),
        "rgba(10,20,30,1)"
    );
    assert!(!view.custom_status_visible);
    assert!(!view.rainbow);
    assert!(!view.swatch_muted);

    assert_eq!(h.session.state().color, Some(Color::new(10, 20, 30, 150)));
    assert_eq!(h.device.requests().len(), 1);
}

#[tokio::test]
async fn reconciliation_notifications_never_reach_the_device() {
    let mut h = harness(busy_solid());
    h.session.refresh().await.expect("refresh");

    let outcomes = deliver_pending_events(&mut h).await;
    assert_eq!(outcomes.len(), 3);
    assert!(outcomes
        .iter()
        .all(|outcome| *outcome == DispatchOutcome::Suppressed));
    assert_eq!(h.device.requests().len(), 1);
}

#[tokio::test]
async fn applying_same_snapshot_twice_is_idempotent() {
    let mut h = harness(StateSnapshot::default());
    let snapshot = busy_solid();

    h.session.reconciler().apply(&snapshot, true);
    let first_view = h.surface.view();
    deliver_pending_events(&mut h).await;

    h.session.reconciler().apply(&snapshot, true);
    let outcomes = deliver_pending_events(&mut h).await;

    assert!(outcomes.is_empty());
    assert!(h.device.requests().is_empty());
    let second_view = h.surface.view();
    assert_eq!(first_view.selections, second_view.selections);
    assert_eq!(
        first_view.custom_status_visibility_changes,
        second_view.custom_status_visibility_changes
    );
}

#[tokio::test]
async fn dispatching_current_speed_is_suppressed() {
    let h = harness(busy_solid());
    h.session.refresh().await.expect("refresh");
    let before = h.surface.view();

    let outcome = h
        .session
        .dispatcher()
        .dispatch(ConfigKey::Speed, "3")
        .await
        .expect("dispatch");

    assert_eq!(outcome, DispatchOutcome::Suppressed);
    assert_eq!(h.device.requests().len(), 1);
    assert_eq!(h.surface.view(), before);
}

#[tokio::test]
async fn dispatching_any_confirmed_value_is_suppressed() {
    let h = harness(busy_solid());
    h.session.refresh().await.expect("refresh");
    let dispatcher = h.session.dispatcher();

    for (key, value) in [
        (ConfigKey::Speed, "3"),
        (ConfigKey::Speed, "3.0"),
        (ConfigKey::Brightness, "80"),
        (ConfigKey::Mode, "solid"),
        (ConfigKey::Status, "Busy"),
    ] {
        let outcome = dispatcher.dispatch(key, value).await.expect("dispatch");
        assert_eq!(outcome, DispatchOutcome::Suppressed, "{key}={value}");
    }
    assert_eq!(h.device.requests().len(), 1);
}

#[tokio::test]
async fn changed_value_is_sent_and_reconciled() {
    let mut h = harness(busy_solid());
    h.session.refresh().await.expect("refresh");
    deliver_pending_events(&mut h).await;

    let event = h.surface.pick(ConfigKey::Mode, "breath");
    let outcome = h.session.handle_event(event).await.expect("event");

    assert_eq!(outcome, DispatchOutcome::Sent);
    assert_eq!(h.device.commands(), vec![ConfigCommand::mode(Mode::Breath)]);
    assert_eq!(h.session.state().mode, Some(Mode::Breath));

    let echoes = deliver_pending_events(&mut h).await;
    assert!(echoes.iter().all(|o| *o == DispatchOutcome::Suppressed));
    assert_eq!(h.device.commands().len(), 1);
}

#[tokio::test]
async fn custom_status_round_trip_selects_sentinel_and_shows_text() {
    let h = harness(busy_solid());
    h.session.refresh().await.expect("refresh");

    let outcome = h
        .session
        .dispatcher()
        .dispatch(ConfigKey::Status, "Lunch until 1pm")
        .await
        .expect("dispatch");
    assert_eq!(outcome, DispatchOutcome::Sent);
    assert_eq!(
        h.device.commands(),
        vec![ConfigCommand::status("Lunch until 1pm")]
    );

    let status = h.session.state().status.expect("status");
    let classified = CustomValueHandler::classify(&status);
    assert!(classified.is_custom);

    let view = h.surface.view();
    assert_eq!(view.selection(ConfigKey::Status), Some("Custom"));
    assert!(view.custom_status_visible);
    assert_eq!(view.custom_status_text, "Lunch until 1pm");
}

#[tokio::test]
async fn custom_sentinel_sends_free_text() {
    let h = harness(busy_solid());
    h.session.refresh().await.expect("refresh");
    h.surface.set_custom_status_text("Out walking");

    let outcome = h
        .session
        .dispatcher()
        .dispatch(ConfigKey::Status, "Custom")
        .await
        .expect("dispatch");

    assert_eq!(outcome, DispatchOutcome::Sent);
    assert_eq!(h.device.commands(), vec![ConfigCommand::status("Out walking")]);
}

#[tokio::test]
async fn custom_sentinel_with_empty_text_only_reveals_field() {
    let h = harness(busy_solid());
    h.session.refresh().await.expect("refresh");

    let outcome = h
        .session
        .dispatcher()
        .dispatch(ConfigKey::Status, "Custom")
        .await
        .expect("dispatch");

    assert_eq!(outcome, DispatchOutcome::Suppressed);
    assert!(h.surface.view().custom_status_visible);
    assert!(h.device.commands().is_empty());
}

#[tokio::test]
async fn invalid_values_are_rejected_locally() {
    let h = harness(busy_solid());
    h.session.refresh().await.expect("refresh");
    let dispatcher = h.session.dispatcher();

    assert_eq!(
        dispatcher.dispatch(ConfigKey::Speed, "fast").await.expect("dispatch"),
        DispatchOutcome::Rejected
    );
    assert_eq!(
        dispatcher.dispatch(ConfigKey::Mode, "strobe").await.expect("dispatch"),
        DispatchOutcome::Rejected
    );
    assert!(h.device.commands().is_empty());
}

#[tokio::test(start_paused = true)]
async fn color_commands_use_device_alpha_and_skip_picker_update() {
    let h = harness(busy_solid());
    h.session.refresh().await.expect("refresh");
    let picker_updates = h.surface.view().picker_updates;
    let dispatcher = h.session.dispatcher();
    let dragged = RgbaFraction {
        r: 200,
        g: 100,
        b: 50,
        alpha: 0.5,
    };

    assert_eq!(
        dispatcher.dispatch_color(dragged, true).await.expect("color"),
        DispatchOutcome::Sent
    );
    assert_eq!(
        dispatcher.dispatch_color(dragged, true).await.expect("color"),
        DispatchOutcome::Debounced
    );
    assert_eq!(
        dispatcher.dispatch_color(dragged, false).await.expect("color"),
        DispatchOutcome::Ignored
    );

    assert_eq!(
        h.device.commands(),
        vec![ConfigCommand::color(Color::new(200, 100, 50, 75))]
    );
    assert_eq!(h.session.state().color, Some(Color::new(200, 100, 50, 75)));
    assert_eq!(h.surface.view().picker_updates, picker_updates);

    tokio::time::advance(debounce::COLOR_WINDOW).await;
    assert_eq!(
        dispatcher.dispatch_color(dragged, true).await.expect("color"),
        DispatchOutcome::Sent
    );
}

#[tokio::test]
async fn party_and_off_mute_the_swatch() {
    let h = harness(StateSnapshot::default());

    h.session.reconciler().apply(
        &StateSnapshot {
            color: Some(Color::new(0, 0, 0, 150)),
            mode: Some(Mode::RainbowMarquee),
            status: Some(Status::new("Party!")),
            ..StateSnapshot::default()
        },
        true,
    );
    let view = h.surface.view();
    assert!(view.rainbow);
    assert!(view.swatch_muted);

    h.session.reconciler().apply(
        &StateSnapshot {
            color: Some(Color::new(0, 255, 0, 50)),
            mode: Some(Mode::Off),
            status: Some(Status::new("Unknown")),
            ..StateSnapshot::default()
        },
        true,
    );
    let view = h.surface.view();
    assert!(!view.rainbow);
    assert!(view.swatch_muted);
}

#[tokio::test]
async fn reconciliation_restores_scroll_offset() {
    let h = harness(busy_solid());
    h.surface.user_scroll_to(120.0);
    h.session.refresh().await.expect("refresh");
    assert_eq!(h.surface.view().scroll_offset, 120.0);
}

#[tokio::test]
async fn failed_command_signals_error_and_refresh_recovers() {
    let h = harness(busy_solid());
    h.session.refresh().await.expect("refresh");
    let confirmed = h.session.state();
    let confirmed_view = h.surface.view();

    h.device.set_failing(true);
    let err = h
        .session
        .dispatcher()
        .dispatch(ConfigKey::Speed, "5")
        .await
        .expect_err("device down");
    assert!(err.is_communication());
    assert_eq!(h.errors.presented_count(), 1);
    assert!(h.errors.is_active());
    assert_eq!(h.session.state(), confirmed);
    assert_eq!(h.surface.view(), confirmed_view);

    h.device.set_failing(false);
    h.device.set_state(StateSnapshot {
        speed: Some(5),
        ..busy_solid()
    });
    h.session.refresh().await.expect("refresh");

    assert!(!h.errors.is_active());
    assert_eq!(h.errors.presented_count(), 1);
    assert_eq!(h.session.state().speed, Some(5));
    assert_eq!(h.surface.view().selection(ConfigKey::Speed), Some("5"));
}

#[tokio::test]
async fn undecodable_response_is_a_communication_failure() {
    struct GarbageTransport;

    #[async_trait]
    impl DeviceTransport for GarbageTransport {
        async fn exchange(
            &self,
            _path: &str,
            _body: Option<&ConfigCommand>,
        ) -> error::Result<Value> {
            Ok(serde_json::json!({ "mode": "disco" }))
        }
    }

    let errors = Arc::new(ErrorFlag::default());
    let remote = RemoteClient::new(Arc::new(GarbageTransport), errors.clone());
    let err = remote.fetch_state().await.expect_err("bad mode");
    assert!(err.is_communication());
    assert_eq!(errors.presented_count(), 1);
}

#[tokio::test]
async fn missing_transport_fails_every_request() {
    let errors = Arc::new(ErrorFlag::default());
    let remote = RemoteClient::new(Arc::new(MissingDeviceTransport), errors.clone());
    assert!(remote.fetch_hostname().await.is_err());
    assert!(remote.send_config(&ConfigCommand::speed(1)).await.is_err());
    assert_eq!(errors.presented_count(), 2);
}

#[test]
fn http_transport_rejects_non_http_urls() {
    assert!(matches!(
        HttpTransport::new("ftp://device.local"),
        Err(ClientError::InvalidUrl { .. })
    ));
    assert!(matches!(
        HttpTransport::new("not a url"),
        Err(ClientError::InvalidUrl { .. })
    ));
    let transport = HttpTransport::new("http://device.local/proxy/").expect("transport");
    assert_eq!(transport.base_url(), "http://device.local/proxy");
}

async fn spawn_emulator() -> (String, Arc<emulator::AppState>) {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    let state = Arc::new(emulator::AppState::new("desk"));
    let app = emulator::build_router(Arc::clone(&state));
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    (format!("http://{addr}"), state)
}

#[tokio::test]
async fn session_against_emulated_device() {
    let (url, _device) = spawn_emulator().await;
    let (surface, _events) = HeadlessSurface::new();
    let surface = Arc::new(surface);
    let errors = Arc::new(ErrorFlag::default());
    let session = Session::new(
        Arc::new(HttpTransport::new(&url).expect("transport")),
        surface.clone(),
        errors.clone(),
        Arc::new(MemoryCache::default()),
        SessionConfig::default(),
    );

    session.start().await.expect("start");
    let view = surface.view();
    assert_eq!(view.title.as_deref(), Some("Desk's Status Light"));
    assert_eq!(view.selection(ConfigKey::Mode), Some("off"));
    assert_eq!(view.selection(ConfigKey::Status), Some("Unknown"));
    assert_eq!(view.selection(ConfigKey::Speed), Some("3"));

    let outcome = session
        .dispatcher()
        .dispatch(ConfigKey::Status, "Party!")
        .await
        .expect("party");
    assert_eq!(outcome, DispatchOutcome::Sent);
    let state: DeviceState = session.state();
    assert_eq!(state.mode, Some(Mode::RainbowMarquee));
    assert_eq!(state.brightness, Some(150));
    assert!(surface.view().rainbow);

    session
        .dispatcher()
        .dispatch(ConfigKey::Status, "Lunch until 1pm")
        .await
        .expect("custom");
    let view = surface.view();
    assert_eq!(view.selection(ConfigKey::Status), Some("Custom"));
    assert_eq!(view.custom_status_text, "Lunch until 1pm");
    assert!(view.custom_status_visible);
    assert!(!errors.is_active());
}

#[tokio::test]
async fn unreachable_device_presents_error_once_per_failure() {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);

    let errors = Arc::new(ErrorFlag::default());
    let remote = RemoteClient::new(
        Arc::new(HttpTransport::new(&format!("http://{addr}")).expect("transport")),
        errors.clone(),
    );
    let err = remote.fetch_state().await.expect_err("refused");
    assert!(err.is_communication());
    assert_eq!(errors.presented_count(), 1);
}
