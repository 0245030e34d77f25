use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    routing::{get, post, MethodRouter},
    Json, Router,
};
use shared::{
    domain::{Mode, StatusOption},
    error::{ApiError, ConfigRejection},
    protocol::{
        config_route, hostname_route, state_route, ConfigCommand, HostnameResponse,
        StateSnapshot, StatusResponse,
    },
};
use tower_http::{cors::CorsLayer, limit::RequestBodyLimitLayer};
use tracing::warn;

use crate::{
    app_state::AppState,
    device::{
        Device, FAST_SPEED, HIGH_BRIGHTNESS, LOW_BRIGHTNESS, MEDIUM_BRIGHTNESS, MEDIUM_SPEED,
        SLOW_SPEED,
    },
};

/// Config bodies are tiny; anything larger is not a request the device understands.
const MAX_CONFIG_BYTES: usize = 512;

type ApiResult<T> = Result<Json<T>, (StatusCode, Json<ApiError>)>;

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route(hostname_route(), get(hostname))
        .route(state_route(), get(config_state))
        .route(config_route(), post(update_config))
        .route("/status", get(status))
        .route("/status/free", status_shortcut(StatusOption::Free))
        .route("/status/busy", status_shortcut(StatusOption::Busy))
        .route("/status/dnd", status_shortcut(StatusOption::Dnd))
        .route("/status/unknown", status_shortcut(StatusOption::Unknown))
        .route("/power/on", shortcut(Device::power_on))
        .route("/power/off", shortcut(Device::power_off))
        .route("/power/toggle", shortcut(Device::toggle_power))
        .route("/config/mode/next", shortcut(Device::next_mode))
        .route("/config/mode/prev", shortcut(Device::prev_mode))
        .route("/config/mode/solid", mode_shortcut(Mode::Solid))
        .route("/config/mode/breath", mode_shortcut(Mode::Breath))
        .route("/config/mode/marquee", mode_shortcut(Mode::Marquee))
        .route("/config/mode/theater", mode_shortcut(Mode::Theater))
        .route("/config/mode/rainbow", mode_shortcut(Mode::Rainbow))
        .route(
            "/config/mode/rainbow/marquee",
            mode_shortcut(Mode::RainbowMarquee),
        )
        .route(
            "/config/mode/marquee/rainbow",
            mode_shortcut(Mode::RainbowMarquee),
        )
        .route(
            "/config/mode/rainbow/theater",
            mode_shortcut(Mode::RainbowTheater),
        )
        .route(
            "/config/mode/theater/rainbow",
            mode_shortcut(Mode::RainbowTheater),
        )
        .route("/config/speed/slow", speed_shortcut(SLOW_SPEED))
        .route("/config/speed/medium", speed_shortcut(MEDIUM_SPEED))
        .route("/config/speed/med", speed_shortcut(MEDIUM_SPEED))
        .route("/config/speed/fast", speed_shortcut(FAST_SPEED))
        .route("/config/brightness/low", brightness_shortcut(LOW_BRIGHTNESS))
        .route(
            "/config/brightness/medium",
            brightness_shortcut(MEDIUM_BRIGHTNESS),
        )
        .route("/config/brightness/med", brightness_shortcut(MEDIUM_BRIGHTNESS))
        .route("/config/brightness/high", brightness_shortcut(HIGH_BRIGHTNESS))
        .layer(RequestBodyLimitLayer::new(MAX_CONFIG_BYTES))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn healthz() -> &'static str {
    "ok"
}

async fn hostname(State(state): State<Arc<AppState>>) -> Json<HostnameResponse> {
    Json(HostnameResponse {
        hostname: state.hostname().to_string(),
    })
}

async fn config_state(State(state): State<Arc<AppState>>) -> Json<StateSnapshot> {
    let snapshot = state.device().snapshot();
    Json(snapshot)
}

async fn status(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    let status = state.device().status();
    Json(StatusResponse { status })
}

async fn update_config(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> ApiResult<StateSnapshot> {
    let command: ConfigCommand = serde_json::from_slice(&body)
        .map_err(|e| rejected(ConfigRejection::MalformedBody(e.to_string())))?;
    let snapshot = state.device().apply(&command).map_err(rejected)?;
    Ok(Json(snapshot))
}

fn rejected(error: ConfigRejection) -> (StatusCode, Json<ApiError>) {
    warn!(%error, "rejected config request");
    (StatusCode::BAD_REQUEST, Json(error.into()))
}

/// `GET` route that runs one device action and answers with the resulting state.
fn shortcut<F>(action: F) -> MethodRouter<Arc<AppState>>
where
    F: Fn(&mut Device) -> StateSnapshot + Clone + Send + Sync + 'static,
{
    get(move |State(state): State<Arc<AppState>>| {
        let action = action.clone();
        async move {
            let snapshot = action(&mut *state.device());
            Json(snapshot)
        }
    })
}

fn mode_shortcut(mode: Mode) -> MethodRouter<Arc<AppState>> {
    shortcut(move |device: &mut Device| device.switch_mode(mode))
}

fn status_shortcut(option: StatusOption) -> MethodRouter<Arc<AppState>> {
    shortcut(move |device: &mut Device| device.set_status_shortcut(option))
}

fn speed_shortcut(speed: u8) -> MethodRouter<Arc<AppState>> {
    shortcut(move |device: &mut Device| device.set_speed(speed))
}

fn brightness_shortcut(alpha: u8) -> MethodRouter<Arc<AppState>> {
    shortcut(move |device: &mut Device| device.set_brightness(alpha))
}

#[cfg(test)]
#[path = "tests/mod_tests.rs"]
mod tests;
