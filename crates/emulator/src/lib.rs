//! Software stand-in for the status light: the device's HTTP surface backed by an in-memory
//! state machine.

mod api;
mod app_state;
pub mod config;
pub mod device;

pub use api::build_router;
pub use app_state::AppState;
