//! Client side of the status light protocol: turns bursty control input into rate-limited
//! device commands and reconciles device responses back into control state.

pub mod cache;
pub mod controls;
pub mod custom_status;
pub mod debounce;
pub mod dispatcher;
pub mod error;
pub mod headless;
pub mod reconciler;
pub mod remote;
pub mod session;
pub mod store;

pub use cache::{CachedValues, FileCache, MemoryCache, StateCache};
pub use controls::{ControlEvent, ControlSurface, ErrorFlag, ErrorSignal};
pub use custom_status::{Classification, CustomValueHandler};
pub use debounce::{InputSource, TrailingDebouncer, WindowDebouncer};
pub use dispatcher::{loosely_equal, CommandDispatcher, DispatchOutcome};
pub use error::ClientError;
pub use headless::{HeadlessSurface, HeadlessView};
pub use reconciler::Reconciler;
pub use remote::{DeviceTransport, HttpTransport, MissingDeviceTransport, RemoteClient};
pub use session::{Session, SessionConfig};
pub use store::{StateReader, StateStore, StateWriter};

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
