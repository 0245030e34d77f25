//! Last confirmed device state, split into one writer and any number of readers.

use std::sync::{Arc, RwLock, RwLockReadGuard};

use serde_json::Value;
use shared::{
    domain::{ConfigKey, DeviceState, Status},
    protocol::StateSnapshot,
};

#[derive(Default)]
pub struct StateStore {
    state: Arc<RwLock<DeviceState>>,
}

impl StateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consumes the store. The writer is the only handle able to mutate state.
    pub fn split(self) -> (StateWriter, StateReader) {
        let reader = StateReader {
            state: Arc::clone(&self.state),
        };
        (StateWriter { state: self.state }, reader)
    }
}

#[derive(Clone)]
pub struct StateReader {
    state: Arc<RwLock<DeviceState>>,
}

impl StateReader {
    pub fn snapshot(&self) -> DeviceState {
        self.read().clone()
    }

    pub fn value_of(&self, key: ConfigKey) -> Option<Value> {
        self.read().value_of(key)
    }

    pub fn status(&self) -> Option<Status> {
        self.read().status.clone()
    }

    fn read(&self) -> RwLockReadGuard<'_, DeviceState> {
        self.state
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

pub struct StateWriter {
    state: Arc<RwLock<DeviceState>>,
}

impl StateWriter {
    pub fn apply(&self, snapshot: &StateSnapshot) -> DeviceState {
        let mut state = self
            .state
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        snapshot.merge_into(&mut state);
        state.clone()
    }

    pub fn reader(&self) -> StateReader {
        StateReader {
            state: Arc::clone(&self.state),
        }
    }
}
