//! Observer registration for feed events.
//!
//! Listeners are kept in registration order and invoked synchronously in
//! that order. The lists are copied before dispatch, so a listener may
//! register further listeners without deadlocking.

use crate::connection::ConnectionState;
use crate::message::UpdateEvent;
use parking_lot::RwLock;
use std::sync::Arc;

pub type UpdateListener = Arc<dyn Fn(&UpdateEvent) + Send + Sync>;
pub type StateListener = Arc<dyn Fn(ConnectionState) + Send + Sync>;

#[derive(Default)]
pub struct Listeners {
    update: RwLock<Vec<UpdateListener>>,
    state: RwLock<Vec<StateListener>>,
}

impl Listeners {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_update<F>(&self, listener: F)
    where
        F: Fn(&UpdateEvent) + Send + Sync + 'static,
    {
        self.update.write().push(Arc::new(listener));
    }

    pub fn on_state_change<F>(&self, listener: F)
    where
        F: Fn(ConnectionState) + Send + Sync + 'static,
    {
        self.state.write().push(Arc::new(listener));
    }

    pub fn emit_update(&self, event: &UpdateEvent) {
        let listeners = self.update.read().clone();
        for listener in &listeners {
            listener(event);
        }
    }

    pub fn emit_state(&self, state: ConnectionState) {
        let listeners = self.state.read().clone();
        for listener in &listeners {
            listener(state);
        }
    }

    pub fn update_listener_count(&self) -> usize {
        self.update.read().len()
    }
}

impl std::fmt::Debug for Listeners {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Listeners")
            .field("update", &self.update.read().len())
            .field("state", &self.state.read().len())
            .finish()
    }
}
