//! Reducer-backed store.
//!
//! The [`Store`] owns the current [`StoreState`] behind a
//! `tokio::sync::watch` channel. Each dispatched action is reduced in one
//! synchronous step, so concurrent operations serialize here and
//! subscribers always observe whole states.

use flute_engine::{Action, ModelInstance, Reducer, Registry, Slice, StoreState};
use std::sync::Arc;
use tokio::sync::watch;

/// Receives the actions emitted by client operations.
pub trait Dispatch: Send + Sync {
    fn dispatch(&self, action: Action);
}

/// Holds store state and applies the reducer to dispatched actions.
#[derive(Debug)]
pub struct Store {
    reducer: Reducer,
    state: watch::Sender<Arc<StoreState>>,
}

impl Store {
    /// A store holding the initial state of every registered model.
    pub fn new(registry: Arc<Registry>) -> Self {
        let reducer = Reducer::new(registry);
        let (state, _) = watch::channel(Arc::new(reducer.initial_state()));
        Self { reducer, state }
    }

    /// Create a store wrapped in Arc for sharing.
    pub fn new_shared(registry: Arc<Registry>) -> Arc<Self> {
        Arc::new(Self::new(registry))
    }

    /// The current state.
    pub fn state(&self) -> Arc<StoreState> {
        Arc::clone(&self.state.borrow())
    }

    /// Watch state changes.
    pub fn subscribe(&self) -> watch::Receiver<Arc<StoreState>> {
        self.state.subscribe()
    }

    /// A copy of one model's slice.
    pub fn slice(&self, model: &str) -> Option<Slice> {
        self.state.borrow().get(model).cloned()
    }

    /// Instances rebuilt from a model's slice. Empty for unknown models.
    pub fn instances(&self, model: &str) -> flute_engine::error::Result<Vec<ModelInstance>> {
        let descriptor = self.reducer.registry().get(model)?;
        match self.slice(model) {
            Some(slice) => slice.hydrate(descriptor),
            None => Ok(Vec::new()),
        }
    }

    /// Reduce one action into the state.
    pub fn apply(&self, action: &Action) {
        self.state.send_modify(|state| {
            *state = Arc::new(self.reducer.reduce(state, action));
        });
    }
}

impl Dispatch for Store {
    fn dispatch(&self, action: Action) {
        tracing::debug!(action = %action.action_type, "dispatching");
        self.apply(&action);
    }
}
