//! The reducer state machine.
//!
//! [`Reducer::reduce`] is a pure function of the previous state and an
//! action. It never fails: actions it does not understand, and actions for
//! unknown models, leave the state unchanged. Payloads the record codec
//! rejects are logged and skipped while the flag transition still applies.
//!
//! | Action         | Slice flag            | Success payload                      |
//! |----------------|-----------------------|--------------------------------------|
//! | `SET`          | none                  | keyed entry `_version += 1`          |
//! | `GET`, `PUT`   | `getting`, `putting`  | merged into the cache                |
//! | `POST`         | `posting`             | appended to the cache                |
//! | `DELETE`       | `deleting`            | keyed entry removed                  |
//! | `REQUEST_INFO` | all cleared           | keyed entry `_request`/`errors` set  |

use crate::{
    action::{Action, ActionKind, ActionType},
    cache::{merge_records_into_cache, wrap_records},
    record::ModelInstance,
    registry::Registry,
    schema::ModelDescriptor,
    state::{CollectionSlice, SingletonSlice, Slice, StoreState},
    tracker::Tracker,
};
use serde_json::Value;
use std::sync::Arc;

/// Applies actions to store state for the models of a registry.
#[derive(Debug, Clone)]
pub struct Reducer {
    registry: Arc<Registry>,
}

impl Reducer {
    pub fn new(registry: Arc<Registry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// One empty slice per registered model.
    pub fn initial_state(&self) -> StoreState {
        self.registry.initial_state()
    }

    /// Compute the state after `action`.
    ///
    /// Slices the action does not touch are shared with `state`, so
    /// pass-through actions cost one map clone of `Arc`s.
    pub fn reduce(&self, state: &StoreState, action: &Action) -> StoreState {
        let Some(action_type) = ActionType::parse(&action.action_type) else {
            tracing::trace!(action = %action.action_type, "ignoring foreign action");
            return state.clone();
        };

        let Some(descriptor) = self.registry.by_action_name(&action_type.model) else {
            tracing::trace!(model = %action_type.model, "ignoring action for unknown model");
            return state.clone();
        };

        let mut next = state.clone();
        match next.slice_mut(descriptor) {
            Slice::Singleton(slice) => reduce_singleton(slice, descriptor, &action_type, action),
            Slice::Collection(slice) => reduce_collection(slice, descriptor, &action_type, action),
        }

        tracing::trace!(model = %descriptor.name, action = %action_type, "reduced action");
        next
    }
}

fn reduce_singleton(
    slice: &mut SingletonSlice,
    descriptor: &Arc<ModelDescriptor>,
    action_type: &ActionType,
    action: &Action,
) {
    let key = descriptor.key();
    let success = action_type.success;

    match action_type.kind {
        ActionKind::Set => {
            if action.record_key(key).is_some() {
                slice.tracker.bump();
            }
        }
        ActionKind::Get | ActionKind::Post | ActionKind::Put => {
            if let Some(verb) = action_type.kind.verb() {
                slice.flags.set(verb, !success);
            }
            if !success {
                return;
            }
            let payload = match &action.record {
                Some(Value::Array(items)) => items.first(),
                other => other.as_ref(),
            };
            if let Some(raw) = payload {
                match ModelInstance::construct(Arc::clone(descriptor), raw) {
                    Ok(instance) => {
                        slice.record = instance.to_store_record();
                        slice.tracker.version = 0;
                    }
                    Err(e) => skip_payload(descriptor, action_type, &e),
                }
            }
        }
        ActionKind::Delete => {
            slice.flags.deleting = !success;
            if success && action.record_key(key).is_some() {
                slice.record.clear();
                slice.tracker.version = 0;
            }
        }
        ActionKind::RequestInfo => {
            slice.flags.clear();
            if action.record_key(key).is_some() {
                replace_request_info(&mut slice.tracker, action);
            }
        }
    }
}

fn reduce_collection(
    slice: &mut CollectionSlice,
    descriptor: &Arc<ModelDescriptor>,
    action_type: &ActionType,
    action: &Action,
) {
    let key = descriptor.key();
    let success = action_type.success;
    let keyed = action.record_key(key);

    match action_type.kind {
        ActionKind::Set => {
            if let Some(value) = keyed {
                for entry in slice.cache.iter_mut().filter(|e| e.matches(key, value)) {
                    entry.tracker.bump();
                }
            }
        }
        ActionKind::Get | ActionKind::Put | ActionKind::Delete | ActionKind::Post => {
            let Some(verb) = action_type.kind.verb() else {
                return;
            };
            slice.flags.set(verb, !success);

            if success {
                fold_success(slice, descriptor, action_type, action);
            } else if let Some(value) = keyed {
                if action_type.kind != ActionKind::Post {
                    for entry in slice.cache.iter_mut().filter(|e| e.matches(key, value)) {
                        entry.flags.set(verb, true);
                    }
                }
            }
        }
        ActionKind::RequestInfo => {
            slice.flags.clear();
            if let Some(value) = keyed {
                for entry in slice.cache.iter_mut().filter(|e| e.matches(key, value)) {
                    replace_request_info(&mut entry.tracker, action);
                    entry.flags.clear();
                }
            }
        }
    }
}

fn fold_success(
    slice: &mut CollectionSlice,
    descriptor: &Arc<ModelDescriptor>,
    action_type: &ActionType,
    action: &Action,
) {
    let key = descriptor.key();

    if action_type.kind == ActionKind::Delete {
        if let Some(value) = action.record_key(key) {
            slice.cache.retain(|entry| !entry.matches(key, value));
        }
        return;
    }

    let records = match &action.record {
        None => return,
        Some(Value::Array(items)) => items.clone(),
        Some(single) => vec![single.clone()],
    };

    let folded = match action_type.kind {
        ActionKind::Post => wrap_records(&records, descriptor).map(|wrapped| {
            let mut cache = std::mem::take(&mut slice.cache);
            cache.extend(wrapped);
            cache
        }),
        _ => merge_records_into_cache(&slice.cache, &records, key, descriptor),
    };

    match folded {
        Ok(cache) => slice.cache = cache,
        Err(e) => skip_payload(descriptor, action_type, &e),
    }
}

fn replace_request_info(tracker: &mut Tracker, action: &Action) {
    tracker.request = action.request.clone().unwrap_or_default();
    tracker.errors = action.errors.clone().unwrap_or_default();
}

fn skip_payload(descriptor: &ModelDescriptor, action_type: &ActionType, error: &crate::Error) {
    tracing::warn!(
        model = %descriptor.name,
        action = %action_type,
        error = %error,
        "skipping payload the record codec rejected"
    );
}
