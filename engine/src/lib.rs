//! # Flute Engine
//!
//! REST model binding and store reconciliation for client applications.
//!
//! Models are declared once (fields, key, timestamps, routes, store shape).
//! From those declarations the engine derives REST routes, coerces records,
//! computes request bodies, and reduces request lifecycle actions into a
//! normalized, versioned store state.
//!
//! ## Design Principles
//!
//! - **No IO**: the engine never talks to the network; the client crate
//!   and FFI hosts bring their own transport
//! - **Pure reducer**: same state and action always produce the same state
//! - **Explicit context**: models live in a [`Registry`], not in a global
//!
//! ## Core Concepts
//!
//! ### Records
//!
//! A [`ModelInstance`] wraps a plain JSON record with its model's rules:
//! kind coercion, a write-once `id`, an immutable pristine snapshot, and a
//! [`Tracker`] counting local writes since the last confirmed save.
//!
//! ### Routes
//!
//! [`resolve_route`] checks `only`/`except`, picks an explicit template or
//! generates `/{prefix}/{models}/:id`, and interpolates `:params` from the
//! query and the record.
//!
//! ### Store
//!
//! The [`Reducer`] folds `@FLUTE_*` actions into a [`StoreState`]: one
//! slice per model, either a singleton record or a keyed cache merged with
//! [`merge_records_into_cache`].
//!
//! ## Quick Start
//!
//! ```rust
//! use flute_engine::{
//!     Action, FieldDef, FieldKind, ModelDescriptor, Reducer, Registry, Schema,
//! };
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! // 1. Declare and register a model
//! let mut registry = Registry::new();
//! registry
//!     .register(ModelDescriptor::new(
//!         "Person",
//!         Schema::new(vec![FieldDef::new("name", FieldKind::String)]),
//!     ))
//!     .unwrap();
//!
//! // 2. Build the reducer and the initial state
//! let reducer = Reducer::new(Arc::new(registry));
//! let state = reducer.initial_state();
//!
//! // 3. Reduce a fetch result into the cache
//! let action: Action = serde_json::from_value(json!({
//!     "type": "@FLUTE_GET_SUCCESS_PERSON",
//!     "record": [{"id": 1, "name": "Kyle"}]
//! }))
//! .unwrap();
//! let state = reducer.reduce(&state, &action);
//!
//! let people = state.get("Person").unwrap().as_collection().unwrap();
//! assert_eq!(people.cache[0].record["name"], json!("Kyle"));
//! ```
//!
//! ## FFI
//!
//! The [`ffi`] module exposes the registry, reducer and pure transforms as
//! C functions exchanging JSON strings.

pub mod action;
pub mod cache;
pub mod config;
pub mod diff;
pub mod error;
pub mod ffi;
pub mod inflect;
pub mod query;
pub mod record;
pub mod reducer;
pub mod registry;
pub mod route;
pub mod schema;
pub mod state;
pub mod tracker;

// Re-export main types at crate root
pub use action::{Action, ActionKind, ActionType};
pub use cache::{keys_match, merge_records_into_cache, wrap_records, CacheEntry, RestFlags};
pub use config::{ApiConfig, ApiUpdate, ConfigError};
pub use diff::{diff, prune_array, prune_deep, prune_record, request_body, values_equal};
pub use error::Error;
pub use inflect::Delimiter;
pub use query::{map_to_query_string, query_string_to_map};
pub use record::{is_identity, FieldValue, ModelInstance, Record, Timestamps};
pub use reducer::Reducer;
pub use registry::{Model, Registry};
pub use route::{generate_route, interpolate_route, resolve_route, route_permitted};
pub use schema::{
    FieldDef, FieldKind, ModelDescriptor, RouteConfig, Schema, StoreOptions, Verb, VerbList,
};
pub use state::{CollectionSlice, SingletonSlice, Slice, StoreState};
pub use tracker::{Errors, RequestInfo, Tracker};

/// Type aliases for clarity
pub type ModelName = String;
pub type Version = u64;
