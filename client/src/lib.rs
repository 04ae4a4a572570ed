//! # Flute Client
//!
//! Async REST operations for models registered with `flute-engine`.
//!
//! [`Flute`] resolves routes, builds request bodies and reports each
//! request's lifecycle to a [`Dispatch`] collaborator as `@FLUTE_*`
//! actions. [`Store`] is the bundled collaborator: it applies the engine's
//! reducer and publishes every new state on a watch channel.
//!
//! ```rust,no_run
//! use flute_client::{Flute, ReqwestTransport, Store};
//! use flute_engine::{FieldDef, FieldKind, ModelDescriptor, Registry, Schema};
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! # async fn run() -> flute_client::Result<()> {
//! let mut registry = Registry::new();
//! registry.register(ModelDescriptor::new(
//!     "Person",
//!     Schema::new(vec![FieldDef::new("name", FieldKind::String)]),
//! ))?;
//! let registry = Arc::new(registry);
//!
//! let store = Store::new_shared(Arc::clone(&registry));
//! let flute = Flute::new(registry, ReqwestTransport::new().with_base_url("http://localhost:3000"));
//! flute.attach(store.clone());
//!
//! let person = flute.create("Person", &json!({"name": "Kyle"})).await?;
//! let everyone = flute.all("Person", None).await?;
//! # let _ = (person, everyone);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod error;
pub mod store;
pub mod transport;

pub use client::Flute;
pub use error::{ClientError, Result};
pub use store::{Dispatch, Store};
pub use transport::{HttpRequest, HttpResponse, Method, ReqwestTransport, Transport, TransportError};
