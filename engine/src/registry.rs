//! Model registry.
//!
//! The registry is an explicit context object holding every registered
//! model descriptor. Hosts build one, register their models and share it
//! (usually behind an `Arc`) with the reducer and the client.

use crate::{
    error::Result,
    schema::{ModelDescriptor, RouteConfig, Schema, StoreOptions},
    state::StoreState,
    Error, ModelName,
};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

/// A statically declared model.
///
/// ```
/// use flute_engine::{FieldDef, FieldKind, Model, Registry, Schema};
///
/// struct Todo;
///
/// impl Model for Todo {
///     const NAME: &'static str = "Todo";
///
///     fn schema() -> Schema {
///         Schema::new(vec![
///             FieldDef::new("title", FieldKind::String),
///             FieldDef::new("done", FieldKind::Boolean),
///         ])
///     }
/// }
///
/// let mut registry = Registry::new();
/// registry.register_model::<Todo>().unwrap();
/// assert!(registry.get("Todo").is_ok());
/// ```
pub trait Model {
    /// Unique model name (PascalCase)
    const NAME: &'static str;

    fn schema() -> Schema;

    fn routes() -> RouteConfig {
        RouteConfig::default()
    }

    fn store() -> StoreOptions {
        StoreOptions::default()
    }

    fn descriptor() -> ModelDescriptor {
        ModelDescriptor {
            name: Self::NAME.to_string(),
            schema: Self::schema(),
            routes: Self::routes(),
            store: Self::store(),
        }
    }
}

/// Registered models by name.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    models: BTreeMap<ModelName, Arc<ModelDescriptor>>,
    /// UPPER_SNAKE action name to model name
    action_names: BTreeMap<String, ModelName>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a descriptor. A later registration under the same name
    /// replaces the earlier one; a different name that maps to an already
    /// taken action name (`HttpRequest` and `HTTPRequest`) is rejected.
    pub fn register(&mut self, descriptor: ModelDescriptor) -> Result<Arc<ModelDescriptor>> {
        if descriptor.schema.is_empty() {
            return Err(Error::SchemaError(descriptor.name));
        }

        let action_name = descriptor.action_name();
        if let Some(owner) = self.action_names.get(&action_name) {
            if *owner != descriptor.name {
                tracing::warn!(
                    model = %descriptor.name,
                    owner = %owner,
                    action = %action_name,
                    "action name already taken"
                );
                return Err(Error::SchemaError(descriptor.name));
            }
        }

        let descriptor = Arc::new(descriptor);
        self.action_names
            .insert(action_name, descriptor.name.clone());
        self.models
            .insert(descriptor.name.clone(), Arc::clone(&descriptor));

        tracing::debug!(model = %descriptor.name, "registered model");
        Ok(descriptor)
    }

    /// Register a statically declared model.
    pub fn register_model<M: Model>(&mut self) -> Result<Arc<ModelDescriptor>> {
        self.register(M::descriptor())
    }

    /// Register a model from its JSON declaration.
    ///
    /// The candidate must be an object with a string `name`; a missing or
    /// empty `schema` is a [`Error::SchemaError`].
    pub fn register_value(&mut self, candidate: Value) -> Result<Arc<ModelDescriptor>> {
        let name = candidate
            .as_object()
            .and_then(|obj| obj.get("name"))
            .and_then(Value::as_str)
            .ok_or_else(|| Error::TypeMismatch(summarize(&candidate)))?
            .to_string();

        let has_schema = candidate
            .get("schema")
            .and_then(Value::as_object)
            .is_some_and(|schema| !schema.is_empty());
        if !has_schema {
            return Err(Error::SchemaError(name));
        }

        let descriptor: ModelDescriptor = serde_json::from_value(candidate)
            .map_err(|e| Error::TypeMismatch(format!("#<{name}>: {e}")))?;
        self.register(descriptor)
    }

    /// Look up a model by name.
    pub fn get(&self, name: &str) -> Result<&Arc<ModelDescriptor>> {
        self.models
            .get(name)
            .ok_or_else(|| Error::UnknownModel(name.to_string()))
    }

    /// Look up a model by its UPPER_SNAKE action name.
    pub fn by_action_name(&self, action_name: &str) -> Option<&Arc<ModelDescriptor>> {
        self.action_names
            .get(action_name)
            .and_then(|name| self.models.get(name))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.models.contains_key(name)
    }

    pub fn descriptors(&self) -> impl Iterator<Item = &Arc<ModelDescriptor>> {
        self.models.values()
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    /// One empty slice per registered model.
    pub fn initial_state(&self) -> StoreState {
        StoreState::initial(self.models.values().map(|d| d.as_ref()))
    }
}

fn summarize(candidate: &Value) -> String {
    let text = candidate.to_string();
    match text.char_indices().nth(64) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text,
    }
}
