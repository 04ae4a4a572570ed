//! Model descriptors.
//!
//! A descriptor is the static declaration of one model type: its schema
//! (field names and kinds), its route configuration and its store shape.
//! Descriptors are pure data; the resolver, codec and reducer read them.

use crate::{error::Result, inflect, Error, ModelName};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Reserved schema key declaring `createdAt`/`updatedAt` timestamps.
pub const TIMESTAMPS_KEY: &str = "_timestamps";
/// Reserved schema key naming the primary key field.
pub const KEY_KEY: &str = "_key";
/// Primary key used when a schema does not declare one.
pub const DEFAULT_KEY: &str = "id";

/// Field kinds supported in schemas.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FieldKind {
    String,
    Number,
    Boolean,
    Date,
    Object,
    Array,
    /// A kind the codec does not know; values pass through untouched.
    Other(String),
}

impl FieldKind {
    /// Parse a kind from its schema name. Never fails: unknown names
    /// become [`FieldKind::Other`].
    pub fn from_name(name: &str) -> Self {
        match name {
            "String" => FieldKind::String,
            "Number" => FieldKind::Number,
            "Boolean" => FieldKind::Boolean,
            "Date" => FieldKind::Date,
            "Object" => FieldKind::Object,
            "Array" => FieldKind::Array,
            other => FieldKind::Other(other.to_string()),
        }
    }

    /// The schema name of this kind.
    pub fn name(&self) -> &str {
        match self {
            FieldKind::String => "String",
            FieldKind::Number => "Number",
            FieldKind::Boolean => "Boolean",
            FieldKind::Date => "Date",
            FieldKind::Object => "Object",
            FieldKind::Array => "Array",
            FieldKind::Other(name) => name,
        }
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Definition of a field in a schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDef {
    /// Field name
    pub name: String,
    /// Field kind
    pub kind: FieldKind,
}

impl FieldDef {
    /// Create a new field definition.
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

/// Schema for a model.
///
/// Serialized as a flat JSON object mapping field names to kind names, plus
/// the reserved `_timestamps` and `_key` entries:
///
/// ```json
/// { "name": "String", "age": "Number", "_timestamps": true, "_key": "uuid" }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Map<String, Value>", into = "Map<String, Value>")]
pub struct Schema {
    /// Field definitions, in declaration order
    pub fields: Vec<FieldDef>,
    /// Whether records carry read-only `createdAt`/`updatedAt`
    pub timestamps: bool,
    /// Custom primary key name (defaults to `id`)
    pub key: Option<String>,
}

impl Schema {
    /// Create a schema from field definitions.
    pub fn new(fields: Vec<FieldDef>) -> Self {
        Self {
            fields,
            timestamps: false,
            key: None,
        }
    }

    /// Builder-style method to declare timestamps.
    pub fn with_timestamps(mut self) -> Self {
        self.timestamps = true;
        self
    }

    /// Builder-style method to set a custom primary key.
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    /// The primary key field name.
    pub fn key(&self) -> &str {
        self.key.as_deref().unwrap_or(DEFAULT_KEY)
    }

    /// Get a field definition by name.
    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Whether the schema declares no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl TryFrom<Map<String, Value>> for Schema {
    type Error = Error;

    fn try_from(map: Map<String, Value>) -> Result<Self> {
        let mut schema = Schema::default();

        for (name, value) in map {
            match name.as_str() {
                TIMESTAMPS_KEY => {
                    schema.timestamps = value.as_bool().ok_or_else(|| {
                        Error::TypeMismatch(format!("`{TIMESTAMPS_KEY}` must be a boolean"))
                    })?;
                }
                KEY_KEY => {
                    let key = value.as_str().ok_or_else(|| {
                        Error::TypeMismatch(format!("`{KEY_KEY}` must be a string"))
                    })?;
                    schema.key = Some(key.to_string());
                }
                _ => {
                    let kind = value.as_str().ok_or_else(|| {
                        Error::TypeMismatch(format!("kind of field `{name}` must be a string"))
                    })?;
                    schema.fields.push(FieldDef::new(name, FieldKind::from_name(kind)));
                }
            }
        }

        Ok(schema)
    }
}

impl From<Schema> for Map<String, Value> {
    fn from(schema: Schema) -> Self {
        let mut map = Map::new();
        for field in schema.fields {
            map.insert(field.name, Value::String(field.kind.name().to_string()));
        }
        if schema.timestamps {
            map.insert(TIMESTAMPS_KEY.to_string(), Value::Bool(true));
        }
        if let Some(key) = schema.key {
            map.insert(KEY_KEY.to_string(), Value::String(key));
        }
        map
    }
}

/// REST verbs a route can be resolved for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Verb {
    Get,
    Post,
    Put,
    Delete,
    /// Collection fetch. Shares `GET` permissions but may have its own template.
    Index,
}

impl Verb {
    /// The upper-case wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Verb::Get => "GET",
            Verb::Post => "POST",
            Verb::Put => "PUT",
            Verb::Delete => "DELETE",
            Verb::Index => "INDEX",
        }
    }

    /// The HTTP method used on the wire. `INDEX` travels as `GET`.
    pub fn http_method(&self) -> &'static str {
        match self {
            Verb::Index => "GET",
            other => other.as_str(),
        }
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Verb {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "GET" => Ok(Verb::Get),
            "POST" => Ok(Verb::Post),
            "PUT" => Ok(Verb::Put),
            "DELETE" => Ok(Verb::Delete),
            "INDEX" => Ok(Verb::Index),
            other => Err(Error::RouteNotFound(format!("unknown verb `{other}`"))),
        }
    }
}

/// A single verb or a list of verbs, as accepted by `only` and `except`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum VerbList {
    One(Verb),
    Many(Vec<Verb>),
}

impl VerbList {
    /// Whether the list names `verb`.
    pub fn contains(&self, verb: Verb) -> bool {
        match self {
            VerbList::One(v) => *v == verb,
            VerbList::Many(verbs) => verbs.contains(&verb),
        }
    }
}

impl From<Verb> for VerbList {
    fn from(verb: Verb) -> Self {
        VerbList::One(verb)
    }
}

impl From<Vec<Verb>> for VerbList {
    fn from(verbs: Vec<Verb>) -> Self {
        VerbList::Many(verbs)
    }
}

/// Route configuration for a model.
///
/// Serialized the way models declare it, with templates keyed by verb next
/// to the permission lists:
///
/// ```json
/// { "except": "DELETE", "POST": "/correct-route/:id" }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteConfig {
    /// Allow-list of verbs
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub only: Option<VerbList>,
    /// Deny-list of verbs
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub except: Option<VerbList>,
    /// Explicit path templates by verb
    #[serde(flatten)]
    pub templates: BTreeMap<Verb, String>,
}

impl RouteConfig {
    /// Builder-style method to restrict the model to `verbs`.
    pub fn only(mut self, verbs: impl Into<VerbList>) -> Self {
        self.only = Some(verbs.into());
        self
    }

    /// Builder-style method to forbid `verbs`.
    pub fn except(mut self, verbs: impl Into<VerbList>) -> Self {
        self.except = Some(verbs.into());
        self
    }

    /// Builder-style method to set an explicit template.
    pub fn template(mut self, verb: Verb, template: impl Into<String>) -> Self {
        self.templates.insert(verb, template.into());
        self
    }
}

/// Store shape options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreOptions {
    /// One record ("current user") instead of a keyed collection
    #[serde(default)]
    pub singleton: bool,
}

/// Static declaration of a model type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelDescriptor {
    /// Unique model name (e.g. `BankAccount`)
    pub name: ModelName,
    /// Field schema; empty when a candidate declares none
    #[serde(default)]
    pub schema: Schema,
    /// Route permissions and overrides
    #[serde(default)]
    pub routes: RouteConfig,
    /// Store shape
    #[serde(default)]
    pub store: StoreOptions,
}

impl ModelDescriptor {
    /// Create a collection model descriptor with default routes.
    pub fn new(name: impl Into<ModelName>, schema: Schema) -> Self {
        Self {
            name: name.into(),
            schema,
            routes: RouteConfig::default(),
            store: StoreOptions::default(),
        }
    }

    /// Builder-style method to set the route configuration.
    pub fn with_routes(mut self, routes: RouteConfig) -> Self {
        self.routes = routes;
        self
    }

    /// Builder-style method to mark the model as a singleton.
    pub fn singleton(mut self) -> Self {
        self.store.singleton = true;
        self
    }

    /// Whether the model keeps a single record.
    pub fn is_singleton(&self) -> bool {
        self.store.singleton
    }

    /// The primary key field name.
    pub fn key(&self) -> &str {
        self.schema.key()
    }

    /// The model name as it appears in action types (`BANK_ACCOUNT`).
    pub fn action_name(&self) -> String {
        inflect::action_name(&self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn schema_from_json() {
        let schema: Schema = serde_json::from_value(json!({
            "name": "String",
            "age": "Number",
            "_timestamps": true,
            "_key": "uuid"
        }))
        .unwrap();

        assert_eq!(schema.fields.len(), 2);
        assert_eq!(schema.field("age").unwrap().kind, FieldKind::Number);
        assert!(schema.timestamps);
        assert_eq!(schema.key(), "uuid");
    }

    #[test]
    fn schema_defaults_key_to_id() {
        let schema = Schema::new(vec![FieldDef::new("name", FieldKind::String)]);
        assert_eq!(schema.key(), "id");
        assert!(!schema.timestamps);
    }

    #[test]
    fn unknown_kind_is_kept() {
        let schema: Schema = serde_json::from_value(json!({"blob": "Buffer"})).unwrap();
        assert_eq!(
            schema.field("blob").unwrap().kind,
            FieldKind::Other("Buffer".into())
        );
        assert_eq!(schema.field("blob").unwrap().kind.to_string(), "Buffer");
    }

    #[test]
    fn schema_rejects_non_string_kind() {
        let result: std::result::Result<Schema, _> =
            serde_json::from_value(json!({"name": 42}));
        assert!(result.is_err());
    }

    #[test]
    fn schema_serialization() {
        let schema = Schema::new(vec![
            FieldDef::new("title", FieldKind::String),
            FieldDef::new("done", FieldKind::Boolean),
        ])
        .with_timestamps();

        let json = serde_json::to_value(&schema).unwrap();
        assert_eq!(
            json,
            json!({"title": "String", "done": "Boolean", "_timestamps": true})
        );

        let parsed: Schema = serde_json::from_value(json).unwrap();
        assert_eq!(schema, parsed);
    }

    #[test]
    fn routes_from_json() {
        let routes: RouteConfig = serde_json::from_value(json!({
            "except": "DELETE",
            "POST": "/correct-route/:id"
        }))
        .unwrap();

        assert_eq!(routes.except, Some(VerbList::One(Verb::Delete)));
        assert_eq!(routes.only, None);
        assert_eq!(
            routes.templates.get(&Verb::Post).map(String::as_str),
            Some("/correct-route/:id")
        );
    }

    #[test]
    fn verb_list_contains() {
        let list = VerbList::Many(vec![Verb::Get, Verb::Post]);
        assert!(list.contains(Verb::Get));
        assert!(!list.contains(Verb::Delete));
        assert!(VerbList::One(Verb::Put).contains(Verb::Put));
    }

    #[test]
    fn verb_parsing() {
        assert_eq!("INDEX".parse::<Verb>().unwrap(), Verb::Index);
        assert_eq!(Verb::Index.http_method(), "GET");
        assert!("PATCH".parse::<Verb>().is_err());
    }

    #[test]
    fn descriptor_defaults() {
        let descriptor: ModelDescriptor = serde_json::from_value(json!({
            "name": "BankAccount",
            "schema": {"balance": "Number"}
        }))
        .unwrap();

        assert!(!descriptor.is_singleton());
        assert_eq!(descriptor.key(), "id");
        assert_eq!(descriptor.action_name(), "BANK_ACCOUNT");
        assert_eq!(descriptor.routes, RouteConfig::default());
    }
}
