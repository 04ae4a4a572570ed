//! Action wire format.
//!
//! Actions are plain JSON objects:
//!
//! ```json
//! { "type": "@FLUTE_PUT_SUCCESS_BANK_ACCOUNT", "record": { "id": 1 } }
//! ```
//!
//! The type encodes the transition, whether it reports a completed
//! request, and the model in UPPER_SNAKE form.

use crate::{
    record::is_identity,
    schema::{ModelDescriptor, Verb},
    tracker::{Errors, RequestInfo},
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Prefix shared by every action type.
pub const ACTION_PREFIX: &str = "@FLUTE_";

const SUCCESS_INFIX: &str = "_SUCCESS_";

/// The transition an action requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionKind {
    /// A local field write
    Set,
    Get,
    Post,
    Put,
    Delete,
    /// A failed request
    RequestInfo,
}

impl ActionKind {
    const ALL: [ActionKind; 6] = [
        ActionKind::Set,
        ActionKind::Get,
        ActionKind::Post,
        ActionKind::Put,
        ActionKind::Delete,
        ActionKind::RequestInfo,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::Set => "SET",
            ActionKind::Get => "GET",
            ActionKind::Post => "POST",
            ActionKind::Put => "PUT",
            ActionKind::Delete => "DELETE",
            ActionKind::RequestInfo => "REQUEST_INFO",
        }
    }

    /// The REST verb of a request transition.
    pub fn verb(&self) -> Option<Verb> {
        match self {
            ActionKind::Get => Some(Verb::Get),
            ActionKind::Post => Some(Verb::Post),
            ActionKind::Put => Some(Verb::Put),
            ActionKind::Delete => Some(Verb::Delete),
            ActionKind::Set | ActionKind::RequestInfo => None,
        }
    }
}

impl From<Verb> for ActionKind {
    fn from(verb: Verb) -> Self {
        match verb {
            Verb::Get | Verb::Index => ActionKind::Get,
            Verb::Post => ActionKind::Post,
            Verb::Put => ActionKind::Put,
            Verb::Delete => ActionKind::Delete,
        }
    }
}

/// A parsed action type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ActionType {
    pub kind: ActionKind,
    /// Whether the action reports a completed request
    pub success: bool,
    /// Model name in UPPER_SNAKE form
    pub model: String,
}

impl ActionType {
    pub fn new(kind: ActionKind, success: bool, model: impl Into<String>) -> Self {
        Self {
            kind,
            success,
            model: model.into(),
        }
    }

    /// Parse `@FLUTE_{KIND}(_SUCCESS)?_{MODEL}`. Anything else is `None`.
    pub fn parse(raw: &str) -> Option<Self> {
        let rest = raw.strip_prefix(ACTION_PREFIX)?;

        ActionKind::ALL.iter().find_map(|kind| {
            let rest = rest.strip_prefix(kind.as_str())?;
            if let Some(model) = rest.strip_prefix(SUCCESS_INFIX) {
                return Some(Self::new(*kind, true, model));
            }
            let model = rest.strip_prefix('_')?;
            Some(Self::new(*kind, false, model))
        })
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let success = if self.success { "_SUCCESS" } else { "" };
        write!(
            f,
            "{ACTION_PREFIX}{}{success}_{}",
            self.kind.as_str(),
            self.model
        )
    }
}

/// An action dispatched to the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    #[serde(rename = "type")]
    pub action_type: String,
    /// A record, a list of records, or nothing
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub record: Option<Value>,
    #[serde(rename = "_request", default, skip_serializing_if = "Option::is_none")]
    pub request: Option<RequestInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<Errors>,
}

impl Action {
    /// An action of `kind` for a model.
    pub fn new(kind: ActionKind, success: bool, descriptor: &ModelDescriptor) -> Self {
        Self {
            action_type: ActionType::new(kind, success, descriptor.action_name()).to_string(),
            record: None,
            request: None,
            errors: None,
        }
    }

    /// Builder-style method to attach a record payload. `null` means none.
    pub fn with_record(mut self, record: Value) -> Self {
        self.record = (!record.is_null()).then_some(record);
        self
    }

    /// Builder-style method to attach request info and errors.
    pub fn with_request_info(mut self, request: RequestInfo, errors: Errors) -> Self {
        self.request = Some(request);
        self.errors = Some(errors);
        self
    }

    pub fn parsed_type(&self) -> Option<ActionType> {
        ActionType::parse(&self.action_type)
    }

    /// The record's value for `key`, if the record is an object whose key
    /// can identify a record.
    pub fn record_key(&self, key: &str) -> Option<&Value> {
        self.record
            .as_ref()?
            .as_object()?
            .get(key)
            .filter(|v| is_identity(v))
    }
}
