//! Error types for the Flute engine.

use crate::{schema::Verb, ModelName};
use thiserror::Error;

/// All possible errors from the Flute engine.
///
/// Every variant is a validation error: it is returned to the immediate
/// caller and never dispatched into the store.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    // Routing errors
    #[error("method {verb} is not permitted for model #<{model}>; check the #<{model}> route configuration")]
    PermissionDenied { model: ModelName, verb: Verb },

    #[error("route not found: {0}")]
    RouteNotFound(String),

    // Record errors
    #[error("#<{model}> property `{property}` cannot be redefined")]
    ImmutableProperty { model: ModelName, property: String },

    #[error("#<{model}> has no field `{field}` in its schema")]
    UnknownField { model: ModelName, field: String },

    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    // Registration errors
    #[error("model #<{0}> needs a valid, non-empty schema")]
    SchemaError(ModelName),

    #[error("value is not a Flute model: {0}")]
    TypeMismatch(String),

    #[error("model {0} is not a recognized Flute model")]
    UnknownModel(ModelName),
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = Error::PermissionDenied {
            model: "Person".into(),
            verb: Verb::Delete,
        };
        assert_eq!(
            err.to_string(),
            "method DELETE is not permitted for model #<Person>; check the #<Person> route configuration"
        );

        let err = Error::ImmutableProperty {
            model: "Person".into(),
            property: "id".into(),
        };
        assert_eq!(
            err.to_string(),
            "#<Person> property `id` cannot be redefined"
        );

        let err = Error::SchemaError("Spreadsheet".into());
        assert_eq!(
            err.to_string(),
            "model #<Spreadsheet> needs a valid, non-empty schema"
        );
    }
}
