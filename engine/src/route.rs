//! Route resolution.
//!
//! A route is resolved in three steps:
//!
//! 1. Permission check against the model's `only`/`except` lists
//! 2. Template lookup (explicit override, else a generated REST default)
//! 3. Interpolation of `:param` tokens from the query and the record
//!
//! ```text
//! GET    /stories      INDEX
//! GET    /stories/:id  GET
//! POST   /stories      POST
//! PUT    /stories/:id  PUT
//! DELETE /stories/:id  DELETE
//! ```

use crate::{
    config::ApiConfig,
    error::Result,
    inflect::{self, Delimiter},
    query::{map_to_query_string, normalize_query, param_string},
    schema::{ModelDescriptor, RouteConfig, Verb},
    Error,
};
use serde_json::{Map, Value};

/// Whether `verb` is allowed by a model's route configuration.
///
/// `INDEX` shares the permissions of `GET`, and can additionally be denied
/// on its own through `except`.
pub fn route_permitted(routes: &RouteConfig, verb: Verb) -> bool {
    let checked = match verb {
        Verb::Index => Verb::Get,
        other => other,
    };

    if let Some(only) = &routes.only {
        if !only.contains(checked) {
            return false;
        }
    }

    if let Some(except) = &routes.except {
        if except.contains(checked) || except.contains(verb) {
            return false;
        }
    }

    true
}

/// Build the default REST route for a model.
///
/// The name is pluralized unless the model is a singleton. Every verb but
/// `POST` and index fetches gets a trailing `/:id`.
pub fn generate_route(
    name: &str,
    verb: Verb,
    delimiter: Delimiter,
    prefix: &str,
    index: bool,
    singleton: bool,
) -> String {
    let segment = inflect::delimit(name, delimiter, !singleton);
    let collection_level = index || matches!(verb, Verb::Post | Verb::Index);
    let id = if collection_level { "" } else { "/:id" };
    format!("{prefix}/{segment}{id}")
}

/// Replace every `:token` in `template`.
///
/// A non-empty query value wins over the record field and is consumed. A
/// record field that is missing or `null` leaves the placeholder as is.
/// Query keys left over are appended as a query string.
pub fn interpolate_route(
    template: &str,
    record: &Map<String, Value>,
    query: Option<&Value>,
) -> Result<String> {
    let mut query = normalize_query(query)?;
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find(':') {
        out.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        let end = after.find(['/', '?']).unwrap_or(after.len());
        let token = &after[..end];

        match substitution(token, record, &mut query) {
            Some(value) => out.push_str(&value),
            None => {
                out.push(':');
                out.push_str(token);
            }
        }
        rest = &after[end..];
    }
    out.push_str(rest);

    let remaining = map_to_query_string(&query);
    if let Some(params) = remaining.strip_prefix('?') {
        out.push(if out.contains('?') { '&' } else { '?' });
        out.push_str(params);
    }

    Ok(out)
}

fn substitution(
    token: &str,
    record: &Map<String, Value>,
    query: &mut Map<String, Value>,
) -> Option<String> {
    if token.is_empty() {
        return None;
    }

    let from_query = query
        .get(token)
        .filter(|v| !matches!(v, Value::Null) && v.as_str() != Some(""))
        .map(param_string);
    if let Some(value) = from_query {
        query.shift_remove(token);
        return Some(value);
    }

    record
        .get(token)
        .filter(|v| !v.is_null())
        .map(param_string)
}

/// The explicit template configured for `verb`, if any.
///
/// Index fetches fall back to the `GET` template.
fn configured_template(routes: &RouteConfig, verb: Verb) -> Option<&str> {
    let explicit = routes.templates.get(&verb);
    let explicit = match verb {
        Verb::Index => explicit.or_else(|| routes.templates.get(&Verb::Get)),
        _ => explicit,
    };
    explicit.map(String::as_str)
}

/// Resolve the concrete route for `verb` on a model.
pub fn resolve_route(
    config: &ApiConfig,
    descriptor: &ModelDescriptor,
    verb: Verb,
    record: &Map<String, Value>,
    query: Option<&Value>,
) -> Result<String> {
    if !route_permitted(&descriptor.routes, verb) {
        return Err(Error::PermissionDenied {
            model: descriptor.name.clone(),
            verb,
        });
    }

    let template = match configured_template(&descriptor.routes, verb) {
        Some(template) => template.to_string(),
        None => generate_route(
            &descriptor.name,
            verb,
            config.delimiter,
            &config.prefix,
            verb == Verb::Index,
            descriptor.is_singleton(),
        ),
    };

    interpolate_route(&template, record, query)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{FieldDef, FieldKind, Schema, VerbList};
    use serde_json::json;

    fn person() -> ModelDescriptor {
        ModelDescriptor::new(
            "Person",
            Schema::new(vec![FieldDef::new("name", FieldKind::String)]),
        )
        .with_routes(
            RouteConfig::default()
                .except(Verb::Delete)
                .template(Verb::Post, "/correct-route/:id"),
        )
    }

    fn record(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn permissions_only_and_except() {
        let routes = RouteConfig::default().only(vec![Verb::Get, Verb::Post]);
        assert!(route_permitted(&routes, Verb::Get));
        assert!(route_permitted(&routes, Verb::Index));
        assert!(!route_permitted(&routes, Verb::Put));

        let routes = RouteConfig::default().except(Verb::Delete);
        assert!(!route_permitted(&routes, Verb::Delete));
        assert!(route_permitted(&routes, Verb::Put));

        let routes = RouteConfig::default().only(Verb::Put);
        assert!(!route_permitted(&routes, Verb::Get));
        assert!(route_permitted(&routes, Verb::Put));
    }

    #[test]
    fn index_shares_get_permissions() {
        let routes = RouteConfig::default().except(Verb::Get);
        assert!(!route_permitted(&routes, Verb::Index));

        let routes = RouteConfig::default().except(Verb::Index);
        assert!(!route_permitted(&routes, Verb::Index));
        assert!(route_permitted(&routes, Verb::Get));
    }

    #[test]
    fn no_restrictions_permit_everything() {
        let routes = RouteConfig::default();
        for verb in [Verb::Get, Verb::Post, Verb::Put, Verb::Delete, Verb::Index] {
            assert!(route_permitted(&routes, verb));
        }
        let routes = RouteConfig {
            only: Some(VerbList::Many(vec![])),
            ..RouteConfig::default()
        };
        assert!(!route_permitted(&routes, Verb::Get));
    }

    #[test]
    fn generated_routes() {
        assert_eq!(
            generate_route("BankAccount", Verb::Get, Delimiter::Underscore, "/api", true, false),
            "/api/bank_accounts"
        );
        assert_eq!(
            generate_route("BankAccount", Verb::Get, Delimiter::Dasherize, "/api", false, false),
            "/api/bank-accounts/:id"
        );
        assert_eq!(
            generate_route("BankAccount", Verb::Post, Delimiter::Dasherize, "", false, false),
            "/bank-accounts"
        );
        assert_eq!(
            generate_route("CurrentUser", Verb::Put, Delimiter::Underscore, "", false, true),
            "/current_user/:id"
        );
    }

    #[test]
    fn interpolate_from_record() {
        let route = interpolate_route(
            "/leases/:leaseId/users/:userId",
            &record(json!({"leaseId": 23, "userId": 44})),
            None,
        )
        .unwrap();
        assert_eq!(route, "/leases/23/users/44");
    }

    #[test]
    fn interpolate_keeps_missing_placeholders() {
        let route = interpolate_route(
            "/leases/:leaseId/users/:userId",
            &record(json!({"leaseId": null})),
            None,
        )
        .unwrap();
        assert_eq!(route, "/leases/:leaseId/users/:userId");
    }

    #[test]
    fn interpolate_prefers_query_and_appends_rest() {
        let route = interpolate_route(
            "/people/:id",
            &record(json!({"id": 1})),
            Some(&json!({"id": 7, "page": 2, "q": "a b"})),
        )
        .unwrap();
        assert_eq!(route, "/people/7?page=2&q=a%20b");

        let route = interpolate_route(
            "/people/:id",
            &record(json!({"id": 1})),
            Some(&json!("?id=&sort=name")),
        )
        .unwrap();
        assert_eq!(route, "/people/1?id=&sort=name");
    }

    #[test]
    fn interpolate_stops_tokens_at_question_mark() {
        let route = interpolate_route(
            "/people/:id?full=1",
            &record(json!({"id": 5})),
            Some(&json!({"page": 3})),
        )
        .unwrap();
        assert_eq!(route, "/people/5?full=1&page=3");
    }

    #[test]
    fn interpolate_rejects_bad_query() {
        let result = interpolate_route("/people", &Map::new(), Some(&json!([1, 2])));
        assert!(matches!(result, Err(Error::RouteNotFound(_))));
    }

    #[test]
    fn resolve_with_overrides() {
        let config = ApiConfig::default();
        let descriptor = person();
        let rec = record(json!({"id": 123, "name": "Kyle"}));

        let err = resolve_route(&config, &descriptor, Verb::Delete, &rec, None).unwrap_err();
        assert_eq!(
            err,
            Error::PermissionDenied {
                model: "Person".into(),
                verb: Verb::Delete
            }
        );

        assert_eq!(
            resolve_route(&config, &descriptor, Verb::Put, &rec, None).unwrap(),
            "/people/123"
        );
        assert_eq!(
            resolve_route(&config, &descriptor, Verb::Post, &rec, None).unwrap(),
            "/correct-route/123"
        );
    }

    #[test]
    fn index_template_fallbacks() {
        let config = ApiConfig {
            prefix: "/api".into(),
            ..ApiConfig::default()
        };
        let plain = ModelDescriptor::new(
            "BankAccount",
            Schema::new(vec![FieldDef::new("balance", FieldKind::Number)]),
        );
        assert_eq!(
            resolve_route(&config, &plain, Verb::Index, &Map::new(), None).unwrap(),
            "/api/bank-accounts"
        );

        let with_get = plain
            .clone()
            .with_routes(RouteConfig::default().template(Verb::Get, "/accounts"));
        assert_eq!(
            resolve_route(&config, &with_get, Verb::Index, &Map::new(), None).unwrap(),
            "/accounts"
        );

        let with_index = plain.with_routes(
            RouteConfig::default()
                .template(Verb::Get, "/accounts/:id")
                .template(Verb::Index, "/accounts/all"),
        );
        assert_eq!(
            resolve_route(&config, &with_index, Verb::Index, &Map::new(), None).unwrap(),
            "/accounts/all"
        );
    }
}
