//! HTTP transport.
//!
//! Client operations talk to the network through the object-safe
//! [`Transport`] trait. [`ReqwestTransport`] is the production
//! implementation; tests plug in their own.

use flute_engine::Verb;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// HTTP method of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        }
    }
}

impl From<Verb> for Method {
    fn from(verb: Verb) -> Self {
        match verb {
            Verb::Get | Verb::Index => Method::Get,
            Verb::Post => Method::Post,
            Verb::Put => Method::Put,
            Verb::Delete => Method::Delete,
        }
    }
}

impl From<Method> for reqwest::Method {
    fn from(method: Method) -> Self {
        match method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Delete => reqwest::Method::DELETE,
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An outgoing request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HttpRequest {
    pub method: Method,
    /// Resolved route, relative or absolute
    pub url: String,
    pub headers: BTreeMap<String, String>,
    /// JSON body, `None` for `GET` and `DELETE`
    pub body: Option<Value>,
    /// Credentials mode of the request
    pub credentials: String,
}

/// A response as received: status plus raw body text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// A response with a JSON body.
    pub fn json(status: u16, body: &Value) -> Self {
        Self::new(status, body.to_string())
    }

    /// 200 through 299.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Parse the body as JSON. An empty body is `null`.
    pub fn parse(&self) -> Result<Value, serde_json::Error> {
        if self.body.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&self.body)
    }
}

/// Errors raised before a response was received.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("{method} {url} failed: {message}")]
    Request {
        method: Method,
        url: String,
        message: String,
    },

    #[error("Could not read response from {url}: {message}")]
    Body { url: String, message: String },
}

/// Sends requests. Implementations must be shareable across tasks.
pub trait Transport: Send + Sync {
    fn send(&self, request: HttpRequest) -> BoxFuture<'_, Result<HttpResponse, TransportError>>;
}

/// [`Transport`] backed by a `reqwest` client.
///
/// Relative routes are joined to the base URL when one is set. The
/// credentials mode has no meaning outside a browser and is not applied.
#[derive(Debug, Clone, Default)]
pub struct ReqwestTransport {
    client: reqwest::Client,
    base_url: Option<String>,
}

impl ReqwestTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a preconfigured `reqwest` client.
    pub fn with_client(client: reqwest::Client) -> Self {
        Self {
            client,
            base_url: None,
        }
    }

    /// Builder-style method to set the base URL for relative routes.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// The absolute URL for a route.
    pub fn url_for(&self, route: &str) -> String {
        match &self.base_url {
            Some(base) if route.starts_with('/') => {
                format!("{}{}", base.trim_end_matches('/'), route)
            }
            _ => route.to_string(),
        }
    }
}

impl Transport for ReqwestTransport {
    fn send(&self, request: HttpRequest) -> BoxFuture<'_, Result<HttpResponse, TransportError>> {
        let url = self.url_for(&request.url);
        let method = request.method;

        let mut builder = self.client.request(method.into(), &url);
        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        Box::pin(async move {
            tracing::debug!(method = %method, url = %url, "sending request");

            let response = builder.send().await.map_err(|e| TransportError::Request {
                method,
                url: url.clone(),
                message: e.to_string(),
            })?;
            let status = response.status().as_u16();
            let body = response.text().await.map_err(|e| TransportError::Body {
                url: url.clone(),
                message: e.to_string(),
            })?;

            Ok(HttpResponse { status, body })
        })
    }
}
