//! Async model operations.
//!
//! [`Flute`] ties the engine to a [`Transport`] and a [`Dispatch`]
//! collaborator. Every operation resolves its route, dispatches the
//! request-start action, awaits the response and dispatches the outcome:
//! `{VERB}_SUCCESS` on 2xx, `REQUEST_INFO` otherwise.
//!
//! Requests are never cancelled. A local write made while a save is in
//! flight does not abort it; the last success to arrive wins in the store.

use crate::{
    error::{ClientError, Result},
    store::Dispatch,
    transport::{HttpRequest, HttpResponse, Transport},
};
use flute_engine::{
    is_identity, prune_record, request_body, resolve_route, Action, ActionKind, ApiConfig,
    ApiUpdate, Errors, ModelDescriptor, ModelInstance, Record, Registry, RequestInfo, Verb,
};
use serde_json::{json, Map, Value};
use std::sync::{Arc, OnceLock};

/// Suffix of nested-attribute keys, blanked before a saved record is merged.
const NESTED_ATTRIBUTES_SUFFIX: &str = "_attributes";

/// REST client for registered models.
pub struct Flute<T> {
    registry: Arc<Registry>,
    config: ApiConfig,
    transport: T,
    dispatcher: OnceLock<Arc<dyn Dispatch>>,
}

impl<T: Transport> Flute<T> {
    /// A client with the default API configuration.
    pub fn new(registry: Arc<Registry>, transport: T) -> Self {
        Self {
            registry,
            config: ApiConfig::default(),
            transport,
            dispatcher: OnceLock::new(),
        }
    }

    /// Builder-style method to replace the API configuration.
    pub fn with_config(mut self, config: ApiConfig) -> Self {
        self.config = config;
        self
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Merge settings into the API configuration.
    pub fn set_api(&mut self, update: ApiUpdate) {
        self.config.apply(update);
    }

    /// Attach the dispatcher. Only the first attachment takes effect;
    /// returns whether this one did.
    pub fn attach(&self, dispatcher: Arc<dyn Dispatch>) -> bool {
        let attached = self.dispatcher.set(dispatcher).is_ok();
        if !attached {
            tracing::debug!("dispatcher already attached, ignoring");
        }
        attached
    }

    fn dispatcher(&self) -> Result<Arc<dyn Dispatch>> {
        self.dispatcher
            .get()
            .cloned()
            .ok_or(ClientError::NotConfigured)
    }

    /// Construct an instance of a registered model.
    pub fn build(&self, model: &str, attributes: &Value) -> Result<ModelInstance> {
        let descriptor = Arc::clone(self.registry.get(model)?);
        Ok(ModelInstance::construct(descriptor, attributes)?)
    }

    /// Write one field and dispatch `SET` with the pruned record.
    pub fn set_field(&self, instance: &mut ModelInstance, field: &str, value: Value) -> Result<()> {
        let dispatcher = self.dispatcher()?;
        instance.set(field, value)?;

        let record = pruned_or_null(instance.record());
        dispatcher.dispatch(Action::new(ActionKind::Set, false, instance.descriptor()).with_record(record));
        Ok(())
    }

    /// Persist an instance: `PUT` when it has an id, `POST` otherwise.
    ///
    /// On success the instance takes over the saved record and its version
    /// resets to 0. On rejection it records `_request` and `errors`, and the
    /// error carries a copy of it.
    pub async fn save(&self, instance: &mut ModelInstance) -> Result<()> {
        let dispatcher = self.dispatcher()?;
        let descriptor = instance.descriptor_arc();
        let verb = if instance.has_id() { Verb::Put } else { Verb::Post };

        let record = prune_record(instance.record());
        let route = resolve_route(&self.config, &descriptor, verb, &record, None)?;
        let body = request_body(
            instance.pristine_record(),
            instance.record(),
            self.config.diff_mode && verb == Verb::Put,
        );
        let sent_version = instance.version();
        let sent = Value::Object(record.clone());

        dispatcher.dispatch(Action::new(verb.into(), false, &descriptor).with_record(sent.clone()));
        let response = match self.send(verb, route, Some(Value::Object(body))).await {
            Ok(response) => response,
            Err(err) => {
                self.dispatch_network_failure(&*dispatcher, &descriptor, sent, sent_version, &err);
                return Err(err);
            }
        };

        if response.is_success() {
            let payload = match response.parse() {
                Ok(payload) => payload,
                Err(e) => {
                    let (request, errors) = undecodable(&descriptor, &response, sent_version, &e);
                    self.dispatch_failure(&*dispatcher, &descriptor, sent, request.clone(), errors.clone());
                    instance.record_failure(request, errors);
                    return Err(e.into());
                }
            };
            let saved = Value::Object(merge_saved(record, payload));

            dispatcher.dispatch(Action::new(verb.into(), true, &descriptor).with_record(saved.clone()));
            let saved = ModelInstance::construct(Arc::clone(&descriptor), &saved)?;
            instance.absorb_saved(&saved);
            return Ok(());
        }

        let (request, errors) = failure_info(&response, sent_version);
        tracing::warn!(
            model = %descriptor.name,
            status = response.status,
            "save rejected"
        );
        dispatcher.dispatch(
            Action::new(ActionKind::RequestInfo, false, &descriptor)
                .with_record(sent)
                .with_request_info(request.clone(), errors.clone()),
        );
        instance.record_failure(request, errors);
        Err(ClientError::Rejected(Box::new(instance.clone())))
    }

    /// Construct an instance and save it.
    pub async fn create(&self, model: &str, attributes: &Value) -> Result<ModelInstance> {
        let mut instance = self.build(model, attributes)?;
        self.save(&mut instance).await?;
        Ok(instance)
    }

    /// Write attributes in order through [`Flute::set_field`], then save.
    /// The first failing write stops before anything is sent.
    pub async fn update_attributes(
        &self,
        instance: &mut ModelInstance,
        attributes: &Map<String, Value>,
    ) -> Result<()> {
        for (field, value) in attributes {
            self.set_field(instance, field, value.clone())?;
        }
        self.save(instance).await
    }

    /// Write one attribute through [`Flute::set_field`], then save.
    pub async fn update_attribute(
        &self,
        instance: &mut ModelInstance,
        field: &str,
        value: Value,
    ) -> Result<()> {
        self.set_field(instance, field, value)?;
        self.save(instance).await
    }

    /// Fetch one record by id.
    pub async fn find(&self, model: &str, id: Value, query: Option<&Value>) -> Result<ModelInstance> {
        let descriptor = Arc::clone(self.registry.get(model)?);
        let route_record = keyed("id", &id);
        let route = resolve_route(&self.config, &descriptor, Verb::Get, &route_record, query)?;

        let payload = self
            .fetch(&descriptor, route, Some(Value::Object(keyed(descriptor.key(), &id))))
            .await?;
        let raw = match payload {
            Value::Array(mut items) if !items.is_empty() => items.swap_remove(0),
            other => other,
        };
        Ok(ModelInstance::construct(descriptor, &raw)?)
    }

    /// Fetch the model's collection.
    pub async fn all(&self, model: &str, query: Option<&Value>) -> Result<Vec<ModelInstance>> {
        let descriptor = Arc::clone(self.registry.get(model)?);
        let route = resolve_route(&self.config, &descriptor, Verb::Index, &Map::new(), query)?;

        let payload = self.fetch(&descriptor, route, None).await?;
        let items = match payload {
            Value::Array(items) => items,
            Value::Null => Vec::new(),
            single => vec![single],
        };
        items
            .iter()
            .map(|raw| ModelInstance::construct(Arc::clone(&descriptor), raw).map_err(ClientError::from))
            .collect()
    }

    /// Delete a saved instance.
    pub async fn destroy(&self, instance: &ModelInstance) -> Result<()> {
        if !instance.has_id() {
            return Err(ClientError::UnsavedRecord(instance.name().to_string()));
        }
        let descriptor = instance.descriptor_arc();
        let record = prune_record(instance.record());
        let key = instance.key_value().clone();
        self.remove(&descriptor, record, key).await
    }

    /// Delete a record by id without an instance.
    pub async fn destroy_record(&self, model: &str, id: Value) -> Result<()> {
        let descriptor = Arc::clone(self.registry.get(model)?);
        if !is_identity(&id) {
            return Err(ClientError::UnsavedRecord(descriptor.name.clone()));
        }
        self.remove(&descriptor, keyed("id", &id), id).await
    }

    async fn fetch(
        &self,
        descriptor: &Arc<ModelDescriptor>,
        route: String,
        record: Option<Value>,
    ) -> Result<Value> {
        let dispatcher = self.dispatcher()?;
        let record = record.unwrap_or(Value::Null);

        dispatcher.dispatch(Action::new(ActionKind::Get, false, descriptor).with_record(record.clone()));
        let response = match self.send(Verb::Get, route, None).await {
            Ok(response) => response,
            Err(err) => {
                self.dispatch_network_failure(&*dispatcher, descriptor, record, 0, &err);
                return Err(err);
            }
        };

        if !response.is_success() {
            return Err(self.reject(&*dispatcher, descriptor, record, &response));
        }

        let payload = match response.parse() {
            Ok(payload) => payload,
            Err(e) => {
                let (request, errors) = undecodable(descriptor, &response, 0, &e);
                self.dispatch_failure(&*dispatcher, descriptor, record, request, errors);
                return Err(e.into());
            }
        };
        dispatcher.dispatch(Action::new(ActionKind::Get, true, descriptor).with_record(payload.clone()));
        Ok(payload)
    }

    async fn remove(&self, descriptor: &Arc<ModelDescriptor>, route_record: Record, key: Value) -> Result<()> {
        let dispatcher = self.dispatcher()?;
        let route = resolve_route(&self.config, descriptor, Verb::Delete, &route_record, None)?;
        let record = Value::Object(keyed(descriptor.key(), &key));

        dispatcher.dispatch(Action::new(ActionKind::Delete, false, descriptor).with_record(record.clone()));
        let response = match self.send(Verb::Delete, route, None).await {
            Ok(response) => response,
            Err(err) => {
                self.dispatch_network_failure(&*dispatcher, descriptor, record, 0, &err);
                return Err(err);
            }
        };

        if !response.is_success() {
            return Err(self.reject(&*dispatcher, descriptor, record, &response));
        }

        dispatcher.dispatch(Action::new(ActionKind::Delete, true, descriptor).with_record(record));
        Ok(())
    }

    async fn send(&self, verb: Verb, url: String, body: Option<Value>) -> Result<HttpResponse> {
        let request = HttpRequest {
            method: verb.into(),
            url,
            headers: self.config.headers.clone(),
            body,
            credentials: self.config.credentials.clone(),
        };
        tracing::debug!(method = %request.method, url = %request.url, "request");

        Ok(self.transport.send(request).await?)
    }

    /// Dispatch `REQUEST_INFO` for a non-2xx fetch or delete.
    fn reject(
        &self,
        dispatcher: &dyn Dispatch,
        descriptor: &ModelDescriptor,
        record: Value,
        response: &HttpResponse,
    ) -> ClientError {
        let (request, errors) = failure_info(response, 0);
        tracing::warn!(
            model = %descriptor.name,
            status = response.status,
            "request rejected"
        );
        dispatcher.dispatch(
            Action::new(ActionKind::RequestInfo, false, descriptor)
                .with_record(record)
                .with_request_info(request, errors),
        );
        ClientError::Response {
            status: response.status,
            body: response.parse().unwrap_or_else(|_| Value::String(response.body.clone())),
        }
    }

    fn dispatch_network_failure(
        &self,
        dispatcher: &dyn Dispatch,
        descriptor: &ModelDescriptor,
        record: Value,
        version: u64,
        err: &ClientError,
    ) {
        tracing::warn!(model = %descriptor.name, error = %err, "request failed");
        let request = RequestInfo {
            version,
            status: None,
            body: Some(Value::String(err.to_string())),
        };
        self.dispatch_failure(dispatcher, descriptor, record, request, Errors::default());
    }

    /// Settle a request with `REQUEST_INFO`.
    fn dispatch_failure(
        &self,
        dispatcher: &dyn Dispatch,
        descriptor: &ModelDescriptor,
        record: Value,
        request: RequestInfo,
        errors: Errors,
    ) {
        dispatcher.dispatch(
            Action::new(ActionKind::RequestInfo, false, descriptor)
                .with_record(record)
                .with_request_info(request, errors),
        );
    }
}

/// `{key: value}` as a record.
fn keyed(key: &str, value: &Value) -> Record {
    let mut record = Record::new();
    record.insert(key.to_string(), value.clone());
    record
}

fn pruned_or_null(record: &Record) -> Value {
    let pruned = prune_record(record);
    if pruned.is_empty() {
        Value::Null
    } else {
        Value::Object(pruned)
    }
}

/// The sent record with the server's answer laid over it.
fn merge_saved(mut sent: Record, payload: Value) -> Record {
    for (field, value) in sent.iter_mut() {
        if field.ends_with(NESTED_ATTRIBUTES_SUFFIX) {
            *value = json!({});
        }
    }
    if let Value::Object(saved) = payload {
        sent.extend(saved);
    }
    sent
}

/// Key under which an unreadable response body is reported in `errors`.
const RESPONSE_ERROR_KEY: &str = "response";

/// `_request` and `errors` for a 2xx response whose body is not JSON.
fn undecodable(
    descriptor: &ModelDescriptor,
    response: &HttpResponse,
    version: u64,
    err: &serde_json::Error,
) -> (RequestInfo, Errors) {
    tracing::warn!(
        model = %descriptor.name,
        status = response.status,
        error = %err,
        "response body is not JSON"
    );
    let mut errors = Map::new();
    errors.insert(RESPONSE_ERROR_KEY.to_string(), Value::String(err.to_string()));
    (
        RequestInfo::new(version, response.status, Value::String(response.body.clone())),
        Errors(errors),
    )
}

/// `_request` and `errors` for a non-2xx response.
///
/// The response JSON's `body` (default `""`) and `errors` (default `{}`)
/// are used; a body that is not JSON counts as neither.
fn failure_info(response: &HttpResponse, version: u64) -> (RequestInfo, Errors) {
    let payload = response.parse().unwrap_or(Value::Null);
    let body = payload.get("body").cloned().unwrap_or_else(|| json!(""));
    let errors = Errors::from_value(payload.get("errors"));
    (RequestInfo::new(version, response.status, body), errors)
}
