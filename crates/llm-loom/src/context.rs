//! The conversation context: schema-driven request synthesis and
//! response extraction.
//!
//! A [`ChatContext`] binds one conversation to one
//! [`ProviderSchema`](crate::schema::ProviderSchema). It accumulates
//! messages, parameter overrides, an optional system message, and the
//! API key; synthesizes request bodies and headers in the shape the
//! schema declares; and walks responses with the schema's extraction
//! paths. Provider differences never appear in code — they are data.
//!
//! A context is exclusively owned: use one per conversation per thread,
//! and share only the schema (`Arc`) underneath. The
//! [`ContextFactory`](crate::factory::ContextFactory) hands out
//! per-thread contexts for request-handler style workloads.
//!
//! # Example
//!
//! ```rust,no_run
//! use llm_loom::{ChatContext, ContextConfig, SchemaRegistry};
//!
//! # fn main() -> Result<(), llm_loom::LoomError> {
//! let registry = SchemaRegistry::new("./schemas");
//! let schema = registry.load("claude")?;
//!
//! let mut context = ChatContext::new(schema, ContextConfig::default())?;
//! context
//!     .set_system_message("You are terse.")?
//!     .set_parameter("temperature", 0.3)?
//!     .add_user_message("Hi")?;
//!
//! let request = context.build_request(false)?;
//! assert_eq!(request["system"], "You are terse.");
//! # Ok(())
//! # }
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::{Value, json};
use tracing::debug;

use crate::chat::{ContentPart, Message, resolve_media_data};
use crate::config::ContextConfig;
use crate::error::LoomError;
use crate::schema::ProviderSchema;

/// Mutable per-conversation state bound to one provider schema.
pub struct ChatContext {
    schema: Arc<ProviderSchema>,
    config: ContextConfig,
    model: Option<String>,
    system_message: Option<String>,
    parameters: HashMap<String, Value>,
    default_parameters: HashMap<String, Value>,
    api_key: Option<String>,
    messages: Vec<Message>,
}

impl std::fmt::Debug for ChatContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatContext")
            .field("provider", &self.schema.name())
            .field("model", &self.model)
            .field("system_message", &self.system_message)
            .field("parameters", &self.parameters)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("messages", &self.messages.len())
            .finish()
    }
}

impl ChatContext {
    /// Creates a context bound to `schema`, with the template's model
    /// as the initial selection and `config` defaults overlaid onto the
    /// parameter map.
    ///
    /// # Errors
    ///
    /// [`LoomError::Validation`] when a config default violates the
    /// schema's parameter constraints (and validation is enabled).
    pub fn new(schema: Arc<ProviderSchema>, config: ContextConfig) -> Result<Self, LoomError> {
        let model = schema
            .models()
            .default
            .clone()
            .or_else(|| {
                schema
                    .request_template()
                    .get("model")
                    .and_then(Value::as_str)
                    .map(str::to_string)
            });

        let mut context = Self {
            schema,
            config,
            model,
            system_message: None,
            parameters: HashMap::new(),
            default_parameters: HashMap::new(),
            api_key: None,
            messages: Vec::new(),
        };

        if let Some(max_tokens) = context.config.default_max_tokens {
            context.set_parameter("max_tokens", json!(max_tokens))?;
        }
        if let Some(temperature) = context.config.default_temperature {
            context.set_parameter("temperature", json!(temperature))?;
        }
        let custom = context.config.custom_parameters.clone();
        for (key, value) in custom {
            context.set_parameter(key, value)?;
        }
        context.default_parameters = context.parameters.clone();

        debug!(provider = context.schema.name(), "created chat context");
        Ok(context)
    }

    // ── Introspection ───────────────────────────────────────────────

    /// The schema this context is bound to.
    pub fn schema(&self) -> &Arc<ProviderSchema> {
        &self.schema
    }

    /// The construction-time configuration.
    pub fn config(&self) -> &ContextConfig {
        &self.config
    }

    /// The provider name.
    pub fn provider_name(&self) -> &str {
        self.schema.name()
    }

    /// The endpoint URL.
    pub fn endpoint(&self) -> &str {
        self.schema.endpoint()
    }

    /// The currently selected model, if any.
    pub fn model(&self) -> Option<&str> {
        self.model.as_deref()
    }

    /// The system message, if set.
    pub fn system_message(&self) -> Option<&str> {
        self.system_message.as_deref()
    }

    /// The ordered conversation.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// The current parameter overrides.
    pub fn parameters(&self) -> &HashMap<String, Value> {
        &self.parameters
    }

    /// Looks up one parameter override.
    pub fn parameter(&self, key: &str) -> Option<&Value> {
        self.parameters.get(key)
    }

    /// Returns `true` if `key` has an override.
    pub fn has_parameter(&self, key: &str) -> bool {
        self.parameters.contains_key(key)
    }

    /// Deserializes a parameter override into `T`.
    ///
    /// # Errors
    ///
    /// [`LoomError::Validation`] when the parameter is unset or cannot
    /// convert to the requested type.
    pub fn parameter_as<T: serde::de::DeserializeOwned>(&self, key: &str) -> Result<T, LoomError> {
        let value = self
            .parameters
            .get(key)
            .ok_or_else(|| LoomError::Validation(format!("parameter '{key}' is not set")))?;
        serde_json::from_value(value.clone()).map_err(|e| {
            LoomError::Validation(format!(
                "parameter '{key}' cannot be converted to the requested type: {e}"
            ))
        })
    }

    /// Models the schema declares as usable (available + deprecated).
    pub fn supported_models(&self) -> Vec<String> {
        let models = self.schema.models();
        models
            .available
            .iter()
            .chain(models.deprecated.iter())
            .cloned()
            .collect()
    }

    /// Whether the schema accepts image content.
    pub fn supports_multimodal(&self) -> bool {
        self.schema.multimodal().supported
    }

    /// Whether the schema supports SSE streaming.
    pub fn supports_streaming(&self) -> bool {
        self.schema.features().streaming
    }

    /// Whether the schema accepts a system message.
    pub fn supports_system_messages(&self) -> bool {
        self.schema.system_message().supported
    }

    /// Returns `true` if an API key has been set.
    pub fn has_api_key(&self) -> bool {
        self.api_key.as_ref().is_some_and(|k| !k.is_empty())
    }

    // ── Mutation ────────────────────────────────────────────────────

    /// Selects the model for subsequent requests.
    ///
    /// # Errors
    ///
    /// [`LoomError::Validation`] when validation is enabled, the schema
    /// declares a model list, and `name` is not in it.
    pub fn set_model(&mut self, name: impl Into<String>) -> Result<&mut Self, LoomError> {
        let name = name.into();
        if self.config.enable_validation
            && !self.schema.models().is_empty()
            && !self.schema.models().contains(&name)
        {
            return Err(LoomError::Validation(format!(
                "model '{name}' is not supported by provider '{}'",
                self.schema.name()
            )));
        }
        self.model = Some(name);
        Ok(self)
    }

    /// Sets the system message. Emitted per the schema: either as a
    /// top-level request field or prepended as a role-`system` message.
    ///
    /// # Errors
    ///
    /// [`LoomError::Validation`] when the schema does not support
    /// system messages.
    pub fn set_system_message(&mut self, text: impl Into<String>) -> Result<&mut Self, LoomError> {
        if !self.schema.system_message().supported {
            return Err(LoomError::Validation(format!(
                "provider '{}' does not support system messages",
                self.schema.name()
            )));
        }
        self.system_message = Some(text.into());
        Ok(self)
    }

    /// Sets one request parameter.
    ///
    /// # Errors
    ///
    /// [`LoomError::Validation`] when validation is enabled and the key
    /// is unknown, the value is null, or it violates the declared
    /// constraint. The context is unchanged on error.
    pub fn set_parameter(
        &mut self,
        key: impl Into<String>,
        value: impl Into<Value>,
    ) -> Result<&mut Self, LoomError> {
        let key = key.into();
        let value = value.into();
        if self.config.enable_validation {
            let constraint = self.schema.parameters().get(&key).ok_or_else(|| {
                LoomError::Validation(format!(
                    "unknown parameter '{key}' for provider '{}'",
                    self.schema.name()
                ))
            })?;
            constraint.check(&key, &value)?;
        }
        self.parameters.insert(key, value);
        Ok(self)
    }

    /// Sets several parameters. All values are validated before any is
    /// applied, so a failure leaves the context unchanged.
    pub fn set_parameters(
        &mut self,
        params: impl IntoIterator<Item = (String, Value)>,
    ) -> Result<&mut Self, LoomError> {
        let params: Vec<(String, Value)> = params.into_iter().collect();
        if self.config.enable_validation {
            for (key, value) in &params {
                let constraint = self.schema.parameters().get(key).ok_or_else(|| {
                    LoomError::Validation(format!(
                        "unknown parameter '{key}' for provider '{}'",
                        self.schema.name()
                    ))
                })?;
                constraint.check(key, value)?;
            }
        }
        self.parameters.extend(params);
        Ok(self)
    }

    /// Removes all parameter overrides, including config defaults.
    pub fn clear_parameters(&mut self) -> &mut Self {
        self.parameters.clear();
        self
    }

    /// Removes all conversation messages; parameters remain.
    pub fn clear_messages(&mut self) -> &mut Self {
        self.messages.clear();
        self
    }

    /// Restores the context to its post-construction state: no
    /// messages, no system message, parameters back to the schema and
    /// config defaults, default model.
    pub fn reset(&mut self) -> &mut Self {
        self.messages.clear();
        self.system_message = None;
        self.parameters = self.default_parameters.clone();
        self.model = self
            .schema
            .models()
            .default
            .clone()
            .or_else(|| {
                self.schema
                    .request_template()
                    .get("model")
                    .and_then(Value::as_str)
                    .map(str::to_string)
            });
        self
    }

    /// Sets the API key substituted into headers at send time.
    pub fn set_api_key(&mut self, key: impl Into<String>) -> &mut Self {
        self.api_key = Some(key.into());
        self
    }

    // ── Message API ─────────────────────────────────────────────────

    /// Appends a `user` message.
    pub fn add_user_message(&mut self, text: impl Into<String>) -> Result<&mut Self, LoomError> {
        self.add_message("user", text, None, None)
    }

    /// Appends a `user` message with an inline image.
    ///
    /// `media_data` may be base64 already, or a filesystem path whose
    /// contents are read and encoded.
    pub fn add_user_message_with_media(
        &mut self,
        text: impl Into<String>,
        media_type: &str,
        media_data: &str,
    ) -> Result<&mut Self, LoomError> {
        self.add_message("user", text, Some(media_type), Some(media_data))
    }

    /// Appends an `assistant` message (text only).
    pub fn add_assistant_message(
        &mut self,
        text: impl Into<String>,
    ) -> Result<&mut Self, LoomError> {
        self.add_message("assistant", text, None, None)
    }

    /// Appends a message with an explicit role and optional media.
    ///
    /// # Errors
    ///
    /// [`LoomError::Validation`] when the role is not in the schema's
    /// role set, when media is supplied but the schema forbids
    /// multimodal content, when the media type is not supported, or
    /// when consecutive same-role messages violate an
    /// alternating-roles rule.
    pub fn add_message(
        &mut self,
        role: impl Into<String>,
        text: impl Into<String>,
        media_type: Option<&str>,
        media_data: Option<&str>,
    ) -> Result<&mut Self, LoomError> {
        let role = role.into();
        let text = text.into();

        // Role membership is an invariant of the context, not a
        // validation-gated check: messages only ever carry roles the
        // schema declares.
        if !self.schema.message_roles().contains(&role) {
            return Err(LoomError::Validation(format!(
                "role '{role}' is not declared by provider '{}'",
                self.schema.name()
            )));
        }
        if self.config.enable_validation
            && self.schema.validation().alternating_roles
            && self.messages.last().is_some_and(|m| m.role == role)
        {
            return Err(LoomError::Validation(format!(
                "consecutive '{role}' messages violate the provider's alternating-roles rule"
            )));
        }

        let mut message = Message {
            role,
            parts: vec![ContentPart::Text { text }],
        };

        if let Some(media_type) = media_type {
            // The multimodal invariant holds regardless of the
            // validation flag: a non-multimodal schema never carries
            // image parts.
            let multimodal = self.schema.multimodal();
            if !multimodal.supported {
                return Err(LoomError::Validation(format!(
                    "provider '{}' does not support multimodal content",
                    self.schema.name()
                )));
            }
            if !multimodal.supported_types.is_empty()
                && !multimodal.supported_types.iter().any(|t| t == media_type)
            {
                return Err(LoomError::Validation(format!(
                    "media type '{media_type}' is not supported by provider '{}'",
                    self.schema.name()
                )));
            }
            let data = media_data.ok_or_else(|| {
                LoomError::Validation("media_type given without media_data".into())
            })?;
            message.push_image(media_type, resolve_media_data(data)?);
        }

        self.messages.push(message);
        Ok(self)
    }

    /// Appends an already-built [`Message`], subject to the same checks
    /// as [`add_message`](Self::add_message).
    pub fn push_message(&mut self, message: Message) -> Result<&mut Self, LoomError> {
        if !self.schema.message_roles().contains(&message.role) {
            return Err(LoomError::Validation(format!(
                "role '{}' is not declared by provider '{}'",
                message.role,
                self.schema.name()
            )));
        }
        if message.has_image() && !self.schema.multimodal().supported {
            return Err(LoomError::Validation(format!(
                "provider '{}' does not support multimodal content",
                self.schema.name()
            )));
        }
        if self.config.enable_validation
            && self.schema.validation().alternating_roles
            && self.messages.last().is_some_and(|m| m.role == message.role)
        {
            return Err(LoomError::Validation(format!(
                "consecutive '{}' messages violate the provider's alternating-roles rule",
                message.role
            )));
        }
        self.messages.push(message);
        Ok(self)
    }

    // ── Request synthesis ───────────────────────────────────────────

    /// Synthesizes the request body: template copy, model, parameters,
    /// rendered messages, system placement, streaming flag, null
    /// stripping, and (when validation is enabled) a final shape check.
    ///
    /// # Errors
    ///
    /// [`LoomError::Validation`] for shape violations;
    /// [`LoomError::Schema`] when the template is structurally
    /// unusable.
    pub fn build_request(&self, streaming: bool) -> Result<Value, LoomError> {
        if streaming && !self.schema.features().streaming {
            return Err(LoomError::Validation(format!(
                "provider '{}' does not support streaming",
                self.schema.name()
            )));
        }

        let mut request = self.synthesize(streaming)?;
        strip_null_fields(&mut request);

        if self.config.enable_validation {
            let violations = self.request_violations(&request);
            if let Some(first) = violations.into_iter().next() {
                return Err(LoomError::Validation(first));
            }
        }
        Ok(request)
    }

    fn synthesize(&self, streaming: bool) -> Result<Value, LoomError> {
        let mut request = self.schema.request_template().clone();
        let Some(map) = request.as_object_mut() else {
            return Err(LoomError::Schema("request template is not an object".into()));
        };

        if let Some(model) = &self.model {
            map.insert("model".into(), json!(model));
        }

        for (key, value) in &self.parameters {
            let field = self
                .schema
                .parameters()
                .get(key)
                .and_then(|c| c.field.clone())
                .unwrap_or_else(|| key.clone());
            map.insert(field, value.clone());
        }

        let mut rendered: Vec<Value> = self
            .messages
            .iter()
            .map(|m| self.render_message(m))
            .collect::<Result<_, _>>()?;

        if let Some(system) = &self.system_message {
            let spec = self.schema.system_message();
            if let Some(field) = &spec.field {
                map.insert(field.clone(), json!(system));
            } else {
                let system_msg = Message::with_role(spec.role.clone(), system.clone());
                rendered.insert(0, self.render_message(&system_msg)?);
            }
        }

        let message_field = self.schema.message_format().message_field.clone();
        map.insert(message_field, Value::Array(rendered));

        if self.schema.features().streaming {
            map.insert("stream".into(), json!(streaming));
        } else {
            map.remove("stream");
        }

        Ok(request)
    }

    /// Renders one message through the schema's message format.
    fn render_message(&self, message: &Message) -> Result<Value, LoomError> {
        let format = self.schema.message_format();
        let mut rendered = format.structure.clone();
        substitute_strings(&mut rendered, "<ROLE>", &message.role);

        let scalar_content = format
            .structure
            .get("content")
            .and_then(Value::as_str)
            .is_some_and(|s| s == "<TEXT_CONTENT>");

        let content = if scalar_content && !message.has_image() {
            json!(message.text())
        } else {
            let mut parts = Vec::with_capacity(message.parts.len());
            for part in &message.parts {
                match part {
                    ContentPart::Text { text } => {
                        let mut item = format.text_content.clone();
                        substitute_strings(&mut item, "<TEXT_CONTENT>", text);
                        parts.push(item);
                    }
                    ContentPart::Image { media_type, data } => {
                        let mut item = format.image_content.clone().ok_or_else(|| {
                            LoomError::Schema(format!(
                                "provider '{}' declares no image content shape",
                                self.schema.name()
                            ))
                        })?;
                        substitute_strings(&mut item, "<MEDIA_TYPE>", media_type);
                        substitute_strings(&mut item, "<MEDIA_DATA>", data);
                        parts.push(item);
                    }
                }
            }
            Value::Array(parts)
        };

        match rendered.as_object_mut() {
            Some(map) => {
                map.insert("content".into(), content);
            }
            None => {
                return Err(LoomError::Schema(
                    "message_format.structure is not an object".into(),
                ));
            }
        }
        Ok(rendered)
    }

    /// Synthesizes the HTTP headers: schema templates with the API-key
    /// placeholder resolved, plus the auth header when not templated.
    ///
    /// # Errors
    ///
    /// [`LoomError::Validation`] when a required header needs the key
    /// and none is set.
    pub fn build_headers(&self) -> Result<HashMap<String, String>, LoomError> {
        let mut headers = HashMap::new();
        let key_token = self
            .schema
            .auth()
            .and_then(|a| a.key_placeholder.as_deref());

        for (name, template) in self.schema.required_headers() {
            match self.resolve_header(template, key_token) {
                HeaderResolution::Ready(value) => {
                    headers.insert(name.clone(), value);
                }
                HeaderResolution::NeedsKey => {
                    return Err(LoomError::Validation(format!(
                        "header '{name}' requires an API key, but none is set"
                    )));
                }
                HeaderResolution::Unresolvable => {
                    return Err(LoomError::Validation(format!(
                        "required header '{name}' holds an unresolved placeholder"
                    )));
                }
            }
        }

        for (name, template) in self.schema.optional_headers() {
            // Optional headers with unresolved placeholders are omitted.
            if let HeaderResolution::Ready(value) = self.resolve_header(template, key_token) {
                headers.insert(name.clone(), value);
            }
        }

        if let Some(auth) = self.schema.auth() {
            let already_templated = headers
                .keys()
                .any(|k| k.eq_ignore_ascii_case(&auth.key_name));
            if !already_templated {
                let key = self.api_key.as_ref().ok_or_else(|| {
                    LoomError::Validation(format!(
                        "provider '{}' requires an API key, but none is set",
                        self.schema.name()
                    ))
                })?;
                headers.insert(auth.key_name.clone(), format!("{}{key}", auth.key_prefix));
            }
        }

        headers
            .entry("Content-Type".into())
            .or_insert_with(|| "application/json".into());
        Ok(headers)
    }

    /// Resolves one header template. The API key only ever lands in the
    /// auth block's declared placeholder; a schema without one falls
    /// back to treating any `<...>` token as the key slot. Placeholders
    /// that are not key slots stay unresolved.
    fn resolve_header(&self, template: &str, key_token: Option<&str>) -> HeaderResolution {
        match key_token {
            Some(token) if template.contains(token) => match &self.api_key {
                Some(key) => HeaderResolution::Ready(template.replace(token, key)),
                None => HeaderResolution::NeedsKey,
            },
            Some(_) => {
                if contains_placeholder(template) {
                    HeaderResolution::Unresolvable
                } else {
                    HeaderResolution::Ready(template.to_string())
                }
            }
            None => {
                if !contains_placeholder(template) {
                    HeaderResolution::Ready(template.to_string())
                } else {
                    match &self.api_key {
                        Some(key) => {
                            HeaderResolution::Ready(substitute_placeholder(template, key))
                        }
                        None => HeaderResolution::NeedsKey,
                    }
                }
            }
        }
    }

    // ── Validation ──────────────────────────────────────────────────

    /// Returns every violation the current state would produce, empty
    /// when a request can be built.
    pub fn validation_errors(&self) -> Vec<String> {
        match self.synthesize(false) {
            Ok(mut request) => {
                strip_null_fields(&mut request);
                self.request_violations(&request)
            }
            Err(e) => vec![e.to_string()],
        }
    }

    /// Returns `true` if [`build_request`](Self::build_request) would
    /// succeed with validation enabled.
    pub fn is_valid_request(&self) -> bool {
        self.validation_errors().is_empty()
    }

    fn request_violations(&self, request: &Value) -> Vec<String> {
        let rules = self.schema.validation();
        let mut violations = Vec::new();

        if self.messages.len() < rules.min_messages {
            violations.push(format!(
                "at least {} message(s) required, have {}",
                rules.min_messages,
                self.messages.len()
            ));
        }
        if let Some(expected) = &rules.last_message_role {
            if let Some(last) = self.messages.last() {
                if &last.role != expected {
                    violations.push(format!(
                        "last message must have role '{expected}', found '{}'",
                        last.role
                    ));
                }
            }
        }
        if rules.alternating_roles {
            for pair in self.messages.windows(2) {
                if pair[0].role == pair[1].role {
                    violations.push(format!("consecutive '{}' messages", pair[0].role));
                    break;
                }
            }
        }
        for field in &rules.required_fields {
            if request.get(field).is_none() {
                violations.push(format!("required field '{field}' is missing"));
            }
        }

        violations
    }

    // ── Response extraction ─────────────────────────────────────────

    /// Extracts the assistant text from a completed response.
    ///
    /// If the value at the schema's text path is a string, it is
    /// returned as-is. If it is an array of content items, the `text`
    /// fields of items whose `type` is `"text"` are concatenated.
    ///
    /// # Errors
    ///
    /// [`LoomError::ResponseFormat`] when any path link is missing or
    /// the terminal value has an unexpected shape.
    pub fn extract_text_response(&self, response: &Value) -> Result<String, LoomError> {
        let target = self
            .schema
            .response()
            .text
            .resolve(response)
            .ok_or_else(|| LoomError::ResponseFormat {
                message: "response does not contain the schema's text path".into(),
                raw: response.to_string(),
            })?;

        match target {
            Value::String(text) => Ok(text.clone()),
            Value::Array(items) => Ok(items
                .iter()
                .filter(|item| item.get("type").and_then(Value::as_str) == Some("text"))
                .filter_map(|item| item.get("text").and_then(Value::as_str))
                .collect()),
            other => Err(LoomError::ResponseFormat {
                message: format!("text path leads to unexpected value: {other}"),
                raw: response.to_string(),
            }),
        }
    }

    /// Returns the value at the schema's content path, verbatim.
    pub fn extract_full_response(&self, response: &Value) -> Result<Value, LoomError> {
        let paths = self.schema.response();
        let path = paths.content.as_ref().unwrap_or(&paths.text);
        path.resolve(response)
            .cloned()
            .ok_or_else(|| LoomError::ResponseFormat {
                message: "response does not contain the schema's content path".into(),
                raw: response.to_string(),
            })
    }

    /// Extracts the provider's error message, if the response carries
    /// one at the schema's error path.
    pub fn extract_error(&self, response: &Value) -> Option<String> {
        self.schema
            .response()
            .error
            .as_ref()?
            .resolve(response)?
            .as_str()
            .map(str::to_string)
    }

    /// Extracts the text delta from one streaming frame. `Ok(None)`
    /// when the frame simply carries no delta (role prefaces, usage
    /// frames, finish markers).
    pub fn extract_stream_delta(&self, frame: &Value) -> Result<Option<String>, LoomError> {
        let Some(path) = self.schema.response().content_delta.as_ref() else {
            return Err(LoomError::Schema(format!(
                "provider '{}' declares no streaming delta path",
                self.schema.name()
            )));
        };
        Ok(path.resolve(frame).and_then(Value::as_str).map(str::to_string))
    }

    // ── State snapshot ──────────────────────────────────────────────

    /// Serializes observable conversation state: provider, model,
    /// system message, parameters, and messages.
    pub fn export_state(&self) -> Value {
        json!({
            "provider": self.schema.name(),
            "model": self.model,
            "system_message": self.system_message,
            "parameters": self.parameters,
            "messages": self.messages,
        })
    }

    /// Replaces conversation state from a snapshot. The snapshot's
    /// provider must match this context's schema; the import is atomic
    /// — on any error the context is unchanged.
    pub fn import_state(&mut self, state: &Value) -> Result<&mut Self, LoomError> {
        let provider = state
            .get("provider")
            .and_then(Value::as_str)
            .ok_or_else(|| LoomError::Validation("state snapshot has no provider".into()))?;
        if provider != self.schema.name() {
            return Err(LoomError::Validation(format!(
                "state snapshot is for provider '{provider}', context is bound to '{}'",
                self.schema.name()
            )));
        }

        let model = match state.get("model") {
            None | Some(Value::Null) => None,
            Some(Value::String(m)) => Some(m.clone()),
            Some(_) => return Err(LoomError::Validation("state model must be a string".into())),
        };
        let system_message = match state.get("system_message") {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) => Some(s.clone()),
            Some(_) => {
                return Err(LoomError::Validation(
                    "state system_message must be a string".into(),
                ));
            }
        };
        let parameters: HashMap<String, Value> = match state.get("parameters") {
            None | Some(Value::Null) => HashMap::new(),
            Some(value) => serde_json::from_value(value.clone())
                .map_err(|e| LoomError::Validation(format!("state parameters malformed: {e}")))?,
        };
        let messages: Vec<Message> = match state.get("messages") {
            None | Some(Value::Null) => Vec::new(),
            Some(value) => serde_json::from_value(value.clone())
                .map_err(|e| LoomError::Validation(format!("state messages malformed: {e}")))?,
        };

        self.model = model;
        self.system_message = system_message;
        self.parameters = parameters;
        self.messages = messages;
        Ok(self)
    }
}

/// Outcome of resolving one header template.
enum HeaderResolution {
    /// Fully resolved value.
    Ready(String),
    /// The template's key slot needs an API key that is not set.
    NeedsKey,
    /// The template holds a placeholder that is not the key slot.
    Unresolvable,
}

/// Recursively removes null object fields. Array elements are
/// positional and therefore kept.
fn strip_null_fields(value: &mut Value) {
    match value {
        Value::Object(map) => {
            map.retain(|_, v| !v.is_null());
            for v in map.values_mut() {
                strip_null_fields(v);
            }
        }
        Value::Array(items) => {
            for item in items {
                strip_null_fields(item);
            }
        }
        _ => {}
    }
}

/// Replaces `needle` in every string of a JSON tree.
fn substitute_strings(value: &mut Value, needle: &str, replacement: &str) {
    match value {
        Value::String(s) => {
            if s.contains(needle) {
                *s = s.replace(needle, replacement);
            }
        }
        Value::Object(map) => {
            for v in map.values_mut() {
                substitute_strings(v, needle, replacement);
            }
        }
        Value::Array(items) => {
            for item in items {
                substitute_strings(item, needle, replacement);
            }
        }
        _ => {}
    }
}

/// Returns `true` if a header template holds an unresolved `<...>` token.
fn contains_placeholder(template: &str) -> bool {
    match (template.find('<'), template.find('>')) {
        (Some(open), Some(close)) => open < close,
        _ => false,
    }
}

/// Replaces every `<...>` token in a header template with the key.
fn substitute_placeholder(template: &str, key: &str) -> String {
    let mut result = String::with_capacity(template.len() + key.len());
    let mut rest = template;
    while let Some(open) = rest.find('<') {
        let Some(close) = rest[open..].find('>') else {
            break;
        };
        result.push_str(&rest[..open]);
        result.push_str(key);
        rest = &rest[open + close + 1..];
    }
    result.push_str(rest);
    result
}
