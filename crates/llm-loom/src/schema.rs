//! Provider schema documents.
//!
//! A [`ProviderSchema`] is the parsed, validated, immutable form of one
//! provider's wire contract: endpoint, auth, request template, parameter
//! constraints, message shapes, and response extraction paths. Contexts
//! hold schemas by `Arc` and interpret them — provider variants are
//! data, not types.
//!
//! Schemas are loaded once (usually through the
//! [`SchemaRegistry`](crate::registry::SchemaRegistry)) and never
//! mutated afterwards, so they are shared freely across threads.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use serde_json::Value;

use crate::error::LoomError;

/// One step of an extraction path: an object key or an array index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    /// Index into an object by field name.
    Key(String),
    /// Index into an array.
    Index(usize),
}

/// A compiled extraction path — an ordered sequence of keys / indices
/// locating a value inside a response JSON tree.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct JsonPath(Vec<PathSegment>);

impl JsonPath {
    /// Compiles a path from its schema representation: an array whose
    /// elements are strings (object keys) or nonnegative integers
    /// (array indices).
    pub fn parse(value: &Value, what: &str) -> Result<Self, LoomError> {
        let Some(elements) = value.as_array() else {
            return Err(LoomError::Schema(format!("{what} must be an array")));
        };
        let mut segments = Vec::with_capacity(elements.len());
        for element in elements {
            match element {
                Value::String(key) => segments.push(PathSegment::Key(key.clone())),
                Value::Number(n) => {
                    let idx = n.as_u64().ok_or_else(|| {
                        LoomError::Schema(format!("{what} indices must be nonnegative integers"))
                    })?;
                    segments.push(PathSegment::Index(idx as usize));
                }
                _ => {
                    return Err(LoomError::Schema(format!(
                        "{what} elements must be strings or nonnegative integers"
                    )));
                }
            }
        }
        Ok(Self(segments))
    }

    /// Walks the path from `root`, returning the value it lands on.
    pub fn resolve<'a>(&self, root: &'a Value) -> Option<&'a Value> {
        let mut current = root;
        for segment in &self.0 {
            current = match segment {
                PathSegment::Key(key) => current.get(key.as_str())?,
                PathSegment::Index(idx) => current.get(*idx)?,
            };
        }
        Some(current)
    }

    /// Returns the path segments.
    pub fn segments(&self) -> &[PathSegment] {
        &self.0
    }

    /// Returns `true` if the path has no segments.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// The declared kind of a request parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    /// Whole numbers.
    Integer,
    /// Floating point (integers are accepted where a float is expected).
    Float,
    /// Booleans.
    Boolean,
    /// Strings.
    String,
    /// JSON arrays.
    Array,
}

impl ParamKind {
    fn parse(s: &str) -> Option<Self> {
        match s {
            "integer" | "int" => Some(Self::Integer),
            "float" | "number" => Some(Self::Float),
            "boolean" | "bool" => Some(Self::Boolean),
            "string" => Some(Self::String),
            "array" => Some(Self::Array),
            _ => None,
        }
    }

    fn matches(self, value: &Value) -> bool {
        match self {
            Self::Integer => value.is_i64() || value.is_u64(),
            Self::Float => value.is_number(),
            Self::Boolean => value.is_boolean(),
            Self::String => value.is_string(),
            Self::Array => value.is_array(),
        }
    }
}

impl std::fmt::Display for ParamKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Integer => "integer",
            Self::Float => "float",
            Self::Boolean => "boolean",
            Self::String => "string",
            Self::Array => "array",
        };
        f.write_str(s)
    }
}

/// One declarative parameter rule.
#[derive(Debug, Clone)]
pub struct ParamConstraint {
    /// The value kind.
    pub kind: ParamKind,
    /// Whether the parameter must be present in every request.
    pub required: bool,
    /// Inclusive lower bound for numeric kinds.
    pub min: Option<f64>,
    /// Inclusive upper bound for numeric kinds.
    pub max: Option<f64>,
    /// Closed set of admissible values, when enumerated.
    pub enum_values: Option<Vec<Value>>,
    /// Default applied to the request template at context construction.
    pub default: Option<Value>,
    /// JSON field name, when it differs from the parameter key.
    pub field: Option<String>,
}

impl ParamConstraint {
    /// Checks `value` against this constraint.
    pub fn check(&self, name: &str, value: &Value) -> Result<(), LoomError> {
        if value.is_null() {
            return Err(LoomError::Validation(format!(
                "parameter '{name}' must not be null"
            )));
        }
        if !self.kind.matches(value) {
            return Err(LoomError::Validation(format!(
                "parameter '{name}' must be of kind {}",
                self.kind
            )));
        }
        if let Some(n) = value.as_f64() {
            if let Some(min) = self.min {
                if n < min {
                    return Err(LoomError::Validation(format!(
                        "parameter '{name}' = {n} is below the minimum {min}"
                    )));
                }
            }
            if let Some(max) = self.max {
                if n > max {
                    return Err(LoomError::Validation(format!(
                        "parameter '{name}' = {n} exceeds the maximum {max}"
                    )));
                }
            }
        }
        if let Some(admissible) = &self.enum_values {
            if !admissible.contains(value) {
                return Err(LoomError::Validation(format!(
                    "parameter '{name}' is not one of the admissible values"
                )));
            }
        }
        Ok(())
    }
}

/// How the API key is carried.
#[derive(Debug, Clone)]
pub struct AuthSpec {
    /// Header name carrying the credential (e.g. `"x-api-key"`).
    pub key_name: String,
    /// Literal prefix prepended to the key (e.g. `"Bearer "`).
    pub key_prefix: String,
    /// Placeholder token used in header templates.
    pub key_placeholder: Option<String>,
}

/// Where the system message goes.
#[derive(Debug, Clone, Default)]
pub struct SystemMessageSpec {
    /// Whether the provider accepts a system message at all.
    pub supported: bool,
    /// Top-level request field (Anthropic style), if any.
    pub field: Option<String>,
    /// Role used when the system message is prepended to the message
    /// list (OpenAI style). Defaults to `"system"`.
    pub role: String,
}

/// Image support flags.
#[derive(Debug, Clone, Default)]
pub struct MultimodalSpec {
    /// Whether image content parts are accepted.
    pub supported: bool,
    /// Admissible MIME types; empty means unrestricted.
    pub supported_types: Vec<String>,
    /// Cap on images per message, when declared.
    pub max_images_per_message: Option<usize>,
}

/// Templates describing how messages are rendered onto the wire.
///
/// Templates carry `<ROLE>`, `<TEXT_CONTENT>`, `<MEDIA_TYPE>`, and
/// `<MEDIA_DATA>` placeholders that the context substitutes per message.
#[derive(Debug, Clone)]
pub struct MessageFormat {
    /// Request field receiving the message list.
    pub message_field: String,
    /// Shape of one message.
    pub structure: Value,
    /// Shape of a text content part.
    pub text_content: Value,
    /// Shape of an image content part, when multimodal.
    pub image_content: Option<Value>,
}

/// Compiled response extraction paths.
#[derive(Debug, Clone)]
pub struct ResponsePaths {
    /// Locates the assistant text (or the content array holding it).
    pub text: JsonPath,
    /// Locates the full content value, verbatim.
    pub content: Option<JsonPath>,
    /// Locates the provider's human-readable error message.
    pub error: Option<JsonPath>,
    /// Locates the provider's error type tag.
    pub error_type: Option<JsonPath>,
    /// Locates the text delta inside one streaming frame.
    pub content_delta: Option<JsonPath>,
    /// Locates the usage object.
    pub usage: Option<JsonPath>,
    /// Locates the echoed model name.
    pub model: Option<JsonPath>,
    /// Locates the stop reason.
    pub stop_reason: Option<JsonPath>,
}

/// Capability flags.
#[derive(Debug, Clone, Copy, Default)]
pub struct Features {
    /// Server-sent-event streaming.
    pub streaming: bool,
    /// Tool / function calling declared (not synthesized by this engine).
    pub function_calling: bool,
    /// JSON-mode output.
    pub json_mode: bool,
    /// Image understanding.
    pub vision: bool,
    /// System messages.
    pub system_messages: bool,
    /// Multi-turn message history.
    pub message_history: bool,
}

/// Request-level validation rules.
#[derive(Debug, Clone)]
pub struct ValidationRules {
    /// Fields that must be present and non-null in every request.
    pub required_fields: Vec<String>,
    /// Minimum number of messages.
    pub min_messages: usize,
    /// Whether user/assistant roles must alternate.
    pub alternating_roles: bool,
    /// Role the final message must carry, when constrained.
    pub last_message_role: Option<String>,
}

impl Default for ValidationRules {
    fn default() -> Self {
        Self {
            required_fields: Vec::new(),
            min_messages: 1,
            alternating_roles: false,
            last_message_role: None,
        }
    }
}

/// Known model identifiers.
#[derive(Debug, Clone, Default)]
pub struct ModelList {
    /// Currently offered models.
    pub available: Vec<String>,
    /// Still-accepted deprecated models.
    pub deprecated: Vec<String>,
    /// Model used when the caller sets none.
    pub default: Option<String>,
}

impl ModelList {
    /// Returns `true` if `name` is available or deprecated.
    pub fn contains(&self, name: &str) -> bool {
        self.available.iter().any(|m| m == name) || self.deprecated.iter().any(|m| m == name)
    }

    /// Returns `true` if no models are declared at all.
    pub fn is_empty(&self) -> bool {
        self.available.is_empty() && self.deprecated.is_empty()
    }
}

/// One provider's wire contract, parsed and validated.
///
/// Immutable after construction; share it with `Arc`.
#[derive(Debug, Clone)]
pub struct ProviderSchema {
    raw: Value,
    name: String,
    endpoint: String,
    method: String,
    timeout_ms: Option<u64>,
    max_retries: Option<u32>,
    required_headers: HashMap<String, String>,
    optional_headers: HashMap<String, String>,
    auth: Option<AuthSpec>,
    models: ModelList,
    request_template: Value,
    parameters: HashMap<String, ParamConstraint>,
    message_roles: HashSet<String>,
    system_message: SystemMessageSpec,
    multimodal: MultimodalSpec,
    message_format: MessageFormat,
    response: ResponsePaths,
    features: Features,
    validation: ValidationRules,
    error_codes: HashMap<String, String>,
}

impl ProviderSchema {
    /// Reads and parses a schema file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, LoomError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| LoomError::Schema(format!("cannot read {}: {e}", path.display())))?;
        let value: Value = serde_json::from_str(&text)
            .map_err(|e| LoomError::Schema(format!("{} is not valid JSON: {e}", path.display())))?;
        Self::from_value(value)
    }

    /// Parses and validates a schema document.
    pub fn from_value(raw: Value) -> Result<Self, LoomError> {
        let name = raw
            .pointer("/provider/name")
            .and_then(Value::as_str)
            .ok_or_else(|| LoomError::Schema("missing required field: provider.name".into()))?
            .to_string();

        let endpoint = raw
            .pointer("/api/endpoint")
            .and_then(Value::as_str)
            .ok_or_else(|| LoomError::Schema("missing required field: api.endpoint".into()))?
            .to_string();
        let method = raw
            .pointer("/api/method")
            .and_then(Value::as_str)
            .ok_or_else(|| LoomError::Schema("missing required field: api.method".into()))?
            .to_string();
        let timeout_ms = raw.pointer("/api/timeout_ms").and_then(Value::as_u64);
        let max_retries = raw
            .pointer("/api/max_retries")
            .and_then(Value::as_u64)
            .map(|n| n as u32);

        let request_template = raw
            .get("request_template")
            .cloned()
            .ok_or_else(|| LoomError::Schema("missing required section: request_template".into()))?;
        if !request_template.is_object() {
            return Err(LoomError::Schema("request_template must be an object".into()));
        }

        let message_roles: HashSet<String> = raw
            .get("message_roles")
            .and_then(Value::as_array)
            .ok_or_else(|| LoomError::Schema("missing required section: message_roles".into()))?
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect();
        if message_roles.is_empty() {
            return Err(LoomError::Schema("message_roles must be a nonempty string array".into()));
        }

        let required_headers = parse_header_map(raw.pointer("/headers/required"))?;
        let optional_headers = parse_header_map(raw.pointer("/headers/optional"))?;
        let auth = parse_auth(raw.get("authentication"))?;
        if required_headers.is_empty() && auth.is_none() {
            return Err(LoomError::Schema(
                "schema must declare headers.required or an authentication block".into(),
            ));
        }

        let models = parse_models(raw.get("models"));
        let parameters = parse_parameters(raw.get("parameters"))?;
        let system_message = parse_system_message(raw.get("system_message"));
        let multimodal = parse_multimodal(raw.get("multimodal"));
        let message_format = parse_message_format(raw.get("message_format"))?;
        let response = parse_response_paths(raw.get("response_format"))?;
        let features = parse_features(raw.get("features"))?;
        let validation = parse_validation(raw.get("validation"));
        let error_codes = raw
            .get("error_codes")
            .and_then(Value::as_object)
            .map(|obj| {
                obj.iter()
                    .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            raw,
            name,
            endpoint,
            method,
            timeout_ms,
            max_retries,
            required_headers,
            optional_headers,
            auth,
            models,
            request_template,
            parameters,
            message_roles,
            system_message,
            multimodal,
            message_format,
            response,
            features,
            validation,
            error_codes,
        })
    }

    /// The provider name (`provider.name`).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The endpoint URL.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// The HTTP method (always `POST` for present providers).
    pub fn method(&self) -> &str {
        &self.method
    }

    /// Advisory request timeout from the schema, if declared.
    pub fn timeout_ms(&self) -> Option<u64> {
        self.timeout_ms
    }

    /// Advisory retry budget for transports, if declared.
    pub fn max_retries(&self) -> Option<u32> {
        self.max_retries
    }

    /// Required header templates (values may hold a key placeholder).
    pub fn required_headers(&self) -> &HashMap<String, String> {
        &self.required_headers
    }

    /// Optional header templates.
    pub fn optional_headers(&self) -> &HashMap<String, String> {
        &self.optional_headers
    }

    /// The auth descriptor, when declared.
    pub fn auth(&self) -> Option<&AuthSpec> {
        self.auth.as_ref()
    }

    /// Declared models.
    pub fn models(&self) -> &ModelList {
        &self.models
    }

    /// The request template (skeleton with defaults).
    pub fn request_template(&self) -> &Value {
        &self.request_template
    }

    /// Parameter constraints by name.
    pub fn parameters(&self) -> &HashMap<String, ParamConstraint> {
        &self.parameters
    }

    /// Admissible message roles.
    pub fn message_roles(&self) -> &HashSet<String> {
        &self.message_roles
    }

    /// System-message placement.
    pub fn system_message(&self) -> &SystemMessageSpec {
        &self.system_message
    }

    /// Image support.
    pub fn multimodal(&self) -> &MultimodalSpec {
        &self.multimodal
    }

    /// Message rendering templates.
    pub fn message_format(&self) -> &MessageFormat {
        &self.message_format
    }

    /// Response extraction paths.
    pub fn response(&self) -> &ResponsePaths {
        &self.response
    }

    /// Capability flags.
    pub fn features(&self) -> &Features {
        &self.features
    }

    /// Request validation rules.
    pub fn validation(&self) -> &ValidationRules {
        &self.validation
    }

    /// Semantic error code for an HTTP status, when the schema maps it.
    pub fn error_code_for(&self, status: u16) -> Option<&str> {
        self.error_codes.get(&status.to_string()).map(String::as_str)
    }

    /// The raw schema document, for introspection.
    pub fn raw(&self) -> &Value {
        &self.raw
    }
}

fn parse_header_map(value: Option<&Value>) -> Result<HashMap<String, String>, LoomError> {
    let Some(value) = value else {
        return Ok(HashMap::new());
    };
    let obj = value
        .as_object()
        .ok_or_else(|| LoomError::Schema("headers sections must be objects".into()))?;
    let mut map = HashMap::with_capacity(obj.len());
    for (name, template) in obj {
        let template = template.as_str().ok_or_else(|| {
            LoomError::Schema(format!("header template '{name}' must be a string"))
        })?;
        map.insert(name.clone(), template.to_string());
    }
    Ok(map)
}

fn parse_auth(value: Option<&Value>) -> Result<Option<AuthSpec>, LoomError> {
    let Some(value) = value else {
        return Ok(None);
    };
    let kind = value.get("type").and_then(Value::as_str).unwrap_or("header");
    if kind != "header" {
        return Err(LoomError::Schema(format!(
            "unsupported authentication type: {kind}"
        )));
    }
    let key_name = value
        .get("key_name")
        .and_then(Value::as_str)
        .ok_or_else(|| LoomError::Schema("authentication.key_name is required".into()))?
        .to_string();
    Ok(Some(AuthSpec {
        key_name,
        key_prefix: value
            .get("key_prefix")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        key_placeholder: value
            .get("key_placeholder")
            .and_then(Value::as_str)
            .map(str::to_string),
    }))
}

fn parse_models(value: Option<&Value>) -> ModelList {
    let string_list = |v: Option<&Value>| -> Vec<String> {
        v.and_then(Value::as_array)
            .map(|a| a.iter().filter_map(Value::as_str).map(str::to_string).collect())
            .unwrap_or_default()
    };
    let Some(value) = value else {
        return ModelList::default();
    };
    ModelList {
        available: string_list(value.get("available")),
        deprecated: string_list(value.get("deprecated")),
        default: value.get("default").and_then(Value::as_str).map(str::to_string),
    }
}

fn parse_parameters(value: Option<&Value>) -> Result<HashMap<String, ParamConstraint>, LoomError> {
    let Some(value) = value else {
        return Ok(HashMap::new());
    };
    let obj = value
        .as_object()
        .ok_or_else(|| LoomError::Schema("parameters must be an object".into()))?;

    let mut params = HashMap::with_capacity(obj.len());
    for (name, spec) in obj {
        let kind_str = spec
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| LoomError::Schema(format!("parameter '{name}' is missing a type")))?;
        let kind = ParamKind::parse(kind_str).ok_or_else(|| {
            LoomError::Schema(format!("parameter '{name}' has unknown kind '{kind_str}'"))
        })?;

        let min = spec.get("min").and_then(Value::as_f64);
        let max = spec.get("max").and_then(Value::as_f64);
        if let (Some(min), Some(max)) = (min, max) {
            if min > max {
                return Err(LoomError::Schema(format!(
                    "parameter '{name}' declares min {min} > max {max}"
                )));
            }
        }

        let enum_values = match spec.get("enum") {
            None => None,
            Some(Value::Array(values)) if !values.is_empty() => Some(values.clone()),
            Some(_) => {
                return Err(LoomError::Schema(format!(
                    "parameter '{name}' enum must be a nonempty array"
                )));
            }
        };

        params.insert(
            name.clone(),
            ParamConstraint {
                kind,
                required: spec.get("required").and_then(Value::as_bool).unwrap_or(false),
                min,
                max,
                enum_values,
                default: spec.get("default").cloned().filter(|v| !v.is_null()),
                field: spec.get("field").and_then(Value::as_str).map(str::to_string),
            },
        );
    }
    Ok(params)
}

fn parse_system_message(value: Option<&Value>) -> SystemMessageSpec {
    let Some(value) = value else {
        return SystemMessageSpec {
            supported: false,
            field: None,
            role: "system".into(),
        };
    };
    SystemMessageSpec {
        supported: value.get("supported").and_then(Value::as_bool).unwrap_or(false),
        field: value.get("field").and_then(Value::as_str).map(str::to_string),
        role: value
            .get("role")
            .and_then(Value::as_str)
            .unwrap_or("system")
            .to_string(),
    }
}

fn parse_multimodal(value: Option<&Value>) -> MultimodalSpec {
    let Some(value) = value else {
        return MultimodalSpec::default();
    };
    MultimodalSpec {
        supported: value.get("supported").and_then(Value::as_bool).unwrap_or(false),
        supported_types: value
            .get("supported_types")
            .and_then(Value::as_array)
            .map(|a| a.iter().filter_map(Value::as_str).map(str::to_string).collect())
            .unwrap_or_default(),
        max_images_per_message: value
            .get("max_images_per_message")
            .and_then(Value::as_u64)
            .map(|n| n as usize),
    }
}

fn parse_message_format(value: Option<&Value>) -> Result<MessageFormat, LoomError> {
    let message_field = value
        .and_then(|v| v.get("message_field"))
        .and_then(Value::as_str)
        .unwrap_or("messages")
        .to_string();
    let structure = value
        .and_then(|v| v.get("structure"))
        .cloned()
        .unwrap_or_else(|| {
            serde_json::json!({ "role": "<ROLE>", "content": "<TEXT_CONTENT>" })
        });
    if !structure.is_object() {
        return Err(LoomError::Schema("message_format.structure must be an object".into()));
    }
    let content_types = value.and_then(|v| v.get("content_types"));
    let text_content = content_types
        .and_then(|v| v.get("text"))
        .cloned()
        .unwrap_or_else(|| serde_json::json!({ "type": "text", "text": "<TEXT_CONTENT>" }));
    let image_content = content_types.and_then(|v| v.get("image")).cloned();
    Ok(MessageFormat {
        message_field,
        structure,
        text_content,
        image_content,
    })
}

fn parse_response_paths(value: Option<&Value>) -> Result<ResponsePaths, LoomError> {
    let success = value.and_then(|v| v.get("success"));
    let error = value.and_then(|v| v.get("error"));
    let stream = value.and_then(|v| v.get("stream"));

    let opt_path = |node: Option<&Value>, key: &str, what: &str| -> Result<Option<JsonPath>, LoomError> {
        match node.and_then(|n| n.get(key)) {
            Some(v) => JsonPath::parse(v, what).map(Some),
            None => Ok(None),
        }
    };

    let text = opt_path(success, "text_path", "response_format.success.text_path")?;
    let content = opt_path(success, "content_path", "response_format.success.content_path")?;
    let text = match (text, &content) {
        (Some(t), _) => t,
        (None, Some(c)) => c.clone(),
        (None, None) => {
            return Err(LoomError::Schema(
                "response_format.success must declare text_path or content_path".into(),
            ));
        }
    };

    Ok(ResponsePaths {
        text,
        content,
        error: opt_path(error, "error_path", "response_format.error.error_path")?,
        error_type: opt_path(error, "error_type_path", "response_format.error.error_type_path")?,
        content_delta: opt_path(
            stream,
            "content_delta_path",
            "response_format.stream.content_delta_path",
        )?,
        usage: opt_path(success, "usage_path", "response_format.success.usage_path")?,
        model: opt_path(success, "model_path", "response_format.success.model_path")?,
        stop_reason: opt_path(
            success,
            "stop_reason_path",
            "response_format.success.stop_reason_path",
        )?,
    })
}

fn parse_features(value: Option<&Value>) -> Result<Features, LoomError> {
    let Some(value) = value else {
        return Ok(Features::default());
    };
    let obj = value
        .as_object()
        .ok_or_else(|| LoomError::Schema("features must be an object".into()))?;
    let flag = |key: &str| -> Result<bool, LoomError> {
        match obj.get(key) {
            None => Ok(false),
            Some(Value::Bool(b)) => Ok(*b),
            Some(_) => Err(LoomError::Schema(format!("features.{key} must be a boolean"))),
        }
    };
    Ok(Features {
        streaming: flag("streaming")?,
        function_calling: flag("function_calling")?,
        json_mode: flag("json_mode")?,
        vision: flag("vision")?,
        system_messages: flag("system_messages")?,
        message_history: flag("message_history")?,
    })
}

fn parse_validation(value: Option<&Value>) -> ValidationRules {
    let Some(value) = value else {
        return ValidationRules::default();
    };
    let message_validation = value.get("message_validation");
    ValidationRules {
        required_fields: value
            .get("required_fields")
            .and_then(Value::as_array)
            .map(|a| a.iter().filter_map(Value::as_str).map(str::to_string).collect())
            .unwrap_or_default(),
        min_messages: message_validation
            .and_then(|v| v.get("min_messages"))
            .and_then(Value::as_u64)
            .unwrap_or(1) as usize,
        alternating_roles: message_validation
            .and_then(|v| v.get("alternating_roles"))
            .and_then(Value::as_bool)
            .unwrap_or(false),
        last_message_role: message_validation
            .and_then(|v| v.get("last_message_role"))
            .and_then(Value::as_str)
            .map(str::to_string),
    }
}
