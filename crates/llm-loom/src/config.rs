//! Context construction defaults.

use std::collections::HashMap;

use serde_json::Value;

/// Ctor-time defaults for a [`ChatContext`](crate::context::ChatContext).
///
/// Use struct update syntax with [`Default`]:
///
/// ```rust
/// use llm_loom::ContextConfig;
///
/// let config = ContextConfig {
///     default_max_tokens: Some(1024),
///     default_temperature: Some(0.3),
///     ..Default::default()
/// };
/// ```
#[derive(Debug, Clone)]
pub struct ContextConfig {
    /// Check roles, parameters, models, and request shape as state is
    /// mutated. On by default; turn off to pass values through verbatim.
    pub enable_validation: bool,
    /// Allow streaming sends through the facade. The schema must also
    /// declare streaming support.
    pub enable_streaming_support: bool,
    /// Overlay for the template's `max_tokens` field.
    pub default_max_tokens: Option<u32>,
    /// Overlay for the template's `temperature` field.
    pub default_temperature: Option<f64>,
    /// Additional parameters applied at construction, as if passed to
    /// `set_parameter` one by one.
    pub custom_parameters: HashMap<String, Value>,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            enable_validation: true,
            enable_streaming_support: false,
            default_max_tokens: None,
            default_temperature: None,
            custom_parameters: HashMap::new(),
        }
    }
}
