//! Conversation messages and content parts.
//!
//! A [`Message`] is one turn in the ordered conversation list. Its
//! content is a list of [`ContentPart`]s — text, or an inline base64
//! image. The schema's message format decides how parts are rendered
//! onto the wire; these types are provider-neutral.

use std::path::Path;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::{Deserialize, Serialize};

use crate::error::LoomError;

/// One turn in a conversation.
///
/// The `role` is a plain string validated against the active schema's
/// role set when the message is added to a context — roles are schema
/// data, not a closed enum.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// The speaker role (`"user"`, `"assistant"`, ...).
    pub role: String,
    /// Ordered content parts.
    pub parts: Vec<ContentPart>,
}

/// A single payload inside one message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ContentPart {
    /// Plain text.
    Text {
        /// The text payload.
        text: String,
    },
    /// An inline image, always base64-encoded by the time it is stored.
    Image {
        /// MIME type, e.g. `"image/png"`.
        media_type: String,
        /// Base64-encoded image bytes.
        data: String,
    },
}

impl Message {
    /// Creates a text-only message with the given role.
    pub fn with_role(role: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            parts: vec![ContentPart::Text { text: text.into() }],
        }
    }

    /// Creates a `user` message.
    pub fn user(text: impl Into<String>) -> Self {
        Self::with_role("user", text)
    }

    /// Creates an `assistant` message.
    pub fn assistant(text: impl Into<String>) -> Self {
        Self::with_role("assistant", text)
    }

    /// Appends an image part.
    pub fn push_image(&mut self, media_type: impl Into<String>, data: impl Into<String>) {
        self.parts.push(ContentPart::Image {
            media_type: media_type.into(),
            data: data.into(),
        });
    }

    /// Concatenates all text parts.
    pub fn text(&self) -> String {
        self.parts
            .iter()
            .filter_map(|p| match p {
                ContentPart::Text { text } => Some(text.as_str()),
                ContentPart::Image { .. } => None,
            })
            .collect()
    }

    /// Returns `true` if any part is an image.
    pub fn has_image(&self) -> bool {
        self.parts
            .iter()
            .any(|p| matches!(p, ContentPart::Image { .. }))
    }
}

/// Resolves media data into a base64 string.
///
/// If `data` names an existing file, the file is read and encoded.
/// Otherwise, data that already looks like base64 is kept verbatim; any
/// other string is rejected. The existing-file check runs first so that
/// a path which happens to be base64-alphabet-only still resolves to
/// the file's contents.
pub(crate) fn resolve_media_data(data: &str) -> Result<String, LoomError> {
    if Path::new(data).is_file() {
        let bytes = std::fs::read(data)
            .map_err(|e| LoomError::Validation(format!("failed to read media file {data}: {e}")))?;
        return Ok(BASE64.encode(bytes));
    }
    if is_base64(data) {
        return Ok(data.to_string());
    }
    Err(LoomError::Validation(format!(
        "media data is neither an existing file nor base64: {}",
        truncate(data, 64)
    )))
}

/// Checks whether a string is plausibly base64 (STANDARD alphabet).
fn is_base64(data: &str) -> bool {
    if data.is_empty() || data.len() % 4 != 0 {
        return false;
    }
    if !data
        .bytes()
        .all(|b| b.is_ascii_alphanumeric() || b == b'+' || b == b'/' || b == b'=')
    {
        return false;
    }
    BASE64.decode(data).is_ok()
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
