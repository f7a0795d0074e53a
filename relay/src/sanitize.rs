use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde_json::Value;

use crate::error::{RelayError, RelayResult};

/// Composite values nested this deep are passed through untouched.
///
/// NOTE: this is a best-effort bound, not a guarantee. Strings nested deeper are not sanitized.
pub const MAX_DEPTH: usize = 10;

/// Discriminator field of a drawing event
const TOOL_FIELD: &str = "t";
/// Positional data field of a drawing event
const DATA_FIELD: &str = "d";
/// Tool of the event carrying base64 encoded rich text at `d[1]`
const SET_TEXT_TOOL: &str = "setTextboxText";
const RICH_TEXT_INDEX: usize = 1;

/// Tags allowed to survive in rich text, without any attributes
const RICH_TEXT_TAGS: [&str; 2] = ["div", "br"];
/// Tags dropped together with their content
const DROPPED_CONTENT_TAGS: [&str; 2] = ["script", "style"];

/// [Sanitizer] cleans user supplied payloads of script capable markup before they are relayed
pub struct Sanitizer {
    rich_text: ammonia::Builder<'static>,
}

impl std::fmt::Debug for Sanitizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sanitizer").finish_non_exhaustive()
    }
}

impl Default for Sanitizer {
    fn default() -> Self {
        Sanitizer::new()
    }
}

impl Sanitizer {
    pub fn new() -> Self {
        let mut rich_text = ammonia::Builder::empty();
        rich_text
            .add_tags(RICH_TEXT_TAGS)
            .add_clean_content_tags(DROPPED_CONTENT_TAGS);

        Sanitizer { rich_text }
    }

    /// Full pipeline for a drawing event: generic string cleaning, then the rich text pass
    pub fn sanitize_event(&self, event: Value) -> RelayResult<Value> {
        self.sanitize_rich_text_event(self.sanitize(event))
    }

    /// Sanitizes every string of a JSON tree, see [MAX_DEPTH] for how deep it goes
    pub fn sanitize(&self, value: Value) -> Value {
        self.sanitize_at(value, 0)
    }

    // Strings are cleaned at any depth, composites are only descended into below the bound
    fn sanitize_at(&self, value: Value, depth: usize) -> Value {
        match value {
            Value::String(s) => Value::String(ammonia::clean(&s)),
            Value::Array(items) if depth < MAX_DEPTH => Value::Array(
                items
                    .into_iter()
                    .map(|item| self.sanitize_at(item, depth + 1))
                    .collect(),
            ),
            Value::Object(members) if depth < MAX_DEPTH => Value::Object(
                members
                    .into_iter()
                    .map(|(key, member)| (key, self.sanitize_at(member, depth + 1)))
                    .collect(),
            ),
            other => other,
        }
    }

    /// Re-sanitizes the base64 rich text of a `setTextboxText` event with the strict tag safelist.
    /// Any other event is returned unchanged.
    pub fn sanitize_rich_text_event(&self, mut event: Value) -> RelayResult<Value> {
        if event.get(TOOL_FIELD).and_then(Value::as_str) != Some(SET_TEXT_TOOL) {
            return Ok(event);
        }

        let field = event
            .get_mut(DATA_FIELD)
            .and_then(|data| data.get_mut(RICH_TEXT_INDEX))
            .ok_or_else(|| RelayError::MalformedPayload("rich text event without text".into()))?;

        let encoded = field
            .as_str()
            .ok_or_else(|| RelayError::MalformedPayload("rich text is not a string".into()))?;

        *field = Value::String(self.sanitize_rich_text(encoded)?);

        Ok(event)
    }

    /// Decodes base64 rich text, keeps only the safelisted tags and encodes it back
    pub fn sanitize_rich_text(&self, encoded: &str) -> RelayResult<String> {
        let decoded = STANDARD
            .decode(encoded)
            .map_err(|e| RelayError::MalformedPayload(format!("rich text is not base64: {}", e)))?;
        let decoded = String::from_utf8_lossy(&decoded);

        let purified = self.rich_text.clean(&decoded).to_string();

        Ok(STANDARD.encode(purified))
    }
}
