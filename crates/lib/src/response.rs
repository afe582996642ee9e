//! Action results and their chat rendering.
//!
//! The host dispatcher returns an open-ended value; `format_response` turns it
//! into one displayable string. The dispatch priority is fixed: a plain string
//! is sent verbatim, then an `error`, `message`, or `text` field wins in that
//! order, and anything else renders one `*field*: value` line per field.

use serde_json::{Map, Value};

/// Result payload for one completed action.
#[derive(Debug, Clone, PartialEq)]
pub enum ActionResult {
    /// A ready-to-send string.
    Text(String),
    /// An open-ended mapping of named fields.
    Payload(Map<String, Value>),
}

impl From<Value> for ActionResult {
    fn from(value: Value) -> Self {
        match value {
            Value::String(s) => ActionResult::Text(s),
            Value::Object(map) => ActionResult::Payload(map),
            // The host only ever produces strings or objects; anything else
            // renders as its JSON text.
            other => ActionResult::Text(other.to_string()),
        }
    }
}

/// Render one field value: strings pass through, numbers render bare,
/// everything else is serialized. A value that fails to serialize degrades to
/// an empty value for that field instead of aborting the whole response.
fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        other => serde_json::to_string(other).unwrap_or_default(),
    }
}

/// Format an action result as chat text. Always returns a string.
pub fn format_response(result: &ActionResult) -> String {
    let map = match result {
        ActionResult::Text(s) => return s.clone(),
        ActionResult::Payload(map) => map,
    };
    for key in ["error", "message", "text"] {
        if let Some(value) = map.get(key) {
            return display_value(value);
        }
    }
    let mut out = String::new();
    for (key, value) in map {
        out.push('*');
        out.push_str(key);
        out.push_str("*: ");
        out.push_str(&display_value(value));
        out.push_str("\r\n");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn format(value: Value) -> String {
        format_response(&ActionResult::from(value))
    }

    #[test]
    fn plain_string_is_sent_verbatim() {
        assert_eq!(format(json!("hello")), "hello");
    }

    #[test]
    fn error_field_wins() {
        assert_eq!(format(json!({"error": "boom"})), "boom");
        assert_eq!(
            format(json!({"error": "boom", "message": "hi", "text": "t"})),
            "boom"
        );
    }

    #[test]
    fn message_field_beats_text() {
        assert_eq!(format(json!({"message": "hi", "text": "t"})), "hi");
        assert_eq!(format(json!({"text": "t"})), "t");
    }

    #[test]
    fn open_ended_payload_renders_one_line_per_field() {
        assert_eq!(
            format(json!({"foo": 1, "bar": "x"})),
            "*foo*: 1\r\n*bar*: x\r\n"
        );
    }

    #[test]
    fn nested_values_are_serialized() {
        assert_eq!(
            format(json!({"hosts": ["a", "b"], "up": true})),
            "*hosts*: [\"a\",\"b\"]\r\n*up*: true\r\n"
        );
    }

    #[test]
    fn field_order_is_preserved() {
        let mut map = Map::new();
        map.insert("zeta".to_string(), json!("z"));
        map.insert("alpha".to_string(), json!("a"));
        assert_eq!(
            format_response(&ActionResult::Payload(map)),
            "*zeta*: z\r\n*alpha*: a\r\n"
        );
    }

    #[test]
    fn empty_payload_renders_empty_string() {
        assert_eq!(format(json!({})), "");
    }

    #[test]
    fn non_string_non_object_results_render_as_json_text() {
        assert_eq!(format(json!(42)), "42");
        assert_eq!(format(json!(["a", "b"])), "[\"a\",\"b\"]");
    }
}
