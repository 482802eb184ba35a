//! JSON payload projection.
//!
//! Extracts top-level fields from JSON payloads as text columns. A payload
//! that fails to parse (or whose root is not an object) nulls every
//! extraction column for that row; the row itself is still emitted.

use serde_json::Value;

/// Projects top-level JSON fields into text cells.
#[derive(Debug, Clone)]
pub struct JsonProjector {
    fields: Vec<String>,
}

impl JsonProjector {
    /// Creates a projector for the given field names, in column order.
    #[must_use]
    pub fn new(fields: Vec<String>) -> Self {
        Self { fields }
    }

    /// Parses one payload and extracts every bound field.
    ///
    /// Strings project as their literal value, numbers in fixed
    /// six-decimal form, booleans as `"true"`/`"false"`, objects and
    /// arrays as their serialised JSON, and explicit nulls (or absent
    /// fields) as null. The result always has one entry per field.
    #[must_use]
    pub fn project(&self, payload: &[u8]) -> Vec<Option<String>> {
        let Ok(doc) = serde_json::from_slice::<Value>(payload) else {
            return vec![None; self.fields.len()];
        };
        self.fields
            .iter()
            .map(|name| doc.get(name).and_then(stringify))
            .collect()
    }
}

fn stringify(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some((if *b { "true" } else { "false" }).to_string()),
        Value::Number(n) => Some(format!("{:.6}", n.as_f64().unwrap_or_default())),
        other => serde_json::to_string(other).ok(),
    }
}
