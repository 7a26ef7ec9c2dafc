use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

fn default_count() -> i64 {
    -1
}

/// First line of a bulk transfer
///
/// `count` is `-1` when the number of entities is unknown. Fields in
/// `extra` are written after the recognized ones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamHeader {
    #[serde(default = "default_count")]
    pub count: i64,
    #[serde(default)]
    pub update: bool,
    #[serde(default)]
    pub errors: Vec<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for StreamHeader {
    fn default() -> Self {
        Self {
            count: default_count(),
            update: false,
            errors: Vec::new(),
            extra: Map::new(),
        }
    }
}

impl StreamHeader {
    pub fn with_count(count: usize) -> Self {
        Self {
            count: i64::try_from(count).unwrap_or(i64::MAX),
            ..Self::default()
        }
    }

    /// Sets one header field
    ///
    /// `count`, `update` and `errors` replace the typed fields; a value of
    /// the wrong JSON type for them is ignored with a warning. Any other
    /// name goes to `extra`.
    pub fn field(mut self, name: impl Into<String>, value: Value) -> Self {
        let name = name.into();
        let accepted = match (name.as_str(), value) {
            ("count", Value::Number(n)) => n.as_i64().map(|count| self.count = count).is_some(),
            ("update", Value::Bool(update)) => {
                self.update = update;
                true
            }
            ("errors", Value::Array(errors)) => {
                self.errors = errors;
                true
            }
            ("count" | "update" | "errors", _) => false,
            (_, value) => {
                self.extra.insert(name.clone(), value);
                true
            }
        };

        if !accepted {
            tracing::warn!(field = %name, "Ignoring header field with unexpected type");
        }
        self
    }

    /// Merges loosely-typed header fields over the defaults
    pub fn from_fields(fields: Map<String, Value>) -> serde_json::Result<Self> {
        serde_json::from_value(Value::Object(fields))
    }
}
