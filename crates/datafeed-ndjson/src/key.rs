use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Property used as the entity key when nothing else is configured
pub const DEFAULT_KEY_PROPERTY: &str = "_id";

/// Key access function: maps an entity to the key written in its NDJSON row
pub type KeyFn = Arc<dyn Fn(&Value) -> Value + Send + Sync>;

/// How an entity key is obtained
///
/// Resolved once into a [`KeyFn`] when an encoder or service is built.
#[derive(Clone)]
pub enum KeySpec {
    /// Read a property, optionally rendering the key as `"<prefix>.<value>"`
    Property {
        name: String,
        prefix: Option<String>,
    },
    /// Caller-supplied key function
    Function(KeyFn),
}

impl KeySpec {
    pub fn property(name: impl Into<String>) -> Self {
        Self::Property {
            name: name.into(),
            prefix: None,
        }
    }

    pub fn prefixed(name: impl Into<String>, prefix: impl Into<String>) -> Self {
        Self::Property {
            name: name.into(),
            prefix: Some(prefix.into()),
        }
    }

    pub fn function<F>(f: F) -> Self
    where
        F: Fn(&Value) -> Value + Send + Sync + 'static,
    {
        Self::Function(Arc::new(f))
    }

    pub fn resolve(self) -> KeyFn {
        match self {
            Self::Property { name, prefix } => make_key_fn(name, prefix),
            Self::Function(f) => f,
        }
    }
}

impl Default for KeySpec {
    fn default() -> Self {
        Self::property(DEFAULT_KEY_PROPERTY)
    }
}

impl fmt::Debug for KeySpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Property { name, prefix } => f
                .debug_struct("Property")
                .field("name", name)
                .field("prefix", prefix)
                .finish(),
            Self::Function(_) => f.write_str("Function(..)"),
        }
    }
}

/// Makes a key access function reading `property` from an entity.
///
/// Without a prefix the raw property value is the key (`null` when the
/// property is missing). With a prefix the key is the string
/// `"<prefix>.<value>"`, where string values are inserted verbatim and any
/// other value by its JSON text.
pub fn make_key_fn(property: impl Into<String>, prefix: Option<String>) -> KeyFn {
    let property = property.into();
    // an empty prefix counts as no prefix
    let prefix = prefix.filter(|p| !p.is_empty());

    Arc::new(move |entity: &Value| {
        let value = entity.get(&property).cloned().unwrap_or(Value::Null);
        match &prefix {
            None => value,
            Some(prefix) => {
                let rendered = match value {
                    Value::String(s) => s,
                    other => other.to_string(),
                };
                Value::String(format!("{}.{}", prefix, rendered))
            }
        }
    })
}
