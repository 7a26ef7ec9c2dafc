use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StatusConfig {
    /// Prefix for status event names (`<event_prefix>/<entity type>`)
    #[serde(default)]
    pub event_prefix: String,
}

impl StatusConfig {
    pub fn new(event_prefix: impl Into<String>) -> Self {
        Self {
            event_prefix: event_prefix.into(),
        }
    }
}
