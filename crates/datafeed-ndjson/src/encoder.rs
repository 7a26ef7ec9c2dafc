use futures::{Stream, StreamExt};
use serde::Serialize;
use serde_json::Value;
use std::pin::Pin;

use crate::error::{NdjsonError, Result};
use crate::key::{KeyFn, KeySpec};

/// Input side of the encoder: entities delivered one at a time
pub type EntityStream = Pin<Box<dyn Stream<Item = anyhow::Result<Value>> + Send>>;

/// Output side of the encoder: one complete NDJSON line per item
pub type LineStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

/// Encodes a value as one NDJSON line (compact JSON plus a single `\n`)
pub fn encode_line<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    let mut line = serde_json::to_string(value)?;
    line.push('\n');
    Ok(line)
}

/// Streaming NDJSON encoder
///
/// Emits every prefix value as its own line, then one `[key, entity]` row
/// per input entity, then every suffix value once the input completes.
/// Each output item is exactly one line, so the transport never sees a
/// line split across chunks.
#[derive(Clone)]
pub struct NdjsonEncoder {
    key: KeyFn,
    prefixes: Vec<Value>,
    suffixes: Vec<Value>,
}

impl NdjsonEncoder {
    pub fn new(key: KeySpec) -> Self {
        Self::with_key_fn(key.resolve())
    }

    pub fn with_key_fn(key: KeyFn) -> Self {
        Self {
            key,
            prefixes: Vec::new(),
            suffixes: Vec::new(),
        }
    }

    /// Adds a value emitted before the entity rows (e.g. a header)
    pub fn prefix(mut self, value: Value) -> Self {
        self.prefixes.push(value);
        self
    }

    /// Adds a value emitted after the last entity row (e.g. a trailer)
    pub fn suffix(mut self, value: Value) -> Self {
        self.suffixes.push(value);
        self
    }

    pub fn prefixes(&self) -> &[Value] {
        &self.prefixes
    }

    pub fn suffixes(&self) -> &[Value] {
        &self.suffixes
    }

    /// Encodes a single entity row
    pub fn encode_entity(&self, entity: &Value) -> Result<String> {
        let key = (self.key)(entity);
        encode_line(&(key, entity))
    }

    /// Pipes `entities` through the encoder.
    ///
    /// An error from the entity stream is forwarded and ends the output;
    /// suffixes are only written after the input completed cleanly.
    pub fn encode<S>(self, entities: S) -> LineStream
    where
        S: Stream<Item = anyhow::Result<Value>> + Send + 'static,
    {
        Box::pin(async_stream::stream! {
            for prefix in &self.prefixes {
                yield encode_line(prefix);
            }

            let mut entities = Box::pin(entities);
            while let Some(item) = entities.next().await {
                match item {
                    Ok(entity) => yield self.encode_entity(&entity),
                    Err(e) => {
                        yield Err(NdjsonError::Source(e));
                        return;
                    }
                }
            }

            for suffix in &self.suffixes {
                yield encode_line(suffix);
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;
    use serde_json::json;

    async fn collect(lines: LineStream) -> Vec<Result<String>> {
        lines.collect().await
    }

    #[test]
    fn test_encode_line_is_compact() {
        let line = encode_line(&json!({"count": 1, "errors": []})).unwrap();
        assert_eq!(line, "{\"count\":1,\"errors\":[]}\n");
    }

    #[tokio::test]
    async fn test_prefix_rows_suffix_order() {
        let encoder = NdjsonEncoder::new(KeySpec::property("id"))
            .prefix(json!({"head": true}))
            .suffix(json!({"tail": true}));

        let input = stream::iter(vec![Ok(json!({"id": "a"})), Ok(json!({"id": "b"}))]);
        let lines: Vec<String> = collect(encoder.encode(input))
            .await
            .into_iter()
            .map(|l| l.unwrap())
            .collect();

        assert_eq!(
            lines,
            vec![
                "{\"head\":true}\n",
                "[\"a\",{\"id\":\"a\"}]\n",
                "[\"b\",{\"id\":\"b\"}]\n",
                "{\"tail\":true}\n",
            ]
        );
    }

    #[tokio::test]
    async fn test_empty_input_still_emits_prefix_and_suffix() {
        let encoder = NdjsonEncoder::new(KeySpec::default())
            .prefix(json!(1))
            .suffix(json!(2));
        let lines = collect(encoder.encode(stream::empty())).await;
        assert_eq!(lines.len(), 2);
    }

    #[tokio::test]
    async fn test_source_error_ends_output() {
        let encoder = NdjsonEncoder::new(KeySpec::default()).suffix(json!({"tail": true}));
        let input = stream::iter(vec![
            Ok(json!({"_id": "1"})),
            Err(anyhow::anyhow!("cursor lost")),
            Ok(json!({"_id": "2"})),
        ]);

        let lines = collect(encoder.encode(input)).await;
        assert_eq!(lines.len(), 2);
        assert!(lines[0].is_ok());
        assert!(matches!(lines[1], Err(NdjsonError::Source(_))));
    }
}
