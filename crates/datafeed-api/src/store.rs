use async_trait::async_trait;
use datafeed_status::Timestamps;
use datafeed_stream::{DataSet, DataSource, StreamHeader};
use futures::stream;
use serde_json::{json, Map, Value};
use std::collections::{BTreeMap, HashMap};
use tokio::sync::{broadcast, RwLock};

const CHANGE_CHANNEL_SIZE: usize = 1024;

/// Emitted whenever a collection's timestamp moves forward
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimestampChanged {
    pub name: String,
    pub time: i64,
}

#[derive(Default)]
struct Collection {
    entities: BTreeMap<String, Value>,
    updated_at: i64,
}

/// In-memory entity store
///
/// One collection per entity type; each collection carries a timestamp
/// named after the entity type, advanced on every write.
pub struct MemoryStore {
    collections: RwLock<HashMap<String, Collection>>,
    changes: broadcast::Sender<TimestampChanged>,
}

impl MemoryStore {
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_SIZE);
        Self {
            collections: RwLock::new(HashMap::new()),
            changes,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TimestampChanged> {
        self.changes.subscribe()
    }

    /// Current timestamp of an entity type (0 if never written)
    pub async fn timestamp(&self, entity_type: &str) -> i64 {
        let collections = self.collections.read().await;
        collections
            .get(entity_type)
            .map(|c| c.updated_at)
            .unwrap_or(0)
    }

    /// Current timestamps of every collection
    pub async fn timestamps(&self) -> Timestamps {
        let collections = self.collections.read().await;
        collections
            .iter()
            .map(|(name, c)| (name.clone(), c.updated_at))
            .collect()
    }

    /// Inserts or replaces an entity, assigning `_id` when missing.
    ///
    /// Returns the entity id and the new collection timestamp.
    pub async fn upsert(&self, entity_type: &str, mut entity: Map<String, Value>) -> (String, i64) {
        let id = match entity.get("_id") {
            Some(Value::String(id)) => id.clone(),
            Some(other) => other.to_string(),
            None => uuid::Uuid::new_v4().to_string(),
        };
        entity.insert("_id".to_string(), json!(id));

        let time = {
            let mut collections = self.collections.write().await;
            let collection = collections.entry(entity_type.to_string()).or_default();
            // strictly increasing even within one millisecond
            let time = chrono::Utc::now()
                .timestamp_millis()
                .max(collection.updated_at + 1);
            collection.updated_at = time;
            collection.entities.insert(id.clone(), Value::Object(entity));
            time
        };

        // no subscribers is fine
        let _ = self.changes.send(TimestampChanged {
            name: entity_type.to_string(),
            time,
        });
        tracing::debug!(entity_type = %entity_type, id = %id, time, "Entity stored");

        (id, time)
    }

    pub async fn count(&self, entity_type: &str) -> usize {
        let collections = self.collections.read().await;
        collections
            .get(entity_type)
            .map(|c| c.entities.len())
            .unwrap_or(0)
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DataSource for MemoryStore {
    type Request = String;

    async fn get_data(&self, entity_type: String) -> anyhow::Result<DataSet> {
        let collections = self.collections.read().await;
        let (entities, updated_at) = match collections.get(&entity_type) {
            Some(c) => (c.entities.values().cloned().collect::<Vec<_>>(), c.updated_at),
            None => (Vec::new(), 0),
        };
        drop(collections);

        let header = StreamHeader::with_count(entities.len())
            .field("entityType", json!(entity_type))
            .field("timestamp", json!(updated_at));

        Ok(DataSet::new(header, stream::iter(entities.into_iter().map(Ok))))
    }
}
