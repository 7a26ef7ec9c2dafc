use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::task::JoinHandle;

use crate::sink::StatusSink;

/// Named timestamps: timestamp name -> time (epoch millis)
pub type Timestamps = BTreeMap<String, i64>;

/// Live status connection of a client
pub(crate) struct Connection {
    pub sink: Arc<dyn StatusSink>,
    /// Distinguishes this connection from earlier ones of the same client
    pub generation: u64,
    pub close_watch: JoinHandle<()>,
}

impl Connection {
    /// Stops watching for close; used when a newer connection takes over
    pub fn deregister(self) {
        self.close_watch.abort();
    }
}

pub(crate) struct ClientState {
    pub client_id: String,
    pub connection: Option<Connection>,
    pub entity_states: HashMap<String, EntityState>,
}

impl ClientState {
    pub fn new(client_id: &str) -> Self {
        Self {
            client_id: client_id.to_string(),
            connection: None,
            entity_states: HashMap::new(),
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connection.is_some()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct EntityState {
    pub entity_type: String,
    pub times: Timestamps,
    pub superseded: Option<Timestamps>,
    pub flush_scheduled: bool,
}

impl EntityState {
    pub fn new(entity_type: &str, times: Timestamps) -> Self {
        Self {
            entity_type: entity_type.to_string(),
            times,
            superseded: None,
            flush_scheduled: false,
        }
    }

    /// Stages every change to a registered timestamp that moves it forward.
    ///
    /// Names this entity type did not register and times not newer than
    /// the acknowledged ones are ignored.
    pub fn stage(&mut self, changes: &Timestamps) {
        for (name, &time) in changes {
            let Some(&acknowledged) = self.times.get(name) else {
                continue;
            };
            if time > acknowledged {
                self.superseded
                    .get_or_insert_with(Timestamps::new)
                    .insert(name.clone(), time);
            }
        }
    }

    pub fn has_pending(&self) -> bool {
        self.superseded.is_some()
    }

    /// Acknowledges the pending changes, returning them
    pub fn take_superseded(&mut self) -> Option<Timestamps> {
        let superseded = self.superseded.take()?;
        self.times
            .extend(superseded.iter().map(|(name, &time)| (name.clone(), time)));
        Some(superseded)
    }
}
