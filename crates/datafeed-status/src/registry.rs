use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::config::StatusConfig;
use crate::error::Result;
use crate::executor::Executor;
use crate::protocol::{self, StatusNotification};
use crate::sink::StatusSink;
use crate::state::{ClientState, Connection, EntityState, Timestamps};

/// Upper bound on executor turns a flush waits for callers to go quiet
const MAX_SETTLE_TURNS: usize = 16;

/// Registry of status clients
///
/// Cheap to clone; all clones share the same clients. Every mutation
/// happens under one lock, so registration, ingestion, close handling and
/// flushing never interleave mid-update.
///
/// Flushes and close watchers run on a single-threaded executor owned by
/// the registry, so coalescing does not depend on the caller's runtime.
#[derive(Clone)]
pub struct StatusRegistry {
    inner: Arc<Inner>,
}

struct Inner {
    config: StatusConfig,
    state: Mutex<RegistryState>,
    executor: Executor,
    flushes: mpsc::UnboundedSender<FlushRequest>,
    /// Bumped by every `record_timestamp_changes` call
    records: Arc<AtomicU64>,
}

struct FlushRequest {
    client_id: String,
    entity_type: String,
}

#[derive(Default)]
struct RegistryState {
    clients: HashMap<String, ClientState>,
    /// Process-wide event id, shared by all clients and entity types
    last_event_id: u64,
    last_generation: u64,
}

impl RegistryState {
    fn client_mut(&mut self, client_id: &str) -> &mut ClientState {
        self.clients
            .entry(client_id.to_string())
            .or_insert_with(|| ClientState::new(client_id))
    }
}

impl StatusRegistry {
    /// Creates a registry and starts its executor thread
    pub fn new(config: StatusConfig) -> Result<Self> {
        let executor = Executor::start("datafeed-status")?;
        let (flushes, requests) = mpsc::unbounded_channel();
        let records = Arc::new(AtomicU64::new(0));

        let inner = Arc::new(Inner {
            config,
            state: Mutex::new(RegistryState::default()),
            executor,
            flushes,
            records: Arc::clone(&records),
        });
        inner
            .executor
            .spawn(flush_loop(Arc::downgrade(&inner), requests, records));

        Ok(Self { inner })
    }

    pub fn event_prefix(&self) -> &str {
        &self.inner.config.event_prefix
    }

    /// Registers status events for an entity type.
    ///
    /// No-op if the client already registered the entity type. Only the
    /// timestamp names in `times` signal changes for the entity type; their
    /// values may be zero placeholders.
    pub fn register_entity_type(&self, client_id: &str, entity_type: &str, times: &Timestamps) {
        let mut state = self.lock();
        let client = state.client_mut(client_id);

        if !client.is_connected() {
            tracing::info!(
                client_id = %client.client_id,
                entity_type = %entity_type,
                "Registering entity type, no status connection for client"
            );
        }

        client
            .entity_states
            .entry(entity_type.to_string())
            .or_insert_with(|| EntityState::new(entity_type, times.clone()));
    }

    /// Records timestamp changes for every client and registered entity type.
    ///
    /// Never blocks on I/O. Each entity type that ends up with pending
    /// changes gets one deferred flush; changes recorded before that flush
    /// runs are merged into the same event. The flush waits until calls
    /// stop arriving, so back-to-back calls from one synchronous turn
    /// produce a single event on any runtime.
    pub fn record_timestamp_changes(&self, superseded: &Timestamps) {
        if superseded.is_empty() {
            return;
        }
        self.inner.records.fetch_add(1, Ordering::AcqRel);

        let mut state = self.lock();
        for (client_id, client) in state.clients.iter_mut() {
            for (entity_type, entity) in client.entity_states.iter_mut() {
                entity.stage(superseded);
                if entity.has_pending() && !entity.flush_scheduled {
                    entity.flush_scheduled = self.schedule_flush(client_id, entity_type);
                }
            }
        }
    }

    /// Binds a live status connection to a client and writes the preamble.
    ///
    /// A connection already bound to the client is replaced; its close no
    /// longer affects the client.
    pub fn status_connect(&self, client_id: &str, sink: Arc<dyn StatusSink>) -> Result<()> {
        sink.disable_idle_timeout();
        protocol::write_preamble(sink.as_ref())?;

        let mut state = self.lock();
        state.last_generation += 1;
        let generation = state.last_generation;
        let close_watch = self.watch_close(client_id, generation, Arc::clone(&sink));

        let client = state.client_mut(client_id);
        if let Some(previous) = client.connection.take() {
            tracing::info!(
                client_id = %client_id,
                "Entity status request from client, request already active"
            );
            previous.deregister();
        }

        client.connection = Some(Connection {
            sink,
            generation,
            close_watch,
        });

        tracing::info!(client_id = %client_id, generation, "Status connection opened");
        Ok(())
    }

    pub fn client_count(&self) -> usize {
        self.lock().clients.len()
    }

    pub fn connected_count(&self) -> usize {
        self.lock()
            .clients
            .values()
            .filter(|client| client.is_connected())
            .count()
    }

    pub fn is_connected(&self, client_id: &str) -> bool {
        self.lock()
            .clients
            .get(client_id)
            .is_some_and(ClientState::is_connected)
    }

    /// Acknowledged timestamps of a registered entity type
    pub fn entity_times(&self, client_id: &str, entity_type: &str) -> Option<Timestamps> {
        self.with_entity(client_id, entity_type, |entity| entity.times.clone())
    }

    /// Changes staged but not yet sent for a registered entity type
    pub fn pending_changes(&self, client_id: &str, entity_type: &str) -> Option<Timestamps> {
        self.with_entity(client_id, entity_type, |entity| entity.superseded.clone())
            .flatten()
    }

    fn with_entity<T>(
        &self,
        client_id: &str,
        entity_type: &str,
        f: impl FnOnce(&EntityState) -> T,
    ) -> Option<T> {
        let state = self.lock();
        state
            .clients
            .get(client_id)
            .and_then(|client| client.entity_states.get(entity_type))
            .map(f)
    }

    fn lock(&self) -> MutexGuard<'_, RegistryState> {
        self.inner.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Queues a flush on the executor; returns whether it was queued
    fn schedule_flush(&self, client_id: &str, entity_type: &str) -> bool {
        let request = FlushRequest {
            client_id: client_id.to_string(),
            entity_type: entity_type.to_string(),
        };

        match self.inner.flushes.send(request) {
            Ok(()) => true,
            Err(_) => {
                tracing::warn!(client_id = %client_id, "Status executor stopped, changes left pending");
                false
            }
        }
    }

    /// Sends the pending changes of one entity type, if the client is connected
    fn flush(&self, client_id: &str, entity_type: &str) {
        let mut state = self.lock();
        let RegistryState {
            clients,
            last_event_id,
            ..
        } = &mut *state;

        let Some(client) = clients.get_mut(client_id) else {
            return;
        };
        let Some(entity) = client.entity_states.get_mut(entity_type) else {
            return;
        };
        entity.flush_scheduled = false;

        // without a connection the changes stay pending until the next change
        let Some(connection) = client.connection.as_ref() else {
            tracing::debug!(
                client_id = %client.client_id,
                entity_type = %entity.entity_type,
                "No status connection, changes left pending"
            );
            return;
        };
        let Some(superseded) = entity.take_superseded() else {
            return;
        };

        *last_event_id += 1;
        let notification = StatusNotification::new(
            &self.inner.config.event_prefix,
            &entity.entity_type,
            *last_event_id,
            superseded,
        );

        match protocol::write_notification(connection.sink.as_ref(), &notification) {
            Ok(()) => tracing::debug!(
                client_id = %client.client_id,
                event = %notification.event,
                id = notification.id,
                "Status event sent"
            ),
            Err(e) => tracing::warn!(
                client_id = %client.client_id,
                event = %notification.event,
                "Failed to write status event: {}",
                e
            ),
        }
    }

    /// Clears the client's connection once `sink` closes, unless a newer
    /// connection replaced it in the meantime
    fn watch_close(
        &self,
        client_id: &str,
        generation: u64,
        sink: Arc<dyn StatusSink>,
    ) -> JoinHandle<()> {
        let registry: Weak<Inner> = Arc::downgrade(&self.inner);
        let client_id = client_id.to_string();

        self.inner.executor.spawn(async move {
            sink.closed().await;
            if let Some(inner) = registry.upgrade() {
                StatusRegistry { inner }.connection_closed(&client_id, generation);
            }
        })
    }

    fn connection_closed(&self, client_id: &str, generation: u64) {
        let mut state = self.lock();
        let Some(client) = state.clients.get_mut(client_id) else {
            return;
        };

        let current = client
            .connection
            .as_ref()
            .is_some_and(|connection| connection.generation == generation);
        if current {
            // entity states are kept for the next connection
            client.connection = None;
            tracing::info!(client_id = %client_id, generation, "Status connection closed");
        } else {
            tracing::debug!(
                client_id = %client_id,
                generation,
                "Ignoring close of a replaced status connection"
            );
        }
    }
}

/// Runs queued flushes on the registry's executor
///
/// After the first request of a batch it keeps yielding while
/// `record_timestamp_changes` calls are still coming in, so one caller's
/// burst of calls ends up in one event per entity type.
async fn flush_loop(
    owner: Weak<Inner>,
    mut requests: mpsc::UnboundedReceiver<FlushRequest>,
    records: Arc<AtomicU64>,
) {
    while let Some(first) = requests.recv().await {
        let mut batch = vec![first];

        for _ in 0..MAX_SETTLE_TURNS {
            let seen = records.load(Ordering::Acquire);
            tokio::task::yield_now().await;
            while let Ok(request) = requests.try_recv() {
                batch.push(request);
            }
            if records.load(Ordering::Acquire) == seen {
                break;
            }
        }

        let Some(inner) = owner.upgrade() else {
            return;
        };
        let registry = StatusRegistry { inner };
        for request in batch {
            registry.flush(&request.client_id, &request.entity_type);
        }
    }
}
