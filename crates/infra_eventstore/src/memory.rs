//! In-memory event store
//!
//! Used by tests and the single-process replay tool. One mutex guards the
//! streams, the global log and the projection updates, so an append and its
//! read-model effects form a single unit of work.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{debug, warn};
use uuid::Uuid;

use core_kernel::{DomainEvent, DomainPort, EventEnvelope, EventStore, PortError};

use crate::projection::{dispatch, Projection};

struct Log<E> {
    streams: HashMap<Uuid, Vec<EventEnvelope<E>>>,
    all: Vec<EventEnvelope<E>>,
}

/// Event store held entirely in memory
pub struct InMemoryEventStore<E: DomainEvent> {
    log: Mutex<Log<E>>,
    projections: Vec<Arc<dyn Projection<E>>>,
}

impl<E: DomainEvent> InMemoryEventStore<E> {
    pub fn new() -> Self {
        Self {
            log: Mutex::new(Log {
                streams: HashMap::new(),
                all: Vec::new(),
            }),
            projections: Vec::new(),
        }
    }

    /// Registers a projection updated on every append
    pub fn with_projection(mut self, projection: Arc<dyn Projection<E>>) -> Self {
        self.projections.push(projection);
        self
    }

    pub fn projections(&self) -> &[Arc<dyn Projection<E>>] {
        &self.projections
    }

    /// Number of committed events across all streams
    pub async fn len(&self) -> usize {
        self.log.lock().await.all.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl<E: DomainEvent> Default for InMemoryEventStore<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: DomainEvent> DomainPort for InMemoryEventStore<E> {}

#[async_trait]
impl<E: DomainEvent> EventStore<E> for InMemoryEventStore<E> {
    async fn append(
        &self,
        stream_id: Uuid,
        expected_version: u64,
        events: Vec<E>,
    ) -> Result<u64, PortError> {
        let mut log = self.log.lock().await;

        let current = log.streams.get(&stream_id).map_or(0, |s| s.len() as u64);
        if current != expected_version {
            warn!(
                %stream_id,
                expected = expected_version,
                actual = current,
                "Rejected append: stale expected version"
            );
            return Err(PortError::conflict(stream_id, expected_version, current));
        }
        if events.is_empty() {
            return Ok(current);
        }

        let envelopes: Vec<EventEnvelope<E>> = (current + 1..)
            .zip(events)
            .map(|(version, event)| EventEnvelope::new(stream_id, version, event))
            .collect();
        let new_version = current + envelopes.len() as u64;

        log.streams
            .entry(stream_id)
            .or_default()
            .extend(envelopes.iter().cloned());
        log.all.extend(envelopes.iter().cloned());
        dispatch(&self.projections, &envelopes);

        debug!(
            %stream_id,
            category = E::STREAM_CATEGORY,
            version = new_version,
            "Appended events"
        );
        Ok(new_version)
    }

    async fn load(&self, stream_id: Uuid) -> Result<Vec<EventEnvelope<E>>, PortError> {
        let log = self.log.lock().await;
        Ok(log.streams.get(&stream_id).cloned().unwrap_or_default())
    }

    async fn load_all(&self) -> Result<Vec<EventEnvelope<E>>, PortError> {
        Ok(self.log.lock().await.all.clone())
    }

    async fn stream_version(&self, stream_id: Uuid) -> Result<u64, PortError> {
        let log = self.log.lock().await;
        Ok(log.streams.get(&stream_id).map_or(0, |s| s.len() as u64))
    }
}
