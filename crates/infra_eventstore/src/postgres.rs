//! PostgreSQL event store
//!
//! All categories share the `events` table. The unique `(stream_id,
//! version)` constraint is the final arbiter of optimistic concurrency: two
//! writers that both pass the version check race on the insert, and the
//! loser's unique violation is reported as a concurrency conflict.
//!
//! Commit and projection dispatch happen under one lock per store, so the
//! projections of this process see a stream's envelopes in version order.

use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

use core_kernel::{DomainEvent, DomainPort, EventEnvelope, EventStore, PortError};

use crate::error::StoreError;
use crate::projection::{dispatch, Projection};

#[derive(Debug, FromRow)]
struct EventRow {
    stream_id: Uuid,
    version: i64,
    event_type: String,
    payload: serde_json::Value,
    occurred_at: DateTime<Utc>,
}

impl EventRow {
    fn into_envelope<E: DomainEvent>(self) -> Result<EventEnvelope<E>, PortError> {
        let version = u64::try_from(self.version)
            .map_err(|_| StoreError::CorruptRow(format!("negative version {}", self.version)))?;
        let payload: E = serde_json::from_value(self.payload)?;
        Ok(EventEnvelope {
            stream_id: self.stream_id,
            version,
            event_type: self.event_type,
            payload,
            occurred_at: self.occurred_at,
        })
    }
}

/// Event store backed by PostgreSQL
pub struct PgEventStore<E: DomainEvent> {
    pool: PgPool,
    projections: Vec<Arc<dyn Projection<E>>>,
    commit_lock: Mutex<()>,
    _events: PhantomData<fn() -> E>,
}

impl<E: DomainEvent> PgEventStore<E> {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            projections: Vec::new(),
            commit_lock: Mutex::new(()),
            _events: PhantomData,
        }
    }

    /// Registers a projection updated after every commit
    pub fn with_projection(mut self, projection: Arc<dyn Projection<E>>) -> Self {
        self.projections.push(projection);
        self
    }

    pub fn projections(&self) -> &[Arc<dyn Projection<E>>] {
        &self.projections
    }

    async fn current_version(
        conn: &mut sqlx::PgConnection,
        stream_id: Uuid,
    ) -> Result<u64, PortError> {
        let version: i64 =
            sqlx::query_scalar("SELECT COALESCE(MAX(version), 0) FROM events WHERE stream_id = $1")
                .bind(stream_id)
                .fetch_one(conn)
                .await
                .map_err(StoreError::from)?;
        u64::try_from(version)
            .map_err(|_| StoreError::CorruptRow(format!("negative version {}", version)).into())
    }
}

impl<E: DomainEvent> DomainPort for PgEventStore<E> {}

fn to_db_version(version: u64) -> Result<i64, PortError> {
    i64::try_from(version).map_err(|_| PortError::internal(format!("version {} out of range", version)))
}

#[async_trait]
impl<E: DomainEvent> EventStore<E> for PgEventStore<E> {
    async fn append(
        &self,
        stream_id: Uuid,
        expected_version: u64,
        events: Vec<E>,
    ) -> Result<u64, PortError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StoreError::TransactionFailed(e.to_string()))?;

        let current = Self::current_version(&mut *tx, stream_id).await?;
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

        for envelope in &envelopes {
            let payload = serde_json::to_value(&envelope.payload)?;
            let inserted = sqlx::query(
                r#"
                INSERT INTO events (stream_id, stream_category, version, event_type, payload, occurred_at)
                VALUES ($1, $2, $3, $4, $5, $6)
                "#,
            )
            .bind(stream_id)
            .bind(E::STREAM_CATEGORY)
            .bind(to_db_version(envelope.version)?)
            .bind(&envelope.event_type)
            .bind(payload)
            .bind(envelope.occurred_at)
            .execute(&mut *tx)
            .await;

            if let Err(error) = inserted {
                let error = StoreError::from(error);
                if error.is_duplicate() {
                    // the failed insert aborted the transaction
                    drop(tx);
                    let actual = self
                        .stream_version(stream_id)
                        .await
                        .unwrap_or(expected_version + 1);
                    warn!(%stream_id, expected = expected_version, "Lost append race");
                    return Err(PortError::conflict(stream_id, expected_version, actual));
                }
                return Err(error.into());
            }
        }

        let committed = self.commit_lock.lock().await;
        tx.commit()
            .await
            .map_err(|e| StoreError::TransactionFailed(e.to_string()))?;

        let new_version = current + envelopes.len() as u64;
        dispatch(&self.projections, &envelopes);
        drop(committed);

        info!(
            %stream_id,
            category = E::STREAM_CATEGORY,
            version = new_version,
            "Committed events"
        );
        Ok(new_version)
    }

    async fn load(&self, stream_id: Uuid) -> Result<Vec<EventEnvelope<E>>, PortError> {
        let rows: Vec<EventRow> = sqlx::query_as(
            r#"
            SELECT stream_id, version, event_type, payload, occurred_at
            FROM events
            WHERE stream_id = $1
            ORDER BY version ASC
            "#,
        )
        .bind(stream_id)
        .fetch_all(&self.pool)
        .await
        .map_err(StoreError::from)?;

        debug!(%stream_id, events = rows.len(), "Loaded stream");
        rows.into_iter().map(EventRow::into_envelope::<E>).collect()
    }

    async fn load_all(&self) -> Result<Vec<EventEnvelope<E>>, PortError> {
        let rows: Vec<EventRow> = sqlx::query_as(
            r#"
            SELECT stream_id, version, event_type, payload, occurred_at
            FROM events
            WHERE stream_category = $1
            ORDER BY global_position ASC
            "#,
        )
        .bind(E::STREAM_CATEGORY)
        .fetch_all(&self.pool)
        .await
        .map_err(StoreError::from)?;

        rows.into_iter().map(EventRow::into_envelope::<E>).collect()
    }

    async fn stream_version(&self, stream_id: Uuid) -> Result<u64, PortError> {
        let mut conn = self.pool.acquire().await.map_err(StoreError::from)?;
        Self::current_version(&mut conn, stream_id).await
    }
}
