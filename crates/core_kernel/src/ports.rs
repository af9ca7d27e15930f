//! Event Store Port
//!
//! Aggregates in this system are persisted as ordered streams of immutable
//! events. This module defines the port every persistence adapter implements,
//! following the hexagonal (ports and adapters) layout:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                   Command Handlers                           │
//! │        (load stream -> decide -> append -> project)          │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    EventStore<E> port                        │
//! │   append(stream, expected_version, events) / load(stream)    │
//! └─────────────────────────────────────────────────────────────┘
//!                    ▲                         ▲
//!                    │                         │
//!         ┌─────────┴─────────┐     ┌────────┴────────┐
//!         │  In-memory store  │     │ PostgreSQL store │
//!         └───────────────────┘     └──────────────────┘
//! ```
//!
//! # Versioning
//!
//! A stream's version is the number of events it holds. An append declares
//! the version it expects the stream to be at; if another writer got there
//! first the append fails with [`PortError::ConcurrencyConflict`] and the
//! caller is expected to reload and retry.

use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Error type for port operations
///
/// Provides a unified error type that all store implementations must use.
/// Concurrency conflicts are a distinct variant so callers can tell a lost
/// race apart from an infrastructure failure.
#[derive(Debug, Error)]
pub enum PortError {
    /// The requested stream or row was not found
    #[error("Not found: {entity_type} with id {id}")]
    NotFound {
        entity_type: String,
        id: String,
    },

    /// The stream moved past the version the writer expected
    #[error("Concurrency conflict on stream {stream_id}: expected version {expected}, found {actual}")]
    ConcurrencyConflict {
        stream_id: Uuid,
        expected: u64,
        actual: u64,
    },

    /// Connection to the underlying system failed
    #[error("Connection error: {message}")]
    Connection {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// An event payload could not be encoded or decoded
    #[error("Serialization error: {message}")]
    Serialization {
        message: String,
    },

    /// An internal error occurred
    #[error("Internal error: {message}")]
    Internal {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl PortError {
    /// Creates a NotFound error
    pub fn not_found(entity_type: impl Into<String>, id: impl fmt::Display) -> Self {
        PortError::NotFound {
            entity_type: entity_type.into(),
            id: id.to_string(),
        }
    }

    /// Creates a ConcurrencyConflict error
    pub fn conflict(stream_id: Uuid, expected: u64, actual: u64) -> Self {
        PortError::ConcurrencyConflict {
            stream_id,
            expected,
            actual,
        }
    }

    /// Creates a Connection error
    pub fn connection(message: impl Into<String>) -> Self {
        PortError::Connection {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a Serialization error
    pub fn serialization(message: impl Into<String>) -> Self {
        PortError::Serialization {
            message: message.into(),
        }
    }

    /// Creates an Internal error
    pub fn internal(message: impl Into<String>) -> Self {
        PortError::Internal {
            message: message.into(),
            source: None,
        }
    }

    /// Returns true if this error indicates a transient infrastructure failure
    pub fn is_transient(&self) -> bool {
        matches!(self, PortError::Connection { .. })
    }

    /// Returns true if the append lost an optimistic concurrency race
    pub fn is_concurrency_conflict(&self) -> bool {
        matches!(self, PortError::ConcurrencyConflict { .. })
    }

    /// Returns true if this error indicates the entity was not found
    pub fn is_not_found(&self) -> bool {
        matches!(self, PortError::NotFound { .. })
    }
}

impl From<serde_json::Error> for PortError {
    fn from(error: serde_json::Error) -> Self {
        PortError::serialization(error.to_string())
    }
}

/// Marker trait for all domain ports
///
/// All port traits extend this marker so they are thread-safe and usable
/// from async command handlers.
pub trait DomainPort: Send + Sync + 'static {}

/// An event type that can be stored in an event stream
///
/// Each aggregate defines one closed enum of events implementing this trait.
pub trait DomainEvent:
    Clone + fmt::Debug + Serialize + DeserializeOwned + Send + Sync + 'static
{
    /// Stable category name of the streams holding these events
    const STREAM_CATEGORY: &'static str;

    /// Stable event type name, persisted alongside the payload
    fn event_type(&self) -> &'static str;

    /// When the fact this event records happened
    fn occurred_at(&self) -> DateTime<Utc>;
}

/// A committed event together with its position in the stream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventEnvelope<E> {
    /// The stream (aggregate id) the event belongs to
    pub stream_id: Uuid,
    /// 1-based position in the stream
    pub version: u64,
    /// Event type name
    pub event_type: String,
    /// The event itself
    pub payload: E,
    /// When the recorded fact happened
    pub occurred_at: DateTime<Utc>,
}

impl<E: DomainEvent> EventEnvelope<E> {
    /// Wraps an event at the given stream position
    pub fn new(stream_id: Uuid, version: u64, payload: E) -> Self {
        Self {
            stream_id,
            version,
            event_type: payload.event_type().to_string(),
            occurred_at: payload.occurred_at(),
            payload,
        }
    }
}

/// Append-only, per-stream event log with optimistic versioning
#[async_trait]
pub trait EventStore<E: DomainEvent>: DomainPort {
    /// Appends events to a stream that is expected to be at `expected_version`
    ///
    /// Returns the stream version after the append. Appending an empty batch
    /// at the correct version is a no-op that returns that version.
    ///
    /// # Errors
    ///
    /// Returns [`PortError::ConcurrencyConflict`] if the stream is not at
    /// `expected_version`.
    async fn append(
        &self,
        stream_id: Uuid,
        expected_version: u64,
        events: Vec<E>,
    ) -> Result<u64, PortError>;

    /// Loads every event of a stream in version order
    ///
    /// An unknown stream yields an empty list.
    async fn load(&self, stream_id: Uuid) -> Result<Vec<EventEnvelope<E>>, PortError>;

    /// Loads every committed event across all streams in commit order
    async fn load_all(&self) -> Result<Vec<EventEnvelope<E>>, PortError>;

    /// Returns the current version of a stream (zero if it does not exist)
    async fn stream_version(&self, stream_id: Uuid) -> Result<u64, PortError> {
        let events = self.load(stream_id).await?;
        Ok(events.last().map(|e| e.version).unwrap_or(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conflict_is_distinct_from_transient() {
        let error = PortError::conflict(Uuid::new_v4(), 2, 3);
        assert!(error.is_concurrency_conflict());
        assert!(!error.is_transient());
        assert!(error.to_string().contains("expected version 2"));
    }

    #[test]
    fn test_connection_is_transient() {
        let error = PortError::connection("refused");
        assert!(error.is_transient());
        assert!(!error.is_not_found());
    }
}
