//! Read models
//!
//! Denormalized views fed by projections. Each row carries the last stream
//! version it absorbed; envelopes at or below that version are skipped, and
//! envelopes that skip ahead are held until the gap is filled.

pub mod investment;
pub mod portfolio;
pub mod totals;

pub use investment::{InvestmentProjection, InvestmentReadModel};
pub use portfolio::{PortfolioProjection, PortfolioReadModel};
pub use totals::{PortfolioTotals, PortfolioTotalsProjection};

use std::collections::{BTreeMap, HashMap};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use core_kernel::{DomainEvent, EventEnvelope};

/// Offset pagination request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    pub offset: usize,
    pub limit: usize,
}

impl Page {
    pub const DEFAULT_LIMIT: usize = 50;

    pub fn new(offset: usize, limit: usize) -> Self {
        Self { offset, limit }
    }

    pub fn first(limit: usize) -> Self {
        Self { offset: 0, limit }
    }

    /// Cuts one page out of an already ordered list
    pub fn slice<T>(&self, items: Vec<T>) -> Paged<T> {
        let total = items.len();
        let items = items.into_iter().skip(self.offset).take(self.limit).collect();
        Paged { items, total }
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::first(Self::DEFAULT_LIMIT)
    }
}

/// One page of results and the size of the whole result set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Paged<T> {
    pub items: Vec<T>,
    pub total: usize,
}

impl<T> Paged<T> {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

// A panic while holding the lock leaves rows that are still individually
// consistent, so poisoning is ignored.
pub(crate) fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

pub(crate) fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

/// Releases a stream's envelopes strictly in version order
///
/// An envelope more than one version ahead of what the row has absorbed is
/// held back; once the missing version arrives it is released together with
/// every held successor.
#[derive(Debug)]
pub(crate) struct Sequencer<E: DomainEvent> {
    held: HashMap<Uuid, BTreeMap<u64, EventEnvelope<E>>>,
}

impl<E: DomainEvent> Default for Sequencer<E> {
    fn default() -> Self {
        Self {
            held: HashMap::new(),
        }
    }
}

impl<E: DomainEvent> Sequencer<E> {
    /// Envelopes ready to apply on top of `applied`, oldest first
    pub(crate) fn ready(&mut self, applied: u64, envelope: &EventEnvelope<E>) -> Vec<EventEnvelope<E>> {
        let stream_id = envelope.stream_id;
        if envelope.version <= applied {
            return Vec::new();
        }
        if envelope.version > applied + 1 {
            debug!(
                %stream_id,
                version = envelope.version,
                applied,
                "Holding envelope until the gap is filled"
            );
            self.held
                .entry(stream_id)
                .or_default()
                .entry(envelope.version)
                .or_insert_with(|| envelope.clone());
            return Vec::new();
        }

        let mut ready = vec![envelope.clone()];
        if let Some(held) = self.held.get_mut(&stream_id) {
            let mut next = envelope.version + 1;
            while let Some(successor) = held.remove(&next) {
                ready.push(successor);
                next += 1;
            }
            if held.is_empty() {
                self.held.remove(&stream_id);
            }
        }
        ready
    }

    /// Envelopes waiting on a missing version
    pub(crate) fn held(&self) -> usize {
        self.held.values().map(BTreeMap::len).sum()
    }

    pub(crate) fn clear(&mut self) {
        self.held.clear();
    }
}
