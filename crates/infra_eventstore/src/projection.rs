//! Projection engine
//!
//! A projection maps committed envelopes onto read-model rows. Handlers are
//! synchronous and idempotent: every row remembers the last stream version
//! it absorbed and ignores envelopes at or below it, so re-delivery of the
//! same envelope is a no-op. An envelope that arrives ahead of its
//! predecessor waits for it.

use std::sync::Arc;

use tracing::info;

use core_kernel::{DomainEvent, EventEnvelope, EventStore, PortError};

/// A read model fed from one event category
pub trait Projection<E: DomainEvent>: Send + Sync {
    /// Stable name, used in logs
    fn name(&self) -> &'static str;

    /// Applies one committed envelope
    ///
    /// Returns `true` when the read model changed, `false` when the envelope
    /// was already applied or is held until an earlier version arrives.
    fn apply(&self, envelope: &EventEnvelope<E>) -> bool;

    /// Drops every row
    fn reset(&self);
}

/// Applies a batch of envelopes to every projection, in order
pub(crate) fn dispatch<E: DomainEvent>(
    projections: &[Arc<dyn Projection<E>>],
    envelopes: &[EventEnvelope<E>],
) {
    for envelope in envelopes {
        for projection in projections {
            projection.apply(envelope);
        }
    }
}

/// Clears the projections and replays the whole log into them
///
/// Returns the number of envelopes replayed.
pub async fn rebuild<E, S>(
    store: &S,
    projections: &[Arc<dyn Projection<E>>],
) -> Result<usize, PortError>
where
    E: DomainEvent,
    S: EventStore<E> + ?Sized,
{
    let log = store.load_all().await?;
    for projection in projections {
        projection.reset();
    }
    dispatch(projections, &log);

    info!(
        category = E::STREAM_CATEGORY,
        events = log.len(),
        projections = projections.len(),
        "Rebuilt projections"
    );
    Ok(log.len())
}
