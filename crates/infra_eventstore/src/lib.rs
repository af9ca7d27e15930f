//! Event Store Infrastructure
//!
//! Adapters for the [`core_kernel::EventStore`] port and the synchronous
//! projection engine that keeps the read models in step with every append.
//!
//! # Architecture
//!
//! - [`InMemoryEventStore`]: a single lock covers the stream check, the
//!   append and the projection updates, so a reader never sees a committed
//!   event that the read models have not absorbed
//! - [`PgEventStore`]: events live in one PostgreSQL table with a unique
//!   `(stream_id, version)` constraint; projections run after the
//!   transaction commits and before `append` returns
//!
//! Read models are denormalized rows keyed by aggregate id. They are never
//! the source of truth and can be rebuilt from the log with [`rebuild`].
//!
//! # Example
//!
//! ```rust,ignore
//! use infra_eventstore::{InMemoryEventStore, read_models::PortfolioProjection};
//!
//! let portfolios = Arc::new(PortfolioProjection::new());
//! let store = InMemoryEventStore::new().with_projection(portfolios.clone());
//! ```

pub mod error;
pub mod memory;
pub mod pool;
pub mod postgres;
pub mod projection;
pub mod read_models;

pub use error::StoreError;
pub use memory::InMemoryEventStore;
pub use pool::{connect_pool, run_migrations, DatabaseConfig, DatabasePool};
pub use postgres::PgEventStore;
pub use projection::{rebuild, Projection};
pub use read_models::{Page, Paged};
