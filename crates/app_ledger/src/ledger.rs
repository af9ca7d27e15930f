//! Composition root
//!
//! Builds the stores, registers the projections on them and hands out the
//! command and query sides sharing those projections. A ledger opened over
//! an existing log rebuilds its read models before it is handed out.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{info, warn};
use uuid::Uuid;

use core_kernel::{DomainEvent, EventEnvelope, EventStore, PortError};
use domain_investment::{Investment, InvestmentEvent};
use domain_portfolio::{Portfolio, PortfolioEvent};
use infra_eventstore::read_models::{InvestmentProjection, PortfolioProjection, PortfolioTotalsProjection};
use infra_eventstore::{
    connect_pool, rebuild, DatabasePool, InMemoryEventStore, PgEventStore, Projection,
};

use crate::commands::{InvestmentCommands, PortfolioCommands};
use crate::config::{LedgerConfig, StoreBackend};
use crate::error::LedgerError;
use crate::queries::LedgerQueries;

/// Number of events replayed per category by [`Ledger::rebuild_projections`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplayCounts {
    pub portfolio_events: usize,
    pub investment_events: usize,
}

/// A stream that cannot be turned back into its aggregate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamFailure {
    pub stream_id: Uuid,
    pub category: &'static str,
    pub reason: String,
}

/// Outcome of [`Ledger::verify_streams`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamReport {
    pub streams: usize,
    pub events: usize,
    pub failures: Vec<StreamFailure>,
}

impl StreamReport {
    pub fn is_healthy(&self) -> bool {
        self.failures.is_empty()
    }
}

struct Projections {
    portfolios: Arc<PortfolioProjection>,
    investments: Arc<InvestmentProjection>,
    totals: Arc<PortfolioTotalsProjection>,
}

impl Projections {
    fn new() -> Self {
        Self {
            portfolios: PortfolioProjection::shared(),
            investments: InvestmentProjection::shared(),
            totals: PortfolioTotalsProjection::shared(),
        }
    }

    fn portfolio_side(&self) -> Vec<Arc<dyn Projection<PortfolioEvent>>> {
        vec![self.portfolios.clone() as Arc<dyn Projection<PortfolioEvent>>]
    }

    fn investment_side(&self) -> Vec<Arc<dyn Projection<InvestmentEvent>>> {
        vec![
            self.investments.clone() as Arc<dyn Projection<InvestmentEvent>>,
            self.totals.clone() as Arc<dyn Projection<InvestmentEvent>>,
        ]
    }
}

/// A wired ledger
pub struct Ledger {
    portfolio_store: Arc<dyn EventStore<PortfolioEvent>>,
    investment_store: Arc<dyn EventStore<InvestmentEvent>>,
    portfolio_projections: Vec<Arc<dyn Projection<PortfolioEvent>>>,
    investment_projections: Vec<Arc<dyn Projection<InvestmentEvent>>>,
    portfolios: PortfolioCommands,
    investments: InvestmentCommands,
    queries: LedgerQueries,
}

impl Ledger {
    /// A ledger whose log lives in process memory, starting empty
    pub fn in_memory() -> Self {
        Self::with_memory_stores(InMemoryEventStore::new(), InMemoryEventStore::new())
    }

    /// A ledger over in-memory logs that may already hold events
    pub async fn open_in_memory(
        portfolio_log: InMemoryEventStore<PortfolioEvent>,
        investment_log: InMemoryEventStore<InvestmentEvent>,
    ) -> Result<Self, LedgerError> {
        let ledger = Self::with_memory_stores(portfolio_log, investment_log);
        ledger.rebuild_projections().await?;
        Ok(ledger)
    }

    fn with_memory_stores(
        mut portfolio_store: InMemoryEventStore<PortfolioEvent>,
        mut investment_store: InMemoryEventStore<InvestmentEvent>,
    ) -> Self {
        let projections = Projections::new();
        for projection in projections.portfolio_side() {
            portfolio_store = portfolio_store.with_projection(projection);
        }
        for projection in projections.investment_side() {
            investment_store = investment_store.with_projection(projection);
        }
        Self::assemble(Arc::new(portfolio_store), Arc::new(investment_store), projections)
    }

    /// A ledger backed by PostgreSQL, with read models rebuilt from the log
    pub async fn postgres(pool: DatabasePool) -> Result<Self, LedgerError> {
        let projections = Projections::new();
        let mut portfolio_store = PgEventStore::new(pool.clone());
        for projection in projections.portfolio_side() {
            portfolio_store = portfolio_store.with_projection(projection);
        }
        let mut investment_store = PgEventStore::new(pool);
        for projection in projections.investment_side() {
            investment_store = investment_store.with_projection(projection);
        }
        let ledger =
            Self::assemble(Arc::new(portfolio_store), Arc::new(investment_store), projections);

        let counts = ledger.rebuild_projections().await?;
        info!(
            portfolio_events = counts.portfolio_events,
            investment_events = counts.investment_events,
            "Read models rebuilt from the log"
        );
        Ok(ledger)
    }

    /// Builds the ledger for the configured backend
    ///
    /// For PostgreSQL this connects, applies pending migrations and rebuilds
    /// the read models before returning.
    pub async fn connect(config: &LedgerConfig) -> Result<Self, LedgerError> {
        match config.store_backend {
            StoreBackend::Memory => {
                info!("Using in-memory event store");
                Ok(Self::in_memory())
            }
            StoreBackend::Postgres => {
                let pool = connect_pool(&config.database_config())
                    .await
                    .map_err(PortError::from)?;
                Self::postgres(pool).await
            }
        }
    }

    fn assemble(
        portfolio_store: Arc<dyn EventStore<PortfolioEvent>>,
        investment_store: Arc<dyn EventStore<InvestmentEvent>>,
        projections: Projections,
    ) -> Self {
        Self {
            portfolios: PortfolioCommands::new(portfolio_store.clone()),
            investments: InvestmentCommands::new(investment_store.clone(), portfolio_store.clone()),
            queries: LedgerQueries::new(
                projections.portfolios.clone(),
                projections.investments.clone(),
                projections.totals.clone(),
            ),
            portfolio_projections: projections.portfolio_side(),
            investment_projections: projections.investment_side(),
            portfolio_store,
            investment_store,
        }
    }

    /// Clears every read model and replays both logs into them
    pub async fn rebuild_projections(&self) -> Result<ReplayCounts, LedgerError> {
        let portfolio_events =
            rebuild(self.portfolio_store.as_ref(), &self.portfolio_projections).await?;
        let investment_events =
            rebuild(self.investment_store.as_ref(), &self.investment_projections).await?;
        Ok(ReplayCounts {
            portfolio_events,
            investment_events,
        })
    }

    /// Replays every stream of both logs through its aggregate
    ///
    /// A stream fails when its versions are not contiguous from 1 or when
    /// the aggregate rejects its event sequence.
    pub async fn verify_streams(&self) -> Result<StreamReport, LedgerError> {
        let mut report = StreamReport::default();
        let portfolio_log = self.portfolio_store.load_all().await?;
        check_streams(&mut report, portfolio_log, |events| {
            Portfolio::from_events(events).map(|_| ()).map_err(|e| e.to_string())
        });
        let investment_log = self.investment_store.load_all().await?;
        check_streams(&mut report, investment_log, |events| {
            Investment::from_events(events).map(|_| ()).map_err(|e| e.to_string())
        });

        if report.is_healthy() {
            info!(streams = report.streams, events = report.events, "All streams replay");
        } else {
            warn!(
                streams = report.streams,
                failures = report.failures.len(),
                "Some streams do not replay"
            );
        }
        Ok(report)
    }

    pub fn portfolios(&self) -> &PortfolioCommands {
        &self.portfolios
    }

    pub fn investments(&self) -> &InvestmentCommands {
        &self.investments
    }

    pub fn queries(&self) -> &LedgerQueries {
        &self.queries
    }
}

fn check_streams<E, F>(report: &mut StreamReport, log: Vec<EventEnvelope<E>>, replay: F)
where
    E: DomainEvent,
    F: Fn(&[E]) -> Result<(), String>,
{
    report.events += log.len();
    let mut order = Vec::new();
    let mut streams: HashMap<Uuid, Vec<EventEnvelope<E>>> = HashMap::new();
    for envelope in log {
        let stream = streams.entry(envelope.stream_id).or_insert_with(|| {
            order.push(envelope.stream_id);
            Vec::new()
        });
        stream.push(envelope);
    }

    for stream_id in order {
        let Some(mut envelopes) = streams.remove(&stream_id) else {
            continue;
        };
        report.streams += 1;
        envelopes.sort_by_key(|envelope| envelope.version);

        let gap = envelopes
            .iter()
            .zip(1u64..)
            .map(|(envelope, expected)| (expected, envelope.version))
            .find(|(expected, found)| found != expected);
        let outcome = match gap {
            Some((expected, found)) => Err(format!(
                "expected version {} but found {}",
                expected, found
            )),
            None => {
                let events: Vec<E> =
                    envelopes.into_iter().map(|envelope| envelope.payload).collect();
                replay(&events)
            }
        };
        if let Err(reason) = outcome {
            report.failures.push(StreamFailure {
                stream_id,
                category: E::STREAM_CATEGORY,
                reason,
            });
        }
    }
}
