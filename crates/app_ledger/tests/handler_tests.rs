//! Command handler tests against the in-memory ledger

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal_macros::dec;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use app_ledger::{
    AddInvestment, ClosePortfolio, CreatePortfolio, Ledger, LedgerError, PortfolioCommands,
    RenamePortfolio, SellInvestment, UpdateInvestmentValue, UpdatePortfolioDetails,
};
use core_kernel::{
    Currency, DomainEvent, DomainPort, EventEnvelope, EventStore, InvestmentId, OwnerId, PortError,
    PortfolioId, UserId,
};
use domain_investment::{AssetType, InvestmentError, InvestmentEvent, InvestmentStatus};
use domain_valuation::PricingConvention;
use domain_portfolio::{PortfolioError, PortfolioEvent};
use infra_eventstore::{InMemoryEventStore, Page};
use test_utils::{
    MoneyFixtures, SymbolFixtures, TemporalFixtures, TestInvestmentBuilder, TestPortfolioBuilder,
};

fn create_command(owner_id: OwnerId) -> CreatePortfolio {
    CreatePortfolio {
        owner_id,
        name: "Growth".to_string(),
        description: Some("Long term".to_string()),
        currency: Currency::USD,
    }
}

fn add_command(portfolio_id: PortfolioId) -> AddInvestment {
    AddInvestment {
        portfolio_id,
        symbol: SymbolFixtures::stock(),
        purchase_price: MoneyFixtures::usd_100(),
        pricing: PricingConvention::PerUnit,
        quantity: dec!(10),
        purchase_date: TemporalFixtures::purchase_date(),
    }
}

async fn ledger_with_investment() -> (Ledger, PortfolioId, InvestmentId) {
    let ledger = Ledger::in_memory();
    let cancel = CancellationToken::new();
    let portfolio_id = ledger
        .portfolios()
        .create(create_command(OwnerId::new()), &cancel)
        .await
        .unwrap();
    let investment_id = ledger
        .investments()
        .add(add_command(portfolio_id), &cancel)
        .await
        .unwrap();
    (ledger, portfolio_id, investment_id)
}

/// Lets another writer append a rename right before the first append
struct InterleavingStore {
    inner: InMemoryEventStore<PortfolioEvent>,
    interleaved: AtomicBool,
}

impl DomainPort for InterleavingStore {}

#[async_trait]
impl EventStore<PortfolioEvent> for InterleavingStore {
    async fn append(
        &self,
        stream_id: Uuid,
        expected_version: u64,
        events: Vec<PortfolioEvent>,
    ) -> Result<u64, PortError> {
        if expected_version > 0 && !self.interleaved.swap(true, Ordering::SeqCst) {
            let competing = PortfolioEvent::PortfolioRenamed {
                portfolio_id: PortfolioId::from_uuid(stream_id),
                old_name: "Growth".to_string(),
                new_name: "Other writer".to_string(),
                timestamp: Utc::now(),
            };
            self.inner
                .append(stream_id, expected_version, vec![competing])
                .await?;
        }
        self.inner.append(stream_id, expected_version, events).await
    }

    async fn load(&self, stream_id: Uuid) -> Result<Vec<EventEnvelope<PortfolioEvent>>, PortError> {
        self.inner.load(stream_id).await
    }

    async fn load_all(&self) -> Result<Vec<EventEnvelope<PortfolioEvent>>, PortError> {
        self.inner.load_all().await
    }
}

mod portfolio_commands {
    use super::*;

    #[tokio::test]
    async fn test_create_is_visible_to_queries_immediately() {
        let ledger = Ledger::in_memory();
        let owner_id = OwnerId::new();

        let id = ledger
            .portfolios()
            .create(create_command(owner_id), &CancellationToken::new())
            .await
            .unwrap();

        let row = ledger.queries().get_portfolio(id).unwrap();
        assert_eq!(row.name, "Growth");
        assert_eq!(row.version, 1);
        assert_eq!(ledger.queries().list_portfolios(owner_id, false, Page::default()).total, 1);
    }

    #[tokio::test]
    async fn test_rename_and_update_details() {
        let ledger = Ledger::in_memory();
        let cancel = CancellationToken::new();
        let id = ledger
            .portfolios()
            .create(create_command(OwnerId::new()), &cancel)
            .await
            .unwrap();

        let version = ledger
            .portfolios()
            .rename(
                RenamePortfolio {
                    portfolio_id: id,
                    new_name: "Income".to_string(),
                },
                &cancel,
            )
            .await
            .unwrap();
        assert_eq!(version, 2);

        ledger
            .portfolios()
            .update_details(
                UpdatePortfolioDetails {
                    portfolio_id: id,
                    name: "Dividends".to_string(),
                    description: None,
                },
                &cancel,
            )
            .await
            .unwrap();

        let row = ledger.queries().get_portfolio(id).unwrap();
        assert_eq!(row.name, "Dividends");
        assert_eq!(row.description, None);
        assert_eq!(row.version, 3);
    }

    #[tokio::test]
    async fn test_rename_to_same_name_is_rejected() {
        let ledger = Ledger::in_memory();
        let cancel = CancellationToken::new();
        let id = ledger
            .portfolios()
            .create(create_command(OwnerId::new()), &cancel)
            .await
            .unwrap();

        let result = ledger
            .portfolios()
            .rename(
                RenamePortfolio {
                    portfolio_id: id,
                    new_name: "Growth".to_string(),
                },
                &cancel,
            )
            .await;

        assert!(matches!(
            result,
            Err(LedgerError::Portfolio(PortfolioError::SameName(_)))
        ));
        assert_eq!(ledger.portfolios().load(id).await.unwrap().version(), 1);
    }

    #[tokio::test]
    async fn test_close_hides_portfolio_from_default_listing() {
        let ledger = Ledger::in_memory();
        let cancel = CancellationToken::new();
        let owner_id = OwnerId::new();
        let id = ledger
            .portfolios()
            .create(create_command(owner_id), &cancel)
            .await
            .unwrap();

        ledger
            .portfolios()
            .close(
                ClosePortfolio {
                    portfolio_id: id,
                    reason: Some("Moved".to_string()),
                    closed_by: UserId::new(),
                },
                &cancel,
            )
            .await
            .unwrap();

        let queries = ledger.queries();
        assert!(queries.get_portfolio(id).unwrap().is_closed());
        assert!(queries.list_portfolios(owner_id, false, Page::default()).is_empty());
        assert_eq!(queries.list_portfolios(owner_id, true, Page::default()).total, 1);
    }

    #[tokio::test]
    async fn test_unknown_portfolio_is_not_found() {
        let ledger = Ledger::in_memory();
        let result = ledger.portfolios().load(PortfolioId::new()).await;
        assert!(result.unwrap_err().is_not_found());
        assert!(ledger.queries().get_portfolio(PortfolioId::new()).is_err());
    }
}

mod concurrency {
    use super::*;

    #[tokio::test]
    async fn test_interleaved_writer_causes_retryable_conflict() {
        let store = Arc::new(InterleavingStore {
            inner: InMemoryEventStore::new(),
            interleaved: AtomicBool::new(false),
        });
        let commands = PortfolioCommands::new(store.clone());
        let cancel = CancellationToken::new();
        let id = commands
            .create(create_command(OwnerId::new()), &cancel)
            .await
            .unwrap();

        let rename = RenamePortfolio {
            portfolio_id: id,
            new_name: "Income".to_string(),
        };
        let error = commands.rename(rename.clone(), &cancel).await.unwrap_err();

        match &error {
            LedgerError::ConcurrencyConflict {
                stream_id,
                expected,
                actual,
            } => {
                assert_eq!(stream_id, id.as_uuid());
                assert_eq!(*expected, 1);
                assert_eq!(*actual, 2);
            }
            other => panic!("expected a conflict, got {other:?}"),
        }
        assert!(error.is_retryable());

        // only the other writer's event made it
        let portfolio = commands.load(id).await.unwrap();
        assert_eq!(portfolio.name(), "Other writer");
        assert_eq!(portfolio.version(), 2);

        // reloading and re-issuing succeeds
        assert_eq!(commands.rename(rename, &cancel).await.unwrap(), 3);
    }
}

mod cancellation {
    use super::*;

    #[tokio::test]
    async fn test_cancelled_command_leaves_stream_untouched() {
        let ledger = Ledger::in_memory();
        let id = ledger
            .portfolios()
            .create(create_command(OwnerId::new()), &CancellationToken::new())
            .await
            .unwrap();

        let cancel = CancellationToken::new();
        cancel.cancel();
        let result = ledger
            .portfolios()
            .rename(
                RenamePortfolio {
                    portfolio_id: id,
                    new_name: "Income".to_string(),
                },
                &cancel,
            )
            .await;

        assert!(matches!(result, Err(LedgerError::Cancelled)));
        assert_eq!(ledger.portfolios().load(id).await.unwrap().version(), 1);
        assert_eq!(ledger.queries().get_portfolio(id).unwrap().name, "Growth");
    }

    #[tokio::test]
    async fn test_cancelled_create_writes_nothing() {
        let ledger = Ledger::in_memory();
        let owner_id = OwnerId::new();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = ledger.portfolios().create(create_command(owner_id), &cancel).await;

        assert!(matches!(result, Err(LedgerError::Cancelled)));
        assert!(ledger
            .queries()
            .list_portfolios(owner_id, true, Page::default())
            .is_empty());
    }
}

mod investment_commands {
    use super::*;

    #[tokio::test]
    async fn test_add_to_missing_portfolio_is_not_found() {
        let ledger = Ledger::in_memory();
        let result = ledger
            .investments()
            .add(add_command(PortfolioId::new()), &CancellationToken::new())
            .await;
        assert!(result.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_add_to_closed_portfolio_is_rejected() {
        let ledger = Ledger::in_memory();
        let cancel = CancellationToken::new();
        let portfolio_id = ledger
            .portfolios()
            .create(create_command(OwnerId::new()), &cancel)
            .await
            .unwrap();
        ledger
            .portfolios()
            .close(
                ClosePortfolio {
                    portfolio_id,
                    reason: None,
                    closed_by: UserId::new(),
                },
                &cancel,
            )
            .await
            .unwrap();

        let result = ledger.investments().add(add_command(portfolio_id), &cancel).await;
        assert!(matches!(result, Err(LedgerError::PortfolioClosed(id)) if id == portfolio_id));
    }

    #[tokio::test]
    async fn test_add_is_listed_under_portfolio() {
        let (ledger, portfolio_id, investment_id) = ledger_with_investment().await;

        let listed = ledger.queries().list_investments(portfolio_id, Page::default());
        assert_eq!(listed.total, 1);
        assert_eq!(listed.items[0].investment_id, investment_id);

        let totals = ledger.queries().portfolio_totals(portfolio_id).unwrap();
        assert_eq!(totals.invested_cost, dec!(1000));
        assert_eq!(totals.open_positions, 1);
    }

    #[tokio::test]
    async fn test_unchanged_value_appends_nothing() {
        let (ledger, _, investment_id) = ledger_with_investment().await;
        let cancel = CancellationToken::new();

        let unchanged = ledger
            .investments()
            .update_value(
                UpdateInvestmentValue {
                    investment_id,
                    new_price_per_unit: MoneyFixtures::usd_100(),
                    pricing: PricingConvention::PerUnit,
                },
                &cancel,
            )
            .await
            .unwrap();
        assert_eq!(unchanged, None);

        let changed = ledger
            .investments()
            .update_value(
                UpdateInvestmentValue {
                    investment_id,
                    new_price_per_unit: MoneyFixtures::usd(dec!(120)),
                    pricing: PricingConvention::PerUnit,
                },
                &cancel,
            )
            .await
            .unwrap();
        assert_eq!(changed, Some(2));
        assert_eq!(
            ledger.queries().get_investment(investment_id).unwrap().current_value,
            MoneyFixtures::usd(dec!(1200))
        );
    }

    #[tokio::test]
    async fn test_sells_flow_into_totals() {
        let (ledger, portfolio_id, investment_id) = ledger_with_investment().await;
        let cancel = CancellationToken::new();
        let commands = ledger.investments();

        commands
            .update_value(
                UpdateInvestmentValue {
                    investment_id,
                    new_price_per_unit: MoneyFixtures::usd(dec!(120)),
                    pricing: PricingConvention::PerUnit,
                },
                &cancel,
            )
            .await
            .unwrap();
        commands
            .sell(
                SellInvestment {
                    investment_id,
                    sale_price_per_unit: MoneyFixtures::usd(dec!(130)),
                    pricing: PricingConvention::PerUnit,
                    quantity: Some(dec!(4)),
                    sale_date: TemporalFixtures::yesterday(),
                },
                &cancel,
            )
            .await
            .unwrap();

        let totals = ledger.queries().portfolio_totals(portfolio_id).unwrap();
        assert_eq!(totals.invested_cost, dec!(600));
        assert_eq!(totals.current_value, dec!(720));
        assert_eq!(totals.realized_profit_loss, dec!(120));
        assert_eq!(totals.open_positions, 1);

        let version = commands
            .sell(
                SellInvestment {
                    investment_id,
                    sale_price_per_unit: MoneyFixtures::usd(dec!(90)),
                    pricing: PricingConvention::PerUnit,
                    quantity: None,
                    sale_date: TemporalFixtures::yesterday(),
                },
                &cancel,
            )
            .await
            .unwrap();
        assert_eq!(version, 4);

        let totals = ledger.queries().portfolio_totals(portfolio_id).unwrap();
        assert_eq!(totals.invested_cost, dec!(0));
        assert_eq!(totals.current_value, dec!(0));
        assert_eq!(totals.realized_profit_loss, dec!(60));
        assert_eq!(totals.open_positions, 0);

        let row = ledger.queries().get_investment(investment_id).unwrap();
        assert_eq!(row.status, InvestmentStatus::Sold);
        assert_eq!(
            ledger
                .queries()
                .investments_by_status(InvestmentStatus::Sold, Page::default())
                .total,
            1
        );
    }

    #[tokio::test]
    async fn test_investment_in_other_currency_is_rejected() {
        let ledger = Ledger::in_memory();
        let cancel = CancellationToken::new();
        let portfolio_id = ledger
            .portfolios()
            .create(create_command(OwnerId::new()), &cancel)
            .await
            .unwrap();

        let result = ledger
            .investments()
            .add(
                AddInvestment {
                    purchase_price: MoneyFixtures::eur_100(),
                    ..add_command(portfolio_id)
                },
                &cancel,
            )
            .await;

        assert!(matches!(
            result,
            Err(LedgerError::CurrencyMismatch {
                portfolio: Currency::USD,
                investment: Currency::EUR,
            })
        ));
        assert!(ledger.queries().portfolio_totals(portfolio_id).is_err());
        assert_eq!(
            ledger.queries().list_investments(portfolio_id, Page::default()).total,
            0
        );
    }

    #[tokio::test]
    async fn test_bond_quotes_are_read_as_percent_of_nominal() {
        let ledger = Ledger::in_memory();
        let cancel = CancellationToken::new();
        let portfolio_id = ledger
            .portfolios()
            .create(
                CreatePortfolio {
                    currency: Currency::PLN,
                    ..create_command(OwnerId::new())
                },
                &cancel,
            )
            .await
            .unwrap();
        let pricing = PricingConvention::percent_of_nominal(dec!(1000)).unwrap();

        let investment_id = ledger
            .investments()
            .add(
                AddInvestment {
                    portfolio_id,
                    symbol: SymbolFixtures::bond(),
                    purchase_price: MoneyFixtures::pln(dec!(67.39)),
                    pricing,
                    quantity: dec!(53),
                    purchase_date: TemporalFixtures::purchase_date(),
                },
                &cancel,
            )
            .await
            .unwrap();

        let row = ledger.queries().get_investment(investment_id).unwrap();
        assert_eq!(row.purchase_price, MoneyFixtures::pln(dec!(673.90)));
        let totals = ledger.queries().portfolio_totals(portfolio_id).unwrap();
        assert_eq!(totals.invested_cost, dec!(35716.70));

        ledger
            .investments()
            .update_value(
                UpdateInvestmentValue {
                    investment_id,
                    new_price_per_unit: MoneyFixtures::pln(dec!(70)),
                    pricing,
                },
                &cancel,
            )
            .await
            .unwrap();
        ledger
            .investments()
            .sell(
                SellInvestment {
                    investment_id,
                    sale_price_per_unit: MoneyFixtures::pln(dec!(71)),
                    pricing,
                    quantity: Some(dec!(3)),
                    sale_date: TemporalFixtures::yesterday(),
                },
                &cancel,
            )
            .await
            .unwrap();

        let row = ledger.queries().get_investment(investment_id).unwrap();
        assert_eq!(row.current_price, MoneyFixtures::pln(dec!(700)));
        assert_eq!(row.current_value, MoneyFixtures::pln(dec!(35000)));
        assert_eq!(row.realized_profit_loss.amount(), dec!(108.30));
    }

    #[tokio::test]
    async fn test_pricing_must_fit_asset_type() {
        let ledger = Ledger::in_memory();
        let cancel = CancellationToken::new();
        let portfolio_id = ledger
            .portfolios()
            .create(create_command(OwnerId::new()), &cancel)
            .await
            .unwrap();

        let bond_per_unit = ledger
            .investments()
            .add(
                AddInvestment {
                    symbol: SymbolFixtures::bond(),
                    ..add_command(portfolio_id)
                },
                &cancel,
            )
            .await;
        assert!(matches!(
            bond_per_unit,
            Err(LedgerError::PricingMismatch {
                asset_type: AssetType::Bond,
                ..
            })
        ));

        let stock_percent = ledger
            .investments()
            .add(
                AddInvestment {
                    pricing: PricingConvention::percent_of_nominal(dec!(100)).unwrap(),
                    ..add_command(portfolio_id)
                },
                &cancel,
            )
            .await;
        assert!(matches!(
            stock_percent,
            Err(LedgerError::PricingMismatch {
                asset_type: AssetType::Stock,
                ..
            })
        ));
        assert!(ledger.queries().portfolio_totals(portfolio_id).is_err());
    }

    #[tokio::test]
    async fn test_oversell_is_rejected_without_append() {
        let (ledger, _, investment_id) = ledger_with_investment().await;

        let result = ledger
            .investments()
            .sell(
                SellInvestment {
                    investment_id,
                    sale_price_per_unit: MoneyFixtures::usd(dec!(110)),
                    pricing: PricingConvention::PerUnit,
                    quantity: Some(dec!(11)),
                    sale_date: TemporalFixtures::yesterday(),
                },
                &CancellationToken::new(),
            )
            .await;

        assert!(matches!(
            result,
            Err(LedgerError::Investment(InvestmentError::InsufficientQuantity { .. }))
        ));
        assert_eq!(ledger.investments().load(investment_id).await.unwrap().version(), 1);
    }
}

mod replay {
    use super::*;

    #[tokio::test]
    async fn test_rebuild_reproduces_read_models() {
        let (ledger, portfolio_id, investment_id) = ledger_with_investment().await;
        let before = ledger.queries().get_investment(investment_id).unwrap();
        let totals_before = ledger.queries().portfolio_totals(portfolio_id).unwrap();

        let counts = ledger.rebuild_projections().await.unwrap();

        assert_eq!(counts.portfolio_events, 1);
        assert_eq!(counts.investment_events, 1);
        assert_eq!(ledger.queries().get_investment(investment_id).unwrap(), before);
        assert_eq!(ledger.queries().portfolio_totals(portfolio_id).unwrap(), totals_before);
    }

    #[tokio::test]
    async fn test_opened_ledger_serves_streams_written_before() {
        let portfolio_log: InMemoryEventStore<PortfolioEvent> = InMemoryEventStore::new();
        let investment_log: InMemoryEventStore<InvestmentEvent> = InMemoryEventStore::new();
        let mut portfolio = TestPortfolioBuilder::new().build();
        let portfolio_id = portfolio.id();
        portfolio_log
            .append(*portfolio_id.as_uuid(), 0, portfolio.take_events())
            .await
            .unwrap();
        let mut investment = TestInvestmentBuilder::new()
            .with_portfolio(portfolio_id)
            .build();
        let investment_id = investment.id();
        investment_log
            .append(*investment_id.as_uuid(), 0, investment.take_events())
            .await
            .unwrap();

        let ledger = Ledger::open_in_memory(portfolio_log, investment_log)
            .await
            .unwrap();
        ledger
            .investments()
            .sell(
                SellInvestment {
                    investment_id,
                    sale_price_per_unit: MoneyFixtures::usd(dec!(120)),
                    pricing: PricingConvention::PerUnit,
                    quantity: Some(dec!(4)),
                    sale_date: TemporalFixtures::yesterday(),
                },
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        let row = ledger.queries().get_investment(investment_id).unwrap();
        assert_eq!(row.quantity, dec!(6));
        assert_eq!(row.version, 2);
        assert_eq!(row.realized_profit_loss.amount(), dec!(80));
        let totals = ledger.queries().portfolio_totals(portfolio_id).unwrap();
        assert_eq!(totals.realized_profit_loss, dec!(80));
        assert!(ledger.queries().get_portfolio(portfolio_id).is_ok());
    }

    #[tokio::test]
    async fn test_verify_streams_accepts_healthy_log() {
        let (ledger, _, _) = ledger_with_investment().await;

        let report = ledger.verify_streams().await.unwrap();

        assert!(report.is_healthy());
        assert_eq!(report.streams, 2);
        assert_eq!(report.events, 2);
    }

    #[tokio::test]
    async fn test_verify_streams_lists_stream_that_does_not_replay() {
        let portfolio_log: InMemoryEventStore<PortfolioEvent> = InMemoryEventStore::new();
        let broken = PortfolioId::new();
        portfolio_log
            .append(
                *broken.as_uuid(),
                0,
                vec![PortfolioEvent::PortfolioRenamed {
                    portfolio_id: broken,
                    old_name: "Growth".to_string(),
                    new_name: "Income".to_string(),
                    timestamp: Utc::now(),
                }],
            )
            .await
            .unwrap();
        let mut healthy = TestPortfolioBuilder::new().build();
        portfolio_log
            .append(*healthy.id().as_uuid(), 0, healthy.take_events())
            .await
            .unwrap();
        let investment_log: InMemoryEventStore<InvestmentEvent> = InMemoryEventStore::new();

        let ledger = Ledger::open_in_memory(portfolio_log, investment_log)
            .await
            .unwrap();
        let report = ledger.verify_streams().await.unwrap();

        assert_eq!(report.streams, 2);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].stream_id, *broken.as_uuid());
        assert_eq!(report.failures[0].category, PortfolioEvent::STREAM_CATEGORY);
        assert!(report.failures[0].reason.contains("PortfolioRenamed"));
    }
}
