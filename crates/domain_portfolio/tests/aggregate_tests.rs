//! Portfolio Aggregate Tests
//!
//! # Test Organization
//!
//! - `portfolio_creation` - creation and name validation
//! - `portfolio_lifecycle` - rename, details update, close
//! - `replay` - event-stream reconstruction and determinism

use core_kernel::{Currency, DomainEvent, OwnerId, PortfolioId, UserId};
use domain_portfolio::{Portfolio, PortfolioError, PortfolioEvent, PortfolioStatus, MAX_NAME_LENGTH};

// ============================================================================
// TEST FIXTURES
// ============================================================================

fn create_test_portfolio() -> Portfolio {
    Portfolio::create(
        PortfolioId::new_v7(),
        OwnerId::new(),
        "Dividend Growth",
        None,
        Currency::PLN,
    )
    .expect("Test portfolio creation should succeed")
}

// ============================================================================
// CREATION TESTS
// ============================================================================

mod portfolio_creation {
    use super::*;

    #[test]
    fn test_create_emits_single_created_event() {
        let mut portfolio = create_test_portfolio();
        let events = portfolio.take_events();

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type(), "PortfolioCreated");
        assert_eq!(events[0].portfolio_id(), portfolio.id());
        assert_eq!(portfolio.committed_version(), 1);
    }

    #[test]
    fn test_create_trims_name_and_drops_blank_description() {
        let portfolio = Portfolio::create(
            PortfolioId::new(),
            OwnerId::new(),
            "  Savings  ",
            Some("   ".to_string()),
            Currency::EUR,
        )
        .unwrap();

        assert_eq!(portfolio.name(), "Savings");
        assert_eq!(portfolio.description(), None);
        assert_eq!(portfolio.currency(), Currency::EUR);
    }

    #[test]
    fn test_create_rejects_empty_name() {
        let result = Portfolio::create(PortfolioId::new(), OwnerId::new(), "", None, Currency::USD);
        assert_eq!(result.unwrap_err(), PortfolioError::EmptyName);
    }

    #[test]
    fn test_create_rejects_overlong_name() {
        let name = "x".repeat(MAX_NAME_LENGTH + 1);
        let result = Portfolio::create(PortfolioId::new(), OwnerId::new(), &name, None, Currency::USD);
        assert_eq!(
            result.unwrap_err(),
            PortfolioError::NameTooLong { max: MAX_NAME_LENGTH }
        );
    }
}

// ============================================================================
// LIFECYCLE TESTS
// ============================================================================

mod portfolio_lifecycle {
    use super::*;

    #[test]
    fn test_rename_records_old_and_new_names() {
        let mut portfolio = create_test_portfolio();
        portfolio.take_events();

        portfolio.rename("Income").unwrap();
        let events = portfolio.take_events();

        match &events[..] {
            [PortfolioEvent::PortfolioRenamed { old_name, new_name, .. }] => {
                assert_eq!(old_name, "Dividend Growth");
                assert_eq!(new_name, "Income");
            }
            other => panic!("Expected one PortfolioRenamed event, got {:?}", other),
        }
        assert_eq!(portfolio.version(), 2);
    }

    #[test]
    fn test_rename_to_same_name_fails_without_event() {
        let mut portfolio = create_test_portfolio();
        let before = portfolio.version();

        let result = portfolio.rename("Dividend Growth");

        assert_eq!(result, Err(PortfolioError::SameName("Dividend Growth".to_string())));
        assert_eq!(portfolio.version(), before);
        assert_eq!(portfolio.pending_events().len(), 1);
    }

    #[test]
    fn test_update_details_replaces_name_and_description() {
        let mut portfolio = create_test_portfolio();
        portfolio
            .update_details("Bonds", Some("Treasury ladder".to_string()))
            .unwrap();

        assert_eq!(portfolio.name(), "Bonds");
        assert_eq!(portfolio.description(), Some("Treasury ladder"));
        assert_eq!(portfolio.version(), 2);
    }

    #[test]
    fn test_close_sets_closed_fields() {
        let mut portfolio = create_test_portfolio();
        let closer = UserId::new();

        portfolio
            .close(Some("Account transferred".to_string()), closer)
            .unwrap();

        assert!(portfolio.is_closed());
        assert_eq!(portfolio.status(), PortfolioStatus::Closed);
        assert_eq!(portfolio.close_reason(), Some("Account transferred"));
        assert_eq!(portfolio.closed_by(), Some(closer));
        assert!(portfolio.closed_at().is_some());
    }

    #[test]
    fn test_close_twice_fails() {
        let mut portfolio = create_test_portfolio();
        portfolio.close(None, UserId::new()).unwrap();

        let error = portfolio.close(None, UserId::new()).unwrap_err();
        assert_eq!(error, PortfolioError::AlreadyClosed);
        assert!(error.is_state_violation());
    }

    #[test]
    fn test_closed_portfolio_rejects_rename() {
        let mut portfolio = create_test_portfolio();
        portfolio.close(None, UserId::new()).unwrap();

        assert_eq!(portfolio.rename("Anything"), Err(PortfolioError::Closed));
    }
}

// ============================================================================
// REPLAY TESTS
// ============================================================================

mod replay {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_empty_stream_is_rejected() {
        let events: Vec<PortfolioEvent> = Vec::new();
        assert_eq!(Portfolio::from_events(&events).unwrap_err(), PortfolioError::EmptyStream);
    }

    #[test]
    fn test_stream_must_start_with_creation() {
        let mut portfolio = create_test_portfolio();
        portfolio.rename("Other").unwrap();
        let events = portfolio.take_events();

        let result = Portfolio::from_events(&events[1..]);
        assert!(matches!(result, Err(PortfolioError::InvalidEventSequence(_))));
    }

    #[test]
    fn test_foreign_events_are_rejected() {
        let mut first = create_test_portfolio();
        let mut second = create_test_portfolio();
        second.rename("Foreign").unwrap();

        let mut events = first.take_events();
        events.push(second.take_events().pop().unwrap());

        assert!(matches!(
            Portfolio::from_events(&events),
            Err(PortfolioError::InvalidEventSequence(_))
        ));
    }

    #[test]
    fn test_events_round_trip_through_json() {
        let mut portfolio = create_test_portfolio();
        portfolio.close(Some("done".to_string()), UserId::new()).unwrap();
        let events = portfolio.take_events();

        let json = serde_json::to_string(&events).unwrap();
        let decoded: Vec<PortfolioEvent> = serde_json::from_str(&json).unwrap();

        assert_eq!(Portfolio::from_events(&decoded).unwrap(), portfolio);
    }

    #[derive(Debug, Clone)]
    enum Command {
        Rename(String),
        Update(String, Option<String>),
        Close(Option<String>),
    }

    fn command_strategy() -> impl Strategy<Value = Command> {
        prop_oneof![
            "[A-Za-z ]{0,12}".prop_map(Command::Rename),
            ("[A-Za-z]{0,8}", proptest::option::of("[a-z]{0,8}"))
                .prop_map(|(n, d)| Command::Update(n, d)),
            proptest::option::of("[a-z]{1,8}").prop_map(Command::Close),
        ]
    }

    proptest! {
        #[test]
        fn replay_is_deterministic(commands in proptest::collection::vec(command_strategy(), 0..20)) {
            let mut portfolio = create_test_portfolio();
            for command in commands {
                // Rejected commands must leave no trace
                let before = portfolio.clone();
                let result = match command {
                    Command::Rename(name) => portfolio.rename(&name),
                    Command::Update(name, description) => portfolio.update_details(&name, description),
                    Command::Close(reason) => portfolio.close(reason, UserId::new()),
                };
                if result.is_err() {
                    prop_assert_eq!(&portfolio, &before);
                }
            }

            let events = portfolio.take_events();
            prop_assert_eq!(events.len() as u64, portfolio.version());

            let first = Portfolio::from_events(&events).unwrap();
            let second = Portfolio::from_events(&events).unwrap();
            prop_assert_eq!(&first, &second);
            prop_assert_eq!(&first, &portfolio);
        }
    }
}
