//! Unit tests for the Identifiers module
//!
//! Tests cover identifier creation, parsing, conversion, and display.

use core_kernel::{InvestmentId, OwnerId, PortfolioId, TransactionId, UserId};
use uuid::Uuid;

mod portfolio_id_tests {
    use super::*;

    #[test]
    fn test_new_generates_unique_ids() {
        assert_ne!(PortfolioId::new(), PortfolioId::new());
    }

    #[test]
    fn test_new_v7_generates_time_ordered_ids() {
        let id1 = PortfolioId::new_v7();
        std::thread::sleep(std::time::Duration::from_millis(1));
        let id2 = PortfolioId::new_v7();
        assert!(id1 < id2);
    }

    #[test]
    fn test_from_uuid() {
        let uuid = Uuid::new_v4();
        let id = PortfolioId::from_uuid(uuid);
        assert_eq!(*id.as_uuid(), uuid);
    }

    #[test]
    fn test_parse_with_and_without_prefix() {
        let uuid = Uuid::new_v4();
        let with_prefix: PortfolioId = format!("PFL-{}", uuid).parse().unwrap();
        let without_prefix: PortfolioId = uuid.to_string().parse().unwrap();
        assert_eq!(with_prefix, without_prefix);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!("PFL-not-a-uuid".parse::<PortfolioId>().is_err());
    }
}

mod prefixes {
    use super::*;

    #[test]
    fn test_each_identifier_has_its_prefix() {
        assert_eq!(PortfolioId::prefix(), "PFL");
        assert_eq!(InvestmentId::prefix(), "INV");
        assert_eq!(OwnerId::prefix(), "OWN");
        assert_eq!(UserId::prefix(), "USR");
        assert_eq!(TransactionId::prefix(), "TXN");
    }

    #[test]
    fn test_serde_is_transparent() {
        let id = InvestmentId::new();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{}\"", id.as_uuid()));
    }
}
