//! Unit tests for the identifiers module
//!
//! Tests cover creation, parsing, conversion, serde, and display
//! formatting for every identifier type.

use core_kernel::{BookingId, InvoiceId, MemberId, PaymentId, StaffId};
use uuid::Uuid;

mod creation {
    use super::*;

    #[test]
    fn test_new_generates_unique_ids() {
        let id1 = InvoiceId::new();
        let id2 = InvoiceId::new();
        assert_ne!(id1, id2);
    }

    #[test]
    fn test_new_v7_generates_time_ordered_ids() {
        let id1 = PaymentId::new_v7();
        std::thread::sleep(std::time::Duration::from_millis(1));
        let id2 = PaymentId::new_v7();
        let uuid1: Uuid = id1.into();
        let uuid2: Uuid = id2.into();
        assert!(uuid1 < uuid2);
    }

    #[test]
    fn test_from_uuid_preserves_value() {
        let uuid = Uuid::new_v4();
        let id = MemberId::from_uuid(uuid);
        assert_eq!(*id.as_uuid(), uuid);
    }

    #[test]
    fn test_default_is_random() {
        assert_ne!(StaffId::default(), StaffId::default());
    }
}

mod display_and_parsing {
    use super::*;

    #[test]
    fn test_display_prefixes() {
        assert!(InvoiceId::new().to_string().starts_with("INV-"));
        assert!(PaymentId::new().to_string().starts_with("PAY-"));
        assert!(MemberId::new().to_string().starts_with("MBR-"));
        assert!(StaffId::new().to_string().starts_with("STF-"));
        assert!(BookingId::new().to_string().starts_with("BKG-"));
    }

    #[test]
    fn test_prefixed_string_round_trips() {
        let original = BookingId::new();
        let parsed: BookingId = original.to_string().parse().unwrap();
        assert_eq!(original, parsed);
    }

    #[test]
    fn test_bare_uuid_string_parses() {
        let uuid = Uuid::new_v4();
        let id: InvoiceId = uuid.to_string().parse().unwrap();
        assert_eq!(*id.as_uuid(), uuid);
    }

    #[test]
    fn test_garbage_fails_to_parse() {
        assert!("INV-not-a-uuid".parse::<InvoiceId>().is_err());
        assert!("".parse::<InvoiceId>().is_err());
    }
}

mod serde_support {
    use super::*;

    #[test]
    fn test_serializes_as_bare_uuid() {
        let uuid = Uuid::new_v4();
        let id = InvoiceId::from_uuid(uuid);
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{}\"", uuid));
    }

    #[test]
    fn test_round_trips_through_json() {
        let original = MemberId::new();
        let json = serde_json::to_string(&original).unwrap();
        let back: MemberId = serde_json::from_str(&json).unwrap();
        assert_eq!(original, back);
    }
}

mod conversions {
    use super::*;

    #[test]
    fn test_uuid_conversion_round_trips() {
        let uuid = Uuid::new_v4();
        let id = PaymentId::from(uuid);
        let back: Uuid = id.into();
        assert_eq!(uuid, back);
    }
}
