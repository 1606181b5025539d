//! Unit tests for the Money module
//!
//! Tests cover money creation, arithmetic, currency handling, ordering,
//! serde, and edge cases.

use core_kernel::{Currency, Money, MoneyError};
use rust_decimal_macros::dec;

mod creation {
    use super::*;

    #[test]
    fn test_new_creates_money_with_correct_amount() {
        let m = Money::new(dec!(100.50), Currency::NZD);
        assert_eq!(m.amount(), dec!(100.50));
        assert_eq!(m.currency(), Currency::NZD);
    }

    #[test]
    fn test_new_rounds_to_currency_precision() {
        let m = Money::new(dec!(100.555), Currency::NZD);
        assert_eq!(m.amount(), dec!(100.56));
    }

    #[test]
    fn test_from_minor_converts_cents() {
        let m = Money::from_minor(29900, Currency::NZD);
        assert_eq!(m.amount(), dec!(299.00));
    }

    #[test]
    fn test_from_minor_handles_negative() {
        let m = Money::from_minor(-50, Currency::NZD);
        assert_eq!(m.amount(), dec!(-0.50));
        assert!(m.is_negative());
    }

    #[test]
    fn test_zero_is_zero() {
        let m = Money::zero(Currency::AUD);
        assert!(m.is_zero());
        assert!(!m.is_positive());
        assert!(!m.is_negative());
    }
}

mod arithmetic {
    use super::*;

    #[test]
    fn test_checked_add_same_currency() {
        let a = Money::new(dec!(100.00), Currency::NZD);
        let b = Money::new(dec!(199.00), Currency::NZD);
        assert_eq!(a.checked_add(&b).unwrap().amount(), dec!(299.00));
    }

    #[test]
    fn test_checked_add_rejects_mixed_currencies() {
        let nzd = Money::new(dec!(100.00), Currency::NZD);
        let aud = Money::new(dec!(100.00), Currency::AUD);
        assert!(matches!(
            nzd.checked_add(&aud),
            Err(MoneyError::CurrencyMismatch(_, _))
        ));
    }

    #[test]
    fn test_checked_sub_can_go_negative() {
        let a = Money::new(dec!(50.00), Currency::NZD);
        let b = Money::new(dec!(75.00), Currency::NZD);
        let result = a.checked_sub(&b).unwrap();
        assert_eq!(result.amount(), dec!(-25.00));
        assert!(result.is_negative());
    }

    #[test]
    fn test_multiply_rounds_to_precision() {
        // 215.00/hr * 1.2 hr
        let rate = Money::new(dec!(215.00), Currency::NZD);
        assert_eq!(rate.multiply(dec!(1.2)).amount(), dec!(258.00));

        // A rate that does not divide evenly still lands on cents
        let rate = Money::new(dec!(99.99), Currency::NZD);
        assert_eq!(rate.multiply(dec!(0.333)).amount(), dec!(33.30));
    }

    #[test]
    fn test_sum_over_slice() {
        let amounts = vec![
            Money::new(dec!(100.00), Currency::NZD),
            Money::new(dec!(199.00), Currency::NZD),
        ];
        let total = Money::sum(&amounts, Currency::NZD).unwrap();
        assert_eq!(total.amount(), dec!(299.00));
    }

    #[test]
    fn test_sum_of_empty_is_zero() {
        let total = Money::sum(&[], Currency::NZD).unwrap();
        assert!(total.is_zero());
        assert_eq!(total.currency(), Currency::NZD);
    }

    #[test]
    fn test_sum_rejects_mixed_currencies() {
        let amounts = vec![
            Money::new(dec!(100.00), Currency::NZD),
            Money::new(dec!(100.00), Currency::USD),
        ];
        assert!(Money::sum(&amounts, Currency::NZD).is_err());
    }
}

mod ordering {
    use super::*;

    #[test]
    fn test_same_currency_amounts_compare() {
        let small = Money::new(dec!(10.00), Currency::NZD);
        let large = Money::new(dec!(20.00), Currency::NZD);
        assert!(small < large);
        assert!(large >= small);
    }

    #[test]
    fn test_cross_currency_comparison_is_undefined() {
        let nzd = Money::new(dec!(10.00), Currency::NZD);
        let usd = Money::new(dec!(10.00), Currency::USD);
        assert_eq!(nzd.partial_cmp(&usd), None);
        assert!(!(nzd < usd));
        assert!(!(nzd > usd));
    }
}

mod formatting {
    use super::*;

    #[test]
    fn test_display_uses_currency_symbol() {
        let m = Money::new(dec!(299.00), Currency::NZD);
        assert_eq!(m.to_string(), "NZ$299.00");
    }

    #[test]
    fn test_currency_codes() {
        assert_eq!(Currency::NZD.code(), "NZD");
        assert_eq!(Currency::AUD.code(), "AUD");
        assert_eq!(Currency::USD.code(), "USD");
    }
}

mod serde_support {
    use super::*;

    #[test]
    fn test_money_round_trips_through_json() {
        let original = Money::new(dec!(41.00), Currency::NZD);
        let json = serde_json::to_string(&original).unwrap();
        let back: Money = serde_json::from_str(&json).unwrap();
        assert_eq!(original, back);
    }

    #[test]
    fn test_currency_serializes_uppercase() {
        let json = serde_json::to_string(&Currency::NZD).unwrap();
        assert_eq!(json, "\"NZD\"");
    }
}
