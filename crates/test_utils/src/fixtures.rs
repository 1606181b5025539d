//! Pre-built test fixtures
//!
//! Ready-to-use test data for billing entities, designed to be
//! consistent and predictable across the test suite.

use chrono::NaiveDate;
use core_kernel::{Currency, InvoiceId, MemberId, Money, PaymentId, StaffId};
use rust_decimal_macros::dec;

/// Fixture for Money test data
pub struct MoneyFixtures;

impl MoneyFixtures {
    /// A typical dual-lesson invoice total
    pub fn nzd_299() -> Money {
        Money::new(dec!(299.00), Currency::NZD)
    }

    /// A typical credit top-up
    pub fn nzd_100() -> Money {
        Money::new(dec!(100.00), Currency::NZD)
    }

    /// A zero NZD amount
    pub fn nzd_zero() -> Money {
        Money::zero(Currency::NZD)
    }

    /// An AUD amount for currency mismatch tests
    pub fn aud_100() -> Money {
        Money::new(dec!(100.00), Currency::AUD)
    }
}

/// Fixture for identifiers
pub struct IdFixtures;

impl IdFixtures {
    pub fn invoice_id() -> InvoiceId {
        InvoiceId::new_v7()
    }

    pub fn payment_id() -> PaymentId {
        PaymentId::new_v7()
    }

    pub fn member_id() -> MemberId {
        MemberId::new()
    }

    /// The front-desk staff member who records most test payments
    pub fn duty_staff() -> StaffId {
        StaffId::new()
    }
}

/// Fixture for dates
pub struct DateFixtures;

impl DateFixtures {
    /// A due date comfortably in the future relative to test runs
    pub fn future_due_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2099, 1, 31).unwrap()
    }

    /// A due date firmly in the past
    pub fn past_due_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2020, 1, 31).unwrap()
    }
}
