//! Invoice types and the invoice aggregator
//!
//! The aggregator functions here are pure: totals and status are
//! always derived from the invoice and the payments recorded against
//! it, never from a cached running figure.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use core_kernel::{BookingId, Currency, InvoiceId, MemberId, Money, MoneyError};

use crate::payment::Payment;

/// Invoice status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    /// Issued, with an outstanding balance, not yet past due
    Pending,
    /// Payments sum to the invoice total
    Paid,
    /// Past the due date with a nonzero outstanding balance
    Overdue,
}

/// Kind of charge line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChargeKind {
    /// Aircraft hire / instruction time from a checked-out booking
    Flight,
    /// Landing fees, fuel surcharges, merchandise, and other extras
    Additional,
}

/// A single charge line on an invoice
///
/// The line amount is computed once from rate and quantity when the
/// line is created and is immutable afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChargeLine {
    /// Line identifier
    pub id: Uuid,
    /// Kind of charge
    pub kind: ChargeKind,
    /// Description shown on the invoice
    pub description: String,
    /// Unit rate (e.g., hourly hire rate)
    pub unit_rate: Money,
    /// Quantity (e.g., hours flown)
    pub quantity: Decimal,
    /// Computed amount: unit_rate * quantity
    pub amount: Money,
    /// Originating booking, for flight charges
    pub booking_id: Option<BookingId>,
}

impl ChargeLine {
    /// Creates a charge line, computing its amount from rate and quantity
    pub fn new(
        kind: ChargeKind,
        description: impl Into<String>,
        unit_rate: Money,
        quantity: Decimal,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            description: description.into(),
            unit_rate,
            quantity,
            amount: unit_rate.multiply(quantity),
            booking_id: None,
        }
    }

    /// Links the line to the booking it was charged from
    pub fn with_booking(mut self, booking_id: BookingId) -> Self {
        self.booking_id = Some(booking_id);
        self
    }
}

/// An invoice for flight and additional charges
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invoice {
    /// Unique identifier
    pub id: InvoiceId,
    /// Member being billed
    pub member_id: MemberId,
    /// Ordered charge lines
    pub charge_lines: Vec<ChargeLine>,
    /// Total amount, derived from the lines at creation and immutable
    pub total_amount: Money,
    /// Status
    pub status: InvoiceStatus,
    /// Payment due date
    pub due_date: NaiveDate,
    /// Date the invoice became fully paid
    pub paid_date: Option<NaiveDate>,
    /// Created timestamp
    pub created_at: DateTime<Utc>,
    /// Updated timestamp
    pub updated_at: DateTime<Utc>,
}

impl Invoice {
    /// Creates a new invoice from its charge lines
    ///
    /// The total is computed here, once. An invoice with no charge
    /// lines has a zero total and is immediately `Paid`.
    pub fn new(
        member_id: MemberId,
        charge_lines: Vec<ChargeLine>,
        due_date: NaiveDate,
        currency: Currency,
    ) -> Result<Self, MoneyError> {
        let amounts: Vec<Money> = charge_lines.iter().map(|line| line.amount).collect();
        let total_amount = Money::sum(&amounts, currency)?;
        let now = Utc::now();

        let status = if total_amount.is_zero() {
            InvoiceStatus::Paid
        } else {
            InvoiceStatus::Pending
        };

        Ok(Self {
            id: InvoiceId::new_v7(),
            member_id,
            charge_lines,
            total_amount,
            status,
            due_date,
            paid_date: if total_amount.is_zero() {
                Some(now.date_naive())
            } else {
                None
            },
            created_at: now,
            updated_at: now,
        })
    }

    /// Returns the invoice currency
    pub fn currency(&self) -> Currency {
        self.total_amount.currency()
    }
}

/// Sums the payments recorded against an invoice
///
/// Payments referencing other invoices are excluded; callers normally
/// pass a pre-filtered slice from the store.
pub fn paid_total(invoice: &Invoice, payments: &[Payment]) -> Result<Money, MoneyError> {
    let mut total = Money::zero(invoice.currency());
    for payment in payments.iter().filter(|p| p.invoice_id == invoice.id) {
        total = total.checked_add(&payment.amount)?;
    }
    Ok(total)
}

/// Computes the outstanding balance on an invoice
///
/// `total_amount - sum(payments)`. The orchestrator never lets the
/// recorded payments exceed the total, so a negative result indicates
/// corrupted data upstream and is returned as-is for the caller to
/// reject.
pub fn remaining_balance(invoice: &Invoice, payments: &[Payment]) -> Result<Money, MoneyError> {
    let paid = paid_total(invoice, payments)?;
    invoice.total_amount.checked_sub(&paid)
}

/// Derives the invoice status from its payments
///
/// - `Paid` exactly when payments sum to the total (a zero-total
///   invoice is immediately paid)
/// - `Overdue` only once `today` is past the due date with a nonzero
///   outstanding balance
/// - `Pending` otherwise
pub fn derive_status(
    invoice: &Invoice,
    payments: &[Payment],
    today: NaiveDate,
) -> Result<InvoiceStatus, MoneyError> {
    let remaining = remaining_balance(invoice, payments)?;

    if !remaining.is_positive() {
        return Ok(InvoiceStatus::Paid);
    }
    if today > invoice.due_date {
        return Ok(InvoiceStatus::Overdue);
    }
    Ok(InvoiceStatus::Pending)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payment::{PaymentMethod, ReceiptNumber};
    use core_kernel::{PaymentId, StaffId};
    use rust_decimal_macros::dec;

    fn nzd(amount: Decimal) -> Money {
        Money::new(amount, Currency::NZD)
    }

    fn payment_against(invoice: &Invoice, amount: Money) -> Payment {
        Payment {
            id: PaymentId::new_v7(),
            invoice_id: invoice.id,
            member_id: invoice.member_id,
            amount,
            method: PaymentMethod::Eftpos,
            reference_number: None,
            notes: None,
            payment_date: Utc::now(),
            receipt_number: ReceiptNumber::new(1),
            recorded_by: StaffId::new(),
            created_at: Utc::now(),
        }
    }

    fn dual_rate_invoice() -> Invoice {
        let lines = vec![
            ChargeLine::new(ChargeKind::Flight, "C172 dual - 1.2 hrs", nzd(dec!(215.00)), dec!(1.2))
                .with_booking(BookingId::new()),
            ChargeLine::new(ChargeKind::Additional, "Landing fee", nzd(dec!(41.00)), dec!(1)),
        ];
        Invoice::new(
            MemberId::new(),
            lines,
            NaiveDate::from_ymd_opt(2026, 9, 20).unwrap(),
            Currency::NZD,
        )
        .unwrap()
    }

    #[test]
    fn test_total_derived_from_lines() {
        let invoice = dual_rate_invoice();
        // 215.00 * 1.2 + 41.00
        assert_eq!(invoice.total_amount.amount(), dec!(299.00));
        assert_eq!(invoice.status, InvoiceStatus::Pending);
        assert!(invoice.paid_date.is_none());
    }

    #[test]
    fn test_empty_invoice_is_immediately_paid() {
        let invoice = Invoice::new(
            MemberId::new(),
            vec![],
            NaiveDate::from_ymd_opt(2026, 9, 20).unwrap(),
            Currency::NZD,
        )
        .unwrap();

        assert!(invoice.total_amount.is_zero());
        assert_eq!(invoice.status, InvoiceStatus::Paid);
        assert!(invoice.paid_date.is_some());
        assert_eq!(
            derive_status(&invoice, &[], invoice.due_date).unwrap(),
            InvoiceStatus::Paid
        );
    }

    #[test]
    fn test_remaining_balance_subtracts_payments() {
        let invoice = dual_rate_invoice();
        let payments = vec![payment_against(&invoice, nzd(dec!(100.00)))];

        let remaining = remaining_balance(&invoice, &payments).unwrap();
        assert_eq!(remaining.amount(), dec!(199.00));
    }

    #[test]
    fn test_remaining_balance_ignores_other_invoices() {
        let invoice = dual_rate_invoice();
        let other = dual_rate_invoice();
        let mut stray = payment_against(&other, nzd(dec!(100.00)));
        stray.invoice_id = other.id;

        let remaining = remaining_balance(&invoice, &[stray]).unwrap();
        assert_eq!(remaining, invoice.total_amount);
    }

    #[test]
    fn test_derive_status_paid_exactly_at_total() {
        let invoice = dual_rate_invoice();
        let payments = vec![payment_against(&invoice, invoice.total_amount)];

        let status = derive_status(&invoice, &payments, invoice.due_date).unwrap();
        assert_eq!(status, InvoiceStatus::Paid);
    }

    #[test]
    fn test_derive_status_overdue_only_past_due_date() {
        let invoice = dual_rate_invoice();

        let on_due_day = derive_status(&invoice, &[], invoice.due_date).unwrap();
        assert_eq!(on_due_day, InvoiceStatus::Pending);

        let day_after = invoice.due_date.succ_opt().unwrap();
        let late = derive_status(&invoice, &[], day_after).unwrap();
        assert_eq!(late, InvoiceStatus::Overdue);
    }

    #[test]
    fn test_derive_status_paid_never_becomes_overdue() {
        let invoice = dual_rate_invoice();
        let payments = vec![payment_against(&invoice, invoice.total_amount)];

        let long_after = invoice.due_date + chrono::Days::new(90);
        let status = derive_status(&invoice, &payments, long_after).unwrap();
        assert_eq!(status, InvoiceStatus::Paid);
    }
}
