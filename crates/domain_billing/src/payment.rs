//! Payment records and the payment recorder
//!
//! Payments are immutable once created; a mistake is corrected with a
//! compensating record, never an edit.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use core_kernel::{InvoiceId, MemberId, PaymentId, Money, StaffId};

use crate::error::ReconcileError;
use crate::invoice::remaining_balance;
use crate::store::BillingTx;

/// Payment method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// EFTPOS terminal at the front desk
    Eftpos,
    /// Bank transfer
    BankTransfer,
    /// Gift or trial-flight voucher
    Voucher,
    /// Cash
    Cash,
    /// Drawn from the member's account credit
    Credit,
}

impl PaymentMethod {
    /// Returns true for the account-credit pseudo-instrument
    pub fn is_credit(&self) -> bool {
        matches!(self, PaymentMethod::Credit)
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            PaymentMethod::Eftpos => "eftpos",
            PaymentMethod::BankTransfer => "bank_transfer",
            PaymentMethod::Voucher => "voucher",
            PaymentMethod::Cash => "cash",
            PaymentMethod::Credit => "credit",
        };
        write!(f, "{}", label)
    }
}

/// A sequentially assigned receipt number
///
/// Unique across the store and never reused. Allocation happens inside
/// the commit transaction, so rolled-back attempts may leave gaps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReceiptNumber(i64);

impl ReceiptNumber {
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    pub fn value(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for ReceiptNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RCT-{:06}", self.0)
    }
}

/// A committed payment record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    /// Unique identifier
    pub id: PaymentId,
    /// Invoice being paid
    pub invoice_id: InvoiceId,
    /// Paying member
    pub member_id: MemberId,
    /// Amount, always positive
    pub amount: Money,
    /// Payment method
    pub method: PaymentMethod,
    /// External reference (bank ref, voucher code)
    pub reference_number: Option<String>,
    /// Free-text notes
    pub notes: Option<String>,
    /// When the payment was made
    pub payment_date: DateTime<Utc>,
    /// Receipt number stamped at commit
    pub receipt_number: ReceiptNumber,
    /// Staff member who recorded the payment (not the payer)
    pub recorded_by: StaffId,
    /// Created timestamp
    pub created_at: DateTime<Utc>,
}

/// A validated request to record one payment
#[derive(Debug, Clone)]
pub struct PaymentRequest {
    pub invoice_id: InvoiceId,
    pub member_id: MemberId,
    pub amount: Money,
    pub method: PaymentMethod,
    pub reference_number: Option<String>,
    pub notes: Option<String>,
    pub recorded_by: StaffId,
}

/// Validates and persists single payment records
///
/// Must be invoked inside the orchestrator's transaction: the
/// overpayment check re-reads the invoice and its payments through the
/// same transaction, so a concurrent attempt cannot slip a stale
/// balance past it.
pub struct PaymentRecorder;

impl PaymentRecorder {
    /// Records a payment against an invoice
    ///
    /// Validates that the amount is positive, the invoice exists, and
    /// the amount does not exceed the remaining balance computed at
    /// the instant of recording.
    ///
    /// # Errors
    ///
    /// * [`ReconcileError::InvalidPayment`] for a non-positive amount
    /// * [`ReconcileError::InvoiceNotFound`] if the invoice id does not resolve
    /// * [`ReconcileError::OverpaymentRejected`] if the amount exceeds
    ///   the remaining balance
    pub async fn record(
        tx: &mut dyn BillingTx,
        request: PaymentRequest,
    ) -> Result<Payment, ReconcileError> {
        if !request.amount.is_positive() {
            return Err(ReconcileError::InvalidPayment {
                reason: format!("payment amount must be positive, got {}", request.amount),
            });
        }

        let invoice = tx
            .invoice(request.invoice_id)
            .await
            .map_err(|e| ReconcileError::from_store(request.invoice_id, e))?
            .ok_or(ReconcileError::InvoiceNotFound(request.invoice_id))?;

        // Re-read inside the transaction; the begin-time snapshot may
        // be stale by now.
        let payments = tx
            .payments_for_invoice(request.invoice_id)
            .await
            .map_err(|e| ReconcileError::from_store(request.invoice_id, e))?;
        let remaining = remaining_balance(&invoice, &payments)?;

        if request.amount > remaining {
            return Err(ReconcileError::OverpaymentRejected {
                invoice_id: request.invoice_id,
                amount: request.amount,
                remaining,
            });
        }

        let receipt_number = tx
            .next_receipt_number()
            .await
            .map_err(|e| ReconcileError::from_store(request.invoice_id, e))?;

        let now = Utc::now();
        let payment = Payment {
            id: PaymentId::new_v7(),
            invoice_id: request.invoice_id,
            member_id: request.member_id,
            amount: request.amount,
            method: request.method,
            reference_number: request.reference_number,
            notes: request.notes,
            payment_date: now,
            receipt_number,
            recorded_by: request.recorded_by,
            created_at: now,
        };

        tx.insert_payment(payment.clone())
            .await
            .map_err(|e| ReconcileError::from_store(request.invoice_id, e))?;

        tracing::debug!(
            invoice_id = %request.invoice_id,
            receipt = %payment.receipt_number,
            method = %payment.method,
            amount = %payment.amount,
            "payment recorded"
        );

        Ok(payment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_receipt_number_display() {
        let rct = ReceiptNumber::new(42);
        assert_eq!(rct.to_string(), "RCT-000042");
        assert_eq!(rct.value(), 42);
    }

    #[test]
    fn test_receipt_numbers_order() {
        assert!(ReceiptNumber::new(7) < ReceiptNumber::new(8));
    }

    #[test]
    fn test_method_is_credit() {
        assert!(PaymentMethod::Credit.is_credit());
        assert!(!PaymentMethod::Eftpos.is_credit());
        assert!(!PaymentMethod::BankTransfer.is_credit());
    }

    #[test]
    fn test_method_display() {
        assert_eq!(PaymentMethod::BankTransfer.to_string(), "bank_transfer");
        assert_eq!(PaymentMethod::Eftpos.to_string(), "eftpos");
    }
}
