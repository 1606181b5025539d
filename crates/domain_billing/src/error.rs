//! Reconciliation error taxonomy
//!
//! Every failure below the orchestrator is wrapped into one of these
//! variants at the orchestrator boundary, carrying the attempted
//! amounts so the caller can decide whether to retry or prompt the
//! user.

use thiserror::Error;

use core_kernel::{InvoiceId, MemberId, Money, MoneyError};

use crate::store::StoreError;

/// Errors that can occur during payment reconciliation
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// A payment or debit amount is not positive, or a remainder does
    /// not match the outstanding balance after credit
    #[error("Invalid amount {amount}: {reason}")]
    InvalidAmount { amount: Money, reason: String },

    /// The requested credit draw is negative or exceeds what is
    /// available
    #[error(
        "Invalid credit amount {requested} (credit balance {balance}, invoice remaining {remaining})"
    )]
    InvalidCreditAmount {
        requested: Money,
        balance: Money,
        remaining: Money,
    },

    /// Credit does not cover the invoice and no instrument was given
    /// for the remainder
    #[error("A payment method is required for the remaining {remaining} on invoice {invoice_id}")]
    PaymentMethodRequired {
        invoice_id: InvoiceId,
        remaining: Money,
    },

    /// The invoice has no outstanding balance
    #[error("Invoice {invoice_id} is already settled")]
    AlreadySettled { invoice_id: InvoiceId },

    /// A debit was requested beyond the account balance
    #[error("Insufficient credit for member {member_id}: requested {requested}, balance {balance}")]
    InsufficientCredit {
        member_id: MemberId,
        requested: Money,
        balance: Money,
    },

    /// A payment request failed validation (bad amount, wrong method)
    #[error("Invalid payment: {reason}")]
    InvalidPayment { reason: String },

    /// A payment would push recorded payments past the invoice total
    #[error("Payment of {amount} exceeds remaining balance {remaining} on invoice {invoice_id}")]
    OverpaymentRejected {
        invoice_id: InvoiceId,
        amount: Money,
        remaining: Money,
    },

    /// The invoice does not exist
    #[error("Invoice not found: {0}")]
    InvoiceNotFound(InvoiceId),

    /// The member has no credit account
    #[error("Credit account not found for member {0}")]
    AccountNotFound(MemberId),

    /// A concurrent reconciliation won; re-fetch and retry with fresh
    /// values
    #[error("Concurrent modification detected on invoice {invoice_id}; re-fetch before retrying")]
    Conflict { invoice_id: InvoiceId },

    /// The transaction aborted; no partial state was committed
    #[error("Commit failed for invoice {invoice_id}: {reason}")]
    CommitFailed {
        invoice_id: InvoiceId,
        reason: String,
    },

    /// The commit outcome is unknown; the caller must re-query invoice
    /// and payment state before retrying
    #[error("Commit outcome unknown for invoice {invoice_id}; re-query before retrying")]
    Indeterminate { invoice_id: InvoiceId },

    /// Currency arithmetic failed (mixed-currency data)
    #[error(transparent)]
    Money(#[from] MoneyError),
}

impl ReconcileError {
    /// True for local validation failures that produced no side
    /// effects; retrying the same request cannot succeed.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            ReconcileError::InvalidAmount { .. }
                | ReconcileError::InvalidCreditAmount { .. }
                | ReconcileError::PaymentMethodRequired { .. }
                | ReconcileError::AlreadySettled { .. }
                | ReconcileError::InsufficientCredit { .. }
                | ReconcileError::InvalidPayment { .. }
                | ReconcileError::OverpaymentRejected { .. }
        )
    }

    /// True if the caller may retry after re-reading current state
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ReconcileError::Conflict { .. } | ReconcileError::CommitFailed { .. }
        )
    }

    /// Wraps a store error that surfaced while working on `invoice_id`
    pub(crate) fn from_store(invoice_id: InvoiceId, err: StoreError) -> Self {
        match err {
            StoreError::Conflict { .. } => ReconcileError::Conflict { invoice_id },
            StoreError::Indeterminate { .. } => ReconcileError::Indeterminate { invoice_id },
            other => ReconcileError::CommitFailed {
                invoice_id,
                reason: other.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_kernel::Currency;
    use rust_decimal_macros::dec;

    #[test]
    fn test_validation_errors_are_not_retryable() {
        let err = ReconcileError::AlreadySettled {
            invoice_id: InvoiceId::new(),
        };
        assert!(err.is_validation());
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_conflict_is_retryable() {
        let err = ReconcileError::Conflict {
            invoice_id: InvoiceId::new(),
        };
        assert!(err.is_retryable());
        assert!(!err.is_validation());
    }

    #[test]
    fn test_indeterminate_is_neither() {
        let err = ReconcileError::Indeterminate {
            invoice_id: InvoiceId::new(),
        };
        assert!(!err.is_retryable());
        assert!(!err.is_validation());
    }

    #[test]
    fn test_store_conflict_maps_to_conflict() {
        let invoice_id = InvoiceId::new();
        let err = ReconcileError::from_store(invoice_id, StoreError::conflict("version moved"));
        assert!(matches!(err, ReconcileError::Conflict { .. }));
    }

    #[test]
    fn test_message_carries_amounts() {
        let err = ReconcileError::InsufficientCredit {
            member_id: MemberId::new(),
            requested: Money::new(dec!(150.00), Currency::NZD),
            balance: Money::new(dec!(100.00), Currency::NZD),
        };
        let msg = err.to_string();
        assert!(msg.contains("150.00"));
        assert!(msg.contains("100.00"));
    }
}
