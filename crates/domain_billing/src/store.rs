//! The transactional persistence port
//!
//! The reconciliation core does not implement storage. It consumes a
//! narrow port: filtered reads of invoices, payments, and credit
//! accounts, payment inserts, credit and status updates, and a single
//! atomic commit point. Adapters implement this port over PostgreSQL
//! (`infra_db`) or in memory (`test_utils`).

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use thiserror::Error;

use core_kernel::{InvoiceId, MemberId, Money};

use crate::credit::CreditAccount;
use crate::invoice::{Invoice, InvoiceStatus};
use crate::payment::{Payment, ReceiptNumber};

/// Error type for store operations
#[derive(Debug, Error)]
pub enum StoreError {
    /// The requested entity was not found
    #[error("Not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: String },

    /// A concurrent transaction modified data this transaction read
    #[error("Conflict: {message}")]
    Conflict { message: String },

    /// The commit was aborted; no writes were applied
    #[error("Commit failed: {message}")]
    CommitFailed {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The commit outcome is unknown (e.g., timeout mid-commit).
    /// Callers must re-query state rather than retry blindly.
    #[error("Outcome unknown for {operation}; re-query before retrying")]
    Indeterminate { operation: String },

    /// The backing store failed outside of commit
    #[error("Store backend error: {message}")]
    Backend {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl StoreError {
    /// Creates a NotFound error
    pub fn not_found(entity: &'static str, id: impl std::fmt::Display) -> Self {
        StoreError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Creates a Conflict error
    pub fn conflict(message: impl Into<String>) -> Self {
        StoreError::Conflict {
            message: message.into(),
        }
    }

    /// Creates a Backend error without a source
    pub fn backend(message: impl Into<String>) -> Self {
        StoreError::Backend {
            message: message.into(),
            source: None,
        }
    }

    /// Returns true if the caller may retry after re-reading state
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            StoreError::Conflict { .. } | StoreError::CommitFailed { .. }
        )
    }
}

/// Factory for billing transactions
#[async_trait]
pub trait BillingStore: Send + Sync {
    /// Begins a transaction
    ///
    /// All reads within the returned transaction observe a consistent
    /// view; all writes are buffered and applied atomically by
    /// [`BillingTx::commit`]. Dropping the transaction without
    /// committing discards every buffered write.
    async fn begin(&self) -> Result<Box<dyn BillingTx>, StoreError>;
}

/// One transactional unit of work against the billing store
///
/// Adapters must serialize transactions touching the same invoice or
/// the same credit account: either by holding exclusive row locks
/// until commit, or by verifying at commit time that rows read here
/// were not modified concurrently (failing with
/// [`StoreError::Conflict`]).
#[async_trait]
pub trait BillingTx: Send {
    /// Reads an invoice by id
    async fn invoice(&mut self, id: InvoiceId) -> Result<Option<Invoice>, StoreError>;

    /// Reads all payments recorded against an invoice
    async fn payments_for_invoice(&mut self, id: InvoiceId) -> Result<Vec<Payment>, StoreError>;

    /// Reads a member's credit account
    async fn credit_account(
        &mut self,
        member_id: MemberId,
    ) -> Result<Option<CreditAccount>, StoreError>;

    /// Allocates the next receipt number
    ///
    /// Numbers are unique and ascending across the store. A number
    /// allocated by a transaction that never commits is burned, never
    /// reissued.
    async fn next_receipt_number(&mut self) -> Result<ReceiptNumber, StoreError>;

    /// Buffers a payment insert
    async fn insert_payment(&mut self, payment: Payment) -> Result<(), StoreError>;

    /// Buffers a credit balance update
    async fn update_credit_balance(
        &mut self,
        member_id: MemberId,
        balance: Money,
        updated_at: DateTime<Utc>,
    ) -> Result<(), StoreError>;

    /// Buffers an invoice status update
    async fn update_invoice_status(
        &mut self,
        id: InvoiceId,
        status: InvoiceStatus,
        paid_date: Option<NaiveDate>,
    ) -> Result<(), StoreError>;

    /// Atomically applies every buffered write
    ///
    /// Either all writes land or none do. There is no cancellable
    /// midpoint once commit has begun; a timeout here surfaces as
    /// [`StoreError::Indeterminate`].
    async fn commit(self: Box<Self>) -> Result<(), StoreError>;
}
