//! Billing Domain - Invoice Payment Reconciliation
//!
//! This crate implements the reconciliation core for flight school
//! billing: converting charge line items into invoice totals, applying
//! member account credit, splitting the remainder onto a payment
//! instrument, and committing the result atomically.
//!
//! # Invariants
//!
//! After every reconciliation, with no exceptions:
//! - The sum of payments against an invoice never exceeds its total
//! - A credit balance is never negative at any committed point
//! - Every credit-method payment pairs 1:1 with a ledger debit of the
//!   same amount, committed in the same transaction
//! - An invoice is `Paid` exactly when its payments sum to its total
//!
//! # Example
//!
//! ```rust,ignore
//! use domain_billing::{Reconciler, ReconcileRequest, RemainderPayment, PaymentMethod};
//!
//! let reconciler = Reconciler::new(store);
//! let result = reconciler
//!     .reconcile(ReconcileRequest {
//!         invoice_id,
//!         member_id,
//!         credit_to_apply: Money::new(dec!(100.00), Currency::NZD),
//!         remainder: Some(RemainderPayment::new(PaymentMethod::Eftpos, eftpos_amount)),
//!         recorded_by: staff_id,
//!         notes: None,
//!     })
//!     .await?;
//! ```

pub mod invoice;
pub mod credit;
pub mod payment;
pub mod reconcile;
pub mod store;
pub mod error;

pub use invoice::{
    derive_status, paid_total, remaining_balance, ChargeKind, ChargeLine, Invoice, InvoiceStatus,
};
pub use credit::{CreditAccount, CreditLedger};
pub use payment::{Payment, PaymentMethod, PaymentRequest, PaymentRecorder, ReceiptNumber};
pub use reconcile::{Reconciler, ReconcileRequest, RemainderPayment, ReconciliationResult, AttemptState};
pub use store::{BillingStore, BillingTx, StoreError};
pub use error::ReconcileError;
