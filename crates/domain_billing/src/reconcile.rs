//! The reconciliation orchestrator
//!
//! Coordinates the invoice aggregator, credit ledger, and payment
//! recorder under one transactional boundary. A reconciliation attempt
//! either commits in full (credit debit, payment inserts, status
//! update) or leaves no trace.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use core_kernel::{InvoiceId, MemberId, Money, StaffId};

use crate::credit::CreditLedger;
use crate::error::ReconcileError;
use crate::invoice::{derive_status, remaining_balance, InvoiceStatus};
use crate::payment::{Payment, PaymentMethod, PaymentRecorder, PaymentRequest};
use crate::store::{BillingStore, BillingTx};

/// Lifecycle of one reconciliation attempt
///
/// `Validating` can fail straight to `Rejected` with no side effects;
/// `Committing` can fail to `RolledBack` with every side effect
/// undone. There is no partially-applied terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptState {
    Idle,
    Validating,
    Committing,
    Completed,
    Rejected,
    RolledBack,
}

impl fmt::Display for AttemptState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            AttemptState::Idle => "idle",
            AttemptState::Validating => "validating",
            AttemptState::Committing => "committing",
            AttemptState::Completed => "completed",
            AttemptState::Rejected => "rejected",
            AttemptState::RolledBack => "rolled_back",
        };
        write!(f, "{}", label)
    }
}

/// The instrument covering whatever credit does not
#[derive(Debug, Clone)]
pub struct RemainderPayment {
    /// Payment method; must not be `Credit`
    pub method: PaymentMethod,
    /// Must equal the remaining balance after credit, exactly
    pub amount: Money,
    /// External reference (bank ref, voucher code)
    pub reference_number: Option<String>,
}

impl RemainderPayment {
    pub fn new(method: PaymentMethod, amount: Money) -> Self {
        Self {
            method,
            amount,
            reference_number: None,
        }
    }

    pub fn with_reference(mut self, reference: impl Into<String>) -> Self {
        self.reference_number = Some(reference.into());
        self
    }
}

/// One reconciliation attempt: apply credit and/or one instrument
/// against an invoice's remaining balance
#[derive(Debug, Clone)]
pub struct ReconcileRequest {
    /// Invoice to settle
    pub invoice_id: InvoiceId,
    /// Paying member
    pub member_id: MemberId,
    /// Amount to draw from the member's credit account (may be zero)
    pub credit_to_apply: Money,
    /// Instrument for the balance left after credit
    pub remainder: Option<RemainderPayment>,
    /// Staff member recording the payment
    pub recorded_by: StaffId,
    /// Free-text notes copied onto each payment record
    pub notes: Option<String>,
}

/// Outcome of a completed reconciliation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconciliationResult {
    /// The payment records created by this attempt, in commit order
    pub payments: Vec<Payment>,
    /// The member's credit balance after any debit
    pub credit_balance: Money,
    /// The invoice's recomputed status
    pub invoice_status: InvoiceStatus,
}

/// Coordinates one reconciliation attempt end to end
pub struct Reconciler {
    store: Arc<dyn BillingStore>,
}

impl Reconciler {
    /// Creates a reconciler over the given store
    pub fn new(store: Arc<dyn BillingStore>) -> Self {
        Self { store }
    }

    /// Applies credit and/or an instrument against an invoice
    ///
    /// Runs the full algorithm inside a single store transaction:
    ///
    /// 1. Load invoice, payments, and credit balance
    /// 2. Compute the remaining balance; reject if already settled
    /// 3. Validate the credit draw against balance and remaining
    /// 4. Require an instrument for any balance left after credit
    /// 5. Debit credit and insert payment record(s)
    /// 6. Recompute and persist the invoice status
    /// 7. Commit atomically and report the result
    ///
    /// Validation failures reject the attempt before any write; a
    /// failure during commit rolls back every write.
    #[tracing::instrument(
        skip(self, request),
        fields(
            invoice_id = %request.invoice_id,
            member_id = %request.member_id,
            credit_to_apply = %request.credit_to_apply,
        )
    )]
    pub async fn reconcile(
        &self,
        request: ReconcileRequest,
    ) -> Result<ReconciliationResult, ReconcileError> {
        let invoice_id = request.invoice_id;
        let wrap = |e| ReconcileError::from_store(invoice_id, e);

        let mut tx = self.store.begin().await.map_err(wrap)?;
        let mut state = AttemptState::Validating;
        tracing::debug!(%state, "reconciliation attempt started");

        let outcome = self.run(tx.as_mut(), &request, &mut state).await;

        let (new_payments, credit_balance, invoice_status) = match outcome {
            Ok(parts) => parts,
            Err(err) => {
                // The transaction is dropped uncommitted; buffered
                // writes never reach the store.
                state = if state == AttemptState::Committing {
                    AttemptState::RolledBack
                } else {
                    AttemptState::Rejected
                };
                tracing::info!(%state, error = %err, "reconciliation attempt failed");
                return Err(err);
            }
        };

        tx.commit().await.map_err(|e| {
            tracing::warn!(state = %AttemptState::RolledBack, error = %e, "commit failed");
            wrap(e)
        })?;

        state = AttemptState::Completed;
        tracing::info!(
            %state,
            status = invoice_status_label(invoice_status),
            payments = new_payments.len(),
            "reconciliation committed"
        );

        Ok(ReconciliationResult {
            payments: new_payments,
            credit_balance,
            invoice_status,
        })
    }

    /// Validation and write phases, executed inside the caller's
    /// transaction. The caller owns commit/rollback.
    async fn run(
        &self,
        tx: &mut dyn BillingTx,
        request: &ReconcileRequest,
        state: &mut AttemptState,
    ) -> Result<(Vec<Payment>, Money, InvoiceStatus), ReconcileError> {
        let invoice_id = request.invoice_id;
        let wrap = |e| ReconcileError::from_store(invoice_id, e);

        // Step 1: transactional read of invoice, payments, and credit.
        let invoice = tx
            .invoice(invoice_id)
            .await
            .map_err(wrap)?
            .ok_or(ReconcileError::InvoiceNotFound(invoice_id))?;
        let prior_payments = tx.payments_for_invoice(invoice_id).await.map_err(wrap)?;
        let credit_account = tx.credit_account(request.member_id).await.map_err(wrap)?;

        let currency = invoice.currency();
        let credit_balance = credit_account
            .as_ref()
            .map(|a| a.balance)
            .unwrap_or_else(|| Money::zero(currency));

        // Step 2: remaining balance.
        let remaining = remaining_balance(&invoice, &prior_payments)?;
        if !remaining.is_positive() {
            return Err(ReconcileError::AlreadySettled { invoice_id });
        }

        // Step 3: validate the credit draw.
        let credit_to_apply = request.credit_to_apply;
        if credit_to_apply.is_negative()
            || credit_to_apply > credit_balance
            || credit_to_apply > remaining
        {
            return Err(ReconcileError::InvalidCreditAmount {
                requested: credit_to_apply,
                balance: credit_balance,
                remaining,
            });
        }
        // Step 4: an instrument is mandatory for any balance credit
        // does not cover.
        let after_credit = remaining.checked_sub(&credit_to_apply)?;
        let remainder = match (&request.remainder, after_credit.is_positive()) {
            (None, true) => {
                return Err(ReconcileError::PaymentMethodRequired {
                    invoice_id,
                    remaining: after_credit,
                });
            }
            (Some(r), true) => {
                if r.method.is_credit() {
                    return Err(ReconcileError::InvalidPayment {
                        reason: "remainder must use a non-credit instrument".to_string(),
                    });
                }
                if r.amount != after_credit {
                    return Err(ReconcileError::InvalidAmount {
                        amount: r.amount,
                        reason: format!(
                            "remainder must equal the post-credit balance of {}",
                            after_credit
                        ),
                    });
                }
                Some(r.clone())
            }
            (Some(_), false) => {
                tracing::debug!("credit covers the full balance; supplied remainder ignored");
                None
            }
            (None, false) => None,
        };

        // Step 5: atomic writes - debit plus paired payment record,
        // then the instrument record.
        *state = AttemptState::Committing;
        let mut new_payments = Vec::with_capacity(2);
        let mut new_credit_balance = credit_balance;

        if credit_to_apply.is_positive() {
            new_credit_balance =
                CreditLedger::debit(tx, invoice_id, request.member_id, credit_to_apply).await?;
            let credit_payment = PaymentRecorder::record(
                tx,
                PaymentRequest {
                    invoice_id,
                    member_id: request.member_id,
                    amount: credit_to_apply,
                    method: PaymentMethod::Credit,
                    reference_number: None,
                    notes: request.notes.clone(),
                    recorded_by: request.recorded_by,
                },
            )
            .await?;
            new_payments.push(credit_payment);
        }

        if let Some(remainder) = remainder {
            let instrument_payment = PaymentRecorder::record(
                tx,
                PaymentRequest {
                    invoice_id,
                    member_id: request.member_id,
                    amount: remainder.amount,
                    method: remainder.method,
                    reference_number: remainder.reference_number,
                    notes: request.notes.clone(),
                    recorded_by: request.recorded_by,
                },
            )
            .await?;
            new_payments.push(instrument_payment);
        }

        // Step 6: recompute status over prior plus new payments.
        let today = Utc::now().date_naive();
        let mut all_payments = prior_payments;
        all_payments.extend(new_payments.iter().cloned());
        let new_status = derive_status(&invoice, &all_payments, today)?;
        let paid_date = match new_status {
            InvoiceStatus::Paid => Some(today),
            _ => invoice.paid_date,
        };
        tx.update_invoice_status(invoice_id, new_status, paid_date)
            .await
            .map_err(wrap)?;

        Ok((new_payments, new_credit_balance, new_status))
    }
}

fn invoice_status_label(status: InvoiceStatus) -> &'static str {
    match status {
        InvoiceStatus::Pending => "pending",
        InvoiceStatus::Paid => "paid",
        InvoiceStatus::Overdue => "overdue",
    }
}
