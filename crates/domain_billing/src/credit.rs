//! Member credit accounts and the credit ledger
//!
//! The ledger's debit operation is the sole writer of credit balances.
//! It has no commit of its own: it must run inside the orchestrator's
//! transaction, paired with the credit-method payment record it funds.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use core_kernel::{InvoiceId, MemberId, Money};

use crate::error::ReconcileError;
use crate::store::BillingTx;

/// A member's prepaid credit account
///
/// One per member. The balance is never negative at any committed
/// point.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreditAccount {
    /// Owning member
    pub member_id: MemberId,
    /// Current balance, >= 0
    pub balance: Money,
    /// Last mutation timestamp
    pub updated_at: DateTime<Utc>,
}

impl CreditAccount {
    /// Creates an account with an opening balance
    pub fn new(member_id: MemberId, balance: Money) -> Self {
        Self {
            member_id,
            balance,
            updated_at: Utc::now(),
        }
    }
}

/// Owns debits against member credit balances
pub struct CreditLedger;

impl CreditLedger {
    /// Debits a member's credit account, returning the new balance
    ///
    /// `invoice_id` names the reconciliation attempt the debit funds;
    /// it is used only for error context.
    ///
    /// # Errors
    ///
    /// * [`ReconcileError::InvalidAmount`] if `amount` is not positive
    /// * [`ReconcileError::AccountNotFound`] if the member has no account
    /// * [`ReconcileError::InsufficientCredit`] if `amount` exceeds the
    ///   balance; the balance is left unchanged
    pub async fn debit(
        tx: &mut dyn BillingTx,
        invoice_id: InvoiceId,
        member_id: MemberId,
        amount: Money,
    ) -> Result<Money, ReconcileError> {
        if !amount.is_positive() {
            return Err(ReconcileError::InvalidAmount {
                amount,
                reason: "credit debit must be positive".to_string(),
            });
        }

        let account = tx
            .credit_account(member_id)
            .await
            .map_err(|e| ReconcileError::from_store(invoice_id, e))?
            .ok_or(ReconcileError::AccountNotFound(member_id))?;

        if amount > account.balance {
            return Err(ReconcileError::InsufficientCredit {
                member_id,
                requested: amount,
                balance: account.balance,
            });
        }

        let new_balance = account.balance.checked_sub(&amount)?;
        let now: DateTime<Utc> = Utc::now();

        tx.update_credit_balance(member_id, new_balance, now)
            .await
            .map_err(|e| ReconcileError::from_store(invoice_id, e))?;

        tracing::debug!(
            member_id = %member_id,
            debited = %amount,
            new_balance = %new_balance,
            "credit debited"
        );

        Ok(new_balance)
    }
}
