//! In-memory billing store
//!
//! Implements the `BillingStore` port with optimistic concurrency:
//! each transaction records the version of every invoice and credit
//! account it reads, and commit fails with `StoreError::Conflict` if
//! any of those rows changed since. Writes are buffered in the
//! transaction and applied only at commit, so a dropped transaction
//! leaves no trace.
//!
//! Fault injection hooks let tests force an insert failure (to verify
//! rollback of the paired credit debit), a commit failure, or an
//! indeterminate commit outcome. A commit barrier lets two concurrent
//! reconciliation attempts deterministically race to the commit point.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use tokio::sync::{Barrier, Mutex};

use core_kernel::{InvoiceId, MemberId, Money};
use domain_billing::{
    BillingStore, BillingTx, CreditAccount, Invoice, InvoiceStatus, Payment, ReceiptNumber,
    StoreError,
};

#[derive(Default)]
struct Faults {
    /// Countdown to a forced insert failure: `Some(0)` fails the next
    /// insert, `Some(1)` the one after, and so on
    fail_payment_insert_in: Option<u32>,
    fail_next_commit: bool,
    indeterminate_next_commit: bool,
}

#[derive(Default)]
struct StoreInner {
    invoices: HashMap<InvoiceId, Invoice>,
    payments: Vec<Payment>,
    credit_accounts: HashMap<MemberId, CreditAccount>,
    invoice_versions: HashMap<InvoiceId, u64>,
    account_versions: HashMap<MemberId, u64>,
    receipt_seq: i64,
    faults: Faults,
}

/// An in-memory `BillingStore` for tests
#[derive(Clone, Default)]
pub struct InMemoryBillingStore {
    inner: Arc<Mutex<StoreInner>>,
    commit_barrier: Arc<Mutex<Option<Arc<Barrier>>>>,
}

impl InMemoryBillingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds an invoice
    pub async fn seed_invoice(&self, invoice: Invoice) {
        let mut inner = self.inner.lock().await;
        inner.invoice_versions.insert(invoice.id, 0);
        inner.invoices.insert(invoice.id, invoice);
    }

    /// Seeds a payment record
    pub async fn seed_payment(&self, payment: Payment) {
        let mut inner = self.inner.lock().await;
        let version = inner.invoice_versions.entry(payment.invoice_id).or_default();
        *version += 1;
        inner.receipt_seq = inner.receipt_seq.max(payment.receipt_number.value());
        inner.payments.push(payment);
    }

    /// Seeds a credit account
    pub async fn seed_credit_account(&self, account: CreditAccount) {
        let mut inner = self.inner.lock().await;
        inner.account_versions.insert(account.member_id, 0);
        inner.credit_accounts.insert(account.member_id, account);
    }

    /// Returns a committed invoice
    pub async fn stored_invoice(&self, id: InvoiceId) -> Option<Invoice> {
        self.inner.lock().await.invoices.get(&id).cloned()
    }

    /// Returns the committed payments against an invoice
    pub async fn stored_payments(&self, id: InvoiceId) -> Vec<Payment> {
        self.inner
            .lock()
            .await
            .payments
            .iter()
            .filter(|p| p.invoice_id == id)
            .cloned()
            .collect()
    }

    /// Returns a committed credit account
    pub async fn stored_credit_account(&self, member_id: MemberId) -> Option<CreditAccount> {
        self.inner.lock().await.credit_accounts.get(&member_id).cloned()
    }

    /// Makes the next `insert_payment` fail with a backend error
    pub async fn fail_next_payment_insert(&self) {
        self.fail_payment_insert_in(0).await;
    }

    /// Makes the insert after `skip` successful inserts fail
    ///
    /// `skip = 1` lets the credit-payment insert through and fails the
    /// remainder insert.
    pub async fn fail_payment_insert_in(&self, skip: u32) {
        self.inner.lock().await.faults.fail_payment_insert_in = Some(skip);
    }

    /// Makes the next `commit` fail with `CommitFailed`
    pub async fn fail_next_commit(&self) {
        self.inner.lock().await.faults.fail_next_commit = true;
    }

    /// Makes the next `commit` report an unknown outcome, applying
    /// nothing
    pub async fn indeterminate_next_commit(&self) {
        self.inner.lock().await.faults.indeterminate_next_commit = true;
    }

    /// Holds every commit at a barrier until `participants`
    /// transactions have reached it
    ///
    /// Lets a test line up concurrent reconciliation attempts so both
    /// validate against the same state before either commits; the
    /// loser then observes a version conflict.
    pub async fn gate_commits(&self, participants: usize) {
        let mut gate = self.commit_barrier.lock().await;
        *gate = Some(Arc::new(Barrier::new(participants)));
    }
}

#[async_trait]
impl BillingStore for InMemoryBillingStore {
    async fn begin(&self) -> Result<Box<dyn BillingTx>, StoreError> {
        Ok(Box::new(InMemoryTx {
            store: Arc::clone(&self.inner),
            commit_barrier: self.commit_barrier.lock().await.clone(),
            read_invoice_versions: HashMap::new(),
            read_account_versions: HashMap::new(),
            staged: Vec::new(),
        }))
    }
}

enum StagedWrite {
    InsertPayment(Payment),
    UpdateCredit {
        member_id: MemberId,
        balance: Money,
        updated_at: DateTime<Utc>,
    },
    UpdateInvoiceStatus {
        id: InvoiceId,
        status: InvoiceStatus,
        paid_date: Option<NaiveDate>,
    },
}

struct InMemoryTx {
    store: Arc<Mutex<StoreInner>>,
    commit_barrier: Option<Arc<Barrier>>,
    read_invoice_versions: HashMap<InvoiceId, u64>,
    read_account_versions: HashMap<MemberId, u64>,
    staged: Vec<StagedWrite>,
}

#[async_trait]
impl BillingTx for InMemoryTx {
    async fn invoice(&mut self, id: InvoiceId) -> Result<Option<Invoice>, StoreError> {
        let inner = self.store.lock().await;
        if let Some(version) = inner.invoice_versions.get(&id) {
            self.read_invoice_versions.insert(id, *version);
        }
        Ok(inner.invoices.get(&id).cloned())
    }

    async fn payments_for_invoice(&mut self, id: InvoiceId) -> Result<Vec<Payment>, StoreError> {
        let inner = self.store.lock().await;
        if let Some(version) = inner.invoice_versions.get(&id) {
            self.read_invoice_versions.insert(id, *version);
        }
        let mut payments: Vec<Payment> = inner
            .payments
            .iter()
            .filter(|p| p.invoice_id == id)
            .cloned()
            .collect();
        drop(inner);
        // A transaction sees its own staged inserts, like a database
        // transaction re-reading rows it has written.
        payments.extend(self.staged.iter().filter_map(|write| match write {
            StagedWrite::InsertPayment(p) if p.invoice_id == id => Some(p.clone()),
            _ => None,
        }));
        Ok(payments)
    }

    async fn credit_account(
        &mut self,
        member_id: MemberId,
    ) -> Result<Option<CreditAccount>, StoreError> {
        let inner = self.store.lock().await;
        if let Some(version) = inner.account_versions.get(&member_id) {
            self.read_account_versions.insert(member_id, *version);
        }
        Ok(inner.credit_accounts.get(&member_id).cloned())
    }

    async fn next_receipt_number(&mut self) -> Result<ReceiptNumber, StoreError> {
        // Allocated against the shared sequence immediately, like a
        // database sequence: a rollback burns the number.
        let mut inner = self.store.lock().await;
        inner.receipt_seq += 1;
        Ok(ReceiptNumber::new(inner.receipt_seq))
    }

    async fn insert_payment(&mut self, payment: Payment) -> Result<(), StoreError> {
        let mut inner = self.store.lock().await;
        match inner.faults.fail_payment_insert_in {
            Some(0) => {
                inner.faults.fail_payment_insert_in = None;
                return Err(StoreError::backend("injected payment insert failure"));
            }
            Some(n) => inner.faults.fail_payment_insert_in = Some(n - 1),
            None => {}
        }
        drop(inner);
        self.staged.push(StagedWrite::InsertPayment(payment));
        Ok(())
    }

    async fn update_credit_balance(
        &mut self,
        member_id: MemberId,
        balance: Money,
        updated_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        self.staged.push(StagedWrite::UpdateCredit {
            member_id,
            balance,
            updated_at,
        });
        Ok(())
    }

    async fn update_invoice_status(
        &mut self,
        id: InvoiceId,
        status: InvoiceStatus,
        paid_date: Option<NaiveDate>,
    ) -> Result<(), StoreError> {
        self.staged.push(StagedWrite::UpdateInvoiceStatus {
            id,
            status,
            paid_date,
        });
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        if let Some(barrier) = &self.commit_barrier {
            barrier.wait().await;
        }

        let mut inner = self.store.lock().await;

        if inner.faults.fail_next_commit {
            inner.faults.fail_next_commit = false;
            return Err(StoreError::CommitFailed {
                message: "injected commit failure".to_string(),
                source: None,
            });
        }
        if inner.faults.indeterminate_next_commit {
            inner.faults.indeterminate_next_commit = false;
            return Err(StoreError::Indeterminate {
                operation: "commit".to_string(),
            });
        }

        // Optimistic check: every row read by this transaction must
        // still be at the version it was read at.
        for (id, read_version) in &self.read_invoice_versions {
            let current = inner.invoice_versions.get(id).copied().unwrap_or_default();
            if current != *read_version {
                return Err(StoreError::conflict(format!(
                    "invoice {} modified concurrently",
                    id
                )));
            }
        }
        for (member_id, read_version) in &self.read_account_versions {
            let current = inner
                .account_versions
                .get(member_id)
                .copied()
                .unwrap_or_default();
            if current != *read_version {
                return Err(StoreError::conflict(format!(
                    "credit account for {} modified concurrently",
                    member_id
                )));
            }
        }

        // Validate every write target before applying anything, so a
        // bad commit applies no writes at all.
        for write in &self.staged {
            match write {
                StagedWrite::UpdateCredit { member_id, .. } => {
                    if !inner.credit_accounts.contains_key(member_id) {
                        return Err(StoreError::not_found("CreditAccount", member_id));
                    }
                }
                StagedWrite::UpdateInvoiceStatus { id, .. } => {
                    if !inner.invoices.contains_key(id) {
                        return Err(StoreError::not_found("Invoice", id));
                    }
                }
                StagedWrite::InsertPayment(_) => {}
            }
        }

        for write in self.staged {
            match write {
                StagedWrite::InsertPayment(payment) => {
                    let version = inner.invoice_versions.entry(payment.invoice_id).or_default();
                    *version += 1;
                    inner.payments.push(payment);
                }
                StagedWrite::UpdateCredit {
                    member_id,
                    balance,
                    updated_at,
                } => {
                    if let Some(account) = inner.credit_accounts.get_mut(&member_id) {
                        account.balance = balance;
                        account.updated_at = updated_at;
                    }
                    *inner.account_versions.entry(member_id).or_default() += 1;
                }
                StagedWrite::UpdateInvoiceStatus {
                    id,
                    status,
                    paid_date,
                } => {
                    if let Some(invoice) = inner.invoices.get_mut(&id) {
                        invoice.status = status;
                        invoice.paid_date = paid_date;
                        invoice.updated_at = Utc::now();
                    }
                    *inner.invoice_versions.entry(id).or_default() += 1;
                }
            }
        }

        Ok(())
    }
}
