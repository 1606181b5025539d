//! PostgreSQL implementation of the billing store port
//!
//! Serialization between concurrent reconciliation attempts relies on
//! `SELECT ... FOR UPDATE`: reading an invoice or a credit account
//! inside a transaction takes an exclusive row lock held until commit,
//! so two attempts over the same rows cannot interleave. A
//! serialization failure or deadlock raised by PostgreSQL surfaces as
//! `StoreError::Conflict`.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::PgPool;
use sqlx::{FromRow, Postgres, Transaction};
use uuid::Uuid;

use core_kernel::{
    BookingId, Currency, InvoiceId, MemberId, Money, PaymentId, StaffId,
};
use domain_billing::{
    BillingStore, BillingTx, ChargeKind, ChargeLine, CreditAccount, Invoice, InvoiceStatus,
    Payment, PaymentMethod, ReceiptNumber, StoreError,
};

use crate::error::DatabaseError;

/// Billing store backed by PostgreSQL
#[derive(Debug, Clone)]
pub struct PgBillingStore {
    pool: PgPool,
}

impl PgBillingStore {
    /// Creates a new store over the given connection pool
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BillingStore for PgBillingStore {
    async fn begin(&self) -> Result<Box<dyn BillingTx>, StoreError> {
        let tx = self.pool.begin().await.map_err(lift)?;
        Ok(Box::new(PgBillingTx { tx }))
    }
}

struct PgBillingTx {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl BillingTx for PgBillingTx {
    async fn invoice(&mut self, id: InvoiceId) -> Result<Option<Invoice>, StoreError> {
        let row: Option<InvoiceRow> = sqlx::query_as(
            r#"
            SELECT invoice_id, member_id, total_amount, currency, status,
                   due_date, paid_date, created_at, updated_at
            FROM invoices
            WHERE invoice_id = $1
            FOR UPDATE
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(lift)?;

        let Some(row) = row else {
            return Ok(None);
        };

        let lines: Vec<ChargeLineRow> = sqlx::query_as(
            r#"
            SELECT line_id, kind, description, unit_rate, quantity, amount,
                   currency, booking_id
            FROM charge_lines
            WHERE invoice_id = $1
            ORDER BY position
            "#,
        )
        .bind(id.as_uuid())
        .fetch_all(&mut *self.tx)
        .await
        .map_err(lift)?;

        let charge_lines = lines
            .into_iter()
            .map(ChargeLineRow::into_domain)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Some(row.into_domain(charge_lines)?))
    }

    async fn payments_for_invoice(&mut self, id: InvoiceId) -> Result<Vec<Payment>, StoreError> {
        let rows: Vec<PaymentRow> = sqlx::query_as(
            r#"
            SELECT payment_id, invoice_id, member_id, amount, currency,
                   method, reference_number, notes, payment_date,
                   receipt_number, recorded_by, created_at
            FROM payments
            WHERE invoice_id = $1
            ORDER BY receipt_number
            "#,
        )
        .bind(id.as_uuid())
        .fetch_all(&mut *self.tx)
        .await
        .map_err(lift)?;

        rows.into_iter()
            .map(PaymentRow::into_domain)
            .collect::<Result<Vec<_>, _>>()
            .map_err(StoreError::from)
    }

    async fn credit_account(
        &mut self,
        member_id: MemberId,
    ) -> Result<Option<CreditAccount>, StoreError> {
        let row: Option<CreditAccountRow> = sqlx::query_as(
            r#"
            SELECT member_id, balance, currency, updated_at
            FROM credit_accounts
            WHERE member_id = $1
            FOR UPDATE
            "#,
        )
        .bind(member_id.as_uuid())
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(lift)?;

        row.map(CreditAccountRow::into_domain)
            .transpose()
            .map_err(StoreError::from)
    }

    async fn next_receipt_number(&mut self) -> Result<ReceiptNumber, StoreError> {
        let (next,): (i64,) = sqlx::query_as("SELECT nextval('receipt_numbers')")
            .fetch_one(&mut *self.tx)
            .await
            .map_err(lift)?;
        Ok(ReceiptNumber::new(next))
    }

    async fn insert_payment(&mut self, payment: Payment) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO payments (
                payment_id, invoice_id, member_id, amount, currency,
                method, reference_number, notes, payment_date,
                receipt_number, recorded_by, created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(payment.id.as_uuid())
        .bind(payment.invoice_id.as_uuid())
        .bind(payment.member_id.as_uuid())
        .bind(payment.amount.amount())
        .bind(payment.amount.currency().code())
        .bind(payment.method.to_string())
        .bind(&payment.reference_number)
        .bind(&payment.notes)
        .bind(payment.payment_date)
        .bind(payment.receipt_number.value())
        .bind(payment.recorded_by.as_uuid())
        .bind(payment.created_at)
        .execute(&mut *self.tx)
        .await
        .map_err(lift)?;
        Ok(())
    }

    async fn update_credit_balance(
        &mut self,
        member_id: MemberId,
        balance: Money,
        updated_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE credit_accounts
            SET balance = $2, updated_at = $3
            WHERE member_id = $1
            "#,
        )
        .bind(member_id.as_uuid())
        .bind(balance.amount())
        .bind(updated_at)
        .execute(&mut *self.tx)
        .await
        .map_err(lift)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("CreditAccount", member_id));
        }
        Ok(())
    }

    async fn update_invoice_status(
        &mut self,
        id: InvoiceId,
        status: InvoiceStatus,
        paid_date: Option<NaiveDate>,
    ) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE invoices
            SET status = $2, paid_date = $3, updated_at = now()
            WHERE invoice_id = $1
            "#,
        )
        .bind(id.as_uuid())
        .bind(status_label(status))
        .bind(paid_date)
        .execute(&mut *self.tx)
        .await
        .map_err(lift)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("Invoice", id));
        }
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        self.tx.commit().await.map_err(|e| match &e {
            // The commit round trip was interrupted; the server may or
            // may not have applied it. Callers must re-query.
            sqlx::Error::Io(_) | sqlx::Error::PoolTimedOut => StoreError::Indeterminate {
                operation: "commit".to_string(),
            },
            _ => match DatabaseError::from(&e) {
                DatabaseError::ConcurrencyConflict(message) => StoreError::Conflict { message },
                other => StoreError::CommitFailed {
                    message: other.to_string(),
                    source: Some(Box::new(other)),
                },
            },
        })
    }
}

fn lift(error: sqlx::Error) -> StoreError {
    StoreError::from(DatabaseError::from(&error))
}

#[derive(Debug, FromRow)]
struct InvoiceRow {
    invoice_id: Uuid,
    member_id: Uuid,
    total_amount: Decimal,
    currency: String,
    status: String,
    due_date: NaiveDate,
    paid_date: Option<NaiveDate>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl InvoiceRow {
    fn into_domain(self, charge_lines: Vec<ChargeLine>) -> Result<Invoice, DatabaseError> {
        let currency = parse_currency(&self.currency)?;
        Ok(Invoice {
            id: InvoiceId::from_uuid(self.invoice_id),
            member_id: MemberId::from_uuid(self.member_id),
            charge_lines,
            total_amount: Money::new(self.total_amount, currency),
            status: parse_status(&self.status)?,
            due_date: self.due_date,
            paid_date: self.paid_date,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct ChargeLineRow {
    line_id: Uuid,
    kind: String,
    description: String,
    unit_rate: Decimal,
    quantity: Decimal,
    amount: Decimal,
    currency: String,
    booking_id: Option<Uuid>,
}

impl ChargeLineRow {
    fn into_domain(self) -> Result<ChargeLine, DatabaseError> {
        let currency = parse_currency(&self.currency)?;
        Ok(ChargeLine {
            id: self.line_id,
            kind: parse_kind(&self.kind)?,
            description: self.description,
            unit_rate: Money::new(self.unit_rate, currency),
            quantity: self.quantity,
            amount: Money::new(self.amount, currency),
            booking_id: self.booking_id.map(BookingId::from_uuid),
        })
    }
}

#[derive(Debug, FromRow)]
struct PaymentRow {
    payment_id: Uuid,
    invoice_id: Uuid,
    member_id: Uuid,
    amount: Decimal,
    currency: String,
    method: String,
    reference_number: Option<String>,
    notes: Option<String>,
    payment_date: DateTime<Utc>,
    receipt_number: i64,
    recorded_by: Uuid,
    created_at: DateTime<Utc>,
}

impl PaymentRow {
    fn into_domain(self) -> Result<Payment, DatabaseError> {
        let currency = parse_currency(&self.currency)?;
        Ok(Payment {
            id: PaymentId::from_uuid(self.payment_id),
            invoice_id: InvoiceId::from_uuid(self.invoice_id),
            member_id: MemberId::from_uuid(self.member_id),
            amount: Money::new(self.amount, currency),
            method: parse_method(&self.method)?,
            reference_number: self.reference_number,
            notes: self.notes,
            payment_date: self.payment_date,
            receipt_number: ReceiptNumber::new(self.receipt_number),
            recorded_by: StaffId::from_uuid(self.recorded_by),
            created_at: self.created_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct CreditAccountRow {
    member_id: Uuid,
    balance: Decimal,
    currency: String,
    updated_at: DateTime<Utc>,
}

impl CreditAccountRow {
    fn into_domain(self) -> Result<CreditAccount, DatabaseError> {
        let currency = parse_currency(&self.currency)?;
        Ok(CreditAccount {
            member_id: MemberId::from_uuid(self.member_id),
            balance: Money::new(self.balance, currency),
            updated_at: self.updated_at,
        })
    }
}

fn parse_currency(value: &str) -> Result<Currency, DatabaseError> {
    match value {
        "NZD" => Ok(Currency::NZD),
        "AUD" => Ok(Currency::AUD),
        "USD" => Ok(Currency::USD),
        other => Err(DatabaseError::row_mapping("currency", other)),
    }
}

fn parse_status(value: &str) -> Result<InvoiceStatus, DatabaseError> {
    match value {
        "pending" => Ok(InvoiceStatus::Pending),
        "paid" => Ok(InvoiceStatus::Paid),
        "overdue" => Ok(InvoiceStatus::Overdue),
        other => Err(DatabaseError::row_mapping("status", other)),
    }
}

fn status_label(status: InvoiceStatus) -> &'static str {
    match status {
        InvoiceStatus::Pending => "pending",
        InvoiceStatus::Paid => "paid",
        InvoiceStatus::Overdue => "overdue",
    }
}

fn parse_kind(value: &str) -> Result<ChargeKind, DatabaseError> {
    match value {
        "flight" => Ok(ChargeKind::Flight),
        "additional" => Ok(ChargeKind::Additional),
        other => Err(DatabaseError::row_mapping("kind", other)),
    }
}

fn parse_method(value: &str) -> Result<PaymentMethod, DatabaseError> {
    match value {
        "eftpos" => Ok(PaymentMethod::Eftpos),
        "bank_transfer" => Ok(PaymentMethod::BankTransfer),
        "voucher" => Ok(PaymentMethod::Voucher),
        "cash" => Ok(PaymentMethod::Cash),
        "credit" => Ok(PaymentMethod::Credit),
        other => Err(DatabaseError::row_mapping("method", other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_labels_round_trip() {
        for status in [
            InvoiceStatus::Pending,
            InvoiceStatus::Paid,
            InvoiceStatus::Overdue,
        ] {
            assert_eq!(parse_status(status_label(status)).unwrap(), status);
        }
    }

    #[test]
    fn method_labels_round_trip() {
        for method in [
            PaymentMethod::Eftpos,
            PaymentMethod::BankTransfer,
            PaymentMethod::Voucher,
            PaymentMethod::Cash,
            PaymentMethod::Credit,
        ] {
            assert_eq!(parse_method(&method.to_string()).unwrap(), method);
        }
    }

    #[test]
    fn unknown_stored_method_is_a_mapping_error() {
        let err = parse_method("cheque").unwrap_err();
        assert!(err.to_string().contains("cheque"));
    }

    #[test]
    fn invoice_row_maps_both_timestamps() {
        let created = Utc::now() - chrono::Duration::days(3);
        let updated = Utc::now();
        let row = InvoiceRow {
            invoice_id: Uuid::new_v4(),
            member_id: Uuid::new_v4(),
            total_amount: Decimal::new(29900, 2),
            currency: "NZD".to_string(),
            status: "pending".to_string(),
            due_date: NaiveDate::from_ymd_opt(2026, 9, 14).unwrap(),
            paid_date: None,
            created_at: created,
            updated_at: updated,
        };

        let invoice = row.into_domain(Vec::new()).unwrap();
        assert_eq!(invoice.created_at, created);
        assert_eq!(invoice.updated_at, updated);
        assert_eq!(invoice.status, InvoiceStatus::Pending);
    }
}
