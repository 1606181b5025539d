//! Billing DTOs

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use core_kernel::Currency;
use domain_billing::{
    Invoice, InvoiceStatus, Payment, PaymentMethod, ReconciliationResult,
};

fn default_currency() -> Currency {
    Currency::NZD
}

/// Request body for `POST /invoices/:id/reconcile`
#[derive(Debug, Deserialize)]
pub struct ReconcileRequestBody {
    pub member_id: Uuid,
    pub credit_to_apply: Decimal,
    #[serde(default = "default_currency")]
    pub currency: Currency,
    pub remainder: Option<RemainderBody>,
    pub recorded_by: Uuid,
    pub notes: Option<String>,
}

/// The non-credit instrument covering the balance left after credit
#[derive(Debug, Deserialize)]
pub struct RemainderBody {
    pub method: PaymentMethod,
    pub amount: Decimal,
    #[serde(default = "default_currency")]
    pub currency: Currency,
    pub reference_number: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PaymentResponse {
    pub id: Uuid,
    pub invoice_id: Uuid,
    pub amount: Decimal,
    pub currency: Currency,
    pub method: PaymentMethod,
    pub reference_number: Option<String>,
    pub receipt_number: String,
    pub payment_date: DateTime<Utc>,
}

impl From<&Payment> for PaymentResponse {
    fn from(payment: &Payment) -> Self {
        Self {
            id: *payment.id.as_uuid(),
            invoice_id: *payment.invoice_id.as_uuid(),
            amount: payment.amount.amount(),
            currency: payment.amount.currency(),
            method: payment.method,
            reference_number: payment.reference_number.clone(),
            receipt_number: payment.receipt_number.to_string(),
            payment_date: payment.payment_date,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ReconcileResponse {
    pub payments: Vec<PaymentResponse>,
    pub credit_balance: Decimal,
    pub invoice_status: InvoiceStatus,
}

impl From<&ReconciliationResult> for ReconcileResponse {
    fn from(result: &ReconciliationResult) -> Self {
        Self {
            payments: result.payments.iter().map(PaymentResponse::from).collect(),
            credit_balance: result.credit_balance.amount(),
            invoice_status: result.invoice_status,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ChargeLineResponse {
    pub description: String,
    pub unit_rate: Decimal,
    pub quantity: Decimal,
    pub amount: Decimal,
}

#[derive(Debug, Serialize)]
pub struct InvoiceResponse {
    pub id: Uuid,
    pub member_id: Uuid,
    pub charge_lines: Vec<ChargeLineResponse>,
    pub total_amount: Decimal,
    pub currency: Currency,
    pub paid_total: Decimal,
    pub remaining_balance: Decimal,
    pub status: InvoiceStatus,
    pub due_date: NaiveDate,
    pub paid_date: Option<NaiveDate>,
}

impl InvoiceResponse {
    pub fn from_parts(invoice: &Invoice, paid: Decimal, remaining: Decimal) -> Self {
        Self {
            id: *invoice.id.as_uuid(),
            member_id: *invoice.member_id.as_uuid(),
            charge_lines: invoice
                .charge_lines
                .iter()
                .map(|line| ChargeLineResponse {
                    description: line.description.clone(),
                    unit_rate: line.unit_rate.amount(),
                    quantity: line.quantity,
                    amount: line.amount.amount(),
                })
                .collect(),
            total_amount: invoice.total_amount.amount(),
            currency: invoice.total_amount.currency(),
            paid_total: paid,
            remaining_balance: remaining,
            status: invoice.status,
            due_date: invoice.due_date,
            paid_date: invoice.paid_date,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CreditAccountResponse {
    pub member_id: Uuid,
    pub balance: Decimal,
    pub currency: Currency,
    pub updated_at: DateTime<Utc>,
}
