//! Billing handlers
//!
//! Reads open a transaction, fetch what they need, and drop it without
//! committing; the reconcile handler hands everything to the
//! orchestrator, which owns the transaction end to end.

use axum::{
    extract::{Path, State},
    Json,
};
use uuid::Uuid;

use core_kernel::{InvoiceId, MemberId, Money, StaffId};
use domain_billing::{
    remaining_balance, paid_total, ReconcileRequest, Reconciler, RemainderPayment,
};

use crate::dto::billing::{
    CreditAccountResponse, InvoiceResponse, PaymentResponse, ReconcileRequestBody,
    ReconcileResponse,
};
use crate::error::ApiError;
use crate::AppState;

/// Settles an invoice from account credit plus an optional instrument
pub async fn reconcile_invoice(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<ReconcileRequestBody>,
) -> Result<Json<ReconcileResponse>, ApiError> {
    let request = ReconcileRequest {
        invoice_id: InvoiceId::from_uuid(id),
        member_id: MemberId::from_uuid(body.member_id),
        credit_to_apply: Money::new(body.credit_to_apply, body.currency),
        remainder: body.remainder.map(|r| {
            let mut remainder = RemainderPayment::new(r.method, Money::new(r.amount, r.currency));
            if let Some(reference) = r.reference_number {
                remainder = remainder.with_reference(reference);
            }
            remainder
        }),
        recorded_by: StaffId::from_uuid(body.recorded_by),
        notes: body.notes,
    };

    let reconciler = Reconciler::new(state.store.clone());
    let result = reconciler.reconcile(request).await?;
    Ok(Json(ReconcileResponse::from(&result)))
}

/// Fetches an invoice with its derived paid and remaining amounts
pub async fn get_invoice(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<InvoiceResponse>, ApiError> {
    let invoice_id = InvoiceId::from_uuid(id);
    let mut tx = state.store.begin().await?;

    let invoice = tx
        .invoice(invoice_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Invoice not found: {invoice_id}")))?;
    let payments = tx.payments_for_invoice(invoice_id).await?;
    drop(tx);

    let paid = paid_total(&invoice, &payments)
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    let remaining = remaining_balance(&invoice, &payments)
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    Ok(Json(InvoiceResponse::from_parts(
        &invoice,
        paid.amount(),
        remaining.amount(),
    )))
}

/// Lists payments recorded against an invoice, in receipt order
pub async fn list_payments(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<PaymentResponse>>, ApiError> {
    let invoice_id = InvoiceId::from_uuid(id);
    let mut tx = state.store.begin().await?;

    if tx.invoice(invoice_id).await?.is_none() {
        return Err(ApiError::NotFound(format!("Invoice not found: {invoice_id}")));
    }
    let payments = tx.payments_for_invoice(invoice_id).await?;

    Ok(Json(payments.iter().map(PaymentResponse::from).collect()))
}

/// Fetches a member's credit account
pub async fn get_credit_account(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<CreditAccountResponse>, ApiError> {
    let member_id = MemberId::from_uuid(id);
    let mut tx = state.store.begin().await?;

    let account = tx
        .credit_account(member_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Credit account not found: {member_id}")))?;

    Ok(Json(CreditAccountResponse {
        member_id: *account.member_id.as_uuid(),
        balance: account.balance.amount(),
        currency: account.balance.currency(),
        updated_at: account.updated_at,
    }))
}
