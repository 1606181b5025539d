//! Test data builders
//!
//! Builder patterns for constructing billing test data with sensible
//! defaults; tests specify only the fields they care about.

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use core_kernel::{Currency, InvoiceId, MemberId, Money, PaymentId, StaffId};
use domain_billing::{
    ChargeKind, ChargeLine, CreditAccount, Invoice, Payment, PaymentMethod, ReceiptNumber,
};

use crate::fixtures::DateFixtures;

/// Builder for test invoices
pub struct TestInvoiceBuilder {
    member_id: MemberId,
    lines: Vec<ChargeLine>,
    due_date: NaiveDate,
    currency: Currency,
}

impl Default for TestInvoiceBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TestInvoiceBuilder {
    /// An NZD invoice with no charge lines, due in the future. Until
    /// lines are added the total is zero and the invoice builds as
    /// immediately `Paid`.
    pub fn new() -> Self {
        Self {
            member_id: MemberId::new(),
            lines: vec![],
            due_date: DateFixtures::future_due_date(),
            currency: Currency::NZD,
        }
    }

    pub fn member(mut self, member_id: MemberId) -> Self {
        self.member_id = member_id;
        self
    }

    pub fn due_date(mut self, due_date: NaiveDate) -> Self {
        self.due_date = due_date;
        self
    }

    /// Adds a flight charge line at an hourly rate
    pub fn flight_charge(mut self, description: &str, hourly_rate: Decimal, hours: Decimal) -> Self {
        self.lines.push(ChargeLine::new(
            ChargeKind::Flight,
            description,
            Money::new(hourly_rate, self.currency),
            hours,
        ));
        self
    }

    /// Adds an additional (non-flight) charge line
    pub fn additional_charge(mut self, description: &str, amount: Decimal) -> Self {
        self.lines.push(ChargeLine::new(
            ChargeKind::Additional,
            description,
            Money::new(amount, self.currency),
            dec!(1),
        ));
        self
    }

    /// Shorthand: a single charge line summing to `total`
    pub fn total(self, total: Decimal) -> Self {
        self.additional_charge("Account charge", total)
    }

    pub fn build(self) -> Invoice {
        Invoice::new(self.member_id, self.lines, self.due_date, self.currency)
            .expect("test invoice lines share one currency")
    }
}

/// Builder for committed test payments
pub struct TestPaymentBuilder {
    invoice_id: InvoiceId,
    member_id: MemberId,
    amount: Money,
    method: PaymentMethod,
    receipt_number: ReceiptNumber,
    recorded_by: StaffId,
}

impl TestPaymentBuilder {
    pub fn against(invoice: &Invoice) -> Self {
        Self {
            invoice_id: invoice.id,
            member_id: invoice.member_id,
            amount: invoice.total_amount,
            method: PaymentMethod::Eftpos,
            receipt_number: ReceiptNumber::new(1),
            recorded_by: StaffId::new(),
        }
    }

    pub fn amount(mut self, amount: Money) -> Self {
        self.amount = amount;
        self
    }

    pub fn method(mut self, method: PaymentMethod) -> Self {
        self.method = method;
        self
    }

    pub fn receipt(mut self, number: i64) -> Self {
        self.receipt_number = ReceiptNumber::new(number);
        self
    }

    pub fn recorded_by(mut self, staff: StaffId) -> Self {
        self.recorded_by = staff;
        self
    }

    pub fn build(self) -> Payment {
        let now = Utc::now();
        Payment {
            id: PaymentId::new_v7(),
            invoice_id: self.invoice_id,
            member_id: self.member_id,
            amount: self.amount,
            method: self.method,
            reference_number: None,
            notes: None,
            payment_date: now,
            receipt_number: self.receipt_number,
            recorded_by: self.recorded_by,
            created_at: now,
        }
    }
}

/// Builder for test credit accounts
pub struct TestCreditAccountBuilder {
    member_id: MemberId,
    balance: Money,
}

impl TestCreditAccountBuilder {
    pub fn for_member(member_id: MemberId) -> Self {
        Self {
            member_id,
            balance: Money::zero(Currency::NZD),
        }
    }

    pub fn balance(mut self, amount: Decimal) -> Self {
        self.balance = Money::new(amount, Currency::NZD);
        self
    }

    pub fn build(self) -> CreditAccount {
        CreditAccount::new(self.member_id, self.balance)
    }
}
