use serde::{Deserialize, Serialize};

use paybook_core::{EmployeeId, Money, PayPeriod};
use paybook_payroll::PayrollSnapshot;

use crate::iban::{is_valid_bic, is_valid_iban, normalize};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentWarning {
    MissingIban,
    MalformedIban,
    MissingBic,
    MalformedBic,
    /// Net pay below zero; the record is kept with its negative amount.
    NegativeAmount,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentRecord {
    pub employee_id: EmployeeId,
    pub employee_name: String,
    pub iban: String,
    pub bic: String,
    pub amount: Money,
    pub description: String,
    pub warnings: Vec<PaymentWarning>,
}

impl PaymentRecord {
    pub fn from_snapshot(snapshot: &PayrollSnapshot) -> Self {
        let e = &snapshot.employee;
        let iban = e.iban.as_deref().map(normalize).unwrap_or_default();
        let bic = e.bic.as_deref().map(normalize).unwrap_or_default();
        let amount = snapshot.totals.net_salary;

        let mut warnings = Vec::new();
        if iban.is_empty() {
            warnings.push(PaymentWarning::MissingIban);
        } else if !is_valid_iban(&iban) {
            warnings.push(PaymentWarning::MalformedIban);
        }
        if bic.is_empty() {
            warnings.push(PaymentWarning::MissingBic);
        } else if !is_valid_bic(&bic) {
            warnings.push(PaymentWarning::MalformedBic);
        }
        if amount.is_negative() {
            warnings.push(PaymentWarning::NegativeAmount);
        }

        Self {
            employee_id: e.employee_id,
            employee_name: e.full_name(),
            iban,
            bic,
            amount,
            description: description(snapshot.period),
            warnings,
        }
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BankPaymentBatch {
    pub period: PayPeriod,
    pub records: Vec<PaymentRecord>,
    pub total: Money,
}

impl BankPaymentBatch {
    pub fn warning_count(&self) -> usize {
        self.records.iter().filter(|r| r.has_warnings()).count()
    }
}

/// Transfer reference, e.g. `Заплата 03/2025`.
pub fn description(period: PayPeriod) -> String {
    format!("Заплата {:02}/{}", period.month(), period.year())
}

/// One record per snapshot, in snapshot order; amounts are net pay unchanged.
pub fn build_batch(period: PayPeriod, snapshots: &[PayrollSnapshot]) -> BankPaymentBatch {
    let records: Vec<PaymentRecord> = snapshots.iter().map(PaymentRecord::from_snapshot).collect();
    let total = records.iter().map(|r| r.amount).sum();
    BankPaymentBatch { period, records, total }
}
