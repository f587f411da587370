use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use paybook_core::{Money, PayPeriod};

use crate::batch::BankPaymentBatch;

pub const HEADER: [&str; 5] = ["IBAN", "BIC", "Amount", "Beneficiary", "Reference"];

#[derive(Debug, Error)]
pub enum BankingError {
    #[error("failed to render payment file: {0}")]
    Render(String),
}

impl From<csv::Error> for BankingError {
    fn from(err: csv::Error) -> Self {
        BankingError::Render(err.to_string())
    }
}

/// Stored payment artifact, one per (tenant, period); regenerating replaces it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BankPaymentFile {
    pub period: PayPeriod,
    pub file_name: String,
    pub content: String,
    pub record_count: usize,
    pub total_amount: Money,
    pub generated_at: DateTime<Utc>,
}

pub fn file_name(bulstat: &str, period: PayPeriod) -> String {
    format!("SALARY_{}_{}_{:02}.CSV", bulstat, period.year(), period.month())
}

pub fn render_csv(
    bulstat: &str,
    batch: &BankPaymentBatch,
    generated_at: DateTime<Utc>,
) -> Result<BankPaymentFile, BankingError> {
    let mut csv = csv::WriterBuilder::new()
        .delimiter(b';')
        .terminator(csv::Terminator::CRLF)
        .from_writer(Vec::new());

    csv.write_record(HEADER)?;
    for r in &batch.records {
        csv.write_record([
            r.iban.as_str(),
            r.bic.as_str(),
            r.amount.to_string().as_str(),
            r.employee_name.as_str(),
            r.description.as_str(),
        ])?;
    }

    let bytes = csv
        .into_inner()
        .map_err(|e| BankingError::Render(e.error().to_string()))?;
    let content =
        String::from_utf8(bytes).map_err(|e| BankingError::Render(e.to_string()))?;

    Ok(BankPaymentFile {
        period: batch.period,
        file_name: file_name(bulstat.trim(), batch.period),
        content,
        record_count: batch.records.len(),
        total_amount: batch.total,
        generated_at,
    })
}
