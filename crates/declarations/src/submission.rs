//! The immutable submission ledger row.

use core::str::FromStr;

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};

use paybook_core::{DateRange, DomainError, EmployeeId, PayPeriod, SubmissionId, TenantId};

use crate::file::DeclarationFile;
use crate::validation::ValidationError;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeclarationType {
    #[serde(rename = "D1")]
    D1,
    #[serde(rename = "D6_INS")]
    D6Insurance,
    #[serde(rename = "D6_TAX")]
    D6Tax,
    #[serde(rename = "ART62")]
    Art62,
    #[serde(rename = "ART123")]
    Art123,
    #[serde(rename = "ART73")]
    Art73,
}

impl DeclarationType {
    pub const ALL: [DeclarationType; 6] = [
        DeclarationType::D1,
        DeclarationType::D6Insurance,
        DeclarationType::D6Tax,
        DeclarationType::Art62,
        DeclarationType::Art123,
        DeclarationType::Art73,
    ];

    pub fn code(self) -> &'static str {
        match self {
            DeclarationType::D1 => "D1",
            DeclarationType::D6Insurance => "D6_INS",
            DeclarationType::D6Tax => "D6_TAX",
            DeclarationType::Art62 => "ART62",
            DeclarationType::Art123 => "ART123",
            DeclarationType::Art73 => "ART73",
        }
    }

    /// URL path segment, e.g. `d6-ins`.
    pub fn slug(self) -> &'static str {
        match self {
            DeclarationType::D1 => "d1",
            DeclarationType::D6Insurance => "d6-ins",
            DeclarationType::D6Tax => "d6-tax",
            DeclarationType::Art62 => "art62",
            DeclarationType::Art123 => "art123",
            DeclarationType::Art73 => "art73",
        }
    }
}

impl core::fmt::Display for DeclarationType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for DeclarationType {
    type Err = DomainError;

    /// Accepts either the slug or the code, case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        DeclarationType::ALL
            .into_iter()
            .find(|t| t.slug().eq_ignore_ascii_case(wanted) || t.code().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| DomainError::validation(format!("unknown declaration type '{s}'")))
    }
}

/// Correction code carried by NRA files: 0 regular, 1 correcting, 8 voiding.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum CorrectionCode {
    #[default]
    Regular,
    Correcting,
    Voiding,
}

impl CorrectionCode {
    pub fn code(self) -> u8 {
        match self {
            CorrectionCode::Regular => 0,
            CorrectionCode::Correcting => 1,
            CorrectionCode::Voiding => 8,
        }
    }

    pub fn is_regular(self) -> bool {
        self == CorrectionCode::Regular
    }
}

impl From<CorrectionCode> for u8 {
    fn from(value: CorrectionCode) -> Self {
        value.code()
    }
}

impl TryFrom<u8> for CorrectionCode {
    type Error = DomainError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(CorrectionCode::Regular),
            1 => Ok(CorrectionCode::Correcting),
            8 => Ok(CorrectionCode::Voiding),
            other => Err(DomainError::validation(format!(
                "correction code must be 0, 1 or 8 (got {other})"
            ))),
        }
    }
}

/// What a filing covers.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FilingPeriod {
    Month { period: PayPeriod },
    Range { range: DateRange },
    Year { year: i32 },
}

impl FilingPeriod {
    pub fn year(&self) -> i32 {
        match self {
            FilingPeriod::Month { period } => period.year(),
            FilingPeriod::Range { range } => range.from().year(),
            FilingPeriod::Year { year } => *year,
        }
    }

    /// Month number, or 0 for yearly filings.
    pub fn month(&self) -> u32 {
        match self {
            FilingPeriod::Month { period } => period.month(),
            FilingPeriod::Range { range } => range.from().month(),
            FilingPeriod::Year { .. } => 0,
        }
    }
}

impl core::fmt::Display for FilingPeriod {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            FilingPeriod::Month { period } => write!(f, "{period}"),
            FilingPeriod::Range { range } => write!(f, "{range}"),
            FilingPeriod::Year { year } => write!(f, "{year}"),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionStatus {
    /// Generated locally, not yet uploaded to the revenue agency.
    Draft,
}

/// One generated filing. Rows are never updated; regenerating appends a new row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NapSubmission {
    pub id: SubmissionId,
    pub tenant_id: TenantId,
    pub declaration_type: DeclarationType,
    pub period: FilingPeriod,
    pub year: i32,
    pub month: u32,
    pub file_name: String,
    pub file_content: String,
    pub record_count: usize,
    pub status: SubmissionStatus,
    pub correction_code: CorrectionCode,
    pub generated_at: DateTime<Utc>,
    pub validation_errors: Vec<ValidationError>,
    pub employee_ids: Vec<EmployeeId>,
    #[serde(default)]
    pub idempotency_key: Option<String>,
}

impl NapSubmission {
    #[allow(clippy::too_many_arguments)]
    pub fn draft(
        tenant_id: TenantId,
        declaration_type: DeclarationType,
        period: FilingPeriod,
        file: DeclarationFile,
        correction_code: CorrectionCode,
        validation_errors: Vec<ValidationError>,
        idempotency_key: Option<String>,
        generated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: SubmissionId::new(),
            tenant_id,
            declaration_type,
            year: period.year(),
            month: period.month(),
            period,
            file_name: file.file_name,
            file_content: file.content,
            record_count: file.record_count,
            status: SubmissionStatus::Draft,
            correction_code,
            generated_at,
            validation_errors,
            employee_ids: file.employee_ids,
            idempotency_key,
        }
    }

    /// Same filing slot: type and covered period.
    pub fn same_slot(&self, declaration_type: DeclarationType, period: &FilingPeriod) -> bool {
        self.declaration_type == declaration_type && &self.period == period
    }
}

/// Ledger listing filter; empty fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SubmissionFilter {
    pub declaration_type: Option<DeclarationType>,
    pub year: Option<i32>,
    pub month: Option<u32>,
}

impl SubmissionFilter {
    pub fn matches(&self, s: &NapSubmission) -> bool {
        self.declaration_type.is_none_or(|t| t == s.declaration_type)
            && self.year.is_none_or(|y| y == s.year)
            && self.month.is_none_or(|m| m == s.month)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_parses_from_slug_and_code() {
        assert_eq!("d6-ins".parse::<DeclarationType>().unwrap(), DeclarationType::D6Insurance);
        assert_eq!("ART62".parse::<DeclarationType>().unwrap(), DeclarationType::Art62);
        assert!("d7".parse::<DeclarationType>().is_err());
    }

    #[test]
    fn correction_codes_are_0_1_8() {
        assert_eq!(CorrectionCode::try_from(8).unwrap(), CorrectionCode::Voiding);
        assert!(CorrectionCode::try_from(2).is_err());
        let json = serde_json::to_string(&CorrectionCode::Correcting).unwrap();
        assert_eq!(json, "1");
    }

    #[test]
    fn yearly_filings_report_month_zero() {
        let p = FilingPeriod::Year { year: 2025 };
        assert_eq!((p.year(), p.month()), (2025, 0));
    }
}
