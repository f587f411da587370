use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use paybook_core::{DateRange, DomainError, DomainResult, EmployeeId, PayPeriod};
use paybook_declarations::{
    Art123Request, ChangeType, CorrectionCode, DeclarationType, NapSubmission, SubmissionFilter,
};
use paybook_infra::declaration_service::DeclarationRequest;

// -------------------------
// Query DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct PeriodQuery {
    pub year: i32,
    pub month: u32,
}

impl PeriodQuery {
    pub fn period(&self) -> DomainResult<PayPeriod> {
        PayPeriod::new(self.year, self.month)
    }
}

#[derive(Debug, Deserialize)]
pub struct ReopenQuery {
    pub year: i32,
    pub month: u32,
    pub reason: Option<String>,
}

impl ReopenQuery {
    pub fn period(&self) -> DomainResult<PayPeriod> {
        PayPeriod::new(self.year, self.month)
    }
}

/// Parameters of every declaration route; which ones are required depends on the type.
#[derive(Debug, Default, Deserialize)]
pub struct DeclarationQuery {
    pub year: Option<i32>,
    pub month: Option<u32>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub change_type: Option<u8>,
    pub change_date: Option<NaiveDate>,
    pub new_employer_bulstat: Option<String>,
    pub new_employer_name: Option<String>,
    /// Comma separated employee ids.
    pub employee_ids: Option<String>,
    pub correction_code: Option<u8>,
    pub idempotency_key: Option<String>,
}

impl DeclarationQuery {
    pub fn request(&self, declaration_type: DeclarationType) -> DomainResult<DeclarationRequest> {
        Ok(match declaration_type {
            DeclarationType::D1 => DeclarationRequest::D1(self.pay_period()?),
            DeclarationType::D6Insurance => DeclarationRequest::D6Insurance(self.pay_period()?),
            DeclarationType::D6Tax => DeclarationRequest::D6Tax(self.pay_period()?),
            DeclarationType::Art62 => DeclarationRequest::Art62(self.date_range()?),
            DeclarationType::Art123 => DeclarationRequest::Art123(self.art123()?),
            DeclarationType::Art73 => DeclarationRequest::Art73(required(self.year, "year")?),
        })
    }

    pub fn correction(&self) -> DomainResult<CorrectionCode> {
        self.correction_code
            .map_or(Ok(CorrectionCode::Regular), CorrectionCode::try_from)
    }

    pub fn idempotency_key(&self) -> Option<String> {
        self.idempotency_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .map(str::to_string)
    }

    fn pay_period(&self) -> DomainResult<PayPeriod> {
        PayPeriod::new(required(self.year, "year")?, required(self.month, "month")?)
    }

    /// `from`/`to` when given, otherwise the calendar month from `year`/`month`.
    fn date_range(&self) -> DomainResult<DateRange> {
        match (self.from, self.to) {
            (Some(from), Some(to)) => DateRange::new(from, to),
            (None, None) => Ok(self.pay_period()?.as_range()),
            _ => Err(DomainError::validation("both from and to are required")),
        }
    }

    fn art123(&self) -> DomainResult<Art123Request> {
        let range = match (self.from, self.to) {
            (Some(from), Some(to)) => Some(DateRange::new(from, to)?),
            (None, None) => None,
            _ => return Err(DomainError::validation("both from and to are required")),
        };
        Ok(Art123Request {
            change_type: ChangeType::try_from(required(self.change_type, "change_type")?)?,
            new_employer_bulstat: required(self.new_employer_bulstat.clone(), "new_employer_bulstat")?,
            new_employer_name: self.new_employer_name.clone(),
            change_date: required(self.change_date, "change_date")?,
            employee_ids: parse_employee_ids(self.employee_ids.as_deref())?,
            range,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct SubmissionQuery {
    #[serde(rename = "type")]
    pub declaration_type: Option<String>,
    pub year: Option<i32>,
    pub month: Option<u32>,
}

impl SubmissionQuery {
    pub fn filter(&self) -> DomainResult<SubmissionFilter> {
        Ok(SubmissionFilter {
            declaration_type: self.declaration_type.as_deref().map(str::parse).transpose()?,
            year: self.year,
            month: self.month,
        })
    }
}

// -------------------------
// Response DTOs
// -------------------------

#[derive(Debug, Serialize)]
pub struct GenerateResponse {
    /// False when the idempotency key matched an earlier submission.
    pub created: bool,
    pub submission: NapSubmission,
}

fn required<T>(value: Option<T>, name: &str) -> DomainResult<T> {
    value.ok_or_else(|| DomainError::validation(format!("query parameter '{name}' is required")))
}

fn parse_employee_ids(raw: Option<&str>) -> DomainResult<Vec<EmployeeId>> {
    raw.unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::parse)
        .collect()
}
