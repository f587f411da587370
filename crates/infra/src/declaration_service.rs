//! Statutory filing service: preview, validate, generate and the ledger reads.
//!
//! Generation resolves its input, builds the file, applies the validation
//! policy and appends one immutable [`NapSubmission`]. Nothing is written when
//! any of those steps fails.

use core::str::FromStr;
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tracing::instrument;

use paybook_core::{DateRange, DomainError, DomainResult, PayPeriod, SubmissionId, TenantId};
use paybook_declarations::validation::{validate_company, validate_snapshots};
use paybook_declarations::{
    art123, art62, art73, d1, d6, Art123Request, CorrectionCode, D6Totals, DeclarationFile,
    DeclarationType, FilingPeriod, InsurableCeilings, NapSubmission, Notification,
    SubmissionFilter, ValidationContext, ValidationError, YearlyIncome,
};
use paybook_payroll::{CompanyProfile, EmployeeData, EmploymentEvent, PersonnelDirectory};

use crate::error::{ServiceError, ServiceResult};
use crate::store::{LedgerAppend, SnapshotStore, SubmissionLedger};

/// Whether validation errors stop generation.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationPolicy {
    /// Errors are recorded on the submission; generation proceeds.
    #[default]
    Advisory,
    Blocking,
}

impl FromStr for ValidationPolicy {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "advisory" => Ok(ValidationPolicy::Advisory),
            "blocking" => Ok(ValidationPolicy::Blocking),
            other => Err(DomainError::validation(format!(
                "unknown validation policy '{other}' (expected advisory or blocking)"
            ))),
        }
    }
}

/// What to file, with the period each type is filed for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeclarationRequest {
    D1(PayPeriod),
    D6Insurance(PayPeriod),
    D6Tax(PayPeriod),
    Art62(DateRange),
    Art123(Art123Request),
    Art73(i32),
}

impl DeclarationRequest {
    pub fn declaration_type(&self) -> DeclarationType {
        match self {
            DeclarationRequest::D1(_) => DeclarationType::D1,
            DeclarationRequest::D6Insurance(_) => DeclarationType::D6Insurance,
            DeclarationRequest::D6Tax(_) => DeclarationType::D6Tax,
            DeclarationRequest::Art62(_) => DeclarationType::Art62,
            DeclarationRequest::Art123(_) => DeclarationType::Art123,
            DeclarationRequest::Art73(_) => DeclarationType::Art73,
        }
    }

    pub fn filing_period(&self) -> FilingPeriod {
        match self {
            DeclarationRequest::D1(period)
            | DeclarationRequest::D6Insurance(period)
            | DeclarationRequest::D6Tax(period) => FilingPeriod::Month { period: *period },
            DeclarationRequest::Art62(range) => FilingPeriod::Range { range: *range },
            DeclarationRequest::Art123(request) => FilingPeriod::Range {
                range: request.reporting_range(),
            },
            DeclarationRequest::Art73(year) => FilingPeriod::Year { year: *year },
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DeclarationPreview {
    pub declaration_type: DeclarationType,
    pub period: FilingPeriod,
    pub file: DeclarationFile,
    pub validation_errors: Vec<ValidationError>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub d6_totals: Option<D6Totals>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub yearly_incomes: Option<Vec<YearlyIncome>>,
}

/// A stored file exactly as generated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubmissionDownload {
    pub file_name: String,
    pub content: String,
}

/// Resolved input of one filing: its errors, and the file or why it could not be built.
struct Assembled {
    errors: Vec<ValidationError>,
    file: ServiceResult<DeclarationFile>,
    d6_totals: Option<D6Totals>,
    yearly_incomes: Option<Vec<YearlyIncome>>,
}

pub struct DeclarationService {
    snapshots: Arc<dyn SnapshotStore>,
    directory: Arc<dyn PersonnelDirectory>,
    ledger: Arc<dyn SubmissionLedger>,
    ceilings: InsurableCeilings,
    policy: ValidationPolicy,
}

impl DeclarationService {
    pub fn new(
        snapshots: Arc<dyn SnapshotStore>,
        directory: Arc<dyn PersonnelDirectory>,
        ledger: Arc<dyn SubmissionLedger>,
    ) -> Self {
        Self {
            snapshots,
            directory,
            ledger,
            ceilings: InsurableCeilings::standard(),
            policy: ValidationPolicy::default(),
        }
    }

    pub fn with_ceilings(mut self, ceilings: InsurableCeilings) -> Self {
        self.ceilings = ceilings;
        self
    }

    pub fn with_policy(mut self, policy: ValidationPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> ValidationPolicy {
        self.policy
    }

    /// Build the file without recording anything.
    #[instrument(skip_all, fields(tenant_id = %tenant_id, declaration_type = %request.declaration_type()))]
    pub fn preview(&self, tenant_id: TenantId, request: &DeclarationRequest) -> ServiceResult<DeclarationPreview> {
        let assembled = self.assemble(tenant_id, request, CorrectionCode::Regular)?;
        Ok(DeclarationPreview {
            declaration_type: request.declaration_type(),
            period: request.filing_period(),
            file: assembled.file?,
            validation_errors: assembled.errors,
            d6_totals: assembled.d6_totals,
            yearly_incomes: assembled.yearly_incomes,
        })
    }

    /// Validation errors only; succeeds even when the file could not be built.
    pub fn validate(&self, tenant_id: TenantId, request: &DeclarationRequest) -> ServiceResult<Vec<ValidationError>> {
        Ok(self.assemble(tenant_id, request, CorrectionCode::Regular)?.errors)
    }

    /// Build the file and append it to the ledger.
    ///
    /// A correcting or voiding filing needs a regular one for the same type
    /// and period. With an idempotency key already used for the same filing,
    /// the earlier row is returned instead of a new one.
    #[instrument(skip_all, fields(
        tenant_id = %tenant_id,
        declaration_type = %request.declaration_type(),
        correction = correction.code()
    ))]
    pub fn generate(
        &self,
        tenant_id: TenantId,
        request: &DeclarationRequest,
        correction: CorrectionCode,
        idempotency_key: Option<String>,
    ) -> ServiceResult<LedgerAppend> {
        let declaration_type = request.declaration_type();
        let period = request.filing_period();

        if !correction.is_regular() && !self.ledger.has_regular(tenant_id, declaration_type, &period)? {
            return Err(DomainError::conflicting_correction(format!(
                "no regular {declaration_type} filing for {period} to correct"
            ))
            .into());
        }

        let assembled = self.assemble(tenant_id, request, correction)?;
        let file = assembled.file?;

        if self.policy == ValidationPolicy::Blocking && !assembled.errors.is_empty() {
            tracing::warn!(errors = assembled.errors.len(), "generation blocked by validation");
            return Err(DomainError::ValidationFailure {
                count: assembled.errors.len(),
            }
            .into());
        }

        let submission = NapSubmission::draft(
            tenant_id,
            declaration_type,
            period,
            file,
            correction,
            assembled.errors,
            idempotency_key,
            Utc::now(),
        );
        let appended = self.ledger.append(submission)?;

        match &appended {
            LedgerAppend::Appended(s) => tracing::info!(
                submission_id = %s.id,
                file_name = %s.file_name,
                records = s.record_count,
                validation_errors = s.validation_errors.len(),
                "declaration generated"
            ),
            LedgerAppend::Existing(s) => {
                tracing::info!(submission_id = %s.id, "idempotent generate returned existing submission")
            }
        }
        Ok(appended)
    }

    pub fn submissions(&self, tenant_id: TenantId, filter: &SubmissionFilter) -> ServiceResult<Vec<NapSubmission>> {
        Ok(self.ledger.list(tenant_id, filter)?)
    }

    pub fn submission(&self, tenant_id: TenantId, id: SubmissionId) -> ServiceResult<NapSubmission> {
        self.ledger
            .get(tenant_id, id)?
            .ok_or_else(|| DomainError::not_found(format!("submission {id}")).into())
    }

    pub fn download(&self, tenant_id: TenantId, id: SubmissionId) -> ServiceResult<SubmissionDownload> {
        let submission = self.submission(tenant_id, id)?;
        Ok(SubmissionDownload {
            file_name: submission.file_name,
            content: submission.file_content,
        })
    }

    /// Latest filing for the slot, if any.
    pub fn current(
        &self,
        tenant_id: TenantId,
        declaration_type: DeclarationType,
        period: &FilingPeriod,
    ) -> ServiceResult<Option<NapSubmission>> {
        Ok(self.ledger.current(tenant_id, declaration_type, period)?)
    }

    fn assemble(
        &self,
        tenant_id: TenantId,
        request: &DeclarationRequest,
        correction: CorrectionCode,
    ) -> ServiceResult<Assembled> {
        let company = self.directory.company(tenant_id);
        let ctx = ValidationContext {
            company: company.as_ref(),
            ceilings: &self.ceilings,
        };
        let company = company.as_ref();

        let assembled = match request {
            DeclarationRequest::D1(period) => {
                let snapshots = self.snapshots.list_for_month(tenant_id, *period)?;
                Assembled {
                    errors: validate_snapshots(&snapshots, &ctx),
                    file: with_company(company, |c| d1::build(c, *period, &snapshots, correction)),
                    d6_totals: None,
                    yearly_incomes: None,
                }
            }
            DeclarationRequest::D6Insurance(period) | DeclarationRequest::D6Tax(period) => {
                let snapshots = self.snapshots.list_for_month(tenant_id, *period)?;
                let build = match request {
                    DeclarationRequest::D6Tax(_) => d6::build_tax,
                    _ => d6::build_insurance,
                };
                Assembled {
                    errors: validate_snapshots(&snapshots, &ctx),
                    file: with_company(company, |c| build(c, *period, &snapshots)),
                    d6_totals: Some(D6Totals::from_snapshots(&snapshots)),
                    yearly_incomes: None,
                }
            }
            DeclarationRequest::Art62(range) => {
                let joined = self.join_events(tenant_id, *range);
                let notifications: Vec<Notification<'_>> = joined
                    .iter()
                    .map(|(event, employee)| Notification { event, employee })
                    .collect();
                let mut errors = validate_company(company);
                errors.extend(art62::validate(&notifications, *range));
                Assembled {
                    errors,
                    file: with_company(company, |c| art62::build(c, *range, &notifications)),
                    d6_totals: None,
                    yearly_incomes: None,
                }
            }
            DeclarationRequest::Art123(art123_request) => {
                let all = self.employees_by_name(tenant_id);
                let selected = art123_request.select(&all);
                let mut errors = validate_company(company);
                errors.extend(art123::validate(art123_request, &selected));
                Assembled {
                    errors,
                    file: with_company(company, |c| art123::build(c, art123_request, &selected)),
                    d6_totals: None,
                    yearly_incomes: None,
                }
            }
            DeclarationRequest::Art73(year) => {
                let snapshots = self.snapshots.list_for_year(tenant_id, *year)?;
                let file = match company {
                    Some(c) => art73::build(c, *year, &snapshots).map_err(ServiceError::from),
                    None => Err(missing_company().into()),
                };
                Assembled {
                    errors: validate_snapshots(&snapshots, &ctx),
                    file,
                    d6_totals: None,
                    yearly_incomes: Some(art73::aggregate(&snapshots)),
                }
            }
        };
        Ok(assembled)
    }

    /// Employment events in `range` with the employee each one concerns.
    fn join_events(&self, tenant_id: TenantId, range: DateRange) -> Vec<(EmploymentEvent, EmployeeData)> {
        self.directory
            .employment_events(tenant_id, range)
            .into_iter()
            .filter_map(|event| match self.directory.employee(tenant_id, event.employee_id) {
                Some(record) => Some((event, record.data)),
                None => {
                    tracing::warn!(employee_id = %event.employee_id, "employment event for unknown employee skipped");
                    None
                }
            })
            .collect()
    }

    fn employees_by_name(&self, tenant_id: TenantId) -> Vec<EmployeeData> {
        let mut all: Vec<EmployeeData> = self
            .directory
            .employees(tenant_id)
            .into_iter()
            .map(|r| r.data)
            .collect();
        all.sort_by(|a, b| {
            (&a.last_name, &a.first_name, a.employee_id).cmp(&(&b.last_name, &b.first_name, b.employee_id))
        });
        all
    }
}

fn missing_company() -> DomainError {
    DomainError::precondition("company profile is not configured")
}

fn with_company<F>(company: Option<&CompanyProfile>, build: F) -> ServiceResult<DeclarationFile>
where
    F: FnOnce(&CompanyProfile) -> DomainResult<DeclarationFile>,
{
    let company = company.ok_or_else(missing_company)?;
    Ok(build(company)?)
}
