//! Stateless checks run before (and recorded with) every filing.
//!
//! Nothing here mutates or blocks; whether errors stop generation is decided
//! by the caller's policy.

use std::collections::BTreeMap;
use core::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use paybook_core::{DateRange, DomainError, EmployeeId, Money};
use paybook_payroll::identity::{is_valid_egn, is_valid_lnch};
use paybook_payroll::{CompanyProfile, EmployeeData, PayrollSnapshot};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationError {
    /// `None` for company-level problems.
    pub employee_id: Option<EmployeeId>,
    pub employee_name: String,
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn for_employee(employee: &EmployeeData, field: &str, message: impl Into<String>) -> Self {
        Self {
            employee_id: Some(employee.employee_id),
            employee_name: employee.full_name(),
            field: field.to_string(),
            message: message.into(),
        }
    }

    fn for_company(field: &str, message: impl Into<String>) -> Self {
        Self {
            employee_id: None,
            employee_name: String::new(),
            field: field.to_string(),
            message: message.into(),
        }
    }
}

/// Maximum monthly insurable income per year.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct InsurableCeilings(BTreeMap<i32, Money>);

impl InsurableCeilings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Published ceilings for 2023..=2025.
    pub fn standard() -> Self {
        Self::new()
            .with(2023, Money::from_minor(340_000))
            .with(2024, Money::from_minor(375_000))
            .with(2025, Money::from_minor(413_000))
    }

    pub fn with(mut self, year: i32, ceiling: Money) -> Self {
        self.0.insert(year, ceiling);
        self
    }

    pub fn get(&self, year: i32) -> Option<Money> {
        self.0.get(&year).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromStr for InsurableCeilings {
    type Err = DomainError;

    /// `2024=3750.00,2025=4130.00`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut ceilings = Self::new();
        for pair in s.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let (year, amount) = pair
                .split_once('=')
                .ok_or_else(|| DomainError::validation(format!("ceiling '{pair}' must be YEAR=AMOUNT")))?;
            let year = year
                .trim()
                .parse::<i32>()
                .map_err(|_| DomainError::validation(format!("invalid ceiling year in '{pair}'")))?;
            ceilings = ceilings.with(year, amount.parse()?);
        }
        Ok(ceilings)
    }
}

/// Inputs shared by all checks of one filing.
#[derive(Debug, Clone, Copy)]
pub struct ValidationContext<'a> {
    pub company: Option<&'a CompanyProfile>,
    pub ceilings: &'a InsurableCeilings,
}

pub fn validate_company(company: Option<&CompanyProfile>) -> Vec<ValidationError> {
    match company {
        Some(c) if !c.bulstat.trim().is_empty() => vec![],
        Some(_) => vec![ValidationError::for_company("bulstat", "company BULSTAT is empty")],
        None => vec![ValidationError::for_company("bulstat", "company profile is not configured")],
    }
}

/// Insured-person type and personal identifier.
pub fn validate_identity(employee: &EmployeeData) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if employee.insurance_type.trim().is_empty() {
        errors.push(ValidationError::for_employee(
            employee,
            "insurance_type",
            "insured person type code is missing",
        ));
    }

    fn present(v: &Option<String>) -> Option<&str> {
        v.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }
    match (present(&employee.egn), present(&employee.lnch)) {
        (None, None) => errors.push(ValidationError::for_employee(
            employee,
            "egn",
            "neither EGN nor LNCH is set",
        )),
        (Some(_), Some(_)) => errors.push(ValidationError::for_employee(
            employee,
            "egn",
            "both EGN and LNCH are set; keep exactly one",
        )),
        (Some(egn), None) if !is_valid_egn(egn) => errors.push(ValidationError::for_employee(
            employee,
            "egn",
            format!("EGN '{egn}' has an invalid birth date or checksum"),
        )),
        (None, Some(lnch)) if !is_valid_lnch(lnch) => errors.push(ValidationError::for_employee(
            employee,
            "lnch",
            format!("LNCH '{lnch}' must be 10 digits"),
        )),
        _ => {}
    }

    errors
}

/// Identity, insurable ceiling and aggregate consistency of one snapshot.
pub fn validate_snapshot(snapshot: &PayrollSnapshot, ctx: &ValidationContext<'_>) -> Vec<ValidationError> {
    let employee = &snapshot.employee;
    let mut errors = validate_identity(employee);

    if let Some(ceiling) = ctx.ceilings.get(snapshot.period.year()) {
        let insurable = snapshot.totals.insurable_income;
        if insurable > ceiling {
            errors.push(ValidationError::for_employee(
                employee,
                "insurable_income",
                format!("insurable income {insurable} exceeds the {ceiling} ceiling"),
            ));
        }
    }

    for issue in snapshot.check_consistency() {
        errors.push(ValidationError::for_employee(
            employee,
            issue.field,
            format!("expected {} from lines, snapshot has {}", issue.expected, issue.actual),
        ));
    }

    errors
}

pub fn validate_snapshots(snapshots: &[PayrollSnapshot], ctx: &ValidationContext<'_>) -> Vec<ValidationError> {
    let mut errors = validate_company(ctx.company);
    for s in snapshots {
        errors.extend(validate_snapshot(s, ctx));
    }
    errors
}

/// Event dates of Art.62/Art.123 filings must fall inside the filed range.
pub fn validate_event_date(
    employee: &EmployeeData,
    field: &str,
    date: NaiveDate,
    range: DateRange,
) -> Option<ValidationError> {
    (!range.contains(date)).then(|| {
        ValidationError::for_employee(
            employee,
            field,
            format!("{field} {date} is outside {range}"),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use paybook_core::{PayPeriod, TenantId};
    use paybook_payroll::snapshot::codes;
    use paybook_payroll::{
        InsuranceCategory, LegislationParams, LineKind, PayrollLine, TimesheetData,
    };

    fn employee() -> EmployeeData {
        EmployeeData {
            employee_id: EmployeeId::new(),
            first_name: "Petar".into(),
            middle_name: None,
            last_name: "Dimitrov".into(),
            egn: Some("8501010011".into()),
            lnch: None,
            insurance_type: "01".into(),
            nkpd_code: None,
            kid_code: None,
            work_schedule: None,
            contract_number: None,
            contract_date: None,
            hire_date: None,
            termination_date: None,
            iban: None,
            bic: None,
        }
    }

    fn snapshot(employee: EmployeeData, gross: i64) -> PayrollSnapshot {
        let gross = Money::from_minor(gross);
        PayrollSnapshot::assemble(
            TenantId::new(),
            PayPeriod::new(2025, 3).unwrap(),
            employee,
            LegislationParams::bulgarian(2025, InsuranceCategory::After1960).unwrap(),
            TimesheetData::full_month(21, 8),
            vec![PayrollLine::new(codes::BASE_SALARY, "Base salary", LineKind::Earning, gross, gross)],
            vec![],
            vec![],
            gross,
        )
    }

    fn company() -> CompanyProfile {
        CompanyProfile {
            name: "Acme OOD".into(),
            bulstat: "123456789".into(),
            nkid_code: Some("6201".into()),
            ekatte: None,
        }
    }

    #[test]
    fn clean_snapshot_has_no_errors() {
        let c = company();
        let ceilings = InsurableCeilings::standard();
        let ctx = ValidationContext { company: Some(&c), ceilings: &ceilings };
        assert!(validate_snapshots(&[snapshot(employee(), 200_000)], &ctx).is_empty());
    }

    #[test]
    fn each_rule_reports_its_field() {
        let ceilings = InsurableCeilings::standard();
        let ctx = ValidationContext { company: None, ceilings: &ceilings };

        let mut bad_egn = employee();
        bad_egn.egn = Some("8501010012".into());
        let mut no_type = employee();
        no_type.insurance_type = " ".into();
        let mut broken = snapshot(employee(), 500_000);
        broken.totals.net_salary = Money::ZERO;

        let errors = validate_snapshots(
            &[snapshot(bad_egn, 100_000), snapshot(no_type, 100_000), broken],
            &ctx,
        );
        let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(
            fields,
            vec!["bulstat", "egn", "insurance_type", "insurable_income", "net_salary"]
        );
        assert!(errors[0].employee_id.is_none());
    }

    #[test]
    fn missing_ceiling_skips_the_rule() {
        let ceilings = InsurableCeilings::new();
        let c = company();
        let ctx = ValidationContext { company: Some(&c), ceilings: &ceilings };
        assert!(validate_snapshots(&[snapshot(employee(), 9_000_000)], &ctx).is_empty());
    }

    #[test]
    fn lnch_only_needs_ten_digits() {
        let mut e = employee();
        e.egn = None;
        e.lnch = Some("1234567890".into());
        assert!(validate_identity(&e).is_empty());
        e.egn = Some("8501010011".into());
        assert_eq!(validate_identity(&e).len(), 1);
    }

    #[test]
    fn blank_identifiers_count_as_missing() {
        let mut e = employee();
        e.egn = Some("   ".into());
        e.lnch = Some(" 1234567890 ".into());
        assert!(validate_identity(&e).is_empty());
        e.lnch = Some("".into());
        let errors = validate_identity(&e);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].message, "neither EGN nor LNCH is set");
    }

    #[test]
    fn ceilings_parse_from_config_string() {
        let c: InsurableCeilings = "2024=3750.00, 2025=4130".parse().unwrap();
        assert_eq!(c.get(2025), Some(Money::from_minor(413_000)));
        assert!("2025".parse::<InsurableCeilings>().is_err());
    }

    #[test]
    fn event_dates_outside_range_are_flagged() {
        let range = DateRange::new(
            NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
            NaiveDate::from_ymd_opt(2025, 3, 31).unwrap(),
        )
        .unwrap();
        let e = employee();
        assert!(validate_event_date(&e, "event_date", NaiveDate::from_ymd_opt(2025, 3, 31).unwrap(), range).is_none());
        let err = validate_event_date(&e, "event_date", NaiveDate::from_ymd_opt(2025, 4, 1).unwrap(), range).unwrap();
        assert_eq!(err.field, "event_date");
    }
}
