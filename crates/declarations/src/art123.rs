//! Art.123 notifications: employees transferred on a change of employer.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use paybook_core::{DateRange, DomainError, DomainResult, EmployeeId};
use paybook_payroll::{CompanyProfile, EmployeeData};

use crate::file::{DeclarationFile, date_compact, date_dotted, quoted, record_line};
use crate::validation::{ValidationError, validate_event_date, validate_identity};

pub const FIELD_COUNT: usize = 10;

/// Kind of employer change under Art.123 para 1 of the Labour Code.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum ChangeType {
    Merger,
    Absorption,
    Division,
    Separation,
    TransferOfActivity,
    LegalFormChange,
}

impl ChangeType {
    pub fn code(self) -> u8 {
        match self {
            ChangeType::Merger => 1,
            ChangeType::Absorption => 2,
            ChangeType::Division => 3,
            ChangeType::Separation => 4,
            ChangeType::TransferOfActivity => 5,
            ChangeType::LegalFormChange => 6,
        }
    }
}

impl From<ChangeType> for u8 {
    fn from(value: ChangeType) -> Self {
        value.code()
    }
}

impl TryFrom<u8> for ChangeType {
    type Error = DomainError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Ok(match value {
            1 => ChangeType::Merger,
            2 => ChangeType::Absorption,
            3 => ChangeType::Division,
            4 => ChangeType::Separation,
            5 => ChangeType::TransferOfActivity,
            6 => ChangeType::LegalFormChange,
            other => {
                return Err(DomainError::validation(format!(
                    "change type must be 1..=6 (got {other})"
                )));
            }
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Art123Request {
    pub change_type: ChangeType,
    pub new_employer_bulstat: String,
    #[serde(default)]
    pub new_employer_name: Option<String>,
    pub change_date: NaiveDate,
    /// Empty means everyone employed on `change_date`.
    #[serde(default)]
    pub employee_ids: Vec<EmployeeId>,
    /// Filing range; defaults to the change date alone.
    #[serde(default)]
    pub range: Option<DateRange>,
}

impl Art123Request {
    pub fn reporting_range(&self) -> DateRange {
        self.range.unwrap_or_else(|| DateRange::single(self.change_date))
    }

    /// Employees covered by the request, given everyone the tenant has.
    pub fn select<'a>(&self, all: &'a [EmployeeData]) -> Vec<&'a EmployeeData> {
        all.iter()
            .filter(|e| {
                if self.employee_ids.is_empty() {
                    e.is_employed_on(self.change_date)
                } else {
                    self.employee_ids.contains(&e.employee_id)
                }
            })
            .collect()
    }
}

pub fn file_name(bulstat: &str, change_date: NaiveDate) -> String {
    format!("UVD123_{}_{}.TXT", bulstat, date_compact(change_date))
}

pub fn build(
    company: &CompanyProfile,
    request: &Art123Request,
    employees: &[&EmployeeData],
) -> DomainResult<DeclarationFile> {
    let bulstat = company.bulstat.trim();
    if bulstat.is_empty() {
        return Err(DomainError::precondition("company BULSTAT is missing"));
    }
    if request.new_employer_bulstat.trim().is_empty() {
        return Err(DomainError::validation("new employer BULSTAT is required"));
    }
    if employees.is_empty() {
        return Err(DomainError::precondition(format!(
            "no employees employed on {}",
            request.change_date
        )));
    }

    let content: String = employees
        .iter()
        .map(|e| record_line(&record(company, request, e)))
        .collect();

    Ok(DeclarationFile {
        file_name: file_name(bulstat, request.change_date),
        content,
        record_count: employees.len(),
        employee_ids: employees.iter().map(|e| e.employee_id).collect(),
    })
}

pub fn record(company: &CompanyProfile, request: &Art123Request, e: &EmployeeData) -> Vec<String> {
    let (personal_id, id_kind) = e
        .personal_id()
        .map(|(v, k)| (v.to_string(), k.code().to_string()))
        .unwrap_or_default();

    vec![
        quoted(company.bulstat.trim()),
        quoted(&personal_id),
        id_kind,
        quoted(request.new_employer_bulstat.trim()),
        request.change_type.code().to_string(),
        date_dotted(request.change_date),
        quoted(e.contract_number.as_deref().unwrap_or_default()),
        e.contract_date.map(date_dotted).unwrap_or_default(),
        quoted(e.nkpd_code.as_deref().unwrap_or_default()),
        e.hire_date.map(date_dotted).unwrap_or_default(),
    ]
}

pub fn validate(request: &Art123Request, employees: &[&EmployeeData]) -> Vec<ValidationError> {
    let range = request.reporting_range();
    let mut errors = Vec::new();
    for e in employees {
        errors.extend(validate_identity(e));
        errors.extend(validate_event_date(e, "change_date", request.change_date, range));
    }
    errors
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn employee(last: &str, hired: NaiveDate, left: Option<NaiveDate>) -> EmployeeData {
        EmployeeData {
            employee_id: EmployeeId::new(),
            first_name: "Ivan".into(),
            middle_name: None,
            last_name: last.into(),
            egn: Some("8501010011".into()),
            lnch: None,
            insurance_type: "01".into(),
            nkpd_code: Some("25121004".into()),
            kid_code: None,
            work_schedule: None,
            contract_number: Some("7".into()),
            contract_date: Some(hired),
            hire_date: Some(hired),
            termination_date: left,
            iban: None,
            bic: None,
        }
    }

    fn request() -> Art123Request {
        Art123Request {
            change_type: ChangeType::TransferOfActivity,
            new_employer_bulstat: "987654321".into(),
            new_employer_name: Some("Beta EOOD".into()),
            change_date: date(2025, 4, 1),
            employee_ids: vec![],
            range: None,
        }
    }

    fn company() -> CompanyProfile {
        CompanyProfile {
            name: "Acme OOD".into(),
            bulstat: "123456789".into(),
            nkid_code: None,
            ekatte: None,
        }
    }

    #[test]
    fn empty_selection_means_everyone_employed_on_the_change_date() {
        let staff = vec![
            employee("Aleksiev", date(2020, 1, 6), None),
            employee("Borisov", date(2020, 1, 6), Some(date(2025, 3, 31))),
            employee("Vasilev", date(2025, 5, 1), None),
        ];
        let selected = request().select(&staff);
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].last_name, "Aleksiev");
    }

    #[test]
    fn record_layout() {
        let e = employee("Aleksiev", date(2020, 1, 6), None);
        let fields = record(&company(), &request(), &e);
        assert_eq!(fields.len(), FIELD_COUNT);
        assert_eq!(fields[3], "\"987654321\"");
        assert_eq!(fields[4], "5");
        assert_eq!(fields[5], "01.04.2025");
        assert_eq!(fields[9], "06.01.2020");
    }

    #[test]
    fn file_is_named_after_the_change_date() {
        let e = employee("Aleksiev", date(2020, 1, 6), None);
        let file = build(&company(), &request(), &[&e]).unwrap();
        assert_eq!(file.file_name, "UVD123_123456789_20250401.TXT");
    }

    #[test]
    fn change_date_outside_an_explicit_range_is_reported() {
        let e = employee("Aleksiev", date(2020, 1, 6), None);
        let mut req = request();
        req.range = Some(DateRange::new(date(2025, 3, 1), date(2025, 3, 31)).unwrap());
        let errors = validate(&req, &[&e]);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "change_date");
        assert!(validate(&request(), &[&e]).is_empty());
    }

    #[test]
    fn change_type_codes() {
        assert_eq!(ChangeType::try_from(6).unwrap(), ChangeType::LegalFormChange);
        assert!(ChangeType::try_from(0).is_err());
        assert!(ChangeType::try_from(7).is_err());
    }
}
