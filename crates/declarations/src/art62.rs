//! Art.62 notifications: contract starts, amendments and terminations.

use std::collections::HashSet;

use paybook_core::{DateRange, DomainError, DomainResult};
use paybook_payroll::{CompanyProfile, EmployeeData, EmploymentEvent, EmploymentEventKind};

use crate::file::{DeclarationFile, date_compact, date_dotted, quoted, record_line};
use crate::validation::{ValidationError, validate_event_date, validate_identity};

pub const FIELD_COUNT: usize = 14;

pub fn file_name(bulstat: &str, range: DateRange) -> String {
    format!(
        "UVD62_{}_{}_{}.TXT",
        bulstat,
        date_compact(range.from()),
        date_compact(range.to())
    )
}

/// An employment event joined with the employee it concerns.
#[derive(Debug, Clone, Copy)]
pub struct Notification<'a> {
    pub event: &'a EmploymentEvent,
    pub employee: &'a EmployeeData,
}

pub fn build(
    company: &CompanyProfile,
    range: DateRange,
    notifications: &[Notification<'_>],
) -> DomainResult<DeclarationFile> {
    let bulstat = company.bulstat.trim();
    if bulstat.is_empty() {
        return Err(DomainError::precondition("company BULSTAT is missing"));
    }
    if notifications.is_empty() {
        return Err(DomainError::precondition(format!(
            "no employment events in {range}"
        )));
    }

    let content: String = notifications
        .iter()
        .map(|n| record_line(&record(company, n)))
        .collect();

    let mut seen = HashSet::new();
    let mut employee_ids: Vec<_> = notifications.iter().map(|n| n.employee.employee_id).collect();
    employee_ids.retain(|id| seen.insert(*id));

    Ok(DeclarationFile {
        file_name: file_name(bulstat, range),
        content,
        record_count: notifications.len(),
        employee_ids,
    })
}

pub fn record(company: &CompanyProfile, n: &Notification<'_>) -> Vec<String> {
    let e = n.employee;
    let ev = n.event;
    let (personal_id, id_kind) = e
        .personal_id()
        .map(|(v, k)| (v.to_string(), k.code().to_string()))
        .unwrap_or_default();

    let termination_date = match ev.kind {
        EmploymentEventKind::Termination => date_dotted(ev.date),
        _ => String::new(),
    };

    vec![
        quoted(company.bulstat.trim()),
        quoted(&personal_id),
        id_kind,
        quoted(&ev.basis),
        date_dotted(ev.date),
        quoted(ev.contract_number.as_deref().or(e.contract_number.as_deref()).unwrap_or_default()),
        quoted(e.nkpd_code.as_deref().unwrap_or_default()),
        quoted(e.kid_code.as_deref().unwrap_or_default()),
        quoted(company.ekatte.as_deref().unwrap_or_default()),
        ev.end_date.map(date_dotted).unwrap_or_default(),
        quoted(ev.termination_basis.as_deref().unwrap_or_default()),
        termination_date,
        format!("{:02}00", e.daily_hours()),
        ev.kind.code().to_string(),
    ]
}

/// Identity of each notified employee and event dates inside `range`.
pub fn validate(notifications: &[Notification<'_>], range: DateRange) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    for n in notifications {
        errors.extend(validate_identity(n.employee));
        errors.extend(validate_event_date(n.employee, "event_date", n.event.date, range));
    }
    errors
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use paybook_core::EmployeeId;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, d).unwrap()
    }

    fn employee() -> EmployeeData {
        EmployeeData {
            employee_id: EmployeeId::new(),
            first_name: "Maria".into(),
            middle_name: None,
            last_name: "Koleva".into(),
            egn: Some("8501010011".into()),
            lnch: None,
            insurance_type: "01".into(),
            nkpd_code: Some("41101003".into()),
            kid_code: Some("6201".into()),
            work_schedule: Some("4".into()),
            contract_number: Some("12".into()),
            contract_date: Some(day(3)),
            hire_date: Some(day(3)),
            termination_date: None,
            iban: None,
            bic: None,
        }
    }

    fn event(kind: EmploymentEventKind, date: NaiveDate) -> EmploymentEvent {
        EmploymentEvent {
            employee_id: EmployeeId::new(),
            kind,
            date,
            basis: "01".into(),
            contract_number: None,
            end_date: None,
            termination_basis: (kind == EmploymentEventKind::Termination).then(|| "325.1".into()),
        }
    }

    fn company() -> CompanyProfile {
        CompanyProfile {
            name: "Acme OOD".into(),
            bulstat: "123456789".into(),
            nkid_code: None,
            ekatte: Some("68134".into()),
        }
    }

    fn march() -> DateRange {
        DateRange::new(day(1), day(31)).unwrap()
    }

    #[test]
    fn new_contract_record_layout() {
        let e = employee();
        let ev = event(EmploymentEventKind::NewContract, day(3));
        let fields = record(&company(), &Notification { event: &ev, employee: &e });
        assert_eq!(fields.len(), FIELD_COUNT);
        assert_eq!(fields[1], "\"8501010011\"");
        assert_eq!(fields[4], "03.03.2025");
        assert_eq!(fields[5], "\"12\"");
        assert_eq!(fields[8], "\"68134\"");
        assert!(fields[11].is_empty());
        assert_eq!(fields[12], "0400");
        assert_eq!(fields[13], "01");
    }

    #[test]
    fn termination_carries_basis_and_date() {
        let e = employee();
        let ev = event(EmploymentEventKind::Termination, day(28));
        let fields = record(&company(), &Notification { event: &ev, employee: &e });
        assert_eq!(fields[10], "\"325.1\"");
        assert_eq!(fields[11], "28.03.2025");
        assert_eq!(fields[13], "03");
    }

    #[test]
    fn file_name_uses_range_bounds() {
        let e = employee();
        let ev = event(EmploymentEventKind::Amendment, day(15));
        let file = build(&company(), march(), &[Notification { event: &ev, employee: &e }]).unwrap();
        assert_eq!(file.file_name, "UVD62_123456789_20250301_20250331.TXT");
        assert_eq!(file.record_count, 1);
        assert!(file.content.ends_with("\r\n"));
    }

    #[test]
    fn employee_ids_are_listed_once_in_first_event_order() {
        let mut a = employee();
        a.employee_id = EmployeeId::new();
        let mut b = employee();
        b.employee_id = EmployeeId::new();
        let hired = event(EmploymentEventKind::NewContract, day(3));
        let other = event(EmploymentEventKind::NewContract, day(5));
        let amended = event(EmploymentEventKind::Amendment, day(20));
        let file = build(
            &company(),
            march(),
            &[
                Notification { event: &hired, employee: &a },
                Notification { event: &other, employee: &b },
                Notification { event: &amended, employee: &a },
            ],
        )
        .unwrap();
        assert_eq!(file.record_count, 3);
        assert_eq!(file.employee_ids, vec![a.employee_id, b.employee_id]);
    }

    #[test]
    fn no_events_is_a_precondition_failure() {
        assert!(matches!(
            build(&company(), march(), &[]),
            Err(DomainError::PreconditionFailed(_))
        ));
    }

    #[test]
    fn events_outside_the_range_are_reported() {
        let e = employee();
        let ev = event(EmploymentEventKind::NewContract, NaiveDate::from_ymd_opt(2025, 4, 2).unwrap());
        let errors = validate(&[Notification { event: &ev, employee: &e }], march());
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "event_date");
    }
}
