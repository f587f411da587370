//! Art.73 yearly income statement: one row per employee with the year's totals.

use std::collections::BTreeMap;

use serde::Serialize;
use thiserror::Error;

use paybook_core::{DomainError, EmployeeId, Money};
use paybook_payroll::{CompanyProfile, PayrollSnapshot};

use crate::file::DeclarationFile;

pub const HEADER: [&str; 9] = [
    "EGN",
    "Name",
    "Gross",
    "Insurable",
    "EmployeeInsurance",
    "TaxBase",
    "IncomeTax",
    "Net",
    "MonthsWorked",
];

#[derive(Debug, Error)]
pub enum Art73Error {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("failed to render {file_name}: {source}")]
    Render {
        file_name: String,
        #[source]
        source: csv::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthIncome {
    pub month: u32,
    pub gross: Money,
    pub income_tax: Money,
}

/// One employee's totals over all snapshots of a year.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct YearlyIncome {
    pub employee_id: EmployeeId,
    pub name: String,
    /// EGN or LNCH, whichever the latest snapshot carries.
    pub personal_id: String,
    pub gross: Money,
    pub insurable: Money,
    pub employee_insurance: Money,
    pub tax_base: Money,
    pub income_tax: Money,
    pub net: Money,
    pub months_worked: usize,
    pub months: Vec<MonthIncome>,
}

impl YearlyIncome {
    fn empty(snapshot: &PayrollSnapshot) -> Self {
        Self {
            employee_id: snapshot.employee_id(),
            name: String::new(),
            personal_id: String::new(),
            gross: Money::ZERO,
            insurable: Money::ZERO,
            employee_insurance: Money::ZERO,
            tax_base: Money::ZERO,
            income_tax: Money::ZERO,
            net: Money::ZERO,
            months_worked: 0,
            months: Vec::new(),
        }
    }

    fn add(&mut self, s: &PayrollSnapshot) {
        let t = &s.totals;
        self.gross += t.gross_salary;
        self.insurable += t.insurable_income;
        self.employee_insurance += t.total_employee_insurance;
        self.tax_base += t.tax_base;
        self.income_tax += t.income_tax;
        self.net += t.net_salary;
        self.months_worked += 1;
        self.months.push(MonthIncome {
            month: s.period.month(),
            gross: t.gross_salary,
            income_tax: t.income_tax,
        });
        // Later months carry the most recent personal data.
        self.name = s.employee.full_name();
        self.personal_id = s
            .employee
            .personal_id()
            .map(|(v, _)| v.to_string())
            .unwrap_or_default();
    }
}

/// Group a year's snapshots per employee, ordered by name.
pub fn aggregate(snapshots: &[PayrollSnapshot]) -> Vec<YearlyIncome> {
    let mut ordered: Vec<&PayrollSnapshot> = snapshots.iter().collect();
    ordered.sort_by_key(|s| s.period);

    let mut by_employee: BTreeMap<EmployeeId, YearlyIncome> = BTreeMap::new();
    for s in ordered {
        by_employee
            .entry(s.employee_id())
            .or_insert_with(|| YearlyIncome::empty(s))
            .add(s);
    }

    let mut incomes: Vec<YearlyIncome> = by_employee.into_values().collect();
    incomes.sort_by(|a, b| (&a.name, a.employee_id).cmp(&(&b.name, b.employee_id)));
    incomes
}

pub fn file_name(bulstat: &str, year: i32) -> String {
    format!("ART73_{year}_{bulstat}.CSV")
}

pub fn build(
    company: &CompanyProfile,
    year: i32,
    snapshots: &[PayrollSnapshot],
) -> Result<DeclarationFile, Art73Error> {
    let bulstat = company.bulstat.trim();
    if bulstat.is_empty() {
        return Err(DomainError::precondition("company BULSTAT is missing").into());
    }
    let incomes = aggregate(snapshots);
    if incomes.is_empty() {
        return Err(DomainError::precondition(format!("no payroll snapshots in {year}")).into());
    }

    let file_name = file_name(bulstat, year);
    let content = render(&incomes).map_err(|source| Art73Error::Render {
        file_name: file_name.clone(),
        source,
    })?;

    Ok(DeclarationFile {
        file_name,
        content,
        record_count: incomes.len(),
        employee_ids: incomes.iter().map(|i| i.employee_id).collect(),
    })
}

fn render(incomes: &[YearlyIncome]) -> Result<String, csv::Error> {
    let mut csv = csv::WriterBuilder::new()
        .delimiter(b';')
        .terminator(csv::Terminator::CRLF)
        .from_writer(Vec::new());

    csv.write_record(HEADER)?;
    for i in incomes {
        csv.write_record([
            i.personal_id.clone(),
            i.name.clone(),
            i.gross.to_string(),
            i.insurable.to_string(),
            i.employee_insurance.to_string(),
            i.tax_base.to_string(),
            i.income_tax.to_string(),
            i.net.to_string(),
            i.months_worked.to_string(),
        ])?;
    }

    let bytes = csv
        .into_inner()
        .map_err(|e| csv::Error::from(e.into_error()))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file::LINE_END;
    use paybook_core::{PayPeriod, TenantId};
    use paybook_payroll::snapshot::codes;
    use paybook_payroll::{
        EmployeeData, InsuranceCategory, LegislationParams, LineKind, PayrollLine, TimesheetData,
    };

    fn employee(first: &str, last: &str) -> EmployeeData {
        EmployeeData {
            employee_id: EmployeeId::new(),
            first_name: first.into(),
            middle_name: None,
            last_name: last.into(),
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

    fn snapshot(employee: &EmployeeData, month: u32, gross: i64, tax: i64) -> PayrollSnapshot {
        let gross = Money::from_minor(gross);
        let tax = Money::from_minor(tax);
        PayrollSnapshot::assemble(
            TenantId::new(),
            PayPeriod::new(2025, month).unwrap(),
            employee.clone(),
            LegislationParams::bulgarian(2025, InsuranceCategory::After1960).unwrap(),
            TimesheetData::full_month(21, 8),
            vec![PayrollLine::new(codes::BASE_SALARY, "Base salary", LineKind::Earning, gross, gross)],
            vec![PayrollLine::new(codes::INCOME_TAX, "Income tax", LineKind::IncomeTax, gross, tax)],
            vec![],
            gross,
        )
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
    fn aggregates_per_employee_sorted_by_name() {
        let zara = employee("Zara", "Petrova");
        let anna = employee("Anna", "Ivanova");
        let incomes = aggregate(&[
            snapshot(&zara, 2, 100_000, 10_000),
            snapshot(&anna, 1, 200_000, 20_000),
            snapshot(&zara, 1, 100_000, 10_000),
        ]);
        assert_eq!(incomes.len(), 2);
        assert_eq!(incomes[0].name, "Anna Ivanova");
        assert_eq!(incomes[1].gross, Money::from_minor(200_000));
        assert_eq!(incomes[1].months_worked, 2);
        assert_eq!(incomes[1].months[0].month, 1);
    }

    #[test]
    fn csv_has_header_and_semicolon_rows() {
        let anna = employee("Anna", "Ivanova");
        let file = build(&company(), 2025, &[snapshot(&anna, 1, 200_000, 20_000)]).unwrap();
        assert_eq!(file.file_name, "ART73_2025_123456789.CSV");
        let mut lines = file.content.split(LINE_END);
        assert_eq!(lines.next(), Some(HEADER.join(";").as_str()));
        assert_eq!(
            lines.next(),
            Some("8501010011;Anna Ivanova;2000.00;2000.00;0.00;2000.00;200.00;1800.00;1")
        );
    }

    #[test]
    fn a_year_without_snapshots_is_a_precondition_failure() {
        let err = build(&company(), 2025, &[]).unwrap_err();
        assert!(matches!(err, Art73Error::Domain(DomainError::PreconditionFailed(_))));
    }
}
