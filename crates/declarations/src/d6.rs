//! Declaration 6: monthly totals of contributions and income tax due.
//!
//! Filed as two files: the insurance part and the tax part.

use serde::Serialize;

use paybook_core::{DomainError, DomainResult, Money, PayPeriod};
use paybook_payroll::snapshot::codes;
use paybook_payroll::{CompanyProfile, PayrollSnapshot};

use crate::file::{DeclarationFile, quoted, record_line};

/// Fund totals across all employees of a month, reduced by line code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct D6Totals {
    pub pension_employer: Money,
    pub sickness_employer: Money,
    pub unemployment_employer: Money,
    pub supplementary_employer: Money,
    pub health_employer: Money,
    pub work_accident_employer: Money,
    pub pension_employee: Money,
    pub sickness_employee: Money,
    pub unemployment_employee: Money,
    pub supplementary_employee: Money,
    pub health_employee: Money,
    pub income_tax: Money,
    pub employee_count: usize,
}

impl D6Totals {
    pub fn from_snapshots(snapshots: &[PayrollSnapshot]) -> Self {
        let sum = |code: &str| -> Money { snapshots.iter().map(|s| s.amount_for_code(code)).sum() };
        Self {
            pension_employer: sum(codes::PENSION_EMPLOYER),
            sickness_employer: sum(codes::SICKNESS_EMPLOYER),
            unemployment_employer: sum(codes::UNEMPLOYMENT_EMPLOYER),
            supplementary_employer: sum(codes::SUPPLEMENTARY_EMPLOYER),
            health_employer: sum(codes::HEALTH_EMPLOYER),
            work_accident_employer: sum(codes::WORK_ACCIDENT_EMPLOYER),
            pension_employee: sum(codes::PENSION_EMPLOYEE),
            sickness_employee: sum(codes::SICKNESS_EMPLOYEE),
            unemployment_employee: sum(codes::UNEMPLOYMENT_EMPLOYEE),
            supplementary_employee: sum(codes::SUPPLEMENTARY_EMPLOYEE),
            health_employee: sum(codes::HEALTH_EMPLOYEE),
            income_tax: sum(codes::INCOME_TAX),
            employee_count: snapshots.len(),
        }
    }

    /// The eleven insurance amounts in file order (employer funds first).
    pub fn insurance_amounts(&self) -> [Money; 11] {
        [
            self.pension_employer,
            self.sickness_employer,
            self.unemployment_employer,
            self.supplementary_employer,
            self.health_employer,
            self.work_accident_employer,
            self.pension_employee,
            self.sickness_employee,
            self.unemployment_employee,
            self.supplementary_employee,
            self.health_employee,
        ]
    }

    /// Every fund, income tax excluded.
    pub fn total_insurance(&self) -> Money {
        self.insurance_amounts().iter().sum()
    }
}

/// Payment document kind: contributions and tax are both filed as kind 1.
const DOCUMENT_KIND: u8 = 1;

pub fn insurance_file_name(bulstat: &str, period: PayPeriod) -> String {
    format!("NRA62007_{}-{}_{:02}_O.TXT", bulstat, period.year(), period.month())
}

pub fn tax_file_name(bulstat: &str, period: PayPeriod) -> String {
    format!("NRA2007_{}_{:02}_D.TXT", bulstat, period.month())
}

fn require_input(company: &CompanyProfile, totals: &D6Totals, period: PayPeriod) -> DomainResult<()> {
    if company.bulstat.trim().is_empty() {
        return Err(DomainError::precondition("company BULSTAT is missing"));
    }
    if totals.employee_count == 0 {
        return Err(DomainError::precondition(format!(
            "no payroll snapshots for {period}"
        )));
    }
    Ok(())
}

pub fn build_insurance(
    company: &CompanyProfile,
    period: PayPeriod,
    snapshots: &[PayrollSnapshot],
) -> DomainResult<DeclarationFile> {
    let totals = D6Totals::from_snapshots(snapshots);
    require_input(company, &totals, period)?;
    let bulstat = company.bulstat.trim();

    let mut fields = vec![
        quoted(bulstat),
        format!("{:02}", period.month()),
        period.year().to_string(),
        DOCUMENT_KIND.to_string(),
    ];
    fields.extend(totals.insurance_amounts().iter().map(Money::to_string));
    fields.push(totals.total_insurance().to_string());
    fields.push(totals.employee_count.to_string());

    Ok(DeclarationFile {
        file_name: insurance_file_name(bulstat, period),
        content: record_line(&fields),
        record_count: 1,
        employee_ids: snapshots.iter().map(|s| s.employee_id()).collect(),
    })
}

pub fn build_tax(
    company: &CompanyProfile,
    period: PayPeriod,
    snapshots: &[PayrollSnapshot],
) -> DomainResult<DeclarationFile> {
    let totals = D6Totals::from_snapshots(snapshots);
    require_input(company, &totals, period)?;
    let bulstat = company.bulstat.trim();

    let fields = [
        quoted(bulstat),
        format!("{:02}", period.month()),
        period.year().to_string(),
        DOCUMENT_KIND.to_string(),
        totals.income_tax.to_string(),
        totals.employee_count.to_string(),
    ];

    Ok(DeclarationFile {
        file_name: tax_file_name(bulstat, period),
        content: record_line(&fields),
        record_count: 1,
        employee_ids: snapshots.iter().map(|s| s.employee_id()).collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use paybook_core::{EmployeeId, TenantId};
    use paybook_payroll::{
        EmployeeData, InsuranceCategory, LegislationParams, LineKind, PayrollLine, TimesheetData,
    };

    fn line(code: &str, kind: LineKind, minor: i64) -> PayrollLine {
        PayrollLine::new(code, code, kind, Money::ZERO, Money::from_minor(minor))
    }

    fn snapshot(pension_ee: i64, pension_er: i64, tax: i64) -> PayrollSnapshot {
        let gross = Money::from_minor(200_000);
        PayrollSnapshot::assemble(
            TenantId::new(),
            PayPeriod::new(2025, 3).unwrap(),
            EmployeeData {
                employee_id: EmployeeId::new(),
                first_name: "A".into(),
                middle_name: None,
                last_name: "B".into(),
                egn: None,
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
            },
            LegislationParams::bulgarian(2025, InsuranceCategory::After1960).unwrap(),
            TimesheetData::full_month(21, 8),
            vec![PayrollLine::new(codes::BASE_SALARY, "Base", LineKind::Earning, gross, gross)],
            vec![
                line(codes::PENSION_EMPLOYEE, LineKind::EmployeeInsurance, pension_ee),
                line(codes::INCOME_TAX, LineKind::IncomeTax, tax),
            ],
            vec![
                line(codes::PENSION_EMPLOYER, LineKind::EmployerContribution, pension_er),
                line(codes::WORK_ACCIDENT_EMPLOYER, LineKind::EmployerContribution, 800),
            ],
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
    fn totals_reduce_by_code() {
        let totals = D6Totals::from_snapshots(&[snapshot(13_160, 16_440, 17_000), snapshot(100, 200, 300)]);
        assert_eq!(totals.pension_employee, Money::from_minor(13_260));
        assert_eq!(totals.pension_employer, Money::from_minor(16_640));
        assert_eq!(totals.work_accident_employer, Money::from_minor(1_600));
        assert_eq!(totals.income_tax, Money::from_minor(17_300));
        assert_eq!(totals.total_insurance(), Money::from_minor(31_500));
        assert_eq!(totals.employee_count, 2);
    }

    #[test]
    fn insurance_file_layout() {
        let file = build_insurance(
            &company(),
            PayPeriod::new(2025, 3).unwrap(),
            &[snapshot(13_160, 16_440, 17_000)],
        )
        .unwrap();
        assert_eq!(file.file_name, "NRA62007_123456789-2025_03_O.TXT");
        let fields: Vec<&str> = file.content.trim_end().split(',').collect();
        assert_eq!(fields.len(), 4 + 11 + 2);
        assert_eq!(&fields[..4], &["\"123456789\"", "03", "2025", "1"]);
        assert_eq!(fields[4], "164.40");
        assert_eq!(fields[15], "304.00");
        assert_eq!(fields[16], "1");
    }

    #[test]
    fn tax_file_layout() {
        let file = build_tax(
            &company(),
            PayPeriod::new(2025, 3).unwrap(),
            &[snapshot(13_160, 16_440, 17_000)],
        )
        .unwrap();
        assert_eq!(file.file_name, "NRA2007_123456789_03_D.TXT");
        assert_eq!(file.content, "\"123456789\",03,2025,1,170.00,1\r\n");
    }
}
