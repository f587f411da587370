//! Employee master data and working time, as frozen into a snapshot.

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use paybook_core::{EmployeeId, PayPeriod};

use crate::identity;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PersonalIdKind {
    Egn,
    Lnch,
}

impl PersonalIdKind {
    /// Code used in NRA files: 0 for EGN, 1 for LNCH.
    pub fn code(self) -> u8 {
        match self {
            PersonalIdKind::Egn => 0,
            PersonalIdKind::Lnch => 1,
        }
    }
}

/// Employee data copied into a snapshot at calculation time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmployeeData {
    pub employee_id: EmployeeId,
    pub first_name: String,
    #[serde(default)]
    pub middle_name: Option<String>,
    pub last_name: String,
    #[serde(default)]
    pub egn: Option<String>,
    #[serde(default)]
    pub lnch: Option<String>,
    /// Insured-person type code (e.g. "01" for a labour contract).
    pub insurance_type: String,
    #[serde(default)]
    pub nkpd_code: Option<String>,
    #[serde(default)]
    pub kid_code: Option<String>,
    /// Daily hours under the contract, e.g. "8".
    #[serde(default)]
    pub work_schedule: Option<String>,
    #[serde(default)]
    pub contract_number: Option<String>,
    #[serde(default)]
    pub contract_date: Option<NaiveDate>,
    #[serde(default)]
    pub hire_date: Option<NaiveDate>,
    #[serde(default)]
    pub termination_date: Option<NaiveDate>,
    #[serde(default)]
    pub iban: Option<String>,
    #[serde(default)]
    pub bic: Option<String>,
}

impl EmployeeData {
    pub fn full_name(&self) -> String {
        match self.middle_name.as_deref().filter(|m| !m.is_empty()) {
            Some(middle) => format!("{} {} {}", self.first_name, middle, self.last_name),
            None => format!("{} {}", self.first_name, self.last_name),
        }
    }

    /// First letters of the first and middle names.
    pub fn initials(&self) -> String {
        [Some(self.first_name.as_str()), self.middle_name.as_deref()]
            .into_iter()
            .flatten()
            .filter_map(|n| n.chars().next())
            .collect()
    }

    /// EGN when present, otherwise LNCH.
    pub fn personal_id(&self) -> Option<(&str, PersonalIdKind)> {
        fn non_empty(v: &Option<String>) -> Option<&str> {
            v.as_deref().map(str::trim).filter(|s| !s.is_empty())
        }
        non_empty(&self.egn)
            .map(|v| (v, PersonalIdKind::Egn))
            .or_else(|| non_empty(&self.lnch).map(|v| (v, PersonalIdKind::Lnch)))
    }

    pub fn birth_year(&self) -> Option<i32> {
        self.egn
            .as_deref()
            .and_then(identity::egn_birth_date)
            .map(|d| d.year())
    }

    /// Employed for at least one day of the period.
    pub fn is_employed_in(&self, period: PayPeriod) -> bool {
        let started = self.hire_date.is_none_or(|d| d <= period.last_day());
        let not_ended = self.termination_date.is_none_or(|d| d >= period.first_day());
        started && not_ended
    }

    pub fn is_employed_on(&self, day: NaiveDate) -> bool {
        let started = self.hire_date.is_none_or(|d| d <= day);
        let not_ended = self.termination_date.is_none_or(|d| d >= day);
        started && not_ended
    }

    /// Daily contract hours; defaults to a full-time day.
    pub fn daily_hours(&self) -> u32 {
        self.work_schedule
            .as_deref()
            .and_then(|s| s.trim().parse().ok())
            .unwrap_or(8)
    }
}

/// Working time for one employee in one month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimesheetData {
    pub working_days_in_month: u32,
    pub worked_days: u32,
    pub worked_hours: Decimal,
    #[serde(default)]
    pub overtime_hours: Decimal,
    #[serde(default)]
    pub sick_leave_days: u32,
    #[serde(default)]
    pub unpaid_leave_days: u32,
    /// Paid absence (annual leave and similar) that still counts as insured time.
    #[serde(default)]
    pub paid_leave_days: u32,
}

impl TimesheetData {
    /// A full month worked on the given schedule.
    pub fn full_month(working_days: u32, daily_hours: u32) -> Self {
        Self {
            working_days_in_month: working_days,
            worked_days: working_days,
            worked_hours: Decimal::from(working_days * daily_hours),
            overtime_hours: Decimal::ZERO,
            sick_leave_days: 0,
            unpaid_leave_days: 0,
            paid_leave_days: 0,
        }
    }

    /// Days with insurance paid by the employer (worked plus paid leave).
    pub fn insured_days(&self) -> u32 {
        self.worked_days + self.paid_leave_days
    }

    /// The first three sick days are paid by the employer.
    pub fn employer_sick_days(&self) -> u32 {
        self.sick_leave_days.min(3)
    }

    /// Days the base salary is paid for.
    pub fn paid_days(&self) -> u32 {
        self.worked_days + self.paid_leave_days
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn employee() -> EmployeeData {
        EmployeeData {
            employee_id: EmployeeId::new(),
            first_name: "Ivan".into(),
            middle_name: Some("Petrov".into()),
            last_name: "Ivanov".into(),
            egn: Some("8501010011".into()),
            lnch: None,
            insurance_type: "01".into(),
            nkpd_code: None,
            kid_code: None,
            work_schedule: None,
            contract_number: None,
            contract_date: None,
            hire_date: NaiveDate::from_ymd_opt(2025, 3, 10),
            termination_date: None,
            iban: None,
            bic: None,
        }
    }

    #[test]
    fn names_and_initials() {
        let e = employee();
        assert_eq!(e.full_name(), "Ivan Petrov Ivanov");
        assert_eq!(e.initials(), "IP");
        assert_eq!(e.birth_year(), Some(1985));
    }

    #[test]
    fn egn_wins_over_lnch() {
        let mut e = employee();
        e.lnch = Some("1000000001".into());
        assert_eq!(e.personal_id(), Some(("8501010011", PersonalIdKind::Egn)));
        e.egn = Some("  ".into());
        assert_eq!(e.personal_id(), Some(("1000000001", PersonalIdKind::Lnch)));
    }

    #[test]
    fn employment_window() {
        let e = employee();
        assert!(!e.is_employed_in(PayPeriod::new(2025, 2).unwrap()));
        assert!(e.is_employed_in(PayPeriod::new(2025, 3).unwrap()));
    }
}
