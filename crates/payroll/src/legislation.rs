//! Statutory parameters frozen into each snapshot.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use paybook_core::Money;

/// Pension regime, derived from the birth year encoded in the EGN.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InsuranceCategory {
    #[serde(rename = "before1960")]
    Before1960,
    #[serde(rename = "after1960")]
    After1960,
}

impl InsuranceCategory {
    /// People born in 1960 or earlier are outside the supplementary pension fund.
    pub fn from_birth_year(year: Option<i32>) -> Self {
        match year {
            Some(y) if y <= 1960 => InsuranceCategory::Before1960,
            _ => InsuranceCategory::After1960,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            InsuranceCategory::Before1960 => "before1960",
            InsuranceCategory::After1960 => "after1960",
        }
    }
}

/// Contribution percentages split between employee and employer.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FundRate {
    pub employee: Decimal,
    pub employer: Decimal,
}

impl FundRate {
    pub const fn new(employee: Decimal, employer: Decimal) -> Self {
        Self { employee, employer }
    }

    pub fn total(&self) -> Decimal {
        self.employee + self.employer
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegislationParams {
    pub year: i32,
    pub category: InsuranceCategory,
    pub pension: FundRate,
    pub sickness: FundRate,
    pub unemployment: FundRate,
    pub supplementary_pension: FundRate,
    pub health: FundRate,
    /// Employer-only rate for work accidents and occupational disease.
    pub work_accident: Decimal,
    pub insurable_ceiling: Money,
    pub minimum_wage: Money,
    pub income_tax_rate: Decimal,
}

impl LegislationParams {
    /// Published Bulgarian rates for the years we carry tables for.
    pub fn bulgarian(year: i32, category: InsuranceCategory) -> Option<Self> {
        let (ceiling, minimum_wage) = match year {
            2023 => (Money::from_minor(340_000), Money::from_minor(78_000)),
            2024 => (Money::from_minor(375_000), Money::from_minor(93_300)),
            2025 => (Money::from_minor(413_000), Money::from_minor(107_700)),
            _ => return None,
        };

        let (pension, supplementary_pension) = match category {
            InsuranceCategory::After1960 => (
                FundRate::new(dec!(6.58), dec!(8.22)),
                FundRate::new(dec!(2.2), dec!(2.8)),
            ),
            InsuranceCategory::Before1960 => (
                FundRate::new(dec!(8.78), dec!(11.02)),
                FundRate::new(Decimal::ZERO, Decimal::ZERO),
            ),
        };

        Some(Self {
            year,
            category,
            pension,
            sickness: FundRate::new(dec!(1.4), dec!(2.1)),
            unemployment: FundRate::new(dec!(0.4), dec!(0.6)),
            supplementary_pension,
            health: FundRate::new(dec!(3.2), dec!(4.8)),
            work_accident: dec!(0.4),
            insurable_ceiling: ceiling,
            minimum_wage,
            income_tax_rate: dec!(10),
        })
    }

    pub fn has_supplementary_pension(&self) -> bool {
        self.category == InsuranceCategory::After1960
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_boundary_is_1960_inclusive() {
        assert_eq!(InsuranceCategory::from_birth_year(Some(1960)), InsuranceCategory::Before1960);
        assert_eq!(InsuranceCategory::from_birth_year(Some(1961)), InsuranceCategory::After1960);
        assert_eq!(InsuranceCategory::from_birth_year(None), InsuranceCategory::After1960);
    }

    #[test]
    fn older_regime_has_no_supplementary_pension() {
        let p = LegislationParams::bulgarian(2025, InsuranceCategory::Before1960).unwrap();
        assert_eq!(p.supplementary_pension.total(), Decimal::ZERO);
        assert!(!p.has_supplementary_pension());
        assert!(LegislationParams::bulgarian(2019, InsuranceCategory::After1960).is_none());
    }
}
