//! Outcome of calculating many employees at once.

use serde::Serialize;

use paybook_core::{EmployeeId, Money, PayPeriod};

use crate::gateway::CalculationFailure;
use crate::month::MonthStatus;
use crate::snapshot::PayrollSnapshot;

/// Result for one employee; failures never abort the batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum EmployeeOutcome {
    Calculated {
        employee_id: EmployeeId,
        snapshot: Box<PayrollSnapshot>,
    },
    Failed {
        employee_id: EmployeeId,
        reason: CalculationFailure,
    },
}

impl EmployeeOutcome {
    pub fn employee_id(&self) -> EmployeeId {
        match self {
            EmployeeOutcome::Calculated { employee_id, .. } => *employee_id,
            EmployeeOutcome::Failed { employee_id, .. } => *employee_id,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, EmployeeOutcome::Calculated { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchResult {
    pub period: PayPeriod,
    /// Month status after the batch was recorded.
    pub status: MonthStatus,
    /// In the order employees were scheduled.
    pub outcomes: Vec<EmployeeOutcome>,
    /// Set when the run was cancelled before every employee was started.
    pub cancelled: bool,
}

impl BatchResult {
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }

    pub fn failures(&self) -> impl Iterator<Item = (EmployeeId, &CalculationFailure)> {
        self.outcomes.iter().filter_map(|o| match o {
            EmployeeOutcome::Failed {
                employee_id,
                reason,
            } => Some((*employee_id, reason)),
            EmployeeOutcome::Calculated { .. } => None,
        })
    }

    pub fn snapshots(&self) -> impl Iterator<Item = &PayrollSnapshot> {
        self.outcomes.iter().filter_map(|o| match o {
            EmployeeOutcome::Calculated { snapshot, .. } => Some(snapshot.as_ref()),
            EmployeeOutcome::Failed { .. } => None,
        })
    }

    /// Net pay of every calculated employee.
    pub fn total_net(&self) -> Money {
        self.snapshots().map(|s| s.totals.net_salary).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::tests::snapshot_with;

    #[test]
    fn counts_and_totals() {
        let ok = snapshot_with(100_000, &[10_000], &[]);
        let result = BatchResult {
            period: ok.period,
            status: MonthStatus::Calculated,
            outcomes: vec![
                EmployeeOutcome::Calculated {
                    employee_id: ok.employee_id(),
                    snapshot: Box::new(ok.clone()),
                },
                EmployeeOutcome::Failed {
                    employee_id: EmployeeId::new(),
                    reason: CalculationFailure::MissingTimesheet,
                },
            ],
            cancelled: false,
        };

        assert_eq!(result.succeeded(), 1);
        assert_eq!(result.failed(), 1);
        assert_eq!(result.total_net(), Money::from_minor(90_000));
        let (_, reason) = result.failures().next().unwrap();
        assert_eq!(reason, &CalculationFailure::MissingTimesheet);
    }
}
