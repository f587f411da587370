//! Monthly working-time records per employee.

use std::collections::HashMap;
use std::sync::RwLock;

use paybook_core::{EmployeeId, PayPeriod, TenantId};
use paybook_payroll::TimesheetData;

type Key = (TenantId, EmployeeId, PayPeriod);

#[derive(Debug, Default)]
pub struct InMemoryTimesheetBook {
    inner: RwLock<HashMap<Key, TimesheetData>>,
}

impl InMemoryTimesheetBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, tenant_id: TenantId, employee_id: EmployeeId, period: PayPeriod) -> Option<TimesheetData> {
        self.inner.read().ok()?.get(&(tenant_id, employee_id, period)).cloned()
    }

    pub fn record(&self, tenant_id: TenantId, employee_id: EmployeeId, period: PayPeriod, timesheet: TimesheetData) {
        if let Ok(mut map) = self.inner.write() {
            map.insert((tenant_id, employee_id, period), timesheet);
        }
    }

    pub fn remove(&self, tenant_id: TenantId, employee_id: EmployeeId, period: PayPeriod) {
        if let Ok(mut map) = self.inner.write() {
            map.remove(&(tenant_id, employee_id, period));
        }
    }

    /// Insert `timesheet` unless one is already recorded. Returns whether it was inserted.
    pub fn seed_if_missing(
        &self,
        tenant_id: TenantId,
        employee_id: EmployeeId,
        period: PayPeriod,
        timesheet: TimesheetData,
    ) -> bool {
        match self.inner.write() {
            Ok(mut map) => {
                let key = (tenant_id, employee_id, period);
                if map.contains_key(&key) {
                    false
                } else {
                    map.insert(key, timesheet);
                    true
                }
            }
            Err(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeding_never_overwrites_recorded_time() {
        let book = InMemoryTimesheetBook::new();
        let (tenant, employee) = (TenantId::new(), EmployeeId::new());
        let march = PayPeriod::new(2025, 3).unwrap();

        let mut partial = TimesheetData::full_month(21, 8);
        partial.worked_days = 10;
        book.record(tenant, employee, march, partial.clone());

        assert!(!book.seed_if_missing(tenant, employee, march, TimesheetData::full_month(21, 8)));
        assert_eq!(book.get(tenant, employee, march), Some(partial));

        book.remove(tenant, employee, march);
        assert!(book.seed_if_missing(tenant, employee, march, TimesheetData::full_month(21, 8)));
    }
}
