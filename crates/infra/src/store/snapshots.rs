use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use paybook_core::{EmployeeId, PayPeriod, TenantId};
use paybook_payroll::{PayrollSnapshot, SnapshotKey};

use super::StoreError;

/// Current calculation result per (tenant, employee, period).
///
/// `upsert` replaces the whole snapshot atomically; readers never observe a
/// partially written one.
pub trait SnapshotStore: Send + Sync {
    fn get(&self, key: &SnapshotKey) -> Result<Option<PayrollSnapshot>, StoreError>;

    fn upsert(&self, snapshot: PayrollSnapshot) -> Result<(), StoreError>;

    /// Snapshots of a month ordered by last name, first name, employee id.
    fn list_for_month(&self, tenant_id: TenantId, period: PayPeriod) -> Result<Vec<PayrollSnapshot>, StoreError>;

    fn count_for_month(&self, tenant_id: TenantId, period: PayPeriod) -> Result<usize, StoreError> {
        Ok(self.list_for_month(tenant_id, period)?.len())
    }

    /// Snapshots of every month of `year`, month by month.
    fn list_for_year(&self, tenant_id: TenantId, year: i32) -> Result<Vec<PayrollSnapshot>, StoreError>;

    fn employee_ids_for_month(&self, tenant_id: TenantId, period: PayPeriod) -> Result<Vec<EmployeeId>, StoreError> {
        Ok(self
            .list_for_month(tenant_id, period)?
            .iter()
            .map(PayrollSnapshot::employee_id)
            .collect())
    }
}

impl<S> SnapshotStore for Arc<S>
where
    S: SnapshotStore + ?Sized,
{
    fn get(&self, key: &SnapshotKey) -> Result<Option<PayrollSnapshot>, StoreError> {
        (**self).get(key)
    }

    fn upsert(&self, snapshot: PayrollSnapshot) -> Result<(), StoreError> {
        (**self).upsert(snapshot)
    }

    fn list_for_month(&self, tenant_id: TenantId, period: PayPeriod) -> Result<Vec<PayrollSnapshot>, StoreError> {
        (**self).list_for_month(tenant_id, period)
    }

    fn count_for_month(&self, tenant_id: TenantId, period: PayPeriod) -> Result<usize, StoreError> {
        (**self).count_for_month(tenant_id, period)
    }

    fn list_for_year(&self, tenant_id: TenantId, year: i32) -> Result<Vec<PayrollSnapshot>, StoreError> {
        (**self).list_for_year(tenant_id, year)
    }
}

#[derive(Debug, Default)]
pub struct InMemorySnapshotStore {
    inner: RwLock<HashMap<SnapshotKey, PayrollSnapshot>>,
}

impl InMemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn sorted(mut snapshots: Vec<PayrollSnapshot>) -> Vec<PayrollSnapshot> {
        snapshots.sort_by(|a, b| {
            let ka = (a.period, &a.employee.last_name, &a.employee.first_name, a.employee_id());
            let kb = (b.period, &b.employee.last_name, &b.employee.first_name, b.employee_id());
            ka.cmp(&kb)
        });
        snapshots
    }
}

impl SnapshotStore for InMemorySnapshotStore {
    fn get(&self, key: &SnapshotKey) -> Result<Option<PayrollSnapshot>, StoreError> {
        let map = self.inner.read().map_err(|_| StoreError::Poisoned("snapshot store"))?;
        Ok(map.get(key).cloned())
    }

    fn upsert(&self, snapshot: PayrollSnapshot) -> Result<(), StoreError> {
        let mut map = self.inner.write().map_err(|_| StoreError::Poisoned("snapshot store"))?;
        map.insert(snapshot.key(), snapshot);
        Ok(())
    }

    fn list_for_month(&self, tenant_id: TenantId, period: PayPeriod) -> Result<Vec<PayrollSnapshot>, StoreError> {
        let map = self.inner.read().map_err(|_| StoreError::Poisoned("snapshot store"))?;
        let found = map
            .iter()
            .filter(|(k, _)| k.tenant_id == tenant_id && k.period == period)
            .map(|(_, v)| v.clone())
            .collect();
        Ok(Self::sorted(found))
    }

    fn count_for_month(&self, tenant_id: TenantId, period: PayPeriod) -> Result<usize, StoreError> {
        let map = self.inner.read().map_err(|_| StoreError::Poisoned("snapshot store"))?;
        Ok(map
            .keys()
            .filter(|k| k.tenant_id == tenant_id && k.period == period)
            .count())
    }

    fn list_for_year(&self, tenant_id: TenantId, year: i32) -> Result<Vec<PayrollSnapshot>, StoreError> {
        let map = self.inner.read().map_err(|_| StoreError::Poisoned("snapshot store"))?;
        let found = map
            .iter()
            .filter(|(k, _)| k.tenant_id == tenant_id && k.period.year() == year)
            .map(|(_, v)| v.clone())
            .collect();
        Ok(Self::sorted(found))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use paybook_core::Money;
    use paybook_payroll::snapshot::codes;
    use paybook_payroll::{
        EmployeeData, InsuranceCategory, LegislationParams, LineKind, PayrollLine, TimesheetData,
    };

    fn snapshot(tenant_id: TenantId, period: PayPeriod, last: &str, gross: i64) -> PayrollSnapshot {
        let gross = Money::from_minor(gross);
        PayrollSnapshot::assemble(
            tenant_id,
            period,
            EmployeeData {
                employee_id: EmployeeId::new(),
                first_name: "Test".into(),
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
            },
            LegislationParams::bulgarian(2025, InsuranceCategory::After1960).unwrap(),
            TimesheetData::full_month(21, 8),
            vec![PayrollLine::new(codes::BASE_SALARY, "Base salary", LineKind::Earning, gross, gross)],
            vec![],
            vec![],
            gross,
        )
    }

    #[test]
    fn upsert_replaces_by_key_and_lists_sorted() {
        let store = InMemorySnapshotStore::new();
        let tenant = TenantId::new();
        let march = PayPeriod::new(2025, 3).unwrap();

        let petrov = snapshot(tenant, march, "Petrov", 100_000);
        store.upsert(snapshot(tenant, march, "Yordanov", 100_000)).unwrap();
        store.upsert(petrov.clone()).unwrap();

        let mut updated = petrov.clone();
        updated.totals.net_salary = Money::from_minor(1);
        store.upsert(updated).unwrap();

        let listed = store.list_for_month(tenant, march).unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].employee.last_name, "Petrov");
        assert_eq!(listed[0].totals.net_salary, Money::from_minor(1));
        assert_eq!(store.count_for_month(tenant, march).unwrap(), 2);
    }

    #[test]
    fn months_and_tenants_do_not_mix() {
        let store = InMemorySnapshotStore::new();
        let tenant = TenantId::new();
        let march = PayPeriod::new(2025, 3).unwrap();
        let april = PayPeriod::new(2025, 4).unwrap();

        store.upsert(snapshot(tenant, march, "A", 1_000)).unwrap();
        store.upsert(snapshot(tenant, april, "B", 1_000)).unwrap();
        store.upsert(snapshot(TenantId::new(), march, "C", 1_000)).unwrap();

        assert_eq!(store.count_for_month(tenant, march).unwrap(), 1);
        let year = store.list_for_year(tenant, 2025).unwrap();
        assert_eq!(year.iter().map(|s| s.period.month()).collect::<Vec<_>>(), vec![3, 4]);
    }
}
