//! In-memory personnel master data.

use std::collections::HashMap;
use std::sync::RwLock;

use paybook_core::{DateRange, EmployeeId, TenantId};
use paybook_payroll::{CompanyProfile, EmployeeRecord, EmploymentEvent, PersonnelDirectory};

#[derive(Debug, Default)]
pub struct InMemoryPersonnelDirectory {
    companies: RwLock<HashMap<TenantId, CompanyProfile>>,
    employees: RwLock<HashMap<(TenantId, EmployeeId), EmployeeRecord>>,
    events: RwLock<Vec<(TenantId, EmploymentEvent)>>,
}

impl InMemoryPersonnelDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_company(&self, tenant_id: TenantId, company: CompanyProfile) {
        if let Ok(mut map) = self.companies.write() {
            map.insert(tenant_id, company);
        }
    }

    pub fn upsert_employee(&self, tenant_id: TenantId, record: EmployeeRecord) {
        if let Ok(mut map) = self.employees.write() {
            map.insert((tenant_id, record.employee_id()), record);
        }
    }

    pub fn record_event(&self, tenant_id: TenantId, event: EmploymentEvent) {
        if let Ok(mut events) = self.events.write() {
            events.push((tenant_id, event));
        }
    }
}

impl PersonnelDirectory for InMemoryPersonnelDirectory {
    fn company(&self, tenant_id: TenantId) -> Option<CompanyProfile> {
        self.companies.read().ok()?.get(&tenant_id).cloned()
    }

    fn employee(&self, tenant_id: TenantId, employee_id: EmployeeId) -> Option<EmployeeRecord> {
        self.employees.read().ok()?.get(&(tenant_id, employee_id)).cloned()
    }

    fn employees(&self, tenant_id: TenantId) -> Vec<EmployeeRecord> {
        let map = match self.employees.read() {
            Ok(m) => m,
            Err(_) => return vec![],
        };
        map.iter()
            .filter_map(|((t, _), r)| (*t == tenant_id).then(|| r.clone()))
            .collect()
    }

    fn employment_events(&self, tenant_id: TenantId, range: DateRange) -> Vec<EmploymentEvent> {
        let events = match self.events.read() {
            Ok(e) => e,
            Err(_) => return vec![],
        };
        let mut found: Vec<EmploymentEvent> = events
            .iter()
            .filter(|(t, e)| *t == tenant_id && range.contains(e.date))
            .map(|(_, e)| e.clone())
            .collect();
        found.sort_by_key(|e| e.date);
        found
    }
}
