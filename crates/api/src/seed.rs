//! Startup loading of personnel master data from a JSON file.
//!
//! ```json
//! { "tenants": [ { "tenant_id": "…", "company": { … }, "employees": [ … ], "employment_events": [ … ] } ] }
//! ```

use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use paybook_core::TenantId;
use paybook_payroll::{CompanyProfile, EmployeeRecord, EmploymentEvent};
use paybook_infra::personnel::InMemoryPersonnelDirectory;

#[derive(Debug, Error)]
pub enum SeedError {
    #[error("cannot read seed file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("invalid seed file {path}: {source}")]
    Parse {
        path: String,
        source: serde_json::Error,
    },
}

#[derive(Debug, Deserialize)]
pub struct SeedFile {
    pub tenants: Vec<TenantSeed>,
}

#[derive(Debug, Deserialize)]
pub struct TenantSeed {
    pub tenant_id: TenantId,
    pub company: CompanyProfile,
    #[serde(default)]
    pub employees: Vec<EmployeeRecord>,
    #[serde(default)]
    pub employment_events: Vec<EmploymentEvent>,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SeedSummary {
    pub tenants: usize,
    pub employees: usize,
    pub employment_events: usize,
}

pub fn load_file(path: &Path, directory: &InMemoryPersonnelDirectory) -> Result<SeedSummary, SeedError> {
    let display = path.display().to_string();
    let raw = std::fs::read_to_string(path).map_err(|source| SeedError::Io {
        path: display.clone(),
        source,
    })?;
    let seed: SeedFile = serde_json::from_str(&raw).map_err(|source| SeedError::Parse {
        path: display,
        source,
    })?;
    Ok(apply(seed, directory))
}

pub fn apply(seed: SeedFile, directory: &InMemoryPersonnelDirectory) -> SeedSummary {
    let mut summary = SeedSummary::default();
    for tenant in seed.tenants {
        directory.set_company(tenant.tenant_id, tenant.company);
        summary.tenants += 1;
        for employee in tenant.employees {
            directory.upsert_employee(tenant.tenant_id, employee);
            summary.employees += 1;
        }
        for event in tenant.employment_events {
            directory.record_event(tenant.tenant_id, event);
            summary.employment_events += 1;
        }
    }
    summary
}
