//! Process configuration read from the environment.

use std::net::SocketAddr;
use std::path::PathBuf;

use paybook_declarations::InsurableCeilings;
use paybook_infra::declaration_service::ValidationPolicy;
use paybook_infra::payroll_controller::DEFAULT_CALC_WORKERS;

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub bind_addr: SocketAddr,
    pub calc_workers: usize,
    pub validation_policy: ValidationPolicy,
    pub ceilings: InsurableCeilings,
    /// Optional JSON file with company profiles and employees to load at startup.
    pub seed_file: Option<PathBuf>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            calc_workers: DEFAULT_CALC_WORKERS,
            validation_policy: ValidationPolicy::default(),
            ceilings: InsurableCeilings::standard(),
            seed_file: None,
        }
    }
}

impl ApiConfig {
    /// Read `PAYBOOK_*` variables. Invalid values are logged and replaced by defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let value = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let bind_addr = match value("PAYBOOK_BIND_ADDR") {
            Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
                tracing::warn!(value = %raw, "invalid PAYBOOK_BIND_ADDR; using {DEFAULT_BIND_ADDR}");
                defaults.bind_addr
            }),
            None => defaults.bind_addr,
        };

        let calc_workers = match value("PAYBOOK_CALC_WORKERS") {
            Some(raw) => match raw.trim().parse::<usize>() {
                Ok(n) if n > 0 => n,
                _ => {
                    tracing::warn!(value = %raw, "invalid PAYBOOK_CALC_WORKERS; using {DEFAULT_CALC_WORKERS}");
                    defaults.calc_workers
                }
            },
            None => defaults.calc_workers,
        };

        let validation_policy = match value("PAYBOOK_VALIDATION_POLICY") {
            Some(raw) => raw.parse().unwrap_or_else(|e| {
                tracing::warn!(error = %e, "invalid PAYBOOK_VALIDATION_POLICY; using advisory");
                defaults.validation_policy
            }),
            None => defaults.validation_policy,
        };

        let ceilings = match value("PAYBOOK_INSURABLE_CEILINGS") {
            Some(raw) => match raw.parse::<InsurableCeilings>() {
                Ok(c) if !c.is_empty() => c,
                Ok(_) => defaults.ceilings,
                Err(e) => {
                    tracing::warn!(error = %e, "invalid PAYBOOK_INSURABLE_CEILINGS; using published ceilings");
                    defaults.ceilings
                }
            },
            None => defaults.ceilings,
        };

        Self {
            bind_addr,
            calc_workers,
            validation_policy,
            ceilings,
            seed_file: value("PAYBOOK_SEED_FILE").map(PathBuf::from),
        }
    }
}

fn default_bind_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8080))
}
