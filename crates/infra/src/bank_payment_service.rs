//! Salary payment batches and the bank file generated from them.

use std::sync::Arc;

use chrono::Utc;
use tracing::instrument;

use paybook_banking::{build_batch, render_csv, BankPaymentBatch, BankPaymentFile};
use paybook_core::{DomainError, PayPeriod, TenantId};
use paybook_payroll::{MonthKey, PersonnelDirectory};

use crate::error::ServiceResult;
use crate::event_store::EventStore;
use crate::month_dispatcher::MonthDispatcher;
use crate::store::{BankFileStore, SnapshotStore};

pub struct BankPaymentService<S> {
    months: MonthDispatcher<S>,
    snapshots: Arc<dyn SnapshotStore>,
    directory: Arc<dyn PersonnelDirectory>,
    files: Arc<dyn BankFileStore>,
}

impl<S> BankPaymentService<S>
where
    S: EventStore,
{
    pub fn new(
        store: S,
        snapshots: Arc<dyn SnapshotStore>,
        directory: Arc<dyn PersonnelDirectory>,
        files: Arc<dyn BankFileStore>,
    ) -> Self {
        Self {
            months: MonthDispatcher::new(store),
            snapshots,
            directory,
            files,
        }
    }

    /// One payment per snapshot of a calculated or closed month.
    pub fn preview(&self, tenant_id: TenantId, period: PayPeriod) -> ServiceResult<BankPaymentBatch> {
        let month = self.months.load(MonthKey::new(tenant_id, period))?;
        if !month.is_calculated_or_closed() {
            return Err(DomainError::precondition(format!(
                "payments need a calculated or closed month (status: {})",
                month.status()
            ))
            .into());
        }
        let snapshots = self.snapshots.list_for_month(tenant_id, period)?;
        Ok(build_batch(period, &snapshots))
    }

    /// Render the batch as the bank CSV and keep it for download.
    #[instrument(skip_all, fields(tenant_id = %tenant_id, period = %period))]
    pub fn generate(&self, tenant_id: TenantId, period: PayPeriod) -> ServiceResult<BankPaymentFile> {
        let batch = self.preview(tenant_id, period)?;
        if batch.records.is_empty() {
            return Err(DomainError::precondition(format!("no payroll snapshots for {period}")).into());
        }
        let company = self
            .directory
            .company(tenant_id)
            .ok_or_else(|| DomainError::precondition("company profile is not configured"))?;

        let file = render_csv(&company.bulstat, &batch, Utc::now())?;
        self.files.put(tenant_id, file.clone())?;
        tracing::info!(
            file_name = %file.file_name,
            records = file.record_count,
            total = %file.total_amount,
            warnings = batch.warning_count(),
            "bank payment file generated"
        );
        Ok(file)
    }

    /// The last generated file, unchanged.
    pub fn download(&self, tenant_id: TenantId, period: PayPeriod) -> ServiceResult<BankPaymentFile> {
        self.files
            .get(tenant_id, period)?
            .ok_or_else(|| DomainError::not_found(format!("bank payment file for {period}")).into())
    }
}
