use std::sync::{Arc, RwLock};

use paybook_core::{SubmissionId, TenantId};
use paybook_declarations::{DeclarationType, FilingPeriod, NapSubmission, SubmissionFilter};

use super::StoreError;

/// Outcome of a ledger append.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerAppend {
    Appended(NapSubmission),
    /// A row with the same idempotency key already covers this filing.
    Existing(NapSubmission),
}

impl LedgerAppend {
    pub fn is_new(&self) -> bool {
        matches!(self, LedgerAppend::Appended(_))
    }

    pub fn into_submission(self) -> NapSubmission {
        match self {
            LedgerAppend::Appended(s) | LedgerAppend::Existing(s) => s,
        }
    }
}

/// Append-only record of generated filings. Rows are never updated or removed.
pub trait SubmissionLedger: Send + Sync {
    /// Single critical section: the idempotency lookup and the insert happen
    /// under one write lock.
    fn append(&self, submission: NapSubmission) -> Result<LedgerAppend, StoreError>;

    fn get(&self, tenant_id: TenantId, id: SubmissionId) -> Result<Option<NapSubmission>, StoreError>;

    /// Matching rows, newest first.
    fn list(&self, tenant_id: TenantId, filter: &SubmissionFilter) -> Result<Vec<NapSubmission>, StoreError>;

    fn has_regular(
        &self,
        tenant_id: TenantId,
        declaration_type: DeclarationType,
        period: &FilingPeriod,
    ) -> Result<bool, StoreError>;

    /// Latest row for the slot by `generated_at`; ties go to the later append.
    fn current(
        &self,
        tenant_id: TenantId,
        declaration_type: DeclarationType,
        period: &FilingPeriod,
    ) -> Result<Option<NapSubmission>, StoreError>;
}

impl<S> SubmissionLedger for Arc<S>
where
    S: SubmissionLedger + ?Sized,
{
    fn append(&self, submission: NapSubmission) -> Result<LedgerAppend, StoreError> {
        (**self).append(submission)
    }

    fn get(&self, tenant_id: TenantId, id: SubmissionId) -> Result<Option<NapSubmission>, StoreError> {
        (**self).get(tenant_id, id)
    }

    fn list(&self, tenant_id: TenantId, filter: &SubmissionFilter) -> Result<Vec<NapSubmission>, StoreError> {
        (**self).list(tenant_id, filter)
    }

    fn has_regular(
        &self,
        tenant_id: TenantId,
        declaration_type: DeclarationType,
        period: &FilingPeriod,
    ) -> Result<bool, StoreError> {
        (**self).has_regular(tenant_id, declaration_type, period)
    }

    fn current(
        &self,
        tenant_id: TenantId,
        declaration_type: DeclarationType,
        period: &FilingPeriod,
    ) -> Result<Option<NapSubmission>, StoreError> {
        (**self).current(tenant_id, declaration_type, period)
    }
}

/// Rows in append order.
#[derive(Debug, Default)]
pub struct InMemorySubmissionLedger {
    rows: RwLock<Vec<NapSubmission>>,
}

impl InMemorySubmissionLedger {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SubmissionLedger for InMemorySubmissionLedger {
    fn append(&self, submission: NapSubmission) -> Result<LedgerAppend, StoreError> {
        let mut rows = self.rows.write().map_err(|_| StoreError::Poisoned("submission ledger"))?;

        if let Some(key) = submission.idempotency_key.as_deref() {
            let existing = rows.iter().find(|r| {
                r.tenant_id == submission.tenant_id
                    && r.same_slot(submission.declaration_type, &submission.period)
                    && r.correction_code == submission.correction_code
                    && r.idempotency_key.as_deref() == Some(key)
            });
            if let Some(existing) = existing {
                return Ok(LedgerAppend::Existing(existing.clone()));
            }
        }

        rows.push(submission.clone());
        Ok(LedgerAppend::Appended(submission))
    }

    fn get(&self, tenant_id: TenantId, id: SubmissionId) -> Result<Option<NapSubmission>, StoreError> {
        let rows = self.rows.read().map_err(|_| StoreError::Poisoned("submission ledger"))?;
        Ok(rows.iter().find(|r| r.tenant_id == tenant_id && r.id == id).cloned())
    }

    fn list(&self, tenant_id: TenantId, filter: &SubmissionFilter) -> Result<Vec<NapSubmission>, StoreError> {
        let rows = self.rows.read().map_err(|_| StoreError::Poisoned("submission ledger"))?;
        let mut found: Vec<(usize, &NapSubmission)> = rows
            .iter()
            .enumerate()
            .filter(|(_, r)| r.tenant_id == tenant_id && filter.matches(r))
            .collect();
        found.sort_by(|(ia, a), (ib, b)| b.generated_at.cmp(&a.generated_at).then(ib.cmp(ia)));
        Ok(found.into_iter().map(|(_, r)| r.clone()).collect())
    }

    fn has_regular(
        &self,
        tenant_id: TenantId,
        declaration_type: DeclarationType,
        period: &FilingPeriod,
    ) -> Result<bool, StoreError> {
        let rows = self.rows.read().map_err(|_| StoreError::Poisoned("submission ledger"))?;
        Ok(rows.iter().any(|r| {
            r.tenant_id == tenant_id
                && r.same_slot(declaration_type, period)
                && r.correction_code.is_regular()
        }))
    }

    fn current(
        &self,
        tenant_id: TenantId,
        declaration_type: DeclarationType,
        period: &FilingPeriod,
    ) -> Result<Option<NapSubmission>, StoreError> {
        let rows = self.rows.read().map_err(|_| StoreError::Poisoned("submission ledger"))?;
        Ok(rows
            .iter()
            .enumerate()
            .filter(|(_, r)| r.tenant_id == tenant_id && r.same_slot(declaration_type, period))
            .max_by(|(ia, a), (ib, b)| a.generated_at.cmp(&b.generated_at).then(ia.cmp(ib)))
            .map(|(_, r)| r.clone()))
    }
}
