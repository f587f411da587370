use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use paybook_banking::BankPaymentFile;
use paybook_core::{PayPeriod, TenantId};

use super::StoreError;

/// Last generated payment file per (tenant, period).
pub trait BankFileStore: Send + Sync {
    fn put(&self, tenant_id: TenantId, file: BankPaymentFile) -> Result<(), StoreError>;

    fn get(&self, tenant_id: TenantId, period: PayPeriod) -> Result<Option<BankPaymentFile>, StoreError>;
}

impl<S> BankFileStore for Arc<S>
where
    S: BankFileStore + ?Sized,
{
    fn put(&self, tenant_id: TenantId, file: BankPaymentFile) -> Result<(), StoreError> {
        (**self).put(tenant_id, file)
    }

    fn get(&self, tenant_id: TenantId, period: PayPeriod) -> Result<Option<BankPaymentFile>, StoreError> {
        (**self).get(tenant_id, period)
    }
}

#[derive(Debug, Default)]
pub struct InMemoryBankFileStore {
    inner: RwLock<HashMap<(TenantId, PayPeriod), BankPaymentFile>>,
}

impl InMemoryBankFileStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl BankFileStore for InMemoryBankFileStore {
    fn put(&self, tenant_id: TenantId, file: BankPaymentFile) -> Result<(), StoreError> {
        let mut map = self.inner.write().map_err(|_| StoreError::Poisoned("bank file store"))?;
        map.insert((tenant_id, file.period), file);
        Ok(())
    }

    fn get(&self, tenant_id: TenantId, period: PayPeriod) -> Result<Option<BankPaymentFile>, StoreError> {
        let map = self.inner.read().map_err(|_| StoreError::Poisoned("bank file store"))?;
        Ok(map.get(&(tenant_id, period)).cloned())
    }
}
