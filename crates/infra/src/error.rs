use thiserror::Error;

use paybook_banking::BankingError;
use paybook_core::DomainError;
use paybook_declarations::Art73Error;

use crate::event_store::EventStoreError;
use crate::store::StoreError;

/// Error surfaced by the application services.
///
/// Domain failures keep their variant so the HTTP layer can map them to status
/// codes; everything else is an infrastructure failure.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    EventStore(#[from] EventStoreError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("rendering failed: {0}")]
    Render(String),
}

impl From<BankingError> for ServiceError {
    fn from(err: BankingError) -> Self {
        ServiceError::Render(err.to_string())
    }
}

impl From<Art73Error> for ServiceError {
    fn from(err: Art73Error) -> Self {
        match err {
            Art73Error::Domain(e) => ServiceError::Domain(e),
            other => ServiceError::Render(other.to_string()),
        }
    }
}

impl ServiceError {
    pub fn domain(&self) -> Option<&DomainError> {
        match self {
            ServiceError::Domain(e) => Some(e),
            _ => None,
        }
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;
