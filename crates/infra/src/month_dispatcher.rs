//! Command pipeline for the payroll month aggregate.
//!
//! ```text
//! MonthCommand
//!   -> load the month stream (tenant-scoped)
//!   -> rehydrate PayrollMonth
//!   -> handle (pure, produces events)
//!   -> append with ExpectedVersion::Exact(current)
//!   -> apply committed events
//! ```
//!
//! Callers serialize commands per month; the version check still rejects a
//! writer that slipped past that.

use uuid::Uuid;

use paybook_core::{Aggregate, AggregateRoot, ExpectedVersion, TenantId};
use paybook_events::EventEnvelope;
use paybook_payroll::{MonthCommand, MonthEvent, MonthKey, PayrollMonth};

use crate::error::ServiceResult;
use crate::event_store::{EventStore, EventStoreError, StoredEvent, UncommittedEvent};

#[derive(Debug)]
pub struct MonthDispatcher<S> {
    store: S,
}

/// State after a dispatched command plus the events it committed.
#[derive(Debug, Clone)]
pub struct Dispatched {
    pub month: PayrollMonth,
    pub committed: Vec<EventEnvelope<MonthEvent>>,
}

impl<S> MonthDispatcher<S>
where
    S: EventStore,
{
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Committed events of the month, oldest first.
    pub fn history(&self, key: MonthKey) -> ServiceResult<Vec<EventEnvelope<MonthEvent>>> {
        let stream = self.load_checked(key)?;
        Ok(stream
            .iter()
            .map(StoredEvent::decode::<MonthEvent>)
            .collect::<Result<Vec<_>, _>>()?)
    }

    /// Current state; a month with no events is `NotStarted`.
    pub fn load(&self, key: MonthKey) -> ServiceResult<PayrollMonth> {
        let mut month = PayrollMonth::empty(key);
        for env in self.history(key)? {
            month.apply(env.payload());
        }
        Ok(month)
    }

    pub fn dispatch(&self, command: MonthCommand) -> ServiceResult<Dispatched> {
        let key = command.key();
        let mut month = self.load(key)?;
        let expected = ExpectedVersion::Exact(month.version());

        let decided = month.handle(&command)?;
        if decided.is_empty() {
            return Ok(Dispatched {
                month,
                committed: vec![],
            });
        }

        let stream = key.stream_name();
        let uncommitted = decided
            .iter()
            .map(|ev| UncommittedEvent::from_typed(key.tenant_id, stream.clone(), Uuid::now_v7(), ev))
            .collect::<Result<Vec<_>, _>>()?;

        let committed = self
            .store
            .append(uncommitted, expected)?
            .iter()
            .map(StoredEvent::decode::<MonthEvent>)
            .collect::<Result<Vec<_>, _>>()?;

        for env in &committed {
            month.apply(env.payload());
        }

        Ok(Dispatched { month, committed })
    }

    fn load_checked(&self, key: MonthKey) -> ServiceResult<Vec<StoredEvent>> {
        let stream = self.store.load_stream(key.tenant_id, &key.stream_name())?;
        validate_loaded_stream(key.tenant_id, &stream)?;
        Ok(stream)
    }
}

fn validate_loaded_stream(tenant_id: TenantId, stream: &[StoredEvent]) -> Result<(), EventStoreError> {
    // Enforce tenant isolation and ordering even if a backend returns bad data.
    let mut last = 0u64;
    for (idx, e) in stream.iter().enumerate() {
        if e.tenant_id != tenant_id {
            return Err(EventStoreError::TenantIsolation(format!(
                "loaded stream contains wrong tenant_id at index {idx}"
            )));
        }
        if e.sequence_number <= last {
            return Err(EventStoreError::InvalidAppend(format!(
                "non-monotonic sequence_number in loaded stream (last={last}, found={})",
                e.sequence_number
            )));
        }
        last = e.sequence_number;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use paybook_core::{DomainError, PayPeriod};
    use paybook_payroll::{CloseMonth, ClosingTotals, CompleteCalculation, MonthStatus, PrepareMonth};

    use crate::error::ServiceError;
    use crate::event_store::InMemoryEventStore;

    fn key() -> MonthKey {
        MonthKey::new(TenantId::new(), PayPeriod::new(2025, 3).unwrap())
    }

    #[test]
    fn dispatch_persists_and_rehydrates() {
        let dispatcher = MonthDispatcher::new(InMemoryEventStore::new());
        let key = key();

        let prepared = dispatcher
            .dispatch(MonthCommand::Prepare(PrepareMonth { key, occurred_at: Utc::now() }))
            .unwrap();
        assert_eq!(prepared.month.status(), MonthStatus::Open);
        assert_eq!(prepared.committed[0].event_type(), "payroll.month.prepared");

        dispatcher
            .dispatch(MonthCommand::CompleteCalculation(CompleteCalculation {
                key,
                succeeded: 2,
                failed: 0,
                snapshot_count: 2,
                occurred_at: Utc::now(),
            }))
            .unwrap();

        let loaded = dispatcher.load(key).unwrap();
        assert_eq!(loaded.status(), MonthStatus::Calculated);
        assert_eq!(loaded.version(), 2);
        assert_eq!(dispatcher.history(key).unwrap().len(), 2);
    }

    #[test]
    fn no_op_commands_append_nothing() {
        let dispatcher = MonthDispatcher::new(InMemoryEventStore::new());
        let key = key();
        let prepare = || MonthCommand::Prepare(PrepareMonth { key, occurred_at: Utc::now() });

        dispatcher.dispatch(prepare()).unwrap();
        let again = dispatcher.dispatch(prepare()).unwrap();
        assert!(again.committed.is_empty());
        assert_eq!(dispatcher.history(key).unwrap().len(), 1);
    }

    #[test]
    fn domain_rejections_surface_unchanged() {
        let dispatcher = MonthDispatcher::new(InMemoryEventStore::new());
        let key = key();
        let err = dispatcher
            .dispatch(MonthCommand::Close(CloseMonth {
                key,
                closed_by: None,
                totals: ClosingTotals::default(),
                occurred_at: Utc::now(),
            }))
            .unwrap_err();
        assert!(matches!(err, ServiceError::Domain(DomainError::PreconditionFailed(_))));
    }
}
