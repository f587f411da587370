//! Payroll month lifecycle service.
//!
//! Every transition for one (tenant, period) runs under that month's async
//! lock and commits through [`MonthDispatcher`] with an exact expected
//! version. Whole-month calculations fan out over a bounded worker pool and
//! write each snapshot as soon as it is computed.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use chrono::Utc;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard, Semaphore};
use tokio::task::JoinSet;
use tracing::instrument;

use paybook_core::{DomainError, EmployeeId, PayPeriod, TenantId};
use paybook_events::EventEnvelope;
use paybook_payroll::{
    BatchResult, CalculationFailure, CalculationGateway, CloseMonth, ClosingTotals, CompleteCalculation,
    CompleteRecalculation, EmployeeOutcome, MonthCommand, MonthEvent, MonthKey, MonthStatus,
    MonthTransition, PayrollMonth, PayrollSnapshot, PersonnelDirectory, PrepareMonth,
    RecordEmployeeCalculation, ReopenMonth, SnapshotKey,
};

use crate::error::ServiceResult;
use crate::event_store::EventStore;
use crate::month_dispatcher::MonthDispatcher;
use crate::store::SnapshotStore;

pub const DEFAULT_CALC_WORKERS: usize = 4;

/// Best-effort stop signal for a running batch.
///
/// Checked before each employee starts; calculations already running finish
/// and their snapshots stay.
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag(Arc<AtomicBool>);

impl CancellationFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

pub struct PayrollController<S, G: ?Sized> {
    dispatcher: MonthDispatcher<S>,
    snapshots: Arc<dyn SnapshotStore>,
    gateway: Arc<G>,
    directory: Arc<dyn PersonnelDirectory>,
    workers: usize,
    locks: LockMap,
}

impl<S, G> PayrollController<S, G>
where
    S: EventStore,
    G: CalculationGateway + ?Sized + 'static,
{
    pub fn new(
        store: S,
        snapshots: Arc<dyn SnapshotStore>,
        gateway: Arc<G>,
        directory: Arc<dyn PersonnelDirectory>,
    ) -> Self {
        Self {
            dispatcher: MonthDispatcher::new(store),
            snapshots,
            gateway,
            directory,
            workers: DEFAULT_CALC_WORKERS,
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Size of the calculation worker pool (at least one).
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    pub fn month(&self, tenant_id: TenantId, period: PayPeriod) -> ServiceResult<PayrollMonth> {
        self.dispatcher.load(MonthKey::new(tenant_id, period))
    }

    pub fn history(
        &self,
        tenant_id: TenantId,
        period: PayPeriod,
    ) -> ServiceResult<Vec<EventEnvelope<MonthEvent>>> {
        self.dispatcher.history(MonthKey::new(tenant_id, period))
    }

    pub fn snapshot(
        &self,
        tenant_id: TenantId,
        employee_id: EmployeeId,
        period: PayPeriod,
    ) -> ServiceResult<PayrollSnapshot> {
        let key = SnapshotKey { tenant_id, employee_id, period };
        self.snapshots
            .get(&key)?
            .ok_or_else(|| DomainError::not_found(format!("snapshot for employee {employee_id} in {period}")).into())
    }

    pub fn snapshots(&self, tenant_id: TenantId, period: PayPeriod) -> ServiceResult<Vec<PayrollSnapshot>> {
        Ok(self.snapshots.list_for_month(tenant_id, period)?)
    }

    /// Open the month. A month that is already started is returned as is.
    #[instrument(skip_all, fields(tenant_id = %tenant_id, period = %period))]
    pub async fn prepare_month(&self, tenant_id: TenantId, period: PayPeriod) -> ServiceResult<PayrollMonth> {
        let key = MonthKey::new(tenant_id, period);
        let _lock = self.lock_month(key).await;

        let month = self.dispatcher.load(key)?;
        if month.status() != MonthStatus::NotStarted {
            return Ok(month);
        }

        self.gateway
            .prepare_month(tenant_id, period)
            .await
            .map_err(|reason| DomainError::precondition(format!("month preparation failed: {reason}")))?;

        let dispatched = self.dispatcher.dispatch(MonthCommand::Prepare(PrepareMonth {
            key,
            occurred_at: Utc::now(),
        }))?;
        tracing::info!(status = %dispatched.month.status(), "payroll month opened");
        Ok(dispatched.month)
    }

    /// Calculate every active employee of the month.
    ///
    /// Per-employee failures are reported in the result; the month becomes
    /// `Calculated` only when at least one employee succeeded.
    #[instrument(skip_all, fields(tenant_id = %tenant_id, period = %period))]
    pub async fn calculate_all(
        &self,
        tenant_id: TenantId,
        period: PayPeriod,
        cancel: &CancellationFlag,
    ) -> ServiceResult<BatchResult> {
        let key = MonthKey::new(tenant_id, period);
        let _lock = self.lock_month(key).await;

        self.dispatcher.load(key)?.ensure_allowed(MonthTransition::CalculateAll)?;

        let employees = self.directory.active_employees(tenant_id, period);
        let (outcomes, cancelled) = self.run_batch(key, &employees, cancel).await;
        let succeeded = outcomes.iter().filter(|o| o.is_success()).count();
        let failed = outcomes.len() - succeeded;

        let dispatched = self.dispatcher.dispatch(MonthCommand::CompleteCalculation(CompleteCalculation {
            key,
            succeeded: count(succeeded),
            failed: count(failed),
            snapshot_count: count(self.snapshots.count_for_month(tenant_id, period)?),
            occurred_at: Utc::now(),
        }))?;

        tracing::info!(succeeded, failed, cancelled, status = %dispatched.month.status(), "month calculated");
        Ok(BatchResult {
            period,
            status: dispatched.month.status(),
            outcomes,
            cancelled,
        })
    }

    /// Calculate a single employee without moving the month status.
    #[instrument(skip_all, fields(tenant_id = %tenant_id, employee_id = %employee_id, period = %period))]
    pub async fn calculate_one(
        &self,
        tenant_id: TenantId,
        employee_id: EmployeeId,
        period: PayPeriod,
    ) -> ServiceResult<PayrollSnapshot> {
        let key = MonthKey::new(tenant_id, period);
        let _lock = self.lock_month(key).await;

        self.dispatcher.load(key)?.ensure_allowed(MonthTransition::CalculateOne)?;

        let snapshot = match calculate_employee(&*self.gateway, &*self.snapshots, key, employee_id).await {
            EmployeeOutcome::Calculated { snapshot, .. } => *snapshot,
            EmployeeOutcome::Failed { reason, .. } => {
                return Err(DomainError::calculation(employee_id, reason).into());
            }
        };

        self.dispatcher
            .dispatch(MonthCommand::RecordEmployeeCalculation(RecordEmployeeCalculation {
                key,
                employee_id,
                occurred_at: Utc::now(),
            }))?;
        tracing::info!(net = %snapshot.totals.net_salary, "employee recalculated");
        Ok(snapshot)
    }

    #[instrument(skip_all, fields(tenant_id = %tenant_id, period = %period))]
    pub async fn close_month(
        &self,
        tenant_id: TenantId,
        period: PayPeriod,
        closed_by: Option<String>,
    ) -> ServiceResult<PayrollMonth> {
        let key = MonthKey::new(tenant_id, period);
        let _lock = self.lock_month(key).await;

        let totals = ClosingTotals::from_snapshots(&self.snapshots.list_for_month(tenant_id, period)?);
        let dispatched = self.dispatcher.dispatch(MonthCommand::Close(CloseMonth {
            key,
            closed_by,
            totals,
            occurred_at: Utc::now(),
        }))?;
        tracing::info!(
            employee_count = totals.employee_count,
            gross = %totals.gross_salary,
            net = %totals.net_salary,
            "payroll month closed"
        );
        Ok(dispatched.month)
    }

    /// Reopen a closed month. Snapshots are left untouched.
    #[instrument(skip_all, fields(tenant_id = %tenant_id, period = %period))]
    pub async fn reopen_month(
        &self,
        tenant_id: TenantId,
        period: PayPeriod,
        reopened_by: Option<String>,
        reason: Option<String>,
    ) -> ServiceResult<PayrollMonth> {
        let key = MonthKey::new(tenant_id, period);
        let _lock = self.lock_month(key).await;

        let dispatched = self.dispatcher.dispatch(MonthCommand::Reopen(ReopenMonth {
            key,
            reopened_by: reopened_by.clone(),
            reason: reason.clone(),
            occurred_at: Utc::now(),
        }))?;
        tracing::warn!(
            reopened_by = reopened_by.as_deref().unwrap_or("-"),
            reason = reason.as_deref().unwrap_or("-"),
            "closed payroll month reopened"
        );
        Ok(dispatched.month)
    }

    /// Recompute every snapshot of a closed month in place.
    ///
    /// Covers the active employees plus anyone who already has a snapshot.
    #[instrument(skip_all, fields(tenant_id = %tenant_id, period = %period))]
    pub async fn recalculate_month(
        &self,
        tenant_id: TenantId,
        period: PayPeriod,
        cancel: &CancellationFlag,
    ) -> ServiceResult<BatchResult> {
        let key = MonthKey::new(tenant_id, period);
        let _lock = self.lock_month(key).await;

        self.dispatcher.load(key)?.ensure_allowed(MonthTransition::Recalculate)?;

        let mut employees = self.directory.active_employees(tenant_id, period);
        let mut seen: HashSet<EmployeeId> = employees.iter().copied().collect();
        for id in self.snapshots.employee_ids_for_month(tenant_id, period)? {
            if seen.insert(id) {
                employees.push(id);
            }
        }

        let (outcomes, cancelled) = self.run_batch(key, &employees, cancel).await;
        let succeeded = outcomes.iter().filter(|o| o.is_success()).count();
        let failed = outcomes.len() - succeeded;

        let dispatched = self.dispatcher.dispatch(MonthCommand::CompleteRecalculation(CompleteRecalculation {
            key,
            succeeded: count(succeeded),
            failed: count(failed),
            snapshot_count: count(self.snapshots.count_for_month(tenant_id, period)?),
            occurred_at: Utc::now(),
        }))?;

        tracing::info!(succeeded, failed, cancelled, "closed month recalculated");
        Ok(BatchResult {
            period,
            status: dispatched.month.status(),
            outcomes,
            cancelled,
        })
    }

    async fn lock_month(&self, key: MonthKey) -> MonthLock<'_> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            locks.entry(key).or_default().clone()
        };
        MonthLock {
            locks: &self.locks,
            key,
            guard: Some(lock.lock_owned().await),
        }
    }

    /// Outcomes in `employees` order, plus whether the run was cut short.
    async fn run_batch(
        &self,
        key: MonthKey,
        employees: &[EmployeeId],
        cancel: &CancellationFlag,
    ) -> (Vec<EmployeeOutcome>, bool) {
        let semaphore = Arc::new(Semaphore::new(self.workers));
        let mut tasks = JoinSet::new();
        let mut scheduled = 0usize;
        let mut cancelled = false;

        for (idx, &employee_id) in employees.iter().enumerate() {
            let Ok(permit) = semaphore.clone().acquire_owned().await else {
                break;
            };
            if cancel.is_cancelled() {
                cancelled = true;
                break;
            }

            let gateway = self.gateway.clone();
            let snapshots = self.snapshots.clone();
            tasks.spawn(async move {
                let _permit = permit;
                (idx, calculate_employee(&*gateway, &*snapshots, key, employee_id).await)
            });
            scheduled += 1;
        }

        let mut slots: Vec<Option<EmployeeOutcome>> = vec![None; scheduled];
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((idx, outcome)) => slots[idx] = Some(outcome),
                Err(err) => tracing::error!(error = %err, "calculation task aborted"),
            }
        }

        let outcomes = employees
            .iter()
            .zip(slots)
            .map(|(&employee_id, slot)| {
                slot.unwrap_or_else(|| EmployeeOutcome::Failed {
                    employee_id,
                    reason: CalculationFailure::Other("calculation task aborted".into()),
                })
            })
            .collect();
        (outcomes, cancelled)
    }
}

type LockMap = Mutex<HashMap<MonthKey, Arc<AsyncMutex<()>>>>;

/// Exclusive hold on one month. The map entry is removed on release when no
/// other command is holding or waiting for it.
struct MonthLock<'a> {
    locks: &'a LockMap,
    key: MonthKey,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for MonthLock<'_> {
    fn drop(&mut self) {
        drop(self.guard.take());
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        if locks.get(&self.key).is_some_and(|l| Arc::strong_count(l) == 1) {
            locks.remove(&self.key);
        }
    }
}

/// Calculate, check and store one snapshot.
async fn calculate_employee<G>(
    gateway: &G,
    snapshots: &dyn SnapshotStore,
    key: MonthKey,
    employee_id: EmployeeId,
) -> EmployeeOutcome
where
    G: CalculationGateway + ?Sized,
{
    let result = match gateway.calculate(key.tenant_id, employee_id, key.period).await {
        Ok(snapshot) => accept(snapshot, key, employee_id).and_then(|snapshot| {
            snapshots
                .upsert(snapshot.clone())
                .map(|()| snapshot)
                .map_err(|err| CalculationFailure::Other(err.to_string()))
        }),
        Err(reason) => Err(reason),
    };

    match result {
        Ok(snapshot) => {
            tracing::debug!(employee_id = %employee_id, "snapshot stored");
            EmployeeOutcome::Calculated {
                employee_id,
                snapshot: Box::new(snapshot),
            }
        }
        Err(reason) => {
            tracing::warn!(employee_id = %employee_id, reason = %reason, "employee calculation failed");
            EmployeeOutcome::Failed { employee_id, reason }
        }
    }
}

/// Reject snapshots for the wrong key or with broken aggregates.
fn accept(snapshot: PayrollSnapshot, key: MonthKey, employee_id: EmployeeId) -> Result<PayrollSnapshot, CalculationFailure> {
    let expected = SnapshotKey {
        tenant_id: key.tenant_id,
        employee_id,
        period: key.period,
    };
    if snapshot.key() != expected {
        return Err(CalculationFailure::Inconsistent(
            "snapshot belongs to another employee or month".into(),
        ));
    }

    let issues = snapshot.check_consistency();
    if !issues.is_empty() {
        let detail = issues
            .iter()
            .map(|i| format!("{} expected {} got {}", i.field, i.expected, i.actual))
            .collect::<Vec<_>>()
            .join("; ");
        return Err(CalculationFailure::Inconsistent(detail));
    }
    Ok(snapshot)
}

fn count(n: usize) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    use paybook_core::Money;
    use paybook_payroll::snapshot::codes;
    use paybook_payroll::{
        EmployeeData, EmployeeRecord, InsuranceCategory, LegislationParams, LineKind, PayrollLine,
        TimesheetData,
    };

    use crate::error::ServiceError;
    use crate::event_store::InMemoryEventStore;
    use crate::personnel::InMemoryPersonnelDirectory;
    use crate::store::InMemorySnapshotStore;

    /// Pays everyone 1000.00 gross with no deductions.
    #[derive(Default)]
    struct FlatGateway {
        fail_all: bool,
        cancel_after_first: Option<CancellationFlag>,
        tamper: bool,
    }

    #[async_trait]
    impl CalculationGateway for FlatGateway {
        async fn calculate(
            &self,
            tenant_id: TenantId,
            employee_id: EmployeeId,
            period: PayPeriod,
        ) -> Result<PayrollSnapshot, CalculationFailure> {
            if let Some(flag) = &self.cancel_after_first {
                flag.cancel();
            }
            if self.fail_all {
                return Err(CalculationFailure::MissingTimesheet);
            }
            let gross = Money::from_minor(100_000);
            let mut snapshot = PayrollSnapshot::assemble(
                tenant_id,
                period,
                employee(employee_id, "Test"),
                LegislationParams::bulgarian(2025, InsuranceCategory::After1960).unwrap(),
                TimesheetData::full_month(21, 8),
                vec![PayrollLine::new(codes::BASE_SALARY, "Base salary", LineKind::Earning, gross, gross)],
                vec![],
                vec![],
                gross,
            );
            if self.tamper {
                snapshot.totals.net_salary = Money::from_minor(1);
            }
            Ok(snapshot)
        }
    }

    fn employee(employee_id: EmployeeId, last: &str) -> EmployeeData {
        EmployeeData {
            employee_id,
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
        }
    }

    struct Fixture {
        tenant: TenantId,
        ids: Vec<EmployeeId>,
        controller: PayrollController<InMemoryEventStore, FlatGateway>,
    }

    fn fixture(names: &[&str], gateway: FlatGateway) -> Fixture {
        let tenant = TenantId::new();
        let directory = Arc::new(InMemoryPersonnelDirectory::new());
        let mut ids = Vec::new();
        for name in names {
            let id = EmployeeId::new();
            directory.upsert_employee(
                tenant,
                EmployeeRecord {
                    data: employee(id, name),
                    base_salary: Money::from_minor(100_000),
                    fixed_earnings: vec![],
                },
            );
            ids.push(id);
        }
        let controller = PayrollController::new(
            InMemoryEventStore::new(),
            Arc::new(InMemorySnapshotStore::new()),
            Arc::new(gateway),
            directory,
        )
        .with_workers(2);
        Fixture { tenant, ids, controller }
    }

    fn march() -> PayPeriod {
        PayPeriod::new(2025, 3).unwrap()
    }

    #[tokio::test]
    async fn calculate_all_requires_an_open_month() {
        let f = fixture(&["A"], FlatGateway::default());
        let err = f
            .controller
            .calculate_all(f.tenant, march(), &CancellationFlag::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Domain(DomainError::InvalidTransition { .. })));
        assert!(f.controller.snapshots(f.tenant, march()).unwrap().is_empty());
    }

    #[tokio::test]
    async fn outcomes_follow_directory_order() {
        let f = fixture(&["Dimitrov", "Angelova", "Conev", "Borisov"], FlatGateway::default());
        f.controller.prepare_month(f.tenant, march()).await.unwrap();

        let result = f
            .controller
            .calculate_all(f.tenant, march(), &CancellationFlag::new())
            .await
            .unwrap();
        let names: Vec<String> = result.snapshots().map(|s| s.employee.last_name.clone()).collect();
        assert_eq!(names, vec!["Angelova", "Borisov", "Conev", "Dimitrov"]);
        assert_eq!(result.status, MonthStatus::Calculated);
    }

    #[tokio::test]
    async fn a_batch_without_success_leaves_the_month_open() {
        let f = fixture(&["A", "B"], FlatGateway { fail_all: true, ..FlatGateway::default() });
        f.controller.prepare_month(f.tenant, march()).await.unwrap();

        let result = f
            .controller
            .calculate_all(f.tenant, march(), &CancellationFlag::new())
            .await
            .unwrap();
        assert_eq!(result.failed(), 2);
        assert_eq!(result.status, MonthStatus::Open);
        assert_eq!(f.controller.month(f.tenant, march()).unwrap().status(), MonthStatus::Open);
    }

    #[tokio::test]
    async fn inconsistent_snapshots_are_not_stored() {
        let f = fixture(&["A"], FlatGateway { tamper: true, ..FlatGateway::default() });
        let err = f.controller.calculate_one(f.tenant, f.ids[0], march()).await.unwrap_err();
        assert!(matches!(err, ServiceError::Domain(DomainError::CalculationFailure { .. })));
        assert!(matches!(
            f.controller.snapshot(f.tenant, f.ids[0], march()).unwrap_err(),
            ServiceError::Domain(DomainError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn cancellation_stops_new_employees() {
        let flag = CancellationFlag::new();
        let f = fixture(
            &["A", "B", "C", "D", "E"],
            FlatGateway { cancel_after_first: Some(flag.clone()), ..FlatGateway::default() },
        );
        let f = Fixture { controller: f.controller.with_workers(1), ..f };
        f.controller.prepare_month(f.tenant, march()).await.unwrap();

        let result = f.controller.calculate_all(f.tenant, march(), &flag).await.unwrap();
        assert!(result.cancelled);
        assert!(result.outcomes.len() < 5);
        assert_eq!(
            f.controller.snapshots(f.tenant, march()).unwrap().len(),
            result.succeeded()
        );
    }

    #[tokio::test]
    async fn month_locks_are_released_after_each_command() {
        let f = fixture(&["A", "B"], FlatGateway::default());
        f.controller.prepare_month(f.tenant, march()).await.unwrap();
        f.controller
            .calculate_all(f.tenant, march(), &CancellationFlag::new())
            .await
            .unwrap();
        // Rejected commands release too.
        f.controller.reopen_month(f.tenant, march(), None, None).await.unwrap_err();
        f.controller.close_month(f.tenant, march(), None).await.unwrap();
        assert!(f.controller.locks.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn closing_totals_survive_reopen_and_recalculation() {
        let f = fixture(&["A", "B"], FlatGateway::default());
        f.controller.prepare_month(f.tenant, march()).await.unwrap();
        f.controller
            .calculate_all(f.tenant, march(), &CancellationFlag::new())
            .await
            .unwrap();

        let closed = f.controller.close_month(f.tenant, march(), Some("accountant".into())).await.unwrap();
        let totals = *closed.closing_totals().unwrap();
        assert_eq!(totals.employee_count, 2);
        assert_eq!(totals.gross_salary, Money::from_minor(200_000));
        assert_eq!(totals.net_salary, Money::from_minor(200_000));

        f.controller.reopen_month(f.tenant, march(), None, None).await.unwrap();
        let reopened = f.controller.month(f.tenant, march()).unwrap();
        assert_eq!(reopened.closing_totals(), Some(&totals));

        f.controller
            .calculate_all(f.tenant, march(), &CancellationFlag::new())
            .await
            .unwrap();
        f.controller.close_month(f.tenant, march(), None).await.unwrap();
        f.controller
            .recalculate_month(f.tenant, march(), &CancellationFlag::new())
            .await
            .unwrap();
        let month = f.controller.month(f.tenant, march()).unwrap();
        assert_eq!(month.closing_totals(), Some(&totals));

        let closes: Vec<_> = f
            .controller
            .history(f.tenant, march())
            .unwrap()
            .into_iter()
            .filter_map(|e| match e.payload() {
                MonthEvent::Closed(c) => Some(c.totals),
                _ => None,
            })
            .collect();
        assert_eq!(closes.len(), 2);
        assert_eq!(closes[0], totals);
    }

    #[tokio::test]
    async fn reopen_only_from_closed() {
        let f = fixture(&["A"], FlatGateway::default());
        f.controller.prepare_month(f.tenant, march()).await.unwrap();
        let err = f.controller.reopen_month(f.tenant, march(), None, None).await.unwrap_err();
        assert!(matches!(err, ServiceError::Domain(DomainError::InvalidTransition { .. })));
        assert_eq!(f.controller.history(f.tenant, march()).unwrap().len(), 1);
    }
}
