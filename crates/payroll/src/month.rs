//! The payroll month aggregate.
//!
//! One month per (tenant, year, month). Its status only moves along the edges
//! of [`transition_target`]; every accepted command appends an event, which
//! makes the event stream the audit log of the month.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use paybook_core::{Aggregate, AggregateRoot, DomainError, EmployeeId, Money, PayPeriod, TenantId};
use paybook_events::Event;

use crate::snapshot::PayrollSnapshot;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MonthStatus {
    NotStarted,
    Open,
    Calculated,
    Closed,
}

impl core::fmt::Display for MonthStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let s = match self {
            MonthStatus::NotStarted => "not_started",
            MonthStatus::Open => "open",
            MonthStatus::Calculated => "calculated",
            MonthStatus::Closed => "closed",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MonthTransition {
    Prepare,
    CalculateAll,
    CalculateOne,
    Close,
    Reopen,
    Recalculate,
}

impl MonthTransition {
    pub const ALL: [MonthTransition; 6] = [
        MonthTransition::Prepare,
        MonthTransition::CalculateAll,
        MonthTransition::CalculateOne,
        MonthTransition::Close,
        MonthTransition::Reopen,
        MonthTransition::Recalculate,
    ];
}

impl core::fmt::Display for MonthTransition {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let s = match self {
            MonthTransition::Prepare => "prepare",
            MonthTransition::CalculateAll => "calculate_all",
            MonthTransition::CalculateOne => "calculate_one",
            MonthTransition::Close => "close",
            MonthTransition::Reopen => "reopen",
            MonthTransition::Recalculate => "recalculate",
        };
        f.write_str(s)
    }
}

/// The single transition table of the month.
///
/// Returns the status the month ends up in. `Prepare` on a started month and
/// `CalculateOne` are accepted without moving the status.
pub fn transition_target(
    from: MonthStatus,
    transition: MonthTransition,
) -> Result<MonthStatus, DomainError> {
    use MonthStatus::*;
    use MonthTransition::*;

    match (from, transition) {
        (NotStarted, Prepare) => Ok(Open),
        (Open | Calculated | Closed, Prepare) => Ok(from),
        (Open | Calculated, CalculateAll) => Ok(Calculated),
        (NotStarted | Open | Calculated, CalculateOne) => Ok(from),
        (Calculated, Close) => Ok(Closed),
        (NotStarted | Open, Close) => Err(DomainError::precondition(format!(
            "month must be calculated before it can be closed (status: {from})"
        ))),
        (Closed, Reopen) => Ok(Open),
        (Closed, Recalculate) => Ok(Closed),
        _ => Err(DomainError::invalid_transition(from, transition)),
    }
}

/// Identity of a month stream.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MonthKey {
    pub tenant_id: TenantId,
    pub period: PayPeriod,
}

impl MonthKey {
    pub fn new(tenant_id: TenantId, period: PayPeriod) -> Self {
        Self { tenant_id, period }
    }

    pub fn stream_name(&self) -> String {
        format!("payroll.month/{}", self.period)
    }
}

/// Month figures frozen when the month is closed. A reopen keeps them.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClosingTotals {
    pub employee_count: u32,
    pub gross_salary: Money,
    pub employee_insurance: Money,
    pub employer_insurance: Money,
    pub income_tax: Money,
    pub net_salary: Money,
    pub employer_cost: Money,
}

impl ClosingTotals {
    pub fn from_snapshots(snapshots: &[PayrollSnapshot]) -> Self {
        snapshots.iter().fold(Self::default(), |mut acc, s| {
            let t = &s.totals;
            acc.employee_count = acc.employee_count.saturating_add(1);
            acc.gross_salary += t.gross_salary;
            acc.employee_insurance += t.total_employee_insurance;
            acc.employer_insurance += t.total_employer_insurance;
            acc.income_tax += t.income_tax;
            acc.net_salary += t.net_salary;
            acc.employer_cost += t.total_employer_cost;
            acc
        })
    }
}

/// Aggregate root: PayrollMonth.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PayrollMonth {
    #[serde(flatten)]
    key: MonthKey,
    status: MonthStatus,
    calculated_at: Option<DateTime<Utc>>,
    closed_at: Option<DateTime<Utc>>,
    closed_by: Option<String>,
    reopened_at: Option<DateTime<Utc>>,
    reopened_by: Option<String>,
    /// Snapshots stored for the month when it was last calculated or closed.
    employee_count: u32,
    /// Totals of the most recent close; survives a reopen.
    closing_totals: Option<ClosingTotals>,
    version: u64,
}

impl PayrollMonth {
    /// A month nobody has touched yet (also the rehydration seed).
    pub fn empty(key: MonthKey) -> Self {
        Self {
            key,
            status: MonthStatus::NotStarted,
            calculated_at: None,
            closed_at: None,
            closed_by: None,
            reopened_at: None,
            reopened_by: None,
            employee_count: 0,
            closing_totals: None,
            version: 0,
        }
    }

    pub fn key(&self) -> MonthKey {
        self.key
    }

    pub fn period(&self) -> PayPeriod {
        self.key.period
    }

    pub fn status(&self) -> MonthStatus {
        self.status
    }

    pub fn calculated_at(&self) -> Option<DateTime<Utc>> {
        self.calculated_at
    }

    pub fn closed_at(&self) -> Option<DateTime<Utc>> {
        self.closed_at
    }

    pub fn closed_by(&self) -> Option<&str> {
        self.closed_by.as_deref()
    }

    pub fn reopened_at(&self) -> Option<DateTime<Utc>> {
        self.reopened_at
    }

    pub fn employee_count(&self) -> u32 {
        self.employee_count
    }

    pub fn closing_totals(&self) -> Option<&ClosingTotals> {
        self.closing_totals.as_ref()
    }

    /// Fail fast before any side effect if `transition` is not allowed now.
    pub fn ensure_allowed(&self, transition: MonthTransition) -> Result<MonthStatus, DomainError> {
        transition_target(self.status, transition)
    }

    /// Whether downstream artifacts (bank files, declarations) may be derived.
    pub fn is_calculated_or_closed(&self) -> bool {
        matches!(self.status, MonthStatus::Calculated | MonthStatus::Closed)
    }
}

impl AggregateRoot for PayrollMonth {
    type Id = MonthKey;

    fn id(&self) -> &Self::Id {
        &self.key
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: open the month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrepareMonth {
    pub key: MonthKey,
    pub occurred_at: DateTime<Utc>,
}

/// Command: record the outcome of a whole-month calculation batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompleteCalculation {
    pub key: MonthKey,
    pub succeeded: u32,
    pub failed: u32,
    /// Snapshots in the store for the month after the batch.
    pub snapshot_count: u32,
    pub occurred_at: DateTime<Utc>,
}

/// Command: record a single-employee calculation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordEmployeeCalculation {
    pub key: MonthKey,
    pub employee_id: EmployeeId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloseMonth {
    pub key: MonthKey,
    pub closed_by: Option<String>,
    /// Computed from the month's stored snapshots.
    pub totals: ClosingTotals,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReopenMonth {
    pub key: MonthKey,
    pub reopened_by: Option<String>,
    pub reason: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: record the outcome of recalculating a closed month in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompleteRecalculation {
    pub key: MonthKey,
    pub succeeded: u32,
    pub failed: u32,
    pub snapshot_count: u32,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MonthCommand {
    Prepare(PrepareMonth),
    CompleteCalculation(CompleteCalculation),
    RecordEmployeeCalculation(RecordEmployeeCalculation),
    Close(CloseMonth),
    Reopen(ReopenMonth),
    CompleteRecalculation(CompleteRecalculation),
}

impl MonthCommand {
    pub fn key(&self) -> MonthKey {
        match self {
            MonthCommand::Prepare(c) => c.key,
            MonthCommand::CompleteCalculation(c) => c.key,
            MonthCommand::RecordEmployeeCalculation(c) => c.key,
            MonthCommand::Close(c) => c.key,
            MonthCommand::Reopen(c) => c.key,
            MonthCommand::CompleteRecalculation(c) => c.key,
        }
    }

    pub fn transition(&self) -> MonthTransition {
        match self {
            MonthCommand::Prepare(_) => MonthTransition::Prepare,
            MonthCommand::CompleteCalculation(_) => MonthTransition::CalculateAll,
            MonthCommand::RecordEmployeeCalculation(_) => MonthTransition::CalculateOne,
            MonthCommand::Close(_) => MonthTransition::Close,
            MonthCommand::Reopen(_) => MonthTransition::Reopen,
            MonthCommand::CompleteRecalculation(_) => MonthTransition::Recalculate,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthPrepared {
    pub key: MonthKey,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthCalculated {
    pub key: MonthKey,
    pub succeeded: u32,
    pub failed: u32,
    pub employee_count: u32,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmployeeCalculated {
    pub key: MonthKey,
    pub employee_id: EmployeeId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthClosed {
    pub key: MonthKey,
    pub closed_by: Option<String>,
    pub totals: ClosingTotals,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthReopened {
    pub key: MonthKey,
    pub reopened_by: Option<String>,
    pub reason: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthRecalculated {
    pub key: MonthKey,
    pub succeeded: u32,
    pub failed: u32,
    pub employee_count: u32,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MonthEvent {
    Prepared(MonthPrepared),
    Calculated(MonthCalculated),
    EmployeeCalculated(EmployeeCalculated),
    Closed(MonthClosed),
    Reopened(MonthReopened),
    Recalculated(MonthRecalculated),
}

impl Event for MonthEvent {
    fn event_type(&self) -> &'static str {
        match self {
            MonthEvent::Prepared(_) => "payroll.month.prepared",
            MonthEvent::Calculated(_) => "payroll.month.calculated",
            MonthEvent::EmployeeCalculated(_) => "payroll.month.employee_calculated",
            MonthEvent::Closed(_) => "payroll.month.closed",
            MonthEvent::Reopened(_) => "payroll.month.reopened",
            MonthEvent::Recalculated(_) => "payroll.month.recalculated",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            MonthEvent::Prepared(e) => e.occurred_at,
            MonthEvent::Calculated(e) => e.occurred_at,
            MonthEvent::EmployeeCalculated(e) => e.occurred_at,
            MonthEvent::Closed(e) => e.occurred_at,
            MonthEvent::Reopened(e) => e.occurred_at,
            MonthEvent::Recalculated(e) => e.occurred_at,
        }
    }
}

impl Aggregate for PayrollMonth {
    type Command = MonthCommand;
    type Event = MonthEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            MonthEvent::Prepared(_) => {
                self.status = MonthStatus::Open;
            }
            MonthEvent::Calculated(e) => {
                self.status = MonthStatus::Calculated;
                self.calculated_at = Some(e.occurred_at);
                self.employee_count = e.employee_count;
            }
            MonthEvent::EmployeeCalculated(_) => {}
            MonthEvent::Closed(e) => {
                self.status = MonthStatus::Closed;
                self.closed_at = Some(e.occurred_at);
                self.closed_by = e.closed_by.clone();
                self.employee_count = e.totals.employee_count;
                self.closing_totals = Some(e.totals);
            }
            MonthEvent::Reopened(e) => {
                self.status = MonthStatus::Open;
                self.closed_at = None;
                self.closed_by = None;
                self.reopened_at = Some(e.occurred_at);
                self.reopened_by = e.reopened_by.clone();
            }
            MonthEvent::Recalculated(e) => {
                // Status and closing metadata stay as they are.
                self.calculated_at = Some(e.occurred_at);
                self.employee_count = e.employee_count;
            }
        }

        // Deterministic version tracking: +1 per applied event.
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        if command.key() != self.key {
            return Err(DomainError::validation("command targets a different month"));
        }

        self.ensure_allowed(command.transition())?;

        match command {
            MonthCommand::Prepare(cmd) => {
                if self.status != MonthStatus::NotStarted {
                    return Ok(vec![]);
                }
                Ok(vec![MonthEvent::Prepared(MonthPrepared {
                    key: cmd.key,
                    occurred_at: cmd.occurred_at,
                })])
            }
            MonthCommand::CompleteCalculation(cmd) => {
                // A batch with no success leaves the month where it was.
                if cmd.succeeded == 0 {
                    return Ok(vec![]);
                }
                Ok(vec![MonthEvent::Calculated(MonthCalculated {
                    key: cmd.key,
                    succeeded: cmd.succeeded,
                    failed: cmd.failed,
                    employee_count: cmd.snapshot_count,
                    occurred_at: cmd.occurred_at,
                })])
            }
            MonthCommand::RecordEmployeeCalculation(cmd) => {
                Ok(vec![MonthEvent::EmployeeCalculated(EmployeeCalculated {
                    key: cmd.key,
                    employee_id: cmd.employee_id,
                    occurred_at: cmd.occurred_at,
                })])
            }
            MonthCommand::Close(cmd) => {
                if cmd.totals.employee_count == 0 {
                    return Err(DomainError::precondition(
                        "cannot close a month without snapshots",
                    ));
                }
                Ok(vec![MonthEvent::Closed(MonthClosed {
                    key: cmd.key,
                    closed_by: cmd.closed_by.clone(),
                    totals: cmd.totals,
                    occurred_at: cmd.occurred_at,
                })])
            }
            MonthCommand::Reopen(cmd) => Ok(vec![MonthEvent::Reopened(MonthReopened {
                key: cmd.key,
                reopened_by: cmd.reopened_by.clone(),
                reason: cmd.reason.clone(),
                occurred_at: cmd.occurred_at,
            })]),
            MonthCommand::CompleteRecalculation(cmd) => {
                Ok(vec![MonthEvent::Recalculated(MonthRecalculated {
                    key: cmd.key,
                    succeeded: cmd.succeeded,
                    failed: cmd.failed,
                    employee_count: cmd.snapshot_count,
                    occurred_at: cmd.occurred_at,
                })])
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const STATUSES: [MonthStatus; 4] = [
        MonthStatus::NotStarted,
        MonthStatus::Open,
        MonthStatus::Calculated,
        MonthStatus::Closed,
    ];

    fn key() -> MonthKey {
        MonthKey::new(TenantId::new(), PayPeriod::new(2025, 3).unwrap())
    }

    fn now() -> DateTime<Utc> {
        Utc::now()
    }

    fn run(month: &mut PayrollMonth, cmd: MonthCommand) -> Result<usize, DomainError> {
        let events = month.handle(&cmd)?;
        for e in &events {
            month.apply(e);
        }
        Ok(events.len())
    }

    fn prepare(key: MonthKey) -> MonthCommand {
        MonthCommand::Prepare(PrepareMonth { key, occurred_at: now() })
    }

    fn calculated(key: MonthKey, succeeded: u32, failed: u32) -> MonthCommand {
        MonthCommand::CompleteCalculation(CompleteCalculation {
            key,
            succeeded,
            failed,
            snapshot_count: succeeded,
            occurred_at: now(),
        })
    }

    fn close(key: MonthKey, snapshot_count: u32) -> MonthCommand {
        MonthCommand::Close(CloseMonth {
            key,
            closed_by: Some("accountant".into()),
            totals: ClosingTotals {
                employee_count: snapshot_count,
                gross_salary: Money::from_minor(i64::from(snapshot_count) * 100_000),
                ..ClosingTotals::default()
            },
            occurred_at: now(),
        })
    }

    fn reopen(key: MonthKey) -> MonthCommand {
        MonthCommand::Reopen(ReopenMonth {
            key,
            reopened_by: Some("chief accountant".into()),
            reason: Some("late sick leave".into()),
            occurred_at: now(),
        })
    }

    #[test]
    fn only_table_edges_are_accepted() {
        use MonthStatus::*;
        use MonthTransition::*;

        let allowed = [
            (NotStarted, Prepare),
            (NotStarted, CalculateOne),
            (Open, Prepare),
            (Open, CalculateAll),
            (Open, CalculateOne),
            (Calculated, Prepare),
            (Calculated, CalculateAll),
            (Calculated, CalculateOne),
            (Calculated, Close),
            (Closed, Prepare),
            (Closed, Reopen),
            (Closed, Recalculate),
        ];

        for from in STATUSES {
            for t in MonthTransition::ALL {
                let expected_ok = allowed.contains(&(from, t));
                let result = transition_target(from, t);
                assert_eq!(result.is_ok(), expected_ok, "{from} -> {t}");
                if let Err(e) = result {
                    let is_precondition = matches!(e, DomainError::PreconditionFailed(_));
                    let close_too_early = t == Close && matches!(from, NotStarted | Open);
                    assert_eq!(is_precondition, close_too_early, "{from} -> {t}: {e}");
                }
            }
        }
    }

    #[test]
    fn invalid_transition_names_both_states() {
        let err = transition_target(MonthStatus::Open, MonthTransition::Reopen).unwrap_err();
        assert_eq!(
            err,
            DomainError::InvalidTransition {
                from: "open".into(),
                requested: "reopen".into()
            }
        );
    }

    #[test]
    fn full_lifecycle_updates_metadata() {
        let k = key();
        let mut m = PayrollMonth::empty(k);

        assert_eq!(run(&mut m, prepare(k)).unwrap(), 1);
        assert_eq!(m.status(), MonthStatus::Open);

        run(&mut m, calculated(k, 2, 1)).unwrap();
        assert_eq!(m.status(), MonthStatus::Calculated);
        assert_eq!(m.employee_count(), 2);
        assert!(m.calculated_at().is_some());

        run(&mut m, close(k, 2)).unwrap();
        assert_eq!(m.status(), MonthStatus::Closed);
        assert_eq!(m.closed_by(), Some("accountant"));

        run(&mut m, reopen(k)).unwrap();
        assert_eq!(m.status(), MonthStatus::Open);
        assert!(m.closed_at().is_none());
        assert!(m.reopened_at().is_some());
        assert_eq!(m.closing_totals().map(|t| t.gross_salary), Some(Money::from_minor(200_000)));
        assert_eq!(m.version(), 4);
    }

    #[test]
    fn prepare_is_idempotent() {
        let k = key();
        let mut m = PayrollMonth::empty(k);
        run(&mut m, prepare(k)).unwrap();
        assert_eq!(run(&mut m, prepare(k)).unwrap(), 0);
        assert_eq!(m.version(), 1);
    }

    #[test]
    fn calculate_all_requires_prepared_month() {
        let k = key();
        let m = PayrollMonth::empty(k);
        let err = m.handle(&calculated(k, 3, 0)).unwrap_err();
        assert!(matches!(err, DomainError::InvalidTransition { .. }));
    }

    #[test]
    fn batch_without_success_keeps_status() {
        let k = key();
        let mut m = PayrollMonth::empty(k);
        run(&mut m, prepare(k)).unwrap();
        assert_eq!(run(&mut m, calculated(k, 0, 3)).unwrap(), 0);
        assert_eq!(m.status(), MonthStatus::Open);
    }

    #[test]
    fn close_needs_calculation_and_snapshots() {
        let k = key();
        let mut m = PayrollMonth::empty(k);
        run(&mut m, prepare(k)).unwrap();
        assert!(matches!(
            m.handle(&close(k, 1)).unwrap_err(),
            DomainError::PreconditionFailed(_)
        ));

        run(&mut m, calculated(k, 1, 0)).unwrap();
        assert!(matches!(
            m.handle(&close(k, 0)).unwrap_err(),
            DomainError::PreconditionFailed(_)
        ));

        run(&mut m, close(k, 1)).unwrap();
        assert!(matches!(
            m.handle(&close(k, 1)).unwrap_err(),
            DomainError::InvalidTransition { .. }
        ));
    }

    #[test]
    fn recalculation_keeps_closing_metadata() {
        let k = key();
        let mut m = PayrollMonth::empty(k);
        run(&mut m, prepare(k)).unwrap();
        run(&mut m, calculated(k, 2, 0)).unwrap();
        run(&mut m, close(k, 2)).unwrap();
        let closed_at = m.closed_at();

        run(
            &mut m,
            MonthCommand::CompleteRecalculation(CompleteRecalculation {
                key: k,
                succeeded: 3,
                failed: 0,
                snapshot_count: 3,
                occurred_at: now(),
            }),
        )
        .unwrap();

        assert_eq!(m.status(), MonthStatus::Closed);
        assert_eq!(m.closed_at(), closed_at);
        assert_eq!(m.employee_count(), 3);
        assert_eq!(m.closing_totals().map(|t| t.employee_count), Some(2));
    }

    #[test]
    fn single_employee_calculation_is_rejected_on_closed_month() {
        let k = key();
        let mut m = PayrollMonth::empty(k);
        run(&mut m, prepare(k)).unwrap();
        run(&mut m, calculated(k, 1, 0)).unwrap();
        run(&mut m, close(k, 1)).unwrap();

        let cmd = MonthCommand::RecordEmployeeCalculation(RecordEmployeeCalculation {
            key: k,
            employee_id: EmployeeId::new(),
            occurred_at: now(),
        });
        assert!(matches!(
            m.handle(&cmd).unwrap_err(),
            DomainError::InvalidTransition { .. }
        ));
    }

    #[test]
    fn commands_for_another_month_are_rejected() {
        let k = key();
        let m = PayrollMonth::empty(k);
        let other = MonthKey::new(k.tenant_id, PayPeriod::new(2025, 4).unwrap());
        assert!(matches!(
            m.handle(&prepare(other)).unwrap_err(),
            DomainError::Validation(_)
        ));
    }
}
