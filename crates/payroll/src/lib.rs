//! `paybook-payroll`: the payroll month and its per-employee snapshots.
//!
//! Pure domain: the month state machine, the snapshot model with its
//! consistency rules, and the traits for the collaborators that compute
//! salaries and supply master data.

pub mod batch;
pub mod directory;
pub mod employee;
pub mod gateway;
pub mod identity;
pub mod legislation;
pub mod month;
pub mod snapshot;

pub use batch::{BatchResult, EmployeeOutcome};
pub use directory::{
    CompanyProfile, EmployeeRecord, EmploymentEvent, EmploymentEventKind, FixedEarning,
    PersonnelDirectory,
};
pub use employee::{EmployeeData, PersonalIdKind, TimesheetData};
pub use gateway::{CalculationFailure, CalculationGateway};
pub use legislation::{FundRate, InsuranceCategory, LegislationParams};
pub use month::{
    CloseMonth, ClosingTotals, CompleteCalculation, CompleteRecalculation, MonthCommand, MonthEvent, MonthKey,
    MonthStatus, MonthTransition, PayrollMonth, PrepareMonth, RecordEmployeeCalculation,
    ReopenMonth, transition_target,
};
pub use snapshot::{ConsistencyIssue, LineKind, PayrollLine, PayrollSnapshot, PayrollTotals, SnapshotKey};
