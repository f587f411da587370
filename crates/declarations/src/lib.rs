//! `paybook-declarations`: statutory filings derived from payroll snapshots.
//!
//! Builders here are pure: they turn snapshots, company data and employment
//! events into file content. Persisting the result as an immutable
//! [`NapSubmission`] is the caller's job.

pub mod art123;
pub mod art62;
pub mod art73;
pub mod d1;
pub mod d6;
pub mod file;
pub mod submission;
pub mod validation;

pub use art123::{Art123Request, ChangeType};
pub use art62::Notification;
pub use art73::{Art73Error, YearlyIncome};
pub use d6::D6Totals;
pub use file::DeclarationFile;
pub use submission::{
    CorrectionCode, DeclarationType, FilingPeriod, NapSubmission, SubmissionFilter,
    SubmissionStatus,
};
pub use validation::{InsurableCeilings, ValidationContext, ValidationError};
