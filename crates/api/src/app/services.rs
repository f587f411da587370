//! Service wiring: one in-memory store set shared by the controller,
//! the declaration service and the bank payment service.

use std::sync::Arc;

use paybook_infra::bank_payment_service::BankPaymentService;
use paybook_infra::declaration_service::DeclarationService;
use paybook_infra::event_store::InMemoryEventStore;
use paybook_infra::payroll_controller::PayrollController;
use paybook_infra::personnel::InMemoryPersonnelDirectory;
use paybook_infra::rate_table::RateTableGateway;
use paybook_infra::store::{InMemoryBankFileStore, InMemorySnapshotStore, InMemorySubmissionLedger};
use paybook_infra::timesheet::InMemoryTimesheetBook;

use crate::config::ApiConfig;

pub type MonthEventStore = Arc<InMemoryEventStore>;

pub struct AppServices {
    pub payroll: PayrollController<MonthEventStore, RateTableGateway>,
    pub declarations: DeclarationService,
    pub payments: BankPaymentService<MonthEventStore>,
    /// Master data; populated from the seed file or directly by tests.
    pub directory: Arc<InMemoryPersonnelDirectory>,
    pub timesheets: Arc<InMemoryTimesheetBook>,
}

pub fn build_services(config: &ApiConfig) -> AppServices {
    let events: MonthEventStore = Arc::new(InMemoryEventStore::new());
    let snapshots = Arc::new(InMemorySnapshotStore::new());
    let directory = Arc::new(InMemoryPersonnelDirectory::new());
    let timesheets = Arc::new(InMemoryTimesheetBook::new());
    let gateway = Arc::new(RateTableGateway::new(directory.clone(), timesheets.clone()));

    let payroll = PayrollController::new(events.clone(), snapshots.clone(), gateway, directory.clone())
        .with_workers(config.calc_workers);

    let declarations = DeclarationService::new(
        snapshots.clone(),
        directory.clone(),
        Arc::new(InMemorySubmissionLedger::new()),
    )
    .with_ceilings(config.ceilings.clone())
    .with_policy(config.validation_policy);

    let payments = BankPaymentService::new(
        events,
        snapshots,
        directory.clone(),
        Arc::new(InMemoryBankFileStore::new()),
    );

    tracing::info!(
        calc_workers = payroll.workers(),
        validation_policy = ?declarations.policy(),
        "services wired"
    );

    AppServices {
        payroll,
        declarations,
        payments,
        directory,
        timesheets,
    }
}
