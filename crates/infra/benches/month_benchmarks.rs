use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use paybook_core::{EmployeeId, Money, PayPeriod, TenantId};
use paybook_infra::event_store::InMemoryEventStore;
use paybook_infra::month_dispatcher::MonthDispatcher;
use paybook_infra::payroll_controller::{CancellationFlag, PayrollController};
use paybook_infra::personnel::InMemoryPersonnelDirectory;
use paybook_infra::rate_table::RateTableGateway;
use paybook_infra::store::InMemorySnapshotStore;
use paybook_infra::timesheet::InMemoryTimesheetBook;
use paybook_payroll::{
    CloseMonth, ClosingTotals, CompleteCalculation, EmployeeData, EmployeeRecord, MonthCommand, MonthKey,
    PrepareMonth, ReopenMonth,
};

fn march() -> PayPeriod {
    PayPeriod::new(2025, 3).unwrap()
}

fn record(n: usize) -> EmployeeRecord {
    EmployeeRecord {
        data: EmployeeData {
            employee_id: EmployeeId::new(),
            first_name: "Bench".into(),
            middle_name: None,
            last_name: format!("Employee{n:05}"),
            egn: Some("8501010011".into()),
            lnch: None,
            insurance_type: "01".into(),
            nkpd_code: None,
            kid_code: None,
            work_schedule: Some("8".into()),
            contract_number: None,
            contract_date: None,
            hire_date: NaiveDate::from_ymd_opt(2020, 1, 6),
            termination_date: None,
            iban: None,
            bic: None,
        },
        base_salary: Money::from_minor(150_000 + (n as i64 % 50) * 1_000),
        fixed_earnings: vec![],
    }
}

/// A month stream with `cycles` close/reopen rounds after the first calculation.
fn month_with_history(cycles: usize) -> (MonthDispatcher<InMemoryEventStore>, MonthKey) {
    let dispatcher = MonthDispatcher::new(InMemoryEventStore::new());
    let key = MonthKey::new(TenantId::new(), march());
    let now = Utc::now();

    dispatcher
        .dispatch(MonthCommand::Prepare(PrepareMonth { key, occurred_at: now }))
        .unwrap();
    for _ in 0..cycles {
        dispatcher
            .dispatch(MonthCommand::CompleteCalculation(CompleteCalculation {
                key,
                succeeded: 1,
                failed: 0,
                snapshot_count: 1,
                occurred_at: now,
            }))
            .unwrap();
        dispatcher
            .dispatch(MonthCommand::Close(CloseMonth {
                key,
                closed_by: None,
                totals: ClosingTotals { employee_count: 1, ..ClosingTotals::default() },
                occurred_at: now,
            }))
            .unwrap();
        dispatcher
            .dispatch(MonthCommand::Reopen(ReopenMonth {
                key,
                reopened_by: None,
                reason: None,
                occurred_at: now,
            }))
            .unwrap();
    }
    (dispatcher, key)
}

fn bench_month_rehydration(c: &mut Criterion) {
    let mut group = c.benchmark_group("month_rehydration");

    for cycles in [1, 10, 100].iter() {
        let (dispatcher, key) = month_with_history(*cycles);
        let events = 1 + cycles * 3;
        group.throughput(Throughput::Elements(events as u64));
        group.bench_with_input(BenchmarkId::from_parameter(events), &key, |b, key| {
            b.iter(|| black_box(dispatcher.load(*key).unwrap()));
        });
    }

    group.finish();
}

fn bench_calculate_all(c: &mut Criterion) {
    let mut group = c.benchmark_group("calculate_all");
    group.sample_size(20);
    let runtime = tokio::runtime::Builder::new_multi_thread().build().unwrap();

    for employees in [10, 100, 500].iter() {
        let tenant = TenantId::new();
        let directory = Arc::new(InMemoryPersonnelDirectory::new());
        for n in 0..*employees {
            directory.upsert_employee(tenant, record(n));
        }
        let timesheets = Arc::new(InMemoryTimesheetBook::new());
        let gateway = Arc::new(RateTableGateway::new(directory.clone(), timesheets));
        let controller = PayrollController::new(
            InMemoryEventStore::new(),
            Arc::new(InMemorySnapshotStore::new()),
            gateway,
            directory,
        );
        runtime.block_on(controller.prepare_month(tenant, march())).unwrap();

        group.throughput(Throughput::Elements(*employees as u64));
        group.bench_with_input(BenchmarkId::from_parameter(employees), &tenant, |b, tenant| {
            b.iter(|| {
                let result = runtime
                    .block_on(controller.calculate_all(*tenant, march(), &CancellationFlag::new()))
                    .unwrap();
                black_box(result.succeeded())
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_month_rehydration, bench_calculate_all);
criterion_main!(benches);
