//! Faults inside sessions must release their reservation and leave sibling
//! sessions untouched.

use std::sync::Arc;

use streamgate_foundation::Orchestrator;
use streamgate_kernel::config::SimulationConfig;
use streamgate_kernel::outcome::SessionStatus;
use streamgate_testing::{FailingDelay, FixedLatency, PanickingDelay, RecordingSink, assert_pool_idle};

fn config(num_clients: usize) -> SimulationConfig {
    SimulationConfig::default()
        .with_num_clients(num_clients)
        .with_seed(5)
}

#[tokio::test(start_paused = true)]
async fn interrupted_delay_still_releases() {
    let delay = FailingDelay::for_clients([2, 4]);
    let orchestrator = Orchestrator::new(config(6))
        .unwrap()
        .with_delay(Arc::new(delay.clone()));

    let report = orchestrator.run().await;

    assert_eq!(report.summary.total, 6);
    assert_eq!(report.summary.admitted, 6);
    assert_eq!(report.summary.internal_errors, 2);
    for id in [2, 4] {
        let outcome = report.outcome(id).unwrap();
        assert!(outcome.admitted);
        assert!(outcome.timing.is_some());
        match &outcome.status {
            SessionStatus::Failed { message } => assert!(message.contains("forced fault")),
            other => panic!("client {id}: expected failure, got {other:?}"),
        }
    }
    for id in [1, 3, 5, 6] {
        assert_eq!(report.outcome(id).unwrap().status, SessionStatus::Completed);
    }

    assert_eq!(delay.calls().len(), 6);
    assert_pool_idle!(orchestrator.pool());
}

#[tokio::test(start_paused = true)]
async fn every_session_failing_still_leaves_pool_idle() {
    let orchestrator = Orchestrator::new(config(50))
        .unwrap()
        .with_delay(Arc::new(FailingDelay::always()));

    let report = orchestrator.run().await;

    assert_eq!(report.summary.internal_errors, report.summary.admitted);
    assert!(report.summary.rejected_resource_exhausted >= 10);
    assert!(report.final_pool.within_capacity());
    assert_pool_idle!(orchestrator.pool());
}

#[tokio::test(start_paused = true)]
async fn panicking_session_is_contained() {
    let sink = Arc::new(RecordingSink::new());
    let orchestrator = Orchestrator::new(config(8))
        .unwrap()
        .with_delay(Arc::new(PanickingDelay::for_clients([3])))
        .with_sink(sink.clone());

    let report = orchestrator.run().await;

    assert_eq!(report.summary.total, 8);
    assert_eq!(report.summary.internal_errors, 1);
    let outcome = report.outcome(3).unwrap();
    assert!(outcome.admitted);
    match &outcome.status {
        SessionStatus::Failed { message } => {
            assert!(message.contains("forced panic in session 3"));
        }
        other => panic!("expected failure, got {other:?}"),
    }
    assert_eq!(
        report
            .outcomes
            .iter()
            .filter(|o| o.status == SessionStatus::Completed)
            .count(),
        7
    );

    let mut ids = sink.client_ids();
    ids.sort_unstable();
    assert_eq!(ids, (1..=8).collect::<Vec<u64>>());
    assert_pool_idle!(orchestrator.pool());
}

#[tokio::test(start_paused = true)]
async fn all_sessions_panicking_leaves_pool_idle() {
    let orchestrator = Orchestrator::new(config(60))
        .unwrap()
        .with_delay(Arc::new(PanickingDelay::always()));

    let report = orchestrator.run().await;

    assert_eq!(report.summary.total, 60);
    assert_eq!(report.summary.internal_errors, report.summary.admitted);
    assert_eq!(
        report.summary.admitted + report.summary.rejected(),
        report.summary.total
    );
    assert_pool_idle!(orchestrator.pool());
}

#[tokio::test(start_paused = true)]
async fn out_of_range_latency_is_reported_not_propagated() {
    let orchestrator = Orchestrator::new(config(3))
        .unwrap()
        .with_latency_source(Arc::new(FixedLatency::new(-1.0)));

    let report = orchestrator.run().await;

    assert_eq!(report.summary.internal_errors, 3);
    assert!(report.outcomes.iter().all(|o| o.admitted && o.timing.is_none()));
    assert_pool_idle!(orchestrator.pool());
}
