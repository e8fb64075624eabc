//! End-to-end simulation scenarios on paused time.

use std::sync::Arc;

use streamgate_foundation::Orchestrator;
use streamgate_kernel::admission::ResourceKind;
use streamgate_kernel::config::SimulationConfig;
use streamgate_kernel::outcome::SessionStatus;
use streamgate_testing::{FixedLatency, RecordingSink, assert_pool_idle};

#[tokio::test(start_paused = true)]
async fn default_capacity_rejects_on_cpu_not_bandwidth() {
    let sink = Arc::new(RecordingSink::new());
    let latency = Arc::new(FixedLatency::new(0.1));
    let orchestrator = Orchestrator::new(SimulationConfig::default())
        .unwrap()
        .with_latency_source(latency.clone())
        .with_sink(sink.clone());

    let report = orchestrator.run().await;

    assert_eq!(report.max_clients, 200);
    assert_eq!(report.summary.total, 50);
    assert!(report.summary.rejected_resource_exhausted >= 10);
    assert_eq!(report.summary.rejected_client_limit, 0);
    assert_eq!(
        report.summary.admitted + report.summary.rejected(),
        report.summary.total
    );
    for reason in report.outcomes.iter().filter_map(|o| o.rejection()) {
        assert!(reason.exhausted(ResourceKind::Cpu));
    }

    // Only admitted sessions draw a latency
    assert_eq!(latency.draws(), report.summary.admitted);
    assert!(report.final_pool.peak_active_clients <= 40);
    assert!(report.final_pool.within_capacity());
    assert_pool_idle!(orchestrator.pool());

    assert_eq!(sink.outcomes().len(), 50);
    assert_eq!(sink.summaries(), vec![report.summary.clone()]);
}

#[tokio::test(start_paused = true)]
async fn every_client_gets_exactly_one_outcome() {
    let orchestrator = Orchestrator::new(SimulationConfig::default().with_num_clients(120)).unwrap();
    let report = orchestrator.run().await;

    let mut ids: Vec<u64> = report.outcomes.iter().map(|o| o.client_id).collect();
    ids.sort_unstable();
    assert_eq!(ids, (1..=120).collect::<Vec<u64>>());
    assert_eq!(report.summary.admitted + report.summary.rejected(), 120);
    assert_pool_idle!(orchestrator.pool());
}

#[tokio::test(start_paused = true)]
async fn zero_clients_have_no_side_effects() {
    let sink = Arc::new(RecordingSink::new());
    let latency = Arc::new(FixedLatency::new(0.05));
    let orchestrator = Orchestrator::new(SimulationConfig::default().with_num_clients(0))
        .unwrap()
        .with_latency_source(latency.clone())
        .with_sink(sink.clone());

    let report = orchestrator.run().await;

    assert!(report.outcomes.is_empty());
    assert_eq!(report.summary.admitted, 0);
    assert_eq!(latency.draws(), 0);
    assert_eq!(report.final_pool.peak_active_clients, 0);
    assert!(report.final_pool.peak_used.is_zero());
    assert!(sink.outcomes().is_empty());
    assert_eq!(sink.summaries().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn limited_workers_serve_everyone_eventually() {
    let config = SimulationConfig::default()
        .with_num_clients(100)
        .with_worker_limit(10);
    let orchestrator = Orchestrator::new(config).unwrap();
    let report = orchestrator.run().await;

    assert_eq!(report.summary.admitted, 100);
    assert_eq!(report.summary.rejected(), 0);
    assert!(report.final_pool.peak_active_clients <= 10);
    assert_pool_idle!(orchestrator.pool());
}

#[tokio::test(start_paused = true)]
async fn reported_timing_follows_the_formula() {
    let config = SimulationConfig {
        num_clients: 4,
        processing_delay_base_sec: 0.05,
        cpu_speed_ghz: 2.5,
        ..Default::default()
    };
    let orchestrator = Orchestrator::new(config)
        .unwrap()
        .with_latency_source(Arc::new(FixedLatency::new(0.1)));
    let report = orchestrator.run().await;

    for outcome in &report.outcomes {
        assert_eq!(outcome.status, SessionStatus::Completed);
        let timing = outcome.timing.unwrap();
        // 0.05 + (0.1 * 2.5) / 2.5
        assert!((timing.processing_delay_secs - 0.15).abs() < 1e-9);
        assert!((timing.total_time_secs - 0.25).abs() < 1e-9);
    }
    assert!((report.summary.mean_total_time_secs.unwrap() - 0.25).abs() < 1e-9);
}

#[tokio::test(start_paused = true)]
async fn bandwidth_cap_binds_before_cpu() {
    let config = SimulationConfig {
        num_clients: 30,
        per_client_bitrate_mbps: 50.0,
        ..Default::default()
    }
    .with_worker_limit(30);
    let orchestrator = Orchestrator::new(config).unwrap();
    let report = orchestrator.run().await;

    assert_eq!(report.max_clients, 20);
    assert_eq!(report.summary.admitted, 20);
    assert_eq!(report.summary.rejected_client_limit, 10);
    assert_eq!(report.summary.rejected_resource_exhausted, 0);
    assert_eq!(report.final_pool.peak_active_clients, 20);
    assert_pool_idle!(orchestrator.pool());
}

#[tokio::test(start_paused = true)]
async fn pool_is_reusable_across_runs() {
    let orchestrator = Orchestrator::new(SimulationConfig::default()).unwrap();
    let first = orchestrator.run().await;
    let second = orchestrator.run().await;

    assert_eq!(first.summary.admitted, second.summary.admitted);
    assert_pool_idle!(orchestrator.pool());
}

#[tokio::test(start_paused = true)]
async fn report_serializes_to_json() {
    let orchestrator = Orchestrator::new(SimulationConfig::default().with_num_clients(3)).unwrap();
    let report = orchestrator.run().await;

    let value = serde_json::to_value(&report).unwrap();
    assert_eq!(value["summary"]["total"], 3);
    assert_eq!(value["outcomes"].as_array().unwrap().len(), 3);
    assert_eq!(value["outcomes"][0]["status"], "completed");
}
