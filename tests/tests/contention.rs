//! Property tests: no false admission under contention, conservation, and
//! determinism of the admission decision.

use std::sync::Arc;

use proptest::prelude::*;

use streamgate_foundation::{AdmissionController, Orchestrator, PoolCapacity, ResourcePool};
use streamgate_kernel::admission::{
    AdmissionPolicy, ClientRequest, PoolSnapshot, RejectionReason, ResourceVector,
};
use streamgate_kernel::config::SimulationConfig;
use streamgate_testing::assert_pool_idle;

fn resource_vector(max_units: f64) -> impl Strategy<Value = ResourceVector> {
    (0.0..max_units, 0.0..max_units, 0.0..max_units)
        .prop_map(|(cpu, memory, storage)| ResourceVector::from_units(cpu, memory, storage))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn threads_never_overshoot_capacity(
        cpu_capacity in 0.5f64..20.0,
        memory_capacity in 0.5f64..32.0,
        storage_capacity in 1.0f64..200.0,
        max_clients in 1usize..64,
        cpu_per_client in 0.05f64..2.0,
        memory_per_client in 0.05f64..2.0,
        bitrates in prop::collection::vec(1.0f64..40.0, 1..16),
        threads in 2usize..8,
    ) {
        let pool = Arc::new(ResourcePool::new(PoolCapacity::new(
            ResourceVector::from_units(cpu_capacity, memory_capacity, storage_capacity),
            max_clients,
        )));
        let controller = AdmissionController::new(Arc::clone(&pool), cpu_per_client, memory_per_client);

        std::thread::scope(|scope| {
            for thread in 0..threads {
                let controller = controller.clone();
                let bitrates = bitrates.clone();
                scope.spawn(move || {
                    let mut held = Vec::new();
                    for (i, bitrate) in bitrates.iter().cycle().take(64).enumerate() {
                        let request = ClientRequest::new((thread * 64 + i) as u64, *bitrate);
                        if let Ok(guard) = controller.try_admit(&request) {
                            held.push(guard);
                        }
                        let snapshot = controller.pool().snapshot();
                        assert!(snapshot.within_capacity(), "overshoot: {snapshot:?}");
                        if i % 3 == 0 {
                            held.clear();
                        }
                    }
                });
            }
        });

        let snapshot = pool.snapshot();
        prop_assert!(snapshot.within_capacity());
        prop_assert!(snapshot.peak_active_clients <= max_clients);
        prop_assert!(snapshot.is_idle());
        prop_assert_eq!(pool.live_reservations(), 0);
    }

    #[test]
    fn decision_is_a_pure_function_of_snapshot(
        capacity in resource_vector(50.0),
        used in resource_vector(50.0),
        demand in resource_vector(5.0),
        active_clients in 0usize..100,
        max_clients in 0usize..100,
    ) {
        let snapshot = PoolSnapshot {
            capacity,
            used,
            active_clients,
            max_clients,
            peak_used: used,
            peak_active_clients: active_clients,
        };
        let config = SimulationConfig::default();
        let controller = AdmissionController::from_config(
            Arc::new(ResourcePool::from_config(&config)),
            &config,
        );

        let first = controller.evaluate(&snapshot, &demand);
        prop_assert_eq!(&first, &controller.evaluate(&snapshot, &demand));

        let expected = if active_clients >= max_clients {
            Err(RejectionReason::ClientLimitExceeded { active: active_clients, max: max_clients })
        } else {
            let resources = snapshot.exhausted_by(&demand);
            if resources.is_empty() {
                Ok(())
            } else {
                Err(RejectionReason::ResourceExhausted { resources })
            }
        };
        prop_assert_eq!(first, expected);
    }

    #[test]
    fn orchestrated_runs_conserve_resources(
        num_clients in 0usize..150,
        workers in 1usize..64,
        cores in 1u32..8,
        bandwidth in 10.0f64..2000.0,
        seed in any::<u64>(),
    ) {
        let config = SimulationConfig {
            num_clients,
            worker_concurrency_limit: Some(workers),
            cpu_cores: cores,
            bandwidth_capacity_mbps: bandwidth,
            seed: Some(seed),
            time_scale: 0.0,
            ..Default::default()
        };
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(4)
            .enable_all()
            .build()
            .unwrap();

        let orchestrator = Orchestrator::new(config).unwrap();
        let report = runtime.block_on(orchestrator.run());

        prop_assert_eq!(report.outcomes.len(), num_clients);
        prop_assert_eq!(report.summary.admitted + report.summary.rejected(), num_clients);
        prop_assert_eq!(report.summary.internal_errors, 0);
        prop_assert!(report.final_pool.within_capacity());
        prop_assert!(report.final_pool.peak_active_clients <= workers);
        assert_pool_idle!(orchestrator.pool());
    }
}
