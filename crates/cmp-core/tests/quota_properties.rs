//! Property tests for the quota invariant:
//! after every settled operation `0 <= used <= quota`, and usage equals the
//! sum of the reservations of the clusters that still exist.

use cmp_backend::{BackendOp, SimulatedBackend};
use cmp_core::{ClusterOrchestrator, FleetError, InMemoryStore, NewTenant};
use cmp_types::{ClusterId, ClusterSpec, InstanceKind, ResourceAmount};
use proptest::prelude::*;
use std::sync::Arc;

#[derive(Debug, Clone)]
enum Step {
    Create {
        cpu: u8,
        memory: u8,
        count: u8,
        vm: bool,
        failing_member: Option<u8>,
    },
    Delete {
        pick: usize,
    },
    Suspend {
        pick: usize,
    },
}

fn arb_step() -> impl Strategy<Value = Step> {
    prop_oneof![
        3 => (1u8..=4, 1u8..=4, 1u8..=4, any::<bool>(), proptest::option::of(0u8..4)).prop_map(
            |(cpu, memory, count, vm, failing_member)| Step::Create {
                cpu,
                memory,
                count,
                vm,
                failing_member,
            }
        ),
        2 => any::<usize>().prop_map(|pick| Step::Delete { pick }),
        1 => any::<usize>().prop_map(|pick| Step::Suspend { pick }),
    ]
}

proptest! {
    #[test]
    fn usage_never_exceeds_quota(steps in prop::collection::vec(arb_step(), 1..25)) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let backend = Arc::new(SimulatedBackend::new());
            let orchestrator =
                ClusterOrchestrator::new(Arc::new(InMemoryStore::new()), backend.clone());
            let tenant = orchestrator
                .register_tenant(NewTenant {
                    username: "prop".into(),
                    token: "prop-token".into(),
                    quota_cpu: 12.0,
                    quota_memory: 16.0,
                })
                .await
                .unwrap();

            let mut live: Vec<(ClusterId, ResourceAmount)> = Vec::new();

            for (n, step) in steps.into_iter().enumerate() {
                match step {
                    Step::Create { cpu, memory, count, vm, failing_member } => {
                        let name = format!("c{}", n);
                        if let Some(member) = failing_member {
                            backend.fail_once(
                                BackendOp::CreateInstance,
                                Some(&format!("{}-instance-{}", name, member)),
                            );
                        }
                        let kind = if vm { InstanceKind::Vm } else { InstanceKind::Container };
                        let spec = ClusterSpec::new(
                            name,
                            kind,
                            f64::from(cpu),
                            f64::from(memory),
                            u32::from(count),
                        );
                        let total = spec.total();
                        let before = orchestrator.tenant(&tenant.id).await.unwrap();

                        match orchestrator.create_cluster(&tenant.id, spec).await {
                            Ok(created) => {
                                assert!((before.used() + total).fits_within(&before.quota()));
                                live.push((created.cluster.id, total));
                            }
                            Err(FleetError::QuotaExceeded { .. }) => {
                                assert!(!(before.used() + total).fits_within(&before.quota()));
                            }
                            Err(other) => panic!("unexpected error: {other}"),
                        }
                        backend.clear_faults();
                    }
                    Step::Delete { pick } => {
                        if live.is_empty() {
                            continue;
                        }
                        let (id, reservation) = live.remove(pick % live.len());
                        let deletion = orchestrator.delete_cluster(&tenant.id, &id).await.unwrap();
                        assert_eq!(deletion.released, reservation);
                    }
                    Step::Suspend { pick } => {
                        if live.is_empty() {
                            continue;
                        }
                        let (id, _) = live[pick % live.len()];
                        orchestrator.suspend_cluster(&tenant.id, &id).await.unwrap();
                    }
                }

                let tenant = orchestrator.tenant(&tenant.id).await.unwrap();
                let used = tenant.used();
                assert!(used.is_non_negative());
                assert!(used.fits_within(&tenant.quota()));

                let expected = live
                    .iter()
                    .fold(ResourceAmount::ZERO, |acc, (_, r)| acc + *r);
                assert_eq!(used, expected);
            }
        });
    }
}
