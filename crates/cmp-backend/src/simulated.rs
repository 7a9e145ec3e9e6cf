//! In-process compute backend for development and testing
//!
//! Behaves like the Kubernetes backend at the contract level (containers
//! cannot be started, stopping a container destroys it, VMs are powered off
//! and on) and additionally records every call and lets callers inject
//! failures per operation and target.

use crate::error::{BackendError, BackendResult};
use crate::traits::{BackendPhase, ComputeBackend, InstanceRef, InstanceRequest};
use async_trait::async_trait;
use cmp_types::{InstanceKind, ResourceAmount};
use dashmap::{DashMap, DashSet};
use parking_lot::Mutex;
use std::time::Duration;
use tracing::debug;

/// Backend operation, as recorded in the call log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendOp {
    CreateNamespace,
    DeleteNamespace,
    CreateInstance,
    DeleteInstance,
    StartInstance,
    StopInstance,
    InstanceStatus,
}

/// One recorded backend call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendCall {
    pub op: BackendOp,
    /// Namespace or instance name the call was about
    pub target: String,
}

#[derive(Debug, Clone)]
struct Fault {
    op: BackendOp,
    target: Option<String>,
    /// `None` fails forever
    remaining: Option<u32>,
}

#[derive(Debug, Clone)]
struct SimulatedResource {
    kind: InstanceKind,
    resources: ResourceAmount,
    phase: BackendPhase,
}

/// Simulated compute backend
#[derive(Debug, Default)]
pub struct SimulatedBackend {
    namespaces: DashSet<String>,
    /// Keyed by (namespace, name)
    resources: DashMap<(String, String), SimulatedResource>,
    faults: Mutex<Vec<Fault>>,
    calls: Mutex<Vec<BackendCall>>,
    latency: Option<Duration>,
}

impl SimulatedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every call by `latency`
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Fail every `op` whose target is `target` (or any target if `None`)
    pub fn fail(&self, op: BackendOp, target: Option<&str>) {
        self.push_fault(op, target, None);
    }

    /// Fail only the next matching `op`
    pub fn fail_once(&self, op: BackendOp, target: Option<&str>) {
        self.push_fault(op, target, Some(1));
    }

    pub fn clear_faults(&self) {
        self.faults.lock().clear();
    }

    /// All calls made so far, in order
    pub fn calls(&self) -> Vec<BackendCall> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    /// Number of recorded calls of one kind
    pub fn count(&self, op: BackendOp) -> usize {
        self.calls.lock().iter().filter(|c| c.op == op).count()
    }

    pub fn has_namespace(&self, namespace: &str) -> bool {
        self.namespaces.contains(namespace)
    }

    pub fn has_instance(&self, namespace: &str, name: &str) -> bool {
        self.resources.contains_key(&key(namespace, name))
    }

    /// Resources held by the live instances of one namespace
    pub fn allocated(&self, namespace: &str) -> ResourceAmount {
        self.resources
            .iter()
            .filter(|entry| entry.key().0 == namespace)
            .fold(ResourceAmount::ZERO, |acc, entry| acc + entry.value().resources)
    }

    /// Overwrite the observed phase of an instance, simulating drift
    pub fn set_phase(&self, namespace: &str, name: &str, phase: BackendPhase) -> bool {
        match self.resources.get_mut(&key(namespace, name)) {
            Some(mut resource) => {
                resource.phase = phase;
                true
            }
            None => false,
        }
    }

    /// Remove an instance behind the orchestrator's back
    pub fn evict(&self, namespace: &str, name: &str) -> bool {
        self.resources.remove(&key(namespace, name)).is_some()
    }

    fn push_fault(&self, op: BackendOp, target: Option<&str>, remaining: Option<u32>) {
        self.faults.lock().push(Fault {
            op,
            target: target.map(str::to_string),
            remaining,
        });
    }

    /// Record the call, apply latency and any matching fault
    async fn enter(&self, op: BackendOp, target: &str) -> BackendResult<()> {
        self.calls.lock().push(BackendCall {
            op,
            target: target.to_string(),
        });

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        let mut faults = self.faults.lock();
        let hit = faults.iter().position(|f| {
            f.op == op && f.target.as_deref().map_or(true, |t| t == target)
        });

        if let Some(idx) = hit {
            let exhausted = match faults[idx].remaining.as_mut() {
                Some(n) => {
                    *n = n.saturating_sub(1);
                    *n == 0
                }
                None => false,
            };
            if exhausted {
                faults.remove(idx);
            }
            debug!(?op, target, "Injecting backend failure");
            return Err(BackendError::Injected(format!("{:?} {}", op, target)));
        }

        Ok(())
    }
}

fn key(namespace: &str, name: &str) -> (String, String) {
    (namespace.to_string(), name.to_string())
}

#[async_trait]
impl ComputeBackend for SimulatedBackend {
    fn name(&self) -> &str {
        "simulated"
    }

    async fn create_namespace(&self, namespace: &str) -> BackendResult<()> {
        self.enter(BackendOp::CreateNamespace, namespace).await?;
        if !self.namespaces.insert(namespace.to_string()) {
            return Err(BackendError::AlreadyExists(format!("namespace {}", namespace)));
        }
        Ok(())
    }

    async fn delete_namespace(&self, namespace: &str) -> BackendResult<()> {
        self.enter(BackendOp::DeleteNamespace, namespace).await?;
        if self.namespaces.remove(namespace).is_none() {
            return Err(BackendError::NotFound(format!("namespace {}", namespace)));
        }
        self.resources.retain(|(ns, _), _| ns != namespace);
        Ok(())
    }

    async fn create_instance(&self, request: &InstanceRequest) -> BackendResult<()> {
        self.enter(BackendOp::CreateInstance, &request.name).await?;
        if !self.namespaces.contains(&request.namespace) {
            return Err(BackendError::NotFound(format!(
                "namespace {}",
                request.namespace
            )));
        }

        let k = key(&request.namespace, &request.name);
        if self.resources.contains_key(&k) {
            return Err(BackendError::AlreadyExists(request.name.clone()));
        }

        self.resources.insert(
            k,
            SimulatedResource {
                kind: request.kind,
                resources: request.resources,
                phase: BackendPhase::Running,
            },
        );
        Ok(())
    }

    async fn delete_instance(&self, target: &InstanceRef) -> BackendResult<()> {
        self.enter(BackendOp::DeleteInstance, &target.name).await?;
        self.resources
            .remove(&key(&target.namespace, &target.name))
            .map(|_| ())
            .ok_or_else(|| BackendError::NotFound(target.name.clone()))
    }

    async fn start_instance(&self, target: &InstanceRef) -> BackendResult<()> {
        self.enter(BackendOp::StartInstance, &target.name).await?;
        if !target.kind.supports_restart() {
            return Err(BackendError::Unsupported {
                operation: "start".into(),
                kind: target.kind,
            });
        }

        let mut resource = self
            .resources
            .get_mut(&key(&target.namespace, &target.name))
            .ok_or_else(|| BackendError::NotFound(target.name.clone()))?;
        resource.phase = BackendPhase::Running;
        Ok(())
    }

    async fn stop_instance(&self, target: &InstanceRef) -> BackendResult<()> {
        self.enter(BackendOp::StopInstance, &target.name).await?;
        let k = key(&target.namespace, &target.name);

        match target.kind {
            InstanceKind::Container => self
                .resources
                .remove(&k)
                .map(|_| ())
                .ok_or_else(|| BackendError::NotFound(target.name.clone())),
            InstanceKind::Vm => {
                let mut resource = self
                    .resources
                    .get_mut(&k)
                    .ok_or_else(|| BackendError::NotFound(target.name.clone()))?;
                resource.phase = BackendPhase::Stopped;
                Ok(())
            }
        }
    }

    async fn instance_status(&self, target: &InstanceRef) -> BackendResult<BackendPhase> {
        self.enter(BackendOp::InstanceStatus, &target.name).await?;
        let resource = self
            .resources
            .get(&key(&target.namespace, &target.name))
            .ok_or_else(|| BackendError::NotFound(target.name.clone()))?;

        debug_assert_eq!(resource.kind, target.kind);
        Ok(resource.phase.clone())
    }
}
