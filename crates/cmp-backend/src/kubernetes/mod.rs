//! Kubernetes compute backend

mod drivers;
pub mod manifests;

use crate::config::WorkloadImages;
use crate::error::{BackendError, BackendResult};
use crate::traits::{BackendPhase, ComputeBackend, InstanceRef, InstanceRequest};
use async_trait::async_trait;
use cmp_types::InstanceKind;
use drivers::{map_kube_error, PodDriver, VirtualMachineDriver, WorkloadDriver};
use k8s_openapi::api::core::v1::Namespace;
use kube::api::{Api, DeleteParams, PostParams};
use kube::Client;
use tracing::{debug, info};

/// Compute backend on a Kubernetes cluster, with KubeVirt for VMs
pub struct KubeBackend {
    client: Client,
    pods: PodDriver,
    vms: VirtualMachineDriver,
}

impl KubeBackend {
    pub fn new(client: Client, images: WorkloadImages) -> Self {
        Self {
            pods: PodDriver::new(client.clone(), images.clone()),
            vms: VirtualMachineDriver::new(client.clone(), images),
            client,
        }
    }

    fn driver(&self, kind: InstanceKind) -> &dyn WorkloadDriver {
        match kind {
            InstanceKind::Container => &self.pods,
            InstanceKind::Vm => &self.vms,
        }
    }

    fn namespaces(&self) -> Api<Namespace> {
        Api::all(self.client.clone())
    }
}

#[async_trait]
impl ComputeBackend for KubeBackend {
    fn name(&self) -> &str {
        "kubernetes"
    }

    async fn create_namespace(&self, namespace: &str) -> BackendResult<()> {
        let ns: Namespace = serde_json::from_value(manifests::namespace(namespace))
            .map_err(|e| BackendError::Manifest(e.to_string()))?;

        self.namespaces()
            .create(&PostParams::default(), &ns)
            .await
            .map_err(|e| map_kube_error(e, namespace))?;

        info!(namespace, "Created namespace");
        Ok(())
    }

    async fn delete_namespace(&self, namespace: &str) -> BackendResult<()> {
        self.namespaces()
            .delete(namespace, &DeleteParams::default())
            .await
            .map_err(|e| map_kube_error(e, namespace))?;

        info!(namespace, "Deleted namespace");
        Ok(())
    }

    async fn create_instance(&self, request: &InstanceRequest) -> BackendResult<()> {
        debug!(name = %request.name, kind = %request.kind, "Creating instance");
        self.driver(request.kind).create(request).await
    }

    async fn delete_instance(&self, target: &InstanceRef) -> BackendResult<()> {
        self.driver(target.kind).delete(target).await
    }

    async fn start_instance(&self, target: &InstanceRef) -> BackendResult<()> {
        self.driver(target.kind).start(target).await
    }

    async fn stop_instance(&self, target: &InstanceRef) -> BackendResult<()> {
        self.driver(target.kind).stop(target).await
    }

    async fn instance_status(&self, target: &InstanceRef) -> BackendResult<BackendPhase> {
        self.driver(target.kind).status(target).await
    }
}
