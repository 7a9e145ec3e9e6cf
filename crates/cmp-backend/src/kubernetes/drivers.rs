//! Per-kind workload drivers
//!
//! Containers map to bare pods, VMs to KubeVirt `VirtualMachine` objects.
//! The backend picks the driver from the instance kind and never inspects
//! the kind again.

use super::manifests;
use crate::config::WorkloadImages;
use crate::error::{BackendError, BackendResult};
use crate::traits::{BackendPhase, InstanceRef, InstanceRequest};
use async_trait::async_trait;
use cmp_types::InstanceKind;
use k8s_openapi::api::core::v1::Pod;
use kube::api::{Api, DeleteParams, DynamicObject, Patch, PatchParams, PostParams};
use kube::discovery::ApiResource;
use kube::Client;
use tracing::debug;

#[async_trait]
pub(crate) trait WorkloadDriver: Send + Sync {
    async fn create(&self, request: &InstanceRequest) -> BackendResult<()>;
    async fn delete(&self, target: &InstanceRef) -> BackendResult<()>;
    async fn start(&self, target: &InstanceRef) -> BackendResult<()>;
    async fn stop(&self, target: &InstanceRef) -> BackendResult<()>;
    async fn status(&self, target: &InstanceRef) -> BackendResult<BackendPhase>;
}

/// Translate a kube client error, naming the object it was about
pub(crate) fn map_kube_error(err: kube::Error, object: &str) -> BackendError {
    match err {
        kube::Error::Api(ae) if ae.code == 409 => BackendError::AlreadyExists(object.to_string()),
        kube::Error::Api(ae) if ae.code == 404 => BackendError::NotFound(object.to_string()),
        kube::Error::Api(ae) => BackendError::Api {
            status: ae.code,
            message: ae.message,
        },
        other => BackendError::Client(other.to_string()),
    }
}

/// Containers as pods. Pods cannot be paused, so stop deletes the pod and
/// start is rejected.
pub(crate) struct PodDriver {
    client: Client,
    images: WorkloadImages,
}

impl PodDriver {
    pub(crate) fn new(client: Client, images: WorkloadImages) -> Self {
        Self { client, images }
    }

    fn api(&self, namespace: &str) -> Api<Pod> {
        Api::namespaced(self.client.clone(), namespace)
    }
}

#[async_trait]
impl WorkloadDriver for PodDriver {
    async fn create(&self, request: &InstanceRequest) -> BackendResult<()> {
        let pod: Pod = serde_json::from_value(manifests::pod(request, &self.images))
            .map_err(|e| BackendError::Manifest(e.to_string()))?;

        self.api(&request.namespace)
            .create(&PostParams::default(), &pod)
            .await
            .map_err(|e| map_kube_error(e, &request.name))?;

        debug!(pod = %request.name, namespace = %request.namespace, "Created pod");
        Ok(())
    }

    async fn delete(&self, target: &InstanceRef) -> BackendResult<()> {
        self.api(&target.namespace)
            .delete(&target.name, &DeleteParams::default())
            .await
            .map_err(|e| map_kube_error(e, &target.name))?;
        Ok(())
    }

    async fn start(&self, _target: &InstanceRef) -> BackendResult<()> {
        Err(BackendError::Unsupported {
            operation: "start".into(),
            kind: InstanceKind::Container,
        })
    }

    async fn stop(&self, target: &InstanceRef) -> BackendResult<()> {
        self.delete(target).await
    }

    async fn status(&self, target: &InstanceRef) -> BackendResult<BackendPhase> {
        let pod = self
            .api(&target.namespace)
            .get(&target.name)
            .await
            .map_err(|e| map_kube_error(e, &target.name))?;

        let phase = pod.status.as_ref().and_then(|s| s.phase.as_deref());
        Ok(BackendPhase::from_pod_phase(phase))
    }
}

/// VMs as KubeVirt `VirtualMachine` objects, powered on and off through
/// `spec.running`.
pub(crate) struct VirtualMachineDriver {
    client: Client,
    images: WorkloadImages,
    resource: ApiResource,
}

impl VirtualMachineDriver {
    pub(crate) fn new(client: Client, images: WorkloadImages) -> Self {
        let resource = ApiResource {
            group: manifests::KUBEVIRT_GROUP.to_string(),
            version: manifests::KUBEVIRT_VERSION.to_string(),
            api_version: format!("{}/{}", manifests::KUBEVIRT_GROUP, manifests::KUBEVIRT_VERSION),
            kind: manifests::VM_KIND.to_string(),
            plural: manifests::VM_PLURAL.to_string(),
        };
        Self {
            client,
            images,
            resource,
        }
    }

    fn api(&self, namespace: &str) -> Api<DynamicObject> {
        Api::namespaced_with(self.client.clone(), namespace, &self.resource)
    }

    async fn set_running(&self, target: &InstanceRef, running: bool) -> BackendResult<()> {
        self.api(&target.namespace)
            .patch(
                &target.name,
                &PatchParams::default(),
                &Patch::Merge(&manifests::running_patch(running)),
            )
            .await
            .map_err(|e| map_kube_error(e, &target.name))?;

        debug!(vm = %target.name, namespace = %target.namespace, running, "Patched VM power state");
        Ok(())
    }
}

#[async_trait]
impl WorkloadDriver for VirtualMachineDriver {
    async fn create(&self, request: &InstanceRequest) -> BackendResult<()> {
        let vm: DynamicObject =
            serde_json::from_value(manifests::virtual_machine(request, &self.images))
                .map_err(|e| BackendError::Manifest(e.to_string()))?;

        self.api(&request.namespace)
            .create(&PostParams::default(), &vm)
            .await
            .map_err(|e| map_kube_error(e, &request.name))?;

        debug!(vm = %request.name, namespace = %request.namespace, "Created virtual machine");
        Ok(())
    }

    async fn delete(&self, target: &InstanceRef) -> BackendResult<()> {
        self.api(&target.namespace)
            .delete(&target.name, &DeleteParams::default())
            .await
            .map_err(|e| map_kube_error(e, &target.name))?;
        Ok(())
    }

    async fn start(&self, target: &InstanceRef) -> BackendResult<()> {
        self.set_running(target, true).await
    }

    async fn stop(&self, target: &InstanceRef) -> BackendResult<()> {
        self.set_running(target, false).await
    }

    async fn status(&self, target: &InstanceRef) -> BackendResult<BackendPhase> {
        let vm = self
            .api(&target.namespace)
            .get(&target.name)
            .await
            .map_err(|e| map_kube_error(e, &target.name))?;

        let running = vm
            .data
            .get("spec")
            .and_then(|spec| spec.get("running"))
            .and_then(|r| r.as_bool())
            .unwrap_or(false);

        Ok(if running {
            BackendPhase::Running
        } else {
            BackendPhase::Stopped
        })
    }
}
