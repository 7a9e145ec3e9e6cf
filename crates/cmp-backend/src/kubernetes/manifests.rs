//! Resource manifests for namespaces, pods and KubeVirt virtual machines

use crate::config::WorkloadImages;
use crate::traits::InstanceRequest;
use serde_json::{json, Value};

/// Label marking every object this platform creates
pub const MANAGED_BY_LABEL: &str = "app.kubernetes.io/managed-by";
pub const MANAGED_BY_VALUE: &str = "cmp";
pub const CLUSTER_NAMESPACE_LABEL: &str = "cmp.io/cluster-namespace";
pub const INSTANCE_LABEL: &str = "cmp.io/instance";

/// KubeVirt API coordinates
pub const KUBEVIRT_GROUP: &str = "kubevirt.io";
pub const KUBEVIRT_VERSION: &str = "v1";
pub const VM_KIND: &str = "VirtualMachine";
pub const VM_PLURAL: &str = "virtualmachines";

pub fn namespace(name: &str) -> Value {
    json!({
        "apiVersion": "v1",
        "kind": "Namespace",
        "metadata": {
            "name": name,
            "labels": {
                (MANAGED_BY_LABEL): MANAGED_BY_VALUE,
                (CLUSTER_NAMESPACE_LABEL): "true"
            }
        }
    })
}

/// Memory in GB rendered as a whole number of mebibytes
fn memory_mi(memory_gb: f64) -> String {
    format!("{}Mi", (memory_gb * 1024.0).round() as u64)
}

/// CPU cores rendered as millicores when fractional
fn cpu_quantity(cpu: f64) -> String {
    if cpu.fract() == 0.0 {
        format!("{}", cpu as u64)
    } else {
        format!("{}m", (cpu * 1000.0).round() as u64)
    }
}

pub fn pod(request: &InstanceRequest, images: &WorkloadImages) -> Value {
    let cpu = cpu_quantity(request.resources.cpu);
    let memory = memory_mi(request.resources.memory);

    json!({
        "apiVersion": "v1",
        "kind": "Pod",
        "metadata": {
            "name": request.name,
            "namespace": request.namespace,
            "labels": {
                (MANAGED_BY_LABEL): MANAGED_BY_VALUE,
                (INSTANCE_LABEL): request.name
            }
        },
        "spec": {
            "restartPolicy": "Always",
            "containers": [{
                "name": "main",
                "image": images.container,
                "resources": {
                    "requests": { "cpu": cpu, "memory": memory },
                    "limits": { "cpu": cpu, "memory": memory }
                }
            }]
        }
    })
}

pub fn virtual_machine(request: &InstanceRequest, images: &WorkloadImages) -> Value {
    let cores = request.resources.cpu.ceil().max(1.0) as u64;

    json!({
        "apiVersion": format!("{}/{}", KUBEVIRT_GROUP, KUBEVIRT_VERSION),
        "kind": VM_KIND,
        "metadata": {
            "name": request.name,
            "namespace": request.namespace,
            "labels": {
                (MANAGED_BY_LABEL): MANAGED_BY_VALUE,
                (INSTANCE_LABEL): request.name
            }
        },
        "spec": {
            "running": true,
            "template": {
                "metadata": {
                    "labels": { (INSTANCE_LABEL): request.name }
                },
                "spec": {
                    "domain": {
                        "cpu": { "cores": cores },
                        "resources": {
                            "requests": { "memory": format!("{}Gi", request.resources.memory) }
                        },
                        "devices": {
                            "disks": [{ "name": "rootdisk", "disk": { "bus": "virtio" } }]
                        }
                    },
                    "volumes": [{
                        "name": "rootdisk",
                        "containerDisk": { "image": images.vm_disk }
                    }]
                }
            }
        }
    })
}

/// Merge patch toggling a VM's power state
pub fn running_patch(running: bool) -> Value {
    json!({ "spec": { "running": running } })
}

#[cfg(test)]
mod tests {
    use super::*;
    use cmp_types::{InstanceKind, ResourceAmount};

    fn request(kind: InstanceKind, cpu: f64, memory: f64) -> InstanceRequest {
        InstanceRequest {
            name: "web-instance-0".into(),
            namespace: "web-ns".into(),
            kind,
            resources: ResourceAmount::new(cpu, memory),
        }
    }

    #[test]
    fn test_namespace_labels() {
        let ns = namespace("web-ns");
        assert_eq!(ns["metadata"]["name"], "web-ns");
        assert_eq!(ns["metadata"]["labels"][MANAGED_BY_LABEL], "cmp");
        assert_eq!(ns["metadata"]["labels"][CLUSTER_NAMESPACE_LABEL], "true");
    }

    #[test]
    fn test_pod_resources() {
        let pod = pod(
            &request(InstanceKind::Container, 2.0, 1.5),
            &WorkloadImages::default(),
        );
        let container = &pod["spec"]["containers"][0];
        assert_eq!(container["name"], "main");
        assert_eq!(container["image"], "nginx:latest");
        assert_eq!(container["resources"]["requests"]["cpu"], "2");
        assert_eq!(container["resources"]["requests"]["memory"], "1536Mi");
        assert_eq!(pod["spec"]["restartPolicy"], "Always");
    }

    #[test]
    fn test_fractional_cpu_uses_millicores() {
        let pod = pod(
            &request(InstanceKind::Container, 0.5, 1.0),
            &WorkloadImages::default(),
        );
        assert_eq!(
            pod["spec"]["containers"][0]["resources"]["limits"]["cpu"],
            "500m"
        );
    }

    #[test]
    fn test_virtual_machine_spec() {
        let vm = virtual_machine(&request(InstanceKind::Vm, 2.0, 4.0), &WorkloadImages::default());
        assert_eq!(vm["apiVersion"], "kubevirt.io/v1");
        assert_eq!(vm["spec"]["running"], true);

        let domain = &vm["spec"]["template"]["spec"]["domain"];
        assert_eq!(domain["cpu"]["cores"], 2);
        assert_eq!(domain["resources"]["requests"]["memory"], "4Gi");
        assert_eq!(
            vm["spec"]["template"]["spec"]["volumes"][0]["containerDisk"]["image"],
            "kubevirt/cirros-container-disk-demo"
        );
    }

    #[test]
    fn test_running_patch() {
        assert_eq!(running_patch(false)["spec"]["running"], false);
    }
}
