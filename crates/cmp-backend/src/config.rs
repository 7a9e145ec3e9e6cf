//! Backend selection and connection

use crate::error::{BackendError, BackendResult};
use crate::kubernetes::KubeBackend;
use crate::simulated::SimulatedBackend;
use crate::timeout::TimeoutBackend;
use crate::traits::ComputeBackend;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Compute backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Deadline for every individual backend call, in seconds
    #[serde(default = "default_call_timeout")]
    pub call_timeout_secs: u64,

    /// Which platform realizes instances
    #[serde(default)]
    pub provider: ProviderConfig,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            call_timeout_secs: default_call_timeout(),
            provider: ProviderConfig::default(),
        }
    }
}

impl BackendConfig {
    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.call_timeout_secs)
    }
}

/// Compute platform
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ProviderConfig {
    /// In-process simulation
    #[default]
    Simulated,

    /// Kubernetes with KubeVirt
    Kubernetes {
        /// How to locate cluster credentials
        #[serde(default)]
        mode: KubeConfigMode,

        /// Kubeconfig file; the default search path when absent
        #[serde(default)]
        kubeconfig: Option<PathBuf>,

        /// Kubeconfig context; the current context when absent
        #[serde(default)]
        context: Option<String>,

        #[serde(default)]
        images: WorkloadImages,
    },
}

/// Where Kubernetes credentials come from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KubeConfigMode {
    /// Service account of the pod the daemon runs in
    InCluster,
    /// A kubeconfig file
    #[default]
    Kubeconfig,
}

/// Images used for new workloads
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkloadImages {
    /// Image of the single container in each pod
    #[serde(default = "default_container_image")]
    pub container: String,

    /// Container disk booted by each VM
    #[serde(default = "default_vm_disk_image")]
    pub vm_disk: String,
}

impl Default for WorkloadImages {
    fn default() -> Self {
        Self {
            container: default_container_image(),
            vm_disk: default_vm_disk_image(),
        }
    }
}

fn default_call_timeout() -> u64 {
    30
}

fn default_container_image() -> String {
    "nginx:latest".to_string()
}

fn default_vm_disk_image() -> String {
    "kubevirt/cirros-container-disk-demo".to_string()
}

/// Build the configured backend, bounded by the configured call deadline.
///
/// Called once at startup; the returned handle is shared by every request.
pub async fn connect(config: &BackendConfig) -> BackendResult<Arc<dyn ComputeBackend>> {
    let inner: Arc<dyn ComputeBackend> = match &config.provider {
        ProviderConfig::Simulated => Arc::new(SimulatedBackend::new()),
        ProviderConfig::Kubernetes {
            mode,
            kubeconfig,
            context,
            images,
        } => {
            let client = kube_client(*mode, kubeconfig.as_ref(), context.as_deref()).await?;
            Arc::new(KubeBackend::new(client, images.clone()))
        }
    };

    info!(
        backend = inner.name(),
        call_timeout_secs = config.call_timeout_secs,
        "Compute backend connected"
    );

    Ok(Arc::new(TimeoutBackend::new(inner, config.call_timeout())))
}

async fn kube_client(
    mode: KubeConfigMode,
    kubeconfig: Option<&PathBuf>,
    context: Option<&str>,
) -> BackendResult<kube::Client> {
    use kube::config::{KubeConfigOptions, Kubeconfig};

    let config = match mode {
        KubeConfigMode::InCluster => kube::Config::incluster()
            .map_err(|e| BackendError::Unavailable(format!("in-cluster config: {}", e)))?,
        KubeConfigMode::Kubeconfig => {
            let options = KubeConfigOptions {
                context: context.map(str::to_string),
                ..Default::default()
            };
            match kubeconfig {
                Some(path) => {
                    let file = Kubeconfig::read_from(path).map_err(|e| {
                        BackendError::Unavailable(format!("{}: {}", path.display(), e))
                    })?;
                    kube::Config::from_custom_kubeconfig(file, &options)
                        .await
                        .map_err(|e| BackendError::Unavailable(e.to_string()))?
                }
                None => kube::Config::from_kubeconfig(&options)
                    .await
                    .map_err(|e| BackendError::Unavailable(e.to_string()))?,
            }
        }
    };

    kube::Client::try_from(config).map_err(|e| BackendError::Unavailable(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = BackendConfig::default();
        assert_eq!(config.call_timeout(), Duration::from_secs(30));
        assert!(matches!(config.provider, ProviderConfig::Simulated));
    }

    #[test]
    fn test_kubernetes_provider_deserialization() {
        let config: BackendConfig = serde_json::from_value(serde_json::json!({
            "call_timeout_secs": 5,
            "provider": {
                "type": "kubernetes",
                "mode": "in_cluster",
                "images": { "container": "busybox:1.36" }
            }
        }))
        .unwrap();

        assert_eq!(config.call_timeout_secs, 5);
        match config.provider {
            ProviderConfig::Kubernetes {
                mode,
                kubeconfig,
                images,
                ..
            } => {
                assert_eq!(mode, KubeConfigMode::InCluster);
                assert!(kubeconfig.is_none());
                assert_eq!(images.container, "busybox:1.36");
                assert_eq!(images.vm_disk, "kubevirt/cirros-container-disk-demo");
            }
            other => panic!("unexpected provider: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_connect_simulated() {
        let backend = connect(&BackendConfig::default()).await.unwrap();
        assert_eq!(backend.name(), "simulated");
    }
}
