use anyhow::{Context, Result};
use futures::StreamExt;
use k8s_openapi::api::core::v1::Pod;
use kube::Api;
use kube::api::LogParams;
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::runtime::{WatchStreamExt, watcher};

use crate::{Cluster, ClusterError, LogRequest, LogStream, PodEventStream};

/// Kubernetes cluster backed by the user's kubeconfig
#[derive(Clone)]
pub struct KubeCluster {
    client: kube::Client,
    context: Option<String>,
    default_namespace: String,
}

impl KubeCluster {
    /// Connect using the named kubeconfig context, or the current one
    pub async fn connect(context: Option<&str>) -> Result<Self> {
        let kubeconfig =
            Kubeconfig::read().context("Failed to read kubeconfig. Is kubectl configured?")?;

        if let Some(name) = context {
            if !kubeconfig.contexts.iter().any(|c| c.name == name) {
                anyhow::bail!("Context '{}' not found in kubeconfig", name);
            }
        }

        let context = context
            .map(str::to_string)
            .or_else(|| kubeconfig.current_context.clone());

        let config = kube::Config::from_custom_kubeconfig(
            kubeconfig,
            &KubeConfigOptions {
                context: context.clone(),
                ..Default::default()
            },
        )
        .await
        .context(format!(
            "Failed to create config for context: {}",
            context.as_deref().unwrap_or("<current>")
        ))?;

        let default_namespace = config.default_namespace.clone();
        let client = kube::Client::try_from(config).context("Failed to create client")?;

        tracing::debug!(context = ?context, namespace = %default_namespace, "connected to cluster");

        Ok(Self {
            client,
            context,
            default_namespace,
        })
    }

    /// Name of the kubeconfig context in use, if known
    pub fn context(&self) -> Option<&str> {
        self.context.as_deref()
    }

    /// Namespace configured for the context (`default` when unset)
    pub fn default_namespace(&self) -> &str {
        &self.default_namespace
    }
}

impl Cluster for KubeCluster {
    fn watch_pods(&self, namespace: &str) -> PodEventStream {
        let pods: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
        watcher(pods, watcher::Config::default())
            .default_backoff()
            .boxed()
    }

    async fn open_log_stream(
        &self,
        namespace: &str,
        pod: &str,
        request: &LogRequest,
    ) -> Result<LogStream, ClusterError> {
        let pods: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
        let params = LogParams::from(request);
        let stream = pods.log_stream(pod, &params).await?;
        Ok(Box::pin(stream))
    }
}
