use std::sync::Arc;

use chrono::Utc;
use kube::runtime::reflector::Store;
use tokio::task::JoinSet;

use axe_k8s::{Cluster, Pod};
use axe_types::PodKey;

use crate::manager::Inner;
use crate::registry::{Handle, LivenessGuard};
use crate::tailer::ContainerTailer;
use crate::watch::resolve_containers;

/// Starts one tailer per container of a pod and waits for all of them.
///
/// The container set is read once from the snapshot when the supervisor
/// starts; containers added to a running pod later are not picked up.
pub(crate) struct PodSupervisor<C> {
    inner: Arc<Inner<C>>,
    key: PodKey,
    handle: Handle,
    store: Store<Pod>,
}

impl<C: Cluster> PodSupervisor<C> {
    pub fn new(inner: Arc<Inner<C>>, key: PodKey, handle: Handle, store: Store<Pod>) -> Self {
        Self {
            inner,
            key,
            handle,
            store,
        }
    }

    pub async fn run(self) {
        tracing::info!(pod = %self.key, "starting tail of logs for pod");

        let Some(containers) = resolve_containers(&self.store, &self.key) else {
            tracing::info!(pod = %self.key, "ignoring deleted pod");
            self.release();
            return;
        };

        let since = self.inner.settings.initial_since(Utc::now());
        let mut tailers = JoinSet::new();

        for container in containers {
            let key = self.key.container(container);
            let registered = self
                .inner
                .registry
                .lock()
                .register_container(&key, &self.handle.cancel);

            // Another tailer still holds this key
            let Some(tail) = registered else {
                tracing::debug!(container = %key, "container already tailed");
                continue;
            };

            let liveness =
                LivenessGuard::new(self.inner.registry.clone(), key.clone(), tail.generation);
            let tailer = ContainerTailer::new(
                Arc::clone(&self.inner),
                key,
                self.store.clone(),
                since,
                tail.cancel,
                liveness,
            );
            tailers.spawn(tailer.run());
        }

        while let Some(joined) = tailers.join_next().await {
            if let Err(e) = joined {
                tracing::warn!(pod = %self.key, error = %e, "container tailer panicked");
            }
        }

        tracing::debug!(pod = %self.key, "all container tailers exited");
        self.release();
    }

    fn release(&self) {
        self.inner
            .registry
            .lock()
            .release_pod(&self.key, self.handle.generation);
    }
}
