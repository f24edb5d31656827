use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use kube::ResourceExt;
use kube::runtime::reflector::{self, ObjectRef, Store, store::Writer};
use kube::runtime::watcher::Event;
use tokio::task::JoinHandle;
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use axe_k8s::{Pod, PodEventStream};
use axe_types::PodKey;

use crate::SyncError;

/// Resource kind reported in sync failures
pub(crate) const POD_KIND: &str = "Pod";

/// Callback invoked with the identity of a pod
pub(crate) type PodCallback = Arc<dyn Fn(PodKey) + Send + Sync>;

/// What a namespace watch does with pod notifications
#[derive(Clone)]
pub(crate) struct PodHandlers {
    /// Pod added, updated, or re-delivered by resync
    pub seen: PodCallback,
    /// Pod deleted
    pub gone: PodCallback,
}

/// A subscription to pod changes in one namespace, backed by a local
/// snapshot that the rest of the core reads instead of the apiserver
pub(crate) struct NamespaceWatch {
    namespace: String,
    store: Store<Pod>,
    writer: Option<Writer<Pod>>,
    cancel: Option<CancellationToken>,
    task: Option<JoinHandle<()>>,
}

impl NamespaceWatch {
    pub fn new(namespace: impl Into<String>) -> Self {
        let (store, writer) = reflector::store();
        Self {
            namespace: namespace.into(),
            store,
            writer: Some(writer),
            cancel: None,
            task: None,
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Read handle on the cached pod snapshot
    pub fn store(&self) -> Store<Pod> {
        self.store.clone()
    }

    /// Begin delivering notifications under a child of `parent`.
    /// A watch can only be started once.
    pub fn start(
        &mut self,
        parent: &CancellationToken,
        events: PodEventStream,
        handlers: PodHandlers,
        resync: Duration,
    ) {
        let Some(writer) = self.writer.take() else {
            return;
        };

        let cancel = parent.child_token();
        let delivery = Delivery {
            namespace: self.namespace.clone(),
            store: self.store.clone(),
            handlers,
            resync,
        };

        self.task = Some(tokio::spawn(delivery.run(events, writer, cancel.clone())));
        self.cancel = Some(cancel);
    }

    /// Stop delivering notifications. Running tailers are not affected.
    pub fn stop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel.cancel();
        }
        self.task = None;
    }

    /// Wait until the initial snapshot has loaded, or fail once `cancel`
    /// fires or the notification source goes away first
    pub async fn wait_synced(
        namespace: String,
        store: Store<Pod>,
        cancel: CancellationToken,
    ) -> Result<(), SyncError> {
        let never_synced = || SyncError::NeverSynced {
            namespace: namespace.clone(),
            kind: POD_KIND,
        };

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(never_synced()),
            ready = store.wait_until_ready() => ready.map_err(|_| never_synced()),
        }
    }
}

impl Drop for NamespaceWatch {
    fn drop(&mut self) {
        self.stop();
    }
}

/// The delivery loop of one namespace watch
struct Delivery {
    namespace: String,
    store: Store<Pod>,
    handlers: PodHandlers,
    resync: Duration,
}

impl Delivery {
    async fn run(self, events: PodEventStream, writer: Writer<Pod>, cancel: CancellationToken) {
        let events = reflector::reflector(writer, events);
        futures::pin_mut!(events);

        let mut resync = (!self.resync.is_zero()).then(|| {
            let mut interval = tokio::time::interval_at(Instant::now() + self.resync, self.resync);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            interval
        });

        loop {
            tokio::select! {
                biased;

                _ = cancel.cancelled() => break,

                _ = next_tick(&mut resync), if resync.is_some() => self.resync_snapshot(),

                item = events.next() => match item {
                    Some(Ok(event)) => self.dispatch(event),
                    Some(Err(e)) => {
                        tracing::warn!(namespace = %self.namespace, error = %e, "pod watch error");
                    }
                    None => {
                        tracing::debug!(namespace = %self.namespace, "pod watch ended");
                        break;
                    }
                },
            }
        }

        tracing::debug!(namespace = %self.namespace, "stopped pod notifications");
    }

    fn dispatch(&self, event: Event<Pod>) {
        match event {
            Event::Apply(pod) => (self.handlers.seen)(self.key_of(&pod)),
            Event::Delete(pod) => (self.handlers.gone)(self.key_of(&pod)),
            // Listed pods only reach the store once the listing completes
            Event::InitDone => self.deliver_snapshot("listing complete"),
            Event::Init | Event::InitApply(_) => {}
        }
    }

    fn resync_snapshot(&self) {
        self.deliver_snapshot("resync");
    }

    /// Deliver every cached pod as if it had just been updated
    fn deliver_snapshot(&self, reason: &str) {
        let pods = self.store.state();
        tracing::trace!(
            namespace = %self.namespace,
            pods = pods.len(),
            reason,
            "delivering snapshot"
        );
        for pod in pods {
            (self.handlers.seen)(self.key_of(&pod));
        }
    }

    fn key_of(&self, pod: &Pod) -> PodKey {
        let namespace = pod.namespace().unwrap_or_else(|| self.namespace.clone());
        PodKey::new(namespace, pod.name_any())
    }
}

async fn next_tick(interval: &mut Option<Interval>) {
    match interval {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending().await,
    }
}

/// Point-in-time read of a pod's container names from the snapshot.
/// `None` means the pod is not (or no longer) known.
pub(crate) fn resolve_containers(store: &Store<Pod>, pod: &PodKey) -> Option<Vec<String>> {
    let obj = store.get(&ObjectRef::new(&pod.name).within(&pod.namespace))?;
    Some(
        obj.spec
            .as_ref()
            .map(|spec| spec.containers.iter().map(|c| c.name.clone()).collect())
            .unwrap_or_default(),
    )
}
