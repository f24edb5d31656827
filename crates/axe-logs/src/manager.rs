use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use axe_k8s::Cluster;
use axe_types::{LogRecord, PodKey};

use crate::registry::SharedRegistry;
use crate::supervisor::PodSupervisor;
use crate::watch::{NamespaceWatch, PodHandlers};
use crate::{SyncError, TailSettings};

/// Registry of namespace watches and tail workers, and the single feed
/// they all write to.
///
/// Cloning a `Manager` is cheap; all clones share the same state.
pub struct Manager<C> {
    inner: Arc<Inner<C>>,
}

pub(crate) struct Inner<C> {
    pub(crate) cluster: C,
    pub(crate) settings: TailSettings,
    pub(crate) registry: SharedRegistry,
    pub(crate) log_tx: mpsc::Sender<LogRecord>,
    log_rx: Mutex<Option<mpsc::Receiver<LogRecord>>>,
}

impl<C> Clone for Manager<C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<C: Cluster> Manager<C> {
    /// Create a configured, unstarted manager
    pub fn new(cluster: C, settings: TailSettings) -> Self {
        let settings = settings.normalized();
        let (log_tx, log_rx) = mpsc::channel(settings.buffer);

        Self {
            inner: Arc::new(Inner {
                cluster,
                settings,
                registry: SharedRegistry::default(),
                log_tx,
                log_rx: Mutex::new(Some(log_rx)),
            }),
        }
    }

    pub fn settings(&self) -> &TailSettings {
        &self.inner.settings
    }

    /// Register a watch for a namespace. Calling it again for the same
    /// namespace does nothing. If the manager is already running, the
    /// watch starts delivering immediately.
    pub fn watch(&self, namespace: &str) {
        {
            let mut registry = self.inner.registry.lock();
            if registry.namespaces.contains_key(namespace) {
                return;
            }

            let mut watch = NamespaceWatch::new(namespace);
            if let Some(run) = registry.run_token.clone() {
                self.start_watch(&mut watch, &run);
            }
            registry.namespaces.insert(namespace.to_string(), watch);
        }

        tracing::info!(namespace, "registered watch for namespace");
        self.publish(LogRecord::status(
            namespace,
            format!("watching namespace {namespace}"),
        ));
    }

    /// Cancel a namespace watch and every pod and container worker under
    /// it. Unknown namespaces are ignored.
    pub fn unwatch(&self, namespace: &str) {
        let stopped = {
            let mut registry = self.inner.registry.lock();
            let Some(mut watch) = registry.namespaces.remove(namespace) else {
                return;
            };
            watch.stop();
            registry.sweep_namespace(namespace)
        };

        tracing::info!(namespace, "stopped watching namespace");
        for pod in &stopped {
            tracing::info!(pod = %pod, "stopped tailing logs");
        }
        self.publish(LogRecord::status(
            namespace,
            format!("stopped watching namespace {namespace}"),
        ));
    }

    /// Start every registered watch under a child of `cancel`, then block
    /// until each has loaded its initial pod snapshot.
    ///
    /// Cancelling `cancel` later shuts every watch and worker down.
    pub async fn run(&self, cancel: &CancellationToken) -> Result<(), SyncError> {
        let run = {
            let mut registry = self.inner.registry.lock();
            if registry.run_token.is_some() {
                return Err(SyncError::AlreadyRunning);
            }

            let run = cancel.child_token();
            registry.run_token = Some(run.clone());
            for watch in registry.namespaces.values_mut() {
                self.start_watch(watch, &run);
            }
            run
        };

        let manager = self.clone();
        let shutdown = run.clone();
        tokio::spawn(async move {
            shutdown.cancelled().await;
            manager.shutdown();
        });

        self.wait_for_cache_sync(&run).await
    }

    /// Block until every registered watch has loaded its initial snapshot,
    /// failing with the first namespace that cannot sync before `cancel`
    pub async fn wait_for_cache_sync(&self, cancel: &CancellationToken) -> Result<(), SyncError> {
        let pending: Vec<_> = {
            let registry = self.inner.registry.lock();
            let mut pending: Vec<_> = registry
                .namespaces
                .values()
                .map(|w| (w.namespace().to_string(), w.store()))
                .collect();
            pending.sort_by(|a, b| a.0.cmp(&b.0));
            pending
        };

        for (namespace, store) in pending {
            NamespaceWatch::wait_synced(namespace.clone(), store, cancel.clone()).await?;

            tracing::info!(namespace = %namespace, "cache synced for namespace");
            self.publish(LogRecord::status(
                &namespace,
                format!("cache synced for namespace {namespace}"),
            ));
        }
        Ok(())
    }

    /// Take the read side of the output feed. There is one receiver;
    /// later calls return `None`.
    pub fn logs(&self) -> Option<mpsc::Receiver<LogRecord>> {
        self.inner.log_rx.lock().take()
    }

    /// `(live tailers, tailers ever started)`
    pub fn container_count(&self) -> (usize, usize) {
        self.inner.registry.lock().container_counts()
    }

    /// Number of registered namespace watches
    pub fn namespace_count(&self) -> usize {
        self.inner.registry.lock().namespaces.len()
    }

    /// Unwatch every namespace
    pub fn shutdown(&self) {
        let namespaces: Vec<String> = self
            .inner
            .registry
            .lock()
            .namespaces
            .keys()
            .cloned()
            .collect();

        for namespace in namespaces {
            self.unwatch(&namespace);
        }
    }

    /// Pod added or updated: start supervising it unless already done
    pub(crate) fn start_pod(&self, key: PodKey) {
        let (handle, store) = {
            let mut registry = self.inner.registry.lock();
            if registry.pods.contains_key(&key) {
                return;
            }

            // Late notification for a namespace that was just unwatched
            let Some(store) = registry.namespaces.get(&key.namespace).map(|w| w.store()) else {
                return;
            };

            let Some(handle) = registry.register_pod(&key) else {
                return;
            };
            (handle, store)
        };

        let supervisor = PodSupervisor::new(Arc::clone(&self.inner), key, handle, store);
        tokio::spawn(supervisor.run());
    }

    /// Pod deleted: cancel its supervisor and tailers
    pub(crate) fn stop_pod(&self, key: PodKey) {
        let found = self.inner.registry.lock().cancel_pod(&key);
        if found {
            tracing::info!(pod = %key, "stopping pod logs");
        }
    }

    fn start_watch(&self, watch: &mut NamespaceWatch, run: &CancellationToken) {
        let seen = self.clone();
        let gone = self.clone();
        let handlers = PodHandlers {
            seen: Arc::new(move |key| seen.start_pod(key)),
            gone: Arc::new(move |key| gone.stop_pod(key)),
        };

        let events = self.inner.cluster.watch_pods(watch.namespace());
        watch.start(run, events, handlers, self.inner.settings.resync);
    }

    /// Best-effort status record; dropped when the feed is full so
    /// registry operations never wait on the consumer
    fn publish(&self, record: LogRecord) {
        if let Err(e) = self.inner.log_tx.try_send(record) {
            tracing::debug!(error = %e, "dropped status record");
        }
    }

    #[cfg(test)]
    pub(crate) fn registry(&self) -> SharedRegistry {
        Arc::clone(&self.inner.registry)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use chrono::Utc;
    use tokio::sync::mpsc::error::TryRecvError;

    use super::*;
    use crate::testing::{FakeCluster, LogBehavior, eventually, pod};

    fn settings() -> TailSettings {
        TailSettings {
            lookback: Duration::from_secs(60),
            resync: Duration::ZERO,
            retry_interval: Duration::from_millis(20),
            buffer: 64,
        }
    }

    /// Register namespaces, run, and deliver an empty listing for each
    async fn running(
        cluster: &FakeCluster,
        settings: TailSettings,
        namespaces: &[&str],
    ) -> Manager<FakeCluster> {
        let manager = Manager::new(cluster.clone(), settings);
        for ns in namespaces {
            manager.watch(ns);
        }

        let cancel = CancellationToken::new();
        let run = {
            let manager = manager.clone();
            tokio::spawn(async move { manager.run(&cancel).await })
        };

        for ns in namespaces {
            eventually("watch to start", || cluster.is_watching(ns)).await;
            cluster.list(ns, vec![]);
        }
        run.await.unwrap().unwrap();
        manager
    }

    /// Discard everything currently queued, returning the container records
    fn drain(rx: &mut mpsc::Receiver<LogRecord>) -> Vec<LogRecord> {
        let mut out = Vec::new();
        loop {
            match rx.try_recv() {
                Ok(record) if record.is_status() => {}
                Ok(record) => out.push(record),
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => return out,
            }
        }
    }

    #[test]
    fn test_watch_is_idempotent() {
        let manager = Manager::new(FakeCluster::default(), settings());
        manager.watch("demo");
        manager.watch("demo");
        assert_eq!(manager.namespace_count(), 1);

        manager.unwatch("demo");
        manager.unwatch("demo");
        assert_eq!(manager.namespace_count(), 0);
    }

    #[test]
    fn test_logs_receiver_is_handed_out_once() {
        let manager = Manager::new(FakeCluster::default(), settings());
        assert!(manager.logs().is_some());
        assert!(manager.logs().is_none());
    }

    #[tokio::test]
    async fn test_end_to_end_pod_lifecycle() {
        let cluster = FakeCluster::with_logs(LogBehavior::Lines(vec!["hello".into()]));
        let manager = running(&cluster, settings(), &["demo"]).await;
        let mut rx = manager.logs().unwrap();

        let p1 = pod("demo", "p1", &["c1", "c2"]);
        cluster.apply("demo", p1.clone());
        eventually("both tailers live", || manager.container_count() == (2, 2)).await;

        let mut seen = Vec::new();
        eventually("output from both containers", || {
            seen.extend(drain(&mut rx));
            ["c1", "c2"]
                .iter()
                .all(|c| seen.iter().any(|r| r.container_name() == Some(*c)))
        })
        .await;
        assert!(seen.iter().all(|r| r.pod == "p1" && r.text() == "hello"));

        cluster.delete("demo", p1);
        eventually("tailers stopped", || manager.container_count() == (0, 2)).await;

        drain(&mut rx);
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(drain(&mut rx).is_empty());
        assert_eq!(manager.container_count(), (0, 2));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_pods_in_initial_listing_are_tailed() {
        let cluster = FakeCluster::with_logs(LogBehavior::Silent);
        let manager = Manager::new(cluster.clone(), settings());
        manager.watch("demo");

        let cancel = CancellationToken::new();
        let run = {
            let manager = manager.clone();
            tokio::spawn(async move { manager.run(&cancel).await })
        };
        eventually("watch to start", || cluster.is_watching("demo")).await;

        // List pages arrive well before the listing completes
        cluster.begin_list("demo", vec![pod("demo", "p1", &["c1", "c2"])]);
        tokio::time::sleep(Duration::from_millis(50)).await;
        cluster.finish_list("demo");

        run.await.unwrap().unwrap();
        eventually("listed pod tailed", || manager.container_count() == (2, 2)).await;
        assert_eq!(cluster.requests_for("p1", "c1").len(), 1);
        assert_eq!(cluster.requests_for("p1", "c2").len(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_repeated_notifications_start_one_tailer() {
        let cluster = FakeCluster::with_logs(LogBehavior::Silent);
        let manager = running(&cluster, settings(), &["demo"]).await;

        let p1 = pod("demo", "p1", &["c1", "c2"]);
        for _ in 0..5 {
            cluster.apply("demo", p1.clone());
        }

        let key = PodKey::new("demo", "p1");
        let racers: Vec<_> = (0..4)
            .map(|_| {
                let manager = manager.clone();
                let key = key.clone();
                tokio::spawn(async move { manager.start_pod(key) })
            })
            .collect();
        for racer in racers {
            racer.await.unwrap();
        }

        eventually("tailers live", || manager.container_count() == (2, 2)).await;
        eventually("streams opened", || cluster.requests().len() == 2).await;
        for _ in 0..10 {
            let (live, total) = manager.container_count();
            assert!(live <= 2 && total == 2);
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(cluster.requests_for("p1", "c1").len(), 1);
        assert_eq!(cluster.requests_for("p1", "c2").len(), 1);
    }

    #[tokio::test]
    async fn test_unwatch_cancels_every_descendant() {
        let cluster = FakeCluster::with_logs(LogBehavior::Endless("tick".into()));
        let manager = running(&cluster, settings(), &["demo", "other"]).await;
        let mut rx = manager.logs().unwrap();

        cluster.apply("demo", pod("demo", "p1", &["c1"]));
        cluster.apply("demo", pod("demo", "p2", &["c1", "c2"]));
        cluster.apply("other", pod("other", "q1", &["c1"]));
        eventually("all tailers live", || manager.container_count() == (4, 4)).await;

        manager.unwatch("demo");

        assert_eq!(manager.namespace_count(), 1);
        assert_eq!(manager.registry().lock().handles_in_namespace("demo"), 0);
        eventually("demo tailers exited", || manager.container_count() == (1, 4)).await;

        drain(&mut rx);
        tokio::time::sleep(Duration::from_millis(50)).await;
        let after = drain(&mut rx);
        assert!(after.iter().all(|r| r.namespace == "other"));
        assert!(after.iter().any(|r| r.pod == "q1"));
    }

    #[tokio::test]
    async fn test_reconnect_resumes_from_bookmark() {
        let cluster = FakeCluster::with_logs(LogBehavior::Lines(vec!["once".into()]));
        let manager = running(&cluster, settings(), &["demo"]).await;

        let started = Utc::now();
        cluster.apply("demo", pod("demo", "p1", &["c1"]));
        eventually("a reconnect", || cluster.requests_for("p1", "c1").len() >= 3).await;

        let requests = cluster.requests_for("p1", "c1");
        let lookback = chrono::Duration::from_std(manager.settings().lookback).unwrap();
        assert!(requests[0].since_time <= started - lookback + chrono::Duration::seconds(1));
        assert!(requests[1].since_time >= started);
        assert!(requests.windows(2).all(|w| w[1].since_time >= w[0].since_time));
        assert!(requests.iter().all(|r| r.follow));
    }

    #[tokio::test]
    async fn test_not_found_stops_without_retry() {
        let cluster = FakeCluster::with_logs(LogBehavior::Lines(vec!["bye".into()]));
        let manager = running(&cluster, settings(), &["demo"]).await;

        cluster.apply("demo", pod("demo", "p1", &["c1"]));
        eventually("first stream", || !cluster.requests_for("p1", "c1").is_empty()).await;

        // A re-list without the pod drops it from the snapshot without a
        // delete notification
        cluster.list("demo", vec![]);
        eventually("tailer exited", || manager.container_count() == (0, 1)).await;

        let attempts = cluster.requests_for("p1", "c1").len();
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(cluster.requests_for("p1", "c1").len(), attempts);
        assert_eq!(manager.container_count(), (0, 1));
        assert!(!manager.registry().lock().pods.contains_key(&PodKey::new("demo", "p1")));
    }

    #[tokio::test]
    async fn test_deleted_before_supervision_does_nothing() {
        let cluster = FakeCluster::with_logs(LogBehavior::Silent);
        let manager = running(&cluster, settings(), &["demo"]).await;

        manager.start_pod(PodKey::new("demo", "ghost"));
        eventually("supervisor released", || manager.registry().lock().pods.is_empty()).await;
        assert_eq!(manager.container_count(), (0, 0));
        assert!(cluster.requests().is_empty());
    }

    #[tokio::test]
    async fn test_blocked_producer_observes_cancellation() {
        let cluster = FakeCluster::with_logs(LogBehavior::Endless("flood".into()));
        let settings = TailSettings {
            buffer: 4,
            ..settings()
        };
        let manager = running(&cluster, settings, &["demo"]).await;
        // Nobody reads: the feed fills up and the tailer blocks on send
        let _rx = manager.logs().unwrap();

        cluster.apply("demo", pod("demo", "p1", &["c1"]));
        eventually("tailer live", || manager.container_count() == (1, 1)).await;
        tokio::time::sleep(Duration::from_millis(50)).await;

        manager.unwatch("demo");

        let exited = tokio::time::timeout(Duration::from_secs(2), async {
            while manager.container_count().0 != 0 {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await;
        assert!(exited.is_ok(), "blocked tailer did not observe cancellation");
    }

    #[tokio::test]
    async fn test_failed_opens_are_retried() {
        let cluster = FakeCluster::with_logs(LogBehavior::Refuse);
        let manager = running(&cluster, settings(), &["demo"]).await;

        cluster.apply("demo", pod("demo", "p1", &["c1"]));
        eventually("retries", || cluster.requests_for("p1", "c1").len() >= 3).await;
        assert_eq!(manager.container_count(), (1, 1));

        cluster.set_logs(LogBehavior::Throttle);
        let attempts = cluster.requests_for("p1", "c1").len();
        eventually("retries while throttled", || {
            cluster.requests_for("p1", "c1").len() >= attempts + 2
        })
        .await;
        assert_eq!(manager.container_count(), (1, 1));
    }

    #[tokio::test]
    async fn test_sync_failure_names_namespace() {
        let cluster = FakeCluster::default();
        let manager = Manager::new(cluster.clone(), settings());
        manager.watch("demo");

        let cancel = CancellationToken::new();
        let run = {
            let manager = manager.clone();
            let cancel = cancel.clone();
            tokio::spawn(async move { manager.run(&cancel).await })
        };

        eventually("watch to start", || cluster.is_watching("demo")).await;
        cancel.cancel();

        let err = run.await.unwrap().unwrap_err();
        assert_eq!(
            err,
            SyncError::NeverSynced {
                namespace: "demo".into(),
                kind: "Pod"
            }
        );
        assert!(err.to_string().contains("namespace demo"));
    }

    #[tokio::test]
    async fn test_sync_failure_when_source_closes() {
        let cluster = FakeCluster::default();
        let manager = Manager::new(cluster.clone(), settings());
        manager.watch("demo");

        let cancel = CancellationToken::new();
        let run = {
            let manager = manager.clone();
            tokio::spawn(async move { manager.run(&cancel).await })
        };

        eventually("watch to start", || cluster.is_watching("demo")).await;
        cluster.hang_up("demo");

        assert!(run.await.unwrap().is_err());
    }

    #[tokio::test]
    async fn test_run_twice_is_rejected() {
        let cluster = FakeCluster::default();
        let manager = running(&cluster, settings(), &[]).await;

        let err = manager.run(&CancellationToken::new()).await.unwrap_err();
        assert_eq!(err, SyncError::AlreadyRunning);
    }

    #[tokio::test]
    async fn test_watch_after_run_starts_immediately() {
        let cluster = FakeCluster::with_logs(LogBehavior::Silent);
        let manager = running(&cluster, settings(), &[]).await;

        manager.watch("late");
        eventually("late watch to start", || cluster.is_watching("late")).await;
        cluster.list("late", vec![pod("late", "p1", &["c1"])]);

        manager
            .wait_for_cache_sync(&CancellationToken::new())
            .await
            .unwrap();
        eventually("tailer live", || manager.container_count() == (1, 1)).await;
    }

    #[tokio::test]
    async fn test_cancelling_run_shuts_everything_down() {
        let cluster = FakeCluster::with_logs(LogBehavior::Silent);
        let manager = Manager::new(cluster.clone(), settings());
        manager.watch("demo");

        let cancel = CancellationToken::new();
        let run = {
            let manager = manager.clone();
            let cancel = cancel.clone();
            tokio::spawn(async move { manager.run(&cancel).await })
        };
        eventually("watch to start", || cluster.is_watching("demo")).await;
        cluster.list("demo", vec![pod("demo", "p1", &["c1", "c2"])]);
        run.await.unwrap().unwrap();
        eventually("tailers live", || manager.container_count() == (2, 2)).await;

        cancel.cancel();
        eventually("shutdown", || {
            manager.namespace_count() == 0 && manager.container_count() == (0, 2)
        })
        .await;
    }

    #[tokio::test]
    async fn test_status_records_on_the_feed() {
        let cluster = FakeCluster::default();
        let manager = running(&cluster, settings(), &["demo"]).await;
        let mut rx = manager.logs().unwrap();

        let mut messages = Vec::new();
        while let Ok(record) = rx.try_recv() {
            assert!(record.is_status());
            messages.push(record.text().into_owned());
        }
        assert_eq!(
            messages,
            vec!["watching namespace demo", "cache synced for namespace demo"]
        );
    }
}
