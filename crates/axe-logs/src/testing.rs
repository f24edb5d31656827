//! In-memory cluster for exercising the core without an apiserver

use std::collections::HashMap;
use std::io;
use std::sync::Arc;
use std::time::Duration;

use futures::channel::mpsc::{UnboundedSender, unbounded};
use futures::{StreamExt, TryStreamExt, stream};
use k8s_openapi::api::core::v1::{Container, PodSpec};
use kube::api::ObjectMeta;
use kube::runtime::watcher::{self, Event};
use parking_lot::Mutex;

use axe_k8s::{Cluster, ClusterError, LogRequest, LogStream, Pod, PodEventStream};

/// What an opened log stream does
#[derive(Clone, Debug)]
pub(crate) enum LogBehavior {
    /// Emit these lines, then end
    Lines(Vec<String>),
    /// Emit the same line forever
    Endless(String),
    /// Open, then never produce anything
    Silent,
    /// Fail to open
    Refuse,
    /// Fail to open because of throttling
    Throttle,
}

#[derive(Default)]
struct State {
    watchers: HashMap<String, UnboundedSender<watcher::Result<Event<Pod>>>>,
    requests: Vec<(String, String, LogRequest)>,
    behavior: Option<LogBehavior>,
}

#[derive(Clone, Default)]
pub(crate) struct FakeCluster {
    state: Arc<Mutex<State>>,
}

impl FakeCluster {
    pub fn with_logs(behavior: LogBehavior) -> Self {
        let cluster = Self::default();
        cluster.state.lock().behavior = Some(behavior);
        cluster
    }

    pub fn set_logs(&self, behavior: LogBehavior) {
        self.state.lock().behavior = Some(behavior);
    }

    pub fn is_watching(&self, namespace: &str) -> bool {
        self.state.lock().watchers.contains_key(namespace)
    }

    fn send(&self, namespace: &str, event: Event<Pod>) {
        let state = self.state.lock();
        let tx = state
            .watchers
            .get(namespace)
            .unwrap_or_else(|| panic!("no watch for namespace {namespace}"));
        let _ = tx.unbounded_send(Ok(event));
    }

    /// Deliver a full listing, as after a (re)connect
    pub fn list(&self, namespace: &str, pods: Vec<Pod>) {
        self.begin_list(namespace, pods);
        self.finish_list(namespace);
    }

    /// Deliver the pages of a listing without completing it
    pub fn begin_list(&self, namespace: &str, pods: Vec<Pod>) {
        self.send(namespace, Event::Init);
        for pod in pods {
            self.send(namespace, Event::InitApply(pod));
        }
    }

    pub fn finish_list(&self, namespace: &str) {
        self.send(namespace, Event::InitDone);
    }

    pub fn apply(&self, namespace: &str, pod: Pod) {
        self.send(namespace, Event::Apply(pod));
    }

    pub fn delete(&self, namespace: &str, pod: Pod) {
        self.send(namespace, Event::Delete(pod));
    }

    /// Close the notification source of a namespace
    pub fn hang_up(&self, namespace: &str) {
        self.state.lock().watchers.remove(namespace);
    }

    /// Every log stream request so far, as `(namespace, pod, request)`
    pub fn requests(&self) -> Vec<(String, String, LogRequest)> {
        self.state.lock().requests.clone()
    }

    pub fn requests_for(&self, pod: &str, container: &str) -> Vec<LogRequest> {
        self.requests()
            .into_iter()
            .filter(|(_, p, r)| p == pod && r.container == container)
            .map(|(_, _, r)| r)
            .collect()
    }
}

impl Cluster for FakeCluster {
    fn watch_pods(&self, namespace: &str) -> PodEventStream {
        let (tx, rx) = unbounded();
        self.state.lock().watchers.insert(namespace.to_string(), tx);
        rx.boxed()
    }

    async fn open_log_stream(
        &self,
        namespace: &str,
        pod: &str,
        request: &LogRequest,
    ) -> Result<LogStream, ClusterError> {
        let behavior = {
            let mut state = self.state.lock();
            state
                .requests
                .push((namespace.to_string(), pod.to_string(), request.clone()));
            state.behavior.clone().unwrap_or(LogBehavior::Silent)
        };

        match behavior {
            LogBehavior::Lines(lines) => {
                let chunks = lines
                    .into_iter()
                    .map(|line| Ok::<_, io::Error>(format!("{line}\n").into_bytes()));
                Ok(Box::pin(stream::iter(chunks).into_async_read()))
            }
            LogBehavior::Endless(line) => {
                let chunk = format!("{line}\n").into_bytes();
                let chunks = stream::repeat_with(move || Ok::<_, io::Error>(chunk.clone()));
                Ok(Box::pin(chunks.into_async_read()))
            }
            LogBehavior::Silent => {
                let chunks = stream::pending::<io::Result<Vec<u8>>>();
                Ok(Box::pin(chunks.into_async_read()))
            }
            LogBehavior::Refuse => Err(ClusterError::Transport("connection refused".into())),
            LogBehavior::Throttle => Err(ClusterError::Throttled("too many requests".into())),
        }
    }
}

/// A pod with the given containers
pub(crate) fn pod(namespace: &str, name: &str, containers: &[&str]) -> Pod {
    Pod {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(namespace.to_string()),
            uid: Some(format!("uid-{namespace}-{name}")),
            ..Default::default()
        },
        spec: Some(PodSpec {
            containers: containers
                .iter()
                .map(|c| Container {
                    name: c.to_string(),
                    ..Default::default()
                })
                .collect(),
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// Poll `check` until it holds, failing the test after a few seconds
pub(crate) async fn eventually<F: FnMut() -> bool>(what: &str, mut check: F) {
    let waited = tokio::time::timeout(Duration::from_secs(5), async {
        while !check() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await;
    assert!(waited.is_ok(), "timed out waiting for {what}");
}
