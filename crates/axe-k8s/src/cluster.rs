use std::future::Future;
use std::pin::Pin;

use chrono::{DateTime, Utc};
use futures::io::AsyncBufRead;
use futures::stream::BoxStream;
use k8s_openapi::api::core::v1::Pod;
use kube::api::LogParams;
use kube::runtime::watcher;

use crate::ClusterError;

/// Pod change notifications for one namespace
pub type PodEventStream = BoxStream<'static, Result<watcher::Event<Pod>, watcher::Error>>;

/// An open follow-mode log stream for one container
pub type LogStream = Pin<Box<dyn AsyncBufRead + Send>>;

/// Parameters for opening a container log stream
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LogRequest {
    pub container: String,
    pub follow: bool,
    /// Only return lines written at or after this instant
    pub since_time: DateTime<Utc>,
}

impl LogRequest {
    pub fn follow(container: impl Into<String>, since_time: DateTime<Utc>) -> Self {
        Self {
            container: container.into(),
            follow: true,
            since_time,
        }
    }
}

impl From<&LogRequest> for LogParams {
    fn from(req: &LogRequest) -> Self {
        LogParams {
            container: Some(req.container.clone()),
            follow: req.follow,
            since_time: Some(req.since_time),
            ..Default::default()
        }
    }
}

/// The control-plane capabilities the tailing core depends on
pub trait Cluster: Clone + Send + Sync + 'static {
    /// Watch pods in a namespace. The stream starts with a full listing
    /// (`Init`, `InitApply`..., `InitDone`) followed by changes.
    fn watch_pods(&self, namespace: &str) -> PodEventStream;

    /// Open a log stream for one container of a pod
    fn open_log_stream(
        &self,
        namespace: &str,
        pod: &str,
        request: &LogRequest,
    ) -> impl Future<Output = Result<LogStream, ClusterError>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_log_params_carry_bookmark() {
        let since = Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 0).unwrap();
        let req = LogRequest::follow("app", since);
        let params = LogParams::from(&req);

        assert!(params.follow);
        assert_eq!(params.container.as_deref(), Some("app"));
        assert_eq!(params.since_time, Some(since));
        assert!(params.since_seconds.is_none());
        assert!(params.tail_lines.is_none());
    }
}
