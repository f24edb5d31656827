use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::AsyncBufReadExt;
use kube::runtime::reflector::Store;
use tokio_util::sync::CancellationToken;

use axe_k8s::{Cluster, LogRequest, LogStream, Pod};
use axe_types::{ContainerKey, LogRecord};

use crate::manager::Inner;
use crate::registry::LivenessGuard;
use crate::watch::resolve_containers;

/// Where a tailer is in its connect/read/retry cycle
enum TailState {
    /// Checking the pod still exists and opening a stream
    Starting,
    /// Reading lines from an open stream
    Streaming(LogStream),
    /// The stream ended or broke; about to reconnect
    Draining,
    /// Done for good
    Stopped,
}

/// Follows the log of one container, reconnecting until the pod is gone
/// or the worker is cancelled
pub(crate) struct ContainerTailer<C> {
    inner: Arc<Inner<C>>,
    key: ContainerKey,
    store: Store<Pod>,
    cancel: CancellationToken,

    /// Bookmark: the next connection reads from here
    since: DateTime<Utc>,

    _liveness: LivenessGuard,
}

impl<C: Cluster> ContainerTailer<C> {
    pub fn new(
        inner: Arc<Inner<C>>,
        key: ContainerKey,
        store: Store<Pod>,
        since: DateTime<Utc>,
        cancel: CancellationToken,
        liveness: LivenessGuard,
    ) -> Self {
        Self {
            inner,
            key,
            store,
            cancel,
            since,
            _liveness: liveness,
        }
    }

    /// Drive the state machine to completion. Liveness is released when
    /// the tailer is dropped at the end.
    pub async fn run(mut self) {
        tracing::info!(container = %self.key, "starting tail of logs for container");
        self.announce(format!("tailing {}", self.key));

        let mut state = TailState::Starting;
        loop {
            state = match state {
                TailState::Starting => self.connect().await,
                TailState::Streaming(stream) => self.stream(stream).await,
                TailState::Draining => self.drain().await,
                TailState::Stopped => break,
            };
        }

        self.announce(format!("ended tail of {}", self.key));
    }

    /// Best-effort status record; never waits on the consumer
    fn announce(&self, message: String) {
        let _ = self
            .inner
            .log_tx
            .try_send(LogRecord::status(self.key.namespace(), message));
    }

    async fn connect(&mut self) -> TailState {
        if self.cancel.is_cancelled() {
            return TailState::Stopped;
        }

        if resolve_containers(&self.store, &self.key.pod).is_none() {
            tracing::info!(
                container = %self.key,
                "ignoring container belonging to deleted pod"
            );
            return TailState::Stopped;
        }

        let request = LogRequest::follow(&self.key.container, self.since);
        let opened = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return TailState::Stopped,
            opened = self.inner.cluster.open_log_stream(
                self.key.namespace(),
                self.key.pod_name(),
                &request,
            ) => opened,
        };

        match opened {
            Ok(stream) => TailState::Streaming(stream),
            Err(e) if e.is_throttled() => {
                tracing::warn!(
                    container = %self.key,
                    "got throttled by apiserver while opening log stream"
                );
                self.pause(TailState::Starting).await
            }
            // The snapshot decides on the next attempt whether the pod is gone
            Err(e) if e.is_not_found() => {
                tracing::debug!(container = %self.key, error = %e, "log stream not found");
                self.pause(TailState::Starting).await
            }
            Err(e) => {
                tracing::warn!(container = %self.key, error = %e, "could not tail container");
                self.pause(TailState::Starting).await
            }
        }
    }

    async fn stream(&mut self, mut stream: LogStream) -> TailState {
        let mut buf: Vec<u8> = Vec::with_capacity(8 * 1024);

        loop {
            buf.clear();

            let read = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return self.stopped(),
                read = stream.read_until(b'\n', &mut buf) => read,
            };

            match read {
                Ok(0) => {
                    tracing::debug!(container = %self.key, "end of tail for container");
                    return TailState::Draining;
                }
                Ok(_) => {
                    let line = trim_newline(&buf);
                    if line.is_empty() {
                        continue;
                    }

                    let record = LogRecord::container(&self.key, line.to_vec());
                    tokio::select! {
                        biased;
                        _ = self.cancel.cancelled() => return self.stopped(),
                        sent = self.inner.log_tx.send(record) => {
                            if sent.is_err() {
                                tracing::debug!(container = %self.key, "log consumer gone");
                                return TailState::Stopped;
                            }
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!(container = %self.key, error = %e, "error tailing container");
                    return TailState::Draining;
                }
            }
        }
    }

    async fn drain(&mut self) -> TailState {
        self.advance_bookmark(Utc::now());
        self.pause(TailState::Starting).await
    }

    /// Move the bookmark forward; it never moves back
    fn advance_bookmark(&mut self, now: DateTime<Utc>) {
        self.since = self.since.max(now);
    }

    /// Sleep for the retry interval, or stop early on cancellation
    async fn pause(&self, next: TailState) -> TailState {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => TailState::Stopped,
            _ = tokio::time::sleep(self.inner.settings.retry_interval) => next,
        }
    }

    fn stopped(&self) -> TailState {
        tracing::info!(container = %self.key, "stopped tailing");
        TailState::Stopped
    }
}

fn trim_newline(bytes: &[u8]) -> &[u8] {
    let mut end = bytes.len();
    while end > 0 && (bytes[end - 1] == b'\n' || bytes[end - 1] == b'\r') {
        end -= 1;
    }
    &bytes[..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trim_newline() {
        assert_eq!(trim_newline(b"hello\n"), b"hello");
        assert_eq!(trim_newline(b"hello\r\n"), b"hello");
        assert_eq!(trim_newline(b"\n"), b"");
        assert_eq!(trim_newline(b"no newline"), b"no newline");
    }
}
