use tokio_util::sync::CancellationToken;

/// Why we are shutting down
#[derive(Debug, Clone, Copy)]
pub enum ShutdownReason {
    CtrlC,
    Sigterm,
}

/// Cancel `token` on Ctrl+C or SIGTERM. Returns early if the token is
/// cancelled some other way.
pub async fn watch_signals(token: CancellationToken) {
    let reason = tokio::select! {
        _ = token.cancelled() => return,
        _ = tokio::signal::ctrl_c() => ShutdownReason::CtrlC,
        _ = sigterm() => ShutdownReason::Sigterm,
    };

    tracing::info!(?reason, "shutting down");
    token.cancel();
}

/// Wait for SIGTERM on Unix. On other platforms this never completes.
#[cfg(unix)]
async fn sigterm() {
    use tokio::signal::unix::{SignalKind, signal};

    match signal(SignalKind::terminate()) {
        Ok(mut sig) => {
            sig.recv().await;
        }
        // If we can't register, just never fire
        Err(_) => std::future::pending().await,
    }
}

#[cfg(not(unix))]
async fn sigterm() {
    std::future::pending::<()>().await
}
