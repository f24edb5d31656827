use thiserror::Error;

/// A failed request against the control plane, classified by how the
/// tailer should react to it
#[derive(Debug, Error)]
pub enum ClusterError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("throttled by apiserver: {0}")]
    Throttled(String),

    #[error("transport error: {0}")]
    Transport(String),
}

impl ClusterError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    pub fn is_throttled(&self) -> bool {
        matches!(self, Self::Throttled(_))
    }
}

impl From<kube::Error> for ClusterError {
    fn from(err: kube::Error) -> Self {
        match &err {
            kube::Error::Api(resp) if resp.code == 404 => Self::NotFound(resp.message.clone()),
            kube::Error::Api(resp) if resp.code == 429 => Self::Throttled(resp.message.clone()),
            _ => Self::Transport(err.to_string()),
        }
    }
}
