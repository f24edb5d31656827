//! Shared types for axe
//!
//! This crate contains data structures used across multiple axe crates.

use std::borrow::Cow;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};

/// Source label used for records that axe emits about itself
pub const STATUS_SOURCE: &str = "axe";

// ============================================================================
// Resource Identity
// ============================================================================

/// Identity of a pod being tailed (`namespace/pod`)
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PodKey {
    pub namespace: String,
    pub name: String,
}

impl PodKey {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// Key of one container inside this pod
    pub fn container(&self, container: impl Into<String>) -> ContainerKey {
        ContainerKey {
            pod: self.clone(),
            container: container.into(),
        }
    }

    /// Whether this pod is scoped under the given namespace
    pub fn in_namespace(&self, namespace: &str) -> bool {
        self.namespace == namespace
    }
}

impl fmt::Display for PodKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// Identity of one container's tail worker (`namespace/pod/container`)
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContainerKey {
    pub pod: PodKey,
    pub container: String,
}

impl ContainerKey {
    pub fn namespace(&self) -> &str {
        &self.pod.namespace
    }

    pub fn pod_name(&self) -> &str {
        &self.pod.name
    }

    pub fn belongs_to(&self, pod: &PodKey) -> bool {
        &self.pod == pod
    }

    pub fn in_namespace(&self, namespace: &str) -> bool {
        self.pod.in_namespace(namespace)
    }
}

impl fmt::Display for ContainerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.pod, self.container)
    }
}

// ============================================================================
// Log Records
// ============================================================================

/// What produced a record on the output feed
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum RecordKind {
    /// Emitted by axe itself (watch registered, cache synced, ...)
    Status,
    /// One line read from a container's log stream
    Container { container: String },
}

/// One unit on the output feed
#[derive(Clone, Debug, Serialize)]
pub struct LogRecord {
    #[serde(flatten)]
    pub kind: RecordKind,

    pub namespace: String,

    /// Pod name; empty for status records
    pub pod: String,

    /// Raw payload, without the trailing newline
    #[serde(rename = "message", serialize_with = "lossy_utf8")]
    pub payload: Vec<u8>,

    /// When axe received the record (not the container's own timestamp)
    pub received_at: DateTime<Utc>,
}

impl LogRecord {
    /// Create a status record about a namespace
    pub fn status(namespace: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: RecordKind::Status,
            namespace: namespace.into(),
            pod: String::new(),
            payload: message.into().into_bytes(),
            received_at: Utc::now(),
        }
    }

    /// Create a record carrying one line of container output
    pub fn container(key: &ContainerKey, payload: Vec<u8>) -> Self {
        Self {
            kind: RecordKind::Container {
                container: key.container.clone(),
            },
            namespace: key.namespace().to_string(),
            pod: key.pod_name().to_string(),
            payload,
            received_at: Utc::now(),
        }
    }

    pub fn is_status(&self) -> bool {
        matches!(self.kind, RecordKind::Status)
    }

    pub fn container_name(&self) -> Option<&str> {
        match &self.kind {
            RecordKind::Container { container } => Some(container),
            RecordKind::Status => None,
        }
    }

    /// Payload as text, replacing invalid UTF-8
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.payload)
    }

    /// Short source label: `pod/container`, or `axe` for status records
    pub fn source(&self) -> Cow<'_, str> {
        match &self.kind {
            RecordKind::Status => Cow::Borrowed(STATUS_SOURCE),
            RecordKind::Container { container } => {
                Cow::Owned(format!("{}/{}", self.pod, container))
            }
        }
    }

    /// Line as shown in the pager: `source] text`
    pub fn display_line(&self) -> String {
        format!("{}] {}", self.source(), self.text())
    }

    /// Payload size in bytes
    pub fn payload_len(&self) -> usize {
        self.payload.len()
    }
}

fn lossy_utf8<S: Serializer>(payload: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&String::from_utf8_lossy(payload))
}

// ============================================================================
// Display Status
// ============================================================================

/// Overall state shown in the status bar
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum TailStatus {
    /// Waiting for the initial pod snapshots
    #[default]
    Syncing,
    /// Snapshots loaded; tailers are running
    Tailing,
    /// The manager failed to start
    Error,
}

impl TailStatus {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Syncing => "SYNCING",
            Self::Tailing => "TAILING",
            Self::Error => "ERROR",
        }
    }
}

impl fmt::Display for TailStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
