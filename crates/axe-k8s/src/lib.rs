//! Kubernetes client for axe
//!
//! This crate is the seam between the tailing core and the cluster: it
//! provides pod change notifications per namespace and follow-mode log
//! streams, plus the kubeconfig-backed implementation.

mod client;
mod cluster;
mod error;

pub use client::KubeCluster;
pub use cluster::{Cluster, LogRequest, LogStream, PodEventStream};
pub use error::ClusterError;

// Re-export types that are used in our public API
pub use k8s_openapi::api::core::v1::Pod;
