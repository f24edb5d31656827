use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use axe_types::{ContainerKey, PodKey};

use crate::watch::NamespaceWatch;

/// Cancellation handle of a running worker, tagged with the generation
/// that registered it
#[derive(Clone, Debug)]
pub(crate) struct Handle {
    pub generation: u64,
    pub cancel: CancellationToken,
}

/// Runtime state of one container tail worker. Entries are never
/// removed, only toggled, so the map doubles as start history.
#[derive(Debug)]
pub(crate) struct ContainerTailState {
    pub live: bool,
    pub generation: u64,
    pub cancel: Option<CancellationToken>,
}

/// All mutable bookkeeping of the manager. Every access goes through the
/// one `Mutex` in `SharedRegistry`; nothing here performs I/O.
#[derive(Default)]
pub(crate) struct Registry {
    pub namespaces: HashMap<String, NamespaceWatch>,
    pub pods: HashMap<PodKey, Handle>,
    pub containers: HashMap<ContainerKey, ContainerTailState>,

    /// Set once `Manager::run` has started delivery
    pub run_token: Option<CancellationToken>,

    next_generation: u64,
}

pub(crate) type SharedRegistry = Arc<Mutex<Registry>>;

impl Registry {
    fn next_generation(&mut self) -> u64 {
        self.next_generation += 1;
        self.next_generation
    }

    /// Register a pod supervisor with a fresh, unparented cancellation
    /// scope. Returns `None` if one is already registered.
    pub fn register_pod(&mut self, key: &PodKey) -> Option<Handle> {
        if self.pods.contains_key(key) {
            return None;
        }

        let handle = Handle {
            generation: self.next_generation(),
            cancel: CancellationToken::new(),
        };
        self.pods.insert(key.clone(), handle.clone());
        Some(handle)
    }

    /// Drop a supervisor's entry once it has finished, unless it has
    /// already been replaced.
    pub fn release_pod(&mut self, key: &PodKey, generation: u64) {
        if self.pods.get(key).is_some_and(|h| h.generation == generation) {
            self.pods.remove(key);
        }
    }

    /// Cancel a pod supervisor and the tailers it started.
    /// Returns whether a supervisor was registered.
    pub fn cancel_pod(&mut self, key: &PodKey) -> bool {
        let found = match self.pods.remove(key) {
            Some(handle) => {
                handle.cancel.cancel();
                true
            }
            None => false,
        };

        for (_, state) in self.containers.iter_mut().filter(|(k, _)| k.belongs_to(key)) {
            if let Some(cancel) = state.cancel.take() {
                cancel.cancel();
            }
        }

        found
    }

    /// Cancel every pod and container worker scoped under a namespace.
    /// Returns the pods that were stopped.
    pub fn sweep_namespace(&mut self, namespace: &str) -> Vec<PodKey> {
        let mut stopped: Vec<PodKey> = self
            .pods
            .keys()
            .filter(|k| k.in_namespace(namespace))
            .cloned()
            .collect();
        stopped.sort();

        for key in &stopped {
            if let Some(handle) = self.pods.remove(key) {
                handle.cancel.cancel();
            }
        }

        for (_, state) in self
            .containers
            .iter_mut()
            .filter(|(k, _)| k.in_namespace(namespace))
        {
            if let Some(cancel) = state.cancel.take() {
                cancel.cancel();
            }
        }

        stopped
    }

    /// Register a container tailer under its pod's cancellation scope.
    /// Returns `None` if a tailer already holds a handle for this key.
    pub fn register_container(
        &mut self,
        key: &ContainerKey,
        parent: &CancellationToken,
    ) -> Option<Handle> {
        if self
            .containers
            .get(key)
            .is_some_and(|state| state.cancel.is_some())
        {
            return None;
        }

        let handle = Handle {
            generation: self.next_generation(),
            cancel: parent.child_token(),
        };
        self.containers.insert(
            key.clone(),
            ContainerTailState {
                live: true,
                generation: handle.generation,
                cancel: Some(handle.cancel.clone()),
            },
        );
        Some(handle)
    }

    /// Mark a tailer as exited. A newer tailer for the same key is left alone.
    pub fn release_container(&mut self, key: &ContainerKey, generation: u64) {
        if let Some(state) = self.containers.get_mut(key) {
            if state.generation == generation {
                state.live = false;
                state.cancel = None;
            }
        }
    }

    /// `(live, total ever started)`
    pub fn container_counts(&self) -> (usize, usize) {
        let live = self.containers.values().filter(|s| s.live).count();
        (live, self.containers.len())
    }

    /// Number of cancellation handles still registered under a namespace
    #[cfg(test)]
    pub fn handles_in_namespace(&self, namespace: &str) -> usize {
        let pods = self.pods.keys().filter(|k| k.in_namespace(namespace)).count();
        let containers = self
            .containers
            .iter()
            .filter(|(k, s)| k.in_namespace(namespace) && s.cancel.is_some())
            .count();
        pods + containers
    }
}

/// Releases a tailer's registry entry when the worker exits, however it exits
pub(crate) struct LivenessGuard {
    registry: SharedRegistry,
    key: ContainerKey,
    generation: u64,
}

impl LivenessGuard {
    pub fn new(registry: SharedRegistry, key: ContainerKey, generation: u64) -> Self {
        Self {
            registry,
            key,
            generation,
        }
    }
}

impl Drop for LivenessGuard {
    fn drop(&mut self) {
        self.registry
            .lock()
            .release_container(&self.key, self.generation);
    }
}
