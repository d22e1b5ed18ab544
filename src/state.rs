use std::sync::Arc;
use std::time::{Instant, SystemTime};

use crate::graph::derivation::{HeuristicDerivation, ProfileDerivation, SharedDerivation};
use crate::graph::GraphStore;
use crate::store::Store;

#[derive(Clone)]
pub struct AppState {
    started_at: Instant,
    started_at_system: SystemTime,
    graph: GraphStore,
    derivation: SharedDerivation,
}

impl AppState {
    pub fn new(store: Store, derivation: SharedDerivation) -> Self {
        Self {
            started_at: Instant::now(),
            started_at_system: SystemTime::now(),
            graph: GraphStore::new(store),
            derivation,
        }
    }

    pub fn with_heuristics(store: Store) -> Self {
        Self::new(store, Arc::new(HeuristicDerivation))
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }

    pub fn started_at_system(&self) -> SystemTime {
        self.started_at_system
    }

    pub fn graph(&self) -> &GraphStore {
        &self.graph
    }

    pub fn derivation(&self) -> &dyn ProfileDerivation {
        self.derivation.as_ref()
    }
}
