use axum::extract::FromRef;

use crate::entity_store::EntityStore;
use crate::sync::SyncEngine;
use std::sync::Arc;
use std::time::Instant;

use super::ServerConfig;

pub type GuardedSyncEngine = Arc<SyncEngine>;
pub type GuardedEntityStore = Arc<dyn EntityStore>;

#[derive(Clone)]
pub struct ServerState {
    pub config: ServerConfig,
    pub start_time: Instant,
    pub sync_engine: GuardedSyncEngine,
    pub entity_store: GuardedEntityStore,
}

impl FromRef<ServerState> for GuardedSyncEngine {
    fn from_ref(input: &ServerState) -> Self {
        input.sync_engine.clone()
    }
}

impl FromRef<ServerState> for GuardedEntityStore {
    fn from_ref(input: &ServerState) -> Self {
        input.entity_store.clone()
    }
}

impl FromRef<ServerState> for ServerConfig {
    fn from_ref(input: &ServerState) -> Self {
        input.config.clone()
    }
}
