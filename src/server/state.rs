use axum::extract::FromRef;

use crate::portal::Portal;
use std::sync::Arc;
use std::time::Instant;

use super::ServerConfig;

pub type GuardedPortal = Arc<Portal>;

#[derive(Clone)]
pub struct ServerState {
    pub config: ServerConfig,
    pub start_time: Instant,
    pub portal: GuardedPortal,
    pub hash: String,
}

impl ServerState {
    pub fn new(config: ServerConfig, portal: GuardedPortal) -> ServerState {
        ServerState {
            config,
            start_time: Instant::now(),
            portal,
            hash: env!("GIT_HASH").to_owned(),
        }
    }
}

impl FromRef<ServerState> for GuardedPortal {
    fn from_ref(input: &ServerState) -> Self {
        input.portal.clone()
    }
}

impl FromRef<ServerState> for ServerConfig {
    fn from_ref(input: &ServerState) -> Self {
        input.config.clone()
    }
}
