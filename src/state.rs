// src/state.rs

use std::sync::Arc;

use axum::extract::FromRef;
use sqlx::PgPool;

use crate::{
    config::Config,
    live::hub::LiveHub,
    studio::generator::{ContentGenerator, LocalGenerator},
};

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Config,
    /// Connected sockets and in-flight live challenges.
    pub live: Arc<LiveHub>,
    /// Backend used by the content studio to turn material into study content.
    pub generator: Arc<dyn ContentGenerator>,
}

impl AppState {
    pub fn new(pool: PgPool, config: Config) -> Self {
        Self {
            pool,
            config,
            live: Arc::new(LiveHub::new()),
            generator: Arc::new(LocalGenerator::default()),
        }
    }
}

impl FromRef<AppState> for PgPool {
    fn from_ref(state: &AppState) -> Self {
        state.pool.clone()
    }
}

impl FromRef<AppState> for Config {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}

impl FromRef<AppState> for Arc<LiveHub> {
    fn from_ref(state: &AppState) -> Self {
        state.live.clone()
    }
}

impl FromRef<AppState> for Arc<dyn ContentGenerator> {
    fn from_ref(state: &AppState) -> Self {
        state.generator.clone()
    }
}
