// src/state.rs

use crate::config::Config;
use axum::extract::FromRef;
use sqlx::PgPool;

/// Shared state handed to every request handler.
///
/// The service is stateless between requests: all assessment, submission
/// and grading data lives behind the pool, and `config` carries the JWT
/// signing material the auth middleware needs. Handlers extract whichever
/// half they use via the `FromRef` impls below.
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Config,
}

/// Lets handlers that only touch the store take `State<PgPool>` directly.
impl FromRef<AppState> for PgPool {
    fn from_ref(state: &AppState) -> Self {
        state.pool.clone()
    }
}

/// Lets the auth paths take `State<Config>` for token signing/verification.
impl FromRef<AppState> for Config {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}
