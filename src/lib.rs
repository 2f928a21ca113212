use std::sync::Arc;

use config::Config;
use stats::{IdentityStore, StatsCache};

pub mod cache;
pub mod config;
pub mod database;
pub mod error;
pub mod fetchers;
pub mod middleware;
pub mod router;
pub mod routes;
pub mod stats;
pub mod utils;

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub stats: Arc<StatsCache>,
    pub identities: Arc<dyn IdentityStore>,
}
