pub mod app;
pub mod config;
pub mod domain;
pub mod http;
pub mod infra;
pub mod jobs;

use crate::infra::{db::Db, queue::JobQueue};

#[derive(Clone)]
pub struct AppState {
    pub db: Db,
    pub jobs: JobQueue,
    pub paseto_key: [u8; 32],
    pub token_ttl_minutes: u64,
    pub make_admin_enabled: bool,
}
