use std::sync::Arc;

use crate::config::Config;
use crate::rate_limit::LoginRateLimiter;
use crate::storage::{CredentialStore, ResponseStore};

pub type SharedState = Arc<AppState>;

pub struct AppState {
    pub responses: Arc<dyn ResponseStore>,
    pub credentials: Arc<dyn CredentialStore>,
    pub config: Config,
    pub login_limiter: LoginRateLimiter,
}
