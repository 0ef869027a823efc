use std::sync::Arc;

use crate::db::{DbPool, OrmConn};
use crate::dispatch::Dispatcher;
use crate::notify::Notifier;
use crate::rate_limit::RateLimiter;
use crate::storage::ProofImageStore;

#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub orm: OrmConn,
    pub notifier: Notifier,
    pub dispatcher: Dispatcher,
    /// Per-IP limiter for the public proof-upload endpoint, injected here
    /// rather than living as ambient global state.
    pub upload_limiter: Arc<RateLimiter>,
    pub images: Arc<dyn ProofImageStore>,
}
