use std::sync::Arc;

use crate::complaints::store::ComplaintStore;
use crate::config::Config;
use crate::identity::IdentityResolver;
use crate::inference::Classifier;
use crate::notify::Notifier;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Complaint, message and admin-marker persistence. Postgres in production.
    pub store: Arc<dyn ComplaintStore>,
    /// Inference gateway. Always yields a prediction (fallback on failure).
    pub classifier: Arc<dyn Classifier>,
    pub identity: Arc<dyn IdentityResolver>,
    pub notifier: Arc<dyn Notifier>,
    pub config: Config,
}
