use crate::db_types::CallerProfile;
use crate::storage::ProfileStore;

use std::sync::Arc;
use tracing::{debug, warn};

/// Recognizes returning callers by phone number.  Read-only; a failed lookup is treated as a new
/// caller so the conversation can still go the long way round.
#[derive(Clone)]
pub struct CallerProfileResolver {
    store: Arc<dyn ProfileStore>,
}

impl CallerProfileResolver {
    pub fn new(store: Arc<dyn ProfileStore>) -> Self {
        Self { store }
    }

    pub async fn resolve(&self, phone: &str) -> Option<CallerProfile> {
        match self.store.find_profile(phone).await {
            Ok(Some(profile)) => {
                debug!(phone=%phone, "recognized returning caller");
                Some(profile)
            }
            Ok(None) => None,
            Err(e) => {
                warn!(error=%e, phone=%phone, "caller profile lookup failed, treating as new caller");
                None
            }
        }
    }
}
