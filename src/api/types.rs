use std::sync::Arc;

use crate::core_state::CoreState;

/// Shared handler state. Cloned per request; the core is read-only.
#[derive(Clone)]
pub struct ApiContext {
    pub core: Arc<CoreState>,
    pub max_upload_bytes: usize,
}

impl ApiContext {
    pub fn new(core: Arc<CoreState>, max_upload_bytes: usize) -> Self {
        Self {
            core,
            max_upload_bytes,
        }
    }
}
