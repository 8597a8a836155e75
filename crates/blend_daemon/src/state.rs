use blend_core::BlendSession;
use parking_lot::Mutex;
use std::sync::Arc;

pub type SharedSession = Arc<Mutex<BlendSession>>;

#[derive(Clone)]
pub struct AppState {
    pub session: SharedSession,
    /// Normalized mount point: empty for root, else `/segment` without a trailing slash.
    pub base_path: String,
}

impl AppState {
    pub fn new(session: BlendSession, base_path: &str) -> Self {
        Self {
            session: Arc::new(Mutex::new(session)),
            base_path: normalize_base_path(base_path),
        }
    }
}

/// `"/craze-blend-ratio/"` -> `"/craze-blend-ratio"`, `"/"` or `""` -> `""`.
pub fn normalize_base_path(raw: &str) -> String {
    let trimmed = raw.trim().trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{trimmed}")
    }
}
