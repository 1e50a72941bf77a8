use crate::bus::BusTransport;
use crate::session::{AdminSession, ViewerSession};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Shared application state for HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// The single broadcasting session
    pub admin: Arc<AdminSession>,

    /// Transport new viewers join through
    pub transport: Arc<dyn BusTransport>,

    /// Broadcast topic viewers join
    pub topic: String,

    /// Connected viewers (viewer_id → session)
    pub viewers: Arc<RwLock<HashMap<String, Arc<ViewerSession>>>>,
}

impl AppState {
    pub fn new(admin: Arc<AdminSession>, transport: Arc<dyn BusTransport>, topic: &str) -> Self {
        Self {
            admin,
            transport,
            topic: topic.to_string(),
            viewers: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub async fn viewer(&self, viewer_id: &str) -> Option<Arc<ViewerSession>> {
        self.viewers.read().await.get(viewer_id).cloned()
    }
}
