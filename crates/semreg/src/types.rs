use chrono::{DateTime, Utc};

use crate::workflow::Workflow;

/// State shared by every request handler
pub struct AppState {
    pub workflow: Workflow,
    /// When the server started, reported by the health endpoint
    pub started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new(workflow: Workflow) -> Self {
        Self {
            workflow,
            started_at: Utc::now(),
        }
    }
}
