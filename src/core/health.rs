use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthStatus {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub started_at: DateTime<Utc>,
    pub components: ComponentHealth,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentHealth {
    pub openai_api: bool,
}

#[derive(Clone)]
pub struct HealthChecker {
    start_time: std::time::Instant,
    started_at: DateTime<Utc>,
    status: Arc<RwLock<ComponentHealth>>,
}

impl HealthChecker {
    pub fn new() -> Self {
        Self {
            start_time: std::time::Instant::now(),
            started_at: Utc::now(),
            // Upstream is assumed reachable until a call says otherwise.
            status: Arc::new(RwLock::new(ComponentHealth { openai_api: true })),
        }
    }

    pub async fn get_status(&self) -> HealthStatus {
        let components = self.status.read().await.clone();
        let healthy = components.openai_api;

        HealthStatus {
            status: if healthy {
                "healthy".to_string()
            } else {
                "degraded".to_string()
            },
            version: env!("CARGO_PKG_VERSION").to_string(),
            uptime_seconds: self.start_time.elapsed().as_secs(),
            started_at: self.started_at,
            components,
        }
    }

    /// Outcome of the latest OpenAI call.
    pub async fn set_openai_api(&self, healthy: bool) {
        self.status.write().await.openai_api = healthy;
    }
}

impl Default for HealthChecker {
    fn default() -> Self {
        Self::new()
    }
}
