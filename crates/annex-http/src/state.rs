//! Shared handler state.

use crate::error::{ApiError, ApiResult};
use annex_store::{ResourceNamespace, Store};
use std::sync::Arc;
use tracing::{error, warn};

/// State shared by the handlers of one service
pub struct AppState {
    pub store: Arc<Store>,
    pub namespace: ResourceNamespace,
}

impl AppState {
    pub fn new(store: Arc<Store>) -> Self {
        let namespace = ResourceNamespace::new(store.clone());
        Self { store, namespace }
    }

    /// Reject requests for resource types that were never provisioned.
    ///
    /// `label` names the attachment in the error, e.g. "rateable".
    pub async fn require_type(&self, label: &str, kind: &str) -> ApiResult<()> {
        let namespace = self.namespace.clone();
        let name = kind.to_string();
        if blocking(move || namespace.exists(&name)).await? {
            return Ok(());
        }
        warn!(kind = %kind, "Unknown {} type", label);
        Err(ApiError::not_acceptable(format!(
            "{label} type, {kind}, not found"
        )))
    }
}

/// Run store work on the blocking pool.
pub async fn blocking<T, F>(f: F) -> ApiResult<T>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f).await.map_err(|e| {
        error!("Store task failed: {}", e);
        ApiError::internal("request could not be completed")
    })
}
