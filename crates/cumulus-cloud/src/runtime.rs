//! Tokio runtime management for synchronous operations

use crate::{CloudError, Result};
use std::sync::{Arc, OnceLock};
use tokio::runtime::Runtime;

static RUNTIME: OnceLock<Arc<Runtime>> = OnceLock::new();

/// Get or create the runtime shared by every store in the process
///
/// Callers must not be running inside another Tokio runtime.
pub(crate) fn shared_runtime() -> Result<Arc<Runtime>> {
    if let Some(runtime) = RUNTIME.get() {
        return Ok(runtime.clone());
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .thread_name("cumulus-cloud-worker")
        .build()
        .map_err(|e| CloudError::Runtime(format!("Failed to create Tokio runtime: {}", e)))?;

    Ok(RUNTIME.get_or_init(|| Arc::new(runtime)).clone())
}
