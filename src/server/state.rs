use std::sync::Arc;
use std::time::Instant;

use crate::batch::BatchRegistry;
use crate::config::Settings;
use crate::proxy::{ProxyError, ProxyInvoke, ReqwestProxy};
use crate::workspace::WorkspaceStore;

#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub proxy: Arc<dyn ProxyInvoke>,
    pub workspaces: Arc<WorkspaceStore>,
    pub batches: Arc<BatchRegistry>,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(settings: Settings) -> Result<Self, ProxyError> {
        let proxy = Arc::new(ReqwestProxy::new(&settings.proxy)?);
        Ok(Self::with_proxy(settings, proxy))
    }

    /// State backed by a caller-supplied proxy
    pub fn with_proxy(settings: Settings, proxy: Arc<dyn ProxyInvoke>) -> Self {
        Self {
            settings: Arc::new(settings),
            proxy,
            workspaces: Arc::new(WorkspaceStore::new()),
            batches: Arc::new(BatchRegistry::new()),
            start_time: Instant::now(),
        }
    }
}
