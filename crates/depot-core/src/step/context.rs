use std::sync::{Arc, OnceLock};

use depot_model::{PluginConfig, Repository};
use tokio_util::sync::CancellationToken;

use super::{Conduit, ProgressListener};

/// Values a step resolves through its ancestors.
///
/// Every lookup checks the local override first and falls back to the parent. Only a root
/// context is guaranteed to carry a repository, a conduit, a config and a cancellation token;
/// a child context that was never attached to a parent resolves nothing.
#[derive(Default)]
pub struct StepContext {
    parent: OnceLock<Arc<StepContext>>,
    is_root: bool,
    repo: Option<Arc<Repository>>,
    conduit: Option<Arc<dyn Conduit>>,
    config: Option<Arc<PluginConfig>>,
    plugin_type: Option<String>,
    listener: Option<Arc<dyn ProgressListener>>,
    cancel: Option<CancellationToken>,
}

impl StepContext {
    /// Context of a pipeline root. Creates the run's cancellation token.
    pub fn root(repo: Repository, conduit: Arc<dyn Conduit>, config: PluginConfig) -> Self {
        Self {
            is_root: true,
            repo: Some(Arc::new(repo)),
            conduit: Some(conduit),
            config: Some(Arc::new(config)),
            cancel: Some(CancellationToken::new()),
            ..Self::default()
        }
    }

    /// Context without local values; everything resolves through the parent once attached.
    pub fn child() -> Self {
        Self::default()
    }

    pub fn with_repo(mut self, repo: Repository) -> Self {
        self.repo = Some(Arc::new(repo));
        self
    }

    pub fn with_conduit(mut self, conduit: Arc<dyn Conduit>) -> Self {
        self.conduit = Some(conduit);
        self
    }

    pub fn with_config(mut self, config: PluginConfig) -> Self {
        self.config = Some(Arc::new(config));
        self
    }

    pub fn with_plugin_type(mut self, plugin_type: impl Into<String>) -> Self {
        self.plugin_type = Some(plugin_type.into());
        self
    }

    pub fn with_listener(mut self, listener: Arc<dyn ProgressListener>) -> Self {
        self.listener = Some(listener);
        self
    }

    pub fn is_root(&self) -> bool {
        self.is_root
    }

    pub fn is_attached(&self) -> bool {
        self.parent.get().is_some()
    }

    /// Set the parent. Returns `false` if a parent was already set.
    pub(crate) fn attach(&self, parent: Arc<StepContext>) -> bool {
        self.parent.set(parent).is_ok()
    }

    fn parent(&self) -> Option<&Arc<StepContext>> {
        self.parent.get()
    }

    pub fn repo(&self) -> Option<Arc<Repository>> {
        self.repo
            .clone()
            .or_else(|| self.parent().and_then(|p| p.repo()))
    }

    pub fn conduit(&self) -> Option<Arc<dyn Conduit>> {
        self.conduit
            .clone()
            .or_else(|| self.parent().and_then(|p| p.conduit()))
    }

    pub fn config(&self) -> Option<Arc<PluginConfig>> {
        self.config
            .clone()
            .or_else(|| self.parent().and_then(|p| p.config()))
    }

    pub fn plugin_type(&self) -> Option<String> {
        self.plugin_type
            .clone()
            .or_else(|| self.parent().and_then(|p| p.plugin_type()))
    }

    pub fn listener(&self) -> Option<Arc<dyn ProgressListener>> {
        self.listener
            .clone()
            .or_else(|| self.parent().and_then(|p| p.listener()))
    }

    pub fn cancel_token(&self) -> Option<CancellationToken> {
        self.cancel
            .clone()
            .or_else(|| self.parent().and_then(|p| p.cancel_token()))
    }

    /// `false` while detached.
    pub fn is_canceled(&self) -> bool {
        match &self.cancel {
            Some(token) => token.is_cancelled(),
            None => self.parent().is_some_and(|p| p.is_canceled()),
        }
    }
}

/// Clonable handle that cancels a running pipeline.
///
/// Cancellation is cooperative: steps observe it between children and between units.
#[derive(Debug, Clone)]
pub struct CancelHandle {
    token: CancellationToken,
}

impl CancelHandle {
    pub(crate) fn new(token: CancellationToken) -> Self {
        Self { token }
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_canceled(&self) -> bool {
        self.token.is_cancelled()
    }
}
