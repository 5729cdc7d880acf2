use std::sync::Arc;

use anyhow::{anyhow, Result};
use arena_llm::ProviderAdapter;
use arena_persist::{KeyValueStore, Workspace};

use crate::dispatcher::Dispatcher;

/// Builder for constructing a Dispatcher with optional components
pub struct DispatcherBuilder {
    adapter: Option<Arc<dyn ProviderAdapter>>,
    workspace: Workspace,
    store: Option<Arc<dyn KeyValueStore>>,
}

impl DispatcherBuilder {
    pub fn new() -> Self {
        Self {
            adapter: None,
            workspace: Workspace::new(),
            store: None,
        }
    }

    /// Set the adapter every call goes through
    pub fn adapter(mut self, adapter: Arc<dyn ProviderAdapter>) -> Self {
        self.adapter = Some(adapter);
        self
    }

    /// Start from an existing workspace (e.g. one loaded at startup)
    pub fn workspace(mut self, workspace: Workspace) -> Self {
        self.workspace = workspace;
        self
    }

    /// Write the workspace through to `store` after every mutation
    pub fn with_persistence(mut self, store: Arc<dyn KeyValueStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn build(self) -> Result<Dispatcher> {
        let adapter = self
            .adapter
            .ok_or_else(|| anyhow!("Provider adapter is required"))?;

        Ok(Dispatcher::new(adapter, self.workspace, self.store))
    }
}

impl Default for DispatcherBuilder {
    fn default() -> Self {
        Self::new()
    }
}
