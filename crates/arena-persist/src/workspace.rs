use arena_llm::ModelConfig;
use serde_json::Value;

use crate::error::{PersistError, Result};
use crate::kv::{KeyValueStore, CONVERSATIONS_KEY, MODELS_KEY};
use crate::models::Conversation;
use crate::store::ConversationStore;

const INTERRUPTED: &str = "Request interrupted before completion";

/// Application state: the ordered model list and one conversation per model
///
/// This is the only owner of `ModelConfig`s. Saving or deleting a model keeps
/// its conversation in step, so every model has exactly one conversation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Workspace {
    models: Vec<ModelConfig>,
    conversations: ConversationStore,
}

impl Workspace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn models(&self) -> &[ModelConfig] {
        &self.models
    }

    pub fn model(&self, id: &str) -> Option<&ModelConfig> {
        self.models.iter().find(|m| m.id == id)
    }

    pub fn conversations(&self) -> &ConversationStore {
        &self.conversations
    }

    pub fn conversations_mut(&mut self) -> &mut ConversationStore {
        &mut self.conversations
    }

    /// Insert or update a model
    ///
    /// Invalid configs are rejected before anything changes. An existing id is
    /// updated in place and keeps its conversation.
    pub fn save_model(&mut self, config: ModelConfig) -> Result<&ModelConfig> {
        config.validate()?;

        let id = config.id.clone();
        let index = match self.models.iter().position(|m| m.id == id) {
            Some(index) => {
                self.models[index] = config;
                tracing::info!(model_id = %id, "Model updated");
                index
            }
            None => {
                self.models.push(config);
                tracing::info!(model_id = %id, "Model added");
                self.models.len() - 1
            }
        };
        self.conversations.create_for(&id);

        Ok(&self.models[index])
    }

    /// Remove a model and its conversation
    pub fn delete_model(&mut self, id: &str) -> Result<ModelConfig> {
        let index = self
            .models
            .iter()
            .position(|m| m.id == id)
            .ok_or_else(|| PersistError::ModelNotFound(id.to_string()))?;

        let removed = self.models.remove(index);
        self.conversations.remove_for(id);
        tracing::info!(model_id = %id, "Model deleted");
        Ok(removed)
    }

    /// Move the model at `from` to position `to` in the display order
    pub fn move_model(&mut self, from: usize, to: usize) -> Result<()> {
        let len = self.models.len();
        if from >= len || to >= len {
            return Err(PersistError::ModelNotFound(format!("position {}", from.max(to))));
        }
        let model = self.models.remove(from);
        self.models.insert(to, model);
        Ok(())
    }

    pub fn clear_conversation(&mut self, id: &str) -> Result<()> {
        if self.conversations.clear(id) {
            Ok(())
        } else {
            Err(PersistError::ConversationNotFound(id.to_string()))
        }
    }

    /// Empty every conversation; the model list is untouched
    pub fn clear_all_conversations(&mut self) {
        self.conversations.clear_all();
        tracing::info!("All conversations cleared");
    }

    /// Read state saved by `save`
    ///
    /// Missing conversations are created, orphans dropped, and placeholders
    /// left over from an interrupted run are marked as errors.
    pub async fn load(store: &dyn KeyValueStore) -> Result<Self> {
        let models: Vec<ModelConfig> = match store.get(MODELS_KEY).await? {
            Some(value) => serde_json::from_value(value)?,
            None => Vec::new(),
        };
        let conversations: Vec<Conversation> = match store.get(CONVERSATIONS_KEY).await? {
            Some(value) => serde_json::from_value(value)?,
            None => Vec::new(),
        };

        let mut workspace = Self {
            models,
            conversations: ConversationStore::from_conversations(conversations),
        };
        workspace.repair();

        tracing::info!(models = workspace.models.len(), "Workspace loaded");
        Ok(workspace)
    }

    pub async fn save(&self, store: &dyn KeyValueStore) -> Result<()> {
        let (models, conversations) = self.snapshot()?;
        store.set(MODELS_KEY, models).await?;
        store.set(CONVERSATIONS_KEY, conversations).await?;
        Ok(())
    }

    /// Serialized form of both keys, taken at one instant
    pub fn snapshot(&self) -> Result<(Value, Value)> {
        Ok((
            serde_json::to_value(&self.models)?,
            serde_json::to_value(&self.conversations)?,
        ))
    }

    fn repair(&mut self) {
        let ids: Vec<String> = self.models.iter().map(|m| m.id.clone()).collect();
        for id in &ids {
            self.conversations.create_for(id);
        }
        self.conversations.retain(|id| ids.iter().any(|m| m == id));

        let stale = self.conversations.fail_stale_placeholders(INTERRUPTED);
        if stale > 0 {
            tracing::warn!(count = stale, "Marked interrupted replies as failed");
        }
    }
}
