use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use arena_llm::{ModelConfig, ProviderAdapter};
use arena_persist::{KeyValueStore, PendingTurn, Workspace, CONVERSATIONS_KEY, MODELS_KEY};
use futures::future::join_all;
use tokio::sync::Mutex;

use crate::report::{DispatchReport, ModelOutcome};

/// Fans a prompt out to every configured model
///
/// All calls run as futures joined on the caller's task: the workspace is only
/// touched between suspension points, never while a call is in flight. A
/// failing model turns into an error message in its own conversation and
/// nothing else.
pub struct Dispatcher {
    adapter: Arc<dyn ProviderAdapter>,
    workspace: Arc<Mutex<Workspace>>,
    store: Option<Arc<dyn KeyValueStore>>,
    persist_lock: Mutex<()>,
    running: AtomicBool,
    draft: Mutex<String>,
    last_prompt: Mutex<Option<String>>,
}

impl Dispatcher {
    pub(crate) fn new(
        adapter: Arc<dyn ProviderAdapter>,
        workspace: Workspace,
        store: Option<Arc<dyn KeyValueStore>>,
    ) -> Self {
        Self {
            adapter,
            workspace: Arc::new(Mutex::new(workspace)),
            store,
            persist_lock: Mutex::new(()),
            running: AtomicBool::new(false),
            draft: Mutex::new(String::new()),
            last_prompt: Mutex::new(None),
        }
    }

    /// Create a builder for fluent construction
    pub fn builder() -> crate::builder::DispatcherBuilder {
        crate::builder::DispatcherBuilder::new()
    }

    pub fn workspace(&self) -> Arc<Mutex<Workspace>> {
        Arc::clone(&self.workspace)
    }

    /// True while a broadcast is in flight; further sends are ignored
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Apply a mutation to the workspace, then write it through
    pub async fn update<T>(&self, f: impl FnOnce(&mut Workspace) -> T) -> T {
        let result = f(&mut *self.workspace.lock().await);
        self.persist().await;
        result
    }

    pub async fn set_draft(&self, text: impl Into<String>) {
        *self.draft.lock().await = text.into();
    }

    pub async fn draft(&self) -> String {
        self.draft.lock().await.clone()
    }

    /// The prompt a retry would resend
    pub async fn last_prompt(&self) -> Option<String> {
        self.last_prompt.lock().await.clone()
    }

    /// Take the draft, clear it, and broadcast it
    ///
    /// The draft is only cleared once a broadcast has actually started; a
    /// submit that turns out to be a no-op leaves it in place.
    pub async fn submit(&self) -> Option<DispatchReport> {
        let mut draft = self.draft.lock().await;
        let broadcast = self.prepare(&draft).await?;
        draft.clear();
        drop(draft);

        Some(self.run(broadcast).await)
    }

    /// Broadcast `prompt` to every configured model and wait for all of them
    ///
    /// A no-op (returning `None`) when the prompt is blank, no model is
    /// configured, or another broadcast is still running.
    pub async fn send_to_all(&self, prompt: &str) -> Option<DispatchReport> {
        let broadcast = self.prepare(prompt).await?;
        Some(self.run(broadcast).await)
    }

    /// Check that a broadcast can run and claim the running flag
    async fn prepare(&self, prompt: &str) -> Option<Broadcast<'_>> {
        let prompt = prompt.trim();
        if prompt.is_empty() {
            return None;
        }

        let models = self.workspace.lock().await.models().to_vec();
        if models.is_empty() {
            return None;
        }

        let Some(running) = RunningGuard::acquire(&self.running) else {
            tracing::debug!("Dispatch already running, ignoring send");
            return None;
        };

        Some(Broadcast {
            _running: running,
            prompt: prompt.to_string(),
            models,
        })
    }

    async fn run(&self, broadcast: Broadcast<'_>) -> DispatchReport {
        let Broadcast { prompt, models, .. } = &broadcast;

        *self.last_prompt.lock().await = Some(prompt.clone());
        let started = Instant::now();
        tracing::info!(models = models.len(), "Dispatching prompt");

        let turns = {
            let mut workspace = self.workspace.lock().await;
            models
                .iter()
                .filter_map(|model| begin_turn(&mut workspace, model, prompt).map(|t| (model, t)))
                .collect::<Vec<_>>()
        };
        self.persist().await;

        let outcomes = join_all(turns.into_iter().map(|(model, turn)| self.settle(model, turn))).await;

        let report = DispatchReport {
            prompt: prompt.clone(),
            outcomes,
            elapsed_ms: elapsed_ms(started),
        };
        tracing::info!(
            succeeded = report.succeeded(),
            failed = report.failed(),
            duration_ms = report.elapsed_ms,
            "Dispatch settled"
        );

        report
    }

    /// Re-send the last prompt to a single model
    ///
    /// Without a prompt from this process, the model's most recent persisted
    /// user turn is resent. Returns `None` when there is nothing to resend or
    /// the model is unknown.
    pub async fn retry_model(&self, model_id: &str) -> Option<ModelOutcome> {
        let remembered = self.last_prompt.lock().await.clone();
        let (model, prompt) = {
            let workspace = self.workspace.lock().await;
            let model = workspace.model(model_id).cloned()?;
            let prompt = remembered.or_else(|| {
                workspace
                    .conversations()
                    .last_user_prompt(model_id)
                    .map(str::to_string)
            })?;
            (model, prompt)
        };

        tracing::info!(model_id, "Retrying model");

        let turn = begin_turn(&mut *self.workspace.lock().await, &model, &prompt)?;
        self.persist().await;

        Some(self.settle(&model, turn).await)
    }

    /// Run one provider call and write its terminal message over the placeholder
    async fn settle(&self, model: &ModelConfig, turn: PendingTurn) -> ModelOutcome {
        let started = Instant::now();
        let result = self.adapter.invoke(model, &turn.context).await;
        let response_time = elapsed_ms(started);

        let message = match result {
            Ok(completion) => {
                tracing::info!(
                    model_id = %model.id,
                    provider = %model.provider,
                    duration_ms = response_time,
                    tokens = ?completion.token_count,
                    "Model responded"
                );
                turn.placeholder.succeeded(completion, response_time)
            }
            Err(e) => {
                tracing::warn!(
                    model_id = %model.id,
                    provider = %model.provider,
                    duration_ms = response_time,
                    error = %e,
                    "Model call failed"
                );
                turn.placeholder.failed(e.to_string())
            }
        };

        let landed = self
            .workspace
            .lock()
            .await
            .conversations_mut()
            .finish_turn(&turn, message.clone());
        if landed {
            self.persist().await;
        } else {
            tracing::debug!(model_id = %model.id, "Placeholder no longer present, result dropped");
        }

        ModelOutcome {
            model_id: model.id.clone(),
            model_name: model.name.clone(),
            message,
        }
    }

    /// Write the current workspace to the attached store, if any
    ///
    /// Snapshots are taken and written under one lock so writes land in the
    /// order the snapshots were taken. Failures are logged only.
    async fn persist(&self) {
        let Some(store) = &self.store else {
            return;
        };
        let _guard = self.persist_lock.lock().await;

        let snapshot = self.workspace.lock().await.snapshot();
        let (models, conversations) = match snapshot {
            Ok(snapshot) => snapshot,
            Err(e) => {
                tracing::error!("Failed to serialize workspace: {}", e);
                return;
            }
        };

        if let Err(e) = store.set(MODELS_KEY, models).await {
            tracing::error!("Failed to save models: {}", e);
        }
        if let Err(e) = store.set(CONVERSATIONS_KEY, conversations).await {
            tracing::error!("Failed to save conversations: {}", e);
        }
    }
}

fn begin_turn(workspace: &mut Workspace, model: &ModelConfig, prompt: &str) -> Option<PendingTurn> {
    match workspace.conversations_mut().begin_turn(&model.id, prompt) {
        Ok(turn) => Some(turn),
        Err(e) => {
            tracing::warn!(model_id = %model.id, "Skipping model: {}", e);
            None
        }
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}

/// A broadcast that passed its checks and holds the running flag
struct Broadcast<'a> {
    _running: RunningGuard<'a>,
    prompt: String,
    models: Vec<ModelConfig>,
}

/// Holds the running flag for the lifetime of one broadcast
struct RunningGuard<'a>(&'a AtomicBool);

impl<'a> RunningGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}
