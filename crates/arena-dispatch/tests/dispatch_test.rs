// Fan-out behaviour against a scripted adapter (no network)

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use arena_dispatch::{Dispatcher, MessageStatus, ModelConfig, ProviderAdapter, ProviderKind, Workspace};
use arena_llm::error::Result as LlmResult;
use arena_llm::{Completion, LlmError, Message};
use arena_persist::{KeyValueStore, MemoryStore};
use async_trait::async_trait;

/// Answers by model name from a queue; an empty queue echoes the last user turn
#[derive(Default)]
struct ScriptedAdapter {
    replies: Mutex<HashMap<String, VecDeque<LlmResult<Completion>>>>,
    contexts: Mutex<Vec<(String, Vec<Message>)>>,
    delay: Duration,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl ScriptedAdapter {
    fn with_delay(delay: Duration) -> Self {
        Self {
            delay,
            ..Self::default()
        }
    }

    fn script(self, model_name: &str, reply: LlmResult<Completion>) -> Self {
        self.replies
            .lock()
            .unwrap()
            .entry(model_name.to_string())
            .or_default()
            .push_back(reply);
        self
    }

    fn contexts_for(&self, model_name: &str) -> Vec<Vec<Message>> {
        self.contexts
            .lock()
            .unwrap()
            .iter()
            .filter(|(name, _)| name == model_name)
            .map(|(_, context)| context.clone())
            .collect()
    }
}

#[async_trait]
impl ProviderAdapter for ScriptedAdapter {
    async fn invoke(&self, config: &ModelConfig, history: &[Message]) -> LlmResult<Completion> {
        self.contexts
            .lock()
            .unwrap()
            .push((config.model_name.clone(), history.to_vec()));

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let scripted = self
            .replies
            .lock()
            .unwrap()
            .get_mut(&config.model_name)
            .and_then(VecDeque::pop_front);
        scripted.unwrap_or_else(|| {
            let last = history.last().map(|m| m.content.clone()).unwrap_or_default();
            Ok(Completion::new(format!("echo: {}", last), Some(1)))
        })
    }
}

fn model(model_name: &str) -> ModelConfig {
    ModelConfig::builder(ProviderKind::OpenAI)
        .name(model_name)
        .api_key("sk-test")
        .model_name(model_name)
        .build()
        .unwrap()
}

fn workspace_with(models: &[&ModelConfig]) -> Workspace {
    let mut workspace = Workspace::new();
    for m in models {
        workspace.save_model((*m).clone()).unwrap();
    }
    workspace
}

fn dispatcher(adapter: Arc<ScriptedAdapter>, workspace: Workspace) -> Dispatcher {
    Dispatcher::builder()
        .adapter(adapter)
        .workspace(workspace)
        .build()
        .unwrap()
}

#[test]
fn test_builder_requires_adapter() {
    let err = Dispatcher::builder().build().err().unwrap();
    assert_eq!(err.to_string(), "Provider adapter is required");
}

#[tokio::test]
async fn test_every_model_gets_one_reply() {
    let (a, b, c) = (model("alpha"), model("beta"), model("gamma"));
    let adapter = Arc::new(ScriptedAdapter::default());
    let dispatcher = dispatcher(adapter.clone(), workspace_with(&[&a, &b, &c]));

    let report = dispatcher.send_to_all("  Hello  ").await.unwrap();

    assert_eq!(report.prompt, "Hello");
    assert_eq!(report.outcomes.len(), 3);
    assert_eq!(report.succeeded(), 3);

    let handle = dispatcher.workspace();
    let workspace = handle.lock().await;
    for m in [&a, &b, &c] {
        let messages = workspace.conversations().all_messages(&m.id);
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].content, "Hello");
        assert_eq!(messages[1].status, Some(MessageStatus::Success));
        assert_eq!(messages[1].content, "echo: Hello");
        assert_eq!(messages[1].model_id.as_deref(), Some(m.id.as_str()));
        assert_eq!(report.outcome(&m.id).unwrap().message, messages[1]);
    }
    assert!(!dispatcher.is_running());
}

#[tokio::test]
async fn test_one_failure_does_not_touch_others() {
    let (a, b) = (model("alpha"), model("beta"));
    let adapter = Arc::new(
        ScriptedAdapter::default().script("alpha", Err(LlmError::provider("Rate limit exceeded"))),
    );
    let dispatcher = dispatcher(adapter, workspace_with(&[&a, &b]));

    let report = dispatcher.send_to_all("Hi").await.unwrap();
    assert_eq!(report.succeeded(), 1);
    assert_eq!(report.failed(), 1);

    let handle = dispatcher.workspace();
    let workspace = handle.lock().await;

    let failed = &workspace.conversations().all_messages(&a.id)[1];
    assert!(failed.is_error());
    assert_eq!(failed.content, "");
    assert_eq!(failed.error.as_deref(), Some("Rate limit exceeded"));

    let ok = &workspace.conversations().all_messages(&b.id)[1];
    assert!(ok.is_success());
    assert_eq!(ok.content, "echo: Hi");
}

#[tokio::test]
async fn test_context_is_per_model_and_success_only() {
    let (a, b) = (model("alpha"), model("beta"));
    let adapter = Arc::new(
        ScriptedAdapter::default()
            .script("alpha", Ok(Completion::new("first answer", None)))
            .script("beta", Err(LlmError::provider("boom"))),
    );
    let dispatcher = dispatcher(adapter.clone(), workspace_with(&[&a, &b]));

    dispatcher.send_to_all("one").await.unwrap();
    dispatcher.send_to_all("two").await.unwrap();

    let alpha = adapter.contexts_for("alpha");
    assert_eq!(alpha[1], vec![
        Message::user("one"),
        Message::assistant("first answer"),
        Message::user("two"),
    ]);

    // beta's failed reply is not context, its user turn is
    let beta = adapter.contexts_for("beta");
    assert_eq!(beta[1], vec![Message::user("one"), Message::user("two")]);
}

#[tokio::test]
async fn test_blank_prompt_or_no_models_is_noop() {
    let a = model("alpha");
    let adapter = Arc::new(ScriptedAdapter::default());

    let empty = dispatcher(adapter.clone(), Workspace::new());
    assert!(empty.send_to_all("hello").await.is_none());
    assert_eq!(empty.last_prompt().await, None);

    let dispatcher = dispatcher(adapter.clone(), workspace_with(&[&a]));
    assert!(dispatcher.send_to_all("   \n").await.is_none());

    let handle = dispatcher.workspace();
    assert!(handle.lock().await.conversations().all_messages(&a.id).is_empty());
    assert!(adapter.contexts.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_send_while_running_is_ignored() {
    let a = model("alpha");
    let adapter = Arc::new(ScriptedAdapter::with_delay(Duration::from_millis(100)));
    let dispatcher = dispatcher(adapter, workspace_with(&[&a]));

    let (first, second) = tokio::join!(dispatcher.send_to_all("first"), async {
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(dispatcher.is_running());
        dispatcher.send_to_all("second").await
    });

    assert!(first.is_some());
    assert!(second.is_none());

    let handle = dispatcher.workspace();
    assert_eq!(handle.lock().await.conversations().all_messages(&a.id).len(), 2);
}

#[tokio::test]
async fn test_calls_run_concurrently() {
    let models: Vec<ModelConfig> = ["a", "b", "c", "d"].iter().map(|n| model(n)).collect();
    let refs: Vec<&ModelConfig> = models.iter().collect();
    let adapter = Arc::new(ScriptedAdapter::with_delay(Duration::from_millis(50)));
    let dispatcher = dispatcher(adapter.clone(), workspace_with(&refs));

    let report = dispatcher.send_to_all("go").await.unwrap();

    assert_eq!(adapter.max_in_flight.load(Ordering::SeqCst), 4);
    assert!(report.elapsed_ms < 4 * 50);
    for outcome in &report.outcomes {
        assert!(outcome.message.response_time.unwrap() >= 50);
    }
}

#[tokio::test]
async fn test_placeholders_visible_while_in_flight() {
    let a = model("alpha");
    let adapter = Arc::new(ScriptedAdapter::with_delay(Duration::from_millis(80)));
    let dispatcher = dispatcher(adapter, workspace_with(&[&a]));

    let (_, mid_flight) = tokio::join!(dispatcher.send_to_all("hi"), async {
        tokio::time::sleep(Duration::from_millis(20)).await;
        let handle = dispatcher.workspace();
        let workspace = handle.lock().await;
        workspace.conversations().all_messages(&a.id).to_vec()
    });

    assert_eq!(mid_flight.len(), 2);
    assert!(mid_flight[1].is_loading());
}

#[tokio::test]
async fn test_late_result_after_clear_is_dropped() {
    let (a, b) = (model("alpha"), model("beta"));
    let adapter = Arc::new(ScriptedAdapter::with_delay(Duration::from_millis(80)));
    let dispatcher = dispatcher(adapter, workspace_with(&[&a, &b]));

    let (report, _) = tokio::join!(dispatcher.send_to_all("hi"), async {
        tokio::time::sleep(Duration::from_millis(20)).await;
        dispatcher
            .update(|ws| ws.clear_conversation(&a.id))
            .await
            .unwrap();
    });

    // the outcome is still reported, but nothing reappears in the cleared thread
    assert!(report.unwrap().outcome(&a.id).unwrap().is_success());

    let handle = dispatcher.workspace();
    let workspace = handle.lock().await;
    assert!(workspace.conversations().all_messages(&a.id).is_empty());
    assert_eq!(workspace.conversations().all_messages(&b.id).len(), 2);
}

#[tokio::test]
async fn test_retry_resends_last_prompt_to_one_model() {
    let (a, b) = (model("alpha"), model("beta"));
    let adapter = Arc::new(
        ScriptedAdapter::default().script("alpha", Err(LlmError::provider("timeout"))),
    );
    let dispatcher = dispatcher(adapter.clone(), workspace_with(&[&a, &b]));

    assert!(dispatcher.retry_model(&a.id).await.is_none());

    dispatcher.send_to_all("Explain").await.unwrap();
    let outcome = dispatcher.retry_model(&a.id).await.unwrap();
    assert!(outcome.is_success());
    assert_eq!(outcome.message.content, "echo: Explain");

    assert!(dispatcher.retry_model("model-missing").await.is_none());

    let handle = dispatcher.workspace();
    let workspace = handle.lock().await;
    let alpha = workspace.conversations().all_messages(&a.id);
    assert_eq!(alpha.len(), 4);
    assert!(alpha[1].is_error());
    assert!(alpha[3].is_success());
    assert_eq!(workspace.conversations().all_messages(&b.id).len(), 2);

    // the retry saw the prompt twice: the first user turn stays in context
    let contexts = adapter.contexts_for("alpha");
    assert_eq!(contexts[1], vec![Message::user("Explain"), Message::user("Explain")]);
}

#[tokio::test]
async fn test_submit_takes_and_clears_draft() {
    let a = model("alpha");
    let dispatcher = dispatcher(Arc::new(ScriptedAdapter::default()), workspace_with(&[&a]));

    dispatcher.set_draft("What is Rust?").await;
    assert_eq!(dispatcher.draft().await, "What is Rust?");

    let report = dispatcher.submit().await.unwrap();
    assert_eq!(report.prompt, "What is Rust?");
    assert_eq!(dispatcher.draft().await, "");
    assert_eq!(dispatcher.last_prompt().await.as_deref(), Some("What is Rust?"));
}

#[tokio::test]
async fn test_submit_without_models_keeps_draft() {
    let dispatcher = dispatcher(Arc::new(ScriptedAdapter::default()), Workspace::new());
    dispatcher.set_draft("What is Rust?").await;

    assert!(dispatcher.submit().await.is_none());
    assert_eq!(dispatcher.draft().await, "What is Rust?");
    assert_eq!(dispatcher.last_prompt().await, None);
}

#[tokio::test]
async fn test_submit_blank_draft_is_left_alone() {
    let a = model("alpha");
    let adapter = Arc::new(ScriptedAdapter::default());
    let dispatcher = dispatcher(adapter.clone(), workspace_with(&[&a]));
    dispatcher.set_draft("   ").await;

    assert!(dispatcher.submit().await.is_none());
    assert_eq!(dispatcher.draft().await, "   ");
    assert!(adapter.contexts.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_submit_while_running_keeps_draft() {
    let a = model("alpha");
    let adapter = Arc::new(ScriptedAdapter::with_delay(Duration::from_millis(100)));
    let dispatcher = dispatcher(adapter, workspace_with(&[&a]));

    let (first, second) = tokio::join!(dispatcher.send_to_all("first"), async {
        tokio::time::sleep(Duration::from_millis(20)).await;
        dispatcher.set_draft("second").await;
        dispatcher.submit().await
    });

    assert!(first.is_some());
    assert!(second.is_none());
    assert_eq!(dispatcher.draft().await, "second");
}

#[tokio::test]
async fn test_draft_typed_during_broadcast_survives() {
    let a = model("alpha");
    let adapter = Arc::new(ScriptedAdapter::with_delay(Duration::from_millis(80)));
    let dispatcher = dispatcher(adapter, workspace_with(&[&a]));
    dispatcher.set_draft("first").await;

    let (report, during) = tokio::join!(dispatcher.submit(), async {
        tokio::time::sleep(Duration::from_millis(20)).await;
        let during = dispatcher.draft().await;
        dispatcher.set_draft("next question").await;
        during
    });

    assert_eq!(report.unwrap().prompt, "first");
    assert_eq!(during, "");
    assert_eq!(dispatcher.draft().await, "next question");
}

#[tokio::test]
async fn test_retry_after_reload_resends_persisted_prompt() {
    let (a, b) = (model("alpha"), model("beta"));
    let store = Arc::new(MemoryStore::new());

    // first process: alpha fails, state is written through
    let failing = Arc::new(
        ScriptedAdapter::default().script("alpha", Err(LlmError::provider("timeout"))),
    );
    let first = Dispatcher::builder()
        .adapter(failing)
        .workspace(workspace_with(&[&a, &b]))
        .with_persistence(store.clone())
        .build()
        .unwrap();
    first.send_to_all("Explain borrowing").await.unwrap();

    // second process: nothing in memory but the loaded workspace
    let restored = Workspace::load(store.as_ref() as &dyn KeyValueStore).await.unwrap();
    let adapter = Arc::new(ScriptedAdapter::default());
    let second = Dispatcher::builder()
        .adapter(adapter.clone())
        .workspace(restored)
        .with_persistence(store.clone())
        .build()
        .unwrap();
    assert_eq!(second.last_prompt().await, None);

    let outcome = second.retry_model(&a.id).await.unwrap();
    assert!(outcome.is_success());
    assert_eq!(outcome.message.content, "echo: Explain borrowing");
    assert_eq!(
        adapter.contexts_for("alpha"),
        vec![vec![Message::user("Explain borrowing"), Message::user("Explain borrowing")]]
    );
    assert!(adapter.contexts_for("beta").is_empty());

    let reloaded = Workspace::load(store.as_ref() as &dyn KeyValueStore).await.unwrap();
    let alpha = reloaded.conversations().all_messages(&a.id);
    assert_eq!(alpha.len(), 4);
    assert!(alpha[1].is_error());
    assert!(alpha[3].is_success());
    assert_eq!(reloaded.conversations().all_messages(&b.id).len(), 2);
}

#[tokio::test]
async fn test_state_written_through_to_store() {
    let (a, b) = (model("alpha"), model("beta"));
    let store = Arc::new(MemoryStore::new());
    let adapter = Arc::new(
        ScriptedAdapter::default().script("beta", Err(LlmError::provider("bad key"))),
    );
    let dispatcher = Dispatcher::builder()
        .adapter(adapter)
        .workspace(workspace_with(&[&a, &b]))
        .with_persistence(store.clone())
        .build()
        .unwrap();

    dispatcher.send_to_all("persist me").await.unwrap();

    let restored = Workspace::load(store.as_ref() as &dyn KeyValueStore).await.unwrap();
    let handle = dispatcher.workspace();
    assert_eq!(restored, *handle.lock().await);
    assert!(restored.conversations().all_messages(&a.id)[1].is_success());
    assert!(restored.conversations().all_messages(&b.id)[1].is_error());
}
