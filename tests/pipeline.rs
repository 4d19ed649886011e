//! Drives whole turns through the agent with a scripted LLM and a fake
//! reputation endpoint.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::extract::{Path as UrlPath, State};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};

use fraud_assistant::agent::{FRAUD_TOOL_NAME, NO_SIGNAL_TEXT};
use fraud_assistant::core::config::{AppConfig, AppPaths, DecisionMode};
use fraud_assistant::core::errors::AppError;
use fraud_assistant::llm::{ChatRequest, EmbeddingTask, LlmProvider};
use fraud_assistant::state::AppState;

const KNOWLEDGE: &str = "\
Proxy and VPN usage is a common sign of fraud.
Sudden spikes in failed logins suggest credential stuffing.

Mismatched billing and shipping addresses raise chargeback risk.
";

/// Letter-frequency embeddings plus a chat script: decision requests (those
/// with a system instruction) get `decision`, synthesis requests get a
/// numbered answer and are recorded.
struct FakeGemini {
    decision: String,
    prompts: Mutex<Vec<String>>,
}

impl FakeGemini {
    fn new(decision: Value) -> Self {
        Self {
            decision: decision.to_string(),
            prompts: Mutex::new(Vec::new()),
        }
    }

    fn synthesis_prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmProvider for FakeGemini {
    fn name(&self) -> &str {
        "fake-gemini"
    }

    async fn chat(&self, request: ChatRequest, _model_id: &str) -> Result<String, AppError> {
        if request.messages.iter().any(|m| m.role == "system") {
            return Ok(self.decision.clone());
        }

        let prompt = request
            .messages
            .last()
            .map(|m| m.content.clone())
            .unwrap_or_default();
        let mut prompts = self.prompts.lock().unwrap();
        prompts.push(prompt);
        Ok(format!("synthesized answer #{}", prompts.len()))
    }

    async fn embed(
        &self,
        inputs: &[String],
        _model_id: &str,
        _task: EmbeddingTask,
    ) -> Result<Vec<Vec<f32>>, AppError> {
        Ok(inputs
            .iter()
            .map(|text| {
                let mut v = vec![0.0f32; 26];
                for c in text.to_ascii_lowercase().bytes() {
                    if c.is_ascii_lowercase() {
                        v[(c - b'a') as usize] += 1.0;
                    }
                }
                v
            })
            .collect())
    }
}

async fn ipqs(
    State(hits): State<Arc<AtomicUsize>>,
    UrlPath((_key, signal)): UrlPath<(String, String)>,
) -> Json<Value> {
    hits.fetch_add(1, Ordering::SeqCst);
    Json(json!({
        "success": true,
        "ip_address": signal,
        "fraud_score": 88,
        "vpn": true,
        "proxy": true,
        "tor": false,
        "crawler": false,
        "recent_abuse": true,
        "is_bot": false
    }))
}

async fn spawn_reputation() -> (String, Arc<AtomicUsize>) {
    let hits = Arc::new(AtomicUsize::new(0));
    let app = Router::new()
        .route("/ip/:key/:signal", get(ipqs))
        .with_state(hits.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{}/ip/", addr), hits)
}

fn paths_with_seed(root: &Path) -> Arc<AppPaths> {
    std::fs::create_dir_all(root.join("data")).unwrap();
    std::fs::write(root.join("data/knowledge_base.txt"), KNOWLEDGE).unwrap();
    Arc::new(AppPaths::from_dirs(root.to_path_buf(), root.join("user")))
}

fn config(reputation_url: String, decision: DecisionMode) -> AppConfig {
    let mut config = AppConfig::default();
    config.reputation.base_url = reputation_url;
    config.reputation.api_key = Some("test-key".to_string());
    config.agent.decision = decision;
    config
}

#[tokio::test]
async fn ip_query_runs_retrieval_reputation_and_synthesis() {
    let root = tempfile::tempdir().unwrap();
    let (url, hits) = spawn_reputation().await;
    let llm = Arc::new(FakeGemini::new(json!({
        "action": FRAUD_TOOL_NAME,
        "action_input": "What about 198.51.100.23?"
    })));

    let state = AppState::with_provider(
        paths_with_seed(root.path()),
        config(url, DecisionMode::React),
        llm.clone(),
    )
    .await
    .unwrap();
    assert_eq!(state.knowledge.count().await.unwrap(), 3);

    let mut agent = state.new_agent();
    let reply = agent.run_turn("What about 198.51.100.23?").await.unwrap();

    assert_eq!(reply, "synthesized answer #1");
    assert_eq!(hits.load(Ordering::SeqCst), 1);

    let prompts = llm.synthesis_prompts();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].contains("User Query:\nWhat about 198.51.100.23?"));
    assert!(prompts[0].contains("Proxy and VPN usage is a common sign of fraud."));
    assert!(prompts[0].contains(
        "Fraud Score: 88, VPN: true, Proxy: true, Tor: false, Crawler: false, Recent Abuse: true, Bot: false"
    ));

    let turns = agent.memory().turns();
    assert_eq!(turns.len(), 2);
    assert_eq!(turns[1].content, reply);
}

#[tokio::test]
async fn general_query_uses_fallback_text_and_still_synthesizes() {
    let root = tempfile::tempdir().unwrap();
    let (url, hits) = spawn_reputation().await;
    let llm = Arc::new(FakeGemini::new(json!({})));

    let state = AppState::with_provider(
        paths_with_seed(root.path()),
        config(url, DecisionMode::AlwaysTool),
        llm.clone(),
    )
    .await
    .unwrap();

    let mut agent = state.new_agent();
    let reply = agent
        .run_turn("Tell me about typical fraud signs")
        .await
        .unwrap();

    assert_eq!(reply, "synthesized answer #1");
    assert_eq!(hits.load(Ordering::SeqCst), 0);

    let prompts = llm.synthesis_prompts();
    assert!(prompts[0].contains(&format!(
        "Fraud Check Result (if applicable):\n{}",
        NO_SIGNAL_TEXT
    )));
}

#[tokio::test]
async fn direct_answer_skips_tool_and_sessions_are_independent() {
    let root = tempfile::tempdir().unwrap();
    let (url, hits) = spawn_reputation().await;
    let llm = Arc::new(FakeGemini::new(json!({
        "action": "Final Answer",
        "action_input": "Hello! Ask me about fraud."
    })));

    let state = AppState::with_provider(
        paths_with_seed(root.path()),
        config(url, DecisionMode::React),
        llm.clone(),
    )
    .await
    .unwrap();

    let mut first = state.new_agent();
    let mut second = state.new_agent();

    assert_eq!(first.run_turn("hi").await.unwrap(), "Hello! Ask me about fraud.");
    assert_eq!(first.run_turn("thanks").await.unwrap(), "Hello! Ask me about fraud.");

    assert!(llm.synthesis_prompts().is_empty());
    assert_eq!(hits.load(Ordering::SeqCst), 0);
    assert_eq!(first.memory().total_turns(), 4);
    assert!(second.memory().is_empty());
    assert_ne!(first.session_id(), second.session_id());

    let err = second.run_turn("").await.unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));
}

#[tokio::test]
async fn reopening_the_store_does_not_duplicate_seed_documents() {
    let root = tempfile::tempdir().unwrap();
    let (url, _) = spawn_reputation().await;
    let paths = paths_with_seed(root.path());

    for _ in 0..2 {
        let state = AppState::with_provider(
            paths.clone(),
            config(url.clone(), DecisionMode::AlwaysTool),
            Arc::new(FakeGemini::new(json!({}))),
        )
        .await
        .unwrap();
        assert_eq!(state.knowledge.count().await.unwrap(), 3);
    }
}
