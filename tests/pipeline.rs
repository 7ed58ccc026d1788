//! Pipeline integration tests: orchestration, streaming and cancellation.
//!
//! Every test plugs a scripted [`InferenceClient`] into the config, so no
//! network access or API key is needed.
//!
//! Run with:
//!   cargo test --test pipeline

use async_trait::async_trait;
use doc2tasks::normalize::fallback::PARSE_ERROR_DESCRIPTION;
use doc2tasks::{
    analyze, analyze_stream, AnalysisConfig, AnalysisInput, AnalysisProgressCallback, Anomaly,
    CollectingSink, InferenceClient, InferenceError, ProgressEvent,
};
use futures::StreamExt;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

// ── Test helpers ─────────────────────────────────────────────────────────────

/// Replies with a fixed string (or provider error message) after `delay`.
struct ScriptedInference {
    reply: Result<String, String>,
    delay: Duration,
    seen: Mutex<Vec<(String, String, String)>>,
}

impl ScriptedInference {
    fn ok(reply: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: Ok(reply.to_string()),
            delay: Duration::ZERO,
            seen: Mutex::new(Vec::new()),
        })
    }

    fn failing(message: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: Err(message.to_string()),
            delay: Duration::ZERO,
            seen: Mutex::new(Vec::new()),
        })
    }

    fn slow(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            reply: Ok("[]".to_string()),
            delay,
            seen: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl InferenceClient for ScriptedInference {
    async fn complete(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        model: &str,
    ) -> Result<String, InferenceError> {
        self.seen.lock().unwrap().push((
            system_prompt.to_string(),
            user_prompt.to_string(),
            model.to_string(),
        ));
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.reply
            .clone()
            .map_err(|msg| InferenceError::classify(&msg, model))
    }
}

/// Records every stage percentage it is told about.
#[derive(Default)]
struct RecordingProgress(Mutex<Vec<u8>>);

impl AnalysisProgressCallback for RecordingProgress {
    fn on_progress(&self, percent: u8, _message: &str) {
        self.0.lock().unwrap().push(percent);
    }
}

fn config_for(client: Arc<ScriptedInference>) -> AnalysisConfig {
    AnalysisConfig::builder()
        .inference(client)
        .build()
        .unwrap()
}

async fn analyze_reply(reply: &str) -> doc2tasks::AnalysisResult {
    analyze(AnalysisInput::text("A todo app"), &config_for(ScriptedInference::ok(reply)))
        .await
        .unwrap()
}

async fn collect(input: AnalysisInput, config: &AnalysisConfig) -> Vec<ProgressEvent> {
    analyze_stream(input, config, CancellationToken::new())
        .collect()
        .await
}

fn percents(events: &[ProgressEvent]) -> Vec<u8> {
    events
        .iter()
        .filter_map(|e| match e {
            ProgressEvent::Progress { progress, .. } => Some(*progress),
            _ => None,
        })
        .collect()
}

/// Exactly one terminal event, and it is the last one.
fn assert_single_terminal(events: &[ProgressEvent]) {
    let terminals = events.iter().filter(|e| e.is_terminal()).count();
    assert_eq!(terminals, 1, "expected one terminal event, got {events:?}");
    assert!(events.last().map(|e| e.is_terminal()).unwrap_or(false));
}

fn error_category(events: &[ProgressEvent]) -> Option<&str> {
    match events.last() {
        Some(ProgressEvent::Error { category, .. }) => Some(category.as_str()),
        _ => None,
    }
}

// ── Normalisation through the orchestrator ───────────────────────────────────

#[tokio::test]
async fn test_string_array_reply() {
    let result = analyze_reply(r#"["user_login", "EXPORT-data"]"#).await;
    let titles: Vec<_> = result.tasks.iter().map(|t| t.title.as_str()).collect();
    assert_eq!(titles, ["User Login", "Export Data"]);
    assert!(result
        .tasks
        .iter()
        .all(|t| t.description == "No description provided" && t.priority == 3));
    assert_eq!(result.tasks[1].id, "task-2");
    assert_eq!(result.summary, "Found 2 tasks.");
}

#[tokio::test]
async fn test_partial_fields_are_filled_and_reported() {
    let sink = Arc::new(CollectingSink::default());
    let config = AnalysisConfig::builder()
        .inference(ScriptedInference::ok(
            r#"[{"name": "search posts"}, {"details": "Pick a theme."}]"#,
        ))
        .diagnostics(sink.clone())
        .build()
        .unwrap();

    let result = analyze(AnalysisInput::text("blog"), &config).await.unwrap();
    assert_eq!(result.tasks[0].title, "Search Posts");
    assert_eq!(result.tasks[0].description, "No description provided");
    assert_eq!(result.tasks[1].title, "Task 2");
    assert_eq!(result.tasks[1].description, "Pick a theme.");
    assert_eq!(
        sink.anomalies(),
        vec![
            Anomaly::MissingDescription { index: 1 },
            Anomaly::MissingTitle { index: 2 },
        ]
    );
}

#[tokio::test]
async fn test_nested_array_under_arbitrary_key() {
    let result = analyze_reply(
        r#"{"project": "shop", "features": [{"title": "cart", "description": "Hold items."}]}"#,
    )
    .await;
    assert_eq!(result.tasks.len(), 1);
    assert_eq!(result.tasks[0].title, "Cart");
    assert_eq!(result.tasks[0].description, "Hold items.");
}

#[tokio::test]
async fn test_tasks_wrapper_takes_priority() {
    let result = analyze_reply(
        r#"{"items": ["a", "b", "c"], "tasks": [{"task": "only me", "description": "x"}]}"#,
    )
    .await;
    assert_eq!(result.tasks.len(), 1);
    assert_eq!(result.tasks[0].title, "Only Me");
}

#[tokio::test]
async fn test_malformed_reply_falls_back() {
    let sink = Arc::new(CollectingSink::default());
    let config = AnalysisConfig::builder()
        .inference(ScriptedInference::ok("Sure! Here are your tasks: 1. Login"))
        .diagnostics(sink.clone())
        .build()
        .unwrap();

    let result = analyze(AnalysisInput::text("x"), &config).await.unwrap();
    assert_eq!(result.tasks.len(), 1);
    assert_eq!(result.tasks[0].id, "task-1");
    assert_eq!(result.tasks[0].title, "Document Analysis");
    assert_eq!(result.tasks[0].description, PARSE_ERROR_DESCRIPTION);
    assert!(matches!(
        sink.anomalies().as_slice(),
        [Anomaly::MalformedResponse { .. }]
    ));
}

#[tokio::test]
async fn test_fenced_reply_is_unwrapped() {
    let result = analyze_reply("```json\n[{\"task\": \"dark mode\", \"description\": \"Toggle theme.\"}]\n```").await;
    assert_eq!(result.tasks[0].title, "Dark Mode");
}

#[tokio::test]
async fn test_object_without_arrays_becomes_summary_task() {
    let result = analyze_reply(r#"{"app_type": "CRM", "audience": "sales teams"}"#).await;
    assert_eq!(result.tasks.len(), 1);
    assert_eq!(
        result.tasks[0].description,
        "Document analysis: App Type: CRM, Audience: sales teams"
    );
}

#[tokio::test]
async fn test_empty_reply_is_never_empty_result() {
    for reply in ["", "[]", "{}", "{\"tasks\": []}", "null", "42"] {
        let result = analyze_reply(reply).await;
        assert_eq!(result.tasks.len(), 1, "reply {reply:?}");
    }
}

#[tokio::test]
async fn test_task_count_is_preserved() {
    let items: Vec<String> = (1..=60).map(|i| format!("\"feature {i}\"")).collect();
    let reply = format!("[{}]", items.join(","));
    let result = analyze_reply(&reply).await;
    assert_eq!(result.tasks.len(), 60);
    assert_eq!(result.tasks[59].id, "task-60");
    assert_eq!(result.tasks[59].title, "Feature 60");
}

#[tokio::test]
async fn test_prompts_and_model_are_forwarded() {
    let client = ScriptedInference::ok("[]");
    let config = AnalysisConfig::builder()
        .inference(client.clone())
        .model("gpt-4.1-mini")
        .system_prompt("list features")
        .build()
        .unwrap();
    analyze(AnalysisInput::text("A chess club site"), &config)
        .await
        .unwrap();

    let seen = client.seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].0, "list features");
    assert_eq!(seen[0].1, "\n\nA chess club site");
    assert_eq!(seen[0].2, "gpt-4.1-mini");
}

// ── Streaming ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_stream_text_skips_extraction() {
    let config = config_for(ScriptedInference::ok(r#"["a"]"#));
    let events = collect(AnalysisInput::text("spec"), &config).await;

    assert_eq!(percents(&events), [0, 20, 100]);
    assert_single_terminal(&events);
    match events.last() {
        Some(ProgressEvent::Complete { result }) => assert_eq!(result.tasks[0].title, "A"),
        other => panic!("expected complete, got {other:?}"),
    }
}

#[tokio::test]
async fn test_stream_document_reports_every_stage() {
    let config = config_for(ScriptedInference::ok(r#"["a"]"#));
    let input = AnalysisInput::document(b"Users can log in.".to_vec(), "text/plain");
    let events = collect(input, &config).await;

    assert_eq!(percents(&events), [0, 10, 20, 100]);
    assert!(matches!(
        &events[1],
        ProgressEvent::Progress { message, .. } if message == "Extracting text from document..."
    ));
    assert_single_terminal(&events);
}

#[tokio::test]
async fn test_stream_unsupported_format_stops_after_extraction() {
    let client = ScriptedInference::ok("[]");
    let config = config_for(client.clone());
    let input = AnalysisInput::document(vec![0u8; 16], "image/png");
    let events = collect(input, &config).await;

    assert_eq!(percents(&events), [0, 10]);
    assert_eq!(error_category(&events), Some("extraction"));
    assert_single_terminal(&events);
    assert!(client.seen.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_stream_empty_text_is_single_error() {
    let config = config_for(ScriptedInference::ok("[]"));
    let events = collect(AnalysisInput::text(""), &config).await;

    assert_eq!(events.len(), 1);
    assert_eq!(error_category(&events), Some("no_input"));
}

#[tokio::test]
async fn test_stream_quota_error_is_classified() {
    let config = config_for(ScriptedInference::failing("Rate limit exceeded (429)"));
    let events = collect(AnalysisInput::text("x"), &config).await;

    assert_eq!(percents(&events), [0, 20]);
    assert_eq!(error_category(&events), Some("quota_exceeded"));
    match events.last() {
        Some(ProgressEvent::Error { error, .. }) => assert!(error.contains("quota exceeded")),
        other => panic!("expected error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_stream_auth_error_is_classified() {
    let config = config_for(ScriptedInference::failing("Incorrect API key provided"));
    let events = collect(AnalysisInput::text("x"), &config).await;
    assert_eq!(error_category(&events), Some("auth"));
}

#[tokio::test]
async fn test_stream_cancellation_ends_with_cancelled_error() {
    let config = config_for(ScriptedInference::slow(Duration::from_secs(30)));
    let cancel = CancellationToken::new();
    let mut stream = analyze_stream(AnalysisInput::text("x"), &config, cancel.clone());

    let mut events = Vec::new();
    let drained = tokio::time::timeout(Duration::from_secs(5), async {
        while let Some(event) = stream.next().await {
            if matches!(event, ProgressEvent::Progress { progress: 20, .. }) {
                cancel.cancel();
            }
            events.push(event);
        }
    })
    .await;

    assert!(drained.is_ok(), "cancelled run did not finish");
    assert_eq!(error_category(&events), Some("cancelled"));
    assert_single_terminal(&events);
}

#[tokio::test]
async fn test_dropped_stream_still_completes_run() {
    let progress = Arc::new(RecordingProgress::default());
    let config = AnalysisConfig::builder()
        .inference(Arc::new(ScriptedInference {
            reply: Ok(r#"["a"]"#.to_string()),
            delay: Duration::from_millis(50),
            seen: Mutex::new(Vec::new()),
        }))
        .progress_callback(progress.clone())
        .build()
        .unwrap();

    let mut stream = analyze_stream(AnalysisInput::text("x"), &config, CancellationToken::new());
    let first = stream.next().await;
    assert!(matches!(first, Some(ProgressEvent::Progress { progress: 0, .. })));
    drop(stream);

    let finished = tokio::time::timeout(Duration::from_secs(5), async {
        while !progress.0.lock().unwrap().contains(&100) {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await;

    assert!(finished.is_ok(), "run stopped after the stream was dropped");
    assert_eq!(*progress.0.lock().unwrap(), vec![0, 20, 100]);
}

#[tokio::test]
async fn test_stream_timeout() {
    let config = AnalysisConfig::builder()
        .inference(ScriptedInference::slow(Duration::from_secs(30)))
        .api_timeout_secs(1)
        .build()
        .unwrap();
    let events = collect(AnalysisInput::text("x"), &config).await;
    assert_eq!(error_category(&events), Some("timeout"));
}

#[tokio::test]
async fn test_events_serialise_to_wire_format() {
    let config = config_for(ScriptedInference::ok(r#"["a"]"#));
    let events = collect(AnalysisInput::text("x"), &config).await;
    let lines: Vec<serde_json::Value> = events
        .iter()
        .map(|e| serde_json::to_value(e).unwrap())
        .collect();

    assert_eq!(lines[0]["type"], "progress");
    assert_eq!(lines[0]["progress"], 0);
    let last = lines.last().unwrap();
    assert_eq!(last["type"], "complete");
    assert_eq!(last["result"]["tasks"][0]["id"], "task-1");
    assert_eq!(last["result"]["summary"], "Found 1 tasks.");
}
