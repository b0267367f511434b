//! Integration tests for the analysis pipeline, driven by scripted clients.
//!
//! No network and no pdfium: documents enter as `DocumentText` through
//! `run_analysis`, or as raw bytes that fail the `%PDF` check before
//! pdfium is ever bound.

use async_trait::async_trait;
use edgequake_paper_review::prompts::{self, Role};
use edgequake_paper_review::{
    analyze, analyze_bytes, run_analysis, run_team_review, AnalysisMode, DocumentText,
    ErrorKind, Generation, GenerationClient, ReviewConfig, ReviewError, ReviewProgressCallback,
};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

// ── Test helpers ─────────────────────────────────────────────────────────────

/// Replays a fixed list of outcomes and records every prompt it is sent.
struct ScriptedClient {
    replies: Mutex<VecDeque<Result<String, ReviewError>>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedClient {
    fn new(replies: Vec<Result<String, ReviewError>>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            prompts: Mutex::new(Vec::new()),
        })
    }

    fn replying(texts: &[&str]) -> Arc<Self> {
        Self::new(texts.iter().map(|t| Ok(t.to_string())).collect())
    }

    fn sent(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl GenerationClient for ScriptedClient {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn generate(&self, prompt: &str) -> Result<Generation, ReviewError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        let next = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ReviewError::Internal("script exhausted".into())));
        next.map(|text| Generation {
            input_tokens: prompt.len() / 4,
            output_tokens: text.len() / 4,
            text,
            duration_ms: 1,
        })
    }
}

/// Fails every call with an authentication error.
#[derive(Default)]
struct RejectingClient {
    calls: Mutex<usize>,
}

#[async_trait]
impl GenerationClient for RejectingClient {
    fn name(&self) -> &str {
        "rejecting"
    }

    async fn generate(&self, _prompt: &str) -> Result<Generation, ReviewError> {
        *self.calls.lock().unwrap() += 1;
        Err(ReviewError::AuthError {
            provider: "gemini".into(),
            detail: "API key not valid".into(),
        })
    }
}

/// Records progress events as short strings.
#[derive(Default)]
struct EventLog(Mutex<Vec<String>>);

impl ReviewProgressCallback for EventLog {
    fn on_analysis_start(&self, total_stages: usize, _text_len: usize) {
        self.0.lock().unwrap().push(format!("start:{total_stages}"));
    }
    fn on_stage_start(&self, stage: usize, role: Option<Role>) {
        let who = role.map(|r| r.key()).unwrap_or("-");
        self.0.lock().unwrap().push(format!("stage:{stage}:{who}"));
    }
    fn on_stage_complete(&self, stage: usize, _role: Option<Role>, _output_len: usize) {
        self.0.lock().unwrap().push(format!("done:{stage}"));
    }
    fn on_stage_error(&self, stage: usize, _role: Option<Role>, _error: &str) {
        self.0.lock().unwrap().push(format!("error:{stage}"));
    }
    fn on_analysis_complete(&self, total_stages: usize) {
        self.0.lock().unwrap().push(format!("complete:{total_stages}"));
    }
}

fn paper() -> DocumentText {
    DocumentText::new("We study X. We find Y.", 2)
}

// ── Team review ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn team_review_makes_three_calls_in_order() {
    let client = ScriptedClient::replying(&["Draft A", "Simplified A", "Final A"]);
    let config = ReviewConfig::default();

    let out = run_analysis(client.as_ref(), paper(), AnalysisMode::TeamReview, &config)
        .await
        .unwrap();

    let sent = client.sent();
    assert_eq!(sent.len(), 3);
    assert_eq!(sent[0], prompts::build(Role::Sam, "We study X. We find Y."));
    assert_eq!(sent[1], prompts::build(Role::Jenny, "Draft A"));
    assert_eq!(sent[2], prompts::build(Role::Will, "Simplified A"));
    assert!(sent[1].contains("Draft A"));
    assert!(!sent[1].contains("We study X"));
    assert!(!sent[2].contains("Draft A"));

    assert_eq!(out.text, "Final A");
    assert_eq!(out.stages.len(), 3);
    assert_eq!(
        out.stages.iter().map(|s| s.role).collect::<Vec<_>>(),
        vec![Some(Role::Sam), Some(Role::Jenny), Some(Role::Will)]
    );
    assert_eq!(out.stats.generation_calls, 3);
    assert_eq!(out.stats.page_count, 2);
}

#[tokio::test]
async fn intermediate_drafts_are_not_retained() {
    let client = ScriptedClient::replying(&["Draft A", "Plain A", "Final A"]);
    let config = ReviewConfig::default();

    let out = run_analysis(client.as_ref(), paper(), AnalysisMode::TeamReview, &config)
        .await
        .unwrap();

    let json = serde_json::to_string(&out).unwrap();
    assert!(!json.contains("Draft A"));
    assert!(!json.contains("Plain A"));
    assert!(json.contains("Final A"));
    assert_eq!(
        out.stages.iter().map(|s| s.output_chars).collect::<Vec<_>>(),
        vec![7, 7, 7]
    );
}

#[tokio::test]
async fn final_reply_is_returned_verbatim() {
    let reply = "# Report\n```python\n# train model\nfit(x)\n```\nLine one  \nline two";
    let client = ScriptedClient::replying(&["draft", "plain", reply]);

    let out = run_analysis(
        client.as_ref(),
        paper(),
        AnalysisMode::TeamReview,
        &ReviewConfig::default(),
    )
    .await
    .unwrap();

    assert_eq!(out.text, reply);
}

#[tokio::test]
async fn draft_from_sam_reaches_jenny() {
    let client = ScriptedClient::replying(&["Draft A", "Plain A", "Final A"]);
    let text = DocumentText::new("Paper about X achieves 95% accuracy.", 1);

    run_team_review(client.as_ref(), text, None).await.unwrap();

    let sent = client.sent();
    assert!(sent[0].contains("Paper about X achieves 95% accuracy."));
    assert!(sent[0].contains("key points, methodology and results"));
    assert!(sent[1].contains("Draft A"));
}

#[tokio::test]
async fn sam_prompt_wraps_document_text() {
    let client = ScriptedClient::replying(&["a", "b", "c"]);
    run_team_review(client.as_ref(), paper(), None).await.unwrap();

    let first = &client.sent()[0];
    assert!(first.contains("key points, methodology and results"));
    assert!(first.ends_with("We study X. We find Y."));
}

#[tokio::test]
async fn auth_error_on_first_call_stops_the_review() {
    let client = RejectingClient::default();
    let config = ReviewConfig::default();

    let err = run_analysis(&client, paper(), AnalysisMode::TeamReview, &config)
        .await
        .unwrap_err();

    assert_eq!(*client.calls.lock().unwrap(), 1);
    assert_eq!(err.kind(), ErrorKind::Authentication);
    match err {
        ReviewError::AuthError { provider, detail } => {
            assert_eq!(provider, "gemini");
            assert_eq!(detail, "API key not valid");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn failure_in_middle_stage_returns_no_partial_text() {
    let client = ScriptedClient::new(vec![
        Ok("Draft A".into()),
        Err(ReviewError::RateLimitExceeded {
            provider: "gemini".into(),
            retry_after_secs: Some(10),
        }),
        Ok("never sent".into()),
    ]);
    let log = Arc::new(EventLog::default());
    let config = ReviewConfig::builder()
        .progress_callback(log.clone() as Arc<dyn ReviewProgressCallback>)
        .build()
        .unwrap();

    let err = run_analysis(client.as_ref(), paper(), AnalysisMode::TeamReview, &config)
        .await
        .unwrap_err();

    assert!(matches!(err, ReviewError::RateLimitExceeded { .. }));
    assert_eq!(client.sent().len(), 2);
    assert_eq!(
        *log.0.lock().unwrap(),
        vec!["start:3", "stage:1:sam", "done:1", "stage:2:jenny", "error:2"]
    );
}

#[tokio::test]
async fn progress_events_follow_stage_order() {
    let client = ScriptedClient::replying(&["a", "b", "c"]);
    let log = Arc::new(EventLog::default());
    let config = ReviewConfig::builder()
        .progress_callback(log.clone() as Arc<dyn ReviewProgressCallback>)
        .build()
        .unwrap();

    run_analysis(client.as_ref(), paper(), AnalysisMode::TeamReview, &config)
        .await
        .unwrap();

    assert_eq!(
        *log.0.lock().unwrap(),
        vec![
            "start:3",
            "stage:1:sam",
            "done:1",
            "stage:2:jenny",
            "done:2",
            "stage:3:will",
            "done:3",
            "complete:3",
        ]
    );
}

#[tokio::test]
async fn empty_document_still_runs_all_stages() {
    let client = ScriptedClient::replying(&["a", "b", "c"]);
    let config = ReviewConfig::default();

    let out = run_analysis(
        client.as_ref(),
        DocumentText::new("", 1),
        AnalysisMode::TeamReview,
        &config,
    )
    .await
    .unwrap();

    assert_eq!(client.sent().len(), 3);
    assert_eq!(client.sent()[0], prompts::build(Role::Sam, ""));
    assert_eq!(out.text, "c");
}

// ── Prompt construction ──────────────────────────────────────────────────────

#[test]
fn unknown_role_key_builds_empty_prompt() {
    assert_eq!(prompts::build_for_key("bob", "anything"), "");
    assert_eq!(prompts::build_for_key("", "anything"), "");
    assert_eq!(
        prompts::build_for_key("sam", "paper"),
        prompts::build(Role::Sam, "paper")
    );
}

// ── Single-call modes ────────────────────────────────────────────────────────

#[tokio::test]
async fn single_call_modes_send_one_prompt() {
    let config = ReviewConfig::builder().summary_char_limit(250).build().unwrap();
    let cases = [
        (AnalysisMode::Summary, prompts::summary_prompt("We study X. We find Y.", 250)),
        (AnalysisMode::Methodology, prompts::methodology_prompt("We study X. We find Y.")),
        (AnalysisMode::Results, prompts::results_prompt("We study X. We find Y.")),
        (
            AnalysisMode::Question("What is X?".into()),
            prompts::question_prompt("What is X?", "We study X. We find Y."),
        ),
    ];

    for (mode, expected) in cases {
        let client = ScriptedClient::replying(&["answer"]);
        let out = run_analysis(client.as_ref(), paper(), mode.clone(), &config)
            .await
            .unwrap();
        assert_eq!(client.sent(), vec![expected], "mode {mode}");
        assert_eq!(out.text, "answer");
        assert_eq!(out.stages.len(), 1);
        assert_eq!(out.stages[0].role, None);
    }
}

#[tokio::test]
async fn blank_question_is_rejected_without_calls() {
    let client = ScriptedClient::replying(&["unused"]);
    let config = ReviewConfig::default();

    let err = run_analysis(
        client.as_ref(),
        paper(),
        AnalysisMode::Question("   ".into()),
        &config,
    )
    .await
    .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Config);
    assert!(client.sent().is_empty());
}

#[test]
fn output_serialises_to_json() {
    let client = ScriptedClient::replying(&["Para one.\n\nPara two."]);
    let out = tokio_test::block_on(run_analysis(
            client.as_ref(),
            paper(),
            AnalysisMode::Summary,
            &ReviewConfig::default(),
        ))
        .unwrap();

    assert_eq!(out.sections(), vec!["Para one.", "Para two."]);
    let json = serde_json::to_value(&out).unwrap();
    assert_eq!(json["mode"]["mode"], "summary");
    assert_eq!(json["stats"]["generation_calls"], 1);
}

// ── Request boundary ─────────────────────────────────────────────────────────

#[tokio::test]
async fn non_pdf_bytes_fail_before_any_call() {
    let client = ScriptedClient::replying(&["unused"]);
    let config = ReviewConfig::builder()
        .client(client.clone() as Arc<dyn GenerationClient>)
        .build()
        .unwrap();

    let err = analyze_bytes(b"<html>not a paper</html>".to_vec(), AnalysisMode::TeamReview, &config)
        .await
        .unwrap_err();

    assert!(matches!(err, ReviewError::NotAPdf { .. }));
    assert_eq!(err.kind(), ErrorKind::Extraction);
    assert!(client.sent().is_empty());
}

#[tokio::test]
async fn missing_file_is_an_input_error() {
    let client = ScriptedClient::replying(&["unused"]);
    let config = ReviewConfig::builder()
        .client(client.clone() as Arc<dyn GenerationClient>)
        .build()
        .unwrap();

    let err = analyze("/definitely/not/here.pdf", AnalysisMode::Summary, &config)
        .await
        .unwrap_err();

    assert!(matches!(err, ReviewError::FileNotFound { .. }));
    assert_eq!(err.kind(), ErrorKind::Input);
    assert!(client.sent().is_empty());
}
