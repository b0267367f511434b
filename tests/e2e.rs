//! End-to-end integration tests for edgequake-paper-review.
//!
//! These tests use real PDF files in `./test_cases/`, need a pdfium
//! library, and some make live Gemini API calls. They are gated behind the
//! `E2E_ENABLED` environment variable so they do not run in CI unless
//! explicitly requested.
//!
//! Run with:
//!   E2E_ENABLED=1 PDFIUM_LIB_PATH=. cargo test --test e2e -- --nocapture

use edgequake_paper_review::pipeline::extract::extract_text;
use edgequake_paper_review::{
    analyze, inspect, AnalysisMode, ErrorKind, ReviewConfig, ReviewProgressCallback, Role,
};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

// ── Test helpers ─────────────────────────────────────────────────────────────

fn test_cases_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("test_cases")
}

/// Skip this test if E2E_ENABLED is not set *or* no PDF file at `path`.
macro_rules! e2e_skip_unless_ready {
    ($path:expr) => {{
        if std::env::var("E2E_ENABLED").is_err() {
            println!("SKIP — set E2E_ENABLED=1 to run e2e tests");
            return;
        }
        let p: PathBuf = $path;
        if !p.exists() {
            println!("SKIP — test file not found: {}", p.display());
            return;
        }
        p
    }};
}

/// Also skip when no Gemini key is available.
macro_rules! skip_without_gemini_key {
    () => {
        if std::env::var("GEMINI_API_KEY").is_err() {
            println!("SKIP — set GEMINI_API_KEY to run live generation tests");
            return;
        }
    };
}

fn attention_paper() -> PathBuf {
    test_cases_dir().join("attention_is_all_you_need.pdf")
}

// ── Extraction tests (pdfium, no LLM) ────────────────────────────────────────

#[tokio::test]
async fn test_inspect_arxiv_paper() {
    let path = e2e_skip_unless_ready!(attention_paper());

    let meta = inspect(path.to_str().unwrap(), &ReviewConfig::default())
        .await
        .expect("inspect() should succeed");

    assert_eq!(meta.page_count, 15, "Attention paper should have 15 pages");
    assert!(!meta.pdf_version.is_empty());
    println!("Metadata: {:?}", meta);
}

#[tokio::test]
async fn test_extract_text_in_page_order() {
    let path = e2e_skip_unless_ready!(attention_paper());

    let bytes = std::fs::read(&path).unwrap();
    let text = extract_text(bytes.clone(), None).await.expect("extraction should succeed");
    let again = extract_text(bytes, None).await.unwrap();
    assert_eq!(text, again, "extraction must be deterministic");

    assert_eq!(text.page_count(), 15);
    let abstract_at = text.as_str().find("Abstract").expect("abstract present");
    let references_at = text.as_str().rfind("References").expect("references present");
    assert!(abstract_at < references_at, "pages must be concatenated in order");
}

#[tokio::test]
async fn test_inspect_nonexistent() {
    if std::env::var("E2E_ENABLED").is_err() {
        println!("SKIP");
        return;
    }

    let err = inspect("/definitely/not/a/real/file.pdf", &ReviewConfig::default())
        .await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Input);
}

// ── Live generation tests (need GEMINI_API_KEY) ──────────────────────────────

#[tokio::test]
async fn test_summary_of_arxiv_paper() {
    let path = e2e_skip_unless_ready!(attention_paper());
    skip_without_gemini_key!();

    let config = ReviewConfig::builder()
        .summary_char_limit(400)
        .temperature(0.2)
        .build()
        .unwrap();
    let output = analyze(path.to_str().unwrap(), AnalysisMode::Summary, &config)
        .await
        .expect("summary should succeed");

    assert!(!output.text.trim().is_empty());
    assert_eq!(output.stats.generation_calls, 1);
    println!("{}", output.text);
}

#[tokio::test]
async fn test_team_review_reports_three_stages() {
    let path = e2e_skip_unless_ready!(attention_paper());
    skip_without_gemini_key!();

    struct Counter(AtomicUsize);
    impl ReviewProgressCallback for Counter {
        fn on_stage_complete(&self, _stage: usize, _role: Option<Role>, _len: usize) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    let counter = Arc::new(Counter(AtomicUsize::new(0)));
    let config = ReviewConfig::builder()
        .progress_callback(counter.clone() as Arc<dyn ReviewProgressCallback>)
        .build()
        .unwrap();

    let output = analyze(path.to_str().unwrap(), AnalysisMode::TeamReview, &config)
        .await
        .expect("team review should succeed");

    assert_eq!(counter.0.load(Ordering::SeqCst), 3);
    assert_eq!(output.stages.len(), 3);
    assert!(output.metadata.is_some());
    assert!(!output.sections().is_empty());
}

#[tokio::test]
async fn test_invalid_key_is_authentication_error() {
    let path = e2e_skip_unless_ready!(attention_paper());

    let config = ReviewConfig::builder()
        .api_key("definitely-not-a-valid-key")
        .build()
        .unwrap();
    let err = analyze(path.to_str().unwrap(), AnalysisMode::TeamReview, &config)
        .await
        .unwrap_err();

    assert!(err.is_auth(), "expected authentication error, got {err:?}");
}
