//! CLI binary for edgequake-paper-review.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `ReviewConfig` and prints results.

use anyhow::{Context, Result};
use clap::Parser;
use edgequake_paper_review::output::split_sections;
use edgequake_paper_review::pipeline::postprocess::strip_outer_fence;
use edgequake_paper_review::{
    analyze, analyze_to_file, inspect, AnalysisMode, ProgressCallback,
    ReviewConfig, ReviewProgressCallback, Role,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: a spinner while a stage is in flight and one
/// log line per finished stage.
struct CliProgressCallback {
    bar: ProgressBar,
    /// Start time of the stage currently running.
    stage_started: Mutex<Option<Instant>>,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}  ⏱ {elapsed}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);

        bar.set_style(style);
        bar.set_prefix("Preparing");
        bar.set_message("Extracting text…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            stage_started: Mutex::new(None),
        })
    }

    /// Remove the spinner line if no stage event has done so yet.
    fn clear(&self) {
        if !self.bar.is_finished() {
            self.bar.finish_and_clear();
        }
    }

    fn stage_elapsed(&self) -> f64 {
        self.stage_started
            .lock()
            .ok()
            .and_then(|mut t| t.take())
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }
}

fn stage_label(role: Option<Role>) -> String {
    match role {
        Some(r) => format!("{r} ({})", r.task()),
        None => "analysis".to_string(),
    }
}

impl ReviewProgressCallback for CliProgressCallback {
    fn on_analysis_start(&self, total_stages: usize, text_len: usize) {
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!(
                "Analysing {text_len} chars of text in {total_stages} stage(s)…"
            ))
        ));
    }

    fn on_stage_start(&self, stage: usize, role: Option<Role>) {
        if let Ok(mut t) = self.stage_started.lock() {
            *t = Some(Instant::now());
        }
        self.bar.set_prefix(format!("Stage {stage}"));
        self.bar.set_message(stage_label(role));
    }

    fn on_stage_complete(&self, stage: usize, role: Option<Role>, output_len: usize) {
        let secs = self.stage_elapsed();
        self.bar.println(format!(
            "  {} Stage {}  {:<28}  {:<8}  {}",
            green("✓"),
            stage,
            stage_label(role),
            dim(&format!("{output_len:>5} chars")),
            dim(&format!("{secs:.1}s")),
        ));
    }

    fn on_stage_error(&self, stage: usize, role: Option<Role>, error: &str) {
        let secs = self.stage_elapsed();
        let msg: String = if error.chars().count() > 80 {
            error.chars().take(79).chain(['\u{2026}']).collect()
        } else {
            error.to_string()
        };
        self.bar.println(format!(
            "  {} Stage {}  {:<28}  {}  {}",
            red("✗"),
            stage,
            stage_label(role),
            red(&msg),
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.finish_and_clear();
    }

    fn on_analysis_complete(&self, total_stages: usize) {
        self.bar.finish_and_clear();
        eprintln!(
            "{} {} stage(s) completed",
            green("✔"),
            bold(&total_stages.to_string())
        );
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Team review (sam drafts, jenny simplifies, will finalises)
  paper-review paper.pdf

  # Short summary
  paper-review --mode summary paper.pdf

  # Ask a question
  paper-review --question "What dataset was used?" paper.pdf

  # Analyse a paper from a URL and save the report
  paper-review https://arxiv.org/pdf/1706.03762 -o attention-review.md

  # Use another provider through edgequake-llm
  paper-review --provider openai --model gpt-4.1-mini paper.pdf

  # Inspect PDF metadata (no API key needed)
  paper-review --inspect-only paper.pdf

  # JSON output with per-stage records
  paper-review --json paper.pdf > review.json

MODES:
  team review        3 calls: key points → plain language → final report
  summary            1 call, bounded by --summary-chars
  methodology        1 call
  results analysis   1 call
  question           1 call, requires --question

ENVIRONMENT VARIABLES:
  GEMINI_API_KEY          Google Gemini API key (default provider)
  GOOGLE_API_KEY          Fallback for GEMINI_API_KEY
  EDGEQUAKE_LLM_PROVIDER  Provider for edgequake-llm (openai, anthropic, ollama, …)
  EDGEQUAKE_MODEL         Model ID
  PDFIUM_LIB_PATH         Path to libpdfium (file or directory)
  RUST_LOG                Log filter, e.g. edgequake_paper_review=debug
"#;

/// Analyse research papers in PDF form with a generation model.
#[derive(Parser, Debug)]
#[command(
    name = "paper-review",
    version,
    about = "Analyse research papers (PDF files or URLs) with an LLM",
    long_about = "Extract the text of a research paper and run it through a fixed prompt: \
a three-persona team review, a summary, a methodology or results analysis, or a free-form \
question. Uses Google Gemini by default; any edgequake-llm provider works via --provider.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local PDF file path or HTTP/HTTPS URL.
    input: String,

    /// Analysis mode: team review, summary, methodology, results analysis, question.
    #[arg(short, long, env = "PAPER_REVIEW_MODE", default_value = "team review")]
    mode: String,

    /// Question to answer (implies --mode question).
    #[arg(long)]
    question: Option<String>,

    /// Gemini API key.
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Model ID (default: gemini-2.0-flash).
    #[arg(long, env = "EDGEQUAKE_MODEL")]
    model: Option<String>,

    /// Provider routed through edgequake-llm: gemini, openai, anthropic, ollama, …
    #[arg(long, env = "EDGEQUAKE_PROVIDER")]
    provider: Option<String>,

    /// Write the final text to this file instead of stdout.
    #[arg(short, long, env = "PAPER_REVIEW_OUTPUT")]
    output: Option<PathBuf>,

    /// Drop a ```markdown fence wrapping the whole reply (stdout only).
    #[arg(long, env = "PAPER_REVIEW_STRIP_FENCES")]
    strip_fences: bool,

    /// Output structured JSON (AnalysisOutput) instead of text.
    #[arg(long, env = "PAPER_REVIEW_JSON")]
    json: bool,

    /// Print PDF metadata only, no analysis.
    #[arg(long)]
    inspect_only: bool,

    /// PDF user password for encrypted documents.
    #[arg(long, env = "PAPER_REVIEW_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Sampling temperature (0.0–2.0).
    #[arg(long, env = "PAPER_REVIEW_TEMPERATURE", default_value_t = 0.7)]
    temperature: f32,

    /// Max output tokens per generation call.
    #[arg(long, env = "PAPER_REVIEW_MAX_TOKENS", default_value_t = 8192)]
    max_tokens: usize,

    /// Character budget for summary mode.
    #[arg(long, env = "PAPER_REVIEW_SUMMARY_CHARS", default_value_t = 500)]
    summary_chars: usize,

    /// HTTP download timeout in seconds.
    #[arg(long, env = "PAPER_REVIEW_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,

    /// Per-call generation timeout in seconds.
    #[arg(long, env = "PAPER_REVIEW_API_TIMEOUT", default_value_t = 120)]
    api_timeout: u64,

    /// Disable the progress spinner.
    #[arg(long, env = "PAPER_REVIEW_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "PAPER_REVIEW_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "PAPER_REVIEW_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The spinner gives all the feedback that matters; keep library INFO
    // logs out of its way unless asked for.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json && !cli.inspect_only;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let spinner = show_progress.then(CliProgressCallback::new);

    // Every failure, whatever its kind, ends in the same message.
    match run(cli, spinner.clone()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if let Some(ref s) = spinner {
                s.clear();
            }
            eprintln!("{} Analysis failed: {e:#}", red("✘"));
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli, spinner: Option<Arc<CliProgressCallback>>) -> Result<()> {
    let progress_cb: Option<ProgressCallback> =
        spinner.map(|s| s as Arc<dyn ReviewProgressCallback>);
    let config = build_config(&cli, progress_cb)?;

    // ── Inspect-only mode ────────────────────────────────────────────────
    if cli.inspect_only {
        let meta = inspect(&cli.input, &config).await?;

        if cli.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&meta).context("Failed to serialize metadata")?
            );
        } else {
            println!("File:         {}", cli.input);
            if let Some(ref t) = meta.title {
                println!("Title:        {}", t);
            }
            if let Some(ref a) = meta.author {
                println!("Author:       {}", a);
            }
            if let Some(ref s) = meta.subject {
                println!("Subject:      {}", s);
            }
            println!("Pages:        {}", meta.page_count);
            println!("PDF Version:  {}", meta.pdf_version);
            if let Some(ref p) = meta.producer {
                println!("Producer:     {}", p);
            }
            if let Some(ref c) = meta.creator {
                println!("Creator:      {}", c);
            }
        }
        return Ok(());
    }

    let mode = parse_mode(&cli)?;

    // ── Run analysis ─────────────────────────────────────────────────────
    let output = match cli.output {
        Some(ref path) => {
            let output = analyze_to_file(&cli.input, path, mode, &config).await?;
            if !cli.quiet {
                eprintln!(
                    "{}  {}  →  {}",
                    green("✔"),
                    output.mode,
                    bold(&path.display().to_string()),
                );
            }
            output
        }
        None => {
            let output = analyze(&cli.input, mode, &config).await?;
            if cli.json {
                let json =
                    serde_json::to_string_pretty(&output).context("Failed to serialise output")?;
                println!("{json}");
            } else {
                let text = if cli.strip_fences {
                    strip_outer_fence(&output.text)
                } else {
                    output.text.as_str()
                };
                print_sections(&output.mode, text)?;
            }
            output
        }
    };

    if !cli.quiet && !cli.json {
        eprintln!(
            "   {} calls  ·  {} tokens in  /  {} tokens out  —  {}ms total",
            output.stats.generation_calls,
            dim(&output.stats.total_input_tokens.to_string()),
            dim(&output.stats.total_output_tokens.to_string()),
            output.stats.total_duration_ms,
        );
    }

    Ok(())
}

/// Resolve `--mode` and `--question` into an [`AnalysisMode`].
fn parse_mode(cli: &Cli) -> Result<AnalysisMode> {
    let mode: AnalysisMode = match cli.question {
        Some(ref q) => AnalysisMode::Question(q.clone()),
        None => cli.mode.parse()?,
    };
    mode.validate()?;
    Ok(mode)
}

/// Map CLI args to `ReviewConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<ReviewConfig> {
    let mut builder = ReviewConfig::builder()
        .temperature(cli.temperature)
        .max_tokens(cli.max_tokens)
        .summary_char_limit(cli.summary_chars)
        .download_timeout_secs(cli.download_timeout)
        .api_timeout_secs(cli.api_timeout);

    if let Some(ref key) = cli.api_key {
        builder = builder.api_key(key);
    }
    if let Some(ref model) = cli.model {
        builder = builder.model(model);
    }
    if let Some(ref provider) = cli.provider {
        builder = builder.provider_name(provider);
    }
    if let Some(ref pwd) = cli.password {
        builder = builder.password(pwd);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    Ok(builder.build()?)
}

/// Print the final text one section at a time, with a divider between
/// team review sections.
fn print_sections(mode: &AnalysisMode, text: &str) -> Result<()> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();

    if *mode != AnalysisMode::TeamReview {
        handle
            .write_all(text.as_bytes())
            .context("Failed to write to stdout")?;
        if !text.ends_with('\n') {
            handle.write_all(b"\n").ok();
        }
        return Ok(());
    }

    let sections = split_sections(text);
    for (i, section) in sections.iter().enumerate() {
        writeln!(handle, "{section}").context("Failed to write to stdout")?;
        if i + 1 < sections.len() {
            writeln!(handle, "{}", dim("────────────────────────────────────────"))
                .context("Failed to write to stdout")?;
        }
    }
    Ok(())
}
