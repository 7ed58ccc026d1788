//! CLI binary for doc2tasks.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `AnalysisConfig`, drives a progress bar from the event stream and prints
//! the resulting tasks.

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use doc2tasks::{
    analyze_stream, export_to_file, AnalysisConfig, AnalysisInput, AnalysisResult,
    DocumentFormat, ProgressEvent, Task,
};
use futures::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Deserialize;
use std::io;
use std::path::PathBuf;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

const AFTER_HELP: &str = r#"EXAMPLES:
  # Analyse a PDF and print the tasks as JSON
  doc2tasks analyze requirements.pdf

  # Analyse raw text, show a table
  doc2tasks analyze --text "A marketplace for second-hand bikes" --table

  # Stream every progress event as a JSON line
  doc2tasks analyze spec.docx --events

  # Analyse and export to a spreadsheet
  doc2tasks analyze spec.docx --xlsx backlog.xlsx --sheet Backlog

  # Export a saved result
  doc2tasks export result.json -o tasks.xlsx

ENVIRONMENT VARIABLES:
  OPENAI_API_KEY          OpenAI API key
  ANTHROPIC_API_KEY       Anthropic API key
  GEMINI_API_KEY          Google Gemini API key
  AI_MODEL                Model ID (default: gpt-4)
  EDGEQUAKE_LLM_PROVIDER  Override provider (openai, anthropic, gemini, ollama)
  PDFIUM_LIB_PATH         Path to an existing libpdfium; skips auto-download
"#;

/// Extract structured feature tasks from documents using LLMs.
#[derive(Parser, Debug)]
#[command(
    name = "doc2tasks",
    version,
    about = "Extract structured feature tasks from PDF, DOCX and text documents using LLMs",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "DOC2TASKS_VERBOSE")]
    verbose: bool,

    /// Suppress all output except results and errors.
    #[arg(short, long, global = true, env = "DOC2TASKS_QUIET")]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Analyse a document or text and print the extracted tasks.
    Analyze(AnalyzeArgs),
    /// Write tasks from a JSON file to an .xlsx workbook.
    Export(ExportArgs),
}

#[derive(Args, Debug)]
struct AnalyzeArgs {
    /// PDF, DOCX or text file to analyse.
    #[arg(required_unless_present = "text", conflicts_with = "text")]
    input: Option<PathBuf>,

    /// Analyse this text instead of a file.
    #[arg(long)]
    text: Option<String>,

    /// LLM model ID.
    #[arg(long, env = "AI_MODEL", default_value = doc2tasks::config::DEFAULT_MODEL)]
    model: String,

    /// LLM provider: openai, anthropic, gemini, ollama, azure.
    #[arg(long, env = "EDGEQUAKE_PROVIDER")]
    provider: Option<String>,

    /// LLM temperature (0.0–2.0).
    #[arg(long, env = "DOC2TASKS_TEMPERATURE", default_value_t = 0.7)]
    temperature: f32,

    /// Max LLM output tokens.
    #[arg(long, env = "DOC2TASKS_MAX_TOKENS", default_value_t = 2000)]
    max_tokens: usize,

    /// Path to a text file containing a custom system prompt.
    #[arg(long, env = "DOC2TASKS_SYSTEM_PROMPT")]
    system_prompt: Option<PathBuf>,

    /// LLM call timeout in seconds.
    #[arg(long, env = "DOC2TASKS_API_TIMEOUT", default_value_t = 120)]
    api_timeout: u64,

    /// Print a table instead of JSON.
    #[arg(long, conflicts_with = "events")]
    table: bool,

    /// Print every progress event as a JSON line.
    #[arg(long)]
    events: bool,

    /// Also export the tasks to this .xlsx file.
    #[arg(long)]
    xlsx: Option<PathBuf>,

    /// Worksheet name for --xlsx.
    #[arg(long, requires = "xlsx")]
    sheet: Option<String>,

    /// Disable progress bar.
    #[arg(long, env = "DOC2TASKS_NO_PROGRESS")]
    no_progress: bool,
}

#[derive(Args, Debug)]
struct ExportArgs {
    /// JSON file holding an analysis result or a bare task array.
    input: PathBuf,

    /// Output .xlsx path.
    #[arg(short, long)]
    output: PathBuf,

    /// Worksheet name (non-alphanumerics are stripped).
    #[arg(long)]
    sheet: Option<String>,
}

/// Accepts both `{"tasks": [...], "summary": ...}` and `[...]`.
#[derive(Deserialize)]
#[serde(untagged)]
enum TaskFile {
    Result(AnalysisResult),
    Tasks(Vec<Task>),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar replaces INFO logs; --verbose always wins.
    let bar_active = match cli.command {
        Command::Analyze(ref a) => !cli.quiet && !a.no_progress && !a.events,
        Command::Export(_) => false,
    };
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || bar_active {
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

    match cli.command {
        Command::Analyze(ref args) => run_analyze(args, cli.quiet, bar_active).await,
        Command::Export(ref args) => run_export(args, cli.quiet).await,
    }
}

async fn run_analyze(args: &AnalyzeArgs, quiet: bool, bar_active: bool) -> Result<()> {
    let input = match (&args.input, &args.text) {
        (_, Some(text)) => AnalysisInput::text(text.clone()),
        (Some(path), None) => {
            if DocumentFormat::from_path(path) == Some(DocumentFormat::Pdf) {
                ensure_pdf_engine(quiet)?;
            }
            AnalysisInput::from_path(path)
                .await
                .with_context(|| format!("Failed to read {}", path.display()))?
        }
        (None, None) => bail!("Provide a file or --text"),
    };

    let config = build_config(args).await?;

    // ── Ctrl-C cancels the in-flight call ────────────────────────────────
    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_signal.cancel();
        }
    });

    let bar = if bar_active {
        Some(new_bar())
    } else {
        None
    };

    // ── Consume the event stream ─────────────────────────────────────────
    let mut events = analyze_stream(input, &config, cancel);
    let mut outcome: Option<Result<AnalysisResult>> = None;
    while let Some(event) = events.next().await {
        if args.events {
            println!(
                "{}",
                serde_json::to_string(&event).context("Failed to serialise event")?
            );
        }
        match event {
            ProgressEvent::Progress { progress, message } => {
                if let Some(ref bar) = bar {
                    bar.set_position(progress as u64);
                    bar.set_message(message);
                }
            }
            ProgressEvent::Complete { result } => outcome = Some(Ok(result)),
            ProgressEvent::Error { error, category } => {
                outcome = Some(Err(anyhow::anyhow!("{error} ({category})")));
            }
        }
    }

    let result = match outcome {
        Some(Ok(result)) => {
            if let Some(bar) = bar {
                bar.finish_and_clear();
            }
            result
        }
        Some(Err(e)) => {
            if let Some(bar) = bar {
                bar.abandon();
            }
            return Err(e.context("Analysis failed"));
        }
        None => bail!("Analysis ended without a result"),
    };

    if !quiet && !args.events {
        eprintln!("{} {}", green("✔"), bold(&result.summary));
    }

    if let Some(ref path) = args.xlsx {
        export_to_file(&result.tasks, args.sheet.as_deref(), path)
            .await
            .context("Export failed")?;
        if !quiet {
            eprintln!("   {}", dim(&format!("wrote {}", path.display())));
        }
    }

    if args.table {
        print_table(&result.tasks);
    } else if !args.events {
        println!(
            "{}",
            serde_json::to_string_pretty(&result).context("Failed to serialise result")?
        );
    }
    Ok(())
}

async fn run_export(args: &ExportArgs, quiet: bool) -> Result<()> {
    let raw = tokio::fs::read_to_string(&args.input)
        .await
        .with_context(|| format!("Failed to read {}", args.input.display()))?;
    let tasks = match serde_json::from_str::<TaskFile>(&raw)
        .with_context(|| format!("{} is not a task list", args.input.display()))?
    {
        TaskFile::Result(result) => result.tasks,
        TaskFile::Tasks(tasks) => tasks,
    };

    export_to_file(&tasks, args.sheet.as_deref(), &args.output)
        .await
        .context("Export failed")?;

    if !quiet {
        eprintln!(
            "{} {} tasks  →  {}",
            green("✔"),
            tasks.len(),
            bold(&args.output.display().to_string())
        );
    }
    Ok(())
}

/// Map CLI args to `AnalysisConfig`.
async fn build_config(args: &AnalyzeArgs) -> Result<AnalysisConfig> {
    let mut builder = AnalysisConfig::builder()
        .model(args.model.clone())
        .temperature(args.temperature)
        .max_tokens(args.max_tokens)
        .api_timeout_secs(args.api_timeout);

    if let Some(ref path) = args.system_prompt {
        let prompt = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read system prompt from {:?}", path))?;
        builder = builder.system_prompt(prompt);
    }
    if let Some(ref provider) = args.provider {
        builder = builder.provider_name(provider.clone());
    }

    builder.build().context("Invalid configuration")
}

/// Make sure libpdfium is present, downloading it on first use.
fn ensure_pdf_engine(quiet: bool) -> Result<()> {
    if pdfium_auto::is_pdfium_cached() {
        return Ok(());
    }
    if quiet {
        tokio::task::block_in_place(|| pdfium_auto::ensure_pdfium_library(None))
            .context("Failed to download PDFium engine")?;
        return Ok(());
    }

    let dl_bar = ProgressBar::new(0);
    dl_bar.set_style(
        ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  [{bar:42.green/238}] {bytes}/{total_bytes}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS),
    );
    dl_bar.set_prefix("PDF engine");
    dl_bar.enable_steady_tick(Duration::from_millis(80));

    let bar = dl_bar.clone();
    tokio::task::block_in_place(|| {
        pdfium_auto::ensure_pdfium_library(Some(&|downloaded, total| {
            if let Some(t) = total {
                bar.set_length(t);
            }
            bar.set_position(downloaded);
        }))
    })
    .context("Failed to download PDFium engine")?;

    dl_bar.finish_with_message("ready ✓");
    Ok(())
}

fn new_bar() -> ProgressBar {
    let bar = ProgressBar::new(100);
    bar.set_style(
        ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  [{bar:42.green/238}] {pos:>3}%  {msg}  ⏱ {elapsed_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS),
    );
    bar.set_prefix("Analysing");
    bar.enable_steady_tick(Duration::from_millis(80));
    bar
}

fn print_table(tasks: &[Task]) {
    println!("{}", bold(&format!("{:<10} {:<40} {}", "ID", "TITLE", "DESCRIPTION")));
    for task in tasks {
        println!(
            "{:<10} {:<40} {}",
            task.id,
            clip(&task.title, 40),
            dim(&clip(&task.description, 80))
        );
    }
}

/// Shorten to `max` chars, marking the cut with an ellipsis.
fn clip(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max.saturating_sub(1)).collect();
    out.push('\u{2026}');
    out
}
