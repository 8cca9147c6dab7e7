//! CLI binary for paperglance.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `TranslationConfig`, writes the raw and translated Markdown files and
//! prints a summary.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use paperglance::pipeline::input::resolve_input;
use paperglance::{
    convert_to_files, translate_file, PageSelection, PageSeparator, ProgressCallback,
    TranslationConfig, TranslationOutput, TranslationProgressCallback,
};
use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
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

const SPINNER: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: a spinner during OCR, then a bar over chunks
/// with one log line per finished chunk.
struct CliProgressCallback {
    bar: ProgressBar,
    start_times: Mutex<HashMap<usize, Instant>>,
}

impl CliProgressCallback {
    /// Spinner-only until `on_translation_start` reports the chunk count.
    fn new_dynamic(message: &str) -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(SPINNER);

        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message(message.to_string());
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            start_times: Mutex::new(HashMap::new()),
        })
    }

    fn activate_bar(&self, total: usize) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} chunks  \
             ⏱ {elapsed_precise}  ETA {eta_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(SPINNER);

        self.bar.set_length(total as u64);
        self.bar.set_style(progress_style);
        self.bar.set_prefix("Translating");
        self.bar.reset_eta();
    }

    fn elapsed_secs(&self, chunk: usize) -> f64 {
        self.start_times
            .lock()
            .ok()
            .and_then(|mut m| m.remove(&chunk))
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }
}

impl TranslationProgressCallback for CliProgressCallback {
    fn on_translation_start(&self, total_chunks: usize) {
        self.activate_bar(total_chunks);
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Translating {total_chunks} chunks…"))
        ));
    }

    fn on_chunk_start(&self, chunk: usize, _total: usize) {
        if let Ok(mut m) = self.start_times.lock() {
            m.insert(chunk, Instant::now());
        }
        self.bar.set_message(format!("chunk {chunk}"));
    }

    fn on_chunk_complete(&self, chunk: usize, total: usize, translated_len: usize) {
        let secs = self.elapsed_secs(chunk);
        self.bar.println(format!(
            "  {} Chunk {:>3}/{:<3}  {:<8}  {}",
            green("✓"),
            chunk,
            total,
            dim(&format!("{translated_len:>6} bytes")),
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_chunk_error(&self, chunk: usize, total: usize, error: &str) {
        let secs = self.elapsed_secs(chunk);

        let msg: String = if error.chars().count() > 80 {
            format!("{}\u{2026}", error.chars().take(79).collect::<String>())
        } else {
            error.to_string()
        };

        self.bar.println(format!(
            "  {} Chunk {:>3}/{:<3}  {}  {}",
            red("✗"),
            chunk,
            total,
            red(&msg),
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_translation_complete(&self, total_chunks: usize, translated: usize) {
        let failed = total_chunks.saturating_sub(translated);
        self.bar.finish_and_clear();

        if failed == 0 {
            eprintln!(
                "{} {} chunks translated",
                green("✔"),
                bold(&translated.to_string())
            );
        } else {
            eprintln!(
                "{} {}/{} chunks translated  ({} kept original text)",
                if failed == total_chunks {
                    red("✘")
                } else {
                    cyan("⚠")
                },
                bold(&translated.to_string()),
                total_chunks,
                red(&failed.to_string()),
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # OCR and translate into output/paper.md + output/paper_translated.md
  paperglance paper.pdf

  # Straight from arXiv, into German
  paperglance https://arxiv.org/pdf/1706.03762 --target-lang German

  # Re-translate an existing OCR result without calling OCR again
  paperglance --from-markdown output/paper.md -o output/paper_ko.md --target-lang Korean

  # Smaller chunks, four requests in flight, two retries per chunk
  paperglance paper.pdf --token-budget 4000 --concurrency 4 --max-retries 2

  # Only the first five pages, JSON summary on stdout
  paperglance paper.pdf --pages 1-5 --json > run.json

ENVIRONMENT VARIABLES:
  MISTRALAI_API_KEY       Mistral API key for OCR (MISTRAL_API_KEY also accepted)
  OPENAI_API_KEY          OpenAI API key (default translator)
  ANTHROPIC_API_KEY       Anthropic API key
  GEMINI_API_KEY          Google Gemini API key
  EDGEQUAKE_LLM_PROVIDER  Override provider (openai, anthropic, gemini, ollama)
  EDGEQUAKE_MODEL         Override model ID

  Variables may also be placed in a .env file in the working directory.
"#;

/// Translate scanned PDF papers into Markdown via OCR and an LLM.
#[derive(Parser, Debug)]
#[command(
    name = "paperglance",
    version,
    about = "Translate scanned PDF papers into Markdown via OCR and an LLM",
    long_about = "OCR a PDF (local file or URL) with Mistral OCR, then translate the resulting \
Markdown chunk by chunk with any chat LLM. Headings, figures and the reference list are kept \
in place; chunks that fail to translate keep their original text.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local PDF file path or HTTP/HTTPS URL (a Markdown file with --from-markdown).
    input: String,

    /// Directory for default output files.
    #[arg(long, env = "PAPERGLANCE_OUTPUT_DIR", default_value = "output")]
    output_dir: PathBuf,

    /// Translated Markdown path. Default: <output-dir>/<stem>_translated.md.
    #[arg(short, long, env = "PAPERGLANCE_OUTPUT")]
    output: Option<PathBuf>,

    /// Raw OCR Markdown path. Default: <output-dir>/<stem>.md.
    #[arg(long, env = "PAPERGLANCE_RAW_OUTPUT")]
    raw_output: Option<PathBuf>,

    /// Treat INPUT as Markdown and skip OCR.
    #[arg(long, env = "PAPERGLANCE_FROM_MARKDOWN")]
    from_markdown: bool,

    /// Translation model ID (e.g. gpt-4o-mini, gpt-4.1, claude-sonnet-4-20250514).
    #[arg(long, env = "EDGEQUAKE_MODEL")]
    model: Option<String>,

    /// LLM provider: openai, anthropic, gemini, ollama, azure.
    #[arg(long, env = "EDGEQUAKE_PROVIDER")]
    provider: Option<String>,

    /// Language of the document.
    #[arg(long, env = "PAPERGLANCE_SOURCE_LANG", default_value = "English")]
    source_lang: String,

    /// Language to translate into.
    #[arg(long, env = "PAPERGLANCE_TARGET_LANG", default_value = "Japanese")]
    target_lang: String,

    /// Maximum tokens per translation chunk.
    #[arg(long, env = "PAPERGLANCE_TOKEN_BUDGET", default_value_t = paperglance::config::DEFAULT_TOKEN_BUDGET)]
    token_budget: usize,

    /// Number of chunks translated at once.
    #[arg(short, long, env = "PAPERGLANCE_CONCURRENCY", default_value_t = 1)]
    concurrency: usize,

    /// Retries per chunk on LLM failure.
    #[arg(long, env = "PAPERGLANCE_MAX_RETRIES", default_value_t = 0)]
    max_retries: u32,

    /// Per-chunk LLM call timeout in seconds.
    #[arg(long, env = "PAPERGLANCE_CHUNK_TIMEOUT")]
    chunk_timeout: Option<u64>,

    /// Page selection: all, 5, 3-15, or 1,3,5,7.
    #[arg(long, env = "PAPERGLANCE_PAGES", default_value = "all")]
    pages: String,

    /// Page separator: none, hr, comment, or custom string.
    #[arg(long, env = "PAPERGLANCE_SEPARATOR", default_value = "none")]
    separator: String,

    /// Path to a text file containing a custom translation instruction.
    #[arg(long, env = "PAPERGLANCE_SYSTEM_PROMPT")]
    system_prompt: Option<PathBuf>,

    /// LLM temperature (0.0–2.0).
    #[arg(long, env = "PAPERGLANCE_TEMPERATURE", default_value_t = 0.1)]
    temperature: f32,

    /// Max LLM output tokens per chunk.
    #[arg(long, env = "PAPERGLANCE_MAX_TOKENS", default_value_t = 16384)]
    max_tokens: usize,

    /// Mistral OCR model.
    #[arg(long, env = "PAPERGLANCE_OCR_MODEL", default_value = paperglance::config::DEFAULT_OCR_MODEL)]
    ocr_model: String,

    /// Print the full run output (TranslationOutput) as JSON on stdout.
    #[arg(long, env = "PAPERGLANCE_JSON")]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "PAPERGLANCE_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "PAPERGLANCE_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "PAPERGLANCE_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // Library INFO logs would tear the progress bar, so only errors are
    // shown while it is active.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
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

    // ── Build config ─────────────────────────────────────────────────────
    let progress_cb: Option<ProgressCallback> = if show_progress {
        let message = if cli.from_markdown {
            "Reading Markdown…"
        } else {
            "Running OCR…"
        };
        Some(CliProgressCallback::new_dynamic(message) as Arc<dyn TranslationProgressCallback>)
    } else {
        None
    };

    let config = build_config(&cli, progress_cb).await?;

    // ── Run ──────────────────────────────────────────────────────────────
    let (output, written) = if cli.from_markdown {
        let input = Path::new(&cli.input);
        let translated_path = cli
            .output
            .clone()
            .unwrap_or_else(|| default_path(&cli.output_dir, &file_stem(input), "_translated"));
        let output = translate_file(input, &translated_path, &config)
            .await
            .context("Translation failed")?;
        (output, vec![translated_path])
    } else {
        let stem = resolve_input(&cli.input)
            .with_context(|| format!("Cannot read input '{}'", cli.input))?
            .stem();
        let raw_path = cli
            .raw_output
            .clone()
            .unwrap_or_else(|| default_path(&cli.output_dir, &stem, ""));
        let translated_path = cli
            .output
            .clone()
            .unwrap_or_else(|| default_path(&cli.output_dir, &stem, "_translated"));
        let output = convert_to_files(&cli.input, &raw_path, &translated_path, &config)
            .await
            .context("Translation run failed")?;
        (output, vec![raw_path, translated_path])
    };

    if cli.json {
        let json = serde_json::to_string_pretty(&output).context("Failed to serialise output")?;
        println!("{json}");
    }

    if !cli.quiet {
        print_summary(&output, &written, show_progress);
    }

    Ok(())
}

fn print_summary(output: &TranslationOutput, written: &[PathBuf], show_progress: bool) {
    let stats = &output.stats;
    if !show_progress {
        eprintln!(
            "Translated {}/{} chunks in {}ms",
            stats.translated_chunks, stats.total_chunks, stats.total_duration_ms
        );
        if stats.failed_chunks > 0 {
            eprintln!("  {} chunks kept their original text", stats.failed_chunks);
        }
    }
    if stats.lost_images > 0 {
        eprintln!(
            "{} {} of {} images lost their placeholder during translation",
            cyan("⚠"),
            stats.lost_images,
            stats.images
        );
    }
    for path in written {
        eprintln!("   →  {}", bold(&path.display().to_string()));
    }
    eprintln!(
        "   {} tokens in  /  {} tokens out  —  {}ms total",
        dim(&stats.total_input_tokens.to_string()),
        dim(&stats.total_output_tokens.to_string()),
        stats.total_duration_ms,
    );
}

/// Map CLI args to `TranslationConfig`.
async fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<TranslationConfig> {
    let mut builder = TranslationConfig::builder()
        .source_language(&cli.source_lang)
        .target_language(&cli.target_lang)
        .token_budget(cli.token_budget)
        .concurrency(cli.concurrency)
        .max_retries(cli.max_retries)
        .pages(parse_pages(&cli.pages)?)
        .page_separator(parse_separator(&cli.separator))
        .temperature(cli.temperature)
        .max_tokens(cli.max_tokens)
        .ocr_model(&cli.ocr_model);

    if let Some(ref path) = cli.system_prompt {
        let prompt = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read system prompt from {:?}", path))?;
        builder = builder.system_prompt(prompt);
    }
    if let Some(ref model) = cli.model {
        builder = builder.model(model);
    }
    if let Some(ref provider) = cli.provider {
        builder = builder.provider_name(provider);
    }
    if let Some(secs) = cli.chunk_timeout {
        builder = builder.chunk_timeout_secs(secs);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

fn default_path(dir: &Path, stem: &str, suffix: &str) -> PathBuf {
    dir.join(format!("{stem}{suffix}.md"))
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document".to_string())
}

/// Parse `--pages` string into `PageSelection`.
fn parse_pages(s: &str) -> Result<PageSelection> {
    let s = s.trim().to_lowercase();

    if s == "all" {
        return Ok(PageSelection::All);
    }

    // Range: "3-15"
    if let Some((start, end)) = s.split_once('-') {
        let start: usize = start
            .trim()
            .parse()
            .context("Invalid start page in range")?;
        let end: usize = end.trim().parse().context("Invalid end page in range")?;

        if start < 1 {
            anyhow::bail!("Pages are 1-indexed, minimum is 1 (got {})", start);
        }
        if start > end {
            anyhow::bail!("Invalid page range '{}-{}': start must be <= end", start, end);
        }
        return Ok(PageSelection::Range(start, end));
    }

    // Set: "1,3,5,7"
    if s.contains(',') {
        let pages: Vec<usize> = s
            .split(',')
            .map(|p| {
                p.trim()
                    .parse::<usize>()
                    .with_context(|| format!("Invalid page number: '{}'", p.trim()))
            })
            .collect::<Result<Vec<_>>>()?;

        if let Some(&p) = pages.iter().find(|&&p| p < 1) {
            anyhow::bail!("Pages are 1-indexed, minimum is 1 (got {})", p);
        }
        return Ok(PageSelection::Set(pages));
    }

    // Single page: "5"
    let page: usize = s.parse().context("Invalid page number")?;
    if page < 1 {
        anyhow::bail!("Pages are 1-indexed, minimum is 1 (got {})", page);
    }
    Ok(PageSelection::Single(page))
}

/// Parse `--separator` string into `PageSeparator`.
fn parse_separator(s: &str) -> PageSeparator {
    match s.to_lowercase().as_str() {
        "none" => PageSeparator::None,
        "hr" | "---" => PageSeparator::HorizontalRule,
        "comment" => PageSeparator::Comment,
        _ => PageSeparator::Custom(s.to_string()),
    }
}
