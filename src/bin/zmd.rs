//! CLI binary for zmarkdown.
//!
//! A thin shim over the library crate that maps CLI flags to an
//! `EngineConfig`, converts each input and prints or writes the HTML.

use anyhow::{bail, Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use zmarkdown::{
    ConversionObserver, ConversionOutput, ConversionStats, Engine, EngineConfig, ExtensionConfig,
};

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

// ── Batch progress using indicatif ───────────────────────────────────────────

/// One bar tick per finished document. The engine reports through this
/// observer, so failed documents are counted as they happen.
struct BatchProgress {
    bar: ProgressBar,
}

impl BatchProgress {
    fn new(total: usize) -> Arc<Self> {
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  [{bar:42.green/238}] {pos:>3}/{len} files  {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        let bar = ProgressBar::new(total as u64);
        bar.set_style(style);
        bar.set_prefix("Converting");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self { bar })
    }

    fn start_file(&self, path: &Path) {
        self.bar.set_message(path.display().to_string());
    }
}

impl ConversionObserver for BatchProgress {
    fn on_conversion_complete(&self, stats: &ConversionStats) {
        self.bar.println(format!(
            "  {} {:<40}  {}",
            green("✓"),
            self.bar.message(),
            dim(&format!("{} nodes  {}ms", stats.nodes, stats.duration_ms)),
        ));
        self.bar.inc(1);
    }

    fn on_conversion_error(&self, error: &str) {
        let msg = if error.chars().count() > 80 {
            format!("{}\u{2026}", error.chars().take(79).collect::<String>())
        } else {
            error.to_string()
        };
        self.bar.println(format!(
            "  {} {:<40}  {}",
            red("✗"),
            self.bar.message(),
            red(&msg)
        ));
        self.bar.inc(1);
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Convert stdin to stdout
  echo 'Hello *world*' | zmd

  # Convert to file
  zmd post.md -o post.html

  # Community preset (ping, typography, kbd, emoticons, align, ...)
  zmd --zds post.md

  # Pick extensions one by one
  zmd --ext fenced_code --ext toc --ext typography README.md

  # Many files at once, one .html per input
  zmd docs/*.md --out-dir build/

  # JSON output with metadata and statistics
  zmd --json --ext ping --ext toc post.md > post.json

EXTENSIONS:
  fenced_code    ``` fenced code blocks
  comments       strip <--COMMENTS ... COMMENTS--> regions
  align          ->centered<- and ->right-> blocks
  mathjax        $inline$ and $$display$$ math
  ping           @member mentions (metadata key "ping")
  emoticons      :) to images
  kbd            ||Ctrl|| keyboard keys
  header_offset  shift headings down one level
  typography     French typography (nbsp, guillemets, dashes, ...)
  toc            heading anchors (metadata key "toc")

CONFIG FILE (--config):
  {
    "inline": false,
    "tab_length": 4,
    "extensions": [
      { "name": "ping", "url_template": "/members/{}/" },
      { "name": "header_offset", "offset": 2 }
    ]
  }

ENVIRONMENT VARIABLES:
  ZMD_CONFIG       Path to a JSON engine configuration
  ZMD_EXTENSIONS   Comma-separated extension names
  RUST_LOG         Override the log filter (e.g. zmarkdown=debug)
"#;

/// Convert Markdown documents to HTML.
#[derive(Parser, Debug)]
#[command(
    name = "zmd",
    version,
    about = "Convert Markdown documents to HTML",
    long_about = "Convert Markdown documents to HTML with an extensible, stage-based \
translator. Extensions add syntax (mentions, math, alignment, typography, ...) and \
report what they found as JSON metadata.",
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Markdown files to convert. Reads stdin when none (or `-`) is given.
    inputs: Vec<PathBuf>,

    /// Write HTML to this file instead of stdout (single input only).
    #[arg(short, long, env = "ZMD_OUTPUT", conflicts_with = "out_dir")]
    output: Option<PathBuf>,

    /// Write `<name>.html` for every input into this directory.
    #[arg(long, env = "ZMD_OUT_DIR")]
    out_dir: Option<PathBuf>,

    /// JSON engine configuration file.
    #[arg(long, env = "ZMD_CONFIG")]
    config: Option<PathBuf>,

    /// Start from the community preset.
    #[arg(long, env = "ZMD_ZDS", conflicts_with = "config")]
    zds: bool,

    /// Enable an extension with its defaults (repeatable).
    #[arg(long = "ext", env = "ZMD_EXTENSIONS", value_delimiter = ',')]
    extensions: Vec<String>,

    /// Inline mode: single-line content, no block-level syntax.
    #[arg(long, env = "ZMD_INLINE")]
    inline: bool,

    /// Tab stop width (1–16).
    #[arg(long, env = "ZMD_TAB_LENGTH")]
    tab_length: Option<usize>,

    /// Output structured JSON (html, metadata, stats) instead of HTML.
    #[arg(long, env = "ZMD_JSON")]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "ZMD_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "ZMD_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "ZMD_QUIET")]
    quiet: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let batch = cli.inputs.len() > 1;
    let show_progress = batch && !cli.quiet && !cli.no_progress && !cli.verbose;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    if batch && cli.output.is_some() {
        bail!("--output takes a single input; use --out-dir for several files");
    }

    let progress = show_progress.then(|| BatchProgress::new(cli.inputs.len()));
    let config = build_config(&cli, progress.clone())?;
    let mut engine = Engine::from_config(&config).context("Invalid configuration")?;

    // ── stdin → stdout ───────────────────────────────────────────────────
    if cli.inputs.is_empty() || (cli.inputs.len() == 1 && cli.inputs[0] == Path::new("-")) {
        let mut source = String::new();
        io::stdin()
            .read_to_string(&mut source)
            .context("Failed to read stdin")?;
        let output = engine.convert(&source).context("Conversion failed")?;
        return emit(&cli, &output, None);
    }

    // ── Files ────────────────────────────────────────────────────────────
    let mut failed = 0usize;
    for input in &cli.inputs {
        if let Some(p) = &progress {
            p.start_file(input);
        }
        let result = std::fs::read_to_string(input)
            .with_context(|| format!("Failed to read {}", input.display()))
            .and_then(|source| {
                engine
                    .convert(&source)
                    .with_context(|| format!("Conversion of {} failed", input.display()))
            });
        match result {
            Ok(output) => {
                let target = target_path(&cli, input);
                emit(&cli, &output, target.as_deref())?;
            }
            Err(e) if batch => {
                failed += 1;
                if progress.is_none() {
                    eprintln!("{} {e:#}", red("✗"));
                }
            }
            Err(e) => return Err(e),
        }
    }

    if let Some(p) = &progress {
        p.bar.finish_and_clear();
    }
    if batch && !cli.quiet {
        let done = cli.inputs.len() - failed;
        eprintln!(
            "{} {} of {} files converted",
            if failed == 0 { green("✔") } else { red("✘") },
            bold(&done.to_string()),
            cli.inputs.len()
        );
    }
    if failed > 0 {
        bail!("{failed} file(s) failed to convert");
    }
    Ok(())
}

/// Map CLI args to `EngineConfig`.
fn build_config(cli: &Cli, progress: Option<Arc<BatchProgress>>) -> Result<EngineConfig> {
    let mut config = if let Some(path) = &cli.config {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;
        EngineConfig::from_json(&json)
            .with_context(|| format!("Invalid config file {}", path.display()))?
    } else if cli.zds {
        EngineConfig::zds(cli.inline)
    } else {
        EngineConfig::default()
    };

    for name in &cli.extensions {
        let name = name.trim();
        if name.is_empty() || config.extensions.iter().any(|e| e.name() == name) {
            continue;
        }
        config
            .extensions
            .push(ExtensionConfig::from_name(name).context("Unknown --ext")?);
    }

    let mut builder = EngineConfig::builder()
        .extensions(config.extensions)
        .inline(config.inline || cli.inline)
        .tab_length(cli.tab_length.unwrap_or(config.tab_length));
    if let Some(p) = progress {
        builder = builder.observer(p);
    }
    builder.build().context("Invalid configuration")
}

/// Where the HTML for `input` goes, `None` meaning stdout.
fn target_path(cli: &Cli, input: &Path) -> Option<PathBuf> {
    if let Some(dir) = &cli.out_dir {
        let stem = input.file_stem().unwrap_or(input.as_os_str());
        let ext = if cli.json { "json" } else { "html" };
        return Some(dir.join(stem).with_extension(ext));
    }
    cli.output.clone()
}

fn emit(cli: &Cli, output: &ConversionOutput, target: Option<&Path>) -> Result<()> {
    let mut body = if cli.json {
        serde_json::to_string_pretty(output).context("Failed to serialise output")?
    } else {
        output.html.clone()
    };
    if !body.ends_with('\n') {
        body.push('\n');
    }

    match target {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }
            let tmp = path.with_extension("tmp");
            std::fs::write(&tmp, &body)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            std::fs::rename(&tmp, path)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            if !cli.quiet && cli.inputs.len() <= 1 {
                eprintln!(
                    "{}  {} nodes  {}ms  →  {}",
                    green("✔"),
                    output.stats.nodes,
                    output.stats.duration_ms,
                    bold(&path.display().to_string()),
                );
            }
        }
        None => {
            let stdout = io::stdout();
            let mut handle = stdout.lock();
            handle
                .write_all(body.as_bytes())
                .context("Failed to write to stdout")?;
        }
    }
    Ok(())
}
