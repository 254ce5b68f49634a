use anyhow::{Context, Result};
use chrono::Local;
use clap::{Args, Parser, Subcommand};
use dialoguer::Confirm;
use indicatif::{ProgressBar, ProgressStyle};
use log::LevelFilter;
use photodedup::{
    DuplicateScanner, FingerprintProvider, HashAlgorithm, ImageFingerprinter, ScanConfig,
    ScanEvent,
};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::atomic::Ordering;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

#[derive(Parser, Debug)]
#[command(name = "photodedup", version, about = "Find and remove duplicate photos")]
struct Cli {
    /// Diagnostic log level (off, error, warn, info, debug, trace)
    #[arg(long, global = true, default_value = "warn")]
    log_level: LevelFilter,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Duplicate workflows
    Duplicates {
        #[command(subcommand)]
        command: Dups,
    },

    /// Print the digests of a single image
    Fingerprint {
        /// Image to fingerprint
        #[arg(short, long, value_name = "FILE")]
        path: PathBuf,
        /// Perceptual hash algorithm
        #[arg(long, value_enum, default_value_t = HashAlgorithm::Dct)]
        algorithm: HashAlgorithm,
    },

    /// Inspect configuration
    Config {
        #[command(subcommand)]
        command: ConfigCmd,
    },
}

#[derive(Subcommand, Debug)]
enum Dups {
    /// Find and report exact and near duplicates
    Scan {
        #[command(flatten)]
        opts: ScanArgs,
    },

    /// Permanently delete every duplicate, keeping the first-seen original
    Delete {
        #[command(flatten)]
        opts: ScanArgs,
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCmd {
    /// Print the effective configuration as JSON
    Show {
        /// Config file (default: per-user config file, if any)
        #[arg(long, value_name = "FILE")]
        config: Option<PathBuf>,
    },
}

#[derive(Args, Debug)]
struct ScanArgs {
    /// Directory to scan
    #[arg(short, long, value_name = "DIR")]
    path: PathBuf,
    /// Hamming distance below which two images count as near duplicates
    #[arg(long)]
    threshold: Option<u32>,
    /// Fingerprinting threads
    #[arg(long)]
    workers: Option<usize>,
    /// Perceptual hash algorithm
    #[arg(long, value_enum)]
    algorithm: Option<HashAlgorithm>,
    /// Glob of paths to leave out (repeatable)
    #[arg(long, value_name = "GLOB")]
    exclude: Vec<String>,
    /// Follow symbolic links while walking
    #[arg(long)]
    follow_links: bool,
    /// Config file (default: per-user config file, if any)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,
    /// Print events as JSON lines instead of log lines
    #[arg(long)]
    json: bool,
}

impl ScanArgs {
    /// Config file values with command-line overrides applied
    fn resolve_config(&self) -> Result<ScanConfig> {
        let mut config = ScanConfig::load_or_default(self.config.as_deref())
            .context("Failed to load configuration")?;
        if let Some(threshold) = self.threshold {
            config.threshold = threshold;
        }
        if let Some(workers) = self.workers {
            config.workers = workers;
        }
        if let Some(algorithm) = self.algorithm {
            config.algorithm = algorithm;
        }
        if self.follow_links {
            config.follow_links = true;
        }
        config.exclude_patterns.extend(self.exclude.iter().cloned());
        config.validate().context("Invalid configuration")?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    env_logger::builder()
        .filter_level(cli.log_level)
        .format_timestamp_secs()
        .init();

    match cli.command {
        Commands::Duplicates { command } => match command {
            Dups::Scan { opts } => run_scan(&opts, false).await,

            Dups::Delete { opts, yes } => {
                if !yes {
                    let confirmed = Confirm::new()
                        .with_prompt(format!(
                            "Permanently delete duplicate images under {}?",
                            opts.path.display()
                        ))
                        .default(false)
                        .interact()
                        .context("Failed to read confirmation")?;
                    if !confirmed {
                        println!("Aborted; no files were changed.");
                        return Ok(ExitCode::SUCCESS);
                    }
                }
                run_scan(&opts, true).await
            }
        },

        Commands::Fingerprint { path, algorithm } => {
            let fingerprinter = ImageFingerprinter::new(algorithm);
            let exact = fingerprinter
                .exact_digest_of(&path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            let perceptual = fingerprinter
                .perceptual_digest_of(&path)
                .with_context(|| format!("Failed to decode {}", path.display()))?;
            println!("{}", path.display());
            println!("  exact:      {}", exact);
            println!("  perceptual: {} ({})", perceptual, fingerprinter.algorithm());
            Ok(ExitCode::SUCCESS)
        }

        Commands::Config { command } => match command {
            ConfigCmd::Show { config } => {
                let config = ScanConfig::load_or_default(config.as_deref())
                    .context("Failed to load configuration")?;
                println!("{}", serde_json::to_string_pretty(&config)?);
                Ok(ExitCode::SUCCESS)
            }
        },
    }
}

/// Run the scan on a blocking worker and render its events as they arrive.
async fn run_scan(opts: &ScanArgs, delete_duplicates: bool) -> Result<ExitCode> {
    let config = opts.resolve_config()?;
    let (tx, mut rx) = mpsc::unbounded_channel();
    let scanner = DuplicateScanner::new(config).with_event_sender(tx);

    let token = scanner.get_cancellation_token();
    ctrlc::set_handler(move || {
        token.store(true, Ordering::Relaxed);
        eprintln!("\nInterrupted, stopping after the current file...");
    })
    .context("Failed to set signal handler")?;

    let root = opts.path.clone();
    let start = Instant::now();
    let worker = tokio::task::spawn_blocking(move || scanner.scan(&root, delete_duplicates));

    let mut renderer = EventRenderer::new(opts.json);
    let mut success = false;
    while let Some(event) = rx.recv().await {
        if let ScanEvent::Finished { success: ok, .. } = &event {
            success = *ok;
        }
        renderer.render(&event)?;
    }

    if let Err(e) = worker.await.context("Scan worker panicked")? {
        log::debug!("Scan returned error: {:?}", e);
    }
    if !opts.json {
        println!("⏱ Scan took {:.2?}", start.elapsed());
    }

    Ok(if success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

/// Turns scan events into terminal output
struct EventRenderer {
    json: bool,
    progress: Option<ProgressBar>,
}

impl EventRenderer {
    fn new(json: bool) -> Self {
        Self {
            json,
            progress: None,
        }
    }

    fn render(&mut self, event: &ScanEvent) -> Result<()> {
        if self.json {
            println!("{}", serde_json::to_string(event)?);
            return Ok(());
        }

        match event {
            ScanEvent::Started { .. } => {
                let spinner = ProgressBar::new_spinner();
                spinner.set_style(ProgressStyle::with_template("{spinner:.green} {msg}")?);
                spinner.set_message("Scanning for images…");
                spinner.enable_steady_tick(Duration::from_millis(100));
                self.progress = Some(spinner);
                self.line(&format!("▶ {}", event));
            }
            ScanEvent::Discovered { total } => {
                if let Some(bar) = &self.progress {
                    bar.set_style(
                        ProgressStyle::with_template(
                            "{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}",
                        )?
                        .progress_chars("##-"),
                    );
                    bar.set_length(*total as u64);
                    bar.set_message("");
                }
                self.line(&event.to_string());
            }
            ScanEvent::Processing { index, path, .. } => {
                if let Some(bar) = &self.progress {
                    bar.set_position(*index as u64);
                    if let Some(name) = path.file_name() {
                        bar.set_message(name.to_string_lossy().into_owned());
                    }
                }
                self.line(&event.to_string());
            }
            ScanEvent::ExactDuplicate { .. } | ScanEvent::SimilarImage { .. } => {
                self.line(&format!("📦 {}", event));
            }
            ScanEvent::Deleted { .. } => self.line(&format!("🗑️  {}", event)),
            ScanEvent::Error { .. } => self.line(&format!("⚠️  {}", event)),
            ScanEvent::Finished { success, .. } => {
                if let Some(bar) = self.progress.take() {
                    bar.finish_and_clear();
                }
                let marker = if *success { "✅" } else { "❌" };
                println!("\n{} {}", marker, event);
            }
        }
        Ok(())
    }

    fn line(&self, text: &str) {
        let stamped = format!("[{}] {}", Local::now().format("%H:%M:%S"), text);
        match &self.progress {
            Some(bar) => bar.println(stamped),
            None => println!("{}", stamped),
        }
    }
}
