//! Dropload CLI - validate, queue and upload files
//!
//! ```bash
//! dropload upload a.pdf b.pdf --dest ./out      # picker: explicit files
//! dropload drop ./incoming --url http://host    # drop: every file in a folder
//! dropload check a.pdf b.png --accept image/*   # validation only
//! dropload config                               # effective configuration
//! ```

use clap::{Args, Parser, Subcommand};
use dropload::config::parse_accept;
use dropload::config::parse_size;
use dropload::logs::LOG_BROADCASTER;
use dropload::validation::format_megabytes;
use dropload::{
    CompletionMode, ConfigError, DirectoryTransport, DryRunTransport, HttpTransport,
    IngestionSurface, PathFile, PlatformFile, QueueError, RunOutcome, Transport, TransportError,
    UploadConfig, UploadError, UploadItem, UploadListener, Uploader, Verdict,
};
use dropload::error::UploadResult;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "dropload")]
#[command(about = "Validate, queue and upload files", long_about = None)]
struct Cli {
    /// JSON configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Do not echo pipeline logs
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload the given files as one picker selection
    Upload {
        /// Files to upload
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        #[command(flatten)]
        policy: PolicyArgs,

        #[command(flatten)]
        run: RunArgs,
    },

    /// Upload every file in a folder as one drop
    Drop {
        /// Folder whose files are dropped
        dir: PathBuf,

        #[command(flatten)]
        policy: PolicyArgs,

        #[command(flatten)]
        run: RunArgs,
    },

    /// Check files against the validation policy without uploading
    Check {
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        #[command(flatten)]
        policy: PolicyArgs,
    },

    /// Print the effective configuration
    Config {
        #[command(flatten)]
        policy: PolicyArgs,
    },
}

#[derive(Args, Default)]
struct PolicyArgs {
    /// Accept patterns, comma-separated (e.g. ".pdf,image/*")
    #[arg(long)]
    accept: Option<String>,

    /// Maximum file size (e.g. 10MB)
    #[arg(long)]
    max_size: Option<String>,

    /// Maximum number of queued files
    #[arg(long)]
    max_count: Option<usize>,

    /// Accept only one file per selection
    #[arg(long)]
    single: bool,
}

#[derive(Args)]
struct RunArgs {
    /// Upload server base URL (POST {url}/api/upload)
    #[arg(long, conflicts_with_all = ["dest", "dry_run"])]
    url: Option<String>,

    /// Copy files into this directory
    #[arg(long, conflicts_with = "dry_run")]
    dest: Option<PathBuf>,

    /// Run the pipeline without moving any bytes
    #[arg(long)]
    dry_run: bool,

    /// Mark files succeeded only once the transport has finished
    #[arg(long)]
    await_transport: bool,

    /// Delay between progress steps in milliseconds
    #[arg(long)]
    tick_ms: Option<u64>,

    /// Print the final items as JSON
    #[arg(long)]
    json: bool,
}

/// Prints queue notifications to the terminal.
struct ConsoleListener;

impl UploadListener for ConsoleListener {
    fn on_selection_changed(&self, items: &[UploadItem]) {
        eprintln!("📋 {} file(s) selected", items.len());
    }

    fn on_error(&self, message: &str) {
        eprintln!("❌ {}", message);
    }
}

#[derive(Clone, Copy)]
enum Channel {
    Drop,
    Picker,
}

#[tokio::main]
async fn main() {
    // Load .env file (if present)
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    LOG_BROADCASTER.set_echo(echo_logs(&cli));
    let config_path = cli.config.as_deref();

    let result = match cli.command {
        Commands::Upload { paths, policy, run } => {
            cmd_upload(config_path, &policy, &run, Channel::Picker, open_all(&paths)).await
        }

        Commands::Drop { dir, policy, run } => {
            let files = IngestionSurface::scan_dir(&dir).map_err(UploadError::from);
            cmd_upload(config_path, &policy, &run, Channel::Drop, files).await
        }

        Commands::Check { paths, policy } => cmd_check(config_path, &policy, &paths),

        Commands::Config { policy } => cmd_config(config_path, &policy),
    };

    if let Err(e) = result {
        eprintln!("❌ Error: {}", e);
        std::process::exit(1);
    }
}

/// Log echo shares stdout, so it stays off when stdout carries JSON.
fn echo_logs(cli: &Cli) -> bool {
    let json_stdout = match &cli.command {
        Commands::Upload { run, .. } | Commands::Drop { run, .. } => run.json,
        Commands::Config { .. } => true,
        Commands::Check { .. } => false,
    };
    !cli.quiet && !json_stdout
}

fn open_all(paths: &[PathBuf]) -> UploadResult<Vec<PathFile>> {
    paths
        .iter()
        .map(|p| PathFile::open(p).map_err(UploadError::from))
        .collect()
}

fn load_config(path: Option<&Path>, policy: &PolicyArgs) -> UploadResult<UploadConfig> {
    let mut config = match path {
        Some(p) => UploadConfig::from_json_file(p)?,
        None => UploadConfig::default(),
    }
    .apply_env()?;

    if let Some(accept) = &policy.accept {
        config.accept = parse_accept(accept);
    }
    if let Some(max_size) = &policy.max_size {
        config.max_size_bytes = parse_size(max_size).ok_or_else(|| ConfigError::InvalidValue {
            key: "--max-size".to_string(),
            value: max_size.clone(),
        })?;
    }
    if let Some(max_count) = policy.max_count {
        config.max_count = max_count;
    }
    if policy.single {
        config.allow_multiple = false;
    }
    Ok(config)
}

fn select_transport(run: &RunArgs) -> UploadResult<Box<dyn Transport>> {
    if let Some(url) = &run.url {
        return Ok(Box::new(HttpTransport::new(url)));
    }
    if let Some(dest) = &run.dest {
        return Ok(Box::new(DirectoryTransport::new(dest)));
    }
    if run.dry_run {
        return Ok(Box::new(DryRunTransport));
    }
    Err(UploadError::Usage(
        "Choose a transport: --url, --dest or --dry-run".to_string(),
    ))
}

async fn cmd_upload(
    config_path: Option<&Path>,
    policy: &PolicyArgs,
    run: &RunArgs,
    channel: Channel,
    files: UploadResult<Vec<PathFile>>,
) -> UploadResult<()> {
    let mut config = load_config(config_path, policy)?;
    if run.await_transport {
        config.completion = CompletionMode::AwaitTransport;
    }
    if let Some(tick) = run.tick_ms {
        config.tick_interval_ms = tick;
    }
    let transport = select_transport(run)?;
    let files = files?;

    let uploader = Uploader::from_config(&config, Arc::new(ConsoleListener))?;
    match channel {
        Channel::Drop => uploader.ingest.on_drop(&files)?,
        Channel::Picker => uploader.ingest.on_browse(&files)?,
    };
    if uploader.queue.is_empty() {
        return Err(UploadError::Usage("No files to upload".to_string()));
    }

    let outcome = uploader.orchestrator.start(transport.as_ref()).await;
    let items = uploader.queue.snapshot();

    eprintln!("\n📊 SUMMARY");
    for item in &items {
        eprintln!(
            "   {:<10} {:>3}%  {} ({})",
            item.status.label(),
            item.progress,
            item.file.name,
            format_megabytes(item.file.size)
        );
    }

    if run.json {
        println!("{}", serde_json::to_string_pretty(&items)?);
    }

    match outcome {
        RunOutcome::TransportFailed { message } => {
            Err(TransportError::Rejected(message).into())
        }
        _ => {
            eprintln!("\n✨ Done!");
            Ok(())
        }
    }
}

fn cmd_check(config_path: Option<&Path>, policy: &PolicyArgs, paths: &[PathBuf]) -> UploadResult<()> {
    let config = load_config(config_path, policy)?;
    let files = open_all(paths)?;
    let mut candidates: Vec<_> = files.iter().map(PlatformFile::to_candidate).collect();
    if !config.allow_multiple {
        candidates.truncate(1);
    }

    for file in &candidates {
        eprintln!(
            "   {} ({}, {})",
            file.name,
            if file.mime_type.is_empty() { "unknown type" } else { file.mime_type.as_str() },
            format_megabytes(file.size)
        );
    }

    match config.policy()?.evaluate(&candidates, 0) {
        Verdict::Accepted => {
            eprintln!("✅ {} file(s) accepted", candidates.len());
            Ok(())
        }
        Verdict::Rejected(reasons) => {
            for reason in &reasons {
                eprintln!("   [{}] {}", reason.code(), reason);
            }
            Err(QueueError::Rejected(reasons).into())
        }
    }
}

fn cmd_config(config_path: Option<&Path>, policy: &PolicyArgs) -> UploadResult<()> {
    let config = load_config(config_path, policy)?;
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}
