mod config;
mod s3;

use anyhow::{Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::info;

use config::Config;
use s3::{HeadErrorPolicy, R2Client, UploadObserver, UploadOptions, UploadRun, UploadTask, Uploader};

#[derive(Parser, Debug)]
#[command(
    name = "r2upload",
    version = env!("CARGO_PKG_VERSION"),
    about = "Upload a file or directory tree to Cloudflare R2 (or any S3-compatible store)",
    after_help = "Configuration (.env or environment):\n  \
                  CFR2_BUCKET=my-bucket\n  \
                  CFR2_ACCOUNT_ID=<cloudflare account id>\n  \
                  CFR2_ACCESSKEY=<access key id>\n  \
                  CFR2_SECRETKEY=<secret access key>\n  \
                  CFR2_ENDPOINT=http://localhost:9000        # optional, any S3-compatible endpoint"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Upload a file to a key, or a directory tree below a key prefix
    #[command(
        long_about = "Uploads a single file to a key, or every file under a directory to keys below a prefix. \
                      By default existing objects are overwritten; with --force=false objects that already \
                      exist are skipped. Files are uploaded one at a time and the first error aborts the run.",
        after_help = "Examples:\n  \
                      r2upload upload ./report.pdf /docs/report.pdf       # Upload single file\n  \
                      r2upload upload ./site www                          # Upload a directory under www/\n  \
                      r2upload upload ./site www --force=false            # Skip objects that already exist\n  \
                      r2upload upload ./site www --force=false --dry-run  # Show what would be uploaded"
    )]
    Upload(UploadArgs),
}

#[derive(Args, Debug)]
struct UploadArgs {
    /// File or directory to upload
    local_path: PathBuf,

    /// Destination key (single file) or key prefix (directory); leading '/' is ignored
    remote_path: String,

    /// Overwrite without checking whether objects already exist
    #[arg(
        long,
        default_value_t = true,
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "true",
        action = ArgAction::Set
    )]
    force: bool,

    /// What to do when an existence check fails for a reason other than not-found
    #[arg(long, value_enum, default_value_t = HeadErrorArg::Skip)]
    on_head_error: HeadErrorArg,

    /// Perform a dry run (show what would be uploaded without uploading)
    #[arg(long)]
    dry_run: bool,

    /// Time limit for the whole run, in seconds
    #[arg(long, default_value = "3600")]
    timeout_secs: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum HeadErrorArg {
    /// Assume the object exists and skip it
    Skip,
    /// Abort the run
    Abort,
}

impl From<HeadErrorArg> for HeadErrorPolicy {
    fn from(arg: HeadErrorArg) -> Self {
        match arg {
            HeadErrorArg::Skip => HeadErrorPolicy::Skip,
            HeadErrorArg::Abort => HeadErrorPolicy::Abort,
        }
    }
}

/// Drives one progress bar per file upload
struct TerminalObserver {
    bar: Mutex<Option<ProgressBar>>,
}

impl TerminalObserver {
    fn new() -> Self {
        Self {
            bar: Mutex::new(None),
        }
    }
}

impl UploadObserver for TerminalObserver {
    fn started(&self, _index: usize, task: &UploadTask) {
        let pb = ProgressBar::new(task.size_bytes);
        if let Ok(template) = ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({percent}%) {msg}")
        {
            pb.set_style(template.progress_chars("#>-"));
        }
        let name = task
            .local_path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| task.remote_key.clone());
        pb.set_message(name);

        if let Ok(mut slot) = self.bar.lock() {
            *slot = Some(pb);
        }
    }

    fn progress(&self, read: u64, _total: u64) {
        if let Ok(slot) = self.bar.lock() {
            if let Some(pb) = slot.as_ref() {
                pb.set_position(read);
            }
        }
    }

    fn finished(&self, _task: &UploadTask) {
        if let Ok(mut slot) = self.bar.lock() {
            if let Some(pb) = slot.take() {
                pb.finish_and_clear();
            }
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file early to get LOG_LEVEL
    dotenv::dotenv().ok();

    let log_level = std::env::var("LOG_LEVEL")
        .ok()
        .or_else(|| std::env::var("RUST_LOG").ok())
        .unwrap_or_else(|| "info".to_string());

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .or_else(|_| tracing_subscriber::EnvFilter::try_new(&log_level))
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_level(true)
        .init();

    let cli = Cli::parse();

    info!("R2 Upload Tool v{}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Command::Upload(args) => upload(args).await,
    }
}

async fn upload(args: UploadArgs) -> Result<()> {
    let config = Config::from_env().context("Invalid uploader configuration")?;
    let client = R2Client::new(&config).await?;

    println!(
        "{}",
        style(format!(
            "📦 Target: s3://{}/{}",
            client.bucket(),
            s3::key::normalize_remote_path(&args.remote_path)
        ))
        .cyan()
        .bold()
    );

    if args.dry_run {
        println!(
            "{}",
            style("🔍 DRY RUN MODE - No files will be uploaded")
                .yellow()
                .bold()
        );
    }

    let options = UploadOptions {
        force: args.force,
        on_head_error: args.on_head_error.into(),
        dry_run: args.dry_run,
        timeout: Duration::from_secs(args.timeout_secs),
    };

    let uploader = Uploader::new(client, options).with_observer(Arc::new(TerminalObserver::new()));

    let start = Instant::now();
    match uploader.run(&args.local_path, &args.remote_path).await {
        Ok(run) => {
            print_summary(&run, start.elapsed());
            Ok(())
        }
        Err(e) => {
            eprintln!("{} {}", style("✗").red(), style(e.user_message()).red());
            Err(e.into())
        }
    }
}

fn print_summary(run: &UploadRun, elapsed: Duration) {
    println!("\n{}", style("═".repeat(70)).dim());
    println!(
        "{}",
        style(format!(
            "{} → {}{}",
            run.root_local_path.display(),
            if run.root_remote_prefix.is_empty() { "/" } else { run.root_remote_prefix.as_str() },
            if run.force { " (force)" } else { "" }
        ))
        .dim()
    );
    println!(
        "{}",
        style(format!(
            "Summary: {} {}, {} skipped",
            run.uploaded,
            if run.dry_run { "would upload" } else { "uploaded" },
            run.skipped
        ))
        .bold()
    );

    if run.bytes_uploaded > 0 {
        println!(
            "{}",
            style(format!(
                "Total uploaded: {} ({} bytes)",
                format_size(run.bytes_uploaded),
                run.bytes_uploaded
            ))
            .dim()
        );
    }

    if elapsed.as_secs() > 0 {
        let speed = run.bytes_uploaded as f64 / elapsed.as_secs_f64() / 1024.0 / 1024.0;
        println!(
            "{}",
            style(format!(
                "Time: {:.2}s, Average speed: {:.2} MB/s",
                elapsed.as_secs_f64(),
                speed
            ))
            .dim()
        );
    }
}

/// Format file size for display
fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}
