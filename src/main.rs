//! Backup wrapper for Greenplum clusters
//!
//! Drives the external dump tool per database on a day-of-week schedule and
//! enforces backup rotation: old dumps past the keep_full_backups window are
//! deleted along with their run logs.

// gpbackuptool/src/main.rs
mod backup;
mod config;
mod retention;
mod utils;

use anyhow::{Context, Result};
use chrono::Local;
use clap::Parser;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Mutex;
use tracing::{debug, level_filters::LevelFilter};
use tracing_subscriber::EnvFilter;

use config::BackupConfig;

#[derive(Parser, Debug)]
#[command(name = "gpbackuptool", about = "Greenplum backup rotation and cleanup")]
struct CliArgs {
    /// Path to a configuration file.
    #[clap(short, long)]
    config: PathBuf,

    /// Verbose logging output.
    #[clap(short = 'v', long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = CliArgs::parse();
    match run_app(args).await {
        Ok(_) => {
            println!("✅ Backup run completed successfully.");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("❌ Error: {:?}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run_app(args: CliArgs) -> Result<()> {
    let app_config = BackupConfig::load_from_json(&args.config).with_context(|| {
        format!(
            "Failed to load application configuration from {}",
            args.config.display()
        )
    })?;

    init_logging(args.debug, app_config.log_directory.as_deref())?;

    utils::identity::ensure_running_as(&app_config.backup_user_os)?;

    if !app_config.backup_path.is_dir() {
        anyhow::bail!(
            "Backup path does not exist: {}",
            app_config.backup_path.display()
        );
    }
    debug!("Found backup path: {}", app_config.backup_path.display());

    backup::run_backup_flow(&app_config).await
}

/// Installs the global subscriber. Default level is INFO, `--debug` raises
/// it to DEBUG, and the LOG_LEVEL env var overrides both. With a
/// log_directory configured, output goes to a dated file there instead of
/// stdout.
fn init_logging(debug: bool, log_directory: Option<&Path>) -> Result<()> {
    let default_level = if debug {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };
    let filter = EnvFilter::builder()
        .with_default_directive(default_level.into())
        .with_env_var("LOG_LEVEL")
        .from_env_lossy();

    match log_directory {
        Some(dir) => {
            fs::create_dir_all(dir).with_context(|| {
                format!("Failed to create log directory {}", dir.display())
            })?;
            let log_path = dir.join(format!(
                "gpbackuptool_{}.log",
                Local::now().format("%Y%m%d")
            ));
            let log_file = fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&log_path)
                .with_context(|| format!("Failed to open log file {}", log_path.display()))?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(Mutex::new(log_file))
                .with_ansi(false)
                .try_init()
                .map_err(|e| anyhow::anyhow!("Failed to initialise logging: {e}"))?;
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .try_init()
                .map_err(|e| anyhow::anyhow!("Failed to initialise logging: {e}"))?;
        }
    }
    Ok(())
}
