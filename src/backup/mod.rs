// gpbackuptool/src/backup/mod.rs
mod logic;
pub(crate) mod command;
pub(crate) mod runner;

use anyhow::Result;
use crate::config::BackupConfig;

/// Public entry point for the backup-and-rotate process.
pub async fn run_backup_flow(config: &BackupConfig) -> Result<()> {
    logic::perform_backup_orchestration(config).await
}
