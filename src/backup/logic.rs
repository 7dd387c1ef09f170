// gpbackuptool/src/backup/logic.rs
use anyhow::Result;
use chrono::{Datelike, Local};
use tracing::{info, warn};

use crate::backup::{command, runner};
use crate::config::{BackupConfig, DayPolicy};
use crate::utils::{self, databases};

/// Single pass over the cluster: resolve databases, build today's dump
/// commands, execute them sequentially with a retention pass after each
/// database. Databases are processed one at a time on purpose; the dump tool
/// is heavy on the cluster and overlapping runs contend for its locks.
pub async fn perform_backup_orchestration(config: &BackupConfig) -> Result<()> {
    let today = Local::now().weekday();
    let policy = config.schedule.policy_for(today);
    if *policy == DayPolicy::Skip {
        info!(day = %today, "No backup scheduled for today");
        return Ok(());
    }

    let databases = databases::resolve_database_list(config).await;
    if databases.is_empty() {
        warn!("No databases to back up");
        return Ok(());
    }
    info!(day = %today, "Backing up databases: {:?}", databases);

    let commands = command::build_dump_commands(config, &databases, policy);
    let program = utils::find_backup_program(&config.backup_program)?;

    runner::execute_backups(config, &program, &commands).await
}
