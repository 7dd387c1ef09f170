// gpbackuptool/src/retention/mod.rs
pub(crate) mod engine;
pub(crate) mod expiry;
pub(crate) mod log_parser;

use anyhow::Result;
use std::path::Path;
use tracing::{debug, info};

use crate::config::BackupConfig;
use engine::RetentionAction;

/// Runs the full retention pass for one log directory: parse the dump logs
/// into per-database histories, classify each entry against the policy, and
/// delete what expired. Invoked right after each database's backup so disk
/// is reclaimed before the next dump starts.
pub fn run_retention_pass(config: &BackupConfig, log_dir: &Path) -> Result<()> {
    let histories = log_parser::parse(log_dir)?;

    for (database, events) in &histories {
        let decisions = engine::decide(events, config.keep_full_backups);
        let expired = decisions
            .iter()
            .filter(|d| d.action == RetentionAction::Expire)
            .count();
        debug!(
            database = %database,
            backups = events.len(),
            expired,
            keep_full_backups = config.keep_full_backups,
            "Computed retention decisions"
        );

        if expired == 0 {
            continue;
        }

        let outcome = expiry::expire(database, &config.backup_path, &decisions);
        info!(
            database = %database,
            removed = outcome.removed,
            failed = outcome.failed,
            missing = outcome.missing,
            "Retention pass finished"
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WeekSchedule;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn test_config(backup_path: &Path, keep_full_backups: u32) -> BackupConfig {
        BackupConfig {
            backup_user_os: "gpadmin".to_string(),
            backup_path: backup_path.to_path_buf(),
            database_list: None,
            backup_user_db: None,
            connection_db: None,
            backup_options: Vec::new(),
            master_data_directory: PathBuf::from("/data/master/gpseg-1"),
            schedule: WeekSchedule::default(),
            keep_full_backups,
            backup_program: PathBuf::from("gpcrondump"),
            backup_timeout: None,
            log_directory: None,
        }
    }

    fn seed_dump(root: &Path, database: &str, subdir: &str, dump_type: &str) {
        let dump_dir = root.join(database).join("db_dumps").join(subdir);
        fs::create_dir_all(&dump_dir).unwrap();
        fs::write(dump_dir.join("gp_dump_0_1.gz"), b"dump data").unwrap();

        let log_dir = root.join(database).join("logs");
        fs::create_dir_all(&log_dir).unwrap();
        fs::write(
            log_dir.join(format!("gpcrondump_{subdir}.log")),
            format!(
                "[INFO]:-Target database = {database}\n\
                 [INFO]:-Dump subdirectory = {subdir}\n\
                 [INFO]:-Dump type = {dump_type}\n"
            ),
        )
        .unwrap();
    }

    #[test]
    fn test_retention_pass_deletes_exactly_the_expired_backups() -> anyhow::Result<()> {
        let tmp = TempDir::new()?;
        seed_dump(tmp.path(), "sales", "20240101", "Incremental");
        seed_dump(tmp.path(), "sales", "20240102", "Full database");
        seed_dump(tmp.path(), "sales", "20240103", "Incremental");
        seed_dump(tmp.path(), "sales", "20240104", "Incremental");
        seed_dump(tmp.path(), "sales", "20240105", "Full database");

        let config = test_config(tmp.path(), 1);
        run_retention_pass(&config, &tmp.path().join("sales/logs"))?;

        let db_dumps = tmp.path().join("sales/db_dumps");
        let logs = tmp.path().join("sales/logs");
        for kept in ["20240103", "20240104", "20240105"] {
            assert!(db_dumps.join(kept).is_dir(), "{kept} should survive");
            assert!(logs.join(format!("gpcrondump_{kept}.log")).exists());
        }
        for expired in ["20240101", "20240102"] {
            assert!(!db_dumps.join(expired).exists(), "{expired} should be gone");
            assert!(!logs.join(format!("gpcrondump_{expired}.log")).exists());
        }
        Ok(())
    }

    #[test]
    fn test_retention_pass_with_wide_policy_deletes_nothing() -> anyhow::Result<()> {
        let tmp = TempDir::new()?;
        seed_dump(tmp.path(), "sales", "20240102", "Full database");
        seed_dump(tmp.path(), "sales", "20240105", "Full database");

        let config = test_config(tmp.path(), 5);
        run_retention_pass(&config, &tmp.path().join("sales/logs"))?;

        assert!(tmp.path().join("sales/db_dumps/20240102").is_dir());
        assert!(tmp.path().join("sales/db_dumps/20240105").is_dir());
        Ok(())
    }
}
