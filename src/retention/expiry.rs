// gpbackuptool/src/retention/expiry.rs
use crate::retention::engine::{RetentionAction, RetentionDecision};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

/// Tally of one expiry pass. Failures are counted, never propagated: a bad
/// directory must not stop the remaining deletions or fail the run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ExpiryOutcome {
    pub removed: usize,
    pub failed: usize,
    pub missing: usize,
}

/// Deletes the backup directories and log files of every expired decision
/// for `database`. The dump directory goes first; its log file is only
/// removed once the directory is gone, so a failed pass stays discoverable
/// on the next run.
pub fn expire(database: &str, backup_root: &Path, decisions: &[RetentionDecision]) -> ExpiryOutcome {
    let mut outcome = ExpiryOutcome::default();

    for decision in decisions {
        if decision.action != RetentionAction::Expire {
            continue;
        }

        let dump_dir = dump_directory(backup_root, database, &decision.event.dump_subdir);
        if !dump_dir.is_dir() {
            if decision.event.log_file.exists() {
                warn!(
                    database = %database,
                    dump_dir = %dump_dir.display(),
                    log_file = %decision.event.log_file.display(),
                    "Expired backup directory is missing but its log file remains"
                );
            }
            outcome.missing += 1;
            continue;
        }

        if let Err(e) = fs::remove_dir_all(&dump_dir) {
            error!(
                database = %database,
                dump_dir = %dump_dir.display(),
                "Failed to delete expired backup directory: {e}"
            );
            outcome.failed += 1;
            continue;
        }
        info!(database = %database, dump_dir = %dump_dir.display(), "Deleted expired backup");

        if let Err(e) = fs::remove_file(&decision.event.log_file) {
            error!(
                database = %database,
                log_file = %decision.event.log_file.display(),
                "Failed to delete log file of expired backup: {e}"
            );
            outcome.failed += 1;
            continue;
        }
        outcome.removed += 1;
    }

    outcome
}

/// Physical location of one backup run's data. Built from the database name
/// the log declared, never by globbing, so expiry can't cross databases.
fn dump_directory(backup_root: &Path, database: &str, dump_subdir: &str) -> PathBuf {
    backup_root.join(database).join("db_dumps").join(dump_subdir)
}
