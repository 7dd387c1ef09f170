// gpbackuptool/src/backup/command.rs
use std::ffi::OsString;
use std::path::PathBuf;

use crate::config::{BackupConfig, DayPolicy};

/// One prepared invocation of the external dump tool for one database.
/// Pure data; the runner decides the final argument list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DumpCommand {
    pub database: String,
    /// Per-database backup root: `<backup_path>/<database>`.
    pub backup_dir: PathBuf,
    /// Where the dump tool writes its run logs: `<backup_dir>/logs`.
    pub log_dir: PathBuf,
    base_args: Vec<OsString>,
    incremental_token: Option<String>,
}

impl DumpCommand {
    /// Final argument list for the dump tool. `force_full` drops the
    /// incremental token, used when the backup directory is brand new and
    /// there is no prior full backup to diff against.
    pub fn args(&self, force_full: bool) -> Vec<OsString> {
        let mut args = self.base_args.clone();
        if !force_full {
            if let Some(token) = &self.incremental_token {
                args.push(token.into());
            }
        }
        args
    }

    pub fn is_incremental(&self) -> bool {
        self.incremental_token.is_some()
    }
}

/// Builds the dump command for every database under today's policy.
/// A `Skip` day produces no commands at all.
pub fn build_dump_commands(
    config: &BackupConfig,
    databases: &[String],
    policy: &DayPolicy,
) -> Vec<DumpCommand> {
    let incremental_token = match policy {
        DayPolicy::Skip => return Vec::new(),
        DayPolicy::Full => None,
        DayPolicy::Incremental(token) => Some(token.clone()),
    };

    databases
        .iter()
        .map(|database| {
            let backup_dir = config.backup_path.join(database);
            let log_dir = backup_dir.join("logs");

            let mut base_args: Vec<OsString> = vec!["-x".into(), database.into()];
            base_args.extend(config.backup_options.iter().map(OsString::from));
            base_args.push("-d".into());
            base_args.push(config.master_data_directory.clone().into());
            base_args.push("-l".into());
            base_args.push(log_dir.clone().into());
            base_args.push("-u".into());
            base_args.push(backup_dir.clone().into());

            DumpCommand {
                database: database.clone(),
                backup_dir,
                log_dir,
                base_args,
                incremental_token: incremental_token.clone(),
            }
        })
        .collect()
}
