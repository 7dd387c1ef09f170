// gpbackuptool/src/config/mod.rs
use anyhow::{Context, Result};
use chrono::Weekday;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Raw shape of config.json before validation.
#[derive(Debug, Clone, Deserialize)]
pub struct RawJsonConfig {
    pub backup_user_os: Option<String>,
    pub backup_path: Option<PathBuf>,
    pub backup_database_list: Option<String>,
    pub backup_user_db: Option<String>,
    pub connection_db: Option<String>,
    pub backup_options: Option<String>,
    pub greenplum_master_directory: Option<PathBuf>,
    pub keep_full_backups: Option<u32>,
    pub backup_program: Option<PathBuf>,
    pub backup_timeout_secs: Option<u64>,
    pub log_directory: Option<PathBuf>,
    pub mon: Option<String>,
    pub tue: Option<String>,
    pub wed: Option<String>,
    pub thu: Option<String>,
    pub fri: Option<String>,
    pub sat: Option<String>,
    pub sun: Option<String>,
}

/// What kind of backup (if any) is scheduled for a given day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DayPolicy {
    /// No backup runs on this day.
    Skip,
    Full,
    /// Incremental-mode token passed through to the dump tool verbatim.
    Incremental(String),
}

impl DayPolicy {
    fn parse(value: Option<&str>) -> DayPolicy {
        match value.map(str::trim) {
            None | Some("") => DayPolicy::Skip,
            Some(v) if v.eq_ignore_ascii_case("none") => DayPolicy::Skip,
            Some(v) if v.eq_ignore_ascii_case("full") => DayPolicy::Full,
            Some(v) => DayPolicy::Incremental(v.to_string()),
        }
    }
}

/// Backup mode per day of week. Days without a config key default to `Skip`.
#[derive(Debug, Clone)]
pub struct WeekSchedule {
    // Indexed by Weekday::num_days_from_monday().
    days: [DayPolicy; 7],
}

impl WeekSchedule {
    pub fn policy_for(&self, day: Weekday) -> &DayPolicy {
        &self.days[day.num_days_from_monday() as usize]
    }
}

impl Default for WeekSchedule {
    fn default() -> Self {
        WeekSchedule {
            days: std::array::from_fn(|_| DayPolicy::Skip),
        }
    }
}

/// Application configuration, validated once at load time.
#[derive(Debug, Clone)]
pub struct BackupConfig {
    pub backup_user_os: String,
    pub backup_path: PathBuf,
    /// Explicit database list from config; `None` triggers cluster discovery.
    pub database_list: Option<Vec<String>>,
    pub backup_user_db: Option<String>,
    pub connection_db: Option<String>,
    /// Opaque flags handed through to the dump tool, already whitespace-split.
    pub backup_options: Vec<String>,
    pub master_data_directory: PathBuf,
    pub schedule: WeekSchedule,
    pub keep_full_backups: u32,
    pub backup_program: PathBuf,
    /// Upper bound on a single dump invocation; `None` means unbounded.
    pub backup_timeout: Option<Duration>,
    pub log_directory: Option<PathBuf>,
}

impl BackupConfig {
    pub fn load_from_json(config_path: &Path) -> Result<Self> {
        let config_content = fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config file at {}", config_path.display()))?;
        let raw: RawJsonConfig = serde_json::from_str(&config_content).with_context(|| {
            format!(
                "Failed to parse JSON from config file at {}",
                config_path.display()
            )
        })?;
        BackupConfig::from_raw(raw)
    }

    fn from_raw(raw: RawJsonConfig) -> Result<Self> {
        let backup_user_os = raw
            .backup_user_os
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .context("backup_user_os must be set in the config file")?
            .to_string();

        let backup_path = raw
            .backup_path
            .clone()
            .context("backup_path must be set in the config file")?;

        let master_data_directory = raw
            .greenplum_master_directory
            .clone()
            .context("greenplum_master_directory must be set in the config file")?;

        let backup_program = raw
            .backup_program
            .clone()
            .context("backup_program must be set in the config file")?;

        let keep_full_backups = raw
            .keep_full_backups
            .context("keep_full_backups must be set in the config file")?;
        if keep_full_backups < 1 {
            anyhow::bail!("keep_full_backups must be at least 1, got {}", keep_full_backups);
        }

        let database_list = parse_database_list(raw.backup_database_list.as_deref());
        if let Some(dbs) = &database_list {
            for name in dbs {
                if name.contains(|c: char| !c.is_alphanumeric() && c != '_' && c != '-') {
                    anyhow::bail!(
                        "Invalid character in database name {:?} from backup_database_list",
                        name
                    );
                }
            }
        }

        let schedule = WeekSchedule {
            days: [
                DayPolicy::parse(raw.mon.as_deref()),
                DayPolicy::parse(raw.tue.as_deref()),
                DayPolicy::parse(raw.wed.as_deref()),
                DayPolicy::parse(raw.thu.as_deref()),
                DayPolicy::parse(raw.fri.as_deref()),
                DayPolicy::parse(raw.sat.as_deref()),
                DayPolicy::parse(raw.sun.as_deref()),
            ],
        };

        Ok(BackupConfig {
            backup_user_os,
            backup_path,
            database_list,
            backup_user_db: raw.backup_user_db.clone().filter(|s| !s.trim().is_empty()),
            connection_db: raw.connection_db.clone().filter(|s| !s.trim().is_empty()),
            backup_options: raw
                .backup_options
                .as_deref()
                .unwrap_or("")
                .split_whitespace()
                .map(str::to_string)
                .collect(),
            master_data_directory,
            schedule,
            keep_full_backups,
            backup_program,
            backup_timeout: raw.backup_timeout_secs.map(Duration::from_secs),
            log_directory: raw.log_directory,
        })
    }
}

/// Parses the comma-separated backup_database_list value.
/// An absent, empty, or all-blank list means "discover from the cluster".
fn parse_database_list(raw: Option<&str>) -> Option<Vec<String>> {
    let raw = raw?;
    let databases: Vec<String> = raw
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();
    if databases.is_empty() { None } else { Some(databases) }
}
