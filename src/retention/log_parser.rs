// gpbackuptool/src/retention/log_parser.rs
use anyhow::{Context, Result};
use regex::Regex;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tracing::{debug, warn};

// Line markers written by the dump tool into every run log. The surrounding
// timestamp/host prefix varies, so only the field label is matched.
static TARGET_DATABASE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Target database").unwrap());
static DUMP_SUBDIR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Dump subdirectory").unwrap());
static DUMP_TYPE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"Dump type").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackupKind {
    Full,
    Incremental,
}

impl BackupKind {
    /// Maps the free-text "Dump type" value to a kind. Anything the tool
    /// reports that is not a full database dump only makes sense as an
    /// incremental for retention purposes.
    fn from_dump_type(value: &str) -> BackupKind {
        if value.trim().eq_ignore_ascii_case("full database") {
            BackupKind::Full
        } else {
            BackupKind::Incremental
        }
    }
}

/// One recorded dump run, as extracted from a single log file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupEvent {
    /// The log file this event was parsed from.
    pub log_file: PathBuf,
    /// Tool-assigned subdirectory under `<backup_path>/<db>/db_dumps/`
    /// holding the dumped data for this run.
    pub dump_subdir: String,
    pub kind: BackupKind,
}

/// Per-database backup history, most recent first.
pub type DatabaseHistory = BTreeMap<String, Vec<BackupEvent>>;

/// Reads every log file in `log_dir` and builds the backup history per
/// database named in the logs. A reused log directory can reference more
/// than one database, so the result is keyed by the name each log declares.
///
/// Files are visited sorted descending by file name; the tool's date-encoded
/// names make that most-recent-first. A file missing any required field is
/// skipped with a warning rather than aborting the pass.
pub fn parse(log_dir: &Path) -> Result<DatabaseHistory> {
    let entries = fs::read_dir(log_dir)
        .with_context(|| format!("Failed to list log directory {}", log_dir.display()))?;

    let mut log_files: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .collect();
    log_files.sort_by(|a, b| b.file_name().cmp(&a.file_name()));

    let mut history = DatabaseHistory::new();
    for log_file in log_files {
        match parse_log_file(&log_file) {
            Ok((database, event)) => {
                debug!(
                    log_file = %log_file.display(),
                    database = %database,
                    dump_subdir = %event.dump_subdir,
                    "Parsed backup log"
                );
                history.entry(database).or_default().push(event);
            }
            Err(e) => {
                warn!(
                    log_file = %log_file.display(),
                    "Skipping unparsable backup log: {e:#}"
                );
            }
        }
    }

    Ok(history)
}

fn parse_log_file(log_file: &Path) -> Result<(String, BackupEvent)> {
    let content = fs::read_to_string(log_file).context("Failed to read log file")?;

    let database = last_token_of_last_match(&content, &TARGET_DATABASE_RE)
        .context("No 'Target database' line found")?
        .to_string();
    let dump_subdir = last_token_of_last_match(&content, &DUMP_SUBDIR_RE)
        .context("No 'Dump subdirectory' line found")?
        .to_string();
    let dump_type = value_after_equals(&content, &DUMP_TYPE_RE)
        .context("No 'Dump type' line found")?;

    let event = BackupEvent {
        log_file: log_file.to_path_buf(),
        dump_subdir,
        kind: BackupKind::from_dump_type(dump_type),
    };
    Ok((database, event))
}

/// Last whitespace-separated token of the last line matching `re`.
fn last_token_of_last_match<'a>(content: &'a str, re: &Regex) -> Option<&'a str> {
    content
        .lines()
        .filter(|line| re.is_match(line))
        .last()?
        .split_whitespace()
        .last()
}

/// Trimmed text after the final `=` of the last line matching `re`.
fn value_after_equals<'a>(content: &'a str, re: &Regex) -> Option<&'a str> {
    let line = content.lines().filter(|line| re.is_match(line)).last()?;
    let (_, value) = line.rsplit_once('=')?;
    Some(value.trim())
}
