// gpbackuptool/src/backup/runner.rs
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use tokio::process::Command;
use tracing::info;

use crate::backup::command::DumpCommand;
use crate::config::BackupConfig;
use crate::retention;

/// Runs every dump command in order, applying retention for each database
/// immediately after its backup finishes. A dump that fails to launch, times
/// out, or exits non-zero aborts the whole run; there is no point dumping
/// further databases once the tool itself is broken.
pub async fn execute_backups(
    config: &BackupConfig,
    program: &Path,
    commands: &[DumpCommand],
) -> Result<()> {
    for cmd in commands {
        run_dump(config, program, cmd)
            .await
            .with_context(|| format!("Backup failed for database {}", cmd.database))?;

        retention::run_retention_pass(config, &cmd.log_dir)
            .with_context(|| format!("Retention pass failed for database {}", cmd.database))?;
    }
    Ok(())
}

async fn run_dump(config: &BackupConfig, program: &Path, cmd: &DumpCommand) -> Result<()> {
    let fresh = prepare_backup_dirs(cmd)?;

    // An incremental has nothing to diff against in a brand-new directory,
    // so the first backup there is always taken as a full one.
    let force_full = fresh && cmd.is_incremental();
    if force_full {
        info!(
            database = %cmd.database,
            backup_dir = %cmd.backup_dir.display(),
            "Fresh backup directory, downgrading incremental to full backup"
        );
    }

    let args = cmd.args(force_full);
    info!(database = %cmd.database, program = %program.display(), "Starting backup");

    let output_future = Command::new(program)
        .args(&args)
        .kill_on_drop(true)
        .output();
    let output = match config.backup_timeout {
        Some(limit) => tokio::time::timeout(limit, output_future)
            .await
            .map_err(|_| {
                anyhow::anyhow!(
                    "{} did not finish within {}s",
                    program.display(),
                    limit.as_secs()
                )
            })?,
        None => output_future.await,
    }
    .with_context(|| format!("Failed to execute {}", program.display()))?;

    if !output.status.success() {
        anyhow::bail!(
            "{} exited with status {}\nStdout: {}\nStderr: {}",
            program.display(),
            output.status,
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr)
        );
    }

    info!(database = %cmd.database, "Backup finished");
    Ok(())
}

/// Makes sure `<backup_path>/<db>` and its `logs` subdirectory exist.
/// Returns whether the backup directory had to be created, i.e. this is the
/// database's first backup on this host.
fn prepare_backup_dirs(cmd: &DumpCommand) -> Result<bool> {
    let fresh = !cmd.backup_dir.is_dir();
    fs::create_dir_all(&cmd.log_dir).with_context(|| {
        format!(
            "Failed to create backup log directory {}",
            cmd.log_dir.display()
        )
    })?;
    Ok(fresh)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backup::command::build_dump_commands;
    use crate::config::{DayPolicy, WeekSchedule};
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn test_config(backup_path: &Path) -> BackupConfig {
        BackupConfig {
            backup_user_os: "gpadmin".to_string(),
            backup_path: backup_path.to_path_buf(),
            database_list: Some(vec!["sales".to_string()]),
            backup_user_db: None,
            connection_db: None,
            backup_options: Vec::new(),
            master_data_directory: PathBuf::from("/data/master/gpseg-1"),
            schedule: WeekSchedule::default(),
            keep_full_backups: 2,
            backup_program: PathBuf::from("true"),
            backup_timeout: None,
            log_directory: None,
        }
    }

    #[test]
    fn test_prepare_backup_dirs_reports_fresh_directory_once() -> anyhow::Result<()> {
        let tmp = TempDir::new()?;
        let config = test_config(tmp.path());
        let commands =
            build_dump_commands(&config, &["sales".to_string()], &DayPolicy::Full);

        assert!(prepare_backup_dirs(&commands[0])?);
        assert!(commands[0].log_dir.is_dir());
        assert!(!prepare_backup_dirs(&commands[0])?);
        Ok(())
    }

    #[cfg(unix)]
    fn write_argv_recorder(dir: &Path, argv_out: &Path) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let script = dir.join("fake_gpcrondump.sh");
        fs::write(
            &script,
            format!("#!/bin/sh\nprintf '%s\\n' \"$@\" > {}\n", argv_out.display()),
        )
        .unwrap();
        fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();
        script
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_fresh_directory_downgrades_incremental_to_full() -> anyhow::Result<()> {
        let tmp = TempDir::new()?;
        let argv_out = tmp.path().join("argv.txt");
        let program = write_argv_recorder(tmp.path(), &argv_out);
        let config = test_config(&tmp.path().join("backups"));
        let policy = DayPolicy::Incremental("--incremental".to_string());
        let commands = build_dump_commands(&config, &["sales".to_string()], &policy);

        // First run creates the directory, so the token must be stripped.
        execute_backups(&config, &program, &commands).await?;
        let argv = fs::read_to_string(&argv_out)?;
        assert!(!argv.contains("--incremental"));

        // Directory exists now; the incremental goes through as configured.
        execute_backups(&config, &program, &commands).await?;
        let argv = fs::read_to_string(&argv_out)?;
        assert!(argv.contains("--incremental"));
        Ok(())
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_failing_dump_aborts_the_run() -> anyhow::Result<()> {
        let tmp = TempDir::new()?;
        let config = test_config(tmp.path());
        let commands =
            build_dump_commands(&config, &["sales".to_string()], &DayPolicy::Full);

        let result = execute_backups(&config, Path::new("false"), &commands).await;

        assert!(result.is_err());
        Ok(())
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_hung_dump_hits_the_configured_timeout() -> anyhow::Result<()> {
        use std::os::unix::fs::PermissionsExt;

        let tmp = TempDir::new()?;
        let program = tmp.path().join("hang.sh");
        fs::write(&program, "#!/bin/sh\nsleep 10\n")?;
        fs::set_permissions(&program, fs::Permissions::from_mode(0o755))?;

        let mut config = test_config(&tmp.path().join("backups"));
        config.backup_timeout = Some(std::time::Duration::from_millis(100));
        let commands =
            build_dump_commands(&config, &["sales".to_string()], &DayPolicy::Full);

        let result = run_dump(&config, &program, &commands[0]).await;

        assert!(result.unwrap_err().to_string().contains("did not finish"));
        Ok(())
    }
}
