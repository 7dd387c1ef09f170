// gpbackuptool/src/utils/mod.rs
pub mod databases;
pub mod identity;

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use which::which;

/// Resolves the configured dump executable. A bare name is looked up on
/// PATH, an explicit path is checked as-is.
pub fn find_backup_program(configured: &Path) -> Result<PathBuf> {
    which(configured).with_context(|| {
        format!(
            "Backup program {} not found. Check the backup_program config value and PATH.",
            configured.display()
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(unix)]
    #[test]
    fn test_find_backup_program_resolves_bare_name() -> anyhow::Result<()> {
        let resolved = find_backup_program(Path::new("sh"))?;
        assert!(resolved.is_absolute());
        Ok(())
    }

    #[test]
    fn test_find_backup_program_rejects_missing_executable() {
        let result = find_backup_program(Path::new("definitely-not-a-dump-tool"));
        assert!(result.is_err());
    }
}
