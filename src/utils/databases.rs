// gpbackuptool/src/utils/databases.rs
use anyhow::{Context, Result};
use sqlx::{Connection, PgConnection, Row};
use tracing::{debug, error};

use crate::config::BackupConfig;

/// Resolves the set of databases to back up: the configured list when one is
/// present, otherwise whatever the cluster catalog reports as connectable.
/// A failed catalog lookup is a data error, not a crash: it is logged and
/// resolves to no databases, leaving the next scheduled run to retry.
pub async fn resolve_database_list(config: &BackupConfig) -> Vec<String> {
    if let Some(list) = &config.database_list {
        debug!("Using database list from config: {:?}", list);
        return list.clone();
    }

    match list_connectable_databases(config).await {
        Ok(databases) => databases,
        Err(e) => {
            error!("Error looking up databases: {e:#}");
            Vec::new()
        }
    }
}

async fn list_connectable_databases(config: &BackupConfig) -> Result<Vec<String>> {
    let user = config
        .backup_user_db
        .as_deref()
        .context("backup_user_db must be set when backup_database_list is empty")?;
    let database = config
        .connection_db
        .as_deref()
        .context("connection_db must be set when backup_database_list is empty")?;

    let url = format!("postgres://{user}@localhost/{database}");
    let mut conn = PgConnection::connect(&url).await.with_context(|| {
        format!("Failed to connect to {database} as {user} for listing databases")
    })?;

    let rows =
        sqlx::query("SELECT datname FROM pg_database WHERE datallowconn = true ORDER BY datname")
            .fetch_all(&mut conn)
            .await
            .context("Failed to fetch database list from pg_database")?;

    let databases: Vec<String> = rows
        .iter()
        .map(|row| row.try_get("datname"))
        .collect::<Result<_, _>>()
        .context("Failed to read 'datname' from pg_database row")?;

    debug!("Found connectable databases: {:?}", databases);
    Ok(databases)
}
