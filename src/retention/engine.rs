// gpbackuptool/src/retention/engine.rs
use crate::retention::log_parser::{BackupEvent, BackupKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetentionAction {
    Keep,
    Expire,
}

/// Classification of one backup event, in history order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetentionDecision {
    pub event: BackupEvent,
    pub action: RetentionAction,
}

/// Partitions a database's backup history into entries to retain and entries
/// to expire.
///
/// `history` must be ordered most-recent-first. A countdown starts at
/// `keep_full_backups` and every full backup decrements it; an event survives
/// while the countdown is non-negative. Expiry therefore begins exactly at
/// the (N+1)-th full backup, and every older entry goes with it: once the
/// covering full backup expires, dependent incrementals are unrestorable.
pub fn decide(history: &[BackupEvent], keep_full_backups: u32) -> Vec<RetentionDecision> {
    let mut remaining = i64::from(keep_full_backups);

    history
        .iter()
        .map(|event| {
            if event.kind == BackupKind::Full {
                remaining -= 1;
            }
            let action = if remaining >= 0 {
                RetentionAction::Keep
            } else {
                RetentionAction::Expire
            };
            RetentionDecision {
                event: event.clone(),
                action,
            }
        })
        .collect()
}
