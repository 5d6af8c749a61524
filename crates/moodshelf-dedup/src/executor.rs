use moodshelf_core::{Repository, SqliteContentRepository};
use rusqlite::{Connection, Transaction, TransactionBehavior};

use crate::error::{DedupError, Result};

/// Deletes a batch of records by primary key inside a single transaction.
#[derive(Debug, Clone, Copy, Default)]
pub struct TransactionExecutor;

impl TransactionExecutor {
    pub fn new() -> Self {
        Self
    }

    /// Delete every id or none of them. Returns the number of rows removed,
    /// which always equals `ids.len()` on success.
    pub fn delete_all(&self, conn: &mut Connection, ids: &[i64]) -> Result<usize> {
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(|e| DedupError::DeletionFailure(format!("cannot begin transaction: {e}")))?;

        match delete_each(&tx, ids) {
            Ok(deleted) => {
                tx.commit()
                    .map_err(|e| DedupError::DeletionFailure(format!("commit failed: {e}")))?;
                tracing::info!(deleted, "deletion batch committed");
                Ok(deleted)
            }
            Err(err) => {
                if let Err(rollback_err) = tx.rollback() {
                    tracing::error!(error = %rollback_err, "rollback failed");
                }
                tracing::warn!(error = %err, "deletion batch rolled back");
                Err(err)
            }
        }
    }
}

fn delete_each(tx: &Transaction<'_>, ids: &[i64]) -> Result<usize> {
    let repo = SqliteContentRepository::new(tx);
    for id in ids {
        match repo.delete(id) {
            Ok(true) => tracing::debug!(id, "deleted"),
            Ok(false) => {
                return Err(DedupError::DeletionFailure(format!(
                    "record {id} no longer exists, plan is stale"
                )));
            }
            Err(e) => {
                return Err(DedupError::DeletionFailure(format!("record {id}: {e}")));
            }
        }
    }
    Ok(ids.len())
}
