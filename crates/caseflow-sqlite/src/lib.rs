//! SQLite Transaction Backend
//!
//! A real [`TransactionRunner`] over SQLite: commit-phase work runs between
//! `BEGIN IMMEDIATE` and `COMMIT`, and any error rolls the whole scope
//! back. The runner and the stores that persist through it share one
//! connection, so every statement issued by the cascade lands inside the
//! open transaction.

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::{Connection, SqliteConnection};
use tokio::sync::Mutex;
use tracing::{debug, error};

use caseflow_core::{
    NoTransaction, TransactionMode, TransactionRunner, TransactionWork, UseCaseError,
};

/// Connection handle shared between the runner and the stores that persist
/// through it.
pub type SharedConnection = Arc<Mutex<SqliteConnection>>;

/// Open a SQLite connection for shared use.
///
/// Accepts any SQLite URL sqlx understands, e.g. `sqlite::memory:` or
/// `sqlite://app.db?mode=rwc`.
pub async fn open(url: &str) -> Result<SharedConnection, sqlx::Error> {
    let conn = SqliteConnection::connect(url).await?;
    Ok(Arc::new(Mutex::new(conn)))
}

/// Runs commit-phase work inside a SQLite transaction.
///
/// The lock on the shared connection is released while the work runs;
/// stores re-acquire it per statement. SQLite transaction state lives on
/// the connection itself, so everything issued before `COMMIT` is covered.
pub struct SqliteTransaction {
    conn: SharedConnection,
}

impl SqliteTransaction {
    pub fn new(conn: SharedConnection) -> Self {
        Self { conn }
    }
}

#[async_trait]
impl TransactionRunner for SqliteTransaction {
    async fn run<'a>(&self, work: TransactionWork<'a>) -> Result<(), UseCaseError> {
        {
            let mut conn = self.conn.lock().await;
            sqlx::query("BEGIN IMMEDIATE")
                .execute(&mut *conn)
                .await
                .map_err(|e| UseCaseError::commit(format!("failed to begin transaction: {e}")))?;
        }

        match work.await {
            Ok(()) => {
                let mut conn = self.conn.lock().await;
                sqlx::query("COMMIT")
                    .execute(&mut *conn)
                    .await
                    .map_err(|e| {
                        UseCaseError::commit(format!("failed to commit transaction: {e}"))
                    })?;
                debug!("transaction committed");
                Ok(())
            }
            Err(err) => {
                let mut conn = self.conn.lock().await;
                let _ = sqlx::query("ROLLBACK").execute(&mut *conn).await;
                error!(error = %err, "transaction rolled back");
                Err(err)
            }
        }
    }
}

/// Map the configured transaction mode to a concrete runner over the given
/// connection. `Disabled` is the explicit opt-out for callers that accept
/// losing atomicity; it is never chosen silently.
pub fn runner_for(mode: TransactionMode, conn: SharedConnection) -> Arc<dyn TransactionRunner> {
    match mode {
        TransactionMode::Required => Arc::new(SqliteTransaction::new(conn)),
        TransactionMode::Disabled => Arc::new(NoTransaction),
    }
}
