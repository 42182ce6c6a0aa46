//! Interactive transactions.
//!
//! Set `REPORTDB_DEBUG=true` to enable transaction debug logging.
//!
//! # Isolation Levels
//!
//! ```rust
//! use reportdb_query::IsolationLevel;
//!
//! assert_eq!(IsolationLevel::Serializable.as_sql(), "SERIALIZABLE");
//! assert_eq!(IsolationLevel::ReadCommitted.as_sql(), "READ COMMITTED");
//! ```
//!
//! # Transaction Configuration
//!
//! ```rust
//! use std::time::Duration;
//! use reportdb_query::{IsolationLevel, TransactionConfig};
//!
//! let config = TransactionConfig::new();
//! assert_eq!(config.max_wait, Duration::from_secs(2));
//! assert_eq!(config.timeout, Duration::from_secs(5));
//! assert_eq!(config.to_begin_sql(), "BEGIN");
//!
//! let config = config.isolation(IsolationLevel::Serializable);
//! assert_eq!(config.to_begin_sql(), "BEGIN ISOLATION LEVEL SERIALIZABLE");
//! ```
//!
//! # Transaction Usage
//!
//! ```rust,ignore
//! // Commits on success, rolls back on error or timeout
//! let report = client
//!     .transaction(|tx| async move {
//!         let wallet = tx.tezos_wallet().create(wallet_input).exec().await?;
//!         tx.report().create(report_input(wallet.id)).exec().await
//!     })
//!     .await?;
//! ```

use std::future::Future;
use std::time::Duration;

use tracing::{debug, error, warn};

use crate::error::{QueryError, QueryResult};
use crate::traits::QueryEngine;

/// Transaction isolation levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IsolationLevel {
    /// Read uncommitted - allows dirty reads.
    ReadUncommitted,
    /// Read committed - prevents dirty reads.
    ReadCommitted,
    /// Repeatable read - prevents non-repeatable reads.
    RepeatableRead,
    /// Serializable - highest isolation level.
    Serializable,
}

impl IsolationLevel {
    /// Get the SQL clause for this isolation level.
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::ReadUncommitted => "READ UNCOMMITTED",
            Self::ReadCommitted => "READ COMMITTED",
            Self::RepeatableRead => "REPEATABLE READ",
            Self::Serializable => "SERIALIZABLE",
        }
    }
}

/// Configuration for an interactive transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransactionConfig {
    /// Isolation level; the database default when unset.
    pub isolation: Option<IsolationLevel>,
    /// Maximum time to wait for the transaction to start.
    pub max_wait: Duration,
    /// Maximum time the transaction body may run.
    pub timeout: Duration,
}

impl Default for TransactionConfig {
    fn default() -> Self {
        Self {
            isolation: None,
            max_wait: Duration::from_millis(2000),
            timeout: Duration::from_millis(5000),
        }
    }
}

impl TransactionConfig {
    /// Create a new transaction config with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the isolation level.
    pub fn isolation(mut self, level: IsolationLevel) -> Self {
        self.isolation = Some(level);
        self
    }

    /// Set the maximum wait to start the transaction.
    pub fn max_wait(mut self, max_wait: Duration) -> Self {
        self.max_wait = max_wait;
        self
    }

    /// Set the timeout of the transaction body.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Generate the BEGIN SQL.
    pub fn to_begin_sql(&self) -> String {
        match self.isolation {
            Some(level) => format!("BEGIN ISOLATION LEVEL {}", level.as_sql()),
            None => "BEGIN".to_string(),
        }
    }
}

/// Run `body` inside a transaction on `engine`.
///
/// The body receives an engine bound to the transaction. The transaction
/// commits when the body returns `Ok` and rolls back when it returns `Err`
/// or exceeds `config.timeout`.
pub async fn run_transaction<E, T, F, Fut>(
    engine: &E,
    config: &TransactionConfig,
    body: F,
) -> QueryResult<T>
where
    E: QueryEngine,
    F: FnOnce(E) -> Fut,
    Fut: Future<Output = QueryResult<T>>,
{
    let tx = match tokio::time::timeout(config.max_wait, engine.begin(config)).await {
        Ok(tx) => tx?,
        Err(_) => {
            let max_wait_ms = config.max_wait.as_millis() as u64;
            warn!(max_wait_ms, "Transaction could not be started in time");
            return Err(QueryError::transaction_start_timeout(max_wait_ms));
        }
    };
    debug!(isolation = ?config.isolation.map(|level| level.as_sql()), "Transaction BEGIN");

    match tokio::time::timeout(config.timeout, body(tx.clone())).await {
        Ok(Ok(value)) => {
            tx.commit().await?;
            debug!("Transaction COMMIT");
            Ok(value)
        }
        Ok(Err(err)) => {
            warn!(error = %err, "Transaction failed, rolling back");
            rollback(&tx).await;
            Err(err)
        }
        Err(_) => {
            let timeout_ms = config.timeout.as_millis() as u64;
            warn!(timeout_ms, "Transaction timed out, rolling back");
            rollback(&tx).await;
            Err(QueryError::transaction_timeout(timeout_ms))
        }
    }
}

async fn rollback<E: QueryEngine>(tx: &E) {
    if let Err(err) = tx.rollback().await {
        error!(error = %err, "Transaction ROLLBACK failed");
    }
}
