//! In-memory engine for tests.
//!
//! [`MockEngine`] records every statement it receives and answers from a
//! queue of prepared responses. An empty queue answers with no rows and zero
//! affected rows.
//!
//! ```rust
//! use reportdb_query::testing::MockEngine;
//! use reportdb_query::QueryEngine;
//! use serde_json::json;
//!
//! # tokio_test_block(async {
//! let engine = MockEngine::new();
//! engine.push_rows([json!({ "id": 1, "name": "hello" })]);
//!
//! let rows = engine.query("SELECT 1", vec![]).await.unwrap();
//! assert_eq!(rows[0]["name"], "hello");
//! assert_eq!(engine.executed_sql(), vec!["SELECT 1"]);
//! # });
//! # fn tokio_test_block(f: impl std::future::Future<Output = ()>) {
//! #     tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(f)
//! # }
//! ```

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde_json::Value;

use crate::error::{QueryError, QueryResult};
use crate::filter::FilterValue;
use crate::sql::Statement;
use crate::traits::{BoxFuture, QueryEngine, Row};
use crate::transaction::TransactionConfig;

/// A prepared answer.
pub enum MockResponse {
    /// Rows returned by the next statement.
    Rows(Vec<Row>),
    /// Affected-row count of the next statement.
    Affected(u64),
    /// The next statement fails.
    Error(QueryError),
    /// The next statement panics inside the engine future.
    Panic(String),
}

impl fmt::Debug for MockResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rows(rows) => f.debug_tuple("Rows").field(&rows.len()).finish(),
            Self::Affected(n) => f.debug_tuple("Affected").field(n).finish(),
            Self::Error(err) => f.debug_tuple("Error").field(&err.code).finish(),
            Self::Panic(msg) => f.debug_tuple("Panic").field(msg).finish(),
        }
    }
}

#[derive(Default)]
struct MockState {
    statements: Mutex<Vec<Statement>>,
    responses: Mutex<VecDeque<MockResponse>>,
}

/// A recording engine.
///
/// Clones share the statement log and the response queue, so the engine
/// handed to a transaction body records into the same log.
#[derive(Clone, Default)]
pub struct MockEngine {
    state: Arc<MockState>,
    latency: Option<Duration>,
}

impl MockEngine {
    /// Create an engine with an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every answer by `latency`.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Queue a response.
    pub fn push(&self, response: MockResponse) -> &Self {
        self.state.responses.lock().push_back(response);
        self
    }

    /// Queue rows given as JSON objects; non-object values are skipped.
    pub fn push_rows(&self, rows: impl IntoIterator<Item = Value>) -> &Self {
        let rows = rows
            .into_iter()
            .filter_map(|v| match v {
                Value::Object(map) => Some(map),
                _ => None,
            })
            .collect();
        self.push(MockResponse::Rows(rows))
    }

    /// Queue an affected-row count.
    pub fn push_affected(&self, count: u64) -> &Self {
        self.push(MockResponse::Affected(count))
    }

    /// Queue an error.
    pub fn push_error(&self, err: QueryError) -> &Self {
        self.push(MockResponse::Error(err))
    }

    /// Queue a panic.
    pub fn push_panic(&self, message: impl Into<String>) -> &Self {
        self.push(MockResponse::Panic(message.into()))
    }

    /// Every statement received so far.
    pub fn statements(&self) -> Vec<Statement> {
        self.state.statements.lock().clone()
    }

    /// The SQL of every statement received so far.
    pub fn executed_sql(&self) -> Vec<String> {
        self.state
            .statements
            .lock()
            .iter()
            .map(|s| s.sql.clone())
            .collect()
    }

    /// The most recent statement.
    pub fn last_statement(&self) -> Option<Statement> {
        self.state.statements.lock().last().cloned()
    }

    /// Number of queued responses not yet consumed.
    pub fn pending_responses(&self) -> usize {
        self.state.responses.lock().len()
    }

    /// Forget recorded statements.
    pub fn clear(&self) {
        self.state.statements.lock().clear();
    }

    fn record(&self, sql: &str, params: Vec<FilterValue>) {
        self.state.statements.lock().push(Statement::new(sql, params));
    }

    fn answer(&self, sql: &str, params: Vec<FilterValue>) -> Option<MockResponse> {
        self.record(sql, params);
        self.state.responses.lock().pop_front()
    }

    async fn delay(latency: Option<Duration>) {
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
    }
}

impl fmt::Debug for MockEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MockEngine")
            .field("statements", &self.state.statements.lock().len())
            .field("pending", &self.pending_responses())
            .field("latency", &self.latency)
            .finish()
    }
}

impl QueryEngine for MockEngine {
    fn query(&self, sql: &str, params: Vec<FilterValue>) -> BoxFuture<'_, QueryResult<Vec<Row>>> {
        let response = self.answer(sql, params);
        let latency = self.latency;
        Box::pin(async move {
            Self::delay(latency).await;
            match response {
                None | Some(MockResponse::Affected(_)) => Ok(Vec::new()),
                Some(MockResponse::Rows(rows)) => Ok(rows),
                Some(MockResponse::Error(err)) => Err(err),
                Some(MockResponse::Panic(msg)) => panic!("{}", msg),
            }
        })
    }

    fn execute(&self, sql: &str, params: Vec<FilterValue>) -> BoxFuture<'_, QueryResult<u64>> {
        let response = self.answer(sql, params);
        let latency = self.latency;
        Box::pin(async move {
            Self::delay(latency).await;
            match response {
                None => Ok(0),
                Some(MockResponse::Affected(n)) => Ok(n),
                Some(MockResponse::Rows(rows)) => Ok(rows.len() as u64),
                Some(MockResponse::Error(err)) => Err(err),
                Some(MockResponse::Panic(msg)) => panic!("{}", msg),
            }
        })
    }

    fn begin(&self, config: &TransactionConfig) -> BoxFuture<'_, QueryResult<Self>> {
        self.record(&config.to_begin_sql(), Vec::new());
        let latency = self.latency;
        Box::pin(async move {
            Self::delay(latency).await;
            Ok(self.clone())
        })
    }

    fn commit(&self) -> BoxFuture<'_, QueryResult<()>> {
        self.record("COMMIT", Vec::new());
        Box::pin(async { Ok(()) })
    }

    fn rollback(&self) -> BoxFuture<'_, QueryResult<()>> {
        self.record("ROLLBACK", Vec::new());
        Box::pin(async { Ok(()) })
    }
}
