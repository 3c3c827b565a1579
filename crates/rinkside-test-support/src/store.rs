//! Scripted `RelationalStore` for tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rinkside_core::error::CoreError;
use rinkside_core::store::{RelationalStore, RelationalTransaction, SqlParam, SqlRow};

#[derive(Debug, Default)]
struct Shared {
    results: Mutex<VecDeque<Vec<SqlRow>>>,
    calls: Mutex<Vec<(String, Vec<SqlParam>)>>,
}

impl Shared {
    fn record(&self, sql: &str, params: &[SqlParam]) {
        self.calls
            .lock()
            .unwrap()
            .push((sql.to_owned(), params.to_vec()));
    }

    fn next_rows(&self) -> Vec<SqlRow> {
        self.results.lock().unwrap().pop_front().unwrap_or_default()
    }
}

/// A relational store that returns scripted row sets in order and records
/// every statement it sees. Transactions share the same script and record.
#[derive(Debug, Default)]
pub struct StaticRelationalStore {
    shared: Arc<Shared>,
}

impl StaticRelationalStore {
    /// A store whose successive `query` calls return the given row sets;
    /// once exhausted, queries return no rows.
    #[must_use]
    pub fn with_rows(results: Vec<Vec<SqlRow>>) -> Self {
        Self {
            shared: Arc::new(Shared {
                results: Mutex::new(results.into()),
                calls: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Every statement executed so far, with its bound parameters, in
    /// order, across both direct calls and transactions.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn executed_queries(&self) -> Vec<(String, Vec<SqlParam>)> {
        self.shared.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl RelationalStore for StaticRelationalStore {
    async fn query(&self, sql: &str, params: &[SqlParam]) -> Result<Vec<SqlRow>, CoreError> {
        self.shared.record(sql, params);
        Ok(self.shared.next_rows())
    }

    async fn execute(&self, sql: &str, params: &[SqlParam]) -> Result<u64, CoreError> {
        self.shared.record(sql, params);
        Ok(1)
    }

    async fn begin(&self) -> Result<Box<dyn RelationalTransaction>, CoreError> {
        Ok(Box::new(StaticTransaction {
            shared: Arc::clone(&self.shared),
        }))
    }
}

struct StaticTransaction {
    shared: Arc<Shared>,
}

#[async_trait]
impl RelationalTransaction for StaticTransaction {
    async fn query(&mut self, sql: &str, params: &[SqlParam]) -> Result<Vec<SqlRow>, CoreError> {
        self.shared.record(sql, params);
        Ok(self.shared.next_rows())
    }

    async fn execute(&mut self, sql: &str, params: &[SqlParam]) -> Result<u64, CoreError> {
        self.shared.record(sql, params);
        Ok(1)
    }

    async fn commit(self: Box<Self>) -> Result<(), CoreError> {
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), CoreError> {
        Ok(())
    }
}
