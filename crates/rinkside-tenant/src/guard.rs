//! The tenant isolation guard.

use std::sync::Arc;

use rinkside_core::error::{CoreError, codes};
use rinkside_core::metrics::Metrics;
use rinkside_core::store::{RelationalStore, RelationalTransaction, SqlParam, SqlRow};
use rinkside_core::tenant::TenantId;
use uuid::Uuid;

/// Counter incremented on every cross-tenant row sighting.
const CROSS_TENANT_COUNTER: &str = "tenant.cross_tenant_attempts";

/// How much of the query text is kept in security logs.
const QUERY_LOG_LIMIT: usize = 120;

/// Routes every relational query through tenant validation, a query-shape
/// lint, and a post-execution row check.
///
/// The lint is a static check on the query text, not a guarantee of
/// correctness — it catches the common class of "forgot to scope" bugs.
/// The row check is defense in depth behind it.
#[derive(Clone)]
pub struct TenantGuard {
    store: Arc<dyn RelationalStore>,
    metrics: Arc<dyn Metrics>,
}

impl TenantGuard {
    /// Creates a guard over the given relational store.
    #[must_use]
    pub fn new(store: Arc<dyn RelationalStore>, metrics: Arc<dyn Metrics>) -> Self {
        Self { store, metrics }
    }

    /// Runs a tenant-scoped query. The tenant id is bound as `$1`; caller
    /// parameters start at `$2`.
    ///
    /// # Errors
    ///
    /// `INVALID_TENANT_ID` for a malformed tenant, then
    /// `QUERY_MISSING_TENANT_FILTER` for an unscoped query, then whatever
    /// the store returns, then `TENANT_ISOLATION_VIOLATION` if any result
    /// row belongs to another tenant.
    pub async fn query(
        &self,
        tenant_id: &str,
        sql: &str,
        params: &[SqlParam],
    ) -> Result<Vec<SqlRow>, CoreError> {
        let tenant = TenantId::parse(tenant_id)?;
        ensure_tenant_filter(sql)?;
        let rows = self.store.query(sql, &with_tenant(tenant, params)).await?;
        self.verify_rows(tenant, sql, &rows)?;
        Ok(rows)
    }

    /// Runs a tenant-scoped statement, returning the affected row count.
    ///
    /// # Errors
    ///
    /// Same contract as [`TenantGuard::query`], minus the row check.
    pub async fn execute(
        &self,
        tenant_id: &str,
        sql: &str,
        params: &[SqlParam],
    ) -> Result<u64, CoreError> {
        let tenant = TenantId::parse(tenant_id)?;
        ensure_tenant_filter(sql)?;
        self.store.execute(sql, &with_tenant(tenant, params)).await
    }

    /// Opens a tenant-scoped transaction. Every statement inside it is
    /// held to the same contract as the one-shot methods.
    ///
    /// # Errors
    ///
    /// `INVALID_TENANT_ID` for a malformed tenant, or the store's error
    /// when the transaction cannot be opened.
    pub async fn begin(&self, tenant_id: &str) -> Result<GuardedTransaction, CoreError> {
        let tenant = TenantId::parse(tenant_id)?;
        let tx = self.store.begin().await?;
        Ok(GuardedTransaction {
            tenant,
            tx,
            metrics: Arc::clone(&self.metrics),
        })
    }

    fn verify_rows(&self, tenant: TenantId, sql: &str, rows: &[SqlRow]) -> Result<(), CoreError> {
        verify_rows(tenant, sql, rows, self.metrics.as_ref())
    }
}

/// A transaction whose every statement is tenant-guarded.
pub struct GuardedTransaction {
    tenant: TenantId,
    tx: Box<dyn RelationalTransaction>,
    metrics: Arc<dyn Metrics>,
}

impl GuardedTransaction {
    /// The tenant this transaction is scoped to.
    #[must_use]
    pub fn tenant(&self) -> TenantId {
        self.tenant
    }

    /// Runs a guarded query inside the transaction.
    ///
    /// # Errors
    ///
    /// Same contract as [`TenantGuard::query`].
    pub async fn query(&mut self, sql: &str, params: &[SqlParam]) -> Result<Vec<SqlRow>, CoreError> {
        ensure_tenant_filter(sql)?;
        let rows = self.tx.query(sql, &with_tenant(self.tenant, params)).await?;
        verify_rows(self.tenant, sql, &rows, self.metrics.as_ref())?;
        Ok(rows)
    }

    /// Runs a guarded statement inside the transaction.
    ///
    /// # Errors
    ///
    /// Same contract as [`TenantGuard::execute`].
    pub async fn execute(&mut self, sql: &str, params: &[SqlParam]) -> Result<u64, CoreError> {
        ensure_tenant_filter(sql)?;
        self.tx.execute(sql, &with_tenant(self.tenant, params)).await
    }

    /// Commits the transaction.
    ///
    /// # Errors
    ///
    /// Propagates the store's commit failure.
    pub async fn commit(self) -> Result<(), CoreError> {
        self.tx.commit().await
    }

    /// Rolls the transaction back.
    ///
    /// # Errors
    ///
    /// Propagates the store's rollback failure.
    pub async fn rollback(self) -> Result<(), CoreError> {
        self.tx.rollback().await
    }
}

fn with_tenant(tenant: TenantId, params: &[SqlParam]) -> Vec<SqlParam> {
    let mut bound = Vec::with_capacity(params.len() + 1);
    bound.push(SqlParam::Uuid(tenant.as_uuid()));
    bound.extend_from_slice(params);
    bound
}

fn ensure_tenant_filter(sql: &str) -> Result<(), CoreError> {
    if sql.to_lowercase().contains("tenant_id") {
        return Ok(());
    }
    Err(CoreError::tenant_isolation(
        codes::QUERY_MISSING_TENANT_FILTER,
        "query text does not reference a tenant_id condition",
    ))
}

fn verify_rows(
    tenant: TenantId,
    sql: &str,
    rows: &[SqlRow],
    metrics: &dyn Metrics,
) -> Result<(), CoreError> {
    let expected = tenant.as_uuid();
    for row in rows {
        // Rows without a tenant_id field (aggregates, counts) are not checked.
        let Some(value) = row.get("tenant_id") else {
            continue;
        };
        let actual = value.as_str().and_then(|s| Uuid::parse_str(s).ok());
        if actual == Some(expected) {
            continue;
        }
        tracing::error!(
            severity = "HIGH",
            security_event = "cross_tenant_row",
            expected_tenant = %expected,
            actual_tenant = ?actual,
            query = truncate(sql),
            "result row belongs to a different tenant"
        );
        metrics.increment(CROSS_TENANT_COUNTER, &[]);
        return Err(CoreError::tenant_isolation(
            codes::TENANT_ISOLATION_VIOLATION,
            "result row belongs to a different tenant",
        ));
    }
    Ok(())
}

fn truncate(sql: &str) -> &str {
    match sql.char_indices().nth(QUERY_LOG_LIMIT) {
        Some((idx, _)) => &sql[..idx],
        None => sql,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use rinkside_core::store::{SqlParam, SqlRow};
    use rinkside_test_support::{RecordingMetrics, StaticRelationalStore};
    use uuid::Uuid;

    use super::*;

    const TENANT: &str = "6f1c0f6e-2c5a-4b63-9c39-0f0f3a1b2c3d";

    fn row_for(tenant: &str) -> SqlRow {
        let mut row = SqlRow::new();
        row.push("id", serde_json::json!(Uuid::new_v4().to_string()));
        row.push("tenant_id", serde_json::json!(tenant));
        row
    }

    #[tokio::test]
    async fn test_query_rejects_malformed_tenant_before_store() {
        // Arrange
        let store = Arc::new(StaticRelationalStore::default());
        let guard = TenantGuard::new(store.clone(), Arc::new(RecordingMetrics::default()));

        // Act
        let err = guard
            .query("not-a-uuid", "SELECT 1 WHERE tenant_id = $1", &[])
            .await
            .unwrap_err();

        // Assert
        assert_eq!(err.code(), "INVALID_TENANT_ID");
        assert!(store.executed_queries().is_empty());
    }

    #[tokio::test]
    async fn test_query_missing_tenant_filter_never_reaches_store() {
        let store = Arc::new(StaticRelationalStore::default());
        let guard = TenantGuard::new(store.clone(), Arc::new(RecordingMetrics::default()));

        let err = guard
            .query(TENANT, "SELECT * FROM games WHERE id = $2", &[])
            .await
            .unwrap_err();

        assert_eq!(err.code(), "QUERY_MISSING_TENANT_FILTER");
        assert!(store.executed_queries().is_empty());
    }

    #[tokio::test]
    async fn test_tenant_is_prepended_as_first_parameter() {
        let store = Arc::new(StaticRelationalStore::default());
        let guard = TenantGuard::new(store.clone(), Arc::new(RecordingMetrics::default()));

        guard
            .query(
                TENANT,
                "SELECT l.tenant_id FROM leagues l WHERE l.tenant_id = $1 AND l.id = $2",
                &[SqlParam::Uuid(Uuid::new_v4())],
            )
            .await
            .unwrap();

        let calls = store.executed_queries();
        assert_eq!(calls.len(), 1);
        assert_eq!(
            calls[0].1.first(),
            Some(&SqlParam::Uuid(Uuid::parse_str(TENANT).unwrap()))
        );
        assert_eq!(calls[0].1.len(), 2);
    }

    #[tokio::test]
    async fn test_matching_rows_pass_the_post_check() {
        let store = Arc::new(StaticRelationalStore::with_rows(vec![vec![
            row_for(TENANT),
            row_for(TENANT),
        ]]));
        let guard = TenantGuard::new(store, Arc::new(RecordingMetrics::default()));

        let rows = guard
            .query(TENANT, "SELECT tenant_id FROM leagues WHERE tenant_id = $1", &[])
            .await
            .unwrap();

        assert_eq!(rows.len(), 2);
    }

    #[tokio::test]
    async fn test_foreign_row_raises_isolation_violation_and_counts() {
        // Arrange
        let other = Uuid::new_v4().to_string();
        let store = Arc::new(StaticRelationalStore::with_rows(vec![vec![
            row_for(TENANT),
            row_for(&other),
        ]]));
        let metrics = Arc::new(RecordingMetrics::default());
        let guard = TenantGuard::new(store, metrics.clone());

        // Act
        let err = guard
            .query(TENANT, "SELECT tenant_id FROM leagues WHERE tenant_id = $1", &[])
            .await
            .unwrap_err();

        // Assert
        assert_eq!(err.code(), "TENANT_ISOLATION_VIOLATION");
        assert_eq!(metrics.counter("tenant.cross_tenant_attempts"), 1);
    }

    #[tokio::test]
    async fn test_rows_without_tenant_field_are_not_checked() {
        let mut aggregate_row = SqlRow::new();
        aggregate_row.push("games_played", serde_json::json!(12));
        let store = Arc::new(StaticRelationalStore::with_rows(vec![vec![aggregate_row]]));
        let guard = TenantGuard::new(store, Arc::new(RecordingMetrics::default()));

        let rows = guard
            .query(
                TENANT,
                "SELECT count(*) AS games_played FROM games g \
                 JOIN seasons s ON s.id = g.season_id \
                 JOIN leagues l ON l.id = s.league_id \
                 WHERE l.tenant_id = $1",
                &[],
            )
            .await
            .unwrap();

        assert_eq!(rows.len(), 1);
    }

    #[tokio::test]
    async fn test_transaction_statements_are_linted_too() {
        let store = Arc::new(StaticRelationalStore::default());
        let guard = TenantGuard::new(store, Arc::new(RecordingMetrics::default()));

        let mut tx = guard.begin(TENANT).await.unwrap();
        let err = tx
            .execute("UPDATE games SET home_score = home_score + 1", &[])
            .await
            .unwrap_err();
        tx.rollback().await.unwrap();

        assert_eq!(err.code(), "QUERY_MISSING_TENANT_FILTER");
    }
}
