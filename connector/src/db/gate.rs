//! Policy & execution gate
//!
//! Sole component allowed to talk to the database. Every call re-runs the
//! policy immediately before execution, whatever the caller checked already.

use std::sync::Arc;

use sql_policy::QueryPolicy;

use super::executor::QueryExecutor;
use super::value::ResultSet;
use crate::error::GateError;

#[derive(Clone)]
pub struct Gate {
    policy: QueryPolicy,
    executor: Arc<dyn QueryExecutor>,
}

impl Gate {
    pub fn new(policy: QueryPolicy, executor: Arc<dyn QueryExecutor>) -> Self {
        Self { policy, executor }
    }

    pub fn policy(&self) -> &QueryPolicy {
        &self.policy
    }

    /// Run one read-only statement and return all of its rows
    ///
    /// Exactly one database round trip on acceptance, none on rejection.
    /// Failures are all-or-nothing and never retried.
    pub async fn execute(&self, sql: &str) -> Result<ResultSet, GateError> {
        let accepted = self.policy.classify(sql)?;
        let rows = self.executor.fetch_all(accepted).await?;
        Ok(rows)
    }
}


#[cfg(test)]
mod tests {
    use super::testing::{row, RecordingExecutor};
    use super::*;
    use serde_json::json;
    use sql_policy::Rejection;

    fn gate(executor: &Arc<RecordingExecutor>) -> Gate {
        Gate::new(QueryPolicy::default(), executor.clone())
    }

    #[tokio::test]
    async fn test_accepted_query_runs_trimmed_text_once() {
        let rows = vec![row(&[("id", json!(1)), ("name", json!("Ada"))])];
        let executor = Arc::new(RecordingExecutor::returning(rows.clone()));

        let result = gate(&executor)
            .execute("  SELECT id, name FROM company.employees\n")
            .await
            .unwrap();

        assert_eq!(result, rows);
        assert_eq!(executor.calls(), 1);
        assert_eq!(executor.seen(), vec!["SELECT id, name FROM company.employees"]);
    }

    #[tokio::test]
    async fn test_empty_input_is_invalid_without_round_trip() {
        let executor = Arc::new(RecordingExecutor::returning(vec![]));

        let err = gate(&executor).execute("   ").await.unwrap_err();

        assert!(matches!(err, GateError::InvalidInput));
        assert_eq!(executor.calls(), 0);
    }

    #[tokio::test]
    async fn test_write_statement_is_policy_violation() {
        let executor = Arc::new(RecordingExecutor::returning(vec![]));

        let err = gate(&executor)
            .execute("DELETE FROM company.employees")
            .await
            .unwrap_err();

        assert!(matches!(err, GateError::PolicyViolation(Rejection::NotReadOnly)));
        assert_eq!(executor.calls(), 0);
    }

    #[tokio::test]
    async fn test_unscoped_schema_is_policy_violation() {
        let executor = Arc::new(RecordingExecutor::returning(vec![]));

        let err = gate(&executor)
            .execute("SELECT * FROM public.users")
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            GateError::PolicyViolation(Rejection::SchemaNotPermitted { .. })
        ));
        assert_eq!(executor.calls(), 0);
    }

    #[tokio::test]
    async fn test_database_error_is_execution_failure() {
        let executor = Arc::new(RecordingExecutor::failing("column \"salary\" does not exist"));

        let err = gate(&executor)
            .execute("SELECT salary FROM company.employees")
            .await
            .unwrap_err();

        assert!(matches!(err, GateError::ExecutionFailure(_)));
        assert!(err.to_string().contains("salary"));
        assert_eq!(executor.calls(), 1);
    }

    #[tokio::test]
    async fn test_empty_result_is_not_an_error() {
        let executor = Arc::new(RecordingExecutor::returning(vec![]));

        let result = gate(&executor)
            .execute("select id, name from company.widgets")
            .await
            .unwrap();

        assert!(result.is_empty());
    }
}
