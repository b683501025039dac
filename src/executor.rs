use std::sync::Arc;

use async_trait::async_trait;

use crate::{QueryResult, Result, Statement};

/// Runs one statement to completion and returns its normalized rows.
///
/// [`crate::TrinoClient`] is the production implementation; the drift
/// engine is generic over this trait so it can run against fixtures.
#[async_trait]
pub trait StatementExecutor: Send + Sync {
    async fn execute(&self, statement: &Statement) -> Result<QueryResult>;
}

#[async_trait]
impl<T: StatementExecutor + ?Sized> StatementExecutor for Arc<T> {
    async fn execute(&self, statement: &Statement) -> Result<QueryResult> {
        (**self).execute(statement).await
    }
}
