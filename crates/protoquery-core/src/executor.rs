//! Execution collaborator: runs query text somewhere and returns rows.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::error::ExecutionError;
use crate::results::SparqlResults;

/// Extra request parameters forwarded with the query (e.g. `timeout`).
pub type QueryParams = BTreeMap<String, String>;

/// Trait for SPARQL query engines.
#[async_trait]
pub trait SparqlExecutor: Send + Sync {
    /// Run `query` and return the full result set.
    async fn execute(
        &self,
        query: &str,
        params: &QueryParams,
    ) -> Result<SparqlResults, ExecutionError>;
}

#[async_trait]
impl<T: SparqlExecutor + ?Sized> SparqlExecutor for Arc<T> {
    async fn execute(
        &self,
        query: &str,
        params: &QueryParams,
    ) -> Result<SparqlResults, ExecutionError> {
        (**self).execute(query, params).await
    }
}

/// Canned executor for tests and dry runs. Records every query it receives.
pub struct MockExecutor {
    response: Result<SparqlResults, ExecutionError>,
    queries: Mutex<Vec<String>>,
}

impl MockExecutor {
    pub fn new(results: SparqlResults) -> Self {
        Self {
            response: Ok(results),
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(error: ExecutionError) -> Self {
        Self {
            response: Err(error),
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().clone()
    }
}

#[async_trait]
impl SparqlExecutor for MockExecutor {
    async fn execute(
        &self,
        query: &str,
        _params: &QueryParams,
    ) -> Result<SparqlResults, ExecutionError> {
        self.queries.lock().push(query.to_string());
        self.response.clone()
    }
}
