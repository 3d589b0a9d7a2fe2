//! SPARQL-over-HTTP executor.
//!
//! Queries are POSTed as `application/x-www-form-urlencoded` with a `query`
//! field (SPARQL 1.1 Protocol), asking for
//! `application/sparql-results+json`.

use std::time::Duration;

use async_trait::async_trait;
use protoquery_core::{ExecutionError, QueryParams, SparqlExecutor, SparqlResults};
use reqwest::header::ACCEPT;
use tracing::debug;
use url::Url;

pub const RESULTS_MEDIA_TYPE: &str = "application/sparql-results+json";

/// Client bound to one endpoint.
#[derive(Debug, Clone)]
pub struct SparqlClient {
    endpoint: Url,
    params: QueryParams,
    http: reqwest::Client,
}

impl SparqlClient {
    /// Accepts `http`/`https` URLs with a host.
    pub fn new(endpoint: &str) -> Result<Self, ExecutionError> {
        Ok(Self {
            endpoint: parse_endpoint(endpoint)?,
            params: QueryParams::new(),
            http: reqwest::Client::new(),
        })
    }

    /// Like [`SparqlClient::new`], with a request timeout.
    pub fn with_timeout(endpoint: &str, timeout: Duration) -> Result<Self, ExecutionError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ExecutionError::Transport(format!("failed to build http client: {e}")))?;
        Ok(Self {
            endpoint: parse_endpoint(endpoint)?,
            params: QueryParams::new(),
            http,
        })
    }

    /// Parameters sent with every query. Per-call parameters win on conflict.
    pub fn with_params(mut self, params: QueryParams) -> Self {
        self.params = params;
        self
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Form fields for one request: `query` first, then the extra parameters.
    fn form(&self, query: &str, params: &QueryParams) -> Vec<(String, String)> {
        let mut merged = self.params.clone();
        merged.extend(params.iter().map(|(k, v)| (k.clone(), v.clone())));
        merged.remove("query");

        let mut form = vec![("query".to_string(), query.to_string())];
        form.extend(merged);
        form
    }
}

fn parse_endpoint(endpoint: &str) -> Result<Url, ExecutionError> {
    let url = Url::parse(endpoint)
        .map_err(|e| ExecutionError::InvalidEndpoint(format!("{endpoint}: {e}")))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ExecutionError::InvalidEndpoint(format!(
            "{endpoint}: unsupported scheme `{}`",
            url.scheme()
        )));
    }
    if url.host_str().map_or(true, str::is_empty) {
        return Err(ExecutionError::InvalidEndpoint(format!(
            "{endpoint}: missing host"
        )));
    }
    Ok(url)
}

#[async_trait]
impl SparqlExecutor for SparqlClient {
    async fn execute(
        &self,
        query: &str,
        params: &QueryParams,
    ) -> Result<SparqlResults, ExecutionError> {
        debug!(endpoint = %self.endpoint, "sending query");

        let resp = self
            .http
            .post(self.endpoint.clone())
            .header(ACCEPT, RESULTS_MEDIA_TYPE)
            .form(&self.form(query, params))
            .send()
            .await
            .map_err(|e| {
                ExecutionError::Transport(format!("failed to reach {}: {e}", self.endpoint))
            })?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| ExecutionError::Transport(format!("failed to read response: {e}")))?;

        if !status.is_success() {
            return Err(ExecutionError::Http {
                status: status.as_u16(),
                message: body,
            });
        }

        let results: SparqlResults = serde_json::from_str(&body)
            .map_err(|e| ExecutionError::InvalidResponse(e.to_string()))?;
        debug!(rows = results.rows().len(), "received results");
        Ok(results)
    }
}
