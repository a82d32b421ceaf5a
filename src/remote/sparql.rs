//! SPARQL 1.1 Protocol client

use async_trait::async_trait;
use reqwest::header::ACCEPT;
use tracing::debug;

use super::{create_client, parse_select_results, template_name, Binding, GraphClient, HttpClientConfig};
use crate::config::EndpointConfig;
use crate::error::RemoteQueryError;
use crate::parser::parse_ntriples;
use crate::term::Triple;

const NTRIPLES: &str = "application/n-triples";
const RESULTS_JSON: &str = "application/sparql-results+json";

/// A remote SPARQL endpoint reached over HTTP
///
/// Queries are sent as `application/x-www-form-urlencoded` POST bodies so
/// that long `VALUES` clauses are not limited by URL length.
pub struct SparqlClient {
    endpoint: String,
    http: reqwest::Client,
}

impl SparqlClient {
    pub fn new(endpoint: impl Into<String>, http: reqwest::Client) -> Self {
        Self {
            endpoint: endpoint.into(),
            http,
        }
    }

    /// Build a client from the `[endpoint]` configuration section
    pub fn from_config(config: &EndpointConfig) -> Result<Self, RemoteQueryError> {
        let http = create_client(&HttpClientConfig::from(config)).map_err(|e| RemoteQueryError::Transport {
            endpoint: config.url.clone(),
            message: e.to_string(),
        })?;
        Ok(Self::new(config.url.clone(), http))
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn post(&self, query: &str, accept: &str) -> Result<String, RemoteQueryError> {
        debug!(
            endpoint = %self.endpoint,
            template = template_name(query).unwrap_or("ad-hoc"),
            bytes = query.len(),
            "sending query"
        );

        let transport = |e: reqwest::Error| RemoteQueryError::Transport {
            endpoint: self.endpoint.clone(),
            message: e.to_string(),
        };

        let response = self
            .http
            .post(&self.endpoint)
            .header(ACCEPT, accept)
            .form(&[("query", query)])
            .send()
            .await
            .map_err(transport)?;

        let status = response.status();
        let body = response.text().await.map_err(transport)?;

        if !status.is_success() {
            return Err(RemoteQueryError::Status {
                endpoint: self.endpoint.clone(),
                status: status.as_u16(),
                body: body.chars().take(512).collect(),
            });
        }

        Ok(body)
    }
}

#[async_trait]
impl GraphClient for SparqlClient {
    async fn construct(&self, query: &str) -> Result<Vec<Triple>, RemoteQueryError> {
        let body = self.post(query, NTRIPLES).await?;
        parse_ntriples(&body).map_err(|e| RemoteQueryError::Decode {
            format: "n-triples",
            message: e.to_string(),
        })
    }

    async fn select(&self, query: &str) -> Result<Vec<Binding>, RemoteQueryError> {
        let body = self.post(query, RESULTS_JSON).await?;
        parse_select_results(&body)
    }
}
