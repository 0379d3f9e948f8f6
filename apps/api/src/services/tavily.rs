//! Tavily web search client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{SearchHit, SearchRequest, SearchService, ServiceError};
use crate::throttle::ServiceGate;

const TAVILY_API_URL: &str = "https://api.tavily.com/search";
const SERVICE: &str = "search";

#[derive(Debug, Serialize)]
struct TavilyRequest<'a> {
    api_key: &'a str,
    query: &'a str,
    search_depth: &'a str,
    max_results: usize,
    days: u32,
    #[serde(skip_serializing_if = "no_domains")]
    include_domains: &'a [String],
}

fn no_domains(domains: &&[String]) -> bool {
    domains.is_empty()
}

#[derive(Debug, Deserialize)]
struct TavilyResponse {
    #[serde(default)]
    results: Vec<SearchHit>,
}

pub struct TavilyClient {
    client: Client,
    api_key: String,
    api_url: String,
    gate: ServiceGate,
}

impl TavilyClient {
    pub fn new(api_key: String, gate: ServiceGate) -> Result<Self, ServiceError> {
        Self::with_api_url(api_key, TAVILY_API_URL.to_string(), gate)
    }

    pub fn with_api_url(
        api_key: String,
        api_url: String,
        gate: ServiceGate,
    ) -> Result<Self, ServiceError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| ServiceError::from_reqwest(SERVICE, e))?;
        Ok(Self {
            client,
            api_key,
            api_url,
            gate,
        })
    }

    async fn search_once(&self, request: &SearchRequest) -> Result<Vec<SearchHit>, ServiceError> {
        let body = TavilyRequest {
            api_key: &self.api_key,
            query: &request.query,
            search_depth: "advanced",
            max_results: request.max_results,
            days: request.recency_days,
            include_domains: &request.include_domains,
        };

        let response = self
            .client
            .post(&self.api_url)
            .json(&body)
            .send()
            .await
            .map_err(|e| ServiceError::from_reqwest(SERVICE, e))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(ServiceError::from_status(SERVICE, status.as_u16(), text));
        }

        let parsed: TavilyResponse = response
            .json()
            .await
            .map_err(|e| ServiceError::from_reqwest(SERVICE, e))?;

        debug!(
            "Search '{}' returned {} results",
            request.query,
            parsed.results.len()
        );
        Ok(parsed.results)
    }
}

#[async_trait]
impl SearchService for TavilyClient {
    async fn search(&self, request: &SearchRequest) -> Result<Vec<SearchHit>, ServiceError> {
        self.gate.call(move || self.search_once(request)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::throttle::{RateLimiter, RetryPolicy};

    fn client(url: String) -> TavilyClient {
        let gate = ServiceGate::new(
            SERVICE,
            RateLimiter::with_interval(Duration::ZERO),
            RetryPolicy::new(2, Duration::ZERO, crate::throttle::Backoff::Fixed),
        );
        TavilyClient::with_api_url("tvly-test".into(), format!("{url}/search"), gate).unwrap()
    }

    #[tokio::test]
    async fn test_search_sends_domain_filter_and_parses_results() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/search")
            .match_body(mockito::Matcher::PartialJson(serde_json::json!({
                "api_key": "tvly-test",
                "query": "Rust Engineer linkedin profiles",
                "days": 30,
                "include_domains": ["linkedin.com"],
            })))
            .with_status(200)
            .with_body(
                r#"{"results":[
                    {"title":"Jane Doe - Acme","content":"Recruiter at Acme","url":"https://linkedin.com/in/janedoe","published_date":"2026-10-01"},
                    {"title":"No date","content":"...","url":"https://linkedin.com/in/x"}
                ]}"#,
            )
            .create_async()
            .await;

        let request = SearchRequest::new("Rust Engineer linkedin profiles", 5, 30)
            .restricted_to("linkedin.com");
        let hits = client(server.url()).search(&request).await.unwrap();

        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].published_date.as_deref(), Some("2026-10-01"));
        assert!(hits[1].published_date.is_none());
    }

    #[tokio::test]
    async fn test_unauthorized_is_configuration_error() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/search")
            .with_status(401)
            .with_body(r#"{"detail":{"error":"Unauthorized: missing or invalid API key."}}"#)
            .expect(1)
            .create_async()
            .await;

        let err = client(server.url())
            .search(&SearchRequest::new("q", 5, 30))
            .await
            .unwrap_err();

        assert!(err.is_configuration());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_rate_limited_is_retried() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/search")
            .with_status(429)
            .expect(2)
            .create_async()
            .await;

        let err = client(server.url())
            .search(&SearchRequest::new("q", 5, 30))
            .await
            .unwrap_err();

        assert!(matches!(err, ServiceError::Transient { .. }));
        mock.assert_async().await;
    }
}
