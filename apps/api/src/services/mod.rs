//! External collaborators consumed as black boxes: web search, email lookup,
//! and mail transport. Agents depend on the traits; the concrete clients wrap
//! the Tavily, Hunter and Gmail REST APIs.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::llm_client::LlmError;
use crate::throttle::Retryable;

pub mod gmail;
pub mod hunter;
pub mod tavily;

#[cfg(test)]
pub mod fakes;

pub use gmail::GmailTransport;
pub use hunter::HunterClient;
pub use tavily::TavilyClient;

// ────────────────────────────────────────────────────────────────────────────
// Errors
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ServiceError {
    /// Missing or rejected credentials. Fatal, never retried.
    #[error("{service} configuration error: {message}")]
    Configuration {
        service: &'static str,
        message: String,
    },

    /// Network failure, rate limiting, or a 5xx. Retried by the gate.
    #[error("{service} temporarily unavailable: {message}")]
    Transient {
        service: &'static str,
        message: String,
    },

    /// The service understood the request and refused it.
    #[error("{service} rejected the request (status {status}): {message}")]
    Rejected {
        service: &'static str,
        status: u16,
        message: String,
    },

    #[error("{service} returned an unreadable response: {message}")]
    Decode {
        service: &'static str,
        message: String,
    },
}

impl ServiceError {
    pub fn configuration(service: &'static str, message: impl Into<String>) -> Self {
        ServiceError::Configuration {
            service,
            message: message.into(),
        }
    }

    /// Classifies a non-success HTTP status.
    pub fn from_status(service: &'static str, status: u16, body: String) -> Self {
        match status {
            401 | 403 => ServiceError::Configuration {
                service,
                message: format!("credentials rejected (status {status}): {body}"),
            },
            408 | 429 | 500..=599 => ServiceError::Transient {
                service,
                message: format!("status {status}: {body}"),
            },
            _ => ServiceError::Rejected {
                service,
                status,
                message: body,
            },
        }
    }

    pub fn from_reqwest(service: &'static str, error: reqwest::Error) -> Self {
        if error.is_decode() {
            ServiceError::Decode {
                service,
                message: error.to_string(),
            }
        } else {
            ServiceError::Transient {
                service,
                message: error.to_string(),
            }
        }
    }

    pub fn is_configuration(&self) -> bool {
        matches!(self, ServiceError::Configuration { .. })
    }
}

impl Retryable for ServiceError {
    fn is_transient(&self) -> bool {
        matches!(self, ServiceError::Transient { .. })
    }
}

impl From<LlmError> for ServiceError {
    fn from(error: LlmError) -> Self {
        match error {
            LlmError::Api { status, message } => ServiceError::from_status("llm", status, message),
            LlmError::Http(e) => ServiceError::from_reqwest("llm", e),
            LlmError::Parse(e) => ServiceError::Decode {
                service: "llm",
                message: e.to_string(),
            },
            LlmError::EmptyContent => ServiceError::Decode {
                service: "llm",
                message: "empty content".to_string(),
            },
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Web search
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct SearchRequest {
    pub query: String,
    pub max_results: usize,
    pub recency_days: u32,
    pub include_domains: Vec<String>,
}

impl SearchRequest {
    pub fn new(query: impl Into<String>, max_results: usize, recency_days: u32) -> Self {
        Self {
            query: query.into(),
            max_results,
            recency_days,
            include_domains: Vec::new(),
        }
    }

    pub fn restricted_to(mut self, domain: &str) -> Self {
        self.include_domains.push(domain.to_string());
        self
    }
}

/// One ordered search result.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub published_date: Option<String>,
}

#[async_trait]
pub trait SearchService: Send + Sync {
    async fn search(&self, request: &SearchRequest) -> Result<Vec<SearchHit>, ServiceError>;
}

// ────────────────────────────────────────────────────────────────────────────
// Email lookup
// ────────────────────────────────────────────────────────────────────────────

/// A direct finder hit.
#[derive(Debug, Clone, PartialEq)]
pub struct EmailCandidate {
    pub email: String,
    /// 0-100
    pub confidence: u8,
}

/// One address from a domain-wide search.
#[derive(Debug, Clone, PartialEq)]
pub struct DomainContact {
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub confidence: u8,
}

#[async_trait]
pub trait EmailLookup: Send + Sync {
    async fn find_email(
        &self,
        domain: &str,
        first_name: &str,
        last_name: &str,
    ) -> Result<Option<EmailCandidate>, ServiceError>;

    async fn domain_search(
        &self,
        domain: &str,
        seniority: &str,
        limit: usize,
    ) -> Result<Vec<DomainContact>, ServiceError>;
}

// ────────────────────────────────────────────────────────────────────────────
// Mail transport
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct OutgoingMessage {
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[async_trait]
pub trait MailTransport: Send + Sync {
    async fn send(&self, message: &OutgoingMessage) -> Result<(), ServiceError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classification() {
        assert!(ServiceError::from_status("x", 401, String::new()).is_configuration());
        assert!(ServiceError::from_status("x", 403, String::new()).is_configuration());
        assert!(ServiceError::from_status("x", 429, String::new()).is_transient());
        assert!(ServiceError::from_status("x", 502, String::new()).is_transient());

        let rejected = ServiceError::from_status("x", 400, "bad".into());
        assert!(!rejected.is_transient());
        assert!(!rejected.is_configuration());
    }

    #[test]
    fn test_llm_auth_error_becomes_configuration() {
        let err: ServiceError = LlmError::Api {
            status: 401,
            message: "invalid x-api-key".into(),
        }
        .into();
        assert!(err.is_configuration());
        assert!(err.to_string().contains("llm"));
    }

    #[test]
    fn test_search_request_builder() {
        let req = SearchRequest::new("rust jobs", 5, 30).restricted_to("linkedin.com");
        assert_eq!(req.include_domains, vec!["linkedin.com".to_string()]);
        assert_eq!(req.recency_days, 30);
    }
}
