//! Scripted in-memory services for pipeline tests.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;

use super::{
    DomainContact, EmailCandidate, EmailLookup, MailTransport, OutgoingMessage, SearchHit,
    SearchRequest, SearchService, ServiceError,
};
use crate::llm_client::{LanguageModel, LlmError};

type SearchFn = dyn Fn(&SearchRequest) -> Result<Vec<SearchHit>, ServiceError> + Send + Sync;
type ModelFn = dyn Fn(&str, &str) -> Result<String, LlmError> + Send + Sync;

pub struct FakeSearch {
    respond: Box<SearchFn>,
    pub requests: Mutex<Vec<SearchRequest>>,
}

impl FakeSearch {
    pub fn new(
        respond: impl Fn(&SearchRequest) -> Result<Vec<SearchHit>, ServiceError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            respond: Box::new(respond),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn returning(hits: Vec<SearchHit>) -> Self {
        Self::new(move |_| Ok(hits.clone()))
    }

    pub fn queries(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.query.clone())
            .collect()
    }
}

#[async_trait]
impl SearchService for FakeSearch {
    async fn search(&self, request: &SearchRequest) -> Result<Vec<SearchHit>, ServiceError> {
        self.requests.lock().unwrap().push(request.clone());
        (self.respond)(request)
    }
}

pub struct FakeModel {
    respond: Box<ModelFn>,
    pub prompts: Mutex<Vec<String>>,
}

impl FakeModel {
    pub fn new(
        respond: impl Fn(&str, &str) -> Result<String, LlmError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            respond: Box::new(respond),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn replying(text: &str) -> Self {
        let text = text.to_string();
        Self::new(move |_, _| Ok(text.clone()))
    }

    pub fn call_count(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }
}

#[async_trait]
impl LanguageModel for FakeModel {
    async fn complete(&self, prompt: &str, system: &str) -> Result<String, LlmError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        (self.respond)(prompt, system)
    }
}

#[derive(Default)]
pub struct FakeLookup {
    /// (domain, first, last) lowercased → candidate
    pub finder: HashMap<(String, String, String), EmailCandidate>,
    /// domain → contacts
    pub domain_contacts: HashMap<String, Vec<DomainContact>>,
    pub reject_credentials: bool,
    pub finder_calls: Mutex<Vec<(String, String, String)>>,
    pub domain_calls: Mutex<Vec<String>>,
}

impl FakeLookup {
    pub fn with_finder(mut self, domain: &str, first: &str, last: &str, email: &str, confidence: u8) -> Self {
        self.finder.insert(
            (domain.to_lowercase(), first.to_lowercase(), last.to_lowercase()),
            EmailCandidate {
                email: email.to_string(),
                confidence,
            },
        );
        self
    }

    pub fn with_domain_contact(mut self, domain: &str, contact: DomainContact) -> Self {
        self.domain_contacts
            .entry(domain.to_string())
            .or_default()
            .push(contact);
        self
    }
}

#[async_trait]
impl EmailLookup for FakeLookup {
    async fn find_email(
        &self,
        domain: &str,
        first_name: &str,
        last_name: &str,
    ) -> Result<Option<EmailCandidate>, ServiceError> {
        if self.reject_credentials {
            return Err(ServiceError::configuration("email_lookup", "invalid api key"));
        }
        let key = (
            domain.to_lowercase(),
            first_name.to_lowercase(),
            last_name.to_lowercase(),
        );
        self.finder_calls.lock().unwrap().push(key.clone());
        Ok(self.finder.get(&key).cloned())
    }

    async fn domain_search(
        &self,
        domain: &str,
        _seniority: &str,
        limit: usize,
    ) -> Result<Vec<DomainContact>, ServiceError> {
        self.domain_calls.lock().unwrap().push(domain.to_string());
        Ok(self
            .domain_contacts
            .get(domain)
            .map(|c| c.iter().take(limit).cloned().collect())
            .unwrap_or_default())
    }
}

#[derive(Default)]
pub struct FakeTransport {
    pub fail_for: HashSet<String>,
    pub sent: Mutex<Vec<OutgoingMessage>>,
}

impl FakeTransport {
    pub fn failing_for(addresses: &[&str]) -> Self {
        Self {
            fail_for: addresses.iter().map(|a| a.to_string()).collect(),
            sent: Mutex::new(Vec::new()),
        }
    }

    pub fn sent_to(&self) -> Vec<String> {
        self.sent.lock().unwrap().iter().map(|m| m.to.clone()).collect()
    }
}

#[async_trait]
impl MailTransport for FakeTransport {
    async fn send(&self, message: &OutgoingMessage) -> Result<(), ServiceError> {
        if self.fail_for.contains(&message.to) {
            return Err(ServiceError::Rejected {
                service: "mail",
                status: 400,
                message: "mailbox unavailable".to_string(),
            });
        }
        self.sent.lock().unwrap().push(message.clone());
        Ok(())
    }
}

/// Search that never answers.
pub struct StalledSearch;

#[async_trait]
impl SearchService for StalledSearch {
    async fn search(&self, _request: &SearchRequest) -> Result<Vec<SearchHit>, ServiceError> {
        std::future::pending().await
    }
}

/// Transport that never finishes a send.
pub struct StalledTransport;

#[async_trait]
impl MailTransport for StalledTransport {
    async fn send(&self, _message: &OutgoingMessage) -> Result<(), ServiceError> {
        std::future::pending().await
    }
}

pub fn hit(url: &str, content: &str, published_date: Option<&str>) -> SearchHit {
    SearchHit {
        title: String::new(),
        content: content.to_string(),
        url: url.to_string(),
        published_date: published_date.map(str::to_string),
    }
}
