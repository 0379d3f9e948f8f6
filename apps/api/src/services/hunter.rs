//! Hunter.io email lookup client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use super::{DomainContact, EmailCandidate, EmailLookup, ServiceError};
use crate::throttle::ServiceGate;

const HUNTER_API_URL: &str = "https://api.hunter.io/v2";
const SERVICE: &str = "email_lookup";

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: Option<T>,
}

#[derive(Debug, Deserialize)]
struct FinderData {
    email: Option<String>,
    #[serde(default)]
    score: Option<u8>,
}

#[derive(Debug, Deserialize)]
struct DomainSearchData {
    #[serde(default)]
    emails: Vec<DomainEmail>,
}

#[derive(Debug, Deserialize)]
struct DomainEmail {
    value: Option<String>,
    first_name: Option<String>,
    last_name: Option<String>,
    #[serde(default)]
    confidence: Option<u8>,
}

pub struct HunterClient {
    client: Client,
    api_key: String,
    base_url: String,
    gate: ServiceGate,
}

impl HunterClient {
    pub fn new(api_key: String, gate: ServiceGate) -> Result<Self, ServiceError> {
        Self::with_base_url(api_key, HUNTER_API_URL.to_string(), gate)
    }

    pub fn with_base_url(
        api_key: String,
        base_url: String,
        gate: ServiceGate,
    ) -> Result<Self, ServiceError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| ServiceError::from_reqwest(SERVICE, e))?;
        Ok(Self {
            client,
            api_key,
            base_url,
            gate,
        })
    }

    async fn get_once<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        params: &[(&str, String)],
    ) -> Result<Option<T>, ServiceError> {
        let response = self
            .client
            .get(format!("{}/{endpoint}", self.base_url))
            .query(params)
            .query(&[("api_key", self.api_key.as_str())])
            .send()
            .await
            .map_err(|e| ServiceError::from_reqwest(SERVICE, e))?;

        let status = response.status();
        // Hunter answers 404 when it has nothing for the person.
        if status.as_u16() == 404 {
            return Ok(None);
        }
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(ServiceError::from_status(SERVICE, status.as_u16(), text));
        }

        let envelope: Envelope<T> = response
            .json()
            .await
            .map_err(|e| ServiceError::from_reqwest(SERVICE, e))?;
        Ok(envelope.data)
    }
}

#[async_trait]
impl EmailLookup for HunterClient {
    async fn find_email(
        &self,
        domain: &str,
        first_name: &str,
        last_name: &str,
    ) -> Result<Option<EmailCandidate>, ServiceError> {
        let params = [
            ("domain", domain.to_string()),
            ("first_name", first_name.to_string()),
            ("last_name", last_name.to_string()),
        ];
        let params = &params;

        let data: Option<FinderData> = self
            .gate
            .call(move || self.get_once("email-finder", params))
            .await?;

        Ok(data.and_then(|d| {
            d.email.map(|email| EmailCandidate {
                email,
                confidence: d.score.unwrap_or(0),
            })
        }))
    }

    async fn domain_search(
        &self,
        domain: &str,
        seniority: &str,
        limit: usize,
    ) -> Result<Vec<DomainContact>, ServiceError> {
        let params = [
            ("domain", domain.to_string()),
            ("seniority", seniority.to_string()),
            ("limit", limit.to_string()),
        ];
        let params = &params;

        let data: Option<DomainSearchData> = self
            .gate
            .call(move || self.get_once("domain-search", params))
            .await?;

        Ok(data
            .map(|d| d.emails)
            .unwrap_or_default()
            .into_iter()
            .filter_map(|e| {
                e.value.map(|email| DomainContact {
                    email,
                    first_name: e.first_name,
                    last_name: e.last_name,
                    confidence: e.confidence.unwrap_or(0),
                })
            })
            .collect())
    }
}
