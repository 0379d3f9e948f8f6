use serde::{Deserialize, Serialize};
use validator::Validate;

/// A company surfaced by company-discovery search. Deduplicated by
/// case-insensitive name within a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Company {
    pub name: String,
    pub domain: Option<String>,
}

impl Company {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into().trim().to_string(),
            domain: None,
        }
    }

    pub fn dedup_key(&self) -> String {
        self.name.to_lowercase()
    }
}

/// A hiring contact. Built by the search agent, enriched with an email by the
/// resolution agent, read-only afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prospect {
    pub first_name: String,
    pub last_name: String,
    pub company_name: String,
    pub company_domain: Option<String>,
    pub linkedin_profile: Option<String>,
    pub email: Option<String>,
    /// Lookup confidence (0-100) the accepted email was resolved with.
    pub email_confidence: Option<u8>,
    pub job_title: Option<String>,
}

impl Prospect {
    pub fn new(
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        company_name: impl Into<String>,
    ) -> Self {
        Self {
            first_name: first_name.into().trim().to_string(),
            last_name: last_name.into().trim().to_string(),
            company_name: company_name.into().trim().to_string(),
            company_domain: None,
            linkedin_profile: None,
            email: None,
            email_confidence: None,
            job_title: None,
        }
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }

    pub fn has_email(&self) -> bool {
        self.email.is_some()
    }

    /// Case-insensitive (first, last, company) identity used for deduplication.
    pub fn dedup_key(&self) -> (String, String, String) {
        (
            self.first_name.to_lowercase(),
            self.last_name.to_lowercase(),
            self.company_name.to_lowercase(),
        )
    }
}

/// Who the outreach is sent on behalf of. Supplied once per run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
pub struct SenderProfile {
    #[serde(default)]
    pub name: String,
    #[validate(email(message = "sender email must be a valid address"))]
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub skills: String,
    #[validate(length(min = 1, message = "goal is required"))]
    #[serde(default)]
    pub goal: String,
}

/// Splits a full name into (first, rest). A single token is a first name only.
pub fn split_name(full_name: &str) -> (String, String) {
    let mut parts = full_name.split_whitespace();
    match parts.next() {
        None => (String::new(), String::new()),
        Some(first) => (first.to_string(), parts.collect::<Vec<_>>().join(" ")),
    }
}

/// Drops later duplicates, keeping first-seen order.
pub fn dedup_prospects(prospects: Vec<Prospect>) -> Vec<Prospect> {
    let mut seen = std::collections::HashSet::new();
    prospects
        .into_iter()
        .filter(|p| seen.insert(p.dedup_key()))
        .collect()
}
