//! Boundary validation for model-extracted entities.
//!
//! The model's output is parsed entry by entry: one malformed entry is dropped
//! without losing its siblings. Everything leaving this module is a
//! fixed-shape `Company` or `Prospect`.

use std::collections::HashSet;

use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::models::prospect::split_name;
use crate::models::{Company, Prospect};
use crate::resolution::domain::{company_name_from_domain, normalize_domain};

/// Companies taken from a single extraction call.
pub const MAX_COMPANIES_PER_EXTRACTION: usize = 20;

#[derive(Debug, Deserialize)]
struct RawLead {
    #[serde(default)]
    first_name: Option<String>,
    #[serde(default)]
    last_name: Option<String>,
    #[serde(default)]
    domain: Option<String>,
    #[serde(default)]
    linkedin_url: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawCompany {
    Name(String),
    Entry {
        #[serde(default)]
        name: Option<String>,
        #[serde(default)]
        domain: Option<String>,
    },
}

#[derive(Debug, Deserialize)]
struct RawContact {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    linkedin: Option<String>,
}

/// Pulls the entity list out of `{"<key>": [...]}`, a bare array, or a single object.
fn entries(value: Value, key: &str) -> Vec<Value> {
    match value {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove(key) {
            Some(Value::Array(items)) => items,
            Some(_) => Vec::new(),
            None => vec![Value::Object(map)],
        },
        _ => Vec::new(),
    }
}

fn non_empty(field: Option<String>) -> Option<String> {
    field.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

fn linkedin_url(field: Option<String>) -> Option<String> {
    non_empty(field).filter(|url| url.to_lowercase().contains("linkedin.com/"))
}

/// LinkedIn-mode leads. Every lead needs first and last name, a usable
/// company domain, and a LinkedIn profile URL.
pub fn leads_from_value(value: Value) -> Vec<Prospect> {
    entries(value, "leads")
        .into_iter()
        .filter_map(|entry| match serde_json::from_value::<RawLead>(entry) {
            Ok(raw) => Some(raw),
            Err(e) => {
                debug!("Dropping malformed lead: {e}");
                None
            }
        })
        .filter_map(|raw| {
            let first_name = non_empty(raw.first_name)?;
            let last_name = non_empty(raw.last_name)?;
            let domain = raw.domain.as_deref().and_then(normalize_domain)?;
            let profile = linkedin_url(raw.linkedin_url)?;

            let mut prospect =
                Prospect::new(first_name, last_name, company_name_from_domain(&domain));
            prospect.company_domain = Some(domain);
            prospect.linkedin_profile = Some(profile);
            Some(prospect)
        })
        .collect()
}

/// Company discovery output, deduplicated case-insensitively.
pub fn companies_from_value(value: Value) -> Vec<Company> {
    let candidates = entries(value, "companies")
        .into_iter()
        .filter_map(|entry| serde_json::from_value::<RawCompany>(entry).ok())
        .map(|raw| match raw {
            RawCompany::Name(name) => (Some(name), None),
            RawCompany::Entry { name, domain } => (name, domain),
        })
        .filter_map(|(name, domain)| {
            let mut company = Company::new(non_empty(name)?);
            company.domain = domain.as_deref().and_then(normalize_domain);
            Some(company)
        });

    dedup_companies(candidates)
}

/// Fallback for a model that answered with one company name per line.
pub fn companies_from_lines(text: &str) -> Vec<Company> {
    let candidates = text.lines().map(|line| {
        let name = line
            .trim()
            .trim_start_matches(|c: char| c.is_ascii_digit() || matches!(c, '.' | ')' | '-' | '*' | '•'))
            .trim();
        Company::new(name)
    });
    dedup_companies(candidates)
}

fn dedup_companies(candidates: impl Iterator<Item = Company>) -> Vec<Company> {
    let mut seen = HashSet::new();
    candidates
        // Two-character names are almost always extraction noise.
        .filter(|c| c.name.chars().count() > 2)
        .filter(|c| seen.insert(c.dedup_key()))
        .take(MAX_COMPANIES_PER_EXTRACTION)
        .collect()
}

/// Contacts found at `company`. Only a first name is mandatory.
pub fn contacts_from_value(value: Value, company: &Company) -> Vec<Prospect> {
    entries(value, "prospects")
        .into_iter()
        .filter_map(|entry| serde_json::from_value::<RawContact>(entry).ok())
        .filter_map(|raw| {
            let (first_name, last_name) = split_name(&non_empty(raw.name)?);
            if first_name.is_empty() {
                return None;
            }
            let mut prospect = Prospect::new(first_name, last_name, company.name.clone());
            prospect.company_domain = company.domain.clone();
            prospect.job_title = non_empty(raw.title);
            prospect.linkedin_profile = linkedin_url(raw.linkedin);
            Some(prospect)
        })
        .collect()
}
