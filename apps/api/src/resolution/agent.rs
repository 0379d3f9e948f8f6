use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::models::Prospect;
use crate::resolution::domain::guess_domain;
use crate::resolution::validation::is_acceptable;
use crate::services::{DomainContact, EmailCandidate, EmailLookup, ServiceError};

const DOMAIN_SEARCH_SENIORITY: &str = "senior";
const DOMAIN_SEARCH_LIMIT: usize = 10;

/// Resolves corporate emails for prospects, one lookup at a time.
pub struct EmailResolver {
    lookup: Arc<dyn EmailLookup>,
    min_confidence: u8,
}

impl EmailResolver {
    pub fn new(lookup: Arc<dyn EmailLookup>, min_confidence: u8) -> Self {
        Self {
            lookup,
            min_confidence,
        }
    }

    /// Resolves every prospect in order. Misses leave the prospect unchanged.
    pub async fn resolve_all(
        &self,
        prospects: Vec<Prospect>,
        on_step: &(dyn Fn(String) + Send + Sync),
    ) -> Result<Vec<Prospect>, ServiceError> {
        let total = prospects.len();
        let mut resolved = Vec::with_capacity(total);

        for (idx, prospect) in prospects.into_iter().enumerate() {
            on_step(format!(
                "Finding email for {} ({}/{})...",
                prospect.full_name(),
                idx + 1,
                total
            ));
            resolved.push(self.resolve(prospect).await?);
        }

        let found = resolved.iter().filter(|p| p.has_email()).count();
        info!("Resolved {}/{} emails", found, total);
        Ok(resolved)
    }

    /// Finder on the known (or guessed) domain first, then a domain-wide search.
    pub async fn resolve(&self, mut prospect: Prospect) -> Result<Prospect, ServiceError> {
        if prospect.has_email() {
            return Ok(prospect);
        }

        let domain = match prospect.company_domain.clone() {
            Some(domain) => domain,
            None => match guess_domain(&prospect.company_name) {
                Some(guessed) => {
                    debug!("Guessed domain {} for {}", guessed, prospect.company_name);
                    prospect.company_domain = Some(guessed.clone());
                    guessed
                }
                None => {
                    debug!("No domain for {}, skipping lookup", prospect.full_name());
                    return Ok(prospect);
                }
            },
        };

        if let Some(candidate) = self.find_direct(&prospect, &domain).await? {
            info!(
                "Found email for {}: {} (confidence {})",
                prospect.full_name(),
                candidate.email,
                candidate.confidence
            );
            prospect.email = Some(candidate.email.trim().to_string());
            prospect.email_confidence = Some(candidate.confidence);
            return Ok(prospect);
        }

        if let Some(contact) = self.find_in_domain(&prospect, &domain).await? {
            info!(
                "Found email for {} via domain search: {} (confidence {})",
                prospect.full_name(),
                contact.email,
                contact.confidence
            );
            prospect.email = Some(contact.email.trim().to_string());
            prospect.email_confidence = Some(contact.confidence);
            return Ok(prospect);
        }

        debug!("No acceptable email for {}", prospect.full_name());
        Ok(prospect)
    }

    async fn find_direct(
        &self,
        prospect: &Prospect,
        domain: &str,
    ) -> Result<Option<EmailCandidate>, ServiceError> {
        if prospect.first_name.is_empty() || prospect.last_name.is_empty() {
            return Ok(None);
        }

        let candidate = match self
            .lookup
            .find_email(domain, &prospect.first_name, &prospect.last_name)
            .await
        {
            Ok(candidate) => candidate,
            Err(e) if e.is_configuration() => return Err(e),
            Err(e) => {
                warn!("Email finder failed for {}: {e}", prospect.full_name());
                None
            }
        };

        Ok(candidate.filter(|c| {
            let accepted = is_acceptable(&c.email, c.confidence, self.min_confidence);
            if !accepted {
                debug!(
                    "Rejected {} (confidence {} < {} or invalid)",
                    c.email, c.confidence, self.min_confidence
                );
            }
            accepted
        }))
    }

    async fn find_in_domain(
        &self,
        prospect: &Prospect,
        domain: &str,
    ) -> Result<Option<DomainContact>, ServiceError> {
        let contacts = match self
            .lookup
            .domain_search(domain, DOMAIN_SEARCH_SENIORITY, DOMAIN_SEARCH_LIMIT)
            .await
        {
            Ok(contacts) => contacts,
            Err(e) if e.is_configuration() => return Err(e),
            Err(e) => {
                warn!("Domain search failed for {domain}: {e}");
                return Ok(None);
            }
        };

        Ok(contacts
            .into_iter()
            .filter(|c| matches_name(c, prospect))
            .filter(|c| is_acceptable(&c.email, c.confidence, self.min_confidence))
            .max_by_key(|c| c.confidence))
    }
}

fn matches_name(contact: &DomainContact, prospect: &Prospect) -> bool {
    let same = |field: &Option<String>, expected: &str| {
        field
            .as_deref()
            .unwrap_or_default()
            .trim()
            .eq_ignore_ascii_case(expected)
    };
    same(&contact.first_name, &prospect.first_name) && same(&contact.last_name, &prospect.last_name)
}
