//! Search Agent — web search + recency filter + LLM extraction.
//!
//! Flow (linkedin):       search(linkedin.com) → date filter → extract leads
//! Flow (company-based):  search companies → date filter → extract companies →
//!                        per company: search contacts → date filter → extract contacts
//!
//! Stage-local failures degrade to partial results. Only configuration
//! errors (rejected credentials) propagate.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use crate::llm_client::prompts::{truncate_chars, JSON_ONLY_INSTRUCTION};
use crate::llm_client::{complete_json, strip_json_fences, LanguageModel};
use crate::models::prospect::dedup_prospects;
use crate::models::{Company, Prospect};
use crate::search::extraction::{
    companies_from_lines, companies_from_value, contacts_from_value, leads_from_value,
};
use crate::search::prompts::{
    COMPANY_EXTRACTION_PROMPT_TEMPLATE, COMPANY_EXTRACTION_SYSTEM,
    CONTACT_EXTRACTION_PROMPT_TEMPLATE, CONTACT_EXTRACTION_SYSTEM,
    LEAD_EXTRACTION_PROMPT_TEMPLATE, LEAD_EXTRACTION_SYSTEM,
};
use crate::search::recency::RecencyWindow;
use crate::services::{SearchHit, SearchRequest, SearchService, ServiceError};

/// Results requested from the company-discovery search.
const DISCOVERY_MAX_RESULTS: usize = 20;
const LEAD_CONTEXT_CHARS: usize = 5000;
const COMPANY_CONTEXT_CHARS: usize = 3000;
const COMPANY_SNIPPET_CHARS: usize = 500;

// ────────────────────────────────────────────────────────────────────────────
// Inputs / outputs
// ────────────────────────────────────────────────────────────────────────────

/// Which workflow to run, with its limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum SearchMode {
    /// Direct profile search on linkedin.com.
    Linkedin { max_results: usize },
    /// Company discovery, then contacts at each company.
    CompanyBased {
        max_companies: usize,
        max_prospects: usize,
    },
}

impl Default for SearchMode {
    fn default() -> Self {
        SearchMode::Linkedin { max_results: 10 }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchOutcome {
    pub companies: Vec<Company>,
    pub prospects: Vec<Prospect>,
}

// ────────────────────────────────────────────────────────────────────────────
// Agent
// ────────────────────────────────────────────────────────────────────────────

pub struct SearchAgent {
    search: Arc<dyn SearchService>,
    model: Arc<dyn LanguageModel>,
}

impl SearchAgent {
    pub fn new(search: Arc<dyn SearchService>, model: Arc<dyn LanguageModel>) -> Self {
        Self { search, model }
    }

    /// Runs the selected workflow. `on_step` receives human-readable progress.
    pub async fn search(
        &self,
        goal: &str,
        mode: SearchMode,
        recency_days: u32,
        on_step: &(dyn Fn(String) + Send + Sync),
    ) -> Result<SearchOutcome, ServiceError> {
        let window = RecencyWindow::new(recency_days);

        let outcome = match mode {
            SearchMode::Linkedin { max_results } => {
                on_step("Searching LinkedIn profiles...".to_string());
                let prospects = self
                    .search_linkedin_profiles(goal, max_results, &window)
                    .await?;
                SearchOutcome {
                    companies: Vec::new(),
                    prospects,
                }
            }
            SearchMode::CompanyBased {
                max_companies,
                max_prospects,
            } => {
                on_step("Searching for hiring companies...".to_string());
                let mut companies = self.search_companies(goal, &window).await?;
                companies.truncate(max_companies);

                let mut prospects = Vec::new();
                let total = companies.len();
                for (idx, company) in companies.iter().enumerate() {
                    on_step(format!(
                        "Searching contacts at {} ({}/{})...",
                        company.name,
                        idx + 1,
                        total
                    ));
                    let found = self
                        .search_contacts(company, max_prospects, &window)
                        .await?;
                    prospects.extend(found);
                }

                SearchOutcome {
                    companies,
                    prospects,
                }
            }
        };

        let prospects = dedup_prospects(outcome.prospects);
        info!(
            "Search for '{}' found {} companies and {} unique prospects",
            goal,
            outcome.companies.len(),
            prospects.len()
        );

        Ok(SearchOutcome {
            companies: outcome.companies,
            prospects,
        })
    }

    /// Direct LinkedIn profile search.
    pub async fn search_linkedin_profiles(
        &self,
        goal: &str,
        max_results: usize,
        window: &RecencyWindow,
    ) -> Result<Vec<Prospect>, ServiceError> {
        let request = SearchRequest::new(
            format!("{goal} linkedin profiles"),
            max_results,
            window.days(),
        )
        .restricted_to("linkedin.com");

        let hits = match self.run_search(&request, window).await? {
            Some(hits) if !hits.is_empty() => hits,
            _ => {
                warn!("No LinkedIn results found for '{}'", goal);
                return Ok(Vec::new());
            }
        };

        info!(
            "Extracting names, domains and LinkedIn URLs from {} recent results...",
            hits.len()
        );
        let context = render_context(&hits, None);
        let prompt = LEAD_EXTRACTION_PROMPT_TEMPLATE
            .replace("{goal}", goal)
            .replace("{raw_context}", truncate_chars(&context, LEAD_CONTEXT_CHARS));
        let system = format!("{LEAD_EXTRACTION_SYSTEM} {JSON_ONLY_INSTRUCTION}");

        let leads = match self.extract_json(&prompt, &system).await? {
            Some(value) => leads_from_value(value),
            None => Vec::new(),
        };

        info!("Found {} leads from LinkedIn search", leads.len());
        Ok(leads)
    }

    /// Company discovery for a goal.
    pub async fn search_companies(
        &self,
        goal: &str,
        window: &RecencyWindow,
    ) -> Result<Vec<Company>, ServiceError> {
        let request = SearchRequest::new(
            format!("{goal} companies hiring job openings"),
            DISCOVERY_MAX_RESULTS,
            window.days(),
        );

        let hits = match self.run_search(&request, window).await? {
            Some(hits) if !hits.is_empty() => hits,
            _ => return Ok(Vec::new()),
        };

        let context = render_context(&hits, Some(COMPANY_SNIPPET_CHARS));
        let prompt = COMPANY_EXTRACTION_PROMPT_TEMPLATE
            .replace("{goal}", goal)
            .replace("{raw_context}", truncate_chars(&context, COMPANY_CONTEXT_CHARS));
        let system = format!("{COMPANY_EXTRACTION_SYSTEM} {JSON_ONLY_INSTRUCTION}");

        // Company names are simple enough to salvage from a plain-text answer.
        let companies = match self.model.complete(&prompt, &system).await {
            Ok(text) => match serde_json::from_str::<Value>(strip_json_fences(&text)) {
                Ok(value) => companies_from_value(value),
                Err(_) => {
                    warn!("Company extraction was not JSON, falling back to line parsing");
                    companies_from_lines(&text)
                }
            },
            Err(e) => {
                let e = ServiceError::from(e);
                if e.is_configuration() {
                    return Err(e);
                }
                warn!("Company extraction failed: {e}");
                Vec::new()
            }
        };

        for company in &companies {
            info!("Found company: {}", company.name);
        }
        Ok(companies)
    }

    /// Hiring contacts at one company, at most `max_prospects`.
    pub async fn search_contacts(
        &self,
        company: &Company,
        max_prospects: usize,
        window: &RecencyWindow,
    ) -> Result<Vec<Prospect>, ServiceError> {
        let request = SearchRequest::new(
            format!("hiring manager recruiter jobs at {} LinkedIn", company.name),
            max_prospects,
            window.days(),
        );

        let hits = match self.run_search(&request, window).await? {
            Some(hits) if !hits.is_empty() => hits,
            _ => return Ok(Vec::new()),
        };

        let context = render_context(&hits, Some(COMPANY_SNIPPET_CHARS));
        let prompt = CONTACT_EXTRACTION_PROMPT_TEMPLATE
            .replace("{company_name}", &company.name)
            .replace("{raw_context}", truncate_chars(&context, COMPANY_CONTEXT_CHARS));
        let system = format!("{CONTACT_EXTRACTION_SYSTEM} {JSON_ONLY_INSTRUCTION}");

        let mut contacts = match self.extract_json(&prompt, &system).await? {
            Some(value) => contacts_from_value(value, company),
            None => Vec::new(),
        };
        contacts.truncate(max_prospects);

        info!("Found {} prospects at {}", contacts.len(), company.name);
        Ok(contacts)
    }

    /// Runs one search and applies the recency window. `None` means the call
    /// failed in a way the stage tolerates.
    async fn run_search(
        &self,
        request: &SearchRequest,
        window: &RecencyWindow,
    ) -> Result<Option<Vec<SearchHit>>, ServiceError> {
        match self.search.search(request).await {
            Ok(hits) => Ok(Some(window.filter(hits))),
            Err(e) if e.is_configuration() => Err(e),
            Err(e) => {
                warn!("Search '{}' failed, continuing with partial results: {e}", request.query);
                Ok(None)
            }
        }
    }

    /// Structured extraction. Unparseable output is an extraction miss, not an error.
    async fn extract_json(&self, prompt: &str, system: &str) -> Result<Option<Value>, ServiceError> {
        match complete_json::<Value>(self.model.as_ref(), prompt, system).await {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                let e = ServiceError::from(e);
                if e.is_configuration() {
                    return Err(e);
                }
                warn!("Extraction failed, dropping results: {e}");
                Ok(None)
            }
        }
    }
}

/// Renders hits as the plain-text block the extraction prompts expect.
fn render_context(hits: &[SearchHit], snippet_chars: Option<usize>) -> String {
    hits.iter()
        .map(|h| {
            let content = match snippet_chars {
                Some(limit) => truncate_chars(&h.content, limit),
                None => h.content.as_str(),
            };
            format!(
                "URL: {}\nTitle: {}\nContent: {}\nDate: {}\n---\n",
                h.url,
                h.title,
                content,
                h.published_date.as_deref().unwrap_or("N/A")
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm_client::LlmError;
    use crate::services::fakes::{hit, FakeModel, FakeSearch};

    fn no_progress() -> impl Fn(String) + Send + Sync {
        |_| {}
    }

    fn today() -> String {
        chrono::Utc::now().format("%Y-%m-%d").to_string()
    }

    #[tokio::test]
    async fn test_linkedin_search_extracts_leads() {
        let search = Arc::new(FakeSearch::returning(vec![hit(
            "https://linkedin.com/in/janedoe",
            "Jane Doe - Engineering Manager at Acme",
            Some(&today()),
        )]));
        let model = Arc::new(FakeModel::replying(
            r#"{"leads":[{"first_name":"Jane","last_name":"Doe","domain":"acme.com","linkedin_url":"https://linkedin.com/in/janedoe"}]}"#,
        ));
        let agent = SearchAgent::new(search.clone(), model.clone());

        let outcome = agent
            .search("Rust Engineer", SearchMode::Linkedin { max_results: 5 }, 30, &no_progress())
            .await
            .unwrap();

        assert_eq!(outcome.prospects.len(), 1);
        assert_eq!(outcome.prospects[0].full_name(), "Jane Doe");

        let requests = search.requests.lock().unwrap();
        assert_eq!(requests[0].query, "Rust Engineer linkedin profiles");
        assert_eq!(requests[0].include_domains, vec!["linkedin.com".to_string()]);
        assert_eq!(requests[0].recency_days, 30);
    }

    #[tokio::test]
    async fn test_zero_results_skip_extraction() {
        let search = Arc::new(FakeSearch::returning(Vec::new()));
        let model = Arc::new(FakeModel::replying("{}"));
        let agent = SearchAgent::new(search, model.clone());

        let outcome = agent
            .search("Frontend Developer", SearchMode::Linkedin { max_results: 5 }, 30, &no_progress())
            .await
            .unwrap();

        assert!(outcome.prospects.is_empty());
        assert_eq!(model.call_count(), 0);
    }

    #[tokio::test]
    async fn test_stale_results_are_filtered_before_extraction() {
        let search = Arc::new(FakeSearch::returning(vec![hit(
            "https://linkedin.com/in/old",
            "Old post",
            Some("2001-01-01"),
        )]));
        let model = Arc::new(FakeModel::replying("{}"));
        let agent = SearchAgent::new(search, model.clone());

        let outcome = agent
            .search("Rust", SearchMode::Linkedin { max_results: 5 }, 30, &no_progress())
            .await
            .unwrap();

        assert!(outcome.prospects.is_empty());
        assert_eq!(model.call_count(), 0);
    }

    #[tokio::test]
    async fn test_transient_search_failure_degrades_to_empty() {
        let search = Arc::new(FakeSearch::new(|_| {
            Err(ServiceError::Transient {
                service: "search",
                message: "timeout".into(),
            })
        }));
        let agent = SearchAgent::new(search, Arc::new(FakeModel::replying("{}")));

        let outcome = agent
            .search("Rust", SearchMode::Linkedin { max_results: 5 }, 30, &no_progress())
            .await
            .unwrap();
        assert!(outcome.prospects.is_empty());
    }

    #[tokio::test]
    async fn test_configuration_error_propagates() {
        let search = Arc::new(FakeSearch::new(|_| {
            Err(ServiceError::configuration("search", "invalid API key"))
        }));
        let agent = SearchAgent::new(search, Arc::new(FakeModel::replying("{}")));

        let err = agent
            .search("Rust", SearchMode::Linkedin { max_results: 5 }, 30, &no_progress())
            .await
            .unwrap_err();
        assert!(err.is_configuration());
    }

    #[tokio::test]
    async fn test_unparseable_extraction_drops_results() {
        let search = Arc::new(FakeSearch::returning(vec![hit("https://linkedin.com/in/a", "x", None)]));
        let agent = SearchAgent::new(search, Arc::new(FakeModel::replying("Sorry, I can't help.")));

        let outcome = agent
            .search("Rust", SearchMode::Linkedin { max_results: 5 }, 30, &no_progress())
            .await
            .unwrap();
        assert!(outcome.prospects.is_empty());
    }

    #[tokio::test]
    async fn test_llm_auth_failure_is_fatal() {
        let search = Arc::new(FakeSearch::returning(vec![hit("https://linkedin.com/in/a", "x", None)]));
        let model = Arc::new(FakeModel::new(|_, _| {
            Err(LlmError::Api {
                status: 401,
                message: "invalid x-api-key".into(),
            })
        }));
        let agent = SearchAgent::new(search, model);

        let err = agent
            .search("Rust", SearchMode::Linkedin { max_results: 5 }, 30, &no_progress())
            .await
            .unwrap_err();
        assert!(err.is_configuration());
    }

    #[tokio::test]
    async fn test_company_mode_limits_companies_and_contacts() {
        let search = Arc::new(FakeSearch::new(|req| {
            Ok(vec![hit("https://example.com", &req.query, None)])
        }));
        let model = Arc::new(FakeModel::new(|prompt, _| {
            if prompt.contains("Extract company names") {
                Ok(r#"{"companies":["Acme Corp","Globex","Initech"]}"#.to_string())
            } else if prompt.contains("for Acme Corp") {
                Ok(r#"{"prospects":[{"name":"Jane Doe"},{"name":"John Roe"},{"name":"Extra Person"}]}"#.to_string())
            } else {
                Ok(r#"{"prospects":[{"name":"Hank Scorpio","title":"CEO"}]}"#.to_string())
            }
        }));
        let agent = SearchAgent::new(search.clone(), model);
        let steps = std::sync::Mutex::new(Vec::new());
        let record = |s: String| steps.lock().unwrap().push(s);

        let outcome = agent
            .search(
                "Rust Engineer",
                SearchMode::CompanyBased {
                    max_companies: 2,
                    max_prospects: 2,
                },
                45,
                &record,
            )
            .await
            .unwrap();

        let companies: Vec<_> = outcome.companies.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(companies, vec!["Acme Corp", "Globex"]);
        assert_eq!(outcome.prospects.len(), 3);
        assert_eq!(outcome.prospects[2].company_name, "Globex");
        assert_eq!(outcome.prospects[2].job_title.as_deref(), Some("CEO"));

        let queries = search.queries();
        assert_eq!(queries[0], "Rust Engineer companies hiring job openings");
        assert_eq!(queries[1], "hiring manager recruiter jobs at Acme Corp LinkedIn");
        assert_eq!(queries.len(), 3);
        assert!(steps.lock().unwrap().iter().any(|s| s.contains("(2/2)")));
    }

    #[tokio::test]
    async fn test_company_mode_continues_after_failed_company() {
        let search = Arc::new(FakeSearch::new(|req| {
            if req.query.contains("Acme Corp") {
                Err(ServiceError::Transient {
                    service: "search",
                    message: "502".into(),
                })
            } else {
                Ok(vec![hit("https://example.com", "x", None)])
            }
        }));
        let model = Arc::new(FakeModel::new(|prompt, _| {
            if prompt.contains("Extract company names") {
                Ok("Acme Corp\nGlobex".to_string())
            } else {
                Ok(r#"[{"name":"Hank Scorpio"}]"#.to_string())
            }
        }));
        let agent = SearchAgent::new(search, model);

        let outcome = agent
            .search(
                "Rust",
                SearchMode::CompanyBased {
                    max_companies: 5,
                    max_prospects: 5,
                },
                45,
                &no_progress(),
            )
            .await
            .unwrap();

        assert_eq!(outcome.companies.len(), 2);
        assert_eq!(outcome.prospects.len(), 1);
        assert_eq!(outcome.prospects[0].company_name, "Globex");
    }

    #[test]
    fn test_render_context_truncates_snippets() {
        let long = "x".repeat(800);
        let rendered = render_context(&[hit("u", &long, None)], Some(500));
        assert!(rendered.contains("Date: N/A"));
        assert!(!rendered.contains(&"x".repeat(501)));
    }
}
