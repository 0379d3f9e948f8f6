// Prospect discovery: web search, recency filtering, LLM extraction.
// Two workflows: direct LinkedIn profile search and company-based discovery.

pub mod agent;
pub mod extraction;
pub mod prompts;
pub mod recency;

pub use agent::{SearchAgent, SearchMode, SearchOutcome};
pub use recency::RecencyWindow;
