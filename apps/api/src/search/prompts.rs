// LLM prompts for turning raw search results into structured entities.

/// System prompt for LinkedIn lead extraction.
pub const LEAD_EXTRACTION_SYSTEM: &str = "You are a lead generation expert. \
    Extract people's information from LinkedIn search results.";

/// LinkedIn lead extraction. Replace `{goal}` and `{raw_context}`.
pub const LEAD_EXTRACTION_PROMPT_TEMPLATE: &str = r#"Extract a list of people and their LinkedIn URLs from the search results below.
They were found while looking for: {goal}
Guess the company domain (e.g. "consultadd.com") if it is not explicitly mentioned.

Return a JSON object with this EXACT schema:
{
  "leads": [
    {
      "first_name": "Jane",
      "last_name": "Doe",
      "domain": "acme.com",
      "linkedin_url": "https://www.linkedin.com/in/janedoe"
    }
  ]
}

TEXT:
{raw_context}"#;

/// System prompt for company discovery.
pub const COMPANY_EXTRACTION_SYSTEM: &str = "You are a helpful assistant that extracts \
    company names from job search results.";

/// Company extraction. Replace `{goal}` and `{raw_context}`.
pub const COMPANY_EXTRACTION_PROMPT_TEMPLATE: &str = r#"Extract company names from the following job search results related to "{goal}".
Focus on companies that are actively hiring or have job openings.
Include the company's website domain when it is mentioned.

Return a JSON object with this EXACT schema:
{
  "companies": [
    {"name": "Acme Corp", "domain": "acme.com"}
  ]
}

Search Results:
{raw_context}"#;

/// System prompt for contact extraction at one company.
pub const CONTACT_EXTRACTION_SYSTEM: &str = "You are a helpful assistant that extracts \
    hiring manager and recruiter information from search results.";

/// Contact extraction. Replace `{company_name}` and `{raw_context}`.
pub const CONTACT_EXTRACTION_PROMPT_TEMPLATE: &str = r#"Extract hiring manager and recruiter information from the following search results for {company_name}.
For each person found, extract their full name, job title (if mentioned) and LinkedIn profile URL (if mentioned).

Return a JSON object with this EXACT schema:
{
  "prospects": [
    {"name": "John Doe", "title": "Hiring Manager", "linkedin": "https://linkedin.com/in/johndoe"},
    {"name": "Jane Smith", "title": "Recruiter", "linkedin": ""}
  ]
}

Search Results:
{raw_context}"#;
