// Prompts for drafting outreach messages.

/// System prompt for outreach drafting. Plain text out, not JSON.
pub const OUTREACH_SYSTEM: &str = "You are a professional email writer who creates brief, \
    friendly, and effective outreach emails. \
    Write the email body only. \
    Do NOT include a subject line or a signature. \
    Do NOT use placeholders such as [Name] or [Company].";

/// Outreach drafting prompt.
/// Replace: {full_name}, {first_name}, {company_name}, {job_title_line},
///          {sender_block}, {template_block}
pub const OUTREACH_PROMPT_TEMPLATE: &str = r#"Generate a concise, professional email to {full_name} at {company_name}.
{job_title_line}
The email should:
- Be brief and friendly (2-3 short paragraphs)
- Mention that you were researching {company_name}
- Express interest in opportunities or collaboration
- Request a brief conversation
- Use a casual but professional tone

{sender_block}
{template_block}
Generate the email body only (no subject line, no signature). Start with "Hi {first_name},":"#;
