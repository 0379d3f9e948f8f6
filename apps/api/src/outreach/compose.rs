//! Deterministic parts of an outreach message: placeholder substitution,
//! the greeting line, the subject and the signature. Only the free-form
//! middle of the body comes from the model.

use crate::models::{Prospect, SenderProfile};

/// Placeholders understood in templates, subjects and generated bodies.
pub const PLACEHOLDERS: &[&str] = &[
    "{first_name}",
    "{last_name}",
    "{full_name}",
    "{company_name}",
    "{job_title}",
    "{sender_name}",
    "{sender_email}",
    "{sender_skills}",
    "{goal}",
];

const GREETING_WORDS: &[&str] = &["hi", "hello", "hey", "dear"];

/// Fills every known placeholder. Unknown braces are left alone.
pub fn substitute(text: &str, prospect: &Prospect, sender: &SenderProfile) -> String {
    let values = [
        prospect.first_name.clone(),
        prospect.last_name.clone(),
        prospect.full_name(),
        prospect.company_name.clone(),
        prospect.job_title.clone().unwrap_or_default(),
        sender.name.clone(),
        sender.email.clone().unwrap_or_default(),
        sender.skills.clone(),
        sender.goal.clone(),
    ];

    PLACEHOLDERS
        .iter()
        .zip(values.iter())
        .fold(text.to_string(), |acc, (placeholder, value)| {
            acc.replace(placeholder, value)
        })
}

pub fn greeting(prospect: &Prospect) -> String {
    if prospect.first_name.is_empty() {
        "Hi there,".to_string()
    } else {
        format!("Hi {},", prospect.first_name)
    }
}

/// Forces the body to open with our greeting, replacing whatever salutation
/// the model chose.
pub fn ensure_greeting(body: &str, prospect: &Prospect) -> String {
    let rest = strip_salutation(body);
    if rest.is_empty() {
        greeting(prospect)
    } else {
        format!("{}\n\n{}", greeting(prospect), rest)
    }
}

/// The body with any leading salutation line removed, trimmed.
pub fn strip_salutation(body: &str) -> &str {
    let body = body.trim();
    match body.split_once('\n') {
        Some((first, rest)) if is_salutation(first) => rest.trim(),
        None if is_salutation(body) => "",
        _ => body,
    }
}

fn is_salutation(line: &str) -> bool {
    let line = line.trim();
    let first_word = line
        .split(|c: char| c.is_whitespace() || c == ',')
        .next()
        .unwrap_or_default()
        .to_lowercase();
    line.ends_with(',') && line.len() <= 60 && GREETING_WORDS.contains(&first_word.as_str())
}

pub fn signature(sender: &SenderProfile) -> Option<String> {
    let name = sender.name.trim();
    if name.is_empty() {
        return None;
    }
    let mut sig = format!("Best regards,\n{name}");
    if let Some(email) = sender.email.as_deref().filter(|e| !e.trim().is_empty()) {
        sig.push('\n');
        sig.push_str(email.trim());
    }
    Some(sig)
}

/// Caller subject with placeholders filled, or the default for the company.
pub fn subject(custom: Option<&str>, prospect: &Prospect, sender: &SenderProfile) -> String {
    match custom.map(str::trim).filter(|s| !s.is_empty()) {
        Some(custom) => substitute(custom, prospect, sender),
        None => format!("Quick question regarding {}", prospect.company_name),
    }
}

/// Final body: placeholders filled, greeting enforced, signature appended.
pub fn finish_body(generated: &str, prospect: &Prospect, sender: &SenderProfile) -> String {
    let body = ensure_greeting(&substitute(generated, prospect, sender), prospect);
    match signature(sender) {
        Some(sig) => format!("{body}\n\n{sig}"),
        None => body,
    }
}
