/// Normalizes a URL or bare domain to a lower-case host without `www.`,
/// scheme, port, path or query. Returns `None` for anything without a dot.
pub fn normalize_domain(url_or_domain: &str) -> Option<String> {
    let mut rest = url_or_domain.trim();
    for scheme in ["https://", "http://"] {
        if let Some(stripped) = rest.strip_prefix(scheme) {
            rest = stripped;
        }
    }

    let host = rest
        .split(['/', '?', '#'])
        .next()
        .unwrap_or_default()
        .split(':')
        .next()
        .unwrap_or_default()
        .to_lowercase();
    let host = host.strip_prefix("www.").unwrap_or(&host);

    if host.contains('.') && !host.starts_with('.') && !host.ends_with('.') {
        Some(host.to_string())
    } else {
        None
    }
}

/// Guesses a `.com` domain from a company name: lower-cased, `&` spelled
/// out, everything non-alphanumeric removed.
pub fn guess_domain(company_name: &str) -> Option<String> {
    let stem: String = company_name
        .to_lowercase()
        .replace('&', "and")
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect();

    if stem.is_empty() {
        None
    } else {
        Some(format!("{stem}.com"))
    }
}

/// Display name for a company known only by its domain: `acme-labs.io` → `Acme-labs`.
pub fn company_name_from_domain(domain: &str) -> String {
    let label = domain.split('.').next().unwrap_or_default();
    let mut chars = label.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_domain_strips_url_parts() {
        assert_eq!(
            normalize_domain("https://www.Acme.com/jobs?id=3").as_deref(),
            Some("acme.com")
        );
        assert_eq!(normalize_domain("acme.io:8080").as_deref(), Some("acme.io"));
        assert_eq!(normalize_domain("  acme.co.uk ").as_deref(), Some("acme.co.uk"));
    }

    #[test]
    fn test_normalize_domain_rejects_non_domains() {
        assert_eq!(normalize_domain(""), None);
        assert_eq!(normalize_domain("acme"), None);
        assert_eq!(normalize_domain("https://"), None);
    }

    #[test]
    fn test_guess_domain() {
        assert_eq!(guess_domain("Acme Corp").as_deref(), Some("acmecorp.com"));
        assert_eq!(guess_domain("Johnson & Johnson").as_deref(), Some("johnsonandjohnson.com"));
        assert_eq!(guess_domain("Foo, Inc.").as_deref(), Some("fooinc.com"));
        assert_eq!(guess_domain("!!!"), None);
    }

    #[test]
    fn test_company_name_from_domain() {
        assert_eq!(company_name_from_domain("acme-labs.io"), "Acme-labs");
        assert_eq!(company_name_from_domain("stripe.com"), "Stripe");
    }
}
