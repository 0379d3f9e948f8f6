use validator::ValidateEmail;

/// Syntactic check only. Deliverability is the lookup service's confidence score.
pub fn is_valid_email(email: &str) -> bool {
    let email = email.trim();
    !email.is_empty() && email.validate_email()
}

/// The acceptance rule every resolved address goes through.
pub fn is_acceptable(email: &str, confidence: u8, min_confidence: u8) -> bool {
    confidence >= min_confidence && is_valid_email(email)
}
