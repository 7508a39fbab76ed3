use super::ApiError;

/// Top-level domains accepted at registration.
const ALLOWED_EMAIL_SUFFIXES: &[&str] = &[".com", ".dk", ".net", ".org", ".edu"];

pub fn validate_email(email: &str) -> Result<&str, ApiError> {
    let email = email.trim();
    let invalid = || ApiError::validation("You have to enter a valid email address");

    let (local, domain) = email.split_once('@').ok_or_else(invalid)?;
    if local.is_empty() || domain.is_empty() || domain.contains('@') {
        return Err(invalid());
    }

    let lower = domain.to_ascii_lowercase();
    if !ALLOWED_EMAIL_SUFFIXES
        .iter()
        .any(|suffix| lower.len() > suffix.len() && lower.ends_with(suffix))
    {
        return Err(invalid());
    }

    Ok(email)
}

/// Registration checks, in the order their messages are reported.
pub fn validate_registration(
    username: &str,
    email: &str,
    password: &str,
    password2: &str,
) -> Result<(), ApiError> {
    if username.trim().is_empty() {
        return Err(ApiError::validation("You have to enter a username"));
    }

    validate_email(email)?;

    if password.is_empty() {
        return Err(ApiError::validation("You have to enter a password"));
    }

    if password != password2 {
        return Err(ApiError::validation("The two passwords do not match"));
    }

    Ok(())
}

pub fn validate_search_query(query: &str) -> Result<&str, ApiError> {
    let trimmed = query.trim();
    if trimmed.is_empty() {
        return Err(ApiError::validation("No search query provided"));
    }
    Ok(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_email() {
        assert!(validate_email("user@example.com").is_ok());
        assert!(validate_email("  bruger@domæne.dk ").is_ok());
        assert!(validate_email("a@b.EDU").is_ok());

        assert!(validate_email("").is_err());
        assert!(validate_email("no-at-sign.com").is_err());
        assert!(validate_email("@example.com").is_err());
        assert!(validate_email("user@").is_err());
        assert!(validate_email("a@b@c.com").is_err());
        assert!(validate_email("user@example.io").is_err());
        assert!(validate_email("user@.com").is_err());
    }

    #[test]
    fn test_registration_message_order() {
        let err = |u, e, p, p2| match validate_registration(u, e, p, p2) {
            Err(ApiError::ValidationError(msg)) => msg,
            other => panic!("expected validation error, got {other:?}"),
        };

        assert_eq!(err("", "", "", ""), "You have to enter a username");
        assert_eq!(
            err("user1", "bad", "", ""),
            "You have to enter a valid email address"
        );
        assert_eq!(
            err("user1", "u@x.com", "", ""),
            "You have to enter a password"
        );
        assert_eq!(
            err("user1", "u@x.com", "a", "b"),
            "The two passwords do not match"
        );
        assert!(validate_registration("user1", "u@x.com", "pw", "pw").is_ok());
    }

    #[test]
    fn test_validate_search_query() {
        assert_eq!(validate_search_query("  rust ").unwrap(), "rust");
        assert!(validate_search_query("   ").is_err());
    }
}
