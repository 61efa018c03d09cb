//! Input sanitizers
//!
//! Applied to free-text input before it reaches the backend or the media
//! filters: sign-in email, search term, page-jump number.

use crate::utils::AppError;

/// Default cap for free-text input
pub const MAX_TEXT_LEN: usize = 255;

/// Email addresses (RFC 5321)
pub const MAX_EMAIL_LEN: usize = 254;

pub const DEFAULT_NUMBER_MIN: i64 = 0;
pub const DEFAULT_NUMBER_MAX: i64 = 999_999;

/// Lowercase and trim
pub fn sanitize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// `local@domain.tld` with no whitespace and exactly one `@`
pub fn validate_email(email: &str) -> bool {
    if email.is_empty() || email.len() > MAX_EMAIL_LEN || email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    // Needs a dot with something on both sides
    match domain.rfind('.') {
        Some(dot) => dot > 0 && dot + 1 < domain.len(),
        None => false,
    }
}

/// Sanitize then validate, for handlers that want an error value
pub fn require_email(email: &str) -> Result<String, AppError> {
    let email = sanitize_email(email);
    if validate_email(&email) {
        Ok(email)
    } else {
        Err(AppError::validation(format!("invalid email address: {email}")))
    }
}

/// Trim and cut to `max_len` characters
pub fn sanitize_string(value: &str, max_len: usize) -> String {
    value.trim().chars().take(max_len).collect()
}

/// Parse a leading integer and clamp it to `[min, max]`; unparsable input yields `min`
pub fn sanitize_number(value: &str, min: i64, max: i64) -> i64 {
    let s = value.trim();
    let (sign, digits) = match s.strip_prefix('-') {
        Some(rest) => (-1i64, rest),
        None => (1i64, s.strip_prefix('+').unwrap_or(s)),
    };
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    if end == 0 {
        return min;
    }

    let parsed = match digits[..end].parse::<i64>() {
        Ok(n) => n * sign,
        // Overflowed i64, saturate in the direction of the sign
        Err(_) if sign < 0 => i64::MIN,
        Err(_) => i64::MAX,
    };
    parsed.clamp(min, max.max(min))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_email() {
        assert_eq!(sanitize_email("  Admin@DogBar.COM "), "admin@dogbar.com");
    }

    #[test]
    fn test_validate_email() {
        assert!(validate_email("a@b.co"));
        assert!(validate_email("first.last@sub.domain.org"));
        assert!(!validate_email("a@b"));
        assert!(!validate_email("@b.co"));
        assert!(!validate_email("a b@c.co"));
        assert!(!validate_email("a@@b.co"));
        assert!(!validate_email("a@b."));
        assert!(!validate_email("a@.co"));
        assert!(!validate_email(""));
    }

    #[test]
    fn test_require_email() {
        assert_eq!(require_email(" X@Y.io ").unwrap(), "x@y.io");
        assert!(require_email("nope").is_err());
    }

    #[test]
    fn test_sanitize_string_counts_chars() {
        assert_eq!(sanitize_string("  hero  ", 255), "hero");
        assert_eq!(sanitize_string("ñandú", 3), "ñan");
    }

    #[test]
    fn test_sanitize_number() {
        assert_eq!(sanitize_number("3", 1, 10), 3);
        assert_eq!(sanitize_number(" 12abc", 1, 100), 12);
        assert_eq!(sanitize_number("abc", 1, 100), 1);
        assert_eq!(sanitize_number("-5", 0, 10), 0);
        assert_eq!(sanitize_number("500", 1, 10), 10);
        assert_eq!(sanitize_number("99999999999999999999", 0, 999_999), 999_999);
        assert_eq!(
            sanitize_number("7", DEFAULT_NUMBER_MIN, DEFAULT_NUMBER_MAX),
            7
        );
    }
}
