// SPDX-FileCopyrightText: 2026 IdéaLab Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Input checks for submitted comments.

use std::sync::LazyLock;

use regex::Regex;

use idealab_config::model::CommentsConfig;
use idealab_core::IdeaLabError;

/// Longest stored anonymous author name, in characters.
pub const MAX_AUTHOR_NAME: usize = 100;

/// Name used when an anonymous author gives none.
pub const DEFAULT_AUTHOR_NAME: &str = "Anonymous";

static EMAIL_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap());

/// Trim `content` and check its length in characters.
pub fn validate_content(content: &str, config: &CommentsConfig) -> Result<String, IdeaLabError> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return Err(IdeaLabError::InvalidInput(
            "comment content is required".into(),
        ));
    }
    let len = trimmed.chars().count();
    if len < config.min_length || len > config.max_length {
        return Err(IdeaLabError::InvalidInput(format!(
            "comment must be between {} and {} characters",
            config.min_length, config.max_length
        )));
    }
    Ok(trimmed.to_string())
}

/// Trim, lowercase, and check an anonymous author's email.
pub fn normalize_email(email: Option<&str>) -> Result<String, IdeaLabError> {
    let email = email.map(str::trim).unwrap_or_default();
    if email.is_empty() {
        return Err(IdeaLabError::InvalidInput(
            "an email address is required to comment anonymously".into(),
        ));
    }
    if !EMAIL_PATTERN.is_match(email) {
        return Err(IdeaLabError::InvalidInput("invalid email address".into()));
    }
    Ok(email.to_lowercase())
}

/// Strip markup-significant characters from an anonymous author name.
pub fn sanitize_author_name(name: Option<&str>) -> String {
    let cleaned: String = name
        .unwrap_or_default()
        .chars()
        .filter(|c| !matches!(c, '<' | '>' | '"' | '\'' | '&'))
        .collect();
    let cleaned: String = cleaned.trim().chars().take(MAX_AUTHOR_NAME).collect();
    if cleaned.is_empty() {
        DEFAULT_AUTHOR_NAME.to_string()
    } else {
        cleaned
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_is_trimmed_and_length_checked() {
        let config = CommentsConfig::default();
        assert_eq!(validate_content("  hello  ", &config).unwrap(), "hello");
        assert!(validate_content("   ", &config).is_err());
        assert!(validate_content("hi", &config).is_err());
        assert!(validate_content(&"x".repeat(2001), &config).is_err());
        assert!(validate_content(&"x".repeat(2000), &config).is_ok());
    }

    #[test]
    fn length_counts_characters_not_bytes() {
        let config = CommentsConfig::default();
        assert!(validate_content("été", &config).is_ok());
    }

    #[test]
    fn email_rules() {
        assert_eq!(
            normalize_email(Some("  Jane.Doe@Example.ORG ")).unwrap(),
            "jane.doe@example.org"
        );
        assert!(normalize_email(None).is_err());
        assert!(normalize_email(Some("")).is_err());
        assert!(normalize_email(Some("no-at-sign")).is_err());
        assert!(normalize_email(Some("a@b")).is_err());
        assert!(normalize_email(Some("a b@c.d")).is_err());
    }

    #[test]
    fn author_name_sanitizing() {
        assert_eq!(sanitize_author_name(None), "Anonymous");
        assert_eq!(sanitize_author_name(Some("  <>  ")), "Anonymous");
        assert_eq!(
            sanitize_author_name(Some("<b>Jean</b> & \"Co\"")),
            "bJean/b  Co"
        );
        let long = "n".repeat(150);
        assert_eq!(sanitize_author_name(Some(&long)).chars().count(), 100);
    }
}
