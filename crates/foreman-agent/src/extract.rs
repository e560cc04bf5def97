//! JSON extraction from generator output
//!
//! The generation capability is asked for JSON but is not guaranteed to
//! return only JSON. These functions locate the first balanced JSON object
//! inside arbitrary text and validate it into a structured request, so the
//! rest of the engine never touches raw generator output.

use foreman_core::{ForemanError, Result, StructuredRequest};

/// Locate the first balanced JSON object in `text`
///
/// Brace counting is string- and escape-aware, so braces inside string
/// literals do not affect nesting depth. Returns the object slice including
/// the outer braces, or `None` when no balanced object exists.
pub fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (idx, ch) in text[start..].char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }

        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + idx + 1]);
                }
            }
            _ => {}
        }
    }

    None
}

/// Parse a structured request out of raw generator output
///
/// Fails with `SpecificationParse` when no JSON object is present and with
/// `SpecificationFormat` when the object is present but fields are missing,
/// mistyped, or empty.
pub fn parse_structured_request(text: &str) -> Result<StructuredRequest> {
    let snippet = |s: &str| {
        let trimmed = s.trim();
        if trimmed.chars().count() > 120 {
            let head: String = trimmed.chars().take(120).collect();
            format!("{}...", head)
        } else {
            trimmed.to_string()
        }
    };

    let object = extract_json_object(text)
        .ok_or_else(|| ForemanError::SpecificationParse(snippet(text)))?;

    let request: StructuredRequest = serde_json::from_str(object)
        .map_err(|e| ForemanError::SpecificationFormat(e.to_string()))?;

    request
        .validate()
        .map_err(ForemanError::SpecificationFormat)?;

    Ok(request)
}

#[cfg(test)]
mod tests {
    use super::*;
    use foreman_core::Complexity;

    const WELL_FORMED: &str = r#"Here is the user story you asked for:

{
    "title": "Add OAuth2 login",
    "summary": "As a user, I want to log in with OAuth2, so that I can reuse my identity provider",
    "acceptance_criteria": ["Login redirects to provider", "Tokens are refreshed"],
    "technical_notes": "Use the authorization code flow",
    "estimated_complexity": "high"
}

Let me know if you need adjustments."#;

    #[test]
    fn test_extract_from_surrounding_prose() {
        let object = extract_json_object(WELL_FORMED).unwrap();
        assert!(object.starts_with('{'));
        assert!(object.ends_with('}'));
        assert!(object.contains("OAuth2"));
        assert!(!object.contains("Let me know"));
    }

    #[test]
    fn test_extract_handles_nested_objects() {
        let text = r#"prefix {"outer": {"inner": 1}, "k": 2} suffix"#;
        assert_eq!(
            extract_json_object(text).unwrap(),
            r#"{"outer": {"inner": 1}, "k": 2}"#
        );
    }

    #[test]
    fn test_extract_ignores_braces_inside_strings() {
        let text = r#"{"title": "weird } brace {", "n": 1}"#;
        assert_eq!(extract_json_object(text).unwrap(), text);
    }

    #[test]
    fn test_extract_handles_escaped_quotes() {
        let text = r#"{"title": "she said \"}\"", "n": 1}"#;
        assert_eq!(extract_json_object(text).unwrap(), text);
    }

    #[test]
    fn test_extract_no_object() {
        assert!(extract_json_object("plain prose without json").is_none());
        assert!(extract_json_object("unbalanced { opening").is_none());
    }

    #[test]
    fn test_parse_well_formed() {
        let request = parse_structured_request(WELL_FORMED).unwrap();
        assert_eq!(request.title, "Add OAuth2 login");
        assert_eq!(request.acceptance_criteria.len(), 2);
        assert_eq!(request.estimated_complexity, Complexity::High);
    }

    #[test]
    fn test_parse_no_json_is_parse_error() {
        let err = parse_structured_request("I could not produce a story.").unwrap_err();
        assert!(matches!(err, ForemanError::SpecificationParse(_)));
    }

    #[test]
    fn test_parse_missing_field_is_format_error() {
        let err = parse_structured_request(r#"{"title": "Only a title"}"#).unwrap_err();
        assert!(matches!(err, ForemanError::SpecificationFormat(_)));
    }

    #[test]
    fn test_parse_mistyped_field_is_format_error() {
        let text = r#"{
            "title": "T",
            "summary": "S",
            "acceptance_criteria": "not a list",
            "estimated_complexity": "low"
        }"#;
        let err = parse_structured_request(text).unwrap_err();
        assert!(matches!(err, ForemanError::SpecificationFormat(_)));
    }

    #[test]
    fn test_parse_empty_title_is_format_error() {
        let text = r#"{
            "title": "",
            "summary": "S",
            "estimated_complexity": "low"
        }"#;
        let err = parse_structured_request(text).unwrap_err();
        assert!(matches!(err, ForemanError::SpecificationFormat(_)));
    }

    #[test]
    fn test_parse_unknown_complexity_is_format_error() {
        let text = r#"{
            "title": "T",
            "summary": "S",
            "estimated_complexity": "enormous"
        }"#;
        let err = parse_structured_request(text).unwrap_err();
        assert!(matches!(err, ForemanError::SpecificationFormat(_)));
    }
}
