//! Mapping of non-2xx responses to the gateway error taxonomy
//!
//! A provider's own rules are tried first; anything they leave unclassified
//! falls back to the generic status table.

use crate::providers::error::{ErrorKind, GatewayError};
use serde_json::{Map, Value};

/// Condition a provider rule places on the error body
#[derive(Debug, Clone, Copy)]
pub enum MessageMatch {
    /// Matches any body
    Any,
    /// `error.message` starts with the given text
    Prefix(&'static str),
    /// `error.message` contains the given text, ignoring ASCII case
    ContainsIgnoreCase(&'static str),
    /// The provider-native code equals the given value
    CodeEquals(&'static str),
}

/// One provider-specific classification rule
#[derive(Debug, Clone, Copy)]
pub struct ClassifierRule {
    pub status: u16,
    pub matcher: MessageMatch,
    pub kind: ErrorKind,
    /// Report the code from this field instead of the provider default
    pub code_field: Option<&'static str>,
}

/// Classification rules for one provider
#[derive(Debug)]
pub struct ErrorRules {
    /// Field of the `error` object holding the provider-native code
    pub code_field: &'static str,
    /// Tried in order before the generic status table
    pub rules: &'static [ClassifierRule],
}

/// Rules for a provider with no special cases
pub static GENERIC_RULES: ErrorRules = ErrorRules {
    code_field: "code",
    rules: &[],
};

/// Generic status table
pub fn fallback_kind(status: u16) -> ErrorKind {
    match status {
        400 => ErrorKind::BadRequest,
        401 => ErrorKind::Authentication,
        403 => ErrorKind::PermissionDenied,
        404 => ErrorKind::NotFound,
        409 => ErrorKind::Conflict,
        422 => ErrorKind::UnprocessableEntity,
        429 => ErrorKind::RateLimit,
        503 => ErrorKind::Overload,
        500..=599 => ErrorKind::InternalServer,
        _ => ErrorKind::ApiStatus,
    }
}

/// Classify a failed response
pub fn classify(status: u16, body: &[u8], rules: &ErrorRules) -> GatewayError {
    let error = extract_error(body);
    let message = error
        .get("message")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| fallback_message(status, body));
    let code = error.get(rules.code_field).and_then(code_to_string);

    let rule = rules
        .rules
        .iter()
        .find(|rule| rule.status == status && rule_matches(rule.matcher, &message, code.as_deref()));

    let Some(rule) = rule else {
        return GatewayError::api(fallback_kind(status), message, code, Some(status));
    };
    let code = match rule.code_field {
        Some(field) => error.get(field).and_then(code_to_string),
        None => code,
    };
    GatewayError::api(rule.kind, message, code, Some(status))
}

fn rule_matches(matcher: MessageMatch, message: &str, code: Option<&str>) -> bool {
    match matcher {
        MessageMatch::Any => true,
        MessageMatch::Prefix(prefix) => message.starts_with(prefix),
        MessageMatch::ContainsIgnoreCase(needle) => message
            .to_ascii_lowercase()
            .contains(&needle.to_ascii_lowercase()),
        MessageMatch::CodeEquals(expected) => code == Some(expected),
    }
}

/// The `error` object of a body, or an empty object when there is none
fn extract_error(body: &[u8]) -> Map<String, Value> {
    match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(mut root)) => match root.remove("error") {
            Some(Value::Object(error)) => error,
            Some(Value::String(message)) => {
                let mut error = Map::new();
                error.insert("message".to_string(), Value::String(message));
                error
            }
            _ => Map::new(),
        },
        _ => Map::new(),
    }
}

fn code_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(code) => Some(code.clone()),
        Value::Number(code) => Some(code.to_string()),
        _ => None,
    }
}

fn fallback_message(status: u16, body: &[u8]) -> String {
    let text = String::from_utf8_lossy(body);
    let text = text.trim();
    if text.is_empty() {
        format!("HTTP error {}", status)
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    static SAMPLE_RULES: ErrorRules = ErrorRules {
        code_field: "type",
        rules: &[ClassifierRule {
            status: 400,
            matcher: MessageMatch::Prefix("prompt is too long"),
            kind: ErrorKind::PromptTooLong,
            code_field: None,
        }],
    };

    #[test_case(400, ErrorKind::BadRequest; "bad request")]
    #[test_case(401, ErrorKind::Authentication; "authentication")]
    #[test_case(403, ErrorKind::PermissionDenied; "permission denied")]
    #[test_case(404, ErrorKind::NotFound; "not found")]
    #[test_case(409, ErrorKind::Conflict; "conflict")]
    #[test_case(422, ErrorKind::UnprocessableEntity; "unprocessable")]
    #[test_case(429, ErrorKind::RateLimit; "rate limit")]
    #[test_case(503, ErrorKind::Overload; "overload")]
    #[test_case(500, ErrorKind::InternalServer; "internal server")]
    #[test_case(529, ErrorKind::InternalServer; "other 5xx")]
    #[test_case(418, ErrorKind::ApiStatus; "teapot")]
    #[test_case(302, ErrorKind::ApiStatus; "redirect")]
    fn test_fallback_table(status: u16, expected: ErrorKind) {
        assert_eq!(fallback_kind(status), expected);
    }

    #[test]
    fn test_provider_rule_wins() {
        let body = br#"{"type":"error","error":{"type":"invalid_request_error","message":"prompt is too long: 210000 tokens > 200000 maximum"}}"#;
        let err = classify(400, body, &SAMPLE_RULES);
        assert_eq!(err.kind(), ErrorKind::PromptTooLong);
        assert_eq!(err.code(), Some("invalid_request_error"));
        assert!(err.kind().is_bad_request());
    }

    #[test]
    fn test_unmatched_rule_falls_back() {
        let body = br#"{"error":{"type":"invalid_request_error","message":"max_tokens: must be positive"}}"#;
        let err = classify(400, body, &SAMPLE_RULES);
        assert_eq!(err.kind(), ErrorKind::BadRequest);
        assert_eq!(err.message(), "max_tokens: must be positive");
    }

    #[test]
    fn test_unparseable_body() {
        let err = classify(502, b"<html>Bad Gateway</html>", &GENERIC_RULES);
        assert_eq!(err.kind(), ErrorKind::InternalServer);
        assert_eq!(err.message(), "<html>Bad Gateway</html>");
        assert_eq!(err.code(), None);
        assert_eq!(err.status(), Some(502));

        let err = classify(500, b"", &GENERIC_RULES);
        assert_eq!(err.message(), "HTTP error 500");
    }

    #[test]
    fn test_case_insensitive_contains() {
        assert!(rule_matches(
            MessageMatch::ContainsIgnoreCase("reduce the length of the messages"),
            "Please Reduce The Length Of The Messages or completion.",
            None,
        ));
        assert!(rule_matches(MessageMatch::CodeEquals("x"), "", Some("x")));
        assert!(!rule_matches(MessageMatch::CodeEquals("x"), "", None));
    }
}
