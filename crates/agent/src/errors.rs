//! Error taxonomy — turns engine errors into user-facing records.
//!
//! Every terminal error ends a turn with exactly one message built from an
//! [`ErrorRecord`]: title, explanation, one to four suggestions, and the raw
//! detail in the debug payload.

use quill_core::error::ProviderError;
use quill_core::error_record::{ErrorCategory, ErrorRecord, Severity};

/// Classify a provider error.
pub fn classify_provider(err: &ProviderError) -> ErrorRecord {
    let record = match err {
        ProviderError::RateLimited { retry_after_secs } => ErrorRecord::new(
            ErrorCategory::RateLimit,
            Severity::Medium,
            "Rate limit reached",
            format!(
                "The provider is throttling requests and retries were exhausted{}.",
                if *retry_after_secs > 0 {
                    format!(" (it asked to wait {retry_after_secs}s)")
                } else {
                    String::new()
                }
            ),
        )
        .with_suggestions([
            "Wait a minute and send the message again",
            "Switch to a model with a higher quota",
        ]),

        ProviderError::AuthenticationFailed(detail) => ErrorRecord::new(
            ErrorCategory::Auth,
            Severity::High,
            "Authentication failed",
            format!("The provider rejected the API key: {detail}"),
        )
        .with_suggestions([
            "Check the API key in ~/.quill/config.toml or QUILL_API_KEY",
            "Make sure the key belongs to the selected provider",
        ]),

        ProviderError::NotConfigured(detail) => ErrorRecord::new(
            ErrorCategory::Auth,
            Severity::High,
            "Provider not configured",
            detail.clone(),
        )
        .with_suggestions([
            "Set QUILL_API_KEY or add an api_key to the provider section of the config",
        ]),

        ProviderError::Timeout(detail) | ProviderError::Network(detail) => ErrorRecord::new(
            ErrorCategory::Network,
            Severity::Medium,
            "Network problem",
            format!("Could not reach the model provider: {detail}"),
        )
        .with_suggestions([
            "Check your internet connection",
            "Try again in a moment",
        ]),

        ProviderError::Parse(detail) => ErrorRecord::new(
            ErrorCategory::Parse,
            Severity::Medium,
            "Unreadable response",
            format!("The provider sent a response that could not be understood: {detail}"),
        )
        .with_suggestions(["Try again", "Switch to a different model if this keeps happening"]),

        ProviderError::EmptyResponse => empty_response(),

        ProviderError::ContentFiltered(detail) => ErrorRecord::new(
            ErrorCategory::Content,
            Severity::High,
            "Response blocked",
            format!("The provider's safety filter blocked the response: {detail}"),
        )
        .with_suggestions([
            "Rephrase the request",
            "Try a different model",
        ])
        .recoverable(false),

        ProviderError::ApiError { status_code, message } => api_error(*status_code, message),

        ProviderError::Cancelled => ErrorRecord::new(
            ErrorCategory::Network,
            Severity::Low,
            "Request cancelled",
            "The request was cancelled before it finished.",
        )
        .with_suggestions(["Send the message again"]),
    };

    record.with_debug(serde_json::json!({
        "source": "provider",
        "error": err.to_string(),
        "status": err.status_code(),
    }))
}

fn api_error(status: u16, message: &str) -> ErrorRecord {
    if status >= 500 {
        return ErrorRecord::new(
            ErrorCategory::Api,
            Severity::Medium,
            "Provider error",
            format!("The provider failed with status {status}: {message}"),
        )
        .with_suggestions(["Try again in a moment", "Switch to a different model"]);
    }

    if status == 400 && is_context_too_long(message) {
        return ErrorRecord::new(
            ErrorCategory::Api,
            Severity::High,
            "Conversation too long",
            "The conversation no longer fits in the model's context window.",
        )
        .with_suggestions([
            "Start a new conversation",
            "Lower the window size in the [agent] config section",
            "Switch to a model with a larger context window",
        ])
        .recoverable(false);
    }

    // Other 4xx bodies sometimes name the real cause (quota, key, filter)
    let guessed = classify_message(message);
    if guessed.category != ErrorCategory::Api {
        return guessed;
    }

    ErrorRecord::new(
        ErrorCategory::Api,
        Severity::Medium,
        "Request rejected",
        format!("The provider rejected the request (status {status}): {message}"),
    )
    .with_suggestions(["Check the model name in the config", "Try again"])
}

fn is_context_too_long(message: &str) -> bool {
    let lower = message.to_lowercase();
    ["context length", "context window", "too many tokens", "maximum context", "too long"]
        .iter()
        .any(|needle| lower.contains(needle))
}

/// The model returned no candidates.
pub fn empty_response() -> ErrorRecord {
    ErrorRecord::new(
        ErrorCategory::Content,
        Severity::Medium,
        "Empty response",
        "The model returned no answer.",
    )
    .with_suggestions(["Send the message again", "Rephrase the request"])
}

/// Heuristic classification for errors that carry only text.
pub fn classify_message(message: &str) -> ErrorRecord {
    let lower = message.to_lowercase();
    let has = |needles: &[&str]| needles.iter().any(|n| lower.contains(n));

    if has(&["connection", "timed out", "timeout", "dns", "network", "unreachable"]) {
        ErrorRecord::new(ErrorCategory::Network, Severity::Medium, "Network problem", message)
            .with_suggestions(["Check your internet connection", "Try again in a moment"])
    } else if has(&["429", "rate limit", "quota", "too many requests"]) {
        ErrorRecord::new(ErrorCategory::RateLimit, Severity::Medium, "Rate limit reached", message)
            .with_suggestions(["Wait a minute and try again"])
    } else if has(&["401", "403", "api key", "unauthorized", "forbidden"]) {
        ErrorRecord::new(ErrorCategory::Auth, Severity::High, "Authentication failed", message)
            .with_suggestions(["Check the API key in the config"])
    } else if has(&["parse", "json", "decode", "deserializ"]) {
        ErrorRecord::new(ErrorCategory::Parse, Severity::Medium, "Unreadable data", message)
            .with_suggestions(["Try again"])
    } else if has(&["safety", "blocked", "content filter"]) {
        ErrorRecord::new(ErrorCategory::Content, Severity::High, "Response blocked", message)
            .with_suggestions(["Rephrase the request"])
            .recoverable(false)
    } else {
        ErrorRecord::new(ErrorCategory::Api, Severity::Medium, "Something went wrong", message)
            .with_suggestions(["Try again", "Start a new conversation if the problem persists"])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_limit_is_recoverable() {
        let record = classify_provider(&ProviderError::RateLimited { retry_after_secs: 0 });
        assert_eq!(record.category, ErrorCategory::RateLimit);
        assert!(record.recoverable);
        assert_eq!(record.debug["status"], 429);
    }

    #[test]
    fn context_too_long_is_not_recoverable() {
        let record = classify_provider(&ProviderError::ApiError {
            status_code: 400,
            message: "This model's maximum context length is 8192 tokens".into(),
        });
        assert_eq!(record.category, ErrorCategory::Api);
        assert!(!record.recoverable);
        assert_eq!(record.title, "Conversation too long");
    }

    #[test]
    fn other_bad_requests_stay_recoverable() {
        let record = classify_provider(&ProviderError::ApiError {
            status_code: 400,
            message: "unknown model".into(),
        });
        assert!(record.recoverable);
    }

    #[test]
    fn content_filter_blocks() {
        let record = classify_provider(&ProviderError::ContentFiltered("safety".into()));
        assert_eq!(record.category, ErrorCategory::Content);
        assert!(!record.recoverable);
    }

    #[test]
    fn every_record_has_one_to_four_suggestions() {
        let errors = [
            ProviderError::RateLimited { retry_after_secs: 3 },
            ProviderError::AuthenticationFailed("x".into()),
            ProviderError::NotConfigured("x".into()),
            ProviderError::Timeout("x".into()),
            ProviderError::Network("x".into()),
            ProviderError::Parse("x".into()),
            ProviderError::EmptyResponse,
            ProviderError::ContentFiltered("x".into()),
            ProviderError::ApiError { status_code: 503, message: "x".into() },
            ProviderError::Cancelled,
        ];
        for err in &errors {
            let n = classify_provider(err).suggestions.len();
            assert!((1..=4).contains(&n), "{err}: {n} suggestions");
        }
    }

    #[test]
    fn unknown_text_defaults_to_api_medium() {
        let record = classify_message("something odd");
        assert_eq!(record.category, ErrorCategory::Api);
        assert_eq!(record.severity, Severity::Medium);
    }

    #[test]
    fn other_client_errors_use_the_body_text() {
        let record = classify_provider(&ProviderError::ApiError {
            status_code: 402,
            message: "Monthly quota exceeded for this key".into(),
        });
        assert_eq!(record.category, ErrorCategory::RateLimit);
        assert_eq!(record.debug["status"], 402);

        let record = classify_provider(&ProviderError::ApiError {
            status_code: 404,
            message: "model gpt-9 does not exist".into(),
        });
        assert_eq!(record.category, ErrorCategory::Api);
        assert_eq!(record.title, "Request rejected");
    }

    #[test]
    fn heuristics_pick_network() {
        let record = classify_message("connection reset by peer");
        assert_eq!(record.category, ErrorCategory::Network);
    }
}
