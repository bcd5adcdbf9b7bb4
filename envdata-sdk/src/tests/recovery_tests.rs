//! Tests for classification and recovery working together
//!
//! These tests walk raw failures through `classify` and the recovery policy
//! and check the UI-facing error results.

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::json;

    use crate::core::Method;
    use crate::error::{classify, codes, ErrorType, RawFailure, Severity};
    use crate::resilience::{RecoveryAction, RecoveryConfig, RecoveryPolicy, RetryState};

    #[test]
    fn test_policy_table() {
        let policy = RecoveryPolicy::default();
        let cases = [
            (RawFailure::network("refused"), RecoveryAction::Retry, true),
            (RawFailure::timeout("slow"), RecoveryAction::Retry, true),
            (RawFailure::http(401, None), RecoveryAction::RedirectToLogin, false),
            (RawFailure::http(403, None), RecoveryAction::ShowError, false),
            (RawFailure::http(422, None), RecoveryAction::ShowError, false),
            (RawFailure::http(429, None), RecoveryAction::Retry, true),
            (RawFailure::http(500, None), RecoveryAction::ShowError, true),
            (RawFailure::http(404, None), RecoveryAction::ShowError, false),
            (RawFailure::validation("bad"), RecoveryAction::ShowError, false),
            (RawFailure::other("weird"), RecoveryAction::ShowError, false),
        ];

        for (raw, action, can_retry) in cases {
            let label = raw.to_string();
            let error = classify(raw);
            assert_eq!(policy.policy_for(&error).action, action, "{}", label);
            assert_eq!(policy.can_retry(&error), can_retry, "{}", label);
        }
    }

    #[test]
    fn test_error_result_uses_safe_message() {
        let policy = RecoveryPolicy::default();
        let error = classify(RawFailure::http(
            500,
            Some(json!({ "trace": "Traceback (most recent call last): ..." })),
        ));

        let result = policy.error_result(&error);
        assert_eq!(result.error_type, ErrorType::Api);
        assert_eq!(result.code, codes::SERVER_ERROR);
        assert_eq!(result.severity, Severity::Critical);
        assert!(!result.message.contains("Traceback"));
        assert!(result.can_retry);

        let serialized = serde_json::to_value(&result).unwrap();
        assert_eq!(serialized["canRetry"], true);
        assert_eq!(serialized["code"], "SERVER_ERROR");
    }

    #[test]
    fn test_other_status_uses_backend_message() {
        let error = classify(RawFailure::http(404, Some(json!({ "message": "Company not found" }))));
        assert_eq!(error.code(), codes::API_ERROR);
        assert_eq!(error.user_message(), "Company not found");
        assert_eq!(error.details(), Some(&json!({ "message": "Company not found" })));
    }

    #[test]
    fn test_retry_state_mixed_failures() {
        let policy = RecoveryPolicy::new(RecoveryConfig {
            network_retry_delay: Duration::from_millis(100),
            rate_limit_delay: Duration::from_millis(700),
            ..RecoveryConfig::default()
        });
        let mut state = RetryState::for_method(Method::Get, 5);

        let network = classify(RawFailure::network("reset"));
        let limited = classify(RawFailure::http(429, None));

        state.begin_attempt();
        assert_eq!(
            state.next_delay(&network, &policy.policy_for(&network)),
            Some(Duration::from_millis(100))
        );
        state.begin_attempt();
        assert_eq!(
            state.next_delay(&limited, &policy.policy_for(&limited)),
            Some(Duration::from_millis(700))
        );
        state.begin_attempt();
        assert_eq!(
            state.next_delay(&network, &policy.policy_for(&network)),
            Some(Duration::from_millis(200))
        );
        state.begin_attempt();
        assert_eq!(state.next_delay(&limited, &policy.policy_for(&limited)), None);
        assert_eq!(state.attempts_made(), 4);
    }

    #[test]
    fn test_mutations_never_retry() {
        let policy = RecoveryPolicy::default();
        let network = classify(RawFailure::network("reset"));

        for method in [Method::Post, Method::Put, Method::Delete] {
            let mut state = RetryState::for_method(method, 3);
            assert_eq!(state.max_attempts(), 1);
            state.begin_attempt();
            assert_eq!(state.next_delay(&network, &policy.policy_for(&network)), None);
        }
    }
}
