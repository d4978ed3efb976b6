//! Response normalization
//!
//! Classifies an [`InvocationOutcome`] into a [`ResultEnvelope`]. Order is
//! fixed and the first matching gate wins:
//!
//! 0. timed out                 -> `ENGINE_TIMEOUT`
//! 1. stdout is not JSON        -> `BAD_JSON_FROM_ENGINE`
//! 2. document `ok` not truthy  -> engine's own code, or `ENGINE_ERROR`
//! 3. otherwise                 -> `Success`, stderr kept under `_stderr`

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::invoker::InvocationOutcome;
use crate::utils::{is_truthy, truncate_chars};

/// Diagnostic prefix length kept from each stream in error details
pub const DETAIL_PREFIX_CHARS: usize = 2000;

/// Key under which the full engine stderr rides along a success payload
pub const STDERR_KEY: &str = "_stderr";

pub mod codes {
    pub const INVALID_INPUT: &str = "INVALID_INPUT";
    pub const BAD_JSON_FROM_ENGINE: &str = "BAD_JSON_FROM_ENGINE";
    pub const ENGINE_ERROR: &str = "ENGINE_ERROR";
    pub const ENGINE_TIMEOUT: &str = "ENGINE_TIMEOUT";
    pub const ENGINE_BUSY: &str = "ENGINE_BUSY";
    pub const SERVER_ERROR: &str = "SERVER_ERROR";
}

/// Error body shared by every failure response
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorInfo {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<Value>,
}

impl ErrorInfo {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            detail: None,
        }
    }

    pub fn with_detail(mut self, detail: Value) -> Self {
        self.detail = Some(detail);
        self
    }

    /// HTTP status hint the engine put in its own error (`detail.engine.error.http_hint`),
    /// accepted only inside 400..=599
    pub fn engine_http_hint(&self) -> Option<u16> {
        let hint = self
            .detail
            .as_ref()?
            .pointer("/engine/error/http_hint")?;
        let hint = match hint {
            Value::Number(n) => n.as_f64()?,
            Value::String(s) => s.trim().parse::<f64>().ok()?,
            _ => return None,
        };
        if hint.fract() == 0.0 && (400.0..=599.0).contains(&hint) {
            Some(hint as u16)
        } else {
            None
        }
    }
}

/// Uniform result handed to route handlers; raw process output never leaves this module
#[derive(Debug, Clone, PartialEq)]
pub enum ResultEnvelope {
    Success { payload: Value, exit_code: i32 },
    Failure { error: ErrorInfo, exit_code: i32 },
}

impl ResultEnvelope {
    pub fn is_success(&self) -> bool {
        matches!(self, ResultEnvelope::Success { .. })
    }

    pub fn exit_code(&self) -> i32 {
        match self {
            ResultEnvelope::Success { exit_code, .. } | ResultEnvelope::Failure { exit_code, .. } => {
                *exit_code
            }
        }
    }
}

/// Turn a raw outcome into an envelope. Pure: equal inputs give equal envelopes.
pub fn normalize(outcome: &InvocationOutcome) -> ResultEnvelope {
    let exit_code = outcome.exit_code();
    let stdout = outcome.stdout();
    let stderr = outcome.stderr();

    if let InvocationOutcome::TimedOut { timeout, .. } = outcome {
        let timeout_ms = timeout.as_millis() as u64;
        return ResultEnvelope::Failure {
            exit_code,
            error: ErrorInfo::new(
                codes::ENGINE_TIMEOUT,
                format!("Backend engine did not finish within {} ms.", timeout_ms),
            )
            .with_detail(json!({
                "stdout": truncate_chars(stdout, DETAIL_PREFIX_CHARS),
                "stderr": truncate_chars(stderr, DETAIL_PREFIX_CHARS),
                "exitCode": exit_code,
                "timeoutMs": timeout_ms,
            })),
        };
    }

    let parsed: Value = match serde_json::from_str(stdout) {
        Ok(value) => value,
        Err(_) => {
            return ResultEnvelope::Failure {
                exit_code,
                error: ErrorInfo::new(
                    codes::BAD_JSON_FROM_ENGINE,
                    "Backend engine did not return valid JSON.",
                )
                .with_detail(json!({
                    "stdout": truncate_chars(stdout, DETAIL_PREFIX_CHARS),
                    "stderr": truncate_chars(stderr, DETAIL_PREFIX_CHARS),
                    "exitCode": exit_code,
                })),
            };
        }
    };

    if !is_truthy(parsed.get("ok")) {
        let code = scalar_text(parsed.pointer("/error/code"))
            .unwrap_or_else(|| codes::ENGINE_ERROR.to_string());
        let message = scalar_text(parsed.pointer("/error/message"))
            .unwrap_or_else(|| "Engine returned ok:false".to_string());
        return ResultEnvelope::Failure {
            exit_code,
            error: ErrorInfo::new(code, message).with_detail(json!({
                "engine": parsed,
                "stderr": truncate_chars(stderr, DETAIL_PREFIX_CHARS),
                "exitCode": exit_code,
            })),
        };
    }

    // A truthy `ok` field means the document is an object
    let mut payload = parsed;
    if let Value::Object(ref mut map) = payload {
        map.insert(STDERR_KEY.to_string(), Value::String(stderr.to_string()));
    }
    ResultEnvelope::Success { payload, exit_code }
}

/// Engine-supplied code or message as text. Numbers and booleans keep their
/// literal form; null, arrays and objects count as absent.
fn scalar_text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(text) => Some(text.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn completed(exit_code: i32, stdout: &str, stderr: &str) -> InvocationOutcome {
        InvocationOutcome::Completed {
            exit_code,
            stdout: stdout.to_string(),
            stderr: stderr.to_string(),
        }
    }

    fn failure(envelope: ResultEnvelope) -> ErrorInfo {
        match envelope {
            ResultEnvelope::Failure { error, .. } => error,
            other => panic!("expected failure, got {:?}", other),
        }
    }

    #[test]
    fn test_success_merges_stderr() {
        let envelope = normalize(&completed(0, r#"{"ok":true,"topic":"t"}"#, "debug line"));
        match envelope {
            ResultEnvelope::Success { payload, exit_code } => {
                assert_eq!(exit_code, 0);
                assert_eq!(payload["topic"], "t");
                assert_eq!(payload[STDERR_KEY], "debug line");
            }
            other => panic!("expected success, got {:?}", other),
        }
    }

    #[test]
    fn test_success_regardless_of_exit_code() {
        let envelope = normalize(&completed(2, r#"{"ok":true}"#, ""));
        assert!(envelope.is_success());
        assert_eq!(envelope.exit_code(), 2);
    }

    #[test]
    fn test_garbage_stdout_is_bad_json() {
        let error = failure(normalize(&completed(0, "not json", "trace")));
        assert_eq!(error.code, codes::BAD_JSON_FROM_ENGINE);
        assert_eq!(error.message, "Backend engine did not return valid JSON.");
        let detail = error.detail.unwrap();
        assert_eq!(detail["stdout"], "not json");
        assert_eq!(detail["stderr"], "trace");
        assert_eq!(detail["exitCode"], 0);
    }

    #[test]
    fn test_noise_before_json_is_bad_json() {
        let error = failure(normalize(&completed(0, "warming up\n{\"ok\":true}", "")));
        assert_eq!(error.code, codes::BAD_JSON_FROM_ENGINE);
    }

    #[test]
    fn test_bad_json_detail_is_bounded() {
        let stdout = "x".repeat(5000);
        let stderr = "가".repeat(5000);
        let error = failure(normalize(&completed(1, &stdout, &stderr)));
        let detail = error.detail.unwrap();
        assert_eq!(detail["stdout"].as_str().unwrap().chars().count(), 2000);
        assert_eq!(detail["stderr"].as_str().unwrap().chars().count(), 2000);
    }

    #[test]
    fn test_engine_reported_error_is_forwarded() {
        let stdout = r#"{"ok":false,"error":{"code":"RATE_LIMIT","message":"slow down","http_hint":429}}"#;
        let error = failure(normalize(&completed(1, stdout, "")));
        assert_eq!(error.code, "RATE_LIMIT");
        assert_eq!(error.message, "slow down");
        assert_eq!(error.engine_http_hint(), Some(429));
        assert_eq!(error.detail.unwrap()["engine"]["ok"], false);
    }

    #[test]
    fn test_non_string_error_code_keeps_its_literal() {
        let error = failure(normalize(&completed(1, r#"{"ok":false,"error":{"code":42,"message":7}}"#, "")));
        assert_eq!(error.code, "42");
        assert_eq!(error.message, "7");

        let error = failure(normalize(&completed(1, r#"{"ok":false,"error":{"code":{"n":1},"message":null}}"#, "")));
        assert_eq!(error.code, codes::ENGINE_ERROR);
        assert_eq!(error.message, "Engine returned ok:false");
        assert_eq!(error.detail.unwrap()["engine"]["error"]["code"], json!({"n": 1}));
    }

    #[test]
    fn test_missing_ok_flag_uses_fallbacks() {
        let error = failure(normalize(&completed(0, r#"{"topic":"t"}"#, "")));
        assert_eq!(error.code, codes::ENGINE_ERROR);
        assert_eq!(error.message, "Engine returned ok:false");
        assert_eq!(error.engine_http_hint(), None);
    }

    #[test]
    fn test_non_object_document_is_engine_error() {
        let error = failure(normalize(&completed(0, "[1,2]", "")));
        assert_eq!(error.code, codes::ENGINE_ERROR);
    }

    #[test]
    fn test_hint_out_of_range_is_ignored() {
        for hint in ["200", "600", "\"abc\"", "429.5"] {
            let stdout = format!(r#"{{"ok":false,"error":{{"http_hint":{}}}}}"#, hint);
            let error = failure(normalize(&completed(1, &stdout, "")));
            assert_eq!(error.engine_http_hint(), None, "hint {}", hint);
        }
    }

    #[test]
    fn test_timeout_gets_dedicated_code() {
        let outcome = InvocationOutcome::TimedOut {
            stdout: "{\"ok\":tr".to_string(),
            stderr: "still thinking".to_string(),
            timeout: Duration::from_secs(25),
        };
        let error = failure(normalize(&outcome));
        assert_eq!(error.code, codes::ENGINE_TIMEOUT);
        let detail = error.detail.unwrap();
        assert_eq!(detail["timeoutMs"], 25_000);
        assert_eq!(detail["exitCode"], -1);
        assert_eq!(detail["stderr"], "still thinking");
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let outcomes = [
            completed(0, r#"{"ok":true,"x":1}"#, "e"),
            completed(1, "junk", "e"),
            completed(1, r#"{"ok":false}"#, "e"),
        ];
        for outcome in &outcomes {
            assert_eq!(normalize(outcome), normalize(outcome));
        }
    }

    #[test]
    fn test_error_info_serializes_without_empty_detail() {
        let json = serde_json::to_value(ErrorInfo::new("INVALID_INPUT", "topic is required")).unwrap();
        assert_eq!(json, json!({"code": "INVALID_INPUT", "message": "topic is required"}));
    }
}
