//! Wire protocol types and envelope decoding.
//!
//! One request document is written to the guest's stdin per process:
//!
//! ```text
//! stdin           {"function": "sum", "args": {"a": 1, "b": 2}}
//! stdout (exit 0) {"ok": true, "result": {"value": 3}}
//! stderr (exit 1) {"ok": false, "error": {"kind": "ValidationError", "message": "...", "field": "b"}}
//! ```
//!
//! The exit status decides which stream is parsed and as what. The payload is
//! never inspected to guess the outcome.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::config::ProtocolConfig;

/// Request sent to the guest.
#[derive(Debug, Serialize)]
pub struct InvocationRequest<'a> {
    pub function: &'a str,
    pub args: &'a serde_json::Map<String, serde_json::Value>,
}

/// Success envelope written to stdout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuccessEnvelope {
    #[serde(default)]
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<ResultPayload>,
}

/// Wrapper around the returned value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultPayload {
    #[serde(default)]
    pub value: serde_json::Value,
}

/// Error envelope written to stderr.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    #[serde(default)]
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorDetail>,
}

/// Error details reported by the guest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub kind: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

/// Exit statuses that are part of the protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExitStatus {
    Success,
    HandledError,
    Crash,
}

impl ExitStatus {
    /// Map a raw exit code; anything outside the protocol yields `None`.
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            ProtocolConfig::EXIT_SUCCESS => Some(ExitStatus::Success),
            ProtocolConfig::EXIT_HANDLED_ERROR => Some(ExitStatus::HandledError),
            ProtocolConfig::EXIT_CRASH => Some(ExitStatus::Crash),
            _ => None,
        }
    }

    pub fn code(&self) -> i32 {
        match self {
            ExitStatus::Success => ProtocolConfig::EXIT_SUCCESS,
            ExitStatus::HandledError => ProtocolConfig::EXIT_HANDLED_ERROR,
            ExitStatus::Crash => ProtocolConfig::EXIT_CRASH,
        }
    }
}

/// Parse an envelope from a captured stream.
///
/// The whole stream is tried first. Guests sometimes print diagnostics on the
/// same stream before the envelope, so the last non-empty line is tried next.
/// The error from the whole-stream attempt is returned if both fail.
pub fn parse_envelope<T: DeserializeOwned>(output: &[u8]) -> Result<T, serde_json::Error> {
    match serde_json::from_slice(output) {
        Ok(envelope) => Ok(envelope),
        Err(err) => {
            let last_line = output
                .split(|b| *b == b'\n')
                .map(|line| line.trim_ascii())
                .filter(|line| !line.is_empty())
                .next_back();
            match last_line {
                Some(line) if line.len() < output.trim_ascii().len() => {
                    serde_json::from_slice(line).map_err(|_| err)
                }
                _ => Err(err),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_serialization() {
        let args = json!({"a": 1, "b": 2});
        let request = InvocationRequest {
            function: "sum",
            args: args.as_object().unwrap(),
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value, json!({"function": "sum", "args": {"a": 1, "b": 2}}));
    }

    #[test]
    fn test_exit_status_codes() {
        assert_eq!(ExitStatus::from_code(0), Some(ExitStatus::Success));
        assert_eq!(ExitStatus::from_code(1), Some(ExitStatus::HandledError));
        assert_eq!(ExitStatus::from_code(2), Some(ExitStatus::Crash));
        assert_eq!(ExitStatus::from_code(3), None);
        assert_eq!(ExitStatus::from_code(-1), None);
        assert_eq!(ExitStatus::Crash.code(), 2);
    }

    #[test]
    fn test_parse_success_envelope() {
        let envelope: SuccessEnvelope =
            parse_envelope(br#"{"ok": true, "result": {"value": 3}}"#).unwrap();
        assert!(envelope.ok);
        assert_eq!(envelope.result.unwrap().value, json!(3));
    }

    #[test]
    fn test_parse_envelope_without_result() {
        let envelope: SuccessEnvelope = parse_envelope(br#"{"ok": true}"#).unwrap();
        assert!(envelope.ok);
        assert!(envelope.result.is_none());
    }

    #[test]
    fn test_parse_envelope_after_diagnostics() {
        let output = b"warning: slow import\n{\"ok\": false, \"error\": {\"kind\": \"TypeError\", \"message\": \"bad\"}}\n";
        let envelope: ErrorEnvelope = parse_envelope(output).unwrap();
        let detail = envelope.error.unwrap();
        assert_eq!(detail.kind, "TypeError");
        assert!(detail.field.is_none());
    }

    #[test]
    fn test_parse_envelope_garbage() {
        assert!(parse_envelope::<SuccessEnvelope>(b"not json").is_err());
        assert!(parse_envelope::<SuccessEnvelope>(b"").is_err());
        assert!(parse_envelope::<ErrorEnvelope>(b"line one\nline two\n").is_err());
    }
}
