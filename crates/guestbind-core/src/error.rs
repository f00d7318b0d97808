//! Error types for guest invocation.
//!
//! Every failed call ends in exactly one [`GuestbindError`] variant. Failures
//! reported by the guest keep their original kind, message and field so that
//! callers can match on them structurally instead of inspecting strings.

use std::fmt;
use std::time::Duration;
use thiserror::Error;

use crate::config::ProtocolConfig;
use crate::protocol::ExitStatus;

/// Guest-declared error kinds that the host treats as caller mistakes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputErrorKind {
    /// `ValidationError`: the guest rejected an argument value.
    Validation,
    /// `TypeError`: an argument did not match the declared type.
    Type,
    /// `FunctionNotFoundError`: the guest does not export the function.
    FunctionNotFound,
}

impl InputErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            InputErrorKind::Validation => ProtocolConfig::VALIDATION_ERROR,
            InputErrorKind::Type => ProtocolConfig::TYPE_ERROR,
            InputErrorKind::FunctionNotFound => ProtocolConfig::FUNCTION_NOT_FOUND_ERROR,
        }
    }

    /// Look up a recognized kind by its wire spelling.
    pub fn from_kind(kind: &str) -> Option<Self> {
        match kind {
            ProtocolConfig::VALIDATION_ERROR => Some(InputErrorKind::Validation),
            ProtocolConfig::TYPE_ERROR => Some(InputErrorKind::Type),
            ProtocolConfig::FUNCTION_NOT_FOUND_ERROR => Some(InputErrorKind::FunctionNotFound),
            _ => None,
        }
    }
}

impl fmt::Display for InputErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An error the guest reported through its error envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuestError {
    /// Kind as declared by the guest (e.g. `ValidationError`).
    pub kind: String,
    pub message: String,
    /// Offending argument, for validation and type errors.
    pub field: Option<String>,
    /// Name of the guest function that was being called.
    pub function: String,
}

impl fmt::Display for GuestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.field {
            Some(field) => write!(
                f,
                "{}: {} (field: {}, function: {})",
                self.kind, self.message, field, self.function
            ),
            None => write!(
                f,
                "{}: {} (function: {})",
                self.kind, self.message, self.function
            ),
        }
    }
}

/// Coarse classification of a [`GuestbindError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// The request could not be serialized.
    Encoding,
    /// Guest output could not be deserialized.
    Decoding,
    /// The boundary itself failed: spawn, envelope, exit status, cancellation.
    Process,
    /// The caller passed bad input.
    InvalidInput,
    /// The guest deliberately rejected the call.
    UserCode,
    /// The guest crashed.
    RuntimeCrash,
}

/// Main error type for guest calls.
#[derive(Debug, Error)]
pub enum GuestbindError {
    #[error("Failed to encode request for {function}: {message}")]
    Encoding {
        function: String,
        message: String,
        #[source]
        source: Option<serde_json::Error>,
    },

    #[error("Failed to decode output of {function}: {message} (output: {output})")]
    Decoding {
        function: String,
        message: String,
        /// The text that failed to decode.
        output: String,
        #[source]
        source: Option<serde_json::Error>,
    },

    #[error("Guest process failed{}: {message}{}", describe_exit(.exit_code), describe_stderr(.stderr))]
    ProcessFailure {
        message: String,
        /// `None` when the process never started or did not exit normally.
        exit_code: Option<i32>,
        /// Captured stderr, possibly empty.
        stderr: String,
        #[source]
        source: Option<std::io::Error>,
    },

    #[error("Call to {function} was cancelled")]
    Cancelled { function: String },

    #[error("Call to {function} timed out after {timeout:?}")]
    Timeout { function: String, timeout: Duration },

    #[error("Invalid input: {error}")]
    InvalidInput {
        kind: InputErrorKind,
        error: GuestError,
    },

    #[error("User code error: {0}")]
    UserCode(GuestError),

    #[error("Runtime crash: {0}")]
    RuntimeCrash(GuestError),
}

/// Result type alias for guest calls.
pub type Result<T> = std::result::Result<T, GuestbindError>;

fn describe_exit(exit_code: &Option<i32>) -> String {
    match exit_code {
        Some(code) => format!(" (exit {})", code),
        None => String::new(),
    }
}

fn describe_stderr(stderr: &str) -> String {
    let trimmed = stderr.trim();
    if trimmed.is_empty() {
        String::new()
    } else {
        format!(": {}", trimmed)
    }
}

impl GuestbindError {
    /// Create a process failure with no underlying IO error.
    pub fn process(message: impl Into<String>, exit_code: Option<i32>, stderr: &[u8]) -> Self {
        GuestbindError::ProcessFailure {
            message: message.into(),
            exit_code,
            stderr: String::from_utf8_lossy(stderr).into_owned(),
            source: None,
        }
    }

    /// Create a decoding failure for output that is not valid JSON for the expected shape.
    pub fn decoding(function: &str, output: &[u8], err: serde_json::Error) -> Self {
        GuestbindError::Decoding {
            function: function.to_string(),
            message: err.to_string(),
            output: String::from_utf8_lossy(output).into_owned(),
            source: Some(err),
        }
    }

    /// Which category this error belongs to.
    pub fn category(&self) -> ErrorCategory {
        match self {
            GuestbindError::Encoding { .. } => ErrorCategory::Encoding,
            GuestbindError::Decoding { .. } => ErrorCategory::Decoding,
            GuestbindError::ProcessFailure { .. }
            | GuestbindError::Cancelled { .. }
            | GuestbindError::Timeout { .. } => ErrorCategory::Process,
            GuestbindError::InvalidInput { .. } => ErrorCategory::InvalidInput,
            GuestbindError::UserCode(_) => ErrorCategory::UserCode,
            GuestbindError::RuntimeCrash(_) => ErrorCategory::RuntimeCrash,
        }
    }

    /// The guest-reported error, for the three guest-declared categories.
    pub fn guest_error(&self) -> Option<&GuestError> {
        match self {
            GuestbindError::InvalidInput { error, .. }
            | GuestbindError::UserCode(error)
            | GuestbindError::RuntimeCrash(error) => Some(error),
            _ => None,
        }
    }

    /// Exit code of the guest process, when the process actually exited.
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            GuestbindError::ProcessFailure { exit_code, .. } => *exit_code,
            GuestbindError::InvalidInput { .. } | GuestbindError::UserCode(_) => {
                Some(ExitStatus::HandledError.code())
            }
            GuestbindError::RuntimeCrash(_) => Some(ExitStatus::Crash.code()),
            _ => None,
        }
    }

    /// True for caller-initiated cancellation and per-call timeouts.
    pub fn is_cancellation(&self) -> bool {
        matches!(
            self,
            GuestbindError::Cancelled { .. } | GuestbindError::Timeout { .. }
        )
    }
}

/// Map a guest-reported error to its host category.
///
/// This is the only place that decides severity. The exit status takes
/// precedence: a crash is a crash whatever kind the guest declared. Under a
/// handled error, recognized input kinds become [`GuestbindError::InvalidInput`]
/// and every other kind becomes [`GuestbindError::UserCode`].
pub fn classify_guest_error(error: GuestError, status: ExitStatus) -> GuestbindError {
    match status {
        ExitStatus::Crash => GuestbindError::RuntimeCrash(error),
        // An error envelope under exit 0 never reaches here from the client;
        // treat it as a deliberate guest failure.
        ExitStatus::HandledError | ExitStatus::Success => {
            match InputErrorKind::from_kind(&error.kind) {
                Some(kind) => GuestbindError::InvalidInput { kind, error },
                None => GuestbindError::UserCode(error),
            }
        }
    }
}
