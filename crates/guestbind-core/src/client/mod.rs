//! Client for calling functions exported by a guest executable.
//!
//! Each call spawns a fresh guest process, writes one request document to its
//! stdin and classifies the outcome by exit status:
//!
//! - `0`: stdout holds a success envelope
//! - `1`: stderr holds an error envelope for a handled error
//! - `2`: stderr holds an error envelope for a crash
//!
//! Any other exit status is a protocol violation. No state survives a call,
//! so a single client may be used from many tasks at once.

mod exec;

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::cancel::CancellationToken;
use crate::descriptor::FunctionDescriptor;
use crate::error::{classify_guest_error, GuestError, GuestbindError, Result};
use crate::protocol::{parse_envelope, ErrorEnvelope, ExitStatus, InvocationRequest, SuccessEnvelope};
use exec::RawOutput;

/// Calls guest functions, one process per call.
///
/// # Example
///
/// ```rust,ignore
/// use guestbind::{CancellationToken, GuestClient};
/// use serde_json::json;
///
/// let client = GuestClient::new("./dist/mathlib");
/// let sum: Option<i64> = client
///     .call("sum", &json!({"a": 1, "b": 2}), &CancellationToken::new())
///     .await?;
/// assert_eq!(sum, Some(3));
/// ```
#[derive(Debug, Clone)]
pub struct GuestClient {
    binary_path: PathBuf,
    env: Vec<(OsString, OsString)>,
    working_dir: Option<PathBuf>,
    timeout: Option<Duration>,
}

impl GuestClient {
    /// Create a client for the guest executable at `binary_path`.
    pub fn new(binary_path: impl Into<PathBuf>) -> Self {
        GuestClientBuilder::new(binary_path).build()
    }

    /// Start configuring a client.
    pub fn builder(binary_path: impl Into<PathBuf>) -> GuestClientBuilder {
        GuestClientBuilder::new(binary_path)
    }

    pub fn binary_path(&self) -> &Path {
        &self.binary_path
    }

    /// Per-call timeout, if one is configured.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Call `function` and decode its result into `T`.
    ///
    /// `args` must serialize to a JSON object keyed by the guest's parameter
    /// names. Returns `Ok(None)` when the guest succeeds without a `result`.
    pub async fn call<A, T>(
        &self,
        function: &str,
        args: &A,
        cancel: &CancellationToken,
    ) -> Result<Option<T>>
    where
        A: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        match self.invoke(function, args, cancel).await? {
            Some(value) => decode_value(function, value).map(Some),
            None => Ok(None),
        }
    }

    /// Call `function` and return the result as an untyped JSON value.
    ///
    /// A success without a `result` yields `Value::Null`.
    pub async fn call_raw<A>(
        &self,
        function: &str,
        args: &A,
        cancel: &CancellationToken,
    ) -> Result<serde_json::Value>
    where
        A: Serialize + ?Sized,
    {
        Ok(self
            .invoke(function, args, cancel)
            .await?
            .unwrap_or(serde_json::Value::Null))
    }

    /// Call `function` for its effect only. The success envelope is still validated.
    pub async fn call_unit<A>(
        &self,
        function: &str,
        args: &A,
        cancel: &CancellationToken,
    ) -> Result<()>
    where
        A: Serialize + ?Sized,
    {
        self.invoke(function, args, cancel).await.map(|_| ())
    }

    /// Ask the guest for the signatures of its public functions.
    pub async fn introspect(&self, cancel: &CancellationToken) -> Result<Vec<FunctionDescriptor>> {
        crate::introspect::introspect(self, cancel).await
    }

    async fn invoke<A>(
        &self,
        function: &str,
        args: &A,
        cancel: &CancellationToken,
    ) -> Result<Option<serde_json::Value>>
    where
        A: Serialize + ?Sized,
    {
        let payload = encode_request(function, args)?;

        if cancel.check().is_err() {
            debug!("Guest call {} cancelled before spawn", function);
            return Err(GuestbindError::Cancelled {
                function: function.to_string(),
            });
        }

        let output = self.execute(function, &payload, cancel).await?;
        classify_outcome(function, output)
    }
}

/// Builder for [`GuestClient`].
#[derive(Debug, Clone)]
pub struct GuestClientBuilder {
    binary_path: PathBuf,
    env: Vec<(OsString, OsString)>,
    working_dir: Option<PathBuf>,
    timeout: Option<Duration>,
}

impl GuestClientBuilder {
    pub fn new(binary_path: impl Into<PathBuf>) -> Self {
        Self {
            binary_path: binary_path.into(),
            env: Vec::new(),
            working_dir: None,
            timeout: None,
        }
    }

    /// Set an environment variable for every guest process.
    pub fn env(mut self, key: impl Into<OsString>, value: impl Into<OsString>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Run guest processes in `dir` instead of the current directory.
    pub fn working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Kill the guest and fail with [`GuestbindError::Timeout`] after `timeout`.
    ///
    /// Default: no timeout; only the cancellation token ends a call early.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn build(self) -> GuestClient {
        GuestClient {
            binary_path: self.binary_path,
            env: self.env,
            working_dir: self.working_dir,
            timeout: self.timeout,
        }
    }
}

fn encode_request<A>(function: &str, args: &A) -> Result<Vec<u8>>
where
    A: Serialize + ?Sized,
{
    let encoding_error = |e: serde_json::Error| GuestbindError::Encoding {
        function: function.to_string(),
        message: e.to_string(),
        source: Some(e),
    };

    let args = match serde_json::to_value(args).map_err(encoding_error)? {
        serde_json::Value::Object(map) => map,
        other => {
            return Err(GuestbindError::Encoding {
                function: function.to_string(),
                message: format!("arguments must encode to a JSON object, got {}", other),
                source: None,
            })
        }
    };

    serde_json::to_vec(&InvocationRequest {
        function,
        args: &args,
    })
    .map_err(encoding_error)
}

fn decode_value<T: DeserializeOwned>(function: &str, value: serde_json::Value) -> Result<T> {
    let output = value.to_string();
    serde_json::from_value(value).map_err(|e| GuestbindError::Decoding {
        function: function.to_string(),
        message: e.to_string(),
        output,
        source: Some(e),
    })
}

/// Turn a finished process into the decoded result or a classified error.
fn classify_outcome(function: &str, output: RawOutput) -> Result<Option<serde_json::Value>> {
    let Some(code) = output.exit_code else {
        let message = match output.signal {
            Some(signal) => format!("guest terminated by signal {}", signal),
            None => "guest terminated without an exit code".to_string(),
        };
        return Err(GuestbindError::process(message, None, &output.stderr));
    };

    match ExitStatus::from_code(code) {
        Some(ExitStatus::Success) => decode_success(function, &output),
        Some(status) => Err(decode_failure(function, status, &output)),
        None => {
            warn!("Guest call {} exited with unknown code {}", function, code);
            Err(GuestbindError::process(
                "unknown exit code",
                Some(code),
                &output.stderr,
            ))
        }
    }
}

fn decode_success(function: &str, output: &RawOutput) -> Result<Option<serde_json::Value>> {
    let envelope: SuccessEnvelope = parse_envelope(&output.stdout)
        .map_err(|e| GuestbindError::decoding(function, &output.stdout, e))?;

    if !envelope.ok {
        return Err(GuestbindError::process(
            "success exit without an `ok: true` envelope",
            Some(ExitStatus::Success.code()),
            &output.stderr,
        ));
    }

    Ok(envelope.result.map(|r| r.value))
}

fn decode_failure(function: &str, status: ExitStatus, output: &RawOutput) -> GuestbindError {
    let envelope: ErrorEnvelope = match parse_envelope(&output.stderr) {
        Ok(envelope) => envelope,
        Err(e) => {
            debug!("Unparseable error envelope from {}: {}", function, e);
            return GuestbindError::process(
                "invalid error response",
                Some(status.code()),
                &output.stderr,
            );
        }
    };

    if envelope.ok {
        debug!("Error envelope from {} claims success", function);
        return GuestbindError::process(
            "invalid error response",
            Some(status.code()),
            &output.stderr,
        );
    }

    let Some(detail) = envelope.error else {
        return GuestbindError::process(
            "missing error details",
            Some(status.code()),
            &output.stderr,
        );
    };

    debug!(
        "Guest call {} failed with {} (exit {})",
        function,
        detail.kind,
        status.code()
    );

    classify_guest_error(
        GuestError {
            kind: detail.kind,
            message: detail.message,
            field: detail.field,
            function: function.to_string(),
        },
        status,
    )
}
