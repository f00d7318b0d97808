//! Signature introspection.
//!
//! The guest answers the reserved `__introspect__` function with its own
//! signatures:
//!
//! ```json
//! {"functions": [{"name": "sum", "parameters": {"a": "int", "b": "int"}, "return_type": "int"}]}
//! ```
//!
//! Type strings are parsed here, once; parameters are sorted on receipt and
//! private functions are dropped.

use std::collections::BTreeMap;

use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::cancel::CancellationToken;
use crate::client::GuestClient;
use crate::config::{ClientConfig, ProtocolConfig};
use crate::descriptor::{parse_type, FunctionDescriptor};
use crate::error::{GuestbindError, Result};

#[derive(Debug, Deserialize)]
struct IntrospectionResult {
    functions: Vec<FunctionEntry>,
}

#[derive(Debug, Deserialize)]
struct FunctionEntry {
    name: String,
    #[serde(default)]
    parameters: BTreeMap<String, String>,
    #[serde(default = "any_type")]
    return_type: String,
}

fn any_type() -> String {
    "Any".to_string()
}

/// Fetch the public function signatures exported by the guest.
///
/// Protocol failures are returned unchanged; they are logged together with
/// a reminder that the guest must implement the introspection convention.
pub async fn introspect(
    client: &GuestClient,
    cancel: &CancellationToken,
) -> Result<Vec<FunctionDescriptor>> {
    let function = ProtocolConfig::INTROSPECT_FUNCTION;

    let value = match client
        .call_raw(function, &serde_json::Map::new(), cancel)
        .await
    {
        Ok(value) => value,
        Err(e) => {
            warn!(
                "Introspection of {} failed: {} ({})",
                client.binary_path().display(),
                e,
                ClientConfig::INTROSPECTION_HINT
            );
            return Err(e);
        }
    };

    let functions = parse_introspection(value)?;
    info!(
        "Introspected {} public functions from {}",
        functions.len(),
        client.binary_path().display()
    );
    Ok(functions)
}

/// Turn an introspection result value into public function descriptors.
pub fn parse_introspection(value: serde_json::Value) -> Result<Vec<FunctionDescriptor>> {
    let output = value.to_string();
    let result: IntrospectionResult =
        serde_json::from_value(value).map_err(|e| GuestbindError::Decoding {
            function: ProtocolConfig::INTROSPECT_FUNCTION.to_string(),
            message: e.to_string(),
            output,
            source: Some(e),
        })?;

    let total = result.functions.len();
    let functions: Vec<FunctionDescriptor> = result
        .functions
        .into_iter()
        .map(|entry| {
            FunctionDescriptor::new(
                entry.name,
                entry
                    .parameters
                    .into_iter()
                    .map(|(name, ty)| (name, parse_type(&ty))),
                parse_type(&entry.return_type),
            )
        })
        .filter(|f| !f.is_private())
        .collect();

    if functions.len() < total {
        debug!("Skipped {} private functions", total - functions.len());
    }
    Ok(functions)
}
