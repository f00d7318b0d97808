//! Generation of typed Rust wrappers from guest signatures.
//!
//! [`generate`] is a pure function of its inputs: the same descriptors and
//! options always produce byte-identical source. Per function it emits a
//! private `Serialize` struct for the arguments, keyed on the wire by the
//! guest's original parameter names, and an `async fn` wrapper on the
//! generated client struct.

mod emit;
pub mod host_type;
pub mod naming;

pub use host_type::HostType;

use tracing::info;

use crate::cancel::CancellationToken;
use crate::client::GuestClient;
use crate::config::GeneratorConfig;
use crate::descriptor::FunctionDescriptor;
use crate::error::Result;
use naming::{to_snake_identifier, to_type_identifier, IdentifierSet};

/// Options controlling generated code.
#[derive(Debug, Clone)]
pub struct GeneratorOptions {
    /// Name of the generated client struct.
    pub client_name: String,
    /// Path under which generated code reaches this crate.
    pub runtime_crate: String,
}

impl Default for GeneratorOptions {
    fn default() -> Self {
        Self {
            client_name: GeneratorConfig::DEFAULT_CLIENT_NAME.to_string(),
            runtime_crate: GeneratorConfig::DEFAULT_RUNTIME_CRATE.to_string(),
        }
    }
}

/// Inherent methods of the generated client; wrappers must not reuse them.
const CLIENT_METHODS: &[&str] = &["new", "from_client", "inner"];

/// Locals of every wrapper body; parameters must not reuse them.
const WRAPPER_LOCALS: &[&str] = &["cancel", "args", "value"];

/// Names brought in by the generated `use` line; the client must not shadow them.
const IMPORTED_NAMES: &[&str] = &["CancellationToken", "GuestClient", "Result"];

/// Everything needed to emit one wrapper.
#[derive(Debug)]
pub(crate) struct WrapperPlan<'a> {
    pub function: &'a FunctionDescriptor,
    pub method: String,
    pub args_struct: String,
    pub params: Vec<ParamPlan<'a>>,
    pub return_type: HostType,
}

#[derive(Debug)]
pub(crate) struct ParamPlan<'a> {
    /// Wire name.
    pub original: &'a str,
    pub ident: String,
    pub ty: HostType,
}

/// Generate the source of a client module for `functions`.
///
/// Private functions are skipped. Descriptors that degraded to `Any` are
/// emitted with dynamic types; nothing here can fail.
pub fn generate(functions: &[FunctionDescriptor], options: &GeneratorOptions) -> String {
    let client_name =
        IdentifierSet::with_reserved(IMPORTED_NAMES).claim(to_type_identifier(&options.client_name));
    let plans = plan(functions, &client_name);
    emit::render(&plans, &client_name, &options.runtime_crate)
}

/// Introspect the guest behind `client` and generate its wrappers.
pub async fn generate_from_guest(
    client: &GuestClient,
    cancel: &CancellationToken,
    options: &GeneratorOptions,
) -> Result<String> {
    let functions = client.introspect(cancel).await?;
    let source = generate(&functions, options);
    info!(
        "Generated {} wrappers ({} bytes) for {}",
        functions.len(),
        source.len(),
        client.binary_path().display()
    );
    Ok(source)
}

fn plan<'a>(functions: &'a [FunctionDescriptor], client_name: &str) -> Vec<WrapperPlan<'a>> {
    let mut methods = IdentifierSet::with_reserved(CLIENT_METHODS);
    let mut structs = IdentifierSet::with_reserved(IMPORTED_NAMES);
    structs.claim(client_name.to_string());

    functions
        .iter()
        .filter(|f| !f.is_private())
        .map(|function| {
            let mut locals = IdentifierSet::with_reserved(WRAPPER_LOCALS);
            // Parameters are already in original-name order.
            let params = function
                .parameters()
                .iter()
                .map(|param| ParamPlan {
                    original: &param.name,
                    ident: locals.claim(to_snake_identifier(&param.name)),
                    ty: HostType::from_descriptor(&param.ty),
                })
                .collect();

            WrapperPlan {
                function,
                method: methods.claim(to_snake_identifier(function.name())),
                args_struct: structs.claim(format!("{}Args", to_type_identifier(function.name()))),
                params,
                return_type: HostType::from_descriptor(function.return_type()),
            }
        })
        .collect()
}
