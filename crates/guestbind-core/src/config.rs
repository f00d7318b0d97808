//! Centralized configuration for guest invocation.
//!
//! Protocol constants are fixed by the wire contract. Client defaults can be
//! overridden per client through [`crate::GuestClientBuilder`].

use std::time::Duration;

/// Constants fixed by the invocation protocol.
pub struct ProtocolConfig;

impl ProtocolConfig {
    pub const EXIT_SUCCESS: i32 = 0;
    pub const EXIT_HANDLED_ERROR: i32 = 1;
    pub const EXIT_CRASH: i32 = 2;

    /// Reserved function every guest answers with its own signatures.
    pub const INTROSPECT_FUNCTION: &'static str = "__introspect__";

    /// Prefix marking a guest function as private.
    pub const PRIVATE_PREFIX: &'static str = "_";

    /// Error kinds, reported under exit code 1, that mean the caller erred.
    pub const VALIDATION_ERROR: &'static str = "ValidationError";
    pub const TYPE_ERROR: &'static str = "TypeError";
    pub const FUNCTION_NOT_FOUND_ERROR: &'static str = "FunctionNotFoundError";
}

/// Client-side defaults.
pub struct ClientConfig;

impl ClientConfig {
    /// Timeout applied to introspection by the generator.
    pub const INTROSPECTION_TIMEOUT: Duration = Duration::from_secs(10);

    /// Printed alongside introspection failures.
    pub const INTROSPECTION_HINT: &'static str =
        "the guest executable must answer the `__introspect__` function with its exported signatures";
}

/// Code generation defaults.
pub struct GeneratorConfig;

impl GeneratorConfig {
    pub const GENERATOR_NAME: &'static str = "guestbind-gen";
    pub const DEFAULT_CLIENT_NAME: &'static str = "Client";
    pub const DEFAULT_RUNTIME_CRATE: &'static str = "guestbind";

    /// Signatures longer than this are broken one parameter per line.
    pub const MAX_SIGNATURE_WIDTH: usize = 100;
}
