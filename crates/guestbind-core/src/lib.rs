//! Guestbind - typed invocation of functions exported by a guest executable.
//!
//! A guest is a standalone binary that exports named functions. Every call
//! runs the binary once: the request is written as JSON to its stdin, the
//! response envelope is read from its stdout, and the exit code says which
//! envelope to expect (0 success, 1 handled error, 2 crash).
//!
//! This crate provides the host side of that boundary:
//!
//! - [`GuestClient`] spawns the guest, enforces cancellation and timeouts,
//!   and classifies every outcome into one [`GuestbindError`] category.
//! - [`introspect()`] asks the guest for its own signatures.
//! - [`codegen`] turns those signatures into a typed Rust client module.
//!
//! # Example
//!
//! ```rust,ignore
//! use guestbind::{CancellationToken, GuestClient};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> guestbind::Result<()> {
//!     let client = GuestClient::new("./dist/mathlib");
//!     let cancel = CancellationToken::new();
//!
//!     let sum: Option<i64> = client.call("sum", &json!({"a": 2, "b": 3}), &cancel).await?;
//!     println!("2 + 3 = {}", sum.unwrap_or_default());
//!
//!     for function in client.introspect(&cancel).await? {
//!         println!("{}", function);
//!     }
//!     Ok(())
//! }
//! ```

pub mod cancel;
pub mod client;
pub mod codegen;
pub mod config;
pub mod descriptor;
pub mod error;
pub mod introspect;
pub mod protocol;

pub use cancel::{CancellationToken, CancelledError};
pub use client::{GuestClient, GuestClientBuilder};
pub use codegen::{generate, generate_from_guest, GeneratorOptions};
pub use descriptor::{parse_type, FunctionDescriptor, ParameterDescriptor, TypeDescriptor};
pub use error::{
    classify_guest_error, ErrorCategory, GuestError, GuestbindError, InputErrorKind, Result,
};
pub use introspect::introspect;
pub use protocol::ExitStatus;

// Generated clients derive `Serialize` through these paths, so downstream
// crates need no direct serde dependency.
pub use serde;
pub use serde_json;
