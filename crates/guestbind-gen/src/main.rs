//! guestbind-gen - generate a typed Rust client for a guest executable.
//!
//! The guest is introspected once through its `__introspect__` function and
//! the resulting module is written to `--output`, or to stdout.

use anyhow::{Context, Result};
use clap::Parser;
use guestbind::config::{ClientConfig, GeneratorConfig};
use guestbind::{generate, CancellationToken, GeneratorOptions, GuestClient};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "guestbind-gen")]
#[command(about = "Generate typed Rust wrappers for a guest executable")]
struct Args {
    /// Path to the guest executable
    #[arg(short, long)]
    binary: PathBuf,

    /// Name of the generated client struct
    #[arg(long, default_value = GeneratorConfig::DEFAULT_CLIENT_NAME)]
    client_name: String,

    /// Path under which the generated code reaches the guestbind crate
    #[arg(long, default_value = GeneratorConfig::DEFAULT_RUNTIME_CRATE)]
    runtime_crate: String,

    /// Output file (defaults to stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Seconds to wait for introspection
    #[arg(long, default_value_t = ClientConfig::INTROSPECTION_TIMEOUT.as_secs())]
    timeout_secs: u64,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

impl Args {
    fn options(&self) -> GeneratorOptions {
        GeneratorOptions {
            client_name: self.client_name.clone(),
            runtime_crate: self.runtime_crate.clone(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Logs go to stderr; stdout may carry the generated source.
    let log_level = if args.debug { Level::DEBUG } else { Level::INFO };
    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .compact()
        .init();

    let client = GuestClient::builder(&args.binary)
        .timeout(Duration::from_secs(args.timeout_secs))
        .build();

    let cancel = CancellationToken::new();
    let ctrl_c_token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupted, cancelling introspection");
            ctrl_c_token.cancel();
        }
    });

    debug!("Introspecting {}", args.binary.display());
    let functions = client.introspect(&cancel).await.with_context(|| {
        format!(
            "failed to introspect {}: {}",
            args.binary.display(),
            ClientConfig::INTROSPECTION_HINT
        )
    })?;
    let source = generate(&functions, &args.options());

    write_output(&source, functions.len(), args.output.as_deref())?;
    Ok(())
}

/// Write `source` to `output`, or to stdout when no file is given.
fn write_output(source: &str, function_count: usize, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, source)
                .with_context(|| format!("failed to write {}", path.display()))?;
            eprintln!(
                "Generated {} with {} functions",
                path.display(),
                function_count
            );
        }
        None => print!("{}", source),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_args_defaults() {
        let args = Args::try_parse_from(["guestbind-gen", "--binary", "./dist/mathlib"]).unwrap();
        assert_eq!(args.binary, PathBuf::from("./dist/mathlib"));
        assert_eq!(args.client_name, "Client");
        assert_eq!(args.runtime_crate, "guestbind");
        assert_eq!(args.timeout_secs, 10);
        assert!(args.output.is_none());
        assert!(!args.debug);
    }

    #[test]
    fn test_binary_is_required() {
        assert!(Args::try_parse_from(["guestbind-gen"]).is_err());
    }

    #[test]
    fn test_args_options() {
        let args = Args::try_parse_from([
            "guestbind-gen",
            "-b",
            "guest",
            "--client-name",
            "math_lib",
            "--runtime-crate",
            "crate::rt",
            "-o",
            "out.rs",
        ])
        .unwrap();
        let options = args.options();
        assert_eq!(options.client_name, "math_lib");
        assert_eq!(options.runtime_crate, "crate::rt");
        assert_eq!(args.output, Some(PathBuf::from("out.rs")));
    }

    #[test]
    fn test_write_output_to_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("client.rs");
        let source = "pub struct Client {}\nimpl Client {\n    pub async fn sum(&self) {}\n}\n";

        write_output(source, 1, Some(&path)).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), source);
    }

    #[test]
    fn test_write_output_missing_dir() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("missing").join("client.rs");
        let err = write_output("", 0, Some(&path)).unwrap_err();
        assert!(err.to_string().contains("failed to write"));
    }
}
