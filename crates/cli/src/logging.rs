//! Logging setup
//!
//! Logs go to stderr so command output on stdout stays clean.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_LOG_FILTER: &str = "helpdesk_cli=info,helpdesk_core=warn,helpdesk_infra_sqlite=warn";

/// Initialize tracing.
///
/// # Environment Variables
///
/// - `RUST_LOG`: filter directives (default: warnings only from the libraries)
/// - `HELPDESK_LOG_FORMAT`: `json` for structured output, anything else for
///   human-readable lines
pub fn init() {
    let log_format = std::env::var("HELPDESK_LOG_FORMAT").unwrap_or_else(|_| "pretty".to_string());

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    match log_format.as_str() {
        "json" => {
            // Production: JSON structured logging
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        _ => {
            // Development: compact lines with colors
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().compact().with_writer(std::io::stderr))
                .init();
        }
    }
}
