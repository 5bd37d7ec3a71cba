//! Logging initialization.
//!
//! Controlled by `DOCGRAPH_LOG`:
//! - unset or empty: no subscriber is installed (tracing disabled)
//! - `"stderr"`: JSON events to stderr, with span close events
//! - anything else: human-readable lines to stderr
//!
//! The level filter comes from `RUST_LOG` and defaults to `info`.

use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt as _;
use tracing_subscriber::util::SubscriberInitExt as _;

/// Environment variable selecting the log output.
pub const LOG_ENV: &str = "DOCGRAPH_LOG";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Output {
    Off,
    Json,
    Pretty,
}

fn output_for(value: Option<&str>) -> Output {
    match value.map(str::trim) {
        None | Some("") => Output::Off,
        Some("stderr") => Output::Json,
        Some(_) => Output::Pretty,
    }
}

/// Install the global subscriber according to `DOCGRAPH_LOG`.
///
/// Calling it again is harmless; only the first subscriber wins.
pub fn init() {
    let value = std::env::var(LOG_ENV).ok();
    let filter = || EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let installed = match output_for(value.as_deref()) {
        Output::Off => return,
        Output::Json => tracing_subscriber::registry()
            .with(filter())
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_span_events(tracing_subscriber::fmt::format::FmtSpan::CLOSE),
            )
            .try_init(),
        Output::Pretty => tracing_subscriber::registry()
            .with(filter())
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(false),
            )
            .try_init(),
    };
    if let Err(e) = installed {
        eprintln!("warning: logging already initialized: {e}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unset_or_blank_disables_logging() {
        assert_eq!(output_for(None), Output::Off);
        assert_eq!(output_for(Some("")), Output::Off);
        assert_eq!(output_for(Some("  ")), Output::Off);
    }

    #[test]
    fn stderr_selects_json() {
        assert_eq!(output_for(Some("stderr")), Output::Json);
    }

    #[test]
    fn anything_else_is_human_readable() {
        assert_eq!(output_for(Some("1")), Output::Pretty);
        assert_eq!(output_for(Some("pretty")), Output::Pretty);
    }
}
