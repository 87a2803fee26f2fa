//! Structured logging setup for deckhand.
//!
//! Log lines always go to stderr so that stdout stays reserved for command
//! output (including JSON documents).

use std::io::{self, IsTerminal};

use tracing_subscriber::{
    EnvFilter, Layer, Registry,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

/// Filter directive used when `RUST_LOG` is not set.
pub fn default_directive(verbose: u8, quiet: bool) -> &'static str {
    if quiet {
        return "deckhand=error";
    }
    match verbose {
        0 => "deckhand=info",
        1 => "deckhand=debug",
        _ => "deckhand=trace",
    }
}

/// Initialize the global tracing subscriber.
///
/// | Mode | TTY | Output |
/// |------|-----|--------|
/// | JSON | any | JSON lines |
/// | Text | yes | Pretty colored output |
/// | Text | no  | Compact plain output |
///
/// `RUST_LOG` overrides the verbosity flags (e.g. `deckhand::deck=trace`).
/// Calling this twice is harmless; the second call is ignored.
pub fn init_logging(json: bool, verbose: u8, quiet: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbose, quiet)));

    let layer: Box<dyn Layer<Registry> + Send + Sync> = if json {
        fmt::layer()
            .json()
            .with_target(true)
            .with_span_events(FmtSpan::NONE)
            .with_writer(io::stderr)
            .boxed()
    } else if io::stderr().is_terminal() {
        fmt::layer()
            .with_target(false)
            .with_span_events(FmtSpan::NONE)
            .with_writer(io::stderr)
            .boxed()
    } else {
        fmt::layer()
            .with_ansi(false)
            .with_target(false)
            .with_span_events(FmtSpan::NONE)
            .compact()
            .with_writer(io::stderr)
            .boxed()
    };

    let _ = tracing_subscriber::registry()
        .with(layer)
        .with(filter)
        .try_init();
}
