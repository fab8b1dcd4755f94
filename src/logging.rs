//! Structured logging setup.
//!
//! JSON is the default output, one flattened object per event with
//! `timestamp`, `level` and `message` keys plus the list of enclosing spans.
//! Work run under [`root_span`] carries `dissembler_version` on every entry.
//! `RUST_LOG` overrides the configured level.

use crate::config::{LogConfig, LogFormat};
use crate::{Error, Result};
use tracing::{info_span, Span, Subscriber};
use tracing_subscriber::fmt::format::{Format, Json, JsonFields};
use tracing_subscriber::fmt::{self, MakeWriter};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Build the event filter: `RUST_LOG` first, then the configured directive
pub fn filter(config: &LogConfig) -> Result<EnvFilter> {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .map_err(|e| Error::InvalidConfig {
            field: "log.level".to_string(),
            reason: e.to_string(),
        })
}

/// Span stamping the running version onto everything logged inside it.
///
/// Create it after [`init`]; a span built before a subscriber exists is
/// disabled.
pub fn root_span() -> Span {
    info_span!(
        "dissembler",
        dissembler_version = %crate::version::human_version()
    )
}

fn json_layer<S, W>(writer: W) -> fmt::Layer<S, JsonFields, Format<Json>, W>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    W: for<'w> MakeWriter<'w> + 'static,
{
    fmt::layer()
        .json()
        .flatten_event(true)
        .with_current_span(false)
        .with_span_list(true)
        .with_writer(writer)
}

/// Install the global subscriber. Fails if one is already installed.
pub fn init(config: &LogConfig) -> Result<()> {
    let registry = tracing_subscriber::registry().with(filter(config)?);

    let installed = match config.format {
        LogFormat::Json => registry.with(json_layer(std::io::stdout)).try_init(),
        LogFormat::Pretty => registry.with(fmt::layer().pretty()).try_init(),
        LogFormat::Compact => registry.with(fmt::layer().compact()).try_init(),
    };

    installed.map_err(|e| Error::Logging(e.to_string()))
}
