//! Tracing setup
//!
//! Logs go to stderr; stdout carries the MCP protocol.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub const LOG_TARGET: &str = "presto_mcp";

/// Install the global subscriber
///
/// `RUST_LOG` is used as-is when set; otherwise only `presto_mcp=info` is
/// enabled. `LOG_FORMAT=json` switches to JSON lines.
pub fn init_tracing() -> anyhow::Result<()> {
    let directives = filter_directives(std::env::var(EnvFilter::DEFAULT_ENV).ok().as_deref());
    let filter = EnvFilter::try_new(directives)?;

    let (json_layer, text_layer) = if json_requested(std::env::var("LOG_FORMAT").ok().as_deref()) {
        (Some(fmt::layer().json().with_writer(std::io::stderr)), None)
    } else {
        (None, Some(fmt::layer().with_writer(std::io::stderr).with_ansi(false)))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(json_layer)
        .with(text_layer)
        .try_init()?;

    Ok(())
}

fn filter_directives(rust_log: Option<&str>) -> String {
    match rust_log.map(str::trim) {
        Some(spec) if !spec.is_empty() => spec.to_string(),
        _ => format!("{}=info", LOG_TARGET),
    }
}

fn json_requested(format: Option<&str>) -> bool {
    format.is_some_and(|v| v.eq_ignore_ascii_case("json"))
}
