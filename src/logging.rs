use std::env;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

fn filter_directive(verbosity: u8, from_env: Option<String>) -> String {
    match verbosity {
        0 => from_env
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| "info".to_string()),
        1 => "debug".to_string(),
        _ => "trace".to_string(),
    }
}

/// Diagnostics go to stderr so stdout stays reserved for reports.
pub fn init(verbosity: u8) {
    let directive = filter_directive(verbosity, env::var("TIMETABLE_LOG").ok());
    let filter = EnvFilter::try_new(&directive).unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .without_time()
                .with_ansi(false),
        )
        .with(filter)
        .try_init();
}
