// ABOUTME: Shared wiring for the setkeep command line
// ABOUTME: Builds the settings service from configuration and parses CLI arguments

pub mod args;
pub mod context;


pub use args::{parse_assignment, ArgError};
pub use context::AppContext;

/// Install the tracing subscriber; `RUST_LOG` overrides the default filter
pub fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}
