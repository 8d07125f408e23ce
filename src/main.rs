//! robustfetch - adaptive, policy-aware HTTP fetch engine.
//!
//! Command-line front end for the fetch engine: fetch one or many URLs,
//! report outcome statistics, optionally export results as JSON.

mod cli;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging based on verbosity
    let default_filter = if cli::is_verbose() {
        "robustfetch=debug"
    } else {
        "robustfetch=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    cli::run().await
}
