#![cfg(not(tarpaulin_include))]

use dashboard::app;
use dashboard::config::Config;

/// Main entry point for the dashboard web application
///
/// Settings come from `DASHBOARD_*` environment variables and the optional
/// positional arguments `[addr] [page_size]`. Log output is controlled by
/// `RUST_LOG` and defaults to `info`.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Config::load();
    log::info!(
        "Starting dashboard on {} with {} rows per table page",
        config.addr,
        config.page_size
    );
    app::run(config).await
}
