pub mod config;
pub mod console;
pub mod error;
pub mod export;
pub mod grid;
pub mod models;
pub mod session;
pub mod timer;
pub mod utils;

pub use config::ExperimentConfig;
pub use error::{SessionError, SessionResult};
pub use session::{Effect, Event, Phase, Session, SessionController};

use config::DEFAULT_CONFIG_FILE;

pub fn run() {
    // Initialize logging (reads RUST_LOG env var)
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    log::info!("matrixlab starting up...");

    let result = (|| -> anyhow::Result<()> {
        let config = ExperimentConfig::load(DEFAULT_CONFIG_FILE)?;
        log::info!(
            "{} blocks of {}s, {} per correct grid",
            config.total_blocks,
            config.block_duration_secs,
            config.payout_per_correct
        );

        let runtime = tokio::runtime::Runtime::new()?;
        runtime.block_on(console::run_console(config))
    })();

    if let Err(err) = result {
        log::error!("matrixlab exited with error: {err:#}");
        std::process::exit(1);
    }
}
