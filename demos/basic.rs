//! Basic structured logging.
//!
//! Writes a few records into `./logs` using settings from the environment
//! (`LOG_DIR`, `CONSOLE_LOG_LEVEL`, `FILE_LOG_LEVEL`, ...), then bridges a
//! `tracing` event into the same files.
//!
//! Run with:
//! ```bash
//! cargo run --example basic
//! ```

use dailylog::Attributes;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let registry = dailylog::LogBuilder::from_env()?.init()?;
    dailylog::init_tracing_bridge(&registry)?;

    let logger = registry.app_logger("demo.basic")?;
    logger.debug("loading configuration", Attributes::new());
    logger.info("service started", Attributes::new().with("version", "1.0"));
    logger.warning(
        "slow request",
        Attributes::new().with("path", "/api/users").with("ms", 1250),
    );

    let err = std::io::Error::new(std::io::ErrorKind::NotFound, "config.yaml missing");
    logger.exception("could not reload configuration", &err, Attributes::new());

    tracing::info!(target: "demo::tracing", user = "alice", "user performed an action");

    println!("log directory: {}", registry.settings().log_dir.display());
    Ok(())
}
