//! Debug sub-channels, the security category and forced rotation.
//!
//! Run with:
//! ```bash
//! cargo run --example subchannels
//! ```

use dailylog::{Attributes, Category, Clock};
use time::macros::datetime;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let (clock, manual) = Clock::manual(datetime!(2025-01-01 23:59 UTC));
    let registry = dailylog::builder()
        .with_log_dir("logs-demo")
        .with_console_level("DEBUG")
        .with_clock(clock)
        .build_registry()?;

    let api = registry.get_logger("demo.api", Category::Debug, Some("api"))?;
    let db = registry.debug_logger("demo.db", Some("db"))?;
    let audit = registry.security_logger("demo.security")?;

    api.debug("request", Attributes::new().with("method", "GET").with("path", "/"));
    db.debug("query", Attributes::new().with("rows", 3));
    audit.warning("failed login", Attributes::new().with("user", "mallory"));

    manual.set_now(datetime!(2025-01-02 00:01 UTC));
    let rotated = registry.force_rotation_check();
    api.info("after midnight", Attributes::new());

    println!("rotated: {}", rotated);
    println!("categories: {:?}", registry.used_categories());
    registry.shutdown();
    Ok(())
}
