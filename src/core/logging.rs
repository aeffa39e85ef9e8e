//! Logging initialization and utilities

/// Initialize the logging system
///
/// Uses env_logger with default filter level of `info`.
/// Override with RUST_LOG environment variable. Calling it again once a
/// logger is installed leaves the existing one in place.
///
/// # Example
/// ```
/// isoview::core::logging::init();
/// log::info!("Isometric view ready");
/// ```
pub fn init() {
    let installed = env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("info")
    )
    .format_timestamp_millis()
    .try_init();

    if let Err(e) = installed {
        log::debug!("Keeping existing logger: {e}");
    }
}
