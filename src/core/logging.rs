//! Logging initialization

/// Initialize the logging system
///
/// Uses env_logger with default filter level of `info`.
/// Override with RUST_LOG environment variable, e.g. `RUST_LOG=voxgrid=debug`
/// to see tree dumps and mesh block builds.
///
/// # Example
/// ```no_run
/// voxgrid::core::logging::init();
/// log::info!("Grid loaded");
/// ```
pub fn init() {
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("info")
    ).init();
}
