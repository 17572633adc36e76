mod config;
mod error;
mod format;
mod log;

pub use config::{ENV_COLOR, ENV_FORMAT, ENV_LEVEL, LoggerConfig};
pub use error::LoggerError;
pub use format::LoggerFormat;

/// Install the global subscriber described by `cfg`.
pub fn logger_init(cfg: &LoggerConfig) -> Result<(), LoggerError> {
    match cfg.format {
        LoggerFormat::Text => log::Logger::text(cfg),
        LoggerFormat::Json => log::Logger::json(cfg),
        LoggerFormat::Journald => log::Logger::journald(cfg),
    }?;
    tracing::debug!(format = %cfg.format, level = %cfg.level, "logger installed");
    Ok(())
}

/// [`logger_init`] with settings read from the `DEPOT_LOG*` environment variables.
pub fn logger_init_from_env() -> Result<LoggerConfig, LoggerError> {
    let cfg = LoggerConfig::from_env()?;
    logger_init(&cfg)?;
    Ok(cfg)
}
