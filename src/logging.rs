use std::path::PathBuf;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_LOG_DIR: &str = "./logs";
const DEFAULT_LOG_FILE_PREFIX: &str = "learning-graph.log";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogRotation {
    Hourly,
    Daily,
    Never,
}

impl LogRotation {
    /// Unknown values fall back to daily.
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "hourly" => Self::Hourly,
            "never" | "none" => Self::Never,
            _ => Self::Daily,
        }
    }

    fn rotation(self) -> Rotation {
        match self {
            Self::Hourly => Rotation::HOURLY,
            Self::Daily => Rotation::DAILY,
            Self::Never => Rotation::NEVER,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileLogConfig {
    pub dir: PathBuf,
    pub prefix: String,
    pub rotation: LogRotation,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    pub level: String,
    /// `None` keeps logging on stdout only.
    pub file: Option<FileLogConfig>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: DEFAULT_LOG_LEVEL.to_string(),
            file: None,
        }
    }
}

impl LoggingConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let value = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let level = value("RUST_LOG").unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string());
        let enabled = value("ENABLE_FILE_LOGS").is_some_and(|v| v == "true" || v == "1");

        let file = enabled.then(|| FileLogConfig {
            dir: PathBuf::from(value("LOG_DIR").unwrap_or_else(|| DEFAULT_LOG_DIR.to_string())),
            prefix: value("LOG_FILE_PREFIX").unwrap_or_else(|| DEFAULT_LOG_FILE_PREFIX.to_string()),
            rotation: value("LOG_ROTATION").map_or(LogRotation::Daily, |v| LogRotation::parse(&v)),
        });

        Self { level, file }
    }
}

/// Keeps the non-blocking file writer flushing until dropped.
pub struct FileLogGuard {
    _guard: WorkerGuard,
}

pub fn init_tracing(config: &LoggingConfig) -> Option<FileLogGuard> {
    let env_filter =
        EnvFilter::try_new(&config.level).unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_LEVEL));
    let stdout_layer = fmt::layer().with_target(true);

    let Some(file) = &config.file else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(stdout_layer)
            .init();
        return None;
    };

    if let Err(err) = std::fs::create_dir_all(&file.dir) {
        eprintln!(
            "failed to create log directory {}: {err}; logging to stdout only",
            file.dir.display()
        );
        tracing_subscriber::registry()
            .with(env_filter)
            .with(stdout_layer)
            .init();
        return None;
    }

    let appender = RollingFileAppender::new(file.rotation.rotation(), &file.dir, &file.prefix);
    let (file_writer, guard) = tracing_appender::non_blocking(appender);
    let file_layer = fmt::layer()
        .with_writer(file_writer)
        .with_ansi(false)
        .with_target(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .with(file_layer)
        .init();

    tracing::info!(
        log_dir = %file.dir.display(),
        prefix = %file.prefix,
        rotation = ?file.rotation,
        "file logging enabled"
    );
    Some(FileLogGuard { _guard: guard })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config_from(pairs: &[(&str, &str)]) -> LoggingConfig {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        LoggingConfig::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn test_file_logging_off_by_default() {
        assert_eq!(config_from(&[]), LoggingConfig::default());
        assert!(config_from(&[("ENABLE_FILE_LOGS", "yes")]).file.is_none());
    }

    #[test]
    fn test_file_logging_defaults() {
        let config = config_from(&[("ENABLE_FILE_LOGS", "1"), ("RUST_LOG", "debug")]);
        assert_eq!(config.level, "debug");
        assert_eq!(
            config.file,
            Some(FileLogConfig {
                dir: PathBuf::from("./logs"),
                prefix: "learning-graph.log".to_string(),
                rotation: LogRotation::Daily,
            })
        );
    }

    #[test]
    fn test_file_logging_overrides() {
        let config = config_from(&[
            ("ENABLE_FILE_LOGS", "true"),
            ("LOG_DIR", "/var/log/graph"),
            ("LOG_FILE_PREFIX", "engine.log"),
            ("LOG_ROTATION", "Hourly"),
        ]);
        let file = config.file.unwrap();
        assert_eq!(file.dir, PathBuf::from("/var/log/graph"));
        assert_eq!(file.prefix, "engine.log");
        assert_eq!(file.rotation, LogRotation::Hourly);
    }

    #[test]
    fn test_rotation_parse_falls_back_to_daily() {
        assert_eq!(LogRotation::parse("never"), LogRotation::Never);
        assert_eq!(LogRotation::parse("weekly"), LogRotation::Daily);
    }
}
