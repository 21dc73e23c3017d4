use std::env;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_API_BASE: &str = "http://localhost:4000";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("APPLY_TIMEOUT_SECS must be a positive whole number of seconds, got '{0}'")]
    InvalidTimeout(String),

    #[error("APPLY_API_BASE must be an http(s) URL, got '{0}'")]
    InvalidApiBase(String),
}

/// Runtime settings, read from the environment.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub api_base: String,
    pub timeout: Duration,
    pub log_level: String,
    pub session_file: PathBuf,
    pub log_file: PathBuf,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let api_base = env::var("APPLY_API_BASE").unwrap_or_else(|_| DEFAULT_API_BASE.to_string());
        let api_base = parse_api_base(&api_base)?;

        let timeout = match env::var("APPLY_TIMEOUT_SECS") {
            Ok(value) => parse_timeout(&value)?,
            Err(_) => Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        };

        let log_level = env::var("APPLY_LOG").unwrap_or_else(|_| "info".to_string());

        let session_file = env::var("APPLY_SESSION_FILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| default_session_path());

        Ok(Self {
            api_base,
            timeout,
            log_level,
            session_file,
            log_file: default_log_path(),
        })
    }

    /// Applies command-line overrides on top of the environment.
    pub fn with_overrides(
        mut self,
        api_base: Option<&str>,
        timeout_secs: Option<u64>,
    ) -> Result<Self, ConfigError> {
        if let Some(base) = api_base {
            self.api_base = parse_api_base(base)?;
        }
        if let Some(secs) = timeout_secs {
            self.timeout = parse_timeout(&secs.to_string())?;
        }
        Ok(self)
    }
}

fn parse_api_base(value: &str) -> Result<String, ConfigError> {
    let trimmed = value.trim().trim_end_matches('/');
    if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
        return Err(ConfigError::InvalidApiBase(value.to_string()));
    }
    Ok(trimmed.to_string())
}

fn parse_timeout(value: &str) -> Result<Duration, ConfigError> {
    match value.trim().parse::<u64>() {
        Ok(secs) if secs > 0 => Ok(Duration::from_secs(secs)),
        _ => Err(ConfigError::InvalidTimeout(value.to_string())),
    }
}

fn project_dirs() -> Option<directories::ProjectDirs> {
    directories::ProjectDirs::from("", "", "apply")
}

fn default_session_path() -> PathBuf {
    // Use XDG config directory or fall back to the working directory
    match project_dirs() {
        Some(dirs) => dirs.config_dir().join("session.json"),
        None => PathBuf::from("session.json"),
    }
}

fn default_log_path() -> PathBuf {
    match project_dirs() {
        Some(dirs) => dirs.data_dir().join("apply.log"),
        None => PathBuf::from("apply.log"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Mutex, OnceLock};

    fn env_guard() -> &'static Mutex<()> {
        static GUARD: OnceLock<Mutex<()>> = OnceLock::new();
        GUARD.get_or_init(|| Mutex::new(()))
    }

    fn reset_env() {
        unsafe {
            env::remove_var("APPLY_API_BASE");
            env::remove_var("APPLY_TIMEOUT_SECS");
            env::remove_var("APPLY_LOG");
            env::remove_var("APPLY_SESSION_FILE");
        }
    }

    #[test]
    fn test_load_uses_defaults_when_env_missing() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();

        let config = AppConfig::load().expect("config loads with defaults");
        assert_eq!(config.api_base, DEFAULT_API_BASE);
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(config.log_level, "info");
        assert!(config.session_file.ends_with("session.json"));
    }

    #[test]
    fn test_load_reads_env() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        unsafe {
            env::set_var("APPLY_API_BASE", "https://jobs.example.com/");
            env::set_var("APPLY_TIMEOUT_SECS", "5");
            env::set_var("APPLY_SESSION_FILE", "/tmp/apply-session.json");
        }

        let config = AppConfig::load().expect("config loads");
        reset_env();

        assert_eq!(config.api_base, "https://jobs.example.com");
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(config.session_file, PathBuf::from("/tmp/apply-session.json"));
    }

    #[test]
    fn test_load_rejects_bad_values() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();

        unsafe { env::set_var("APPLY_TIMEOUT_SECS", "0") };
        assert_eq!(
            AppConfig::load().unwrap_err(),
            ConfigError::InvalidTimeout("0".to_string())
        );

        reset_env();
        unsafe { env::set_var("APPLY_API_BASE", "localhost:4000") };
        assert!(matches!(
            AppConfig::load().unwrap_err(),
            ConfigError::InvalidApiBase(_)
        ));
        reset_env();
    }

    #[test]
    fn test_overrides() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();

        let config = AppConfig::load()
            .unwrap()
            .with_overrides(Some("http://127.0.0.1:9000"), Some(10))
            .unwrap();
        assert_eq!(config.api_base, "http://127.0.0.1:9000");
        assert_eq!(config.timeout, Duration::from_secs(10));

        let err = AppConfig::load().unwrap().with_overrides(None, Some(0)).unwrap_err();
        assert_eq!(err, ConfigError::InvalidTimeout("0".to_string()));
    }
}
