//! Console configuration.
//!
//! Resolution order is defaults, then environment variables, then command-line flags; each
//! layer only overrides the values it actually sets.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use reqwest::Url;

use crate::error::{AppError, AppResult};

pub const ENV_API_URL: &str = "TEAMGATE_API_URL";
pub const ENV_SESSION_FILE: &str = "TEAMGATE_SESSION_FILE";
pub const ENV_HOME: &str = "TEAMGATE_HOME";
pub const ENV_LOG: &str = "TEAMGATE_LOG";
pub const ENV_TIMEOUT_SECS: &str = "TEAMGATE_TIMEOUT_SECS";

const DEFAULT_API_URL: &str = "http://localhost:5000";
const DEFAULT_LOG_FILTER: &str = "warn";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, PartialEq)]
pub struct ConsoleConfig {
    /// Base URL of the remote authority; API paths are joined onto it.
    pub api_url: Url,
    /// Where the session snapshot is persisted between console runs.
    pub session_file: PathBuf,
    pub log_filter: String,
    pub timeout: Duration,
}

impl ConsoleConfig {
    pub fn defaults() -> AppResult<Self> {
        Ok(Self {
            api_url: parse_url(DEFAULT_API_URL)?,
            session_file: default_session_file(),
            log_filter: DEFAULT_LOG_FILTER.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        })
    }

    /// Defaults overridden by whatever `TEAMGATE_*` variables are set.
    pub fn from_env() -> AppResult<Self> {
        let mut cfg = Self::defaults()?;
        cfg.apply_lookup(|k| env::var(k).ok())?;
        Ok(cfg)
    }

    fn apply_lookup<F: Fn(&str) -> Option<String>>(&mut self, lookup: F) -> AppResult<()> {
        if let Some(url) = lookup(ENV_API_URL).filter(|s| !s.trim().is_empty()) {
            self.api_url = parse_url(&url)?;
        }
        if let Some(path) = lookup(ENV_SESSION_FILE).filter(|s| !s.trim().is_empty()) {
            self.session_file = PathBuf::from(path);
        } else if let Some(home) = lookup(ENV_HOME).filter(|s| !s.trim().is_empty()) {
            self.session_file = PathBuf::from(home).join("session.json");
        }
        if let Some(filter) = lookup(ENV_LOG).filter(|s| !s.trim().is_empty()) {
            self.log_filter = filter;
        }
        if let Some(secs) = lookup(ENV_TIMEOUT_SECS) {
            self.timeout = parse_timeout(&secs)?;
        }
        Ok(())
    }

    /// Apply `--api`, `--session-file`, `--log` and `--timeout` flags, returning the arguments
    /// that were not consumed (in their original order).
    pub fn apply_args(&mut self, args: &[String]) -> AppResult<Vec<String>> {
        let mut rest = Vec::new();
        let mut i = 0;
        while i < args.len() {
            let flag = args[i].as_str();
            match flag {
                "--api" | "--session-file" | "--log" | "--timeout" => {
                    let Some(value) = args.get(i + 1) else {
                        return Err(AppError::config("missing_value", format!("{} requires a value", flag)));
                    };
                    match flag {
                        "--api" => self.api_url = parse_url(value)?,
                        "--session-file" => self.session_file = PathBuf::from(value),
                        "--log" => self.log_filter = value.clone(),
                        _ => self.timeout = parse_timeout(value)?,
                    }
                    i += 2;
                }
                _ => {
                    rest.push(args[i].clone());
                    i += 1;
                }
            }
        }
        Ok(rest)
    }
}

fn parse_url(raw: &str) -> AppResult<Url> {
    let url = Url::parse(raw.trim())
        .map_err(|e| AppError::config("invalid_url", format!("invalid API URL '{}': {}", raw, e)))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(AppError::config("invalid_url", format!("unsupported URL scheme '{}'", other))),
    }
}

fn parse_timeout(raw: &str) -> AppResult<Duration> {
    match raw.trim().parse::<u64>() {
        Ok(secs) if secs > 0 => Ok(Duration::from_secs(secs)),
        _ => Err(AppError::config("invalid_timeout", format!("timeout must be a positive number of seconds, got '{}'", raw))),
    }
}

fn default_session_file() -> PathBuf {
    let home = env::var("HOME").or_else(|_| env::var("USERPROFILE")).ok();
    match home {
        Some(h) => PathBuf::from(h).join(".teamgate").join("session.json"),
        None => PathBuf::from(".teamgate").join("session.json"),
    }
}
