use anyhow::{Context, Result};
use std::{env, str::FromStr, time::Duration};

const DEFAULT_DEVICE_URL: &str = "http://192.168.4.1";
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 10;
const DEFAULT_REBOOT_COUNTDOWN_SECS: u32 = 10;
const DEFAULT_STATUS_POLL_SECS: u64 = 5;

/// Shell configuration loaded and validated at startup
#[derive(Clone, Debug)]
pub struct ConsoleConfig {
    /// Address of the controller's web server
    pub device_url: String,

    /// Timeout of a single request (uploads are not limited)
    pub http_timeout: Duration,

    /// Length of the countdown shown after a successful upload
    pub reboot_countdown_secs: u32,

    /// Interval between two polls in watch mode
    pub status_poll: Duration,
}

/// Values given on the command line; they take precedence over the environment
#[derive(Clone, Debug, Default)]
pub struct Overrides {
    pub device_url: Option<String>,
    pub http_timeout_secs: Option<u64>,
    pub reboot_countdown_secs: Option<u32>,
    pub status_poll_secs: Option<u64>,
}

impl ConsoleConfig {
    /// Load the configuration from environment variables and command line overrides
    pub fn load(overrides: &Overrides) -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok(), overrides)
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>, overrides: &Overrides) -> Result<Self> {
        let device_url = overrides
            .device_url
            .clone()
            .or_else(|| lookup("DEVICE_URL"))
            .unwrap_or_else(|| DEFAULT_DEVICE_URL.to_string())
            .trim()
            .trim_end_matches('/')
            .to_string();

        anyhow::ensure!(
            device_url.starts_with("http://") || device_url.starts_with("https://"),
            "failed to parse DEVICE_URL: expected an http(s) address, got {device_url}"
        );

        let http_timeout_secs = match overrides.http_timeout_secs {
            Some(secs) => secs,
            None => parse_var(&lookup, "HTTP_TIMEOUT_SECS", DEFAULT_HTTP_TIMEOUT_SECS)?,
        };
        anyhow::ensure!(http_timeout_secs > 0, "HTTP_TIMEOUT_SECS must be positive");

        let reboot_countdown_secs = match overrides.reboot_countdown_secs {
            Some(secs) => secs,
            None => parse_var(&lookup, "REBOOT_COUNTDOWN_SECS", DEFAULT_REBOOT_COUNTDOWN_SECS)?,
        };
        anyhow::ensure!(reboot_countdown_secs > 0, "REBOOT_COUNTDOWN_SECS must be positive");

        let status_poll_secs = match overrides.status_poll_secs {
            Some(secs) => secs,
            None => parse_var(&lookup, "STATUS_POLL_SECS", DEFAULT_STATUS_POLL_SECS)?,
        };
        anyhow::ensure!(status_poll_secs > 0, "STATUS_POLL_SECS must be positive");

        Ok(Self {
            device_url,
            http_timeout: Duration::from_secs(http_timeout_secs),
            reboot_countdown_secs,
            status_poll: Duration::from_secs(status_poll_secs),
        })
    }
}

fn parse_var<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(value) => value
            .trim()
            .parse()
            .with_context(|| format!("failed to parse {key}: invalid format")),
        None => Ok(default),
    }
}
