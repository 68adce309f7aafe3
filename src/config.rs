use std::time::Duration;

use reqwest::header::HeaderValue;
use serde::Deserialize;
use thiserror::Error;

use crate::ip_source::defaults;
use crate::ip_source::ip_source::{SourceDescriptor, SourceKind};

/// Some services turn away clients that do not look like a browser.
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:90.0) Gecko/20100101 Firefox/90.0";

/// How long a single source gets to answer before we move on to the next one.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(2);

fn default_timeout() -> Duration {
    DEFAULT_TIMEOUT
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

fn default_ipv4_sources() -> Vec<SourceDescriptor> {
    defaults::IPV4_SOURCES.to_vec()
}

fn default_ipv6_sources() -> Vec<SourceDescriptor> {
    defaults::IPV6_SOURCES.to_vec()
}

fn default_any_sources() -> Vec<SourceDescriptor> {
    defaults::ANY_SOURCES.to_vec()
}

fn default_online_web_servers() -> Vec<String> {
    defaults::ONLINE_WEB_SERVERS
        .iter()
        .map(|url| url.to_string())
        .collect()
}

#[derive(Deserialize, Debug, Clone)]
pub struct Config {
    #[serde(default = "default_timeout")]
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_ipv4_sources")]
    pub ipv4_sources: Vec<SourceDescriptor>,
    #[serde(default = "default_ipv6_sources")]
    pub ipv6_sources: Vec<SourceDescriptor>,
    #[serde(default = "default_any_sources")]
    pub any_sources: Vec<SourceDescriptor>,
    #[serde(default = "default_online_web_servers")]
    pub online_web_servers: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            timeout: default_timeout(),
            user_agent: default_user_agent(),
            ipv4_sources: default_ipv4_sources(),
            ipv6_sources: default_ipv6_sources(),
            any_sources: default_any_sources(),
            online_web_servers: default_online_web_servers(),
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("The timeout can't be zero")]
    ZeroTimeout,
    #[error("The {0} list has no sources in it")]
    NoSources(&'static str),
    #[error("'{0}' is not an http or https URL")]
    BadUrl(String),
    #[error("STUN server '{0}' should be given as host:port")]
    BadStunServer(String),
    #[error("User agent {0:?} can't be sent as an HTTP header")]
    BadUserAgent(String),
}

impl Config {
    /// Parses a TOML document. Anything left out keeps its default.
    pub fn from_toml_str(contents: &str) -> Result<Config, ConfigError> {
        let config = toml::from_str(contents)?;
        Ok(config)
    }
}

fn is_web_url(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

fn validate_sources(name: &'static str, sources: &[SourceDescriptor]) -> Result<(), ConfigError> {
    if sources.is_empty() {
        return Err(ConfigError::NoSources(name));
    }
    for source in sources {
        match &source.kind {
            SourceKind::Website { url, .. } if !is_web_url(url) => {
                return Err(ConfigError::BadUrl(url.to_string()));
            }
            SourceKind::Stun { server } => {
                let has_port = server
                    .rsplit_once(':')
                    .map(|(host, port)| !host.is_empty() && port.parse::<u16>().is_ok())
                    .unwrap_or(false);
                if !has_port {
                    return Err(ConfigError::BadStunServer(server.to_string()));
                }
            }
            _ => {}
        }
    }
    Ok(())
}

pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.timeout.is_zero() {
        return Err(ConfigError::ZeroTimeout);
    }
    if HeaderValue::from_str(&config.user_agent).is_err() {
        return Err(ConfigError::BadUserAgent(config.user_agent.clone()));
    }
    validate_sources("IPv4", &config.ipv4_sources)?;
    validate_sources("IPv6", &config.ipv6_sources)?;
    validate_sources("IPv4/IPv6", &config.any_sources)?;
    if config.online_web_servers.is_empty() {
        return Err(ConfigError::NoSources("online check"));
    }
    if let Some(url) = config.online_web_servers.iter().find(|url| !is_web_url(url)) {
        return Err(ConfigError::BadUrl(url.clone()));
    }
    Ok(())
}
