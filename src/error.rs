use std::fmt;

use reqwest::header::InvalidHeaderValue;
use thiserror::Error;

use crate::address::Family;
use crate::config::ConfigError;

#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("Could not reach {source_name}: {reason}")]
    SourceUnreachable { source_name: String, reason: String },
    #[error("{source_name} replied, but no address could be read from the reply: {reason}")]
    MalformedResponse { source_name: String, reason: String },
    #[error("None of the {family} sources could be reached ({})", SourceErrors(.errors))]
    AllSourcesFailed {
        family: Family,
        errors: Vec<ResolveError>,
    },
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("Error while converting the user agent to a header: {0}")]
    InvalidHeader(#[from] InvalidHeaderValue),
    #[error("Error while building the HTTP client: {0}")]
    Client(#[from] reqwest::Error),
    #[error("Error while listing the local network interfaces: {0}")]
    LocalInterfaces(#[from] local_ip_address::Error),
    #[error("Error while reading the hostname: {0}")]
    Hostname(#[source] std::io::Error),
}

impl ResolveError {
    pub(crate) fn unreachable(source_name: &str, reason: impl ToString) -> Self {
        ResolveError::SourceUnreachable {
            source_name: source_name.to_string(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn malformed(source_name: &str, reason: impl ToString) -> Self {
        ResolveError::MalformedResponse {
            source_name: source_name.to_string(),
            reason: reason.to_string(),
        }
    }
}

struct SourceErrors<'t>(&'t [ResolveError]);

impl<'t> fmt::Display for SourceErrors<'t> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return write!(f, "no sources configured");
        }
        for (i, error) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, "; ")?;
            }
            write!(f, "{}", error)?;
        }
        Ok(())
    }
}
