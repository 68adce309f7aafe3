//! Finds out the public IP address of this machine by asking redundant web
//! services and STUN servers, one after another, until one of them answers.
//!
//! ```no_run
//! # async fn demo() -> Result<(), whatismyip::ResolveError> {
//! let ipv4 = whatismyip::get_public_ipv4().await?;
//! println!("public IPv4 address: {}", ipv4);
//! println!("online: {}", whatismyip::is_online().await);
//! println!("local: {:?}", whatismyip::get_local_ips()?);
//! # Ok(())
//! # }
//! ```
//!
//! Nothing is cached, every call asks the network again.

use reqwest::{header, Client, ClientBuilder};
use tracing::{debug, warn};

mod address;
mod config;
mod error;
mod ip_source;
mod local;

pub use crate::address::{validate, Family};
pub use crate::config::{
    validate_config, Config, ConfigError, DEFAULT_TIMEOUT, DEFAULT_USER_AGENT,
};
pub use crate::error::ResolveError;
pub use crate::ip_source::defaults::{
    ANY_SOURCES, IPV4_SOURCES, IPV6_SOURCES, ONLINE_WEB_SERVERS,
};
pub use crate::ip_source::ip_source::{IPSource, ResponseFormat, SourceDescriptor, SourceKind};
pub use crate::local::{get_hostname, get_local_ips};

fn http_client(conf: &Config) -> Result<Client, ResolveError> {
    let client_builder = ClientBuilder::new();

    let mut headers = header::HeaderMap::new();
    let user_agent = header::HeaderValue::from_str(&conf.user_agent)?;
    headers.insert(header::USER_AGENT, user_agent);
    let accept_value = header::HeaderValue::from_static("text/plain, application/json");
    headers.insert(header::ACCEPT, accept_value);
    let client = client_builder
        .default_headers(headers)
        .timeout(conf.timeout)
        .build()?;
    Ok(client)
}

/// Asks each source in turn and returns the first address one of them gives.
///
/// Every source gets exactly one attempt. If none of them answers, the
/// failures are returned in the order the sources were tried.
pub async fn first_answer(
    family: Family,
    sources: &[Box<dyn IPSource>],
) -> Result<String, ResolveError> {
    let mut errors = Vec::new();
    for source in sources {
        debug!("Asking {} for the {} address", source.name(), family);
        match source.get_ip().await {
            Ok(ip) => {
                debug!("{} says the {} address is {}", source.name(), family, ip);
                return Ok(ip);
            }
            Err(error) => {
                debug!("Skipping source: {}", error);
                errors.push(error);
            }
        }
    }
    warn!("Could not get the {} address from any source", family);
    Err(ResolveError::AllSourcesFailed { family, errors })
}

/// Asks every source, one after another, and pairs each source name with what
/// it answered. Unlike [`first_answer`] this does not stop at the first success.
pub async fn every_answer(
    family: Family,
    sources: &[Box<dyn IPSource>],
) -> Vec<(String, Result<String, ResolveError>)> {
    let mut answers = Vec::with_capacity(sources.len());
    for source in sources {
        debug!("Asking {} for the {} address", source.name(), family);
        let answer = source.get_ip().await;
        if let Err(error) = &answer {
            debug!("No answer: {}", error);
        }
        answers.push((source.name().to_string(), answer));
    }
    answers
}

/// Resolves addresses using the sources and timeout of a [`Config`].
#[derive(Debug, Clone)]
pub struct Resolver {
    client: Client,
    conf: Config,
}

impl Resolver {
    /// A resolver with the built-in source lists.
    pub fn new() -> Result<Resolver, ResolveError> {
        Resolver::with_config(Config::default())
    }

    pub fn with_config(conf: Config) -> Result<Resolver, ResolveError> {
        validate_config(&conf)?;
        let client = http_client(&conf)?;
        Ok(Resolver { client, conf })
    }

    pub fn config(&self) -> &Config {
        &self.conf
    }

    fn sources(&self, family: Family) -> Vec<Box<dyn IPSource>> {
        let descriptors = match family {
            Family::Any => &self.conf.any_sources,
            Family::V4 => &self.conf.ipv4_sources,
            Family::V6 => &self.conf.ipv6_sources,
        };
        descriptors
            .iter()
            .map(|descriptor| descriptor.build(&self.client, self.conf.timeout))
            .collect()
    }

    async fn resolve(&self, family: Family) -> Result<String, ResolveError> {
        first_answer(family, &self.sources(family)).await
    }

    /// What every source of the family says, in list order. Failed sources are
    /// included with their error.
    pub async fn all_answers(&self, family: Family) -> Vec<(String, Result<String, ResolveError>)> {
        every_answer(family, &self.sources(family)).await
    }

    /// Public address in whichever family the sources reply with.
    pub async fn public_ip(&self) -> Result<String, ResolveError> {
        self.resolve(Family::Any).await
    }

    pub async fn public_ipv4(&self) -> Result<String, ResolveError> {
        self.resolve(Family::V4).await
    }

    pub async fn public_ipv6(&self) -> Result<String, ResolveError> {
        self.resolve(Family::V6).await
    }

    /// True if any of the connectivity check sites answers with a success
    /// status. Failures only ever show up as `false`.
    pub async fn is_online(&self) -> bool {
        for url in &self.conf.online_web_servers {
            match self
                .client
                .get(url)
                .send()
                .await
                .and_then(|response| response.error_for_status())
            {
                Ok(response) => {
                    debug!("{} answered with {}", url, response.status());
                    return true;
                }
                Err(error) => debug!("{} did not answer: {}", url, error),
            }
        }
        false
    }
}

/// Public address of this machine, IPv4 or IPv6.
pub async fn get_public_ip() -> Result<String, ResolveError> {
    Resolver::new()?.public_ip().await
}

/// Public IPv4 address of this machine.
pub async fn get_public_ipv4() -> Result<String, ResolveError> {
    Resolver::new()?.public_ipv4().await
}

/// Public IPv6 address of this machine.
pub async fn get_public_ipv6() -> Result<String, ResolveError> {
    Resolver::new()?.public_ipv6().await
}

/// What each built-in source of `family` reports as this machine's address.
pub async fn get_all_public_ips(
    family: Family,
) -> Result<Vec<(String, Result<String, ResolveError>)>, ResolveError> {
    Ok(Resolver::new()?.all_answers(family).await)
}

/// Whether this machine can reach any of the connectivity check sites.
/// Never fails; anything going wrong counts as offline.
pub async fn is_online() -> bool {
    match Resolver::new() {
        Ok(resolver) => resolver.is_online().await,
        Err(error) => {
            warn!("Could not set up the online check: {}", error);
            false
        }
    }
}
