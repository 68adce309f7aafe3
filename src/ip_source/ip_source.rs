use std::borrow::Cow;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::address::Family;
use crate::ResolveError;

use super::stun::IPSourceStun;
use super::website::IPSourceWebsite;

/// Something that can tell us the public address we are seen with.
///
/// Each call makes exactly one attempt. Timeouts and retries across sources are
/// up to the caller.
#[async_trait]
pub trait IPSource: Send + Sync {
    /// Endpoint identifier used in logs and errors.
    fn name(&self) -> &str;
    async fn get_ip(&self) -> Result<String, ResolveError>;
}

/// How a website writes the address in its reply.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ResponseFormat {
    /// The body is the address, maybe with whitespace around it.
    #[default]
    Text,
    /// The body is a JSON object, the address is in this top level field.
    Json(Cow<'static, str>),
}

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SourceKind {
    Website {
        url: Cow<'static, str>,
        #[serde(default)]
        format: ResponseFormat,
    },
    /// `host:port` of a STUN server.
    Stun { server: Cow<'static, str> },
}

/// An entry in one of the ordered source lists: where to ask, and which address
/// family the answer is expected to be in.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct SourceDescriptor {
    #[serde(flatten)]
    pub kind: SourceKind,
    #[serde(default)]
    pub family: Family,
}

impl SourceDescriptor {
    pub const fn website(url: &'static str, family: Family) -> Self {
        SourceDescriptor {
            kind: SourceKind::Website {
                url: Cow::Borrowed(url),
                format: ResponseFormat::Text,
            },
            family,
        }
    }

    pub const fn website_json(url: &'static str, field: &'static str, family: Family) -> Self {
        SourceDescriptor {
            kind: SourceKind::Website {
                url: Cow::Borrowed(url),
                format: ResponseFormat::Json(Cow::Borrowed(field)),
            },
            family,
        }
    }

    pub const fn stun(server: &'static str, family: Family) -> Self {
        SourceDescriptor {
            kind: SourceKind::Stun {
                server: Cow::Borrowed(server),
            },
            family,
        }
    }

    pub fn name(&self) -> &str {
        match &self.kind {
            SourceKind::Website { url, .. } => url,
            SourceKind::Stun { server } => server,
        }
    }

    /// Builds the source this entry describes. Websites share `client`, which
    /// already carries the timeout; STUN exchanges use `timeout` directly.
    pub(crate) fn build(&self, client: &Client, timeout: Duration) -> Box<dyn IPSource> {
        match &self.kind {
            SourceKind::Website { url, format } => Box::new(IPSourceWebsite {
                client: client.clone(),
                url: url.to_string(),
                format: format.clone(),
                family: self.family,
            }),
            SourceKind::Stun { server } => Box::new(IPSourceStun {
                server: server.to_string(),
                family: self.family,
                timeout,
            }),
        }
    }
}
