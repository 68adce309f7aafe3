use async_trait::async_trait;
use reqwest::Client;

use crate::address::{validate, Family};
use crate::ResolveError;

use super::ip_source::{IPSource, ResponseFormat};

/// A web service that replies to a GET with our address.
pub(crate) struct IPSourceWebsite {
    pub(crate) client: Client,
    pub(crate) url: String,
    pub(crate) format: ResponseFormat,
    pub(crate) family: Family,
}

async fn get_text(client: &Client, api_url: &str) -> Result<String, ResolveError> {
    let response = client
        .get(api_url)
        .send()
        .await
        .and_then(|response| response.error_for_status())
        .map_err(|error| ResolveError::unreachable(api_url, error))?;
    response
        .text()
        .await
        .map_err(|error| ResolveError::unreachable(api_url, error))
}

fn extract(text: &str, format: &ResponseFormat) -> Result<String, String> {
    match format {
        ResponseFormat::Text => Ok(text.to_string()),
        ResponseFormat::Json(field) => {
            let parsed = json::parse(text).map_err(|error| error.to_string())?;
            parsed[&**field]
                .as_str()
                .map(|value| value.to_string())
                .ok_or_else(|| format!("no string field '{}' in the reply", field))
        }
    }
}

#[async_trait]
impl IPSource for IPSourceWebsite {
    fn name(&self) -> &str {
        &self.url
    }

    async fn get_ip(&self) -> Result<String, ResolveError> {
        let text = get_text(&self.client, &self.url).await?;
        extract(&text, &self.format)
            .and_then(|address| validate(&address, self.family))
            .map_err(|reason| ResolveError::malformed(&self.url, reason))
    }
}
