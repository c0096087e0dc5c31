use crate::domain::ports::{HoldingList, HoldingsApi};
use crate::utils::error::{EtlError, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderValue, ACCEPT};
use reqwest::{Client, Response};
use serde::Deserialize;
use std::time::Duration;
use url::Url;

pub const DEFAULT_BASE_URL: &str = "https://api-na.hosted.exlibrisgroup.com/almaws/v1";

/// Alma Bibs API client. One instance (and one connection pool) is shared by
/// every in-flight request.
#[derive(Debug, Clone)]
pub struct AlmaClient {
    client: Client,
    base_url: Url,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct AlmaErrorBody {
    #[serde(rename = "errorList")]
    error_list: Option<AlmaErrorList>,
}

#[derive(Debug, Deserialize)]
struct AlmaErrorList {
    #[serde(default)]
    error: Vec<AlmaErrorEntry>,
}

#[derive(Debug, Deserialize)]
struct AlmaErrorEntry {
    #[serde(rename = "errorCode")]
    error_code: Option<String>,
    #[serde(rename = "errorMessage")]
    error_message: Option<String>,
}

impl AlmaClient {
    pub fn new(base_url: &str, api_key: impl Into<String>, timeout: Duration) -> Result<Self> {
        let base_url = Url::parse(base_url.trim_end_matches('/')).map_err(|e| EtlError::InvalidConfigValueError {
            field: "api.base_url".to_string(),
            value: base_url.to_string(),
            reason: e.to_string(),
        })?;
        if base_url.cannot_be_a_base() {
            return Err(EtlError::config(format!("{} cannot be used as a base URL", base_url)));
        }

        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("holdings-etl/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            base_url,
            api_key: api_key.into(),
        })
    }

    /// `{base}/bibs/{segments...}?apikey=...`, each segment percent-encoded.
    fn bibs_url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| EtlError::config("API base URL cannot have path segments"))?
            .pop_if_empty()
            .push("bibs")
            .extend(segments);
        url.query_pairs_mut().append_pair("apikey", &self.api_key);
        Ok(url)
    }

    async fn get(&self, url: Url, accept: &'static str) -> Result<Response> {
        // 不要把 apikey 寫進日誌
        tracing::debug!("GET {}{}", url.origin().ascii_serialization(), url.path());
        let response = self
            .client
            .get(url)
            .header(ACCEPT, HeaderValue::from_static(accept))
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(EtlError::ApiStatus {
            status: status.as_u16(),
            message: describe_error_body(&body),
        })
    }
}

/// Pull the human-readable message out of an Alma error payload, falling
/// back to the raw body.
fn describe_error_body(body: &str) -> String {
    let messages: Vec<String> = serde_json::from_str::<AlmaErrorBody>(body)
        .ok()
        .and_then(|b| b.error_list)
        .map(|list| {
            list.error
                .into_iter()
                .filter_map(|e| match (e.error_code, e.error_message) {
                    (Some(code), Some(message)) => Some(format!("{} ({})", message.trim(), code)),
                    (None, Some(message)) => Some(message.trim().to_string()),
                    (Some(code), None) => Some(code),
                    (None, None) => None,
                })
                .collect()
        })
        .unwrap_or_default();

    if !messages.is_empty() {
        return messages.join("; ");
    }
    let body = body.trim();
    if body.is_empty() {
        "empty response body".to_string()
    } else {
        body.chars().take(200).collect()
    }
}

#[async_trait]
impl HoldingsApi for AlmaClient {
    async fn list_holdings(&self, mms_id: &str) -> Result<HoldingList> {
        let url = self.bibs_url(&[mms_id, "holdings"])?;
        let response = self.get(url, "application/json").await?;
        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }

    async fn get_holding(&self, mms_id: &str, holding_id: &str) -> Result<String> {
        let url = self.bibs_url(&[mms_id, "holdings", holding_id])?;
        let response = self.get(url, "application/xml").await?;
        Ok(response.text().await?)
    }
}
