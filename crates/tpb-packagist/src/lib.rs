//! Packagist adapter (tag search).
//!
//! Implements `PackageRegistry` over the public `search.json?tags=` endpoint.

use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use tpb_core::{
    config::Config, errors::Error, ports::PackageRegistry, registry::SearchResponse, Result,
};

#[derive(Clone, Debug)]
pub struct PackagistClient {
    api_tag_search: String,
    web_tag_search: String,
    http: reqwest::Client,
}

impl PackagistClient {
    pub fn new(
        api_tag_search: impl Into<String>,
        web_tag_search: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("tpb/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::Config(format!("packagist http client: {e}")))?;
        Ok(Self {
            api_tag_search: api_tag_search.into(),
            web_tag_search: web_tag_search.into(),
            http,
        })
    }

    pub fn from_config(cfg: &Config) -> Result<Self> {
        Self::new(
            cfg.packagist_api_tag_search.clone(),
            cfg.packagist_web_tag_search.clone(),
            cfg.http_timeout,
        )
    }

    fn search_url(&self, tag: &str) -> String {
        format!("{}{}", self.api_tag_search, encode_query_value(tag))
    }
}

#[async_trait]
impl PackageRegistry for PackagistClient {
    async fn search_tag(&self, tag: &str) -> Result<SearchResponse> {
        let url = self.search_url(tag);
        debug!(tag, "searching packagist");

        let resp = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| Error::Upstream(format!("packagist request error: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Upstream(format!(
                "packagist search failed: {status} {}",
                body.chars().take(200).collect::<String>()
            )));
        }

        let body = resp
            .text()
            .await
            .map_err(|e| Error::Upstream(format!("packagist body error: {e}")))?;

        serde_json::from_str(&body)
            .map_err(|e| Error::Upstream(format!("packagist json error: {e}")))
    }

    fn web_url_for_tag(&self, tag: &str) -> String {
        format!("{}{}", self.web_tag_search, encode_query_value(tag))
    }
}

fn encode_query_value(value: &str) -> String {
    url::form_urlencoded::byte_serialize(value.as_bytes()).collect()
}
