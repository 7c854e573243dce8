//! getUpdates over plain HTTP.
//!
//! teloxide turns `ok: false` into an error and drops `result`, but the
//! dispatch loop needs both fields, so the envelope is decoded here.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use tpb_core::{
    config::Config,
    domain::{ChatId, Update},
    errors::Error,
    ports::UpdateSource,
    updates::PollResponse,
    Result,
};

#[derive(Clone, Debug)]
pub struct HttpUpdatePoller {
    get_updates_url: String,
    http: reqwest::Client,
}

impl HttpUpdatePoller {
    pub fn new(get_updates_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Config(format!("telegram http client: {e}")))?;
        Ok(Self {
            get_updates_url: get_updates_url.into(),
            http,
        })
    }

    pub fn from_config(cfg: &Config) -> Result<Self> {
        Self::new(cfg.get_updates_url.clone(), cfg.http_timeout)
    }
}

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    ok: bool,
    #[serde(default)]
    result: Vec<RawUpdate>,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawUpdate {
    update_id: i64,
    #[serde(default)]
    message: Option<RawMessage>,
}

#[derive(Debug, Deserialize)]
struct RawMessage {
    chat: RawChat,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawChat {
    id: i64,
}

impl From<RawUpdate> for Update {
    fn from(raw: RawUpdate) -> Self {
        let (chat_id, text) = match raw.message {
            Some(m) => (Some(ChatId(m.chat.id)), m.text),
            None => (None, None),
        };
        Update {
            update_id: raw.update_id,
            chat_id,
            text,
        }
    }
}

/// Decode a getUpdates body, keeping `ok` and `result` side by side.
pub fn decode_envelope(body: &str) -> Result<PollResponse> {
    let env: Envelope = serde_json::from_str(body)?;
    Ok(PollResponse {
        ok: env.ok,
        updates: env.result.into_iter().map(Update::from).collect(),
        description: env.description,
    })
}

#[async_trait]
impl UpdateSource for HttpUpdatePoller {
    async fn fetch_updates(&self, offset: i64) -> Result<PollResponse> {
        let resp = self
            .http
            .get(&self.get_updates_url)
            .query(&[("offset", offset)])
            .send()
            .await
            .map_err(|e| Error::Upstream(format!("getUpdates request error: {e}")))?;

        // Telegram reports failures as a JSON envelope with a non-2xx status;
        // the envelope decides, the status only helps the error message.
        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| Error::Upstream(format!("getUpdates body error: {e}")))?;
        debug!(offset, %status, bytes = body.len(), "getUpdates response");

        decode_envelope(&body).map_err(|e| {
            Error::Upstream(format!(
                "getUpdates returned undecodable body ({status}): {e}: {}",
                body.chars().take(200).collect::<String>()
            ))
        })
    }
}
