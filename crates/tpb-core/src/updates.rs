//! getUpdates envelope handling.

use tracing::debug;

use crate::{domain::Update, errors::Error, ports::UpdateSource, Result};

/// Decoded getUpdates response before the fatal check.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PollResponse {
    pub ok: bool,
    pub updates: Vec<Update>,
    /// Telegram's `description`, present on error responses.
    pub description: Option<String>,
}

impl PollResponse {
    /// Apply the fatal rule: only `ok == false` together with an empty result
    /// aborts the batch. Every other combination hands the updates on.
    pub fn into_updates(self) -> Result<Vec<Update>> {
        if !self.ok && self.updates.is_empty() {
            let reason = self
                .description
                .unwrap_or_else(|| "getUpdates returned ok=false with no result".to_string());
            return Err(Error::FatalPoll(reason));
        }
        Ok(self.updates)
    }
}

/// Fetch the updates after `offset`, in the order Telegram sent them.
pub async fn poll(source: &dyn UpdateSource, offset: i64) -> Result<Vec<Update>> {
    let resp = source.fetch_updates(offset).await?;
    debug!(offset, ok = resp.ok, count = resp.updates.len(), "polled updates");
    resp.into_updates()
}
