use async_trait::async_trait;

use crate::{
    domain::{ChatId, ParseMode},
    registry::SearchResponse,
    updates::PollResponse,
    Result,
};

/// Source of inbound updates (Telegram `getUpdates`).
///
/// Implementations return the raw envelope; deciding whether it is fatal is
/// the dispatch loop's job.
#[async_trait]
pub trait UpdateSource: Send + Sync {
    async fn fetch_updates(&self, offset: i64) -> Result<PollResponse>;
}

/// Outbound messaging (Telegram `sendMessage`).
#[async_trait]
pub trait MessagingPort: Send + Sync {
    async fn send_text(&self, chat_id: ChatId, text: &str, parse_mode: ParseMode) -> Result<()>;
}

/// Package registry queried by tag (Packagist).
#[async_trait]
pub trait PackageRegistry: Send + Sync {
    /// One GET against the tag-search endpoint. No retries.
    async fn search_tag(&self, tag: &str) -> Result<SearchResponse>;

    /// Human-facing browse URL for `tag`. Never touches the network.
    fn web_url_for_tag(&self, tag: &str) -> String;
}
