use std::{fmt, str::FromStr};

use serde::{Deserialize, Deserializer};

use crate::{errors::Error, Result};

/// Telegram chat id (numeric).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ChatId(pub i64);

/// One inbound Telegram update, reduced to what the bot needs.
///
/// `chat_id` is `None` for non-message updates (edited messages, callback
/// queries, ...); those are never answered but still move the cursor.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Update {
    pub update_id: i64,
    pub chat_id: Option<ChatId>,
    pub text: Option<String>,
}

impl Update {
    /// Chat and text of an answerable update.
    pub fn reply_target(&self) -> Option<(ChatId, &str)> {
        match (self.chat_id, self.text.as_deref()) {
            (Some(chat), Some(text)) => Some((chat, text)),
            _ => None,
        }
    }
}

/// One package entry from a Packagist tag search.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Package {
    #[serde(deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(deserialize_with = "null_as_default")]
    pub description: String,
    #[serde(deserialize_with = "null_as_default")]
    pub url: String,
    #[serde(deserialize_with = "null_as_default")]
    pub repository: String,
    #[serde(deserialize_with = "null_as_default")]
    pub downloads: u64,
    #[serde(deserialize_with = "null_as_default")]
    pub favers: u64,
}

// Packagist sends `null` for some unset fields (e.g. description).
fn null_as_default<'de, D, T>(d: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(d)?.unwrap_or_default())
}

/// Telegram `parse_mode` for outgoing messages.
///
/// Replies are rendered with HTML markup, so HTML is the only mode the bot
/// can send without Telegram rejecting the entities.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParseMode {
    Html,
}

impl ParseMode {
    pub fn as_str(self) -> &'static str {
        match self {
            ParseMode::Html => "HTML",
        }
    }
}

impl fmt::Display for ParseMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ParseMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "html" => Ok(ParseMode::Html),
            other => Err(Error::Config(format!(
                "unsupported parse mode `{other}` (replies use HTML markup, expected HTML)"
            ))),
        }
    }
}
