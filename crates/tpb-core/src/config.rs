use std::{env, fmt, fs, path::Path, path::PathBuf, time::Duration};

use crate::{domain::ParseMode, errors::Error, Result};

pub const DEFAULT_API_HOST: &str = "https://api.telegram.org";
pub const DEFAULT_PACKAGIST_API_TAG_SEARCH: &str = "https://packagist.org/search.json?tags=";
pub const DEFAULT_PACKAGIST_WEB_TAG_SEARCH: &str = "https://packagist.org/?tags=";

const DEFAULT_WELCOME_MESSAGE: &str =
    "Hi! Send me a tag and I will find the most popular Packagist packages for it.";

/// Typed configuration for the bot.
///
/// Every key lives under the `TG_BOT_` prefix; see `Config::load`.
#[derive(Clone)]
pub struct Config {
    pub bot_name: String,
    pub bot_token: String,

    // Telegram endpoints
    pub api_host: String,
    pub get_updates_url: String,
    pub parse_mode: ParseMode,

    // Replies
    pub start_command: String,
    pub welcome_message: String,

    // Packagist
    pub packagist_api_tag_search: String,
    pub packagist_web_tag_search: String,

    // Runtime
    pub offset_file: PathBuf,
    pub http_timeout: Duration,
}

impl Config {
    /// Load from the process environment, after merging `.env` if present.
    pub fn load() -> Result<Self> {
        load_dotenv_if_present(Path::new(".env"));
        Self::from_lookup(env_str)
    }

    /// Build the config from an arbitrary key lookup (env, map in tests).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).and_then(non_empty);

        let bot_token = get("TG_BOT_TOKEN").ok_or_else(|| {
            Error::Config("TG_BOT_TOKEN environment variable is required".to_string())
        })?;
        let bot_name = get("TG_BOT_NAME").unwrap_or_else(|| "ThePackagistBot".to_string());

        let api_host = get("TG_BOT_API_HOST")
            .unwrap_or_else(|| DEFAULT_API_HOST.to_string())
            .trim_end_matches('/')
            .to_string();
        let get_updates_url = get("TG_BOT_GET_UPDATES_COMMAND_URL")
            .unwrap_or_else(|| format!("{api_host}/bot{bot_token}/getUpdates"));
        let parse_mode = match get("TG_BOT_PARSE_MODE") {
            Some(raw) => raw.parse()?,
            None => ParseMode::Html,
        };

        let start_command = get("TG_BOT_START_COMMAND").unwrap_or_else(|| "/start".to_string());
        let welcome_message =
            get("TG_BOT_WELCOME_MESSAGE").unwrap_or_else(|| DEFAULT_WELCOME_MESSAGE.to_string());

        let packagist_api_tag_search = get("TG_BOT_PACKAGIST_API_TAG_SEARCH")
            .unwrap_or_else(|| DEFAULT_PACKAGIST_API_TAG_SEARCH.to_string());
        let packagist_web_tag_search = get("TG_BOT_PACKAGIST_WEB_TAG_SEARCH")
            .unwrap_or_else(|| DEFAULT_PACKAGIST_WEB_TAG_SEARCH.to_string());

        let offset_file = PathBuf::from(get("TG_BOT_OFFSET_FILE").unwrap_or("data/offset".to_string()));
        let http_timeout_ms = match get("TG_BOT_HTTP_TIMEOUT_MS") {
            Some(raw) => raw.trim().parse::<u64>().map_err(|_| {
                Error::Config(format!("TG_BOT_HTTP_TIMEOUT_MS must be an integer, got `{raw}`"))
            })?,
            None => 5_000,
        };

        Ok(Self {
            bot_name,
            bot_token,
            api_host,
            get_updates_url,
            parse_mode,
            start_command,
            welcome_message,
            packagist_api_tag_search,
            packagist_web_tag_search,
            offset_file,
            http_timeout: Duration::from_millis(http_timeout_ms),
        })
    }
}

// The token is a credential; keep it out of logs.
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("bot_name", &self.bot_name)
            .field("bot_token", &mask_token(&self.bot_token))
            .field("api_host", &self.api_host)
            .field("get_updates_url", &self.get_updates_url.replace(&self.bot_token, "***"))
            .field("parse_mode", &self.parse_mode)
            .field("start_command", &self.start_command)
            .field("welcome_message", &self.welcome_message)
            .field("packagist_api_tag_search", &self.packagist_api_tag_search)
            .field("packagist_web_tag_search", &self.packagist_web_tag_search)
            .field("offset_file", &self.offset_file)
            .field("http_timeout", &self.http_timeout)
            .finish()
    }
}

fn mask_token(token: &str) -> String {
    let prefix: String = token.chars().take(4).collect();
    format!("{prefix}***")
}

fn env_str(key: &str) -> Option<String> {
    env::var(key).ok()
}

fn load_dotenv_if_present(path: &Path) {
    let Ok(contents) = fs::read_to_string(path) else {
        return;
    };

    for (key, val) in parse_dotenv(&contents) {
        if env::var_os(&key).is_some() {
            continue; // do not override existing env
        }
        env::set_var(key, val);
    }
}

fn parse_dotenv(contents: &str) -> Vec<(String, String)> {
    let mut out = Vec::new();
    for raw in contents.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some((k, v)) = line.split_once('=') else {
            continue;
        };

        let key = k.trim();
        if key.is_empty() {
            continue;
        }

        let mut val = v.trim().to_string();
        // Strip optional surrounding quotes.
        if val.len() >= 2
            && ((val.starts_with('"') && val.ends_with('"'))
                || (val.starts_with('\'') && val.ends_with('\'')))
        {
            val = val[1..val.len() - 1].to_string();
        }

        out.push((key.to_string(), val));
    }
    out
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}
