//! Telegram adapters.
//!
//! `TelegramMessenger` implements the `tpb-core` MessagingPort over teloxide.
//! `HttpUpdatePoller` reads the raw getUpdates envelope (see `poller`).

use async_trait::async_trait;

use teloxide::{prelude::*, types::ParseMode as TgParseMode};

pub mod poller;

pub use poller::HttpUpdatePoller;

use tpb_core::{
    config::Config,
    domain::{ChatId, ParseMode},
    errors::Error,
    ports::MessagingPort,
    Result,
};

#[derive(Clone)]
pub struct TelegramMessenger {
    bot: Bot,
}

impl TelegramMessenger {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }

    /// Bot bound to `cfg.api_host` with the configured request timeout.
    pub fn from_config(cfg: &Config) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(cfg.http_timeout)
            .build()
            .map_err(|e| Error::Config(format!("telegram http client: {e}")))?;
        let api_url = reqwest::Url::parse(&cfg.api_host)
            .map_err(|e| Error::Config(format!("TG_BOT_API_HOST is not a valid url: {e}")))?;

        let bot = Bot::with_client(cfg.bot_token.clone(), http).set_api_url(api_url);
        Ok(Self::new(bot))
    }

    fn tg_chat(chat_id: ChatId) -> teloxide::types::ChatId {
        teloxide::types::ChatId(chat_id.0)
    }

    fn tg_parse_mode(mode: ParseMode) -> TgParseMode {
        match mode {
            ParseMode::Html => TgParseMode::Html,
        }
    }

    /// The sendMessage request, built but not sent.
    fn send_message_request(
        &self,
        chat_id: ChatId,
        text: &str,
        parse_mode: ParseMode,
    ) -> <Bot as Requester>::SendMessage {
        self.bot
            .send_message(Self::tg_chat(chat_id), text.to_string())
            .parse_mode(Self::tg_parse_mode(parse_mode))
    }

    fn map_err(e: teloxide::RequestError) -> Error {
        Error::Upstream(format!("telegram error: {e}"))
    }
}

#[async_trait]
impl MessagingPort for TelegramMessenger {
    async fn send_text(&self, chat_id: ChatId, text: &str, parse_mode: ParseMode) -> Result<()> {
        self.send_message_request(chat_id, text, parse_mode)
            .await
            .map_err(Self::map_err)?;
        Ok(())
    }
}
