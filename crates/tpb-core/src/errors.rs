/// Core error type for the bot.
///
/// Adapter crates map their library errors into this type so the dispatch
/// loop can tell a fatal poll apart from an ordinary upstream failure.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// Network, status or decoding failure talking to Telegram or Packagist.
    #[error("upstream error: {0}")]
    Upstream(String),

    /// getUpdates reported `ok: false` with an empty `result`.
    #[error("fatal poll failure: {0}")]
    FatalPoll(String),
}

pub type Result<T> = std::result::Result<T, Error>;
