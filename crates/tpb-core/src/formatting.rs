//! Reply text for an incoming message (welcome, diagnostics, package list).

use std::{fmt::Write, sync::Arc};

use crate::{
    config::Config,
    domain::{Package, ParseMode},
    ports::PackageRegistry,
    registry::{self, SearchOutcome, TagError},
};

/// Packages rendered per reply.
pub const DISPLAY_LIMIT: usize = 10;

pub const MSG_TAG_EMPTY: &str = "Tag length must be equal or greater than 1";
pub const MSG_TAG_TOO_LONG: &str = "The tag is too long";
pub const MSG_NO_RESULTS: &str = "No packages for this tag";
pub const MSG_UPSTREAM: &str = "Packagist is unavailable right now, please try again later";

/// Escape HTML special characters for Telegram HTML parse mode.
pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

pub struct ResponseFormatter {
    registry: Arc<dyn PackageRegistry>,
    start_command: String,
    welcome_message: String,
    parse_mode: ParseMode,
}

impl ResponseFormatter {
    pub fn new(
        registry: Arc<dyn PackageRegistry>,
        start_command: impl Into<String>,
        welcome_message: impl Into<String>,
        parse_mode: ParseMode,
    ) -> Self {
        Self {
            registry,
            start_command: start_command.into(),
            welcome_message: welcome_message.into(),
            parse_mode,
        }
    }

    pub fn from_config(cfg: &Config, registry: Arc<dyn PackageRegistry>) -> Self {
        Self::new(
            registry,
            cfg.start_command.clone(),
            cfg.welcome_message.clone(),
            cfg.parse_mode,
        )
    }

    /// Mode the rendered replies are marked up for.
    pub fn parse_mode(&self) -> ParseMode {
        self.parse_mode
    }

    pub fn is_start_command(&self, text: &str) -> bool {
        text == self.start_command
    }

    /// Build the reply for `text`: the welcome message for the start command,
    /// otherwise the search result for `text` used as a tag.
    pub async fn format(&self, text: &str) -> String {
        if self.is_start_command(text) {
            return self.welcome_message.clone();
        }

        match registry::search(self.registry.as_ref(), text).await {
            SearchOutcome::Results(packages) => {
                let see_all = self.registry.web_url_for_tag(text);
                render_packages(&packages, &see_all)
            }
            SearchOutcome::NoResults => MSG_NO_RESULTS.to_string(),
            SearchOutcome::InvalidTag(TagError::Empty) => MSG_TAG_EMPTY.to_string(),
            SearchOutcome::InvalidTag(TagError::TooLong { .. }) => MSG_TAG_TOO_LONG.to_string(),
            SearchOutcome::UpstreamError(_) => MSG_UPSTREAM.to_string(),
        }
    }
}

/// Render up to `DISPLAY_LIMIT` packages followed by the "see all" line.
///
/// Registry text is escaped; only the labels carry markup.
pub fn render_packages(packages: &[Package], see_all_url: &str) -> String {
    let esc = escape_html;

    let mut out = String::new();
    for p in packages.iter().take(DISPLAY_LIMIT) {
        // Writing into a String cannot fail.
        let _ = write!(
            out,
            "<strong>Name:</strong> {}\n\
             <strong>Description:</strong> <em>{}</em>\n\
             <strong>Packagist:</strong> {}\n\
             <strong>Repository:</strong> {}\n\
             <strong>Downloads/Favers:</strong> {}/{}\n\n",
            esc(&p.name),
            esc(&p.description),
            esc(&p.url),
            esc(&p.repository),
            p.downloads,
            p.favers,
        );
    }

    if !packages.is_empty() {
        out.push_str("<strong>See all results:</strong> ");
        out.push_str(&esc(see_all_url));
    }
    out
}
