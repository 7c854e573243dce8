//! Tag search against the package registry.

use serde::Deserialize;
use tracing::warn;

use crate::{domain::Package, ports::PackageRegistry};

/// Longest accepted tag, in Unicode scalar values.
pub const MAX_TAG_CHARS: usize = 64;

/// Raw tag-search response body.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub total: Option<u64>,
    #[serde(default)]
    pub results: Vec<Package>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TagError {
    Empty,
    TooLong { chars: usize },
}

/// Result of one tag search.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SearchOutcome {
    /// Never empty; registry order.
    Results(Vec<Package>),
    NoResults,
    InvalidTag(TagError),
    UpstreamError(String),
}

impl From<SearchResponse> for SearchOutcome {
    fn from(resp: SearchResponse) -> Self {
        match resp.total {
            Some(total) if total > 0 && !resp.results.is_empty() => {
                SearchOutcome::Results(resp.results)
            }
            _ => SearchOutcome::NoResults,
        }
    }
}

pub fn validate_tag(tag: &str) -> Result<(), TagError> {
    let chars = tag.chars().count();
    if chars < 1 {
        return Err(TagError::Empty);
    }
    if chars > MAX_TAG_CHARS {
        return Err(TagError::TooLong { chars });
    }
    Ok(())
}

/// Validate `tag` and query the registry. Upstream failures are folded into
/// the outcome so the caller can still answer the chat.
pub async fn search(registry: &dyn PackageRegistry, tag: &str) -> SearchOutcome {
    if let Err(e) = validate_tag(tag) {
        return SearchOutcome::InvalidTag(e);
    }

    match registry.search_tag(tag).await {
        Ok(resp) => resp.into(),
        Err(e) => {
            warn!(tag, error = %e, "registry search failed");
            SearchOutcome::UpstreamError(e.to_string())
        }
    }
}
