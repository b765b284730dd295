//! Fatal extraction errors.
//!
//! Selector misses, unparseable text, schema mismatches and cookie problems
//! are recovered where they happen and never reach this type.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExtractError {
    /// The session landed on a login page instead of the product
    #[error(
        "anti-automation redirect to login page ({url}); run headed and refresh the cookie store"
    )]
    AntiBotRedirect { url: String },

    /// No title appeared even after the recovery wait
    #[error(
        "no title found after recovery wait\n  url: {url}\n  page title: {page_title}\n  page size: {page_len} bytes\n  a login or verification page title points at cookies or network"
    )]
    ExtractionExhausted {
        url: String,
        page_title: String,
        page_len: usize,
    },

    #[error("navigation to {url} failed")]
    Navigation {
        url: String,
        #[source]
        source: anyhow::Error,
    },
}

impl ExtractError {
    /// True for the conditions that need an operator, not a retry
    pub fn needs_intervention(&self) -> bool {
        matches!(
            self,
            Self::AntiBotRedirect { .. } | Self::ExtractionExhausted { .. }
        )
    }
}
