/// Page state definitions for tracking crawl progress
///
/// Every URL admitted to the frontier moves through
/// `Queued → Fetching → {Extracted, Failed, Skipped}`.
use crate::CrawlError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Represents the current state of a URL in the crawl process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageState {
    // ===== Active States =====
    /// URL is in the frontier waiting for a batch slot
    Queued,

    /// URL is part of the batch currently in flight
    Fetching,

    // ===== Terminal States =====
    /// Page was fetched, and its links and structured data extracted
    Extracted,

    /// Fetch failed (network error, timeout, non-2xx, empty body)
    Failed,

    /// Response was not HTML; neither a success nor a failure
    Skipped,
}

impl PageState {
    /// Returns true if this is a terminal state (no further processing needed)
    pub fn is_terminal(&self) -> bool {
        !self.is_active()
    }

    /// Returns true if the URL may still be processed
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Queued | Self::Fetching)
    }

    /// Returns true if this represents a successful completion
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Extracted)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Fetching => "fetching",
            Self::Extracted => "extracted",
            Self::Failed => "failed",
            Self::Skipped => "skipped",
        }
    }

    /// Returns whether moving from `self` to `next` is allowed
    pub fn can_transition_to(&self, next: PageState) -> bool {
        matches!(
            (self, next),
            (Self::Queued, Self::Fetching)
                | (Self::Fetching, Self::Extracted)
                | (Self::Fetching, Self::Failed)
                | (Self::Fetching, Self::Skipped)
        )
    }

    /// Validates and performs a transition
    pub fn transition(self, next: PageState) -> Result<PageState, CrawlError> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(CrawlError::InvalidTransition {
                from: self,
                to: next,
            })
        }
    }
}

impl fmt::Display for PageState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
