//! URL handling module for Brewcrawl
//!
//! This module is the crawler's canonicalizer: it repairs malformed link
//! candidates, normalizes URLs for deduplication, and decides which URLs may
//! enter the frontier.

mod domain;
mod join;
mod normalize;
mod validate;

// Re-export main functions
pub use domain::{count_occurrences, extract_domain, extract_netloc, netloc_of};
pub use join::smart_join;
pub use normalize::{canonicalize, normalize_url};
pub use validate::is_valid_url;
