//! State module for tracking crawl progress
//!
//! `PageState` is the per-URL state machine the frontier drives. Transitions
//! are validated, so a URL can never be fetched twice or leave a terminal state.

mod page_state;

pub use page_state::PageState;
