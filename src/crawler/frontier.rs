//! Breadth-first crawl frontier
//!
//! This module handles:
//! - The FIFO queue of discovered URLs waiting for a batch slot
//! - Visited, failed and skipped bookkeeping
//! - The global page cap
//! - Per-URL state transitions (`Queued → Fetching → terminal`)
//!
//! The frontier is owned by the coordinating task and mutated only between
//! batches, so it needs no locking.

use crate::crawler::RedirectCache;
use crate::state::PageState;
use crate::url::canonicalize;
use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};

/// Frontier manages the crawl queue and the per-URL bookkeeping
#[derive(Debug)]
pub struct Frontier {
    /// URLs waiting to be dispatched, oldest first
    queue: VecDeque<String>,

    /// Membership index for `queue`
    queued: HashSet<String>,

    /// State of every URL that has entered the frontier
    states: HashMap<String, PageState>,

    visited: BTreeSet<String>,
    failed: BTreeSet<String>,
    skipped: BTreeSet<String>,

    /// Every link accepted from any page
    all_links: BTreeSet<String>,

    max_pages: usize,
    normalize: bool,
}

impl Frontier {
    /// Creates an empty frontier capped at `max_pages` visited URLs
    pub fn new(max_pages: usize, normalize: bool) -> Self {
        Self {
            queue: VecDeque::new(),
            queued: HashSet::new(),
            states: HashMap::new(),
            visited: BTreeSet::new(),
            failed: BTreeSet::new(),
            skipped: BTreeSet::new(),
            all_links: BTreeSet::new(),
            max_pages,
            normalize,
        }
    }

    /// Adds the start URL without counting it as a discovered link
    pub fn seed(&mut self, url: &str) {
        self.enqueue(url.to_string());
    }

    /// Remaining room under the page cap
    pub fn remaining_capacity(&self) -> usize {
        self.max_pages.saturating_sub(self.visited.len())
    }

    /// True while URLs are queued and the page cap has not been reached
    pub fn has_pending(&self) -> bool {
        !self.queue.is_empty() && self.remaining_capacity() > 0
    }

    /// Dequeues the next batch and moves each URL to `Fetching`
    ///
    /// The batch holds at most `max_workers` URLs and never more than the
    /// room left under the page cap. URLs visited since they were queued are
    /// dropped.
    pub fn next_batch(&mut self, max_workers: usize) -> Vec<String> {
        let size = max_workers.min(self.remaining_capacity());
        let mut batch = Vec::with_capacity(size);

        while batch.len() < size {
            let Some(url) = self.queue.pop_front() else {
                break;
            };
            self.queued.remove(&url);
            if self.visited.contains(&url) {
                continue;
            }
            self.advance(&url, PageState::Fetching);
            batch.push(url);
        }

        batch
    }

    /// Marks a URL as visited, whether dispatched or reached by redirect
    pub fn mark_visited(&mut self, url: &str) {
        self.visited.insert(url.to_string());
    }

    /// Records the terminal state of a dispatched URL
    pub fn complete(&mut self, url: &str, outcome: PageState) {
        self.advance(url, outcome);
        match outcome {
            PageState::Failed => {
                self.failed.insert(url.to_string());
            }
            PageState::Skipped => {
                self.skipped.insert(url.to_string());
            }
            _ => {}
        }
    }

    /// Records a discovered link and queues it when it is new
    ///
    /// Returns true if the link was queued. Links are not queued once the
    /// page cap is reached, nor when the redirect cache shows they lead to a
    /// URL that was already visited.
    pub fn offer(&mut self, url: &str, redirects: &RedirectCache) -> bool {
        self.all_links.insert(url.to_string());

        if self.is_known(url) || self.remaining_capacity() == 0 {
            return false;
        }
        if let Some(target) = redirects.target_of(url) {
            if self.visited.contains(&canonicalize(&target, self.normalize)) {
                tracing::debug!("Not queueing {}: redirects to visited {}", url, target);
                return false;
            }
        }

        self.enqueue(url.to_string());
        true
    }

    /// True if the URL is visited, failed or already queued
    pub fn is_known(&self, url: &str) -> bool {
        self.visited.contains(url) || self.failed.contains(url) || self.queued.contains(url)
    }

    pub fn is_visited(&self, url: &str) -> bool {
        self.visited.contains(url)
    }

    #[cfg(test)]
    fn state_of(&self, url: &str) -> Option<PageState> {
        self.states.get(url).copied()
    }

    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    pub fn visited(&self) -> &BTreeSet<String> {
        &self.visited
    }

    pub fn failed(&self) -> &BTreeSet<String> {
        &self.failed
    }

    pub fn skipped(&self) -> &BTreeSet<String> {
        &self.skipped
    }

    pub fn all_links(&self) -> &BTreeSet<String> {
        &self.all_links
    }

    /// Consumes the frontier, returning visited, failed, skipped and all links
    pub fn into_sets(
        self,
    ) -> (
        BTreeSet<String>,
        BTreeSet<String>,
        BTreeSet<String>,
        BTreeSet<String>,
    ) {
        (self.visited, self.failed, self.skipped, self.all_links)
    }

    fn enqueue(&mut self, url: String) {
        if self.queued.insert(url.clone()) {
            self.states.insert(url.clone(), PageState::Queued);
            self.queue.push_back(url);
        }
    }

    fn advance(&mut self, url: &str, next: PageState) {
        let current = self.states.get(url).copied().unwrap_or(PageState::Queued);
        match current.transition(next) {
            Ok(state) => {
                self.states.insert(url.to_string(), state);
            }
            Err(e) => tracing::warn!("{} for {}", e, url),
        }
    }
}
