//! JavaScript-dependency detection
//!
//! Decides per page whether the static HTML is enough or a headless-browser
//! render is needed. The decision is a weighted sum over the checks in
//! [`SIGNAL_WEIGHTS`] followed by a threshold rule:
//!
//! 1. `score >= threshold` → dependent, `High` when `score >= threshold + 15`,
//!    otherwise `Medium`. The threshold is `min_score`, plus 15 in strict mode.
//! 2. `score >= conservative_score` with a strong signal (noscript warning or
//!    minimal content) → dependent, `Medium`.
//! 3. `score >= 70` → dependent, `VeryHigh`.
//! 4. Otherwise not dependent, `Low`.

mod signals;

pub use signals::{PageView, Signal, SIGNAL_WEIGHTS};

use crate::config::JsDetectionConfig;
use scraper::Html;
use serde::{Deserialize, Serialize};

/// Score raise applied to `min_score` in strict mode
const STRICT_MODE_RAISE: i32 = 15;

/// Margin above the threshold that earns high confidence
const HIGH_CONFIDENCE_MARGIN: i32 = 15;

/// Score that marks a page dependent no matter the configured thresholds
const OVERWHELMING_SCORE: i32 = 70;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    Low,
    Medium,
    High,
    VeryHigh,
}

/// Outcome of scoring one page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JsDependencyVerdict {
    pub is_js_dependent: bool,
    pub score: i32,
    pub confidence: Confidence,
    /// One line per fired signal, in table order
    pub evidence: Vec<String>,
    pub signals: Vec<Signal>,
}

impl JsDependencyVerdict {
    pub fn has_signal(&self, signal: Signal) -> bool {
        self.signals.contains(&signal)
    }
}

/// Scores pages against the configured thresholds
#[derive(Debug, Clone, Default)]
pub struct JsDetector {
    config: JsDetectionConfig,
}

impl JsDetector {
    pub fn new(config: JsDetectionConfig) -> Self {
        Self { config }
    }

    /// Scores raw HTML; `url` is only used for logging
    pub fn detect(&self, html: &str, url: &str) -> JsDependencyVerdict {
        let document = Html::parse_document(html);
        self.detect_document(&document, html, url)
    }

    /// Scores an already parsed document
    pub fn detect_document(&self, document: &Html, html: &str, url: &str) -> JsDependencyVerdict {
        let page = PageView::new(document, html);

        let (score, fired) = SIGNAL_WEIGHTS.iter().fold(
            (0, Vec::new()),
            |(score, mut fired), &(signal, weight)| match signal.check(&page) {
                Some(evidence) => {
                    fired.push((signal, format!("{} ({:+})", evidence, weight)));
                    (score + weight, fired)
                }
                None => (score, fired),
            },
        );

        let strong = fired.iter().any(|(signal, _)| signal.is_strong());
        let (is_js_dependent, confidence) = self.decide(score, strong);

        tracing::debug!(
            "JS detection for {}: score {} -> {} ({:?})",
            url,
            score,
            is_js_dependent,
            confidence
        );
        for (_, evidence) in &fired {
            tracing::trace!("  {}", evidence);
        }

        let (signals, evidence): (Vec<Signal>, Vec<String>) = fired.into_iter().unzip();
        JsDependencyVerdict {
            is_js_dependent,
            score,
            confidence,
            evidence,
            signals,
        }
    }

    fn decide(&self, score: i32, strong_signal: bool) -> (bool, Confidence) {
        let threshold = if self.config.strict_mode {
            self.config.min_score + STRICT_MODE_RAISE
        } else {
            self.config.min_score
        };

        if score >= threshold {
            let confidence = if score >= threshold + HIGH_CONFIDENCE_MARGIN {
                Confidence::High
            } else {
                Confidence::Medium
            };
            (true, confidence)
        } else if score >= self.config.conservative_score && strong_signal {
            (true, Confidence::Medium)
        } else if score >= OVERWHELMING_SCORE {
            (true, Confidence::VeryHigh)
        } else {
            (false, Confidence::Low)
        }
    }
}
