//! Locate the structured payload inside a noisy agent transcript.
//!
//! Strategies are tried in order of how explicitly the payload is labeled,
//! not where it occurs: a tagged ```json fence beats an untagged fence,
//! which beats a bare brace-delimited region. The first strategy that
//! yields a non-empty candidate wins.

pub mod strategies;

pub use strategies::{fences, AnyFence, BraceSpan, ExtractionStrategy, Fence, TaggedFence};

use crate::error::{excerpt, ExtractionFailure};

pub const NO_BLOCK_FOUND: &str = "no structured block found";

/// Candidate payload text plus the strategy that located it.
#[derive(Debug, Clone, PartialEq)]
pub struct RawPayload {
    pub text: String,
    pub strategy: &'static str,
}

pub struct Extractor {
    strategies: Vec<Box<dyn ExtractionStrategy>>,
    excerpt_len: usize,
}

impl Default for Extractor {
    fn default() -> Self {
        Self {
            strategies: vec![
                Box::new(TaggedFence { language: "json" }),
                Box::new(AnyFence),
                Box::new(BraceSpan),
            ],
            excerpt_len: 200,
        }
    }
}

impl Extractor {
    /// An extractor with no strategies; add them with [`Extractor::with_strategy`].
    pub fn empty() -> Self {
        Self {
            strategies: Vec::new(),
            excerpt_len: 200,
        }
    }

    /// Append a strategy at the lowest priority.
    pub fn with_strategy(mut self, strategy: impl ExtractionStrategy + 'static) -> Self {
        self.strategies.push(Box::new(strategy));
        self
    }

    pub fn with_excerpt_len(mut self, len: usize) -> Self {
        self.excerpt_len = len;
        self
    }

    pub fn strategy_names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    pub fn extract(&self, transcript: &str) -> Result<RawPayload, ExtractionFailure> {
        for strategy in &self.strategies {
            match strategy.find(transcript) {
                Some(text) if !text.trim().is_empty() => {
                    tracing::debug!(
                        strategy = strategy.name(),
                        len = text.len(),
                        "located structured block"
                    );
                    return Ok(RawPayload {
                        text: text.to_string(),
                        strategy: strategy.name(),
                    });
                }
                _ => tracing::trace!(strategy = strategy.name(), "no candidate"),
            }
        }

        Err(ExtractionFailure {
            reason: NO_BLOCK_FOUND.to_string(),
            raw_excerpt: excerpt(transcript, self.excerpt_len),
        })
    }
}

/// Extract with the default strategy order.
pub fn extract(transcript: &str) -> Result<RawPayload, ExtractionFailure> {
    Extractor::default().extract(transcript)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fenced_json_surrounded_by_prose() {
        let transcript = "Sure, here is the result:\n```json\n{\"primary_content\": \"print(1)\", \"utility_modules\": {}}\n```\nLet me know if you need changes.";
        let payload = extract(transcript).unwrap();
        assert_eq!(
            payload.text,
            "{\"primary_content\": \"print(1)\", \"utility_modules\": {}}"
        );
        assert_eq!(payload.strategy, "tagged-fence");
    }

    #[test]
    fn test_tagged_fence_preferred_over_earlier_untagged() {
        let transcript = "Example shape:\n```\n{\"example\": true}\n```\nActual answer:\n```json\n{\"primary_content\": \"x\"}\n```";
        let payload = extract(transcript).unwrap();
        assert_eq!(payload.text, "{\"primary_content\": \"x\"}");
    }

    #[test]
    fn test_block_text_is_verbatim() {
        let body = "{\n  \"primary_content\": \"def f():\\n    return 1\\n\",\n  \"utility_modules\": {}\n}";
        let transcript = format!("prose {{not this}}\n```json\n{body}\n```\ntrailing }} prose");
        assert_eq!(extract(&transcript).unwrap().text, body);
    }

    #[test]
    fn test_falls_back_to_brace_span() {
        let payload = extract("The answer is {\"primary_content\": \"y\"} as requested.").unwrap();
        assert_eq!(payload.text, "{\"primary_content\": \"y\"}");
        assert_eq!(payload.strategy, "brace-span");
    }

    #[test]
    fn test_no_braces_anywhere_is_failure() {
        let failure = extract("I could not complete this refactor, sorry.").unwrap_err();
        assert_eq!(failure.reason, NO_BLOCK_FOUND);
        assert_eq!(failure.raw_excerpt, "I could not complete this refactor, sorry.");
    }

    #[test]
    fn test_empty_transcript_is_failure() {
        assert!(extract("").is_err());
        assert!(extract("   \n\n").is_err());
    }

    #[test]
    fn test_failure_excerpt_is_bounded() {
        let long = "x".repeat(1000);
        let failure = Extractor::default()
            .with_excerpt_len(10)
            .extract(&long)
            .unwrap_err();
        assert_eq!(failure.raw_excerpt, format!("{}...", "x".repeat(10)));
    }

    #[test]
    fn test_custom_strategy_order() {
        struct Everything;
        impl ExtractionStrategy for Everything {
            fn name(&self) -> &'static str {
                "everything"
            }
            fn find<'a>(&self, transcript: &'a str) -> Option<&'a str> {
                Some(transcript)
            }
        }

        let extractor = Extractor::empty().with_strategy(Everything);
        assert_eq!(extractor.strategy_names(), vec!["everything"]);
        assert_eq!(extractor.extract("raw").unwrap().text, "raw");
        assert_eq!(
            Extractor::default().strategy_names(),
            vec!["tagged-fence", "any-fence", "brace-span"]
        );
    }
}
