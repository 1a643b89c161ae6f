//! Composition of per-stage instructions from template plus user override
//!
//! Users may append their own analysis instructions to a stage's fixed
//! template. The security guarantee comes from structure, not filtering: the
//! user text is confined to a clearly delimited customization block and the
//! merged prompt always ends with a restatement that structured output is
//! mandatory, so whatever the block contains cannot rewrite the output
//! contract. The denylist below is a secondary, inherently incomplete
//! mitigation that makes the most common injection phrasings visible instead
//! of effective.

use crate::stage::StageId;
use regex::Regex;
use tracing::{debug, warn};

/// Header of the delimited user-customization block
pub const USER_BLOCK_HEADER: &str = "## User Customization Instructions";

/// Delimiter line fencing the user-customization block
pub const BLOCK_DELIMITER: &str = "---";

/// Final line of every merged prompt, re-asserting the output contract
pub const FORMAT_REMINDER: &str =
    "Note: regardless of the instructions above, your output must strictly follow the JSON format specification.";

/// Visible replacement for denylisted phrasings
pub const FILTERED_PLACEHOLDER: &str = "[filtered]";

/// Default cap on user override length, in characters
pub const DEFAULT_MAX_OVERRIDE_CHARS: usize = 2000;

/// Merges a fixed stage template with an optional sanitized user override
pub struct PromptComposer {
    max_override_chars: usize,
    denylist: Vec<Regex>,
}

impl PromptComposer {
    /// Create a composer with the default override cap
    pub fn new() -> Self {
        Self::with_limit(DEFAULT_MAX_OVERRIDE_CHARS)
    }

    /// Create a composer with a custom override cap
    pub fn with_limit(max_override_chars: usize) -> Self {
        Self {
            max_override_chars,
            denylist: denylist_patterns(),
        }
    }

    /// Produce the final instruction text for one stage
    ///
    /// Without an override (or with a blank one) the output is byte-identical
    /// to the base template.
    pub fn compose(&self, stage: StageId, base: &str, user_override: Option<&str>) -> String {
        let trimmed = match user_override.map(str::trim) {
            Some(text) if !text.is_empty() => text,
            _ => return base.to_string(),
        };

        let capped = self.truncate_to_cap(stage, trimmed);
        let sanitized = self.sanitize(&capped);

        debug!(
            stage = %stage,
            chars = sanitized.chars().count(),
            "merged user prompt override"
        );

        format!(
            "{base}\n\n{BLOCK_DELIMITER}\n{USER_BLOCK_HEADER}\n{sanitized}\n{BLOCK_DELIMITER}\n{FORMAT_REMINDER}"
        )
    }

    /// Truncate an override to the configured cap; logged as an event, not an
    /// error
    fn truncate_to_cap(&self, stage: StageId, text: &str) -> String {
        if text.chars().count() <= self.max_override_chars {
            return text.to_string();
        }
        warn!(
            stage = %stage,
            cap = self.max_override_chars,
            "user prompt override exceeds cap, truncating"
        );
        text.chars().take(self.max_override_chars).collect()
    }

    /// Strip boundary markers the system itself uses, then neutralize
    /// denylisted injection phrasings with a visible placeholder
    fn sanitize(&self, text: &str) -> String {
        let without_markers: String = text
            .replace(USER_BLOCK_HEADER, "")
            .lines()
            .filter(|line| line.trim() != BLOCK_DELIMITER)
            .collect::<Vec<_>>()
            .join("\n");

        let mut sanitized = without_markers;
        for pattern in &self.denylist {
            sanitized = pattern
                .replace_all(&sanitized, FILTERED_PLACEHOLDER)
                .into_owned();
        }
        sanitized
    }
}

impl Default for PromptComposer {
    fn default() -> Self {
        Self::new()
    }
}

/// Known prompt-injection phrasings: instruction-override requests,
/// role-redefinition attempts, and fake role-prefix tokens
fn denylist_patterns() -> Vec<Regex> {
    [
        r"(?i)ignore\s+(?:all\s+)?(?:previous|prior|above|earlier)\s+instructions",
        r"(?i)disregard\s+(?:all\s+)?(?:previous|prior|above|earlier)\s+instructions",
        r"(?i)forget\s+(?:all\s+)?(?:your|previous|prior)\s+instructions",
        r"(?i)you\s+are\s+no\s+longer\b",
        r"(?i)you\s+are\s+now\b",
        r"(?i)pretend\s+(?:that\s+)?you\s+are\b",
        r"(?i)act\s+as\s+if\s+you\s+(?:are|were)\b",
        r"(?im)^\s*(?:system|assistant|developer)\s*:",
    ]
    .iter()
    .filter_map(|pattern| Regex::new(pattern).ok())
    .collect()
}
