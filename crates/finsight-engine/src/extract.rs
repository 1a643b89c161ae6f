//! Recovery of structured records from free-form model text
//!
//! Models are asked for a single JSON object but reply with whatever they
//! like: fenced markdown, prose around the object, or output truncated at the
//! token limit. [`extract`] never fails; it walks a ladder of strategies and,
//! as a last resort, wraps the cleaned original text in a one-field record so
//! the literal model output is never lost.
//!
//! The truncation repair is best-effort and may still produce invalid JSON:
//! it closes all outstanding `[` before all outstanding `{`, which is only
//! correct when the truncation did not interleave array/object nesting (e.g.
//! `{"a":[{"b":1` repairs to the invalid `{"a":[{"b":1]}}`). Such inputs fall
//! through to the raw-text record.

use serde_json::{Map, Value};

/// Field name carrying the cleaned original text when no parse succeeded
pub const RAW_RESULT_KEY: &str = "rawResult";

/// Which strategy produced the payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseStrategy {
    /// The full text parsed as a JSON object
    Direct,
    /// A balanced object span inside the text parsed
    Extracted,
    /// The span parsed only after truncation repair
    Repaired,
    /// Nothing parsed; the payload wraps the cleaned text verbatim
    RawFallback,
}

/// A recovered payload plus the strategy that produced it
#[derive(Debug, Clone)]
pub struct ExtractedResult {
    pub payload: Map<String, Value>,
    pub strategy: ParseStrategy,
}

impl ExtractedResult {
    /// Whether the payload is the raw-text fallback rather than model JSON
    pub fn is_degraded(&self) -> bool {
        self.strategy == ParseStrategy::RawFallback
    }
}

/// Recover a structured record from raw model text; never fails
pub fn extract(raw: &str) -> ExtractedResult {
    if let Ok(Value::Object(payload)) = serde_json::from_str::<Value>(raw) {
        return ExtractedResult {
            payload,
            strategy: ParseStrategy::Direct,
        };
    }

    let cleaned = strip_fences(raw);

    if let Some(candidate) = object_candidate(&cleaned) {
        if let Ok(Value::Object(payload)) = serde_json::from_str::<Value>(candidate) {
            return ExtractedResult {
                payload,
                strategy: ParseStrategy::Extracted,
            };
        }

        let repaired = repair_truncated(candidate);
        if let Ok(Value::Object(payload)) = serde_json::from_str::<Value>(&repaired) {
            return ExtractedResult {
                payload,
                strategy: ParseStrategy::Repaired,
            };
        }
    }

    let mut payload = Map::new();
    payload.insert(RAW_RESULT_KEY.to_string(), Value::String(cleaned));
    ExtractedResult {
        payload,
        strategy: ParseStrategy::RawFallback,
    }
}

/// Remove markdown code-fence markers and trim surrounding whitespace
fn strip_fences(raw: &str) -> String {
    raw.replace("```json", "").replace("```", "").trim().to_string()
}

/// Candidate top-level object text
///
/// Scans forward from the first `{`, tracking string state, escape state and
/// brace depth. When depth returns to zero the balanced span is the
/// candidate; when the text ends first (truncated output) the remainder from
/// the first `{` is.
fn object_candidate(text: &str) -> Option<&str> {
    let start = text.find('{')?;

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escape_next = false;

    for (offset, ch) in text[start..].char_indices() {
        if escape_next {
            escape_next = false;
            continue;
        }
        match ch {
            '\\' => escape_next = true,
            '"' => in_string = !in_string,
            '{' if !in_string => depth += 1,
            '}' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + ch.len_utf8()]);
                }
            }
            _ => {}
        }
    }

    Some(&text[start..])
}

/// Close structures left open by token-limit truncation
///
/// Heals a string value cut off mid-token (odd count of unescaped quotes),
/// then appends closers for the net-open brackets and braces — brackets
/// first, then braces. Best-effort: see the module docs for the nesting
/// pattern this ordering cannot repair.
fn repair_truncated(text: &str) -> String {
    let mut fixed = text.trim().to_string();

    let mut quotes = 0usize;
    let mut escape_next = false;
    for ch in fixed.chars() {
        if escape_next {
            escape_next = false;
            continue;
        }
        match ch {
            '\\' => escape_next = true,
            '"' => quotes += 1,
            _ => {}
        }
    }
    if quotes % 2 != 0 {
        fixed.push('"');
    }

    let mut open_braces = 0i32;
    let mut open_brackets = 0i32;
    let mut in_string = false;
    let mut escape_next = false;
    for ch in fixed.chars() {
        if escape_next {
            escape_next = false;
            continue;
        }
        match ch {
            '\\' => escape_next = true,
            '"' => in_string = !in_string,
            '{' if !in_string => open_braces += 1,
            '}' if !in_string => open_braces -= 1,
            '[' if !in_string => open_brackets += 1,
            ']' if !in_string => open_brackets -= 1,
            _ => {}
        }
    }

    for _ in 0..open_brackets.max(0) {
        fixed.push(']');
    }
    for _ in 0..open_braces.max(0) {
        fixed.push('}');
    }

    fixed
}
