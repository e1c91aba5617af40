//! Bounded context assembly from ranked matches.

use crate::models::Match;

/// Separator placed between documents in the assembled context block.
pub const DELIMITER: &str = "\n\n---\n\n";

/// A size-bounded context block with the provenance of every document that
/// contributed to it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssembledContext {
    pub text: String,
    pub sources: Vec<String>,
}

/// Concatenate match contents, in the given order, into a block of at most
/// `max_chars` characters.
///
/// Documents are included whole until the budget runs out; the last
/// included document is truncated at a character boundary to fit. Documents
/// that would contribute nothing are omitted from both the text and the
/// sources list. Zero matches yields an empty context, not an error.
pub fn assemble(matches: &[Match], max_chars: usize) -> AssembledContext {
    let mut text = String::new();
    let mut sources = Vec::new();
    let mut used = 0usize;

    let delimiter_chars = DELIMITER.chars().count();

    for m in matches {
        let separator_cost = if text.is_empty() { 0 } else { delimiter_chars };
        let remaining = max_chars.saturating_sub(used + separator_cost);
        if remaining == 0 {
            break;
        }

        let content = &m.document.content;
        let content_chars = content.chars().count();

        if !text.is_empty() {
            text.push_str(DELIMITER);
            used += delimiter_chars;
        }

        if content_chars <= remaining {
            text.push_str(content);
            used += content_chars;
            sources.push(m.document.label());
        } else {
            // Truncate the last included document to the remaining budget.
            text.extend(content.chars().take(remaining));
            used += remaining;
            sources.push(m.document.label());
            break;
        }
    }

    AssembledContext { text, sources }
}
