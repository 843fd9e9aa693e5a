//! Oracle context extraction per node
//!
//! Leaves vastly outnumber parents and their titles are typically enough to
//! judge relevance, so leaves get a one-line context. Parent decisions
//! drive traversal width and get a richer summary: content preview plus
//! bounded metadata snippets.

use crate::models::LegalNode;

const PREVIEW_LIMIT: usize = 150;
const SCOPE_LIMIT: usize = 100;
const IMPACT_LIMIT: usize = 80;
const MAX_LIST_ITEMS: usize = 3;
/// A first sentence shorter than this is extended with the second.
const MIN_FIRST_SENTENCE: usize = 20;

/// Build the textual context the oracle sees for one node.
pub fn node_context(node: &LegalNode) -> String {
    if node.is_leaf() {
        return format!("Title: {} | Type: Leaf node (detailed provision)", node.title);
    }

    let mut parts = vec![format!("Title: {}", node.title)];

    let preview = content_preview(&node.content);
    if !preview.is_empty() {
        parts.push(format!("Preview: {preview}"));
    }

    let metadata = &node.metadata;
    if !metadata.main_themes.is_empty() {
        parts.push(format!("Themes: {}", joined(&metadata.main_themes)));
    }
    if !metadata.key_points.is_empty() {
        parts.push(format!("Key points: {}", joined(&metadata.key_points)));
    }
    if let Some(scope) = &metadata.scope {
        parts.push(format!("Scope: {}", snippet(scope, SCOPE_LIMIT)));
    }
    if let Some(impact) = &metadata.practical_impact {
        parts.push(format!("Impact: {}", snippet(impact, IMPACT_LIMIT)));
    }

    parts.push(format!("Type: Parent node ({} children)", node.children.len()));
    parts.join(" | ")
}

fn joined(items: &[String]) -> String {
    items
        .iter()
        .take(MAX_LIST_ITEMS)
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Contextual preview of a node's content: first sentence, extended to the
/// second when the first is very short, truncated with ellipsis when over
/// the limit.
fn content_preview(content: &str) -> String {
    let text = content.trim();
    if text.is_empty() {
        return String::new();
    }

    let sentences = split_sentences(text);
    let mut selected = sentences.first().cloned().unwrap_or_else(|| text.to_string());
    if selected.chars().count() < MIN_FIRST_SENTENCE {
        if let Some(second) = sentences.get(1) {
            selected = format!("{selected} {second}");
        }
    }

    snippet(&selected, PREVIEW_LIMIT)
}

/// Split text into sentences on `.`, `!` or `?` followed by whitespace or
/// end of input.
fn split_sentences(text: &str) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    let mut sentences = Vec::new();
    let mut start = 0;

    for i in 0..chars.len() {
        if matches!(chars[i], '.' | '!' | '?')
            && chars.get(i + 1).map_or(true, |c| c.is_whitespace())
        {
            let sentence: String = chars[start..=i].iter().collect();
            let sentence = sentence.trim().to_string();
            if !sentence.is_empty() {
                sentences.push(sentence);
            }
            start = i + 1;
        }
    }
    if start < chars.len() {
        let tail: String = chars[start..].iter().collect();
        let tail = tail.trim().to_string();
        if !tail.is_empty() {
            sentences.push(tail);
        }
    }

    sentences
}

/// Bound a string to `limit` characters, cutting back to a word boundary
/// and appending an ellipsis when truncation occurs.
fn snippet(text: &str, limit: usize) -> String {
    let chars: Vec<char> = text.chars().collect();
    if chars.len() <= limit {
        return text.to_string();
    }

    let mut cut = limit;
    while cut > 0 && !chars[cut - 1].is_whitespace() {
        cut -= 1;
    }
    if cut == 0 {
        cut = limit;
    }

    let truncated: String = chars[..cut].iter().collect();
    format!("{}...", truncated.trim_end())
}
