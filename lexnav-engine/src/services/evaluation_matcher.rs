//! Reconciliation of oracle-returned node ids
//!
//! The oracle is asked to echo each submitted id verbatim, but real
//! responses drift: bare section numbers, re-spaced titles, case changes,
//! light typos. Each requested id is resolved against the received entries
//! through a strategy cascade; every received entry can be consumed at most
//! once, and requested ids are processed in submission order so the
//! assignment is deterministic.
//!
//! Cascade: exact match, number-prefix match, key-phrase overlap, fuzzy
//! alphanumeric match.

use std::collections::HashSet;

/// Words carrying no identification signal in statute headings.
const STOP_WORDS: &[&str] = &[
    "the", "and", "for", "with", "from", "that", "this", "are", "was", "were", "will", "shall",
    "may", "not", "have", "has", "its", "any", "all", "other",
];

const KEY_PHRASE_MIN_OVERLAP: usize = 2;
const FUZZY_CONTAINMENT_MIN_LEN: usize = 5;
const FUZZY_MAX_LEN: usize = 20;
const FUZZY_MIN_SIMILARITY: f64 = 0.70;

/// Resolve each requested id to the index of the received entry it
/// consumes, or `None` when no strategy succeeds.
pub fn reconcile(requested: &[&str], received: &[&str]) -> Vec<Option<usize>> {
    let mut consumed = vec![false; received.len()];
    let strategies: &[fn(&str, &str) -> bool] = &[
        exact_match,
        number_prefix_match,
        key_phrase_match,
        fuzzy_match,
    ];

    requested
        .iter()
        .map(|req| {
            for strategy in strategies {
                let hit = received
                    .iter()
                    .enumerate()
                    .find(|(i, rec)| !consumed[*i] && strategy(req, rec))
                    .map(|(i, _)| i);
                if let Some(i) = hit {
                    consumed[i] = true;
                    return Some(i);
                }
            }
            None
        })
        .collect()
}

fn exact_match(requested: &str, received: &str) -> bool {
    requested == received
}

/// Leading integers equal, or the received id is bare digits matching the
/// requested id's `"<digits> "` prefix.
fn number_prefix_match(requested: &str, received: &str) -> bool {
    if let (Some(a), Some(b)) = (leading_integer(requested), leading_integer(received)) {
        if a == b {
            return true;
        }
    }

    let received = received.trim();
    if !received.is_empty() && received.chars().all(|c| c.is_ascii_digit()) {
        return requested.starts_with(&format!("{received} "));
    }

    false
}

fn leading_integer(s: &str) -> Option<u64> {
    let digits: String = s.trim().chars().take_while(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        None
    } else {
        digits.parse().ok()
    }
}

/// At least half of the requested id's key words (minimum two) overlap the
/// received id's key words, where overlap is substring containment in
/// either direction or edit distance <= 1.
fn key_phrase_match(requested: &str, received: &str) -> bool {
    let requested_words = key_words(requested);
    if requested_words.is_empty() {
        return false;
    }
    let received_words = key_words(received);

    let overlap = requested_words
        .iter()
        .filter(|req_word| {
            received_words.iter().any(|rec_word| {
                req_word.contains(rec_word.as_str())
                    || rec_word.contains(req_word.as_str())
                    || levenshtein(req_word, rec_word) <= 1
            })
        })
        .count();

    let required = KEY_PHRASE_MIN_OVERLAP.max(requested_words.len().div_ceil(2));
    overlap >= required
}

fn key_words(id: &str) -> HashSet<String> {
    id.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|word| word.len() > 2 && !STOP_WORDS.contains(word))
        .map(str::to_string)
        .collect()
}

/// Alphanumeric-normalised containment (minimum length 5), or Levenshtein
/// similarity >= 0.70 for short strings.
fn fuzzy_match(requested: &str, received: &str) -> bool {
    let a = alphanumeric(requested);
    let b = alphanumeric(received);
    if a.is_empty() || b.is_empty() {
        return false;
    }

    if (a.len() >= FUZZY_CONTAINMENT_MIN_LEN && b.contains(&a))
        || (b.len() >= FUZZY_CONTAINMENT_MIN_LEN && a.contains(&b))
    {
        return true;
    }

    if a.chars().count() <= FUZZY_MAX_LEN && b.chars().count() <= FUZZY_MAX_LEN {
        return similarity(&a, &b) >= FUZZY_MIN_SIMILARITY;
    }

    false
}

fn alphanumeric(s: &str) -> String {
    s.chars()
        .filter(|c| c.is_alphanumeric())
        .collect::<String>()
        .to_lowercase()
}

/// Normalised Levenshtein similarity in [0, 1].
pub fn similarity(a: &str, b: &str) -> f64 {
    let longest = a.chars().count().max(b.chars().count());
    if longest == 0 {
        return 1.0;
    }
    1.0 - levenshtein(a, b) as f64 / longest as f64
}

/// Levenshtein edit distance, two-row dynamic programming.
pub fn levenshtein(a: &str, b: &str) -> usize {
    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();
    if a_chars.is_empty() {
        return b_chars.len();
    }
    if b_chars.is_empty() {
        return a_chars.len();
    }

    let mut prev: Vec<usize> = (0..=b_chars.len()).collect();
    let mut curr: Vec<usize> = vec![0; b_chars.len() + 1];

    for (i, a_char) in a_chars.iter().enumerate() {
        curr[0] = i + 1;
        for (j, b_char) in b_chars.iter().enumerate() {
            let substitution = prev[j] + usize::from(a_char != b_char);
            curr[j + 1] = substitution.min(prev[j + 1] + 1).min(curr[j] + 1);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b_chars.len()]
}
