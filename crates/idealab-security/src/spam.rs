// SPDX-FileCopyrightText: 2026 IdéaLab Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Heuristic spam classifier for user-submitted text.
//!
//! Signals are OR-composed, so adding content can only ever keep a flagged
//! text flagged. False positives are acceptable.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;

/// Promotional and scam vocabulary, matched case-insensitively as substrings.
const SPAM_KEYWORDS: &[&str] = &[
    "viagra",
    "casino",
    "lottery",
    "winner",
    "congratulations",
    "click here",
    "free money",
    "make money fast",
    "work from home",
    "buy now",
    "limited time",
    "act now",
    "urgent",
];

/// A normalized word appearing more often than this is spam.
const MAX_WORD_REPEATS: usize = 5;

/// More URLs than this is spam.
const MAX_URLS: usize = 2;

/// A run of this many identical characters is spam.
const CHAR_RUN_LIMIT: usize = 11;

static URL_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)https?://\S+").unwrap());

/// Returns `true` when `text` trips any spam signal.
pub fn is_spam(text: &str) -> bool {
    has_keyword(text)
        || max_word_repeats(text) > MAX_WORD_REPEATS
        || url_count(text) > MAX_URLS
        || has_char_run(text, CHAR_RUN_LIMIT)
}

fn has_keyword(text: &str) -> bool {
    let lower = text.to_lowercase();
    SPAM_KEYWORDS.iter().any(|kw| lower.contains(kw))
}

/// Highest occurrence count of any normalized word longer than two characters.
fn max_word_repeats(text: &str) -> usize {
    let mut counts: HashMap<String, usize> = HashMap::new();
    let mut max = 0;
    for raw in text.split_whitespace() {
        let word: String = raw
            .chars()
            .filter(|c| c.is_alphanumeric() || *c == '_')
            .flat_map(char::to_lowercase)
            .collect();
        if word.chars().count() <= 2 {
            continue;
        }
        let count = counts.entry(word).or_insert(0);
        *count += 1;
        max = max.max(*count);
    }
    max
}

fn url_count(text: &str) -> usize {
    URL_PATTERN.find_iter(text).count()
}

// The regex crate has no backreferences, so runs are counted by hand.
// Newlines never form a run.
fn has_char_run(text: &str, limit: usize) -> bool {
    let mut prev = None;
    let mut run = 0;
    for c in text.chars() {
        if c == '\n' {
            prev = None;
            run = 0;
            continue;
        }
        if Some(c) == prev {
            run += 1;
        } else {
            prev = Some(c);
            run = 1;
        }
        if run >= limit {
            return true;
        }
    }
    false
}
