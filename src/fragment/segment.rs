//! Punctuation-driven text segmentation.
//!
//! Text is cut into sentences on runs of `.`, `!`, `?`. Sentences of at most
//! [`SHORT_SENTENCE_WORDS`] words are kept whole; longer ones are cut again on
//! `,`, `;`, and the standalone words `and`, `or`, `but`, keeping only pieces of
//! at least [`MIN_PIECE_WORDS`] words.

use regex::Regex;
use std::sync::LazyLock;

pub const SHORT_SENTENCE_WORDS: usize = 5;
pub const MIN_PIECE_WORDS: usize = 2;

static SENTENCE_BREAK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[.!?]+").expect("valid sentence regex"));

static CLAUSE_BREAK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[,;]|\sand\s|\sor\s|\sbut\s").expect("valid clause regex"));

fn word_count(s: &str) -> usize {
    s.split_whitespace().count()
}

/// Split raw text into ordered fragment strings. Pure and deterministic.
///
/// An empty result means nothing usable was found; callers treat that as an
/// error rather than a no-op.
pub fn segment(text: &str) -> Vec<String> {
    let mut fragments = Vec::new();

    for sentence in SENTENCE_BREAK.split(text) {
        let sentence = sentence.trim();
        if sentence.is_empty() {
            continue;
        }

        if word_count(sentence) <= SHORT_SENTENCE_WORDS {
            fragments.push(sentence.to_string());
            continue;
        }

        for piece in CLAUSE_BREAK.split(sentence) {
            let piece = piece.trim();
            if !piece.is_empty() && word_count(piece) >= MIN_PIECE_WORDS {
                fragments.push(piece.to_string());
            }
        }
    }

    fragments
}
