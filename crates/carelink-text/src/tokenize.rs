//! Query normalization.

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

use crate::stopwords::is_stop_word;

fn is_separator(c: char) -> bool {
    !(c.is_alphanumeric() || c == '\'' || c == '\u{2019}')
}

/// Lower-cases, strips accents and drops in-word apostrophes.
fn fold_token(raw: &str) -> String {
    raw.nfkd()
        .filter(|c| !is_combining_mark(*c))
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Lazily splits `text` into lower-cased, accent-folded, punctuation-free
/// tokens. Apostrophes are removed without splitting ("I'm" -> "im"); every
/// other non-alphanumeric character separates tokens.
pub fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(is_separator).map(fold_token).filter(|t| !t.is_empty())
}

/// Tokens joined by single spaces.
pub fn normalize(text: &str) -> String {
    tokenize(text).collect::<Vec<_>>().join(" ")
}

/// Distinct non-stop-word tokens, first occurrence order.
pub fn significant_terms<I>(tokens: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let mut out: Vec<String> = Vec::new();
    for t in tokens {
        if !is_stop_word(&t) && !out.contains(&t) {
            out.push(t);
        }
    }
    out
}
