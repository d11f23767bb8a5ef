//! Pattern escaping and text folding for substring matching.
//! Used by: query::builder, store::sqlite.

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Escape character declared in every `LIKE ... ESCAPE` clause.
pub const LIKE_ESCAPE: char = '\\';

/// Escape LIKE metacharacters (`%`, `_` and the escape character itself).
pub fn escape_like(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if matches!(c, '%' | '_' | LIKE_ESCAPE) {
            out.push(LIKE_ESCAPE);
        }
        out.push(c);
    }
    out
}

/// Lower-cases and strips combining diacritics, so `Plzeň` folds to `plzen`.
pub fn fold(s: &str) -> String {
    s.nfd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(char::to_lowercase)
        .collect()
}

/// Builds a bound `%term%` pattern for a folded, escaped search term.
pub fn contains_pattern(term: &str) -> String {
    format!("%{}%", escape_like(&fold(term)))
}
