//! Title normaliser: `user_login-flow` → `User Login Flow`.

/// Convert a raw task-name token into title case.
///
/// Underscores and hyphens become spaces, runs of whitespace collapse to one
/// space, the ends are trimmed, and each word gets an upper-case first
/// character with the rest lower-cased. Returns an empty string for blank
/// input; callers substitute a default beforehand.
pub fn normalize_title(raw: &str) -> String {
    let spaced = raw.replace(['_', '-'], " ");
    spaced
        .split_whitespace()
        .map(capitalize)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Upper-case the first character, lower-case everything else.
///
/// Only the first char of a multi-char upper-case expansion stays upper
/// (`ß` → `Ss`, `ﬁ` → `Fi`), so a second pass is a no-op.
fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    let Some(first) = chars.next() else {
        return String::new();
    };
    let mut upper = first.to_uppercase();
    let mut out = String::with_capacity(word.len());
    out.extend(upper.next());
    out.extend(upper.flat_map(char::to_lowercase));
    out.extend(chars.flat_map(char::to_lowercase));
    out
}
