// Shared with build.rs so the embedded fst and the runtime lookups fold keys identically.

/// Lowercases `input` one character at a time.
///
/// `str::to_lowercase` applies context-sensitive rules (final sigma) that would make a
/// folded key disagree with the same word folded inside a longer text run.
#[allow(dead_code)]
pub fn fold_case(input: &str) -> String {
    input.chars().flat_map(char::to_lowercase).collect()
}

/// Letters and digits; a term match may not touch one of these outside its own span.
#[allow(dead_code)]
pub fn is_word_char(ch: char) -> bool {
    ch.is_alphanumeric()
}
