//! Exact-versus-pattern classification for name tokens.

pub const WILDCARD: char = '%';

pub fn is_wildcard(token: &str) -> bool {
    token.contains(WILDCARD)
}

pub fn any_wildcard<S: AsRef<str>>(tokens: &[S]) -> bool {
    tokens.iter().any(|token| is_wildcard(token.as_ref()))
}

/// Splits tokens into (exact, wildcard), keeping the relative order of each.
pub fn partition(tokens: &[String]) -> (Vec<String>, Vec<String>) {
    tokens.iter().cloned().partition(|token| !is_wildcard(token))
}
