//! Persistence identity: a filesystem-safe key derived from the model name.

/// Longest key produced by [`model_key`].
pub const MAX_KEY_LEN: usize = 24;
/// Key used when the host has no usable model name.
pub const FALLBACK_KEY: &str = "default";

const FILLER: char = '_';

/// Sanitize a model name: whitespace runs collapse to one `_`, every other
/// non-alphanumeric character becomes `_`, and the result is cut to
/// [`MAX_KEY_LEN`]. Empty or missing names map to [`FALLBACK_KEY`].
pub fn model_key(name: Option<&str>) -> String {
    let Some(name) = name.map(str::trim).filter(|n| !n.is_empty()) else {
        return FALLBACK_KEY.to_string();
    };
    let mut key = String::with_capacity(MAX_KEY_LEN);
    let mut in_space = false;
    for ch in name.chars() {
        if key.len() >= MAX_KEY_LEN {
            break;
        }
        if ch.is_whitespace() {
            if !in_space {
                key.push(FILLER);
            }
            in_space = true;
            continue;
        }
        in_space = false;
        key.push(if ch.is_ascii_alphanumeric() { ch } else { FILLER });
    }
    key
}
