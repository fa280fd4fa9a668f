use std::collections::HashSet;

use rand::Rng;

use crate::{DEFAULT_PLAYER_NAME, MAX_NAME_LENGTH};

/// Truncate to a maximum number of characters on a char boundary.
pub fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

/// Normalize a requested display name: trim, fall back to the default when
/// empty, cap at [`MAX_NAME_LENGTH`] characters.
pub fn normalize_name(desired: &str) -> String {
    let trimmed = desired.trim();
    let base = if trimmed.is_empty() {
        DEFAULT_PLAYER_NAME
    } else {
        trimmed
    };
    truncate_chars(base, MAX_NAME_LENGTH)
}

/// Resolve a requested name against the names already in use.
///
/// Comparison is case-insensitive. Collisions get `" (2)"`, `" (3)"`, ...
/// appended until a free name is found; uniqueness suffixes are not counted
/// against the length cap. Deterministic for a given taken set regardless of
/// its iteration order.
pub fn resolve_unique(desired: &str, taken: &[String]) -> String {
    let base = normalize_name(desired);
    let taken: HashSet<String> = taken.iter().map(|name| name.to_lowercase()).collect();
    if !taken.contains(&base.to_lowercase()) {
        return base;
    }
    let mut counter = 2u32;
    loop {
        let candidate = format!("{base} ({counter})");
        if !taken.contains(&candidate.to_lowercase()) {
            return candidate;
        }
        counter += 1;
    }
}

/// Pick a default display name of the form `Player0042`.
pub fn random_name<R: Rng>(rng: &mut R) -> String {
    format!("{}{:04}", DEFAULT_PLAYER_NAME, rng.gen_range(0..10_000))
}
