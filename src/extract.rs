//! Level-code extraction from chat text.
//!
//! A level code is four groups of four hex characters, e.g.
//! `1234-0000-89AB-CDEF`. Chatters type them with spaces, hyphens or
//! underscores in any mix, so extraction accepts all three separators and
//! normalizes to hyphens.

use std::sync::OnceLock;

use regex::Regex;

/// Canonical code length: four groups of four plus three separators.
pub const CODE_LEN: usize = 19;

fn code_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        // The boundary classes keep a group from matching inside a longer
        // hex run ("AB123" must not yield "AB12").
        Regex::new(
            r"(?:^|[^0-9A-F])([0-9A-F]{4})[ _-]([0-9A-F]{4})[ _-]([0-9A-F]{4})[ _-]([0-9A-F]{4})(?:[^0-9A-F]|$)",
        )
        .expect("code pattern is valid")
    })
}

/// Extract the first level code from a message, in canonical form.
///
/// Matching is case-insensitive; the returned code is uppercase with all
/// separators normalized to `-`. A message is scanned for one code at most.
pub fn extract(text: &str) -> Option<String> {
    let upper = text.to_uppercase();
    let caps = code_pattern().captures(&upper)?;
    Some(format!("{}-{}-{}-{}", &caps[1], &caps[2], &caps[3], &caps[4]))
}
