//! Mapping of guest names onto Rust identifiers.
//!
//! - Type names: segments capitalized and concatenated (`load_image` → `LoadImage`).
//! - Method and parameter names: lowercase segments joined with `_`, with
//!   camel humps split (`maxWidth` → `max_width`).
//!
//! Both mappings are total: anything that would not be a valid identifier is
//! repaired (leading digit, empty result, reserved word).

use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;

/// Rust strict and reserved keywords.
const RUST_KEYWORDS: &[&str] = &[
    "as", "async", "await", "break", "const", "continue", "crate", "dyn", "else", "enum",
    "extern", "false", "fn", "for", "if", "impl", "in", "let", "loop", "match", "mod", "move",
    "mut", "pub", "ref", "return", "self", "Self", "static", "struct", "super", "trait", "true",
    "type", "unsafe", "use", "where", "while", "abstract", "become", "box", "do", "final", "gen",
    "macro", "override", "priv", "try", "typeof", "unsized", "virtual", "yield",
];

/// Appended to names that collide with a keyword.
const RESERVED_SUFFIX: &str = "_";

/// Runs of characters that cannot appear in an identifier segment.
static SEPARATORS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^A-Za-z0-9]+").unwrap());

/// Map a guest name to a type identifier (`PascalCase`).
///
/// # Examples
///
/// ```
/// use guestbind::codegen::naming::to_type_identifier;
///
/// assert_eq!(to_type_identifier("load_image"), "LoadImage");
/// assert_eq!(to_type_identifier("parseJSON"), "ParseJSON");
/// ```
pub fn to_type_identifier(name: &str) -> String {
    let joined: String = segments(name).map(capitalize).collect();
    finish(joined, "Unnamed")
}

/// Map a guest name to a method or parameter identifier (`snake_case`).
///
/// # Examples
///
/// ```
/// use guestbind::codegen::naming::to_snake_identifier;
///
/// assert_eq!(to_snake_identifier("maxWidth"), "max_width");
/// assert_eq!(to_snake_identifier("type"), "type_");
/// ```
pub fn to_snake_identifier(name: &str) -> String {
    let words: Vec<String> = segments(name)
        .flat_map(split_humps)
        .map(|w| w.to_ascii_lowercase())
        .collect();
    finish(words.join("_"), "unnamed")
}

pub fn is_reserved(ident: &str) -> bool {
    RUST_KEYWORDS.contains(&ident)
}

fn segments(name: &str) -> impl Iterator<Item = &str> {
    SEPARATORS.split(name).filter(|s| !s.is_empty())
}

fn capitalize(segment: &str) -> String {
    let mut chars = segment.chars();
    match chars.next() {
        Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
        None => String::new(),
    }
}

/// Split `parseJSONData` into `parse`, `JSON`, `Data`.
fn split_humps(segment: &str) -> Vec<&str> {
    let bytes = segment.as_bytes();
    let mut words = Vec::new();
    let mut start = 0;

    for i in 1..bytes.len() {
        if !bytes[i].is_ascii_uppercase() {
            continue;
        }
        let prev = bytes[i - 1];
        let next_is_lower = bytes.get(i + 1).is_some_and(|b| b.is_ascii_lowercase());
        if prev.is_ascii_lowercase()
            || prev.is_ascii_digit()
            || (prev.is_ascii_uppercase() && next_is_lower)
        {
            words.push(&segment[start..i]);
            start = i;
        }
    }
    words.push(&segment[start..]);
    words
}

fn finish(mut ident: String, fallback: &str) -> String {
    if ident.is_empty() {
        ident = fallback.to_string();
    }
    if ident.starts_with(|c: char| c.is_ascii_digit()) {
        ident.insert(0, '_');
    }
    if is_reserved(&ident) {
        ident.push_str(RESERVED_SUFFIX);
    }
    ident
}

/// Identifiers already taken in one scope.
///
/// Claims are first-come; a taken candidate gets a numeric suffix.
#[derive(Debug, Default)]
pub struct IdentifierSet {
    used: HashSet<String>,
}

impl IdentifierSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// A set with `names` already taken.
    pub fn with_reserved(names: &[&str]) -> Self {
        Self {
            used: names.iter().map(|n| n.to_string()).collect(),
        }
    }

    /// Take `candidate`, or the first free `candidate_2`, `candidate_3`, ...
    ///
    /// Type names get a bare number (`SumArgs2`). A trailing `_` is dropped
    /// before numbering so the result stays in the expected case style.
    pub fn claim(&mut self, candidate: String) -> String {
        if self.used.insert(candidate.clone()) {
            return candidate;
        }
        // `self_` continues as `self_2`, not `self__2`.
        let stem = candidate.strip_suffix(RESERVED_SUFFIX).unwrap_or(&candidate);
        let separator = if stem.starts_with(|c: char| c.is_ascii_uppercase()) || stem.ends_with('_')
        {
            ""
        } else {
            "_"
        };
        let mut n = 2;
        loop {
            let next = format!("{}{}{}", stem, separator, n);
            if self.used.insert(next.clone()) {
                return next;
            }
            n += 1;
        }
    }
}
