//! Attribute value validation and coercion
//!
//! Centralizes the lexical rules for attribute values so the compiler's
//! parsing pass stays a thin mapping from attribute name to local variable.
//! All functions are pure; the compiler translates `None` results into
//! structured diagnostics.

/// Returns `true` if `value` is a legal identifier.
///
/// Identifiers start with a letter or underscore and continue with letters,
/// digits, underscores, or periods. This matches the installer database's
/// identifier column rules.
pub fn is_legal_identifier(value: &str) -> bool {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.')
}

/// Parses a yes/no attribute value.
pub fn parse_yes_no(value: &str) -> Option<bool> {
    match value {
        "yes" => Some(true),
        "no" => Some(false),
        _ => None,
    }
}

/// Parses an integer attribute value within `[min, max]`.
pub fn parse_bounded_integer(value: &str, min: i64, max: i64) -> Option<i64> {
    let parsed: i64 = value.trim().parse().ok()?;
    (min..=max).contains(&parsed).then_some(parsed)
}
