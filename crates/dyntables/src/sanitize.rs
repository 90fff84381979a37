//! Identifier sanitization.
//!
//! Raw dynamic-column values become table-name fragments by dropping every
//! character outside `[A-Za-z0-9_]`. Distinct inputs may collapse to the
//! same fragment (`"a.b"` and `"ab"`); no attempt is made to disambiguate.

/// Returns true for characters allowed in a generated identifier.
#[inline]
pub fn is_identifier_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Removes every character that is not `[A-Za-z0-9_]`, keeping order.
pub fn sanitize(raw: &str) -> String {
    raw.chars().filter(|c| is_identifier_char(*c)).collect()
}

/// Returns true if `name` is non-empty and made only of identifier characters.
pub fn is_valid_identifier(name: &str) -> bool {
    !name.is_empty() && name.chars().all(is_identifier_char)
}

/// Builds a physical table name. The prefix is used verbatim.
pub fn format_table_name(prefix: &str, raw: &str) -> String {
    let mut name = String::with_capacity(prefix.len() + raw.len());
    name.push_str(prefix);
    name.push_str(&sanitize(raw));
    name
}
