//! SQL identifier allow-list
//!
//! Table and column names are the only tokens interpolated into generated
//! SQL, so every one of them goes through [`validate_identifier`] first.

/// Longest identifier accepted (PostgreSQL truncates beyond 63 bytes)
pub const MAX_IDENTIFIER_LEN: usize = 63;

/// Why an identifier was rejected
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdentifierViolation {
    #[error("identifier is empty")]
    Empty,

    #[error("identifier is {len} characters long (max {max})", max = MAX_IDENTIFIER_LEN)]
    TooLong { len: usize },

    #[error("illegal character {ch:?} at position {position}")]
    IllegalCharacter { ch: char, position: usize },
}

/// Check a name against `[A-Za-z0-9_]+`.
pub fn validate_identifier(name: &str) -> Result<(), IdentifierViolation> {
    if name.is_empty() {
        return Err(IdentifierViolation::Empty);
    }

    if let Some((position, ch)) = name
        .chars()
        .enumerate()
        .find(|(_, c)| !(c.is_ascii_alphanumeric() || *c == '_'))
    {
        return Err(IdentifierViolation::IllegalCharacter { ch, position });
    }

    if name.len() > MAX_IDENTIFIER_LEN {
        return Err(IdentifierViolation::TooLong { len: name.len() });
    }

    Ok(())
}

pub fn is_valid_identifier(name: &str) -> bool {
    validate_identifier(name).is_ok()
}

/// Case-folded form used for uniqueness checks.
///
/// Unquoted identifiers are case-insensitive on every supported backend, so
/// `Notes` and `notes` name the same physical table.
pub fn identifier_key(name: &str) -> String {
    name.to_ascii_lowercase()
}
