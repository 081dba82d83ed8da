//! Shared utility functions

use crate::error::{Result, StateError};

/// Validate a model id.
///
/// Ids become part of composite storage keys, so only ASCII letters,
/// digits, `_` and `-` are accepted, and at least one of them.
///
/// ```
/// use skill_state::utils::validate_id;
///
/// assert!(validate_id("user-42_a").is_ok());
/// assert!(validate_id("abcd/f").is_err());
/// assert!(validate_id("").is_err());
/// ```
pub fn validate_id(id: &str) -> Result<()> {
    if !id.is_empty() && id.chars().all(is_valid_id_char) {
        Ok(())
    } else {
        Err(StateError::InvalidId(id.to_string()))
    }
}

fn is_valid_id_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '_' || ch == '-'
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_ids() {
        assert!(
            validate_id("abcdefghijklmnopqrstuvwxyz-ABCDEFGHIJKLMNOPQRSTUVWXYZ_0123456789").is_ok()
        );
        assert!(validate_id("a").is_ok());
        assert!(validate_id("-").is_ok());
    }

    #[test]
    fn test_invalid_ids() {
        for id in ["", "abcd/f", "a:b", "a b", "ümlaut", "a.b", "a\\b"] {
            assert!(
                matches!(validate_id(id), Err(StateError::InvalidId(ref bad)) if bad == id),
                "{id:?} should be rejected"
            );
        }
    }
}
