//! Request parameter validation
//!
//! The gateway only ever sees resource keys that passed these checks.

use regex::Regex;
use std::sync::LazyLock;

pub const MAX_DIR_LENGTH: usize = 100;
pub const MAX_ID_LENGTH: usize = 19;

static DIR_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9_]{1,100}$").expect("valid dir regex"));

static ID_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]{1,19}$").expect("valid id regex"));

/// Namespace segment: alphanumeric or underscore, 1 to 100 characters.
pub fn is_valid_dir(dir: &str) -> bool {
    DIR_PATTERN.is_match(dir)
}

/// Identifier segment: 1 to 19 decimal digits.
pub fn is_valid_id(id: &str) -> bool {
    ID_PATTERN.is_match(id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dir_validation() {
        assert!(is_valid_dir("teamA"));
        assert!(is_valid_dir("team_a_2"));
        assert!(is_valid_dir(&"a".repeat(MAX_DIR_LENGTH)));
        assert!(!is_valid_dir(""));
        assert!(!is_valid_dir("bad dir!"));
        assert!(!is_valid_dir("../etc"));
        assert!(!is_valid_dir("team-a"));
        assert!(!is_valid_dir(&"a".repeat(MAX_DIR_LENGTH + 1)));
    }

    #[test]
    fn test_id_validation() {
        assert!(is_valid_id("1234567890"));
        assert!(is_valid_id("0"));
        assert!(is_valid_id(&"9".repeat(MAX_ID_LENGTH)));
        assert!(!is_valid_id(""));
        assert!(!is_valid_id("12a"));
        assert!(!is_valid_id("-1"));
        assert!(!is_valid_id(&"9".repeat(MAX_ID_LENGTH + 1)));
    }
}
