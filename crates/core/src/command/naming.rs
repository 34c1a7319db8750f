//! Display-name normalisation
//!
//! Command names show up in diagnostic s-expressions, so they are kept to a
//! single token: whitespace becomes `_` and camel case becomes lowercase
//! hyphenated words (`DriveForward` renders as `drive-forward`). A leading
//! backslash opts out of the rewrite and keeps the rest of the name as is.

use alloc::string::String;
use alloc::vec::Vec;

/// Normalise a user supplied command name.
///
/// # Panics
///
/// Panics if `name` is blank.
pub fn rename(name: &str) -> String {
    let trimmed = name.trim();
    assert!(!trimmed.is_empty(), "cannot have a blank command name");

    if let Some(literal) = trimmed.strip_prefix('\\') {
        if !literal.is_empty() {
            return String::from(literal);
        }
    }

    let single_token: String = trimmed
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_");

    let mut words: Vec<String> = Vec::new();
    let mut current = String::new();
    for c in single_token.chars() {
        if c.is_uppercase() && !current.is_empty() {
            words.push(core::mem::take(&mut current));
        }
        current.extend(c.to_lowercase());
    }
    if !current.is_empty() {
        words.push(current);
    }
    words.join("-")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rename_plain() {
        assert_eq!(rename("1"), "1");
        assert_eq!(rename("execute"), "execute");
        assert_eq!(rename("finished?"), "finished?");
    }

    #[test]
    fn test_rename_camel_case() {
        assert_eq!(rename("DriveForward"), "drive-forward");
        assert_eq!(rename("liftArmUp"), "lift-arm-up");
    }

    #[test]
    fn test_rename_whitespace() {
        assert_eq!(rename("  score high  "), "score_high");
        assert_eq!(rename("Score High"), "score_-high");
    }

    #[test]
    fn test_rename_literal() {
        assert_eq!(rename("\\StateOne"), "StateOne");
        assert_eq!(rename("\\"), "\\");
    }

    #[test]
    #[should_panic(expected = "blank command name")]
    fn test_rename_blank_panics() {
        rename("   ");
    }
}
