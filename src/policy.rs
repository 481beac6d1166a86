//! Composition rules for app and master passwords.
//!
//! These gate what a person may *choose* as a secret. The derivation
//! alphabet in `derive` is a separate, wider character set.

use std::fmt;

/// Special characters a chosen password must draw from.
const REQUIRED_SPECIALS: &str = "$#@!*";

const MIN_LEN: usize = 8;

/// A composition rule violated by a candidate password.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Problem {
    TooShort,
    MissingLetterCase,
    MissingDigit,
    MissingSpecial,
    MatchesAppPassword,
}

impl fmt::Display for Problem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Problem::TooShort => write!(f, "password must be at least {MIN_LEN} characters"),
            Problem::MissingLetterCase => {
                write!(f, "password must contain capital and lowercase letters")
            }
            Problem::MissingDigit => write!(f, "password must contain digits"),
            Problem::MissingSpecial => write!(
                f,
                "password must contain special characters: '{REQUIRED_SPECIALS}'"
            ),
            Problem::MatchesAppPassword => {
                write!(f, "master password must not match app password")
            }
        }
    }
}

/// Checks `text` against every composition rule.
///
/// Returns all violated rules so the caller can report the complete list;
/// an empty vec means the password is acceptable. The app-password
/// inequality rule for master candidates is layered on top by the façade.
pub fn validate_password(text: &str) -> Vec<Problem> {
    let mut problems = Vec::new();

    if text.chars().count() < MIN_LEN {
        problems.push(Problem::TooShort);
    }
    if !text.chars().any(|c| c.is_ascii_lowercase()) || !text.chars().any(|c| c.is_ascii_uppercase())
    {
        problems.push(Problem::MissingLetterCase);
    }
    if !text.chars().any(|c| c.is_ascii_digit()) {
        problems.push(Problem::MissingDigit);
    }
    if !text.chars().any(|c| REQUIRED_SPECIALS.contains(c)) {
        problems.push(Problem::MissingSpecial);
    }

    problems
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn well_formed_password_passes() {
        assert!(validate_password("Abcdef1$").is_empty());
    }

    #[test]
    fn short_password_is_flagged() {
        assert_eq!(validate_password("Ab1$xyz"), vec![Problem::TooShort]);
    }

    #[test]
    fn missing_uppercase_is_flagged() {
        assert_eq!(
            validate_password("abcdef1$"),
            vec![Problem::MissingLetterCase]
        );
    }

    #[test]
    fn missing_lowercase_is_flagged() {
        assert_eq!(
            validate_password("ABCDEF1$"),
            vec![Problem::MissingLetterCase]
        );
    }

    #[test]
    fn missing_digit_is_flagged() {
        assert_eq!(validate_password("Abcdefg$"), vec![Problem::MissingDigit]);
    }

    #[test]
    fn missing_special_is_flagged() {
        assert_eq!(validate_password("Abcdefg1"), vec![Problem::MissingSpecial]);
    }

    #[test]
    fn specials_outside_the_required_set_do_not_count() {
        // '%' is in the derivation alphabet but not in the input policy set
        assert_eq!(validate_password("Abcdefg1%"), vec![Problem::MissingSpecial]);
    }

    #[test]
    fn all_violations_are_reported_together() {
        let problems = validate_password("");
        assert_eq!(
            problems,
            vec![
                Problem::TooShort,
                Problem::MissingLetterCase,
                Problem::MissingDigit,
                Problem::MissingSpecial,
            ]
        );
    }

    #[test]
    fn length_counts_characters_not_bytes() {
        // eight characters, sixteen bytes
        assert!(!validate_password("éééééééé").contains(&Problem::TooShort));
    }
}
