use std::fmt;

use crate::policy::Problem;

/// Errors from opening or decoding the encrypted profile.
#[derive(Debug)]
pub enum VaultError {
    /// The app password does not decrypt the profile.
    WrongPassword,
    /// The profile file is not a readable passforge profile.
    InvalidFormat(String),
}

impl fmt::Display for VaultError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VaultError::WrongPassword => write!(f, "wrong app password"),
            VaultError::InvalidFormat(reason) => write!(f, "invalid profile file: {reason}"),
        }
    }
}

impl std::error::Error for VaultError {}

/// Domain errors raised by the password manager.
#[derive(Debug)]
pub enum ManagerError {
    /// The app password violates the composition rules; carries every
    /// violated rule, not just the first.
    InvalidAppPassword(Vec<Problem>),
    /// The master password violates the composition rules or matches the
    /// app password; carries every violated rule.
    InvalidMasterPassword(Vec<Problem>),
    UnknownService(String),
    EmptyServiceLabel,
}

impl ManagerError {
    /// The violated rules behind a validation failure, if any.
    pub fn problems(&self) -> Option<&[Problem]> {
        match self {
            ManagerError::InvalidAppPassword(p) | ManagerError::InvalidMasterPassword(p) => Some(p),
            _ => None,
        }
    }
}

impl fmt::Display for ManagerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ManagerError::InvalidAppPassword(problems) => {
                write!(f, "invalid app password: {}", join(problems))
            }
            ManagerError::InvalidMasterPassword(problems) => {
                write!(f, "invalid master password: {}", join(problems))
            }
            ManagerError::UnknownService(label) => write!(f, "service '{label}' does not exist"),
            ManagerError::EmptyServiceLabel => {
                write!(f, "empty string can't represent a service")
            }
        }
    }
}

impl std::error::Error for ManagerError {}

fn join(problems: &[Problem]) -> String {
    problems
        .iter()
        .map(|p| p.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}
