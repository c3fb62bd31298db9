//! Error types for ldapdb
//!
//! This module defines the failures a backend operation can raise. The
//! protocol engine turns each one into an LDAP result code.

use thiserror::Error;

/// Common result type for ldapdb operations
pub type Result<T> = std::result::Result<T, Error>;

/// LDAP result codes for the failures raised by the backend (RFC 4511 4.1.9)
pub mod result_code {
    pub const NO_SUCH_OBJECT: u32 = 32;
    pub const UNWILLING_TO_PERFORM: u32 = 53;
    pub const ENTRY_ALREADY_EXISTS: u32 = 68;
    pub const OTHER: u32 = 80;
}

/// Common error type for ldapdb
#[derive(Debug, Error)]
pub enum Error {
    // Directory errors
    #[error("no such object: {dn}")]
    NoSuchObject { dn: String },

    #[error("entry already exists: {dn}")]
    EntryAlreadyExists { dn: String },

    #[error("unwilling to perform: {0}")]
    UnwillingToPerform(String),

    // Persistence errors
    #[error("snapshot I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("snapshot error: {0}")]
    Snapshot(String),

    #[error("lock error: {0}")]
    Lock(String),

    // Internal errors
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a no-such-object error for the given DN
    pub fn no_such_object(dn: impl Into<String>) -> Self {
        Self::NoSuchObject { dn: dn.into() }
    }

    /// Create an entry-already-exists error for the given DN
    pub fn entry_already_exists(dn: impl Into<String>) -> Self {
        Self::EntryAlreadyExists { dn: dn.into() }
    }

    /// Create an unwilling-to-perform error
    pub fn unwilling_to_perform(msg: impl Into<String>) -> Self {
        Self::UnwillingToPerform(msg.into())
    }

    /// Create a new internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Check if this is a not found error
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NoSuchObject { .. })
    }

    /// Get the LDAP result code the protocol engine should answer with
    #[must_use]
    pub const fn result_code(&self) -> u32 {
        match self {
            Self::NoSuchObject { .. } => result_code::NO_SUCH_OBJECT,
            Self::UnwillingToPerform(_) => result_code::UNWILLING_TO_PERFORM,
            Self::EntryAlreadyExists { .. } => result_code::ENTRY_ALREADY_EXISTS,
            Self::Io(_)
            | Self::Snapshot(_)
            | Self::Lock(_)
            | Self::Internal(_) => result_code::OTHER,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_not_found() {
        assert!(Error::no_such_object("cn=bob").is_not_found());
        assert!(!Error::entry_already_exists("cn=bob").is_not_found());
        assert!(!Error::unwilling_to_perform("OneLevel not implemented").is_not_found());
    }

    #[test]
    fn test_error_result_code() {
        assert_eq!(Error::no_such_object("cn=bob").result_code(), 32);
        assert_eq!(Error::unwilling_to_perform("x").result_code(), 53);
        assert_eq!(Error::entry_already_exists("cn=bob").result_code(), 68);
        assert_eq!(Error::internal("boom").result_code(), 80);
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        assert_eq!(Error::from(io).result_code(), 80);
    }

    #[test]
    fn test_error_display_names_dn() {
        let err = Error::no_such_object("cn=carol,dc=example,dc=com");
        assert_eq!(err.to_string(), "no such object: cn=carol,dc=example,dc=com");
    }
}
