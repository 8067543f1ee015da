//! Error types for the oVirt management crate.

use std::fmt;

use serde::Serialize;

/// Categorised error kinds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum OvirtErrorKind {
    /// Engine unreachable, session acquisition or verification failed
    Connection,
    /// Authentication failed (401)
    Authentication,
    /// Malformed or incomplete declarative VM document
    Validation,
    /// Identifier / name resolution yielded zero matches, or engine 404
    NotFound,
    /// A specific disk or NIC entry could not be attached
    Attachment,
    /// A power-state poll exceeded its deadline
    Timeout,
    /// Permission denied (403)
    AccessDenied,
    /// HTTP / API error with status code
    Api(u16),
    /// JSON parse / deserialization error
    Parse,
    /// Generic
    Other,
}

/// Crate error type carrying a kind + human-readable message.
#[derive(Debug, Clone, Serialize)]
pub struct OvirtError {
    pub kind: OvirtErrorKind,
    pub message: String,
}

impl OvirtError {
    pub fn new(kind: OvirtErrorKind, msg: impl Into<String>) -> Self {
        Self { kind, message: msg.into() }
    }

    pub fn connection(msg: impl Into<String>) -> Self {
        Self::new(OvirtErrorKind::Connection, msg)
    }

    pub fn auth(msg: impl Into<String>) -> Self {
        Self::new(OvirtErrorKind::Authentication, msg)
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::new(OvirtErrorKind::Validation, msg)
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::new(OvirtErrorKind::NotFound, msg)
    }

    pub fn attachment(msg: impl Into<String>) -> Self {
        Self::new(OvirtErrorKind::Attachment, msg)
    }

    pub fn timeout(msg: impl Into<String>) -> Self {
        Self::new(OvirtErrorKind::Timeout, msg)
    }

    pub fn api(status: u16, msg: impl Into<String>) -> Self {
        Self::new(OvirtErrorKind::Api(status), msg)
    }

    pub fn parse(msg: impl Into<String>) -> Self {
        Self::new(OvirtErrorKind::Parse, msg)
    }
}

impl fmt::Display for OvirtError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:?}] {}", self.kind, self.message)
    }
}

impl std::error::Error for OvirtError {}

impl From<OvirtError> for String {
    fn from(e: OvirtError) -> String {
        e.to_string()
    }
}

impl From<reqwest::Error> for OvirtError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::timeout(format!("HTTP timeout: {e}"))
        } else if e.is_connect() {
            Self::connection(format!("Connection failed: {e}"))
        } else {
            Self::new(OvirtErrorKind::Other, format!("HTTP error: {e}"))
        }
    }
}

impl From<serde_json::Error> for OvirtError {
    fn from(e: serde_json::Error) -> Self {
        Self::parse(format!("JSON parse error: {e}"))
    }
}

/// Convenience alias.
pub type OvirtResult<T> = Result<T, OvirtError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_includes_kind_and_message() {
        let err = OvirtError::validation("missing required field \"memory\"");
        let s = err.to_string();
        assert!(s.contains("Validation"));
        assert!(s.contains("missing required field \"memory\""));
    }

    #[test]
    fn api_error_carries_status() {
        let err = OvirtError::api(409, "VM is locked");
        assert_eq!(err.kind, OvirtErrorKind::Api(409));
        assert!(err.to_string().contains("VM is locked"));
    }

    #[test]
    fn json_error_maps_to_parse_kind() {
        let bad = serde_json::from_str::<serde_json::Value>("{not json");
        let err: OvirtError = bad.unwrap_err().into();
        assert_eq!(err.kind, OvirtErrorKind::Parse);
    }
}
