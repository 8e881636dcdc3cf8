//! Shared-secret gate for websocket upgrades.
//!
//! The single security control in front of session allocation: a request
//! that fails here never gets a shell process or a PTY device.

use subtle::ConstantTimeEq;

/// Check the presented credential against the configured secret.
///
/// Uses constant-time comparison (`subtle::ConstantTimeEq`): both operands
/// are compared in full regardless of where they first differ. A missing
/// credential, or a server with no secret configured, is always
/// unauthorized.
pub fn authorize(presented: Option<&str>, expected: Option<&str>) -> bool {
    match (presented, expected) {
        (Some(p), Some(e)) => p.as_bytes().ct_eq(e.as_bytes()).into(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matching_credential_authorized() {
        assert!(authorize(Some("hunter2"), Some("hunter2")));
    }

    #[test]
    fn test_wrong_credential_rejected() {
        assert!(!authorize(Some("hunter3"), Some("hunter2")));
        assert!(!authorize(Some(""), Some("hunter2")));
        assert!(!authorize(Some("hunter22"), Some("hunter2")));
    }

    #[test]
    fn test_missing_credential_rejected() {
        assert!(!authorize(None, Some("hunter2")));
    }

    #[test]
    fn test_unconfigured_secret_rejects_everything() {
        assert!(!authorize(Some("anything"), None));
        assert!(!authorize(None, None));
    }
}
