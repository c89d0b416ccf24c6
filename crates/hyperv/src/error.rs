//! Error types for Hyper-V reconciliation.
//!
//! Only fatal conditions are errors. An absent resource is an observation
//! that drives the create path, and drift is recorded as a change; neither
//! ever appears here.

use thiserror::Error;

/// Errors that stop the reconciliation of a resource
#[derive(Debug, Error)]
pub enum Error {
    /// A handler was called with a resource of another kind
    #[error("type mismatch: {expected} handler cannot reconcile {found}")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },

    /// A required fact about the target host is false
    #[error("precondition failed: {0}")]
    PreconditionFailed(String),

    /// The Hyper-V role is missing and may not be installed
    #[error(
        "Hyper-V is not installed on target and not set to install. \
         Please manually install Hyper-V or set the install parameter to 'true'."
    )]
    NotInstalledAndInstallNotPermitted,

    /// The remote executor failed to run a command
    #[error(transparent)]
    Transport(#[from] pwshkit::Error),

    /// Command output could not be parsed
    #[error("failed to parse {what}: {source}")]
    Parse {
        what: &'static str,
        #[source]
        source: serde_json::Error,
    },

    /// A declared size could not be understood
    #[error("invalid size: {0}")]
    InvalidSize(String),
}

impl Error {
    /// Returns true if the error came from the command channel
    pub fn is_transport(&self) -> bool {
        matches!(self, Error::Transport(_))
    }
}

/// Result type for Hyper-V reconciliation
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_installed_message_has_remediation() {
        let msg = Error::NotInstalledAndInstallNotPermitted.to_string();
        assert!(msg.contains("Please manually install Hyper-V"));
        assert!(msg.contains("install parameter"));
    }

    #[test]
    fn test_transport_is_passed_through() {
        let err = Error::from(pwshkit::Error::Unreachable {
            host: "hv01".into(),
            stderr: "Connection refused".into(),
        });
        assert!(err.is_transport());
        assert_eq!(err.to_string(), "cannot reach hv01: Connection refused");
    }
}
