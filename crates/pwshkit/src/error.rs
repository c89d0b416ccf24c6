use thiserror::Error;

/// Errors raised while running commands on a host.
///
/// A command that runs and reports an error of its own (a cmdlet writing
/// to the error stream) is not an [`Error`]: its text is returned in the
/// [`Output`](crate::Output) for the caller to interpret. These variants
/// cover failures of the channel itself.
#[derive(Debug, Error)]
pub enum Error {
    /// The interpreter or ssh client could not be started
    #[error("failed to launch {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The interpreter is not installed where it was expected
    #[error("{0} not found - PowerShell is required on the target")]
    InterpreterNotFound(String),

    /// The remote host could not be reached
    #[error("cannot reach {host}: {stderr}")]
    Unreachable { host: String, stderr: String },

    /// A script ran but exited unsuccessfully
    #[error("script failed on {host} (exit code {code:?}): {stderr}")]
    ScriptFailed {
        host: String,
        code: Option<i32>,
        stderr: String,
    },

    /// IO error while talking to the child process
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Returns true if the command never reached the target
    pub fn is_connection(&self) -> bool {
        matches!(
            self,
            Error::Spawn { .. } | Error::InterpreterNotFound(_) | Error::Unreachable { .. }
        )
    }
}

/// Result type for command execution
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classification() {
        let unreachable = Error::Unreachable {
            host: "hv01".into(),
            stderr: "Connection refused".into(),
        };
        assert!(unreachable.is_connection());

        let failed = Error::ScriptFailed {
            host: "hv01".into(),
            code: Some(1),
            stderr: "New-VM : access denied".into(),
        };
        assert!(!failed.is_connection());
        assert_eq!(
            failed.to_string(),
            "script failed on hv01 (exit code Some(1)): New-VM : access denied"
        );
    }
}
