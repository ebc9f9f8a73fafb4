use std::io;

/// Failure of a single tool call. The runtime turns these into tool messages for the model.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ToolError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Timed out: {0}")]
    Timeout(String),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("{0}")]
    Other(String),
}

impl From<io::Error> for ToolError {
    fn from(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound => ToolError::NotFound(err.to_string()),
            io::ErrorKind::PermissionDenied => ToolError::PermissionDenied(err.to_string()),
            io::ErrorKind::InvalidData => ToolError::InvalidArgument(err.to_string()),
            _ => ToolError::Io(err.to_string()),
        }
    }
}

impl From<rusqlite::Error> for ToolError {
    fn from(err: rusqlite::Error) -> Self {
        ToolError::Other(format!("Database error: {}", err))
    }
}

impl From<tokio::task::JoinError> for ToolError {
    fn from(err: tokio::task::JoinError) -> Self {
        ToolError::Other(format!("Tool task failed: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_kinds_map_to_variants() {
        let missing = io::Error::new(io::ErrorKind::NotFound, "gone");
        assert!(matches!(ToolError::from(missing), ToolError::NotFound(_)));

        let denied = io::Error::new(io::ErrorKind::PermissionDenied, "nope");
        assert!(matches!(
            ToolError::from(denied),
            ToolError::PermissionDenied(_)
        ));

        let other = io::Error::new(io::ErrorKind::BrokenPipe, "pipe");
        assert!(matches!(ToolError::from(other), ToolError::Io(_)));
    }
}
