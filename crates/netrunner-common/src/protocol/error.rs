use thiserror::Error;

#[derive(Error, Debug)]
pub enum NetrunnerError {
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Node name already in use: {0}")]
    DuplicateName(String),

    #[error("Node not found: {0}")]
    NotFound(String),

    #[error("Failed to launch node {name}: {reason}")]
    Launch { name: String, reason: String },

    #[error("Node {name} not healthy after {timeout_ms}ms")]
    HealthTimeout { name: String, timeout_ms: u64 },

    #[error("Node {0} process exited")]
    ProcessExited(String),

    #[error("Node {0} is in a terminal state")]
    NodeFailed(String),

    #[error("Failed to stop node {name}: {reason}")]
    Stop { name: String, reason: String },

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Network has been stopped")]
    NetworkStopped,

    #[error("Identity error: {0}")]
    Identity(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Request timeout after {0}ms")]
    Timeout(u64),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("JSON serialization error: {0}")]
    JsonSerialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl NetrunnerError {
    /// Builds a launch error for `name`.
    pub fn launch(name: impl Into<String>, reason: impl ToString) -> Self {
        NetrunnerError::Launch {
            name: name.into(),
            reason: reason.to_string(),
        }
    }

    /// Builds a stop error for `name`.
    pub fn stop(name: impl Into<String>, reason: impl ToString) -> Self {
        NetrunnerError::Stop {
            name: name.into(),
            reason: reason.to_string(),
        }
    }
}

impl From<rcgen::Error> for NetrunnerError {
    fn from(err: rcgen::Error) -> Self {
        NetrunnerError::Identity(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, NetrunnerError>;
