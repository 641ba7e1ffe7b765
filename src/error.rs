use miette::Diagnostic;
use thiserror::Error;

/// Main error type for the application
#[derive(Debug, Error, Diagnostic)]
pub enum Error {
    #[error("Mailbox error: {0}")]
    #[diagnostic(code(kutsubotti::mailbox))]
    Mailbox(String),

    #[error("Storage error: {0}")]
    #[diagnostic(code(kutsubotti::storage))]
    Storage(String),

    #[error("Invite build error: {0}")]
    #[diagnostic(code(kutsubotti::invite))]
    InviteBuild(String),

    #[error("Dispatch error: {0}")]
    #[diagnostic(code(kutsubotti::dispatch))]
    Dispatch(String),

    #[error("Environment error: {0}")]
    #[diagnostic(code(kutsubotti::environment))]
    Environment(String),

    #[error("Configuration error: {0}")]
    #[diagnostic(code(kutsubotti::config))]
    Config(String),

    #[error(transparent)]
    #[diagnostic(code(kutsubotti::io))]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    #[diagnostic(code(kutsubotti::serialization))]
    Serialization(String),

    #[error("Other error: {0}")]
    #[diagnostic(code(kutsubotti::other))]
    Other(String),
}

// Faults from the database layer abort the batch, so keep the conversion lossless
impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

// Implement From for TOML deserialization errors
impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

/// Type alias for Result with our Error type
pub type BotResult<T> = Result<T, Error>;

/// Helper to create environment errors
pub fn env_error(var: &str) -> Error {
    Error::Environment(format!("Missing environment variable: {}", var))
}

/// Helper to create configuration errors
pub fn config_error(message: &str) -> Error {
    Error::Config(message.to_string())
}

/// Helper to create mailbox errors
pub fn mailbox_error(message: &str) -> Error {
    Error::Mailbox(message.to_string())
}

/// Helper to create storage errors
pub fn storage_error(message: &str) -> Error {
    Error::Storage(message.to_string())
}

/// Helper to create invite build errors
pub fn invite_error(message: &str) -> Error {
    Error::InviteBuild(message.to_string())
}

/// Helper to create dispatch errors
pub fn dispatch_error(message: &str) -> Error {
    Error::Dispatch(message.to_string())
}
