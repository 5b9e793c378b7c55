//! Mailbox access and message decomposition error types.

use thiserror::Error;

/// Errors that can occur while talking to the mailbox or decomposing messages.
#[derive(Error, Debug)]
pub enum EmailError {
    /// Failed to connect to the IMAP server.
    #[error("IMAP connection failed: {0}")]
    ConnectionFailed(String),

    /// TLS/SSL error during connection.
    #[error("TLS error: {0}")]
    TlsError(String),

    /// Authentication failed.
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// Failed to retrieve credentials.
    #[error("Credentials not available: {0}")]
    CredentialsNotFound(String),

    /// IMAP protocol error.
    #[error("IMAP protocol error: {0}")]
    ProtocolError(String),

    /// Folder not found.
    #[error("IMAP folder '{0}' not found")]
    FolderNotFound(String),

    /// A fetched message carried no body section.
    #[error("Message UID {uid} has no body section")]
    MissingBody { uid: u32 },

    /// The message body is not parseable as MIME.
    #[error("Failed to parse email: {0}")]
    ParseError(String),

    /// Reading a MIME part failed.
    #[error("Failed to read MIME part of UID {uid}: {reason}")]
    PartRead { uid: u32, reason: String },

    /// The consumer stopped receiving messages.
    #[error("Mail channel closed before the fetch completed")]
    ChannelClosed,

    /// Invalid configuration.
    #[error("Invalid configuration: {0}")]
    ConfigError(String),
}

impl From<async_native_tls::Error> for EmailError {
    fn from(err: async_native_tls::Error) -> Self {
        EmailError::TlsError(err.to_string())
    }
}

impl From<async_imap::error::Error> for EmailError {
    fn from(err: async_imap::error::Error) -> Self {
        EmailError::ProtocolError(err.to_string())
    }
}

/// Result type for email operations.
pub type Result<T> = std::result::Result<T, EmailError>;
