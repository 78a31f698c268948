use std::io;

use thiserror::Error;

use super::packet::{ErrorCode, FormatError};

/// Terminal outcome of a failed transfer
#[derive(Debug, Error)]
pub enum TransferError {
    /// Operation other than READ or WRITE requested
    #[error("invalid operation '{0}', expected READ or WRITE")]
    InvalidOperation(String),

    /// Transfer mode other than netascii or octet requested
    #[error("invalid transfer mode '{0}', expected netascii or octet")]
    InvalidMode(String),

    /// Request could not be encoded (e.g. NUL in the filename)
    #[error("invalid request: {0}")]
    InvalidRequest(FormatError),

    /// Retry budget spent waiting for a reply
    #[error("no response from server after {attempts} attempts")]
    NoResponse { attempts: u32 },

    /// Error packet received from the server
    #[error("server error {code} ({}): {message}", describe(.code))]
    Server { code: u16, message: String },

    /// Local file could not be opened, read or written
    #[error("local I/O error: {0}")]
    LocalIo(#[source] io::Error),

    /// Sending or receiving on the socket failed
    #[error("network error: {0}")]
    Network(#[source] io::Error),

    /// Retry budget spent on datagrams that could not be decoded
    #[error("malformed reply from server: {0}")]
    Malformed(#[from] FormatError),

    /// Retry budget spent on well-formed but unexpected replies
    #[error("protocol error: {0}")]
    Anomaly(String),

    /// Transfer interrupted by the user
    #[error("transfer cancelled")]
    Cancelled,
}

fn describe(code: &u16) -> &'static str {
    ErrorCode::from_code(*code)
        .map(|c| c.description())
        .unwrap_or("unknown code")
}
