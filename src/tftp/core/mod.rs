//! TFTP core protocol implementation
//!
//! This module contains the core components of the TFTP client:
//! - `packet`: Packet serialization and deserialization
//! - `socket`: Transport abstraction and peer pinning
//! - `retry`: Timeout and retransmission of one outstanding request
//! - `error`: Terminal transfer errors

mod error;
pub mod packet;
mod retry;
mod socket;

#[cfg(test)]
pub(crate) mod testing;

// Public core types
pub use error::TransferError;
pub use packet::{BLOCK_SIZE, ErrorCode, FormatError, Mode, Operation, Packet};
pub use retry::{DEFAULT_RETRY_LIMIT, DEFAULT_TIMEOUT, RetryTimer, Step};
pub use socket::{PinnedSocket, Received, RecvError, Transport};
