//! TFTP (Trivial File Transfer Protocol) client
//!
//! Stop-and-wait transfers as described in
//! [RFC 1350](https://www.rfc-editor.org/rfc/rfc1350) TFTP Protocol version 2:
//! one outstanding packet at a time, explicit acknowledgment, bounded
//! retransmission and 16-bit block numbers that wrap around.
//!
//! ## Module Structure
//!
//! ```text
//! tftp/
//! ├── core/           # Core protocol implementation
//! │   ├── packet      # Packet serialization/deserialization
//! │   ├── socket      # Transport abstraction, peer pinning
//! │   ├── retry       # Timeout and retransmission
//! │   └── error       # Transfer errors
//! │
//! └── client/         # TFTP client
//!     ├── read        # Download session
//!     ├── write       # Upload session
//!     └── config      # Client configuration
//! ```
//!
//! ## Usage Examples
//!
//! ```rust,no_run
//! use tftpc::tftp::client::{Client, TransferRequest};
//! use tftpc::tftp::client::config::ClientConfig;
//!
//! let client = Client::new(ClientConfig::new("10.0.0.2".to_string(), 69)).unwrap();
//! let request = TransferRequest::parse("READ", "pxelinux.0", "octet").unwrap();
//! let report = client.transfer(&request).unwrap();
//! println!("{}", report);
//! ```

// Submodules
pub mod client;
pub mod core;
