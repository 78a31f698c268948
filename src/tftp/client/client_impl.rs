use std::fmt;
use std::fs::File;
use std::io;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr, ToSocketAddrs, UdpSocket};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::time::Duration;

use super::config::ClientConfig;
use super::read::receive_file;
use super::session::{TransferSession, encode};
use super::write::send_file;
use crate::tftp::core::{
    DEFAULT_RETRY_LIMIT, DEFAULT_TIMEOUT, Mode, Operation, Packet, RetryTimer, Transport,
    TransferError,
};

/// A validated transfer request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferRequest {
    pub operation: Operation,
    /// File name on the server
    pub filename: String,
    /// Local path read from (WRITE) or written to (READ)
    pub local_file: PathBuf,
    pub mode: Mode,
}

impl TransferRequest {
    pub fn new(operation: Operation, filename: &str, mode: Mode) -> Self {
        Self {
            operation,
            filename: filename.to_string(),
            local_file: PathBuf::from(filename),
            mode,
        }
    }

    /// Validates operation and mode strings, both case-insensitive.
    pub fn parse(operation: &str, filename: &str, mode: &str) -> Result<Self, TransferError> {
        let operation = operation
            .parse::<Operation>()
            .map_err(TransferError::InvalidOperation)?;
        let mode = mode.parse::<Mode>().map_err(TransferError::InvalidMode)?;

        Ok(Self::new(operation, filename, mode))
    }

    pub fn with_local_file(mut self, local_file: PathBuf) -> Self {
        self.local_file = local_file;
        self
    }
}

/// Summary of a completed transfer
#[derive(Debug, Clone)]
pub struct TransferReport {
    pub operation: Operation,
    pub bytes: u64,
    pub blocks: u64,
    pub retransmits: u64,
    pub elapsed: Duration,
    pub peer: Option<SocketAddr>,
}

impl TransferReport {
    /// Throughput in bytes per second
    pub fn rate(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 { self.bytes as f64 / secs } else { 0.0 }
    }
}

impl fmt::Display for TransferReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} bytes in {} blocks, {:.3}s, {:.2} KB/s, {} retransmissions",
            self.bytes,
            self.blocks,
            self.elapsed.as_secs_f64(),
            self.rate() / 1024.0,
            self.retransmits
        )
    }
}

/// What has to be in hand before the first packet goes out
enum Prepared {
    Read,
    Write(File),
}

/// TFTP client
///
/// Supports file upload (WRITE) and download (READ), one stop-and-wait
/// transfer per call. The server name is resolved per transfer, after the
/// local checks, so a request that fails locally never reaches DNS.
pub struct Client {
    host: String,
    port: u16,
    bind: Option<IpAddr>,
    retries: u32,
    timeout: Duration,
    cancel: Arc<AtomicBool>,
}

impl Client {
    /// Create a new TFTP client
    pub fn new(config: ClientConfig) -> anyhow::Result<Self> {
        let host = config
            .server
            .ok_or_else(|| anyhow::anyhow!("Server address not specified"))?;
        let bind = config
            .bind
            .map(|bind| {
                bind.parse()
                    .map_err(|e| anyhow::anyhow!("Invalid bind address '{}': {}", bind, e))
            })
            .transpose()?;

        Ok(Self {
            host,
            port: config.port.unwrap_or(69),
            bind,
            retries: config.retries.unwrap_or(DEFAULT_RETRY_LIMIT),
            timeout: config.timeout.unwrap_or(DEFAULT_TIMEOUT),
            cancel: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Share a flag that aborts the running transfer once set
    pub fn with_cancel(mut self, cancel: Arc<AtomicBool>) -> Self {
        self.cancel = cancel;
        self
    }

    /// Download a file from the server (RRQ - Read Request)
    pub fn get(
        &self,
        remote_file: &str,
        local_file: &Path,
        mode: Mode,
    ) -> Result<TransferReport, TransferError> {
        let request = TransferRequest::new(Operation::Read, remote_file, mode)
            .with_local_file(local_file.to_path_buf());
        self.transfer(&request)
    }

    /// Upload a file to the server (WRQ - Write Request)
    pub fn put(
        &self,
        local_file: &Path,
        remote_file: &str,
        mode: Mode,
    ) -> Result<TransferReport, TransferError> {
        let request = TransferRequest::new(Operation::Write, remote_file, mode)
            .with_local_file(local_file.to_path_buf());
        self.transfer(&request)
    }

    /// Runs one transfer over a fresh UDP socket
    pub fn transfer(&self, request: &TransferRequest) -> Result<TransferReport, TransferError> {
        let (wire, prepared) = self.prepare(request)?;
        let server = self.resolve()?;
        let bind = self.bind.unwrap_or(match server {
            SocketAddr::V4(_) => IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            SocketAddr::V6(_) => IpAddr::V6(Ipv6Addr::UNSPECIFIED),
        });
        let socket = UdpSocket::bind(SocketAddr::new(bind, 0)).map_err(TransferError::Network)?;
        self.run(socket, server, request, wire, prepared)
    }

    /// Runs one transfer over the given transport
    pub fn transfer_with<S: Transport>(
        &self,
        socket: S,
        request: &TransferRequest,
    ) -> Result<TransferReport, TransferError> {
        let (wire, prepared) = self.prepare(request)?;
        let server = self.resolve()?;
        self.run(socket, server, request, wire, prepared)
    }

    fn resolve(&self) -> Result<SocketAddr, TransferError> {
        let server = (self.host.as_str(), self.port)
            .to_socket_addrs()
            .map_err(TransferError::Network)?
            .next()
            .ok_or_else(|| {
                TransferError::Network(io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("no address found for '{}'", self.host),
                ))
            })?;
        log::debug!("Resolved {} to {}", self.host, server);
        Ok(server)
    }

    // Local checks that must pass before any network traffic
    fn prepare(&self, request: &TransferRequest) -> Result<(Vec<u8>, Prepared), TransferError> {
        let wire = encode(&Packet::Request {
            operation: request.operation,
            filename: request.filename.clone(),
            mode: request.mode,
        })?;

        let prepared = match request.operation {
            Operation::Read => Prepared::Read,
            Operation::Write => {
                let file = File::open(&request.local_file).map_err(|e| {
                    log::error!("Cannot open {}: {}", request.local_file.display(), e);
                    TransferError::LocalIo(e)
                })?;
                Prepared::Write(file)
            }
        };

        Ok((wire, prepared))
    }

    fn run<S: Transport>(
        &self,
        socket: S,
        server: SocketAddr,
        request: &TransferRequest,
        wire: Vec<u8>,
        prepared: Prepared,
    ) -> Result<TransferReport, TransferError> {
        let timer =
            RetryTimer::new(self.retries, self.timeout).with_cancel(Arc::clone(&self.cancel));
        let mut session = TransferSession::new(socket, server, timer);

        match prepared {
            Prepared::Read => {
                log::info!(
                    "Downloading {} to {}",
                    request.filename,
                    request.local_file.display()
                );
                receive_file(&mut session, &wire, &request.local_file)?;
            }
            Prepared::Write(file) => {
                log::info!(
                    "Uploading {} to {}",
                    request.local_file.display(),
                    request.filename
                );
                send_file(&mut session, &wire, file)?;
            }
        }

        Ok(TransferReport {
            operation: request.operation,
            bytes: session.bytes,
            blocks: session.blocks,
            retransmits: session.retransmits(),
            elapsed: session.elapsed(),
            peer: session.peer(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tftp::core::testing::{ScriptedTransport, addr};
    use std::fs;
    use tempfile::TempDir;

    fn client() -> Client {
        let config = ClientConfig::new("127.0.0.1".to_string(), 69)
            .with_timeout(Duration::from_millis(10))
            .with_retries(3);
        Client::new(config).unwrap()
    }

    #[test]
    fn test_parse_rejects_bad_operation_and_mode() {
        assert!(matches!(
            TransferRequest::parse("DELETE", "f", "octet"),
            Err(TransferError::InvalidOperation(op)) if op == "DELETE"
        ));
        assert!(matches!(
            TransferRequest::parse("read", "f", "mail"),
            Err(TransferError::InvalidMode(mode)) if mode == "mail"
        ));

        let request = TransferRequest::parse("write", "f.txt", "NetAscii").unwrap();
        assert_eq!(request.operation, Operation::Write);
        assert_eq!(request.mode, Mode::NetAscii);
        assert_eq!(request.local_file, PathBuf::from("f.txt"));
    }

    #[test]
    fn test_read_ten_bytes() {
        let dir = TempDir::new().unwrap();
        let local = dir.path().join("ten.bin");
        let mut transport = ScriptedTransport::new();
        transport.push(
            Packet::Data {
                block_num: 1,
                data: b"0123456789".to_vec(),
            },
            addr(3000),
        );

        let request = TransferRequest::parse("READ", "ten.bin", "octet")
            .unwrap()
            .with_local_file(local.clone());
        let report = client().transfer_with(transport, &request).unwrap();

        assert_eq!(report.bytes, 10);
        assert_eq!(report.blocks, 1);
        assert_eq!(report.peer, Some(addr(3000)));
        assert_eq!(fs::read(&local).unwrap(), b"0123456789");
    }

    #[test]
    fn test_write_512_bytes() {
        let dir = TempDir::new().unwrap();
        let local = dir.path().join("block.bin");
        fs::write(&local, vec![0x5A; 512]).unwrap();

        let mut transport = ScriptedTransport::new();
        transport.push(Packet::Ack(0), addr(3000));
        transport.push(Packet::Ack(1), addr(3000));
        transport.push(Packet::Ack(2), addr(3000));

        let request = TransferRequest::new(Operation::Write, "block.bin", Mode::Octet)
            .with_local_file(local);
        let report = client().transfer_with(transport, &request).unwrap();

        assert_eq!(report.bytes, 512);
        assert_eq!(report.blocks, 2);
        assert_eq!(report.retransmits, 0);
    }

    #[test]
    fn test_missing_source_fails_before_network() {
        let dir = TempDir::new().unwrap();
        let request = TransferRequest::new(Operation::Write, "nope.bin", Mode::Octet)
            .with_local_file(dir.path().join("nope.bin"));

        let err = client()
            .transfer_with(ScriptedTransport::new(), &request)
            .unwrap_err();
        assert!(matches!(err, TransferError::LocalIo(_)));
    }

    #[test]
    fn test_nul_in_filename_fails_before_network() {
        let request = TransferRequest::new(Operation::Read, "a\0b", Mode::Octet);
        let err = client()
            .transfer_with(ScriptedTransport::new(), &request)
            .unwrap_err();
        assert!(matches!(err, TransferError::InvalidRequest(_)));
    }

    #[test]
    fn test_cancelled_read_leaves_no_file() {
        let dir = TempDir::new().unwrap();
        let local = dir.path().join("cancel.bin");
        let cancel = Arc::new(AtomicBool::new(true));
        let request = TransferRequest::new(Operation::Read, "cancel.bin", Mode::Octet)
            .with_local_file(local.clone());

        let err = client()
            .with_cancel(cancel)
            .transfer_with(ScriptedTransport::new(), &request)
            .unwrap_err();
        assert!(matches!(err, TransferError::Cancelled));
        assert!(!local.exists());
    }

    #[test]
    fn test_missing_server_is_rejected() {
        assert!(Client::new(ClientConfig::default()).is_err());
    }

    #[test]
    fn test_missing_source_is_reported_before_resolving() {
        let dir = TempDir::new().unwrap();
        let config = ClientConfig::new("tftp.invalid".to_string(), 69);
        let request = TransferRequest::new(Operation::Write, "gone.bin", Mode::Octet)
            .with_local_file(dir.path().join("gone.bin"));

        let err = Client::new(config).unwrap().transfer(&request).unwrap_err();
        assert!(matches!(err, TransferError::LocalIo(_)));
    }

    #[test]
    fn test_invalid_bind_is_rejected() {
        let mut config = ClientConfig::new("127.0.0.1".to_string(), 69);
        config.bind = Some("not-an-ip".to_string());
        assert!(Client::new(config).is_err());
    }
}
