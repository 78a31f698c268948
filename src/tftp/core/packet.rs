use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Payload size of a full data block (RFC 1350)
pub const BLOCK_SIZE: usize = 512;

/// Opcode plus block number
pub const HEADER_SIZE: usize = 4;

/// Largest datagram exchanged during a transfer
pub const MAX_DATAGRAM_SIZE: usize = HEADER_SIZE + BLOCK_SIZE;

/// Reasons a datagram could not be decoded or a packet could not be encoded
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormatError {
    #[error("packet too short: {len} bytes")]
    Truncated { len: usize },
    #[error("unknown opcode: {0}")]
    UnknownOpcode(u16),
    #[error("missing NUL terminator after {0}")]
    MissingTerminator(&'static str),
    #[error("{0} is not valid UTF-8")]
    Encoding(&'static str),
    #[error("unsupported transfer mode '{0}'")]
    UnknownMode(String),
    #[error("{0} contains a NUL byte")]
    EmbeddedNul(&'static str),
}

/// Direction of a transfer as carried by the request opcode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Read,
    Write,
}

impl FromStr for Operation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "READ" => Ok(Operation::Read),
            "WRITE" => Ok(Operation::Write),
            _ => Err(s.to_string()),
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Read => f.write_str("READ"),
            Operation::Write => f.write_str("WRITE"),
        }
    }
}

/// Transfer mode named in a request
///
/// Both modes move file bytes unchanged; the mode is passed through to the
/// server which may apply its own line-ending translation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    NetAscii,
    Octet,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::NetAscii => "netascii",
            Mode::Octet => "octet",
        }
    }
}

impl FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "netascii" => Ok(Mode::NetAscii),
            "octet" => Ok(Mode::Octet),
            _ => Err(s.to_string()),
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error codes defined by RFC 1350
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum ErrorCode {
    NotDefined = 0,
    FileNotFound = 1,
    AccessViolation = 2,
    DiskFull = 3,
    IllegalOperation = 4,
    UnknownTransferId = 5,
    FileExists = 6,
    NoSuchUser = 7,
}

impl ErrorCode {
    /// Maps a wire code to its RFC meaning, `None` for codes outside the table
    pub fn from_code(code: u16) -> Option<Self> {
        match code {
            0 => Some(ErrorCode::NotDefined),
            1 => Some(ErrorCode::FileNotFound),
            2 => Some(ErrorCode::AccessViolation),
            3 => Some(ErrorCode::DiskFull),
            4 => Some(ErrorCode::IllegalOperation),
            5 => Some(ErrorCode::UnknownTransferId),
            6 => Some(ErrorCode::FileExists),
            7 => Some(ErrorCode::NoSuchUser),
            _ => None,
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            ErrorCode::NotDefined => "not defined",
            ErrorCode::FileNotFound => "file not found",
            ErrorCode::AccessViolation => "access violation",
            ErrorCode::DiskFull => "disk full or allocation exceeded",
            ErrorCode::IllegalOperation => "illegal TFTP operation",
            ErrorCode::UnknownTransferId => "unknown transfer ID",
            ErrorCode::FileExists => "file already exists",
            ErrorCode::NoSuchUser => "no such user",
        }
    }
}

/// TFTP packet
///
/// Decoded once at the socket boundary; sessions match on the variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Packet {
    Request {
        operation: Operation,
        filename: String,
        mode: Mode,
    },
    Data {
        block_num: u16,
        data: Vec<u8>,
    },
    Ack(u16),
    Error {
        code: u16,
        msg: String,
    },
}

const OP_RRQ: u16 = 1;
const OP_WRQ: u16 = 2;
const OP_DATA: u16 = 3;
const OP_ACK: u16 = 4;
const OP_ERROR: u16 = 5;

impl Packet {
    pub fn serialize(&self) -> Result<Vec<u8>, FormatError> {
        let mut bytes = Vec::with_capacity(MAX_DATAGRAM_SIZE);

        match self {
            Packet::Request {
                operation,
                filename,
                mode,
            } => {
                if filename.as_bytes().contains(&0) {
                    return Err(FormatError::EmbeddedNul("filename"));
                }
                let opcode = match operation {
                    Operation::Read => OP_RRQ,
                    Operation::Write => OP_WRQ,
                };
                bytes.extend_from_slice(&opcode.to_be_bytes());
                bytes.extend_from_slice(filename.as_bytes());
                bytes.push(0);
                bytes.extend_from_slice(mode.as_str().as_bytes());
                bytes.push(0);
            }
            Packet::Data { block_num, data } => {
                bytes.extend_from_slice(&OP_DATA.to_be_bytes());
                bytes.extend_from_slice(&block_num.to_be_bytes());
                bytes.extend_from_slice(data);
            }
            Packet::Ack(block_num) => {
                bytes.extend_from_slice(&OP_ACK.to_be_bytes());
                bytes.extend_from_slice(&block_num.to_be_bytes());
            }
            Packet::Error { code, msg } => {
                if msg.as_bytes().contains(&0) {
                    return Err(FormatError::EmbeddedNul("error message"));
                }
                bytes.extend_from_slice(&OP_ERROR.to_be_bytes());
                bytes.extend_from_slice(&code.to_be_bytes());
                bytes.extend_from_slice(msg.as_bytes());
                bytes.push(0);
            }
        }

        Ok(bytes)
    }

    pub fn deserialize(buf: &[u8]) -> Result<Self, FormatError> {
        if buf.len() < 2 {
            return Err(FormatError::Truncated { len: buf.len() });
        }

        let opcode = u16::from_be_bytes([buf[0], buf[1]]);
        match opcode {
            OP_RRQ | OP_WRQ => {
                let (filename, rest) = read_cstr(&buf[2..], "filename")?;
                let (mode, _) = read_cstr(rest, "mode")?;
                let mode = mode.parse::<Mode>().map_err(FormatError::UnknownMode)?;
                let operation = if opcode == OP_RRQ {
                    Operation::Read
                } else {
                    Operation::Write
                };

                Ok(Packet::Request {
                    operation,
                    filename,
                    mode,
                })
            }
            OP_DATA => {
                let block_num = read_block(buf)?;
                Ok(Packet::Data {
                    block_num,
                    data: buf[HEADER_SIZE..].to_vec(),
                })
            }
            OP_ACK => Ok(Packet::Ack(read_block(buf)?)),
            OP_ERROR => {
                let code = read_block(buf)?;
                // A missing terminator is tolerated: the message runs to the end of the datagram
                let body = &buf[HEADER_SIZE..];
                let end = body.iter().position(|&b| b == 0).unwrap_or(body.len());
                let msg = String::from_utf8_lossy(&body[..end]).into_owned();

                Ok(Packet::Error { code, msg })
            }
            _ => Err(FormatError::UnknownOpcode(opcode)),
        }
    }

    /// Short name of the packet kind, for log lines
    pub fn kind(&self) -> &'static str {
        match self {
            Packet::Request {
                operation: Operation::Read,
                ..
            } => "RRQ",
            Packet::Request {
                operation: Operation::Write,
                ..
            } => "WRQ",
            Packet::Data { .. } => "DATA",
            Packet::Ack(_) => "ACK",
            Packet::Error { .. } => "ERROR",
        }
    }
}

fn read_block(buf: &[u8]) -> Result<u16, FormatError> {
    if buf.len() < HEADER_SIZE {
        return Err(FormatError::Truncated { len: buf.len() });
    }
    Ok(u16::from_be_bytes([buf[2], buf[3]]))
}

// Reads a NUL-terminated string, returning it together with the bytes after the terminator
fn read_cstr<'a>(buf: &'a [u8], field: &'static str) -> Result<(String, &'a [u8]), FormatError> {
    let pos = buf
        .iter()
        .position(|&b| b == 0)
        .ok_or(FormatError::MissingTerminator(field))?;
    let s = std::str::from_utf8(&buf[..pos])
        .map_err(|_| FormatError::Encoding(field))?
        .to_string();
    Ok((s, &buf[pos + 1..]))
}
