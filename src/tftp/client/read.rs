use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use super::session::{TransferSession, encode};
use crate::tftp::core::{BLOCK_SIZE, Packet, Step, Transport, TransferError};

/// Download driven by DATA packets from the server (RRQ)
///
/// The local file is created when the first expected block arrives. Any abort
/// after that point closes and removes it, so a failed download never leaves
/// a partial file behind.
pub fn receive_file<S: Transport>(
    session: &mut TransferSession<S>,
    request: &[u8],
    local_file: &Path,
) -> Result<(), TransferError> {
    let mut file = None;
    let result = receive_blocks(session, request, local_file, &mut file);

    if result.is_err() {
        if let Some(file) = file.take() {
            drop(file);
            match fs::remove_file(local_file) {
                Ok(()) => log::warn!("Removed partial file {}", local_file.display()),
                Err(e) => log::error!(
                    "Failed to remove partial file {}: {}",
                    local_file.display(),
                    e
                ),
            }
        }
    }

    result
}

fn receive_blocks<S: Transport>(
    session: &mut TransferSession<S>,
    request: &[u8],
    local_file: &Path,
    file: &mut Option<File>,
) -> Result<(), TransferError> {
    // Resent on timeout: the request until block 1 arrives, then the last ACK
    let mut pending = request.to_vec();

    loop {
        let expected = session.block.wrapping_add(1);
        let data = session.exchange(&pending, |packet| match packet {
            Packet::Data { block_num, data } if block_num == expected => {
                if data.len() > BLOCK_SIZE {
                    Ok(Step::Retry(format!(
                        "Block {} carries {} bytes, more than {}",
                        block_num,
                        data.len(),
                        BLOCK_SIZE
                    )))
                } else {
                    Ok(Step::Accept(data))
                }
            }
            Packet::Data { block_num, .. } => Ok(Step::Answer(
                encode(&Packet::Ack(block_num))?,
                format!("Received block {}, expected {}", block_num, expected),
            )),
            Packet::Error { code, msg } => Err(TransferError::Server { code, message: msg }),
            other => Ok(Step::Retry(format!(
                "Unexpected {} while waiting for block {}",
                other.kind(),
                expected
            ))),
        })?;

        if file.is_none() {
            log::debug!("Creating {}", local_file.display());
            *file = Some(File::create(local_file).map_err(TransferError::LocalIo)?);
        }
        if let Some(out) = file.as_mut() {
            out.write_all(&data).map_err(TransferError::LocalIo)?;
        }

        session.block = expected;
        session.bytes += data.len() as u64;
        session.blocks += 1;
        log::debug!("Block {} written ({} bytes)", expected, data.len());

        pending = encode(&Packet::Ack(expected))?;
        if data.len() < BLOCK_SIZE {
            session.send(&Packet::Ack(expected))?;
            if let Some(out) = file {
                out.flush().map_err(TransferError::LocalIo)?;
            }
            return Ok(());
        }
    }
}
