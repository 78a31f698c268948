use std::io::Read;

use super::session::{TransferSession, encode};
use crate::tftp::core::{BLOCK_SIZE, Packet, Step, Transport, TransferError};

/// Upload answered by ACK packets from the server (WRQ)
///
/// `file` must already be open; the source is read one block ahead of the
/// network, never re-read, so retransmissions reuse the exact same bytes.
pub fn send_file<S: Transport, R: Read>(
    session: &mut TransferSession<S>,
    request: &[u8],
    mut file: R,
) -> Result<(), TransferError> {
    // The server acknowledges the WRQ itself with the current block number (0)
    let first = session.block;
    session.exchange(request, |packet| match packet {
        Packet::Ack(block) if block == first => Ok(Step::Accept(())),
        Packet::Error { code, msg } => Err(TransferError::Server { code, message: msg }),
        other => Ok(Step::Rewait(format!(
            "Unexpected {} in reply to WRQ",
            describe(&other)
        ))),
    })?;
    log::debug!("Write request acknowledged");

    loop {
        let block_num = session.block.wrapping_add(1);
        let chunk = read_block(&mut file)?;
        let len = chunk.len();
        let bytes = encode(&Packet::Data {
            block_num,
            data: chunk,
        })?;

        session.exchange(&bytes, |packet| match packet {
            Packet::Ack(block) if block == block_num => Ok(Step::Accept(())),
            Packet::Ack(block) => Ok(Step::Retry(format!(
                "Received ACK {}, expected {}",
                block, block_num
            ))),
            Packet::Error { code, msg } => Err(TransferError::Server { code, message: msg }),
            other => Ok(Step::Retry(format!(
                "Unexpected {} while waiting for ACK {}",
                other.kind(),
                block_num
            ))),
        })?;

        session.block = block_num;
        session.bytes += len as u64;
        session.blocks += 1;
        log::debug!("Block {} acknowledged ({} bytes)", block_num, len);

        // A short block, possibly empty, marks the end of the file
        if len < BLOCK_SIZE {
            return Ok(());
        }
    }
}

// Fills one block, looping over short reads so only end of file yields less than BLOCK_SIZE
fn read_block<R: Read>(file: &mut R) -> Result<Vec<u8>, TransferError> {
    let mut chunk = Vec::with_capacity(BLOCK_SIZE);
    file.take(BLOCK_SIZE as u64)
        .read_to_end(&mut chunk)
        .map_err(TransferError::LocalIo)?;
    Ok(chunk)
}

fn describe(packet: &Packet) -> String {
    match packet {
        Packet::Ack(block) => format!("ACK {}", block),
        Packet::Data { block_num, .. } => format!("DATA {}", block_num),
        other => other.kind().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tftp::core::testing::{ScriptedTransport, addr};
    use crate::tftp::core::{Mode, Operation, RetryTimer};
    use std::io::Cursor;
    use std::time::Duration;

    fn wrq(name: &str) -> Vec<u8> {
        Packet::Request {
            operation: Operation::Write,
            filename: name.to_string(),
            mode: Mode::Octet,
        }
        .serialize()
        .unwrap()
    }

    fn session(transport: ScriptedTransport) -> TransferSession<ScriptedTransport> {
        TransferSession::new(
            transport,
            addr(69),
            RetryTimer::new(3, Duration::from_millis(10)),
        )
    }

    fn data_blocks(sent: &[Packet]) -> Vec<(u16, usize)> {
        sent.iter()
            .filter_map(|p| match p {
                Packet::Data { block_num, data } => Some((*block_num, data.len())),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_exact_block_ends_with_empty_data() {
        let mut transport = ScriptedTransport::new();
        transport.push(Packet::Ack(0), addr(5001));
        transport.push(Packet::Ack(1), addr(5001));
        transport.push(Packet::Ack(2), addr(5001));

        let mut session = session(transport);
        send_file(&mut session, &wrq("up.bin"), Cursor::new(vec![7u8; 512])).unwrap();

        assert_eq!(session.bytes, 512);
        let transport = session.into_transport();
        let sent = transport.sent_packets();
        assert_eq!(sent.len(), 3);
        assert_eq!(data_blocks(&sent), vec![(1, 512), (2, 0)]);
        // WRQ to the well-known port, data to the transfer port
        assert_eq!(transport.sent[0].1, addr(69));
        assert_eq!(transport.sent[1].1, addr(5001));
        assert_eq!(transport.sent[2].1, addr(5001));
    }

    #[test]
    fn test_two_block_multiple_sends_trailing_empty_block() {
        let mut transport = ScriptedTransport::new();
        for block in 0..=3 {
            transport.push(Packet::Ack(block), addr(5001));
        }

        let mut session = session(transport);
        send_file(&mut session, &wrq("up.bin"), Cursor::new(vec![1u8; 1024])).unwrap();

        let sent = session.into_transport().sent_packets();
        assert_eq!(data_blocks(&sent), vec![(1, 512), (2, 512), (3, 0)]);
    }

    #[test]
    fn test_empty_file_sends_one_empty_block() {
        let mut transport = ScriptedTransport::new();
        transport.push(Packet::Ack(0), addr(5001));
        transport.push(Packet::Ack(1), addr(5001));

        let mut session = session(transport);
        send_file(&mut session, &wrq("empty"), Cursor::new(Vec::new())).unwrap();

        let sent = session.into_transport().sent_packets();
        assert_eq!(data_blocks(&sent), vec![(1, 0)]);
    }

    #[test]
    fn test_mismatched_ack_resends_same_block() {
        let mut transport = ScriptedTransport::new();
        transport.push(Packet::Ack(0), addr(5001));
        transport.push(Packet::Ack(0), addr(5001));
        transport.push(Packet::Ack(1), addr(5001));

        let mut session = session(transport);
        send_file(&mut session, &wrq("up.bin"), Cursor::new(b"hello".to_vec())).unwrap();

        let transport = session.into_transport();
        let sent = transport.sent_packets();
        assert_eq!(data_blocks(&sent), vec![(1, 5), (1, 5)]);
        assert_eq!(transport.sent[1].0, transport.sent[2].0);
    }

    #[test]
    fn test_unexpected_first_reply_rewaits_without_resending_wrq() {
        let mut transport = ScriptedTransport::new();
        transport.push(Packet::Ack(7), addr(5001));
        transport.push(Packet::Ack(0), addr(5001));
        transport.push(Packet::Ack(1), addr(5001));

        let mut session = session(transport);
        send_file(&mut session, &wrq("up.bin"), Cursor::new(b"x".to_vec())).unwrap();

        let sent = session.into_transport().sent_packets();
        assert_eq!(sent.len(), 2);
        assert!(matches!(sent[0], Packet::Request { operation: Operation::Write, .. }));
    }

    #[test]
    fn test_error_at_step_zero_aborts() {
        let mut transport = ScriptedTransport::new();
        transport.push(
            Packet::Error {
                code: 6,
                msg: "File already exists".to_string(),
            },
            addr(5001),
        );

        let mut session = session(transport);
        let err = send_file(&mut session, &wrq("up.bin"), Cursor::new(b"x".to_vec())).unwrap_err();

        match err {
            TransferError::Server { code, message } => {
                assert_eq!(code, 6);
                assert_eq!(message, "File already exists");
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(session.into_transport().sent.len(), 1);
    }

    #[test]
    fn test_timeout_on_data_resends_identical_block() {
        let mut transport = ScriptedTransport::new();
        transport.push(Packet::Ack(0), addr(5001));
        transport.push_timeout();
        transport.push(Packet::Ack(1), addr(5001));

        let mut session = session(transport);
        send_file(&mut session, &wrq("up.bin"), Cursor::new(vec![3u8; 100])).unwrap();

        assert_eq!(session.retransmits(), 1);
        let transport = session.into_transport();
        assert_eq!(transport.sent.len(), 3);
        assert_eq!(transport.sent[1].0, transport.sent[2].0);
    }

    #[test]
    fn test_no_ack_exhausts_budget() {
        let mut transport = ScriptedTransport::new();
        transport.push(Packet::Ack(0), addr(5001));

        let mut session = session(transport);
        let err = send_file(&mut session, &wrq("up.bin"), Cursor::new(vec![3u8; 600])).unwrap_err();

        assert!(matches!(err, TransferError::NoResponse { attempts: 3 }));
        assert_eq!(session.bytes, 0);
    }

    #[test]
    fn test_block_number_wraps_to_zero() {
        let mut transport = ScriptedTransport::new();
        transport.push(Packet::Ack(65534), addr(5001));
        transport.push(Packet::Ack(65535), addr(5001));
        transport.push(Packet::Ack(0), addr(5001));

        let mut session = session(transport);
        session.block = 65534;
        send_file(&mut session, &wrq("up.bin"), Cursor::new(vec![9u8; 700])).unwrap();

        let sent = session.into_transport().sent_packets();
        assert_eq!(data_blocks(&sent), vec![(65535, 512), (0, 188)]);
    }
}
