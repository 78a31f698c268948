use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use super::error::TransferError;
use super::packet::FormatError;
use super::socket::{PinnedSocket, Received, Transport};
use super::Packet;

pub const DEFAULT_RETRY_LIMIT: u32 = 3;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(3);

/// Caller's verdict on a decoded reply
pub enum Step<T> {
    /// Expected reply; the exchange is complete.
    Accept(T),
    /// Stale reply: send `bytes` to the peer, charge an attempt and keep
    /// waiting without resending the request.
    Answer(Vec<u8>, String),
    /// Unexpected reply: charge an attempt and resend the request.
    Retry(String),
    /// Unexpected reply: charge an attempt and wait again without resending.
    Rewait(String),
}

enum Failure {
    Timeout,
    Malformed(FormatError),
    Anomaly(String),
}

/// Outstanding-request timer with a bounded retry budget
///
/// Every attempt resends the identical request bytes. Each datagram that does
/// not complete the exchange consumes one attempt, whether it timed out, could
/// not be decoded, came from a stray source or was rejected by the caller, so
/// a round trip never waits longer than `limit × timeout`. Errors returned by
/// the classifier end the exchange at once.
#[derive(Debug, Clone)]
pub struct RetryTimer {
    limit: u32,
    timeout: Duration,
    cancel: Arc<AtomicBool>,
    retransmits: u64,
}

impl Default for RetryTimer {
    fn default() -> Self {
        Self::new(DEFAULT_RETRY_LIMIT, DEFAULT_TIMEOUT)
    }
}

impl RetryTimer {
    pub fn new(limit: u32, timeout: Duration) -> Self {
        Self {
            limit: limit.max(1),
            timeout,
            cancel: Arc::new(AtomicBool::new(false)),
            retransmits: 0,
        }
    }

    /// Aborts exchanges with [`TransferError::Cancelled`] once `cancel` is set
    pub fn with_cancel(mut self, cancel: Arc<AtomicBool>) -> Self {
        self.cancel = cancel;
        self
    }

    /// Requests sent again after the first attempt, over the timer's lifetime
    pub fn retransmits(&self) -> u64 {
        self.retransmits
    }

    /// Sends `request` and waits for a reply that `classify` accepts.
    pub fn exchange<S, T, F>(
        &mut self,
        socket: &mut PinnedSocket<S>,
        request: &[u8],
        mut classify: F,
    ) -> Result<T, TransferError>
    where
        S: Transport,
        F: FnMut(Packet) -> Result<Step<T>, TransferError>,
    {
        let mut attempts = 0;
        let mut resend = true;
        let mut sent_once = false;
        let mut last = Failure::Timeout;

        while attempts < self.limit {
            if self.cancel.load(Ordering::SeqCst) {
                return Err(TransferError::Cancelled);
            }

            if resend {
                if sent_once {
                    self.retransmits += 1;
                }
                socket.send(request).map_err(TransferError::Network)?;
                sent_once = true;
            }

            match socket.recv(self.timeout).map_err(TransferError::Network)? {
                Received::Timeout => {
                    attempts += 1;
                    log::warn!("Timeout, retrying... ({}/{})", attempts, self.limit);
                    last = Failure::Timeout;
                    resend = true;
                }
                Received::Stray(src) => {
                    attempts += 1;
                    log::warn!(
                        "Ignoring datagram from unknown source {} ({}/{})",
                        src,
                        attempts,
                        self.limit
                    );
                    resend = false;
                }
                Received::Malformed(e) => {
                    attempts += 1;
                    log::warn!("Dropping malformed datagram: {} ({}/{})", e, attempts, self.limit);
                    last = Failure::Malformed(e);
                    resend = false;
                }
                Received::Packet(packet) => match classify(packet)? {
                    Step::Accept(value) => return Ok(value),
                    Step::Answer(bytes, reason) => {
                        attempts += 1;
                        log::warn!("{}, answering ({}/{})", reason, attempts, self.limit);
                        socket.send(&bytes).map_err(TransferError::Network)?;
                        last = Failure::Anomaly(reason);
                        resend = false;
                    }
                    Step::Retry(reason) => {
                        attempts += 1;
                        log::warn!("{}, resending ({}/{})", reason, attempts, self.limit);
                        last = Failure::Anomaly(reason);
                        resend = true;
                    }
                    Step::Rewait(reason) => {
                        attempts += 1;
                        log::warn!("{}, waiting again ({}/{})", reason, attempts, self.limit);
                        last = Failure::Anomaly(reason);
                        resend = false;
                    }
                },
            }
        }

        Err(match last {
            Failure::Timeout => TransferError::NoResponse {
                attempts: self.limit,
            },
            Failure::Malformed(e) => TransferError::Malformed(e),
            Failure::Anomaly(reason) => TransferError::Anomaly(reason),
        })
    }
}
