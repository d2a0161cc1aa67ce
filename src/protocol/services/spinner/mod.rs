//! Polling helpers for superloop firmware.
//!
//! Each call does a bounded amount of work and never waits: frames are taken
//! from the driver while it has some (up to a limit), and the transmit queue
//! is drained until the driver reports its mailboxes full.
use crate::error::SpinError;
#[cfg(feature = "defmt")]
use crate::protocol::node::RxOutcome;
use crate::protocol::node::{Node, TransferHandler};
use crate::protocol::services::node_info::NodeServices;
use crate::protocol::transport::traits::can_driver::{CanDriver, TxStatus};
use crate::protocol::transport::traits::clock::MonotonicClock;
use crate::protocol::transport::CLEANUP_INTERVAL_USEC;

/// Frames handled per [`Spinner::spin`] call by default.
pub const DEFAULT_RX_BURST: usize = 16;

//==================================================================================FLUSH
/// Hand queued frames to the driver, highest priority first.
///
/// A frame leaves the queue once the driver accepted it. The loop stops at
/// the first [`TxStatus::Busy`]. On a driver error the frame is dropped and
/// the error returned. Returns the number of frames accepted.
pub fn flush_tx_queue<D: CanDriver, const S: usize, const N: usize>(
    node: &mut Node<'_, S, N>,
    driver: &mut D,
) -> Result<usize, SpinError<D::Error>> {
    let mut sent = 0;
    while let Some(frame) = node.peek_tx() {
        match driver.transmit(&frame) {
            Ok(TxStatus::Accepted) => {
                node.pop_tx();
                sent += 1;
            }
            Ok(TxStatus::Busy) => break,
            Err(err) => {
                node.pop_tx();
                #[cfg(feature = "defmt")]
                defmt::warn!("Frame {:#X} dropped: driver error", frame.id.0);
                return Err(SpinError::Transmit(err));
            }
        }
    }
    Ok(sent)
}

//==================================================================================RECEIVE
/// Feed at most `max_frames` received frames to the node, timestamped with
/// `clock`. Returns the number of frames taken from the driver.
pub fn receive_frames<D, K, H, const S: usize, const N: usize>(
    node: &mut Node<'_, S, N>,
    driver: &mut D,
    clock: &K,
    handler: &mut H,
    max_frames: usize,
) -> Result<usize, SpinError<D::Error>>
where
    D: CanDriver,
    K: MonotonicClock + ?Sized,
    H: TransferHandler + ?Sized,
{
    let mut received = 0;
    while received < max_frames {
        let Some(frame) = driver.receive().map_err(SpinError::Receive)? else {
            break;
        };
        received += 1;

        let _outcome = node
            .handle_rx_frame(&frame, clock.now_usec(), handler)
            .map_err(SpinError::Rx)?;
        #[cfg(feature = "defmt")]
        if let RxOutcome::Discarded(reason) = _outcome {
            defmt::trace!("Frame {:#X} discarded: {}", frame.id.0, reason);
        }
    }
    Ok(received)
}

//==================================================================================SPINNER
/// Work done by one [`Spinner::spin`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SpinReport {
    pub received: usize,
    pub transmitted: usize,
    pub heartbeat_sent: bool,
    pub cleaned_up: bool,
}

/// Superloop driver: one [`spin`](Spinner::spin) per loop iteration keeps the
/// node receiving, publishing its heartbeat, discarding stale transfers and
/// transmitting.
pub struct Spinner<D, K> {
    driver: D,
    clock: K,
    rx_burst: usize,
    last_cleanup_usec: u64,
}

impl<D: CanDriver, K: MonotonicClock> Spinner<D, K> {
    pub fn new(driver: D, clock: K) -> Self {
        let last_cleanup_usec = clock.now_usec();
        Self {
            driver,
            clock,
            rx_burst: DEFAULT_RX_BURST,
            last_cleanup_usec,
        }
    }

    /// Bound the frames handled per spin (at least one).
    pub fn with_rx_burst(mut self, rx_burst: usize) -> Self {
        self.rx_burst = rx_burst.max(1);
        self
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    pub fn driver_mut(&mut self) -> &mut D {
        &mut self.driver
    }

    pub fn clock(&self) -> &K {
        &self.clock
    }

    /// Receive, publish the heartbeat when due, clean up about once per
    /// second, then flush the transmit queue.
    ///
    /// A failing step does not prevent the transmit queue from being flushed
    /// first; the first error met is returned.
    pub fn spin<A: TransferHandler, const S: usize, const N: usize>(
        &mut self,
        node: &mut Node<'_, S, N>,
        services: &mut NodeServices<A>,
    ) -> Result<SpinReport, SpinError<D::Error>> {
        let mut report = SpinReport::default();

        let received = receive_frames(node, &mut self.driver, &self.clock, services, self.rx_burst);
        let mut first_error = match received {
            Ok(count) => {
                report.received = count;
                None
            }
            Err(err) => Some(err),
        };

        let now = self.clock.now_usec();
        match services.poll_heartbeat(&mut node.publisher(), now) {
            Ok(sent) => report.heartbeat_sent = sent,
            Err(err) => {
                first_error.get_or_insert(SpinError::Publish(err));
            }
        }

        if now.saturating_sub(self.last_cleanup_usec) >= CLEANUP_INTERVAL_USEC {
            node.cleanup_stale_transfers(now);
            self.last_cleanup_usec = now;
            report.cleaned_up = true;
        }

        match flush_tx_queue(node, &mut self.driver) {
            Ok(count) => report.transmitted = count,
            Err(err) => {
                first_error.get_or_insert(err);
            }
        }

        match first_error {
            Some(err) => Err(err),
            None => Ok(report),
        }
    }
}

//==================================================================================TESTS
#[cfg(test)]
#[path = "tests.rs"]
mod tests;
