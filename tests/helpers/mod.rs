/// Test doubles simulating the CAN bus, the driver, the timer and the clock
/// during integration tests.
use korri_uavcan::protocol::transport::{
    can_frame::CanFrame,
    traits::{
        can_bus::CanBus,
        can_driver::{CanDriver, TxStatus},
        clock::MonotonicClock,
        korri_timer::KorriTimer,
    },
};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{mpsc, Mutex};
use tokio::time::{sleep, Duration};

#[derive(Clone)]
#[allow(dead_code)]
/// In-memory CAN bus reproducing the `CanBus` trait behavior.
pub struct MockCanBus {
    tx: mpsc::UnboundedSender<CanFrame>,
    rx: Arc<Mutex<mpsc::UnboundedReceiver<CanFrame>>>,
}

#[allow(dead_code)]
impl MockCanBus {
    /// Construct a pair of interconnected buses (DUT ↔ host).
    pub fn create_pair() -> (Self, Self) {
        let (dut_tx, host_rx) = mpsc::unbounded_channel();
        let (host_tx, dut_rx) = mpsc::unbounded_channel();

        let dut_bus = Self {
            tx: dut_tx,
            rx: Arc::new(Mutex::new(dut_rx)),
        };

        let host_bus = Self {
            tx: host_tx,
            rx: Arc::new(Mutex::new(host_rx)),
        };

        (dut_bus, host_bus)
    }
}

impl CanBus for MockCanBus {
    type Error = ();

    async fn send<'a>(&'a mut self, frame: &'a CanFrame) -> Result<(), Self::Error> {
        self.tx.send(*frame).map_err(|_| ())?;
        Ok(())
    }

    async fn recv(&mut self) -> Result<CanFrame, Self::Error> {
        let mut rx = self.rx.lock().await;
        rx.recv().await.ok_or(())
    }
}

#[allow(dead_code)]
/// Non-blocking driver over the same channels, for the polling spinner.
/// `mailboxes` frames are accepted per `refill`, then `Busy` is reported.
pub struct MockDriver {
    tx: mpsc::UnboundedSender<CanFrame>,
    rx: mpsc::UnboundedReceiver<CanFrame>,
    mailboxes: usize,
}

#[allow(dead_code)]
impl MockDriver {
    /// Two drivers wired to each other, with unlimited mailboxes.
    pub fn create_pair() -> (Self, Self) {
        let (a_tx, b_rx) = mpsc::unbounded_channel();
        let (b_tx, a_rx) = mpsc::unbounded_channel();
        (
            Self {
                tx: a_tx,
                rx: a_rx,
                mailboxes: usize::MAX,
            },
            Self {
                tx: b_tx,
                rx: b_rx,
                mailboxes: usize::MAX,
            },
        )
    }

    pub fn refill(&mut self, mailboxes: usize) {
        self.mailboxes = mailboxes;
    }
}

impl CanDriver for MockDriver {
    type Error = ();

    fn transmit(&mut self, frame: &CanFrame) -> Result<TxStatus, Self::Error> {
        if self.mailboxes == 0 {
            return Ok(TxStatus::Busy);
        }
        self.mailboxes = self.mailboxes.saturating_sub(1);
        self.tx.send(*frame).map_err(|_| ())?;
        Ok(TxStatus::Accepted)
    }

    fn receive(&mut self) -> Result<Option<CanFrame>, Self::Error> {
        match self.rx.try_recv() {
            Ok(frame) => Ok(Some(frame)),
            Err(mpsc::error::TryRecvError::Empty) => Ok(None),
            Err(mpsc::error::TryRecvError::Disconnected) => Err(()),
        }
    }
}

#[allow(dead_code)]
/// Timer based on `tokio::time::sleep` to drive delays in tests.
pub struct MockTimer;

impl KorriTimer for MockTimer {
    async fn delay_ms(&mut self, millis: u32) {
        sleep(Duration::from_millis(millis as u64)).await;
    }
}

#[allow(dead_code)]
/// Wall clock measured from creation.
pub struct StdClock(Instant);

#[allow(dead_code)]
impl StdClock {
    pub fn new() -> Self {
        Self(Instant::now())
    }
}

impl MonotonicClock for StdClock {
    fn now_usec(&self) -> u64 {
        self.0.elapsed().as_micros() as u64
    }
}

#[derive(Clone, Default)]
#[allow(dead_code)]
/// Manually advanced clock, shareable between a spinner and the test body.
pub struct ManualClock(Arc<AtomicU64>);

#[allow(dead_code)]
impl ManualClock {
    pub fn set(&self, now_usec: u64) {
        self.0.store(now_usec, Ordering::SeqCst);
    }

    pub fn advance(&self, delta_usec: u64) {
        self.0.fetch_add(delta_usec, Ordering::SeqCst);
    }
}

impl MonotonicClock for ManualClock {
    fn now_usec(&self) -> u64 {
        self.0.load(Ordering::SeqCst)
    }
}
