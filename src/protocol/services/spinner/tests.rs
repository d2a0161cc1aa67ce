use super::*;
use crate::infra::arena::Block;
use crate::protocol::messages::get_node_info::{NodeInfo, GET_NODE_INFO};
use crate::protocol::messages::node_status::NODE_STATUS;
use crate::protocol::node::{NodeConfig, Publisher};
use crate::protocol::services::heartbeat::Heartbeat;
use crate::protocol::transport::can_frame::CanFrame;
use crate::protocol::transport::can_id::CanId;
use crate::protocol::transport::multi_frame::builder::TransferBuilder;
use crate::protocol::transport::priority;
use crate::protocol::transport::transfer::{RxTransfer, TransferId};
use crate::core::{TransferType, DataTypeDescriptor, DataTypeKind};
use core::cell::Cell;

type TestNode<'a> = Node<'a, 4, 8>;

const BULK: DataTypeDescriptor = DataTypeDescriptor {
    name: "org.korri.Bulk",
    id: 1_000,
    signature: 0xAAAA_5555_0000_FFFF,
    kind: DataTypeKind::Message,
    max_size: 64,
};

/// Error reported by [`MockDriver`] when told to fail.
#[derive(Debug, PartialEq, Eq)]
struct DriverFault;

/// Fixed-capacity driver double: frames to receive, frames transmitted.
struct MockDriver {
    inbox: [Option<CanFrame>; 16],
    inbox_head: usize,
    inbox_len: usize,
    sent: [Option<CanFrame>; 32],
    sent_len: usize,
    /// Mailboxes left before reporting `Busy`.
    mailboxes: usize,
    fail_transmit: bool,
}

impl MockDriver {
    fn new() -> Self {
        Self {
            inbox: [None; 16],
            inbox_head: 0,
            inbox_len: 0,
            sent: [None; 32],
            sent_len: 0,
            mailboxes: usize::MAX,
            fail_transmit: false,
        }
    }

    fn inject(&mut self, frame: CanFrame) {
        let slot = (self.inbox_head + self.inbox_len) % self.inbox.len();
        self.inbox[slot] = Some(frame);
        self.inbox_len += 1;
    }

    fn sent(&self, index: usize) -> CanFrame {
        self.sent[index].unwrap()
    }
}

impl CanDriver for MockDriver {
    type Error = DriverFault;

    fn transmit(&mut self, frame: &CanFrame) -> Result<TxStatus, DriverFault> {
        if self.fail_transmit {
            return Err(DriverFault);
        }
        if self.mailboxes == 0 {
            return Ok(TxStatus::Busy);
        }
        self.mailboxes -= 1;
        self.sent[self.sent_len] = Some(*frame);
        self.sent_len += 1;
        Ok(TxStatus::Accepted)
    }

    fn receive(&mut self) -> Result<Option<CanFrame>, DriverFault> {
        if self.inbox_len == 0 {
            return Ok(None);
        }
        let frame = self.inbox[self.inbox_head].take();
        self.inbox_head = (self.inbox_head + 1) % self.inbox.len();
        self.inbox_len -= 1;
        Ok(frame)
    }
}

struct TestClock(Cell<u64>);

impl MonotonicClock for TestClock {
    fn now_usec(&self) -> u64 {
        self.0.get()
    }
}

/// Handler accepting BULK broadcasts.
#[derive(Default)]
struct BulkCounter(usize);

impl TransferHandler for BulkCounter {
    fn should_accept(&self, transfer_type: TransferType, data_type_id: u16, _source: u8) -> Option<u64> {
        BULK.matches(transfer_type, data_type_id).then_some(BULK.signature)
    }

    fn on_transfer_received(&mut self, _transfer: &RxTransfer<'_>, _publisher: &mut Publisher<'_, '_>) {
        self.0 += 1;
    }
}

fn services() -> NodeServices<BulkCounter> {
    NodeServices::new(BulkCounter::default(), NodeInfo::default(), Heartbeat::new(0))
}

fn bulk_frames(source: u8, transfer_id: u8, payload: &[u8]) -> impl Iterator<Item = CanFrame> + '_ {
    let id = CanId::builder(BULK.id, source).build().unwrap();
    TransferBuilder::new(id, TransferId::new(transfer_id), payload, BULK.signature).build()
}

//==================================================================================FLUSH
#[test]
fn test_flush_stops_on_busy() {
    let mut pool = [Block::EMPTY; 8];
    let mut node = TestNode::new(NodeConfig::new().with_node_id(42), &mut pool).unwrap();
    let mut transfer_id = TransferId::default();
    // 15 bytes + CRC: three frames
    node.broadcast(&BULK, &mut transfer_id, priority::MEDIUM, &[0x5A; 15])
        .unwrap();

    let mut driver = MockDriver::new();
    driver.mailboxes = 2;
    assert_eq!(flush_tx_queue(&mut node, &mut driver).unwrap(), 2);
    assert_eq!(node.tx_queue_len(), 1);

    driver.mailboxes = 2;
    assert_eq!(flush_tx_queue(&mut node, &mut driver).unwrap(), 1);
    assert_eq!(node.tx_queue_len(), 0);
    // start, middle, end in order
    assert_eq!(driver.sent(0).data[7] & 0xC0, 0x80);
    assert_eq!(driver.sent(1).data[7] & 0xC0, 0x00);
    assert_eq!(driver.sent(2).payload().last().unwrap() & 0xC0, 0x40);
}

#[test]
fn test_flush_drops_frame_on_driver_error() {
    let mut pool = [Block::EMPTY; 8];
    let mut node = TestNode::new(NodeConfig::new().with_node_id(42), &mut pool).unwrap();
    let mut transfer_id = TransferId::default();
    node.broadcast(&BULK, &mut transfer_id, priority::MEDIUM, &[1, 2])
        .unwrap();
    node.broadcast(&BULK, &mut transfer_id, priority::MEDIUM, &[3, 4])
        .unwrap();

    let mut driver = MockDriver::new();
    driver.fail_transmit = true;
    assert!(matches!(
        flush_tx_queue(&mut node, &mut driver),
        Err(SpinError::Transmit(DriverFault))
    ));
    assert_eq!(node.tx_queue_len(), 1);

    driver.fail_transmit = false;
    assert_eq!(flush_tx_queue(&mut node, &mut driver).unwrap(), 1);
    assert_eq!(&driver.sent(0).payload()[..2], &[3, 4]);
}

//==================================================================================RECEIVE
#[test]
fn test_receive_burst_is_bounded() {
    let mut pool = [Block::EMPTY; 8];
    let mut node = TestNode::new(NodeConfig::new().with_node_id(42), &mut pool).unwrap();
    let mut driver = MockDriver::new();
    for tid in 0..5 {
        for frame in bulk_frames(9, tid, &[tid; 4]) {
            driver.inject(frame);
        }
    }
    let clock = TestClock(Cell::new(0));
    let mut handler = BulkCounter::default();

    assert_eq!(receive_frames(&mut node, &mut driver, &clock, &mut handler, 3).unwrap(), 3);
    assert_eq!(handler.0, 3);
    assert_eq!(receive_frames(&mut node, &mut driver, &clock, &mut handler, 16).unwrap(), 2);
    assert_eq!(handler.0, 5);
    assert_eq!(receive_frames(&mut node, &mut driver, &clock, &mut handler, 16).unwrap(), 0);
}

//==================================================================================SPIN
#[test]
fn test_spin_publishes_heartbeat() {
    let mut pool = [Block::EMPTY; 8];
    let mut node = TestNode::new(NodeConfig::new().with_node_id(42), &mut pool).unwrap();
    let mut services = services();
    let clock = TestClock(Cell::new(0));
    let mut spinner = Spinner::new(MockDriver::new(), &clock);

    let report = spinner.spin(&mut node, &mut services).unwrap();
    assert!(report.heartbeat_sent);
    assert_eq!(report.transmitted, 1);
    assert_eq!(spinner.driver().sent(0).id.data_type_id(), NODE_STATUS.id);

    clock.0.set(100_000);
    let report = spinner.spin(&mut node, &mut services).unwrap();
    assert!(!report.heartbeat_sent);
    assert_eq!(report.transmitted, 0);

    clock.0.set(500_000);
    assert!(spinner.spin(&mut node, &mut services).unwrap().heartbeat_sent);
    assert_eq!(spinner.driver().sent_len, 2);
}

#[test]
fn test_spin_answers_get_node_info() {
    let mut pool = [Block::EMPTY; 32];
    let mut node = TestNode::new(NodeConfig::new().with_node_id(42), &mut pool).unwrap();
    let mut services = services();
    let clock = TestClock(Cell::new(0));
    let mut spinner = Spinner::new(MockDriver::new(), &clock).with_rx_burst(4);

    let request_id = CanId::builder(GET_NODE_INFO.id, 10)
        .with_priority(priority::HIGH)
        .request_to(42)
        .build()
        .unwrap();
    let request = CanFrame::from_parts(request_id, &[0xC3]).unwrap();
    spinner.driver_mut().inject(request);

    let report = spinner.spin(&mut node, &mut services).unwrap();
    assert_eq!(report.received, 1);
    assert!(report.heartbeat_sent);
    // response (7 frames for 41 bytes + CRC) then the heartbeat
    assert_eq!(report.transmitted, 8);

    let first = spinner.driver().sent(0);
    assert!(first.id.is_service());
    assert!(!first.id.is_request());
    assert_eq!(first.id.destination_node_id(), 10);
    assert_eq!(first.id.priority(), priority::HIGH);
    assert_eq!(first.data[7], 0x83);
    assert_eq!(spinner.driver().sent(7).id.data_type_id(), NODE_STATUS.id);
}

#[test]
fn test_spin_cleans_up_stale_sessions() {
    let mut pool = [Block::EMPTY; 8];
    let mut node = TestNode::new(NodeConfig::new().with_node_id(42), &mut pool).unwrap();
    let mut services = services();
    let clock = TestClock(Cell::new(0));
    let mut spinner = Spinner::new(MockDriver::new(), &clock);

    let mut frames = bulk_frames(9, 0, &[0x11; 20]);
    spinner.driver_mut().inject(frames.next().unwrap());
    let report = spinner.spin(&mut node, &mut services).unwrap();
    assert!(!report.cleaned_up);
    assert_eq!(node.active_sessions(), 1);

    clock.0.set(2_500_000);
    let report = spinner.spin(&mut node, &mut services).unwrap();
    assert!(report.cleaned_up);
    assert_eq!(node.active_sessions(), 0);
    assert_eq!(services.app().0, 0);
}

#[test]
fn test_spin_flushes_despite_receive_error() {
    struct BrokenInbox(MockDriver);

    impl CanDriver for BrokenInbox {
        type Error = DriverFault;
        fn transmit(&mut self, frame: &CanFrame) -> Result<TxStatus, DriverFault> {
            self.0.transmit(frame)
        }
        fn receive(&mut self) -> Result<Option<CanFrame>, DriverFault> {
            Err(DriverFault)
        }
    }

    let mut pool = [Block::EMPTY; 8];
    let mut node = TestNode::new(NodeConfig::new().with_node_id(42), &mut pool).unwrap();
    let mut services = services();
    let clock = TestClock(Cell::new(0));
    let mut spinner = Spinner::new(BrokenInbox(MockDriver::new()), &clock);

    assert!(matches!(
        spinner.spin(&mut node, &mut services),
        Err(SpinError::Receive(DriverFault))
    ));
    assert_eq!(node.tx_queue_len(), 0);
    assert_eq!(spinner.driver().0.sent_len, 1);
}
