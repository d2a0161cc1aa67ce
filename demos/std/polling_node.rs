//! Superloop firmware shape on a desktop: a node driven by the polling
//! spinner over a loopback driver, answering a GetNodeInfo request injected
//! as if it came from the bus.

use std::collections::VecDeque;
use std::time::Instant;

use korri_uavcan::{
    core::TransferType,
    infra::arena::Block,
    protocol::{
        messages::{HardwareVersion, Mode, NodeInfo, SoftwareVersion, GET_NODE_INFO},
        node::{Node, NodeConfig, Publisher, TransferHandler},
        services::{spinner::Spinner, Heartbeat, NodeServices},
        transport::{
            can_frame::CanFrame,
            can_id::CanId,
            priority,
            traits::{
                can_driver::{CanDriver, TxStatus},
                clock::MonotonicClock,
            },
            transfer::RxTransfer,
        },
    },
};

/// Driver double: frames "received" are read from `inbox`, transmitted
/// frames are printed.
struct LoopbackDriver {
    inbox: VecDeque<CanFrame>,
}

impl CanDriver for LoopbackDriver {
    type Error = core::convert::Infallible;

    fn transmit(&mut self, frame: &CanFrame) -> Result<TxStatus, Self::Error> {
        println!("  TX 0x{:08X} {:02X?}", frame.id.0, frame.payload());
        Ok(TxStatus::Accepted)
    }

    fn receive(&mut self) -> Result<Option<CanFrame>, Self::Error> {
        Ok(self.inbox.pop_front())
    }
}

struct SystemClock(Instant);

impl MonotonicClock for SystemClock {
    fn now_usec(&self) -> u64 {
        self.0.elapsed().as_micros() as u64
    }
}

/// The application itself does not subscribe to anything.
struct Firmware;

impl TransferHandler for Firmware {
    fn should_accept(&self, _: TransferType, _: u16, _: u8) -> Option<u64> {
        None
    }

    fn on_transfer_received(&mut self, _: &RxTransfer<'_>, _: &mut Publisher<'_, '_>) {}
}

fn main() {
    println!("=== Polling node ===\n");

    let mut blocks = [Block::EMPTY; 64];
    let mut node: Node<'_> =
        Node::new(NodeConfig::new().with_node_id(42), &mut blocks).expect("valid config");

    let software = SoftwareVersion {
        major: 1,
        minor: 0,
        optional_field_flags: SoftwareVersion::FLAG_VCS_COMMIT,
        vcs_commit: 0x00C0_FFEE,
        image_crc: 0,
    };
    let info = NodeInfo::new("org.korri.demo.polling", software, HardwareVersion::new(1, 0, [0x42; 16]))
        .expect("name fits");
    let clock = SystemClock(Instant::now());
    let mut heartbeat = Heartbeat::new(clock.now_usec());
    heartbeat.set_mode(Mode::Operational);
    let mut services = NodeServices::new(Firmware, info, heartbeat);

    // GetNodeInfo request from node 10, transfer ID 0.
    let request_id = CanId::builder(GET_NODE_INFO.id, 10)
        .with_priority(priority::MEDIUM)
        .request_to(42)
        .build()
        .expect("valid identifier");
    let request = CanFrame::from_parts(request_id, &[0xC0]).expect("one byte fits");
    let driver = LoopbackDriver {
        inbox: VecDeque::from([request]),
    };

    let mut spinner = Spinner::new(driver, clock);
    for iteration in 0..3 {
        println!("spin {}:", iteration);
        match spinner.spin(&mut node, &mut services) {
            Ok(report) => println!("  {:?}", report),
            Err(err) => println!("  spin failed: {}", err),
        }
        std::thread::sleep(std::time::Duration::from_millis(300));
    }

    println!("\n=== Polling node completed ===");
}
