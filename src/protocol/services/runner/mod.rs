//! Async node runner for executor-based firmware.
//!
//! [`NodeRunner`] owns the node and serialises every access to it in a single
//! task: it waits on the CAN bus, on a timer sized to the next heartbeat or
//! cleanup deadline, and optionally on a command channel fed by other tasks
//! through [`NodeHandle`]. No allocation is performed by the library; the
//! firmware provides the [`embassy_sync::channel::Channel`] (typically from a
//! `StaticCell`).
use core::fmt::Debug;

use embassy_sync::{
    blocking_mutex::raw::CriticalSectionRawMutex,
    channel::{Channel, Sender},
};
use futures_util::{future::select, future::Either, pin_mut};

use crate::core::DataTypeDescriptor;
use crate::error::{NodeHandleError, RunnerError};
use crate::infra::codec::traits::{DataType, ToPayload};
use crate::protocol::messages::node_status::{Health, Mode};
use crate::protocol::node::{Node, RequestKind, TransferHandler};
use crate::protocol::services::node_info::NodeServices;
use crate::protocol::transport::can_frame::CanFrame;
use crate::protocol::transport::traits::{
    can_bus::CanBus, clock::MonotonicClock, korri_timer::KorriTimer,
};
use crate::protocol::transport::transfer::TransferId;
use crate::protocol::transport::CLEANUP_INTERVAL_USEC;

/// Largest payload a command can carry.
pub const COMMAND_PAYLOAD: usize = 256;

/// Command channel shared between the runner and its handles.
pub type CommandChannel<const CAP: usize> = Channel<CriticalSectionRawMutex, NodeCommand, CAP>;

//==================================================================================COMMANDS
/// Work queued by producer tasks.
#[derive(Clone)]
pub enum NodeCommand {
    Broadcast {
        data_type: DataTypeDescriptor,
        transfer_id: TransferId,
        priority: u8,
        len: usize,
        payload: [u8; COMMAND_PAYLOAD],
    },
    Request {
        destination: u8,
        data_type: DataTypeDescriptor,
        transfer_id: TransferId,
        priority: u8,
        len: usize,
        payload: [u8; COMMAND_PAYLOAD],
    },
    SetHealth(Health),
    SetMode(Mode),
    SetVendorStatus(u16),
}

/// Producer side of the command channel. Cheap to copy into several tasks.
#[derive(Clone, Copy)]
pub struct NodeHandle<'r, const CAP: usize> {
    sender: Sender<'r, CriticalSectionRawMutex, NodeCommand, CAP>,
}

impl<'r, const CAP: usize> NodeHandle<'r, CAP> {
    pub fn new(channel: &'r CommandChannel<CAP>) -> Self {
        Self {
            sender: channel.sender(),
        }
    }

    /// Queue a broadcast. `transfer_id` is incremented once the command is in
    /// the channel; transmit failures inside the runner are only logged.
    pub async fn broadcast(
        &self,
        data_type: &DataTypeDescriptor,
        transfer_id: &mut TransferId,
        priority: u8,
        payload: &[u8],
    ) -> Result<(), NodeHandleError> {
        let (len, buffer) = copy_payload(payload)?;
        self.sender
            .send(NodeCommand::Broadcast {
                data_type: *data_type,
                transfer_id: *transfer_id,
                priority,
                len,
                payload: buffer,
            })
            .await;
        transfer_id.increment();
        Ok(())
    }

    /// Serialize `message` and queue its broadcast.
    pub async fn broadcast_message<T: DataType + ToPayload>(
        &self,
        message: &T,
        transfer_id: &mut TransferId,
        priority: u8,
    ) -> Result<(), NodeHandleError> {
        let mut buffer = [0u8; COMMAND_PAYLOAD];
        let len = message.to_payload(&mut buffer)?;
        self.broadcast(&T::DESCRIPTOR, transfer_id, priority, &buffer[..len])
            .await
    }

    /// Queue a service request to `destination`.
    pub async fn request(
        &self,
        destination: u8,
        data_type: &DataTypeDescriptor,
        transfer_id: &mut TransferId,
        priority: u8,
        payload: &[u8],
    ) -> Result<(), NodeHandleError> {
        let (len, buffer) = copy_payload(payload)?;
        self.sender
            .send(NodeCommand::Request {
                destination,
                data_type: *data_type,
                transfer_id: *transfer_id,
                priority,
                len,
                payload: buffer,
            })
            .await;
        transfer_id.increment();
        Ok(())
    }

    pub async fn set_health(&self, health: Health) {
        self.sender.send(NodeCommand::SetHealth(health)).await;
    }

    pub async fn set_mode(&self, mode: Mode) {
        self.sender.send(NodeCommand::SetMode(mode)).await;
    }

    pub async fn set_vendor_status(&self, code: u16) {
        self.sender.send(NodeCommand::SetVendorStatus(code)).await;
    }
}

fn copy_payload(payload: &[u8]) -> Result<(usize, [u8; COMMAND_PAYLOAD]), NodeHandleError> {
    if payload.len() > COMMAND_PAYLOAD {
        return Err(NodeHandleError::PayloadTooLong {
            len: payload.len(),
            max: COMMAND_PAYLOAD,
        });
    }
    let mut buffer = [0u8; COMMAND_PAYLOAD];
    buffer[..payload.len()].copy_from_slice(payload);
    Ok((payload.len(), buffer))
}

//==================================================================================RUNNER
enum Event<E> {
    Frame(Result<CanFrame, E>),
    Tick,
    Command(NodeCommand),
}

/// Task owning the node, its services and the bus.
pub struct NodeRunner<'r, 'a, C, T, K, A, const CAP: usize, const S: usize, const N: usize>
where
    C: CanBus,
    C::Error: Debug,
    T: KorriTimer,
    K: MonotonicClock,
    A: TransferHandler,
{
    node: Node<'a, S, N>,
    services: NodeServices<A>,
    bus: C,
    timer: T,
    clock: K,
    commands: Option<&'r CommandChannel<CAP>>,
    last_cleanup_usec: u64,
}

impl<'r, 'a, C, T, K, A, const CAP: usize, const S: usize, const N: usize>
    NodeRunner<'r, 'a, C, T, K, A, CAP, S, N>
where
    C: CanBus,
    C::Error: Debug,
    T: KorriTimer,
    K: MonotonicClock,
    A: TransferHandler,
{
    pub fn new(
        node: Node<'a, S, N>,
        services: NodeServices<A>,
        bus: C,
        timer: T,
        clock: K,
        commands: Option<&'r CommandChannel<CAP>>,
    ) -> Self {
        let last_cleanup_usec = clock.now_usec();
        Self {
            node,
            services,
            bus,
            timer,
            clock,
            commands,
            last_cleanup_usec,
        }
    }

    /// Handle feeding the command channel, if one was provided.
    pub fn handle(&self) -> Option<NodeHandle<'r, CAP>> {
        self.commands.map(NodeHandle::new)
    }

    pub fn node(&self) -> &Node<'a, S, N> {
        &self.node
    }

    pub fn node_mut(&mut self) -> &mut Node<'a, S, N> {
        &mut self.node
    }

    pub fn services(&self) -> &NodeServices<A> {
        &self.services
    }

    pub fn services_mut(&mut self) -> &mut NodeServices<A> {
        &mut self.services
    }

    /// Run until the bus fails.
    pub async fn drive(mut self) -> Result<(), RunnerError<C::Error>> {
        #[cfg(feature = "defmt")]
        defmt::info!("Node runner started, node id {}", self.node.local_node_id());
        loop {
            self.step().await?;
        }
    }

    /// One iteration: periodic work, transmit everything queued, then wait
    /// for a frame, a deadline or a command and handle it.
    pub async fn step(&mut self) -> Result<(), RunnerError<C::Error>> {
        self.housekeeping();
        self.flush().await?;

        let wait_ms = self.wait_ms();
        let commands = self.commands;
        let event = {
            let frame = self.bus.recv();
            let tick = self.timer.delay_ms(wait_ms);
            let command = async move {
                match commands {
                    Some(channel) => channel.receive().await,
                    None => core::future::pending::<NodeCommand>().await,
                }
            };
            pin_mut!(frame);
            pin_mut!(tick);
            pin_mut!(command);

            match select(frame, select(tick, command)).await {
                Either::Left((result, _)) => Event::Frame(result),
                Either::Right((Either::Left(((), _)), _)) => Event::Tick,
                Either::Right((Either::Right((command, _)), _)) => Event::Command(command),
            }
        };

        match event {
            Event::Frame(Ok(frame)) => {
                let now = self.clock.now_usec();
                if let Err(_err) = self.node.handle_rx_frame(&frame, now, &mut self.services) {
                    #[cfg(feature = "defmt")]
                    defmt::warn!("Inbound frame dropped: {}", defmt::Debug2Format(&_err));
                }
            }
            Event::Frame(Err(err)) => return Err(RunnerError::Receive(err)),
            Event::Tick => {}
            Event::Command(command) => self.apply(command),
        }
        Ok(())
    }

    /// Send every queued frame. A frame the bus rejects is dropped.
    async fn flush(&mut self) -> Result<usize, RunnerError<C::Error>> {
        let mut sent = 0;
        while let Some(frame) = self.node.peek_tx() {
            let result = self.bus.send(&frame).await;
            self.node.pop_tx();
            result.map_err(RunnerError::Send)?;
            sent += 1;
        }
        Ok(sent)
    }

    fn housekeeping(&mut self) {
        let now = self.clock.now_usec();
        if let Err(_err) = self.services.poll_heartbeat(&mut self.node.publisher(), now) {
            #[cfg(feature = "defmt")]
            defmt::warn!("Heartbeat not queued: {}", defmt::Debug2Format(&_err));
        }
        if now.saturating_sub(self.last_cleanup_usec) >= CLEANUP_INTERVAL_USEC {
            self.node.cleanup_stale_transfers(now);
            self.last_cleanup_usec = now;
        }
    }

    /// Milliseconds until the closest deadline, between 1 and 1000.
    fn wait_ms(&self) -> u32 {
        let now = self.clock.now_usec();
        let until_cleanup = (self.last_cleanup_usec + CLEANUP_INTERVAL_USEC).saturating_sub(now);
        let until_heartbeat = if self.node.is_anonymous() {
            until_cleanup
        } else {
            self.services.heartbeat().next_due_usec().saturating_sub(now)
        };
        let wait_usec = until_cleanup.min(until_heartbeat);
        wait_usec.div_ceil(1_000).clamp(1, 1_000) as u32
    }

    fn apply(&mut self, command: NodeCommand) {
        let result = match command {
            NodeCommand::Broadcast {
                data_type,
                mut transfer_id,
                priority,
                len,
                payload,
            } => self
                .node
                .broadcast(&data_type, &mut transfer_id, priority, &payload[..len]),
            NodeCommand::Request {
                destination,
                data_type,
                mut transfer_id,
                priority,
                len,
                payload,
            } => self.node.request_or_respond(
                destination,
                &data_type,
                &mut transfer_id,
                priority,
                RequestKind::Request,
                &payload[..len],
            ),
            NodeCommand::SetHealth(health) => {
                self.services.heartbeat_mut().set_health(health);
                return;
            }
            NodeCommand::SetMode(mode) => {
                self.services.heartbeat_mut().set_mode(mode);
                return;
            }
            NodeCommand::SetVendorStatus(code) => {
                self.services
                    .heartbeat_mut()
                    .set_vendor_specific_status_code(code);
                return;
            }
        };

        if let Err(_err) = result {
            #[cfg(feature = "defmt")]
            defmt::warn!("Queued command rejected: {}", defmt::Debug2Format(&_err));
        }
    }
}
