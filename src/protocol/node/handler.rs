//! Application callback boundary and the outbound side available to it.
//!
//! The application decides which transfers it wants through
//! [`TransferHandler::should_accept`] and receives completed transfers through
//! [`TransferHandler::on_transfer_received`]. The handler is given a
//! [`Publisher`] so that it can answer a request, or react to a message,
//! without re-entering the node.
use crate::core::{DataTypeDescriptor, TransferType, BROADCAST_NODE_ID, MAX_TRANSFER_PAYLOAD};
use crate::error::{PublishError, TxError, TxQueueError};
use crate::infra::arena::Arena;
use crate::infra::codec::crc::TransferCrc;
use crate::infra::codec::traits::{DataType, ToPayload};
use crate::protocol::transport::can_id::CanId;
use crate::protocol::transport::multi_frame::builder::{TransferBuilder, FRAME_PAYLOAD};
use crate::protocol::transport::transfer::{RxTransfer, TransferId};
use crate::protocol::transport::tx_queue::TxQueue;

//==================================================================================TRANSFER_HANDLER
/// Capabilities the embedding application plugs into the node.
pub trait TransferHandler {
    /// Decide whether a transfer is wanted, based on the first frame seen.
    /// Returns the data type signature (used to validate the multi-frame CRC)
    /// when it is, `None` to ignore the transfer.
    fn should_accept(
        &self,
        transfer_type: TransferType,
        data_type_id: u16,
        source_node_id: u8,
    ) -> Option<u64>;

    /// Called synchronously for every completed transfer. The payload is only
    /// borrowed for the duration of the call.
    fn on_transfer_received(&mut self, transfer: &RxTransfer<'_>, publisher: &mut Publisher<'_, '_>);
}

impl<H: TransferHandler + ?Sized> TransferHandler for &mut H {
    fn should_accept(
        &self,
        transfer_type: TransferType,
        data_type_id: u16,
        source_node_id: u8,
    ) -> Option<u64> {
        (**self).should_accept(transfer_type, data_type_id, source_node_id)
    }

    fn on_transfer_received(&mut self, transfer: &RxTransfer<'_>, publisher: &mut Publisher<'_, '_>) {
        (**self).on_transfer_received(transfer, publisher)
    }
}

//==================================================================================PUBLISHER
/// Direction of a service transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RequestKind {
    Request,
    Response,
}

/// Outbound half of a node: fragments transfers into the transmit queue.
///
/// Obtained from [`Node::publisher`](super::Node::publisher) or handed to a
/// [`TransferHandler`] during dispatch.
pub struct Publisher<'n, 'a> {
    pub(super) node_id: u8,
    pub(super) max_transfer_payload: usize,
    pub(super) arena: &'n mut Arena<'a>,
    pub(super) tx_queue: &'n mut TxQueue,
}

impl Publisher<'_, '_> {
    /// Node ID frames are sent from, 0 while anonymous.
    pub fn local_node_id(&self) -> u8 {
        self.node_id
    }

    /// Queue a message broadcast. On success `transfer_id` is incremented and
    /// the number of queued frames returned; on failure nothing is queued and
    /// the counter is untouched.
    ///
    /// An anonymous node may only send single-frame messages whose data type
    /// ID fits two bits.
    pub fn broadcast(
        &mut self,
        data_type: &DataTypeDescriptor,
        transfer_id: &mut TransferId,
        priority: u8,
        payload: &[u8],
    ) -> Result<usize, TxError> {
        self.check_payload(payload)?;

        let id = if self.node_id == BROADCAST_NODE_ID {
            if payload.len() > FRAME_PAYLOAD {
                return Err(TxError::AnonymousTransferTooLong { len: payload.len() });
            }
            let mut crc = TransferCrc::default();
            crc.add_bytes(payload);
            CanId::builder(data_type.id, BROADCAST_NODE_ID)
                .with_priority(priority)
                .with_discriminator((crc.get() & 0x7FFE) >> 1)
                .build()?
        } else {
            CanId::builder(data_type.id, self.node_id)
                .with_priority(priority)
                .build()?
        };

        let queued = self.enqueue(id, *transfer_id, payload, data_type.signature)?;
        transfer_id.increment();
        Ok(queued)
    }

    /// Queue a service request or response addressed to `destination`.
    ///
    /// A request increments `transfer_id` on success; a response must reuse
    /// the transfer ID of the request it answers and leaves it unchanged.
    pub fn request_or_respond(
        &mut self,
        destination: u8,
        data_type: &DataTypeDescriptor,
        transfer_id: &mut TransferId,
        priority: u8,
        kind: RequestKind,
        payload: &[u8],
    ) -> Result<usize, TxError> {
        if self.node_id == BROADCAST_NODE_ID {
            return Err(TxError::NodeIdNotSet);
        }
        self.check_payload(payload)?;

        let builder = CanId::builder(data_type.id, self.node_id).with_priority(priority);
        let id = match kind {
            RequestKind::Request => builder.request_to(destination),
            RequestKind::Response => builder.response_to(destination),
        }
        .build()?;

        let queued = self.enqueue(id, *transfer_id, payload, data_type.signature)?;
        if kind == RequestKind::Request {
            transfer_id.increment();
        }
        Ok(queued)
    }

    /// Answer `request` with `payload`, at the request's priority and with its
    /// transfer ID.
    pub fn respond(
        &mut self,
        request: &RxTransfer<'_>,
        data_type: &DataTypeDescriptor,
        payload: &[u8],
    ) -> Result<usize, TxError> {
        let mut transfer_id = request.transfer_id;
        self.request_or_respond(
            request.source_node_id,
            data_type,
            &mut transfer_id,
            request.priority,
            RequestKind::Response,
            payload,
        )
    }

    /// Serialize a message and broadcast it.
    pub fn broadcast_message<T: DataType + ToPayload>(
        &mut self,
        message: &T,
        transfer_id: &mut TransferId,
        priority: u8,
    ) -> Result<usize, PublishError> {
        let mut buffer = [0u8; MAX_TRANSFER_PAYLOAD];
        let len = message.to_payload(&mut buffer)?;
        Ok(self.broadcast(&T::DESCRIPTOR, transfer_id, priority, &buffer[..len])?)
    }

    /// Serialize a service response and send it back to the requester.
    pub fn respond_with<T: DataType + ToPayload>(
        &mut self,
        request: &RxTransfer<'_>,
        response: &T,
    ) -> Result<usize, PublishError> {
        let mut buffer = [0u8; MAX_TRANSFER_PAYLOAD];
        let len = response.to_payload(&mut buffer)?;
        Ok(self.respond(request, &T::DESCRIPTOR, &buffer[..len])?)
    }

    fn check_payload(&self, payload: &[u8]) -> Result<(), TxError> {
        if payload.len() > self.max_transfer_payload {
            return Err(TxError::PayloadTooLong {
                len: payload.len(),
                max: self.max_transfer_payload,
            });
        }
        Ok(())
    }

    fn enqueue(
        &mut self,
        id: CanId,
        transfer_id: TransferId,
        payload: &[u8],
        signature: u64,
    ) -> Result<usize, TxError> {
        let frames = TransferBuilder::new(id, transfer_id, payload, signature).build();
        let queued = self
            .tx_queue
            .push_all(self.arena, frames)
            .map_err(|err: TxQueueError| {
                #[cfg(feature = "defmt")]
                {
                    let TxQueueError::Full { needed, available } = err;
                    defmt::warn!(
                        "Transmit queue full: {} frames needed, room for {}",
                        needed,
                        available
                    );
                }
                TxError::from(err)
            })?;

        #[cfg(feature = "defmt")]
        defmt::trace!("Queued {} frame(s) with id {:#X}", queued, id.0);
        Ok(queued)
    }
}

