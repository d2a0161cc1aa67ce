//! Standard services every node answers, wrapped around the application's
//! own [`TransferHandler`].
//!
//! [`NodeServices`] intercepts `GetNodeInfo` requests addressed to the node
//! and answers them with the current status and the application-supplied
//! [`NodeInfo`]. Every other transfer is forwarded unchanged.
use crate::core::TransferType;
use crate::error::PublishError;
use crate::protocol::messages::get_node_info::{GetNodeInfoResponse, NodeInfo, GET_NODE_INFO};
use crate::protocol::node::{Publisher, TransferHandler};
use crate::protocol::services::heartbeat::Heartbeat;
use crate::protocol::transport::transfer::RxTransfer;

//==================================================================================NODE_SERVICES
pub struct NodeServices<A> {
    app: A,
    info: NodeInfo,
    heartbeat: Heartbeat,
}

impl<A: TransferHandler> NodeServices<A> {
    pub fn new(app: A, info: NodeInfo, heartbeat: Heartbeat) -> Self {
        Self {
            app,
            info,
            heartbeat,
        }
    }

    pub fn app(&self) -> &A {
        &self.app
    }

    pub fn app_mut(&mut self) -> &mut A {
        &mut self.app
    }

    pub fn info(&self) -> &NodeInfo {
        &self.info
    }

    pub fn heartbeat(&self) -> &Heartbeat {
        &self.heartbeat
    }

    /// Health, mode and vendor code are set through the heartbeat; GetNodeInfo
    /// answers report the same values.
    pub fn heartbeat_mut(&mut self) -> &mut Heartbeat {
        &mut self.heartbeat
    }

    /// See [`Heartbeat::poll`].
    pub fn poll_heartbeat(
        &mut self,
        publisher: &mut Publisher<'_, '_>,
        now_usec: u64,
    ) -> Result<bool, PublishError> {
        self.heartbeat.poll(publisher, now_usec)
    }

    /// Response to a GetNodeInfo request received at `now_usec`.
    pub fn node_info_response(&self, now_usec: u64) -> GetNodeInfoResponse {
        GetNodeInfoResponse {
            status: self.heartbeat.status(now_usec),
            info: self.info,
        }
    }

    fn is_node_info_request(transfer_type: TransferType, data_type_id: u16) -> bool {
        transfer_type == TransferType::Request && GET_NODE_INFO.matches(transfer_type, data_type_id)
    }
}

impl<A: TransferHandler> TransferHandler for NodeServices<A> {
    fn should_accept(
        &self,
        transfer_type: TransferType,
        data_type_id: u16,
        source_node_id: u8,
    ) -> Option<u64> {
        if Self::is_node_info_request(transfer_type, data_type_id) {
            return Some(GET_NODE_INFO.signature);
        }
        self.app
            .should_accept(transfer_type, data_type_id, source_node_id)
    }

    fn on_transfer_received(&mut self, transfer: &RxTransfer<'_>, publisher: &mut Publisher<'_, '_>) {
        if !Self::is_node_info_request(transfer.transfer_type, transfer.data_type_id) {
            self.app.on_transfer_received(transfer, publisher);
            return;
        }

        let response = self.node_info_response(transfer.timestamp_usec);
        match publisher.respond_with(transfer, &response) {
            Ok(_frames) => {
                #[cfg(feature = "defmt")]
                defmt::debug!(
                    "GetNodeInfo answered to node {} in {} frame(s)",
                    transfer.source_node_id,
                    _frames
                );
            }
            Err(_err) => {
                #[cfg(feature = "defmt")]
                defmt::warn!(
                    "GetNodeInfo answer to node {} dropped: {}",
                    transfer.source_node_id,
                    defmt::Debug2Format(&_err)
                );
            }
        }
    }
}
