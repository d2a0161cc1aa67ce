//! Async CAN bus contract consumed by
//! [`NodeRunner`](crate::protocol::services::runner::NodeRunner). Any HAL
//! or desktop driver able to await a frame in each direction fits.
use crate::protocol::transport::can_frame::CanFrame;
use futures_util::Future;

/// Send and receive extended CAN frames asynchronously.
pub trait CanBus {
    type Error: core::fmt::Debug;
    /// Resolves once the controller took the frame.
    fn send<'a>(
        &'a mut self,
        frame: &'a CanFrame,
    ) -> impl Future<Output = Result<(), Self::Error>> + 'a;
    /// Waits for the next frame. Dropping the future must not lose a frame
    /// already taken from the controller.
    fn recv<'a>(&'a mut self) -> impl Future<Output = Result<CanFrame, Self::Error>> + 'a;
}

/// Lets a runner borrow a bus the firmware keeps using afterwards.
impl<B: CanBus + ?Sized> CanBus for &mut B {
    type Error = B::Error;

    fn send<'a>(
        &'a mut self,
        frame: &'a CanFrame,
    ) -> impl Future<Output = Result<(), Self::Error>> + 'a {
        (**self).send(frame)
    }

    fn recv<'a>(&'a mut self) -> impl Future<Output = Result<CanFrame, Self::Error>> + 'a {
        (**self).recv()
    }
}
