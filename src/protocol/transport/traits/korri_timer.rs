//! Async delay used by the node runner to wake up for heartbeats and
//! stale-transfer cleanup while no frame arrives.
use futures_util::Future;

pub trait KorriTimer {
    /// Completes after `millis` milliseconds. Cancelled by dropping.
    fn delay_ms<'a>(&'a mut self, millis: u32) -> impl Future<Output = ()> + 'a;
}

impl<T: KorriTimer + ?Sized> KorriTimer for &mut T {
    fn delay_ms<'a>(&'a mut self, millis: u32) -> impl Future<Output = ()> + 'a {
        (**self).delay_ms(millis)
    }
}
