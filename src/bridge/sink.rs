//! Consumer endpoints for relayed readings.

use crate::sensors::Reading;
use log::debug;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

/// The consumer readings are pushed to.
///
/// `deliver` runs on the sensor callback path while the bridge holds its relay
/// lock, so it must not block and must do a bounded amount of work. It may
/// call back into the bridge on the same thread (for example `stop` once a
/// threshold is crossed); the relay lock is re-entrant.
pub trait ReadingSink: Send + Sync {
    fn deliver(&self, reading: Reading);
}

impl ReadingSink for mpsc::Sender<Reading> {
    fn deliver(&self, reading: Reading) {
        match self.try_send(reading) {
            Ok(()) => {}
            Err(TrySendError::Full(r)) => {
                debug!("Consumer saturated, dropping {} lx", r.lux());
            }
            Err(TrySendError::Closed(r)) => {
                debug!("Consumer gone, dropping {} lx", r.lux());
            }
        }
    }
}

/// Adapts a closure into a [`ReadingSink`].
pub struct FnSink<F>(pub F);

impl<F> ReadingSink for FnSink<F>
where
    F: Fn(Reading) + Send + Sync,
{
    fn deliver(&self, reading: Reading) {
        (self.0)(reading)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounded_sender_drops_when_full() {
        let (tx, mut rx) = mpsc::channel(1);
        tx.deliver(Reading::new(1.0));
        tx.deliver(Reading::new(2.0));

        assert_eq!(rx.try_recv().unwrap().lux(), 1.0);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_closure_sink() {
        let (tx, mut rx) = mpsc::channel(1);
        let sink = FnSink(move |r: Reading| {
            let _ = tx.try_send(r.lux() * 2.0);
        });
        sink.deliver(Reading::new(4.0));
        assert_eq!(tokio_test::block_on(rx.recv()), Some(8.0));
    }

    #[test]
    fn test_closed_receiver_is_not_an_error() {
        let (tx, rx) = mpsc::channel::<Reading>(1);
        drop(rx);
        tx.deliver(Reading::new(3.0));
    }
}
