//! Drain-then-disconnect.
//!
//! The process must not exit while a write is still in flight, so shutdown always goes
//! through a drain first. A drain that cannot even be created falls back to an immediate
//! disconnect; either way the connection ends up Terminated.

use tracing::{debug, warn};

use crate::service::AudioService;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Drain {
    /// Waiting for the drain completion, which triggers [`disconnect`].
    Pending,
    /// The drain was refused and the connection is already being torn down.
    Disconnected,
}

pub fn drain<S: AudioService + ?Sized>(service: &mut S) -> Drain {
    match service.drain() {
        Ok(()) => {
            debug!("Drain requested");
            Drain::Pending
        }
        Err(e) => {
            warn!("Drain request failed ({}), disconnecting", e);
            service.disconnect();
            Drain::Disconnected
        }
    }
}

pub fn disconnect<S: AudioService + ?Sized>(service: &mut S) {
    debug!("Disconnecting");
    service.disconnect();
}
