use std::collections::VecDeque;

use crate::error::Result;
use crate::session::{Event, RestoreRecord};

/// The audio server as seen by the sequencer.
///
/// Every request returns as soon as it has been handed to the server. An `Err` means the
/// request could not be created; its outcome otherwise arrives later as an
/// [`Event::OpCompleted`] from [`AudioService::poll`].
pub trait AudioService {
    /// Start connecting. State transitions show up as [`Event::StateChanged`].
    fn connect(&mut self, server: Option<&str>) -> Result<()>;

    fn set_default_device(&mut self, name: &str) -> Result<()>;

    /// Enumerate the stream-restore database: zero or more records, then an end marker.
    fn read_restore_records(&mut self) -> Result<()>;

    /// Write one record, replacing any existing entry with the same name.
    fn write_restore_record(&mut self, record: &RestoreRecord) -> Result<()>;

    /// Completes once everything issued before it has been processed.
    fn drain(&mut self) -> Result<()>;

    fn disconnect(&mut self);

    /// Block until the transport has something to report and append the resulting events.
    ///
    /// Returns without blocking when events raised outside the mainloop are still queued.
    fn poll(&mut self, events: &mut VecDeque<Event>) -> Result<()>;

    /// Append events that requests raised on the spot, without blocking.
    ///
    /// Disconnecting reports Terminated synchronously, after which the transport may have
    /// nothing left to wait on.
    fn take_raised(&mut self, events: &mut VecDeque<Event>);

    /// Human readable description of the most recent server error.
    fn last_error(&self) -> String;
}
