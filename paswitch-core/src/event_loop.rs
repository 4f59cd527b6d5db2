use std::collections::VecDeque;

use tracing::{debug, error, info};

use crate::error::{Result, SwitchError};
use crate::sequencer::Sequencer;
use crate::service::AudioService;
use crate::session::{Effect, Event, Operation};
use crate::shutdown::{self, Drain};

/// How a finished run went.
#[derive(Debug)]
pub struct Outcome {
    pub exit_code: i32,
    /// Every failure reported along the way, in order.
    pub errors: Vec<SwitchError>,
    pub writes_issued: usize,
}

/// Single-threaded dispatcher between an [`AudioService`] and a [`Sequencer`].
///
/// Each turn blocks in [`AudioService::poll`], then hands every queued event to the
/// sequencer and carries out the effects it asks for. A quit request takes effect only
/// after the current batch of events has been processed. There is no timeout: a request
/// the server never answers keeps the loop waiting.
pub struct EventLoop<S: AudioService> {
    service: S,
    sequencer: Sequencer,
    queue: VecDeque<Event>,
    quit: Option<i32>,
    errors: Vec<SwitchError>,
    report: Box<dyn FnMut(&SwitchError)>,
}

impl<S: AudioService> EventLoop<S> {
    pub fn new(service: S, device: impl Into<String>) -> Self {
        Self {
            service,
            sequencer: Sequencer::new(device),
            queue: VecDeque::new(),
            quit: None,
            errors: Vec::new(),
            report: Box::new(|_| {}),
        }
    }

    /// Called with each failure as soon as it happens.
    pub fn on_error(mut self, report: impl FnMut(&SwitchError) + 'static) -> Self {
        self.report = Box::new(report);
        self
    }

    pub fn service(&self) -> &S {
        &self.service
    }

    pub fn into_service(self) -> S {
        self.service
    }

    /// Connect, run until some completion path quits, then disconnect.
    ///
    /// `Err` is reserved for the loop itself breaking down; failures reported by the
    /// server end up in [`Outcome::errors`] with a non-zero exit code.
    pub fn run(&mut self, server: Option<&str>) -> Result<Outcome> {
        self.service.connect(server)?;
        let result = self.dispatch_until_quit();
        self.service.disconnect();

        let exit_code = result?;
        info!("Event loop finished with status {}", exit_code);
        Ok(Outcome {
            exit_code,
            errors: std::mem::take(&mut self.errors),
            writes_issued: self.sequencer.writes_issued(),
        })
    }

    fn dispatch_until_quit(&mut self) -> Result<i32> {
        loop {
            self.service.poll(&mut self.queue)?;
            loop {
                while let Some(event) = self.queue.pop_front() {
                    let effects = self.sequencer.handle(event);
                    self.apply(effects);
                }
                // Anything the effects raised on the spot belongs to this batch.
                self.service.take_raised(&mut self.queue);
                if self.queue.is_empty() {
                    break;
                }
            }
            if let Some(code) = self.quit {
                return Ok(code);
            }
        }
    }

    fn apply(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            if let Err(operation) = self.apply_one(effect) {
                // Whatever was meant to follow the refused request is dropped with it.
                let follow_up = self.sequencer.handle(Event::Rejected(operation));
                self.apply(follow_up);
                return;
            }
        }
    }

    fn apply_one(&mut self, effect: Effect) -> std::result::Result<(), Operation> {
        match effect {
            Effect::SetDefaultDevice(name) => self
                .service
                .set_default_device(&name)
                .map_err(|e| self.rejected(Operation::SetDefaultDevice, e)),
            Effect::ReadRestoreRecords => self
                .service
                .read_restore_records()
                .map_err(|e| self.rejected(Operation::ReadRestoreRecords, e)),
            Effect::WriteRestoreRecord(record) => self
                .service
                .write_restore_record(&record)
                .map_err(|e| self.rejected(Operation::WriteRestoreRecord, e)),
            Effect::Drain => match shutdown::drain(&mut self.service) {
                Drain::Pending => Ok(()),
                Drain::Disconnected => Err(Operation::Drain),
            },
            Effect::Disconnect => {
                shutdown::disconnect(&mut self.service);
                Ok(())
            }
            Effect::Fail(failure) => {
                let err = SwitchError::from_failure(failure, self.service.last_error());
                error!("{}", err);
                (self.report)(&err);
                self.errors.push(err);
                Ok(())
            }
            Effect::Quit(code) => {
                self.request_quit(code);
                Ok(())
            }
        }
    }

    fn rejected(&self, operation: Operation, err: SwitchError) -> Operation {
        debug!("{} could not be created: {}", operation.name(), err);
        operation
    }

    /// Failure is sticky: a later clean quit never lowers the status.
    fn request_quit(&mut self, code: i32) {
        let code = self.quit.map_or(code, |current| current.max(code));
        debug!("Quit requested with status {}", code);
        self.quit = Some(code);
    }
}
