use tracing::{debug, info};

use crate::session::{Completion, ConnectionState, Effect, Event, Failure, Operation};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Waiting for the handshake to reach Ready.
    Connecting,
    /// Default sink request and enumeration both outstanding.
    SettingDefault,
    /// Default sink confirmed, records still arriving.
    Enumerating,
    AwaitingDrain,
    Disconnecting,
    Done,
    Failed,
}

/// Drives one sink switch from Ready to Terminated.
///
/// The sequencer never talks to the server itself. [`Sequencer::handle`] maps an event
/// onto the next phase and returns the effects the event loop has to carry out, so the
/// whole sequence can be exercised with synthetic events.
#[derive(Debug)]
pub struct Sequencer {
    device: String,
    phase: Phase,
    writes_issued: usize,
}

impl Sequencer {
    pub fn new(device: impl Into<String>) -> Self {
        Self {
            device: device.into(),
            phase: Phase::Connecting,
            writes_issued: 0,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn writes_issued(&self) -> usize {
        self.writes_issued
    }

    pub fn handle(&mut self, event: Event) -> Vec<Effect> {
        debug!("[SEQ] {:?} <- {:?}", self.phase, event);
        match event {
            Event::StateChanged(state) => self.on_state(state),
            Event::OpCompleted(completion) => self.on_completion(completion),
            Event::Rejected(operation) => self.on_rejected(operation),
        }
    }

    fn on_state(&mut self, state: ConnectionState) -> Vec<Effect> {
        match state {
            s if s.is_pending() => Vec::new(),
            ConnectionState::Ready => {
                if self.phase != Phase::Connecting {
                    return Vec::new();
                }
                info!("Connected, switching default sink to {}", self.device);
                self.phase = Phase::SettingDefault;
                vec![
                    Effect::SetDefaultDevice(self.device.clone()),
                    Effect::ReadRestoreRecords,
                ]
            }
            ConnectionState::Terminated => {
                info!("Connection terminated");
                if self.phase != Phase::Failed {
                    self.phase = Phase::Done;
                }
                vec![Effect::Quit(0)]
            }
            _ => self.fail(Failure::Connection),
        }
    }

    fn on_completion(&mut self, completion: Completion) -> Vec<Effect> {
        match completion {
            Completion::SetDefaultDevice { success: true } => {
                debug!("Default sink set to {}", self.device);
                if self.phase == Phase::SettingDefault {
                    self.phase = Phase::Enumerating;
                }
                Vec::new()
            }
            Completion::SetDefaultDevice { success: false } => {
                self.fail(Failure::Completed(Operation::SetDefaultDevice))
            }
            Completion::RestoreRecord(record) => {
                let updated = record.retargeted(&self.device);
                debug!(
                    "Moving stream {} from {:?} to {}",
                    record.name, record.device, self.device
                );
                self.writes_issued += 1;
                vec![Effect::WriteRestoreRecord(updated)]
            }
            Completion::RestoreEnd => {
                info!("Updated {} stream-restore records", self.writes_issued);
                if matches!(self.phase, Phase::SettingDefault | Phase::Enumerating) {
                    self.phase = Phase::AwaitingDrain;
                }
                vec![Effect::Drain]
            }
            Completion::RestoreReadFailed => {
                self.fail(Failure::Completed(Operation::ReadRestoreRecords))
            }
            Completion::RestoreWrite { success: true } => Vec::new(),
            Completion::RestoreWrite { success: false } => {
                self.fail(Failure::Completed(Operation::WriteRestoreRecord))
            }
            Completion::Drained => {
                if self.phase == Phase::AwaitingDrain {
                    self.phase = Phase::Disconnecting;
                }
                vec![Effect::Disconnect]
            }
        }
    }

    fn on_rejected(&mut self, operation: Operation) -> Vec<Effect> {
        match operation {
            // The shutdown controller has already disconnected.
            Operation::Drain => {
                debug!("Drain request could not be created");
                if self.phase == Phase::AwaitingDrain {
                    self.phase = Phase::Disconnecting;
                }
                Vec::new()
            }
            other => self.fail(Failure::Rejected(other)),
        }
    }

    fn fail(&mut self, failure: Failure) -> Vec<Effect> {
        self.phase = Phase::Failed;
        vec![Effect::Fail(failure), Effect::Quit(1)]
    }
}
