use libpulse_binding as pulse;
use pulse::channelmap::Map as ChannelMap;
use pulse::context::State;
use pulse::volume::ChannelVolumes;

/// Lifecycle of the control connection, as reported by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Unconnected,
    Connecting,
    Authorizing,
    SettingName,
    Ready,
    Failed,
    Terminated,
}

impl ConnectionState {
    /// Still somewhere in the handshake.
    pub fn is_pending(self) -> bool {
        matches!(
            self,
            ConnectionState::Unconnected
                | ConnectionState::Connecting
                | ConnectionState::Authorizing
                | ConnectionState::SettingName
        )
    }
}

impl From<State> for ConnectionState {
    fn from(state: State) -> Self {
        match state {
            State::Unconnected => ConnectionState::Unconnected,
            State::Connecting => ConnectionState::Connecting,
            State::Authorizing => ConnectionState::Authorizing,
            State::SettingName => ConnectionState::SettingName,
            State::Ready => ConnectionState::Ready,
            State::Failed => ConnectionState::Failed,
            State::Terminated => ConnectionState::Terminated,
        }
    }
}

/// One remembered per-stream preference from the stream-restore database.
#[derive(Debug, Clone, PartialEq)]
pub struct RestoreRecord {
    pub name: String,
    pub channel_map: ChannelMap,
    pub volume: ChannelVolumes,
    pub mute: bool,
    pub device: Option<String>,
}

impl RestoreRecord {
    /// Copy of this record routed to `device`. Nothing else changes.
    pub fn retargeted(&self, device: &str) -> Self {
        Self {
            device: Some(device.to_string()),
            ..self.clone()
        }
    }
}

/// The requests the sequencer can put in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    SetDefaultDevice,
    ReadRestoreRecords,
    WriteRestoreRecord,
    Drain,
}

impl Operation {
    pub fn name(self) -> &'static str {
        match self {
            Operation::SetDefaultDevice => "set default sink",
            Operation::ReadRestoreRecords => "read stream-restore records",
            Operation::WriteRestoreRecord => "write stream-restore record",
            Operation::Drain => "drain",
        }
    }
}

/// Completion delivered by the service for an outstanding operation.
#[derive(Debug, Clone, PartialEq)]
pub enum Completion {
    SetDefaultDevice { success: bool },
    RestoreRecord(RestoreRecord),
    RestoreEnd,
    RestoreReadFailed,
    RestoreWrite { success: bool },
    Drained,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    StateChanged(ConnectionState),
    OpCompleted(Completion),
    /// The service refused to create the operation at all.
    Rejected(Operation),
}

/// Side effect requested by the sequencer, carried out by the event loop.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    SetDefaultDevice(String),
    ReadRestoreRecords,
    WriteRestoreRecord(RestoreRecord),
    Drain,
    Disconnect,
    Fail(Failure),
    Quit(i32),
}

/// Which step went wrong. The message itself comes from the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Failure {
    Connection,
    Rejected(Operation),
    Completed(Operation),
}
