// Scripted in-memory audio server shared by the integration tests.
// Requests are answered on the next poll, one batch per mainloop iteration.
// Like libpulse, connect and disconnect report their state change on the spot, and a
// poll with nothing in flight has nothing to wait on and goes idle.

#![allow(dead_code)]

use std::collections::VecDeque;

use libpulse_binding::channelmap::Map;
use libpulse_binding::volume::{ChannelVolumes, Volume};
use paswitch_core::{
    AudioService, Completion, ConnectionState, Event, Operation, RestoreRecord, Result,
    SwitchError,
};

#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    Connect(Option<String>),
    SetDefault(String),
    Read,
    Write(RestoreRecord),
    Drain,
    Disconnect,
}

pub struct FakeServer {
    pub sinks: Vec<String>,
    pub default_sink: Option<String>,
    pub records: Vec<RestoreRecord>,
    pub requests: Vec<Request>,
    pub reachable: bool,
    pub fail_read: bool,
    /// Zero-based index of the write that reports failure.
    pub fail_write_at: Option<usize>,
    pub reject: Vec<Operation>,
    /// Deliver the enumeration before the default-sink completion.
    pub records_first: bool,
    pub error: String,
    state: ConnectionState,
    raised: VecDeque<Event>,
    pending: VecDeque<Event>,
    terminated_delivered: bool,
    deferred: Option<Event>,
    writes: usize,
}

impl FakeServer {
    pub fn new(sinks: &[&str], records: Vec<RestoreRecord>) -> Self {
        Self {
            sinks: sinks.iter().map(|s| s.to_string()).collect(),
            default_sink: None,
            records,
            requests: Vec::new(),
            reachable: true,
            fail_read: false,
            fail_write_at: None,
            reject: Vec::new(),
            records_first: false,
            error: "OK".to_string(),
            state: ConnectionState::Unconnected,
            raised: VecDeque::new(),
            pending: VecDeque::new(),
            terminated_delivered: false,
            deferred: None,
            writes: 0,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn writes(&self) -> Vec<RestoreRecord> {
        self.requests
            .iter()
            .filter_map(|r| match r {
                Request::Write(record) => Some(record.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, wanted: fn(&Request) -> bool) -> usize {
        self.requests.iter().filter(|r| wanted(r)).count()
    }

    /// Whether the Terminated notification ever reached the event loop.
    pub fn terminated_delivered(&self) -> bool {
        self.terminated_delivered
    }

    fn set_state(&mut self, state: ConnectionState) {
        self.state = state;
        self.pending.push_back(Event::StateChanged(state));
    }

    fn raise_state(&mut self, state: ConnectionState) {
        self.state = state;
        self.raised.push_back(Event::StateChanged(state));
    }

    fn hand_out(&mut self, from_raised: bool, events: &mut VecDeque<Event>) {
        let source = if from_raised {
            &mut self.raised
        } else {
            &mut self.pending
        };
        for event in source.drain(..) {
            if event == Event::StateChanged(ConnectionState::Terminated) {
                self.terminated_delivered = true;
            }
            events.push_back(event);
        }
    }

    fn complete(&mut self, completion: Completion) {
        self.pending.push_back(Event::OpCompleted(completion));
    }

    fn flush_deferred(&mut self) {
        if let Some(event) = self.deferred.take() {
            self.pending.push_back(event);
        }
    }

    fn refuse(&mut self, operation: Operation) -> Result<()> {
        self.error = "Bad state".to_string();
        Err(SwitchError::Rejected {
            operation,
            reason: self.error.clone(),
        })
    }
}

impl AudioService for FakeServer {
    fn connect(&mut self, server: Option<&str>) -> Result<()> {
        self.requests.push(Request::Connect(server.map(str::to_string)));
        self.raise_state(ConnectionState::Connecting);
        if self.reachable {
            self.set_state(ConnectionState::Authorizing);
            self.set_state(ConnectionState::SettingName);
            self.set_state(ConnectionState::Ready);
        } else {
            self.error = "Connection refused".to_string();
            self.set_state(ConnectionState::Failed);
        }
        Ok(())
    }

    fn set_default_device(&mut self, name: &str) -> Result<()> {
        self.requests.push(Request::SetDefault(name.to_string()));
        if self.reject.contains(&Operation::SetDefaultDevice) {
            return self.refuse(Operation::SetDefaultDevice);
        }
        let success = self.sinks.iter().any(|s| s == name);
        if success {
            self.default_sink = Some(name.to_string());
        } else {
            self.error = "No such entity".to_string();
        }
        let event = Event::OpCompleted(Completion::SetDefaultDevice { success });
        if self.records_first {
            self.deferred = Some(event);
        } else {
            self.pending.push_back(event);
        }
        Ok(())
    }

    fn read_restore_records(&mut self) -> Result<()> {
        self.requests.push(Request::Read);
        if self.reject.contains(&Operation::ReadRestoreRecords) {
            return self.refuse(Operation::ReadRestoreRecords);
        }
        if self.fail_read {
            self.error = "Not supported".to_string();
            self.complete(Completion::RestoreReadFailed);
        } else {
            for record in self.records.clone() {
                self.complete(Completion::RestoreRecord(record));
            }
            self.complete(Completion::RestoreEnd);
        }
        self.flush_deferred();
        Ok(())
    }

    fn write_restore_record(&mut self, record: &RestoreRecord) -> Result<()> {
        self.requests.push(Request::Write(record.clone()));
        if self.reject.contains(&Operation::WriteRestoreRecord) {
            return self.refuse(Operation::WriteRestoreRecord);
        }
        let index = self.writes;
        self.writes += 1;
        let success = self.fail_write_at != Some(index);
        if success {
            match self.records.iter_mut().find(|r| r.name == record.name) {
                Some(existing) => *existing = record.clone(),
                None => self.records.push(record.clone()),
            }
        } else {
            self.error = "Access denied".to_string();
        }
        self.complete(Completion::RestoreWrite { success });
        Ok(())
    }

    fn drain(&mut self) -> Result<()> {
        self.requests.push(Request::Drain);
        if self.reject.contains(&Operation::Drain) {
            return self.refuse(Operation::Drain);
        }
        self.flush_deferred();
        self.complete(Completion::Drained);
        Ok(())
    }

    fn disconnect(&mut self) {
        self.requests.push(Request::Disconnect);
        if !matches!(
            self.state,
            ConnectionState::Unconnected | ConnectionState::Terminated
        ) {
            // Replies still in flight die with the connection.
            self.pending.clear();
            self.deferred = None;
            self.raise_state(ConnectionState::Terminated);
        }
    }

    fn poll(&mut self, events: &mut VecDeque<Event>) -> Result<()> {
        if !self.raised.is_empty() {
            self.hand_out(true, events);
            return Ok(());
        }
        if self.pending.is_empty() {
            return Err(SwitchError::Idle);
        }
        self.hand_out(false, events);
        Ok(())
    }

    fn take_raised(&mut self, events: &mut VecDeque<Event>) {
        self.hand_out(true, events);
    }

    fn last_error(&self) -> String {
        self.error.clone()
    }
}

pub fn record(name: &str, device: Option<&str>, mute: bool, level: u32) -> RestoreRecord {
    let mut channel_map = Map::default();
    channel_map.init_stereo();
    let mut volume = ChannelVolumes::default();
    volume.set(2, Volume(level));
    RestoreRecord {
        name: name.to_string(),
        channel_map,
        volume,
        mute,
        device: device.map(str::to_string),
    }
}

pub fn sample_records() -> Vec<RestoreRecord> {
    vec![
        record(
            "sink-input-by-application-name:Firefox",
            Some("alsa_output.analog-stereo"),
            false,
            Volume::NORMAL.0,
        ),
        record("sink-input-by-media-role:event", None, true, Volume::NORMAL.0 / 2),
        record(
            "sink-input-by-application-id:org.gnome.Rhythmbox3",
            Some("alsa_output.usb-headset"),
            false,
            Volume::NORMAL.0 / 4,
        ),
    ]
}
