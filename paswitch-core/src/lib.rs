pub mod error;
pub mod event_loop;
pub mod pulse_client;
pub mod sequencer;
pub mod service;
pub mod session;
pub mod shutdown;

pub use error::{Result, SwitchError};
pub use event_loop::{EventLoop, Outcome};
pub use pulse_client::PulseClient;
pub use sequencer::{Phase, Sequencer};
pub use service::AudioService;
pub use session::{Completion, ConnectionState, Effect, Event, Failure, Operation, RestoreRecord};

