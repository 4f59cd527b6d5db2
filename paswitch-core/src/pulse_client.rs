use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use libpulse_binding as pulse;
use pulse::callbacks::ListResult;
use pulse::context::ext_stream_restore::Info;
use pulse::context::{Context, FlagSet as ContextFlagSet};
use pulse::mainloop::standard::{IterateResult, Mainloop};
use pulse::proplist::{properties, Proplist, UpdateMode};
use tracing::{debug, error, info, trace};

use crate::error::{Result, SwitchError};
use crate::service::AudioService;
use crate::session::{Completion, ConnectionState, Event, RestoreRecord};

const APPLICATION_NAME: &str = "Commandline sink switcher";
const APPLICATION_ID: &str = "org.tablix.paswitch";

/// What the libpulse callbacks leave behind for [`PulseClient::poll`].
///
/// The state callback only records that something changed; the state itself is read
/// back from the context once the mainloop iteration has returned, so no callback ever
/// needs to borrow the context.
#[derive(Debug)]
enum Notice {
    StateChanged,
    Completed(Completion),
}

type Notices = Rc<RefCell<VecDeque<Notice>>>;

/// [`AudioService`] backed by a PulseAudio standard mainloop.
///
/// Everything runs on the calling thread. Completions fire from inside
/// `Mainloop::iterate`, which only happens in [`AudioService::poll`]. State changes can
/// also fire straight from `connect` and `disconnect`; those notices are handed out by
/// [`AudioService::take_raised`] or by the next poll, which then skips the blocking
/// iteration.
pub struct PulseClient {
    // Dropped before the mainloop it was created on.
    context: Context,
    mainloop: Mainloop,
    notices: Notices,
    last_state: Option<ConnectionState>,
}

impl PulseClient {
    pub fn new() -> Result<Self> {
        let mainloop = Mainloop::new().ok_or(SwitchError::Allocation("mainloop"))?;

        let mut proplist = Proplist::new().ok_or(SwitchError::Allocation("proplist"))?;
        proplist
            .set_str(properties::APPLICATION_NAME, APPLICATION_NAME)
            .map_err(|_| SwitchError::Allocation("proplist"))?;
        proplist
            .set_str(properties::APPLICATION_ID, APPLICATION_ID)
            .map_err(|_| SwitchError::Allocation("proplist"))?;

        let mut context = Context::new_with_proplist(&mainloop, APPLICATION_NAME, &proplist)
            .ok_or(SwitchError::Allocation("context"))?;

        let notices: Notices = Rc::new(RefCell::new(VecDeque::new()));
        let state_notices = Rc::clone(&notices);
        context.set_state_callback(Some(Box::new(move || {
            state_notices.borrow_mut().push_back(Notice::StateChanged);
        })));

        Ok(Self {
            context,
            mainloop,
            notices,
            last_state: None,
        })
    }

    pub fn state(&self) -> ConnectionState {
        self.context.get_state().into()
    }

    fn completion_sink(&self) -> impl Fn(Completion) + 'static {
        let notices = Rc::clone(&self.notices);
        move |completion| notices.borrow_mut().push_back(Notice::Completed(completion))
    }

    fn translate(&mut self, notice: Notice, events: &mut VecDeque<Event>) {
        match notice {
            Notice::StateChanged => {
                let state = self.state();
                // Several transitions inside one iteration collapse onto the latest state.
                if self.last_state == Some(state) {
                    return;
                }
                trace!("Context state {:?}", state);
                self.last_state = Some(state);
                events.push_back(Event::StateChanged(state));
            }
            Notice::Completed(completion) => events.push_back(Event::OpCompleted(completion)),
        }
    }
}

fn owned_record(info: &Info) -> RestoreRecord {
    RestoreRecord {
        name: info
            .name
            .as_ref()
            .map(|name| name.to_string())
            .unwrap_or_default(),
        channel_map: info.channel_map,
        volume: info.volume,
        mute: info.mute,
        device: info.device.as_ref().map(|device| device.to_string()),
    }
}

impl AudioService for PulseClient {
    fn connect(&mut self, server: Option<&str>) -> Result<()> {
        info!("Connecting to {}", server.unwrap_or("default server"));
        self.context
            .connect(server, ContextFlagSet::NOFLAGS, None)
            .map_err(|e| SwitchError::Connect(e.to_string().unwrap_or_default()))
    }

    // libpulse-binding asserts on a null operation, so creation errors never reach us
    // for the requests that return a bare `Operation`.
    fn set_default_device(&mut self, name: &str) -> Result<()> {
        let sink = self.completion_sink();
        let _op = self.context.set_default_sink(name, move |success| {
            sink(Completion::SetDefaultDevice { success })
        });
        Ok(())
    }

    fn read_restore_records(&mut self) -> Result<()> {
        let sink = self.completion_sink();
        let mut restore = self.context.stream_restore();
        let _op = restore.read(move |result: ListResult<&Info>| match result {
            ListResult::Item(info) => sink(Completion::RestoreRecord(owned_record(info))),
            ListResult::End => sink(Completion::RestoreEnd),
            ListResult::Error => sink(Completion::RestoreReadFailed),
        });
        Ok(())
    }

    fn write_restore_record(&mut self, record: &RestoreRecord) -> Result<()> {
        let info = Info {
            name: Some(record.name.as_str().into()),
            channel_map: record.channel_map,
            volume: record.volume,
            device: record.device.as_deref().map(Into::into),
            mute: record.mute,
        };
        let sink = self.completion_sink();
        let mut restore = self.context.stream_restore();
        let _op = restore.write(UpdateMode::Replace, &[&info], true, move |success| {
            sink(Completion::RestoreWrite { success })
        });
        Ok(())
    }

    fn drain(&mut self) -> Result<()> {
        let sink = self.completion_sink();
        match self.context.drain(move || sink(Completion::Drained)) {
            Some(_op) => Ok(()),
            None => Err(SwitchError::Rejected {
                operation: crate::session::Operation::Drain,
                reason: self.last_error(),
            }),
        }
    }

    fn disconnect(&mut self) {
        if !matches!(
            self.state(),
            ConnectionState::Unconnected | ConnectionState::Terminated
        ) {
            debug!("Disconnecting context");
            self.context.disconnect();
        }
    }

    fn poll(&mut self, events: &mut VecDeque<Event>) -> Result<()> {
        if !self.notices.borrow().is_empty() {
            self.take_raised(events);
            return Ok(());
        }

        match self.mainloop.iterate(true) {
            IterateResult::Success(_) => {}
            IterateResult::Quit(retval) => {
                error!("Mainloop quit unexpectedly with {}", retval.0);
                return Err(SwitchError::Mainloop(format!("quit with {}", retval.0)));
            }
            IterateResult::Err(e) => {
                return Err(SwitchError::Mainloop(e.to_string().unwrap_or_default()));
            }
        }

        self.take_raised(events);
        Ok(())
    }

    fn take_raised(&mut self, events: &mut VecDeque<Event>) {
        let pending: Vec<Notice> = self.notices.borrow_mut().drain(..).collect();
        for notice in pending {
            self.translate(notice, events);
        }
    }

    fn last_error(&self) -> String {
        self.context
            .errno()
            .to_string()
            .unwrap_or_else(|| "unknown error".to_string())
    }
}
