//! Console
//!
//! Presentation-side application state: the history, the current filter,
//! the derived view and the status line. All of it lives on the presentation
//! loop; records only get here through the `Inbox`.
//!
//! Rendering is left to a `Presenter`, which receives instructions whenever
//! something visible changes.

use crate::dispatch::Dispatch;
use crate::history::HistoryStore;
use crate::listener::ListenerStatus;
use crate::record::{Record, Severity};
use crate::view::{Filter, View};
use std::fmt;
use std::net::SocketAddr;

/// Status line contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Status {
    Ready,
    Listening(SocketAddr),
    ErrorReceived,
    WarningReceived,
    Success,
    Cleared,
    Filtered(usize),
    NetworkError(String),
    /// Total datagrams dropped because they were not valid text.
    Dropped(usize),
    Stopped,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Ready => write!(f, "Ready"),
            Status::Listening(addr) => write!(f, "Listening on udp://{}", addr),
            Status::ErrorReceived => write!(f, "Error received"),
            Status::WarningReceived => write!(f, "Warning received"),
            Status::Success => write!(f, "Success"),
            Status::Cleared => write!(f, "Console cleared"),
            Status::Filtered(n) => write!(f, "Filtered: {} messages", n),
            Status::NetworkError(e) => write!(f, "Network error: {}", e),
            Status::Dropped(n) => write!(f, "Dropped {} undecodable datagram(s)", n),
            Status::Stopped => write!(f, "Listener stopped"),
        }
    }
}

/// Instructions to whatever renders the console. All methods default to
/// doing nothing.
pub trait Presenter {
    /// A record was appended to the history. `visible` tells whether it
    /// passes the current filter and should be shown right away.
    fn record_appended(&mut self, _record: &Record, _visible: bool) {}

    /// The visible set was recomputed from scratch; discard anything shown
    /// and show `visible` instead.
    fn view_rebuilt(&mut self, _visible: &[&Record]) {}

    fn status_changed(&mut self, _status: &Status) {}
}

impl Presenter for () {}

pub struct Console<P: Presenter = ()> {
    history: HistoryStore,
    filter: Filter,
    view: View,
    status: Status,
    autoscroll: bool,
    dropped: usize,
    presenter: P,
}

impl Console<()> {
    pub fn new() -> Console<()> {
        Console::with_presenter(())
    }
}

impl Default for Console<()> {
    fn default() -> Self {
        Console::new()
    }
}

impl<P: Presenter> Console<P> {
    pub fn with_presenter(presenter: P) -> Console<P> {
        Console {
            history: HistoryStore::new(),
            filter: Filter::default(),
            view: View::new(),
            status: Status::Ready,
            autoscroll: true,
            dropped: 0,
            presenter,
        }
    }

    /// Routes one item received from the `Inbox`.
    pub fn dispatch(&mut self, item: Dispatch) {
        match item {
            Dispatch::Record(record) => self.on_record(record),
            Dispatch::Status(status) => self.on_listener_status(status),
        }
    }

    pub fn on_record(&mut self, record: Record) {
        let index = self.history.append(record);
        let record = &self.history.snapshot()[index];
        let visible = self.view.admit(index, record, &self.filter);
        self.presenter.record_appended(record, visible);

        match record.severity() {
            Severity::Error => self.set_status(Status::ErrorReceived),
            Severity::Warning => self.set_status(Status::WarningReceived),
            Severity::Success => self.set_status(Status::Success),
            Severity::Info => {}
        }
    }

    /// Replaces the filter and rebuilds the view from the full history.
    pub fn on_filter_changed(&mut self, filter_text: &str) {
        self.filter = Filter::new(filter_text);
        self.view.rebuild(&self.history, &self.filter);
        let visible = self.view.records(&self.history);
        self.presenter.view_rebuilt(&visible);
        self.set_status(Status::Filtered(self.view.len()));
    }

    pub fn on_clear_requested(&mut self) {
        self.history.clear();
        self.view.clear();
        self.presenter.view_rebuilt(&[]);
        self.set_status(Status::Cleared);
    }

    pub fn on_listener_status(&mut self, status: ListenerStatus) {
        let status = match status {
            ListenerStatus::Listening(addr) => Status::Listening(addr),
            ListenerStatus::Dropped => {
                self.dropped += 1;
                Status::Dropped(self.dropped)
            }
            ListenerStatus::NetworkError(e) => Status::NetworkError(e),
            ListenerStatus::Stopped => Status::Stopped,
        };
        self.set_status(status);
    }

    pub fn toggle_autoscroll(&mut self) -> bool {
        self.autoscroll = !self.autoscroll;
        self.autoscroll
    }

    pub fn set_autoscroll(&mut self, on: bool) {
        self.autoscroll = on;
    }

    pub fn autoscroll(&self) -> bool {
        self.autoscroll
    }

    pub fn history(&self) -> &HistoryStore {
        &self.history
    }

    pub fn filter(&self) -> &Filter {
        &self.filter
    }

    pub fn view(&self) -> &View {
        &self.view
    }

    /// Currently visible records, oldest first.
    pub fn visible(&self) -> Vec<&Record> {
        self.view.records(&self.history)
    }

    pub fn status(&self) -> &Status {
        &self.status
    }

    /// Messages received since startup or the last clear.
    pub fn message_count(&self) -> usize {
        self.history.count()
    }

    pub fn presenter(&self) -> &P {
        &self.presenter
    }

    pub fn presenter_mut(&mut self) -> &mut P {
        &mut self.presenter
    }

    fn set_status(&mut self, status: Status) {
        if self.status != status {
            self.status = status;
            self.presenter.status_changed(&self.status);
        }
    }
}
