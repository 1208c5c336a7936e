//! Debug console core
//!
//! Receives unsolicited text messages over UDP, classifies them by severity,
//! and keeps a filterable history for a single-threaded presentation loop.

pub mod classify;
pub mod config;
pub mod console;
pub mod dispatch;
pub mod error;
pub mod history;
pub mod listener;
pub mod record;
pub mod session;
pub mod view;

pub use classify::classify;
pub use config::Config;
pub use console::{Console, Presenter, Status};
pub use dispatch::{dispatcher, Dispatch, Dispatcher, Inbox};
pub use error::{DispatchError, Error};
pub use history::HistoryStore;
pub use listener::{Listener, ListenerStatus};
pub use record::{Record, Severity};
pub use session::{Session, SessionState};
pub use view::{Filter, View};
