//! Session
//!
//! Process-level application context: one socket, one listener thread, one
//! inbox. Startup binds the socket and starts the listener; shutdown tears the
//! listener down without waiting for anything still in flight.

use crate::config::Config;
use crate::dispatch::{dispatcher, Dispatcher, Inbox};
use crate::error::Error;
use crate::listener::Listener;
use log::info;
use std::net::SocketAddr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Starting,
    Listening,
    ShuttingDown,
}

pub struct Session {
    config: Config,
    state: SessionState,
    dispatcher: Dispatcher,
    inbox: Option<Inbox>,
    listener: Option<Listener>,
}

impl Session {
    pub fn new(config: Config) -> Session {
        let (dispatcher, inbox) = dispatcher();
        Session {
            config,
            state: SessionState::Starting,
            dispatcher,
            inbox: Some(inbox),
            listener: None,
        }
    }

    /// Binds the socket and starts listening. Returns the `Inbox` the
    /// presentation loop must drain.
    pub fn start(&mut self) -> Result<Inbox, Error> {
        if self.state != SessionState::Starting {
            return Err(Error::State(self.state));
        }
        let listener = Listener::bind(self.config.addr(), self.dispatcher.clone())?;
        let inbox = self.inbox.take().ok_or(Error::State(self.state))?;
        self.listener = Some(listener);
        self.state = SessionState::Listening;
        Ok(inbox)
    }

    pub fn shutdown(&mut self) {
        if self.state == SessionState::ShuttingDown {
            return;
        }
        self.state = SessionState::ShuttingDown;
        if let Some(mut listener) = self.listener.take() {
            listener.shutdown();
        }
        info!("session closed");
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Bound address while listening.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.listener.as_ref().map(|l| l.local_addr())
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.shutdown();
    }
}
