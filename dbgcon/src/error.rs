use crate::session::SessionState;
use std::io;
use std::net::SocketAddr;
use std::string::FromUtf8Error;
use thiserror::Error;

/// Errors raised by the receive side of the pipeline.
///
/// `Receive` and `Decode` are handled inside the receive loop and surface as a
/// `ListenerStatus`. The rest abort startup.
#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },
    #[error("receive failed: {0}")]
    Receive(#[source] io::Error),
    #[error("payload is not valid UTF-8: {0}")]
    Decode(#[from] FromUtf8Error),
    #[error("listener setup failed: {0}")]
    Poll(#[source] io::Error),
    #[error("session is {0:?}, expected Starting")]
    State(SessionState),
}

/// Possible errors when handing data to the presentation loop.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DispatchError {
    /// The `Inbox` was dropped, nothing will consume further messages.
    #[error("presentation loop is gone")]
    Closed,
}
