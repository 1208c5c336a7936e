//! Dispatcher
//!
//! The only link between the listener thread and the presentation loop.
//! Records and listener status changes are multiplexed over a single
//! unbounded crossbeam channel; the presentation loop is the only consumer,
//! so everything it owns is mutated from one thread and in arrival order.

use crate::classify::classify;
use crate::console::{Console, Presenter};
use crate::error::DispatchError;
use crate::listener::ListenerStatus;
use crate::record::Record;
use chrono::{DateTime, Local};
use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Items delivered to the presentation loop.
#[derive(Debug, Clone, PartialEq)]
pub enum Dispatch {
    Record(Record),
    Status(ListenerStatus),
}

/// Producer side. Cheap to clone, usable from any thread.
#[derive(Clone)]
pub struct Dispatcher {
    tx: Sender<Dispatch>,
    // Last handed out timestamp. Held across classify + send so that
    // timestamps never go backwards in queue order.
    last_stamp: Arc<Mutex<Option<DateTime<Local>>>>,
}

/// Consumer side, owned by the presentation loop.
pub struct Inbox {
    rx: Receiver<Dispatch>,
}

/// Creates a connected `Dispatcher`/`Inbox` pair.
pub fn dispatcher() -> (Dispatcher, Inbox) {
    let (tx, rx) = channel::unbounded();
    (
        Dispatcher {
            tx,
            last_stamp: Arc::new(Mutex::new(None)),
        },
        Inbox { rx },
    )
}

impl Dispatcher {
    /// Classifies `raw_text` and schedules it for the presentation loop.
    pub fn deliver(&self, raw_text: &str) -> Result<(), DispatchError> {
        let mut last = self
            .last_stamp
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let now = match *last {
            Some(prev) => Local::now().max(prev),
            None => Local::now(),
        };
        let record = classify(raw_text, now);
        self.tx
            .send(Dispatch::Record(record))
            .map_err(|_| DispatchError::Closed)?;
        *last = Some(now);
        Ok(())
    }

    /// Schedules a listener status change for the presentation loop.
    pub fn status(&self, status: ListenerStatus) -> Result<(), DispatchError> {
        self.tx
            .send(Dispatch::Status(status))
            .map_err(|_| DispatchError::Closed)
    }
}

impl Inbox {
    /// For use in `crossbeam::select!`.
    pub fn receiver(&self) -> &Receiver<Dispatch> {
        &self.rx
    }

    /// Blocks for the next item. `None` once every `Dispatcher` is gone.
    pub fn recv(&self) -> Option<Dispatch> {
        self.rx.recv().ok()
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Result<Dispatch, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }

    pub fn try_recv(&self) -> Result<Dispatch, TryRecvError> {
        self.rx.try_recv()
    }

    /// Number of items waiting.
    pub fn pending(&self) -> usize {
        self.rx.len()
    }

    /// Hands everything queued so far to `console`, in order. Returns the
    /// number of items processed.
    pub fn drain<P: Presenter>(&self, console: &mut Console<P>) -> usize {
        let mut n = 0;
        while let Ok(item) = self.rx.try_recv() {
            console.dispatch(item);
            n += 1;
        }
        n
    }
}
