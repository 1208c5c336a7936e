//! UDP Listener
//!
//! Owns the receive-only UDP socket. A dedicated thread blocks in `mio::Poll`
//! on the socket and on a `mio::Waker` used for teardown, decodes each
//! datagram as UTF-8 and hands it to the `Dispatcher`. Nothing that happens
//! on this thread is fatal: bad payloads are dropped and receive errors are
//! reported as a `ListenerStatus` followed by a short pause.

use crate::dispatch::Dispatcher;
use crate::error::{DispatchError, Error};
use log::{debug, info, warn};
use mio::net::UdpSocket;
use mio::{Events, Interest, Poll, Token, Waker};
use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Largest datagram accepted; anything beyond is truncated by the OS.
pub const MAX_DATAGRAM_SIZE: usize = 65535;

/// Pause after a receive error, so a persistent failure does not spin.
pub const RECV_BACKOFF: Duration = Duration::from_millis(100);

const WAKER: Token = Token(0);
const SOCKET: Token = Token(1);

/// Listener side events surfaced to the presentation loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListenerStatus {
    /// The receive loop is running on this address.
    Listening(SocketAddr),
    /// A datagram was not valid text and was discarded.
    Dropped,
    /// A receive call failed. The loop keeps going.
    NetworkError(String),
    /// The receive loop exited.
    Stopped,
}

pub struct Listener {
    local_addr: SocketAddr,
    waker: Arc<Waker>,
    stop: Arc<AtomicBool>,
    thread: Option<thread::JoinHandle<()>>,
}

impl Listener {
    /// Binds `addr` and starts the receive thread. Failing to bind is the
    /// only fatal error of the pipeline.
    pub fn bind(addr: SocketAddr, dispatcher: Dispatcher) -> Result<Listener, Error> {
        let mut sock = UdpSocket::bind(addr).map_err(|source| Error::Bind { addr, source })?;
        let local_addr = sock
            .local_addr()
            .map_err(|source| Error::Bind { addr, source })?;

        let poll = Poll::new().map_err(Error::Poll)?;
        let waker = Arc::new(Waker::new(poll.registry(), WAKER).map_err(Error::Poll)?);
        poll.registry()
            .register(&mut sock, SOCKET, Interest::READABLE)
            .map_err(Error::Poll)?;

        let stop = Arc::new(AtomicBool::new(false));
        let thread_stop = stop.clone();
        let thread = thread::Builder::new()
            .name("dbgcon-listener".to_string())
            .spawn(move || Listener::receive_loop(sock, poll, dispatcher, thread_stop))
            .map_err(Error::Poll)?;

        info!("listening for debug messages on udp://{}", local_addr);
        Ok(Listener {
            local_addr,
            waker,
            stop,
            thread: Some(thread),
        })
    }

    /// Address actually bound, useful when binding port 0.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn is_running(&self) -> bool {
        self.thread.as_ref().map_or(false, |t| !t.is_finished())
    }

    /// Stops the receive thread and releases the socket. Datagrams still in
    /// the socket buffer are discarded.
    pub fn shutdown(&mut self) {
        let Some(thread) = self.thread.take() else {
            return;
        };
        self.stop.store(true, Ordering::Release);
        if let Err(e) = self.waker.wake() {
            warn!("failed to wake listener thread: {}", e);
        }
        if thread.join().is_err() {
            warn!("listener thread panicked");
        }
        info!("listener on udp://{} shut down", self.local_addr);
    }

    fn receive_loop(sock: UdpSocket, mut poll: Poll, dispatcher: Dispatcher, stop: Arc<AtomicBool>) {
        let mut events = Events::with_capacity(8);
        let mut buf = vec![0u8; MAX_DATAGRAM_SIZE];

        if let Ok(addr) = sock.local_addr() {
            if dispatcher.status(ListenerStatus::Listening(addr)).is_err() {
                return;
            }
        }

        'ioloop: loop {
            if let Err(e) = poll.poll(&mut events, None) {
                if e.kind() == io::ErrorKind::Interrupted {
                    continue;
                }
                warn!("listener poll failed: {}", e);
                if dispatcher.status(ListenerStatus::NetworkError(e.to_string())).is_err() {
                    break 'ioloop;
                }
                thread::sleep(RECV_BACKOFF);
                continue;
            }

            if stop.load(Ordering::Acquire) {
                break 'ioloop;
            }

            for event in events.iter() {
                if event.token() != SOCKET {
                    continue;
                }
                // Readiness is edge triggered, drain until WouldBlock.
                loop {
                    match handle_recv(recv_datagram(&sock, &mut buf), &dispatcher) {
                        Ok(RecvStep::Drained) => break,
                        Ok(RecvStep::Continue) => {}
                        // Inbox dropped: nobody is presenting anymore.
                        Err(_) => break 'ioloop,
                    }
                    if stop.load(Ordering::Acquire) {
                        break 'ioloop;
                    }
                }
            }
        }

        let _ = dispatcher.status(ListenerStatus::Stopped);
    }
}

impl Drop for Listener {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Outcome of one receive attempt.
#[derive(Debug, PartialEq, Eq)]
enum RecvStep {
    /// Keep draining the socket.
    Continue,
    /// Socket is empty, go back to polling.
    Drained,
}

/// Hands one receive result to the dispatcher. Decode and receive failures
/// are reported and followed by `RECV_BACKOFF`. Fails only when the inbox
/// is gone.
fn handle_recv(res: Result<String, Error>, dispatcher: &Dispatcher) -> Result<RecvStep, DispatchError> {
    match res {
        Ok(text) => dispatcher.deliver(&text)?,
        Err(Error::Receive(e)) if e.kind() == io::ErrorKind::WouldBlock => {
            return Ok(RecvStep::Drained)
        }
        Err(Error::Decode(e)) => {
            warn!("dropping datagram: {}", e);
            let res = dispatcher.status(ListenerStatus::Dropped);
            thread::sleep(RECV_BACKOFF);
            res?
        }
        Err(e) => {
            warn!("{}", e);
            let res = dispatcher.status(ListenerStatus::NetworkError(e.to_string()));
            thread::sleep(RECV_BACKOFF);
            res?
        }
    }
    Ok(RecvStep::Continue)
}

/// Receives one datagram and decodes it as text.
fn recv_datagram(sock: &UdpSocket, buf: &mut [u8]) -> Result<String, Error> {
    let (size, peer) = sock.recv_from(buf).map_err(Error::Receive)?;
    debug!("{} bytes from {}", size, peer);
    Ok(String::from_utf8(buf[..size].to_vec())?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::{dispatcher, Dispatch};
    use std::net::UdpSocket as StdUdpSocket;

    fn loopback() -> SocketAddr {
        "127.0.0.1:0".parse().unwrap()
    }

    #[test]
    fn bind_conflict_is_fatal() {
        let (d, _inbox) = dispatcher();
        let taken = StdUdpSocket::bind(loopback()).unwrap();
        let addr = taken.local_addr().unwrap();
        match Listener::bind(addr, d) {
            Err(Error::Bind { addr: a, .. }) => assert_eq!(a, addr),
            Err(e) => panic!("unexpected error {}", e),
            Ok(_) => panic!("second bind on {} succeeded", addr),
        }
    }

    #[test]
    fn invalid_utf8_is_dropped_and_loop_continues() {
        let (d, inbox) = dispatcher();
        let mut listener = Listener::bind(loopback(), d).unwrap();
        let addr = listener.local_addr();

        let timeout = Duration::from_secs(5);
        assert_eq!(
            inbox.recv_timeout(timeout).unwrap(),
            Dispatch::Status(ListenerStatus::Listening(addr))
        );

        let sender = StdUdpSocket::bind(loopback()).unwrap();
        sender.send_to(&[0xff, 0xfe, 0x00], addr).unwrap();
        sender.send_to(b"still alive", addr).unwrap();

        assert_eq!(
            inbox.recv_timeout(timeout).unwrap(),
            Dispatch::Status(ListenerStatus::Dropped)
        );
        let dropped_at = std::time::Instant::now();
        match inbox.recv_timeout(timeout).unwrap() {
            Dispatch::Record(r) => assert_eq!(r.raw_text(), "still alive"),
            other => panic!("expected record, got {:?}", other),
        }
        // The status is queued before the pause starts, so allow a little slack.
        assert!(dropped_at.elapsed() >= RECV_BACKOFF - Duration::from_millis(20));

        listener.shutdown();
        assert!(!listener.is_running());
        assert_eq!(
            inbox.recv_timeout(timeout).unwrap(),
            Dispatch::Status(ListenerStatus::Stopped)
        );
    }

    #[test]
    fn receive_error_is_reported_and_loop_continues() {
        let (d, inbox) = dispatcher();

        let started = std::time::Instant::now();
        let step = handle_recv(
            Err(Error::Receive(io::Error::other("connection reset"))),
            &d,
        );
        assert_eq!(step, Ok(RecvStep::Continue));
        assert!(started.elapsed() >= RECV_BACKOFF);
        assert_eq!(
            inbox.try_recv().unwrap(),
            Dispatch::Status(ListenerStatus::NetworkError(
                "receive failed: connection reset".to_string()
            ))
        );

        assert_eq!(handle_recv(Ok("next".to_string()), &d), Ok(RecvStep::Continue));
        match inbox.try_recv().unwrap() {
            Dispatch::Record(r) => assert_eq!(r.raw_text(), "next"),
            other => panic!("expected record, got {:?}", other),
        }
    }

    #[test]
    fn decode_error_pauses_before_next_receive() {
        let (d, inbox) = dispatcher();
        let bad = String::from_utf8(vec![0xff]).unwrap_err();
        let started = std::time::Instant::now();
        assert_eq!(handle_recv(Err(Error::Decode(bad)), &d), Ok(RecvStep::Continue));
        assert!(started.elapsed() >= RECV_BACKOFF);
        assert_eq!(inbox.try_recv().unwrap(), Dispatch::Status(ListenerStatus::Dropped));
    }

    #[test]
    fn would_block_ends_the_drain() {
        let (d, inbox) = dispatcher();
        let res = handle_recv(Err(Error::Receive(io::ErrorKind::WouldBlock.into())), &d);
        assert_eq!(res, Ok(RecvStep::Drained));
        assert!(inbox.try_recv().is_err());
    }

    #[test]
    fn closed_inbox_stops_the_loop() {
        let (d, inbox) = dispatcher();
        drop(inbox);
        assert_eq!(handle_recv(Ok("x".to_string()), &d), Err(DispatchError::Closed));
    }

    #[test]
    fn shutdown_releases_socket() {
        let (d, _inbox) = dispatcher();
        let mut listener = Listener::bind(loopback(), d).unwrap();
        let addr = listener.local_addr();
        listener.shutdown();
        listener.shutdown();
        let (d2, _inbox2) = dispatcher();
        assert!(Listener::bind(addr, d2).is_ok());
    }

    #[test]
    fn loop_exits_when_inbox_is_dropped() {
        let (d, inbox) = dispatcher();
        let listener = Listener::bind(loopback(), d).unwrap();
        let addr = listener.local_addr();
        drop(inbox);

        let sender = StdUdpSocket::bind(loopback()).unwrap();
        sender.send_to(b"nobody listens", addr).unwrap();
        for _ in 0..50 {
            if !listener.is_running() {
                break;
            }
            thread::sleep(Duration::from_millis(20));
        }
        assert!(!listener.is_running());
    }
}
