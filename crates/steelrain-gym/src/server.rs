//! Loopback TCP listener serving a single controller at a time.
//!
//! [`ListenerService`] owns a background thread that polls for a client,
//! serves it request by request through a [`CommandHandler`], and returns to
//! accepting when the client disconnects or the connection fails.

use std::io;
use std::net::{Ipv4Addr, Shutdown, SocketAddr, SocketAddrV4, TcpListener, TcpStream};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use bevy::log::{debug, error, info, warn};
use parking_lot::Mutex;
use thiserror::Error;

use steelrain_core::config::ListenerConfig;

use crate::framing::{read_command_frame, write_message};
use crate::protocol::{FramingError, Request, Response};
use crate::rendezvous::RendezvousError;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Listener errors. `Bind` is fatal; the others end one connection.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Framing(#[from] FramingError),

    #[error(transparent)]
    Rendezvous(#[from] RendezvousError),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

// ---------------------------------------------------------------------------
// CommandHandler
// ---------------------------------------------------------------------------

/// Turns one parsed request into one reply. Runs on the listener thread.
pub trait CommandHandler: Send + 'static {
    fn handle(&mut self, request: Request) -> Result<Response, RendezvousError>;
}

impl<F> CommandHandler for F
where
    F: FnMut(Request) -> Result<Response, RendezvousError> + Send + 'static,
{
    fn handle(&mut self, request: Request) -> Result<Response, RendezvousError> {
        self(request)
    }
}

// ---------------------------------------------------------------------------
// ListenerState
// ---------------------------------------------------------------------------

/// Lifecycle of the listener.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ListenerState {
    #[default]
    Idle,
    /// Socket bound, not yet configured.
    Bound,
    /// Socket configured for polling; thread starting.
    Listening,
    /// Waiting for a client.
    Accepting,
    /// Serving a connected client.
    Serving,
    /// Thread finished.
    Closed,
}

struct Shared {
    stop: AtomicBool,
    state: Mutex<ListenerState>,
    client: Mutex<Option<TcpStream>>,
}

impl Shared {
    fn set_state(&self, state: ListenerState) {
        *self.state.lock() = state;
    }

    fn stopping(&self) -> bool {
        self.stop.load(Ordering::SeqCst)
    }
}

// ---------------------------------------------------------------------------
// ListenerService
// ---------------------------------------------------------------------------

/// Background TCP listener bound to `127.0.0.1`.
///
/// Stops (and joins its thread) on [`stop`](Self::stop) or drop.
pub struct ListenerService {
    local_addr: SocketAddr,
    shared: Arc<Shared>,
    thread: Option<JoinHandle<()>>,
}

impl ListenerService {
    /// Bind `127.0.0.1:<config.port>` and start serving with `handler`.
    pub fn start(config: &ListenerConfig, handler: impl CommandHandler) -> Result<Self, ServerError> {
        let addr = SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::LOCALHOST, config.port));
        Self::start_on(addr, Duration::from_millis(config.accept_poll_ms), handler)
    }

    /// Bind an explicit address.
    pub fn start_on(
        addr: SocketAddr,
        accept_poll: Duration,
        handler: impl CommandHandler,
    ) -> Result<Self, ServerError> {
        let shared = Arc::new(Shared {
            stop: AtomicBool::new(false),
            state: Mutex::new(ListenerState::Idle),
            client: Mutex::new(None),
        });

        let listener = TcpListener::bind(addr).map_err(|source| ServerError::Bind { addr, source })?;
        shared.set_state(ListenerState::Bound);
        listener
            .set_nonblocking(true)
            .map_err(|source| ServerError::Bind { addr, source })?;
        let local_addr = listener.local_addr()?;
        shared.set_state(ListenerState::Listening);
        info!("listening on {local_addr}");

        let thread_shared = Arc::clone(&shared);
        let thread = thread::Builder::new()
            .name("steelrain-listener".into())
            .spawn(move || accept_loop(&listener, handler, &thread_shared, accept_poll))?;

        Ok(Self {
            local_addr,
            shared,
            thread: Some(thread),
        })
    }

    /// The address actually bound (useful with port 0).
    pub const fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn state(&self) -> ListenerState {
        *self.shared.state.lock()
    }

    /// Stop accepting, disconnect any client and join the thread. Idempotent.
    ///
    /// A command already handed to the handler is not interrupted, so this
    /// can block for up to `rendezvous_timeout_ms` when the simulation thread
    /// is not draining.
    pub fn stop(&mut self) {
        self.shared.stop.store(true, Ordering::SeqCst);
        if let Some(client) = self.shared.client.lock().as_ref() {
            let _ = client.shutdown(Shutdown::Both);
        }
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                error!("listener thread panicked");
            }
            info!("listener on {} stopped", self.local_addr);
        }
    }
}

impl Drop for ListenerService {
    fn drop(&mut self) {
        self.stop();
    }
}

// ---------------------------------------------------------------------------
// Listener thread
// ---------------------------------------------------------------------------

fn accept_loop(
    listener: &TcpListener,
    mut handler: impl CommandHandler,
    shared: &Shared,
    poll: Duration,
) {
    shared.set_state(ListenerState::Accepting);
    while !shared.stopping() {
        match listener.accept() {
            Ok((stream, peer)) => {
                info!("controller connected from {peer}");
                match serve_client(stream, &mut handler, shared) {
                    Ok(()) => info!("controller {peer} disconnected"),
                    Err(e) => warn!("connection to {peer} closed: {e}"),
                }
                shared.client.lock().take();
                shared.set_state(ListenerState::Accepting);
            }
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => thread::sleep(poll),
            Err(e) => {
                warn!("accept failed: {e}");
                thread::sleep(poll);
            }
        }
    }
    shared.set_state(ListenerState::Closed);
}

fn serve_client(
    stream: TcpStream,
    handler: &mut impl CommandHandler,
    shared: &Shared,
) -> Result<(), ServerError> {
    stream.set_nonblocking(false)?;
    stream.set_nodelay(true)?;
    let mut reader = stream.try_clone()?;
    *shared.client.lock() = Some(stream.try_clone()?);
    if shared.stopping() {
        return Ok(());
    }
    shared.set_state(ListenerState::Serving);
    let mut writer = stream;

    loop {
        let Some(frame) = read_command_frame(&mut reader)? else {
            return Ok(());
        };
        let response = match Request::from_value(frame) {
            Ok(request) => {
                debug!("request: {request:?}");
                handler.handle(request)?
            }
            Err(e) => {
                warn!("rejected request: {e}");
                Response::error(e.to_string())
            }
        };
        write_message(&mut writer, &response)?;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::framing::read_message;
    use crate::protocol::Status;
    use std::io::Write;
    use std::time::Instant;

    fn test_config() -> ListenerConfig {
        ListenerConfig {
            port: 0,
            ..ListenerConfig::default()
        }
    }

    /// Handler answering every request without a simulation behind it.
    fn echo_handler(request: Request) -> Result<Response, RendezvousError> {
        Ok(match request {
            Request::Reset => Response::Step {
                obs: vec![0.0; 3],
                reward: 0.0,
                done: false,
                delta_time: 0.0,
            },
            Request::Step { action } => Response::Step {
                obs: action.to_vec(),
                reward: -1.0,
                done: false,
                delta_time: 0.016,
            },
            Request::Pause => Response::Status {
                status: Status::Paused,
            },
            Request::Resume => Response::Status {
                status: Status::Resumed,
            },
        })
    }

    fn send_recv(stream: &mut TcpStream, request: &serde_json::Value) -> Response {
        write_message(stream, request).unwrap();
        read_message(stream).unwrap().unwrap()
    }

    fn wait_for_state(service: &ListenerService, state: ListenerState) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while service.state() != state {
            assert!(Instant::now() < deadline, "listener never reached {state:?}");
            thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn serves_requests_in_order() {
        let service = ListenerService::start(&test_config(), echo_handler).unwrap();
        let mut stream = TcpStream::connect(service.local_addr()).unwrap();

        let resp = send_recv(&mut stream, &serde_json::json!({"cmd": "reset"}));
        assert!(matches!(resp, Response::Step { ref obs, .. } if obs.len() == 3));

        let resp = send_recv(&mut stream, &serde_json::json!({"cmd": "step", "action": [1, 2, 0]}));
        assert!(matches!(resp, Response::Step { ref obs, .. } if obs == &vec![1.0, 2.0, 0.0]));

        let resp = send_recv(&mut stream, &serde_json::json!({"cmd": "pause"}));
        assert_eq!(
            resp,
            Response::Status {
                status: Status::Paused
            }
        );
    }

    #[test]
    fn unknown_command_gets_error_and_connection_survives() {
        let service = ListenerService::start(&test_config(), echo_handler).unwrap();
        let mut stream = TcpStream::connect(service.local_addr()).unwrap();

        let resp = send_recv(&mut stream, &serde_json::json!({"cmd": "jump"}));
        assert_eq!(resp, Response::error("unknown command: jump"));

        let resp = send_recv(&mut stream, &serde_json::json!({"cmd": "resume"}));
        assert_eq!(
            resp,
            Response::Status {
                status: Status::Resumed
            }
        );
    }

    #[test]
    fn disconnect_returns_to_accepting() {
        let service = ListenerService::start(&test_config(), echo_handler).unwrap();
        {
            let mut stream = TcpStream::connect(service.local_addr()).unwrap();
            send_recv(&mut stream, &serde_json::json!({"cmd": "reset"}));
            wait_for_state(&service, ListenerState::Serving);
        }
        wait_for_state(&service, ListenerState::Accepting);

        let mut stream = TcpStream::connect(service.local_addr()).unwrap();
        let resp = send_recv(&mut stream, &serde_json::json!({"cmd": "pause"}));
        assert!(matches!(resp, Response::Status { .. }));
    }

    #[test]
    fn framing_error_drops_connection_only() {
        let service = ListenerService::start(&test_config(), echo_handler).unwrap();
        {
            let mut stream = TcpStream::connect(service.local_addr()).unwrap();
            // Object without a `cmd` field is fatal for this connection.
            write_message(&mut stream, &serde_json::json!({"action": [0, 0, 0]})).unwrap();
            let next: Result<Option<Response>, _> = read_message(&mut stream);
            assert!(matches!(next, Ok(None) | Err(_)));
        }
        wait_for_state(&service, ListenerState::Accepting);

        let mut stream = TcpStream::connect(service.local_addr()).unwrap();
        let resp = send_recv(&mut stream, &serde_json::json!({"cmd": "reset"}));
        assert!(matches!(resp, Response::Step { .. }));
    }

    #[test]
    fn partial_header_drops_connection() {
        let service = ListenerService::start(&test_config(), echo_handler).unwrap();
        let mut stream = TcpStream::connect(service.local_addr()).unwrap();
        stream.write_all(&[1, 0]).unwrap();
        stream.shutdown(Shutdown::Write).unwrap();
        let next: Result<Option<Response>, _> = read_message(&mut stream);
        assert!(matches!(next, Ok(None) | Err(_)));
        wait_for_state(&service, ListenerState::Accepting);
    }

    #[test]
    fn handler_failure_closes_connection_then_accepts_again() {
        let mut failed_once = false;
        let handler = move |request: Request| -> Result<Response, RendezvousError> {
            if failed_once {
                return echo_handler(request);
            }
            failed_once = true;
            Err(RendezvousError::Timeout(Duration::from_millis(1)))
        };
        let service = ListenerService::start(&test_config(), handler).unwrap();

        let mut stream = TcpStream::connect(service.local_addr()).unwrap();
        write_message(&mut stream, &serde_json::json!({"cmd": "reset"})).unwrap();
        let next: Result<Option<Response>, _> = read_message(&mut stream);
        assert!(matches!(next, Ok(None) | Err(_)));
        drop(stream);

        wait_for_state(&service, ListenerState::Accepting);
        let mut stream = TcpStream::connect(service.local_addr()).unwrap();
        let response = send_recv(&mut stream, &serde_json::json!({"cmd": "reset"}));
        assert!(matches!(response, Response::Step { done: false, .. }));
    }

    #[test]
    fn stop_is_idempotent_and_closes() {
        let mut service = ListenerService::start(&test_config(), echo_handler).unwrap();
        wait_for_state(&service, ListenerState::Accepting);
        service.stop();
        assert_eq!(service.state(), ListenerState::Closed);
        service.stop();
        assert_eq!(service.state(), ListenerState::Closed);
    }

    #[test]
    fn stop_unblocks_connected_client() {
        let mut service = ListenerService::start(&test_config(), echo_handler).unwrap();
        let mut stream = TcpStream::connect(service.local_addr()).unwrap();
        send_recv(&mut stream, &serde_json::json!({"cmd": "reset"}));
        wait_for_state(&service, ListenerState::Serving);

        let started = Instant::now();
        service.stop();
        assert!(started.elapsed() < Duration::from_secs(2));
        assert_eq!(service.state(), ListenerState::Closed);
        let next: Result<Option<Response>, _> = read_message(&mut stream);
        assert!(matches!(next, Ok(None) | Err(_)));
    }

    #[test]
    fn bind_conflict_is_bind_error() {
        let first = ListenerService::start(&test_config(), echo_handler).unwrap();
        let config = ListenerConfig {
            port: first.local_addr().port(),
            ..ListenerConfig::default()
        };
        let err = ListenerService::start(&config, echo_handler).err().unwrap();
        assert!(matches!(err, ServerError::Bind { .. }));
    }
}
