use crate::acceptor::ConnectionAcceptor;
use crate::config::ServeConfig;
use crate::connection::{Connection, ConnectionState};
use crate::error::{ServerError, ServerResult};
use crate::http::{self, Request, ResponseHead, Status};
use crate::mime::MimeTable;
use crate::resolver::{self, Resolution};
use crate::shutdown::{ServerState, ShutdownSignal};
use std::collections::HashMap;
use std::fs::File;
use std::io::{self, ErrorKind};
use std::os::unix::io::{AsRawFd, RawFd};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

#[cfg(not(any(target_os = "linux", target_os = "macos")))]
compile_error!("the event loop requires epoll (Linux) or kqueue (macOS)");

/// Poller token reserved for the listening socket.
const LISTENER_TOKEN: usize = 0;

/// Upper bound on events returned by a single poll.
const MAX_EVENTS: usize = 256;

/// Poll timeout, so lifecycle transitions are noticed on an idle server.
const POLL_INTERVAL: Duration = Duration::from_millis(200);

/// What a registered socket is currently waiting for. A connection reads
/// until its request head is complete, then only ever writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interest {
    Readable,
    Writable,
}

/// A readiness notification for one registered socket.
#[derive(Debug, Clone, Copy)]
pub struct PollEvent {
    pub token: usize,
    pub readable: bool,
    pub writable: bool,
    pub closed: bool,
}

/// Readiness poller over epoll (Linux).
#[cfg(target_os = "linux")]
pub struct EventPoller {
    epoll_fd: RawFd,
    events: Vec<libc::epoll_event>,
}

#[cfg(target_os = "linux")]
impl EventPoller {
    pub fn new() -> ServerResult<Self> {
        let epoll_fd = unsafe { libc::epoll_create1(libc::EPOLL_CLOEXEC) };
        if epoll_fd < 0 {
            return Err(ServerError::Io(io::Error::last_os_error()));
        }

        Ok(Self {
            epoll_fd,
            events: Vec::with_capacity(MAX_EVENTS),
        })
    }

    /// Register a socket with the given interest
    pub fn register(&mut self, fd: RawFd, token: usize, interest: Interest) -> ServerResult<()> {
        self.ctl(libc::EPOLL_CTL_ADD, fd, token, interest)
    }

    /// Change the interest of an already registered socket
    pub fn rearm(&mut self, fd: RawFd, token: usize, interest: Interest) -> ServerResult<()> {
        self.ctl(libc::EPOLL_CTL_MOD, fd, token, interest)
    }

    /// Remove a socket from the poller
    pub fn deregister(&mut self, fd: RawFd) -> ServerResult<()> {
        let ret =
            unsafe { libc::epoll_ctl(self.epoll_fd, libc::EPOLL_CTL_DEL, fd, std::ptr::null_mut()) };
        if ret < 0 {
            return Err(ServerError::Io(io::Error::last_os_error()));
        }
        Ok(())
    }

    fn ctl(&mut self, op: libc::c_int, fd: RawFd, token: usize, interest: Interest) -> ServerResult<()> {
        let bits = match interest {
            Interest::Readable => libc::EPOLLIN,
            Interest::Writable => libc::EPOLLOUT,
        };
        let mut event = libc::epoll_event {
            events: bits as u32,
            u64: token as u64,
        };

        let ret = unsafe { libc::epoll_ctl(self.epoll_fd, op, fd, &mut event) };
        if ret < 0 {
            return Err(ServerError::Io(io::Error::last_os_error()));
        }
        Ok(())
    }

    /// Wait for readiness events, up to the given timeout
    pub fn poll(&mut self, timeout: Duration) -> ServerResult<Vec<PollEvent>> {
        self.events.clear();
        self.events
            .resize(MAX_EVENTS, libc::epoll_event { events: 0, u64: 0 });

        let num_events = unsafe {
            libc::epoll_wait(
                self.epoll_fd,
                self.events.as_mut_ptr(),
                MAX_EVENTS as i32,
                timeout.as_millis() as i32,
            )
        };

        if num_events < 0 {
            let err = io::Error::last_os_error();
            // EINTR is just a signal wakeup; the caller re-checks state
            if err.kind() == ErrorKind::Interrupted {
                return Ok(Vec::new());
            }
            return Err(ServerError::Io(err));
        }

        Ok(self.events[..num_events as usize]
            .iter()
            .map(|event| PollEvent {
                token: event.u64 as usize,
                readable: event.events & libc::EPOLLIN as u32 != 0,
                writable: event.events & libc::EPOLLOUT as u32 != 0,
                closed: event.events & (libc::EPOLLERR | libc::EPOLLHUP) as u32 != 0,
            })
            .collect())
    }
}

#[cfg(target_os = "linux")]
impl Drop for EventPoller {
    fn drop(&mut self) {
        unsafe {
            libc::close(self.epoll_fd);
        }
    }
}

/// Readiness poller over kqueue (macOS).
#[cfg(target_os = "macos")]
pub struct EventPoller {
    kqueue_fd: RawFd,
    events: Vec<libc::kevent>,
}

#[cfg(target_os = "macos")]
impl EventPoller {
    pub fn new() -> ServerResult<Self> {
        let kqueue_fd = unsafe { libc::kqueue() };
        if kqueue_fd < 0 {
            return Err(ServerError::Io(io::Error::last_os_error()));
        }

        Ok(Self {
            kqueue_fd,
            events: Vec::with_capacity(MAX_EVENTS),
        })
    }

    /// Register a socket with the given interest
    pub fn register(&mut self, fd: RawFd, token: usize, interest: Interest) -> ServerResult<()> {
        self.change(fd, Self::filter(interest), libc::EV_ADD as u16, token)
            .map_err(ServerError::Io)
    }

    /// Change the interest of an already registered socket
    pub fn rearm(&mut self, fd: RawFd, token: usize, interest: Interest) -> ServerResult<()> {
        let previous = match interest {
            Interest::Readable => libc::EVFILT_WRITE as i16,
            Interest::Writable => libc::EVFILT_READ as i16,
        };
        // Removing a filter that was never added reports an error; ignore it.
        let _ = self.change(fd, previous, libc::EV_DELETE as u16, token);
        self.change(fd, Self::filter(interest), libc::EV_ADD as u16, token)
            .map_err(ServerError::Io)
    }

    /// Remove a socket from the poller
    pub fn deregister(&mut self, fd: RawFd) -> ServerResult<()> {
        let _ = self.change(fd, libc::EVFILT_READ as i16, libc::EV_DELETE as u16, 0);
        let _ = self.change(fd, libc::EVFILT_WRITE as i16, libc::EV_DELETE as u16, 0);
        Ok(())
    }

    fn filter(interest: Interest) -> i16 {
        match interest {
            Interest::Readable => libc::EVFILT_READ as i16,
            Interest::Writable => libc::EVFILT_WRITE as i16,
        }
    }

    fn change(&self, fd: RawFd, filter: i16, flags: u16, token: usize) -> io::Result<()> {
        let change = libc::kevent {
            ident: fd as usize,
            filter,
            flags,
            fflags: 0,
            data: 0,
            udata: token as *mut libc::c_void,
        };

        let ret = unsafe {
            libc::kevent(
                self.kqueue_fd,
                &change,
                1,
                std::ptr::null_mut(),
                0,
                std::ptr::null(),
            )
        };
        if ret < 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }

    /// Wait for readiness events, up to the given timeout
    pub fn poll(&mut self, timeout: Duration) -> ServerResult<Vec<PollEvent>> {
        self.events.clear();
        self.events.resize(MAX_EVENTS, unsafe { std::mem::zeroed() });

        let timeout = libc::timespec {
            tv_sec: timeout.as_secs() as libc::time_t,
            tv_nsec: timeout.subsec_nanos() as libc::c_long,
        };

        let num_events = unsafe {
            libc::kevent(
                self.kqueue_fd,
                std::ptr::null(),
                0,
                self.events.as_mut_ptr(),
                MAX_EVENTS as i32,
                &timeout,
            )
        };

        if num_events < 0 {
            let err = io::Error::last_os_error();
            if err.kind() == ErrorKind::Interrupted {
                return Ok(Vec::new());
            }
            return Err(ServerError::Io(err));
        }

        Ok(self.events[..num_events as usize]
            .iter()
            .map(|event| PollEvent {
                token: event.udata as usize,
                readable: event.filter == libc::EVFILT_READ as i16,
                writable: event.filter == libc::EVFILT_WRITE as i16,
                closed: event.flags & libc::EV_ERROR as u16 != 0,
            })
            .collect())
    }
}

#[cfg(target_os = "macos")]
impl Drop for EventPoller {
    fn drop(&mut self) {
        unsafe {
            libc::close(self.kqueue_fd);
        }
    }
}

/// The single event loop: accepts connections, parses request heads,
/// resolves them against the served tree, and streams the responses, all
/// on one thread over nonblocking sockets.
pub struct EventLoop {
    poller: EventPoller,
    acceptor: Option<ConnectionAcceptor>,
    connections: HashMap<usize, Connection>,
    config: Arc<ServeConfig>,
    mime: Arc<MimeTable>,
    shutdown: ShutdownSignal,
}

impl EventLoop {
    /// Create an event loop around a bound acceptor
    pub fn new(
        acceptor: ConnectionAcceptor,
        config: Arc<ServeConfig>,
        mime: Arc<MimeTable>,
        shutdown: ShutdownSignal,
    ) -> ServerResult<Self> {
        let mut poller = EventPoller::new()?;
        poller.register(acceptor.as_raw_fd(), LISTENER_TOKEN, Interest::Readable)?;

        Ok(Self {
            poller,
            acceptor: Some(acceptor),
            connections: HashMap::new(),
            config,
            mime,
            shutdown,
        })
    }

    /// Run until the lifecycle reaches `Stopped`
    pub fn run(&mut self) -> ServerResult<()> {
        loop {
            if self.shutdown.state() == ServerState::Draining {
                self.close_listener();
                if self.connections.is_empty() {
                    self.shutdown.mark_stopped();
                }
            }
            if self.shutdown.state() == ServerState::Stopped {
                break;
            }

            let events = self.poller.poll(POLL_INTERVAL)?;
            for event in events {
                if event.token == LISTENER_TOKEN {
                    self.accept_pending()?;
                } else {
                    self.drive_connection(event);
                }
            }
        }

        log::info!("Successfully stopped the server.");
        Ok(())
    }

    /// Close the listening socket once, on entering the drain
    fn close_listener(&mut self) {
        if let Some(acceptor) = self.acceptor.take() {
            if let Err(e) = self.poller.deregister(acceptor.as_raw_fd()) {
                log::warn!("error while closing the listener: {}", e);
            }
            log::info!(
                "Listener closed, waiting for {} in-flight connection(s)",
                self.connections.len()
            );
        }
    }

    /// Accept every connection the backlog has ready
    fn accept_pending(&mut self) -> ServerResult<()> {
        loop {
            let Some(acceptor) = self.acceptor.as_ref() else {
                return Ok(());
            };
            match acceptor.accept() {
                Ok(connection) => {
                    let token = connection.id();
                    log::debug!(
                        "accepted connection {} from {}",
                        token,
                        connection.peer_addr()
                    );
                    self.poller
                        .register(connection.raw_fd(), token, Interest::Readable)?;
                    self.connections.insert(token, connection);
                }
                Err(ref e) if e.kind() == ErrorKind::WouldBlock => break,
                Err(ref e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(ServerError::Io(e)),
            }
        }
        Ok(())
    }

    /// React to a readiness notification for one connection
    fn drive_connection(&mut self, event: PollEvent) {
        if event.closed {
            self.drop_connection(event.token);
            return;
        }

        if event.readable {
            if let Err(e) = self.handle_readable(event.token) {
                log::debug!("connection {}: {}", event.token, e);
                self.drop_connection(event.token);
                return;
            }
        }

        if event.writable {
            self.handle_writable(event.token);
        }
    }

    /// Pull request bytes until the head is complete, then dispatch the
    /// request and switch the connection to writing
    fn handle_readable(&mut self, token: usize) -> ServerResult<()> {
        let mut dispatched = false;
        {
            let Some(connection) = self.connections.get_mut(&token) else {
                return Ok(());
            };
            if connection.state() != ConnectionState::Reading {
                return Ok(());
            }

            loop {
                match connection.read_into_buffer() {
                    Ok(0) => {
                        return Err(ServerError::Connection(
                            "peer closed before the request head completed".to_string(),
                        ))
                    }
                    Ok(_) => {
                        if let Some(request) = http::parse_request_head(connection.inbound())? {
                            Self::dispatch(&self.config, &self.mime, connection, &request);
                            dispatched = true;
                            break;
                        }
                    }
                    Err(ref e) if e.kind() == ErrorKind::WouldBlock => break,
                    Err(ref e) if e.kind() == ErrorKind::Interrupted => continue,
                    Err(e) => return Err(ServerError::Io(e)),
                }
            }
        }

        if dispatched {
            let Some(fd) = self.connections.get(&token).map(Connection::raw_fd) else {
                return Ok(());
            };
            self.poller.rearm(fd, token, Interest::Writable)?;
            // Push as much of the response as the socket will take right away
            self.handle_writable(token);
        }
        Ok(())
    }

    /// Flush response bytes; a mid-stream failure abandons the connection
    /// without a status line, since the head may already be committed
    fn handle_writable(&mut self, token: usize) {
        let done = {
            let Some(connection) = self.connections.get_mut(&token) else {
                return;
            };
            if connection.state() != ConnectionState::Writing {
                return;
            }
            match connection.flush_response() {
                Ok(true) => true,
                Ok(false) => return,
                Err(e) => {
                    log::debug!("connection {}: abandoned mid-stream: {}", token, e);
                    true
                }
            }
        };

        if done {
            self.drop_connection(token);
        }
    }

    /// Deregister and close one connection
    fn drop_connection(&mut self, token: usize) {
        if let Some(mut connection) = self.connections.remove(&token) {
            if let Err(e) = self.poller.deregister(connection.raw_fd()) {
                log::debug!("connection {}: deregister failed: {}", token, e);
            }
            connection.close();
        }
    }

    /// Resolve one request and queue its response on the connection
    fn dispatch(config: &ServeConfig, mime: &MimeTable, connection: &mut Connection, request: &Request) {
        match resolver::resolve(&config.root, &request.target, config.spa, mime) {
            Resolution::Found { path, content_type } => match File::open(&path) {
                Ok(file) => {
                    log::info!(
                        "Responding to {} {} with {} as {}",
                        request.method.as_str(),
                        request.target,
                        path.display(),
                        content_type
                    );

                    let mut head = ResponseHead::new(Status::Ok);
                    head.set_header("Content-Type", content_type);
                    if let Ok(meta) = file.metadata() {
                        head.set_header("Content-Length", &meta.len().to_string());
                    }
                    connection.begin_response(head.serialize(), Some(file));
                }
                Err(e) => {
                    // The file qualified during resolution but vanished or
                    // became unreadable before the open
                    log::info!(
                        "Responding with a 404 to {} because {} could not be opened: {}",
                        request.target,
                        path.display(),
                        e
                    );
                    Self::respond_not_found(connection, &path);
                }
            },
            Resolution::NotFound { attempted } => {
                log::info!(
                    "Responding with a 404 to {} because {} is not found",
                    request.target,
                    attempted.display()
                );
                Self::respond_not_found(connection, &attempted);
            }
        }
    }

    fn respond_not_found(connection: &mut Connection, attempted: &Path) {
        let body = format!("File {} not found", attempted.display());

        let mut head = ResponseHead::new(Status::NotFound);
        head.set_header("Content-Type", "text/plain");
        head.set_header("Content-Length", &body.len().to_string());

        let mut bytes = head.serialize();
        bytes.extend_from_slice(body.as_bytes());
        connection.begin_response(bytes, None);
    }
}
