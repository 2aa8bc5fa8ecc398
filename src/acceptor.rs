use crate::connection::Connection;
use socket2::{Domain, Protocol, Socket, Type};
use std::io;
use std::net::{SocketAddr, TcpListener, ToSocketAddrs};
use std::os::unix::io::{AsRawFd, RawFd};
use std::sync::atomic::{AtomicUsize, Ordering};

/// The ConnectionAcceptor owns the nonblocking listening socket and turns
/// accepted streams into `Connection`s with unique ids.
pub struct ConnectionAcceptor {
    listener: TcpListener,
    next_id: AtomicUsize,
}

impl ConnectionAcceptor {
    /// Bind a nonblocking listener to the specified address
    pub fn bind<A: ToSocketAddrs>(addr: A) -> io::Result<Self> {
        let socket_addr = addr.to_socket_addrs()?.next().ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidInput, "No socket addresses found")
        })?;

        let socket = Self::create_socket(&socket_addr)?;
        let listener = socket.into();

        Ok(Self {
            listener,
            // Token 0 is reserved for the listener itself.
            next_id: AtomicUsize::new(1),
        })
    }

    /// Accept a new connection
    pub fn accept(&self) -> io::Result<Connection> {
        let (stream, addr) = self.listener.accept()?;
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);

        stream.set_nonblocking(true)?;

        Connection::new(stream, addr, id)
    }

    /// Get the local address this acceptor is bound to
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Create a properly configured socket
    fn create_socket(addr: &SocketAddr) -> io::Result<Socket> {
        let domain = if addr.is_ipv6() {
            Domain::IPV6
        } else {
            Domain::IPV4
        };

        let socket = Socket::new(domain, Type::STREAM, Some(Protocol::TCP))?;

        socket.set_nonblocking(true)?;
        socket.set_reuse_address(true)?;

        let sock_addr = socket2::SockAddr::from(*addr);
        socket.bind(&sock_addr)?;
        socket.listen(1024)?;

        Ok(socket)
    }
}

impl AsRawFd for ConnectionAcceptor {
    fn as_raw_fd(&self) -> RawFd {
        self.listener.as_raw_fd()
    }
}
