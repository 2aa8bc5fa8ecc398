use crate::buffer::Buffer;
use std::fs::File;
use std::io::{self, ErrorKind};
use std::net::{SocketAddr, TcpStream};
use std::os::unix::io::{AsRawFd, RawFd};

/// Bytes of file content pulled into the outbound buffer per refill.
const STREAM_CHUNK: usize = 64 * 1024;

/// Initial size of the per-connection buffer.
const INITIAL_BUFFER: usize = 16 * 1024;

/// Phase of a connection. One request is served per connection, then the
/// socket is closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Accumulating request bytes until the head is complete
    Reading,
    /// Writing the response head and streaming the body
    Writing,
    /// The socket has been shut down
    Closed,
}

/// A client connection: the nonblocking stream, the shared I/O buffer, and
/// while a file response is in flight, the open file being streamed.
pub struct Connection {
    stream: TcpStream,
    peer_addr: SocketAddr,
    id: usize,
    state: ConnectionState,
    buffer: Buffer,
    source: Option<File>,
}

impl Connection {
    pub fn new(stream: TcpStream, peer_addr: SocketAddr, id: usize) -> io::Result<Self> {
        stream.set_nodelay(true)?;

        Ok(Self {
            stream,
            peer_addr,
            id,
            state: ConnectionState::Reading,
            buffer: Buffer::new(INITIAL_BUFFER),
            source: None,
        })
    }

    /// Read a chunk of request bytes from the socket into the buffer
    pub fn read_into_buffer(&mut self) -> io::Result<usize> {
        self.buffer.read_from(&mut self.stream)
    }

    /// The request bytes accumulated so far
    pub fn inbound(&self) -> &[u8] {
        self.buffer.slice()
    }

    /// Switch the connection to the writing phase: discard any request
    /// bytes, queue the serialized head (and, for 404s, the whole body),
    /// and attach the file to stream, if any.
    pub fn begin_response(&mut self, head: Vec<u8>, source: Option<File>) {
        self.buffer.reset();
        self.buffer.write(&head);
        self.source = source;
        self.state = ConnectionState::Writing;
    }

    /// Push response bytes to the socket, refilling the buffer from the
    /// attached file chunk by chunk.
    ///
    /// Returns `Ok(true)` once the response is fully written, `Ok(false)`
    /// when the socket cannot accept more right now, and an error when the
    /// connection should be abandoned (socket failure, or the file became
    /// unreadable mid-stream).
    pub fn flush_response(&mut self) -> io::Result<bool> {
        loop {
            while self.buffer.available_data() > 0 {
                match self.buffer.write_to(&mut self.stream) {
                    Ok(0) => {
                        return Err(io::Error::new(
                            ErrorKind::WriteZero,
                            "peer stopped accepting data",
                        ))
                    }
                    Ok(_) => {}
                    Err(e) if e.kind() == ErrorKind::WouldBlock => return Ok(false),
                    Err(e) if e.kind() == ErrorKind::Interrupted => {}
                    Err(e) => return Err(e),
                }
            }

            match self.source.as_mut() {
                Some(file) => {
                    let n = self.buffer.fill_from(file, STREAM_CHUNK)?;
                    if n == 0 {
                        self.source = None;
                        return Ok(true);
                    }
                }
                None => return Ok(true),
            }
        }
    }

    /// Shut down the socket
    pub fn close(&mut self) {
        self.state = ConnectionState::Closed;
        let _ = self.stream.shutdown(std::net::Shutdown::Both);
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn raw_fd(&self) -> RawFd {
        self.stream.as_raw_fd()
    }
}
