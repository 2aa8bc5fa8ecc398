pub mod acceptor;
pub mod buffer;
pub mod config;
pub mod connection;
pub mod error;
pub mod event_loop;
pub mod http;
pub mod mime;
pub mod resolver;
pub mod shutdown;

/// Re-exports of common components for easier access
pub use acceptor::ConnectionAcceptor;
pub use config::ServeConfig;
pub use connection::{Connection, ConnectionState};
pub use error::{ServerError, ServerResult};
pub use event_loop::{EventLoop, EventPoller};
pub use http::{parse_request_head, Method, Request, ResponseHead, Status};
pub use mime::MimeTable;
pub use resolver::{resolve, Resolution};
pub use shutdown::{ServerState, ShutdownSignal};
