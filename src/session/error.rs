use std::io;

use thiserror::Error;

use crate::protocol::ResponseWriterError;

/// An error which may occur while serving a debugging session.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Could not bind the listening socket.
    #[error("failed to bind RSP listener on port {port}")]
    Bind {
        port: u16,
        #[source]
        source: io::Error,
    },
    /// Could not accept a client on the listening socket.
    #[error("failed to accept RSP client")]
    Accept(#[source] io::Error),
    /// Connection error while initializing the session.
    #[error("connection error while initializing the session")]
    ConnectionInit(#[source] io::Error),
    /// Connection error while reading a request.
    #[error("connection error while reading request")]
    ConnectionRead(#[source] io::Error),
    /// Connection error while writing a response.
    #[error("connection error while writing response")]
    ConnectionWrite(#[source] io::Error),
}

impl SessionError {
    /// Whether this error just means the client went away.
    pub fn is_disconnect(&self) -> bool {
        let e = match self {
            SessionError::ConnectionRead(e) | SessionError::ConnectionWrite(e) => e,
            _ => return false,
        };
        matches!(
            e.kind(),
            io::ErrorKind::UnexpectedEof
                | io::ErrorKind::ConnectionReset
                | io::ErrorKind::ConnectionAborted
                | io::ErrorKind::BrokenPipe
        )
    }
}

impl From<ResponseWriterError<io::Error>> for SessionError {
    fn from(e: ResponseWriterError<io::Error>) -> Self {
        SessionError::ConnectionWrite(e.0)
    }
}
