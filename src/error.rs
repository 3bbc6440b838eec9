use std::net::SocketAddr;

use thiserror::Error;

/// Errors that stop the agent or one of its loops.
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid command-line values.
    #[error("Invalid configuration: {0}")]
    Configuration(String),
    /// A target could not be turned into a socket address.
    #[error("Invalid target {target}: {reason}")]
    Resolve { target: String, reason: String },
    /// A socket could not be bound at startup.
    #[error("Cannot bind to address {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },
    /// The metrics recorder could not be installed.
    #[error("Failed to set up metrics: {0}")]
    Metrics(String),
    /// A component task panicked or was aborted.
    #[error("Task failed: {0}")]
    Task(String),
    /// Send or receive failure on an already open socket.
    #[error("Socket error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
