//! The accept primitive the server is built on.

use std::future::Future;
use std::io;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::{TcpListener, TcpStream};

use linecast_core::PeerAddr;

/// A source of accepted byte-stream connections.
///
/// Implemented for [`TcpListener`]; tests provide in-memory listeners that
/// can also inject accept failures.
pub trait Listener: Send + 'static {
    type Stream: AsyncRead + AsyncWrite + Send + Unpin + 'static;

    /// Waits for the next connection and its remote-address label.
    fn accept(&mut self) -> impl Future<Output = io::Result<(Self::Stream, PeerAddr)>> + Send;
}

impl Listener for TcpListener {
    type Stream = TcpStream;

    fn accept(&mut self) -> impl Future<Output = io::Result<(Self::Stream, PeerAddr)>> + Send {
        async move {
            let (stream, addr) = TcpListener::accept(self).await?;
            Ok((stream, PeerAddr::from(addr)))
        }
    }
}
