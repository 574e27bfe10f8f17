//! TCP transport implementation using `tokio::net`.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;

use crate::{Connection, ConnectionId, Transport, TransportError};

/// Counter for generating unique connection IDs.
static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// Size of the scratch buffer used for a single `recv` call.
const DEFAULT_READ_CHUNK: usize = 8 * 1024;

/// A TCP-based [`Transport`] that listens for incoming connections.
pub struct TcpTransport {
    listener: TcpListener,
    read_chunk: usize,
}

impl TcpTransport {
    /// Binds a new TCP transport to the given address.
    pub async fn bind(addr: &str) -> Result<Self, TransportError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(TransportError::AcceptFailed)?;
        tracing::info!(addr, "TCP transport listening");
        Ok(Self {
            listener,
            read_chunk: DEFAULT_READ_CHUNK,
        })
    }

    /// Sets the maximum number of bytes returned by one `recv` call.
    pub fn with_read_chunk(mut self, size: usize) -> Self {
        self.read_chunk = size.max(1);
        self
    }

    /// Returns the address the listener is bound to.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }
}

impl Transport for TcpTransport {
    type Connection = TcpConnection;
    type Error = TransportError;

    async fn accept(&mut self) -> Result<Self::Connection, Self::Error> {
        let (stream, addr) = self
            .listener
            .accept()
            .await
            .map_err(TransportError::AcceptFailed)?;

        let conn = TcpConnection::from_stream(stream, addr, self.read_chunk);
        tracing::debug!(id = %conn.id, %addr, "accepted TCP connection");
        Ok(conn)
    }
}

/// A single TCP connection.
///
/// The stream is split into halves guarded by separate locks, so a task
/// blocked in `recv` never holds up writers and concurrent writers queue
/// on the write lock instead of interleaving.
pub struct TcpConnection {
    id: ConnectionId,
    peer_addr: SocketAddr,
    reader: Mutex<OwnedReadHalf>,
    writer: Mutex<Option<OwnedWriteHalf>>,
    read_chunk: usize,
}

impl TcpConnection {
    /// Wraps an already-connected stream.
    pub fn from_stream(
        stream: TcpStream,
        peer_addr: SocketAddr,
        read_chunk: usize,
    ) -> Self {
        if let Err(e) = stream.set_nodelay(true) {
            tracing::debug!(%peer_addr, error = %e, "failed to set TCP_NODELAY");
        }
        let (reader, writer) = stream.into_split();
        Self {
            id: ConnectionId::new(
                NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed),
            ),
            peer_addr,
            reader: Mutex::new(reader),
            writer: Mutex::new(Some(writer)),
            read_chunk: read_chunk.max(1),
        }
    }
}

impl Connection for TcpConnection {
    type Error = TransportError;

    async fn send(&self, data: &[u8]) -> Result<(), Self::Error> {
        let mut writer = self.writer.lock().await;
        match writer.as_mut() {
            Some(w) => w.write_all(data).await.map_err(TransportError::SendFailed),
            None => Err(TransportError::ConnectionClosed(format!(
                "{} already closed",
                self.id
            ))),
        }
    }

    async fn recv(&self) -> Result<Option<Vec<u8>>, Self::Error> {
        let mut buf = vec![0u8; self.read_chunk];
        let n = self
            .reader
            .lock()
            .await
            .read(&mut buf)
            .await
            .map_err(TransportError::ReceiveFailed)?;
        if n == 0 {
            return Ok(None);
        }
        buf.truncate(n);
        Ok(Some(buf))
    }

    async fn close(&self) -> Result<(), Self::Error> {
        if let Some(mut w) = self.writer.lock().await.take() {
            w.shutdown().await.map_err(TransportError::SendFailed)?;
        }
        Ok(())
    }

    fn id(&self) -> ConnectionId {
        self.id
    }

    fn peer_addr(&self) -> String {
        self.peer_addr.to_string()
    }
}
