//! `WyrmgateServer` builder and accept loop.
//!
//! This is the entry point for running a Wyrmgate gateway. It ties the
//! layers together: transport → protocol → crypto → session → dispatcher.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use wyrmgate_crypto::{Cipher, KeystreamCipher};
use wyrmgate_protocol::FrameConfig;
use wyrmgate_session::{Dispatcher, InMemoryRegistry, SessionConfig};
use wyrmgate_transport::{Connection, TcpTransport, Transport, TransportError};

use crate::handler::handle_connection;
use crate::{KeyProvider, ServerConfig, WyrmgateError};

/// Pause after a failed accept before trying again.
pub(crate) const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// Shared server state passed to each connection handler task.
///
/// Wrapped in `Arc` so it can be cheaply cloned across tasks.
pub(crate) struct ServerState<C: Connection, D, K> {
    pub(crate) registry: Arc<InMemoryRegistry<C>>,
    pub(crate) dispatcher: D,
    pub(crate) keys: K,
    pub(crate) cipher: Arc<dyn Cipher>,
    pub(crate) config: ServerConfig,
}

/// Builder for configuring and starting a Wyrmgate server.
///
/// # Example
///
/// ```rust,ignore
/// use wyrmgate::prelude::*;
///
/// let server = WyrmgateServer::builder()
///     .bind("0.0.0.0:7777")
///     .build(MyDispatcher, StaticKeys::from_secret(b"realm key")?)
///     .await?;
/// server.run().await
/// ```
pub struct WyrmgateServerBuilder {
    config: ServerConfig,
    cipher: Arc<dyn Cipher>,
}

impl WyrmgateServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self::from_config(ServerConfig::default())
    }

    /// Starts from a loaded configuration.
    pub fn from_config(config: ServerConfig) -> Self {
        Self {
            config,
            cipher: Arc::new(KeystreamCipher),
        }
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.config.bind_addr = addr.to_string();
        self
    }

    /// Sets the session configuration.
    pub fn session_config(mut self, config: SessionConfig) -> Self {
        self.config.session = config;
        self
    }

    /// Sets the framing limits.
    pub fn frame_config(mut self, config: FrameConfig) -> Self {
        self.config.frame = config;
        self
    }

    /// Replaces the default [`KeystreamCipher`].
    pub fn cipher(mut self, cipher: impl Cipher) -> Self {
        self.cipher = Arc::new(cipher);
        self
    }

    /// Validates the configuration and binds a TCP listener.
    pub async fn build<D, K>(
        self,
        dispatcher: D,
        keys: K,
    ) -> Result<WyrmgateServer<TcpTransport, D, K>, WyrmgateError>
    where
        D: Dispatcher<<TcpTransport as Transport>::Connection>,
        K: KeyProvider,
    {
        self.config.validate()?;
        let transport = TcpTransport::bind(&self.config.bind_addr)
            .await?
            .with_read_chunk(self.config.session.read_buffer_size);
        Ok(WyrmgateServer::with_transport(
            transport,
            dispatcher,
            keys,
            self.cipher,
            self.config,
        ))
    }
}

impl Default for WyrmgateServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Stops a running server from another task.
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    tx: broadcast::Sender<()>,
}

impl ShutdownHandle {
    /// Stops accepting, ends every receive loop, and tears down every
    /// session. [`WyrmgateServer::run`] returns once the registry is empty.
    pub fn shutdown(&self) {
        let _ = self.tx.send(());
    }
}

/// A Wyrmgate server bound to a transport.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct WyrmgateServer<T: Transport, D, K> {
    transport: T,
    state: Arc<ServerState<T::Connection, D, K>>,
    shutdown: broadcast::Sender<()>,
}

impl WyrmgateServer<TcpTransport, (), ()> {
    /// Creates a new builder.
    pub fn builder() -> WyrmgateServerBuilder {
        WyrmgateServerBuilder::new()
    }
}

impl<D, K> WyrmgateServer<TcpTransport, D, K> {
    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.transport.local_addr()
    }
}

impl<T, D, K> WyrmgateServer<T, D, K>
where
    T: Transport<Error = TransportError>,
    T::Connection: Connection<Error = TransportError>,
    D: Dispatcher<T::Connection>,
    K: KeyProvider,
{
    /// Builds a server on any transport, e.g. an in-process one for tests.
    pub fn with_transport(
        transport: T,
        dispatcher: D,
        keys: K,
        cipher: Arc<dyn Cipher>,
        config: ServerConfig,
    ) -> Self {
        let (shutdown, _) = broadcast::channel(1);
        let state = Arc::new(ServerState {
            registry: Arc::new(InMemoryRegistry::new()),
            dispatcher,
            keys,
            cipher,
            config,
        });
        Self {
            transport,
            state,
            shutdown,
        }
    }

    /// The registry holding every live session.
    pub fn registry(&self) -> Arc<InMemoryRegistry<T::Connection>> {
        Arc::clone(&self.state.registry)
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            tx: self.shutdown.clone(),
        }
    }

    /// Runs the accept loop until [`ShutdownHandle::shutdown`] is called.
    ///
    /// Each connection runs in its own task. A failing connection is logged
    /// and never stops the loop.
    pub async fn run(mut self) -> Result<(), WyrmgateError> {
        tracing::info!(bind_addr = %self.state.config.bind_addr, "Wyrmgate server running");
        let mut shutdown_rx = self.shutdown.subscribe();

        loop {
            tokio::select! {
                accepted = self.transport.accept() => match accepted {
                    Ok(conn) => {
                        let state = Arc::clone(&self.state);
                        let shutdown = self.shutdown.subscribe();
                        tokio::spawn(async move {
                            if let Err(e) = handle_connection(conn, state, shutdown).await {
                                tracing::debug!(error = %e, "connection ended with error");
                            }
                        });
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "accept failed");
                        // Persistent failures (e.g. EMFILE) would otherwise spin.
                        tokio::time::sleep(ACCEPT_BACKOFF).await;
                    }
                },
                _ = shutdown_rx.recv() => break,
            }
        }

        let drained = self.state.registry.shutdown().await;
        tracing::info!(drained, "Wyrmgate server stopped");
        Ok(())
    }
}
