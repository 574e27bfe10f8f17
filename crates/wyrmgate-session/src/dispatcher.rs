//! The seam between sessions and packet interpretation.

use std::future::Future;
use std::sync::Arc;

use bytes::Bytes;
use wyrmgate_transport::Connection;

use crate::{ClientSession, DispatchError};

/// Interprets decrypted inbound packets.
///
/// Called once per frame, in receive order: the next frame of the same
/// session is not decrypted until the returned future completes. Different
/// sessions are dispatched independently.
///
/// The dispatcher may call [`ClientSession::send`] on the session it was
/// handed (or any other) any number of times.
///
/// # Example
///
/// ```rust,ignore
/// struct Echo;
///
/// impl<C: Connection> Dispatcher<C> for Echo {
///     async fn handle(
///         &self,
///         session: &Arc<ClientSession<C>>,
///         payload: Bytes,
///     ) -> Result<(), DispatchError> {
///         session.send(&payload).await?;
///         Ok(())
///     }
/// }
/// ```
pub trait Dispatcher<C: Connection>: Send + Sync + 'static {
    fn handle(
        &self,
        session: &Arc<ClientSession<C>>,
        payload: Bytes,
    ) -> impl Future<Output = Result<(), DispatchError>> + Send;
}

impl<C: Connection, D: Dispatcher<C>> Dispatcher<C> for Arc<D> {
    fn handle(
        &self,
        session: &Arc<ClientSession<C>>,
        payload: Bytes,
    ) -> impl Future<Output = Result<(), DispatchError>> + Send {
        (**self).handle(session, payload)
    }
}
