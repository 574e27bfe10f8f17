//! Identity types shared by every layer above the transport.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier of a live client session.
///
/// Allocated by the session registry when a connection becomes active.
/// Never reused within one process lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "S-{}", self.0)
    }
}

/// Identifier of an in-world actor (typically a player character).
///
/// Sessions hold only this id. The simulation layer owns the actor and
/// resolves the id when it needs the entity, so tearing down a session
/// never destroys an actor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActorId(pub u64);

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "A-{}", self.0)
    }
}
