//! Remote gateway boundary.
//!
//! The data-service client is an external collaborator; the engine only cares
//! about its success/conflict/transport contract. The remote treats payload
//! submission as at-most-effective-once, so unbounded retry of transport
//! failures is safe.

use thiserror::Error;

use crate::error::{Effect, Transience};
use crate::model::{ElementRef, NoteId, TagChanges};

/// Failure modes of a single contribution submission.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum GatewayError {
    /// The remote target was already modified or closed by someone else since
    /// the quest's data was fetched. Expected under uncoordinated multi-user
    /// editing; the local answer is presumed stale and gets discarded.
    #[error("remote target changed upstream")]
    Conflict,

    /// Transport or server failure. The submission is retried on the next
    /// reconciliation pass.
    #[error("transport failure: {0}")]
    Transport(String),
}

impl GatewayError {
    pub fn transience(&self) -> Transience {
        match self {
            GatewayError::Conflict => Transience::Permanent,
            GatewayError::Transport(_) => Transience::Retryable,
        }
    }

    pub fn effect(&self) -> Effect {
        match self {
            GatewayError::Conflict => Effect::None,
            GatewayError::Transport(_) => Effect::Unknown,
        }
    }
}

/// Submits a single user contribution for one remote entity.
pub trait RemoteGateway: Send + Sync {
    /// Append a comment to the remote note.
    fn submit_comment(&self, note: NoteId, text: &str) -> Result<(), GatewayError>;

    /// Submit a tag changeset for the remote element.
    fn submit_changeset(
        &self,
        element: &ElementRef,
        changes: &TagChanges,
    ) -> Result<(), GatewayError>;
}
