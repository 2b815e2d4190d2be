//! Upload reconciler: drains answered quests into the remote gateway.
//!
//! Runs opportunistically after every local mutation. Per quest: submit the
//! payload, then apply the post-submission transition. Success retains note
//! quests as `Hidden` (an unresolved note keeps blocking) and deletes element
//! quests outright. A conflict means the remote target already diverged; the
//! local answer is presumed stale and discarded without merge. Transport
//! failures leave the quest `Answered` for the next pass.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::engine::ops::{self, OpError};
use crate::gateway::{GatewayError, RemoteGateway};
use crate::model::{Quest, QuestBody, QuestGroup, QuestStatus};
use crate::store::{QuestFilter, QuestStore};

/// Cooperative cancellation for a reconciliation pass.
///
/// Checked between whole-quest iterations, never mid-submission: at most one
/// already-issued submission completes after cancellation is requested.
#[derive(Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Outcome counters of one reconciliation pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct UploadStats {
    /// Successfully committed upstream.
    pub committed: usize,
    /// Discarded after a conflict.
    pub discarded: usize,
    /// Left `Answered` after a transport failure; retried next pass.
    pub deferred: usize,
}

pub struct UploadReconciler {
    store: Arc<dyn QuestStore>,
    gateway: Arc<dyn RemoteGateway>,
}

impl UploadReconciler {
    pub fn new(store: Arc<dyn QuestStore>, gateway: Arc<dyn RemoteGateway>) -> Self {
        Self { store, gateway }
    }

    /// Walk every answered quest and attempt to commit its payload.
    ///
    /// Iteration order is arbitrary; no quest's outcome depends on another's.
    /// With nothing answered, the pass performs no store writes and no
    /// gateway calls.
    pub fn run(&self, cancel: &CancelFlag) -> Result<UploadStats, OpError> {
        let pending = self
            .store
            .get_all(&QuestFilter::default().status(QuestStatus::Answered))?;

        let mut stats = UploadStats::default();
        for quest in pending {
            if cancel.is_cancelled() {
                tracing::debug!(?stats, "upload pass cancelled");
                break;
            }

            match self.submit(&quest)? {
                Ok(()) => {
                    self.commit(quest)?;
                    stats.committed += 1;
                }
                Err(GatewayError::Conflict) => {
                    tracing::info!(
                        quest = %quest.id,
                        group = %quest.group(),
                        "remote target diverged, discarding local answer"
                    );
                    self.store.delete(quest.id)?;
                    stats.discarded += 1;
                }
                Err(err) => {
                    tracing::warn!(
                        quest = %quest.id,
                        error = %err,
                        "upload deferred, will retry next pass"
                    );
                    stats.deferred += 1;
                }
            }
        }
        Ok(stats)
    }

    /// Submit one quest's payload. The outer error is an invariant breach (an
    /// `Answered` quest without payload); the inner one is the gateway's.
    fn submit(&self, quest: &Quest) -> Result<Result<(), GatewayError>, OpError> {
        match &quest.body {
            QuestBody::Element {
                element,
                changes: Some(changes),
                ..
            } => Ok(self.gateway.submit_changeset(element, changes)),
            QuestBody::Note {
                note,
                comment: Some(comment),
            } => Ok(self.gateway.submit_comment(*note, comment)),
            _ => Err(OpError::EmptyPayload {
                id: quest.id,
                group: quest.group(),
            }),
        }
    }

    fn commit(&self, mut quest: Quest) -> Result<(), OpError> {
        match quest.group() {
            QuestGroup::Note => {
                ops::conceal_after_upload(&mut quest)?;
                self.store.update(&quest)?;
            }
            QuestGroup::Element => {
                // Purpose fulfilled; a closed element quest blocks nothing.
                self.store.delete(quest.id)?;
            }
        }
        Ok(())
    }
}
