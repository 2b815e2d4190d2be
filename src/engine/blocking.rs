//! Feature-scoped blocking.
//!
//! One open note about a map element suppresses every pending quest on that
//! element: any of them answered independently could produce edits the note's
//! resolution would invalidate. The blocked quests are deleted locally (the
//! to-be-created note blocks quest creation for other users too) and
//! re-created by a later download once the note is resolved remotely.

use std::sync::Arc;

use crate::engine::ops::OpError;
use crate::model::{ElementRef, NoteRequest, QuestGroup, QuestId, QuestStatus};
use crate::relay::QuestRelay;
use crate::store::{ElementStore, NoteRequestStore, QuestFilter, QuestStore};

pub struct BlockingResolver {
    store: Arc<dyn QuestStore>,
    elements: Arc<dyn ElementStore>,
    notes: Arc<dyn NoteRequestStore>,
    relay: Arc<QuestRelay>,
}

impl BlockingResolver {
    pub fn new(
        store: Arc<dyn QuestStore>,
        elements: Arc<dyn ElementStore>,
        notes: Arc<dyn NoteRequestStore>,
        relay: Arc<QuestRelay>,
    ) -> Self {
        Self {
            store,
            elements,
            notes,
            relay,
        }
    }

    /// Raise a note about the element of the given quest instead of answering
    /// it. Records the pending note request, then deletes every `New` element
    /// quest referencing the same element (the given one included), emitting
    /// one removal notification per deleted quest. Returns the deleted ids.
    pub fn raise_note(&self, quest_id: QuestId, text: String) -> Result<Vec<QuestId>, OpError> {
        let quest = self.store.get(quest_id)?;
        let Some(element) = quest.element().copied() else {
            return Err(OpError::NotAnElementQuest(quest_id));
        };

        self.notes.add(NoteRequest {
            position: quest.position,
            text,
            element: Some(element),
        })?;

        let blocked = self.store.get_all(
            &QuestFilter::default()
                .status(QuestStatus::New)
                .element(element),
        )?;

        let mut removed = Vec::with_capacity(blocked.len());
        for blocked_quest in blocked {
            self.store.delete(blocked_quest.id)?;
            self.relay.removed(blocked_quest.id, blocked_quest.group());
            removed.push(blocked_quest.id);
        }
        tracing::info!(
            element = %element,
            blocked = removed.len(),
            "note raised, suppressed pending quests on the element"
        );

        self.prune_elements()?;
        Ok(removed)
    }

    /// Drop cached elements no longer referenced by any quest. The cascade
    /// above is the only local path that orphans them.
    fn prune_elements(&self) -> Result<(), OpError> {
        let referenced: Vec<ElementRef> = self
            .store
            .get_all(&QuestFilter::default().group(QuestGroup::Element))?
            .iter()
            .filter_map(|q| q.element().copied())
            .collect();
        let pruned = self.elements.delete_unreferenced(&referenced)?;
        if pruned > 0 {
            tracing::debug!(pruned, "dropped unreferenced elements");
        }
        Ok(())
    }
}
