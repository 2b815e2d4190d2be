//! Visibility notifications for the presentation layer.
//!
//! The relay holds at most one listener; attach on UI start, detach on stop.
//! Notifications are delivered at most once per state transition, with no
//! ordering guarantee across different quests.

use std::sync::{Arc, RwLock};

use crate::model::{Element, Quest, QuestGroup, QuestId};

/// Push notifications produced by the engine.
pub trait QuestListener: Send + Sync {
    /// A quest became visible: freshly retrieved for presentation, with its
    /// cached element when the target is one.
    fn quest_created(&self, quest: &Quest, element: Option<&Element>);

    /// A quest left the visible set (answered, hidden, or deleted).
    fn quest_removed(&self, id: QuestId, group: QuestGroup);
}

#[derive(Default)]
pub struct QuestRelay {
    listener: RwLock<Option<Arc<dyn QuestListener>>>,
}

impl QuestRelay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_listener(&self, listener: Arc<dyn QuestListener>) {
        let mut slot = self.listener.write().expect("relay lock poisoned");
        *slot = Some(listener);
    }

    pub fn clear_listener(&self) {
        let mut slot = self.listener.write().expect("relay lock poisoned");
        *slot = None;
    }

    pub(crate) fn created(&self, quest: &Quest, element: Option<&Element>) {
        let slot = self.listener.read().expect("relay lock poisoned");
        if let Some(listener) = slot.as_ref() {
            listener.quest_created(quest, element);
        }
    }

    pub(crate) fn removed(&self, id: QuestId, group: QuestGroup) {
        let slot = self.listener.read().expect("relay lock poisoned");
        if let Some(listener) = slot.as_ref() {
            listener.quest_removed(id, group);
        }
    }
}
