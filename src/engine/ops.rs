//! Quest state machine: legal transitions and their invariants.
//!
//! `New -> Answered` requires a non-empty payload. `New -> Hidden` is always
//! legal. `Answered -> {deleted | Hidden}` is driven only by the upload
//! reconciler. Nothing leaves `Hidden`; a quest that reappears after remote
//! data changes is a brand-new record with a new id.

use thiserror::Error;

use crate::error::{Effect, Transience};
use crate::model::{Quest, QuestBody, QuestGroup, QuestId, QuestStatus, TagChanges};
use crate::store::StoreError;

/// A user's answer to a quest, already reduced to its contribution payload.
///
/// For element quests the tag diff is computed by the answer-form layer; this
/// layer only re-checks that it is non-empty.
#[derive(Clone, Debug, PartialEq)]
pub enum Answer {
    Tags(TagChanges),
    Comment(String),
}

impl Answer {
    pub fn group(&self) -> QuestGroup {
        match self {
            Answer::Tags(_) => QuestGroup::Element,
            Answer::Comment(_) => QuestGroup::Note,
        }
    }
}

/// Operation failures.
///
/// `EmptyPayload` and `PayloadMismatch` signal a defect in an upstream
/// collaborator (an answer form that let a no-op submission through); they
/// terminate the offending operation and are reported loudly, never absorbed.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum OpError {
    #[error("quest not found: {0}")]
    QuestNotFound(QuestId),

    #[error("quest {id} ({group}) answered with an empty payload")]
    EmptyPayload { id: QuestId, group: QuestGroup },

    #[error("quest {id} ({group}) answered with a {given} payload")]
    PayloadMismatch {
        id: QuestId,
        group: QuestGroup,
        given: QuestGroup,
    },

    #[error("invalid transition for quest {id}: {from:?} -> {to:?}")]
    InvalidTransition {
        id: QuestId,
        from: QuestStatus,
        to: QuestStatus,
    },

    #[error("quest {0} does not reference a map element")]
    NotAnElementQuest(QuestId),

    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for OpError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => OpError::QuestNotFound(id),
            other => OpError::Store(other),
        }
    }
}

impl OpError {
    pub fn transience(&self) -> Transience {
        match self {
            OpError::QuestNotFound(_)
            | OpError::EmptyPayload { .. }
            | OpError::PayloadMismatch { .. }
            | OpError::InvalidTransition { .. }
            | OpError::NotAnElementQuest(_) => Transience::Permanent,
            OpError::Store(e) => e.transience(),
        }
    }

    pub fn effect(&self) -> Effect {
        match self {
            OpError::Store(e) => e.effect(),
            _ => Effect::None,
        }
    }

    /// True for programming-invariant violations that indicate an upstream
    /// collaborator broke a precondition this engine depends on.
    pub fn is_defect(&self) -> bool {
        !matches!(self, OpError::Store(StoreError::Backend(_)))
    }
}

/// `New -> Answered`. Attaches the payload; fails without mutating the quest
/// if the payload is empty or of the wrong kind.
pub fn answer(quest: &mut Quest, answer: Answer) -> Result<(), OpError> {
    if quest.status != QuestStatus::New {
        return Err(OpError::InvalidTransition {
            id: quest.id,
            from: quest.status,
            to: QuestStatus::Answered,
        });
    }

    let id = quest.id;
    let group = quest.group();
    match (&mut quest.body, answer) {
        (QuestBody::Element { changes, .. }, Answer::Tags(tags)) => {
            if tags.is_empty() {
                return Err(OpError::EmptyPayload { id, group });
            }
            *changes = Some(tags);
        }
        (QuestBody::Note { comment, .. }, Answer::Comment(text)) => {
            if text.trim().is_empty() {
                return Err(OpError::EmptyPayload { id, group });
            }
            *comment = Some(text);
        }
        (_, given) => {
            return Err(OpError::PayloadMismatch {
                id,
                group,
                given: given.group(),
            });
        }
    }
    quest.status = QuestStatus::Answered;
    Ok(())
}

/// `New -> Hidden`. User-initiated suppression; terminal.
pub fn hide(quest: &mut Quest) -> Result<(), OpError> {
    if quest.status != QuestStatus::New {
        return Err(OpError::InvalidTransition {
            id: quest.id,
            from: quest.status,
            to: QuestStatus::Hidden,
        });
    }
    quest.status = QuestStatus::Hidden;
    Ok(())
}

/// `Answered -> Hidden`, applied by the reconciler to note quests after a
/// successful upload. The record is retained because the unresolved note keeps
/// blocking element quests at that location.
pub(crate) fn conceal_after_upload(quest: &mut Quest) -> Result<(), OpError> {
    if quest.status != QuestStatus::Answered {
        return Err(OpError::InvalidTransition {
            id: quest.id,
            from: quest.status,
            to: QuestStatus::Hidden,
        });
    }
    quest.status = QuestStatus::Hidden;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ElementKind, ElementRef, LatLon, NoteId, QuestTypeId};

    fn element_quest() -> Quest {
        Quest::new_element(
            QuestId(1),
            LatLon::new(53.5, 10.0),
            ElementRef::new(ElementKind::Way, 7),
            QuestTypeId::new("AddMaxSpeed"),
        )
    }

    fn note_quest() -> Quest {
        Quest::new_note(QuestId(2), LatLon::new(53.5, 10.0), NoteId(3))
    }

    #[test]
    fn answering_with_empty_changes_fails_and_leaves_quest_untouched() {
        let mut quest = element_quest();
        let before = quest.clone();
        let err = answer(&mut quest, Answer::Tags(TagChanges::new())).unwrap_err();
        assert!(matches!(err, OpError::EmptyPayload { id: QuestId(1), .. }));
        assert!(err.is_defect());
        assert_eq!(quest, before);
    }

    #[test]
    fn answering_with_blank_comment_fails() {
        let mut quest = note_quest();
        let err = answer(&mut quest, Answer::Comment("   ".into())).unwrap_err();
        assert!(matches!(err, OpError::EmptyPayload { .. }));
        assert_eq!(quest.status, QuestStatus::New);
    }

    #[test]
    fn payload_kind_must_match_quest_group() {
        let mut quest = element_quest();
        let err = answer(&mut quest, Answer::Comment("hello".into())).unwrap_err();
        assert!(matches!(
            err,
            OpError::PayloadMismatch {
                group: QuestGroup::Element,
                given: QuestGroup::Note,
                ..
            }
        ));
    }

    #[test]
    fn valid_answers_transition_to_answered() {
        let mut quest = element_quest();
        let mut tags = TagChanges::new();
        tags.set("maxspeed", "30");
        answer(&mut quest, Answer::Tags(tags)).unwrap();
        assert_eq!(quest.status, QuestStatus::Answered);
        assert!(quest.has_payload());

        let mut note = note_quest();
        answer(&mut note, Answer::Comment("the bench is gone".into())).unwrap();
        assert_eq!(note.status, QuestStatus::Answered);
    }

    #[test]
    fn hidden_is_terminal() {
        let mut quest = element_quest();
        hide(&mut quest).unwrap();
        assert_eq!(quest.status, QuestStatus::Hidden);

        let mut tags = TagChanges::new();
        tags.set("maxspeed", "30");
        assert!(matches!(
            answer(&mut quest, Answer::Tags(tags)),
            Err(OpError::InvalidTransition { .. })
        ));
        assert!(matches!(
            hide(&mut quest),
            Err(OpError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn answered_quests_cannot_be_hidden_by_the_user() {
        let mut quest = note_quest();
        answer(&mut quest, Answer::Comment("still open".into())).unwrap();
        assert!(matches!(
            hide(&mut quest),
            Err(OpError::InvalidTransition { .. })
        ));
        // The reconciler-driven conceal is the only way out of Answered
        // besides deletion.
        conceal_after_upload(&mut quest).unwrap();
        assert_eq!(quest.status, QuestStatus::Hidden);
    }
}
