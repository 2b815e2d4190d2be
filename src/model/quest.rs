//! Quest records and their payloads.
//!
//! A quest is one unit of crowd-sourced work: either a question about a map
//! element whose answer becomes a set of tag changes, or an open note whose
//! answer becomes a comment on the remote discussion thread. The two variants
//! share status, position and a pending payload, and differ only in target
//! shape and in what happens after a successful upload.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::geo::LatLon;

/// Store-assigned quest identifier. Unique across both quest groups.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct QuestId(pub i64);

impl fmt::Display for QuestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "q{}", self.0)
    }
}

/// Identifier of a remote note (discussion thread).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NoteId(pub i64);

impl fmt::Display for NoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "note{}", self.0)
    }
}

/// Kind of remote map element.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementKind {
    Node,
    Way,
    Relation,
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ElementKind::Node => "node",
            ElementKind::Way => "way",
            ElementKind::Relation => "relation",
        };
        f.write_str(s)
    }
}

/// Reference to a remote map element.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ElementRef {
    pub kind: ElementKind,
    pub id: i64,
}

impl ElementRef {
    pub fn new(kind: ElementKind, id: i64) -> Self {
        Self { kind, id }
    }
}

impl fmt::Display for ElementRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.kind, self.id)
    }
}

/// Names the quest subtype (the concrete question asked about an element).
///
/// At most one `New` quest per (element, subtype) may exist at a time.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct QuestTypeId(String);

impl QuestTypeId {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for QuestTypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A single tag edit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TagEdit {
    Set(String),
    Delete,
}

/// A set of pending key/value tag changes for one element.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagChanges(BTreeMap<String, TagEdit>);

impl TagChanges {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), TagEdit::Set(value.into()));
    }

    pub fn delete(&mut self, key: impl Into<String>) {
        self.0.insert(key.into(), TagEdit::Delete);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &TagEdit)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// The edits turning `current` into `desired`.
    ///
    /// The production diff lives in the answer-form layer; this helper exists
    /// for hosts and tests that already hold both tag maps.
    pub fn diff(current: &BTreeMap<String, String>, desired: &BTreeMap<String, String>) -> Self {
        let mut changes = Self::new();
        for (key, value) in desired {
            if current.get(key) != Some(value) {
                changes.set(key.clone(), value.clone());
            }
        }
        for key in current.keys() {
            if !desired.contains_key(key) {
                changes.delete(key.clone());
            }
        }
        changes
    }
}

/// Lifecycle status of a quest. Terminal closure is represented by deletion.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestStatus {
    /// Downloaded, unanswered, visible.
    New,
    /// User supplied a payload, not yet confirmed upstream.
    Answered,
    /// Suppressed: either by the user, or a note quest retained after upload.
    Hidden,
}

/// Which of the two quest variants a record belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestGroup {
    Element,
    Note,
}

impl fmt::Display for QuestGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            QuestGroup::Element => "element",
            QuestGroup::Note => "note",
        };
        f.write_str(s)
    }
}

/// Variant-specific target and payload.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "group", rename_all = "snake_case")]
pub enum QuestBody {
    Element {
        element: ElementRef,
        quest_type: QuestTypeId,
        /// Pending tag changes; present only once the quest is answered.
        changes: Option<TagChanges>,
    },
    Note {
        note: NoteId,
        /// Pending comment; present only once the quest is answered.
        comment: Option<String>,
    },
}

/// One unit of crowd-sourced work.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Quest {
    pub id: QuestId,
    pub status: QuestStatus,
    pub position: LatLon,
    pub body: QuestBody,
}

impl Quest {
    pub fn new_element(
        id: QuestId,
        position: LatLon,
        element: ElementRef,
        quest_type: QuestTypeId,
    ) -> Self {
        Self {
            id,
            status: QuestStatus::New,
            position,
            body: QuestBody::Element {
                element,
                quest_type,
                changes: None,
            },
        }
    }

    pub fn new_note(id: QuestId, position: LatLon, note: NoteId) -> Self {
        Self {
            id,
            status: QuestStatus::New,
            position,
            body: QuestBody::Note {
                note,
                comment: None,
            },
        }
    }

    pub fn group(&self) -> QuestGroup {
        match self.body {
            QuestBody::Element { .. } => QuestGroup::Element,
            QuestBody::Note { .. } => QuestGroup::Note,
        }
    }

    /// The referenced map element, for element quests.
    pub fn element(&self) -> Option<&ElementRef> {
        match &self.body {
            QuestBody::Element { element, .. } => Some(element),
            QuestBody::Note { .. } => None,
        }
    }

    pub fn has_payload(&self) -> bool {
        match &self.body {
            QuestBody::Element { changes, .. } => {
                changes.as_ref().is_some_and(|c| !c.is_empty())
            }
            QuestBody::Note { comment, .. } => {
                comment.as_ref().is_some_and(|c| !c.trim().is_empty())
            }
        }
    }
}

/// A remote map element, as cached locally for presentation and diffing.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Element {
    pub kind: ElementKind,
    pub id: i64,
    pub tags: BTreeMap<String, String>,
}

impl Element {
    pub fn reference(&self) -> ElementRef {
        ElementRef::new(self.kind, self.id)
    }
}

/// A pending request to open a note about an element, recorded locally until
/// uploaded. Its existence blocks element quests on the same feature.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NoteRequest {
    pub position: LatLon,
    pub text: String,
    pub element: Option<ElementRef>,
}
