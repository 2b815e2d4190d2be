//! Persistence boundary.
//!
//! The storage engine is an external collaborator; this module defines the
//! narrow traits the engine consumes plus in-memory implementations used by
//! hosts without a database and by the test suite. Correctness of concurrent
//! access relies on the store's per-record atomicity; the engine adds no
//! cross-record transactions on top.

use std::collections::BTreeMap;
use std::sync::Mutex;

use thiserror::Error;

use crate::error::{Effect, Transience};
use crate::model::{
    BoundingBox, Element, ElementRef, NoteRequest, Quest, QuestBody, QuestGroup, QuestId,
    QuestStatus,
};

/// Storage failures.
///
/// `NotFound` is a logic defect by contract: every id handed to the engine has
/// been validated by the caller beforehand.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum StoreError {
    #[error("quest not found: {0}")]
    NotFound(QuestId),

    #[error("storage backend failure: {0}")]
    Backend(String),
}

impl StoreError {
    pub fn transience(&self) -> Transience {
        match self {
            StoreError::NotFound(_) => Transience::Permanent,
            StoreError::Backend(_) => Transience::Unknown,
        }
    }

    pub fn effect(&self) -> Effect {
        match self {
            StoreError::NotFound(_) => Effect::None,
            StoreError::Backend(_) => Effect::Unknown,
        }
    }
}

/// Predicate for [`QuestStore::get_all`]. Empty filter matches everything.
#[derive(Clone, Debug, Default)]
pub struct QuestFilter {
    pub area: Option<BoundingBox>,
    pub status: Option<QuestStatus>,
    pub element: Option<ElementRef>,
    pub group: Option<QuestGroup>,
}

impl QuestFilter {
    pub fn status(mut self, status: QuestStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn area(mut self, area: BoundingBox) -> Self {
        self.area = Some(area);
        self
    }

    pub fn element(mut self, element: ElementRef) -> Self {
        self.element = Some(element);
        self
    }

    pub fn group(mut self, group: QuestGroup) -> Self {
        self.group = Some(group);
        self
    }

    pub fn matches(&self, quest: &Quest) -> bool {
        if let Some(status) = self.status
            && quest.status != status
        {
            return false;
        }
        if let Some(area) = self.area
            && !area.contains(quest.position)
        {
            return false;
        }
        if let Some(element) = self.element
            && quest.element() != Some(&element)
        {
            return false;
        }
        if let Some(group) = self.group
            && quest.group() != group
        {
            return false;
        }
        true
    }
}

/// Persisted quest records, queryable by status/area/linked element.
pub trait QuestStore: Send + Sync {
    fn get(&self, id: QuestId) -> Result<Quest, StoreError>;
    fn get_all(&self, filter: &QuestFilter) -> Result<Vec<Quest>, StoreError>;
    fn update(&self, quest: &Quest) -> Result<(), StoreError>;
    fn delete(&self, id: QuestId) -> Result<(), StoreError>;
}

/// Locally cached map elements, for presentation reads and diffing.
pub trait ElementStore: Send + Sync {
    fn get(&self, element: &ElementRef) -> Result<Option<Element>, StoreError>;
    fn put(&self, element: Element) -> Result<(), StoreError>;
    /// Drop every cached element not in `referenced`. Returns how many were
    /// dropped.
    fn delete_unreferenced(&self, referenced: &[ElementRef]) -> Result<usize, StoreError>;
}

/// Pending note-creation requests awaiting upload.
pub trait NoteRequestStore: Send + Sync {
    fn add(&self, request: NoteRequest) -> Result<(), StoreError>;
}

// =============================================================================
// In-memory implementations
// =============================================================================

#[derive(Default)]
struct MemoryQuestInner {
    quests: BTreeMap<i64, Quest>,
    next_id: i64,
}

/// Mutex-guarded map store. Per-record operations are atomic, matching the
/// contract the engine expects from a real backend.
#[derive(Default)]
pub struct MemoryQuestStore {
    inner: Mutex<MemoryQuestInner>,
}

impl MemoryQuestStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a freshly downloaded quest, assigning the next id. This is the
    /// path the download pipeline feeds results through.
    pub fn create(&self, position: crate::model::LatLon, body: QuestBody) -> Quest {
        let mut inner = self.inner.lock().expect("quest store lock poisoned");
        inner.next_id += 1;
        let quest = Quest {
            id: QuestId(inner.next_id),
            status: QuestStatus::New,
            position,
            body,
        };
        inner.quests.insert(quest.id.0, quest.clone());
        quest
    }

    pub fn len(&self) -> usize {
        self.inner.lock().expect("quest store lock poisoned").quests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl QuestStore for MemoryQuestStore {
    fn get(&self, id: QuestId) -> Result<Quest, StoreError> {
        let inner = self.inner.lock().expect("quest store lock poisoned");
        inner.quests.get(&id.0).cloned().ok_or(StoreError::NotFound(id))
    }

    fn get_all(&self, filter: &QuestFilter) -> Result<Vec<Quest>, StoreError> {
        let inner = self.inner.lock().expect("quest store lock poisoned");
        Ok(inner
            .quests
            .values()
            .filter(|q| filter.matches(q))
            .cloned()
            .collect())
    }

    fn update(&self, quest: &Quest) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().expect("quest store lock poisoned");
        match inner.quests.get_mut(&quest.id.0) {
            Some(slot) => {
                *slot = quest.clone();
                Ok(())
            }
            None => Err(StoreError::NotFound(quest.id)),
        }
    }

    fn delete(&self, id: QuestId) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().expect("quest store lock poisoned");
        match inner.quests.remove(&id.0) {
            Some(_) => Ok(()),
            None => Err(StoreError::NotFound(id)),
        }
    }
}

#[derive(Default)]
pub struct MemoryElementStore {
    inner: Mutex<BTreeMap<ElementRef, Element>>,
}

impl MemoryElementStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().expect("element store lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ElementStore for MemoryElementStore {
    fn get(&self, element: &ElementRef) -> Result<Option<Element>, StoreError> {
        let inner = self.inner.lock().expect("element store lock poisoned");
        Ok(inner.get(element).cloned())
    }

    fn put(&self, element: Element) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().expect("element store lock poisoned");
        inner.insert(element.reference(), element);
        Ok(())
    }

    fn delete_unreferenced(&self, referenced: &[ElementRef]) -> Result<usize, StoreError> {
        let mut inner = self.inner.lock().expect("element store lock poisoned");
        let before = inner.len();
        inner.retain(|key, _| referenced.contains(key));
        Ok(before - inner.len())
    }
}

#[derive(Default)]
pub struct MemoryNoteRequestStore {
    inner: Mutex<Vec<NoteRequest>>,
}

impl MemoryNoteRequestStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn all(&self) -> Vec<NoteRequest> {
        self.inner.lock().expect("note request store lock poisoned").clone()
    }
}

impl NoteRequestStore for MemoryNoteRequestStore {
    fn add(&self, request: NoteRequest) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().expect("note request store lock poisoned");
        inner.push(request);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ElementKind, LatLon, QuestTypeId};

    fn element_body(id: i64) -> QuestBody {
        QuestBody::Element {
            element: ElementRef::new(ElementKind::Node, id),
            quest_type: QuestTypeId::new("AddBenchBackrest"),
            changes: None,
        }
    }

    #[test]
    fn filter_narrows_by_status_area_and_element() {
        let store = MemoryQuestStore::new();
        let inside = store.create(LatLon::new(53.5, 10.0), element_body(1));
        let outside = store.create(LatLon::new(40.0, -3.7), element_body(2));

        let area = BoundingBox::new(LatLon::new(53.0, 9.0), LatLon::new(54.0, 11.0));
        let found = store
            .get_all(&QuestFilter::default().area(area).status(QuestStatus::New))
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, inside.id);

        let by_element = store
            .get_all(
                &QuestFilter::default().element(ElementRef::new(ElementKind::Node, 2)),
            )
            .unwrap();
        assert_eq!(by_element.len(), 1);
        assert_eq!(by_element[0].id, outside.id);
    }

    #[test]
    fn missing_ids_are_not_found() {
        let store = MemoryQuestStore::new();
        assert!(matches!(
            store.get(QuestId(99)),
            Err(StoreError::NotFound(QuestId(99)))
        ));
        assert!(matches!(
            store.delete(QuestId(99)),
            Err(StoreError::NotFound(QuestId(99)))
        ));
    }

    #[test]
    fn delete_unreferenced_keeps_live_elements() {
        let store = MemoryElementStore::new();
        let kept = ElementRef::new(ElementKind::Way, 1);
        let dropped = ElementRef::new(ElementKind::Node, 2);
        store
            .put(Element {
                kind: kept.kind,
                id: kept.id,
                tags: Default::default(),
            })
            .unwrap();
        store
            .put(Element {
                kind: dropped.kind,
                id: dropped.id,
                tags: Default::default(),
            })
            .unwrap();

        let pruned = store.delete_unreferenced(&[kept]).unwrap();
        assert_eq!(pruned, 1);
        assert!(store.get(&kept).unwrap().is_some());
        assert!(store.get(&dropped).unwrap().is_none());
    }
}
