#![forbid(unsafe_code)]

//! waymark: the quest lifecycle and upload reconciliation engine of an
//! offline-first, collaboratively edited geographic dataset.
//!
//! Each device holds an autonomous local replica of nearby "quests" (small
//! edit tasks tied to map features) that can be answered offline. This crate
//! owns the rules reconciling that optimistic local cache against the
//! authoritative remote store: the status state machine, the upload pass with
//! its conflict-discard policy, feature-scoped blocking between quests, and
//! the orchestration that serializes concurrent local mutations. Storage, the
//! remote client, the UI and the download scheduler are host-provided
//! collaborators behind traits.

pub mod config;
pub mod controller;
pub mod engine;
pub mod error;
pub mod gateway;
pub mod model;
pub mod relay;
pub mod store;
pub mod telemetry;
mod worker;

pub use error::{Effect, Error, Transience};
pub type Result<T> = std::result::Result<T, Error>;

// Re-export the main surface at the crate root for convenience.
pub use controller::QuestController;
pub use engine::{
    Answer, AutoDownloadPolicy, CancelFlag, DownloadDispatcher, DownloadRequest, OpError,
    UploadReconciler, UploadStats,
};
pub use gateway::{GatewayError, RemoteGateway};
pub use model::{
    BoundingBox, Element, ElementKind, ElementRef, LatLon, NoteId, NoteRequest, Quest, QuestBody,
    QuestGroup, QuestId, QuestStatus, QuestTypeId, TagChanges, TagEdit,
};
pub use relay::{QuestListener, QuestRelay};
pub use store::{
    ElementStore, MemoryElementStore, MemoryNoteRequestStore, MemoryQuestStore, NoteRequestStore,
    QuestFilter, QuestStore, StoreError,
};
