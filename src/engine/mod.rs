//! The quest engine.
//!
//! Provides:
//! - the state machine over quest statuses (`ops`)
//! - the upload reconciler draining answered quests (`upload`)
//! - feature-scoped blocking when a note is raised (`blocking`)
//! - download gating and tile alignment (`download`)

pub mod blocking;
pub mod download;
pub mod ops;
pub mod upload;

pub use blocking::BlockingResolver;
pub use download::{AutoDownloadPolicy, DownloadDispatcher, DownloadRequest, Downloader};
pub use ops::{Answer, OpError};
pub use upload::{CancelFlag, UploadReconciler, UploadStats};
