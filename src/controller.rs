//! Orchestrator.
//!
//! Every user-initiated mutation (answer, hide, raise-note) runs as an
//! independent task on an unordered pool and, on completion, chains an
//! opportunistic upload pass. Presentation reads go through a single bounded
//! sequential worker so a caller's fetch requests are observed in submission
//! order, without interleaving. Mutation calls are fire-and-forget: they
//! return before the job runs, and a triggered upload pass may still be in
//! flight when they do.

use std::sync::Arc;

use crate::config::Config;
use crate::engine::download::{AutoDownloadPolicy, DownloadDispatcher, DownloadRequest};
use crate::engine::ops::{self, Answer, OpError};
use crate::engine::{BlockingResolver, CancelFlag, Downloader, UploadReconciler};
use crate::gateway::RemoteGateway;
use crate::model::{BoundingBox, LatLon, QuestId, QuestStatus};
use crate::relay::{QuestListener, QuestRelay};
use crate::store::{ElementStore, NoteRequestStore, QuestFilter, QuestStore};
use crate::worker::{SequentialWorker, TaskPool};

const READ_QUEUE_CAPACITY: usize = 64;

enum ReadRequest {
    Quest(QuestId),
    Area(BoundingBox),
}

enum Job {
    Answer { id: QuestId, answer: Answer },
    Hide { id: QuestId },
    RaiseNote { id: QuestId, text: String },
    Upload,
}

pub struct QuestController {
    relay: Arc<QuestRelay>,
    downloader: Downloader,
    upload_cancel: CancelFlag,
    reads: SequentialWorker<ReadRequest>,
    jobs: TaskPool<Job>,
}

impl QuestController {
    pub fn new(
        store: Arc<dyn QuestStore>,
        elements: Arc<dyn ElementStore>,
        notes: Arc<dyn NoteRequestStore>,
        gateway: Arc<dyn RemoteGateway>,
        dispatcher: Arc<dyn DownloadDispatcher>,
        config: &Config,
    ) -> Self {
        let relay = Arc::new(QuestRelay::new());
        let upload_cancel = CancelFlag::new();

        let mutator = Arc::new(Mutator {
            store: store.clone(),
            relay: relay.clone(),
            reconciler: UploadReconciler::new(store.clone(), gateway),
            resolver: BlockingResolver::new(
                store.clone(),
                elements.clone(),
                notes,
                relay.clone(),
            ),
            cancel: upload_cancel.clone(),
            auto_upload: config.upload.auto_upload,
        });
        let jobs = TaskPool::spawn(
            config.upload.workers,
            Arc::new(move |job| mutator.run(job)),
        );

        let reader = Reader {
            store,
            elements,
            relay: relay.clone(),
        };
        let reads = SequentialWorker::spawn(READ_QUEUE_CAPACITY, move |req| reader.run(req));

        Self {
            relay,
            downloader: Downloader::new(dispatcher, config.download.tile_zoom),
            upload_cancel,
            reads,
            jobs,
        }
    }

    // -------------------------------------------------------------------------
    // Presentation
    // -------------------------------------------------------------------------

    pub fn set_listener(&self, listener: Arc<dyn QuestListener>) {
        self.relay.set_listener(listener);
    }

    pub fn clear_listener(&self) {
        self.relay.clear_listener();
    }

    /// Retrieve one quest (with its cached element, if any) asynchronously.
    /// The result arrives as a `quest_created` notification.
    pub fn retrieve(&self, id: QuestId) -> bool {
        self.reads.submit(ReadRequest::Quest(id))
    }

    /// Retrieve all visible (`New`) quests in the bounding box asynchronously.
    pub fn retrieve_area(&self, bbox: BoundingBox) -> bool {
        self.reads.submit(ReadRequest::Area(bbox))
    }

    // -------------------------------------------------------------------------
    // Mutations (fire-and-forget)
    // -------------------------------------------------------------------------

    /// Apply the user's answer to a quest. The quest leaves the visible set.
    pub fn answer_quest(&self, id: QuestId, answer: Answer) -> bool {
        self.jobs.submit(Job::Answer { id, answer })
    }

    /// Suppress a quest per user choice.
    pub fn hide_quest(&self, id: QuestId) -> bool {
        self.jobs.submit(Job::Hide { id })
    }

    /// Raise a note about an element quest's feature instead of answering it.
    /// Every pending quest on that feature is removed.
    pub fn create_note(&self, id: QuestId, text: String) -> bool {
        self.jobs.submit(Job::RaiseNote { id, text })
    }

    /// Trigger an upload pass without a preceding mutation.
    pub fn upload(&self) -> bool {
        self.jobs.submit(Job::Upload)
    }

    /// Block until every queued mutation (and its chained upload pass) has
    /// completed. Intended for orderly shutdown and tests.
    pub fn wait_idle(&self) {
        self.jobs.wait_idle();
    }

    // -------------------------------------------------------------------------
    // Downloads
    // -------------------------------------------------------------------------

    pub fn set_download_policy(&self, policy: Option<Arc<dyn AutoDownloadPolicy>>) {
        self.downloader.set_policy(policy);
    }

    /// Request download of at least `bbox`, rounded outward to whole tiles.
    /// Supersedes a previous in-flight download.
    pub fn manual_download(&self, bbox: &BoundingBox) -> DownloadRequest {
        self.downloader.manual(bbox)
    }

    /// Request an automatic download around `center`, subject to gating.
    pub fn auto_download(&self, center: &LatLon) -> Option<DownloadRequest> {
        self.downloader.auto(center)
    }

    pub fn is_manual_download_running(&self) -> bool {
        self.downloader.manual_in_progress()
    }

    pub fn cancel_download(&self) {
        self.downloader.cancel();
    }

    /// Host callback once a dispatched download finished or was abandoned.
    pub fn download_finished(&self) {
        self.downloader.finished();
    }

    /// Stop both workers. Pending mutations drain first; an upload pass in
    /// flight stops at the next whole-quest boundary.
    pub fn stop(&mut self) {
        self.upload_cancel.cancel();
        self.jobs.stop();
        self.reads.stop();
    }
}

/// Executes mutation jobs on the pool threads.
struct Mutator {
    store: Arc<dyn QuestStore>,
    relay: Arc<QuestRelay>,
    reconciler: UploadReconciler,
    resolver: BlockingResolver,
    cancel: CancelFlag,
    auto_upload: bool,
}

impl Mutator {
    fn run(&self, job: Job) {
        let chain_upload = !matches!(job, Job::Upload) && self.auto_upload;
        let result = match job {
            Job::Answer { id, answer } => self.answer(id, answer),
            Job::Hide { id } => self.hide(id),
            Job::RaiseNote { id, text } => self.resolver.raise_note(id, text).map(|_| ()),
            Job::Upload => self.upload_pass(),
        };

        match result {
            // Invariant violations land here: the offending operation is
            // terminated and reported loudly, the process keeps running.
            Err(err) if err.is_defect() => {
                tracing::error!(error = %err, "mutation violated an engine invariant");
                return;
            }
            Err(err) => {
                tracing::warn!(error = %err, transience = ?err.transience(), "mutation failed");
                return;
            }
            Ok(()) => {}
        }

        if chain_upload
            && let Err(err) = self.upload_pass()
        {
            tracing::error!(error = %err, "opportunistic upload pass failed");
        }
    }

    fn answer(&self, id: QuestId, answer: Answer) -> Result<(), OpError> {
        let mut quest = self.store.get(id)?;
        // Fails before any store write on an empty or mismatched payload.
        ops::answer(&mut quest, answer)?;
        self.store.update(&quest)?;
        self.relay.removed(id, quest.group());
        Ok(())
    }

    fn hide(&self, id: QuestId) -> Result<(), OpError> {
        let mut quest = self.store.get(id)?;
        ops::hide(&mut quest)?;
        self.store.update(&quest)?;
        self.relay.removed(id, quest.group());
        Ok(())
    }

    fn upload_pass(&self) -> Result<(), OpError> {
        let stats = self.reconciler.run(&self.cancel)?;
        if stats.committed + stats.discarded + stats.deferred > 0 {
            tracing::info!(
                committed = stats.committed,
                discarded = stats.discarded,
                deferred = stats.deferred,
                "upload pass finished"
            );
        }
        Ok(())
    }
}

/// Executes presentation reads on the sequential worker thread.
struct Reader {
    store: Arc<dyn QuestStore>,
    elements: Arc<dyn ElementStore>,
    relay: Arc<QuestRelay>,
}

impl Reader {
    fn run(&self, request: ReadRequest) {
        let result = match request {
            ReadRequest::Quest(id) => self.one(id),
            ReadRequest::Area(bbox) => self.area(bbox),
        };
        if let Err(err) = result {
            tracing::error!(error = %err, "presentation read failed");
        }
    }

    fn one(&self, id: QuestId) -> Result<(), OpError> {
        let quest = self.store.get(id)?;
        let element = match quest.element() {
            Some(element_ref) => self.elements.get(element_ref)?,
            None => None,
        };
        self.relay.created(&quest, element.as_ref());
        Ok(())
    }

    fn area(&self, bbox: BoundingBox) -> Result<(), OpError> {
        let quests = self.store.get_all(
            &QuestFilter::default()
                .area(bbox)
                .status(QuestStatus::New),
        )?;
        for quest in quests {
            self.relay.created(&quest, None);
        }
        Ok(())
    }
}
