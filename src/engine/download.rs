//! Download gating and tile-aligned region computation.
//!
//! The engine never fetches anything itself: it computes a tile-aligned
//! request and hands it to the host's dispatcher, which turns it into an
//! actual network fetch and feeds results back into the quest store. The
//! handle owns all download-related flags; nothing here is ambient global
//! state.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};

use crate::model::{BoundingBox, LatLon, TileRect, enclosing_tiles};

/// Decides whether an automatic download may run at a location, and how much
/// to fetch. Hosts plug in their own strategy (active-radius, cache-age, ...).
pub trait AutoDownloadPolicy: Send + Sync {
    fn may_download_here(&self, center: &LatLon) -> bool;

    fn download_area(&self, center: &LatLon) -> BoundingBox;

    /// Cap on how many distinct quest subtypes one pass may fetch, to bound
    /// payload size. `None` means unlimited.
    fn quest_type_cap(&self) -> Option<usize>;
}

/// A download order for the host scheduler.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DownloadRequest {
    /// The tile rectangle to fetch.
    pub tiles: TileRect,
    /// Geographic bounds of `tiles` (always tile-aligned).
    pub bbox: BoundingBox,
    /// Subtype cap; absent for manual downloads.
    pub max_quest_types: Option<usize>,
    /// Whether the user asked for this download explicitly.
    pub manual: bool,
}

/// Host boundary: turns requests into network fetches.
pub trait DownloadDispatcher: Send + Sync {
    fn dispatch(&self, request: DownloadRequest);
}

/// Owned handle to the download boundary.
///
/// Tracks whether a user-initiated download is in flight so that automatic
/// downloads never disrupt one. The host reports completion via
/// [`Downloader::finished`].
pub struct Downloader {
    dispatcher: Arc<dyn DownloadDispatcher>,
    zoom: u32,
    policy: RwLock<Option<Arc<dyn AutoDownloadPolicy>>>,
    manual_active: AtomicBool,
    cancel_requested: AtomicBool,
}

impl Downloader {
    pub fn new(dispatcher: Arc<dyn DownloadDispatcher>, zoom: u32) -> Self {
        Self {
            dispatcher,
            zoom,
            policy: RwLock::new(None),
            manual_active: AtomicBool::new(false),
            cancel_requested: AtomicBool::new(false),
        }
    }

    /// Configure (or clear) the automatic download policy. With none set,
    /// automatic downloads are off.
    pub fn set_policy(&self, policy: Option<Arc<dyn AutoDownloadPolicy>>) {
        let mut slot = self.policy.write().expect("download policy lock poisoned");
        *slot = policy;
    }

    /// Request a user-initiated download of at least `bbox`, rounded outward
    /// to the enclosing tile rectangle. Bypasses all gating and carries no
    /// subtype cap. Supersedes a previous in-flight download: the dispatcher
    /// contract is that the newest manual request wins.
    pub fn manual(&self, bbox: &BoundingBox) -> DownloadRequest {
        if self.manual_active.swap(true, Ordering::SeqCst) {
            tracing::debug!("superseding in-flight manual download");
        }
        self.cancel_requested.store(false, Ordering::SeqCst);
        let request = self.aligned(bbox, None, true);
        tracing::info!(tiles = ?request.tiles, "manual download requested");
        self.dispatcher.dispatch(request.clone());
        request
    }

    /// Request an automatic download around `center`, if allowed. Returns the
    /// dispatched request, or `None` when gated off (manual download active,
    /// no policy configured, or the policy rejects the location).
    pub fn auto(&self, center: &LatLon) -> Option<DownloadRequest> {
        if self.manual_active.load(Ordering::SeqCst) {
            tracing::debug!("auto download skipped, user download in progress");
            return None;
        }
        let policy = {
            let slot = self.policy.read().expect("download policy lock poisoned");
            slot.clone()?
        };
        if !policy.may_download_here(center) {
            return None;
        }

        let request = self.aligned(&policy.download_area(center), policy.quest_type_cap(), false);
        tracing::debug!(tiles = ?request.tiles, "auto download requested");
        self.dispatcher.dispatch(request.clone());
        Some(request)
    }

    /// True while a user-initiated download is in flight.
    pub fn manual_in_progress(&self) -> bool {
        self.manual_active.load(Ordering::SeqCst)
    }

    /// Ask the host to abandon the current download. Observed between
    /// downloads, never inside a single in-flight fetch.
    pub fn cancel(&self) {
        self.cancel_requested.store(true, Ordering::SeqCst);
    }

    pub fn cancel_requested(&self) -> bool {
        self.cancel_requested.load(Ordering::SeqCst)
    }

    /// Host callback: the current download finished or was abandoned.
    pub fn finished(&self) {
        self.manual_active.store(false, Ordering::SeqCst);
        self.cancel_requested.store(false, Ordering::SeqCst);
    }

    fn aligned(
        &self,
        bbox: &BoundingBox,
        max_quest_types: Option<usize>,
        manual: bool,
    ) -> DownloadRequest {
        let tiles = enclosing_tiles(bbox, self.zoom);
        DownloadRequest {
            tiles,
            bbox: tiles.bounds(self.zoom),
            max_quest_types,
            manual,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::model::DEFAULT_TILE_ZOOM;

    #[derive(Default)]
    struct RecordingDispatcher {
        requests: Mutex<Vec<DownloadRequest>>,
    }

    impl DownloadDispatcher for RecordingDispatcher {
        fn dispatch(&self, request: DownloadRequest) {
            self.requests.lock().unwrap().push(request);
        }
    }

    struct AlwaysPolicy {
        cap: Option<usize>,
    }

    impl AutoDownloadPolicy for AlwaysPolicy {
        fn may_download_here(&self, _center: &LatLon) -> bool {
            true
        }

        fn download_area(&self, center: &LatLon) -> BoundingBox {
            BoundingBox::new(
                LatLon::new(center.latitude - 0.01, center.longitude - 0.01),
                LatLon::new(center.latitude + 0.01, center.longitude + 0.01),
            )
        }

        fn quest_type_cap(&self) -> Option<usize> {
            self.cap
        }
    }

    struct NowherePolicy;

    impl AutoDownloadPolicy for NowherePolicy {
        fn may_download_here(&self, _center: &LatLon) -> bool {
            false
        }

        fn download_area(&self, _center: &LatLon) -> BoundingBox {
            unreachable!("gate rejected the location")
        }

        fn quest_type_cap(&self) -> Option<usize> {
            None
        }
    }

    fn downloader() -> (Arc<RecordingDispatcher>, Downloader) {
        let dispatcher = Arc::new(RecordingDispatcher::default());
        let downloader = Downloader::new(dispatcher.clone(), DEFAULT_TILE_ZOOM);
        (dispatcher, downloader)
    }

    #[test]
    fn auto_download_requires_a_policy() {
        let (dispatcher, downloader) = downloader();
        assert!(downloader.auto(&LatLon::new(53.5, 10.0)).is_none());
        assert!(dispatcher.requests.lock().unwrap().is_empty());
    }

    #[test]
    fn auto_download_honors_the_policy_gate_and_cap() {
        let (dispatcher, downloader) = downloader();

        downloader.set_policy(Some(Arc::new(NowherePolicy)));
        assert!(downloader.auto(&LatLon::new(53.5, 10.0)).is_none());

        downloader.set_policy(Some(Arc::new(AlwaysPolicy { cap: Some(4) })));
        let request = downloader.auto(&LatLon::new(53.5, 10.0)).unwrap();
        assert_eq!(request.max_quest_types, Some(4));
        assert!(!request.manual);
        assert_eq!(dispatcher.requests.lock().unwrap().len(), 1);
    }

    #[test]
    fn auto_download_is_refused_while_a_manual_download_runs() {
        let (dispatcher, downloader) = downloader();
        downloader.set_policy(Some(Arc::new(AlwaysPolicy { cap: None })));

        let bbox = BoundingBox::new(LatLon::new(53.5, 10.0), LatLon::new(53.51, 10.01));
        let manual = downloader.manual(&bbox);
        assert!(manual.manual);
        assert_eq!(manual.max_quest_types, None);
        assert!(downloader.manual_in_progress());

        assert!(downloader.auto(&LatLon::new(53.5, 10.0)).is_none());
        assert_eq!(dispatcher.requests.lock().unwrap().len(), 1);

        downloader.finished();
        assert!(!downloader.manual_in_progress());
        assert!(downloader.auto(&LatLon::new(53.5, 10.0)).is_some());
    }

    #[test]
    fn manual_download_is_never_gated() {
        let (dispatcher, downloader) = downloader();
        // No policy at all; manual still goes through.
        let bbox = BoundingBox::new(LatLon::new(53.5, 10.0), LatLon::new(53.51, 10.01));
        let request = downloader.manual(&bbox);
        assert!(request.bbox.contains(bbox.min));
        assert!(request.bbox.contains(bbox.max));
        assert_eq!(dispatcher.requests.lock().unwrap().len(), 1);
    }

    #[test]
    fn requests_are_tile_aligned() {
        let (_, downloader) = downloader();
        let bbox = BoundingBox::new(LatLon::new(52.51, 13.37), LatLon::new(52.53, 13.41));
        let request = downloader.manual(&bbox);
        assert_eq!(request.bbox, request.tiles.bounds(DEFAULT_TILE_ZOOM));
    }

    #[test]
    fn cancellation_is_a_host_visible_flag() {
        let (_, downloader) = downloader();
        let bbox = BoundingBox::new(LatLon::new(53.5, 10.0), LatLon::new(53.51, 10.01));
        downloader.manual(&bbox);
        assert!(!downloader.cancel_requested());
        downloader.cancel();
        assert!(downloader.cancel_requested());
        downloader.finished();
        assert!(!downloader.cancel_requested());
        assert!(!downloader.manual_in_progress());
    }
}
