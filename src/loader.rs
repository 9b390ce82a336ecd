//! Concurrent loading of a numbered batch of frame documents.
//!
//! [`BatchLoader::load`] fans out one fetch per frame index and returns
//! immediately. Each fetch task retrieves and decodes its document; results are
//! funnelled back to a single driver task, which is the only writer of the
//! [`FrameStore`] and the only caller of the batch callbacks. That keeps
//! progress strictly ordered without any locking around the store.
//!
//! Completion is a counting barrier: the driver fires `on_complete` exactly once,
//! right after the progress report that brings `loaded` up to the frame count.
//! A frame that fails to fetch or decode is reported through `on_error` and is
//! never counted, so such a batch does not complete.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use frameloop_ppm::FrameMetadata;
use futures::FutureExt;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::error::{Error, Result};
use crate::source::{FrameLocation, FrameSource};
use crate::store::{Frame, FrameStore};

/// Default extension of frame documents.
pub const DEFAULT_EXTENSION: &str = "ppm";

/// Progress of a batch: `loaded` of `total` frames stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LoadProgress {
    pub loaded: usize,
    pub total: usize,
}

impl LoadProgress {
    /// Fraction of the batch loaded, in `[0, 1]`. An empty batch is fully loaded.
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            1.0
        } else {
            self.loaded as f64 / self.total as f64
        }
    }
}

impl std::fmt::Display for LoadProgress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}/{} ({:.0}%)",
            self.loaded,
            self.total,
            self.fraction() * 100.0
        )
    }
}

/// What to load: `{directory}/{index}.{extension}` for every index below
/// `frame_count`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchRequest {
    pub directory: String,
    pub frame_count: usize,
    pub extension: String,
}

impl BatchRequest {
    pub fn new(directory: impl Into<String>, frame_count: usize) -> Self {
        Self {
            directory: directory.into(),
            frame_count,
            extension: DEFAULT_EXTENSION.to_string(),
        }
    }

    /// Builder: set the file extension.
    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into();
        self
    }

    fn location(&self, index: usize, cache_token: u64) -> FrameLocation {
        FrameLocation {
            directory: self.directory.clone(),
            index,
            extension: self.extension.clone(),
            cache_token,
        }
    }
}

type CompleteFn = Box<dyn FnOnce(FrameStore, Option<FrameMetadata>) + Send>;
type StalledFn = Box<dyn FnOnce(FrameStore) + Send>;

/// Callbacks for one batch. All of them run on the batch's driver task, one at
/// a time.
pub struct LoadCallbacks {
    on_progress: Box<dyn FnMut(LoadProgress) + Send>,
    on_complete: CompleteFn,
    on_error: Box<dyn FnMut(usize, Error) + Send>,
    on_stalled: Option<StalledFn>,
}

impl LoadCallbacks {
    /// Create callbacks around the completion handler.
    ///
    /// `on_complete` receives the fully populated store and the batch metadata,
    /// which is `None` only for an empty batch.
    pub fn new(on_complete: impl FnOnce(FrameStore, Option<FrameMetadata>) + Send + 'static) -> Self {
        Self {
            on_progress: Box::new(|_| {}),
            on_complete: Box::new(on_complete),
            on_error: Box::new(|_, _| {}),
            on_stalled: None,
        }
    }

    /// Builder: called after every stored frame.
    pub fn on_progress(mut self, callback: impl FnMut(LoadProgress) + Send + 'static) -> Self {
        self.on_progress = Box::new(callback);
        self
    }

    /// Builder: called once for every frame that fails to fetch, decode or store.
    pub fn on_error(mut self, callback: impl FnMut(usize, Error) + Send + 'static) -> Self {
        self.on_error = Box::new(callback);
        self
    }

    /// Builder: called with the partial store when every fetch has settled but
    /// the batch is incomplete.
    pub fn on_stalled(mut self, callback: impl FnOnce(FrameStore) + Send + 'static) -> Self {
        self.on_stalled = Some(Box::new(callback));
        self
    }
}

impl std::fmt::Debug for LoadCallbacks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadCallbacks").finish_non_exhaustive()
    }
}

/// Handle that cancels an outstanding batch.
///
/// Cancelling suppresses every callback that has not run yet. Fetches already
/// in flight are aborted and their results dropped.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(CancellationToken);

impl CancelToken {
    pub fn new() -> Self {
        Self(CancellationToken::new())
    }

    pub fn cancel(&self) {
        self.0.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.is_cancelled()
    }
}

/// Loads batches of frames from a [`FrameSource`].
///
/// At most one batch is outstanding per loader: starting a new load, or
/// dropping the loader, cancels the previous one.
pub struct BatchLoader {
    source: Arc<dyn FrameSource>,
    max_in_flight: Option<usize>,
    sequence: u64,
    active: Option<CancelToken>,
}

impl BatchLoader {
    pub fn new(source: Arc<dyn FrameSource>) -> Self {
        Self {
            source,
            max_in_flight: None,
            sequence: 0,
            active: None,
        }
    }

    /// Builder: bound the number of concurrent fetches. Zero is treated as one.
    pub fn with_max_in_flight(mut self, limit: usize) -> Self {
        self.max_in_flight = Some(limit.max(1));
        self
    }

    /// Start loading `request`, cancelling any batch still outstanding.
    ///
    /// Returns immediately; results are delivered through `callbacks` from a
    /// spawned task, never from inside this call. Must be called within a
    /// tokio runtime.
    pub fn load(&mut self, request: BatchRequest, callbacks: LoadCallbacks) -> CancelToken {
        self.cancel();

        self.sequence += 1;
        let cache_token = cache_token(self.sequence);
        let token = CancelToken::new();
        self.active = Some(token.clone());

        tracing::info!(
            directory = %request.directory,
            frames = request.frame_count,
            cache_token,
            "Loading batch"
        );

        let limit = self.max_in_flight.map(|n| Arc::new(Semaphore::new(n)));
        tokio::spawn(drive_batch(
            self.source.clone(),
            request,
            cache_token,
            limit,
            token.0.clone(),
            callbacks,
        ));

        token
    }

    /// Cancel the outstanding batch, if any.
    pub fn cancel(&mut self) {
        if let Some(previous) = self.active.take() {
            if !previous.is_cancelled() {
                tracing::debug!("Cancelling outstanding batch");
                previous.cancel();
            }
        }
    }
}

impl Drop for BatchLoader {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Token appended to every request of one load so no cached response is reused.
fn cache_token(sequence: u64) -> u64 {
    let millis = chrono::Utc::now().timestamp_millis().max(0) as u64;
    (millis << 16) | (sequence & 0xffff)
}

async fn fetch_frame(source: &dyn FrameSource, location: &FrameLocation) -> Result<Frame> {
    let text = source.fetch(location).await?;
    let map = frameloop_ppm::decode(&text)?;
    Ok(Frame::new(location.index, map))
}

async fn drive_batch(
    source: Arc<dyn FrameSource>,
    request: BatchRequest,
    cache_token: u64,
    limit: Option<Arc<Semaphore>>,
    cancel: CancellationToken,
    mut callbacks: LoadCallbacks,
) {
    let total = request.frame_count;
    let mut store = FrameStore::new(total);
    let mut loaded = 0usize;

    if total == 0 {
        if !cancel.is_cancelled() {
            tracing::info!(directory = %request.directory, "Empty batch complete");
            (callbacks.on_complete)(store, None);
        }
        return;
    }

    let mut fetches = JoinSet::new();
    for index in 0..total {
        let source = source.clone();
        let location = request.location(index, cache_token);
        let limit = limit.clone();
        fetches.spawn(async move {
            let _permit = match limit {
                Some(semaphore) => semaphore.acquire_owned().await.ok(),
                None => None,
            };
            let result = AssertUnwindSafe(fetch_frame(source.as_ref(), &location))
                .catch_unwind()
                .await
                .unwrap_or_else(|_| Err(Error::fetch(location.to_string(), "fetch task panicked")));
            (index, result)
        });
    }

    loop {
        let joined = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tracing::debug!(
                    directory = %request.directory,
                    in_flight = fetches.len(),
                    "Batch cancelled; dropping remaining fetches"
                );
                fetches.abort_all();
                return;
            }
            joined = fetches.join_next() => joined,
        };

        let Some(joined) = joined else {
            break;
        };

        let (index, result) = match joined {
            Ok(outcome) => outcome,
            Err(e) => {
                // Panics are caught inside the task, so this is an abort from outside.
                tracing::error!("Frame fetch task failed: {}", e);
                continue;
            }
        };

        if cancel.is_cancelled() {
            tracing::debug!(index, "Dropping frame from cancelled batch");
            return;
        }

        match result.and_then(|frame| store.set(index, frame)) {
            Ok(()) => {
                loaded += 1;
                tracing::debug!(index, loaded, total, "Frame loaded");
                (callbacks.on_progress)(LoadProgress { loaded, total });

                if loaded == total {
                    let metadata = store.metadata();
                    tracing::info!(
                        directory = %request.directory,
                        frames = total,
                        "Batch ready"
                    );
                    (callbacks.on_complete)(store, metadata);
                    return;
                }
            }
            Err(e) => {
                tracing::warn!(index, "Frame failed: {}", e);
                (callbacks.on_error)(index, e);
            }
        }
    }

    tracing::warn!(
        directory = %request.directory,
        loaded,
        total,
        "Batch stalled: {} frame(s) missing",
        total - loaded
    );
    if let Some(on_stalled) = callbacks.on_stalled.take() {
        on_stalled(store);
    }
}
