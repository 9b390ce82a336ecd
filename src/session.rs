//! A playback session: one batch, one scheduler, one lifecycle.
//!
//! [`PlaybackSession`] ties a [`BatchLoader`], the current [`FrameStore`] and a
//! [`PlaybackScheduler`] together behind a small state machine:
//!
//! ```text
//! Idle -> Loading -> Ready -> Playing <-> Stopped
//!           ^______________________________|  (any state, on load)
//! ```
//!
//! Every load gets a fresh store; the previous batch is dropped wholesale.
//! Loads are numbered, and callbacks belonging to a superseded load are
//! ignored even if they slip past cancellation.

use std::sync::{Arc, Weak};

use frameloop_ppm::FrameMetadata;
use parking_lot::Mutex;
use tokio::sync::watch;

use crate::error::{validate_rate, Error, Result};
use crate::loader::{BatchLoader, BatchRequest, LoadCallbacks, LoadProgress};
use crate::playback::PlaybackScheduler;
use crate::renderer::Renderer;
use crate::source::FrameSource;
use crate::store::FrameStore;

/// Lifecycle of a [`PlaybackSession`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlaybackState {
    /// Nothing loaded yet.
    Idle,
    /// A batch is being fetched and decoded.
    Loading,
    /// The batch is fully loaded but not playing.
    Ready,
    /// Frames are being rendered on schedule.
    Playing,
    /// Playback was stopped; the batch is still loaded.
    Stopped,
}

impl PlaybackState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Loading => "loading",
            Self::Ready => "ready",
            Self::Playing => "playing",
            Self::Stopped => "stopped",
        }
    }

    /// Whether a loaded batch is available to play.
    pub fn has_batch(&self) -> bool {
        matches!(self, Self::Ready | Self::Playing | Self::Stopped)
    }
}

impl std::fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A fully loaded batch.
#[derive(Debug, Clone)]
struct LoadedBatch {
    store: Arc<FrameStore>,
    metadata: Option<FrameMetadata>,
}

struct Inner<R: Renderer> {
    loader: BatchLoader,
    scheduler: PlaybackScheduler<R>,
    batch: Option<LoadedBatch>,
    request: Option<BatchRequest>,
    generation: u64,
    rate: f64,
    progress: LoadProgress,
    failed: Vec<usize>,
    state_tx: watch::Sender<PlaybackState>,
}

impl<R: Renderer> Inner<R> {
    fn state(&self) -> PlaybackState {
        *self.state_tx.borrow()
    }

    fn set_state(&mut self, state: PlaybackState) {
        let previous = self.state_tx.send_replace(state);
        if previous != state {
            tracing::debug!("Session state: {} -> {}", previous, state);
        }
    }

    fn is_current(&self, generation: u64) -> bool {
        if generation != self.generation {
            tracing::debug!(
                generation,
                current = self.generation,
                "Ignoring callback from superseded load"
            );
            return false;
        }
        true
    }

    fn finish_batch(&mut self, store: FrameStore, metadata: Option<FrameMetadata>) {
        self.batch = Some(LoadedBatch {
            store: Arc::new(store),
            metadata,
        });
        self.set_state(PlaybackState::Ready);

        if let Err(e) = self.start_playback() {
            tracing::warn!("Batch loaded but playback not started: {}", e);
        }
    }

    fn start_playback(&mut self) -> Result<()> {
        let Some(batch) = self.batch.clone() else {
            return Err(Error::NotReady(self.state()));
        };
        let Some(metadata) = batch.metadata else {
            return Err(Error::EmptyBatch);
        };

        self.scheduler.start(batch.store, metadata, self.rate)?;
        self.set_state(PlaybackState::Playing);
        Ok(())
    }
}

/// Loads a batch and plays it back through a renderer.
///
/// Cloning yields another handle to the same session. The session must be used
/// within a tokio runtime.
pub struct PlaybackSession<R: Renderer> {
    inner: Arc<Mutex<Inner<R>>>,
}

impl<R: Renderer> Clone for PlaybackSession<R> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<R: Renderer> PlaybackSession<R> {
    /// Create a session that fetches frames from `source` with unbounded fan-out.
    pub fn new(source: Arc<dyn FrameSource>, renderer: R) -> Self {
        Self::with_loader(BatchLoader::new(source), renderer)
    }

    /// Create a session around a preconfigured loader.
    pub fn with_loader(loader: BatchLoader, renderer: R) -> Self {
        let (state_tx, _) = watch::channel(PlaybackState::Idle);
        let inner = Inner {
            loader,
            scheduler: PlaybackScheduler::new(renderer),
            batch: None,
            request: None,
            generation: 0,
            rate: 1.0,
            progress: LoadProgress::default(),
            failed: Vec::new(),
            state_tx,
        };
        Self {
            inner: Arc::new(Mutex::new(inner)),
        }
    }

    /// Load `request` and start playing it at `rate` once every frame is in.
    ///
    /// Supersedes whatever the session was doing: playback stops, the current
    /// batch is discarded and any outstanding load is cancelled.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidRate`] if `rate` is not a positive, finite number. The
    /// session is left untouched in that case.
    pub fn load(&self, request: BatchRequest, rate: f64) -> Result<()> {
        let rate = validate_rate(rate)?;

        let mut inner = self.inner.lock();
        inner.scheduler.stop();
        inner.batch = None;
        inner.generation += 1;
        inner.rate = rate;
        inner.progress = LoadProgress {
            loaded: 0,
            total: request.frame_count,
        };
        inner.failed.clear();
        inner.request = Some(request.clone());
        inner.set_state(PlaybackState::Loading);

        let callbacks = self.callbacks(inner.generation);
        inner.loader.load(request, callbacks);
        Ok(())
    }

    /// Load the most recent request again, re-reading every frame.
    ///
    /// # Errors
    ///
    /// [`Error::NotReady`] if nothing has been loaded yet.
    pub fn reload(&self) -> Result<()> {
        let (request, rate, state) = {
            let inner = self.inner.lock();
            (inner.request.clone(), inner.rate, inner.state())
        };
        let request = request.ok_or(Error::NotReady(state))?;
        self.load(request, rate)
    }

    fn callbacks(&self, generation: u64) -> LoadCallbacks {
        let on_complete = Arc::downgrade(&self.inner);
        let on_progress = on_complete.clone();
        let on_error = on_complete.clone();

        LoadCallbacks::new(move |store, metadata| {
            with_current(&on_complete, generation, |inner| inner.finish_batch(store, metadata));
        })
        .on_progress(move |progress| {
            with_current(&on_progress, generation, |inner| inner.progress = progress);
        })
        .on_error(move |index, _| {
            with_current(&on_error, generation, |inner| inner.failed.push(index));
        })
    }

    /// Restart playback from the first frame.
    ///
    /// # Errors
    ///
    /// - [`Error::NotReady`] while idle or loading
    /// - [`Error::EmptyBatch`] if the loaded batch has no frames
    pub fn play(&self) -> Result<()> {
        let mut inner = self.inner.lock();
        if !inner.state().has_batch() {
            return Err(Error::NotReady(inner.state()));
        }
        inner.start_playback()
    }

    /// Stop playback. Has no effect unless playing.
    pub fn stop(&self) {
        let mut inner = self.inner.lock();
        if inner.state() == PlaybackState::Playing {
            inner.scheduler.stop();
            inner.set_state(PlaybackState::Stopped);
        }
    }

    /// Change the playback rate without interrupting playback.
    ///
    /// The new rate also applies to later `play` calls and reloads.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidRate`] if `rate` is not a positive, finite number.
    pub fn set_rate(&self, rate: f64) -> Result<()> {
        let rate = validate_rate(rate)?;
        let mut inner = self.inner.lock();
        inner.scheduler.set_rate(rate)?;
        inner.rate = rate;
        Ok(())
    }

    pub fn state(&self) -> PlaybackState {
        self.inner.lock().state()
    }

    pub fn rate(&self) -> f64 {
        self.inner.lock().rate
    }

    /// Progress of the current (or last) load.
    pub fn progress(&self) -> LoadProgress {
        self.inner.lock().progress
    }

    /// Frame indices of the current load that failed, in arrival order.
    pub fn failed_frames(&self) -> Vec<usize> {
        self.inner.lock().failed.clone()
    }

    /// Metadata of the loaded batch.
    pub fn metadata(&self) -> Option<FrameMetadata> {
        self.inner.lock().batch.as_ref().and_then(|b| b.metadata)
    }

    /// Index of the frame the next tick will render.
    pub fn current_index(&self) -> usize {
        self.inner.lock().scheduler.current_index()
    }

    /// Ticks rendered since playback last started.
    pub fn ticks(&self) -> u64 {
        self.inner.lock().scheduler.ticks()
    }

    /// Shared handle to the renderer.
    pub fn renderer(&self) -> Arc<Mutex<R>> {
        self.inner.lock().scheduler.renderer()
    }

    /// Watch state transitions.
    pub fn subscribe(&self) -> watch::Receiver<PlaybackState> {
        self.inner.lock().state_tx.subscribe()
    }

    /// Wait until the session enters `target`.
    ///
    /// Returns `false` if the session is dropped first.
    pub async fn wait_until(&self, target: PlaybackState) -> bool {
        let mut rx = self.subscribe();
        let reached = rx.wait_for(|state| *state == target).await.is_ok();
        reached
    }
}

fn with_current<R: Renderer>(
    inner: &Weak<Mutex<Inner<R>>>,
    generation: u64,
    f: impl FnOnce(&mut Inner<R>),
) {
    let Some(inner) = inner.upgrade() else {
        return;
    };
    let mut inner = inner.lock();
    if inner.is_current(generation) {
        f(&mut inner);
    }
}
