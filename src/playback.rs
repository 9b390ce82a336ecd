//! Cyclic, rate-adjustable playback of a loaded batch.
//!
//! Each [`PlaybackScheduler::start`] spawns a tick task that sleeps one period,
//! renders `frames[index]`, advances `index` modulo the frame count, and then
//! schedules the next tick. The period is read fresh before every sleep, so a
//! rate change lands on the next scheduled tick without firing an extra one.
//! Ticks of one run are strictly sequential: the next sleep only starts after
//! the render call returns.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use frameloop_ppm::FrameMetadata;
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use crate::error::{validate_rate, Error, Result};
use crate::renderer::Renderer;
use crate::store::FrameStore;

/// Counters owned by a single run of the tick task.
#[derive(Debug, Default)]
struct RunState {
    index: AtomicUsize,
    ticks: AtomicU64,
}

struct Run {
    cancel: CancellationToken,
    state: Arc<RunState>,
}

/// Drives a repeating "render next frame" tick.
pub struct PlaybackScheduler<R: Renderer> {
    renderer: Arc<Mutex<R>>,
    rate_bits: Arc<AtomicU64>,
    running: Option<Run>,
    last: Arc<RunState>,
}

impl<R: Renderer> PlaybackScheduler<R> {
    pub fn new(renderer: R) -> Self {
        Self {
            renderer: Arc::new(Mutex::new(renderer)),
            rate_bits: Arc::new(AtomicU64::new(1.0f64.to_bits())),
            running: None,
            last: Arc::new(RunState::default()),
        }
    }

    /// Start playing `store` at `rate` frames per second from index 0.
    ///
    /// Stops any run already in progress first. The first frame is rendered
    /// one period after this call. Must be called within a tokio runtime.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidRate`] if `rate` is not a positive, finite number
    /// - [`Error::EmptyBatch`] if `store` has no slots
    pub fn start(&mut self, store: Arc<FrameStore>, metadata: FrameMetadata, rate: f64) -> Result<()> {
        let rate = validate_rate(rate)?;
        if store.size() == 0 {
            return Err(Error::EmptyBatch);
        }

        self.stop();
        self.rate_bits.store(rate.to_bits(), Ordering::Release);

        let cancel = CancellationToken::new();
        let state = Arc::new(RunState::default());
        self.last = state.clone();
        self.running = Some(Run {
            cancel: cancel.clone(),
            state: state.clone(),
        });

        tracing::info!(frames = store.size(), rate, "Playback started");
        tokio::spawn(run_ticks(
            store,
            metadata,
            self.renderer.clone(),
            self.rate_bits.clone(),
            state,
            cancel,
        ));
        Ok(())
    }

    /// Stop playback. A tick already rendering finishes; no further tick runs.
    pub fn stop(&mut self) {
        if let Some(run) = self.running.take() {
            run.cancel.cancel();
            tracing::info!(
                ticks = run.state.ticks.load(Ordering::Acquire),
                "Playback stopped"
            );
        }
    }

    /// Change the rate. Takes effect when the next tick is scheduled; the tick
    /// currently pending keeps its original deadline.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidRate`] if `rate` is not a positive, finite number.
    pub fn set_rate(&self, rate: f64) -> Result<()> {
        let rate = validate_rate(rate)?;
        self.rate_bits.store(rate.to_bits(), Ordering::Release);
        tracing::debug!(rate, "Playback rate changed");
        Ok(())
    }

    /// Current rate in frames per second.
    pub fn rate(&self) -> f64 {
        f64::from_bits(self.rate_bits.load(Ordering::Acquire))
    }

    /// Delay between ticks at the current rate.
    pub fn period(&self) -> Duration {
        period_for(self.rate())
    }

    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }

    /// Index of the frame the next tick will render.
    pub fn current_index(&self) -> usize {
        self.last.index.load(Ordering::Acquire)
    }

    /// Ticks completed since the last `start`.
    pub fn ticks(&self) -> u64 {
        self.last.ticks.load(Ordering::Acquire)
    }

    /// Shared handle to the renderer.
    pub fn renderer(&self) -> Arc<Mutex<R>> {
        self.renderer.clone()
    }
}

impl<R: Renderer> Drop for PlaybackScheduler<R> {
    fn drop(&mut self) {
        self.stop();
    }
}

/// `1 / rate` seconds, saturating for vanishingly small rates.
pub fn period_for(rate: f64) -> Duration {
    Duration::try_from_secs_f64(1.0 / rate).unwrap_or(Duration::MAX)
}

async fn run_ticks<R: Renderer>(
    store: Arc<FrameStore>,
    metadata: FrameMetadata,
    renderer: Arc<Mutex<R>>,
    rate_bits: Arc<AtomicU64>,
    state: Arc<RunState>,
    cancel: CancellationToken,
) {
    let frame_count = store.size();

    loop {
        let period = period_for(f64::from_bits(rate_bits.load(Ordering::Acquire)));
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(period) => {}
        }

        let index = state.index.load(Ordering::Acquire);
        match store.get(index) {
            Ok(Some(frame)) => renderer.lock().render(frame.pixels(), &metadata),
            Ok(None) => tracing::warn!(index, "Frame missing from store; skipping render"),
            Err(e) => {
                tracing::error!("Playback aborted: {}", e);
                break;
            }
        }

        state.index.store((index + 1) % frame_count, Ordering::Release);
        state.ticks.fetch_add(1, Ordering::AcqRel);
        tracing::trace!(index, "Tick");
    }
}
