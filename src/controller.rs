//! Scanner controller
//!
//! Owns the configuration and drives one pipeline pass per [`tick`]:
//! poll the source, sample, decode, debounce, then notify the host sink.
//!
//! [`tick`]: ScannerController::tick

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError, Weak};
use std::time::{Duration, Instant};

use log::{debug, info, warn};

use crate::config::{DecodeMode, ScanConfiguration, ScannerSettings};
use crate::debounce::{Debouncer, Verdict};
use crate::decoder::DecodeEngine;
use crate::error::{ErrorKind, ScannerError};
use crate::models::{Detection, Frame, ScanResult, Symbology};
use crate::sampler::FrameSampler;
use crate::source::FrameSource;

/// Lifecycle state reported to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScannerStatus {
    /// Not scanning; the source is released
    Idle,
    /// Scanning normally
    Running,
    /// Scanning, but the last fault has not cleared yet
    Error,
}

impl ScannerStatus {
    /// Lowercase name used in host payloads
    pub fn as_str(self) -> &'static str {
        match self {
            ScannerStatus::Idle => "idle",
            ScannerStatus::Running => "running",
            ScannerStatus::Error => "error",
        }
    }

    fn is_active(self) -> bool {
        self != ScannerStatus::Idle
    }
}

impl fmt::Display for ScannerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Host-side receiver of scanner events.
///
/// Callbacks run on whichever thread completed the pipeline pass, with the
/// controller's state lock held. They must return quickly and must not call
/// back into the controller.
pub trait ScanEventSink: Send + Sync {
    /// A code was seen for the first time (or again after the cooldown)
    fn on_scan_result(&self, result: &ScanResult);

    /// A fault occurred, or the configuration needs attention
    fn on_error(&self, error: &ScannerError);

    /// The controller changed state
    fn on_status(&self, _status: ScannerStatus) {}
}

/// What one call to [`ScannerController::tick`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Controller is not running (or was stopped while decoding)
    Idle,
    /// The source had no new frame
    NoFrame,
    /// The sampler dropped the frame
    Dropped,
    /// A decode is still in flight; the frame was dropped
    Busy,
    /// Decoded inline
    Decoded {
        /// Detections found in the frame
        detections: usize,
        /// Results passed to the sink
        emitted: usize,
    },
    /// Decode handed to the background worker
    Dispatched,
    /// The pass failed with this error kind
    Fault(ErrorKind),
}

/// Mutable state guarded by one lock.
struct Core {
    config: ScanConfiguration,
    debouncer: Debouncer,
    sampler: FrameSampler,
    status: ScannerStatus,
    active_error: Option<ScannerError>,
    generation: u64,
    sink: Weak<dyn ScanEventSink>,
}

impl Core {
    fn set_status(&mut self, status: ScannerStatus) {
        if self.status == status {
            return;
        }
        info!("scanner {} -> {}", self.status, status);
        self.status = status;
        if let Some(sink) = self.sink.upgrade() {
            sink.on_status(status);
        }
    }

    fn notify_error(&self, error: &ScannerError) {
        if let Some(sink) = self.sink.upgrade() {
            sink.on_error(error);
        }
    }

    /// Report a fault once per occurrence.
    fn raise(&mut self, error: ScannerError) {
        if error.kind().is_informational() {
            warn!("{error}");
            self.notify_error(&error);
            return;
        }
        if self.active_error.as_ref().map(ScannerError::kind) == Some(error.kind()) {
            debug!("{} persists", error.kind());
            return;
        }
        warn!("{error}");
        self.notify_error(&error);
        if self.status.is_active() {
            self.active_error = Some(error);
            self.set_status(ScannerStatus::Error);
        }
    }

    /// Clear the active error if `cleared` says this pass proved it resolved.
    fn recover_if(&mut self, cleared: impl Fn(ErrorKind) -> bool) {
        let Some(kind) = self.active_error.as_ref().map(ScannerError::kind) else {
            return;
        };
        if cleared(kind) {
            info!("recovered from {kind}");
            self.active_error = None;
            self.set_status(ScannerStatus::Running);
        }
    }

    fn emit_new(&mut self, detections: Vec<Detection>) -> usize {
        let sink = self.sink.upgrade();
        let mut emitted = 0;
        for detection in detections {
            if self.debouncer.classify(&detection) == Verdict::Suppressed {
                continue;
            }
            let result = ScanResult::from(detection);
            info!("scanned {} {:?}", result.symbology, result.payload);
            if let Some(sink) = &sink {
                sink.on_scan_result(&result);
            }
            emitted += 1;
        }
        emitted
    }
}

struct Shared<S> {
    source: Mutex<S>,
    core: Mutex<Core>,
    engine: DecodeEngine,
    slot: Arc<DecodeSlot>,
    settings: ScannerSettings,
}

/// Busy flag for the single in-flight decode, with a wakeup for waiters.
#[derive(Default)]
struct DecodeSlot {
    busy: AtomicBool,
    lock: Mutex<()>,
    idle: Condvar,
}

impl DecodeSlot {
    fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    fn wait_idle(&self) {
        let mut guard = lock(&self.lock);
        while self.is_busy() {
            guard = self
                .idle
                .wait(guard)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }
}

/// Single in-flight decode token, released on drop.
struct InFlight {
    slot: Arc<DecodeSlot>,
}

impl InFlight {
    fn try_acquire(slot: &Arc<DecodeSlot>) -> Option<Self> {
        slot.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self {
                slot: Arc::clone(slot),
            })
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.slot.busy.store(false, Ordering::Release);
        // Taking the lock orders the store before any waiter's next check.
        let _guard = lock(&self.slot.lock);
        self.slot.idle.notify_all();
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Sampled frame ready for decoding.
struct Job {
    frame: Frame,
    symbologies: Vec<Symbology>,
    generation: u64,
}

impl<S: FrameSource> Shared<S> {
    fn decode(&self, job: Job, token: InFlight) -> TickOutcome {
        let started = Instant::now();
        let result = self.engine.decode(&job.frame, &job.symbologies);
        let elapsed = started.elapsed();
        self.finish(job, result, elapsed, token)
    }

    fn finish(
        &self,
        job: Job,
        result: Result<Vec<Detection>, ScannerError>,
        elapsed: Duration,
        _token: InFlight,
    ) -> TickOutcome {
        // The token outlives the state guard: once it is released every
        // event for this frame has been delivered.
        let mut core = lock(&self.core);
        if core.generation != job.generation || !core.status.is_active() {
            debug!("discarding decode of frame {} after stop", job.frame.sequence());
            return TickOutcome::Idle;
        }
        core.sampler.record_decode_time(elapsed);

        match result {
            Ok(detections) => {
                core.recover_if(|_| true);
                let found = detections.len();
                let emitted = core.emit_new(detections);
                debug!(
                    "frame {}: {found} detection(s), {emitted} new in {:?}",
                    job.frame.sequence(),
                    elapsed
                );
                TickOutcome::Decoded {
                    detections: found,
                    emitted,
                }
            }
            Err(error) => {
                let kind = error.kind();
                core.raise(error);
                TickOutcome::Fault(kind)
            }
        }
    }
}

/// Drives the scanning pipeline for one frame source.
///
/// The host calls [`tick`](Self::tick) from its frame loop. In
/// [`DecodeMode::Background`] the decode runs on the rayon pool and the tick
/// returns immediately; results still arrive through the sink.
pub struct ScannerController<S: FrameSource + 'static> {
    shared: Arc<Shared<S>>,
}

impl<S: FrameSource + 'static> ScannerController<S> {
    /// Controller with default settings and every built-in decoder.
    pub fn new<T: ScanEventSink + 'static>(source: S, sink: &Arc<T>) -> Self {
        Self::with_settings(source, sink, ScannerSettings::default())
    }

    /// Controller with custom settings.
    pub fn with_settings<T: ScanEventSink + 'static>(
        source: S,
        sink: &Arc<T>,
        settings: ScannerSettings,
    ) -> Self {
        let engine = DecodeEngine::new(&settings);
        Self::with_engine(source, sink, settings, engine)
    }

    /// Controller with a custom decode engine.
    pub fn with_engine<T: ScanEventSink + 'static>(
        source: S,
        sink: &Arc<T>,
        settings: ScannerSettings,
        engine: DecodeEngine,
    ) -> Self {
        let sink: Weak<T> = Arc::downgrade(sink);
        let sink: Weak<dyn ScanEventSink> = sink;
        let core = Core {
            config: ScanConfiguration::default(),
            debouncer: Debouncer::new(
                settings.cooldown(),
                settings.retention(),
                settings.debounce_key(),
            ),
            sampler: FrameSampler::new(
                settings.min_decode_interval(),
                settings.max_decode_interval(),
            ),
            status: ScannerStatus::Idle,
            active_error: None,
            generation: 0,
            sink,
        };
        Self {
            shared: Arc::new(Shared {
                source: Mutex::new(source),
                core: Mutex::new(core),
                engine,
                slot: Arc::new(DecodeSlot::default()),
                settings,
            }),
        }
    }

    /// Acquire the source and begin scanning.
    ///
    /// A source failure is reported to the sink and returned; the controller
    /// stays idle. Does nothing when already running.
    pub fn start(&self) -> Result<(), ScannerError> {
        let mut source = lock(&self.shared.source);
        let mut core = lock(&self.shared.core);
        if core.status.is_active() {
            return Ok(());
        }

        if let Err(err) = source.acquire() {
            let error = ScannerError::from(err);
            warn!("start failed: {error}");
            core.notify_error(&error);
            return Err(error);
        }

        core.generation += 1;
        core.active_error = None;
        core.set_status(ScannerStatus::Running);
        if core.config.illumination() {
            if let Err(err) = source.set_illumination(true) {
                core.raise(err.into());
            }
        }
        Ok(())
    }

    /// Stop scanning and release the source.
    ///
    /// In-flight work is discarded: once this returns, the sink receives
    /// nothing more until the next `start()`.
    pub fn stop(&self) {
        let mut source = lock(&self.shared.source);
        let mut core = lock(&self.shared.core);
        if !core.status.is_active() {
            return;
        }
        core.generation += 1;
        core.debouncer.reset();
        core.sampler.reset();
        core.active_error = None;
        source.release();
        core.set_status(ScannerStatus::Idle);
    }

    /// Replace the configuration. Takes effect from the next tick.
    ///
    /// The torch follows the new illumination flag immediately while
    /// scanning. An empty symbology set is reported as
    /// [`ErrorKind::InvalidConfiguration`] but still applied.
    pub fn update_configuration(&self, config: ScanConfiguration) {
        let mut source = lock(&self.shared.source);
        let mut core = lock(&self.shared.core);

        if config.is_empty() {
            core.raise(ScannerError::new(
                ErrorKind::InvalidConfiguration,
                "no symbologies enabled; nothing will be detected",
            ));
        }
        let illumination_changed = core.config.illumination() != config.illumination();
        debug!(
            "configuration: {:?}, illumination {}",
            config.symbologies(),
            config.illumination()
        );
        core.config = config;

        if illumination_changed && core.status.is_active() {
            if let Err(err) = source.set_illumination(core.config.illumination()) {
                core.raise(err.into());
            }
        }
    }

    /// Run one pipeline pass.
    pub fn tick(&self) -> TickOutcome {
        let (job, token) = match self.prepare() {
            Ok(ready) => ready,
            Err(outcome) => return outcome,
        };

        match self.shared.settings.decode_mode() {
            DecodeMode::Inline => self.shared.decode(job, token),
            DecodeMode::Background => {
                let shared = Arc::clone(&self.shared);
                rayon::spawn(move || {
                    shared.decode(job, token);
                });
                TickOutcome::Dispatched
            }
        }
    }

    /// Poll and sample; returns the job to decode or the outcome of an early exit.
    fn prepare(&self) -> Result<(Job, InFlight), TickOutcome> {
        let mut source = lock(&self.shared.source);
        let generation = {
            let core = lock(&self.shared.core);
            if !core.status.is_active() {
                return Err(TickOutcome::Idle);
            }
            core.generation
        };
        let polled = source.next_frame();
        drop(source);

        let mut core = lock(&self.shared.core);
        if core.generation != generation {
            return Err(TickOutcome::Idle);
        }
        let frame = match polled {
            Err(err) => {
                let error = ScannerError::from(err);
                let kind = error.kind();
                core.raise(error);
                return Err(TickOutcome::Fault(kind));
            }
            Ok(polled) => {
                core.recover_if(|kind| kind == ErrorKind::CameraUnavailable);
                polled.ok_or(TickOutcome::NoFrame)?
            }
        };

        // Only a frame that will really be decoded may claim the sampler slot.
        let Some(token) = InFlight::try_acquire(&self.shared.slot) else {
            debug!("decode in flight, dropping frame {}", frame.sequence());
            return Err(TickOutcome::Busy);
        };
        let Some(frame) = core.sampler.offer(frame) else {
            return Err(TickOutcome::Dropped);
        };
        let job = Job {
            frame,
            symbologies: core.config.symbologies().to_vec(),
            generation,
        };
        Ok((job, token))
    }

    /// Block until no decode is in flight.
    ///
    /// Returns once every event of the last decode has been delivered.
    pub fn wait_for_decode(&self) {
        self.shared.slot.wait_idle();
    }

    /// True while a decode is running
    pub fn is_decoding(&self) -> bool {
        self.shared.slot.is_busy()
    }

    /// Current lifecycle state
    pub fn status(&self) -> ScannerStatus {
        lock(&self.shared.core).status
    }

    /// Active configuration
    pub fn configuration(&self) -> ScanConfiguration {
        lock(&self.shared.core).config.clone()
    }

    /// The unresolved fault, if any
    pub fn active_error(&self) -> Option<ScannerError> {
        lock(&self.shared.core).active_error.clone()
    }

    /// Tunables this controller was built with
    pub fn settings(&self) -> &ScannerSettings {
        &self.shared.settings
    }

    /// Current sampler interval (widens under load)
    pub fn decode_interval(&self) -> Duration {
        lock(&self.shared.core).sampler.interval()
    }

    /// Run `f` with exclusive access to the frame source.
    pub fn with_source<R>(&self, f: impl FnOnce(&mut S) -> R) -> R {
        f(&mut lock(&self.shared.source))
    }
}

impl<S: FrameSource + 'static> Drop for ScannerController<S> {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PixelFormat;
    use crate::source::FrameSequence;

    #[derive(Default)]
    struct Recorder {
        results: Mutex<Vec<String>>,
        errors: Mutex<Vec<ErrorKind>>,
        statuses: Mutex<Vec<ScannerStatus>>,
    }

    impl ScanEventSink for Recorder {
        fn on_scan_result(&self, result: &ScanResult) {
            self.results.lock().unwrap().push(result.payload.clone());
        }

        fn on_error(&self, error: &ScannerError) {
            self.errors.lock().unwrap().push(error.kind());
        }

        fn on_status(&self, status: ScannerStatus) {
            self.statuses.lock().unwrap().push(status);
        }
    }

    fn blank_frames(count: u64) -> Vec<Frame> {
        (0..count)
            .map(|i| {
                Frame::new(
                    vec![255u8; 32 * 32],
                    32,
                    32,
                    PixelFormat::Luma8,
                    Duration::from_millis(i * 100),
                    i,
                )
            })
            .collect()
    }

    #[test]
    fn test_tick_while_idle() {
        let sink = Arc::new(Recorder::default());
        let controller = ScannerController::new(FrameSequence::new(blank_frames(1)), &sink);
        assert_eq!(controller.tick(), TickOutcome::Idle);
        assert_eq!(controller.status(), ScannerStatus::Idle);
    }

    #[test]
    fn test_start_stop_statuses() {
        let sink = Arc::new(Recorder::default());
        let controller = ScannerController::new(FrameSequence::new(blank_frames(2)), &sink);
        controller.start().unwrap();
        controller.start().unwrap();
        assert!(controller.with_source(|s| s.is_acquired()));
        assert_eq!(
            controller.tick(),
            TickOutcome::Decoded { detections: 0, emitted: 0 }
        );
        controller.stop();
        controller.stop();
        assert!(!controller.with_source(|s| s.is_acquired()));
        assert_eq!(
            *sink.statuses.lock().unwrap(),
            vec![ScannerStatus::Running, ScannerStatus::Idle]
        );
        assert!(sink.results.lock().unwrap().is_empty());
    }

    #[test]
    fn test_exhausted_source_reports_no_frame() {
        let sink = Arc::new(Recorder::default());
        let controller = ScannerController::new(FrameSequence::new(vec![]), &sink);
        controller.start().unwrap();
        assert_eq!(controller.tick(), TickOutcome::NoFrame);
    }

    #[test]
    fn test_permission_denied_stays_idle() {
        let sink = Arc::new(Recorder::default());
        let controller =
            ScannerController::new(FrameSequence::new(vec![]).deny_permission(), &sink);
        let err = controller.start().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PermissionDenied);
        assert_eq!(controller.status(), ScannerStatus::Idle);
        assert_eq!(*sink.errors.lock().unwrap(), vec![ErrorKind::PermissionDenied]);
        assert!(sink.statuses.lock().unwrap().is_empty());
    }

    #[test]
    fn test_dropped_sink_discards_events() {
        let sink = Arc::new(Recorder::default());
        let controller = ScannerController::new(FrameSequence::new(blank_frames(2)), &sink);
        drop(sink);
        controller.start().unwrap();
        assert!(matches!(controller.tick(), TickOutcome::Decoded { .. }));
    }

    #[test]
    fn test_in_flight_token() {
        let slot = Arc::new(DecodeSlot::default());
        let first = InFlight::try_acquire(&slot).unwrap();
        assert!(InFlight::try_acquire(&slot).is_none());
        assert!(slot.is_busy());
        drop(first);
        assert!(!slot.is_busy());
        assert!(InFlight::try_acquire(&slot).is_some());
    }

    #[test]
    fn test_wait_idle_wakes_on_release() {
        let slot = Arc::new(DecodeSlot::default());
        let token = InFlight::try_acquire(&slot).unwrap();
        let releaser = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(30));
            drop(token);
        });
        slot.wait_idle();
        assert!(!slot.is_busy());
        releaser.join().unwrap();

        // Returns at once when nothing is in flight.
        slot.wait_idle();
    }

    #[test]
    fn test_status_strings() {
        assert_eq!(ScannerStatus::Running.to_string(), "running");
        assert_eq!(ScannerStatus::Error.as_str(), "error");
    }
}
