// THEORY:
// The `monitor` owns everything that happens off the presentation thread: the
// capture device, the per-frame classification loop, and the handoff of results
// back to whoever is drawing them.
//
// Key architectural principles:
// 1.  **Two-State Machine**: A `MotionMonitor` is either Stopped or Running.
//     `start` and `stop` are guarded transitions. Starting a running monitor and
//     stopping a stopped one are both no-ops.
// 2.  **One Worker, Sequential Frames**: A running monitor has exactly one
//     capture loop on a blocking worker. Each frame depends on the previous
//     one's smoothed image, so frames are never classified concurrently.
// 3.  **Cooperative Stop**: The loop checks a `watch` flag once per iteration.
//     Stopping takes at most one frame cycle.
// 4.  **Last-Value Handoff**: Results go out through a `watch` channel. Sending
//     never blocks and a slow reader only ever sees the newest frame.
// 5.  **Scoped Device**: The loop owns the device through a guard that releases
//     it exactly once, on stop, on end of stream, or while unwinding. A loop
//     that unwinds still publishes `Stopped` after the release.
// 6.  **Blocking Work Off the Caller**: Opening the device runs on the blocking
//     pool too, so a slow driver never stalls a single-threaded runtime.

use crate::annotate::annotate;
use crate::classifier::{Classification, ClassifierState, classify};
use crate::config::MonitorConfig;
use crate::core_modules::direction::DirectionLabel;
use crate::core_modules::region::MotionRegion;
use crate::error::{CompassError, Result};
use crate::status::StatusLine;
use image::RgbImage;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// A source of color frames, exclusively owned by the capture loop.
pub trait FrameSource: Send {
    /// Native (width, height) of the opened stream.
    fn resolution(&self) -> Result<(u32, u32)>;

    /// Reads the next frame. `Ok(None)` is an empty frame: the cycle is
    /// skipped and nothing is reported.
    fn read_frame(&mut self) -> Result<Option<RgbImage>>;

    /// Releases the underlying device. Called exactly once by the loop.
    fn release(&mut self) -> Result<()>;
}

/// Opens a `FrameSource` for a device index. Called on the blocking pool.
pub trait SourceOpener: Send + Sync + 'static {
    type Source: FrameSource + 'static;

    fn open(&self, device_index: u32) -> Result<Self::Source>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorState {
    Stopped,
    Running,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    Started,
    AlreadyRunning,
}

/// One processed frame, ready to be drawn.
#[derive(Debug, Clone)]
pub struct FrameUpdate {
    /// Counts published frames since the loop started, from 1.
    pub sequence: u64,
    /// The color frame with every qualifying region outlined.
    pub frame: Arc<RgbImage>,
    pub direction: DirectionLabel,
    pub region: Option<MotionRegion>,
    /// Sticky label text; unchanged by frames without motion.
    pub status: &'static str,
}

/// The single value held by the handoff channel.
#[derive(Debug, Clone, Default)]
pub enum MonitorEvent {
    #[default]
    Idle,
    Frame(FrameUpdate),
    Stopped,
    DeviceUnavailable(String),
}

/// Why a capture loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoopExit {
    StopRequested,
    TooManyFailures,
}

#[derive(Debug, Clone)]
struct LoopReport {
    exit: LoopExit,
    frames_published: u64,
    frames_skipped: u64,
    status: StatusLine,
}

// ----------------------------------------------------------------------------
// Device guard
// ----------------------------------------------------------------------------

struct ReleaseOnDrop<S: FrameSource> {
    source: S,
    released: bool,
}

impl<S: FrameSource> ReleaseOnDrop<S> {
    fn new(source: S) -> Self {
        Self {
            source,
            released: false,
        }
    }

    fn source(&self) -> &S {
        &self.source
    }

    fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }

    fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        match self.source.release() {
            Ok(()) => log::debug!("capture device released"),
            Err(err) => log::warn!("capture device release failed: {err}"),
        }
    }
}

impl<S: FrameSource> Drop for ReleaseOnDrop<S> {
    fn drop(&mut self) {
        self.release();
    }
}

// ----------------------------------------------------------------------------
// Capture loop
// ----------------------------------------------------------------------------

/// A dropped sender counts as a stop request.
fn stop_requested(stop_rx: &watch::Receiver<bool>) -> bool {
    *stop_rx.borrow() || stop_rx.has_changed().is_err()
}

struct CaptureLoop<S: FrameSource> {
    device: ReleaseOnDrop<S>,
    config: MonitorConfig,
    reported_width: Option<u32>,
    stop_rx: watch::Receiver<bool>,
    events: Arc<watch::Sender<MonitorEvent>>,
    status: StatusLine,
    state: Option<ClassifierState>,
    published: u64,
}

impl<S: FrameSource> CaptureLoop<S> {
    fn run(mut self) -> LoopReport {
        let index = self.config.device_index;
        self.reported_width = match self.device.source().resolution() {
            Ok((width, height)) => {
                log::info!("capture device {index} opened at {width}x{height}");
                Some(width).filter(|w| *w > 0)
            }
            Err(err) => {
                log::warn!("capture device {index} did not report its resolution: {err}");
                None
            }
        };

        let mut skipped = 0u64;
        let mut failures = 0u32;

        let exit = loop {
            if stop_requested(&self.stop_rx) {
                break LoopExit::StopRequested;
            }
            let started = Instant::now();

            match self.device.source_mut().read_frame() {
                Ok(Some(frame)) => {
                    failures = 0;
                    if !self.process_frame(frame) {
                        skipped += 1;
                    }
                }
                Ok(None) => {
                    skipped += 1;
                    log::trace!("empty frame, skipping");
                }
                Err(err) => {
                    skipped += 1;
                    failures += 1;
                    log::debug!("frame read failed ({failures} in a row): {err}");
                    if failures >= self.config.max_consecutive_failures {
                        log::warn!("giving up after {failures} consecutive read failures");
                        break LoopExit::TooManyFailures;
                    }
                }
            }

            if let Some(interval) = self.config.frame_interval {
                let elapsed = started.elapsed();
                if elapsed < interval {
                    std::thread::sleep(interval - elapsed);
                }
            }
        };

        self.device.release();
        if exit != LoopExit::StopRequested {
            self.status.mark_stopped();
            self.events.send_replace(MonitorEvent::Stopped);
        }

        LoopReport {
            exit,
            frames_published: self.published,
            frames_skipped: skipped,
            status: self.status,
        }
    }

    /// Classifies, annotates and publishes one frame. Returns false when the
    /// frame was skipped.
    fn process_frame(&mut self, mut frame: RgbImage) -> bool {
        let config = &self.config.classifier;
        let width = self.reported_width.unwrap_or(frame.width());

        let outcome = self
            .state
            .as_ref()
            .map(|previous| classify(previous, &frame, width, config));

        let classification = match outcome {
            Some(Ok((classification, next))) => {
                self.state = Some(next);
                classification
            }
            Some(Err(CompassError::FrameMismatch { previous, current })) => {
                log::warn!("frame size changed from {previous:?} to {current:?}, re-priming");
                if !self.prime(&frame) {
                    return false;
                }
                Classification::default()
            }
            Some(Err(err)) => {
                log::debug!("skipping frame: {err}");
                return false;
            }
            None => {
                if !self.prime(&frame) {
                    return false;
                }
                Classification::default()
            }
        };

        annotate(&mut frame, &classification.regions);
        if self.status.apply(classification.direction) {
            log::info!("motion moved {}", classification.direction);
        }

        self.published += 1;
        self.events.send_replace(MonitorEvent::Frame(FrameUpdate {
            sequence: self.published,
            frame: Arc::new(frame),
            direction: classification.direction,
            region: classification.region,
            status: self.status.text(),
        }));
        true
    }

    fn prime(&mut self, frame: &RgbImage) -> bool {
        match ClassifierState::prime(frame, &self.config.classifier) {
            Ok(state) => {
                self.state = Some(state);
                true
            }
            Err(err) => {
                log::debug!("cannot prime classifier: {err}");
                false
            }
        }
    }
}

impl<S: FrameSource> Drop for CaptureLoop<S> {
    fn drop(&mut self) {
        self.device.release();
        if std::thread::panicking() {
            log::error!("capture loop panicked, device released");
            self.status.mark_stopped();
            self.events.send_replace(MonitorEvent::Stopped);
        }
    }
}

// ----------------------------------------------------------------------------
// Monitor
// ----------------------------------------------------------------------------

struct Worker {
    stop_tx: watch::Sender<bool>,
    handle: JoinHandle<LoopReport>,
}

enum RunState {
    Stopped,
    Running(Worker),
}

/// Start/Stop control over one background capture loop.
pub struct MotionMonitor<O: SourceOpener> {
    opener: Arc<O>,
    config: MonitorConfig,
    events: Arc<watch::Sender<MonitorEvent>>,
    status: StatusLine,
    run: RunState,
}

impl<O: SourceOpener> MotionMonitor<O> {
    pub fn new(opener: O, config: MonitorConfig) -> Self {
        let (events, _) = watch::channel(MonitorEvent::Idle);
        Self {
            opener: Arc::new(opener),
            config,
            events: Arc::new(events),
            status: StatusLine::new(),
            run: RunState::Stopped,
        }
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    /// A receiver of the newest `MonitorEvent`.
    pub fn subscribe(&self) -> watch::Receiver<MonitorEvent> {
        self.events.subscribe()
    }

    pub fn state(&self) -> MonitorState {
        match &self.run {
            RunState::Running(worker) if !worker.handle.is_finished() => MonitorState::Running,
            _ => MonitorState::Stopped,
        }
    }

    pub fn is_running(&self) -> bool {
        self.state() == MonitorState::Running
    }

    /// Status text as of the last transition. While running, the live text
    /// travels with each `FrameUpdate`.
    pub fn status_text(&self) -> &'static str {
        self.status.text()
    }

    /// Opens the device and starts the capture loop. Must be called from
    /// within a tokio runtime.
    pub async fn start(&mut self) -> Result<StartOutcome> {
        self.reap_finished().await;
        if matches!(self.run, RunState::Running(_)) {
            log::debug!("start ignored: already running");
            return Ok(StartOutcome::AlreadyRunning);
        }
        self.config.validate()?;

        let index = self.config.device_index;
        let opener = Arc::clone(&self.opener);
        let opened = tokio::task::spawn_blocking(move || opener.open(index))
            .await
            .unwrap_or_else(|err| {
                Err(CompassError::device_unavailable(index, format!("opener panicked: {err}")))
            });
        let source = match opened {
            Ok(source) => source,
            Err(err) => {
                log::error!("failed to open capture device {index}: {err}");
                let err = match err {
                    err @ CompassError::DeviceUnavailable { .. } => err,
                    other => CompassError::device_unavailable(index, other.to_string()),
                };
                self.status.mark_device_unavailable();
                self.events
                    .send_replace(MonitorEvent::DeviceUnavailable(err.to_string()));
                return Err(err);
            }
        };

        let (stop_tx, stop_rx) = watch::channel(false);
        let capture = CaptureLoop {
            device: ReleaseOnDrop::new(source),
            config: self.config.clone(),
            reported_width: None,
            stop_rx,
            events: Arc::clone(&self.events),
            status: self.status,
            state: None,
            published: 0,
        };
        let handle = tokio::task::spawn_blocking(move || capture.run());

        self.run = RunState::Running(Worker { stop_tx, handle });
        Ok(StartOutcome::Started)
    }

    /// Signals the loop, waits for it to release the device and publishes
    /// `Stopped`. Does nothing when already stopped. A loop that panicked is
    /// logged and treated as stopped.
    pub async fn stop(&mut self) -> Result<()> {
        let worker = match std::mem::replace(&mut self.run, RunState::Stopped) {
            RunState::Stopped => {
                log::debug!("stop ignored: not running");
                return Ok(());
            }
            RunState::Running(worker) => worker,
        };

        worker.stop_tx.send_replace(true);
        if let Err(err) = self.finish(worker.handle).await {
            log::warn!("capture loop ended badly: {err}");
        }
        self.status.mark_stopped();
        self.events.send_replace(MonitorEvent::Stopped);
        log::info!("motion monitor stopped");
        Ok(())
    }

    /// Collects a loop that ended on its own.
    async fn reap_finished(&mut self) {
        let finished = matches!(&self.run, RunState::Running(worker) if worker.handle.is_finished());
        if !finished {
            return;
        }
        if let RunState::Running(worker) = std::mem::replace(&mut self.run, RunState::Stopped) {
            if let Err(err) = self.finish(worker.handle).await {
                log::warn!("previous capture loop ended badly: {err}");
            }
            self.status.mark_stopped();
        }
    }

    async fn finish(&mut self, handle: JoinHandle<LoopReport>) -> Result<()> {
        match handle.await {
            Ok(report) => {
                log::info!(
                    "capture loop ended ({:?}): {} frame(s) published, {} skipped",
                    report.exit,
                    report.frames_published,
                    report.frames_skipped
                );
                self.status = report.status;
                Ok(())
            }
            Err(err) => {
                log::error!("capture loop did not finish cleanly: {err}");
                self.status.mark_stopped();
                self.events.send_replace(MonitorEvent::Stopped);
                Err(CompassError::WorkerPanicked)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::{DEVICE_UNAVAILABLE_TEXT, STOPPED_TEXT, WAITING_TEXT};
    use image::Rgb;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    const WAIT: Duration = Duration::from_secs(10);

    #[derive(Clone)]
    enum Step {
        Frame(RgbImage),
        Empty,
        Fail,
        Panic,
    }

    struct ScriptedSource {
        steps: VecDeque<Step>,
        after_script: Step,
        width: u32,
        height: u32,
        releases: Arc<AtomicUsize>,
    }

    impl FrameSource for ScriptedSource {
        fn resolution(&self) -> Result<(u32, u32)> {
            Ok((self.width, self.height))
        }

        fn read_frame(&mut self) -> Result<Option<RgbImage>> {
            let step = match self.steps.pop_front() {
                Some(step) => step,
                None => {
                    std::thread::sleep(Duration::from_millis(2));
                    self.after_script.clone()
                }
            };
            match step {
                Step::Frame(frame) => Ok(Some(frame)),
                Step::Empty => Ok(None),
                Step::Fail => Err(CompassError::capture("scripted failure")),
                Step::Panic => panic!("device driver fault"),
            }
        }

        fn release(&mut self) -> Result<()> {
            self.releases.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct ScriptedOpener {
        steps: Vec<Step>,
        after_script: Step,
        available: bool,
        opens: Arc<AtomicUsize>,
        releases: Arc<AtomicUsize>,
    }

    impl ScriptedOpener {
        fn new(steps: Vec<Step>) -> Self {
            Self {
                steps,
                after_script: Step::Empty,
                available: true,
                opens: Arc::new(AtomicUsize::new(0)),
                releases: Arc::new(AtomicUsize::new(0)),
            }
        }
    }

    impl SourceOpener for ScriptedOpener {
        type Source = ScriptedSource;

        fn open(&self, device_index: u32) -> Result<ScriptedSource> {
            if !self.available {
                return Err(CompassError::device_unavailable(device_index, "no such device"));
            }
            self.opens.fetch_add(1, Ordering::SeqCst);
            Ok(ScriptedSource {
                steps: self.steps.iter().cloned().collect(),
                after_script: self.after_script.clone(),
                width: 300,
                height: 200,
                releases: Arc::clone(&self.releases),
            })
        }
    }

    fn background() -> RgbImage {
        RgbImage::new(300, 200)
    }

    fn square_at(x0: u32) -> RgbImage {
        square_on(background(), x0)
    }

    fn square_on(mut frame: RgbImage, x0: u32) -> RgbImage {
        for y in 75..125 {
            for x in x0..x0 + 50 {
                frame.put_pixel(x, y, Rgb([255, 255, 255]));
            }
        }
        frame
    }

    async fn wait_for_sequence(rx: &mut watch::Receiver<MonitorEvent>, sequence: u64) -> FrameUpdate {
        let event = tokio::time::timeout(
            WAIT,
            rx.wait_for(|e| matches!(e, MonitorEvent::Frame(u) if u.sequence == sequence)),
        )
        .await
        .expect("timed out waiting for frame")
        .expect("monitor dropped")
        .clone();
        match event {
            MonitorEvent::Frame(update) => update,
            other => panic!("unexpected event {other:?}"),
        }
    }

    async fn wait_for_direction(
        rx: &mut watch::Receiver<MonitorEvent>,
        direction: DirectionLabel,
    ) -> FrameUpdate {
        let event = tokio::time::timeout(
            WAIT,
            rx.wait_for(|e| matches!(e, MonitorEvent::Frame(u) if u.direction == direction)),
        )
        .await
        .expect("timed out waiting for frame")
        .expect("monitor dropped")
        .clone();
        match event {
            MonitorEvent::Frame(update) => update,
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[tokio::test]
    async fn double_start_runs_one_loop_and_double_stop_releases_once() {
        let opener = ScriptedOpener::new(vec![Step::Frame(background())]);
        let opens = Arc::clone(&opener.opens);
        let releases = Arc::clone(&opener.releases);
        let mut monitor = MotionMonitor::new(opener, MonitorConfig::default());

        assert_eq!(monitor.start().await.unwrap(), StartOutcome::Started);
        assert_eq!(monitor.start().await.unwrap(), StartOutcome::AlreadyRunning);
        assert_eq!(opens.load(Ordering::SeqCst), 1);
        assert!(monitor.is_running());

        monitor.stop().await.unwrap();
        monitor.stop().await.unwrap();
        assert_eq!(releases.load(Ordering::SeqCst), 1);
        assert_eq!(monitor.state(), MonitorState::Stopped);
        assert!(matches!(*monitor.subscribe().borrow(), MonitorEvent::Stopped));
    }

    #[tokio::test]
    async fn stop_before_start_is_a_no_op() {
        let opener = ScriptedOpener::new(vec![]);
        let releases = Arc::clone(&opener.releases);
        let mut monitor = MotionMonitor::new(opener, MonitorConfig::default());

        monitor.stop().await.unwrap();
        assert_eq!(releases.load(Ordering::SeqCst), 0);
        assert_eq!(monitor.status_text(), WAITING_TEXT);
        assert!(matches!(*monitor.subscribe().borrow(), MonitorEvent::Idle));
    }

    #[tokio::test]
    async fn device_unavailable_leaves_monitor_stopped() {
        let mut opener = ScriptedOpener::new(vec![]);
        opener.available = false;
        let mut monitor = MotionMonitor::new(opener, MonitorConfig::default());
        let rx = monitor.subscribe();

        let err = monitor.start().await.unwrap_err();
        assert!(matches!(err, CompassError::DeviceUnavailable { index: 0, .. }));
        assert_eq!(monitor.state(), MonitorState::Stopped);
        assert_eq!(monitor.status_text(), DEVICE_UNAVAILABLE_TEXT);
        assert!(matches!(*rx.borrow(), MonitorEvent::DeviceUnavailable(_)));
    }

    #[tokio::test]
    async fn square_on_the_left_is_reported_left() {
        let opener = ScriptedOpener::new(vec![
            Step::Frame(background()),
            Step::Empty,
            Step::Empty,
            Step::Frame(square_at(10)),
        ]);
        let mut monitor = MotionMonitor::new(opener, MonitorConfig::default());
        let mut rx = monitor.subscribe();
        monitor.start().await.unwrap();

        let update = wait_for_direction(&mut rx, DirectionLabel::Left).await;
        // Priming frame plus the moved frame; empty frames publish nothing.
        assert_eq!(update.sequence, 2);
        assert_eq!(update.status, "You are on LEFT");
        let region = update.region.expect("motion region");
        assert!((30..=40).contains(&region.centroid_x()));
        assert_eq!(*update.frame.get_pixel(region.x, region.y), Rgb([0, 255, 0]));

        monitor.stop().await.unwrap();
    }

    #[tokio::test]
    async fn label_sticks_through_still_frames() {
        let opener = ScriptedOpener::new(vec![
            Step::Frame(background()),
            Step::Frame(square_at(230)),
            Step::Frame(square_at(230)),
        ]);
        let mut monitor = MotionMonitor::new(opener, MonitorConfig::default());
        let mut rx = monitor.subscribe();
        monitor.start().await.unwrap();

        let still = tokio::time::timeout(
            WAIT,
            rx.wait_for(|e| matches!(e, MonitorEvent::Frame(u) if u.sequence == 3)),
        )
        .await
        .unwrap()
        .unwrap()
        .clone();
        match still {
            MonitorEvent::Frame(update) => {
                assert_eq!(update.direction, DirectionLabel::None);
                assert!(update.region.is_none());
                assert_eq!(update.status, "You are on RIGHT");
            }
            other => panic!("unexpected event {other:?}"),
        }

        monitor.stop().await.unwrap();
        assert_eq!(monitor.status_text(), STOPPED_TEXT);
    }

    #[tokio::test]
    async fn stop_text_survives_restart_until_motion() {
        let opener = ScriptedOpener::new(vec![Step::Frame(background())]);
        let mut monitor = MotionMonitor::new(opener, MonitorConfig::default());
        let mut rx = monitor.subscribe();

        monitor.start().await.unwrap();
        monitor.stop().await.unwrap();
        assert!(matches!(*rx.borrow_and_update(), MonitorEvent::Stopped));

        monitor.start().await.unwrap();
        let primed = tokio::time::timeout(
            WAIT,
            rx.wait_for(|e| matches!(e, MonitorEvent::Frame(u) if u.sequence == 1)),
        )
        .await
        .unwrap()
        .unwrap()
        .clone();
        match primed {
            MonitorEvent::Frame(update) => assert_eq!(update.status, STOPPED_TEXT),
            other => panic!("unexpected event {other:?}"),
        }
        monitor.stop().await.unwrap();
    }

    #[tokio::test]
    async fn loop_gives_up_after_repeated_failures_and_can_restart() {
        let mut opener = ScriptedOpener::new(vec![Step::Frame(background())]);
        opener.after_script = Step::Fail;
        let opens = Arc::clone(&opener.opens);
        let releases = Arc::clone(&opener.releases);
        let config = MonitorConfig {
            max_consecutive_failures: 3,
            ..MonitorConfig::default()
        };
        let mut monitor = MotionMonitor::new(opener, config);
        let mut rx = monitor.subscribe();

        monitor.start().await.unwrap();
        tokio::time::timeout(WAIT, rx.wait_for(|e| matches!(e, MonitorEvent::Stopped)))
            .await
            .unwrap()
            .unwrap();
        tokio::time::timeout(WAIT, async {
            while monitor.is_running() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();
        assert_eq!(releases.load(Ordering::SeqCst), 1);

        assert_eq!(monitor.start().await.unwrap(), StartOutcome::Started);
        assert_eq!(opens.load(Ordering::SeqCst), 2);
        monitor.stop().await.unwrap();
        assert_eq!(releases.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn panicking_device_is_released_and_reported_stopped() {
        let opener = ScriptedOpener::new(vec![
            Step::Frame(background()),
            Step::Frame(square_at(10)),
            Step::Panic,
        ]);
        let releases = Arc::clone(&opener.releases);
        let opens = Arc::clone(&opener.opens);
        let mut monitor = MotionMonitor::new(opener, MonitorConfig::default());
        let mut rx = monitor.subscribe();

        monitor.start().await.unwrap();
        tokio::time::timeout(WAIT, rx.wait_for(|e| matches!(e, MonitorEvent::Stopped)))
            .await
            .expect("no stopped event after panic")
            .unwrap();
        assert_eq!(releases.load(Ordering::SeqCst), 1);

        tokio::time::timeout(WAIT, async {
            while monitor.is_running() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();

        monitor.stop().await.unwrap();
        assert_eq!(monitor.status_text(), STOPPED_TEXT);
        assert!(matches!(*rx.borrow(), MonitorEvent::Stopped));

        assert_eq!(monitor.start().await.unwrap(), StartOutcome::Started);
        assert_eq!(opens.load(Ordering::SeqCst), 2);
        monitor.stop().await.unwrap();
    }

    #[tokio::test]
    async fn resolution_change_reprimes_and_keeps_publishing() {
        let larger = || RgbImage::new(320, 240);
        let opener = ScriptedOpener::new(vec![
            Step::Frame(background()),
            Step::Frame(larger()),
            Step::Frame(square_on(larger(), 10)),
        ]);
        let mut monitor = MotionMonitor::new(opener, MonitorConfig::default());
        let mut rx = monitor.subscribe();
        monitor.start().await.unwrap();

        let update = wait_for_sequence(&mut rx, 3).await;
        assert_eq!(update.frame.dimensions(), (320, 240));
        assert_eq!(update.direction, DirectionLabel::Left);
        assert!(update.region.is_some());

        monitor.stop().await.unwrap();
    }

    #[tokio::test]
    async fn frame_interval_spaces_out_reads() {
        let opener = ScriptedOpener::new(vec![
            Step::Frame(background()),
            Step::Frame(background()),
            Step::Frame(background()),
        ]);
        let config = MonitorConfig {
            frame_interval: Some(Duration::from_millis(40)),
            ..MonitorConfig::default()
        };
        let mut monitor = MotionMonitor::new(opener, config);
        let mut rx = monitor.subscribe();

        let started = std::time::Instant::now();
        monitor.start().await.unwrap();
        wait_for_sequence(&mut rx, 3).await;
        assert!(
            started.elapsed() >= Duration::from_millis(80),
            "three reads took only {:?}",
            started.elapsed()
        );

        monitor.stop().await.unwrap();
    }
}
