//! Detection loop scheduler
//!
//! One task owns the overlay session, the video source, and at most one
//! outstanding detection request. Commands, interval ticks, and request
//! completion are multiplexed in a single `select!`, so cancelling a mode
//! drops the in-flight future before its result can ever be applied.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use camera_capture::{CaptureConfig, PlaybackState, VideoSource};
use metrics::{counter, histogram};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};
use tracing::{debug, info, warn};
use vision_client::{Detector, DetectionResponse};

use crate::interaction::PointerEvent;
use crate::render::DrawSurface;
use crate::session::OverlaySession;
use crate::status::{BackendStatus, OverlaySnapshot, View};
use crate::{DetectionRegion, OverlayConfig, OverlayError};

const COMMAND_CAPACITY: usize = 64;

/// Control input for the detection loop
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Capture and detect a single frame
    DetectOnce,
    /// Start or stop interval-driven detection
    SetContinuous(bool),
    /// Change the continuous period (clamped to 30-200ms)
    SetPeriod(Duration),
    /// Play file-backed media, detecting frame after frame
    StartPlayback,
    /// Pause media; the in-flight cycle still completes
    PausePlayback,
    /// Pause media and cancel detection
    StopPlayback,
    SetView(View),
    SetRegionEnabled(bool),
    /// Enable the region at an explicit display-space rectangle
    PlaceRegion(DetectionRegion),
    Pointer(PointerEvent),
    /// Redraw the current result after a layout change
    Redraw,
    SetBackendStatus(BackendStatus),
    Shutdown,
}

/// Which mode issued a detection request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CycleKind {
    OneShot,
    Continuous,
    Playback,
}

struct CycleOutcome {
    kind: CycleKind,
    submitted: (u32, u32),
    started: Instant,
    result: Result<DetectionResponse, OverlayError>,
}

type InFlight = Pin<Box<dyn Future<Output = CycleOutcome> + Send>>;

/// Handle used to drive and observe a running detection loop
#[derive(Debug, Clone)]
pub struct LoopHandle {
    commands: mpsc::Sender<Command>,
    snapshot: watch::Receiver<OverlaySnapshot>,
}

impl LoopHandle {
    pub async fn send(&self, command: Command) -> Result<(), OverlayError> {
        self.commands
            .send(command)
            .await
            .map_err(|_| OverlayError::LoopClosed)
    }

    pub async fn detect_once(&self) -> Result<(), OverlayError> {
        self.send(Command::DetectOnce).await
    }

    pub async fn set_continuous(&self, enabled: bool) -> Result<(), OverlayError> {
        self.send(Command::SetContinuous(enabled)).await
    }

    pub async fn set_period(&self, period: Duration) -> Result<(), OverlayError> {
        self.send(Command::SetPeriod(period)).await
    }

    pub async fn start_playback(&self) -> Result<(), OverlayError> {
        self.send(Command::StartPlayback).await
    }

    pub async fn pause_playback(&self) -> Result<(), OverlayError> {
        self.send(Command::PausePlayback).await
    }

    pub async fn stop_playback(&self) -> Result<(), OverlayError> {
        self.send(Command::StopPlayback).await
    }

    pub async fn set_view(&self, view: View) -> Result<(), OverlayError> {
        self.send(Command::SetView(view)).await
    }

    pub async fn set_region_enabled(&self, enabled: bool) -> Result<(), OverlayError> {
        self.send(Command::SetRegionEnabled(enabled)).await
    }

    pub async fn place_region(&self, region: DetectionRegion) -> Result<(), OverlayError> {
        self.send(Command::PlaceRegion(region)).await
    }

    pub async fn pointer(&self, event: PointerEvent) -> Result<(), OverlayError> {
        self.send(Command::Pointer(event)).await
    }

    pub async fn set_backend_status(&self, status: BackendStatus) -> Result<(), OverlayError> {
        self.send(Command::SetBackendStatus(status)).await
    }

    pub async fn shutdown(&self) -> Result<(), OverlayError> {
        self.send(Command::Shutdown).await
    }

    /// Latest published snapshot
    pub fn snapshot(&self) -> OverlaySnapshot {
        self.snapshot.borrow().clone()
    }

    /// Receiver notified on every published snapshot
    pub fn subscribe(&self) -> watch::Receiver<OverlaySnapshot> {
        self.snapshot.clone()
    }
}

/// The detection loop actor
pub struct DetectionLoop<D, V, S>
where
    D: Detector,
    V: VideoSource,
    S: DrawSurface,
{
    detector: Arc<D>,
    source: V,
    session: OverlaySession<S>,
    capture: CaptureConfig,
    forward_region: bool,
    commands: mpsc::Receiver<Command>,
    snapshot: watch::Sender<OverlaySnapshot>,

    view: View,
    backend: BackendStatus,
    continuous: bool,
    playing: bool,
    period: Duration,
    error: Option<String>,
    cycles_completed: u64,
    ticks_dropped: u64,

    ticker: Option<Interval>,
    in_flight: Option<InFlight>,
    in_flight_kind: Option<CycleKind>,
}

impl<D, V, S> DetectionLoop<D, V, S>
where
    D: Detector,
    V: VideoSource,
    S: DrawSurface + Send + 'static,
{
    /// Build the loop and the handle that drives it
    pub fn new(
        detector: Arc<D>,
        source: V,
        surface: Option<S>,
        capture: CaptureConfig,
        config: OverlayConfig,
    ) -> (LoopHandle, Self) {
        let (command_tx, command_rx) = mpsc::channel(COMMAND_CAPACITY);
        let period = config.period();
        let (snapshot_tx, snapshot_rx) = watch::channel(OverlaySnapshot {
            period_ms: period.as_millis() as u64,
            ..Default::default()
        });

        let handle = LoopHandle {
            commands: command_tx,
            snapshot: snapshot_rx,
        };
        let detection_loop = Self {
            detector,
            source,
            session: OverlaySession::new(surface, &config),
            capture,
            forward_region: config.forward_region,
            commands: command_rx,
            snapshot: snapshot_tx,
            view: View::Recognize,
            backend: BackendStatus::Checking,
            continuous: false,
            playing: false,
            period,
            error: None,
            cycles_completed: 0,
            ticks_dropped: 0,
            ticker: None,
            in_flight: None,
            in_flight_kind: None,
        };
        (handle, detection_loop)
    }

    /// Run the loop on its own task
    pub fn spawn(self) -> JoinHandle<OverlaySession<S>> {
        tokio::spawn(self.run())
    }

    /// Run until `Shutdown` or until every handle is dropped.
    ///
    /// Returns the session so the final overlay can be inspected.
    pub async fn run(mut self) -> OverlaySession<S> {
        info!("Starting detection loop (period {}ms)", self.period.as_millis());
        self.publish();

        loop {
            tokio::select! {
                biased;

                command = self.commands.recv() => {
                    match command {
                        Some(Command::Shutdown) | None => break,
                        Some(command) => self.handle_command(command),
                    }
                }
                outcome = poll_in_flight(&mut self.in_flight) => {
                    self.in_flight = None;
                    self.in_flight_kind = None;
                    self.complete(outcome);
                }
                _ = next_tick(&mut self.ticker) => {
                    self.on_tick();
                }
            }
        }

        self.cancel();
        self.source.pause();
        self.playing = false;
        self.publish();
        info!("Detection loop stopped after {} cycles", self.cycles_completed);
        self.session
    }

    fn handle_command(&mut self, command: Command) {
        debug!("Command: {:?}", command);
        match command {
            Command::DetectOnce => self.detect_once(),
            Command::SetContinuous(enabled) => self.set_continuous(enabled),
            Command::SetPeriod(period) => {
                self.period = OverlayConfig::clamp_period(period);
                if self.ticker.is_some() {
                    self.ticker = Some(self.new_interval());
                }
                info!("Detection period set to {}ms", self.period.as_millis());
            }
            Command::StartPlayback => self.start_playback(),
            Command::PausePlayback => {
                self.source.pause();
                self.playing = false;
            }
            Command::StopPlayback => {
                // A paused source may still have its last cycle in flight
                let active =
                    self.playing || self.in_flight_kind == Some(CycleKind::Playback);
                self.source.pause();
                self.playing = false;
                if active {
                    self.cancel();
                }
            }
            Command::SetView(view) => {
                if view != self.view {
                    info!("View changed to {:?}", view);
                    self.view = view;
                    if view != View::Recognize {
                        self.continuous = false;
                        if self.playing {
                            self.source.pause();
                            self.playing = false;
                        }
                        self.cancel();
                    }
                }
            }
            Command::SetRegionEnabled(enabled) => {
                let display = self.source.display_size();
                self.session.set_region_enabled(enabled, display);
            }
            Command::PlaceRegion(region) => {
                let display = self.source.display_size();
                self.session.place_region(region, display);
            }
            Command::Pointer(event) => {
                let display = self.source.display_size();
                if !self.session.pointer(event, display) {
                    return;
                }
            }
            Command::Redraw => {
                let display = self.source.display_size();
                self.session.refresh(display);
            }
            Command::SetBackendStatus(status) => {
                if status != self.backend {
                    info!("Backend status: {:?}", status);
                    self.backend = status;
                    self.rearm();
                }
            }
            Command::Shutdown => {}
        }
        self.publish();
    }

    /// Why detection cannot run right now, if it cannot
    fn unavailable(&self) -> Option<&'static str> {
        if self.view != View::Recognize {
            Some("detection is only available in the recognize view")
        } else if self.backend == BackendStatus::Offline {
            Some("backend offline")
        } else {
            None
        }
    }

    fn detect_once(&mut self) {
        if let Some(reason) = self.unavailable() {
            self.error = Some(OverlayError::Unavailable(reason).to_string());
            return;
        }
        if self.in_flight.is_some() || self.continuous || self.playing {
            debug!("One-shot detection ignored while busy");
            return;
        }
        self.session.clear();
        self.start_cycle(CycleKind::OneShot);
    }

    fn set_continuous(&mut self, enabled: bool) {
        if enabled == self.continuous {
            return;
        }
        if enabled {
            if let Some(reason) = self.unavailable() {
                self.error = Some(OverlayError::Unavailable(reason).to_string());
                return;
            }
            if self.playing {
                self.source.pause();
                self.playing = false;
            }
            info!("Continuous detection started");
            self.continuous = true;
            self.rearm();
        } else {
            info!("Continuous detection stopped");
            self.continuous = false;
            self.cancel();
        }
    }

    fn start_playback(&mut self) {
        if let Some(reason) = self.unavailable() {
            self.error = Some(OverlayError::Unavailable(reason).to_string());
            return;
        }
        if self.continuous {
            self.continuous = false;
            self.cancel();
        }
        self.source.play();
        if self.source.playback() != PlaybackState::Playing {
            debug!("Source did not start playing");
            return;
        }
        info!("Playback detection started");
        self.playing = true;
        if self.in_flight.is_none() {
            self.continue_playback();
        }
    }

    /// Chain the next playback cycle while the source keeps playing
    fn continue_playback(&mut self) {
        while self.playing && self.in_flight.is_none() {
            if self.source.playback() != PlaybackState::Playing {
                debug!("Playback reached {:?}", self.source.playback());
                self.playing = false;
                return;
            }
            if !self.start_cycle(CycleKind::Playback) {
                // No frame yet; stop chaining rather than spin
                self.playing = false;
                return;
            }
        }
    }

    fn on_tick(&mut self) {
        if self.in_flight.is_some() {
            self.ticks_dropped += 1;
            counter!("overlay_ticks_dropped_total").increment(1);
            debug!("Tick dropped, request still in flight");
            self.publish();
            return;
        }
        self.start_cycle(CycleKind::Continuous);
        self.publish();
    }

    /// Capture, encode, and submit a frame.
    ///
    /// Returns false when no frame was available. A capture or encode
    /// failure counts as a completed, failed cycle.
    fn start_cycle(&mut self, kind: CycleKind) -> bool {
        let frame = match self.source.capture() {
            Ok(Some(frame)) => frame,
            Ok(None) => {
                debug!("Video source not ready");
                return false;
            }
            Err(e) => {
                self.cycles_completed += 1;
                self.record_failure(OverlayError::from(e));
                return true;
            }
        };

        let still = match self.capture.screenshot(&frame) {
            Ok(still) => still,
            Err(e) => {
                self.cycles_completed += 1;
                self.record_failure(OverlayError::from(e));
                return true;
            }
        };

        let submitted = (still.width, still.height);
        let hint = if self.forward_region {
            self.session.region_hint(submitted, self.source.display_size())
        } else {
            None
        };

        debug!(
            "Submitting frame {} ({}x{}) for {:?} detection",
            frame.sequence, submitted.0, submitted.1, kind
        );
        counter!("overlay_detection_requests_total").increment(1);

        let detector = Arc::clone(&self.detector);
        let started = Instant::now();
        self.in_flight = Some(Box::pin(async move {
            let result = detector
                .detect(&still, hint)
                .await
                .map_err(OverlayError::from);
            CycleOutcome {
                kind,
                submitted,
                started,
                result,
            }
        }));
        self.in_flight_kind = Some(kind);
        true
    }

    fn complete(&mut self, outcome: CycleOutcome) {
        let elapsed = outcome.started.elapsed();
        histogram!("overlay_detection_latency_ms").record(elapsed.as_secs_f64() * 1000.0);
        self.cycles_completed += 1;

        match outcome.result {
            Ok(response) => {
                debug!(
                    "{:?} cycle detected {} faces in {}ms",
                    outcome.kind,
                    response.faces.len(),
                    elapsed.as_millis()
                );
                self.error = None;
                let display = self.source.display_size();
                self.session.apply(response, outcome.submitted, display);
            }
            Err(e) => self.record_failure(e),
        }

        // Playback may have started while another cycle was in flight
        if self.playing {
            self.continue_playback();
        }
        self.publish();
    }

    fn record_failure(&mut self, error: OverlayError) {
        warn!("Detection cycle failed: {}", error);
        counter!("overlay_detection_failures_total").increment(1);
        self.error = Some(error.to_string());
    }

    /// Arm or disarm the interval for the current mode
    fn rearm(&mut self) {
        let armed =
            self.continuous && self.view == View::Recognize && self.backend == BackendStatus::Online;
        match (armed, self.ticker.is_some()) {
            (true, false) => self.ticker = Some(self.new_interval()),
            (false, true) => {
                debug!("Continuous detection disarmed");
                self.ticker = None;
            }
            _ => {}
        }
    }

    fn new_interval(&self) -> Interval {
        let mut ticker = interval_at(Instant::now() + self.period, self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        ticker
    }

    /// Stop the interval, drop the in-flight request, and blank the overlay
    fn cancel(&mut self) {
        self.ticker = None;
        if self.in_flight.take().is_some() {
            debug!("Dropped in-flight {:?} request", self.in_flight_kind);
        }
        self.in_flight_kind = None;
        self.session.clear();
    }

    fn publish(&self) {
        let snapshot = OverlaySnapshot {
            view: self.view,
            backend: self.backend,
            continuous: self.continuous,
            playing: self.playing,
            processing: self.in_flight.is_some(),
            error: self.error.clone(),
            region: self.session.region(),
            faces: self.session.entries(),
            stats: self.session.stats(),
            cycles_completed: self.cycles_completed,
            ticks_dropped: self.ticks_dropped,
            period_ms: self.period.as_millis() as u64,
        };
        self.snapshot.send_replace(snapshot);
    }
}

async fn poll_in_flight(slot: &mut Option<InFlight>) -> CycleOutcome {
    match slot {
        Some(request) => request.await,
        None => std::future::pending().await,
    }
}

async fn next_tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(ticker) => {
            ticker.tick().await;
        }
        None => std::future::pending().await,
    }
}
