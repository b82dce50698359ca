//! # Scan Session
//!
//! Owns the camera decoder and turns its raw decodes into `ScanEvent`s.
//!
//! ## State Machine
//! ```text
//!             start()
//!   Idle ───────────────► Initializing ──Sampling──► Scanning ◄─────────┐
//!                              │                        │               │
//!                              │                  accepted decode       │
//!                              │                        │          cooldown
//!                              │                        ▼           elapsed
//!                              │                    Detecting ──────────┘
//!                              │                        │
//!                     start failure / decoder failure (any active state)
//!                              │                        │
//!                              └──────────► Error ◄─────┘
//!                                            │
//!                                 retry() ───┘──► Initializing
//!
//!   stop() from any state ──► Stopped   (decoder released exactly once)
//! ```
//!
//! ## Cooldown
//! After every accepted decode the session ignores all decodes, of any value,
//! for `SessionConfig::cooldown`. Blank decodes never start a cooldown.
//!
//! ## Release
//! The decoder is released through one path (`release`) whether the session
//! ends by `stop()`, a decoder failure, or being dropped. A `stop()` that
//! lands while `Decoder::start` is still pending releases the decoder as soon
//! as that acquisition returns.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use scanline_core::{ScanEvent, ScanSource, DEFAULT_COOLDOWN_MS};
use serde::Serialize;
use tokio::sync::{mpsc, oneshot, watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info, warn};

use crate::error::{DecoderError, SessionError, SessionResult};

/// Signals produced by a running decoder.
pub type DecoderStream = mpsc::Receiver<DecoderSignal>;

// =============================================================================
// Decoder Seam
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecoderSignal {
    /// The capture stream is live and frames are being sampled.
    Sampling,
    /// A raw decode, untrimmed.
    Decoded(String),
    /// The device failed. The stream ends after this.
    Failure(DecoderError),
}

/// A camera barcode decoder bound to a mount point.
#[async_trait]
pub trait Decoder: Send + Sync {
    /// Acquires the device and starts sampling.
    async fn start(&self, mount_point: &str) -> Result<DecoderStream, DecoderError>;

    /// Releases every device resource. Called once per successful `start`.
    async fn stop(&self);
}

// =============================================================================
// Session State / Config
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "message", rename_all = "snake_case")]
pub enum SessionState {
    Idle,
    Initializing,
    Scanning,
    Detecting,
    Stopped,
    Error(String),
}

impl SessionState {
    /// Whether the session currently holds (or is acquiring) the decoder.
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            SessionState::Initializing | SessionState::Scanning | SessionState::Detecting
        )
    }

    pub fn is_error(&self) -> bool {
        matches!(self, SessionState::Error(_))
    }
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Element/viewport the decoder renders into.
    pub mount_point: String,
    pub cooldown: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            mount_point: "scanner-viewport".to_string(),
            cooldown: Duration::from_millis(DEFAULT_COOLDOWN_MS),
        }
    }
}

// =============================================================================
// Scan Session
// =============================================================================

#[derive(Default)]
struct SessionCore {
    /// Bumped by every start and stop. A pump or pending start whose epoch
    /// no longer matches has been superseded.
    epoch: u64,
    /// The decoder has been started and not yet released.
    acquired: bool,
    cancel: Option<oneshot::Sender<()>>,
    pump: Option<JoinHandle<()>>,
}

struct SessionInner {
    decoder: Arc<dyn Decoder>,
    config: SessionConfig,
    core: Mutex<SessionCore>,
    state: watch::Sender<SessionState>,
    events: mpsc::UnboundedSender<ScanEvent>,
}

/// Camera scan session.
///
/// Dropping the session stops it in the background if a tokio runtime is
/// available.
pub struct ScanSession {
    inner: Arc<SessionInner>,
}

impl ScanSession {
    /// Creates an idle session that emits accepted scans into `events`.
    pub fn new(
        decoder: Arc<dyn Decoder>,
        config: SessionConfig,
        events: mpsc::UnboundedSender<ScanEvent>,
    ) -> Self {
        let (state, _) = watch::channel(SessionState::Idle);
        ScanSession {
            inner: Arc::new(SessionInner {
                decoder,
                config,
                core: Mutex::new(SessionCore::default()),
                state,
                events,
            }),
        }
    }

    pub fn state(&self) -> SessionState {
        self.inner.state.borrow().clone()
    }

    /// Subscribes to state transitions.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.inner.state.subscribe()
    }

    pub fn config(&self) -> &SessionConfig {
        &self.inner.config
    }

    /// Acquires the decoder and starts emitting scans.
    ///
    /// A no-op while the session is already initializing or scanning.
    /// Returns `SessionError::Cancelled` when `stop()` ran before the
    /// acquisition finished.
    pub async fn start(&self) -> SessionResult<()> {
        let epoch = {
            let mut core = self.inner.core.lock().await;
            let current = self.state();
            if current.is_active() {
                debug!(state = ?current, "Camera already running");
                return Ok(());
            }
            core.epoch += 1;
            self.inner.set_state(SessionState::Initializing);
            core.epoch
        };

        info!(mount_point = %self.inner.config.mount_point, "Starting camera");
        let acquisition = self.inner.decoder.start(&self.inner.config.mount_point).await;

        let mut core = self.inner.core.lock().await;
        match acquisition {
            Ok(stream) => {
                core.acquired = true;
                if core.epoch != epoch {
                    drop(core);
                    debug!("Camera start superseded by stop, releasing decoder");
                    self.inner.release().await;
                    return Err(SessionError::Cancelled);
                }

                let (cancel_tx, cancel_rx) = oneshot::channel();
                core.cancel = Some(cancel_tx);
                core.pump = Some(tokio::spawn(
                    Arc::clone(&self.inner).pump(epoch, stream, cancel_rx),
                ));
                Ok(())
            }
            Err(err) => {
                if core.epoch != epoch {
                    return Err(SessionError::Cancelled);
                }
                warn!(error = %err, "Camera failed to start");
                self.inner.set_state(SessionState::Error(err.to_string()));
                Err(err.into())
            }
        }
    }

    /// Stops scanning and releases the decoder. Idempotent.
    pub async fn stop(&self) {
        self.inner.shutdown().await;
    }

    /// Operator retry after a decoder error.
    pub async fn retry(&self) -> SessionResult<()> {
        info!(state = ?self.state(), "Retrying camera");
        self.start().await
    }
}

impl Drop for ScanSession {
    fn drop(&mut self) {
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            let inner = Arc::clone(&self.inner);
            handle.spawn(async move { inner.shutdown().await });
        }
    }
}

impl SessionInner {
    fn set_state(&self, next: SessionState) {
        let previous = self.state.send_replace(next.clone());
        if previous != next {
            debug!(from = ?previous, to = ?next, "Scan session transition");
        }
    }

    /// The single release path for the decoder.
    async fn release(&self) {
        let acquired = std::mem::replace(&mut self.core.lock().await.acquired, false);
        if acquired {
            self.decoder.stop().await;
            info!("Camera released");
        }
    }

    async fn shutdown(&self) {
        let (cancel, pump) = {
            let mut core = self.core.lock().await;
            core.epoch += 1;
            let stopped = *self.state.borrow() == SessionState::Stopped;
            if !stopped {
                self.set_state(SessionState::Stopped);
                info!("Scan session stopped");
            }
            (core.cancel.take(), core.pump.take())
        };

        if let Some(cancel) = cancel {
            let _ = cancel.send(());
        }
        if let Some(pump) = pump {
            if let Err(err) = pump.await {
                warn!(error = %err, "Scan pump ended abnormally");
            }
        }
        self.release().await;
    }

    async fn pump(
        self: Arc<Self>,
        epoch: u64,
        mut stream: DecoderStream,
        mut cancel: oneshot::Receiver<()>,
    ) {
        let mut cooldown: Option<Instant> = None;

        loop {
            tokio::select! {
                biased;

                _ = &mut cancel => break,

                _ = sleep_until(cooldown.unwrap_or_else(Instant::now)), if cooldown.is_some() => {
                    cooldown = None;
                    self.transition(epoch, SessionState::Detecting, SessionState::Scanning).await;
                }

                signal = stream.recv() => match signal {
                    Some(DecoderSignal::Sampling) => {
                        self.transition(epoch, SessionState::Initializing, SessionState::Scanning).await;
                    }
                    Some(DecoderSignal::Decoded(raw)) => {
                        if let Some(until) = self.accept_decode(epoch, &raw, cooldown).await {
                            cooldown = Some(until);
                        }
                    }
                    Some(DecoderSignal::Failure(err)) => {
                        self.fail(epoch, err).await;
                        break;
                    }
                    None => {
                        self.fail(epoch, DecoderError::DeviceLost("decoder stream closed".into())).await;
                        break;
                    }
                },
            }
        }
    }

    async fn transition(&self, epoch: u64, from: SessionState, to: SessionState) {
        let core = self.core.lock().await;
        if core.epoch == epoch && *self.state.borrow() == from {
            self.set_state(to);
        }
    }

    /// Accepts one decode if it is not blank, not inside the cooldown, the
    /// decoder has reported `Sampling`, and the session has not been stopped.
    /// Returns the end of the new cooldown.
    async fn accept_decode(
        &self,
        epoch: u64,
        raw: &str,
        cooldown: Option<Instant>,
    ) -> Option<Instant> {
        let barcode = raw.trim();
        if barcode.is_empty() {
            debug!("Ignoring blank decode");
            return None;
        }
        if let Some(until) = cooldown {
            if Instant::now() < until {
                debug!(barcode = %barcode, "Decode ignored during cooldown");
                return None;
            }
        }

        // Emission happens under the same lock stop() takes
        let core = self.core.lock().await;
        if core.epoch != epoch {
            debug!(barcode = %barcode, "Decode discarded, session stopped");
            return None;
        }
        if *self.state.borrow() == SessionState::Initializing {
            debug!(barcode = %barcode, "Decode before sampling started, ignored");
            return None;
        }

        self.set_state(SessionState::Detecting);
        debug!(barcode = %barcode, "Camera scan accepted");
        if self
            .events
            .send(ScanEvent::new(barcode, ScanSource::Camera))
            .is_err()
        {
            warn!(barcode = %barcode, "Scan pipeline closed, camera scan dropped");
        }
        drop(core);

        Some(Instant::now() + self.config.cooldown)
    }

    async fn fail(&self, epoch: u64, err: DecoderError) {
        let acquired = {
            let mut core = self.core.lock().await;
            if core.epoch != epoch {
                return;
            }
            std::mem::replace(&mut core.acquired, false)
        };

        warn!(error = %err, "Camera failed");
        if acquired {
            self.decoder.stop().await;
            info!("Camera released");
        }

        let core = self.core.lock().await;
        if core.epoch == epoch {
            self.set_state(SessionState::Error(err.to_string()));
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeDecoder;
    use tokio::sync::Notify;

    fn session_with(
        decoder: &Arc<FakeDecoder>,
    ) -> (ScanSession, mpsc::UnboundedReceiver<ScanEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let session = ScanSession::new(
            Arc::clone(decoder) as Arc<dyn Decoder>,
            SessionConfig::default(),
            tx,
        );
        (session, rx)
    }

    async fn wait_for_state(session: &ScanSession, wanted: impl Fn(&SessionState) -> bool) {
        let mut rx = session.subscribe();
        rx.wait_for(|s| wanted(s)).await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_cooldown_ignores_decodes_inside_window() {
        let decoder = FakeDecoder::new();
        let (session, mut events) = session_with(&decoder);

        session.start().await.unwrap();
        assert_eq!(session.state(), SessionState::Initializing);

        let feed = decoder.feed();
        feed.send(DecoderSignal::Sampling).await.unwrap();
        feed.send(DecoderSignal::Decoded(" 4006381333931 ".into()))
            .await
            .unwrap();
        feed.send(DecoderSignal::Decoded("5901234123457".into()))
            .await
            .unwrap();

        let first = events.recv().await.unwrap();
        assert_eq!(first.barcode, "4006381333931");
        assert_eq!(first.source, ScanSource::Camera);

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert!(events.try_recv().is_err());
        assert_eq!(session.state(), SessionState::Detecting);

        tokio::time::sleep(Duration::from_millis(600)).await;
        assert_eq!(session.state(), SessionState::Scanning);

        feed.send(DecoderSignal::Decoded("5901234123457".into()))
            .await
            .unwrap();
        let second = events.recv().await.unwrap();
        assert_eq!(second.barcode, "5901234123457");
    }

    #[tokio::test(start_paused = true)]
    async fn test_blank_decode_does_not_start_cooldown() {
        let decoder = FakeDecoder::new();
        let (session, mut events) = session_with(&decoder);
        session.start().await.unwrap();

        let feed = decoder.feed();
        feed.send(DecoderSignal::Sampling).await.unwrap();
        feed.send(DecoderSignal::Decoded("   ".into())).await.unwrap();
        feed.send(DecoderSignal::Decoded("12345678".into()))
            .await
            .unwrap();

        assert_eq!(events.recv().await.unwrap().barcode, "12345678");
    }

    #[tokio::test(start_paused = true)]
    async fn test_decode_before_sampling_is_ignored() {
        let decoder = FakeDecoder::new();
        let (session, mut events) = session_with(&decoder);
        session.start().await.unwrap();

        let feed = decoder.feed();
        feed.send(DecoderSignal::Decoded("4006381333931".into()))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(events.try_recv().is_err());
        assert_eq!(session.state(), SessionState::Initializing);

        // No cooldown was started, so the first decode after sampling counts
        feed.send(DecoderSignal::Sampling).await.unwrap();
        wait_for_state(&session, |s| *s == SessionState::Scanning).await;
        feed.send(DecoderSignal::Decoded("5901234123457".into()))
            .await
            .unwrap();
        assert_eq!(events.recv().await.unwrap().barcode, "5901234123457");
        assert_eq!(session.state(), SessionState::Detecting);
    }

    #[tokio::test]
    async fn test_decode_after_stop_emits_nothing() {
        let decoder = FakeDecoder::new();
        let (session, mut events) = session_with(&decoder);
        session.start().await.unwrap();

        let feed = decoder.feed();
        feed.send(DecoderSignal::Sampling).await.unwrap();
        wait_for_state(&session, |s| *s == SessionState::Scanning).await;

        session.stop().await;
        let _ = feed.send(DecoderSignal::Decoded("12345678".into())).await;
        tokio::task::yield_now().await;

        assert!(events.try_recv().is_err());
        assert_eq!(session.state(), SessionState::Stopped);
        assert_eq!(decoder.stops(), 1);
    }

    #[tokio::test]
    async fn test_stop_is_idempotent() {
        let decoder = FakeDecoder::new();
        let (session, _events) = session_with(&decoder);
        session.start().await.unwrap();

        session.stop().await;
        session.stop().await;

        assert_eq!(session.state(), SessionState::Stopped);
        assert_eq!(decoder.stops(), 1);
    }

    #[tokio::test]
    async fn test_decoder_failure_releases_and_enters_error() {
        let decoder = FakeDecoder::new();
        let (session, _events) = session_with(&decoder);
        session.start().await.unwrap();

        decoder
            .feed()
            .send(DecoderSignal::Failure(DecoderError::DeviceLost("unplugged".into())))
            .await
            .unwrap();
        wait_for_state(&session, SessionState::is_error).await;

        assert_eq!(decoder.stops(), 1);
        assert_eq!(
            session.state(),
            SessionState::Error("camera lost: unplugged".into())
        );

        // No automatic restart, and stopping from error does not release twice
        assert_eq!(decoder.starts(), 1);
        session.stop().await;
        assert_eq!(session.state(), SessionState::Stopped);
        assert_eq!(decoder.stops(), 1);
    }

    #[tokio::test]
    async fn test_start_failure_then_retry() {
        let decoder = FakeDecoder::new();
        decoder.fail_start(Some(DecoderError::PermissionDenied));
        let (session, _events) = session_with(&decoder);

        let err = session.start().await.unwrap_err();
        assert_eq!(err, SessionError::Decoder(DecoderError::PermissionDenied));
        assert!(session.state().is_error());

        decoder.fail_start(None);
        session.retry().await.unwrap();
        assert_eq!(session.state(), SessionState::Initializing);
        assert_eq!(decoder.starts(), 2);
    }

    #[tokio::test]
    async fn test_stop_during_initializing_releases_late_acquisition() {
        let gate = Arc::new(Notify::new());
        let decoder = FakeDecoder::gated(Arc::clone(&gate));
        let (session, _events) = session_with(&decoder);
        let session = Arc::new(session);

        let starting = {
            let session = Arc::clone(&session);
            tokio::spawn(async move { session.start().await })
        };
        wait_for_state(&session, |s| *s == SessionState::Initializing).await;

        session.stop().await;
        assert_eq!(session.state(), SessionState::Stopped);
        assert_eq!(decoder.stops(), 0);

        gate.notify_one();
        let result = starting.await.unwrap();
        assert_eq!(result, Err(SessionError::Cancelled));
        assert_eq!(decoder.stops(), 1);
        assert_eq!(session.state(), SessionState::Stopped);
    }

    #[tokio::test]
    async fn test_start_while_running_is_noop() {
        let decoder = FakeDecoder::new();
        let (session, _events) = session_with(&decoder);

        session.start().await.unwrap();
        session.start().await.unwrap();
        assert_eq!(decoder.starts(), 1);
    }
}
