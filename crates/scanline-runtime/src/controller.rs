//! # Scanner Mode Controller
//!
//! Owns the scan session, the manual entry gate, the inventory cache and the
//! cart pipeline, and wires them to the host's mode toggle and store picker.
//!
//! ## Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        ScannerController                                │
//! │                                                                         │
//! │   build() ─► pipeline task spawned, session Idle                        │
//! │      │                                                                  │
//! │      ▼                                                                  │
//! │   activate(store) ─► active store set ─► refresh (non-forced)           │
//! │      │                                   failure: logged, in status     │
//! │      ▼                                                                  │
//! │   mode Camera ──switch_mode(Manual)──► session.stop()                   │
//! │   mode Manual ──switch_mode(Camera)──► session.start()                  │
//! │      │                                                                  │
//! │      ▼                                                                  │
//! │   teardown() ─► session.stop() ─► pipeline drained and closed           │
//! │                 later activate/switch/retry ─► PipelineClosed           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Camera scans and manual submissions share one event channel, so the cart
//! sees them in exactly the order they were produced.
//!
//! Every refresh that installs a new index, forced or not, re-bounds the cart
//! against the new stock before the caller gets control back.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use scanline_core::{
    CartLine, CartTotals, ManualEntryGate, Percentage, ScanEvent, ScanMode,
};
use tokio::sync::{mpsc, watch, Mutex};
use tracing::{debug, info, warn};

use crate::cache::{CacheStatus, InventoryCache};
use crate::error::CacheResult;
use crate::catalog::CatalogFetcher;
use crate::config::ScannerConfig;
use crate::error::{ConfigError, ScanError, ScanRuntimeResult};
use crate::pipeline::{CartPipeline, CartState, FeedbackEmitter, NoOpFeedback, PipelineHandle};
use crate::session::{Decoder, ScanSession, SessionConfig, SessionState};

// =============================================================================
// Controller
// =============================================================================

pub struct ScannerController {
    config: ScannerConfig,
    cache: InventoryCache,
    session: ScanSession,
    gate: ManualEntryGate,
    pipeline: CartPipeline,
    feedback: Arc<dyn FeedbackEmitter>,
    events: Mutex<Option<mpsc::UnboundedSender<ScanEvent>>>,
    pipeline_handle: Mutex<Option<PipelineHandle>>,
    mode: watch::Sender<ScanMode>,
    torn_down: AtomicBool,
}

impl ScannerController {
    pub fn builder(config: ScannerConfig) -> ScannerControllerBuilder {
        ScannerControllerBuilder::new(config)
    }

    pub fn config(&self) -> &ScannerConfig {
        &self.config
    }

    pub fn mode(&self) -> ScanMode {
        *self.mode.borrow()
    }

    pub fn subscribe_mode(&self) -> watch::Receiver<ScanMode> {
        self.mode.subscribe()
    }

    pub fn session_state(&self) -> SessionState {
        self.session.state()
    }

    pub fn subscribe_session(&self) -> watch::Receiver<SessionState> {
        self.session.subscribe()
    }

    pub async fn cache_status(&self) -> CacheStatus {
        self.cache.status().await
    }

    pub fn cache(&self) -> &InventoryCache {
        &self.cache
    }

    pub fn cart(&self) -> &CartState {
        self.pipeline.cart()
    }

    pub async fn cart_totals(&self) -> CartTotals {
        self.pipeline.cart().totals().await
    }

    /// Makes `store_id` the active store and loads its catalog.
    ///
    /// A failed refresh does not fail activation: the error is logged and
    /// shows up in [`cache_status`](Self::cache_status). In camera mode the
    /// session is started afterwards.
    pub async fn activate(&self, store_id: &str) -> ScanRuntimeResult<()> {
        self.ensure_open()?;
        info!(store_id = %store_id, device_id = %self.config.device_id(), "Activating scanner");
        self.cache.set_active_store(store_id).await;
        self.refresh_quietly(store_id, false).await;

        if self.mode() == ScanMode::Camera {
            self.start_camera().await;
        }
        Ok(())
    }

    /// Switches between camera and manual entry.
    ///
    /// Leaving camera mode always stops the session, whatever state it is in.
    pub async fn switch_mode(&self, mode: ScanMode) -> ScanRuntimeResult<()> {
        self.ensure_open()?;
        let previous = self.mode.send_replace(mode);
        if previous != mode {
            info!(from = %previous, to = %mode, "Scan mode changed");
        }

        match mode {
            ScanMode::Manual => self.session.stop().await,
            ScanMode::Camera => self.start_camera().await,
        }
        Ok(())
    }

    /// Changes the active store. The camera keeps running; lookups miss
    /// until the new catalog is loaded.
    pub async fn switch_store(&self, store_id: &str) -> ScanRuntimeResult<()> {
        self.ensure_open()?;
        self.cache.set_active_store(store_id).await;
        self.refresh_quietly(store_id, false).await;
        Ok(())
    }

    /// Forced refresh of the active store, then re-bounds the cart against
    /// the new stock. Returns the lines that are now over-allocated.
    pub async fn force_refresh(&self) -> ScanRuntimeResult<Vec<CartLine>> {
        let store_id = self.cache.active_store().await.ok_or(ScanError::NoActiveStore)?;
        Ok(self.refresh_and_rebound(&store_id, true).await?)
    }

    /// Validates keyed-in input and queues it behind any pending scans.
    pub async fn submit_manual(&self, input: &str) -> ScanRuntimeResult<ScanEvent> {
        let submission = self.gate.submit(input).map_err(|err| {
            debug!(error = %err, "Manual entry rejected");
            err
        })?;

        if let Some(warning) = &submission.warning {
            warn!(barcode = %warning.barcode, "Manual entry fails EAN-13 checksum");
            self.feedback.warning(warning);
        }

        let events = self.events.lock().await;
        let sender = events.as_ref().ok_or(ScanError::PipelineClosed)?;
        sender
            .send(submission.event.clone())
            .map_err(|_| ScanError::PipelineClosed)?;
        Ok(submission.event)
    }

    /// Operator retry after a camera error.
    pub async fn retry_camera(&self) -> ScanRuntimeResult<()> {
        self.ensure_open()?;
        if self.mode() != ScanMode::Camera {
            debug!("Camera retry ignored in manual mode");
            return Ok(());
        }
        let retried = self.session.retry().await;
        self.release_if_torn_down().await;
        retried?;
        Ok(())
    }

    /// Sets the quantity of a cart line. Zero removes the line.
    pub async fn set_quantity(
        &self,
        product_id: &str,
        quantity: i64,
    ) -> ScanRuntimeResult<Option<CartLine>> {
        let reconciler = *self.pipeline.reconciler();
        let line = self
            .cart()
            .with_cart_mut(|cart| reconciler.set_quantity(product_id, quantity, cart))
            .await?;
        Ok(line)
    }

    pub async fn set_discount(
        &self,
        product_id: &str,
        discount: Percentage,
    ) -> ScanRuntimeResult<CartLine> {
        let reconciler = *self.pipeline.reconciler();
        let line = self
            .cart()
            .with_cart_mut(|cart| reconciler.set_discount(product_id, discount, cart))
            .await?;
        Ok(line)
    }

    /// Stops the camera and drains the pipeline. Final: later manual
    /// submissions, activations, mode or store switches and camera retries
    /// fail with `PipelineClosed`.
    pub async fn teardown(&self) {
        if !self.torn_down.swap(true, Ordering::SeqCst) {
            info!("Tearing down scanner");
        }
        self.session.stop().await;
        self.events.lock().await.take();
        if let Some(handle) = self.pipeline_handle.lock().await.take() {
            handle.shutdown().await;
        }
    }

    async fn refresh_quietly(&self, store_id: &str, force: bool) {
        if let Err(err) = self.refresh_and_rebound(store_id, force).await {
            warn!(store_id = %store_id, error = %err, "Catalog refresh failed");
        }
    }

    /// Refreshes, and when that put a different index in front of lookups,
    /// re-applies its stock to the cart. An index served from memory was
    /// already applied when it was installed.
    async fn refresh_and_rebound(&self, store_id: &str, force: bool) -> CacheResult<Vec<CartLine>> {
        let before = self.cache.index().await;
        let refreshed = self.cache.refresh(store_id, force).await?;
        let unchanged = before.is_some_and(|before| Arc::ptr_eq(&before, &refreshed));
        if unchanged && !force {
            return Ok(Vec::new());
        }
        Ok(self.pipeline.apply_refreshed_stock().await)
    }

    async fn start_camera(&self) {
        if let Err(err) = self.session.start().await {
            warn!(error = %err, "Camera did not start");
        }
        self.release_if_torn_down().await;
    }

    fn ensure_open(&self) -> ScanRuntimeResult<()> {
        if self.torn_down.load(Ordering::SeqCst) {
            return Err(ScanError::PipelineClosed);
        }
        Ok(())
    }

    /// A start that raced with `teardown` must not keep the camera.
    async fn release_if_torn_down(&self) {
        if self.torn_down.load(Ordering::SeqCst) {
            self.session.stop().await;
        }
    }
}

// =============================================================================
// Builder Pattern
// =============================================================================

/// Builder for [`ScannerController`].
pub struct ScannerControllerBuilder {
    config: ScannerConfig,
    fetcher: Option<Arc<dyn CatalogFetcher>>,
    decoder: Option<Arc<dyn Decoder>>,
    feedback: Option<Arc<dyn FeedbackEmitter>>,
}

impl ScannerControllerBuilder {
    pub fn new(config: ScannerConfig) -> Self {
        ScannerControllerBuilder {
            config,
            fetcher: None,
            decoder: None,
            feedback: None,
        }
    }

    /// Sets the catalog source.
    pub fn with_fetcher(mut self, fetcher: Arc<dyn CatalogFetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    /// Sets the camera decoder.
    pub fn with_decoder(mut self, decoder: Arc<dyn Decoder>) -> Self {
        self.decoder = Some(decoder);
        self
    }

    pub fn with_feedback(mut self, feedback: Arc<dyn FeedbackEmitter>) -> Self {
        self.feedback = Some(feedback);
        self
    }

    /// Validates the config and spawns the cart pipeline. Must be called
    /// inside a tokio runtime.
    pub fn build(self) -> ScanRuntimeResult<ScannerController> {
        self.config.validate()?;

        let fetcher = self
            .fetcher
            .ok_or_else(|| ConfigError::invalid("catalog", "no catalog source configured"))?;
        let decoder = self
            .decoder
            .ok_or_else(|| ConfigError::invalid("scanner", "no camera decoder configured"))?;
        let feedback = self.feedback.unwrap_or_else(|| Arc::new(NoOpFeedback));

        let cache = InventoryCache::new(fetcher, self.config.max_cache_age());
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        let session = ScanSession::new(
            decoder,
            SessionConfig {
                mount_point: self.config.scanner.mount_point.clone(),
                cooldown: self.config.cooldown(),
            },
            events_tx.clone(),
        );
        let pipeline = CartPipeline::new(cache.clone(), CartState::new(), Arc::clone(&feedback));
        let handle = pipeline.clone().spawn(events_rx);
        let (mode, _) = watch::channel(self.config.scanner.default_mode);

        Ok(ScannerController {
            gate: ManualEntryGate::new(self.config.manual.min_length),
            config: self.config,
            cache,
            session,
            pipeline,
            feedback,
            events: Mutex::new(Some(events_tx)),
            pipeline_handle: Mutex::new(Some(handle)),
            mode,
            torn_down: AtomicBool::new(false),
        })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
