//! # Cart Pipeline
//!
//! Single consumer of the scan event channel. Every `ScanEvent`, camera or
//! manual, is reconciled against the active store's index in the order it
//! was emitted.
//!
//! ```text
//!  ScanSession ──┐
//!                ├──► mpsc<ScanEvent> ──► CartPipeline ──► Reconciler ──► Cart
//!  Manual gate ──┘                             │
//!                                              └──► FeedbackEmitter
//!                                                   (acknowledged / rejected)
//! ```

use std::sync::Arc;

use scanline_core::{
    Acknowledgment, Cart, CartLine, CartTotals, ChecksumWarning, Reconciler, ScanEvent,
    ScanRejection, ScanResult,
};
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::cache::InventoryCache;

// =============================================================================
// Feedback
// =============================================================================

/// Operator-facing feedback (toasts, beeps, status line).
pub trait FeedbackEmitter: Send + Sync {
    /// A scan added one unit to the cart.
    fn acknowledged(&self, event: &ScanEvent, ack: &Acknowledgment);

    /// A scan was rejected without touching the cart.
    fn rejected(&self, event: &ScanEvent, rejection: &ScanRejection);

    /// A manual entry looks like a mistyped EAN-13. The scan still proceeds.
    fn warning(&self, warning: &ChecksumWarning);

    /// A refresh lowered stock below quantities already in the cart.
    fn stock_changed(&self, _flagged: &[CartLine]) {}
}

/// No-op feedback for headless use and tests.
pub struct NoOpFeedback;

impl FeedbackEmitter for NoOpFeedback {
    fn acknowledged(&self, _event: &ScanEvent, _ack: &Acknowledgment) {}
    fn rejected(&self, _event: &ScanEvent, _rejection: &ScanRejection) {}
    fn warning(&self, _warning: &ChecksumWarning) {}
}

// =============================================================================
// Cart State
// =============================================================================

/// Shared handle to the in-progress cart.
#[derive(Debug, Clone)]
pub struct CartState {
    cart: Arc<Mutex<Cart>>,
}

impl CartState {
    pub fn new() -> Self {
        CartState {
            cart: Arc::new(Mutex::new(Cart::new())),
        }
    }

    /// Runs `f` with read access to the cart.
    pub async fn with_cart<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&Cart) -> R,
    {
        let cart = self.cart.lock().await;
        f(&cart)
    }

    /// Runs `f` with write access to the cart.
    pub async fn with_cart_mut<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&mut Cart) -> R,
    {
        let mut cart = self.cart.lock().await;
        f(&mut cart)
    }

    pub async fn totals(&self) -> CartTotals {
        self.with_cart(|cart| CartTotals::from(cart)).await
    }

    pub async fn snapshot(&self) -> Cart {
        self.with_cart(|cart| cart.clone()).await
    }
}

impl Default for CartState {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Pipeline
// =============================================================================

#[derive(Clone)]
pub struct CartPipeline {
    cache: InventoryCache,
    cart: CartState,
    feedback: Arc<dyn FeedbackEmitter>,
    reconciler: Reconciler,
}

impl CartPipeline {
    pub fn new(cache: InventoryCache, cart: CartState, feedback: Arc<dyn FeedbackEmitter>) -> Self {
        CartPipeline {
            cache,
            cart,
            feedback,
            reconciler: Reconciler::new(),
        }
    }

    /// Reconciles one scan and reports the outcome.
    ///
    /// Without a trusted index for the active store every scan is a lookup
    /// miss.
    pub async fn process(&self, event: &ScanEvent) -> ScanResult<Acknowledgment> {
        let outcome = match self.cache.index().await {
            Some(index) => {
                self.cart
                    .with_cart_mut(|cart| {
                        self.reconciler
                            .reconcile(&event.barcode, index.as_ref(), cart)
                    })
                    .await
            }
            None => {
                debug!(barcode = %event.barcode, "No catalog loaded for active store");
                Err(ScanRejection::NotFound {
                    barcode: event.barcode.clone(),
                })
            }
        };

        match &outcome {
            Ok(ack) => {
                info!(
                    barcode = %event.barcode,
                    source = %event.source,
                    product_id = %ack.product_id,
                    quantity = ack.quantity,
                    "Scan added to cart"
                );
                self.feedback.acknowledged(event, ack);
            }
            Err(rejection) => {
                info!(
                    barcode = %event.barcode,
                    source = %event.source,
                    reason = rejection.code(),
                    "Scan rejected: {}",
                    rejection
                );
                self.feedback.rejected(event, rejection);
            }
        }
        outcome
    }

    /// Drains `events` until every sender is gone or `shutdown` fires.
    ///
    /// On shutdown the channel is closed and scans already queued are still
    /// reconciled.
    pub async fn run(
        self,
        mut events: mpsc::UnboundedReceiver<ScanEvent>,
        mut shutdown: oneshot::Receiver<()>,
    ) {
        info!("Cart pipeline started");
        let mut processed = 0u64;
        let mut closing = false;

        loop {
            tokio::select! {
                biased;

                event = events.recv() => match event {
                    Some(event) => {
                        let _ = self.process(&event).await;
                        processed += 1;
                    }
                    None => break,
                },

                _ = &mut shutdown, if !closing => {
                    debug!("Cart pipeline closing");
                    closing = true;
                    events.close();
                }
            }
        }
        info!(processed, "Cart pipeline stopped");
    }

    /// Spawns [`run`](Self::run) on the current runtime.
    pub fn spawn(self, events: mpsc::UnboundedReceiver<ScanEvent>) -> PipelineHandle {
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let task = tokio::spawn(self.run(events, shutdown_rx));
        PipelineHandle {
            shutdown: shutdown_tx,
            task,
        }
    }

    /// Re-applies the active index's stock to the cart and reports lines
    /// that ended up above it.
    pub async fn apply_refreshed_stock(&self) -> Vec<CartLine> {
        let Some(index) = self.cache.index().await else {
            return Vec::new();
        };
        let flagged = self
            .cart
            .with_cart_mut(|cart| self.reconciler.apply_refreshed_stock(index.as_ref(), cart))
            .await;

        if !flagged.is_empty() {
            for line in &flagged {
                warn!(
                    product_id = %line.product_id,
                    quantity = line.quantity,
                    available = line.available_stock_snapshot,
                    "Cart line exceeds refreshed stock"
                );
            }
            self.feedback.stock_changed(&flagged);
        }
        flagged
    }

    pub fn cart(&self) -> &CartState {
        &self.cart
    }

    pub fn reconciler(&self) -> &Reconciler {
        &self.reconciler
    }
}

/// Handle to a spawned pipeline.
pub struct PipelineHandle {
    shutdown: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl PipelineHandle {
    /// Closes the channel, lets queued scans finish, and waits for the task.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(());
        if let Err(err) = self.task.await {
            warn!(error = %err, "Cart pipeline ended abnormally");
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
