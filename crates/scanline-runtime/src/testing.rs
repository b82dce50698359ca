//! In-test collaborators: a table-backed catalog source, a scripted camera
//! decoder and a feedback recorder.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use scanline_core::{
    Acknowledgment, CartLine, CatalogEntry, ChecksumWarning, Money, ScanEvent, ScanRejection,
};
use tokio::sync::{mpsc, Notify};

use crate::catalog::CatalogFetcher;
use crate::error::{DecoderError, FetchError};
use crate::pipeline::FeedbackEmitter;
use crate::session::{Decoder, DecoderSignal, DecoderStream};

pub fn entry(id: &str, barcode: &str, stock: i64, price_cents: i64) -> CatalogEntry {
    CatalogEntry {
        product_id: id.to_string(),
        name: format!("Product {}", id),
        sku: format!("SKU-{}", id),
        buying_price: Money::from_cents(price_cents / 2),
        selling_price: Money::from_cents(price_cents),
        available_stock: stock,
        barcodes: vec![barcode.to_string()],
    }
}

// =============================================================================
// Catalog
// =============================================================================

#[derive(Default)]
pub struct StaticFetcher {
    catalogs: Mutex<HashMap<String, Vec<CatalogEntry>>>,
    calls: AtomicUsize,
    failure: Mutex<Option<FetchError>>,
}

impl StaticFetcher {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn stock(&self, store: &str, entries: Vec<CatalogEntry>) {
        self.catalogs
            .lock()
            .unwrap()
            .insert(store.to_string(), entries);
    }

    pub fn fail_with(&self, failure: Option<FetchError>) {
        *self.failure.lock().unwrap() = failure;
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CatalogFetcher for StaticFetcher {
    async fn fetch_catalog(&self, store_id: &str) -> Result<Vec<CatalogEntry>, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.failure.lock().unwrap().clone() {
            return Err(err);
        }
        Ok(self
            .catalogs
            .lock()
            .unwrap()
            .get(store_id)
            .cloned()
            .unwrap_or_default())
    }
}

// =============================================================================
// Decoder
// =============================================================================

#[derive(Default)]
pub struct FakeDecoder {
    starts: AtomicUsize,
    stops: AtomicUsize,
    feed: Mutex<Option<mpsc::Sender<DecoderSignal>>>,
    fail_start: Mutex<Option<DecoderError>>,
    gate: Option<Arc<Notify>>,
}

impl FakeDecoder {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// A decoder whose `start` waits for `gate` before acquiring.
    pub fn gated(gate: Arc<Notify>) -> Arc<Self> {
        Arc::new(FakeDecoder {
            gate: Some(gate),
            ..Default::default()
        })
    }

    /// Sender feeding the most recently started stream.
    pub fn feed(&self) -> mpsc::Sender<DecoderSignal> {
        self.feed
            .lock()
            .unwrap()
            .clone()
            .expect("decoder not started")
    }

    pub fn fail_start(&self, err: Option<DecoderError>) {
        *self.fail_start.lock().unwrap() = err;
    }

    pub fn starts(&self) -> usize {
        self.starts.load(Ordering::SeqCst)
    }

    pub fn stops(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Decoder for FakeDecoder {
    async fn start(&self, _mount_point: &str) -> Result<DecoderStream, DecoderError> {
        self.starts.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        if let Some(err) = self.fail_start.lock().unwrap().clone() {
            return Err(err);
        }
        let (tx, rx) = mpsc::channel(16);
        *self.feed.lock().unwrap() = Some(tx);
        Ok(rx)
    }

    async fn stop(&self) {
        self.stops.fetch_add(1, Ordering::SeqCst);
    }
}

// =============================================================================
// Feedback
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Feedback {
    Acknowledged { barcode: String, quantity: i64 },
    Rejected { barcode: String, code: &'static str },
    Warning(String),
    StockChanged(Vec<String>),
}

#[derive(Default)]
pub struct RecordingFeedback {
    records: Mutex<Vec<Feedback>>,
}

impl RecordingFeedback {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn records(&self) -> Vec<Feedback> {
        self.records.lock().unwrap().clone()
    }

    fn push(&self, record: Feedback) {
        self.records.lock().unwrap().push(record);
    }
}

impl FeedbackEmitter for RecordingFeedback {
    fn acknowledged(&self, event: &ScanEvent, ack: &Acknowledgment) {
        self.push(Feedback::Acknowledged {
            barcode: event.barcode.clone(),
            quantity: ack.quantity,
        });
    }

    fn rejected(&self, event: &ScanEvent, rejection: &ScanRejection) {
        self.push(Feedback::Rejected {
            barcode: event.barcode.clone(),
            code: rejection.code(),
        });
    }

    fn warning(&self, warning: &ChecksumWarning) {
        self.push(Feedback::Warning(warning.barcode.clone()));
    }

    fn stock_changed(&self, flagged: &[CartLine]) {
        self.push(Feedback::StockChanged(
            flagged.iter().map(|l| l.product_id.clone()).collect(),
        ));
    }
}
