//! # scanline-runtime: Async Scan Runtime for Scanline POS
//!
//! The parts of scan-to-cart that wait on something: catalog refreshes,
//! camera acquisition, and the ordered cart pipeline.
//!
//! ## Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   Decoder ──► ScanSession ──┐                                           │
//! │               (cooldown)    │                                           │
//! │                             ├──► mpsc<ScanEvent> ──► CartPipeline       │
//! │   keypad ──► ManualEntryGate┘                            │              │
//! │                                                          ▼              │
//! │   CatalogFetcher ──► InventoryCache ──► BarcodeIndex ──► Reconciler     │
//! │   (SQLite)           (single-flight)                     │              │
//! │                                                          ▼              │
//! │                                               Cart + FeedbackEmitter    │
//! │                                                                         │
//! │   ScannerController owns all of the above and reacts to mode/store      │
//! │   changes from the host.                                                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`cache`] - Per-store barcode cache with single-flight refresh
//! - [`catalog`] - Catalog source trait and the SQLite implementation
//! - [`config`] - Scanner configuration (TOML file + environment)
//! - [`controller`] - Mode/store controller and lifecycle
//! - [`error`] - Runtime error types
//! - [`pipeline`] - Ordered scan-to-cart consumer and feedback seam
//! - [`session`] - Camera decoder state machine with cooldown
//!
//! ## Usage
//!
//! ```rust,ignore
//! use scanline_runtime::{ScannerConfig, ScannerController, SqliteCatalog};
//!
//! let config = ScannerConfig::load_or_default(None);
//! let controller = ScannerController::builder(config.clone())
//!     .with_fetcher(Arc::new(SqliteCatalog::new(db)))
//!     .with_decoder(camera)
//!     .build()?;
//!
//! controller.activate(config.store_id()).await?;
//! controller.submit_manual("4006381333931").await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod cache;
pub mod catalog;
pub mod config;
pub mod controller;
pub mod error;
pub mod pipeline;
pub mod session;

#[cfg(test)]
pub(crate) mod testing;

// =============================================================================
// Re-exports
// =============================================================================

pub use cache::{CacheStatus, InventoryCache};
pub use catalog::{CatalogFetcher, SqliteCatalog};
pub use config::ScannerConfig;
pub use controller::{ScannerController, ScannerControllerBuilder};
pub use error::{
    CacheError, CacheResult, ConfigError, DecoderError, FetchError, ScanError, ScanRuntimeResult,
    SessionError, SessionResult,
};
pub use pipeline::{CartPipeline, CartState, FeedbackEmitter, NoOpFeedback, PipelineHandle};
pub use session::{
    Decoder, DecoderSignal, DecoderStream, ScanSession, SessionConfig, SessionState,
};
