//! # Runtime Error Types
//!
//! Error types for the async scan runtime.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Runtime Error Categories                           │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────┐ │
//! │  │  Configuration  │  │   Catalog       │  │     Camera              │ │
//! │  │                 │  │                 │  │                         │ │
//! │  │  ConfigError    │  │  FetchError     │  │  DecoderError           │ │
//! │  │  InvalidValue   │  │  CacheError     │  │  SessionError           │ │
//! │  │  Load / Save    │  │                 │  │                         │ │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────────────┘ │
//! │                                                                         │
//! │  ScanError wraps all of them (plus core validation/cart errors) for     │
//! │  callers that do not care which layer failed.                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Catalog and camera errors are `Clone`: a coalesced refresh hands the same
//! failure to every waiting caller, and a session error is also published on
//! the state channel.

use scanline_core::{CoreError, ValidationError};
use scanline_db::DbError;
use thiserror::Error;

/// Result type alias for runtime operations.
pub type ScanRuntimeResult<T> = Result<T, ScanError>;

/// Result type alias for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;

/// Result type alias for session operations.
pub type SessionResult<T> = Result<T, SessionError>;

// =============================================================================
// Scan Error
// =============================================================================

/// Top-level runtime error.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error(transparent)]
    Session(#[from] SessionError),

    /// Manual input rejected before becoming a scan.
    #[error("Invalid input: {0}")]
    Validation(#[from] ValidationError),

    /// Operator cart edit rejected.
    #[error(transparent)]
    Cart(#[from] CoreError),

    /// The cart pipeline is gone (controller torn down).
    #[error("Scan pipeline is closed")]
    PipelineClosed,

    /// No store has been activated yet.
    #[error("No active store")]
    NoActiveStore,
}

impl From<toml::de::Error> for ScanError {
    fn from(err: toml::de::Error) -> Self {
        ScanError::Config(err.into())
    }
}

impl ScanError {
    /// Returns true if the same operation may succeed if tried again.
    pub fn is_retryable(&self) -> bool {
        match self {
            ScanError::Cache(err) => err.is_retryable(),
            ScanError::Session(err) => err.is_retryable(),
            _ => false,
        }
    }

    /// Returns true for operator-facing outcomes that are part of normal
    /// operation (bad keypad input, cart rule violations).
    pub fn is_expected(&self) -> bool {
        matches!(self, ScanError::Validation(_) | ScanError::Cart(_))
    }
}

// =============================================================================
// Configuration Errors
// =============================================================================

/// Configuration load/validate/save failures.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A value failed validation.
    #[error("Invalid {key}: {message}")]
    InvalidValue { key: String, message: String },

    /// Failed to read or parse the config file.
    #[error("Failed to load config: {0}")]
    LoadFailed(String),

    /// Failed to write the config file.
    #[error("Failed to save config: {0}")]
    SaveFailed(String),
}

impl ConfigError {
    pub fn invalid(key: impl Into<String>, message: impl Into<String>) -> Self {
        ConfigError::InvalidValue {
            key: key.into(),
            message: message.into(),
        }
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        ConfigError::LoadFailed(err.to_string())
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        ConfigError::LoadFailed(err.to_string())
    }
}

impl From<toml::ser::Error> for ConfigError {
    fn from(err: toml::ser::Error) -> Self {
        ConfigError::SaveFailed(err.to_string())
    }
}

// =============================================================================
// Catalog Errors
// =============================================================================

/// Failure reported by a catalog source.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// The source could not be reached (network down, database locked).
    #[error("catalog source unavailable: {0}")]
    Unavailable(String),

    /// The source answered but the request failed.
    #[error("catalog fetch failed: {0}")]
    Failed(String),
}

impl FetchError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, FetchError::Unavailable(_))
    }
}

impl From<DbError> for FetchError {
    fn from(err: DbError) -> Self {
        if err.is_retryable() {
            FetchError::Unavailable(err.to_string())
        } else {
            FetchError::Failed(err.to_string())
        }
    }
}

/// Inventory cache failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CacheError {
    /// The catalog fetch failed. The previous index stays in place.
    #[error("refresh of store {store_id} failed: {source}")]
    Fetch {
        store_id: String,
        #[source]
        source: FetchError,
    },
}

impl CacheError {
    pub fn is_retryable(&self) -> bool {
        match self {
            CacheError::Fetch { source, .. } => source.is_retryable(),
        }
    }
}

// =============================================================================
// Camera Errors
// =============================================================================

/// Failures reported by the barcode decoder.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecoderError {
    /// The operator or OS denied camera access.
    #[error("camera permission denied")]
    PermissionDenied,

    /// No usable camera (missing, busy, mount point not found).
    #[error("camera unavailable: {0}")]
    DeviceUnavailable(String),

    /// The camera went away while sampling.
    #[error("camera lost: {0}")]
    DeviceLost(String),

    #[error("decoder failure: {0}")]
    Other(String),
}

impl DecoderError {
    /// Busy or unplugged cameras can come back; a denied permission will not
    /// without operator action.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            DecoderError::DeviceUnavailable(_) | DecoderError::DeviceLost(_)
        )
    }
}

/// Scan session failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error(transparent)]
    Decoder(#[from] DecoderError),

    /// `stop()` ran while the decoder was still being acquired.
    #[error("camera start cancelled by stop")]
    Cancelled,
}

impl SessionError {
    pub fn is_retryable(&self) -> bool {
        match self {
            SessionError::Decoder(err) => err.is_retryable(),
            SessionError::Cancelled => true,
        }
    }
}
