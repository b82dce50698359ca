//! Console host adapters: feedback on stdout and the camera stand-in for
//! terminals without one.

use async_trait::async_trait;
use scanline_core::{Acknowledgment, CartLine, ChecksumWarning, ScanEvent, ScanRejection};
use scanline_runtime::{Decoder, DecoderError, DecoderStream, FeedbackEmitter};

/// Prints scan outcomes for the operator.
pub struct ConsoleFeedback;

impl FeedbackEmitter for ConsoleFeedback {
    fn acknowledged(&self, _event: &ScanEvent, ack: &Acknowledgment) {
        println!("✓ {} × {} @ {}", ack.quantity, ack.name, ack.unit_price);
    }

    fn rejected(&self, event: &ScanEvent, rejection: &ScanRejection) {
        println!("✗ {} [{}]", rejection, event.barcode);
    }

    fn warning(&self, warning: &ChecksumWarning) {
        println!("⚠ {}", warning);
    }

    fn stock_changed(&self, flagged: &[CartLine]) {
        for line in flagged {
            println!(
                "⚠ {} exceeds stock: {} in cart, {} available",
                line.name, line.quantity, line.available_stock_snapshot
            );
        }
    }
}

/// Camera decoder for terminals with no camera attached. Every start fails
/// with `DeviceUnavailable`, which leaves the session in its error state
/// until the operator switches to manual entry.
pub struct NoCamera;

#[async_trait]
impl Decoder for NoCamera {
    async fn start(&self, mount_point: &str) -> Result<DecoderStream, DecoderError> {
        Err(DecoderError::DeviceUnavailable(format!(
            "no camera attached for {}",
            mount_point
        )))
    }

    async fn stop(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_no_camera_is_retryable_unavailable() {
        let err = NoCamera.start("scanner-viewport").await.unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(
            err.to_string(),
            "camera unavailable: no camera attached for scanner-viewport"
        );
    }
}
