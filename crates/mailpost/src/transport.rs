//! The pluggable delivery capability.

use std::any::Any;

use async_trait::async_trait;
use mailpost_message::Email;
use tracing::debug;

use crate::error::Result;

/// A delivery backend.
///
/// The trait itself is the never-instantiated base of the backend family:
/// concrete variants are the SMTP transport and the in-memory capture
/// transport, and applications may register their own.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Delivers the message, surfacing any failure.
    async fn send(&self, email: &mut Email) -> Result<()>;

    /// Delivers the message, absorbing delivery failures.
    ///
    /// Only the delivery class is swallowed; validation and configuration
    /// errors are the caller's to fix and still propagate.
    async fn send_quiet(&self, email: &mut Email) -> Result<()> {
        match self.send(email).await {
            Err(err) if err.is_delivery() => {
                debug!(error = %err, "delivery failure absorbed");
                Ok(())
            }
            other => other,
        }
    }

    /// Backend identifier, mostly for logs.
    fn name(&self) -> &'static str;

    /// Escape hatch for tests that need the concrete transport back.
    fn as_any(&self) -> &dyn Any;
}
