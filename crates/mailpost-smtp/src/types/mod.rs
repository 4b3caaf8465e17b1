//! Core SMTP types.

mod envelope;
mod extension;
mod reply;

pub use envelope::EnvelopeAddress;
pub use extension::{AuthMechanism, Extension};
pub use reply::{Reply, ReplyCode};
