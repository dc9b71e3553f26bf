//! Destination publish adapters for Crier.
//!
//! Each adapter turns `(destination id, text, optional media URL)` into a
//! published post and a canonical link to it. Failures come back as values;
//! the dispatcher records them per destination and never lets one
//! destination's failure reach another.

mod error;
mod media;
mod ok;
mod telegram;
mod vk;

pub use error::PublishError;
pub use ok::OkPublisher;
pub use telegram::TelegramPublisher;
pub use vk::VkPublisher;

use async_trait::async_trait;

/// Capability interface implemented by every destination adapter.
#[async_trait]
pub trait Publisher: Send + Sync {
    /// Publish `text` (plus the image at `media_url`, when present) to the
    /// destination identified by `external_id`, returning a canonical link
    /// to the resulting post.
    async fn publish(
        &self,
        external_id: &str,
        text: &str,
        media_url: Option<&str>,
    ) -> Result<String, PublishError>;
}
