//! # Share Link
//!
//! Sends a signed file's verification link to a recipient through the host's
//! [`Notifier`]. Delivery is best-effort and never touches the signature.

use tracing::instrument;

use crate::endpoint::Endpoint;
use crate::provider::{Notifier, Provider};
use crate::{registry, Error, Result};

impl<P: Provider> Endpoint<P> {
    /// Send the verification link for a signed file to `recipient`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidRequest` for an empty recipient, `FileNotFound` for an
    /// unknown file, `NotSigned` if the file is not signed, and
    /// `DeliveryFailed` if the notifier fails.
    #[instrument(level = "debug", skip(self))]
    pub async fn send_link(&self, file_id: &str, recipient: &str, base_url: &str) -> Result<()> {
        tracing::debug!("send_link::verify");

        let recipient = recipient.trim();
        if recipient.is_empty() {
            return Err(Error::InvalidRequest("no recipient".into()));
        }
        let record = registry::require(&self.provider, file_id).await?;
        if record.signature().is_none() {
            return Err(Error::NotSigned(format!("file {file_id} is not signed")));
        }

        tracing::debug!("send_link::process");

        let message = format!(
            "You have received a signed file: {}. Verify and download it here: {}/verify/{}",
            record.original_name,
            base_url.trim_end_matches('/'),
            record.id
        );
        Notifier::notify(&self.provider, recipient, &message).await.map_err(|e| {
            tracing::warn!("link for {file_id} not delivered: {e}");
            Error::DeliveryFailed(e.to_string())
        })
    }
}
