//! # Configuration
//!
//! Settings for an [`Endpoint`](crate::Endpoint). Defaults are suitable for
//! local development; deployments override them through [`ConfigBuilder`].

use chrono::TimeDelta;
use derive_builder::Builder;
use serde::{Deserialize, Serialize};

/// Default lifetimes used by the signing lifecycle.
pub enum Expire {
    /// A presentation request (session).
    Session,

    /// An uploaded file and any terminal session.
    Retention,

    /// A signature proof.
    Signature,
}

impl Expire {
    /// The default duration.
    #[must_use]
    pub fn duration(&self) -> TimeDelta {
        match self {
            Self::Session => TimeDelta::try_minutes(5).unwrap_or_default(),
            Self::Retention | Self::Signature => TimeDelta::try_hours(24).unwrap_or_default(),
        }
    }
}

/// Default upload limit (100 MB).
pub const MAX_UPLOAD_BYTES: u64 = 100 * 1024 * 1024;

/// Service configuration.
#[derive(Builder, Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[builder(default)]
pub struct Config {
    /// Verifier identifier sent to the Wallet as `client_id`.
    #[builder(setter(into))]
    pub client_id: String,

    /// URI the Wallet posts its response to (`direct_post`).
    #[builder(setter(into))]
    pub response_uri: String,

    /// Base URI the Wallet fetches Request Objects from. The request for a
    /// session is served at `{request_uri_base}/request/{state}`.
    #[builder(setter(into))]
    pub request_uri_base: String,

    /// Scheme and path used to invoke the Wallet, e.g.
    /// `openid4vp://authorize`.
    #[builder(setter(into))]
    pub wallet_scheme: String,

    /// Credential type the presentation must contain.
    #[builder(setter(into))]
    pub credential_type: String,

    /// How long a presentation request remains answerable.
    #[serde(with = "seconds")]
    pub session_ttl: TimeDelta,

    /// How long files, and terminal sessions, are kept.
    #[serde(with = "seconds")]
    pub retention: TimeDelta,

    /// Validity period of a signature proof.
    #[serde(with = "seconds")]
    pub signature_validity: TimeDelta,

    /// Largest accepted upload, in bytes.
    pub max_upload_bytes: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            client_id: "http://localhost:8080".to_string(),
            response_uri: "http://localhost:8080/callback".to_string(),
            request_uri_base: "http://localhost:8080".to_string(),
            wallet_scheme: "openid4vp://authorize".to_string(),
            credential_type: "SwissEID".to_string(),
            session_ttl: Expire::Session.duration(),
            retention: Expire::Retention.duration(),
            signature_validity: Expire::Signature.duration(),
            max_upload_bytes: MAX_UPLOAD_BYTES,
        }
    }
}

impl Config {
    /// Returns a new [`ConfigBuilder`] seeded with the defaults.
    #[must_use]
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }
}

/// Serialize durations as whole seconds.
mod seconds {
    use chrono::TimeDelta;
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(delta: &TimeDelta, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i64(delta.num_seconds())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<TimeDelta, D::Error> {
        let secs = i64::deserialize(deserializer)?;
        TimeDelta::try_seconds(secs).ok_or_else(|| D::Error::custom("duration out of range"))
    }
}
