//! # Data Model
//!
//! Records persisted through the [`StateStore`](crate::provider::StateStore):
//! file records (with their signature, when signed) and the short-lived
//! sessions correlating a presentation request with its response.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::hash::{Digest, HashAlgorithm};
use crate::jose::Algorithm;

/// Version of the signature suite written into new records.
pub const SUITE_VERSION: &str = "1";

/// Metadata and lifecycle state for an uploaded file.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct FileRecord {
    /// Opaque file identifier (UUID v4), immutable after upload.
    pub id: String,

    /// File name as supplied by the uploader, after sanitization.
    pub original_name: String,

    /// Blob store handle for the file bytes.
    pub stored_path: String,

    /// Size of the file in bytes.
    pub size_bytes: u64,

    /// When the file was uploaded.
    pub uploaded_at: DateTime<Utc>,

    /// Digest of the bytes at upload.
    pub content_hash: Digest,

    /// Lifecycle status.
    pub status: FileStatus,

    /// Signatures replaced by a later supersession, oldest first.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub history: Vec<SupersededSignature>,
}

impl FileRecord {
    /// The current signature, if the file is signed.
    #[must_use]
    pub fn signature(&self) -> Option<&SignatureRecord> {
        match &self.status {
            FileStatus::Signed { signature } => Some(signature),
            _ => None,
        }
    }

    /// Whether the file has outlived the retention window at `now`.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>, retention: chrono::TimeDelta) -> bool {
        now - self.uploaded_at > retention
    }
}

/// File lifecycle status. Transitions only move forward:
/// `Uploaded` → `AwaitingPresentation` → `Signed`, and any state → `Expired`.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FileStatus {
    /// Uploaded, no presentation requested yet.
    #[default]
    Uploaded,

    /// A presentation request has been issued for the file.
    AwaitingPresentation,

    /// The file has been signed.
    Signed {
        /// The current signature.
        signature: SignatureRecord,
    },

    /// The file has passed its retention window and is being removed.
    Expired,
}

impl FileStatus {
    /// Short, stable name for the status.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Uploaded => "uploaded",
            Self::AwaitingPresentation => "awaiting_presentation",
            Self::Signed { .. } => "signed",
            Self::Expired => "expired",
        }
    }
}

/// Identifies the algorithms used to produce a signature record.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct Suite {
    /// Content hash algorithm.
    pub hash: HashAlgorithm,

    /// Proof (JWS) algorithm.
    pub proof: Algorithm,

    /// Suite version.
    pub version: String,
}

/// A signature binding a verified holder to a file's content hash.
/// Immutable once written.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct SignatureRecord {
    /// Signature identifier, used as the proof's `jti`.
    pub id: String,

    /// Holder identifier asserted by the verified presentation.
    pub holder: String,

    /// Digest of the file bytes at signing.
    pub content_hash: Digest,

    /// Algorithms used.
    pub suite: Suite,

    /// When the signature was produced.
    pub issued_at: DateTime<Utc>,

    /// When the proof stops being valid.
    pub expires_at: DateTime<Utc>,

    /// Token of the verified session that authorized the signature.
    pub session: String,

    /// Compact JWS over the signature claims.
    pub proof: String,
}

/// A signature replaced by a later one.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct SupersededSignature {
    /// The replaced signature.
    pub signature: SignatureRecord,

    /// When it was replaced.
    pub superseded_at: DateTime<Utc>,
}

/// Correlation state for a single presentation request.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct Session {
    /// Correlation token, sent to the Wallet as `state`.
    pub token: String,

    /// Anti-replay nonce the presentation must echo.
    pub nonce: String,

    /// File the presentation authorizes signing.
    pub file_id: String,

    /// Id of the Presentation Definition issued.
    pub definition_id: String,

    /// When the session was created.
    pub created_at: DateTime<Utc>,

    /// When the session stops accepting presentations.
    pub expires_at: DateTime<Utc>,

    /// Session status.
    pub status: SessionStatus,
}

impl Session {
    /// Whether the session window has closed at `now`.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    /// The holder, if the session has been verified.
    #[must_use]
    pub fn holder(&self) -> Option<&str> {
        match &self.status {
            SessionStatus::Verified { holder, .. } => Some(holder.as_str()),
            _ => None,
        }
    }
}

/// Session status. Every status other than `Pending` is terminal.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SessionStatus {
    /// Waiting for the Wallet's response.
    #[default]
    Pending,

    /// A presentation was accepted.
    Verified {
        /// When the presentation was accepted.
        verified_at: DateTime<Utc>,

        /// Holder identifier asserted by the presentation.
        holder: String,

        /// Signature produced on the strength of this session, once written.
        #[serde(skip_serializing_if = "Option::is_none")]
        signature_id: Option<String>,
    },

    /// The session window closed before a presentation was accepted.
    Expired,

    /// The presentation was refused.
    Rejected {
        /// Why the presentation was refused.
        reason: String,
    },
}

impl SessionStatus {
    /// Short, stable name for the status.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Verified { .. } => "verified",
            Self::Expired => "expired",
            Self::Rejected { .. } => "rejected",
        }
    }
}
