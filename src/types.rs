//! Persisted index records and transient task types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One record per device photo or video, mirrored into the local index
/// by the local snapshot pass. The device is the source of truth for
/// content; this record caches what is expensive to recompute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocalAsset {
	/// Opaque stable identifier from the asset library (unique key)
	#[serde(rename = "id")]
	pub asset_id: String,

	#[serde(rename = "cr")]
	pub created_at: Option<DateTime<Utc>>,

	#[serde(rename = "md")]
	pub modified_at: Option<DateTime<Utc>>,

	/// Native filename, cached once per modification epoch
	#[serde(rename = "fn")]
	pub filename: String,

	/// Deterministic upload destination, cleared whenever `modified_at`
	/// changes and lazily recomputed by the collision-resolution pass
	#[serde(rename = "pth")]
	pub assigned_path: Option<String>,

	/// Last-known content digest; None until the asset has been read once,
	/// cleared whenever `modified_at` changes
	#[serde(rename = "ch")]
	pub content_hash: Option<String>,

	/// Remote linkage, set by the upload orchestrator after a successful
	/// batch commit
	#[serde(rename = "rid")]
	pub remote_id: Option<String>,

	#[serde(rename = "rev")]
	pub remote_rev: Option<String>,

	/// Generation marker of the last local snapshot pass that saw this
	/// asset on the device; used by the deletion sweep
	#[serde(rename = "run")]
	pub sync_run: Option<String>,
}

impl LocalAsset {
	pub fn new(asset_id: &str, filename: &str) -> Self {
		LocalAsset {
			asset_id: asset_id.to_string(),
			created_at: None,
			modified_at: None,
			filename: filename.to_string(),
			assigned_path: None,
			content_hash: None,
			remote_id: None,
			remote_rev: None,
			sync_run: None,
		}
	}
}

/// One record per object in the cloud store, mirrored into the local
/// index by the remote snapshot pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteFile {
	#[serde(rename = "rid")]
	pub remote_id: String,

	/// Case-folded path (unique key)
	#[serde(rename = "pl")]
	pub path_lower: String,

	/// Opaque change token
	#[serde(rename = "rev")]
	pub revision: String,

	#[serde(rename = "ch")]
	pub content_hash: String,

	#[serde(rename = "md")]
	pub modified_at: Option<DateTime<Utc>>,
}

/// Keys for the persisted cursor table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorKind {
	/// Resume token for the paginated remote listing
	RemoteListing,
}

impl CursorKind {
	pub fn key(&self) -> &'static str {
		match self {
			CursorKind::RemoteListing => "remote-listing",
		}
	}

	/// Expected schema version. A persisted cursor with any other version
	/// is silently discarded, forcing a full re-listing.
	pub fn version(&self) -> u32 {
		match self {
			CursorKind::RemoteListing => 2,
		}
	}
}

/// How the reconciler classified an upload candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskKind {
	/// No remote file at the assigned path
	New,

	/// Remote file exists and the hashes differ
	Replacement,

	/// Remote file exists but the local hash is not yet known; must
	/// read and hash before we can be sure
	Unknown,
}

/// Transient upload work item produced by the reconciler. Never persisted.
#[derive(Debug, Clone)]
pub struct UploadTask {
	pub asset_id: String,

	/// Destination path in the remote store
	pub path: String,

	/// The object's client-modified timestamp on commit
	pub client_modified: Option<DateTime<Utc>>,

	/// Remote file's content hash if one exists at the path, for the
	/// hash-gate short circuit
	pub existing_content_hash: Option<String>,

	pub kind: TaskKind,
}

/// Transient delete work item for a remote file with no device-present
/// owner. Never persisted.
#[derive(Debug, Clone)]
pub struct DeleteTask {
	pub path_lower: String,

	/// Expected revision, so a concurrent remote change fails the delete
	pub revision: String,

	/// Device-absent local record still linked to this file, dropped
	/// only once the remote copy is confirmed gone. None for orphans
	/// with no local record at all.
	pub asset_id: Option<String>,
}

// vim: ts=4
