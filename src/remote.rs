//! Remote object store RPC interface
//!
//! Wire contract for the cloud side: paginated recursive folder listing
//! with opaque resume cursors, chunked upload sessions, and batched
//! finish/delete endpoints that may complete synchronously or hand back an
//! async job id to poll. The sync engine depends only on this trait; the
//! host application supplies the real HTTP client.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::ApiError;
use crate::types::RemoteFile;

/// Upload chunk size. Must be a multiple of the server-mandated 4 MiB
/// granularity; chunk calls at other offsets are rejected.
pub const UPLOAD_CHUNK_SIZE: usize = 4 * 1024 * 1024;

/// Page size for the initial recursive listing
pub const LIST_PAGE_LIMIT: u32 = 2000;

/// Metadata for one present file in a listing page or commit result
#[derive(Debug, Clone, PartialEq)]
pub struct FileMetadata {
	pub remote_id: String,
	pub path_lower: String,
	pub revision: String,
	pub content_hash: String,
	pub server_modified: Option<DateTime<Utc>>,
}

impl From<FileMetadata> for RemoteFile {
	fn from(m: FileMetadata) -> Self {
		RemoteFile {
			remote_id: m.remote_id,
			path_lower: m.path_lower,
			revision: m.revision,
			content_hash: m.content_hash,
			modified_at: m.server_modified,
		}
	}
}

/// One entry in a listing page
#[derive(Debug, Clone)]
pub enum ListEntry {
	File(FileMetadata),

	/// The object at this path no longer exists remotely
	Deleted { path_lower: String },
}

/// A page of the recursive folder listing
#[derive(Debug, Clone)]
pub struct ListFolderPage {
	pub entries: Vec<ListEntry>,
	pub cursor: String,
	pub has_more: bool,
}

/// Commit argument for one completed upload session
#[derive(Debug, Clone)]
pub struct FinishEntry {
	pub session_id: String,

	/// Total bytes uploaded through the session
	pub offset: u64,

	/// Destination path; commits always overwrite, this store is
	/// single-owner
	pub path: String,

	/// The original asset's timestamp, recorded as the object's
	/// modification time
	pub client_modified: Option<DateTime<Utc>>,

	/// Whole-payload content hash for final server-side verification
	pub content_hash: String,
}

/// Per-entry result of a batch commit, in submission order
#[derive(Debug, Clone)]
pub enum FinishResult {
	Success(FileMetadata),
	Failure { path: String, message: String },
}

/// Batch commit response: synchronous results or a job to poll
#[derive(Debug, Clone)]
pub enum FinishBatchLaunch {
	Complete(Vec<FinishResult>),
	AsyncJob(String),
}

#[derive(Debug, Clone)]
pub enum FinishBatchStatus {
	InProgress,
	Complete(Vec<FinishResult>),
	Failed(String),
}

/// One entry in a batch delete
#[derive(Debug, Clone)]
pub struct DeleteEntry {
	pub path_lower: String,
	pub expected_revision: String,
}

#[derive(Debug, Clone)]
pub enum DeleteResult {
	Success { path_lower: String },
	Failure { path: String, message: String },
}

#[derive(Debug, Clone)]
pub enum DeleteBatchLaunch {
	Complete(Vec<DeleteResult>),
	AsyncJob(String),
}

#[derive(Debug, Clone)]
pub enum DeleteBatchStatus {
	InProgress,
	Complete(Vec<DeleteResult>),
	Failed(String),
}

/// The remote object store RPC client
#[async_trait]
pub trait RemoteStore: Send + Sync {
	/// Initial listing call. `path` "" is the root of the app folder, not
	/// the whole store.
	async fn list_folder(
		&self,
		path: &str,
		recursive: bool,
		include_deleted: bool,
		limit: u32,
	) -> Result<ListFolderPage, ApiError>;

	/// Continuation call from a previously returned cursor
	async fn list_folder_continue(&self, cursor: &str) -> Result<ListFolderPage, ApiError>;

	/// Open an upload session with the first chunk. `close` when this
	/// chunk is also the last. Returns the session id.
	async fn upload_session_start(
		&self,
		close: bool,
		content_hash: &str,
		data: Vec<u8>,
	) -> Result<String, ApiError>;

	/// Append a chunk at `offset`; `close` on the final chunk. Each call
	/// carries that chunk's own content hash for verification.
	async fn upload_session_append(
		&self,
		session_id: &str,
		offset: u64,
		close: bool,
		content_hash: &str,
		data: Vec<u8>,
	) -> Result<(), ApiError>;

	/// Commit every completed session in one call. The server returns
	/// exactly one result per entry, in the same order.
	async fn upload_session_finish_batch(
		&self,
		entries: Vec<FinishEntry>,
	) -> Result<FinishBatchLaunch, ApiError>;

	async fn upload_session_finish_batch_check(
		&self,
		job_id: &str,
	) -> Result<FinishBatchStatus, ApiError>;

	/// Delete a batch of remote objects
	async fn delete_batch(
		&self,
		entries: Vec<DeleteEntry>,
	) -> Result<DeleteBatchLaunch, ApiError>;

	async fn delete_batch_check(&self, job_id: &str) -> Result<DeleteBatchStatus, ApiError>;
}

// vim: ts=4
