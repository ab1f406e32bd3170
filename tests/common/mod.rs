//! In-memory mock collaborators for integration tests
#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use photosync::asset_library::{AssetContent, AssetLibrary, AssetRef};
use photosync::cancel::CancellationToken;
use photosync::content_hash::digest_bytes;
use photosync::error::{ApiError, AssetError};
use photosync::remote::{
	DeleteBatchLaunch, DeleteBatchStatus, DeleteEntry, DeleteResult, FileMetadata,
	FinishBatchLaunch, FinishBatchStatus, FinishEntry, FinishResult, ListEntry,
	ListFolderPage, RemoteStore,
};

/// Scripted device photo library
#[derive(Default)]
pub struct MockAssetLibrary {
	assets: Mutex<Vec<AssetRef>>,
	content: Mutex<HashMap<String, Vec<u8>>>,
	fail_exports: Mutex<HashSet<String>>,
	pub export_calls: AtomicUsize,
}

impl MockAssetLibrary {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn add_asset(
		&self,
		id: &str,
		filename: &str,
		created: Option<DateTime<Utc>>,
		bytes: Vec<u8>,
	) {
		let asset = AssetRef {
			asset_id: id.to_string(),
			filename: filename.to_string(),
			created_at: created,
			modified_at: created,
			coordinate: None,
		};
		self.assets.lock().unwrap().push(asset);
		self.content.lock().unwrap().insert(id.to_string(), bytes);
	}

	pub fn remove_asset(&self, id: &str) {
		self.assets.lock().unwrap().retain(|a| a.asset_id != id);
		self.content.lock().unwrap().remove(id);
	}

	pub fn replace_content(&self, id: &str, bytes: Vec<u8>, modified: DateTime<Utc>) {
		self.content.lock().unwrap().insert(id.to_string(), bytes);
		for asset in self.assets.lock().unwrap().iter_mut() {
			if asset.asset_id == id {
				asset.modified_at = Some(modified);
			}
		}
	}

	/// Make every export of this asset fail
	pub fn fail_export(&self, id: &str) {
		self.fail_exports.lock().unwrap().insert(id.to_string());
	}
}

#[async_trait]
impl AssetLibrary for MockAssetLibrary {
	async fn list_assets(&self) -> Result<Vec<AssetRef>, AssetError> {
		Ok(self.assets.lock().unwrap().clone())
	}

	async fn export(&self, asset_id: &str, _scratch: &Path) -> Result<AssetContent, AssetError> {
		self.export_calls.fetch_add(1, Ordering::SeqCst);
		if self.fail_exports.lock().unwrap().contains(asset_id) {
			return Err(AssetError::Fetch {
				asset_id: asset_id.to_string(),
				message: "simulated export failure".to_string(),
			});
		}
		match self.content.lock().unwrap().get(asset_id) {
			Some(bytes) => Ok(AssetContent::Bytes(bytes.clone())),
			None => Err(AssetError::Fetch {
				asset_id: asset_id.to_string(),
				message: "no such asset".to_string(),
			}),
		}
	}
}

struct Session {
	data: Vec<u8>,
	closed: bool,
}

/// In-memory cloud store speaking the full RPC contract. Every mutation
/// appends to an event log; listing cursors are offsets into that log, so
/// continuations see exactly the changes since the cursor was handed out.
pub struct MockRemoteStore {
	files: Mutex<BTreeMap<String, (FileMetadata, Vec<u8>)>>,
	log: Mutex<Vec<ListEntry>>,
	sessions: Mutex<HashMap<String, Session>>,
	finish_jobs: Mutex<HashMap<String, Vec<FinishResult>>>,
	delete_jobs: Mutex<HashMap<String, Vec<DeleteResult>>>,
	next_id: AtomicUsize,
	page_size: AtomicUsize,
	async_mode: AtomicBool,
	auth_expired: AtomicBool,
	fail_continues_after: Mutex<Option<usize>>,
	fail_deletes: Mutex<HashSet<String>>,
	cancel_on_delete: Mutex<Option<CancellationToken>>,
	pub list_calls: AtomicUsize,
	pub continue_calls: AtomicUsize,
	pub start_calls: AtomicUsize,
	pub finish_calls: AtomicUsize,
	pub delete_calls: AtomicUsize,
}

impl Default for MockRemoteStore {
	fn default() -> Self {
		MockRemoteStore {
			files: Mutex::new(BTreeMap::new()),
			log: Mutex::new(Vec::new()),
			sessions: Mutex::new(HashMap::new()),
			finish_jobs: Mutex::new(HashMap::new()),
			delete_jobs: Mutex::new(HashMap::new()),
			next_id: AtomicUsize::new(0),
			page_size: AtomicUsize::new(1000),
			async_mode: AtomicBool::new(false),
			auth_expired: AtomicBool::new(false),
			fail_continues_after: Mutex::new(None),
			fail_deletes: Mutex::new(HashSet::new()),
			cancel_on_delete: Mutex::new(None),
			list_calls: AtomicUsize::new(0),
			continue_calls: AtomicUsize::new(0),
			start_calls: AtomicUsize::new(0),
			finish_calls: AtomicUsize::new(0),
			delete_calls: AtomicUsize::new(0),
		}
	}
}

impl MockRemoteStore {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn set_page_size(&self, size: usize) {
		self.page_size.store(size, Ordering::SeqCst);
	}

	/// Answer finish/delete batches with an async job id needing a poll
	pub fn set_async_mode(&self, on: bool) {
		self.async_mode.store(on, Ordering::SeqCst);
	}

	pub fn expire_auth(&self) {
		self.auth_expired.store(true, Ordering::SeqCst);
	}

	/// Fail every listing continuation after the first `n` succeed
	pub fn fail_continues_after(&self, n: usize) {
		*self.fail_continues_after.lock().unwrap() = Some(n);
	}

	/// Answer deletes of this path with a per-item failure
	pub fn fail_delete(&self, path: &str) {
		self.fail_deletes.lock().unwrap().insert(path.to_string());
	}

	/// Cancel this token from inside the next delete-batch call, as an
	/// external deadline firing while the batch is in flight would
	pub fn cancel_on_delete(&self, token: CancellationToken) {
		*self.cancel_on_delete.lock().unwrap() = Some(token);
	}

	pub fn clear_failures(&self) {
		*self.fail_continues_after.lock().unwrap() = None;
		self.fail_deletes.lock().unwrap().clear();
		self.auth_expired.store(false, Ordering::SeqCst);
	}

	/// Seed a remote file as if it had been uploaded by another client
	pub fn add_remote_file(&self, path: &str, bytes: Vec<u8>) {
		let n = self.next_id.fetch_add(1, Ordering::SeqCst);
		let metadata = FileMetadata {
			remote_id: format!("id:{}", n),
			path_lower: path.to_lowercase(),
			revision: format!("rev{}", n),
			content_hash: digest_bytes(&bytes),
			server_modified: None,
		};
		self.files.lock().unwrap().insert(metadata.path_lower.clone(), (metadata.clone(), bytes));
		self.log.lock().unwrap().push(ListEntry::File(metadata));
	}

	/// Remove a file and emit a deletion event in subsequent listings
	pub fn remove_remote_file(&self, path: &str) {
		self.files.lock().unwrap().remove(path);
		self.log.lock().unwrap().push(ListEntry::Deleted { path_lower: path.to_string() });
	}

	pub fn file_count(&self) -> usize {
		self.files.lock().unwrap().len()
	}

	pub fn has_file(&self, path: &str) -> bool {
		self.files.lock().unwrap().contains_key(path)
	}

	pub fn content_hash_of(&self, path: &str) -> Option<String> {
		self.files.lock().unwrap().get(path).map(|(m, _)| m.content_hash.clone())
	}

	fn check_auth(&self) -> Result<(), ApiError> {
		if self.auth_expired.load(Ordering::SeqCst) {
			Err(ApiError::Auth)
		} else {
			Ok(())
		}
	}

	fn page_at(&self, offset: usize) -> ListFolderPage {
		let log = self.log.lock().unwrap();
		let page_size = self.page_size.load(Ordering::SeqCst);
		let end = (offset + page_size).min(log.len());
		let page = log.get(offset..end).unwrap_or(&[]).to_vec();
		ListFolderPage {
			entries: page,
			cursor: format!("off:{}", end),
			has_more: end < log.len(),
		}
	}

	fn commit_entry(&self, entry: &FinishEntry) -> FinishResult {
		let session = self.sessions.lock().unwrap().remove(&entry.session_id);
		let session = match session {
			Some(s) => s,
			None => {
				return FinishResult::Failure {
					path: entry.path.clone(),
					message: "unknown upload session".to_string(),
				}
			}
		};
		if !session.closed || session.data.len() as u64 != entry.offset {
			return FinishResult::Failure {
				path: entry.path.clone(),
				message: "upload session offset mismatch".to_string(),
			};
		}
		let hash = digest_bytes(&session.data);
		if hash != entry.content_hash {
			return FinishResult::Failure {
				path: entry.path.clone(),
				message: "content hash verification failed".to_string(),
			};
		}
		let n = self.next_id.fetch_add(1, Ordering::SeqCst);
		let metadata = FileMetadata {
			remote_id: format!("id:{}", n),
			path_lower: entry.path.to_lowercase(),
			revision: format!("rev{}", n),
			content_hash: hash,
			server_modified: entry.client_modified,
		};
		self.files
			.lock()
			.unwrap()
			.insert(metadata.path_lower.clone(), (metadata.clone(), session.data));
		self.log.lock().unwrap().push(ListEntry::File(metadata.clone()));
		FinishResult::Success(metadata)
	}
}

#[async_trait]
impl RemoteStore for MockRemoteStore {
	async fn list_folder(
		&self,
		_path: &str,
		_recursive: bool,
		_include_deleted: bool,
		_limit: u32,
	) -> Result<ListFolderPage, ApiError> {
		self.list_calls.fetch_add(1, Ordering::SeqCst);
		self.check_auth()?;
		Ok(self.page_at(0))
	}

	async fn list_folder_continue(&self, cursor: &str) -> Result<ListFolderPage, ApiError> {
		let calls = self.continue_calls.fetch_add(1, Ordering::SeqCst) + 1;
		self.check_auth()?;
		if let Some(limit) = *self.fail_continues_after.lock().unwrap() {
			if calls > limit {
				return Err(ApiError::Transport {
					message: "simulated network failure".to_string(),
				});
			}
		}
		let offset = cursor
			.strip_prefix("off:")
			.and_then(|s| s.parse::<usize>().ok())
			.ok_or_else(|| ApiError::Protocol { message: format!("bad cursor {}", cursor) })?;
		Ok(self.page_at(offset))
	}

	async fn upload_session_start(
		&self,
		close: bool,
		content_hash: &str,
		data: Vec<u8>,
	) -> Result<String, ApiError> {
		self.start_calls.fetch_add(1, Ordering::SeqCst);
		self.check_auth()?;
		if digest_bytes(&data) != content_hash {
			return Err(ApiError::Protocol { message: "chunk hash mismatch".to_string() });
		}
		let id = format!("session-{}", self.next_id.fetch_add(1, Ordering::SeqCst));
		self.sessions.lock().unwrap().insert(id.clone(), Session { data, closed: close });
		Ok(id)
	}

	async fn upload_session_append(
		&self,
		session_id: &str,
		offset: u64,
		close: bool,
		content_hash: &str,
		data: Vec<u8>,
	) -> Result<(), ApiError> {
		self.check_auth()?;
		if digest_bytes(&data) != content_hash {
			return Err(ApiError::Protocol { message: "chunk hash mismatch".to_string() });
		}
		let mut sessions = self.sessions.lock().unwrap();
		let session = sessions
			.get_mut(session_id)
			.ok_or_else(|| ApiError::Protocol { message: "unknown session".to_string() })?;
		if session.closed {
			return Err(ApiError::Protocol { message: "session already closed".to_string() });
		}
		if session.data.len() as u64 != offset {
			return Err(ApiError::Protocol {
				message: format!("offset {} != session length {}", offset, session.data.len()),
			});
		}
		session.data.extend(data);
		session.closed = close;
		Ok(())
	}

	async fn upload_session_finish_batch(
		&self,
		entries: Vec<FinishEntry>,
	) -> Result<FinishBatchLaunch, ApiError> {
		self.finish_calls.fetch_add(1, Ordering::SeqCst);
		self.check_auth()?;
		let results: Vec<FinishResult> =
			entries.iter().map(|e| self.commit_entry(e)).collect();
		if self.async_mode.load(Ordering::SeqCst) {
			let job_id = format!("job-{}", self.next_id.fetch_add(1, Ordering::SeqCst));
			self.finish_jobs.lock().unwrap().insert(job_id.clone(), results);
			Ok(FinishBatchLaunch::AsyncJob(job_id))
		} else {
			Ok(FinishBatchLaunch::Complete(results))
		}
	}

	async fn upload_session_finish_batch_check(
		&self,
		job_id: &str,
	) -> Result<FinishBatchStatus, ApiError> {
		self.check_auth()?;
		match self.finish_jobs.lock().unwrap().remove(job_id) {
			Some(results) => Ok(FinishBatchStatus::Complete(results)),
			None => Ok(FinishBatchStatus::Failed(format!("unknown job {}", job_id))),
		}
	}

	async fn delete_batch(
		&self,
		entries: Vec<DeleteEntry>,
	) -> Result<DeleteBatchLaunch, ApiError> {
		self.delete_calls.fetch_add(1, Ordering::SeqCst);
		self.check_auth()?;
		if let Some(token) = self.cancel_on_delete.lock().unwrap().as_ref() {
			token.cancel();
		}
		let mut results = Vec::with_capacity(entries.len());
		for entry in &entries {
			if self.fail_deletes.lock().unwrap().contains(&entry.path_lower) {
				results.push(DeleteResult::Failure {
					path: entry.path_lower.clone(),
					message: "simulated delete failure".to_string(),
				});
				continue;
			}
			let removed = self.files.lock().unwrap().remove(&entry.path_lower);
			results.push(match removed {
				Some(_) => {
					self.log
						.lock()
						.unwrap()
						.push(ListEntry::Deleted { path_lower: entry.path_lower.clone() });
					DeleteResult::Success { path_lower: entry.path_lower.clone() }
				}
				None => DeleteResult::Failure {
					path: entry.path_lower.clone(),
					message: "not found".to_string(),
				},
			});
		}
		if self.async_mode.load(Ordering::SeqCst) {
			let job_id = format!("job-{}", self.next_id.fetch_add(1, Ordering::SeqCst));
			self.delete_jobs.lock().unwrap().insert(job_id.clone(), results);
			Ok(DeleteBatchLaunch::AsyncJob(job_id))
		} else {
			Ok(DeleteBatchLaunch::Complete(results))
		}
	}

	async fn delete_batch_check(&self, job_id: &str) -> Result<DeleteBatchStatus, ApiError> {
		self.check_auth()?;
		match self.delete_jobs.lock().unwrap().remove(job_id) {
			Some(results) => Ok(DeleteBatchStatus::Complete(results)),
			None => Ok(DeleteBatchStatus::Failed(format!("unknown job {}", job_id))),
		}
	}
}

// vim: ts=4
