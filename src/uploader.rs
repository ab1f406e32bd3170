//! Upload orchestrator
//!
//! Drives the reconciler's worklists through the chunked upload protocol.
//! Per-item work (fetch, hash, chunk uploads) runs with bounded
//! parallelism; the batch commit is one serialized call and a hard
//! synchronization barrier. Individual item failures degrade only that
//! item. Nothing is marked done in the index until the commit returns
//! success for that specific item, so a cancelled or crashed batch is
//! retried in full next run.

use futures::StreamExt;
use rand::Rng;
use std::path::Path;
use std::time::Duration;

use crate::asset_library::{AssetContent, AssetLibrary};
use crate::cancel::CancellationToken;
use crate::content_hash::digest_bytes;
use crate::error::{ApiError, SyncError};
use crate::logging::*;
use crate::progress::{ServiceError, SyncReporter};
use crate::reconcile::Worklists;
use crate::remote::{
	DeleteBatchLaunch, DeleteBatchStatus, DeleteEntry, DeleteResult, FinishBatchLaunch,
	FinishBatchStatus, FinishEntry, FinishResult, FileMetadata, RemoteStore,
	UPLOAD_CHUNK_SIZE,
};
use crate::store::IndexStore;
use crate::types::{DeleteTask, UploadTask};

/// Progress counter name for this phase
pub const COUNTER: &str = "uploads";

/// Bound on concurrent per-item pipelines. The bottleneck is a mix of
/// device I/O and network bandwidth; unbounded fan-out causes timeouts
/// and buffers too many full-resolution assets at once.
pub const DEFAULT_CONCURRENCY: usize = 3;

/// Delete tasks submitted per batch-delete call
const DELETE_BATCH: usize = 100;

/// Base delay between async-job polls; each poll adds jitter
const POLL_BASE_SECS: u64 = 2;

pub struct UploadOrchestrator<'a> {
	pub library: &'a dyn AssetLibrary,
	pub remote: &'a dyn RemoteStore,
	pub store: &'a IndexStore,
	pub reporter: &'a SyncReporter,
	pub cancel: &'a CancellationToken,
	pub scratch: &'a Path,
	pub concurrency: usize,
}

/// What the orchestrator did with one run's worklists
#[derive(Debug, Default, PartialEq, Eq)]
pub struct UploadReport {
	pub uploaded: usize,
	pub unchanged: usize,
	pub deleted: usize,
	pub failed: usize,
}

/// Outcome of one item's pre-commit phase
enum Staged {
	/// Session uploaded, finish argument ready for the batch commit
	Finish(Box<(UploadTask, FinishEntry)>),

	/// Hash-gate short circuit, no network upload needed
	Unchanged,

	/// Per-item failure, already recorded
	Failed,

	/// Token was set before this item started
	Skipped,

	/// Systemic failure, abort the phase
	Fatal(SyncError),
}

impl UploadOrchestrator<'_> {
	/// Work through the batch. Never errors for individual item failures;
	/// only systemic ones (unreachable commit endpoint, invalid
	/// credential, index write failure).
	pub async fn run(&self, lists: Worklists) -> Result<UploadReport, SyncError> {
		let total = lists.uploads.len() + lists.deletes.len();
		let mut progress = 0;
		self.reporter.set_progress(COUNTER, progress, total);

		let mut report = UploadReport::default();

		// Per-item phase, bounded fan-out. `buffered` (not unordered)
		// keeps submission order, which the batch commit zip relies on.
		let staged: Vec<Staged> = futures::stream::iter(&lists.uploads)
			.map(|task| self.stage(task))
			.buffered(self.concurrency.max(1))
			.collect()
			.await;

		let mut finishers: Vec<(UploadTask, FinishEntry)> = Vec::new();
		for outcome in staged {
			match outcome {
				Staged::Finish(boxed) => finishers.push(*boxed),
				Staged::Unchanged => {
					report.unchanged += 1;
					progress += 1;
				}
				Staged::Failed => {
					report.failed += 1;
					progress += 1;
				}
				Staged::Skipped => {}
				Staged::Fatal(e) => {
					self.reporter.record_error(ServiceError::with_cause(
						"/",
						"Upload phase aborted",
						&e,
					));
					return Err(e);
				}
			}
		}
		self.reporter.set_progress(COUNTER, progress, total);

		if self.cancel.is_cancelled() {
			// Abandoned sessions are harmless; the items were never
			// marked done and will be retried wholesale
			info!("Cancelled before commit, {} staged upload(s) dropped", finishers.len());
			return Ok(report);
		}

		if !finishers.is_empty() {
			progress = self.commit(finishers, &mut report, progress, total).await?;
		}

		self.delete(&lists.deletes, &mut report, progress, total).await?;

		if self.cancel.is_cancelled() {
			// The phase was cut short; leave the counter un-pinned so the
			// caller doesn't read an aborted pass as finished
			return Ok(report);
		}

		self.reporter.mark_complete(COUNTER);
		info!(
			"Upload complete: {} uploaded, {} unchanged, {} deleted, {} failed",
			report.uploaded, report.unchanged, report.deleted, report.failed
		);
		Ok(report)
	}

	/// Fetch, hash, hash-gate, and upload one item. Every failure here is
	/// per-item except invalid credentials, which cancel the whole batch.
	async fn stage(&self, task: &UploadTask) -> Staged {
		if self.cancel.is_cancelled() {
			return Staged::Skipped;
		}

		let content = match self.library.export(&task.asset_id, self.scratch).await {
			Ok(content) => content,
			Err(e) => {
				self.reporter.record_error(ServiceError::with_cause(
					&task.path,
					"Failed to fetch asset",
					&e,
				));
				return Staged::Failed;
			}
		};

		let hash = match content.digest().await {
			Ok(hash) => hash,
			Err(e) => {
				self.reporter.record_error(ServiceError::with_cause(
					&task.path,
					"Failed to hash asset",
					&e,
				));
				return Staged::Failed;
			}
		};

		// The cached hash is lazily computed, so store it now even if the
		// upload turns out to be unnecessary
		if let Err(e) = self.record_hash(&task.asset_id, &hash) {
			return Staged::Fatal(e);
		}

		if task.existing_content_hash.as_deref() == Some(hash.as_str()) {
			debug!("Content unchanged, skipping upload of {}", task.path);
			return Staged::Unchanged;
		}

		match self.upload_session(task, &content, &hash).await {
			Ok(entry) => Staged::Finish(Box::new((task.clone(), entry))),
			Err(SyncError::Api(ApiError::Auth)) => {
				self.cancel.cancel();
				Staged::Fatal(SyncError::Api(ApiError::Auth))
			}
			Err(e) => {
				self.reporter.record_error(ServiceError::with_cause(
					&task.path,
					"Upload failed",
					&e,
				));
				Staged::Failed
			}
		}
	}

	/// Push one asset's bytes through an upload session. Single-chunk
	/// payloads start and close in one call; larger ones stream 4 MiB
	/// chunks, each carrying its own content hash for verification.
	async fn upload_session(
		&self,
		task: &UploadTask,
		content: &AssetContent,
		content_hash: &str,
	) -> Result<FinishEntry, SyncError> {
		let size = content.size().await?;
		let mut reader = content.reader().await?;

		debug!("Uploading {} ({} byte(s))", task.path, size);

		let first = reader.next_chunk(UPLOAD_CHUNK_SIZE).await?.unwrap_or_default();
		let close = size <= UPLOAD_CHUNK_SIZE as u64;
		let mut offset = first.len() as u64;
		let session_id =
			self.remote.upload_session_start(close, &digest_bytes(&first), first).await?;

		if !close {
			while let Some(chunk) = reader.next_chunk(UPLOAD_CHUNK_SIZE).await? {
				let chunk_len = chunk.len() as u64;
				let last = offset + chunk_len >= size;
				self.remote
					.upload_session_append(
						&session_id,
						offset,
						last,
						&digest_bytes(&chunk),
						chunk,
					)
					.await?;
				offset += chunk_len;
				if last {
					break;
				}
			}
		}

		Ok(FinishEntry {
			session_id,
			offset,
			path: task.path.clone(),
			client_modified: task.client_modified,
			content_hash: content_hash.to_string(),
		})
	}

	/// Submit every finish argument in a single batch-commit call, then
	/// zip the results back to their items in submission order.
	async fn commit(
		&self,
		finishers: Vec<(UploadTask, FinishEntry)>,
		report: &mut UploadReport,
		mut progress: usize,
		total: usize,
	) -> Result<usize, SyncError> {
		let entries: Vec<FinishEntry> = finishers.iter().map(|(_, e)| e.clone()).collect();
		info!("Finishing {} upload(s)", entries.len());

		let results = match self.remote.upload_session_finish_batch(entries).await {
			Ok(FinishBatchLaunch::Complete(results)) => results,
			Ok(FinishBatchLaunch::AsyncJob(job_id)) => self.poll_finish(&job_id).await?,
			Err(e) => {
				// Phase-level: the endpoint itself is unreachable. No
				// index mutation; safe to retry wholesale next run.
				self.reporter.record_error(ServiceError::with_cause(
					"/",
					"Batch commit failed",
					&e,
				));
				return Err(e.into());
			}
		};

		if results.len() != finishers.len() {
			let e = ApiError::Protocol {
				message: format!(
					"Batch commit returned {} result(s) for {} entries",
					results.len(),
					finishers.len()
				),
			};
			self.reporter.record_error(ServiceError::with_cause("/", "Batch commit failed", &e));
			return Err(e.into());
		}

		for ((task, _entry), result) in finishers.into_iter().zip(results) {
			match result {
				FinishResult::Success(metadata) => {
					self.link(&task, metadata)?;
					report.uploaded += 1;
				}
				FinishResult::Failure { path, message } => {
					// Index left untouched so the item retries next pass
					self.reporter.record_error(ServiceError::new(&path, &message));
					report.failed += 1;
				}
			}
			progress += 1;
			self.reporter.set_progress(COUNTER, progress, total);
		}
		Ok(progress)
	}

	/// Batch-delete remote orphans. Same sync-or-poll duality as commit.
	async fn delete(
		&self,
		deletes: &[DeleteTask],
		report: &mut UploadReport,
		mut progress: usize,
		total: usize,
	) -> Result<(), SyncError> {
		for chunk in deletes.chunks(DELETE_BATCH) {
			if self.cancel.is_cancelled() {
				info!("Cancelled, skipping remaining delete(s)");
				return Ok(());
			}

			let entries: Vec<DeleteEntry> = chunk
				.iter()
				.map(|t| DeleteEntry {
					path_lower: t.path_lower.clone(),
					expected_revision: t.revision.clone(),
				})
				.collect();
			info!("Deleting {} remote file(s)", entries.len());

			let results = match self.remote.delete_batch(entries).await {
				Ok(DeleteBatchLaunch::Complete(results)) => results,
				Ok(DeleteBatchLaunch::AsyncJob(job_id)) => self.poll_delete(&job_id).await?,
				Err(e) => {
					self.reporter.record_error(ServiceError::with_cause(
						"/",
						"Batch delete failed",
						&e,
					));
					return Err(e.into());
				}
			};

			if results.len() != chunk.len() {
				let e = ApiError::Protocol {
					message: format!(
						"Batch delete returned {} result(s) for {} entries",
						results.len(),
						chunk.len()
					),
				};
				self.reporter.record_error(ServiceError::with_cause(
					"/",
					"Batch delete failed",
					&e,
				));
				return Err(e.into());
			}

			for (task, result) in chunk.iter().zip(results) {
				match result {
					DeleteResult::Success { path_lower } => {
						self.store.delete_remote_files(&[path_lower])?;
						// The device-absent record was kept alive for
						// exactly this moment
						if let Some(asset_id) = &task.asset_id {
							self.store.delete_assets(&[asset_id.clone()])?;
						}
						debug!("Deleted {}", task.path_lower);
						report.deleted += 1;
					}
					DeleteResult::Failure { path, message } => {
						self.reporter.record_error(ServiceError::new(&path, &message));
						report.failed += 1;
					}
				}
				progress += 1;
				self.reporter.set_progress(COUNTER, progress, total);
			}
		}
		Ok(())
	}

	/// Store the freshly computed content hash. The record is re-fetched
	/// in a fresh scope before mutation; it is never held across an await.
	fn record_hash(&self, asset_id: &str, hash: &str) -> Result<(), SyncError> {
		if let Some(mut record) = self.store.get_asset(asset_id)? {
			record.content_hash = Some(hash.to_string());
			self.store.upsert_assets(&[record])?;
		}
		Ok(())
	}

	/// Connect a committed upload to its local record and mirror the new
	/// remote file into the index.
	fn link(&self, task: &UploadTask, metadata: FileMetadata) -> Result<(), SyncError> {
		if let Some(mut record) = self.store.get_asset(&task.asset_id)? {
			record.remote_id = Some(metadata.remote_id.clone());
			record.remote_rev = Some(metadata.revision.clone());
			self.store.upsert_assets(&[record])?;
		}
		self.store.upsert_remote_files(&[metadata.into()])?;
		Ok(())
	}

	async fn poll_finish(&self, job_id: &str) -> Result<Vec<FinishResult>, SyncError> {
		loop {
			self.poll_delay().await;
			match self.remote.upload_session_finish_batch_check(job_id).await? {
				FinishBatchStatus::InProgress => debug!("Batch commit still in progress"),
				FinishBatchStatus::Complete(results) => return Ok(results),
				FinishBatchStatus::Failed(message) => {
					return Err(ApiError::Protocol { message }.into())
				}
			}
		}
	}

	async fn poll_delete(&self, job_id: &str) -> Result<Vec<DeleteResult>, SyncError> {
		loop {
			self.poll_delay().await;
			match self.remote.delete_batch_check(job_id).await? {
				DeleteBatchStatus::InProgress => debug!("Batch delete still in progress"),
				DeleteBatchStatus::Complete(results) => return Ok(results),
				DeleteBatchStatus::Failed(message) => {
					return Err(ApiError::Protocol { message }.into())
				}
			}
		}
	}

	/// Jittered poll backoff, so a fleet of clients doesn't hammer the
	/// job-status endpoint in lockstep
	async fn poll_delay(&self) {
		let jitter = rand::thread_rng().gen_range(0..500);
		tokio::time::sleep(Duration::from_millis(POLL_BASE_SECS * 1000 + jitter)).await;
	}
}

// vim: ts=4
