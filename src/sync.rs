//! Top-level sync engine
//!
//! One-way reconciliation of the device photo library against the cloud
//! store. The device is the source of truth for content; the cloud is the
//! source of truth for what's already uploaded. Both snapshot passes run
//! concurrently, the reconciler diffs the fresh index, the orchestrator
//! drives the worklists, and a final remote pass absorbs the just-made
//! changes so the next invocation starts from ground truth.
//!
//! There is no ambient state: every collaborator arrives through the
//! constructor.

use std::path::PathBuf;
use std::sync::Arc;

use crate::asset_library::AssetLibrary;
use crate::cancel::CancellationToken;
use crate::error::SyncError;
use crate::local_sync::LocalSnapshotSync;
use crate::logging::*;
use crate::paths::{LongitudeEstimate, TimezoneResolver};
use crate::progress::{ServiceError, SyncReporter};
use crate::reconcile;
use crate::remote::RemoteStore;
use crate::remote_sync::RemoteSnapshotSync;
use crate::scratch::ScratchDir;
use crate::store::IndexStore;
use crate::uploader::{UploadOrchestrator, UploadReport, DEFAULT_CONCURRENCY};

/// Engine configuration
pub struct SyncOptions {
	/// Scratch directory for temporary exports, wiped at run start
	pub scratch_dir: PathBuf,

	/// Concurrent per-item upload pipelines
	pub concurrency: usize,

	/// Coordinate-to-timezone resolution for date bucketing
	pub timezones: Arc<dyn TimezoneResolver>,
}

impl SyncOptions {
	pub fn new(scratch_dir: PathBuf) -> Self {
		SyncOptions {
			scratch_dir,
			concurrency: DEFAULT_CONCURRENCY,
			timezones: Arc::new(LongitudeEstimate),
		}
	}
}

/// What one full run accomplished
#[derive(Debug, Default)]
pub struct SyncSummary {
	pub uploaded: usize,
	pub unchanged: usize,
	pub deleted: usize,
	pub failed: usize,
	pub errors: Vec<ServiceError>,
}

pub struct SyncEngine {
	library: Arc<dyn AssetLibrary>,
	remote: Arc<dyn RemoteStore>,
	store: Arc<IndexStore>,
	options: SyncOptions,
	reporter: SyncReporter,
	cancel: CancellationToken,
}

impl SyncEngine {
	pub fn new(
		library: Arc<dyn AssetLibrary>,
		remote: Arc<dyn RemoteStore>,
		store: Arc<IndexStore>,
		options: SyncOptions,
	) -> Self {
		SyncEngine {
			library,
			remote,
			store,
			options,
			reporter: SyncReporter::new(),
			cancel: CancellationToken::new(),
		}
	}

	/// Live progress counters and the accumulated error list
	pub fn reporter(&self) -> &SyncReporter {
		&self.reporter
	}

	/// Token for an external time-budget signal. Cancelling lets in-flight
	/// items finish but schedules no new work; uncommitted batches retry
	/// in full next run.
	pub fn cancellation(&self) -> CancellationToken {
		self.cancel.clone()
	}

	/// One full sync pass. Per-item failures land in the reporter's error
	/// list; only phase-level failures (unreachable endpoints, invalid
	/// credential, index write failure) surface as Err. Check
	/// [`SyncError::is_auth_required`] to decide whether to restart the
	/// connect flow.
	pub async fn run(&self) -> Result<SyncSummary, SyncError> {
		let scratch = ScratchDir::prepare(&self.options.scratch_dir).await?;

		let local = LocalSnapshotSync {
			library: self.library.as_ref(),
			store: self.store.as_ref(),
			timezones: self.options.timezones.as_ref(),
			reporter: &self.reporter,
			cancel: &self.cancel,
		};
		let remote = RemoteSnapshotSync {
			remote: self.remote.as_ref(),
			store: self.store.as_ref(),
			reporter: &self.reporter,
			cancel: &self.cancel,
		};

		// Disjoint record types, so the phases can't observe each other's
		// in-flight writes. Neither is cancelled by the other's failure;
		// both run to completion before errors are weighed.
		let (local_result, remote_result) = tokio::join!(local.sync(), remote.sync());
		let run_id = match local_result {
			Ok(run_id) => run_id,
			Err(e) => {
				self.reporter.record_error(ServiceError::with_cause(
					"/",
					"Local snapshot sync failed",
					&e,
				));
				return Err(e);
			}
		};
		remote_result?;

		if self.cancel.is_cancelled() {
			info!("Sync cancelled before reconciliation");
			return Ok(self.summary(UploadReport::default()));
		}

		let lists = reconcile::classify(
			&run_id,
			&self.store.all_assets()?,
			&self.store.all_remote_files()?,
		);

		let orchestrator = UploadOrchestrator {
			library: self.library.as_ref(),
			remote: self.remote.as_ref(),
			store: self.store.as_ref(),
			reporter: &self.reporter,
			cancel: &self.cancel,
			scratch: scratch.path(),
			concurrency: self.options.concurrency,
		};
		let report = orchestrator.run(lists).await?;

		// Absorb the uploads and deletes we just made, so the next run
		// diffs against ground truth instead of our own bookkeeping
		if !self.cancel.is_cancelled() {
			let absorb = RemoteSnapshotSync {
				remote: self.remote.as_ref(),
				store: self.store.as_ref(),
				reporter: &self.reporter,
				cancel: &self.cancel,
			};
			absorb.sync().await?;
		}

		Ok(self.summary(report))
	}

	fn summary(&self, report: UploadReport) -> SyncSummary {
		SyncSummary {
			uploaded: report.uploaded,
			unchanged: report.unchanged,
			deleted: report.deleted,
			failed: report.failed,
			errors: self.reporter.errors(),
		}
	}
}

// vim: ts=4
