//! Local snapshot sync
//!
//! Walks the full device asset collection, mirrors it into the local
//! index, then sweeps index records whose assets have disappeared from the
//! device. Each pass stamps touched records with a fresh run id; anything
//! still carrying an older stamp afterwards was not seen and gets deleted.
//!
//! The asset enumeration itself is fast; index writes are the bottleneck
//! on repeat runs, while the first run pays for path computation per
//! asset. Hence the two batch sizes.

use std::collections::{BTreeSet, HashMap};
use uuid::Uuid;

use crate::asset_library::{AssetLibrary, AssetRef};
use crate::cancel::CancellationToken;
use crate::error::SyncError;
use crate::logging::*;
use crate::paths::{self, PathClaim, TimezoneResolver};
use crate::progress::SyncReporter;
use crate::store::IndexStore;
use crate::types::LocalAsset;

/// Progress counter name for this phase
pub const COUNTER: &str = "photos";

/// First-run batch size: path assignment dominates, small batches give
/// better progress granularity
const BOOTSTRAP_BATCH: usize = 50;

/// Steady-state batch size: index write throughput dominates
const STEADY_BATCH: usize = 400;

pub struct LocalSnapshotSync<'a> {
	pub library: &'a dyn AssetLibrary,
	pub store: &'a IndexStore,
	pub timezones: &'a dyn TimezoneResolver,
	pub reporter: &'a SyncReporter,
	pub cancel: &'a CancellationToken,
}

impl LocalSnapshotSync<'_> {
	/// Run the full snapshot pass and return this pass's run id, which the
	/// reconciler uses to tell device-present records from kept-back ones.
	/// Enumeration errors are fatal to the pass; batches already committed
	/// to the index are retained.
	pub async fn sync(&self) -> Result<String, SyncError> {
		let run_id = Uuid::new_v4().to_string();

		let mut assets = self.library.list_assets().await?;
		// Creation descending purely to make batch logging legible
		assets.sort_by(|a, b| {
			b.created_at.cmp(&a.created_at).then_with(|| a.asset_id.cmp(&b.asset_id))
		});

		let total = assets.len();
		info!("Device has {} asset(s)", total);
		self.reporter.set_progress(COUNTER, 0, total);

		let bootstrap = self.store.asset_count()? == 0;
		let batch_size = if bootstrap { BOOTSTRAP_BATCH } else { STEADY_BATCH };

		// Assets whose records lack a final path after the upsert pass;
		// resolved in one deterministic pass at the end
		let mut unassigned: Vec<PathClaim> = Vec::new();

		let mut progress = 0;
		for chunk in assets.chunks(batch_size) {
			if self.cancel.is_cancelled() {
				info!("Local snapshot sync cancelled after {} asset(s)", progress);
				return Ok(run_id);
			}

			let ids: Vec<String> = chunk.iter().map(|a| a.asset_id.clone()).collect();
			let existing: HashMap<String, LocalAsset> = self
				.store
				.get_assets(&ids)?
				.into_iter()
				.map(|a| (a.asset_id.clone(), a))
				.collect();

			let mut records = Vec::with_capacity(chunk.len());
			for asset in chunk {
				let record = merge(existing.get(&asset.asset_id), asset, &run_id);
				if record.assigned_path.is_none() {
					unassigned.push(PathClaim {
						asset_id: asset.asset_id.clone(),
						created_at: asset.created_at,
						preferred: paths::preferred_path(asset, self.timezones),
					});
				}
				records.push(record);
			}
			self.store.upsert_assets(&records)?;

			progress += chunk.len();
			self.reporter.set_progress(COUNTER, progress, total);
			debug!("Upserted {}/{} asset record(s)", progress, total);
		}

		self.sweep_deleted(&run_id)?;
		self.assign_paths(unassigned)?;

		self.reporter.mark_complete(COUNTER);
		info!("Local snapshot sync complete");
		Ok(run_id)
	}

	/// Sweep index records whose assets were not seen on the device this
	/// run. Records with no remote linkage are deleted outright; linked
	/// ones are kept (still carrying their stale run stamp) so the
	/// reconciler can delete the remote copy under its known revision.
	/// The uploader drops the record once that delete is confirmed.
	fn sweep_deleted(&self, run_id: &str) -> Result<(), SyncError> {
		let mut unlinked = Vec::new();
		let mut kept = 0usize;
		for asset in self.store.all_assets()? {
			if asset.sync_run.as_deref() == Some(run_id) {
				continue;
			}
			if asset.remote_id.is_some() {
				kept += 1;
			} else {
				unlinked.push(asset.asset_id);
			}
		}
		if !unlinked.is_empty() {
			info!("Removing {} deleted asset record(s)", unlinked.len());
			self.store.delete_assets(&unlinked)?;
		}
		if kept > 0 {
			debug!("Keeping {} device-absent record(s) pending remote delete", kept);
		}
		Ok(())
	}

	/// Resolve collisions for every record still missing a final path and
	/// write the assignments back. Already-assigned paths are claimed
	/// first so a stored suffix never collapses.
	fn assign_paths(&self, pending: Vec<PathClaim>) -> Result<(), SyncError> {
		if pending.is_empty() {
			return Ok(());
		}

		let mut claimed: BTreeSet<String> = self
			.store
			.all_assets()?
			.into_iter()
			.filter_map(|a| a.assigned_path)
			.collect();

		let assignments = paths::resolve_collisions(pending, &mut claimed);
		debug!("Assigning {} path(s)", assignments.len());

		let mut updated = Vec::with_capacity(assignments.len());
		for (asset_id, path) in assignments {
			// Re-fetch in a fresh scope before mutating
			if let Some(mut record) = self.store.get_asset(&asset_id)? {
				record.assigned_path = Some(path);
				updated.push(record);
			}
		}
		self.store.upsert_assets(&updated)?;
		Ok(())
	}
}

/// Fold a fresh device snapshot into the existing index record. Any
/// `modified_at` change invalidates the cached path and hash, which are
/// lazily recomputed; they are never stale relative to `modified_at`.
fn merge(existing: Option<&LocalAsset>, asset: &AssetRef, run_id: &str) -> LocalAsset {
	let mut record = match existing {
		Some(e) => e.clone(),
		None => LocalAsset::new(&asset.asset_id, &asset.filename),
	};

	if record.modified_at != asset.modified_at {
		record.assigned_path = None;
		record.content_hash = None;
		record.filename = asset.filename.clone();
	}

	record.created_at = asset.created_at;
	record.modified_at = asset.modified_at;
	record.sync_run = Some(run_id.to_string());
	record
}


// vim: ts=4
