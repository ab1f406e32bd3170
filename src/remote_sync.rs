//! Remote snapshot sync
//!
//! Mirrors the cloud listing into the local index. Listings can be very
//! large, so the server-issued cursor is persisted after every page: a
//! crash mid-sync costs at most one reprocessed page, never a full
//! re-listing. A cursor whose schema version no longer matches is silently
//! discarded and the table is rebuilt from a fresh recursive listing.

use crate::cancel::CancellationToken;
use crate::error::SyncError;
use crate::logging::*;
use crate::progress::{ServiceError, SyncReporter};
use crate::remote::{ListEntry, ListFolderPage, RemoteStore, LIST_PAGE_LIMIT};
use crate::store::IndexStore;
use crate::types::CursorKind;

/// Progress counter name for this phase
pub const COUNTER: &str = "files";

pub struct RemoteSnapshotSync<'a> {
	pub remote: &'a dyn RemoteStore,
	pub store: &'a IndexStore,
	pub reporter: &'a SyncReporter,
	pub cancel: &'a CancellationToken,
}

impl RemoteSnapshotSync<'_> {
	/// Run the full listing pass. Any API error is recorded as a
	/// structured error at "/" and aborts the pass; the next invocation
	/// resumes from the last persisted cursor.
	pub async fn sync(&self) -> Result<(), SyncError> {
		match self.run().await {
			Ok(()) => {
				self.reporter.mark_complete(COUNTER);
				info!("Remote snapshot sync complete");
				Ok(())
			}
			Err(e) => {
				self.reporter.record_error(ServiceError::with_cause(
					"/",
					"Remote listing failed",
					&e,
				));
				Err(e)
			}
		}
	}

	async fn run(&self) -> Result<(), SyncError> {
		// Best guess at a total; the listing never reports one
		let mut total = self.store.remote_file_count()?;
		let mut progress = 0;
		self.reporter.set_progress(COUNTER, progress, total);

		let mut cursor = match self.store.get_cursor(CursorKind::RemoteListing)? {
			Some(cursor) => {
				debug!("Resuming remote listing from persisted cursor");
				cursor
			}
			None => {
				info!("Bootstrapping full remote listing");
				self.store.clear_remote_files()?;
				let page = self.remote.list_folder("", true, true, LIST_PAGE_LIMIT).await?;
				match self.apply_page(page, &mut progress, &mut total)? {
					Some(cursor) => cursor,
					None => return Ok(()),
				}
			}
		};

		loop {
			if self.cancel.is_cancelled() {
				info!("Remote snapshot sync cancelled; cursor already persisted");
				return Ok(());
			}
			let page = self.remote.list_folder_continue(&cursor).await?;
			match self.apply_page(page, &mut progress, &mut total)? {
				Some(next) => cursor = next,
				None => return Ok(()),
			}
		}
	}

	/// Upsert present entries, delete removed ones, persist the cursor.
	/// Returns the cursor to continue from, or None when the listing
	/// reports no further pages.
	fn apply_page(
		&self,
		page: ListFolderPage,
		progress: &mut usize,
		total: &mut usize,
	) -> Result<Option<String>, SyncError> {
		let mut upserts = Vec::new();
		let mut deletions = Vec::new();
		for entry in page.entries {
			match entry {
				ListEntry::File(metadata) => upserts.push(metadata.into()),
				ListEntry::Deleted { path_lower } => deletions.push(path_lower),
			}
		}
		debug!("Listing page: {} file(s), {} deletion(s)", upserts.len(), deletions.len());

		self.store.upsert_remote_files(&upserts)?;
		self.store.delete_remote_files(&deletions)?;
		self.store.set_cursor(CursorKind::RemoteListing, &page.cursor)?;

		*progress += upserts.len() + deletions.len();
		*total = (*total).max(self.store.remote_file_count()?);
		self.reporter.set_progress(COUNTER, *progress, *total);

		Ok(if page.has_more { Some(page.cursor) } else { None })
	}
}

// vim: ts=4
