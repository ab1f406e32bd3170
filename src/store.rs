//! Local index store backed by redb
//!
//! Two mirrored tables (local assets, remote files) plus a small key-value
//! table of resumable cursors. The store itself is simple; what matters is
//! the query patterns: bulk lookups by key-set, upsert-by-unique-key, and
//! full-table snapshots for the reconciler. Writes happen in short-lived
//! transactions that are never held across a network suspension point.

use redb::{ReadableDatabase, ReadableTable, ReadableTableMetadata, TableDefinition};
use serde::{Deserialize, Serialize};
use std::path;

use crate::error::StoreError;
use crate::logging::*;
use crate::types::{CursorKind, LocalAsset, RemoteFile};

/// Key: asset id. Value: serialized LocalAsset.
const ASSETS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("assets");

/// Key: case-folded remote path. Value: serialized RemoteFile.
const REMOTE_FILES_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("remote_files");

/// Key: cursor kind. Value: serialized CursorRecord.
const CURSORS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("cursors");

/// Persisted resume token with its schema version
#[derive(Debug, Clone, Serialize, Deserialize)]
struct CursorRecord {
	#[serde(rename = "pl")]
	payload: String,
	#[serde(rename = "v")]
	version: u32,
}

/// The local index database
pub struct IndexStore {
	db: redb::Database,
}

impl IndexStore {
	/// Open or create the index database
	pub fn open(db_path: &path::Path) -> Result<Self, StoreError> {
		let db = redb::Database::create(db_path)?;
		// Ensure all tables exist
		{
			let write_txn = db.begin_write()?;
			let _ = write_txn.open_table(ASSETS_TABLE)?;
			let _ = write_txn.open_table(REMOTE_FILES_TABLE)?;
			let _ = write_txn.open_table(CURSORS_TABLE)?;
			write_txn.commit()?;
		}
		Ok(IndexStore { db })
	}

	// === Local assets ===

	pub fn get_asset(&self, asset_id: &str) -> Result<Option<LocalAsset>, StoreError> {
		let read_txn = self.db.begin_read()?;
		let table = read_txn.open_table(ASSETS_TABLE)?;
		match table.get(asset_id)? {
			Some(entry) => Ok(Some(serde_json::from_slice(&entry.value().to_vec())?)),
			None => Ok(None),
		}
	}

	/// Bulk fetch by key-set, one read transaction for the whole block
	pub fn get_assets(&self, asset_ids: &[String]) -> Result<Vec<LocalAsset>, StoreError> {
		let read_txn = self.db.begin_read()?;
		let table = read_txn.open_table(ASSETS_TABLE)?;
		let mut found = Vec::new();
		for id in asset_ids {
			if let Some(entry) = table.get(id.as_str())? {
				found.push(serde_json::from_slice(&entry.value().to_vec())?);
			}
		}
		Ok(found)
	}

	/// Upsert a batch of asset records in one write transaction
	pub fn upsert_assets(&self, assets: &[LocalAsset]) -> Result<(), StoreError> {
		if assets.is_empty() {
			return Ok(());
		}
		let write_txn = self.db.begin_write()?;
		{
			let mut table = write_txn.open_table(ASSETS_TABLE)?;
			for asset in assets {
				let bytes = serde_json::to_vec(asset)?;
				table.insert(asset.asset_id.as_str(), bytes.as_slice())?;
			}
		}
		write_txn.commit()?;
		Ok(())
	}

	pub fn delete_assets(&self, asset_ids: &[String]) -> Result<(), StoreError> {
		if asset_ids.is_empty() {
			return Ok(());
		}
		let write_txn = self.db.begin_write()?;
		{
			let mut table = write_txn.open_table(ASSETS_TABLE)?;
			for id in asset_ids {
				table.remove(id.as_str())?;
			}
		}
		write_txn.commit()?;
		Ok(())
	}

	pub fn all_assets(&self) -> Result<Vec<LocalAsset>, StoreError> {
		let read_txn = self.db.begin_read()?;
		let table = read_txn.open_table(ASSETS_TABLE)?;
		let mut assets = Vec::new();
		for entry in table.iter()? {
			let (_, value) = entry?;
			assets.push(serde_json::from_slice(&value.value().to_vec())?);
		}
		Ok(assets)
	}

	pub fn asset_count(&self) -> Result<usize, StoreError> {
		let read_txn = self.db.begin_read()?;
		let table = read_txn.open_table(ASSETS_TABLE)?;
		Ok(table.len()? as usize)
	}

	// === Remote files ===

	pub fn get_remote_file(&self, path_lower: &str) -> Result<Option<RemoteFile>, StoreError> {
		let read_txn = self.db.begin_read()?;
		let table = read_txn.open_table(REMOTE_FILES_TABLE)?;
		match table.get(path_lower)? {
			Some(entry) => Ok(Some(serde_json::from_slice(&entry.value().to_vec())?)),
			None => Ok(None),
		}
	}

	pub fn upsert_remote_files(&self, files: &[RemoteFile]) -> Result<(), StoreError> {
		if files.is_empty() {
			return Ok(());
		}
		let write_txn = self.db.begin_write()?;
		{
			let mut table = write_txn.open_table(REMOTE_FILES_TABLE)?;
			for file in files {
				let bytes = serde_json::to_vec(file)?;
				table.insert(file.path_lower.as_str(), bytes.as_slice())?;
			}
		}
		write_txn.commit()?;
		Ok(())
	}

	pub fn delete_remote_files(&self, paths: &[String]) -> Result<(), StoreError> {
		if paths.is_empty() {
			return Ok(());
		}
		let write_txn = self.db.begin_write()?;
		{
			let mut table = write_txn.open_table(REMOTE_FILES_TABLE)?;
			for p in paths {
				table.remove(p.as_str())?;
			}
		}
		write_txn.commit()?;
		Ok(())
	}

	pub fn all_remote_files(&self) -> Result<Vec<RemoteFile>, StoreError> {
		let read_txn = self.db.begin_read()?;
		let table = read_txn.open_table(REMOTE_FILES_TABLE)?;
		let mut files = Vec::new();
		for entry in table.iter()? {
			let (_, value) = entry?;
			files.push(serde_json::from_slice(&value.value().to_vec())?);
		}
		Ok(files)
	}

	pub fn remote_file_count(&self) -> Result<usize, StoreError> {
		let read_txn = self.db.begin_read()?;
		let table = read_txn.open_table(REMOTE_FILES_TABLE)?;
		Ok(table.len()? as usize)
	}

	/// Drop every remote file record, ahead of a full re-listing
	pub fn clear_remote_files(&self) -> Result<(), StoreError> {
		let write_txn = self.db.begin_write()?;
		{
			let _ = write_txn.delete_table(REMOTE_FILES_TABLE);
			let _ = write_txn.open_table(REMOTE_FILES_TABLE)?;
		}
		write_txn.commit()?;
		Ok(())
	}

	// === Cursors ===

	/// Read a persisted cursor. A version mismatch is not an error: the
	/// cursor is discarded and the caller re-bootstraps.
	pub fn get_cursor(&self, kind: CursorKind) -> Result<Option<String>, StoreError> {
		let read_txn = self.db.begin_read()?;
		let table = read_txn.open_table(CURSORS_TABLE)?;
		match table.get(kind.key())? {
			Some(entry) => {
				let record: CursorRecord = serde_json::from_slice(&entry.value().to_vec())?;
				if record.version != kind.version() {
					info!(
						"Invalidating {} cursor: version {} != {}",
						kind.key(),
						record.version,
						kind.version()
					);
					return Ok(None);
				}
				Ok(Some(record.payload))
			}
			None => Ok(None),
		}
	}

	pub fn set_cursor(&self, kind: CursorKind, payload: &str) -> Result<(), StoreError> {
		let record =
			CursorRecord { payload: payload.to_string(), version: kind.version() };
		let bytes = serde_json::to_vec(&record)?;
		let write_txn = self.db.begin_write()?;
		{
			let mut table = write_txn.open_table(CURSORS_TABLE)?;
			table.insert(kind.key(), bytes.as_slice())?;
		}
		write_txn.commit()?;
		Ok(())
	}

	pub fn clear_cursor(&self, kind: CursorKind) -> Result<(), StoreError> {
		let write_txn = self.db.begin_write()?;
		{
			let mut table = write_txn.open_table(CURSORS_TABLE)?;
			table.remove(kind.key())?;
		}
		write_txn.commit()?;
		Ok(())
	}
}


// vim: ts=4
