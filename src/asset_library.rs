//! Asset library collaborator interface
//!
//! The native photo-library layer is external to this crate. The sync
//! engine only needs an ordered enumeration of asset handles plus a way to
//! export each asset's canonical bytes, which come back either in memory
//! (photos) or as a file in the scratch directory (video transcodes).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::io;
use std::path::{Path, PathBuf};
use tokio::io::AsyncReadExt;

use crate::content_hash::{digest_bytes, digest_file};
use crate::error::AssetError;

/// A geographic coordinate attached to an asset, used to infer the
/// timezone of the creation date.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinate {
	pub latitude: f64,
	pub longitude: f64,
}

/// Handle to a single device-resident photo or video
#[derive(Debug, Clone)]
pub struct AssetRef {
	/// Stable identifier, unique across the device library
	pub asset_id: String,

	/// Native filename including extension
	pub filename: String,

	pub created_at: Option<DateTime<Utc>>,
	pub modified_at: Option<DateTime<Utc>>,
	pub coordinate: Option<Coordinate>,
}

/// Exported asset content, chosen by media type
#[derive(Debug, Clone)]
pub enum AssetContent {
	/// Full-resolution photo bytes
	Bytes(Vec<u8>),

	/// Exported video composition in the scratch directory
	File(PathBuf),
}

impl AssetContent {
	pub async fn size(&self) -> io::Result<u64> {
		match self {
			AssetContent::Bytes(data) => Ok(data.len() as u64),
			AssetContent::File(path) => Ok(tokio::fs::metadata(path).await?.len()),
		}
	}

	/// Content digest of the full payload. Reads files incrementally.
	pub async fn digest(&self) -> io::Result<String> {
		match self {
			AssetContent::Bytes(data) => Ok(digest_bytes(data)),
			AssetContent::File(path) => digest_file(path).await,
		}
	}

	/// Sequential chunk reader over the payload.
	pub async fn reader(&self) -> io::Result<ContentReader<'_>> {
		match self {
			AssetContent::Bytes(data) => Ok(ContentReader::Memory { data, pos: 0 }),
			AssetContent::File(path) => {
				Ok(ContentReader::File(tokio::fs::File::open(path).await?))
			}
		}
	}
}

/// Reads asset content in caller-sized chunks, keep looping on it until
/// it returns None and you'll have the whole payload.
pub enum ContentReader<'a> {
	Memory { data: &'a [u8], pos: usize },
	File(tokio::fs::File),
}

impl ContentReader<'_> {
	/// Next chunk of at most `size` bytes, or None at end of content.
	/// Always fills `size` bytes except for the final chunk.
	pub async fn next_chunk(&mut self, size: usize) -> io::Result<Option<Vec<u8>>> {
		match self {
			ContentReader::Memory { data, pos } => {
				if *pos >= data.len() {
					return Ok(None);
				}
				let end = (*pos + size).min(data.len());
				let chunk = data[*pos..end].to_vec();
				*pos = end;
				Ok(Some(chunk))
			}
			ContentReader::File(file) => {
				let mut buf = vec![0u8; size];
				let mut filled = 0;
				while filled < size {
					let n = file.read(&mut buf[filled..]).await?;
					if n == 0 {
						break;
					}
					filled += n;
				}
				if filled == 0 {
					return Ok(None);
				}
				buf.truncate(filled);
				Ok(Some(buf))
			}
		}
	}
}

/// The device photo library. Enumeration returns a full snapshot and is
/// not restartable mid-pass; re-enumerate for a fresh snapshot.
#[async_trait]
pub trait AssetLibrary: Send + Sync {
	/// Every asset on the device, as one finite snapshot.
	async fn list_assets(&self) -> Result<Vec<AssetRef>, AssetError>;

	/// Export the asset's canonical bytes. Video exports land as files
	/// under `scratch`, which the engine clears at the start of each run.
	async fn export(&self, asset_id: &str, scratch: &Path) -> Result<AssetContent, AssetError>;
}


// vim: ts=4
