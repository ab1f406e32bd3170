//! Chunked content-hash digest for upload verification
//!
//! The remote store verifies uploads against the same digest computed
//! server-side, so the algorithm is fixed bit-for-bit: split the input into
//! 4 MiB blocks, SHA-256 each block, concatenate the per-block digests in
//! order, SHA-256 the concatenation, render as lowercase hex. The digest
//! must come out identical whether the source is an in-memory buffer or a
//! file read incrementally, for any read granularity.

use sha2::{Digest, Sha256};
use std::io;
use std::path::Path;
use tokio::io::AsyncReadExt;

/// Fixed block size mandated by the remote store's hash scheme.
pub const BLOCK_SIZE: usize = 4 * 1024 * 1024;

/// Incremental hasher accepting input in arbitrarily sized pieces.
/// No block may cross or omit a byte regardless of how the caller
/// slices its reads.
pub struct ContentHasher {
	block: Sha256,
	block_len: usize,
	joined: Sha256,
}

impl ContentHasher {
	pub fn new() -> Self {
		ContentHasher { block: Sha256::new(), block_len: 0, joined: Sha256::new() }
	}

	/// Feed input bytes. Internally re-splits on exact 4 MiB boundaries.
	pub fn update(&mut self, mut data: &[u8]) {
		while !data.is_empty() {
			let take = (BLOCK_SIZE - self.block_len).min(data.len());
			self.block.update(&data[..take]);
			self.block_len += take;
			data = &data[take..];

			if self.block_len == BLOCK_SIZE {
				self.joined.update(self.block.finalize_reset());
				self.block_len = 0;
			}
		}
	}

	/// Flush the trailing partial block and render the final digest.
	pub fn finalize(mut self) -> String {
		if self.block_len > 0 {
			self.joined.update(self.block.finalize());
		}
		hex::encode(self.joined.finalize())
	}
}

impl Default for ContentHasher {
	fn default() -> Self {
		Self::new()
	}
}

/// Digest a whole in-memory buffer.
pub fn digest_bytes(data: &[u8]) -> String {
	let mut hasher = ContentHasher::new();
	hasher.update(data);
	hasher.finalize()
}

/// Digest a file read incrementally. Propagates the read error if the
/// file cannot be fully consumed; never returns a partial hash.
pub async fn digest_file(path: &Path) -> io::Result<String> {
	let mut file = tokio::fs::File::open(path).await?;
	let mut hasher = ContentHasher::new();
	let mut buf = vec![0u8; 64 * 1024];

	loop {
		let n = file.read(&mut buf).await?;
		if n == 0 {
			break;
		}
		hasher.update(&buf[..n]);
	}

	Ok(hasher.finalize())
}


// vim: ts=4
