//! # PhotoSync - One-Way Photo Library Reconciliation
//!
//! PhotoSync keeps a cloud object store converged with a device photo
//! library: a durable local index mirrors both sides, a pure reconciler
//! diffs them, and a chunked, partially-parallel, resumable upload
//! pipeline applies the difference. The device is authoritative for
//! content, the cloud for what's already uploaded; everything is
//! idempotent and self-healing on the next run.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use photosync::store::IndexStore;
//! use photosync::sync::{SyncEngine, SyncOptions};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = Arc::new(IndexStore::open("index.redb".as_ref())?);
//!     let engine = SyncEngine::new(
//!         photo_library,      // your AssetLibrary implementation
//!         cloud_client,       // your RemoteStore implementation
//!         store,
//!         SyncOptions::new("/tmp/photosync-scratch".into()),
//!     );
//!     let summary = engine.run().await?;
//!     println!("Uploaded {} photo(s)", summary.uploaded);
//!     Ok(())
//! }
//! ```

pub mod asset_library;
pub mod cancel;
pub mod content_hash;
pub mod error;
pub mod local_sync;
pub mod logging;
pub mod paths;
pub mod progress;
pub mod reconcile;
pub mod remote;
pub mod remote_sync;
pub mod scratch;
pub mod store;
pub mod sync;
pub mod types;
pub mod uploader;

// Re-export commonly used types and functions
pub use error::{ApiError, AssetError, StoreError, SyncError};
pub use progress::{ServiceError, ServiceState, SyncReporter};
pub use sync::{SyncEngine, SyncOptions, SyncSummary};
pub use types::{DeleteTask, LocalAsset, RemoteFile, TaskKind, UploadTask};

// vim: ts=4
