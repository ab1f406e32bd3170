//! Error types for photo sync operations

use std::error::Error;
use std::fmt;
use std::io;

/// Main error type for sync operations
#[derive(Debug)]
pub enum SyncError {
	/// Asset library error (nested)
	Asset(AssetError),

	/// Remote store API error (nested)
	Api(ApiError),

	/// Local index store error (nested)
	Store(StoreError),

	/// I/O error
	Io(io::Error),

	/// Generic error message
	Other { message: String },
}

impl SyncError {
	/// True if this error means the stored credential is no longer valid
	/// and the caller must restart the connect flow.
	pub fn is_auth_required(&self) -> bool {
		matches!(self, SyncError::Api(ApiError::Auth))
	}
}

impl fmt::Display for SyncError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			SyncError::Asset(e) => write!(f, "Asset library error: {}", e),
			SyncError::Api(e) => write!(f, "Remote store error: {}", e),
			SyncError::Store(e) => write!(f, "Index store error: {}", e),
			SyncError::Io(e) => write!(f, "I/O error: {}", e),
			SyncError::Other { message } => write!(f, "{}", message),
		}
	}
}

impl Error for SyncError {}

impl From<io::Error> for SyncError {
	fn from(e: io::Error) -> Self {
		SyncError::Io(e)
	}
}

impl From<String> for SyncError {
	fn from(e: String) -> Self {
		SyncError::Other { message: e }
	}
}

impl From<AssetError> for SyncError {
	fn from(e: AssetError) -> Self {
		SyncError::Asset(e)
	}
}

impl From<ApiError> for SyncError {
	fn from(e: ApiError) -> Self {
		SyncError::Api(e)
	}
}

impl From<StoreError> for SyncError {
	fn from(e: StoreError) -> Self {
		SyncError::Store(e)
	}
}

/// Device-side asset library errors. Always per-item: a bad asset is
/// recorded and skipped, it never aborts a batch.
#[derive(Debug)]
pub enum AssetError {
	/// The library could not produce the asset's bytes
	Fetch { asset_id: String, message: String },

	/// Enumerating the asset collection failed
	Enumerate { message: String },

	/// I/O error reading an exported file
	Io(io::Error),
}

impl fmt::Display for AssetError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			AssetError::Fetch { asset_id, message } => {
				write!(f, "Can't fetch asset {}: {}", asset_id, message)
			}
			AssetError::Enumerate { message } => {
				write!(f, "Asset enumeration failed: {}", message)
			}
			AssetError::Io(e) => write!(f, "Asset read failed: {}", e),
		}
	}
}

impl Error for AssetError {}

impl From<io::Error> for AssetError {
	fn from(e: io::Error) -> Self {
		AssetError::Io(e)
	}
}

/// Remote object store API errors
#[derive(Debug)]
pub enum ApiError {
	/// The credential is invalid; the connect flow must be restarted.
	/// The one error class that interrupts the whole sync.
	Auth,

	/// Network-level failure reaching the endpoint
	Transport { message: String },

	/// The endpoint answered with something we can't use
	Protocol { message: String },
}

impl fmt::Display for ApiError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			ApiError::Auth => write!(f, "Authentication expired, reconnect required"),
			ApiError::Transport { message } => write!(f, "Transport error: {}", message),
			ApiError::Protocol { message } => write!(f, "Protocol error: {}", message),
		}
	}
}

impl Error for ApiError {}

/// Local index store errors. Treated as fatal: the index lives on device
/// storage that is assumed always writable.
#[derive(Debug)]
pub enum StoreError {
	/// Database-level failure (open, transaction, table, commit)
	Database { message: String },

	/// A stored record failed to deserialize
	Corrupted { message: String },
}

impl fmt::Display for StoreError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			StoreError::Database { message } => write!(f, "Database error: {}", message),
			StoreError::Corrupted { message } => write!(f, "Index corrupted: {}", message),
		}
	}
}

impl Error for StoreError {}

impl From<redb::DatabaseError> for StoreError {
	fn from(e: redb::DatabaseError) -> Self {
		StoreError::Database { message: e.to_string() }
	}
}

impl From<redb::TransactionError> for StoreError {
	fn from(e: redb::TransactionError) -> Self {
		StoreError::Database { message: e.to_string() }
	}
}

impl From<redb::TableError> for StoreError {
	fn from(e: redb::TableError) -> Self {
		StoreError::Database { message: e.to_string() }
	}
}

impl From<redb::StorageError> for StoreError {
	fn from(e: redb::StorageError) -> Self {
		StoreError::Database { message: e.to_string() }
	}
}

impl From<redb::CommitError> for StoreError {
	fn from(e: redb::CommitError) -> Self {
		StoreError::Database { message: e.to_string() }
	}
}

impl From<serde_json::Error> for StoreError {
	fn from(e: serde_json::Error) -> Self {
		StoreError::Corrupted { message: e.to_string() }
	}
}

// vim: ts=4
