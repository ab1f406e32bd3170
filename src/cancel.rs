//! Cooperative cancellation token
//!
//! Long-running syncs can be cut short by an external time budget (a
//! background-execution deadline). Phases check the token between work
//! items: in-flight items finish naturally, no new work is scheduled, and
//! uncommitted batches are simply retried in full next run.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
	cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn cancel(&self) {
		self.cancelled.store(true, Ordering::Relaxed);
	}

	pub fn is_cancelled(&self) -> bool {
		self.cancelled.load(Ordering::Relaxed)
	}
}


// vim: ts=4
