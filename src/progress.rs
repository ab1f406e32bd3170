//! Progress and error reporting
//!
//! A small set of named counters plus an append-only error list, shared by
//! every phase and polled by whatever surface the host application has.
//! Purely observational: nothing in here drives retries.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use crate::logging::*;

/// Progress of one named phase
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServiceState {
	pub progress: usize,
	pub total: usize,
	pub complete: bool,
}

/// One recorded failure. `path` is the remote path the failure relates
/// to, or "/" for phase-level failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceError {
	pub path: String,
	pub message: String,
	pub cause: Option<String>,
}

impl ServiceError {
	pub fn new(path: &str, message: &str) -> Self {
		ServiceError { path: path.to_string(), message: message.to_string(), cause: None }
	}

	pub fn with_cause(path: &str, message: &str, cause: &dyn std::fmt::Display) -> Self {
		ServiceError {
			path: path.to_string(),
			message: message.to_string(),
			cause: Some(cause.to_string()),
		}
	}
}

#[derive(Debug, Default)]
struct ReporterState {
	counters: BTreeMap<String, ServiceState>,
	errors: Vec<ServiceError>,
}

/// Point-in-time view of all counters and errors
#[derive(Debug, Clone, Default)]
pub struct ReportSnapshot {
	pub counters: BTreeMap<String, ServiceState>,
	pub errors: Vec<ServiceError>,
}

/// Shared reporter handle. Cheap to clone; every phase gets one and
/// updates its own counter independently.
#[derive(Debug, Clone, Default)]
pub struct SyncReporter {
	state: Arc<Mutex<ReporterState>>,
}

impl SyncReporter {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn set_progress(&self, name: &str, progress: usize, total: usize) {
		let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
		let counter = state.counters.entry(name.to_string()).or_default();
		counter.progress = progress;
		counter.total = total;
	}

	/// Pin the counter to its total and flag the phase finished
	pub fn mark_complete(&self, name: &str) {
		let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
		let counter = state.counters.entry(name.to_string()).or_default();
		counter.progress = counter.total;
		counter.complete = true;
	}

	/// Append a structured error. No failure path may skip this: the
	/// error list is the only place failures surface.
	pub fn record_error(&self, error: ServiceError) {
		warn!("Recorded error at {}: {}", error.path, error.message);
		let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
		state.errors.push(error);
	}

	pub fn snapshot(&self) -> ReportSnapshot {
		let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
		ReportSnapshot { counters: state.counters.clone(), errors: state.errors.clone() }
	}

	pub fn errors(&self) -> Vec<ServiceError> {
		self.state.lock().unwrap_or_else(|e| e.into_inner()).errors.clone()
	}
}


// vim: ts=4
