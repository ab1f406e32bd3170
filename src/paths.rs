//! Deterministic upload path assignment
//!
//! Every asset gets a relative path `/<YYYY>/<MM>/<filename>` (lower-cased),
//! bucketed by creation date in the timezone the photo was probably taken
//! in. Assets without a creation date land in a fixed sentinel bucket.
//!
//! Collisions (two photos with the same name in the same month) are
//! resolved by a single ordered pass so that re-running over an unchanged
//! asset set yields byte-identical assignments. Order-dependence anywhere
//! else would cause needless re-uploads.

use chrono::{Datelike, FixedOffset, Offset, Utc};
use std::collections::BTreeSet;

use crate::asset_library::{AssetRef, Coordinate};

/// Date bucket for assets with no creation timestamp
pub const NO_DATE_BUCKET: &str = "No date";

/// Resolves a coordinate to the timezone a photo was taken in. The host
/// application can plug in a real reverse geocoder; the default estimates
/// a fixed offset from longitude.
pub trait TimezoneResolver: Send + Sync {
	fn resolve(&self, coordinate: &Coordinate) -> Option<FixedOffset>;
}

/// Longitude-based offset estimate, 15 degrees per hour. Wrong near
/// political timezone borders, but stable, offline, and close enough to
/// put a photo in the right month.
pub struct LongitudeEstimate;

impl TimezoneResolver for LongitudeEstimate {
	fn resolve(&self, coordinate: &Coordinate) -> Option<FixedOffset> {
		if !coordinate.longitude.is_finite() {
			return None;
		}
		let hours = (coordinate.longitude / 15.0).round() as i32;
		FixedOffset::east_opt(hours.clamp(-12, 14) * 3600)
	}
}

/// Resolver that ignores the coordinate, pinning every date bucket to UTC
pub struct UtcOnly;

impl TimezoneResolver for UtcOnly {
	fn resolve(&self, _coordinate: &Coordinate) -> Option<FixedOffset> {
		None
	}
}

/// The path this asset wants, as a pure function of its own data.
/// Cross-asset collisions are resolved separately by [`resolve_collisions`].
pub fn preferred_path(asset: &AssetRef, timezones: &dyn TimezoneResolver) -> String {
	let bucket = match asset.created_at {
		Some(created) => {
			let offset = asset
				.coordinate
				.as_ref()
				.and_then(|c| timezones.resolve(c))
				.unwrap_or_else(|| Utc.fix());
			let local = created.with_timezone(&offset);
			format!("{:04}/{:02}", local.year(), local.month())
		}
		None => NO_DATE_BUCKET.to_string(),
	};
	format!("/{}/{}", bucket, asset.filename).to_lowercase()
}

/// A pending path assignment for one asset
#[derive(Debug, Clone)]
pub struct PathClaim {
	pub asset_id: String,
	pub created_at: Option<chrono::DateTime<Utc>>,
	pub preferred: String,
}

/// Resolve collisions over every asset missing a final path.
///
/// `claimed` seeds the already-assigned paths of untouched assets and is
/// extended with each new assignment. Pending claims are walked in one
/// stable total order (creation ascending, then asset id), so the outcome
/// never depends on enumeration order. Once a suffix is assigned it sticks:
/// deleting a colliding sibling does not collapse the survivor back to the
/// un-suffixed form on later runs, because the survivor keeps its stored
/// assignment and never re-enters this pass.
pub fn resolve_collisions(
	mut pending: Vec<PathClaim>,
	claimed: &mut BTreeSet<String>,
) -> Vec<(String, String)> {
	pending.sort_by(|a, b| {
		a.created_at.cmp(&b.created_at).then_with(|| a.asset_id.cmp(&b.asset_id))
	});

	let mut assignments = Vec::with_capacity(pending.len());
	for claim in pending {
		let mut path = claim.preferred;
		while claimed.contains(&path) {
			path = bump_suffix(&path);
		}
		claimed.insert(path.clone());
		assignments.push((claim.asset_id, path));
	}
	assignments
}

/// Transform `name.ext` into `name (1).ext`, or increment an existing
/// `name (N).ext` suffix.
fn bump_suffix(path: &str) -> String {
	let (dir, filename) = match path.rfind('/') {
		Some(i) => (&path[..=i], &path[i + 1..]),
		None => ("", path),
	};
	let (stem, ext) = match filename.rfind('.') {
		Some(i) if i > 0 => (&filename[..i], &filename[i..]),
		_ => (filename, ""),
	};
	format!("{}{}{}", dir, bump_stem(stem), ext)
}

fn bump_stem(stem: &str) -> String {
	if let Some(open) = stem.rfind(" (") {
		if let Some(digits) = stem[open + 2..].strip_suffix(')') {
			if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) {
				if let Ok(n) = digits.parse::<u64>() {
					return format!("{} ({})", &stem[..open], n + 1);
				}
			}
		}
	}
	format!("{} (1)", stem)
}


// vim: ts=4
