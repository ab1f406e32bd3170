//! Reconciliation engine
//!
//! The three-way diff. Pure function over the current index snapshot: no
//! network calls, no store writes. Every local asset with an assigned path
//! consumes its matching remote file from a lookup; whatever survives the
//! pass has no local owner and becomes a delete task.

use std::collections::BTreeMap;

use crate::logging::*;
use crate::types::{DeleteTask, LocalAsset, RemoteFile, TaskKind, UploadTask};

/// The reconciler's output worklists
#[derive(Debug, Default)]
pub struct Worklists {
	pub uploads: Vec<UploadTask>,
	pub deletes: Vec<DeleteTask>,
}

/// Classify every known asset/file pair into an action.
///
/// `run_id` is the local snapshot pass that just completed: records not
/// stamped with it belong to assets no longer on the device, and their
/// remote files become deletes instead of upload candidates. For each
/// device-present combination of remote match and hash state:
/// no match at the path → new; match with equal hashes → unchanged (no
/// action); match but local hash not yet computed → unknown (read and hash
/// before deciding); match with differing hashes → replacement. Remote
/// files left unmatched are orphans and get deleted.
pub fn classify(run_id: &str, assets: &[LocalAsset], remote_files: &[RemoteFile]) -> Worklists {
	let mut by_path: BTreeMap<&str, &RemoteFile> =
		remote_files.iter().map(|f| (f.path_lower.as_str(), f)).collect();

	let mut lists = Worklists::default();

	for asset in assets {
		// Not yet through path assignment; it will be picked up next run
		let path = match &asset.assigned_path {
			Some(path) => path,
			None => continue,
		};

		if asset.sync_run.as_deref() != Some(run_id) {
			// Asset left the device; its record was kept only so the
			// remote copy can be deleted under its known revision
			if let Some(remote) = by_path.remove(path.as_str()) {
				lists.deletes.push(DeleteTask {
					path_lower: remote.path_lower.clone(),
					revision: remote.revision.clone(),
					asset_id: Some(asset.asset_id.clone()),
				});
			}
			continue;
		}

		let task = match by_path.remove(path.as_str()) {
			None => UploadTask {
				asset_id: asset.asset_id.clone(),
				path: path.clone(),
				client_modified: asset.created_at.or(asset.modified_at),
				existing_content_hash: None,
				kind: TaskKind::New,
			},
			Some(remote) => {
				match &asset.content_hash {
					Some(hash) if *hash == remote.content_hash => continue,
					hash => UploadTask {
						asset_id: asset.asset_id.clone(),
						path: path.clone(),
						client_modified: asset.created_at.or(asset.modified_at),
						existing_content_hash: Some(remote.content_hash.clone()),
						kind: if hash.is_some() {
							TaskKind::Replacement
						} else {
							TaskKind::Unknown
						},
					},
				}
			}
		};
		lists.uploads.push(task);
	}

	// Survivors are remote orphans with no local record at all. Path
	// descending puts the most recent date buckets first; a
	// processing-priority heuristic, nothing more.
	lists.deletes.extend(by_path.into_values().map(|f| DeleteTask {
		path_lower: f.path_lower.clone(),
		revision: f.revision.clone(),
		asset_id: None,
	}));
	lists.deletes.sort_by(|a, b| b.path_lower.cmp(&a.path_lower));

	debug!(
		"Classified {} upload(s) and {} delete(s)",
		lists.uploads.len(),
		lists.deletes.len()
	);
	lists
}

#[cfg(test)]
mod tests {
	use super::*;

	const RUN: &str = "run-current";

	fn local(id: &str, path: Option<&str>, hash: Option<&str>) -> LocalAsset {
		let mut asset = LocalAsset::new(id, "img.jpg");
		asset.assigned_path = path.map(String::from);
		asset.content_hash = hash.map(String::from);
		asset.sync_run = Some(RUN.to_string());
		asset
	}

	fn remote(path: &str, hash: &str) -> RemoteFile {
		RemoteFile {
			remote_id: format!("id:{}", path),
			path_lower: path.to_string(),
			revision: "rev1".to_string(),
			content_hash: hash.to_string(),
			modified_at: None,
		}
	}

	#[test]
	fn test_no_remote_match_is_new() {
		let lists = classify(RUN, &[local("a", Some("/2024/01/img.jpg"), None)], &[]);
		assert_eq!(lists.uploads.len(), 1);
		assert_eq!(lists.uploads[0].kind, TaskKind::New);
		assert!(lists.uploads[0].existing_content_hash.is_none());
		assert!(lists.deletes.is_empty());
	}

	#[test]
	fn test_matching_hashes_are_unchanged() {
		let lists = classify(
			RUN,
			&[local("a", Some("/2024/01/img.jpg"), Some("h1"))],
			&[remote("/2024/01/img.jpg", "h1")],
		);
		assert!(lists.uploads.is_empty());
		assert!(lists.deletes.is_empty());
	}

	#[test]
	fn test_unknown_local_hash_must_be_read() {
		let lists = classify(
			RUN,
			&[local("a", Some("/2024/01/img.jpg"), None)],
			&[remote("/2024/01/img.jpg", "h1")],
		);
		assert_eq!(lists.uploads.len(), 1);
		assert_eq!(lists.uploads[0].kind, TaskKind::Unknown);
		assert_eq!(lists.uploads[0].existing_content_hash.as_deref(), Some("h1"));
	}

	#[test]
	fn test_differing_hashes_are_replacement() {
		let lists = classify(
			RUN,
			&[local("a", Some("/2024/01/img.jpg"), Some("h2"))],
			&[remote("/2024/01/img.jpg", "h1")],
		);
		assert_eq!(lists.uploads.len(), 1);
		assert_eq!(lists.uploads[0].kind, TaskKind::Replacement);
	}

	#[test]
	fn test_unmatched_remote_is_orphan_delete() {
		let lists = classify(RUN, &[], &[remote("/2024/01/gone.jpg", "h1")]);
		assert!(lists.uploads.is_empty());
		assert_eq!(lists.deletes.len(), 1);
		assert_eq!(lists.deletes[0].path_lower, "/2024/01/gone.jpg");
		assert_eq!(lists.deletes[0].revision, "rev1");
	}

	#[test]
	fn test_unassigned_asset_is_skipped() {
		let lists = classify(RUN, &[local("a", None, None)], &[]);
		assert!(lists.uploads.is_empty());
		assert!(lists.deletes.is_empty());
	}

	#[test]
	fn test_delete_ordering_path_descending() {
		let lists = classify(
			RUN,
			&[],
			&[remote("/2023/01/a.jpg", "h"), remote("/2024/06/b.jpg", "h"), remote("/2024/01/c.jpg", "h")],
		);
		let paths: Vec<&str> = lists.deletes.iter().map(|d| d.path_lower.as_str()).collect();
		assert_eq!(paths, vec!["/2024/06/b.jpg", "/2024/01/c.jpg", "/2023/01/a.jpg"]);
	}

	#[test]
	fn test_full_combination_table() {
		// local present+absent x remote present+absent x hash match+mismatch
		let assets = vec![
			local("new", Some("/p/new.jpg"), None),
			local("same", Some("/p/same.jpg"), Some("h")),
			local("diff", Some("/p/diff.jpg"), Some("h-local")),
			local("unk", Some("/p/unk.jpg"), None),
		];
		let remotes = vec![
			remote("/p/same.jpg", "h"),
			remote("/p/diff.jpg", "h-remote"),
			remote("/p/unk.jpg", "h"),
			remote("/p/orphan.jpg", "h"),
		];
		let lists = classify(RUN, &assets, &remotes);

		let kinds: BTreeMap<&str, TaskKind> =
			lists.uploads.iter().map(|u| (u.path.as_str(), u.kind)).collect();
		assert_eq!(kinds.len(), 3);
		assert_eq!(kinds["/p/new.jpg"], TaskKind::New);
		assert_eq!(kinds["/p/diff.jpg"], TaskKind::Replacement);
		assert_eq!(kinds["/p/unk.jpg"], TaskKind::Unknown);

		assert_eq!(lists.deletes.len(), 1);
		assert_eq!(lists.deletes[0].path_lower, "/p/orphan.jpg");
		assert!(lists.deletes[0].asset_id.is_none());
	}

	#[test]
	fn test_device_absent_record_becomes_delete() {
		let mut gone = local("gone", Some("/2024/01/img.jpg"), Some("h"));
		gone.sync_run = Some("run-previous".to_string());
		gone.remote_id = Some("id:1".to_string());

		let lists = classify(RUN, &[gone], &[remote("/2024/01/img.jpg", "h")]);

		// Matching hashes don't save it: the device no longer has the asset
		assert!(lists.uploads.is_empty());
		assert_eq!(lists.deletes.len(), 1);
		assert_eq!(lists.deletes[0].path_lower, "/2024/01/img.jpg");
		assert_eq!(lists.deletes[0].revision, "rev1");
		assert_eq!(lists.deletes[0].asset_id.as_deref(), Some("gone"));
	}

	#[test]
	fn test_device_absent_without_remote_match_is_no_action() {
		let mut gone = local("gone", Some("/2024/01/img.jpg"), Some("h"));
		gone.sync_run = Some("run-previous".to_string());

		let lists = classify(RUN, &[gone], &[]);
		assert!(lists.uploads.is_empty());
		assert!(lists.deletes.is_empty());
	}
}

// vim: ts=4
