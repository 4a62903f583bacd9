use hl_files::{next_index, resolve_path, IndexError, FIRST_INDEX};

use std::{fs, path::Path};

use tempfile::tempdir;

fn touch(dir: &Path, name: &str) {
	fs::write(dir.join(name), b"").unwrap();
}

#[test]
fn empty_or_missing_directory_is_index_one() {
	let dir = tempdir().unwrap();

	assert_eq!(next_index(dir.path(), "App").unwrap(), FIRST_INDEX);
	assert_eq!(
		next_index(dir.path().join("does-not-exist"), "App").unwrap(),
		FIRST_INDEX
	);
}

#[test]
fn highest_index_wins() {
	for indexes in [vec![1], vec![3, 1, 2], vec![7, 12, 9], vec![2, 100]] {
		let dir = tempdir().unwrap();
		for i in &indexes {
			touch(dir.path(), &format!("App_{i}.log"));
		}

		assert_eq!(
			next_index(dir.path(), "App").unwrap(),
			*indexes.iter().max().unwrap(),
			"indexes: {indexes:?}"
		);
	}
}

#[test]
fn mismatched_names_are_ignored() {
	let dir = tempdir().unwrap();
	for name in [
		"App_1.log",
		"App_2.log",
		"App+abc.log",
		"App_4.log",
		"App-5.log",
		"App_x9.log",
		"Other_50.log",
	] {
		touch(dir.path(), name);
	}

	assert_eq!(next_index(dir.path(), "App").unwrap(), 4);
}

#[test]
fn create_new_always_increments() {
	let dir = tempdir().unwrap();

	let first = resolve_path(dir.path(), "App", true).unwrap();
	assert_eq!(first.index, 2);
	assert!(first.is_new);

	touch(dir.path(), "App_1.log");
	touch(dir.path(), "App_5.log");

	let resolved = resolve_path(dir.path(), "App", true).unwrap();
	assert_eq!(resolved.index, 6);
	assert_eq!(resolved.path, dir.path().join("App_6.log"));
	assert!(resolved.is_new);
}

#[test]
fn append_on_empty_directory_creates_index_one() {
	let dir = tempdir().unwrap();

	let resolved = resolve_path(dir.path(), "App", false).unwrap();
	assert_eq!(resolved.index, 1);
	assert_eq!(resolved.path, dir.path().join("App_1.log"));
	assert!(resolved.is_new);
}

#[test]
fn append_targets_latest_existing_file() {
	let dir = tempdir().unwrap();
	touch(dir.path(), "App_1.log");
	touch(dir.path(), "App_3.log");

	let resolved = resolve_path(dir.path(), "App", false).unwrap();
	assert_eq!(resolved.index, 3);
	assert!(!resolved.is_new);
}

#[test]
fn append_falls_back_to_index_one_when_latest_is_not_a_log_file() {
	let dir = tempdir().unwrap();
	// Counts towards the index but there is no `App_4.log` to append to.
	touch(dir.path(), "App_4.txt");

	let resolved = resolve_path(dir.path(), "App", false).unwrap();
	assert_eq!(resolved.index, 1);
	assert!(resolved.is_new);

	touch(dir.path(), "App_1.log");
	let resolved = resolve_path(dir.path(), "App", false).unwrap();
	assert_eq!(resolved.index, 1);
	assert!(!resolved.is_new);
}

#[test]
fn create_new_after_the_largest_index_is_refused() {
	let dir = tempdir().unwrap();
	touch(dir.path(), &format!("App_{}.log", u64::MAX));

	assert!(matches!(
		resolve_path(dir.path(), "App", true),
		Err(IndexError::Exhausted {
			last_index: u64::MAX,
			..
		})
	));

	let resolved = resolve_path(dir.path(), "App", false).unwrap();
	assert_eq!(resolved.index, u64::MAX);
	assert!(!resolved.is_new);
}

#[cfg(unix)]
#[test]
fn unreadable_directory_is_reported() {
	use std::os::unix::fs::PermissionsExt;

	let dir = tempdir().unwrap();
	let locked = dir.path().join("locked");
	fs::create_dir(&locked).unwrap();
	fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

	// Root ignores directory permissions, so only assert when the listing really fails.
	if fs::read_dir(&locked).is_err() {
		assert!(next_index(&locked, "App").is_err());
	}

	fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
}
