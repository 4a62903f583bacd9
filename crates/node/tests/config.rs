use hl_node::{ConfigError, NodeConfig, CONFIG_FILE_NAME};

use std::fs;

use tempfile::tempdir;

#[test]
fn missing_config_is_created_with_defaults() {
	let data_dir = tempdir().unwrap();

	let config = NodeConfig::load(data_dir.path()).unwrap();

	assert_eq!(config, NodeConfig::default());
	assert!(data_dir.path().join(CONFIG_FILE_NAME).is_file());
	assert_eq!(NodeConfig::load(data_dir.path()).unwrap(), config);
}

#[test]
fn unversioned_config_is_migrated_and_saved() {
	let data_dir = tempdir().unwrap();
	fs::write(
		data_dir.path().join(CONFIG_FILE_NAME),
		r#"{ "device": { "file_name": "App" } }"#,
	)
	.unwrap();

	let config = NodeConfig::load(data_dir.path()).unwrap();
	assert_eq!(config.version, NodeConfig::TARGET_VERSION);
	assert_eq!(config.device.file_name, "App");

	let saved: serde_json::Value =
		serde_json::from_str(&fs::read_to_string(data_dir.path().join(CONFIG_FILE_NAME)).unwrap())
			.unwrap();
	assert_eq!(saved["version"], NodeConfig::TARGET_VERSION);
}

#[test]
fn newer_config_is_refused() {
	let data_dir = tempdir().unwrap();
	fs::write(data_dir.path().join(CONFIG_FILE_NAME), r#"{ "version": 99 }"#).unwrap();

	assert!(matches!(
		NodeConfig::load(data_dir.path()),
		Err(ConfigError::UnknownVersion(99))
	));
}

#[test]
fn broken_config_names_the_file() {
	let data_dir = tempdir().unwrap();
	fs::write(data_dir.path().join(CONFIG_FILE_NAME), "{ nope").unwrap();

	let err = NodeConfig::load(data_dir.path()).unwrap_err();
	assert!(matches!(err, ConfigError::Parse { .. }));
	assert!(err.to_string().contains(CONFIG_FILE_NAME));
}
