//! Configuration File Tests
//!
//! Loads, saves and validates TOML configuration on disk.

use std::io::Write;

use tempfile::NamedTempFile;
use trend_cache::config::{Config, MEBIBYTE};
use trend_cache::TrendFunctionCache;

fn write_config(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

#[test]
fn test_load_from_file() {
    let file = write_config(
        r#"
[cache]
size_bytes = 16777216

[logging]
log_level = "debug"
"#,
    );

    let config = Config::from_file(file.path().to_str().unwrap()).unwrap();
    assert_eq!(config.cache.size_bytes, 16 * MEBIBYTE);
    assert_eq!(config.logging.log_level, "debug");
    assert!(config.validate().is_ok());
}

#[test]
fn test_missing_sections_use_defaults() {
    let file = write_config("");
    let config = Config::from_file(file.path().to_str().unwrap()).unwrap();

    assert_eq!(config.cache.size_bytes, 4 * MEBIBYTE);
    assert_eq!(config.logging.log_level, "info");
}

#[test]
fn test_zero_size_disables_cache() {
    let file = write_config("[cache]\nsize_bytes = 0\n");
    let config = Config::from_file(file.path().to_str().unwrap()).unwrap();

    assert!(config.validate().is_ok());
    assert!(TrendFunctionCache::new(&config.cache).is_none());
}

#[test]
fn test_out_of_range_size_rejected() {
    let file = write_config("[cache]\nsize_bytes = 1024\n");
    let config = Config::from_file(file.path().to_str().unwrap()).unwrap();

    let err = config.validate().unwrap_err();
    assert!(err.to_string().contains("cache.size_bytes"));
}

#[test]
fn test_malformed_file() {
    let file = write_config("[cache\nsize_bytes = ");
    assert!(Config::from_file(file.path().to_str().unwrap()).is_err());
    assert!(Config::from_file("/nonexistent/trend-cache.toml").is_err());
}

#[test]
fn test_save_and_reload() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("trend-cache.toml");
    let path = path.to_str().unwrap();

    let mut config = Config::default();
    config.cache.size_bytes = 64 * MEBIBYTE;
    config.save_to_file(path).unwrap();

    let loaded = Config::from_file(path).unwrap();
    assert_eq!(loaded.cache.size_bytes, 64 * MEBIBYTE);
}
