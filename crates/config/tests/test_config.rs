//! Tests for Config serialization, deserialization, and accessors

use std::time::Duration;

use taskwire_config::{Config, Credentials, DispatchConfig, LlmConfig};
use tempfile::TempDir;

/// Helper to create a temporary directory for tests
fn temp_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp dir")
}

/// Test that default Config has expected values
#[test]
fn test_config_defaults() {
    let config = Config::default();

    assert!(config.llm.api_key.is_empty());
    assert!(config.llm.api_base.is_none());
    assert_eq!(config.llm.model, "gemini-2.5-flash");
    assert_eq!(config.llm.max_tokens, 4096);
    assert_eq!(config.llm.temperature, 0.7);

    assert_eq!(config.dispatch.default_timeout_secs, 30);
    assert_eq!(config.dispatch.max_parallelism, 4);
    assert_eq!(config.dispatch.max_payload_chars, 8000);
    assert!(config.dispatch.provider_timeouts.is_empty());

    assert!(config.credentials.is_empty());
}

#[test]
fn test_section_defaults_match_root() {
    let llm = LlmConfig::default();
    let dispatch = DispatchConfig::default();
    let config = Config::default();

    assert_eq!(llm.model, config.llm.model);
    assert_eq!(dispatch.max_parallelism, config.dispatch.max_parallelism);
}

/// Partial files fill the rest with defaults
#[test]
fn test_partial_json_uses_defaults() {
    let json = r#"{ "dispatch": { "max_parallelism": 2 } }"#;
    let config: Config = serde_json::from_str(json).unwrap();

    assert_eq!(config.dispatch.max_parallelism, 2);
    assert_eq!(config.dispatch.default_timeout_secs, 30);
    assert_eq!(config.llm.model, "gemini-2.5-flash");
}

#[test]
fn test_empty_json_object() {
    let config: Config = serde_json::from_str("{}").unwrap();
    assert_eq!(config.dispatch.max_payload_chars, 8000);
}

#[test]
fn test_api_base_skipped_when_none() {
    let config = Config::default();
    let json = serde_json::to_string(&config).unwrap();
    assert!(!json.contains("api_base"));
}

#[test]
fn test_provider_timeout_overrides() {
    let mut config = Config::default();
    config
        .dispatch
        .provider_timeouts
        .insert("arxiv".to_string(), 90);

    let overrides = config.provider_timeout_overrides();
    assert_eq!(overrides.len(), 1);
    assert_eq!(overrides["arxiv"], Duration::from_secs(90));
    assert!(!overrides.contains_key("wikipedia"));
}

/// Zero values in the file never produce a zero timeout or zero parallelism
#[test]
fn test_zero_values_are_floored() {
    let mut config = Config::default();
    config.dispatch.default_timeout_secs = 0;
    config.dispatch.max_parallelism = 0;
    config
        .dispatch
        .provider_timeouts
        .insert("serper_search".to_string(), 0);

    assert_eq!(config.default_timeout(), Duration::from_secs(1));
    assert_eq!(config.max_parallelism(), 1);
    assert_eq!(
        config.provider_timeout_overrides()["serper_search"],
        Duration::from_secs(1)
    );
}

#[test]
fn test_llm_api_key_prefers_config() {
    let mut config = Config::default();
    let creds = Credentials::from_pairs([("GEMINI_API_KEY", "env-key")]);

    assert_eq!(config.llm_api_key(&creds), Some("env-key".to_string()));

    config.llm.api_key = "config-key".to_string();
    assert_eq!(config.llm_api_key(&creds), Some("config-key".to_string()));
}

#[test]
fn test_llm_api_key_none() {
    let config = Config::default();
    assert_eq!(config.llm_api_key(&Credentials::new()), None);
    assert!(!config.has_llm_api_key(&Credentials::new()));
}

#[tokio::test]
async fn test_load_missing_file_returns_defaults() {
    let dir = temp_dir();
    let path = dir.path().join("nope.json");

    let config = Config::load_from(&path).await.unwrap();
    assert_eq!(config.dispatch.max_parallelism, 4);
}

#[tokio::test]
async fn test_save_and_load_roundtrip() {
    let dir = temp_dir();
    let path = dir.path().join("nested").join("config.json");

    let mut config = Config::default();
    config.llm.model = "custom-model".to_string();
    config.dispatch.max_payload_chars = 1234;
    config
        .credentials
        .insert("SERPER_API_KEY".to_string(), "from-file".to_string());

    config.save_to(&path).await.unwrap();
    assert!(path.exists());

    let loaded = Config::load_from(&path).await.unwrap();
    assert_eq!(loaded.llm.model, "custom-model");
    assert_eq!(loaded.dispatch.max_payload_chars, 1234);
    assert_eq!(loaded.credentials["SERPER_API_KEY"], "from-file");
}

#[tokio::test]
async fn test_load_invalid_json_fails() {
    let dir = temp_dir();
    let path = dir.path().join("config.json");
    tokio::fs::write(&path, "{ not json").await.unwrap();

    let result = Config::load_from(&path).await;
    assert!(result.is_err());
}
