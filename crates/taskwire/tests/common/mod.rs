//! Common test utilities for taskwire integration tests
#![allow(dead_code)]

use assert_cmd::Command;
use std::path::PathBuf;
use tempfile::{tempdir, TempDir};

/// Every credential the built-in providers or the LLM backend read
pub const CREDENTIAL_VARS: &[&str] = &[
    "GOOGLE_API_KEY",
    "GOOGLE_CSE_ID",
    "SERPER_API_KEY",
    "WOLFRAM_ALPHA_APPID",
    "ASKNEWS_CLIENT_ID",
    "ASKNEWS_CLIENT_SECRET",
    "APIFY_API_TOKEN",
    "GEMINI_API_KEY",
];

/// Isolated HOME with its own config directory
pub struct TestEnv {
    pub temp_dir: TempDir,
    pub config_dir: PathBuf,
}

impl TestEnv {
    pub fn new() -> anyhow::Result<Self> {
        let temp_dir = tempdir()?;
        let config_dir = temp_dir.path().join(".taskwire");
        std::fs::create_dir_all(&config_dir)?;

        Ok(Self {
            temp_dir,
            config_dir,
        })
    }

    pub fn config_file(&self) -> PathBuf {
        self.config_dir.join("config.json")
    }

    /// Command with HOME redirected and no credentials inherited
    pub fn command(&self) -> Command {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_taskwire"));
        cmd.env("HOME", self.temp_dir.path());
        cmd.env_remove("RUST_LOG");
        for var in CREDENTIAL_VARS {
            cmd.env_remove(var);
        }
        cmd
    }

    pub fn write_config(&self, json: &str) -> anyhow::Result<()> {
        std::fs::write(self.config_file(), json)?;
        Ok(())
    }
}

impl Default for TestEnv {
    fn default() -> Self {
        Self::new().expect("Failed to create test environment")
    }
}
