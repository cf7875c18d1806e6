use crate::{
    errors::GateResult,
    policy::{Mode, Policy},
};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub policy: PolicyConfig,
    pub server: Server,
    pub auth: Auth,
    #[serde(default)]
    pub logging: Logging,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PolicyConfig {
    pub base_dir: PathBuf,
    #[serde(default)]
    pub mode: Mode,
    #[serde(default)]
    pub whitelist_pattern: Option<String>,
    #[serde(default)]
    pub enforce_whitelist: bool,
    #[serde(default)]
    pub check_symlinks: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Server {
    pub bind_addr: String,
    pub port: u16,
    #[serde(default = "default_base_path")]
    pub base_path: String,
    #[serde(default = "default_max_request_kb")]
    pub max_request_kb: usize,
}
fn default_base_path() -> String { "/gate".to_string() }
fn default_max_request_kb() -> usize { 16 }

#[derive(Debug, Deserialize, Clone)]
pub struct Auth {
    pub bearer_token: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Logging {
    #[serde(default = "default_level")]
    pub level: String,
    #[serde(default = "default_json")]
    pub json: bool,
}
fn default_level() -> String { "info".to_string() }
fn default_json() -> bool { true }

impl Default for Logging {
    fn default() -> Self {
        Self { level: default_level(), json: default_json() }
    }
}

impl Config {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = fs::read_to_string(path)?;
        if path.extension().map(|e| e == "json").unwrap_or(false) {
            Ok(serde_json::from_str(&raw)?)
        } else {
            Ok(toml::from_str(&raw)?)
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if !self.policy.base_dir.is_dir() {
            anyhow::bail!("base_dir does not exist or is not a directory: {}", self.policy.base_dir.display());
        }
        if matches!(&self.policy.whitelist_pattern, Some(p) if p.is_empty()) {
            anyhow::bail!("whitelist_pattern must not be empty when set");
        }
        if self.auth.bearer_token.trim().is_empty() { anyhow::bail!("bearer_token must not be empty"); }
        if !self.server.base_path.starts_with('/') { anyhow::bail!("base_path must start with '/'"); }
        if self.server.max_request_kb == 0 { anyhow::bail!("max_request_kb must be > 0"); }
        Ok(())
    }

    pub fn build_policy(&self) -> GateResult<Policy> {
        let mut policy = Policy::new(&self.policy.base_dir)?.with_mode(self.policy.mode)?;
        if let Some(pattern) = &self.policy.whitelist_pattern {
            policy = policy.with_whitelist_pattern(pattern)?;
        }
        Ok(policy
            .enforce_whitelist(self.policy.enforce_whitelist)
            .check_symlinks(self.policy.check_symlinks))
    }
}
