//! Configuration management

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::debug;
use crate::Result;
use crate::error::Error;

/// Environment variables checked for the Gemini API key, in order.
pub const API_KEY_ENV_VARS: [&str; 2] = ["GOOGLE_API_KEY", "GEMINI_API_KEY"];

/// Dotenv file read from the working directory.
pub const ENV_FILE: &str = ".env";

/// Environment variable overriding the model name.
pub const MODEL_ENV_VAR: &str = "TEMPO_MODEL";

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Gemini API key
    #[serde(default)]
    pub gemini_api_key: String,

    /// Model to use
    #[serde(default = "default_model")]
    pub model: String,

    /// Base URL of the Gemini models endpoint
    #[serde(default = "default_api_base")]
    pub api_base: String,

    /// Sampling temperature
    #[serde(default)]
    pub temperature: f32,

    /// Maximum agent steps per conversation
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,
}

fn default_model() -> String {
    "gemini-2.0-flash-001".to_string()
}

fn default_api_base() -> String {
    "https://generativelanguage.googleapis.com/v1beta/models".to_string()
}

fn default_max_iterations() -> usize {
    20
}

impl Default for Config {
    fn default() -> Self {
        Self {
            gemini_api_key: String::new(),
            model: default_model(),
            api_base: default_api_base(),
            temperature: 0.0,
            max_iterations: default_max_iterations(),
        }
    }
}

impl Config {
    /// The API key, or a startup error if none is configured.
    pub fn require_api_key(&self) -> Result<&str> {
        if self.gemini_api_key.trim().is_empty() {
            return Err(Error::Config(format!(
                "No Gemini API key configured. Set {} or add gemini_api_key to {:?}.",
                API_KEY_ENV_VARS[0],
                config_path()
            )));
        }
        Ok(&self.gemini_api_key)
    }

    /// Apply overrides from an environment lookup.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let key = API_KEY_ENV_VARS
            .iter()
            .filter_map(|var| lookup(*var))
            .find(|v| !v.trim().is_empty());
        if let Some(key) = key {
            self.gemini_api_key = key;
        }

        if let Some(model) = lookup(MODEL_ENV_VAR).filter(|m| !m.trim().is_empty()) {
            self.model = model;
        }
    }
}

/// Get the config directory path
pub fn config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".tempo")
}

/// Get the config file path
pub fn config_path() -> PathBuf {
    config_dir().join("config.json")
}

/// Load configuration from a file; a missing file yields the defaults.
pub fn load_from(path: &Path) -> Result<Config> {
    if !path.exists() {
        debug!("No config at {:?}, using defaults", path);
        return Ok(Config::default());
    }

    let content = std::fs::read_to_string(path)?;
    let config: Config = serde_json::from_str(&content)?;
    Ok(config)
}

/// Read `KEY=VALUE` pairs from a dotenv file; a missing file yields none.
pub fn read_env_file(path: &Path) -> Result<HashMap<String, String>> {
    if !path.exists() {
        return Ok(HashMap::new());
    }

    let entries = dotenvy::from_path_iter(path)
        .map_err(|e| Error::Config(format!("Failed to read {:?}: {}", path, e)))?;
    entries
        .map(|entry| entry.map_err(|e| Error::Config(format!("Invalid entry in {:?}: {}", path, e))))
        .collect()
}

/// Load configuration from a config file, a dotenv file and an environment lookup.
///
/// Variables already present in the environment win over the dotenv file.
pub fn load_with<F>(config_file: &Path, env_file: &Path, env: F) -> Result<Config>
where
    F: Fn(&str) -> Option<String>,
{
    let dotenv = read_env_file(env_file)?;
    if !dotenv.is_empty() {
        debug!("Loaded {} variables from {:?}", dotenv.len(), env_file);
    }

    let mut config = load_from(config_file)?;
    config.apply_env(|var| env(var).or_else(|| dotenv.get(var).cloned()));
    Ok(config)
}

/// Load configuration from the default path, `.env` and the process environment
pub fn load() -> Result<Config> {
    load_with(&config_path(), Path::new(ENV_FILE), |var| std::env::var(var).ok())
}
