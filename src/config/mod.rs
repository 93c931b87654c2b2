//! # Configuration
//!
//! `ncterm` reads a single TOML file (default `ncterm.toml`):
//!
//! ```toml
//! [game]
//! player_id = "recruit"
//! display_name = "New Recruit"
//! data_dir = "data"
//! # content_dir = "content"   # optional quests.json / discoveries.json overrides
//!
//! [adapter]
//! mode = "simulated"
//! timeout_ms = 2000
//! hostname = "netcorp-ops-07"
//! username = "recruit"
//!
//! [logging]
//! level = "info"
//! file = "ncterm.log"
//! security_file = "ncterm-security.log"
//! ```
//!
//! ```rust,no_run
//! use ncterm::config::Config;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     Config::create_default("ncterm.toml").await?;
//!     let config = Config::load("ncterm.toml").await?;
//!     println!("playing as {}", config.game.player_id);
//!     Ok(())
//! }
//! ```

use std::path::PathBuf;

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::engine::adapter::{DEFAULT_HOSTNAME, DEFAULT_USERNAME};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameConfig {
    pub player_id: String,
    pub display_name: String,
    pub data_dir: String,
    /// Directory holding `quests.json` / `discoveries.json` overrides.
    #[serde(default)]
    pub content_dir: Option<String>,
}

impl GameConfig {
    pub fn data_path(&self) -> PathBuf {
        PathBuf::from(&self.data_dir)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum AdapterMode {
    #[default]
    Simulated,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdapterConfig {
    #[serde(default)]
    pub mode: AdapterMode,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_hostname")]
    pub hostname: String,
    #[serde(default = "default_username")]
    pub username: String,
}

fn default_timeout_ms() -> u64 {
    2000
}

fn default_hostname() -> String {
    DEFAULT_HOSTNAME.to_string()
}

fn default_username() -> String {
    DEFAULT_USERNAME.to_string()
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            mode: AdapterMode::Simulated,
            timeout_ms: default_timeout_ms(),
            hostname: default_hostname(),
            username: default_username(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub file: Option<String>,
    #[serde(default)]
    pub security_file: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub game: GameConfig,
    #[serde(default)]
    pub adapter: AdapterConfig,
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a file
    pub async fn load(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| anyhow!("Failed to read config file {}: {}", path, e))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| anyhow!("Failed to parse config file {}: {}", path, e))?;
        config.validate()?;
        Ok(config)
    }

    /// Write the default configuration to `path`
    pub async fn create_default(path: &str) -> Result<()> {
        let content = toml::to_string_pretty(&Config::default())
            .map_err(|e| anyhow!("Failed to serialize default config: {}", e))?;

        fs::write(path, content)
            .await
            .map_err(|e| anyhow!("Failed to write config file {}: {}", path, e))?;

        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.game.player_id.trim().is_empty() {
            return Err(anyhow!("game.player_id must not be empty"));
        }
        if self.game.player_id.contains(char::is_whitespace) {
            return Err(anyhow!("game.player_id must not contain whitespace"));
        }
        if self.adapter.timeout_ms == 0 {
            return Err(anyhow!("adapter.timeout_ms must be greater than zero"));
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            game: GameConfig {
                player_id: "recruit".to_string(),
                display_name: "New Recruit".to_string(),
                data_dir: "data".to_string(),
                content_dir: None,
            },
            adapter: AdapterConfig::default(),
            logging: LoggingConfig {
                level: "info".to_string(),
                file: Some("ncterm.log".to_string()),
                security_file: Some("ncterm-security.log".to_string()),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn default_config_round_trips_through_toml() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ncterm.toml");
        let path = path.to_str().unwrap();
        Config::create_default(path).await.unwrap();
        let loaded = Config::load(path).await.unwrap();
        assert_eq!(loaded.game.player_id, "recruit");
        assert_eq!(loaded.adapter.mode, AdapterMode::Simulated);
        assert_eq!(loaded.adapter.timeout_ms, 2000);
    }

    #[tokio::test]
    async fn adapter_section_is_optional() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("min.toml");
        std::fs::write(
            &path,
            "[game]\nplayer_id = \"kim\"\ndisplay_name = \"Kim\"\ndata_dir = \"d\"\n\n[logging]\nlevel = \"debug\"\n",
        )
        .unwrap();
        let loaded = Config::load(path.to_str().unwrap()).await.unwrap();
        assert_eq!(loaded.adapter.username, DEFAULT_USERNAME);
        assert!(loaded.logging.file.is_none());
    }

    #[tokio::test]
    async fn blank_player_id_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(
            &path,
            "[game]\nplayer_id = \" \"\ndisplay_name = \"x\"\ndata_dir = \"d\"\n\n[logging]\nlevel = \"info\"\n",
        )
        .unwrap();
        assert!(Config::load(path.to_str().unwrap()).await.is_err());
    }
}
