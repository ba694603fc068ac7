use crate::error::{BlockchainError, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

const DATA_DIR_KEY: &str = "SKYNET_DATA_DIR";
const LOG_LEVEL_KEY: &str = "SKYNET_LOG_LEVEL";

static DEFAULT_DATA_DIR: &str = "data";
static DEFAULT_LOG_LEVEL: &str = "info";
const LOG_LEVELS: [&str; 6] = ["off", "error", "warn", "info", "debug", "trace"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeSettings {
    pub data_dir: PathBuf,
    pub log_level: String,
}

impl Default for NodeSettings {
    fn default() -> Self {
        NodeSettings {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            log_level: DEFAULT_LOG_LEVEL.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MiningSettings {
    pub enabled: bool,
    /// PKCS#8 key file whose public key receives block rewards
    pub reward_key_file: Option<PathBuf>,
    /// Attempts per `mine` invocation
    pub rounds: u32,
}

impl Default for MiningSettings {
    fn default() -> Self {
        MiningSettings {
            enabled: true,
            reward_key_file: None,
            rounds: 1,
        }
    }
}

/// Node configuration, read from a TOML file and overridden by the environment
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub node: NodeSettings,
    pub mining: MiningSettings,
}

impl Config {
    /// Load `path` if it exists, fall back to defaults otherwise, then apply
    /// environment overrides and validate
    pub fn load(path: &Path) -> Result<Config> {
        let mut config = if path.exists() {
            let text = fs::read_to_string(path)?;
            Config::from_toml(&text)?
        } else {
            Config::default()
        };

        config.apply_env_overrides(|key| env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml(text: &str) -> Result<Config> {
        toml::from_str(text)
            .map_err(|e| BlockchainError::Config(format!("Failed to parse config: {e}")))
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| BlockchainError::Config(format!("Failed to render config: {e}")))
    }

    fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(dir) = lookup(DATA_DIR_KEY) {
            self.node.data_dir = PathBuf::from(dir);
        }
        if let Some(level) = lookup(LOG_LEVEL_KEY) {
            self.node.log_level = level;
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !LOG_LEVELS.contains(&self.node.log_level.to_lowercase().as_str()) {
            return Err(BlockchainError::Config(format!(
                "Unknown log level '{}'",
                self.node.log_level
            )));
        }
        if self.node.data_dir.as_os_str().is_empty() {
            return Err(BlockchainError::Config(
                "data_dir must not be empty".to_string(),
            ));
        }
        if self.mining.enabled && self.mining.rounds == 0 {
            return Err(BlockchainError::Config(
                "mining.rounds must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Where the sled database lives
    pub fn chain_db_path(&self) -> PathBuf {
        self.node.data_dir.join("chain")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults_when_file_missing() {
        let config = Config::load(Path::new("/definitely/not/here.toml"));
        // The environment may override fields, but loading must still succeed
        assert!(config.is_ok());
        assert_eq!(Config::default().mining.rounds, 1);
        assert_eq!(Config::default().chain_db_path(), PathBuf::from("data/chain"));
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let config = Config::from_toml(
            r#"
            [mining]
            rounds = 3
            "#,
        )
        .unwrap();

        assert_eq!(config.mining.rounds, 3);
        assert!(config.mining.enabled);
        assert_eq!(config.node, NodeSettings::default());
    }

    #[test]
    fn test_env_overrides_file() {
        let vars: HashMap<&str, &str> = [(DATA_DIR_KEY, "/tmp/skynet"), (LOG_LEVEL_KEY, "debug")]
            .into_iter()
            .collect();
        let mut config = Config::default();
        config.apply_env_overrides(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(config.node.data_dir, PathBuf::from("/tmp/skynet"));
        assert_eq!(config.node.log_level, "debug");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_values_rejected() {
        let mut config = Config::default();
        config.node.log_level = "loud".to_string();
        assert!(matches!(config.validate(), Err(BlockchainError::Config(_))));

        let mut config = Config::default();
        config.mining.rounds = 0;
        assert!(config.validate().is_err());

        assert!(Config::from_toml("node = 5").is_err());
    }

    #[test]
    fn test_toml_round_trip() {
        let mut config = Config::default();
        config.mining.reward_key_file = Some(PathBuf::from("miner.key"));

        let text = config.to_toml().unwrap();
        assert_eq!(Config::from_toml(&text).unwrap(), config);
    }
}
