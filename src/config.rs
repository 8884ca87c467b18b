//! Configuration management module.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Configuration load result.
#[derive(Debug)]
pub enum ConfigLoadResult {
    /// Config loaded successfully.
    Loaded(StationConfig),
    /// Config file missing (run on built-in defaults).
    Missing,
    /// Config file exists but invalid.
    Invalid(ConfigError),
}

/// Configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Read(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Validation failed: {0}")]
    Validation(String),
}

/// Main station configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StationConfig {
    pub reader: ReaderConfig,
    pub modem: ModemConfig,
    pub wifi: WifiConfig,
    pub api: ApiConfig,
}

/// RC522 reader settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReaderConfig {
    /// SPI device node the RC522 is wired to.
    pub spidev: String,
    /// Data block holding the product identifier (sector 1, block 4).
    #[serde(default = "default_block")]
    pub block: u8,
}

fn default_block() -> u8 {
    4
}

/// ESP-01 modem serial port settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModemConfig {
    pub port: String,
    pub baud: u32,
}

/// WiFi association settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WifiConfig {
    pub ssid: String,
    pub password: String,
    /// Join attempts at startup (default: 5).
    #[serde(default = "default_connect_attempts")]
    pub connect_attempts: u32,
}

fn default_connect_attempts() -> u32 {
    5
}

/// Remote rental API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,
    pub path: String,
    /// Rental the posted items are booked against.
    pub locacao_id: u32,
}

impl StationConfig {
    /// Get config file path (same directory as executable).
    pub fn default_path() -> PathBuf {
        std::env::current_exe()
            .ok()
            .and_then(|p| p.parent().map(|p| p.to_path_buf()))
            .unwrap_or_else(|| PathBuf::from("."))
            .join("tagpost.toml")
    }

    /// Attempt to load config with detailed result.
    pub fn try_load(path: &Path) -> ConfigLoadResult {
        if !path.exists() {
            return ConfigLoadResult::Missing;
        }

        match std::fs::read_to_string(path) {
            Ok(content) => match toml::from_str::<StationConfig>(&content) {
                Ok(config) => match config.validate() {
                    Ok(()) => ConfigLoadResult::Loaded(config),
                    Err(e) => ConfigLoadResult::Invalid(e),
                },
                Err(e) => ConfigLoadResult::Invalid(ConfigError::Parse(e)),
            },
            Err(e) => ConfigLoadResult::Invalid(ConfigError::Read(e)),
        }
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.reader.spidev.trim().is_empty() {
            return Err(ConfigError::Validation("Reader SPI device cannot be empty".to_string()));
        }
        // Only sector data blocks hold payload; trailer blocks (3, 7, 11, ...) hold keys.
        if self.reader.block % 4 == 3 {
            return Err(ConfigError::Validation(format!(
                "Block {} is a sector trailer, pick a data block",
                self.reader.block
            )));
        }
        if self.modem.port.trim().is_empty() {
            return Err(ConfigError::Validation("Modem serial port cannot be empty".to_string()));
        }
        if self.modem.baud == 0 {
            return Err(ConfigError::Validation("Modem baud rate must be greater than 0".to_string()));
        }
        if self.wifi.ssid.trim().is_empty() {
            return Err(ConfigError::Validation("WiFi SSID cannot be empty".to_string()));
        }
        if self.wifi.connect_attempts < 1 {
            return Err(ConfigError::Validation(
                "WiFi connect attempts must be at least 1".to_string(),
            ));
        }
        if self.api.host.trim().is_empty() {
            return Err(ConfigError::Validation("API host cannot be empty".to_string()));
        }
        if self.api.port == 0 {
            return Err(ConfigError::Validation("API port must be greater than 0".to_string()));
        }
        if !self.api.path.starts_with('/') {
            return Err(ConfigError::Validation("API path must start with /".to_string()));
        }
        Ok(())
    }

    /// Save configuration to file.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            spidev: "/dev/spidev0.0".to_string(),
            block: default_block(),
        }
    }
}

impl Default for ModemConfig {
    fn default() -> Self {
        Self {
            port: "/dev/ttyUSB0".to_string(),
            baud: 115_200,
        }
    }
}

impl Default for WifiConfig {
    fn default() -> Self {
        Self {
            ssid: "varoto".to_string(),
            password: "12345678".to_string(),
            connect_attempts: default_connect_attempts(),
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "api.luvr.com.br".to_string(),
            port: 80,
            path: "/itemlocacao".to_string(),
            locacao_id: 12,
        }
    }
}
