//! Host configuration management

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "HostConfig::default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub device: DeviceSettings,
    #[serde(default)]
    pub transfer: TransferSettings,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            log_level: Self::default_log_level(),
            device: DeviceSettings::default(),
            transfer: TransferSettings::default(),
        }
    }
}

/// Identity and endpoint layout of the target device
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceSettings {
    /// USB vendor ID; the first matching device is used
    #[serde(default = "DeviceSettings::default_vendor_id")]
    pub vendor_id: u16,
    /// USB product ID
    #[serde(default = "DeviceSettings::default_product_id")]
    pub product_id: u16,
    /// Interface number to claim before transfers
    #[serde(default)]
    pub interface: u8,
    /// Bulk OUT endpoint address
    #[serde(default = "DeviceSettings::default_out_endpoint")]
    pub out_endpoint: u8,
    /// Bulk IN endpoint address
    #[serde(default = "DeviceSettings::default_in_endpoint")]
    pub in_endpoint: u8,
}

impl Default for DeviceSettings {
    fn default() -> Self {
        Self {
            vendor_id: Self::default_vendor_id(),
            product_id: Self::default_product_id(),
            interface: 0,
            out_endpoint: Self::default_out_endpoint(),
            in_endpoint: Self::default_in_endpoint(),
        }
    }
}

impl DeviceSettings {
    fn default_vendor_id() -> u16 {
        0x04d8
    }

    fn default_product_id() -> u16 {
        0x0053
    }

    fn default_out_endpoint() -> u8 {
        0x01
    }

    fn default_in_endpoint() -> u8 {
        0x81
    }
}

/// Per-transfer behavior
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferSettings {
    /// Timeout applied to each bulk write and read, in milliseconds
    #[serde(default = "TransferSettings::default_timeout_ms")]
    pub timeout_ms: u64,
    /// Size of the response read buffer; must stay a multiple of the
    /// endpoint packet size to avoid overflow completions
    #[serde(default = "TransferSettings::default_read_buffer")]
    pub read_buffer: usize,
}

impl Default for TransferSettings {
    fn default() -> Self {
        Self {
            timeout_ms: Self::default_timeout_ms(),
            read_buffer: Self::default_read_buffer(),
        }
    }
}

impl TransferSettings {
    fn default_timeout_ms() -> u64 {
        1000
    }

    fn default_read_buffer() -> usize {
        1024
    }

    /// Per-transfer timeout as a [`Duration`]
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl HostConfig {
    fn default_log_level() -> String {
        "info".to_string()
    }

    /// Load configuration from the given path, or from standard locations
    pub fn load(path: Option<PathBuf>) -> Result<Self> {
        let config_path = if let Some(p) = path {
            p
        } else {
            let candidates = vec![
                Self::default_path(),
                PathBuf::from("/etc/usb-widget/host.toml"),
            ];

            candidates
                .into_iter()
                .find(|p| p.exists())
                .ok_or_else(|| anyhow!("no configuration file found, using defaults"))?
        };

        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("failed to read config file: {}", config_path.display()))?;

        let config: HostConfig = toml::from_str(&content)
            .with_context(|| format!("failed to parse config file: {}", config_path.display()))?;

        config.validate()?;

        tracing::info!("Loaded configuration from: {}", config_path.display());
        Ok(config)
    }

    /// Load configuration, falling back to defaults on any failure
    pub fn load_or_default() -> Self {
        match Self::load(None) {
            Ok(config) => config,
            Err(e) => {
                tracing::debug!("Failed to load config: {}, using defaults", e);
                Self::default()
            }
        }
    }

    /// Save configuration to the specified path
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).context("failed to serialize configuration")?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("failed to create config directory: {}", parent.display())
            })?;
        }

        fs::write(path, content)
            .with_context(|| format!("failed to write config file: {}", path.display()))?;

        tracing::info!("Saved configuration to: {}", path.display());
        Ok(())
    }

    /// Get the default configuration file path
    pub fn default_path() -> PathBuf {
        if let Some(config_dir) = dirs::config_dir() {
            config_dir.join("usb-widget").join("host.toml")
        } else {
            PathBuf::from(".config/usb-widget/host.toml")
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.log_level.as_str()) {
            return Err(anyhow!(
                "invalid log level '{}', must be one of: {}",
                self.log_level,
                valid_levels.join(", ")
            ));
        }

        if self.device.in_endpoint & 0x80 == 0 {
            return Err(anyhow!(
                "in_endpoint {:#04x} is not an IN endpoint address",
                self.device.in_endpoint
            ));
        }
        if self.device.out_endpoint & 0x80 != 0 {
            return Err(anyhow!(
                "out_endpoint {:#04x} is not an OUT endpoint address",
                self.device.out_endpoint
            ));
        }

        if self.transfer.timeout_ms == 0 {
            return Err(anyhow!("transfer timeout must be greater than zero"));
        }
        if self.transfer.read_buffer == 0
            || self.transfer.read_buffer % protocol::PACKET_SIZE != 0
        {
            return Err(anyhow!(
                "read_buffer ({}) must be a non-zero multiple of the packet size ({})",
                self.transfer.read_buffer,
                protocol::PACKET_SIZE
            ));
        }

        Ok(())
    }
}
