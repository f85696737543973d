use std::collections::HashMap;
use std::fs;
use std::path::Path;

use anyhow::{ensure, Context, Result};
use serde::{Deserialize, Serialize};

use crate::protocol::MAX_LEDS;
use crate::transport::ConfigFailurePolicy;

/// Device backends that keep their own channel order setting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceType {
    Adalight,
    Ws2812,
}

impl DeviceType {
    /// Key of this device in the `color_sequences` table
    pub fn key(self) -> &'static str {
        match self {
            DeviceType::Adalight => "adalight",
            DeviceType::Ws2812 => "ws2812",
        }
    }
}

/// Source of per-device settings owned by the host application
pub trait SettingsProvider {
    /// Channel order name (e.g. `"GRB"`) configured for `device`
    fn color_sequence(&self, device: DeviceType) -> String;
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub device: DeviceConfig,
    #[serde(default)]
    pub color_sequences: HashMap<String, String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DeviceConfig {
    pub port: String,
    pub baud_rate: u32,
    /// LEDs driven by the host binary's color modes
    #[serde(default = "default_led_count")]
    pub led_count: usize,
    /// Treat a failure to set baud rate or data bits as an open failure
    #[serde(default)]
    pub strict_configuration: bool,
}

fn default_led_count() -> usize {
    1
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config: Config = serde_json::from_str(&data)
            .with_context(|| format!("Failed to parse config {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// A frame carries between 1 and [`MAX_LEDS`] LEDs
    pub fn validate(&self) -> Result<()> {
        let led_count = self.device.led_count;
        ensure!(
            (1..=MAX_LEDS).contains(&led_count),
            "led_count must be between 1 and {MAX_LEDS}, got {led_count}"
        );
        Ok(())
    }
}

impl DeviceConfig {
    pub fn config_failure_policy(&self) -> ConfigFailurePolicy {
        if self.strict_configuration {
            ConfigFailurePolicy::Strict
        } else {
            ConfigFailurePolicy::Lenient
        }
    }
}

impl SettingsProvider for Config {
    fn color_sequence(&self, device: DeviceType) -> String {
        self.color_sequences.get(device.key()).cloned().unwrap_or_default()
    }
}
