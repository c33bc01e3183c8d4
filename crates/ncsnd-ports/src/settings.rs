use crate::types::*;
use serde::{Deserialize, Serialize};

fn default_channel_mask() -> ChannelMask {
    ChannelMask::ALL
}

fn default_install_sleep_hook() -> bool {
    true
}

fn default_priority() -> u32 {
    16
}

#[derive(thiserror::Error, Debug)]
pub enum SettingsError {
    #[error("io error: {0}")]
    Io(String),
    #[error("serialization error: {0}")]
    Serde(String),
    #[error("invalid settings: {0}")]
    Invalid(String),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArbiterSettings {
    #[serde(default = "default_channel_mask")]
    pub channel_mask: ChannelMask,
    #[serde(default = "default_install_sleep_hook")]
    pub install_sleep_hook: bool,
    #[serde(default = "default_priority")]
    pub default_priority: u32,
}

impl Default for ArbiterSettings {
    fn default() -> Self {
        Self {
            channel_mask: ChannelMask::ALL,
            install_sleep_hook: true,
            default_priority: 16,
        }
    }
}

impl ArbiterSettings {
    /// Rejects values `ChannelArbiter` would refuse at admission time.
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.default_priority > u32::from(MAX_PRIORITY) {
            return Err(SettingsError::Invalid(format!(
                "default_priority {} exceeds {MAX_PRIORITY}",
                self.default_priority
            )));
        }
        if !self.channel_mask.is_subset_of(ChannelMask::ALL) {
            return Err(SettingsError::Invalid(format!(
                "channel_mask {:#06b} names channels beyond {}",
                self.channel_mask.0,
                NUM_CHANNELS - 1
            )));
        }
        Ok(())
    }
}

pub trait SettingsPort: Send + Sync {
    fn load_settings(&self) -> Result<ArbiterSettings, SettingsError>;
    fn save_settings(&self, s: &ArbiterSettings) -> Result<(), SettingsError>;
}
