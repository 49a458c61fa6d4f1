use crate::DescriptorError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_OS_PASSWORD: &str = "strata";
pub const DEFAULT_CPUS: u32 = 1;
pub const DEFAULT_MEMORY_MB: u64 = 256;
pub const DEFAULT_NETWORK: &str = "NAT";

/// Fallback values applied when a descriptor document leaves a field out.
///
/// Hardware defaults are filled in when a document is turned into a
/// [`Descriptor`](crate::Descriptor); the OS password default is applied by
/// the composer only after every layer has had a chance to set one.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct Defaults {
    pub os_password: String,
    pub cpus: u32,
    pub memory: u64,
    pub network: String,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            os_password: DEFAULT_OS_PASSWORD.to_owned(),
            cpus: DEFAULT_CPUS,
            memory: DEFAULT_MEMORY_MB,
            network: DEFAULT_NETWORK.to_owned(),
        }
    }
}

impl Defaults {
    pub fn parse_str(input: &str) -> Result<Self, DescriptorError> {
        toml::from_str(input).map_err(|e| DescriptorError::Defaults(e.to_string()))
    }

    /// Load defaults from a TOML file. Keys left out keep their built-in value.
    pub fn load(path: &Path) -> Result<Self, DescriptorError> {
        let content = std::fs::read_to_string(path)?;
        Self::parse_str(&content)
    }

    /// Load `~/.config/strata/defaults.toml` if it exists, built-in values otherwise.
    pub fn load_default() -> Result<Self, DescriptorError> {
        match default_config_path() {
            Some(path) if path.is_file() => Self::load(&path),
            _ => Ok(Self::default()),
        }
    }
}

fn default_config_path() -> Option<PathBuf> {
    let home = std::env::var_os("HOME")?;
    Some(PathBuf::from(home).join(".config/strata/defaults.toml"))
}
