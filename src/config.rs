//! Drive setup configuration
//!
//! Loaded from a JSON file or assembled from CLI flags. Every field except
//! `data_dir` has a default, so a minimal file is `{"data_dir": "/data"}`.

use crate::devices::NVME_PREFIX;
use crate::error::{DriveSetupError, Result};
use crate::plan::{DEFAULT_DIR_MODE, DEFAULT_RAID_DEVICE, PlanOptions};
use crate::types::Filesystem;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriveSetupConfig {
    /// Directory the data drive is mounted at
    pub data_dir: PathBuf,

    /// Build the drive from local NVMe devices. When false, setup does nothing.
    #[serde(default)]
    pub nvme_raid: bool,

    /// `lsblk` name prefix selecting the devices to use
    #[serde(default = "default_device_prefix")]
    pub device_prefix: String,

    /// md device created when more than one device is found
    #[serde(default = "default_raid_device")]
    pub raid_device: PathBuf,

    #[serde(default)]
    pub filesystem: Filesystem,

    /// `chmod` mode applied to `data_dir` after mounting
    #[serde(default = "default_dir_mode")]
    pub dir_mode: String,
}

fn default_device_prefix() -> String {
    NVME_PREFIX.to_string()
}

fn default_raid_device() -> PathBuf {
    PathBuf::from(DEFAULT_RAID_DEVICE)
}

fn default_dir_mode() -> String {
    DEFAULT_DIR_MODE.to_string()
}

impl DriveSetupConfig {
    pub fn new(data_dir: impl Into<PathBuf>, nvme_raid: bool) -> Self {
        Self {
            data_dir: data_dir.into(),
            nvme_raid,
            device_prefix: default_device_prefix(),
            raid_device: default_raid_device(),
            filesystem: Filesystem::default(),
            dir_mode: default_dir_mode(),
        }
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            DriveSetupError::config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        let config = serde_json::from_str(&content)?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.data_dir.as_os_str().is_empty() {
            return Err(DriveSetupError::config("data_dir must be specified"));
        }

        let prefix = self.device_prefix.as_str();
        if prefix.is_empty() {
            return Err(DriveSetupError::config("device_prefix must not be empty"));
        }
        if prefix.contains('/') || prefix.chars().any(char::is_whitespace) {
            return Err(DriveSetupError::config(format!(
                "device_prefix '{}' must be a bare device name prefix",
                prefix
            )));
        }

        if !self.raid_device.starts_with("/dev/") || self.raid_device == Path::new("/dev/") {
            return Err(DriveSetupError::config(format!(
                "raid_device must be a path under /dev/, got {}",
                self.raid_device.display()
            )));
        }

        if self.dir_mode.trim().is_empty() {
            return Err(DriveSetupError::config("dir_mode must not be empty"));
        }

        Ok(())
    }

    pub fn plan_options(&self) -> PlanOptions {
        PlanOptions {
            filesystem: self.filesystem,
            raid_device: self.raid_device.clone(),
            dir_mode: self.dir_mode.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_json_uses_defaults() {
        let config: DriveSetupConfig = serde_json::from_str(r#"{"data_dir": "/data"}"#).unwrap();
        assert_eq!(config, DriveSetupConfig::new("/data", false));
        assert_eq!(config.device_prefix, "nvme");
        assert_eq!(config.raid_device, PathBuf::from("/dev/md0"));
        assert_eq!(config.filesystem, Filesystem::Ext4);
        assert_eq!(config.dir_mode, "a+w");
    }

    #[test]
    fn test_validate_accepts_defaults() {
        assert!(DriveSetupConfig::new("/data", true).validate().is_ok());
    }

    #[test]
    fn test_validate_dir_only_needs_to_be_non_empty() {
        assert!(DriveSetupConfig::new("data", true).validate().is_ok());

        let err = DriveSetupConfig::new("", true).validate().unwrap_err();
        assert!(err.to_string().contains("data_dir must be specified"));
    }

    #[test]
    fn test_validate_rejects_bad_prefix() {
        let mut config = DriveSetupConfig::new("/data", true);
        config.device_prefix = "/dev/nvme".to_string();
        assert!(config.validate().is_err());

        config.device_prefix = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_raid_device_outside_dev() {
        let mut config = DriveSetupConfig::new("/data", true);
        config.raid_device = PathBuf::from("/tmp/md0");
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_unknown_filesystem_fails_to_parse() {
        let result: std::result::Result<DriveSetupConfig, _> =
            serde_json::from_str(r#"{"data_dir": "/data", "filesystem": "btrfs"}"#);
        assert!(result.is_err());
    }
}
