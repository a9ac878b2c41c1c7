//! Type-safe configuration values
//!
//! Enums instead of strings, so a typo in a config file fails at parse time
//! rather than as an unknown `mkfs.*` binary halfway through setup.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

/// Filesystem created on the data drive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[derive(Display, EnumString, EnumIter)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Filesystem {
    #[default]
    Ext4,
    Xfs,
}

impl Filesystem {
    /// The `mkfs` helper for this filesystem.
    pub fn mkfs_program(self) -> &'static str {
        match self {
            Self::Ext4 => "mkfs.ext4",
            Self::Xfs => "mkfs.xfs",
        }
    }

    /// Flag that makes `mkfs` overwrite an existing signature without asking.
    pub fn force_flag(self) -> &'static str {
        match self {
            Self::Ext4 => "-F",
            Self::Xfs => "-f",
        }
    }
}

/// How the data drive is built from the detected devices
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
pub enum DriveLayout {
    /// One device, formatted and mounted directly
    #[strum(serialize = "single")]
    Single,
    /// All devices striped into one md array
    #[strum(serialize = "raid0")]
    Raid0,
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn test_filesystem_parse() {
        assert_eq!("ext4".parse::<Filesystem>().unwrap(), Filesystem::Ext4);
        assert_eq!("XFS".parse::<Filesystem>().unwrap(), Filesystem::Xfs);
        assert!("btrfs".parse::<Filesystem>().is_err());
    }

    #[test]
    fn test_filesystem_display_matches_mkfs_suffix() {
        for fs in Filesystem::iter() {
            assert_eq!(fs.mkfs_program(), format!("mkfs.{}", fs));
        }
    }

    #[test]
    fn test_filesystem_serde() {
        let json = serde_json::to_string(&Filesystem::Xfs).unwrap();
        assert_eq!(json, "\"xfs\"");
        let fs: Filesystem = serde_json::from_str("\"ext4\"").unwrap();
        assert_eq!(fs, Filesystem::Ext4);
    }

    #[test]
    fn test_layout_display() {
        assert_eq!(DriveLayout::Single.to_string(), "single");
        assert_eq!(DriveLayout::Raid0.to_string(), "raid0");
    }
}
