//! NVMe device enumeration
//!
//! Runs plain `lsblk` and keeps every line whose first column starts with
//! the device prefix. Partition rows are drawn with tree glyphs
//! (`└─nvme0n1p1`), so they never match and only whole disks are returned.

use crate::command_runner::{CommandRunner, CommandSpec};
use crate::error::{DriveSetupError, Result};
use std::path::PathBuf;
use tracing::{debug, info};

/// Prefix of NVMe namespace block devices in `lsblk` output.
pub const NVME_PREFIX: &str = "nvme";

/// Command used to list block devices.
pub fn lsblk_command() -> CommandSpec {
    CommandSpec::new("lsblk")
}

/// List devices whose `lsblk` name starts with `prefix`.
///
/// # Errors
///
/// `DeviceListing` if `lsblk` exits nonzero, carrying the command, its exit
/// code and its output.
pub fn list_nvme_devices<R: CommandRunner>(runner: &R, prefix: &str) -> Result<Vec<PathBuf>> {
    let cmd = lsblk_command();
    let output = runner.run(&cmd)?;
    if !output.is_success() {
        return Err(DriveSetupError::DeviceListing {
            command: cmd.to_string(),
            code: output.code(),
            log: output.log,
        });
    }

    let devices = parse_nvme_devices(&output.log, prefix);
    info!("Found {} device(s) with prefix '{}': {:?}", devices.len(), prefix, devices);
    Ok(devices)
}

/// Extract `/dev/<name>` paths from `lsblk` output.
pub fn parse_nvme_devices(output: &str, prefix: &str) -> Vec<PathBuf> {
    output
        .lines()
        .filter(|line| line.starts_with(prefix))
        .filter_map(|line| line.split_whitespace().next())
        .map(|name| {
            debug!("matched block device {}", name);
            PathBuf::from(format!("/dev/{}", name.trim()))
        })
        .collect()
}
