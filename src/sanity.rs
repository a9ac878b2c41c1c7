//! Pre-flight checks for the host environment
//!
//! Verifies, before any device is touched:
//! - Required binaries are present on PATH
//! - The process runs with root privileges (EUID 0)

use crate::error::{DriveSetupError, Result};
use crate::process_guard::CommandProcessGroup;
use crate::types::Filesystem;
use std::process::{Command, Stdio};
use tracing::{debug, info, warn};

/// Binaries every setup run invokes. The `mkfs` helper depends on the
/// filesystem and is added by `required_binaries`.
const BASE_BINARIES: &[&str] = &["lsblk", "mountpoint", "mkdir", "mount", "chmod"];

/// Only needed when more than one device is found.
const RAID_BINARY: &str = "mdadm";

pub const SKIP_ROOT_ENV: &str = "DRIVESETUP_SKIP_ROOT_CHECK";

#[derive(Debug)]
pub struct SanityCheckResult {
    pub missing_binaries: Vec<String>,
    /// Missing RAID tooling; fatal only for multi-device hosts
    pub missing_optional: Vec<String>,
    pub is_root: bool,
}

impl SanityCheckResult {
    pub fn is_ok(&self) -> bool {
        self.missing_binaries.is_empty() && self.is_root
    }

    /// Human-readable list of every failed check.
    pub fn problems(&self) -> Vec<String> {
        let mut problems = Vec::new();
        if !self.is_root {
            problems.push("root privileges required to format and mount devices".to_string());
        }
        for binary in &self.missing_binaries {
            problems.push(format!(
                "missing binary {} (package: {})",
                binary,
                package_for_binary(binary)
            ));
        }
        problems
    }
}

pub fn required_binaries(filesystem: Filesystem) -> Vec<&'static str> {
    let mut binaries = BASE_BINARIES.to_vec();
    binaries.push(filesystem.mkfs_program());
    binaries
}

fn binary_exists(name: &str) -> bool {
    Command::new("which")
        .arg(name)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .in_new_process_group()
        .status()
        .map(|status| status.success())
        .unwrap_or(false)
}

fn is_running_as_root() -> bool {
    nix::unistd::geteuid().is_root()
}

pub fn verify_environment(filesystem: Filesystem) -> SanityCheckResult {
    let missing_binaries = required_binaries(filesystem)
        .into_iter()
        .filter(|binary| !binary_exists(binary))
        .map(str::to_string)
        .collect();

    let mut missing_optional = Vec::new();
    if !binary_exists(RAID_BINARY) {
        debug!("{} not found; RAID setup will fail on multi-device hosts", RAID_BINARY);
        missing_optional.push(RAID_BINARY.to_string());
    }

    SanityCheckResult {
        missing_binaries,
        missing_optional,
        is_root: is_running_as_root(),
    }
}

/// Map binary names to the Linux package that provides them
fn package_for_binary(binary: &str) -> &'static str {
    match binary {
        "lsblk" | "mountpoint" | "mount" => "util-linux",
        "mkdir" | "chmod" => "coreutils",
        "mkfs.ext4" => "e2fsprogs",
        "mkfs.xfs" => "xfsprogs",
        "mdadm" => "mdadm",
        _ => "unknown",
    }
}

fn should_skip_root_check() -> bool {
    std::env::var(SKIP_ROOT_ENV)
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

/// Run all checks and fail with every problem found.
pub fn run_preflight_checks(filesystem: Filesystem, skip_root: bool) -> Result<()> {
    debug!("Running pre-flight checks (skip_root={})", skip_root);

    let mut result = verify_environment(filesystem);
    if skip_root || should_skip_root_check() {
        warn!("Root check skipped");
        result.is_root = true;
    }

    for binary in &result.missing_optional {
        warn!(
            "{} not found (package: {}); only a single device can be set up",
            binary,
            package_for_binary(binary)
        );
    }

    if !result.is_ok() {
        return Err(DriveSetupError::preflight(result.problems().join("; ")));
    }

    info!("Pre-flight checks passed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_binary_exists_sh() {
        assert!(binary_exists("sh"));
    }

    #[test]
    fn test_binary_exists_nonexistent() {
        assert!(!binary_exists("this_binary_definitely_does_not_exist_12345"));
    }

    #[test]
    fn test_required_binaries_follow_filesystem() {
        assert!(required_binaries(Filesystem::Ext4).contains(&"mkfs.ext4"));
        assert!(required_binaries(Filesystem::Xfs).contains(&"mkfs.xfs"));
        assert!(!required_binaries(Filesystem::Xfs).contains(&"mkfs.ext4"));
        assert!(!required_binaries(Filesystem::Ext4).contains(&"mdadm"));
    }

    #[test]
    fn test_package_mapping() {
        assert_eq!(package_for_binary("lsblk"), "util-linux");
        assert_eq!(package_for_binary("mkfs.ext4"), "e2fsprogs");
        assert_eq!(package_for_binary("mdadm"), "mdadm");
    }

    #[test]
    fn test_result_problems() {
        let ok = SanityCheckResult {
            missing_binaries: vec![],
            missing_optional: vec!["mdadm".to_string()],
            is_root: true,
        };
        assert!(ok.is_ok());
        assert!(ok.problems().is_empty());

        let bad = SanityCheckResult {
            missing_binaries: vec!["mkfs.xfs".to_string()],
            missing_optional: vec![],
            is_root: false,
        };
        assert!(!bad.is_ok());
        let problems = bad.problems();
        assert_eq!(problems.len(), 2);
        assert!(problems[1].contains("xfsprogs"));
    }
}
