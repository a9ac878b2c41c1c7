//! Data drive setup
//!
//! Entry point used before a benchmark run: when enabled, turns the local
//! NVMe devices into a mounted data directory.
//!
//! 1. Disabled → nothing runs
//! 2. `mountpoint -q <dir>` succeeds → already mounted, nothing else runs
//! 3. `lsblk` → device list
//! 4. One device → format and mount it; several → RAID-0 over all of them
//!
//! There is no rollback. If a step fails, whatever earlier steps created
//! (an md array, a filesystem) is left in place.

use crate::command_runner::{CommandRunner, CommandSpec, SystemRunner};
use crate::config::DriveSetupConfig;
use crate::devices::list_nvme_devices;
use crate::error::Result;
use crate::plan::DrivePlan;
use crate::types::DriveLayout;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// What a setup run did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SetupOutcome {
    /// NVMe setup not requested
    Disabled,
    /// `data_dir` was already a mount point
    AlreadyMounted,
    /// A single device was formatted and mounted
    Single { device: PathBuf },
    /// An md array was assembled from `devices` and mounted
    Raid0 {
        array: PathBuf,
        devices: Vec<PathBuf>,
    },
}

/// Command that tests whether `dir` is a mount point (exit 0 if it is).
pub fn mountpoint_command(dir: &Path) -> CommandSpec {
    CommandSpec::new("mountpoint").arg("-q").arg(dir.as_os_str())
}

pub fn is_mount_point<R: CommandRunner>(runner: &R, dir: &Path) -> Result<bool> {
    let output = runner.run(&mountpoint_command(dir))?;
    Ok(output.is_success())
}

/// Detect devices and build the plan a setup run would execute, without
/// running it. Does not check whether `data_dir` is mounted.
pub fn plan_drive<R: CommandRunner>(runner: &R, config: &DriveSetupConfig) -> Result<DrivePlan> {
    let devices = list_nvme_devices(runner, &config.device_prefix)?;
    DrivePlan::for_devices(
        &config.data_dir,
        &devices,
        &config.plan_options(),
        &config.device_prefix,
    )
}

/// Create and mount the data drive described by `config`.
///
/// # Errors
///
/// - `DeviceListing` if `lsblk` fails
/// - `NoDevicesFound` if nothing matches the device prefix
/// - `CommandFailed` from the first failing format/mount step
/// - `Spawn` if a required binary cannot be executed
pub fn create_drive_from_devices<R: CommandRunner>(
    runner: &R,
    config: &DriveSetupConfig,
) -> Result<SetupOutcome> {
    if !config.nvme_raid {
        debug!("NVMe drive setup not requested");
        return Ok(SetupOutcome::Disabled);
    }

    let data_dir = config.data_dir.as_path();
    if is_mount_point(runner, data_dir)? {
        info!("{} is already a mount point, leaving it alone", data_dir.display());
        return Ok(SetupOutcome::AlreadyMounted);
    }

    let devices = list_nvme_devices(runner, &config.device_prefix)?;
    let plan = DrivePlan::for_devices(
        data_dir,
        &devices,
        &config.plan_options(),
        &config.device_prefix,
    )?;
    debug!("{}", plan.summary());
    runner.run_all(&plan.commands())?;

    let outcome = match plan.layout {
        DriveLayout::Single => {
            info!(
                "Created and mounted device {} at {}",
                plan.target.display(),
                data_dir.display()
            );
            SetupOutcome::Single {
                device: plan.target,
            }
        }
        DriveLayout::Raid0 => {
            info!("Created and mounted RAID array at {}", data_dir.display());
            SetupOutcome::Raid0 {
                array: plan.target,
                devices,
            }
        }
    };
    Ok(outcome)
}

/// Set up `data_dir` on the host with default settings.
///
/// With `nvme_raid` unset this returns immediately, whatever `data_dir` is.
pub fn setup_data_drive(data_dir: impl Into<PathBuf>, nvme_raid: bool) -> Result<()> {
    if !nvme_raid {
        debug!("NVMe drive setup not requested");
        return Ok(());
    }
    let config = DriveSetupConfig::new(data_dir, nvme_raid);
    config.validate()?;
    create_drive_from_devices(&SystemRunner, &config)?;
    Ok(())
}
