//! Drive plan construction
//!
//! Translates the detected devices into an ordered sequence of `DriveOp`
//! steps. Building a plan has no side effects; `DrivePlan::commands` lowers
//! it to the argument vectors the runner executes.
//!
//! | Layout  | Operations Generated |
//! |---------|---------------------|
//! | Single  | Format → MakeDir → Mount → Chmod |
//! | Raid0   | CreateRaid0 → Format → MakeDir → Mount → Chmod |

use crate::command_runner::CommandSpec;
use crate::error::{DriveSetupError, Result};
use crate::types::{DriveLayout, Filesystem};
use std::fmt;
use std::path::{Path, PathBuf};

/// Default md device assembled from multiple NVMe disks.
pub const DEFAULT_RAID_DEVICE: &str = "/dev/md0";

/// Default permission change applied to the mounted directory.
pub const DEFAULT_DIR_MODE: &str = "a+w";

/// A single step of a drive plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DriveOp {
    /// Stripe `devices` into `array` (mdadm level 0)
    CreateRaid0 {
        array: PathBuf,
        devices: Vec<PathBuf>,
    },

    /// Create a filesystem, overwriting any existing signature
    Format {
        device: PathBuf,
        filesystem: Filesystem,
    },

    /// Create the mount directory and its parents
    MakeDir { dir: PathBuf },

    Mount { device: PathBuf, dir: PathBuf },

    /// Relax permissions on the mounted directory
    Chmod { dir: PathBuf, mode: String },
}

impl DriveOp {
    /// The command this step runs.
    pub fn command(&self) -> CommandSpec {
        match self {
            Self::CreateRaid0 { array, devices } => CommandSpec::new("mdadm")
                .arg("--create")
                .arg(array.as_os_str())
                .arg("--level=0")
                .arg(format!("--raid-devices={}", devices.len()))
                // Answer mdadm's "Continue creating array?" prompt.
                .arg("--run")
                .args(devices.iter().map(|d| d.as_os_str())),
            Self::Format { device, filesystem } => CommandSpec::new(filesystem.mkfs_program())
                .arg(filesystem.force_flag())
                .arg(device.as_os_str()),
            Self::MakeDir { dir } => CommandSpec::new("mkdir").arg("-p").arg(dir.as_os_str()),
            Self::Mount { device, dir } => CommandSpec::new("mount")
                .arg(device.as_os_str())
                .arg(dir.as_os_str()),
            Self::Chmod { dir, mode } => CommandSpec::new("chmod")
                .arg(mode.as_str())
                .arg(dir.as_os_str()),
        }
    }
}

impl fmt::Display for DriveOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CreateRaid0 { array, devices } => {
                write!(f, "CreateRaid0({}, devices={})", array.display(), devices.len())
            }
            Self::Format { device, filesystem } => {
                write!(f, "Format({}, fs={})", device.display(), filesystem)
            }
            Self::MakeDir { dir } => write!(f, "MakeDir({})", dir.display()),
            Self::Mount { device, dir } => {
                write!(f, "Mount({} -> {})", device.display(), dir.display())
            }
            Self::Chmod { dir, mode } => write!(f, "Chmod({}, {})", dir.display(), mode),
        }
    }
}

/// Options that shape a plan beyond the device list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanOptions {
    pub filesystem: Filesystem,
    pub raid_device: PathBuf,
    pub dir_mode: String,
}

impl Default for PlanOptions {
    fn default() -> Self {
        Self {
            filesystem: Filesystem::default(),
            raid_device: PathBuf::from(DEFAULT_RAID_DEVICE),
            dir_mode: DEFAULT_DIR_MODE.to_string(),
        }
    }
}

/// An ordered list of operations that builds and mounts the data drive.
#[derive(Debug, Clone)]
pub struct DrivePlan {
    pub ops: Vec<DriveOp>,
    pub layout: DriveLayout,
    /// Device that ends up mounted (the disk itself, or the md array)
    pub target: PathBuf,
    pub data_dir: PathBuf,
}

impl DrivePlan {
    /// Plan for a single device formatted and mounted directly.
    pub fn single(data_dir: &Path, device: &Path, options: &PlanOptions) -> Self {
        let ops = vec![
            DriveOp::Format {
                device: device.to_path_buf(),
                filesystem: options.filesystem,
            },
            DriveOp::MakeDir {
                dir: data_dir.to_path_buf(),
            },
            DriveOp::Mount {
                device: device.to_path_buf(),
                dir: data_dir.to_path_buf(),
            },
            DriveOp::Chmod {
                dir: data_dir.to_path_buf(),
                mode: options.dir_mode.clone(),
            },
        ];

        Self {
            ops,
            layout: DriveLayout::Single,
            target: device.to_path_buf(),
            data_dir: data_dir.to_path_buf(),
        }
    }

    /// Plan for a RAID-0 array across all `devices`.
    ///
    /// # Errors
    ///
    /// Returns `Plan` if fewer than two devices are given, or if a device is
    /// listed twice.
    pub fn raid0(data_dir: &Path, devices: &[PathBuf], options: &PlanOptions) -> Result<Self> {
        if devices.len() < 2 {
            return Err(DriveSetupError::plan(format!(
                "RAID-0 needs at least 2 devices, got {}",
                devices.len()
            )));
        }
        for (i, device) in devices.iter().enumerate() {
            if devices[..i].contains(device) {
                return Err(DriveSetupError::plan(format!(
                    "device {} listed more than once",
                    device.display()
                )));
            }
        }

        let array = options.raid_device.clone();
        let ops = vec![
            DriveOp::CreateRaid0 {
                array: array.clone(),
                devices: devices.to_vec(),
            },
            DriveOp::Format {
                device: array.clone(),
                filesystem: options.filesystem,
            },
            DriveOp::MakeDir {
                dir: data_dir.to_path_buf(),
            },
            DriveOp::Mount {
                device: array.clone(),
                dir: data_dir.to_path_buf(),
            },
            DriveOp::Chmod {
                dir: data_dir.to_path_buf(),
                mode: options.dir_mode.clone(),
            },
        ];

        Ok(Self {
            ops,
            layout: DriveLayout::Raid0,
            target: array,
            data_dir: data_dir.to_path_buf(),
        })
    }

    /// Pick the layout from the device count.
    ///
    /// # Errors
    ///
    /// `NoDevicesFound` for an empty device list.
    pub fn for_devices(
        data_dir: &Path,
        devices: &[PathBuf],
        options: &PlanOptions,
        prefix: &str,
    ) -> Result<Self> {
        match devices {
            [] => Err(DriveSetupError::NoDevicesFound {
                prefix: prefix.to_string(),
            }),
            [device] => Ok(Self::single(data_dir, device, options)),
            _ => Self::raid0(data_dir, devices, options),
        }
    }

    /// Lower every step to the command it runs.
    pub fn commands(&self) -> Vec<CommandSpec> {
        self.ops.iter().map(DriveOp::command).collect()
    }

    pub fn summary(&self) -> String {
        let mut lines = vec![
            format!("Drive Plan: {}", self.layout),
            format!("  Target: {}", self.target.display()),
            format!("  Mount point: {}", self.data_dir.display()),
            format!("  Operations ({}):", self.ops.len()),
        ];
        for (i, op) in self.ops.iter().enumerate() {
            lines.push(format!("    {}. {}", i + 1, op.command()));
        }
        lines.join("\n")
    }
}
