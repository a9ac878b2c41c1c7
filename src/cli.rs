use crate::config::DriveSetupConfig;
use crate::error::Result;
use crate::types::Filesystem;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// drivesetup - prepare local NVMe storage for a benchmark run
#[derive(Parser)]
#[command(name = "drivesetup")]
#[command(
    about = "Detect local NVMe devices and mount them as a data drive (single disk or RAID-0)"
)]
#[command(version)]
pub struct Cli {
    /// Dry-run mode: print what would be executed without changing anything.
    ///
    /// `lsblk` and `mountpoint` still run so the plan reflects the host.
    #[arg(long, global = true)]
    pub dry_run: bool,

    /// Increase log verbosity (-v debug, -vv trace). RUST_LOG overrides.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create and mount the data drive
    Setup {
        #[command(flatten)]
        drive: DriveArgs,

        /// Build the drive from local NVMe devices (without this, nothing is done)
        #[arg(long)]
        nvme_raid: bool,

        /// Skip binary and privilege checks
        #[arg(long)]
        skip_preflight: bool,

        /// Skip only the root check (also DRIVESETUP_SKIP_ROOT_CHECK=1)
        #[arg(long)]
        skip_root_check: bool,
    },
    /// Print the detected devices
    List {
        /// lsblk name prefix to match
        #[arg(long, default_value = crate::devices::NVME_PREFIX)]
        prefix: String,
    },
    /// Print the commands a setup run would execute
    Plan {
        #[command(flatten)]
        drive: DriveArgs,
    },
    /// Validate a configuration file
    Validate {
        /// Path to configuration file to validate
        config: PathBuf,
    },
}

/// Drive options shared by `setup` and `plan`. Flags override the config file.
#[derive(Args, Debug, Default)]
pub struct DriveArgs {
    /// Directory to mount the data drive at
    #[arg(short, long)]
    pub data_dir: Option<PathBuf>,

    /// JSON configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// lsblk name prefix selecting devices (default: nvme)
    #[arg(long)]
    pub prefix: Option<String>,

    /// md device to create for multiple devices (default: /dev/md0)
    #[arg(long)]
    pub raid_device: Option<PathBuf>,

    /// Filesystem to create (ext4, xfs)
    #[arg(short, long)]
    pub filesystem: Option<Filesystem>,
}

impl DriveArgs {
    /// Merge the config file (if any) with command line overrides.
    ///
    /// The result is validated only when drive setup is enabled; a disabled
    /// setup never looks at the other fields.
    pub fn resolve(&self, nvme_raid: bool) -> Result<DriveSetupConfig> {
        let mut config = match (&self.config, &self.data_dir) {
            (Some(path), _) => DriveSetupConfig::load_from_file(path)?,
            (None, Some(dir)) => DriveSetupConfig::new(dir.clone(), false),
            (None, None) => {
                return Err(crate::error::DriveSetupError::config(
                    "either --data-dir or --config is required",
                ));
            }
        };

        if let Some(dir) = &self.data_dir {
            config.data_dir = dir.clone();
        }
        if let Some(prefix) = &self.prefix {
            config.device_prefix = prefix.clone();
        }
        if let Some(raid_device) = &self.raid_device {
            config.raid_device = raid_device.clone();
        }
        if let Some(filesystem) = self.filesystem {
            config.filesystem = filesystem;
        }
        config.nvme_raid |= nvme_raid;

        if config.nvme_raid {
            config.validate()?;
        }
        Ok(config)
    }
}

impl Cli {
    pub fn parse_args() -> Self {
        <Self as clap::Parser>::parse()
    }
}
