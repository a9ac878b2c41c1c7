//! drivesetup library
//!
//! Prepares local NVMe storage before a benchmark run: a single device is
//! formatted and mounted directly, several are striped into a RAID-0 md
//! array first.

pub mod cli;
pub mod command_runner;
pub mod config;
pub mod devices;
pub mod error;
pub mod plan;
pub mod process_guard;
pub mod sanity;
pub mod setup;
pub mod types;

pub use command_runner::{CommandOutput, CommandRunner, CommandSpec, DryRunRunner, SystemRunner};
pub use config::DriveSetupConfig;
pub use devices::{NVME_PREFIX, list_nvme_devices, parse_nvme_devices};
pub use error::{DriveSetupError, Result};
pub use plan::{DriveOp, DrivePlan, PlanOptions};
pub use process_guard::{ChildRegistry, CommandProcessGroup};
pub use setup::{SetupOutcome, create_drive_from_devices, plan_drive, setup_data_drive};
pub use types::{DriveLayout, Filesystem};
