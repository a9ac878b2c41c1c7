//! drivesetup - main entry point

use anyhow::{Context, Result};
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

use drivesetup::cli::{Cli, Commands};
use drivesetup::command_runner::{CommandRunner, DryRunRunner, SystemRunner};
use drivesetup::{
    DriveSetupConfig, DriveSetupError, SetupOutcome, create_drive_from_devices,
    list_nvme_devices, plan_drive, process_guard, sanity,
};

/// Logs go to stderr so `list` and `plan` output stays pipeable.
fn init_logger(verbose: u8) {
    let default_level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    let cli = Cli::parse_args();
    init_logger(cli.verbose);

    if let Err(e) = process_guard::init_signal_handlers() {
        warn!("Failed to initialize signal handlers: {}", e);
    }

    if let Err(e) = run(cli) {
        match failed_command_code(&e) {
            Some(code) => {
                error!(exit_code = code, "{:#}", e);
                eprintln!("✗ {:#}", e);
                eprintln!("  (command exited with code {})", code);
            }
            None => {
                error!("{:#}", e);
                eprintln!("✗ {:#}", e);
            }
        }
        std::process::exit(1);
    }
}

/// Exit code of the external command behind `err`, looking through context.
fn failed_command_code(err: &anyhow::Error) -> Option<i32> {
    err.downcast_ref::<DriveSetupError>()
        .and_then(DriveSetupError::exit_code)
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Setup {
            drive,
            nvme_raid,
            skip_preflight,
            skip_root_check,
        } => {
            let config = drive.resolve(nvme_raid)?;
            if config.nvme_raid && !skip_preflight && !cli.dry_run {
                sanity::run_preflight_checks(config.filesystem, skip_root_check)?;
            }

            let outcome = if cli.dry_run {
                let runner = DryRunRunner::new(SystemRunner);
                let outcome = setup(&runner, &config)?;
                for cmd in runner.skipped() {
                    println!("{}", cmd);
                }
                outcome
            } else {
                setup(&SystemRunner, &config)?
            };
            report(&outcome, &config);
        }
        Commands::List { prefix } => {
            for device in list_nvme_devices(&SystemRunner, &prefix)? {
                println!("{}", device.display());
            }
        }
        Commands::Plan { drive } => {
            let config = drive.resolve(false)?;
            config.validate()?;
            let plan = plan_drive(&SystemRunner, &config)?;
            println!("{}", plan.summary());
        }
        Commands::Validate { config } => {
            info!("Validating configuration file: {}", config.display());
            let loaded = DriveSetupConfig::load_from_file(&config)
                .with_context(|| format!("Failed to load {}", config.display()))?;
            loaded.validate()?;
            println!("✓ Configuration file is valid: {}", config.display());
        }
    }
    Ok(())
}

fn setup<R: CommandRunner>(runner: &R, config: &DriveSetupConfig) -> Result<SetupOutcome> {
    debug!("Setup config: {:?}", config);
    create_drive_from_devices(runner, config).with_context(|| {
        format!("Failed to set up data drive at {}", config.data_dir.display())
    })
}

fn report(outcome: &SetupOutcome, config: &DriveSetupConfig) {
    let dir = config.data_dir.display();
    match outcome {
        SetupOutcome::Disabled => info!("Nothing to do: --nvme-raid not set"),
        SetupOutcome::AlreadyMounted => println!("✓ {} is already mounted", dir),
        SetupOutcome::Single { device } => {
            println!("✓ Mounted {} at {}", device.display(), dir)
        }
        SetupOutcome::Raid0 { array, devices } => println!(
            "✓ Mounted {} ({} devices, RAID-0) at {}",
            array.display(),
            devices.len(),
            dir
        ),
    }
}
