//! External command execution
//!
//! Every subprocess goes through a `CommandRunner`. Commands are argument
//! vectors (`CommandSpec`), never shell strings, so a device path or a
//! directory name is passed to the program verbatim.
//!
//! # Implementations
//!
//! | Runner          | Behaviour |
//! |-----------------|-----------|
//! | `SystemRunner`  | Spawns the program, isolated in its own process group |
//! | `DryRunRunner`  | Logs mutating commands instead of running them |
//!
//! Tests implement the trait with a recording mock.

use crate::error::{DriveSetupError, Result};
use crate::process_guard::{ChildRegistry, CommandProcessGroup};
use std::ffi::OsString;
use std::fmt;
use std::process::{Command, Stdio};
use std::sync::Mutex;
use tracing::{debug, info};

/// A program and its arguments.
///
/// Arguments are `OsString` so paths reach the program byte for byte, even
/// when they are not valid UTF-8.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<OsString>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }
}

impl fmt::Display for CommandSpec {
    /// Space-joined command line, for logs and error messages only.
    /// Non-UTF-8 bytes are shown as U+FFFD.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg.to_string_lossy())?;
        }
        Ok(())
    }
}

/// Result of a finished command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code (None if terminated by signal).
    pub exit_code: Option<i32>,
    /// stdout followed by stderr.
    pub log: String,
}

impl CommandOutput {
    pub fn success(log: impl Into<String>) -> Self {
        Self {
            exit_code: Some(0),
            log: log.into(),
        }
    }

    pub fn failure(code: i32, log: impl Into<String>) -> Self {
        Self {
            exit_code: Some(code),
            log: log.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// Exit code with signal termination reported as -1.
    pub fn code(&self) -> i32 {
        self.exit_code.unwrap_or(-1)
    }
}

/// Executes external commands.
pub trait CommandRunner {
    /// Run a single command and report its status and combined output.
    ///
    /// A nonzero exit is returned as `Ok`; only failing to run the command
    /// at all is an error.
    fn run(&self, cmd: &CommandSpec) -> Result<CommandOutput>;

    /// Run commands in order, stopping at the first nonzero exit.
    fn run_all(&self, cmds: &[CommandSpec]) -> Result<()> {
        for cmd in cmds {
            let output = self.run(cmd)?;
            if !output.is_success() {
                return Err(DriveSetupError::CommandFailed {
                    command: cmd.to_string(),
                    code: output.code(),
                    log: output.log,
                });
            }
        }
        Ok(())
    }
}

impl<R: CommandRunner + ?Sized> CommandRunner for &R {
    fn run(&self, cmd: &CommandSpec) -> Result<CommandOutput> {
        (**self).run(cmd)
    }
}

/// Runs commands on the host.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, cmd: &CommandSpec) -> Result<CommandOutput> {
        info!("Running: {}", cmd);

        let child = Command::new(&cmd.program)
            .args(&cmd.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .in_new_process_group()
            .spawn()
            .map_err(|source| DriveSetupError::Spawn {
                command: cmd.to_string(),
                source,
            })?;
        let pid = child.id();

        if let Ok(mut registry) = ChildRegistry::global().lock() {
            registry.register(pid);
        }

        let waited = child.wait_with_output();

        if let Ok(mut registry) = ChildRegistry::global().lock() {
            registry.unregister(pid);
        }

        let output = waited?;
        let mut log = String::from_utf8_lossy(&output.stdout).into_owned();
        log.push_str(&String::from_utf8_lossy(&output.stderr));

        let result = CommandOutput {
            exit_code: output.status.code(),
            log,
        };
        debug!(code = result.code(), "{} output:\n{}", cmd.program, result.log);
        Ok(result)
    }
}

/// Programs that only inspect state. `DryRunRunner` still executes these so
/// the printed plan reflects the real devices.
const READ_ONLY_PROGRAMS: &[&str] = &["lsblk", "mountpoint"];

/// Passes read-only commands through to `inner` and records everything else.
#[derive(Debug)]
pub struct DryRunRunner<R> {
    inner: R,
    skipped: Mutex<Vec<CommandSpec>>,
}

impl<R: CommandRunner> DryRunRunner<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            skipped: Mutex::new(Vec::new()),
        }
    }

    /// Commands that would have been executed, in order.
    pub fn skipped(&self) -> Vec<CommandSpec> {
        self.skipped
            .lock()
            .map(|cmds| cmds.clone())
            .unwrap_or_default()
    }
}

impl<R: CommandRunner> CommandRunner for DryRunRunner<R> {
    fn run(&self, cmd: &CommandSpec) -> Result<CommandOutput> {
        if READ_ONLY_PROGRAMS.contains(&cmd.program.as_str()) {
            return self.inner.run(cmd);
        }

        info!("[DRY RUN] Skipped: {}", cmd);
        if let Ok(mut skipped) = self.skipped.lock() {
            skipped.push(cmd.clone());
        }
        Ok(CommandOutput::success(format!("[DRY RUN] Skipped: {}\n", cmd)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    /// Fails every command whose program is `fail_on`.
    struct ScriptedRunner {
        fail_on: &'static str,
        calls: RefCell<Vec<String>>,
    }

    impl CommandRunner for ScriptedRunner {
        fn run(&self, cmd: &CommandSpec) -> Result<CommandOutput> {
            self.calls.borrow_mut().push(cmd.to_string());
            if cmd.program == self.fail_on {
                Ok(CommandOutput::failure(32, "mount: wrong fs type"))
            } else {
                Ok(CommandOutput::success(""))
            }
        }
    }

    #[test]
    fn test_command_spec_display() {
        let cmd = CommandSpec::new("mount").args(["/dev/md0", "/data"]);
        assert_eq!(cmd.to_string(), "mount /dev/md0 /data");
        assert_eq!(CommandSpec::new("lsblk").to_string(), "lsblk");
    }

    #[test]
    fn test_command_spec_keeps_arguments_separate() {
        let cmd = CommandSpec::new("mkdir").arg("-p").arg("/mnt/my data");
        assert_eq!(cmd.args, vec![OsString::from("-p"), OsString::from("/mnt/my data")]);
    }

    #[test]
    fn test_command_spec_keeps_non_utf8_bytes() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let dir = OsStr::from_bytes(b"/mnt/bench\xff");
        let cmd = CommandSpec::new("mkdir").arg("-p").arg(dir);

        assert_eq!(cmd.args[1].as_bytes(), b"/mnt/bench\xff");
        assert_eq!(cmd.to_string(), "mkdir -p /mnt/bench\u{FFFD}");
    }

    #[test]
    fn test_command_output_code() {
        assert!(CommandOutput::success("").is_success());
        assert_eq!(CommandOutput::failure(3, "").code(), 3);

        let killed = CommandOutput {
            exit_code: None,
            log: String::new(),
        };
        assert!(!killed.is_success());
        assert_eq!(killed.code(), -1);
    }

    #[test]
    fn test_run_all_stops_at_first_failure() {
        let runner = ScriptedRunner {
            fail_on: "mount",
            calls: RefCell::new(Vec::new()),
        };
        let cmds = vec![
            CommandSpec::new("mkdir").args(["-p", "/data"]),
            CommandSpec::new("mount").args(["/dev/nvme0n1", "/data"]),
            CommandSpec::new("chmod").args(["a+w", "/data"]),
        ];

        let err = runner.run_all(&cmds).unwrap_err();
        match err {
            DriveSetupError::CommandFailed { command, code, log } => {
                assert_eq!(command, "mount /dev/nvme0n1 /data");
                assert_eq!(code, 32);
                assert!(log.contains("wrong fs type"));
            }
            other => panic!("Expected CommandFailed, got {:?}", other),
        }
        assert_eq!(runner.calls.borrow().len(), 2, "chmod must not run");
    }

    #[test]
    fn test_dry_run_passes_read_only_commands_through() {
        let inner = ScriptedRunner {
            fail_on: "mountpoint",
            calls: RefCell::new(Vec::new()),
        };
        let dry = DryRunRunner::new(&inner);

        let check = dry.run(&CommandSpec::new("mountpoint").args(["-q", "/data"])).unwrap();
        assert_eq!(check.code(), 32);

        let format = dry.run(&CommandSpec::new("mkfs.ext4").args(["-F", "/dev/nvme0n1"])).unwrap();
        assert!(format.is_success());
        assert!(format.log.contains("DRY RUN"));

        assert_eq!(inner.calls.borrow().as_slice(), ["mountpoint -q /data"]);
        assert_eq!(dry.skipped().len(), 1);
        assert_eq!(dry.skipped()[0].program, "mkfs.ext4");
    }

    #[test]
    fn test_system_runner_captures_status_and_output() {
        let out = SystemRunner
            .run(&CommandSpec::new("sh").args(["-c", "echo out; echo err >&2; exit 3"]))
            .unwrap();
        assert_eq!(out.exit_code, Some(3));
        assert!(out.log.contains("out"));
        assert!(out.log.contains("err"));
    }

    #[test]
    fn test_system_runner_missing_binary_is_spawn_error() {
        let err = SystemRunner
            .run(&CommandSpec::new("this_binary_definitely_does_not_exist_12345"))
            .unwrap_err();
        assert!(matches!(err, DriveSetupError::Spawn { .. }));
    }
}
