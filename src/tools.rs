//! External program lookup and invocation.

use crate::config::ToolNames;
use crate::error::{MediaError, Result};
use log::debug;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

/// Resolved locations of every external program a `convert` run needs.
#[derive(Debug, Clone)]
pub struct Toolchain {
    pub dasdcopy: PathBuf,
    pub hetupd: PathBuf,
    pub unzip: PathBuf,
}

impl Toolchain {
    /// Looks every tool up on `PATH`, reporting all missing ones together.
    pub fn resolve(names: &ToolNames) -> Result<Self> {
        let mut missing = Vec::new();
        let mut lookup = |name: &str| match which::which(name) {
            Ok(path) => path,
            Err(_) => {
                missing.push(name.to_string());
                PathBuf::from(name)
            }
        };

        let dasdcopy = lookup(&names.dasdcopy);
        let hetupd = lookup(&names.hetupd);
        let unzip = lookup(&names.unzip);

        if !missing.is_empty() {
            return Err(MediaError::MissingTool { tools: missing });
        }

        debug!(
            "Using dasdcopy={}, hetupd={}, unzip={}",
            dasdcopy.display(),
            hetupd.display(),
            unzip.display()
        );
        Ok(Self {
            dasdcopy,
            hetupd,
            unzip,
        })
    }
}

/// Short name of a tool for messages.
pub fn tool_name(tool: &Path) -> String {
    tool.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| tool.display().to_string())
}

/// Runs an external program to completion.
pub trait ToolRunner {
    /// Runs `tool` with `args`, discarding its output. A non-zero exit is an error.
    fn run(&self, tool: &Path, args: &[OsString]) -> Result<()>;
}

/// [`ToolRunner`] backed by real child processes.
#[derive(Debug, Clone, Default)]
pub struct SystemRunner {
    timeout: Option<Duration>,
}

impl SystemRunner {
    pub fn new(timeout: Option<Duration>) -> Self {
        Self { timeout }
    }

    fn wait_with_deadline(tool: &Path, child: &mut Child, limit: Duration) -> Result<ExitStatus> {
        let deadline = Instant::now() + limit;
        loop {
            if let Some(status) = child.try_wait().map_err(|e| MediaError::io(tool, e))? {
                return Ok(status);
            }
            if Instant::now() >= deadline {
                debug!("{} exceeded {:?}, killing it", tool.display(), limit);
                // The child may have exited between try_wait and kill.
                kill_tree(child);
                let _ = child.wait();
                return Err(MediaError::Timeout {
                    tool: tool_name(tool),
                    after: limit,
                });
            }
            thread::sleep(Duration::from_millis(50));
        }
    }
}

/// Kills the child and everything it started. The child leads its own process group.
#[cfg(unix)]
fn kill_tree(child: &mut Child) {
    use nix::sys::signal::{killpg, Signal};
    use nix::unistd::Pid;

    if killpg(Pid::from_raw(child.id() as i32), Signal::SIGKILL).is_err() {
        let _ = child.kill();
    }
}

#[cfg(not(unix))]
fn kill_tree(child: &mut Child) {
    let _ = child.kill();
}

impl ToolRunner for SystemRunner {
    fn run(&self, tool: &Path, args: &[OsString]) -> Result<()> {
        debug!("Running {} {:?}", tool.display(), args);

        let mut command = Command::new(tool);
        command
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            command.process_group(0);
        }

        let mut child = command.spawn().map_err(|e| MediaError::io(tool, e))?;
        let status = match self.timeout {
            Some(limit) => Self::wait_with_deadline(tool, &mut child, limit)?,
            None => child.wait().map_err(|e| MediaError::io(tool, e))?,
        };

        if !status.success() {
            return Err(MediaError::ExternalTool {
                tool: tool_name(tool),
                code: status.code(),
            });
        }
        Ok(())
    }
}
