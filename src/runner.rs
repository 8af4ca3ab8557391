use std::ffi::OsString;
use std::fmt::{self, Display};
use std::io;
use std::path::Path;
use std::process::{Command, Stdio};

use anyhow::{anyhow, bail, Result};
use tracing::debug;

/// One invocation of an external tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCommand {
    pub program: String,
    pub args: Vec<OsString>,
    /// capture stdout/stderr instead of inheriting the terminal
    pub capture: bool,
    /// shown when the program cannot be found on PATH
    pub install_hint: Option<String>,
}

impl ToolCommand {
    pub fn new(program: &str) -> Self {
        ToolCommand {
            program: program.to_string(),
            args: vec![],
            capture: false,
            install_hint: None,
        }
    }

    pub fn arg<S: Into<OsString>>(mut self, arg: S) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn path_arg(self, path: &Path) -> Self {
        self.arg(path.as_os_str())
    }

    pub fn capture_output(mut self) -> Self {
        self.capture = true;
        self
    }

    pub fn install_hint(mut self, hint: &str) -> Self {
        self.install_hint = Some(hint.to_string());
        self
    }
}

impl Display for ToolCommand {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg.to_string_lossy())?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct ToolOutput {
    pub stdout: String,
    pub stderr: String,
}

/// Runs external tools to completion. The pipeline only talks to this
/// trait so a run can be replayed without the real binaries.
pub trait Runner {
    fn run(&self, command: &ToolCommand) -> Result<ToolOutput>;
}

/// Blocking runner backed by `std::process::Command`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl Runner for SystemRunner {
    fn run(&self, command: &ToolCommand) -> Result<ToolOutput> {
        debug!("spawn: {}", command);
        let mut cmd = Command::new(&command.program);
        cmd.args(&command.args);

        let result = if command.capture {
            cmd.stdin(Stdio::null()).output().map(|out| {
                (
                    out.status,
                    ToolOutput {
                        stdout: String::from_utf8_lossy(&out.stdout).into_owned(),
                        stderr: String::from_utf8_lossy(&out.stderr).into_owned(),
                    },
                )
            })
        } else {
            cmd.status().map(|status| (status, ToolOutput::default()))
        };

        let (status, output) = match result {
            Ok(r) => r,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(not_found(command));
            }
            Err(e) => return Err(anyhow!("failed to start {}: {}", command.program, e)),
        };

        if !status.success() {
            if command.capture {
                bail!(
                    "{} exited with {}\nStdout: {}\nStderr: {}",
                    command.program,
                    status,
                    output.stdout.trim_end(),
                    output.stderr.trim_end()
                );
            }
            bail!("{} exited with {}", command.program, status);
        }
        Ok(output)
    }
}

fn not_found(command: &ToolCommand) -> anyhow::Error {
    match &command.install_hint {
        Some(hint) => anyhow!("{} not found in your PATH. {}", command.program, hint),
        None => anyhow!("{} not found in your PATH", command.program),
    }
}

#[test]
fn test_display() {
    let cmd = ToolCommand::new("liftOver")
        .arg("a.bed")
        .path_arg(Path::new("b.chain"));
    assert_eq!(cmd.to_string(), "liftOver a.bed b.chain");
}

#[test]
fn test_missing_binary() {
    let cmd = ToolCommand::new("imprintlift-no-such-tool-7f3a").install_hint("Install it.");
    let err = SystemRunner.run(&cmd).unwrap_err().to_string();
    assert!(err.contains("not found in your PATH"), "{}", err);
    assert!(err.contains("Install it."));
}

#[cfg(unix)]
#[test]
fn test_exit_status() {
    assert!(SystemRunner.run(&ToolCommand::new("true")).is_ok());
    assert!(SystemRunner.run(&ToolCommand::new("true").capture_output()).is_ok());

    let err = SystemRunner
        .run(&ToolCommand::new("false").capture_output())
        .unwrap_err()
        .to_string();
    assert!(err.starts_with("false exited with"), "{}", err);
    assert!(err.contains("Stderr:"));
}
