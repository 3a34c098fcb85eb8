//! External command execution
//!
//! Every package manager call, archive extraction, privileged file operation
//! and third-party script goes through a [`CommandRunner`]. The pipeline never
//! spawns processes itself, which keeps each collaborator call a single
//! inspectable [`CommandSpec`] and lets tests substitute a recording runner.
//!
//! Privileged specs are escalated per call with `sudo`; there is no long-lived
//! privileged session.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use tracing::{debug, info};

use crate::error::{InstallerError, Result};
use crate::process_guard::{ChildLifecycle, ChildRegistry};

/// A single external command invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: Option<PathBuf>,
    /// Variables set for the child on top of the inherited environment.
    pub env: BTreeMap<String, String>,
    /// Inherited variables removed from the child's environment.
    pub env_remove: Vec<String>,
    /// Run through `sudo`.
    pub privileged: bool,
    /// Capture stdout/stderr instead of sharing the terminal.
    pub capture: bool,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            ..Self::default()
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn path_arg(self, path: &Path) -> Self {
        self.arg(path.display().to_string())
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn env_remove(mut self, key: impl Into<String>) -> Self {
        self.env_remove.push(key.into());
        self
    }

    pub fn privileged_if(mut self, escalate: bool) -> Self {
        self.privileged = escalate;
        self
    }

    pub fn captured(mut self) -> Self {
        self.capture = true;
        self
    }

    /// Human readable command line, without environment values.
    pub fn label(&self) -> String {
        let mut parts = Vec::with_capacity(self.args.len() + 2);
        if self.privileged {
            parts.push("sudo");
        }
        parts.push(self.program.as_str());
        parts.extend(self.args.iter().map(String::as_str));
        parts.join(" ")
    }
}

/// Output from a command execution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Captured stdout (empty for interactive commands).
    pub stdout: String,
    /// Captured stderr (empty for interactive commands).
    pub stderr: String,
    /// Exit code (None if terminated by signal).
    pub exit_code: Option<i32>,
    pub success: bool,
}

impl CommandOutput {
    pub fn succeeded(stdout: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: String::new(),
            exit_code: Some(0),
            success: true,
        }
    }

    pub fn failed(code: i32, stderr: impl Into<String>) -> Self {
        Self {
            stdout: String::new(),
            stderr: stderr.into(),
            exit_code: Some(code),
            success: false,
        }
    }

    /// Return an error if the command exited unsuccessfully.
    pub fn ensure_success(&self, label: &str) -> Result<()> {
        if self.success {
            Ok(())
        } else {
            Err(InstallerError::command_failed(label, self.exit_code))
        }
    }
}

/// The seam between the pipeline and the host system.
pub trait CommandRunner {
    /// Run a command. `Err` means it could not be launched; a launched command
    /// that exits non-zero is `Ok` with `success == false`.
    fn run(&mut self, spec: &CommandSpec) -> Result<CommandOutput>;

    /// Run a command and treat a non-zero exit as an error.
    fn run_checked(&mut self, spec: &CommandSpec) -> Result<CommandOutput> {
        let output = self.run(spec)?;
        output.ensure_success(&spec.label())?;
        Ok(output)
    }
}

/// Runs commands on the real host.
#[derive(Debug, Default)]
pub struct SystemRunner;

impl SystemRunner {
    pub fn new() -> Self {
        Self
    }

    fn build(spec: &CommandSpec) -> Command {
        let mut cmd = if spec.privileged {
            let mut sudo = Command::new("sudo");
            if !spec.env.is_empty() {
                // sudo resets the environment; forward only what this run set
                let keys: Vec<&str> = spec.env.keys().map(String::as_str).collect();
                sudo.arg(format!("--preserve-env={}", keys.join(",")));
            }
            sudo.arg(&spec.program);
            sudo
        } else {
            Command::new(&spec.program)
        };

        cmd.args(&spec.args);
        if let Some(dir) = &spec.cwd {
            cmd.current_dir(dir);
        }
        for key in &spec.env_remove {
            cmd.env_remove(key);
        }
        cmd.envs(&spec.env);
        cmd.dies_with_parent();

        if spec.capture {
            cmd.stdin(Stdio::null())
                .stdout(Stdio::piped())
                .stderr(Stdio::piped())
                .in_new_process_group();
        } else {
            cmd.stdin(Stdio::inherit())
                .stdout(Stdio::inherit())
                .stderr(Stdio::inherit());
        }
        cmd
    }
}

impl CommandRunner for SystemRunner {
    fn run(&mut self, spec: &CommandSpec) -> Result<CommandOutput> {
        let label = spec.label();
        // Values may carry proxy credentials; keys only
        let env_keys: Vec<&String> = spec.env.keys().collect();
        info!("run: {} cwd={:?} env={:?}", label, spec.cwd, env_keys);

        let child = Self::build(spec)
            .spawn()
            .map_err(|source| InstallerError::Spawn {
                label: label.clone(),
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
        let result = CommandOutput {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            exit_code: output.status.code(),
            success: output.status.success(),
        };
        debug!(
            "{} exited with {:?} (success={})",
            label, result.exit_code, result.success
        );
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_renders_sudo_prefix() {
        let spec = CommandSpec::new("apt-get")
            .args(["install", "-y", "xterm"])
            .privileged_if(true);
        assert_eq!(spec.label(), "sudo apt-get install -y xterm");

        let spec = CommandSpec::new("tar").args(["-xJf", "a.tar.xz"]);
        assert_eq!(spec.label(), "tar -xJf a.tar.xz");
    }

    #[test]
    fn test_label_never_contains_env_values() {
        let spec = CommandSpec::new("pip")
            .arg("install")
            .env("https_proxy", "http://u:secret@h:1");
        assert!(!spec.label().contains("secret"));
    }

    #[test]
    fn test_ensure_success() {
        assert!(CommandOutput::succeeded("").ensure_success("x").is_ok());
        let err = CommandOutput::failed(2, "boom").ensure_success("x").unwrap_err();
        assert!(matches!(err, InstallerError::CommandFailed { code: 2, .. }));
    }

    #[test]
    fn test_system_runner_captures_output() {
        let mut runner = SystemRunner::new();
        let output = runner
            .run(&CommandSpec::new("sh").args(["-c", "echo hello"]).captured())
            .expect("sh should run");
        assert!(output.success);
        assert_eq!(output.stdout.trim(), "hello");
    }

    #[test]
    fn test_system_runner_applies_env_overlay() {
        let mut runner = SystemRunner::new();
        let output = runner
            .run(
                &CommandSpec::new("sh")
                    .args(["-c", "printf '%s' \"$ESIM_TEST_VALUE\""])
                    .env("ESIM_TEST_VALUE", "42")
                    .captured(),
            )
            .expect("sh should run");
        assert_eq!(output.stdout, "42");
    }

    #[test]
    fn test_run_checked_reports_exit_code() {
        let mut runner = SystemRunner::new();
        let err = runner
            .run_checked(&CommandSpec::new("sh").args(["-c", "exit 3"]).captured())
            .unwrap_err();
        assert!(matches!(err, InstallerError::CommandFailed { code: 3, .. }));
    }

    #[test]
    fn test_missing_program_is_spawn_error() {
        let mut runner = SystemRunner::new();
        let err = runner
            .run(&CommandSpec::new("esim-no-such-program-xyz").captured())
            .unwrap_err();
        assert!(err.is_program_missing());
    }
}
