//! Per-run state threaded through every step.
//!
//! Proxy settings, the activated virtual environment and the detected editor
//! config directory are recorded here instead of being written into the
//! installer's own process environment. Every command a step builds picks
//! them up through [`RunContext::command`].

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use crate::command::{CommandOutput, CommandRunner, CommandSpec};
use crate::error::Result;
use crate::installed::InstalledComponents;
use crate::layout::InstallLayout;
use crate::prompt::Prompt;

/// The external collaborators a run talks to.
pub struct Host<'a> {
    pub runner: &'a mut dyn CommandRunner,
    pub prompt: &'a mut dyn Prompt,
}

impl<'a> Host<'a> {
    pub fn new(runner: &'a mut dyn CommandRunner, prompt: &'a mut dyn Prompt) -> Self {
        Self { runner, prompt }
    }

    pub fn run(&mut self, spec: &CommandSpec) -> Result<CommandOutput> {
        self.runner.run(spec)
    }

    pub fn run_checked(&mut self, spec: &CommandSpec) -> Result<CommandOutput> {
        self.runner.run_checked(spec)
    }
}

/// Environment changes applied to every child command of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvOverlay {
    set: BTreeMap<String, String>,
    unset: BTreeSet<String>,
}

impl EnvOverlay {
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        self.unset.remove(&key);
        self.set.insert(key, value.into());
    }

    /// Clear a variable, including any value inherited from the parent.
    pub fn unset(&mut self, key: impl Into<String>) {
        let key = key.into();
        self.set.remove(&key);
        self.unset.insert(key);
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.set.get(key).map(String::as_str)
    }

    pub fn is_cleared(&self, key: &str) -> bool {
        self.unset.contains(key)
    }

    pub fn vars(&self) -> &BTreeMap<String, String> {
        &self.set
    }

    /// Resolve a variable the way a child would see it, given the inherited value.
    pub fn effective(&self, key: &str, inherited: Option<&str>) -> Option<String> {
        if let Some(value) = self.set.get(key) {
            return Some(value.clone());
        }
        if self.unset.contains(key) {
            return None;
        }
        inherited.map(str::to_string)
    }

    pub fn apply(&self, mut spec: CommandSpec) -> CommandSpec {
        for key in &self.unset {
            spec = spec.env_remove(key.clone());
        }
        for (key, value) in &self.set {
            spec = spec.env(key.clone(), value.clone());
        }
        spec
    }
}

/// Install-time facts recorded during one run.
#[derive(Debug, Clone, Default)]
pub struct InstallConfig {
    pub editor_version: Option<String>,
    pub editor_config_dir: Option<PathBuf>,
    pub python_version: Option<String>,
    pub hdl_installed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Info,
    /// Uninstall found an expected artifact already absent.
    Gap,
    /// A tolerated step failed and the run carried on.
    Tolerated,
    /// A component was skipped because its precondition failed.
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub message: String,
}

#[derive(Debug)]
pub struct RunContext {
    pub layout: InstallLayout,
    pub config: InstallConfig,
    pub env: EnvOverlay,
    pub venv: Option<PathBuf>,
    pub installed: Option<InstalledComponents>,
    notices: Vec<Notice>,
}

impl RunContext {
    pub fn new(layout: InstallLayout) -> Self {
        Self {
            layout,
            config: InstallConfig::default(),
            env: EnvOverlay::default(),
            venv: None,
            installed: None,
            notices: Vec::new(),
        }
    }

    /// Start a command that carries this run's environment.
    pub fn command(&self, program: impl Into<String>) -> CommandSpec {
        self.env.apply(CommandSpec::new(program))
    }

    /// Start a command that needs root, escalated per the layout.
    pub fn privileged(&self, program: impl Into<String>) -> CommandSpec {
        self.command(program)
            .privileged_if(self.layout.escalation.escalates())
    }

    /// Activate a virtual environment for the rest of the run.
    pub fn activate_venv(&mut self, venv: &Path) {
        let bin = venv.join("bin");
        let inherited = std::env::var("PATH").unwrap_or_default();
        let path = if inherited.is_empty() {
            bin.display().to_string()
        } else {
            format!("{}:{}", bin.display(), inherited)
        };
        self.env.set("VIRTUAL_ENV", venv.display().to_string());
        self.env.set("PATH", path);
        self.env.unset("PYTHONHOME");
        self.venv = Some(venv.to_path_buf());
    }

    /// Path to an executable inside the active venv, or the bare name.
    pub fn venv_tool(&self, name: &str) -> String {
        match &self.venv {
            Some(venv) => venv.join("bin").join(name).display().to_string(),
            None => name.to_string(),
        }
    }

    pub fn notice(&mut self, kind: NoticeKind, message: impl Into<String>) {
        let message = message.into();
        match kind {
            NoticeKind::Info | NoticeKind::Gap => tracing::info!("{}", message),
            NoticeKind::Tolerated | NoticeKind::Skipped => tracing::warn!("{}", message),
        }
        println!("{}", message);
        self.notices.push(Notice { kind, message });
    }

    pub fn notices(&self) -> &[Notice] {
        &self.notices
    }

    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }
}
