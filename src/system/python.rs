//! Python virtual environment and package installs.

use std::path::Path;

use tracing::{debug, info};

use crate::context::{Host, RunContext};
use crate::error::{InstallerError, Result};
use crate::system::files;

/// `virtualenv <path>`; the environment belongs to the invoking user.
pub fn create_venv(ctx: &RunContext, host: &mut Host<'_>, path: &Path) -> Result<()> {
    host.run_checked(&ctx.command("virtualenv").path_arg(path))?;
    if !path.join("bin").is_dir() {
        return Err(InstallerError::filesystem(format!(
            "virtual environment {} has no bin directory",
            path.display()
        )));
    }
    files::hand_back(ctx, path)
}

/// `pip install [--upgrade] <packages...>` inside the active venv.
pub fn pip_install(
    ctx: &RunContext,
    host: &mut Host<'_>,
    packages: &[&str],
    upgrade: bool,
) -> Result<()> {
    let mut spec = ctx.command(ctx.venv_tool("pip")).arg("install");
    if upgrade {
        spec = spec.arg("--upgrade");
    }
    host.run_checked(&spec.args(packages.iter().copied()))?;
    if let Some(venv) = &ctx.venv {
        files::hand_back(ctx, venv)?;
    }
    Ok(())
}

/// Detected `major.minor` of the venv's interpreter.
pub fn python_version(ctx: &RunContext, host: &mut Host<'_>) -> Result<String> {
    let output = host.run_checked(&ctx.command(ctx.venv_tool("python3")).arg("--version").captured())?;
    // Older interpreters print the version on stderr
    let text = if output.stdout.trim().is_empty() {
        &output.stderr
    } else {
        &output.stdout
    };
    parse_python_version(text).ok_or_else(|| {
        InstallerError::general(format!("unrecognised python version output: {}", text.trim()))
    })
}

/// `"Python 3.10.12"` -> `"3.10"`
pub fn parse_python_version(text: &str) -> Option<String> {
    let version = text.trim().strip_prefix("Python")?.trim();
    let mut parts = version.split('.');
    let major = parts.next().filter(|p| p.chars().all(|c| c.is_ascii_digit()) && !p.is_empty())?;
    let minor: String = parts
        .next()?
        .chars()
        .take_while(char::is_ascii_digit)
        .collect();
    if minor.is_empty() {
        return None;
    }
    Some(format!("{}.{}", major, minor))
}

/// Outcome of [`CapabilityProbe::ensure`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeOutcome {
    Available,
    FallbackInstalled,
}

/// Try to use an interpreter capability; install a fallback if that fails.
#[derive(Debug, Clone, Copy)]
pub struct CapabilityProbe {
    pub capability: &'static str,
    pub probe_code: &'static str,
    pub fallback: &'static [&'static str],
}

/// `distutils` left the standard library in 3.12; `setuptools` ships a shim.
pub const DISTUTILS: CapabilityProbe = CapabilityProbe {
    capability: "distutils",
    probe_code: "import distutils",
    fallback: &["setuptools"],
};

impl CapabilityProbe {
    pub fn ensure(&self, ctx: &RunContext, host: &mut Host<'_>) -> Result<ProbeOutcome> {
        let probe = host.run(
            &ctx.command(ctx.venv_tool("python3"))
                .args(["-c", self.probe_code])
                .captured(),
        )?;
        if probe.success {
            debug!("{} available", self.capability);
            return Ok(ProbeOutcome::Available);
        }

        info!("{} unavailable, installing {:?}", self.capability, self.fallback);
        pip_install(ctx, host, self.fallback, false)?;
        Ok(ProbeOutcome::FallbackInstalled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{CommandOutput, CommandRunner, CommandSpec};
    use crate::layout::{Escalation, InstallLayout, Owner};
    use crate::prompt::ScriptedPrompt;

    struct ProbeRunner {
        probe_succeeds: bool,
        labels: Vec<String>,
    }

    impl CommandRunner for ProbeRunner {
        fn run(&mut self, spec: &CommandSpec) -> Result<CommandOutput> {
            self.labels.push(spec.label());
            if spec.args.first().map(String::as_str) == Some("-c") && !self.probe_succeeds {
                return Ok(CommandOutput::failed(1, "ModuleNotFoundError"));
            }
            Ok(CommandOutput::succeeded(""))
        }
    }

    fn ctx() -> RunContext {
        let mut ctx = RunContext::new(InstallLayout::rooted(
            "/opt/eSim",
            "/home/ada",
            Path::new("/"),
            Owner::current(),
            Escalation::Direct,
        ));
        ctx.venv = Some("/home/ada/.esim/env".into());
        ctx
    }

    #[test]
    fn test_parse_python_version() {
        assert_eq!(parse_python_version("Python 3.10.12\n"), Some("3.10".into()));
        assert_eq!(parse_python_version("Python 3.12.0rc1"), Some("3.12".into()));
        assert_eq!(parse_python_version("Python 3"), None);
        assert_eq!(parse_python_version("pypy"), None);
    }

    #[test]
    fn test_probe_success_installs_nothing() {
        let ctx = ctx();
        let mut runner = ProbeRunner {
            probe_succeeds: true,
            labels: Vec::new(),
        };
        let mut prompt = ScriptedPrompt::default();
        let mut host = Host::new(&mut runner, &mut prompt);
        assert_eq!(DISTUTILS.ensure(&ctx, &mut host).unwrap(), ProbeOutcome::Available);
        assert_eq!(runner.labels.len(), 1);
    }

    #[test]
    fn test_probe_failure_installs_fallback() {
        let ctx = ctx();
        let mut runner = ProbeRunner {
            probe_succeeds: false,
            labels: Vec::new(),
        };
        let mut prompt = ScriptedPrompt::default();
        let mut host = Host::new(&mut runner, &mut prompt);
        assert_eq!(
            DISTUTILS.ensure(&ctx, &mut host).unwrap(),
            ProbeOutcome::FallbackInstalled
        );
        assert_eq!(
            runner.labels.last().map(String::as_str),
            Some("/home/ada/.esim/env/bin/pip install setuptools")
        );
    }
}
