//! System packages and the isolated Python environment eSim runs in.

use crate::components::{Scope, remove_recorded};
use crate::context::{Host, NoticeKind, RunContext};
use crate::error::Result;
use crate::system::apt;
use crate::system::python::{self, DISTUTILS, ProbeOutcome};

pub const VENV_TOOL_PACKAGE: &str = "python3-virtualenv";

pub const SYSTEM_PACKAGES: [&str; 6] = [
    "xterm",
    "python3-psutil",
    "python3-pyqt5",
    "python3-matplotlib",
    "python3-setuptools",
    "python3-pip",
];

pub const PYTHON_PACKAGES: [&str; 7] = [
    "numpy",
    "matplotlib",
    "PyQt5",
    "hdlparse",
    "watchdog",
    "makerchip-app",
    "sandpiper-saas",
];

/// Fetched straight from source control rather than an index.
pub const PYTHON_SOURCE_PACKAGE: &str = "https://github.com/hdl/pyhdlparser/tarball/master";

pub fn refresh_index(ctx: &mut RunContext, host: &mut Host<'_>) -> Result<()> {
    apt::refresh_index(ctx, host)?;
    Ok(())
}

pub fn install_venv_tool(ctx: &mut RunContext, host: &mut Host<'_>) -> Result<()> {
    apt::install(ctx, host, &[VENV_TOOL_PACKAGE])
}

/// Create `~/.esim/env` and use it for every later command of the run.
pub fn create_venv(ctx: &mut RunContext, host: &mut Host<'_>) -> Result<()> {
    let venv = ctx.layout.venv_dir.clone();
    python::create_venv(ctx, host, &venv)?;
    ctx.activate_venv(&venv);
    Ok(())
}

pub fn upgrade_pip(ctx: &mut RunContext, host: &mut Host<'_>) -> Result<()> {
    python::pip_install(ctx, host, &["pip"], true)
}

pub fn install_system_packages(ctx: &mut RunContext, host: &mut Host<'_>) -> Result<()> {
    apt::install(ctx, host, &SYSTEM_PACKAGES)
}

/// Record the interpreter version and make sure `distutils` is importable.
pub fn check_python(ctx: &mut RunContext, host: &mut Host<'_>) -> Result<()> {
    let version = python::python_version(ctx, host)?;
    ctx.notice(NoticeKind::Info, format!("Python {} detected", version));
    ctx.config.python_version = Some(version);

    if DISTUTILS.ensure(ctx, host)? == ProbeOutcome::FallbackInstalled {
        ctx.notice(
            NoticeKind::Info,
            format!(
                "{} not available, installed {}",
                DISTUTILS.capability,
                DISTUTILS.fallback.join(" ")
            ),
        );
    }
    Ok(())
}

pub fn install_python_packages(ctx: &mut RunContext, host: &mut Host<'_>) -> Result<()> {
    python::pip_install(ctx, host, &PYTHON_PACKAGES, false)?;
    python::pip_install(ctx, host, &[PYTHON_SOURCE_PACKAGE], false)
}

pub fn remove_venv(ctx: &mut RunContext, host: &mut Host<'_>) -> Result<()> {
    let present = ctx.installed.as_ref().is_some_and(|s| s.venv);
    let venv = ctx.layout.venv_dir.clone();
    remove_recorded(ctx, host, present, &venv, Scope::User, "virtual environment")
}
