//! NGHDL, the optional mixed-signal HDL toolchain.
//!
//! NGHDL ships its own installer script. It is launched from the unpacked
//! bundle and its exit status is reported but never fails the run.

use std::fs;
use std::path::PathBuf;

use crate::command::CommandOutput;
use crate::components::{Scope, remove_recorded};
use crate::context::{Host, NoticeKind, RunContext};
use crate::error::{InstallerError, Result};
use crate::layout::InstallLayout;
use crate::system::archive::{ArchiveFormat, ComponentArchive};
use crate::system::files;

const EXTRACTED_DIR: &str = "nghdl";
pub const INSTALLER_SCRIPT: &str = "install-nghdl.sh";

pub fn bundle(layout: &InstallLayout) -> ComponentArchive {
    ComponentArchive::new(layout.hdl_bundle(), EXTRACTED_DIR, ArchiveFormat::Zip)
}

fn script(layout: &InstallLayout) -> PathBuf {
    layout.hdl_dir().join(INSTALLER_SCRIPT)
}

/// Launch the bundled script with `flag`. `None` when the script is absent.
fn launch(ctx: &RunContext, host: &mut Host<'_>, flag: &str) -> Result<Option<CommandOutput>> {
    let script = script(&ctx.layout);
    if !script.is_file() {
        return Ok(None);
    }
    let output = host.run(
        &ctx.command("bash")
            .path_arg(&script)
            .arg(flag)
            .current_dir(ctx.layout.hdl_dir()),
    )?;
    Ok(Some(output))
}

pub fn require_bundle(ctx: &mut RunContext, _host: &mut Host<'_>) -> Result<()> {
    bundle(&ctx.layout).require()
}

pub fn unpack(ctx: &mut RunContext, host: &mut Host<'_>) -> Result<()> {
    let root = ctx.layout.install_root.clone();
    let unpacked = bundle(&ctx.layout).extract(ctx, host, &root)?;
    files::hand_back(ctx, &unpacked)
}

/// Hand over to NGHDL's installer. The component counts as installed once the
/// script has been launched, whatever it exits with.
pub fn run_installer(ctx: &mut RunContext, host: &mut Host<'_>) -> Result<()> {
    let Some(output) = launch(ctx, host, "--install")? else {
        return Err(InstallerError::filesystem(format!(
            "{} not found in {}",
            INSTALLER_SCRIPT,
            ctx.layout.hdl_dir().display()
        )));
    };
    ctx.config.hdl_installed = true;
    output.ensure_success(&format!("{} --install", INSTALLER_SCRIPT))
}

/// Run NGHDL's own uninstaller, then delete the unpacked bundle.
pub fn uninstall(ctx: &mut RunContext, host: &mut Host<'_>) -> Result<()> {
    let present = ctx.installed.as_ref().is_some_and(|s| s.hdl);
    if present {
        match launch(ctx, host, "--uninstall")? {
            Some(output) => {
                if let Err(e) = output.ensure_success(&format!("{} --uninstall", INSTALLER_SCRIPT))
                {
                    ctx.notice(NoticeKind::Tolerated, e.to_string());
                }
            }
            None => ctx.notice(
                NoticeKind::Gap,
                format!("{} not found, removing NGHDL files only", INSTALLER_SCRIPT),
            ),
        }
    }
    let dir = ctx.layout.hdl_dir();
    remove_recorded(ctx, host, present, &dir, Scope::User, "NGHDL")
}

/// Empty the model directories NGHDL and Ngveri populate, keeping the directories.
pub fn clear_models(ctx: &mut RunContext, _host: &mut Host<'_>) -> Result<()> {
    for dir in ctx.layout.hdl_model_dirs() {
        let Ok(entries) = fs::read_dir(&dir) else {
            continue;
        };
        let mut removed = 0usize;
        for entry in entries {
            files::remove_local(&entry?.path())?;
            removed += 1;
        }
        if removed > 0 {
            ctx.notice(
                NoticeKind::Info,
                format!("Removed {} models from {}", removed, dir.display()),
            );
        }
    }
    Ok(())
}
