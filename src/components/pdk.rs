//! The SkyWater SKY130 process design kit.

use crate::components::{Scope, remove_recorded};
use crate::context::{Host, RunContext};
use crate::error::Result;
use crate::layout::InstallLayout;
use crate::system::archive::{ArchiveFormat, ComponentArchive};
use crate::system::files;

const EXTRACTED_DIR: &str = "sky130_fd_pr";

pub fn archive(layout: &InstallLayout) -> ComponentArchive {
    ComponentArchive::new(layout.pdk_archive(), EXTRACTED_DIR, ArchiveFormat::TarXz)
}

pub fn require_archive(ctx: &mut RunContext, _host: &mut Host<'_>) -> Result<()> {
    archive(&ctx.layout).require()
}

/// Extract the kit and move it into `/usr/share/local`, replacing any older copy.
pub fn install(ctx: &mut RunContext, host: &mut Host<'_>) -> Result<()> {
    let root = ctx.layout.install_root.clone();
    let extracted = archive(&ctx.layout).extract(ctx, host, &root)?;

    let target = ctx.layout.pdk_dir();
    files::remove_path(ctx, host, &target)?;
    files::ensure_dir(ctx, host, &ctx.layout.pdk_parent)?;
    files::move_path(ctx, host, &extracted, &target)?;
    files::chown_tree(ctx, host, &target)?;
    Ok(())
}

pub fn uninstall(ctx: &mut RunContext, host: &mut Host<'_>) -> Result<()> {
    let present = ctx.installed.as_ref().is_some_and(|s| s.pdk);
    let dir = ctx.layout.pdk_dir();
    remove_recorded(ctx, host, present, &dir, Scope::System, "SKY130 PDK")
}
