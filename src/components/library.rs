//! eSim's custom KiCad symbol library.

use std::fs;
use std::path::PathBuf;

use crate::components::editor;
use crate::context::{Host, NoticeKind, RunContext};
use crate::error::{InstallerError, Result};
use crate::layout::{InstallLayout, format_with_home};
use crate::system::archive::{ArchiveFormat, ComponentArchive};
use crate::system::files;

const EXTRACTED_DIR: &str = "kicadLibrary";
const SYMBOL_TABLE: &str = "template/sym-lib-table";
const SYMBOLS_DIR: &str = "eSim-symbols";

pub fn archive(layout: &InstallLayout) -> ComponentArchive {
    ComponentArchive::new(layout.library_archive(), EXTRACTED_DIR, ArchiveFormat::TarXz)
}

fn extracted(ctx: &RunContext) -> PathBuf {
    archive(&ctx.layout).extracted_path(&ctx.layout.install_root)
}

/// Config directory chosen by editor detection, or the default version's.
fn editor_config_dir(ctx: &RunContext) -> PathBuf {
    ctx.config
        .editor_config_dir
        .clone()
        .unwrap_or_else(|| ctx.layout.editor_config_dir(editor::DEFAULT_VERSION))
}

pub fn require_archive(ctx: &mut RunContext, _host: &mut Host<'_>) -> Result<()> {
    archive(&ctx.layout).require()
}

pub fn extract(ctx: &mut RunContext, host: &mut Host<'_>) -> Result<()> {
    let root = ctx.layout.install_root.clone();
    archive(&ctx.layout).extract(ctx, host, &root)?;
    Ok(())
}

/// Copy the symbol table that registers eSim's libraries with KiCad.
pub fn install_symbol_table(ctx: &mut RunContext, _host: &mut Host<'_>) -> Result<()> {
    let config_dir = editor_config_dir(ctx);
    if config_dir.is_dir() {
        ctx.notice(NoticeKind::Info, "KiCad config directory already exists");
    } else {
        files::create_user_dir(ctx, &config_dir)?;
    }

    let table = extracted(ctx).join(SYMBOL_TABLE);
    if !table.is_file() {
        return Err(InstallerError::filesystem(format!(
            "{} is missing from the library archive",
            SYMBOL_TABLE
        )));
    }
    let installed_table = config_dir.join("sym-lib-table");
    fs::copy(&table, &installed_table)?;
    files::hand_back(ctx, &installed_table)?;

    let shown = format_with_home(&config_dir, &ctx.layout.home);
    ctx.notice(NoticeKind::Info, format!("Symbol table copied to {}", shown));
    Ok(())
}

/// Copy eSim's symbols into KiCad's system symbol directory, if the archive has any.
pub fn install_symbols(ctx: &mut RunContext, host: &mut Host<'_>) -> Result<()> {
    let symbols = extracted(ctx).join(SYMBOLS_DIR);
    if !symbols.is_dir() {
        ctx.notice(NoticeKind::Info, "Library archive has no eSim symbols");
        return Ok(());
    }
    let target = ctx.layout.editor_symbols_dir.clone();
    files::ensure_dir(ctx, host, &target)?;
    files::copy_dir_contents(ctx, host, &symbols, &target)?;
    files::chown_tree(ctx, host, &target)?;
    Ok(())
}

/// Drop the extracted working copy.
pub fn cleanup(ctx: &mut RunContext, _host: &mut Host<'_>) -> Result<()> {
    files::remove_local(&extracted(ctx))
}
