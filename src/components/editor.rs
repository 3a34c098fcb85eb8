//! KiCad, the schematic editor eSim drives.

use crate::components::{Scope, remove_recorded};
use crate::context::{Host, NoticeKind, RunContext};
use crate::error::Result;
use crate::layout::format_with_home;
use crate::system::apt;

pub const PACKAGE: &str = "kicad";

pub const PACKAGES: [&str; 5] = [
    "kicad",
    "kicad-footprints",
    "kicad-libraries",
    "kicad-symbols",
    "kicad-templates",
];

pub const REPOSITORY: &str = "ppa:kicad/kicad-6.0-releases";
const REPOSITORY_SOURCE: &str = "kicad/kicad-6.0-releases";

/// Prefix of the source files `add-apt-repository` writes for the PPA.
pub const SOURCE_FILE_PREFIX: &str = "kicad";

/// Used when the installed version cannot be determined.
pub const DEFAULT_VERSION: &str = "6.0";

pub const CONFIG_DIR_VAR: &str = "KICAD_CONFIG_DIR";

/// Major version as KiCad names its config directory: `1:7.0.10-1` -> `7.0`.
pub fn parse_major_version(version: &str) -> Option<String> {
    let version = version.trim();
    let upstream = match version.split_once(':') {
        Some((epoch, rest)) if epoch.chars().all(|c| c.is_ascii_digit()) => rest,
        _ => version,
    };
    let major: String = upstream.chars().take_while(char::is_ascii_digit).collect();
    if major.is_empty() {
        return None;
    }
    let major: u32 = major.parse().ok()?;
    Some(format!("{}.0", major))
}

/// Config directory version for a package version, falling back to the default.
pub fn config_version(package_version: Option<&str>) -> String {
    package_version
        .and_then(parse_major_version)
        .unwrap_or_else(|| DEFAULT_VERSION.to_string())
}

/// Add the KiCad PPA unless a source already points at it.
pub fn ensure_repository(ctx: &mut RunContext, host: &mut Host<'_>) -> Result<()> {
    if apt::sources_mention(&ctx.layout, REPOSITORY_SOURCE) {
        ctx.notice(NoticeKind::Info, "KiCad repository already configured");
        return Ok(());
    }
    apt::add_repository(ctx, host, REPOSITORY)?;
    apt::refresh_index(ctx, host)?;
    Ok(())
}

pub fn install_packages(ctx: &mut RunContext, host: &mut Host<'_>) -> Result<()> {
    apt::install_without_recommends(ctx, host, &PACKAGES)
}

/// Work out which `~/.config/kicad/<version>` later steps should use.
pub fn detect_version(ctx: &mut RunContext, host: &mut Host<'_>) -> Result<()> {
    let installed = apt::installed_version(ctx, host, PACKAGE)?;
    let version = config_version(installed.as_deref());
    let config_dir = ctx.layout.editor_config_dir(&version);

    ctx.env.set(CONFIG_DIR_VAR, config_dir.display().to_string());
    let shown = format_with_home(&config_dir, &ctx.layout.home);
    ctx.notice(
        NoticeKind::Info,
        format!("KiCad {} detected, config directory {}", version, shown),
    );
    ctx.config.editor_version = Some(version);
    ctx.config.editor_config_dir = Some(config_dir);
    Ok(())
}

pub fn purge_packages(ctx: &mut RunContext, host: &mut Host<'_>) -> Result<()> {
    let installed = ctx
        .installed
        .as_ref()
        .and_then(|s| s.editor_package.clone());
    match installed {
        Some(version) => {
            apt::purge(ctx, host, &PACKAGES)?;
            ctx.notice(NoticeKind::Info, format!("Purged KiCad {}", version));
        }
        None => ctx.notice(NoticeKind::Gap, "KiCad package not installed"),
    }
    Ok(())
}

pub fn remove_data_dir(ctx: &mut RunContext, host: &mut Host<'_>) -> Result<()> {
    let present = ctx.installed.as_ref().is_some_and(|s| s.editor_data);
    let dir = ctx.layout.editor_data_dir.clone();
    remove_recorded(ctx, host, present, &dir, Scope::System, "KiCad data directory")
}

pub fn remove_sources(ctx: &mut RunContext, host: &mut Host<'_>) -> Result<()> {
    let sources = ctx
        .installed
        .as_ref()
        .map(|s| s.editor_sources.clone())
        .unwrap_or_default();
    if sources.is_empty() {
        ctx.notice(NoticeKind::Gap, "No KiCad package sources configured");
        return Ok(());
    }
    for source in &sources {
        remove_recorded(ctx, host, true, source, Scope::System, "KiCad package source")?;
    }
    Ok(())
}

pub fn remove_config_dir(ctx: &mut RunContext, host: &mut Host<'_>) -> Result<()> {
    let (present, dir) = match ctx.installed.as_ref() {
        Some(snapshot) => (snapshot.editor_config, snapshot.editor_config_dir.clone()),
        None => (false, ctx.layout.editor_config_dir(DEFAULT_VERSION)),
    };
    remove_recorded(ctx, host, present, &dir, Scope::User, "KiCad config directory")
}
