//! `~/.esim/config.ini`, read by the eSim front end.

use std::fs;
use std::path::Path;

use crate::components::{Scope, remove_recorded};
use crate::context::{Host, NoticeKind, RunContext};
use crate::error::Result;
use crate::layout::format_with_home;
use crate::system::files;

pub const SECTION: &str = "eSim";
const ROOT_KEY: &str = "eSim_HOME";

/// Keys written after the root, each relative to it.
const RELATIVE_ENTRIES: [(&str, &str); 5] = [
    ("LICENSE", "LICENSE"),
    ("KicadLib", "library/kicadLibrary.tar.xz"),
    ("IMAGES", "images"),
    ("VERSION", "VERSION"),
    ("MODELICA_MAP_JSON", "library/ngspicetoModelica/Mapping.json"),
];

/// Render the whole file. Paths use configparser interpolation so only the
/// root needs rewriting if the distribution moves.
pub fn render_config(install_root: &Path) -> String {
    let mut out = format!("[{}]\n{} = {}\n", SECTION, ROOT_KEY, install_root.display());
    for (key, relative) in RELATIVE_ENTRIES {
        out.push_str(&format!("{} = %({})s/{}\n", key, ROOT_KEY, relative));
    }
    out
}

/// Replace any existing config file with a freshly rendered one.
pub fn write_config(ctx: &mut RunContext, _host: &mut Host<'_>) -> Result<()> {
    let layout = &ctx.layout;
    files::create_user_dir(ctx, &layout.config_dir)?;
    if layout.config_file.exists() {
        fs::remove_file(&layout.config_file)?;
    }
    fs::write(&layout.config_file, render_config(&layout.install_root))?;
    files::hand_back(ctx, &layout.config_file)?;

    let shown = format_with_home(&layout.config_file, &layout.home);
    ctx.notice(NoticeKind::Info, format!("Config file written to {}", shown));
    Ok(())
}

/// Remove `~/.esim` with everything left in it.
pub fn remove_config_dir(ctx: &mut RunContext, host: &mut Host<'_>) -> Result<()> {
    let present = ctx.installed.as_ref().is_some_and(|s| s.config_dir);
    let dir = ctx.layout.config_dir.clone();
    remove_recorded(ctx, host, present, &dir, Scope::User, "eSim config directory")
}
