//! The installable pieces of the eSim suite.
//!
//! Each module exposes plain step functions `fn(&mut RunContext, &mut Host) -> Result<()>`
//! for install and, where the piece leaves anything behind, for uninstall.
//! The order they run in and how their failures are treated live in
//! [`crate::plan`].

pub mod config_writer;
pub mod dependencies;
pub mod desktop;
pub mod editor;
pub mod hdl;
pub mod library;
pub mod pdk;
pub mod proxy;

use std::path::Path;

use crate::context::{Host, NoticeKind, RunContext};
use crate::error::Result;
use crate::layout::format_with_home;
use crate::system::files;

/// Where a removable artifact lives, which decides whether removal escalates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    User,
    System,
}

/// Remove `path` if the uninstall snapshot saw it, otherwise report the gap.
pub(crate) fn remove_recorded(
    ctx: &mut RunContext,
    host: &mut Host<'_>,
    present: bool,
    path: &Path,
    scope: Scope,
    what: &str,
) -> Result<()> {
    let shown = format_with_home(path, &ctx.layout.home);
    if !present {
        ctx.notice(NoticeKind::Gap, format!("{} not found at {}", what, shown));
        return Ok(());
    }
    match scope {
        Scope::User => files::remove_local(path)?,
        Scope::System => files::remove_path(ctx, host, path)?,
    }
    ctx.notice(NoticeKind::Info, format!("Removed {} ({})", what, shown));
    Ok(())
}
