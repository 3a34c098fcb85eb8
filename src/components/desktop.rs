//! Launcher command, desktop entry and icon.

use std::fs;
use std::io::Write;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;

use tempfile::NamedTempFile;

use crate::components::{Scope, remove_recorded};
use crate::context::{Host, NoticeKind, RunContext};
use crate::error::{InstallerError, Result};
use crate::layout::{InstallLayout, format_with_home};
use crate::system::files;

const LAUNCHER_MODE: u32 = 0o755;
const SYSTEM_ENTRY_MODE: u32 = 0o644;
const USER_ENTRY_MODE: u32 = 0o755;

const MIME_TYPES: &str = "text/x-spice;application/x-kicad-project;application/x-kicad-schematic;";

/// Characters that force quoting of an `Exec=` argument.
const EXEC_RESERVED: &[char] = &[
    ' ', '\t', '\n', '"', '\'', '\\', '>', '<', '~', '|', '&', ';', '$', '*', '?', '#', '(',
    ')', '`',
];

/// Double-quote `path` for bash, escaping what stays special inside quotes.
fn shell_quote(path: &Path) -> String {
    let mut out = String::from("\"");
    for c in path.display().to_string().chars() {
        if matches!(c, '"' | '\\' | '$' | '`') {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('"');
    out
}

/// Quote an `Exec=` argument the freedesktop way, then escape it again as a
/// string value.
fn exec_quote(path: &Path) -> String {
    let raw = path.display().to_string().replace('%', "%%");
    if !raw.contains(EXEC_RESERVED) {
        return raw;
    }
    let mut quoted = String::from("\"");
    for c in raw.chars() {
        if matches!(c, '"' | '`' | '$' | '\\') {
            quoted.push('\\');
        }
        quoted.push(c);
    }
    quoted.push('"');
    quoted.replace('\\', "\\\\")
}

/// Shell script installed as `/usr/bin/esim`.
pub fn render_launcher(layout: &InstallLayout) -> String {
    format!(
        "#!/bin/bash\ncd {}\nsource {}\npython3 Application.py\n",
        shell_quote(&layout.frontend_dir()),
        shell_quote(&layout.venv_dir.join("bin").join("activate"))
    )
}

pub fn render_desktop_entry(layout: &InstallLayout) -> String {
    let lines = [
        "[Desktop Entry]".to_string(),
        "Version=1.0".to_string(),
        "Name=eSim".to_string(),
        "Comment=EDA Tool".to_string(),
        "GenericName=eSim".to_string(),
        "Keywords=eda-tools".to_string(),
        format!("Exec={} %u", exec_quote(&layout.launcher_path)),
        format!("Path={}", layout.frontend_dir().display()),
        "Terminal=false".to_string(),
        "X-MultipleArgs=false".to_string(),
        "Type=Application".to_string(),
        format!("Icon={}", layout.icon_path.display()),
        "Categories=Development;".to_string(),
        format!("MimeType={}", MIME_TYPES),
        "StartupNotify=true".to_string(),
    ];
    let mut out = lines.join("\n");
    out.push('\n');
    out
}

fn stage(content: &str) -> Result<NamedTempFile> {
    let mut staged = NamedTempFile::new()?;
    staged.write_all(content.as_bytes())?;
    staged.flush()?;
    Ok(staged)
}

fn write_user_file(ctx: &RunContext, path: &Path, content: &str, mode: u32) -> Result<()> {
    if let Some(parent) = path.parent() {
        files::create_user_dir(ctx, parent)?;
    }
    fs::write(path, content)?;
    fs::set_permissions(path, fs::Permissions::from_mode(mode))?;
    files::hand_back(ctx, path)
}

pub fn install_launcher(ctx: &mut RunContext, host: &mut Host<'_>) -> Result<()> {
    let staged = stage(&render_launcher(&ctx.layout))?;
    files::install_file(ctx, host, staged.path(), &ctx.layout.launcher_path, LAUNCHER_MODE)?;
    let shown = ctx.layout.launcher_path.display().to_string();
    ctx.notice(NoticeKind::Info, format!("Launcher installed at {}", shown));
    Ok(())
}

/// Install the entry system-wide and as a launchable copy on the user's desktop.
pub fn install_desktop_entry(ctx: &mut RunContext, host: &mut Host<'_>) -> Result<()> {
    let entry = render_desktop_entry(&ctx.layout);
    let staged = stage(&entry)?;
    let system_entry = ctx.layout.system_desktop_entry();
    files::install_file(ctx, host, staged.path(), &system_entry, SYSTEM_ENTRY_MODE)?;

    let user_entry = ctx.layout.user_desktop_entry();
    write_user_file(ctx, &user_entry, &entry, USER_ENTRY_MODE)?;
    let shown = format_with_home(&user_entry, &ctx.layout.home);
    ctx.notice(NoticeKind::Info, format!("Desktop entry installed at {}", shown));
    Ok(())
}

/// Mark the desktop copy trusted so the shell launches it without asking.
pub fn trust_desktop_entry(ctx: &mut RunContext, host: &mut Host<'_>) -> Result<()> {
    let spec = ctx
        .command("gio")
        .arg("set")
        .path_arg(&ctx.layout.user_desktop_entry())
        .args(["metadata::trusted", "true"])
        .captured();
    match host.run(&spec) {
        Ok(output) => output.ensure_success(&spec.label()),
        Err(e) if e.is_program_missing() => {
            ctx.notice(NoticeKind::Info, "Desktop icon trust unavailable (gio not found)");
            Ok(())
        }
        Err(e) => Err(e),
    }
}

pub fn install_icon(ctx: &mut RunContext, _host: &mut Host<'_>) -> Result<()> {
    let icon = ctx.layout.bundled_icon();
    if !icon.is_file() {
        return Err(InstallerError::filesystem(format!(
            "icon not found at {}",
            icon.display()
        )));
    }
    files::create_user_dir(ctx, &ctx.layout.config_dir)?;
    fs::copy(&icon, &ctx.layout.icon_path)?;
    files::hand_back(ctx, &ctx.layout.icon_path)
}

pub fn remove_launcher(ctx: &mut RunContext, host: &mut Host<'_>) -> Result<()> {
    let present = ctx.installed.as_ref().is_some_and(|s| s.launcher);
    let path = ctx.layout.launcher_path.clone();
    remove_recorded(ctx, host, present, &path, Scope::System, "launcher")
}

pub fn remove_desktop_entries(ctx: &mut RunContext, host: &mut Host<'_>) -> Result<()> {
    let (system, user) = ctx
        .installed
        .as_ref()
        .map_or((false, false), |s| (s.system_desktop_entry, s.user_desktop_entry));
    let system_entry = ctx.layout.system_desktop_entry();
    remove_recorded(ctx, host, system, &system_entry, Scope::System, "desktop entry")?;
    let user_entry = ctx.layout.user_desktop_entry();
    remove_recorded(ctx, host, user, &user_entry, Scope::User, "desktop shortcut")
}
