//! Privileged filesystem operations.
//!
//! System directories (`/usr/bin`, `/usr/share/...`) need root. Under
//! [`Escalation::Sudo`] each operation is one `sudo` command, authorised on its
//! own; under [`Escalation::Direct`] the same operation is done in-process.
//! Every operation is safe to retry.

use std::fs;
use std::io;
use std::os::unix::fs::{PermissionsExt, symlink};
use std::path::Path;

use nix::unistd::{Gid, Uid, chown};
use tracing::debug;
use walkdir::WalkDir;

use crate::context::{Host, RunContext};
use crate::error::{InstallerError, Result};
use crate::layout::{Escalation, Owner};

fn direct(ctx: &RunContext) -> bool {
    ctx.layout.escalation == Escalation::Direct
}

/// `mkdir -p`
pub fn ensure_dir(ctx: &RunContext, host: &mut Host<'_>, path: &Path) -> Result<()> {
    if direct(ctx) {
        fs::create_dir_all(path)?;
        return Ok(());
    }
    host.run_checked(&ctx.privileged("mkdir").arg("-p").path_arg(path))?;
    Ok(())
}

/// Copy everything inside `src` into `dst`, overwriting existing files.
pub fn copy_dir_contents(
    ctx: &RunContext,
    host: &mut Host<'_>,
    src: &Path,
    dst: &Path,
) -> Result<()> {
    if !direct(ctx) {
        // Trailing "/." copies the contents, dotfiles included
        host.run_checked(
            &ctx.privileged("cp")
                .arg("-r")
                .arg(format!("{}/.", src.display()))
                .path_arg(dst),
        )?;
        return Ok(());
    }

    copy_tree(src, dst)
}

/// Recursive in-process copy; symlinks are recreated, not followed.
fn copy_tree(src: &Path, dst: &Path) -> Result<()> {
    fs::create_dir_all(dst)?;
    for entry in WalkDir::new(src).min_depth(1) {
        let entry = entry.map_err(|e| InstallerError::filesystem(e.to_string()))?;
        let relative = entry
            .path()
            .strip_prefix(src)
            .map_err(|e| InstallerError::filesystem(e.to_string()))?;
        let target = dst.join(relative);
        let file_type = entry.file_type();
        if file_type.is_dir() {
            fs::create_dir_all(&target)?;
        } else if file_type.is_symlink() {
            remove_local(&target)?;
            symlink(fs::read_link(entry.path())?, &target)?;
        } else {
            fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}

/// Copy a single file into place with the given mode, creating parent directories.
pub fn install_file(
    ctx: &RunContext,
    host: &mut Host<'_>,
    src: &Path,
    dst: &Path,
    mode: u32,
) -> Result<()> {
    if !direct(ctx) {
        host.run_checked(
            &ctx.privileged("install")
                .args(["-D", "-m", &format!("{:o}", mode)])
                .path_arg(src)
                .path_arg(dst),
        )?;
        return Ok(());
    }

    if let Some(parent) = dst.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::copy(src, dst)?;
    fs::set_permissions(dst, fs::Permissions::from_mode(mode))?;
    Ok(())
}

/// `mv src dst`
pub fn move_path(ctx: &RunContext, host: &mut Host<'_>, src: &Path, dst: &Path) -> Result<()> {
    if direct(ctx) {
        return move_local(src, dst).map_err(|e| {
            InstallerError::filesystem(format!(
                "failed to move {} -> {}: {}",
                src.display(),
                dst.display(),
                e
            ))
        });
    }
    host.run_checked(&ctx.privileged("mv").path_arg(src).path_arg(dst))?;
    Ok(())
}

/// `rename`, or copy then delete when `src` and `dst` are on different filesystems.
fn move_local(src: &Path, dst: &Path) -> Result<()> {
    match fs::rename(src, dst) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::CrossesDevices => {
            debug!("{} and {} are on different devices, copying", src.display(), dst.display());
            if fs::symlink_metadata(src)?.is_dir() {
                copy_tree(src, dst)?;
            } else {
                fs::copy(src, dst)?;
            }
            remove_local(src)
        }
        Err(e) => Err(e.into()),
    }
}

/// `rm -rf path`; an absent path is not an error.
pub fn remove_path(ctx: &RunContext, host: &mut Host<'_>, path: &Path) -> Result<()> {
    if !direct(ctx) {
        host.run_checked(&ctx.privileged("rm").arg("-rf").path_arg(path))?;
        return Ok(());
    }
    remove_local(path)
}

/// Remove a user-owned path without escalation; an absent path is not an error.
pub fn remove_local(path: &Path) -> Result<()> {
    match fs::symlink_metadata(path) {
        Ok(meta) if meta.is_dir() => fs::remove_dir_all(path)?,
        Ok(_) => fs::remove_file(path)?,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(e.into()),
    }
    Ok(())
}

/// Hand a tree written with elevated privilege back to the invoking user.
pub fn chown_tree(ctx: &RunContext, host: &mut Host<'_>, path: &Path) -> Result<()> {
    let owner = &ctx.layout.owner;
    if !direct(ctx) {
        host.run_checked(
            &ctx.privileged("chown")
                .arg("-R")
                .arg(owner.chown_spec())
                .path_arg(path),
        )?;
        return Ok(());
    }

    chown_local(path, owner)
}

fn chown_local(path: &Path, owner: &Owner) -> Result<()> {
    let uid = Some(Uid::from_raw(owner.uid));
    let gid = Some(Gid::from_raw(owner.gid));
    for entry in WalkDir::new(path) {
        let entry = entry.map_err(|e| InstallerError::filesystem(e.to_string()))?;
        if entry.path_is_symlink() {
            continue;
        }
        chown(entry.path(), uid, gid).map_err(io::Error::from)?;
    }
    Ok(())
}

/// Give a user-scoped path written by this process back to the invoking user.
///
/// Only `Direct` runs write user files as root; under `Sudo` they are already
/// the user's own.
pub fn hand_back(ctx: &RunContext, path: &Path) -> Result<()> {
    if !direct(ctx) || fs::symlink_metadata(path).is_err() {
        return Ok(());
    }
    chown_local(path, &ctx.layout.owner)
}

/// `mkdir -p` for a user-scoped directory; every directory created is handed back.
pub fn create_user_dir(ctx: &RunContext, path: &Path) -> Result<()> {
    let topmost_missing = path
        .ancestors()
        .take_while(|dir| !dir.exists())
        .last()
        .map(Path::to_path_buf);
    fs::create_dir_all(path)?;
    match topmost_missing {
        Some(dir) => hand_back(ctx, &dir),
        None => Ok(()),
    }
}
