//! Debian package manager operations (apt-get / dpkg-query).

use std::fs;
use std::path::PathBuf;

use tracing::debug;

use crate::command::CommandOutput;
use crate::context::{Host, RunContext};
use crate::error::Result;
use crate::layout::InstallLayout;

/// `apt-get update`. The caller decides whether failure matters.
pub fn refresh_index(ctx: &RunContext, host: &mut Host<'_>) -> Result<CommandOutput> {
    host.run_checked(&ctx.privileged("apt-get").arg("update"))
}

pub fn install(ctx: &RunContext, host: &mut Host<'_>, packages: &[&str]) -> Result<()> {
    host.run_checked(
        &ctx.privileged("apt-get")
            .args(["install", "-y"])
            .args(packages.iter().copied()),
    )?;
    Ok(())
}

pub fn install_without_recommends(
    ctx: &RunContext,
    host: &mut Host<'_>,
    packages: &[&str],
) -> Result<()> {
    host.run_checked(
        &ctx.privileged("apt-get")
            .args(["install", "-y", "--no-install-recommends"])
            .args(packages.iter().copied()),
    )?;
    Ok(())
}

pub fn purge(ctx: &RunContext, host: &mut Host<'_>, packages: &[&str]) -> Result<()> {
    host.run_checked(
        &ctx.privileged("apt-get")
            .args(["purge", "-y"])
            .args(packages.iter().copied()),
    )?;
    Ok(())
}

/// Installed version of a package, or `None` when it is not installed.
pub fn installed_version(
    ctx: &RunContext,
    host: &mut Host<'_>,
    package: &str,
) -> Result<Option<String>> {
    let output = host.run(
        &ctx.command("dpkg-query")
            .args(["-W", "-f=${Status}|${Version}", package])
            .captured(),
    )?;
    if !output.success {
        debug!("dpkg-query reports {} unknown", package);
        return Ok(None);
    }
    Ok(parse_status_line(&output.stdout))
}

/// Parse `<status>|<version>`; only `... installed` counts.
pub fn parse_status_line(line: &str) -> Option<String> {
    let (status, version) = line.trim().split_once('|')?;
    let version = version.trim();
    if status.trim().ends_with(" installed") && !version.is_empty() {
        Some(version.to_string())
    } else {
        None
    }
}

/// Every apt source file: `sources.list` plus `sources.list.d/*`.
fn source_files(layout: &InstallLayout) -> Vec<PathBuf> {
    let mut files = vec![layout.apt_sources_list()];
    if let Ok(entries) = fs::read_dir(layout.apt_sources_dir()) {
        let mut extra: Vec<PathBuf> = entries
            .flatten()
            .map(|entry| entry.path())
            .filter(|path| path.is_file())
            .collect();
        extra.sort();
        files.extend(extra);
    }
    files
}

/// True when any apt source file mentions `needle`.
pub fn sources_mention(layout: &InstallLayout, needle: &str) -> bool {
    source_files(layout)
        .iter()
        .filter_map(|path| fs::read_to_string(path).ok())
        .any(|content| {
            content
                .lines()
                .map(str::trim)
                .filter(|line| !line.starts_with('#'))
                .any(|line| line.contains(needle))
        })
}

/// Files in `sources.list.d` whose name starts with `prefix`.
pub fn source_files_matching(layout: &InstallLayout, prefix: &str) -> Vec<PathBuf> {
    let Ok(entries) = fs::read_dir(layout.apt_sources_dir()) else {
        return Vec::new();
    };
    let mut matches: Vec<PathBuf> = entries
        .flatten()
        .filter(|entry| entry.file_name().to_string_lossy().starts_with(prefix))
        .map(|entry| entry.path())
        .collect();
    matches.sort();
    matches
}

/// `add-apt-repository -y <repo>`
pub fn add_repository(ctx: &RunContext, host: &mut Host<'_>, repository: &str) -> Result<()> {
    host.run_checked(&ctx.privileged("add-apt-repository").args(["-y", repository]))?;
    Ok(())
}
