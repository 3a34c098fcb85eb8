//! Snapshot of what an earlier install left on the host.
//!
//! Taken once, after the operator confirms an uninstall and before anything is
//! removed. Every reversal step consults the snapshot instead of probing the
//! filesystem itself, so the editor's version (and with it the version-specific
//! config directory) is read while the package is still installed.

use std::path::PathBuf;

use tracing::debug;

use crate::components::editor;
use crate::context::{Host, RunContext};
use crate::system::apt;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstalledComponents {
    pub launcher: bool,
    pub system_desktop_entry: bool,
    pub user_desktop_entry: bool,
    pub pdk: bool,
    pub hdl: bool,
    /// Installed editor package version, if any.
    pub editor_package: Option<String>,
    pub editor_data: bool,
    pub editor_sources: Vec<PathBuf>,
    pub editor_config: bool,
    pub editor_config_dir: PathBuf,
    pub venv: bool,
    pub config_dir: bool,
}

impl InstalledComponents {
    pub fn detect(ctx: &RunContext, host: &mut Host<'_>) -> Self {
        let layout = &ctx.layout;
        let editor_package = match apt::installed_version(ctx, host, editor::PACKAGE) {
            Ok(version) => version,
            Err(e) => {
                debug!("could not query {}: {}", editor::PACKAGE, e);
                None
            }
        };
        let editor_config_dir =
            layout.editor_config_dir(&editor::config_version(editor_package.as_deref()));

        let snapshot = Self {
            launcher: layout.launcher_path.exists(),
            system_desktop_entry: layout.system_desktop_entry().exists(),
            user_desktop_entry: layout.user_desktop_entry().exists(),
            pdk: layout.pdk_dir().is_dir(),
            hdl: layout.hdl_dir().is_dir(),
            editor_package,
            editor_data: layout.editor_data_dir.is_dir(),
            editor_sources: apt::source_files_matching(layout, editor::SOURCE_FILE_PREFIX),
            editor_config: editor_config_dir.is_dir(),
            editor_config_dir,
            venv: layout.venv_dir.is_dir(),
            config_dir: layout.config_dir.is_dir(),
        };
        debug!("installed components: {:?}", snapshot);
        snapshot
    }

    /// Nothing from a previous install is present.
    pub fn is_empty(&self) -> bool {
        !(self.launcher
            || self.system_desktop_entry
            || self.user_desktop_entry
            || self.pdk
            || self.hdl
            || self.editor_package.is_some()
            || self.editor_data
            || !self.editor_sources.is_empty()
            || self.editor_config
            || self.venv
            || self.config_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{CommandOutput, CommandRunner, CommandSpec};
    use crate::error::Result;
    use crate::layout::{Escalation, InstallLayout, Owner};
    use crate::prompt::ScriptedPrompt;
    use std::fs;

    struct Dpkg(Option<&'static str>);

    impl CommandRunner for Dpkg {
        fn run(&mut self, _spec: &CommandSpec) -> Result<CommandOutput> {
            Ok(match self.0 {
                Some(version) => {
                    CommandOutput::succeeded(format!("install ok installed|{}", version))
                }
                None => CommandOutput::failed(1, "no packages found matching kicad"),
            })
        }
    }

    fn ctx(root: &std::path::Path) -> RunContext {
        RunContext::new(InstallLayout::rooted(
            root.join("eSim"),
            root.join("home"),
            &root.join("sys"),
            Owner::current(),
            Escalation::Direct,
        ))
    }

    #[test]
    fn test_fresh_host_is_empty() {
        let tmp = tempfile::tempdir().unwrap();
        let ctx = ctx(tmp.path());
        let mut runner = Dpkg(None);
        let mut prompt = ScriptedPrompt::default();
        let mut host = Host::new(&mut runner, &mut prompt);
        let snapshot = InstalledComponents::detect(&ctx, &mut host);
        assert!(snapshot.is_empty());
        assert_eq!(
            snapshot.editor_config_dir,
            ctx.layout.editor_config_dir(editor::DEFAULT_VERSION)
        );
    }

    #[test]
    fn test_editor_config_dir_follows_installed_version() {
        let tmp = tempfile::tempdir().unwrap();
        let ctx = ctx(tmp.path());
        fs::create_dir_all(ctx.layout.editor_config_dir("7.0")).unwrap();
        fs::create_dir_all(ctx.layout.venv_dir.clone()).unwrap();

        let mut runner = Dpkg(Some("7.0.10-1"));
        let mut prompt = ScriptedPrompt::default();
        let mut host = Host::new(&mut runner, &mut prompt);
        let snapshot = InstalledComponents::detect(&ctx, &mut host);

        assert_eq!(snapshot.editor_package.as_deref(), Some("7.0.10-1"));
        assert!(snapshot.editor_config);
        assert!(snapshot.venv);
        assert!(snapshot.config_dir);
        assert!(!snapshot.is_empty());
    }
}
