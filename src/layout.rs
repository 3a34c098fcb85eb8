//! Filesystem layout of an eSim installation.
//!
//! All paths a run touches are fixed when the run starts and live here. The
//! install root is the unpacked eSim distribution the installer is run from;
//! user-scoped paths hang off `$HOME`; system paths are absolute unless the
//! layout was built with [`InstallLayout::rooted`].

use std::env;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use nix::unistd::{Gid, Uid, User};

/// Name of the launcher command and of the desktop entry file.
pub const LAUNCHER_NAME: &str = "esim";
pub const DESKTOP_ENTRY_NAME: &str = "esim.desktop";
pub const CONFIG_FILE_NAME: &str = "config.ini";

/// How privileged filesystem operations are carried out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Escalation {
    /// Each privileged action is its own `sudo` command.
    Sudo,
    /// Already privileged (or operating on an unprivileged staging tree).
    Direct,
}

impl Escalation {
    pub fn detect() -> Self {
        if nix::unistd::geteuid().is_root() {
            Self::Direct
        } else {
            Self::Sudo
        }
    }

    pub fn escalates(self) -> bool {
        self == Self::Sudo
    }
}

/// The user files should belong to after a privileged copy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Owner {
    pub name: String,
    pub uid: u32,
    pub gid: u32,
}

impl Owner {
    /// The user who invoked the installer, looking through `sudo`.
    pub fn invoking() -> Self {
        let name = env::var("SUDO_USER")
            .ok()
            .or_else(|| env::var("USER").ok())
            .filter(|name| !name.is_empty());

        if let Some(name) = name {
            if let Ok(Some(user)) = User::from_name(&name) {
                return Self {
                    name,
                    uid: user.uid.as_raw(),
                    gid: user.gid.as_raw(),
                };
            }
        }
        Self::current()
    }

    pub fn current() -> Self {
        let uid = Uid::current();
        let name = User::from_uid(uid)
            .ok()
            .flatten()
            .map(|user| user.name)
            .unwrap_or_else(|| uid.to_string());
        Self {
            name,
            uid: uid.as_raw(),
            gid: Gid::current().as_raw(),
        }
    }

    /// The owner's home directory from the password database.
    pub fn home_dir(&self) -> Option<PathBuf> {
        User::from_uid(Uid::from_raw(self.uid))
            .ok()
            .flatten()
            .map(|user| user.dir)
    }

    /// `user:group` argument for `chown`.
    pub fn chown_spec(&self) -> String {
        format!("{}:{}", self.name, self.name)
    }
}

#[derive(Debug, Clone)]
pub struct InstallLayout {
    pub install_root: PathBuf,
    pub home: PathBuf,
    pub config_dir: PathBuf,
    pub config_file: PathBuf,
    pub venv_dir: PathBuf,
    pub icon_path: PathBuf,
    pub editor_config_root: PathBuf,
    pub desktop_dir: PathBuf,
    pub launcher_path: PathBuf,
    pub applications_dir: PathBuf,
    pub editor_data_dir: PathBuf,
    pub editor_symbols_dir: PathBuf,
    pub pdk_parent: PathBuf,
    pub apt_config_dir: PathBuf,
    pub owner: Owner,
    pub escalation: Escalation,
}

impl InstallLayout {
    /// Layout for the real host: install root from `ESIM_INSTALL_ROOT` or the
    /// current directory, home from `HOME`.
    pub fn discover() -> Result<Self> {
        let install_root = match env::var("ESIM_INSTALL_ROOT") {
            Ok(root) if !root.is_empty() => PathBuf::from(root),
            _ => env::current_dir().context("failed to read current directory")?,
        };
        let install_root = std::path::absolute(&install_root).with_context(|| {
            format!("failed to resolve install root {}", install_root.display())
        })?;
        if !install_root.is_dir() {
            return Err(anyhow!(
                "install root {} is not a directory",
                install_root.display()
            ));
        }

        let owner = Owner::invoking();
        let escalation = Escalation::detect();
        let on_behalf = escalation == Escalation::Direct && owner.uid != Uid::effective().as_raw();
        let owner_home = if on_behalf { owner.home_dir() } else { None };
        let home = resolve_home(env::var_os("HOME").map(PathBuf::from), owner_home)
            .ok_or_else(|| anyhow!("HOME is not set"))?;

        Ok(Self::rooted(install_root, home, Path::new("/"), owner, escalation))
    }

    /// Layout with every system path rebased under `system_root`.
    pub fn rooted(
        install_root: impl Into<PathBuf>,
        home: impl Into<PathBuf>,
        system_root: &Path,
        owner: Owner,
        escalation: Escalation,
    ) -> Self {
        let install_root = install_root.into();
        let home = home.into();
        let config_dir = home.join(".esim");
        let editor_data_dir = system_root.join("usr/share/kicad");

        Self {
            config_file: config_dir.join(CONFIG_FILE_NAME),
            venv_dir: config_dir.join("env"),
            icon_path: config_dir.join("logo.png"),
            editor_config_root: home.join(".config").join("kicad"),
            desktop_dir: home.join("Desktop"),
            launcher_path: system_root.join("usr/bin").join(LAUNCHER_NAME),
            applications_dir: system_root.join("usr/share/applications"),
            editor_symbols_dir: editor_data_dir.join("symbols"),
            editor_data_dir,
            pdk_parent: system_root.join("usr/share/local"),
            apt_config_dir: system_root.join("etc/apt"),
            config_dir,
            install_root,
            home,
            owner,
            escalation,
        }
    }

    pub fn library_archive(&self) -> PathBuf {
        self.install_root.join("library").join("kicadLibrary.tar.xz")
    }

    pub fn pdk_archive(&self) -> PathBuf {
        self.install_root.join("library").join("sky130_fd_pr.tar.xz")
    }

    pub fn hdl_bundle(&self) -> PathBuf {
        self.install_root.join("nghdl.zip")
    }

    pub fn hdl_dir(&self) -> PathBuf {
        self.install_root.join("nghdl")
    }

    pub fn hdl_model_dirs(&self) -> [PathBuf; 2] {
        let base = self.install_root.join("library").join("modelParamXML");
        [base.join("Nghdl"), base.join("Ngveri")]
    }

    pub fn pdk_dir(&self) -> PathBuf {
        self.pdk_parent.join("sky130_fd_pr")
    }

    pub fn bundled_icon(&self) -> PathBuf {
        self.install_root.join("images").join("logo.png")
    }

    pub fn frontend_dir(&self) -> PathBuf {
        self.install_root.join("src").join("frontEnd")
    }

    pub fn system_desktop_entry(&self) -> PathBuf {
        self.applications_dir.join(DESKTOP_ENTRY_NAME)
    }

    pub fn user_desktop_entry(&self) -> PathBuf {
        self.desktop_dir.join(DESKTOP_ENTRY_NAME)
    }

    pub fn apt_sources_list(&self) -> PathBuf {
        self.apt_config_dir.join("sources.list")
    }

    pub fn apt_sources_dir(&self) -> PathBuf {
        self.apt_config_dir.join("sources.list.d")
    }

    /// Version-specific editor configuration directory, e.g. `~/.config/kicad/6.0`.
    pub fn editor_config_dir(&self, version: &str) -> PathBuf {
        self.editor_config_root.join(version)
    }
}

/// Home for user-scoped files. A root run on behalf of another user
/// (`sudo esim-installer`) writes into that user's home, not root's.
pub fn resolve_home(env_home: Option<PathBuf>, owner_home: Option<PathBuf>) -> Option<PathBuf> {
    owner_home
        .or(env_home)
        .filter(|home| !home.as_os_str().is_empty())
}

/// Render a path with `$HOME` in place of the home directory.
pub fn format_with_home(path: &Path, home: &Path) -> String {
    if let Ok(stripped) = path.strip_prefix(home) {
        let mut rendered = PathBuf::from("$HOME");
        rendered.push(stripped);
        return rendered.display().to_string();
    }
    path.display().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout() -> InstallLayout {
        InstallLayout::rooted(
            "/opt/eSim",
            "/home/ada",
            Path::new("/"),
            Owner {
                name: "ada".into(),
                uid: 1000,
                gid: 1000,
            },
            Escalation::Sudo,
        )
    }

    #[test]
    fn test_user_paths_hang_off_home() {
        let layout = layout();
        assert_eq!(layout.config_dir, PathBuf::from("/home/ada/.esim"));
        assert_eq!(layout.config_file, PathBuf::from("/home/ada/.esim/config.ini"));
        assert_eq!(layout.venv_dir, PathBuf::from("/home/ada/.esim/env"));
        assert_eq!(
            layout.editor_config_dir("6.0"),
            PathBuf::from("/home/ada/.config/kicad/6.0")
        );
    }

    #[test]
    fn test_system_paths_are_absolute_for_real_root() {
        let layout = layout();
        assert_eq!(layout.launcher_path, PathBuf::from("/usr/bin/esim"));
        assert_eq!(
            layout.system_desktop_entry(),
            PathBuf::from("/usr/share/applications/esim.desktop")
        );
        assert_eq!(layout.pdk_dir(), PathBuf::from("/usr/share/local/sky130_fd_pr"));
        assert_eq!(layout.editor_symbols_dir, PathBuf::from("/usr/share/kicad/symbols"));
    }

    #[test]
    fn test_rooted_rebases_system_paths() {
        let layout = InstallLayout::rooted(
            "/tmp/root",
            "/tmp/home",
            Path::new("/tmp/sys"),
            Owner::current(),
            Escalation::Direct,
        );
        assert_eq!(layout.launcher_path, PathBuf::from("/tmp/sys/usr/bin/esim"));
        assert_eq!(layout.apt_sources_dir(), PathBuf::from("/tmp/sys/etc/apt/sources.list.d"));
    }

    #[test]
    fn test_bundled_artifacts_live_under_install_root() {
        let layout = layout();
        assert_eq!(
            layout.library_archive(),
            PathBuf::from("/opt/eSim/library/kicadLibrary.tar.xz")
        );
        assert_eq!(layout.hdl_bundle(), PathBuf::from("/opt/eSim/nghdl.zip"));
    }

    #[test]
    fn test_format_with_home() {
        let home = Path::new("/home/ada");
        assert_eq!(
            format_with_home(Path::new("/home/ada/Desktop/esim.desktop"), home),
            "$HOME/Desktop/esim.desktop"
        );
        assert_eq!(format_with_home(Path::new("/usr/bin/esim"), home), "/usr/bin/esim");
    }

    #[test]
    fn test_chown_spec_uses_user_group() {
        assert_eq!(layout().owner.chown_spec(), "ada:ada");
    }

    #[test]
    fn test_resolve_home_prefers_invoking_users_home() {
        assert_eq!(
            resolve_home(Some("/root".into()), Some("/home/ada".into())),
            Some(PathBuf::from("/home/ada"))
        );
        assert_eq!(
            resolve_home(Some("/home/ada".into()), None),
            Some(PathBuf::from("/home/ada"))
        );
        assert_eq!(resolve_home(Some(PathBuf::new()), None), None);
        assert_eq!(resolve_home(None, None), None);
    }
}
