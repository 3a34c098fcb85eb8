//! Shared fixtures for the pipeline tests
//!
//! `FakeRunner` stands in for the host: it records every command and
//! simulates the few whose side effects later steps depend on (archive
//! extraction, venv creation, package queries). `Fixture` is a throwaway
//! install root, home and system root under one temp directory.

#![allow(dead_code)]

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use esim_installer::{
    CommandOutput, CommandRunner, CommandSpec, Escalation, InstallLayout, InstallerError, Owner,
    Result,
};
use tempfile::TempDir;

pub const EDITOR_VERSION: &str = "6.0.11+dfsg-1~ubuntu22.04.1";

pub struct FakeRunner {
    pub specs: Vec<CommandSpec>,
    fail_patterns: Vec<String>,
    missing_programs: Vec<String>,
    editor_version: Option<String>,
    probe_succeeds: bool,
    library_has_symbols: bool,
}

impl Default for FakeRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeRunner {
    pub fn new() -> Self {
        Self {
            specs: Vec::new(),
            fail_patterns: Vec::new(),
            missing_programs: Vec::new(),
            editor_version: Some(EDITOR_VERSION.to_string()),
            probe_succeeds: true,
            library_has_symbols: true,
        }
    }

    /// Commands whose label contains `pattern` exit with status 100.
    pub fn fail_on(mut self, pattern: &str) -> Self {
        self.fail_patterns.push(pattern.to_string());
        self
    }

    /// `program` cannot be launched at all.
    pub fn missing(mut self, program: &str) -> Self {
        self.missing_programs.push(program.to_string());
        self
    }

    pub fn editor_version(mut self, version: Option<&str>) -> Self {
        self.editor_version = version.map(str::to_string);
        self
    }

    pub fn probe_fails(mut self) -> Self {
        self.probe_succeeds = false;
        self
    }

    /// The library archive unpacks without an `eSim-symbols/` directory.
    pub fn library_without_symbols(mut self) -> Self {
        self.library_has_symbols = false;
        self
    }

    pub fn labels(&self) -> Vec<String> {
        self.specs.iter().map(CommandSpec::label).collect()
    }

    pub fn ran(&self, needle: &str) -> bool {
        self.specs.iter().any(|spec| spec.label().contains(needle))
    }

    pub fn position(&self, needle: &str) -> Option<usize> {
        self.specs.iter().position(|spec| spec.label().contains(needle))
    }

    fn simulate(&mut self, spec: &CommandSpec) -> io::Result<CommandOutput> {
        let program = Path::new(&spec.program)
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or_default()
            .to_string();
        let args: Vec<&str> = spec.args.iter().map(String::as_str).collect();

        let output = match (program.as_str(), args.as_slice()) {
            ("tar", ["-xJf", archive]) => {
                let cwd = spec.cwd.clone().expect("tar runs in the install root");
                fake_tar(Path::new(archive), &cwd, self.library_has_symbols)?;
                CommandOutput::succeeded("")
            }
            ("unzip", ["-o", _bundle, "-d", dest]) => {
                let dir = Path::new(dest).join("nghdl");
                fs::create_dir_all(&dir)?;
                fs::write(dir.join("install-nghdl.sh"), "#!/bin/bash\nexit 0\n")?;
                CommandOutput::succeeded("")
            }
            ("virtualenv", [path]) => {
                fs::create_dir_all(Path::new(path).join("bin"))?;
                CommandOutput::succeeded("")
            }
            ("dpkg-query", _) => match &self.editor_version {
                Some(version) => CommandOutput::succeeded(format!("install ok installed|{}", version)),
                None => CommandOutput::failed(1, "dpkg-query: no packages found matching kicad"),
            },
            ("python3", ["--version"]) => CommandOutput::succeeded("Python 3.10.12\n"),
            ("python3", ["-c", _]) if self.probe_succeeds => CommandOutput::succeeded(""),
            ("python3", ["-c", _]) => CommandOutput::failed(1, "ModuleNotFoundError: distutils"),
            ("apt-get", ["purge", ..]) => {
                self.editor_version = None;
                CommandOutput::succeeded("")
            }
            _ => CommandOutput::succeeded(""),
        };
        Ok(output)
    }
}

fn fake_tar(archive: &Path, cwd: &Path, with_symbols: bool) -> io::Result<()> {
    let name = archive
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or_default();
    match name {
        "kicadLibrary.tar.xz" => {
            let root = cwd.join("kicadLibrary");
            fs::create_dir_all(root.join("template"))?;
            fs::write(root.join("template/sym-lib-table"), "(sym_lib_table)\n")?;
            if with_symbols {
                fs::create_dir_all(root.join("eSim-symbols"))?;
                fs::write(root.join("eSim-symbols/eSim_Devices.kicad_sym"), "(kicad_symbol_lib)\n")?;
            }
        }
        "sky130_fd_pr.tar.xz" => {
            let root = cwd.join("sky130_fd_pr");
            fs::create_dir_all(root.join("models"))?;
            fs::write(root.join("models/sky130.lib.spice"), "* sky130\n")?;
        }
        _ => {}
    }
    Ok(())
}

impl CommandRunner for FakeRunner {
    fn run(&mut self, spec: &CommandSpec) -> Result<CommandOutput> {
        self.specs.push(spec.clone());
        let label = spec.label();

        let program = Path::new(&spec.program)
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or_default();
        if self.missing_programs.iter().any(|p| p == program) {
            return Err(InstallerError::Spawn {
                label,
                source: io::Error::new(io::ErrorKind::NotFound, "No such file or directory"),
            });
        }
        if let Some(pattern) = self.fail_patterns.iter().find(|p| label.contains(p.as_str())) {
            return Ok(CommandOutput::failed(100, format!("simulated failure: {}", pattern)));
        }
        Ok(self.simulate(spec)?)
    }
}

/// Install root, home and system root under one temp directory.
pub struct Fixture {
    pub tmp: TempDir,
    pub layout: InstallLayout,
}

impl Fixture {
    /// An eSim distribution without any bundled archives.
    pub fn bare() -> Self {
        let tmp = tempfile::tempdir().expect("tempdir");
        let layout = InstallLayout::rooted(
            tmp.path().join("eSim-2.4"),
            tmp.path().join("home/ada"),
            &tmp.path().join("sys"),
            Owner::current(),
            Escalation::Direct,
        );
        fs::create_dir_all(&layout.install_root).unwrap();
        fs::create_dir_all(&layout.home).unwrap();
        for dir in layout.hdl_model_dirs() {
            fs::create_dir_all(dir).unwrap();
        }
        Self { tmp, layout }
    }

    /// A full distribution: library and PDK archives, NGHDL bundle, icon.
    pub fn with_bundles() -> Self {
        let fixture = Self::bare();
        let layout = &fixture.layout;
        write(&layout.library_archive(), b"xz");
        write(&layout.pdk_archive(), b"xz");
        write(&layout.hdl_bundle(), b"PK");
        write(&layout.bundled_icon(), b"\x89PNG");
        fixture
    }

    pub fn layout(&self) -> InstallLayout {
        self.layout.clone()
    }

    /// The same layout, with privileged actions going through `sudo`.
    pub fn escalated_layout(&self) -> InstallLayout {
        InstallLayout {
            escalation: Escalation::Sudo,
            ..self.layout.clone()
        }
    }

    pub fn path(&self, relative: &str) -> PathBuf {
        self.tmp.path().join(relative)
    }
}

pub fn write(path: &Path, content: &[u8]) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, content).unwrap();
}
