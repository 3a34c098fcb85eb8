//! Bundled archives shipped inside the eSim distribution.

use std::path::{Path, PathBuf};

use crate::context::{Host, RunContext};
use crate::error::{InstallerError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    TarXz,
    Zip,
}

/// An archive and the directory it is expected to unpack into, relative to
/// the directory it is extracted in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentArchive {
    pub source: PathBuf,
    pub extracted_dir: String,
    pub format: ArchiveFormat,
}

impl ComponentArchive {
    pub fn new(source: impl Into<PathBuf>, extracted_dir: &str, format: ArchiveFormat) -> Self {
        Self {
            source: source.into(),
            extracted_dir: extracted_dir.to_string(),
            format,
        }
    }

    pub fn is_present(&self) -> bool {
        self.source.is_file()
    }

    /// The precondition every consumer checks before extracting.
    pub fn require(&self) -> Result<()> {
        if self.is_present() {
            Ok(())
        } else {
            Err(InstallerError::missing_archive(&self.source))
        }
    }

    pub fn extracted_path(&self, dest: &Path) -> PathBuf {
        dest.join(&self.extracted_dir)
    }

    /// Extract into `dest` and return the extracted directory.
    pub fn extract(&self, ctx: &RunContext, host: &mut Host<'_>, dest: &Path) -> Result<PathBuf> {
        self.require()?;
        let spec = match self.format {
            ArchiveFormat::TarXz => ctx
                .command("tar")
                .arg("-xJf")
                .path_arg(&self.source)
                .current_dir(dest),
            // unzip lists every member; keep it off the terminal
            ArchiveFormat::Zip => ctx
                .command("unzip")
                .arg("-o")
                .path_arg(&self.source)
                .arg("-d")
                .path_arg(dest)
                .captured(),
        };
        host.run_checked(&spec)?;

        let extracted = self.extracted_path(dest);
        if !extracted.is_dir() {
            return Err(InstallerError::filesystem(format!(
                "{} did not contain {}/",
                self.source.display(),
                self.extracted_dir
            )));
        }
        Ok(extracted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_reports_missing_path() {
        let archive = ComponentArchive::new(
            "/nonexistent/library/kicadLibrary.tar.xz",
            "kicadLibrary",
            ArchiveFormat::TarXz,
        );
        assert!(!archive.is_present());
        match archive.require() {
            Err(InstallerError::MissingArchive(path)) => {
                assert_eq!(path, PathBuf::from("/nonexistent/library/kicadLibrary.tar.xz"))
            }
            other => panic!("expected MissingArchive, got {:?}", other),
        }
    }

    #[test]
    fn test_require_accepts_existing_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("nghdl.zip");
        std::fs::write(&path, b"PK").unwrap();
        let archive = ComponentArchive::new(&path, "nghdl", ArchiveFormat::Zip);
        assert!(archive.require().is_ok());
        assert_eq!(archive.extracted_path(tmp.path()), tmp.path().join("nghdl"));
    }
}
