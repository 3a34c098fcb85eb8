//! Pre-flight sanity checks for the install host
//!
//! Run before an install touches anything:
//! - Required tools are on `PATH`
//! - `sudo` is available when the installer is not already root
//!
//! A failed check prints what is missing and which package provides it.

use crate::layout::Escalation;

/// Result of environment verification
#[derive(Debug)]
pub struct SanityCheckResult {
    pub missing_binaries: Vec<String>,
}

impl SanityCheckResult {
    /// Returns true if all checks passed
    pub fn is_ok(&self) -> bool {
        self.missing_binaries.is_empty()
    }
}

/// Tools every install needs before the first package is installed
const REQUIRED_BINARIES: &[&str] = &[
    "apt-get",    // Package installs (apt)
    "dpkg-query", // Installed version queries (dpkg)
    "tar",        // Library and PDK archives
    "unzip",      // NGHDL bundle
    "bash",       // NGHDL installer script
];

/// Check if a binary is available in PATH
fn binary_exists(name: &str) -> bool {
    which::which(name).is_ok()
}

/// Perform all sanity checks and return the result
pub fn verify_environment(escalation: Escalation) -> SanityCheckResult {
    let mut wanted: Vec<&str> = REQUIRED_BINARIES.to_vec();
    if escalation.escalates() {
        wanted.push("sudo");
    }

    let missing_binaries = wanted
        .into_iter()
        .filter(|binary| !binary_exists(binary))
        .map(str::to_string)
        .collect();

    SanityCheckResult { missing_binaries }
}

/// Map binary names to the Ubuntu packages that ship them
fn get_package_for_binary(binary: &str) -> &'static str {
    match binary {
        "apt-get" => "apt",
        "dpkg-query" => "dpkg",
        "tar" => "tar",
        "unzip" => "unzip",
        "bash" => "bash",
        "sudo" => "sudo",
        _ => "unknown",
    }
}

/// Print what is missing to stderr
pub fn print_failure(result: &SanityCheckResult) {
    eprintln!();
    eprintln!("eSim installer - pre-flight check failed");
    eprintln!();
    eprintln!("Missing required programs:");
    for binary in &result.missing_binaries {
        eprintln!("  - {} (package: {})", binary, get_package_for_binary(binary));
    }
    let packages: Vec<&str> = result
        .missing_binaries
        .iter()
        .map(|b| get_package_for_binary(b))
        .collect();
    eprintln!();
    eprintln!("Install them with:");
    eprintln!("  sudo apt-get install {}", packages.join(" "));
    eprintln!();
}

/// Verify the environment; `false` after printing the failure.
pub fn run_preflight_checks(escalation: Escalation) -> bool {
    tracing::debug!("Running pre-flight sanity checks...");

    let result = verify_environment(escalation);
    if !result.is_ok() {
        tracing::error!("pre-flight check failed: {:?}", result.missing_binaries);
        print_failure(&result);
        return false;
    }

    tracing::info!("Pre-flight checks passed");
    true
}
