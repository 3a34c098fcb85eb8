//! The install and uninstall pipelines as data.
//!
//! A pipeline is a literal list of [`Step`]s run in order. Each step names the
//! component it belongs to and the [`FailurePolicy`] the orchestrator applies
//! when it fails; steps themselves only report success or an error.

use strum::{Display, EnumIter, EnumString};

use crate::components::{config_writer, dependencies, desktop, editor, hdl, library, pdk, proxy};
use crate::context::{Host, RunContext};
use crate::error::Result;
use crate::install_state::InstallStage;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
pub enum PipelineMode {
    #[strum(serialize = "install")]
    Install,
    #[strum(serialize = "uninstall")]
    Uninstall,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
pub enum Component {
    #[strum(serialize = "Proxy")]
    Proxy,
    #[strum(serialize = "Configuration")]
    Config,
    #[strum(serialize = "Dependencies")]
    Dependencies,
    #[strum(serialize = "KiCad")]
    Editor,
    #[strum(serialize = "eSim KiCad library")]
    Library,
    #[strum(serialize = "NGHDL")]
    Hdl,
    #[strum(serialize = "SKY130 PDK")]
    Pdk,
    #[strum(serialize = "Desktop integration")]
    Desktop,
}

impl Component {
    /// Install stage entered when the component starts.
    pub const fn stage(self) -> InstallStage {
        match self {
            Self::Proxy => InstallStage::Proxy,
            Self::Config => InstallStage::Config,
            Self::Dependencies => InstallStage::Dependencies,
            Self::Editor => InstallStage::Editor,
            Self::Library => InstallStage::Library,
            Self::Hdl => InstallStage::Hdl,
            Self::Pdk => InstallStage::Pdk,
            Self::Desktop => InstallStage::Desktop,
        }
    }
}

/// What the orchestrator does when a step fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum FailurePolicy {
    /// Stop the whole run.
    Abort,
    /// Report and carry on with the next step.
    Tolerate,
    /// Report, skip the rest of this component and carry on with the next one.
    SkipComponent,
    /// Uninstall reversal: report and carry on.
    BestEffort,
}

pub type StepAction = fn(&mut RunContext, &mut Host<'_>) -> Result<()>;

#[derive(Clone, Copy)]
pub struct Step {
    pub component: Component,
    pub label: &'static str,
    pub policy: FailurePolicy,
    pub action: StepAction,
}

impl std::fmt::Debug for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Step")
            .field("component", &self.component)
            .field("label", &self.label)
            .field("policy", &self.policy)
            .finish()
    }
}

const fn step(
    component: Component,
    label: &'static str,
    policy: FailurePolicy,
    action: StepAction,
) -> Step {
    Step {
        component,
        label,
        policy,
        action,
    }
}

pub fn install_plan() -> Vec<Step> {
    use Component::*;
    use FailurePolicy::*;

    vec![
        step(Proxy, "Checking proxy settings", Abort, proxy::configure),
        step(Config, "Writing config file", Abort, config_writer::write_config),
        step(Dependencies, "Updating package index", Tolerate, dependencies::refresh_index),
        step(Dependencies, "Installing virtualenv", Abort, dependencies::install_venv_tool),
        step(Dependencies, "Creating virtual environment", Abort, dependencies::create_venv),
        step(Dependencies, "Upgrading pip", Abort, dependencies::upgrade_pip),
        step(Dependencies, "Installing system packages", Abort, dependencies::install_system_packages),
        step(Dependencies, "Checking Python runtime", Abort, dependencies::check_python),
        step(Dependencies, "Installing Python packages", Abort, dependencies::install_python_packages),
        step(Editor, "Configuring KiCad repository", Abort, editor::ensure_repository),
        step(Editor, "Installing KiCad", Abort, editor::install_packages),
        step(Editor, "Detecting KiCad version", Abort, editor::detect_version),
        step(Library, "Checking library archive", SkipComponent, library::require_archive),
        step(Library, "Extracting library", Abort, library::extract),
        step(Library, "Copying symbol table", Abort, library::install_symbol_table),
        step(Library, "Copying eSim symbols", Abort, library::install_symbols),
        step(Library, "Removing extracted library", Tolerate, library::cleanup),
        step(Hdl, "Checking NGHDL bundle", SkipComponent, hdl::require_bundle),
        step(Hdl, "Unpacking NGHDL", Abort, hdl::unpack),
        step(Hdl, "Running NGHDL installer", Tolerate, hdl::run_installer),
        step(Pdk, "Checking SKY130 PDK archive", SkipComponent, pdk::require_archive),
        step(Pdk, "Installing SKY130 PDK", Abort, pdk::install),
        step(Desktop, "Installing launcher", Abort, desktop::install_launcher),
        step(Desktop, "Installing desktop entry", Abort, desktop::install_desktop_entry),
        step(Desktop, "Trusting desktop entry", Tolerate, desktop::trust_desktop_entry),
        step(Desktop, "Copying icon", Tolerate, desktop::install_icon),
    ]
}

/// Reverse install order. The venv lives inside the config directory, so the
/// directory goes last.
pub fn uninstall_plan() -> Vec<Step> {
    use Component::*;
    use FailurePolicy::BestEffort;

    vec![
        step(Desktop, "Removing launcher", BestEffort, desktop::remove_launcher),
        step(Desktop, "Removing desktop entries", BestEffort, desktop::remove_desktop_entries),
        step(Pdk, "Removing SKY130 PDK", BestEffort, pdk::uninstall),
        step(Hdl, "Uninstalling NGHDL", BestEffort, hdl::uninstall),
        step(Hdl, "Clearing NGHDL models", BestEffort, hdl::clear_models),
        step(Editor, "Purging KiCad", BestEffort, editor::purge_packages),
        step(Editor, "Removing KiCad data", BestEffort, editor::remove_data_dir),
        step(Editor, "Removing KiCad package sources", BestEffort, editor::remove_sources),
        step(Editor, "Removing KiCad config", BestEffort, editor::remove_config_dir),
        step(Dependencies, "Removing virtual environment", BestEffort, dependencies::remove_venv),
        step(Config, "Removing eSim config", BestEffort, config_writer::remove_config_dir),
    ]
}
