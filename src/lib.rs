//! eSim installer library
//!
//! Installs and removes the eSim EDA suite: system packages and a Python
//! virtual environment, KiCad with eSim's symbol library, the optional NGHDL
//! toolchain and SKY130 PDK, and desktop integration.

pub mod cli;
pub mod command;
pub mod components;
pub mod context;
pub mod error;
pub mod install_state;
pub mod installed;
pub mod layout;
pub mod orchestrator;
pub mod plan;
pub mod process_guard;
pub mod prompt;
pub mod sanity;
pub mod system;

// Re-export main types for convenience
pub use command::{CommandOutput, CommandRunner, CommandSpec, SystemRunner};
pub use context::{EnvOverlay, Host, Notice, NoticeKind, RunContext};
pub use error::{InstallerError, Result};
pub use install_state::{InstallStage, InstallTracker, InstallTransitionError};
pub use installed::InstalledComponents;
pub use layout::{Escalation, InstallLayout, Owner};
pub use orchestrator::{ComponentStatus, Orchestrator, RunOutcome, RunReport};
pub use plan::{Component, FailurePolicy, PipelineMode, Step};
pub use prompt::{Prompt, ScriptedPrompt, TerminalPrompt};
