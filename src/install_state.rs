//! Install stage state machine
//!
//! The install pipeline is a literal sequence of components. This module makes
//! that order explicit: the orchestrator moves an [`InstallTracker`] forward
//! as it enters each component, and any attempt to skip or revisit a stage is
//! an error.
//!
//! ```text
//! NotStarted → Proxy → Config → Dependencies → Editor → Library → Hdl → Pdk
//!            → Desktop → Completed
//!
//! (any non-terminal stage can transition to Failed)
//! ```

use std::fmt;

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum InstallStage {
    NotStarted = 0,
    Proxy = 1,
    Config = 2,
    Dependencies = 3,
    Editor = 4,
    Library = 5,
    Hdl = 6,
    Pdk = 7,
    Desktop = 8,
    Completed = 9,
    Failed = 255,
}

impl InstallStage {
    #[inline]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    pub const fn next(self) -> Option<Self> {
        match self {
            Self::NotStarted => Some(Self::Proxy),
            Self::Proxy => Some(Self::Config),
            Self::Config => Some(Self::Dependencies),
            Self::Dependencies => Some(Self::Editor),
            Self::Editor => Some(Self::Library),
            Self::Library => Some(Self::Hdl),
            Self::Hdl => Some(Self::Pdk),
            Self::Pdk => Some(Self::Desktop),
            Self::Desktop => Some(Self::Completed),
            Self::Completed | Self::Failed => None,
        }
    }

    pub const fn description(self) -> &'static str {
        match self {
            Self::NotStarted => "Not started",
            Self::Proxy => "Configuring proxy",
            Self::Config => "Writing configuration",
            Self::Dependencies => "Installing dependencies",
            Self::Editor => "Installing KiCad",
            Self::Library => "Installing eSim KiCad library",
            Self::Hdl => "Installing NGHDL",
            Self::Pdk => "Installing SKY130 PDK",
            Self::Desktop => "Creating desktop integration",
            Self::Completed => "Installation complete",
            Self::Failed => "Installation failed",
        }
    }

    pub const fn progress_percent(self) -> u8 {
        match self {
            Self::NotStarted => 0,
            Self::Proxy => 2,
            Self::Config => 5,
            Self::Dependencies => 10,
            Self::Editor => 40,
            Self::Library => 60,
            Self::Hdl => 70,
            Self::Pdk => 85,
            Self::Desktop => 95,
            Self::Completed => 100,
            Self::Failed => 0,
        }
    }
}

impl fmt::Display for InstallStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InstallTransitionError {
    #[error("Cannot skip from {from} to {to}")]
    SkippedStage { from: InstallStage, to: InstallStage },

    #[error("Cannot go backwards from {from} to {to}")]
    BackwardTransition { from: InstallStage, to: InstallStage },

    #[error("Cannot leave terminal state {from}")]
    FromTerminalState { from: InstallStage },

    #[error("Already at stage {stage}")]
    AlreadyAtStage { stage: InstallStage },
}

/// Tracks the current install stage and where a failure happened.
#[derive(Debug, Clone)]
pub struct InstallTracker {
    current: InstallStage,
    failed_at: Option<InstallStage>,
}

impl Default for InstallTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl InstallTracker {
    pub fn new() -> Self {
        Self {
            current: InstallStage::NotStarted,
            failed_at: None,
        }
    }

    pub fn current_stage(&self) -> InstallStage {
        self.current
    }

    pub fn failed_at(&self) -> Option<InstallStage> {
        self.failed_at
    }

    /// Move to `target`, which must be exactly the next stage.
    pub fn transition_to(&mut self, target: InstallStage) -> Result<(), InstallTransitionError> {
        let from = self.current;
        if from.is_terminal() {
            return Err(InstallTransitionError::FromTerminalState { from });
        }
        if target == InstallStage::Failed {
            self.failed_at = Some(from);
            self.current = InstallStage::Failed;
            return Ok(());
        }
        if target == from {
            return Err(InstallTransitionError::AlreadyAtStage { stage: from });
        }
        if (target as u8) < (from as u8) {
            return Err(InstallTransitionError::BackwardTransition { from, to: target });
        }
        if from.next() != Some(target) {
            return Err(InstallTransitionError::SkippedStage { from, to: target });
        }
        self.current = target;
        Ok(())
    }

    /// Advance to the next stage in sequence.
    pub fn advance(&mut self) -> Result<InstallStage, InstallTransitionError> {
        let next = self
            .current
            .next()
            .ok_or(InstallTransitionError::FromTerminalState { from: self.current })?;
        self.transition_to(next)?;
        Ok(next)
    }

    pub fn fail(&mut self) {
        if !self.current.is_terminal() {
            self.failed_at = Some(self.current);
            self.current = InstallStage::Failed;
        }
    }
}
