//! Top-level driver for an install or uninstall run.
//!
//! Runs a [`crate::plan`] step by step and applies each step's failure policy:
//!
//! ```text
//! Abort          -> stop, report the generic failure, exit 1
//! Tolerate       -> notice, continue with the next step
//! SkipComponent  -> notice, skip the rest of the component, continue
//! BestEffort     -> notice, continue (uninstall)
//! ```
//!
//! A usage error stops the run whatever the policy.

use std::fmt;

use tracing::{debug, error, info, warn};

use crate::command::CommandRunner;
use crate::context::{Host, Notice, NoticeKind, RunContext};
use crate::error::InstallerError;
use crate::install_state::{InstallStage, InstallTracker};
use crate::installed::InstalledComponents;
use crate::layout::InstallLayout;
use crate::plan::{self, Component, FailurePolicy, PipelineMode, Step};
use crate::prompt::{Prompt, parse_confirmation};

pub const FATAL_MESSAGE: &str =
    "Error! Kindly resolve above error(s) and try again.\nAborting Installation...";

pub const UNINSTALL_QUESTION: &str = "Are you sure? It will remove eSim completely including \
KiCad, Makerchip, NGHDL and SKY130 PDK along with their models and libraries.\n\
Enter your choice (y/n): ";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComponentStatus {
    Succeeded,
    /// Finished, but a tolerated step failed along the way.
    Degraded,
    /// A precondition failed and the rest of the component was not run.
    Skipped,
}

impl fmt::Display for ComponentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::Succeeded => "ok",
            Self::Degraded => "completed with warnings",
            Self::Skipped => "skipped",
        };
        write!(f, "{}", text)
    }
}

#[derive(Debug, Clone, Default)]
pub struct RunReport {
    pub components: Vec<(Component, ComponentStatus)>,
    pub notices: Vec<Notice>,
}

impl RunReport {
    pub fn status(&self, component: Component) -> Option<ComponentStatus> {
        self.components
            .iter()
            .find(|(c, _)| *c == component)
            .map(|(_, status)| *status)
    }

    pub fn notices_of(&self, kind: NoticeKind) -> impl Iterator<Item = &Notice> {
        self.notices.iter().filter(move |n| n.kind == kind)
    }

    fn set_status(&mut self, component: Component, status: ComponentStatus) {
        if let Some(entry) = self.components.iter_mut().find(|(c, _)| *c == component) {
            entry.1 = status;
        }
    }
}

#[derive(Debug)]
pub enum RunOutcome {
    Completed(RunReport),
    /// The operator answered `n` to the uninstall confirmation.
    Declined,
    UsageError(String),
    Failed {
        component: Option<Component>,
        step: Option<&'static str>,
        error: String,
        report: RunReport,
    },
}

impl RunOutcome {
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Completed(_) | Self::Declined => 0,
            Self::Failed { .. } => 1,
            Self::UsageError(_) => 2,
        }
    }
}

pub struct Orchestrator<'a> {
    ctx: RunContext,
    host: Host<'a>,
}

impl<'a> Orchestrator<'a> {
    pub fn new(
        layout: InstallLayout,
        runner: &'a mut dyn CommandRunner,
        prompt: &'a mut dyn Prompt,
    ) -> Self {
        Self {
            ctx: RunContext::new(layout),
            host: Host::new(runner, prompt),
        }
    }

    pub fn context(&self) -> &RunContext {
        &self.ctx
    }

    pub fn run(&mut self, mode: PipelineMode) -> RunOutcome {
        info!("starting {} from {}", mode, self.ctx.layout.install_root.display());
        let outcome = match mode {
            PipelineMode::Install => self.install(),
            PipelineMode::Uninstall => self.uninstall(),
        };
        debug!("{} finished: {:?}", mode, outcome);
        outcome
    }

    fn install(&mut self) -> RunOutcome {
        let mut tracker = InstallTracker::new();
        let outcome = self.execute(&plan::install_plan(), Some(&mut tracker));

        match &outcome {
            RunOutcome::Completed(_) => {
                println!("-----------------eSim Installed Successfully-----------------");
                println!("Type \"esim\" in Terminal to launch it");
                println!("or double click on \"eSim\" icon placed on Desktop");
            }
            RunOutcome::Failed { .. } => println!("{}", FATAL_MESSAGE),
            RunOutcome::UsageError(msg) => println!("{}", msg),
            RunOutcome::Declined => {}
        }
        outcome
    }

    fn uninstall(&mut self) -> RunOutcome {
        let answer = match self.host.prompt.ask(UNINSTALL_QUESTION) {
            Ok(answer) => answer,
            Err(e) => return self.failed(None, None, e),
        };
        match parse_confirmation(&answer) {
            Some(true) => {}
            Some(false) => {
                println!("Cancelled uninstallation");
                return RunOutcome::Declined;
            }
            None => {
                let msg = "Please select the right option".to_string();
                println!("{}", msg);
                return RunOutcome::UsageError(msg);
            }
        }

        self.ctx.installed = Some(InstalledComponents::detect(&self.ctx, &mut self.host));
        let outcome = self.execute(&plan::uninstall_plan(), None);
        if matches!(outcome, RunOutcome::Completed(_)) {
            println!("-----------------eSim Uninstalled Successfully-----------------");
        }
        outcome
    }

    fn failed(
        &mut self,
        component: Option<Component>,
        step: Option<&'static str>,
        error: InstallerError,
    ) -> RunOutcome {
        error!("run failed: {}", error);
        RunOutcome::Failed {
            component,
            step,
            error: error.to_string(),
            report: RunReport {
                components: Vec::new(),
                notices: self.ctx.take_notices(),
            },
        }
    }

    /// Run `steps` in order. The tracker, when given, is advanced as each
    /// component is entered.
    fn execute(&mut self, steps: &[Step], mut tracker: Option<&mut InstallTracker>) -> RunOutcome {
        let mut report = RunReport::default();
        let mut skipping: Option<Component> = None;

        for step in steps {
            let entering = report.components.last().map(|(c, _)| *c) != Some(step.component);
            if entering {
                if let Some(tracker) = tracker.as_deref_mut() {
                    if let Err(e) = enter_stage(tracker, step.component.stage()) {
                        tracker.fail();
                        return self.abort(report, step, e);
                    }
                }
                println!("==> {}", step.component);
                report.components.push((step.component, ComponentStatus::Succeeded));
            }
            if skipping == Some(step.component) {
                continue;
            }

            println!("    {}", step.label);
            let Err(err) = (step.action)(&mut self.ctx, &mut self.host) else {
                continue;
            };
            if err.is_usage() {
                if let Some(tracker) = tracker.as_deref_mut() {
                    tracker.fail();
                }
                return RunOutcome::UsageError(usage_message(err));
            }

            match step.policy {
                FailurePolicy::Abort => {
                    if let Some(tracker) = tracker.as_deref_mut() {
                        tracker.fail();
                    }
                    return self.abort(report, step, err);
                }
                FailurePolicy::Tolerate | FailurePolicy::BestEffort => {
                    warn!("{} failed, continuing: {}", step.label, err);
                    self.ctx.notice(
                        NoticeKind::Tolerated,
                        format!("{}: {} (continuing)", step.label, err),
                    );
                    report.set_status(step.component, ComponentStatus::Degraded);
                }
                FailurePolicy::SkipComponent => {
                    self.ctx.notice(
                        NoticeKind::Skipped,
                        format!("{}: {}; skipping {}", step.label, err, step.component),
                    );
                    report.set_status(step.component, ComponentStatus::Skipped);
                    skipping = Some(step.component);
                }
            }
        }

        if let Some(tracker) = tracker {
            if let Err(e) = enter_stage(tracker, InstallStage::Completed) {
                return self.failed(None, None, e);
            }
        }
        report.notices = self.ctx.take_notices();
        RunOutcome::Completed(report)
    }

    fn abort(&mut self, mut report: RunReport, step: &Step, err: InstallerError) -> RunOutcome {
        error!("{} failed: {}", step.label, err);
        report.notices = self.ctx.take_notices();
        RunOutcome::Failed {
            component: Some(step.component),
            step: Some(step.label),
            error: err.to_string(),
            report,
        }
    }
}

fn enter_stage(tracker: &mut InstallTracker, stage: InstallStage) -> Result<(), InstallerError> {
    tracker.transition_to(stage)?;
    debug!("stage {} ({}%)", stage, stage.progress_percent());
    Ok(())
}

fn usage_message(err: InstallerError) -> String {
    match err {
        InstallerError::Usage(msg) => msg,
        other => other.to_string(),
    }
}
