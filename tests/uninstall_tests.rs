//! Tests for the uninstall pipeline
//!
//! These tests verify:
//! - The confirmation prompt gates every removal
//! - A fresh machine uninstalls cleanly, reporting gaps
//! - A previous install is removed in full
//! - The editor config directory follows the version seen before the purge

mod support;

use std::fs;

use esim_installer::{NoticeKind, Orchestrator, PipelineMode, RunOutcome, ScriptedPrompt};
use support::{FakeRunner, Fixture};

fn install(fixture: &Fixture) {
    let mut runner = FakeRunner::new();
    let mut prompt = ScriptedPrompt::new(["n"]);
    let outcome =
        Orchestrator::new(fixture.layout(), &mut runner, &mut prompt).run(PipelineMode::Install);
    assert_eq!(outcome.exit_code(), 0, "install failed: {:?}", outcome);
}

// =============================================================================
// Confirmation gate
// =============================================================================

#[test]
fn test_declined_uninstall_removes_nothing() {
    let fixture = Fixture::with_bundles();
    install(&fixture);
    let layout = fixture.layout();

    for answer in ["n", "N"] {
        let mut runner = FakeRunner::new();
        let mut prompt = ScriptedPrompt::new([answer]);
        let outcome =
            Orchestrator::new(layout.clone(), &mut runner, &mut prompt).run(PipelineMode::Uninstall);

        assert!(matches!(outcome, RunOutcome::Declined));
        assert_eq!(outcome.exit_code(), 0);
        assert!(runner.specs.is_empty());
    }
    assert!(layout.config_file.is_file());
    assert!(layout.launcher_path.is_file());
    assert!(layout.pdk_dir().is_dir());
}

#[test]
fn test_unrecognised_confirmation_is_usage_error() {
    let fixture = Fixture::with_bundles();
    install(&fixture);
    let layout = fixture.layout();

    let mut runner = FakeRunner::new();
    let mut prompt = ScriptedPrompt::new(["yes"]);
    let outcome =
        Orchestrator::new(layout.clone(), &mut runner, &mut prompt).run(PipelineMode::Uninstall);

    assert_eq!(outcome.exit_code(), 2);
    assert!(runner.specs.is_empty());
    assert!(layout.config_dir.is_dir());
}

// =============================================================================
// Fresh machine
// =============================================================================

#[test]
fn test_uninstall_on_fresh_machine_reports_gaps() {
    let fixture = Fixture::bare();
    let layout = fixture.layout();
    let mut runner = FakeRunner::new().editor_version(None);
    let mut prompt = ScriptedPrompt::new(["y"]);

    let outcome =
        Orchestrator::new(layout, &mut runner, &mut prompt).run(PipelineMode::Uninstall);

    assert_eq!(outcome.exit_code(), 0);
    let RunOutcome::Completed(report) = outcome else {
        panic!("expected completion");
    };
    let gaps = report.notices_of(NoticeKind::Gap).count();
    // launcher, 2 desktop entries, PDK, NGHDL, package, data dir, sources,
    // editor config, venv, config dir
    assert_eq!(gaps, 11);
    assert_eq!(report.notices_of(NoticeKind::Tolerated).count(), 0);

    // Only the snapshot query ran
    assert_eq!(runner.labels(), ["dpkg-query -W -f=${Status}|${Version} kicad"]);
}

// =============================================================================
// After an install
// =============================================================================

#[test]
fn test_uninstall_removes_everything_installed() {
    let fixture = Fixture::with_bundles();
    install(&fixture);
    let layout = fixture.layout();
    let source = layout
        .apt_sources_dir()
        .join("kicad-ubuntu-kicad-6_0-releases-jammy.list");
    support::write(
        &source,
        b"deb https://ppa.launchpadcontent.net/kicad/kicad-6.0-releases/ubuntu jammy main\n",
    );
    support::write(&layout.hdl_model_dirs()[0].join("counter.xml"), b"<model/>");
    assert!(layout.editor_config_dir("6.0").is_dir());
    assert!(layout.hdl_dir().is_dir());

    let mut runner = FakeRunner::new();
    let mut prompt = ScriptedPrompt::new(["Y"]);
    let outcome =
        Orchestrator::new(layout.clone(), &mut runner, &mut prompt).run(PipelineMode::Uninstall);

    assert_eq!(outcome.exit_code(), 0);
    let RunOutcome::Completed(report) = outcome else {
        panic!("expected completion");
    };
    assert_eq!(report.notices_of(NoticeKind::Tolerated).count(), 0);

    assert!(!layout.launcher_path.exists());
    assert!(!layout.system_desktop_entry().exists());
    assert!(!layout.user_desktop_entry().exists());
    assert!(!layout.pdk_dir().exists());
    assert!(!layout.hdl_dir().exists());
    assert!(!layout.editor_data_dir.exists());
    assert!(!source.exists());
    assert!(!layout.editor_config_dir("6.0").exists());
    assert!(!layout.venv_dir.exists());
    assert!(!layout.config_dir.exists());

    // Model directories are emptied, not removed
    let [nghdl_models, _] = layout.hdl_model_dirs();
    assert!(nghdl_models.is_dir());
    assert_eq!(fs::read_dir(&nghdl_models).unwrap().count(), 0);

    // NGHDL's own uninstaller runs before its directory goes
    assert!(runner.ran("install-nghdl.sh --uninstall"));
    assert!(runner.ran("apt-get purge -y kicad"));
    // The distribution itself is left alone
    assert!(layout.install_root.is_dir());
    assert!(layout.library_archive().is_file());
}

#[test]
fn test_editor_config_dir_uses_version_seen_before_purge() {
    let fixture = Fixture::bare();
    let layout = fixture.layout();
    fs::create_dir_all(layout.editor_config_dir("7.0")).unwrap();
    fs::create_dir_all(layout.editor_config_dir("6.0")).unwrap();

    // The purge clears the fake's installed version
    let mut runner = FakeRunner::new().editor_version(Some("7.0.10-1"));
    let mut prompt = ScriptedPrompt::new(["y"]);
    let outcome =
        Orchestrator::new(layout.clone(), &mut runner, &mut prompt).run(PipelineMode::Uninstall);
    assert_eq!(outcome.exit_code(), 0);

    let purge = runner.position("apt-get purge").unwrap();
    let query = runner.position("dpkg-query").unwrap();
    assert!(query < purge);
    assert!(!layout.editor_config_dir("7.0").exists());
    assert!(layout.editor_config_dir("6.0").is_dir());
}

#[test]
fn test_failed_removal_does_not_stop_uninstall() {
    let fixture = Fixture::with_bundles();
    install(&fixture);
    let layout = fixture.layout();

    let mut runner = FakeRunner::new().fail_on("apt-get purge");
    let mut prompt = ScriptedPrompt::new(["y"]);
    let outcome =
        Orchestrator::new(layout.clone(), &mut runner, &mut prompt).run(PipelineMode::Uninstall);

    assert_eq!(outcome.exit_code(), 0);
    let RunOutcome::Completed(report) = outcome else {
        panic!("expected completion");
    };
    assert_eq!(report.notices_of(NoticeKind::Tolerated).count(), 1);
    assert!(!layout.config_dir.exists());
    assert!(!layout.pdk_dir().exists());
}
