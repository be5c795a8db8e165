use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn cgmman_bin_path() -> PathBuf {
    if let Ok(path) = std::env::var("CARGO_BIN_EXE_cgmman") {
        return PathBuf::from(path);
    }

    let this_test = std::env::current_exe().expect("current_exe");
    let deps_dir = this_test.parent().expect("deps dir");
    let debug_dir = deps_dir.parent().expect("debug dir");
    if cfg!(windows) {
        debug_dir.join("cgmman.exe")
    } else {
        debug_dir.join("cgmman")
    }
}

/// A source dir, a work dir and both INI files inside one temp root.
struct Setup {
    root: TempDir,
}

impl Setup {
    fn new(translators: &str) -> Self {
        let root = TempDir::new().unwrap();
        fs::create_dir(root.path().join("cgm")).unwrap();
        fs::write(
            root.path().join("cgmman.ini"),
            "[manager]\nsource_dir = cgm\nwork_dir = work\nsleep_seconds = 1\nlog_dir = logs\n",
        )
        .unwrap();
        fs::write(root.path().join("translators.ini"), translators).unwrap();
        Self { root }
    }

    fn path(&self, rel: &str) -> PathBuf {
        self.root.path().join(rel)
    }

    fn cmd(&self) -> Command {
        let mut cmd = Command::new(cgmman_bin_path());
        cmd.arg("--config")
            .arg(self.path("cgmman.ini"))
            .arg("--translators")
            .arg(self.path("translators.ini"))
            .env_remove("RUST_LOG");
        cmd
    }
}

fn todays_log(dir: &Path) -> Option<PathBuf> {
    fs::read_dir(dir)
        .ok()?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .find(|p| p.extension().map(|e| e == "log").unwrap_or(false))
}

#[test]
fn translators_json_lists_normalized_extensions() {
    let setup = Setup::new(
        "[TIF]\nconverter = cgm2tif\narguments = {file} {name}.tif\n\n\
         [.pdf]\nconverter = cgm2pdf\narguments = -o {name}.pdf {file}\nsuccess_code = 1\n",
    );
    let output = setup
        .cmd()
        .args(["translators", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let rules: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let rules = rules.as_array().unwrap();
    assert_eq!(rules.len(), 2);
    assert_eq!(rules[0]["extension"], ".pdf");
    assert_eq!(rules[0]["expected_exit_code"], 1);
    assert_eq!(rules[1]["extension"], ".tif");
    assert_eq!(rules[1]["command_template"][0], "cgm2tif");
}

#[test]
fn translators_table_shows_converter() {
    let setup = Setup::new("[.tif]\nconverter = cgm2tif\narguments = {file}\n");
    setup
        .cmd()
        .arg("translators")
        .assert()
        .success()
        .stdout(predicate::str::contains("cgm2tif").and(predicate::str::contains(".tif")));
}

#[test]
fn stop_creates_sentinel_in_work_dir() {
    let setup = Setup::new("");
    setup
        .cmd()
        .arg("stop")
        .assert()
        .success()
        .stdout(predicate::str::contains("stop requested"));
    assert!(setup.path("work/stop").is_file());
}

#[test]
fn missing_settings_file_is_fatal() {
    let root = TempDir::new().unwrap();
    Command::new(cgmman_bin_path())
        .arg("--config")
        .arg(root.path().join("absent.ini"))
        .arg("run")
        .assert()
        .failure()
        .stderr(predicate::str::contains("absent.ini"));
}

#[test]
fn run_exits_immediately_when_stop_was_requested() {
    let setup = Setup::new("[.out]\nconverter = never-called\narguments = {file}\n");
    fs::create_dir(setup.path("work")).unwrap();
    fs::write(setup.path("work/stop"), "").unwrap();
    fs::write(setup.path("cgm/a.cgm"), "cgm").unwrap();

    setup.cmd().arg("run").timeout(std::time::Duration::from_secs(30)).assert().success();

    assert!(!setup.path("work/stop").exists(), "sentinel removed on exit");
    assert!(!setup.path("cgm/a.out").exists());
    let log = todays_log(&setup.path("logs")).expect("daily log file");
    let contents = fs::read_to_string(log).unwrap();
    assert!(contents.contains("poller shut down"), "log: {contents}");
}

#[cfg(unix)]
mod with_shell {
    use super::*;

    const COPY_TRANSLATOR: &str = "[.out]\nconverter = sh\narguments = -c 'cp \"$0\" \"$1.out\"' {file} {name}\n";

    #[test]
    fn run_once_translates_and_logs() {
        let setup = Setup::new(COPY_TRANSLATOR);
        fs::write(setup.path("cgm/plan.cgm"), "plan").unwrap();

        setup.cmd().args(["run", "--once"]).assert().success();

        assert_eq!(fs::read_to_string(setup.path("cgm/plan.out")).unwrap(), "plan");
        let leftovers: Vec<_> = fs::read_dir(setup.path("work")).unwrap().collect();
        assert!(leftovers.is_empty(), "staging cleared");

        setup
            .cmd()
            .args(["logs", "--lines", "50"])
            .assert()
            .success()
            .stdout(predicate::str::contains("INFO").and(predicate::str::contains("plan")));
    }

    #[test]
    fn failing_converter_is_logged_and_leaves_no_output() {
        let setup = Setup::new("[.out]\nconverter = sh\narguments = -c 'exit 1'\n");
        fs::write(setup.path("cgm/drawing.cgm"), "d").unwrap();

        setup.cmd().args(["run", "--once"]).assert().success();

        assert!(!setup.path("cgm/drawing.out").exists());
        let log = todays_log(&setup.path("logs")).expect("daily log file");
        let contents = fs::read_to_string(log).unwrap();
        let line = contents
            .lines()
            .find(|l| l.contains("drawing.cgm") && l.contains("exited with 1"))
            .unwrap_or_else(|| panic!("no failure line in: {contents}"));
        assert!(line.contains(" - ERROR      - "), "line: {line}");
    }

    #[test]
    fn scan_reports_translated_then_already_done() {
        let setup = Setup::new(COPY_TRANSLATOR);
        fs::write(setup.path("cgm/trasp_a.cgm"), "a").unwrap();

        setup
            .cmd()
            .arg("scan")
            .assert()
            .success()
            .stdout(predicate::str::contains("1 translated"));
        assert!(setup.path("cgm/a.out").is_file());

        setup
            .cmd()
            .arg("scan")
            .assert()
            .success()
            .stdout(predicate::str::contains("already done"));
    }

    #[test]
    fn scan_fails_when_converter_exit_code_is_wrong() {
        let setup = Setup::new("[.out]\nconverter = sh\narguments = -c 'exit 4'\n");
        fs::write(setup.path("cgm/a.cgm"), "a").unwrap();

        let output = setup.cmd().args(["scan", "--json"]).output().unwrap();
        assert!(!output.status.success());
        let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
        assert_eq!(report["summary"]["failed"], 1);
        assert_eq!(report["results"][0]["status"], "failed");
        assert!(!setup.path("cgm/a.out").exists());
    }
}
