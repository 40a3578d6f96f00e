use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use assert_cmd::prelude::*;
use predicates::str::contains;
use tempfile::TempDir;

struct Fixture {
    home: TempDir,
    base: TempDir,
}

impl Fixture {
    fn new() -> Self {
        let fx = Self {
            home: TempDir::new().expect("home"),
            base: TempDir::new().expect("base"),
        };
        fx.write_config("git@example.com:ui", "git@example.com:api");
        fx
    }

    fn write_config(&self, ui_origin: &str, api_origin: &str) {
        let yaml = format!(
            "base_dir: {}\ndefault_target: prod\ntargets:\n  prod:\n    repos:\n      ui:\n        origin: {ui_origin}\n      api:\n        origin: {api_origin}\n",
            self.base.path().display()
        );
        fs::write(self.home.path().join(".stagehand.yaml"), yaml).expect("write config");
    }

    fn cmd(&self) -> Command {
        let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("stagehand"));
        cmd.env("HOME", self.home.path())
            .env("USERPROFILE", self.home.path())
            .env_remove("STAGEHAND_CONFIG");
        cmd
    }

    /// A release directory for every repo, as `build` would leave it.
    fn add_release(&self, release: &str, branch: &str) {
        for repo in ["ui", "api"] {
            let dir = self.release_dir(release, repo);
            fs::create_dir_all(&dir).expect("release dir");
            fs::write(dir.join("_REPOBRANCH.info"), branch).expect("marker");
        }
    }

    fn release_dir(&self, release: &str, repo: &str) -> PathBuf {
        self.base.path().join("releases/prod").join(release).join(repo)
    }

    fn link(&self, repo: &str) -> PathBuf {
        self.base.path().join("current/prod").join(repo)
    }

    fn state(&self, repo: &str) -> serde_json::Value {
        let raw = fs::read_to_string(self.base.path().join("info/prod").join(format!("{repo}.json")))
            .expect("state file");
        serde_json::from_str(&raw).expect("state json")
    }

    fn points_at(&self, repo: &str, release: &str) -> bool {
        fs::canonicalize(self.link(repo)).expect("link")
            == fs::canonicalize(self.release_dir(release, repo)).expect("release")
    }
}

#[test]
fn link_then_list_marks_live_release() {
    let fx = Fixture::new();
    fx.add_release("20240101000000", "main");
    fx.add_release("20240102000000", "dev");

    fx.cmd()
        .args(["link", "20240102000000"])
        .assert()
        .success()
        .stdout(contains("20240102000000"));
    assert!(fx.points_at("ui", "20240102000000"));
    assert_eq!(fx.state("api")["currentBranch"], "dev");

    let output = fx
        .cmd()
        .args(["list", "--json"])
        .output()
        .expect("list");
    assert!(output.status.success());
    let entries: serde_json::Value = serde_json::from_slice(&output.stdout).expect("json");
    assert_eq!(entries[0]["release"], "20240101000000");
    assert_eq!(entries[0]["current"], false);
    assert_eq!(entries[1]["current"], true);
    assert_eq!(entries[1]["branches"][0]["branch"], "dev");
}

#[test]
fn rollback_returns_to_previous_release() {
    let fx = Fixture::new();
    fx.add_release("20240101000000", "main");
    fx.add_release("20240102000000", "dev");
    fx.cmd().args(["link", "20240102000000"]).assert().success();

    fx.cmd().arg("rollback").assert().success();
    assert!(fx.points_at("ui", "20240101000000"));
    assert!(fx.points_at("api", "20240101000000"));
    assert_eq!(fx.state("ui")["currentRelease"], "20240101000000");
    assert_eq!(fx.state("ui")["currentBranch"], "main");
}

#[test]
fn rollback_without_history_fails() {
    let fx = Fixture::new();
    fx.add_release("20240101000000", "main");
    fx.cmd()
        .arg("rollback")
        .assert()
        .failure()
        .stderr(contains("current release information"));
}

#[test]
fn link_unknown_release_fails_and_keeps_link() {
    let fx = Fixture::new();
    fx.add_release("20240101000000", "main");
    fx.cmd().args(["link", "20240101000000"]).assert().success();

    fx.cmd()
        .args(["link", "20991231000000"])
        .assert()
        .failure()
        .stderr(contains("cannot find release directory"));
    assert!(fx.points_at("ui", "20240101000000"));
}

#[test]
fn prune_with_yes_keeps_requested_count_and_live_release() {
    let fx = Fixture::new();
    for release in ["20240101000000", "20240102000000", "20240103000000", "20240104000000"] {
        fx.add_release(release, "main");
    }
    fx.cmd().args(["link", "20240101000000"]).assert().success();

    fx.cmd().args(["-y", "prune", "2"]).assert().success();

    let releases = fx.base.path().join("releases/prod");
    assert!(releases.join("20240101000000").exists());
    assert!(!releases.join("20240102000000").exists());
    assert!(releases.join("20240103000000").exists());
    assert!(releases.join("20240104000000").exists());
}

#[test]
fn declined_prune_deletes_nothing() {
    let fx = Fixture::new();
    fx.add_release("20240101000000", "main");
    fx.add_release("20240102000000", "main");

    assert_cmd::Command::from_std(fx.cmd())
        .args(["prune", "all"])
        .write_stdin("n\n")
        .assert()
        .success()
        .stdout(contains("20240101000000"));
    assert!(fx.release_dir("20240101000000", "ui").exists());
}

#[test]
fn prune_rejects_bad_spec() {
    let fx = Fixture::new();
    fx.cmd()
        .args(["-y", "prune", "some"])
        .assert()
        .failure()
        .stderr(contains("invalid prune"));
}

#[test]
fn missing_base_dir_is_reported() {
    let fx = Fixture::new();
    let gone = fx.base.path().join("unmounted");
    let yaml = format!(
        "base_dir: {}\ntargets:\n  prod:\n    repos:\n      ui:\n        origin: x\n",
        gone.display()
    );
    fs::write(fx.home.path().join(".stagehand.yaml"), yaml).expect("config");

    fx.cmd()
        .arg("list")
        .assert()
        .failure()
        .stderr(contains("cannot find base directory"));
    assert!(!gone.exists());
}

#[test]
fn unknown_target_is_reported() {
    let fx = Fixture::new();
    fx.cmd()
        .args(["-t", "staging", "list"])
        .assert()
        .failure()
        .stderr(contains("unknown target 'staging'"));
}

#[test]
fn configure_writes_example_and_refuses_overwrite() {
    let home = TempDir::new().expect("home");
    let run = || {
        let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("stagehand"));
        cmd.env("HOME", home.path())
            .env("USERPROFILE", home.path())
            .env_remove("STAGEHAND_CONFIG");
        cmd
    };

    run().arg("configure").assert().success();
    let written = fs::read_to_string(home.path().join(".stagehand.yaml")).expect("config");
    assert!(written.contains("targets:"));

    run()
        .arg("configure")
        .assert()
        .failure()
        .stderr(contains("already exists"));
    run().args(["configure", "--force"]).assert().success();
}

#[test]
fn missing_config_points_at_configure() {
    let home = TempDir::new().expect("home");
    Command::new(assert_cmd::cargo::cargo_bin!("stagehand"))
        .env("HOME", home.path())
        .env("USERPROFILE", home.path())
        .env_remove("STAGEHAND_CONFIG")
        .arg("list")
        .assert()
        .failure()
        .stderr(contains("stagehand configure"));
}

#[test]
fn config_flag_overrides_home() {
    let fx = Fixture::new();
    let elsewhere = fx.home.path().join("other.yaml");
    fs::rename(fx.home.path().join(".stagehand.yaml"), &elsewhere).expect("move config");

    fx.cmd()
        .arg("--config")
        .arg(&elsewhere)
        .arg("list")
        .assert()
        .success()
        .stdout(contains("No releases"));
}

// ---------------------------------------------------------------------------
// Full build against a local git repository
// ---------------------------------------------------------------------------

fn git_available() -> bool {
    Command::new("git")
        .arg("--version")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

fn git(dir: &Path, args: &[&str]) {
    let status = Command::new("git")
        .arg("-C")
        .arg(dir)
        .args(args)
        .env("GIT_AUTHOR_NAME", "test")
        .env("GIT_AUTHOR_EMAIL", "test@example.com")
        .env("GIT_COMMITTER_NAME", "test")
        .env("GIT_COMMITTER_EMAIL", "test@example.com")
        .status()
        .expect("git");
    assert!(status.success(), "git {args:?} failed");
}

fn origin_repo(root: &Path, name: &str) -> PathBuf {
    let dir = root.join(name);
    fs::create_dir_all(&dir).expect("origin dir");
    git(&dir, &["init", "-q"]);
    fs::write(dir.join("build.sh"), "echo built > built.txt\n").expect("build script");
    git(&dir, &["add", "."]);
    git(&dir, &["commit", "-q", "-m", "initial"]);
    git(&dir, &["branch", "-M", "main"]);
    dir
}

#[test]
fn deploy_with_yes_builds_and_links() {
    if !git_available() {
        eprintln!("git not available; skipping");
        return;
    }
    let fx = Fixture::new();
    let origins = TempDir::new().expect("origins");
    let ui = origin_repo(origins.path(), "ui");
    let api = origin_repo(origins.path(), "api");
    fx.write_config(&ui.display().to_string(), &api.display().to_string());

    fx.cmd()
        .args(["-y", "-n", "deploy", "main"])
        .assert()
        .success()
        .stdout(contains("is live"));

    let state = fx.state("ui");
    let release = state["currentRelease"].as_str().expect("release").to_string();
    assert_eq!(state["currentBranch"], "main");
    assert!(fx.points_at("ui", &release));
    assert!(fx.points_at("api", &release));
    assert_eq!(
        fs::read_to_string(fx.release_dir(&release, "api").join("built.txt"))
            .expect("build output")
            .trim(),
        "built"
    );
    assert!(fx.base.path().join("repos/ui/.git").exists());
}
