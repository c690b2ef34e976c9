//! CLI integration tests
//!
//! These drive the built binary against a fake engine: a shell script that appends
//! its arguments to a log file and exits with a configurable status.
#![cfg(unix)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

const TEMPLATE: &str = "FROM centos:{{ platform }}\nLABEL pkg={{ package }}-{{ version }}-{{ revision }}\n";

/// Environment variables the binary reads; cleared so the host cannot leak in
const ENV_VARS: [&str; 8] = [
    "PACKAGE",
    "TEMPLATE",
    "VERSION",
    "REV",
    "DOCKER_BIN",
    "BUILDOS",
    "DISABLE_CACHE",
    "RPMBOX_BASE_DIR",
];

struct Fixture {
    dir: TempDir,
    engine: PathBuf,
    log: PathBuf,
}

impl Fixture {
    /// `fail_on` makes the fake engine exit 1 for that subcommand
    fn new(fail_on: Option<&str>) -> Self {
        let dir = TempDir::new().expect("Failed to create temp dir");
        fs::create_dir_all(dir.path().join("demo")).unwrap();
        fs::write(dir.path().join("demo/Dockerfile.in"), TEMPLATE).unwrap();

        let log = dir.path().join("engine.log");
        let engine = dir.path().join("fake-engine");
        let script = format!(
            "#!/bin/sh\necho \"$@\" >> \"{}\"\nif [ \"$1\" = \"{}\" ]; then exit 1; fi\nexit 0\n",
            log.display(),
            fail_on.unwrap_or("__never__")
        );
        fs::write(&engine, script).unwrap();
        fs::set_permissions(&engine, fs::Permissions::from_mode(0o755)).unwrap();

        Self { dir, engine, log }
    }

    fn base(&self) -> &Path {
        self.dir.path()
    }

    fn run(&self, args: &[&str]) -> Output {
        self.run_with_env(args, &[])
    }

    fn run_with_env(&self, args: &[&str], vars: &[(&str, &str)]) -> Output {
        let mut command = Command::new(env!("CARGO_BIN_EXE_rpmbox"));
        for var in ENV_VARS {
            command.env_remove(var);
        }
        command.envs(vars.iter().copied());
        command
            .arg("--quiet")
            .args(args)
            .arg("--base-dir")
            .arg(self.base())
            .output()
            .expect("Failed to execute rpmbox")
    }

    fn build(&self, extra: &[&str]) -> Output {
        let engine = self.engine.display().to_string();
        let mut args = vec!["build", "-p", "demo", "-d", engine.as_str()];
        args.extend_from_slice(extra);
        self.run(&args)
    }

    fn engine_calls(&self) -> Vec<String> {
        fs::read_to_string(&self.log)
            .map(|s| s.lines().map(str::to_string).collect())
            .unwrap_or_default()
    }
}

#[test]
fn test_cli_help() {
    let output = Command::new(env!("CARGO_BIN_EXE_rpmbox"))
        .arg("--help")
        .output()
        .expect("Failed to execute rpmbox");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("build"));
    assert!(stdout.contains("render"));
}

#[test]
fn test_build_single_platform() {
    let fixture = Fixture::new(None);
    let output = fixture.build(&["-v", "1.0", "-r", "1", "-b", "el7"]);

    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let calls = fixture.engine_calls();
    assert_eq!(calls.len(), 4, "calls: {:?}", calls);
    assert_eq!(calls[0], "build -t demo:build_el7 .");

    let run: Vec<&str> = calls[1].split(' ').collect();
    assert_eq!(run[0], "run");
    assert_eq!(run[1], "--name");
    assert!(run[2].starts_with("demo"));
    assert_eq!(run[3], "demo:build_el7");
    let instance = run[2];

    assert_eq!(
        calls[2],
        format!(
            "cp {}:/demo/demo-1.0-1.x86_64.rpm {}/pkg/demo/el7/",
            instance,
            fixture.base().display()
        )
    );
    assert_eq!(calls[3], format!("stop {}", instance));

    assert_eq!(
        fs::read_to_string(fixture.base().join("demo/Dockerfile")).unwrap(),
        "FROM centos:el7\nLABEL pkg=demo-1.0-1\n"
    );

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Built demo for 1 platform(s)"));
}

#[test]
fn test_build_default_platforms_and_revision() {
    let fixture = Fixture::new(None);
    let output = fixture.build(&["-v", "2.0"]);
    assert!(output.status.success());

    let builds: Vec<String> = fixture
        .engine_calls()
        .into_iter()
        .filter(|c| c.starts_with("build"))
        .collect();
    assert_eq!(
        builds,
        vec![
            "build -t demo:build_el5 .",
            "build -t demo:build_el6 .",
            "build -t demo:build_el7 .",
        ]
    );
    assert!(fixture
        .engine_calls()
        .iter()
        .any(|c| c.contains("/demo/demo-2.0-0.x86_64.rpm")));
}

#[test]
fn test_build_disable_cache() {
    let fixture = Fixture::new(None);
    let output = fixture.build(&["-v", "1.0", "-b", "el7", "--disable-cache"]);
    assert!(output.status.success());
    assert_eq!(
        fixture.engine_calls()[0],
        "build -t demo:build_el7 --no-cache=true ."
    );
}

#[test]
fn test_build_disable_cache_from_env() {
    let fixture = Fixture::new(None);
    let engine = fixture.engine.display().to_string();
    let output = fixture.run_with_env(
        &["build", "-p", "demo", "-d", engine.as_str(), "-v", "1.0", "-b", "el7"],
        &[("DISABLE_CACHE", "1")],
    );
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    assert_eq!(
        fixture.engine_calls()[0],
        "build -t demo:build_el7 --no-cache=true ."
    );
}

#[test]
fn test_missing_version() {
    let fixture = Fixture::new(None);
    let output = fixture.build(&["-b", "el7"]);

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Please specify a version"));
    assert!(fixture.engine_calls().is_empty());
}

#[test]
fn test_build_failure_is_fatal() {
    let fixture = Fixture::new(Some("build"));
    let output = fixture.build(&["-v", "1.0", "-b", "el6,el7"]);

    assert!(!output.status.success());
    assert_eq!(fixture.engine_calls(), vec!["build -t demo:build_el6 ."]);
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("build step failed for platform el6"));
}

#[test]
fn test_copy_failure_stops_instance() {
    let fixture = Fixture::new(Some("cp"));
    let output = fixture.build(&["-v", "1.0", "-b", "el7"]);

    assert!(!output.status.success());
    let calls = fixture.engine_calls();
    assert_eq!(calls.len(), 4);
    assert!(calls[3].starts_with("stop demo"));
}

#[test]
fn test_empty_platform_list() {
    let fixture = Fixture::new(None);
    let output = fixture.build(&["-v", "1.0", "-b", ""]);

    assert!(output.status.success());
    assert!(fixture.engine_calls().is_empty());
}

#[test]
fn test_missing_template() {
    let fixture = Fixture::new(None);
    fs::remove_file(fixture.base().join("demo/Dockerfile.in")).unwrap();
    let output = fixture.build(&["-v", "1.0", "-b", "el7"]);

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Dockerfile.in"));
    assert!(fixture.engine_calls().is_empty());
}

#[test]
fn test_render_to_stdout() {
    let fixture = Fixture::new(None);
    let output = fixture.run(&["render", "-p", "demo", "-v", "3.1", "--platform", "el6"]);

    assert!(output.status.success());
    assert_eq!(
        String::from_utf8_lossy(&output.stdout),
        "FROM centos:el6\nLABEL pkg=demo-3.1-0\n"
    );
    assert!(fixture.engine_calls().is_empty());
}

#[test]
fn test_render_undefined_variable() {
    let fixture = Fixture::new(None);
    fs::write(fixture.base().join("demo/Dockerfile.in"), "FROM {{ os }}\n").unwrap();
    let output = fixture.run(&["render", "-p", "demo", "-v", "1", "--platform", "el6"]);

    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("`os`"));
}

#[test]
fn test_build_rejects_undefined_variable_in_condition() {
    let fixture = Fixture::new(None);
    fs::write(
        fixture.base().join("demo/Dockerfile.in"),
        "FROM centos:{{ platform }}\n{% if nocache %}ARG CACHEBUST=1\n{% endif %}",
    )
    .unwrap();
    let output = fixture.build(&["-v", "1.0", "-b", "el7"]);

    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("`nocache`"));
    assert!(fixture.engine_calls().is_empty());
    assert!(!fixture.base().join("demo/Dockerfile").exists());
}
