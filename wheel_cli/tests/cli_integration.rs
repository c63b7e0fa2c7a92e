use assert_cmd::Command;
use predicates::prelude::*;
use rstest::rstest;
use std::io::Write;
use tempfile::NamedTempFile;

fn wheel() -> Command {
    Command::cargo_bin("wheel").unwrap()
}

fn write_config(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

const VALID_CONFIG: &str = r#"
[motor]
counts_per_rev = 64
gear_ratio = 30.0
max_rpm = 150.0

[pid]
kp = 2.0
ki = 0.1
kd = 0.05

[control_loop]
period_ms = 10

[safety]
heartbeat_timeout_ms = 5000
"#;

#[rstest]
#[case(&["--help"], 0, "Usage:", "stdout")]
#[case(&["--version"], 0, "wheel", "stdout")]
#[case(&["controller", "--help"], 0, "control loop", "stdout")]
#[case(&["bridge", "--help"], 0, "GUI", "stdout")]
#[case(&["frobnicate"], 2, "unrecognized subcommand", "stderr")]
fn cli_table_cases(
    #[case] args: &[&str],
    #[case] code: i32,
    #[case] needle: &str,
    #[case] stream: &str,
) {
    let assert = wheel().args(args).assert().code(code);
    match stream {
        "stdout" => assert.stdout(predicate::str::contains(needle)),
        _ => assert.stderr(predicate::str::contains(needle)),
    };
}

#[test]
fn controller_replies_on_stdout_and_exits_on_eof() {
    let cfg = write_config(VALID_CONFIG);
    wheel()
        .args(["--config", cfg.path().to_str().unwrap(), "controller"])
        .write_stdin("vel 30\nstatus\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("OK: velocity target 30.00 RPM"))
        .stdout(predicate::str::contains("Mode: velocity"));
}

#[test]
fn controller_runs_with_defaults_when_config_file_is_absent() {
    wheel()
        .args(["--config", "/nonexistent/wheel.toml", "controller"])
        .write_stdin("status\n")
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "Position: 0.00 degrees, Velocity: 0.00 RPM, Mode: idle",
        ));
}

#[test]
fn out_of_range_config_is_rejected() {
    let cfg = write_config("[motor]\nmax_rpm = -5.0\n");
    wheel()
        .args(["--config", cfg.path().to_str().unwrap(), "controller"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid config"));
}

#[test]
fn malformed_toml_is_rejected() {
    let cfg = write_config("[motor\nmax_rpm = ");
    wheel()
        .args(["--config", cfg.path().to_str().unwrap(), "controller"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("parsing config"));
}

#[test]
fn bridge_without_a_link_source_fails_with_a_hint() {
    let cfg = write_config(VALID_CONFIG);
    wheel()
        .args([
            "--config",
            cfg.path().to_str().unwrap(),
            "bridge",
            "--tcp-port",
            "0",
        ])
        .env_remove("WHEEL_SERIAL_PORT")
        .assert()
        .failure()
        .stderr(predicate::str::contains("no serial port configured"));
}
