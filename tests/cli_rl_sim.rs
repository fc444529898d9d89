use std::fs;
use std::path::PathBuf;
use std::process::Command;
use std::time::{SystemTime, UNIX_EPOCH};

fn unique_temp_dir(prefix: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("time went backwards")
        .as_nanos();
    let dir = std::env::temp_dir().join(format!(
        "routerl-rs-{prefix}-{}-{nanos}",
        std::process::id()
    ));
    fs::create_dir_all(&dir).expect("create temp dir");
    dir
}

fn write_file(dir: &PathBuf, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, contents).expect("write temp file");
    path
}

fn step_reward_lines(stdout: &str) -> Vec<&str> {
    stdout
        .lines()
        .filter(|line| line.starts_with("step_reward "))
        .collect()
}

const RING4_CONFIG: &str = r#"
{
    "node_count": 4,
    "strategy": "convention",
    "topology": "0,1,0,1,1,0,1,0,0,1,0,1,1,0,1,0",
    "init_table": "0,1,0.1;0,3,0.3;1,0,1.0;1,2,1.2;2,1,2.1;2,3,2.3;3,0,3.0;3,2,3.2;0,2,0.1.2;2,0,2.1.0;1,3,1.0.3;3,1,3.0.1",
    "step_duration_ms": 10,
    "total_steps": 3,
    "seed": 5,
    "traffic": { "flow_rate_mbps": 8.0 }
}
"#;

#[test]
fn offline_run_prints_one_reward_per_step() {
    let dir = unique_temp_dir("offline");
    let config = write_file(&dir, "session.json", RING4_CONFIG);

    let output = Command::new(env!("CARGO_BIN_EXE_rl_sim"))
        .args(["--config", config.to_str().unwrap(), "--offline"])
        .env("RUST_LOG", "warn")
        .output()
        .expect("run rl_sim");
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.lines().any(|l| l.starts_with("done @ ")), "{stdout}");
    let rewards = step_reward_lines(&stdout);
    assert_eq!(rewards.len(), 3, "{stdout}");
    assert!(rewards.iter().all(|l| l.contains("loss_rate=0.000000")));
}

#[test]
fn flags_override_strategy_and_step_count() {
    let dir = unique_temp_dir("override");
    let config = write_file(&dir, "session.json", RING4_CONFIG);

    let output = Command::new(env!("CARGO_BIN_EXE_rl_sim"))
        .args([
            "--config",
            config.to_str().unwrap(),
            "--offline",
            "--strategy",
            "singlepath",
            "--return-mode",
            "distributed",
            "--total-steps",
            "2",
        ])
        .env("RUST_LOG", "warn")
        .output()
        .expect("run rl_sim");
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let stdout = String::from_utf8_lossy(&output.stdout);
    let rewards = step_reward_lines(&stdout);
    assert_eq!(rewards.len(), 2, "{stdout}");
    assert!(rewards.iter().all(|l| l.ends_with("entities=16")), "{stdout}");
}

#[test]
fn until_ms_zero_stops_before_any_step_closes() {
    let dir = unique_temp_dir("until");
    let config = write_file(&dir, "session.json", RING4_CONFIG);

    let output = Command::new(env!("CARGO_BIN_EXE_rl_sim"))
        .args([
            "--config",
            config.to_str().unwrap(),
            "--offline",
            "--until-ms",
            "0",
        ])
        .env("RUST_LOG", "warn")
        .output()
        .expect("run rl_sim");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(step_reward_lines(&stdout).is_empty(), "{stdout}");
    assert!(stdout.contains("closed_steps=0"), "{stdout}");
}

#[test]
fn unreachable_controller_exits_non_zero() {
    let dir = unique_temp_dir("unreachable");
    let config = write_file(
        &dir,
        "session.json",
        r#"{
            "node_count": 2,
            "strategy": "convention",
            "topology": "0,1,1,0",
            "controller": {
                "addr": "127.0.0.1:1",
                "connect_timeout_ms": 200,
                "request_timeout_ms": 200
            }
        }"#,
    );

    let output = Command::new(env!("CARGO_BIN_EXE_rl_sim"))
        .args(["--config", config.to_str().unwrap()])
        .env("RUST_LOG", "off")
        .output()
        .expect("run rl_sim");
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("no reply within 200 ms"), "{stderr}");
}

#[test]
fn invalid_config_exits_non_zero() {
    let dir = unique_temp_dir("invalid");
    let config = write_file(
        &dir,
        "session.json",
        r#"{ "node_count": 2, "strategy": "multipath", "topology": "0,1,1,0" }"#,
    );

    let output = Command::new(env!("CARGO_BIN_EXE_rl_sim"))
        .args(["--config", config.to_str().unwrap(), "--offline"])
        .env("RUST_LOG", "off")
        .output()
        .expect("run rl_sim");
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("invalid config"), "{stderr}");
}
