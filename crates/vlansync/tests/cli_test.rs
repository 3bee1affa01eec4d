//! Integration tests for the `vlansync` CLI binary.
//!
//! Every test runs against the fixture transport and a temporary SQLite
//! store, so no device or user configuration is touched.
#![allow(clippy::unwrap_used)]

use std::path::{Path, PathBuf};

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use pretty_assertions::assert_eq;
use tempfile::TempDir;

// ── Helpers ─────────────────────────────────────────────────────────

/// Build a [`Command`] for the `vlansync` binary with env isolation.
fn vlansync_cmd(cwd: &Path) -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("vlansync");
    cmd.current_dir(cwd)
        .env("HOME", "/tmp/vlansync-cli-test-nonexistent")
        .env("XDG_CONFIG_HOME", "/tmp/vlansync-cli-test-nonexistent")
        .env_remove("VLANSYNC_CONFIG")
        .env_remove("VLANSYNC_OUTPUT")
        .env_remove("VLANSYNC_USERNAME")
        .env_remove("VLANSYNC_PASSWORD")
        .env_remove("USERNAME")
        .env_remove("PASSWORD")
        .env_remove("RUST_LOG");
    cmd
}

/// Concatenate stdout + stderr from a command output for flexible matching.
fn combined_output(output: &std::process::Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    format!("{stdout}{stderr}")
}

const CONFIG: &str = "
poller:
  workers: 1
  command_timeout_secs: 5
  logging_level: warn
store:
  engine: sqlite
  path: state/vlans.sqlite
transport:
  kind: fixture
  fixture_dir: captures
inventory_sources:
  file_list:
    - filename: inventory.yml
";

const SW1: &str = "
VLAN Name                             Status    Ports
---- -------------------------------- --------- -------------------------------
1    default                          active    Gi0/1, Gi0/2
10   users                            active    Gi0/3
110  voice                            active    Gi0/4
1002 fddi-default                     act/unsup
VLAN Type  SAID       MTU   Parent RingNo BridgeNo Stp  BrdgMode Trans1 Trans2
---- ----- ---------- ----- ------ ------ -------- ---- -------- ------ ------
1    enet  100001     1500  -      -      -        -    -        0      0
";

const SW2: &str = "
VLAN Name                             Status    Ports
---- -------------------------------- --------- -------------------------------
1    default                          active    Eth1/1
20   servers                          active    Eth1/2
";

/// A working directory with a config, an inventory and captured outputs.
struct Lab {
    dir: TempDir,
}

impl Lab {
    fn new(hosts: &[&str]) -> Self {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("vlansync.yml"), CONFIG).unwrap();

        let mut inventory = String::from(if hosts.is_empty() { "hosts: []\n" } else { "hosts:\n" });
        for (i, name) in hosts.iter().enumerate() {
            inventory.push_str(&format!(
                "  - {{name: {name}, host: 10.0.0.{}, device_type: cisco_ios, password: hunter2}}\n",
                i + 1
            ));
        }
        std::fs::write(dir.path().join("inventory.yml"), inventory).unwrap();

        let captures = dir.path().join("captures");
        std::fs::create_dir(&captures).unwrap();
        std::fs::write(captures.join("sw1.txt"), SW1).unwrap();
        std::fs::write(captures.join("sw2.txt"), SW2).unwrap();
        Self { dir }
    }

    fn path(&self) -> &Path {
        self.dir.path()
    }

    fn config(&self) -> PathBuf {
        self.path().join("vlansync.yml")
    }

    fn cmd(&self) -> assert_cmd::Command {
        let mut cmd = vlansync_cmd(self.path());
        cmd.arg("--config").arg(self.config());
        cmd
    }

    fn sync_json(&self) -> (Option<i32>, serde_json::Value) {
        let output = self.cmd().args(["-o", "json", "sync"]).output().unwrap();
        let summary = serde_json::from_slice(&output.stdout).unwrap();
        (output.status.code(), summary)
    }
}

fn statuses(summary: &serde_json::Value) -> Vec<(String, String)> {
    summary["reports"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| {
            (
                r["device"].as_str().unwrap().to_owned(),
                r["outcome"]["status"].as_str().unwrap().to_owned(),
            )
        })
        .collect()
}

fn pair(device: &str, status: &str) -> (String, String) {
    (device.to_owned(), status.to_owned())
}

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn test_no_args_shows_help() {
    let dir = tempfile::tempdir().unwrap();
    let output = vlansync_cmd(dir.path()).output().unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(combined_output(&output).contains("Usage"));
}

#[test]
fn test_help_flag() {
    let dir = tempfile::tempdir().unwrap();
    vlansync_cmd(dir.path()).arg("--help").assert().success().stdout(
        predicate::str::contains("sync")
            .and(predicate::str::contains("vlans"))
            .and(predicate::str::contains("devices")),
    );
}

#[test]
fn test_completions_bash() {
    let dir = tempfile::tempdir().unwrap();
    vlansync_cmd(dir.path())
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("vlansync"));
}

#[test]
fn test_bad_interval_is_usage_error() {
    let lab = Lab::new(&["sw1"]);
    lab.cmd()
        .args(["sync", "-p", "whenever"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("invalid interval"));
}

// ── Sync ────────────────────────────────────────────────────────────

#[test]
fn test_sync_populates_store_then_settles() {
    let lab = Lab::new(&["sw1", "sw2"]);

    let (code, first) = lab.sync_json();
    assert_eq!(code, Some(0));
    assert_eq!(
        statuses(&first),
        vec![pair("sw1", "updated"), pair("sw2", "updated")]
    );
    assert_eq!(first["reports"][0]["outcome"]["applied"], 4);
    assert_eq!(first["reports"][0]["catalog_added"], 4);
    assert_eq!(first["reports"][1]["catalog_added"], 1);
    assert!(lab.path().join("state/vlans.sqlite").is_file());

    let (code, second) = lab.sync_json();
    assert_eq!(code, Some(0));
    assert_eq!(
        statuses(&second),
        vec![pair("sw1", "synced"), pair("sw2", "synced")]
    );
}

#[test]
fn test_sync_table_output_summarizes_the_run() {
    let lab = Lab::new(&["sw1"]);
    lab.cmd()
        .args(["--color", "never", "sync"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("sw1")
                .and(predicate::str::contains("1 updated"))
                .and(predicate::str::contains("4 catalog addition(s)")),
        );
}

#[test]
fn test_missing_capture_is_partial_failure() {
    let lab = Lab::new(&["sw1", "sw3"]);
    let (code, summary) = lab.sync_json();
    assert_eq!(code, Some(9));
    assert_eq!(
        statuses(&summary),
        vec![pair("sw1", "updated"), pair("sw3", "transport_failed")]
    );
    assert_eq!(
        summary["reports"][1]["outcome"]["error"]["kind"],
        "connect_failure"
    );
}

#[test]
fn test_every_device_unreachable_is_connection_error() {
    let lab = Lab::new(&["sw3", "sw4"]);
    let output = lab.cmd().arg("sync").output().unwrap();
    assert_eq!(output.status.code(), Some(7));
    assert!(combined_output(&output).contains("Could not connect"));
}

#[test]
fn test_inventory_flag_replaces_configured_sources() {
    let lab = Lab::new(&["sw3"]);
    std::fs::write(
        lab.path().join("other.yml"),
        "hosts:\n  - {name: sw2, host: 10.9.9.9, device_type: cisco_ios}\n",
    )
    .unwrap();

    let output = lab
        .cmd()
        .args(["-o", "json", "sync", "-i", "other.yml"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(0));
    let summary: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(statuses(&summary), vec![pair("sw2", "updated")]);
}

#[test]
fn test_empty_inventory_is_startup_error() {
    let lab = Lab::new(&[]);
    let output = lab.cmd().arg("sync").output().unwrap();
    assert_eq!(output.status.code(), Some(1));
    assert!(combined_output(&output).contains("No devices"));
}

#[test]
fn test_unknown_device_type_leaves_store_alone() {
    let lab = Lab::new(&["sw1"]);
    std::fs::write(
        lab.path().join("inventory.yml"),
        "hosts:\n  - {name: sw1, host: 10.0.0.1, device_type: juniper_junos}\n",
    )
    .unwrap();

    let (code, summary) = lab.sync_json();
    assert_eq!(code, Some(0));
    assert_eq!(statuses(&summary), vec![pair("sw1", "parse_empty")]);
    lab.cmd().args(["vlans", "device", "sw1"]).assert().code(4);
}

// ── Vlans ───────────────────────────────────────────────────────────

#[test]
fn test_vlans_after_sync() {
    let lab = Lab::new(&["sw1", "sw2"]);
    lab.cmd().arg("sync").assert().success();

    lab.cmd()
        .args(["-o", "plain", "vlans", "device", "sw1"])
        .assert()
        .success()
        .stdout("1\n10\n110\n1002\n");

    let output = lab.cmd().args(["-o", "json", "vlans", "list"]).output().unwrap();
    let catalog: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let ids: Vec<&str> = catalog
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["1", "10", "110", "1002", "20"]);
    assert_eq!(catalog[2]["description"], "change_me");

    lab.cmd()
        .args(["-o", "plain", "vlans", "devices"])
        .assert()
        .success()
        .stdout("sw1\nsw2\n");
}

#[test]
fn test_unknown_device_is_not_found() {
    let lab = Lab::new(&["sw1"]);
    let output = lab.cmd().args(["vlans", "device", "ghost"]).output().unwrap();
    assert_eq!(output.status.code(), Some(4));
    assert!(combined_output(&output).contains("vlans devices"));
}

#[test]
fn test_set_description_and_remove() {
    let lab = Lab::new(&["sw1"]);
    lab.cmd().arg("sync").assert().success();

    lab.cmd()
        .args(["vlans", "set-description", "110", "VoIP handsets"])
        .assert()
        .success();
    lab.cmd()
        .args(["-o", "json", "vlans", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("VoIP handsets"));

    lab.cmd()
        .args(["vlans", "set-description", "999", "nothing"])
        .assert()
        .code(4);

    // stdin is not a terminal under the harness
    lab.cmd().args(["vlans", "remove", "110"]).assert().code(2);
    lab.cmd().args(["-y", "vlans", "remove", "110"]).assert().success();
    lab.cmd().args(["-y", "vlans", "remove", "110"]).assert().code(4);

    // The device record is independent of the catalog entry.
    lab.cmd()
        .args(["-o", "plain", "vlans", "device", "sw1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("110"));
}

// ── Devices ─────────────────────────────────────────────────────────

#[test]
fn test_devices_list_hides_passwords() {
    let lab = Lab::new(&["sw1", "sw2"]);
    for format in ["table", "json", "yaml"] {
        lab.cmd()
            .args(["-o", format, "devices", "list"])
            .assert()
            .success()
            .stdout(predicate::str::contains("sw2").and(predicate::str::contains("hunter2").not()));
    }
}

// ── Config ──────────────────────────────────────────────────────────

#[test]
fn test_missing_config_file() {
    let dir = tempfile::tempdir().unwrap();
    let output = vlansync_cmd(dir.path())
        .args(["--config", "nope.yml", "vlans", "list"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));
    assert!(combined_output(&output).contains("config file not found"));
}

#[test]
fn test_config_init_refuses_to_overwrite() {
    let dir = tempfile::tempdir().unwrap();
    vlansync_cmd(dir.path())
        .args(["config", "init"])
        .assert()
        .success();
    let written = std::fs::read_to_string(dir.path().join("vlansync.yml")).unwrap();
    assert!(written.contains("inventory.yml"));

    vlansync_cmd(dir.path())
        .args(["config", "init"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("refusing to overwrite"));
    vlansync_cmd(dir.path())
        .args(["config", "init", "--force"])
        .assert()
        .success();

    vlansync_cmd(dir.path())
        .args(["config", "init", "--path", "alt/vlansync.toml"])
        .assert()
        .success();
    let toml = std::fs::read_to_string(dir.path().join("alt/vlansync.toml")).unwrap();
    assert!(toml.contains("[poller]"));
}

#[test]
fn test_config_show_merges_environment() {
    let lab = Lab::new(&["sw1"]);
    lab.cmd()
        .env("VLANSYNC_POLLER__WORKERS", "12")
        .args(["-o", "json", "config", "show"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("\"workers\": 12")
                .and(predicate::str::contains("\"kind\": \"fixture\"")),
        );
}

#[test]
fn test_config_path_discovers_working_directory_file() {
    let lab = Lab::new(&["sw1"]);
    vlansync_cmd(lab.path())
        .args(["config", "path"])
        .assert()
        .success()
        .stdout("vlansync.yml\n");
}
