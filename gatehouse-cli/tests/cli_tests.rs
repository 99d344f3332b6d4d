use std::collections::BTreeSet;
use std::path::Path;
use std::process::Command;

use assert_cmd::prelude::*;
use predicates::str::contains;
use tempfile::TempDir;

use gatehouse_core::types::{AuthProfile, CredentialMode, ProfileId};
use gatehouse_core::{store, AuthMode, BindMode, RuntimeConfig};

fn gatehouse_cmd(home: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("gatehouse"));
    cmd.env("HOME", home)
        .env("USERPROFILE", home)
        .env_remove("RUST_LOG");
    cmd
}

fn write_token_config(home: &Path) -> RuntimeConfig {
    let mut config = RuntimeConfig::default();
    config.gateway.bind = BindMode::Lan;
    config.gateway.auth.mode = AuthMode::Token;
    config.gateway.auth.token = Some("tok-very-secret-123".into());
    config.auth_profiles.push(AuthProfile {
        profile_id: ProfileId::from("anthropic:default"),
        provider: "anthropic".into(),
        mode: CredentialMode::ApiKey,
    });
    store::write_at(home, &config).expect("write config");
    config
}

#[test]
fn help_lists_every_command() {
    let home = TempDir::new().expect("home");
    gatehouse_cmd(home.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(contains("configure"))
        .stdout(contains("daemon"))
        .stdout(contains("node"))
        .stdout(contains("config"));
}

#[test]
fn config_show_json_on_fresh_home_reports_defaults() {
    let home = TempDir::new().expect("home");
    let assert = gatehouse_cmd(home.path())
        .args(["config", "show", "--json"])
        .assert()
        .success();
    let stdout = String::from_utf8(assert.get_output().stdout.clone()).expect("stdout utf8");
    let payload: serde_json::Value = serde_json::from_str(&stdout).expect("parse config json");

    let keys: BTreeSet<String> = payload
        .as_object()
        .expect("root object")
        .keys()
        .cloned()
        .collect();
    let expected: BTreeSet<String> = ["path", "exists", "valid", "issues", "config"]
        .into_iter()
        .map(str::to_string)
        .collect();
    assert_eq!(keys, expected, "config show schema changed");
    assert_eq!(payload["exists"], false);
    assert_eq!(payload["config"]["gateway"]["port"], 18789);
    assert_eq!(payload["config"]["gateway"]["bind"], "loopback");
}

#[test]
fn config_show_never_prints_the_gateway_token() {
    let home = TempDir::new().expect("home");
    write_token_config(home.path());

    let assert = gatehouse_cmd(home.path())
        .args(["config", "show", "--json"])
        .assert()
        .success();
    let stdout = String::from_utf8(assert.get_output().stdout.clone()).expect("stdout utf8");
    assert!(!stdout.contains("tok-very-secret-123"));
    let payload: serde_json::Value = serde_json::from_str(&stdout).expect("parse config json");
    assert_eq!(payload["valid"], true);
    assert_eq!(payload["config"]["gateway"]["auth"]["token"], "[REDACTED]");

    let assert = gatehouse_cmd(home.path())
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(contains("gateway.bind: lan"))
        .stdout(contains("[REDACTED]"));
    let text = String::from_utf8(assert.get_output().stdout.clone()).expect("stdout utf8");
    assert!(!text.contains("tok-very-secret-123"));
}

#[test]
fn config_show_renders_auth_profile_table() {
    let home = TempDir::new().expect("home");
    write_token_config(home.path());

    gatehouse_cmd(home.path())
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(contains("profile"))
        .stdout(contains("anthropic:default"))
        .stdout(contains("api_key"));
}

#[test]
fn config_show_flags_invalid_file() {
    let home = TempDir::new().expect("home");
    let dir = home.path().join(".gatehouse");
    std::fs::create_dir_all(&dir).expect("state dir");
    std::fs::write(
        dir.join("gatehouse.yaml"),
        "gateway:\n  bind: lan\n  auth:\n    mode: off\n",
    )
    .expect("write config");

    gatehouse_cmd(home.path())
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(contains("invalid"))
        .stdout(contains("Issues"));
}

#[test]
fn unknown_section_is_rejected_before_prompting() {
    let home = TempDir::new().expect("home");
    gatehouse_cmd(home.path())
        .args(["configure", "--section", "workspace,bogus"])
        .assert()
        .failure()
        .stderr(contains("unknown section"));
}
