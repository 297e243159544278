//! End-to-end tests driving the `idspace` binary against a temporary
//! identity storage directory

use serde_json::Value;
use std::process::{Command, Output};
use tempfile::TempDir;

const ADDRESS: &str = "0xAbC0000000000000000000000000000000000001";

fn wallet_key() -> String {
    "11".repeat(32)
}

fn idspace(dir: &TempDir, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_idspace"))
        .arg("--log-level")
        .arg("error")
        .arg("--storage-dir")
        .arg(dir.path())
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .expect("failed to run idspace")
}

fn json_output(output: &Output) -> Value {
    assert!(
        output.status.success(),
        "idspace failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).expect("stdout should be JSON")
}

#[test]
fn test_login_then_status() {
    let dir = TempDir::new().unwrap();

    let before = json_output(&idspace(&dir, &["status", "--address", ADDRESS]));
    assert_eq!(before["loggedIn"], false);

    let key = wallet_key();
    let login = json_output(&idspace(&dir, &["login", "--address", ADDRESS, "--wallet-key", &key]));
    let did = login["did"].as_str().unwrap().to_string();
    assert!(did.starts_with("did:muport:Qm"));
    assert_eq!(login["address"], ADDRESS.to_lowercase());

    let after = json_output(&idspace(&dir, &["status", "--address", &ADDRESS.to_lowercase()]));
    assert_eq!(after["loggedIn"], true);
    assert_eq!(after["did"], did);
}

#[test]
fn test_open_space_persists_keyring() {
    let dir = TempDir::new().unwrap();
    let key = wallet_key();
    let open = |space: &str| {
        json_output(&idspace(
            &dir,
            &["open-space", "--address", ADDRESS, "--wallet-key", &key, "--space", space],
        ))
    };

    let first = open("music");
    assert_eq!(first["consent"], true);
    assert!(first["address"]
        .as_str()
        .unwrap()
        .ends_with("/3box.space.music.keyvalue"));

    let second = open("music");
    assert_eq!(second["consent"], false);
    open("games");

    let spaces = json_output(&idspace(&dir, &["spaces", "--address", ADDRESS]));
    assert_eq!(spaces["spaces"], serde_json::json!(["games", "music"]));
}

#[test]
fn test_logout_clears_identity() {
    let dir = TempDir::new().unwrap();
    let key = wallet_key();
    json_output(&idspace(&dir, &["login", "--address", ADDRESS, "--wallet-key", &key]));

    let logout = json_output(&idspace(&dir, &["logout", "--address", ADDRESS]));
    assert_eq!(logout["loggedOut"], true);

    let status = json_output(&idspace(&dir, &["status", "--address", ADDRESS]));
    assert_eq!(status["loggedIn"], false);

    let again = json_output(&idspace(&dir, &["logout", "--address", ADDRESS]));
    assert_eq!(again["loggedOut"], false);
}

#[test]
fn test_invalid_wallet_key_fails() {
    let dir = TempDir::new().unwrap();
    let output = idspace(&dir, &["login", "--address", ADDRESS, "--wallet-key", "0x1234"]);
    assert!(!output.status.success());
}
