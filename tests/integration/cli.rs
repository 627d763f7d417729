use crate::common::{UpdateServer, appcast_cmd, write_cli_config};
use predicates::prelude::*;
use tempfile::TempDir;

const UNREACHABLE: &str = "http://127.0.0.1:9/appcast.json";

#[test]
fn test_help_lists_commands() {
    let temp = TempDir::new().unwrap();
    appcast_cmd(temp.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("check"))
        .stdout(predicate::str::contains("install"))
        .stdout(predicate::str::contains("watch"));
}

#[test]
fn test_status_without_server_url() {
    let temp = TempDir::new().unwrap();
    write_cli_config(temp.path(), "1.0.0", None);

    appcast_cmd(temp.path())
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("1.0.0"))
        .stdout(predicate::str::contains("(not set)"))
        .stdout(predicate::str::contains("EveryDay"));
}

#[test]
fn test_check_without_server_url_fails() {
    let temp = TempDir::new().unwrap();
    write_cli_config(temp.path(), "1.0.0", None);

    appcast_cmd(temp.path())
        .args(["check", "--force"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("No update server configured"));
}

#[test]
fn test_check_unreachable_server_fails() {
    let temp = TempDir::new().unwrap();
    write_cli_config(temp.path(), "1.0.0", Some(UNREACHABLE));

    appcast_cmd(temp.path())
        .args(["check", "--force"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Update check failed"))
        .stderr(predicate::str::contains("network error"));
}

#[test]
fn test_frequency_is_persisted() {
    let temp = TempDir::new().unwrap();
    write_cli_config(temp.path(), "1.0.0", None);

    appcast_cmd(temp.path()).args(["frequency", "every-week"]).assert().success();
    appcast_cmd(temp.path())
        .arg("frequency")
        .assert()
        .success()
        .stdout(predicate::str::diff("EveryWeek\n"));

    let settings = std::fs::read_to_string(temp.path().join("settings.toml")).unwrap();
    assert!(settings.contains("EveryWeek"));
}

#[test]
fn test_unknown_frequency_is_rejected() {
    let temp = TempDir::new().unwrap();
    write_cli_config(temp.path(), "1.0.0", None);

    appcast_cmd(temp.path())
        .args(["frequency", "sometimes"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown check frequency"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_check_reports_available_update() {
    let server = UpdateServer::start().await;
    server.publish("2.0.0", b"installer bytes");
    let temp = TempDir::new().unwrap();
    write_cli_config(temp.path(), "1.0.0", Some(&server.appcast_url()));

    appcast_cmd(temp.path())
        .args(["check", "--force"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Update available"))
        .stdout(predicate::str::contains("2.0.0"))
        .stdout(predicate::str::contains("changelog-2.0.md"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_passive_check_respects_frequency() {
    let server = UpdateServer::start().await;
    server.publish("1.0.0", b"installer bytes");
    let temp = TempDir::new().unwrap();
    write_cli_config(temp.path(), "1.0.0", Some(&server.appcast_url()));

    appcast_cmd(temp.path())
        .arg("check")
        .assert()
        .success()
        .stdout(predicate::str::contains("is up to date"));
    appcast_cmd(temp.path())
        .arg("check")
        .assert()
        .success()
        .stdout(predicate::str::contains("No check due"));

    assert_eq!(server.hits(crate::common::APPCAST_PATH), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_dry_install_downloads_and_verifies() {
    let server = UpdateServer::start().await;
    server.publish("2.0.0", b"installer bytes");
    let temp = TempDir::new().unwrap();
    write_cli_config(temp.path(), "1.0.0", Some(&server.appcast_url()));

    appcast_cmd(temp.path())
        .args(["install", "--dry"])
        .assert()
        .success()
        .stdout(predicate::str::contains("installer downloaded and verified"))
        .stdout(predicate::str::contains("Installer verified, not installed"));

    assert!(temp.path().join("Update").join("installer-2.0.exe").is_file());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_install_moves_installer_with_move_to() {
    let server = UpdateServer::start().await;
    server.publish("2.0.0", b"installer bytes");
    let temp = TempDir::new().unwrap();
    let destination = temp.path().join("Downloads");
    std::fs::create_dir_all(&destination).unwrap();
    write_cli_config(temp.path(), "1.0.0", Some(&server.appcast_url()));

    appcast_cmd(temp.path())
        .args(["install", "--move-to"])
        .arg(&destination)
        .assert()
        .success()
        .stdout(predicate::str::contains("Installer moved to"));

    assert!(destination.join("installer-2.0.exe").is_file());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_quiet_check_prints_nothing() {
    let server = UpdateServer::start().await;
    server.publish("2.0.0", b"installer bytes");
    let temp = TempDir::new().unwrap();
    write_cli_config(temp.path(), "1.0.0", Some(&server.appcast_url()));

    appcast_cmd(temp.path())
        .args(["-q", "check", "--force"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty());
}
