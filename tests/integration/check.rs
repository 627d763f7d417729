use crate::common::{APPCAST_PATH, CHANGELOG_TEXT, TestEngine, UpdateServer, list_files};
use appcast_updater::core::UpdateError;
use appcast_updater::engine::{EngineState, UpdateAvailability, UpdateEvent};
use appcast_updater::settings::{LAST_CHECK_TIME_KEY, LAST_MANIFEST_KEY, SettingsStore};
use axum::http::StatusCode;
use chrono::NaiveDate;
use semver::Version;

#[tokio::test]
async fn test_newer_version_is_available_and_changelog_downloaded() {
    let server = UpdateServer::start().await;
    server.publish("2.0.0", b"installer bytes");

    let mut t = TestEngine::new("1.0.0", &server.appcast_url());
    t.engine.force_check_for_update().await;
    let events = t.drain();

    assert_eq!(t.engine.state(), EngineState::Idle);
    assert!(t.engine.update_available());
    assert_eq!(t.engine.latest_version(), &Version::new(2, 0, 0));
    assert_eq!(t.engine.latest_version_date(), NaiveDate::from_ymd_opt(2021, 1, 1));

    assert!(events.contains(&UpdateEvent::CheckStarted));
    assert!(events.contains(&UpdateEvent::CheckFinished));
    assert!(events.contains(&UpdateEvent::LatestVersionChanged(Version::new(2, 0, 0))));
    assert!(events.contains(&UpdateEvent::UpdateAvailabilityChanged(UpdateAvailability::Available)));
    assert!(!events.iter().any(|e| matches!(e, UpdateEvent::CheckFailed(_))));

    // The changelog download starts on its own once the check is done
    let finished = events.iter().position(|e| *e == UpdateEvent::CheckFinished).unwrap();
    let started = events.iter().position(|e| *e == UpdateEvent::ChangelogDownloadStarted).unwrap();
    assert!(started > finished);
    assert!(events.contains(&UpdateEvent::ChangelogDownloadFinished));
    assert!(t.engine.changelog_available());
    assert!(!t.engine.installer_available());
    assert_eq!(t.engine.latest_changelog(), CHANGELOG_TEXT);

    assert_eq!(list_files(&t.working_dir()), vec!["changelog-2.0.md", "installer-2.0.json"]);
    let saved = t.settings.get(LAST_MANIFEST_KEY).unwrap();
    assert!(saved.ends_with("installer-2.0.json"));
    assert!(t.settings.get(LAST_CHECK_TIME_KEY).is_some());
}

#[tokio::test]
async fn test_same_version_is_up_to_date() {
    let server = UpdateServer::start().await;
    let fixture = server.publish("1.0.0", b"installer bytes");

    let mut t = TestEngine::new("1.0.0", &server.appcast_url());
    t.engine.force_check_for_update().await;
    let events = t.drain();

    assert!(!t.engine.update_available());
    assert_eq!(t.engine.update_availability(), UpdateAvailability::UpToDate);
    assert_eq!(t.engine.latest_version(), &Version::new(1, 0, 0));
    assert!(events.contains(&UpdateEvent::UpdateAvailabilityChanged(UpdateAvailability::UpToDate)));
    assert!(!events.contains(&UpdateEvent::ChangelogDownloadStarted));

    let changelog_path = crate::common::path_of(fixture.document.changelog_url.as_deref().unwrap());
    assert_eq!(server.hits(&changelog_path), 0);
}

#[tokio::test]
async fn test_older_version_is_not_available() {
    let server = UpdateServer::start().await;
    server.publish("1.9.9", b"installer bytes");

    let mut t = TestEngine::new("2.0.0", &server.appcast_url());
    t.engine.force_check_for_update().await;

    assert!(!t.engine.update_available());
    assert_eq!(t.engine.update_availability(), UpdateAvailability::UpToDate);
    assert_eq!(t.engine.latest_version(), &Version::new(1, 9, 9));
}

#[tokio::test]
async fn test_server_error_status_is_a_network_failure() {
    let server = UpdateServer::start().await;
    server.serve_status(APPCAST_PATH, StatusCode::INTERNAL_SERVER_ERROR);

    let mut t = TestEngine::new("1.0.0", &server.appcast_url());
    t.engine.force_check_for_update().await;
    let events = t.drain();

    assert_eq!(t.engine.state(), EngineState::Idle);
    assert!(events.contains(&UpdateEvent::CheckOnlineFailed));
    assert!(events.contains(&UpdateEvent::CheckFailed(UpdateError::Network)));
    assert!(!t.engine.update_available());
    assert_eq!(t.engine.latest_version(), t.engine.current_version());
}

#[tokio::test]
async fn test_malformed_appcast_fails_check() {
    let server = UpdateServer::start().await;
    server.serve(APPCAST_PATH, "<html>not an appcast</html>");

    let mut t = TestEngine::new("1.0.0", &server.appcast_url());
    t.engine.force_check_for_update().await;
    let events = t.drain();

    assert!(!events.contains(&UpdateEvent::CheckOnlineFailed));
    assert!(events.contains(&UpdateEvent::CheckFailed(UpdateError::Unknown)));
    assert_eq!(t.engine.update_availability(), UpdateAvailability::Unknown);
}

#[tokio::test]
async fn test_every_day_gate_skips_second_passive_check() {
    let server = UpdateServer::start().await;
    server.publish("2.0.0", b"installer bytes");

    let mut t = TestEngine::new("1.0.0", &server.appcast_url());
    t.engine.check_for_update().await;
    assert_eq!(server.hits(APPCAST_PATH), 1);
    t.drain();

    t.engine.check_for_update().await;
    assert_eq!(server.hits(APPCAST_PATH), 1);
    assert!(t.drain().is_empty());

    // A forced check ignores the frequency
    t.engine.force_check_for_update().await;
    assert_eq!(server.hits(APPCAST_PATH), 2);
}

#[tokio::test]
async fn test_last_check_time_survives_restart() {
    let server = UpdateServer::start().await;
    server.publish("2.0.0", b"installer bytes");

    let mut first = TestEngine::new("1.0.0", &server.appcast_url());
    first.engine.check_for_update().await;
    let last_check = first.engine.last_check_time();
    assert!(last_check.is_some());

    let (settings, temp) = first.into_parts();
    let mut second = TestEngine::with_settings("1.0.0", &server.appcast_url(), settings, temp);
    assert_eq!(second.engine.last_check_time(), last_check);

    second.engine.check_for_update().await;
    assert_eq!(server.hits(APPCAST_PATH), 1);
}
