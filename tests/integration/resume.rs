use crate::common::{APPCAST_PATH, CHANGELOG_TEXT, TestEngine, UpdateServer};
use appcast_updater::engine::{UpdateAvailability, UpdateEvent};
use appcast_updater::settings::{LAST_MANIFEST_KEY, SettingsStore};
use axum::http::StatusCode;
use semver::Version;

async fn download_full_bundle(server: &UpdateServer) -> TestEngine {
    server.publish("2.0.0", b"installer bytes");

    let mut t = TestEngine::new("1.0.0", &server.appcast_url());
    t.engine.force_check_for_update().await;
    t.engine.download_installer().await;
    assert!(t.engine.changelog_available());
    assert!(t.engine.installer_available());
    t
}

#[tokio::test]
async fn test_offline_check_resumes_downloaded_update() {
    let server = UpdateServer::start().await;
    let first = download_full_bundle(&server).await;
    let (settings, temp) = first.into_parts();

    server.serve_status(APPCAST_PATH, StatusCode::SERVICE_UNAVAILABLE);
    let mut second = TestEngine::with_settings("1.0.0", &server.appcast_url(), settings, temp);
    second.engine.force_check_for_update().await;
    let events = second.drain();

    assert!(events.contains(&UpdateEvent::CheckOnlineFailed));
    assert!(!events.iter().any(|e| matches!(e, UpdateEvent::CheckFailed(_))));
    assert!(events.contains(&UpdateEvent::UpdateAvailabilityChanged(UpdateAvailability::Available)));
    assert!(events.contains(&UpdateEvent::InstallerAvailableChanged(true)));

    assert!(second.engine.update_available());
    assert_eq!(second.engine.latest_version(), &Version::new(2, 0, 0));
    assert!(second.engine.installer_available());
    assert_eq!(second.engine.latest_changelog(), CHANGELOG_TEXT);

    // Downloads re-announce the local artifacts instead of fetching again
    second.engine.download_installer().await;
    assert_eq!(second.drain(), vec![UpdateEvent::InstallerAvailableChanged(true)]);

    second.engine.install_update(false).await;
    assert_eq!(second.launcher.launched().len(), 1);
}

#[tokio::test]
async fn test_incomplete_bundle_is_purged_when_offline() {
    let server = UpdateServer::start().await;
    let first = download_full_bundle(&server).await;
    std::fs::remove_file(first.working_dir().join("installer-2.0.exe")).unwrap();
    let (settings, temp) = first.into_parts();

    server.serve_status(APPCAST_PATH, StatusCode::SERVICE_UNAVAILABLE);
    let mut second = TestEngine::with_settings("1.0.0", &server.appcast_url(), settings, temp);
    second.engine.force_check_for_update().await;
    let events = second.drain();

    assert!(events.iter().any(|e| matches!(e, UpdateEvent::CheckFailed(_))));
    assert!(!second.engine.update_available());
    assert!(crate::common::list_files(&second.working_dir()).is_empty());
}

#[tokio::test]
async fn test_online_appcast_replaces_local_bundle() {
    let server = UpdateServer::start().await;
    let first = download_full_bundle(&server).await;
    let (settings, temp) = first.into_parts();

    server.publish("2.1.0", b"newer installer");
    let mut second = TestEngine::with_settings("1.0.0", &server.appcast_url(), settings.clone(), temp);
    second.engine.force_check_for_update().await;

    assert_eq!(second.engine.latest_version(), &Version::new(2, 1, 0));
    assert!(!second.engine.installer_available());
    assert!(!second.working_dir().join("installer-2.0.exe").exists());
    assert!(settings.get(LAST_MANIFEST_KEY).unwrap().ends_with("installer-2.1.json"));
}
