use crate::common::{TestEngine, UpdateServer, installer_payload, list_files, path_of};
use appcast_updater::core::UpdateError;
use appcast_updater::engine::{EngineState, UpdateEvent};
use appcast_updater::test_utils::AppcastFixture;
use axum::http::StatusCode;

#[tokio::test]
async fn test_installer_download_reports_progress_and_verifies() {
    let server = UpdateServer::start().await;
    let installer = installer_payload(256 * 1024);
    server.publish("2.0.0", &installer);

    let mut t = TestEngine::new("1.0.0", &server.appcast_url());
    t.engine.force_check_for_update().await;
    t.drain();

    t.engine.download_installer().await;
    let events = t.drain();

    assert_eq!(t.engine.state(), EngineState::Idle);
    assert!(events.contains(&UpdateEvent::StateChanged(EngineState::DownloadingInstaller)));
    assert!(events.contains(&UpdateEvent::InstallerDownloadStarted));
    assert!(events.contains(&UpdateEvent::InstallerDownloadFinished));
    assert!(events.contains(&UpdateEvent::InstallerAvailableChanged(true)));

    let progress: Vec<u8> = events
        .iter()
        .filter_map(|e| match e {
            UpdateEvent::InstallerDownloadProgress(p) => Some(*p),
            _ => None,
        })
        .collect();
    assert_eq!(progress.first(), Some(&0));
    assert_eq!(progress.last(), Some(&100));
    assert!(progress.windows(2).all(|w| w[0] < w[1]), "{progress:?}");
    assert_eq!(t.engine.download_progress(), 100);

    assert!(t.engine.installer_available());
    let path = t.engine.latest_record().unwrap().installer_path().unwrap().to_path_buf();
    assert_eq!(std::fs::read(&path).unwrap(), installer);
    assert!(!list_files(&t.working_dir()).iter().any(|f| f.ends_with(".part")));
}

#[tokio::test]
async fn test_installer_checksum_mismatch_removes_download() {
    let server = UpdateServer::start().await;
    let fixture = AppcastFixture::new("2.0.0", &server.base_url()).with_md5("00000000000000000000000000000000");
    server.publish_fixture(&fixture, b"tampered installer", "changelog");

    let mut t = TestEngine::new("1.0.0", &server.appcast_url());
    t.engine.force_check_for_update().await;
    t.drain();

    t.engine.download_installer().await;
    let events = t.drain();

    assert!(events.contains(&UpdateEvent::InstallerDownloadFailed(UpdateError::Checksum)));
    assert!(!events.contains(&UpdateEvent::InstallerDownloadFinished));
    assert!(!t.engine.installer_available());
    assert!(!t.working_dir().join("installer-2.0.exe").exists());
    assert_eq!(t.engine.state(), EngineState::Idle);
}

#[tokio::test]
async fn test_missing_installer_leaves_no_partial_file() {
    let server = UpdateServer::start().await;
    let fixture = server.publish("2.0.0", b"installer bytes");
    let installer_path = path_of(fixture.document.installer_url.as_deref().unwrap());
    server.serve_status(&installer_path, StatusCode::NOT_FOUND);

    let mut t = TestEngine::new("1.0.0", &server.appcast_url());
    t.engine.force_check_for_update().await;
    t.drain();

    t.engine.download_installer().await;
    let events = t.drain();

    assert!(events.contains(&UpdateEvent::InstallerDownloadFailed(UpdateError::Network)));
    let files = list_files(&t.working_dir());
    assert!(!files.iter().any(|f| f.ends_with(".part")), "{files:?}");
    assert!(!files.contains(&"installer-2.0.exe".to_string()));
}

#[tokio::test]
async fn test_manifest_without_installer_url() {
    let server = UpdateServer::start().await;
    let mut fixture = AppcastFixture::new("2.0.0", &server.base_url());
    fixture.document.installer_url = None;
    server.publish_fixture(&fixture, b"", "changelog");

    let mut t = TestEngine::new("1.0.0", &server.appcast_url());
    t.engine.force_check_for_update().await;
    assert!(t.engine.update_available());
    t.drain();

    t.engine.download_installer().await;
    let events = t.drain();

    assert!(events.contains(&UpdateEvent::InstallerDownloadFailed(UpdateError::Url)));
    assert_eq!(t.engine.state(), EngineState::Idle);
}

#[tokio::test]
async fn test_changelog_download_without_changelog_url() {
    let server = UpdateServer::start().await;
    let fixture = AppcastFixture::new("2.0.0", &server.base_url()).without_changelog();
    server.publish_fixture(&fixture, b"installer", "");

    let mut t = TestEngine::new("1.0.0", &server.appcast_url());
    t.engine.force_check_for_update().await;
    let events = t.drain();
    assert!(!events.contains(&UpdateEvent::ChangelogDownloadStarted));

    t.engine.download_changelog().await;
    let events = t.drain();
    assert!(events.contains(&UpdateEvent::ChangelogDownloadFailed(UpdateError::Url)));
    assert!(!t.engine.changelog_available());
}
