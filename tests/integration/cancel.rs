use crate::common::{APPCAST_PATH, TestEngine, UpdateServer, list_files, path_of};
use appcast_updater::engine::{CancelHandle, EngineState, UpdateAvailability, UpdateEvent};
use std::time::Duration;
use tokio::task::JoinHandle;

/// Cancel through `handle` as soon as the engine enters `state`.
fn cancel_when(handle: CancelHandle, state: EngineState) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            if handle.state() == state && handle.cancel() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
}

#[tokio::test]
async fn test_cancel_check_before_server_responds() {
    let server = UpdateServer::start().await;
    server.stall(APPCAST_PATH);

    let mut t = TestEngine::new("1.0.0", &server.appcast_url());
    let canceller = cancel_when(t.engine.cancel_handle(), EngineState::CheckingForUpdate);

    tokio::time::timeout(Duration::from_secs(10), t.engine.force_check_for_update())
        .await
        .expect("cancelled check should return promptly");
    canceller.await.unwrap();
    let events = t.drain();

    assert!(events.contains(&UpdateEvent::CheckCancelled));
    assert!(!events.contains(&UpdateEvent::CheckOnlineFailed));
    assert!(!events.iter().any(|e| matches!(e, UpdateEvent::CheckFailed(_))));
    assert_eq!(events.last(), Some(&UpdateEvent::UpdateAvailabilityChanged(UpdateAvailability::Unknown)));
    assert_eq!(t.engine.state(), EngineState::Idle);
    assert!(!t.engine.update_available());
}

#[tokio::test]
async fn test_cancel_installer_download() {
    let server = UpdateServer::start().await;
    let fixture = server.publish("2.0.0", b"installer bytes");
    server.stall(&path_of(fixture.document.installer_url.as_deref().unwrap()));

    let mut t = TestEngine::new("1.0.0", &server.appcast_url());
    t.engine.force_check_for_update().await;
    t.drain();

    let canceller = cancel_when(t.engine.cancel_handle(), EngineState::DownloadingInstaller);
    tokio::time::timeout(Duration::from_secs(10), t.engine.download_installer())
        .await
        .expect("cancelled download should return promptly");
    canceller.await.unwrap();
    let events = t.drain();

    assert!(events.contains(&UpdateEvent::InstallerDownloadCancelled));
    assert!(!events.iter().any(|e| matches!(e, UpdateEvent::InstallerDownloadFailed(_))));
    assert_eq!(t.engine.state(), EngineState::Idle);
    assert!(!t.engine.installer_available());
    assert!(!list_files(&t.working_dir()).iter().any(|f| f.ends_with(".part")));

    // The engine accepts new work afterwards
    t.engine.force_check_for_update().await;
    assert!(t.drain().contains(&UpdateEvent::CheckFinished));
}

#[tokio::test]
async fn test_cancel_is_ignored_while_idle() {
    let server = UpdateServer::start().await;
    let t = TestEngine::new("1.0.0", &server.appcast_url());

    assert!(!t.engine.cancel_handle().cancel());
    assert!(!t.engine.cancel());
}
