use std::sync::Arc;

use qrscan_lib::capture::{
    CaptureController, CaptureNotice, DecodeEvent, FixedLocation, Location, LocationError,
    NoLocation,
};
use qrscan_lib::db::{Database, ScanPatch};
use qrscan_lib::history::commands;
use qrscan_lib::AppState;
use tempfile::TempDir;
use tokio::sync::mpsc::UnboundedReceiver;

async fn drain(mut notices: UnboundedReceiver<CaptureNotice>) -> Vec<CaptureNotice> {
    let mut collected = Vec::new();
    while let Some(notice) = notices.recv().await {
        collected.push(notice);
    }
    collected
}

#[tokio::test]
async fn every_decode_becomes_a_row_with_location() {
    let dir = TempDir::new().unwrap();
    let db = Database::new(dir.path().join("scans.sqlite3")).unwrap();
    let provider = Arc::new(FixedLocation(Location {
        latitude: 40.4168,
        longitude: -3.7038,
        altitude: None,
        accuracy: Some(15.0),
    }));

    let mut controller = CaptureController::new();
    let notices = controller.start_capture(db.clone(), provider).unwrap();
    assert!(controller.is_active());

    controller.submit(DecodeEvent::now("https://example.com")).await.unwrap();
    controller.submit(DecodeEvent::now("https://example.com")).await.unwrap();
    controller.stop_capture().await.unwrap();
    assert!(!controller.is_active());

    let notices = drain(notices).await;
    assert_eq!(notices.len(), 2);
    assert!(notices.iter().all(|n| matches!(n, CaptureNotice::Saved(_))));

    let scans = db.list_scans().await.unwrap();
    assert_eq!(scans.len(), 2, "duplicate payloads are not merged");
    for scan in &scans {
        assert_eq!(scan.qr_data, "https://example.com");
        assert_eq!(scan.latitude, Some(40.4168));
        assert_eq!(scan.longitude, Some(-3.7038));
        assert_eq!(scan.accuracy, Some(15.0));
    }
}

#[tokio::test]
async fn denied_location_still_records_the_scan() {
    let dir = TempDir::new().unwrap();
    let db = Database::new(dir.path().join("scans.sqlite3")).unwrap();

    let mut controller = CaptureController::new();
    let notices = controller.start_capture(db.clone(), Arc::new(NoLocation)).unwrap();
    controller.submit(DecodeEvent::now("plain text")).await.unwrap();
    controller.stop_capture().await.unwrap();

    let notices = drain(notices).await;
    assert_eq!(
        notices[0],
        CaptureNotice::LocationUnavailable(LocationError::PermissionDenied)
    );
    assert!(matches!(notices[1], CaptureNotice::Saved(_)));

    let scans = db.list_scans().await.unwrap();
    assert_eq!(scans.len(), 1);
    assert!(!scans[0].has_location());
}

#[tokio::test]
async fn storage_failure_is_reported_and_capture_continues() {
    let dir = TempDir::new().unwrap();
    let db = Database::new(dir.path().join("scans.sqlite3")).unwrap();
    let provider = Arc::new(FixedLocation(Location {
        latitude: 1.0,
        longitude: 2.0,
        altitude: None,
        accuracy: None,
    }));

    db.execute(|conn| {
        conn.execute_batch("ALTER TABLE scans RENAME TO scans_offline;")?;
        Ok(())
    })
    .await
    .unwrap();

    let mut controller = CaptureController::new();
    let mut notices = controller.start_capture(db.clone(), provider).unwrap();

    controller.submit(DecodeEvent::now("lost")).await.unwrap();
    let first = notices.recv().await.unwrap();
    assert!(matches!(first, CaptureNotice::SaveFailed(_)));

    db.execute(|conn| {
        conn.execute_batch("ALTER TABLE scans_offline RENAME TO scans;")?;
        Ok(())
    })
    .await
    .unwrap();

    controller.submit(DecodeEvent::now("kept")).await.unwrap();
    controller.stop_capture().await.unwrap();

    let rest = drain(notices).await;
    assert_eq!(rest.len(), 1);
    assert!(matches!(&rest[0], CaptureNotice::Saved(scan) if scan.qr_data == "kept"));
}

#[tokio::test]
async fn cancel_stops_a_running_loop() {
    let dir = TempDir::new().unwrap();
    let db = Database::new(dir.path().join("scans.sqlite3")).unwrap();

    let mut controller = CaptureController::new();
    let _notices = controller.start_capture(db, Arc::new(NoLocation)).unwrap();
    assert!(controller
        .start_capture(
            Database::new(dir.path().join("other.sqlite3")).unwrap(),
            Arc::new(NoLocation)
        )
        .is_err());

    controller.cancel_capture().await.unwrap();
    assert!(!controller.is_active());
    assert!(controller.submit(DecodeEvent::now("late")).await.is_err());
}

#[tokio::test]
async fn history_commands_reflect_captured_scans() {
    let dir = TempDir::new().unwrap();
    let state = AppState::new(Database::new(dir.path().join("scans.sqlite3")).unwrap());

    let mut controller = CaptureController::new();
    let notices = controller
        .start_capture(state.db.clone(), Arc::new(NoLocation))
        .unwrap();
    controller.submit(DecodeEvent::now("first")).await.unwrap();
    controller.stop_capture().await.unwrap();
    drain(notices).await;

    let scans = commands::list_scans(&state).await.unwrap();
    assert_eq!(scans.len(), 1);
    let id = scans[0].id;

    let patch = ScanPatch {
        qr_data: Some("renamed".into()),
        ..Default::default()
    };
    let updated = commands::update_scan(&state, id, patch).await.unwrap();
    assert_eq!(updated.qr_data, "renamed");
    assert_eq!(commands::get_scan(&state, id).await.unwrap(), Some(updated));

    assert!(commands::delete_scan(&state, id).await.unwrap());
    assert!(!commands::delete_scan(&state, id).await.unwrap());
    assert_eq!(commands::get_scan(&state, id).await.unwrap(), None);

    let late_patch = ScanPatch {
        timestamp: Some(1),
        ..Default::default()
    };
    let err = commands::update_scan(&state, id, late_patch)
        .await
        .unwrap_err();
    assert!(err.contains("not found"));
}
