//! End-to-end counter synchronization between the worker and open pages.

mod common;

use common::{BadgeCall, Fixture, RecordingBadge};
use pushcount::platform::{ConsoleHost, InProcessRegistrar, Permission, WorkerRegistrar};
use pushcount::{
    BackgroundWorker, CrossContextMessage, FileCounterStore, PushOutcome, Visibility,
};
use std::sync::Arc;
use tempfile::TempDir;

#[tokio::test]
async fn test_push_updates_every_page() {
    let fixture = Fixture::new().await;
    let mut first = fixture.page(Permission::Granted).await;
    let mut second = fixture.page(Permission::Granted).await;
    let worker = fixture.worker().await;

    let outcome = worker.push(r#"{"title":"Hi","option":{}}"#).await.unwrap();
    assert_eq!(
        outcome,
        PushOutcome::Handled {
            notification_shown: true,
            count: Some(1)
        }
    );

    assert_eq!(first.pump_messages().await, 1);
    assert_eq!(second.pump_messages().await, 1);
    assert_eq!(first.notification_count(), 1);
    assert_eq!(second.ui().badge_text().as_deref(), Some("1"));
    assert_eq!(*fixture.host.shown.lock().unwrap(), vec!["Hi".to_string()]);
    assert!(fixture.badge.calls().contains(&BadgeCall::Set(1)));
}

#[tokio::test]
async fn test_counter_equals_pushes_since_last_reset() {
    let fixture = Fixture::new().await;
    let mut page = fixture.page(Permission::Granted).await;
    let worker = fixture.worker().await;

    for i in 0..3 {
        worker.push(format!(r#"{{"title":"before {i}"}}"#)).await.unwrap();
    }
    page.on_visibility_change(Visibility::Visible).await;
    for i in 0..4 {
        worker.push(format!(r#"{{"title":"after {i}"}}"#)).await.unwrap();
    }

    assert_eq!(worker.count().await.unwrap(), 4);
    page.pump_messages().await;
    assert_eq!(page.notification_count(), 4);
}

#[tokio::test]
async fn test_visible_page_resets_counter_everywhere() {
    let fixture = Fixture::new().await;
    let mut visible = fixture.page(Permission::Granted).await;
    let mut background = fixture.page(Permission::Granted).await;
    let worker = fixture.worker().await;

    for _ in 0..5 {
        worker.push(r#"{"title":"n"}"#).await.unwrap();
    }
    visible.pump_messages().await;
    background.pump_messages().await;
    assert_eq!(background.notification_count(), 5);

    visible.on_visibility_change(Visibility::Visible).await;
    // Optimistic local clear happens before the worker answers
    assert_eq!(visible.notification_count(), 0);
    assert_eq!(fixture.badge.calls().last(), Some(&BadgeCall::Clear));

    worker.sync().await.unwrap();
    assert_eq!(worker.count().await.unwrap(), 0);
    visible.pump_messages().await;
    background.pump_messages().await;
    assert_eq!(visible.notification_count(), 0);
    assert_eq!(background.notification_count(), 0);
}

#[tokio::test]
async fn test_hidden_page_does_not_reset() {
    let fixture = Fixture::new().await;
    let mut page = fixture.page(Permission::Granted).await;
    let worker = fixture.worker().await;

    worker.push(r#"{"title":"n"}"#).await.unwrap();
    page.on_visibility_change(Visibility::Hidden).await;
    worker.sync().await.unwrap();

    assert_eq!(worker.count().await.unwrap(), 1);
}

#[tokio::test]
async fn test_push_after_optimistic_clear_wins() {
    let fixture = Fixture::new().await;
    let mut page = fixture.page(Permission::Granted).await;
    let worker = fixture.worker().await;

    worker.push(r#"{"title":"one"}"#).await.unwrap();
    page.pump_messages().await;

    page.on_visibility_change(Visibility::Visible).await;
    worker.push(r#"{"title":"two"}"#).await.unwrap();

    // Reset broadcast (0) then push broadcast (1): the last one wins
    page.pump_messages().await;
    assert_eq!(page.notification_count(), 1);
    assert_eq!(worker.count().await.unwrap(), 1);
}

#[tokio::test]
async fn test_message_without_count_increments_mirror() {
    let fixture = Fixture::new().await;
    let mut page = fixture.page(Permission::Granted).await;

    page.handle_message(CrossContextMessage::NotificationCount(3))
        .await;
    page.handle_message(CrossContextMessage::Other(serde_json::json!({ "hello": true })))
        .await;

    assert_eq!(page.notification_count(), 4);
    assert_eq!(
        fixture.badge.calls(),
        vec![BadgeCall::Set(3), BadgeCall::Set(4)]
    );
}

#[tokio::test]
async fn test_unsupported_badge_does_not_block_mirror() {
    let fixture = Fixture::new().await;
    let mut platform = fixture.platform(Permission::Granted);
    let badge = Arc::new(RecordingBadge {
        supported: false,
        ..RecordingBadge::default()
    });
    platform.badge = Arc::clone(&badge) as Arc<dyn pushcount::platform::AppBadge>;

    let mut page =
        pushcount::PageController::new(platform, common::PAGE_URL, common::server_key());
    page.load().await.unwrap();
    page.handle_message(CrossContextMessage::NotificationCount(2))
        .await;

    assert_eq!(page.notification_count(), 2);
    assert!(badge.calls().is_empty());
}

#[tokio::test]
async fn test_closed_page_stops_receiving() {
    let fixture = Fixture::new().await;
    let mut open = fixture.page(Permission::Granted).await;
    let closed = fixture.page(Permission::Granted).await;
    let worker = fixture.worker().await;

    drop(closed);
    worker.push(r#"{"title":"n"}"#).await.unwrap();

    assert_eq!(open.pump_messages().await, 1);
    assert_eq!(open.notification_count(), 1);
}

#[tokio::test]
async fn test_click_opens_target_page() {
    let fixture = Fixture::new().await;
    let _page = fixture.page(Permission::Granted).await;
    let worker = fixture.worker().await;

    let notification = pushcount::worker::PushPayload::parse(br#"{"title":"Hi"}"#)
        .unwrap()
        .into_notification();
    worker.notification_click(notification).await.unwrap();

    assert_eq!(
        *fixture.host.opened.lock().unwrap(),
        vec!["https://web.dev".to_string()]
    );
}

#[tokio::test]
async fn test_file_store_counter_survives_worker_restart() {
    let dir = TempDir::new().unwrap();

    let worker = BackgroundWorker::new(
        Arc::new(FileCounterStore::new(dir.path())),
        Arc::new(ConsoleHost),
        "https://web.dev",
    )
    .spawn();
    worker.push(r#"{"title":"a"}"#).await.unwrap();
    worker.push(r#"{"title":"b"}"#).await.unwrap();
    worker.shutdown().await.unwrap();

    let registrar = InProcessRegistrar::new(
        Arc::new(FileCounterStore::new(dir.path())),
        Arc::new(ConsoleHost),
        "https://web.dev",
    );
    let restarted = registrar
        .register(pushcount::constants::WORKER_SCRIPT_URL)
        .await
        .unwrap();
    assert_eq!(restarted.count().await.unwrap(), 2);

    let outcome = restarted.push(r#"{"title":"c"}"#).await.unwrap();
    assert_eq!(
        outcome,
        PushOutcome::Handled {
            notification_shown: true,
            count: Some(3)
        }
    );
}

#[tokio::test]
async fn test_concurrent_pushes_never_lose_increments() {
    let dir = TempDir::new().unwrap();
    let worker = BackgroundWorker::new(
        Arc::new(FileCounterStore::new(dir.path())),
        Arc::new(ConsoleHost),
        "https://web.dev",
    )
    .spawn();

    let first = worker.push(r#"{"title":"a"}"#);
    let second = worker.push(r#"{"title":"b"}"#);
    let (a, b) = tokio::join!(first, second);
    a.unwrap();
    b.unwrap();

    assert_eq!(worker.count().await.unwrap(), 2);
}
