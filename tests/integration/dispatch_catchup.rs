//! End-to-end propagation through a live in-process classroom

use std::sync::Arc;
use vision::admin::AdminEvent;
use vision::classroom::Classroom;
use vision::config::VisionConfig;
use vision::protocol::{keys, AdminReply, Command, CommandResponse, UpstreamMessage};
use vision::store::{get_json, DurableStore, MemoryStore};
use vision::student::{Effect, RecordingEffects, StudentEffects};

const LESSON: &str = "https://school.example/lesson";

fn classroom() -> (Classroom, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let shared: Arc<dyn DurableStore> = store.clone();
    let classroom = Classroom::start(shared, &VisionConfig::default()).unwrap();
    (classroom, store)
}

#[tokio::test]
async fn test_late_joiner_catches_up_on_lock() {
    let (mut classroom, _store) = classroom();
    let early = classroom.join(LESSON).unwrap();

    let report = classroom
        .admin()
        .dispatcher()
        .broadcast(&Command::LockScreen)
        .unwrap();
    assert_eq!(report.delivered, 1);

    let late = classroom.join(LESSON).unwrap();
    assert!(classroom.status(early).await.unwrap().is_locked);
    assert!(classroom.status(late).await.unwrap().is_locked);

    classroom.shutdown().await;
}

#[tokio::test]
async fn test_unlock_after_lock_reaches_everyone() {
    let (mut classroom, _store) = classroom();
    let a = classroom.join(LESSON).unwrap();
    let b = classroom.join(LESSON).unwrap();
    let dispatcher = classroom.admin().dispatcher().clone();

    dispatcher.broadcast(&Command::LockScreen).unwrap();
    dispatcher.broadcast(&Command::UnlockScreen).unwrap();

    assert!(!classroom.status(a).await.unwrap().is_locked);
    assert!(!classroom.status(b).await.unwrap().is_locked);
    let c = classroom.join(LESSON).unwrap();
    assert!(!classroom.status(c).await.unwrap().is_locked);

    classroom.shutdown().await;
}

#[tokio::test]
async fn test_block_reaches_open_tab_and_shows_overlay() {
    let (mut classroom, _store) = classroom();
    let effects = RecordingEffects::new();
    let recorder = effects.clone();
    let tab = classroom
        .join_with_effects(LESSON, move |_| -> Arc<dyn StudentEffects> { Arc::new(recorder) })
        .unwrap();

    classroom.admin().registry().block("games.example").unwrap();
    assert!(classroom.navigate(tab, "https://games.example/play", "Games"));

    let status = classroom.status(tab).await.unwrap();
    assert_eq!(status.blocked_sites, vec!["games.example".to_string()]);
    assert_eq!(status.url, "https://games.example/play");
    assert!(effects
        .effects()
        .contains(&Effect::ShowBlockOverlay("games.example".to_string())));

    classroom.shutdown().await;
}

#[tokio::test]
async fn test_excluded_and_url_less_tabs_are_skipped() {
    let (mut classroom, store) = classroom();
    classroom.join(LESSON).unwrap();
    classroom.join("chrome://extensions").unwrap();
    classroom.bus().open_tab(None);

    let report = classroom
        .admin()
        .dispatcher()
        .broadcast(&Command::PlaySound)
        .unwrap();
    assert_eq!(report.delivered, 1);
    assert_eq!(report.skipped, 2);

    let last: Command = get_json(store.as_ref(), keys::LAST_COMMAND).unwrap().unwrap();
    assert_eq!(last, Command::PlaySound);

    classroom.shutdown().await;
}

#[tokio::test]
async fn test_closed_tab_does_not_fail_broadcast() {
    let (mut classroom, _store) = classroom();
    let a = classroom.join(LESSON).unwrap();
    let b = classroom.join(LESSON).unwrap();
    classroom.leave(b).await.unwrap();

    let report = classroom
        .admin()
        .dispatcher()
        .broadcast(&Command::MuteAll)
        .unwrap();
    assert_eq!(report.delivered, 1);
    assert!(!classroom.status(a).await.unwrap().is_locked);

    classroom.shutdown().await;
}

#[tokio::test]
async fn test_upstream_unblock_request_is_queued() {
    let (classroom, _store) = classroom();

    let reply = classroom
        .bus()
        .ask_admin(UpstreamMessage::UnblockRequest {
            site: "videos.example".to_string(),
            reason: "science video".to_string(),
        })
        .unwrap()
        .await
        .unwrap();
    assert_eq!(reply, AdminReply::Ack(CommandResponse::ok()));

    let requests = classroom.admin().registry().unblock_requests().unwrap();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].site, "videos.example");
    assert!(classroom.drain_events().contains(&AdminEvent::UnblockRequested {
        site: "videos.example".to_string()
    }));

    classroom.shutdown().await;
}
