use super::*;
use crate::message::ChatMessage;
use crate::services::game::BoardConfig;
use crate::services::transcript::{TranscriptError, TranscriptStore};
use crate::state::test_helpers::{dummy_chat_message, seed_room, test_app_state, test_app_state_with_transcripts};
use crate::state::PlayerHandle;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tokio::time::{Duration, sleep, timeout};
use uuid::Uuid;

struct RecordingStore {
    appended: Mutex<Vec<(String, ChatMessage)>>,
}

impl RecordingStore {
    fn new() -> Arc<Self> {
        Arc::new(Self { appended: Mutex::new(Vec::new()) })
    }
}

#[async_trait::async_trait]
impl TranscriptStore for RecordingStore {
    async fn append(&self, game: &str, message: &ChatMessage) -> Result<(), TranscriptError> {
        self.appended
            .lock()
            .expect("mock mutex should lock")
            .push((game.to_owned(), message.clone()));
        Ok(())
    }
}

async fn seed_members(
    state: &crate::state::AppState,
    game: &str,
) -> (mpsc::Receiver<ServerMessage>, mpsc::Receiver<ServerMessage>) {
    let shared = seed_room(state, game, BoardConfig::CLASSIC).await;
    let (tx_a, rx_a) = mpsc::channel(8);
    let (tx_b, rx_b) = mpsc::channel(8);
    let mut room = shared.lock().await;
    room.roster.push(PlayerHandle::new("alice", Uuid::new_v4(), tx_a));
    room.roster.push(PlayerHandle::new("bob", Uuid::new_v4(), tx_b));
    (rx_a, rx_b)
}

#[tokio::test]
async fn relay_appends_transcript_and_reaches_sender_too() {
    let state = test_app_state();
    let (mut rx_a, mut rx_b) = seed_members(&state, "r1").await;

    let line = dummy_chat_message("alice", "good luck");
    relay(&state, "r1", line.clone()).await;

    for rx in [&mut rx_a, &mut rx_b] {
        let msg = timeout(Duration::from_millis(200), rx.recv())
            .await
            .expect("receive timed out")
            .expect("channel closed");
        let ServerMessage::NewMessage { message } = msg else {
            panic!("expected NEW_MESSAGE");
        };
        assert_eq!(message, line);
    }

    let shared = lobby::room(&state, "r1").await.expect("room");
    assert_eq!(shared.lock().await.transcript, vec![line]);
}

#[tokio::test]
async fn relay_to_unknown_room_is_dropped() {
    let state = test_app_state();
    relay(&state, "ghost", dummy_chat_message("alice", "anyone?")).await;
    assert!(state.rooms.read().await.is_empty());
}

#[tokio::test]
async fn relay_persists_through_the_configured_store() {
    let store = RecordingStore::new();
    let state = test_app_state_with_transcripts(store.clone());
    let _receivers = seed_members(&state, "r1").await;

    let line = dummy_chat_message("bob", "nice move");
    relay(&state, "r1", line.clone()).await;

    // The append is fire-and-forget; poll until the spawned task lands.
    let deadline = tokio::time::Instant::now() + Duration::from_millis(500);
    loop {
        {
            let appended = store.appended.lock().expect("mock mutex should lock");
            if !appended.is_empty() {
                assert_eq!(appended[0].0, "r1");
                assert_eq!(appended[0].1, line);
                break;
            }
        }
        assert!(tokio::time::Instant::now() < deadline, "append never observed");
        sleep(Duration::from_millis(10)).await;
    }
}
