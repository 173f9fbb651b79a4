use super::*;
use crate::message::BoardMode;
use crate::state::test_helpers::test_app_state;
use tokio::time::{Duration, timeout};
use uuid::Uuid;

async fn recv(rx: &mut mpsc::Receiver<ServerMessage>) -> ServerMessage {
    timeout(Duration::from_millis(200), rx.recv())
        .await
        .expect("broadcast receive timed out")
        .expect("channel closed")
}

async fn assert_empty(rx: &mut mpsc::Receiver<ServerMessage>) {
    assert!(
        timeout(Duration::from_millis(80), rx.recv()).await.is_err(),
        "expected no broadcast"
    );
}

struct Client {
    conn: ConnId,
    tx: mpsc::Sender<ServerMessage>,
    rx: mpsc::Receiver<ServerMessage>,
}

fn client() -> Client {
    let (tx, rx) = mpsc::channel(32);
    Client { conn: Uuid::new_v4(), tx, rx }
}

async fn join(state: &AppState, game: &str, name: &str, c: &Client) {
    join_room(state, game, name, None, c.conn, c.tx.clone())
        .await
        .expect("join should succeed");
}

/// Join both players and drain their join-time roster updates.
async fn join_pair(state: &AppState, game: &str) -> (Client, Client) {
    let mut a = client();
    let mut b = client();
    join(state, game, "alice", &a).await;
    join(state, game, "bob", &b).await;
    recv(&mut a.rx).await; // alice's own join
    recv(&mut a.rx).await; // bob's join
    recv(&mut b.rx).await; // bob's own join
    (a, b)
}

/// Mutually select and drain everything up to the GAME_STARTED frames.
async fn pair_up(state: &AppState, game: &str, a: &mut Client, b: &mut Client) {
    select_opponent(state, game, "alice", "bob").await;
    select_opponent(state, game, "bob", "alice").await;
    // Each side: two OPPONENT_SELECTED then GAME_STARTED.
    for c in [a, b] {
        recv(&mut c.rx).await;
        recv(&mut c.rx).await;
        let ServerMessage::GameStarted { .. } = recv(&mut c.rx).await else {
            panic!("expected GAME_STARTED");
        };
    }
}

// =============================================================================
// JOIN
// =============================================================================

#[tokio::test]
async fn join_creates_room_and_broadcasts_roster() {
    let state = test_app_state();
    let mut a = client();
    join(&state, "r1", "alice", &a).await;

    let ServerMessage::LobbyUpdate { game, players } = recv(&mut a.rx).await else {
        panic!("expected LOBBY_UPDATE");
    };
    assert_eq!(game, "r1");
    assert_eq!(players, vec!["alice"]);
    assert!(room(&state, "r1").await.is_some());
}

#[tokio::test]
async fn join_mode_fixes_board_shape_for_the_room() {
    let state = test_app_state();
    let a = client();
    let b = client();
    join_room(&state, "r1", "alice", Some(BoardMode::Classic), a.conn, a.tx.clone())
        .await
        .expect("join");
    // Second joiner's mode is ignored.
    join_room(&state, "r1", "bob", Some(BoardMode::FiveInARow), b.conn, b.tx.clone())
        .await
        .expect("join");

    let shared = room(&state, "r1").await.expect("room");
    assert_eq!(shared.lock().await.board, BoardConfig::CLASSIC);
}

#[tokio::test]
async fn duplicate_name_is_rejected_without_mutating_roster() {
    let state = test_app_state();
    let mut a = client();
    let b = client();
    join(&state, "r1", "alice", &a).await;
    recv(&mut a.rx).await;

    let result = join_room(&state, "r1", "alice", None, b.conn, b.tx.clone()).await;
    assert!(matches!(result, Err(LobbyError::NameTaken)));

    let shared = room(&state, "r1").await.expect("room");
    assert_eq!(shared.lock().await.roster.len(), 1);
    // No roster update reaches the existing member.
    assert_empty(&mut a.rx).await;
}

#[tokio::test]
async fn second_join_broadcasts_names_in_join_order() {
    let state = test_app_state();
    let (mut a, mut b) = join_pair(&state, "r1").await;

    // The last update both saw carried both names in join order; verify via
    // a third member joining.
    let mut c = client();
    join(&state, "r1", "carol", &c).await;
    for rx in [&mut a.rx, &mut b.rx, &mut c.rx] {
        let ServerMessage::LobbyUpdate { players, .. } = recv(rx).await else {
            panic!("expected LOBBY_UPDATE");
        };
        assert_eq!(players, vec!["alice", "bob", "carol"]);
    }
}

// =============================================================================
// PAIRING
// =============================================================================

#[tokio::test]
async fn one_sided_selection_does_not_start_a_session() {
    let state = test_app_state();
    let (mut a, mut b) = join_pair(&state, "r1").await;

    select_opponent(&state, "r1", "alice", "bob").await;

    for rx in [&mut a.rx, &mut b.rx] {
        let ServerMessage::OpponentSelected { player, opponent, .. } = recv(rx).await else {
            panic!("expected OPPONENT_SELECTED");
        };
        assert_eq!(player, "alice");
        assert_eq!(opponent, "bob");
    }

    let shared = room(&state, "r1").await.expect("room");
    assert!(shared.lock().await.session.is_none());
}

#[tokio::test]
async fn mutual_selection_starts_a_session() {
    let state = test_app_state();
    let (mut a, mut b) = join_pair(&state, "r1").await;

    select_opponent(&state, "r1", "alice", "bob").await;
    select_opponent(&state, "r1", "bob", "alice").await;

    for c in [&mut a, &mut b] {
        recv(&mut c.rx).await; // alice's selection
        recv(&mut c.rx).await; // bob's selection
        let ServerMessage::GameStarted { game, state: snapshot } = recv(&mut c.rx).await else {
            panic!("expected GAME_STARTED");
        };
        assert_eq!(game, "r1");
        assert!(["alice", "bob"].contains(&snapshot.current_player.as_str()));
        assert_eq!(snapshot.player_marks.len(), 2);
        assert!(snapshot.board.iter().all(String::is_empty));
    }

    let shared = room(&state, "r1").await.expect("room");
    let room = shared.lock().await;
    assert!(room.pairing_complete);
    assert!(room.session.is_some());
}

#[tokio::test]
async fn self_selection_never_pairs() {
    let state = test_app_state();
    let (a, b) = join_pair(&state, "r1").await;
    drop((a, b));

    select_opponent(&state, "r1", "alice", "alice").await;
    select_opponent(&state, "r1", "bob", "bob").await;

    let shared = room(&state, "r1").await.expect("room");
    assert!(shared.lock().await.session.is_none());
}

#[tokio::test]
async fn three_member_roster_never_pairs() {
    let state = test_app_state();
    let (a, b) = join_pair(&state, "r1").await;
    let c = client();
    join(&state, "r1", "carol", &c).await;
    drop((a, b));

    select_opponent(&state, "r1", "alice", "bob").await;
    select_opponent(&state, "r1", "bob", "alice").await;

    let shared = room(&state, "r1").await.expect("room");
    assert!(shared.lock().await.session.is_none());
}

#[tokio::test]
async fn ready_flags_alone_never_promote() {
    let state = test_app_state();
    let (a, b) = join_pair(&state, "r1").await;
    drop((a, b));

    set_ready(&state, "r1", "alice").await;
    set_ready(&state, "r1", "bob").await;

    let shared = room(&state, "r1").await.expect("room");
    let room = shared.lock().await;
    assert!(room.roster.iter().all(|p| p.ready));
    assert!(room.session.is_none());
}

#[tokio::test]
async fn start_game_requires_mutual_selection() {
    let state = test_app_state();
    let (mut a, mut b) = join_pair(&state, "r1").await;

    start_game(&state, "r1").await;
    {
        let shared = room(&state, "r1").await.expect("room");
        assert!(shared.lock().await.session.is_none());
    }

    select_opponent(&state, "r1", "alice", "bob").await;
    select_opponent(&state, "r1", "bob", "alice").await;
    pair_drain(&mut a, &mut b).await;

    // Session already active: a second START_GAME is ignored.
    start_game(&state, "r1").await;
    assert_empty(&mut a.rx).await;
    assert_empty(&mut b.rx).await;
}

/// Drain two selections plus GAME_STARTED for both clients.
async fn pair_drain(a: &mut Client, b: &mut Client) {
    for c in [a, b] {
        recv(&mut c.rx).await;
        recv(&mut c.rx).await;
        recv(&mut c.rx).await;
    }
}

#[tokio::test]
async fn start_game_promotes_after_session_reset() {
    let state = test_app_state();
    let (mut a, mut b) = join_pair(&state, "r1").await;
    pair_up(&state, "r1", &mut a, &mut b).await;

    // Simulate a finished game: session gone, selections cleared.
    {
        let shared = room(&state, "r1").await.expect("room");
        let mut room = shared.lock().await;
        room.reset_pairing();
        room.roster[0].selected_opponent = Some("bob".into());
        room.roster[1].selected_opponent = Some("alice".into());
    }

    start_game(&state, "r1").await;

    let shared = room(&state, "r1").await.expect("room");
    assert!(shared.lock().await.session.is_some());
}

// =============================================================================
// LEAVE / DISCONNECT
// =============================================================================

#[tokio::test]
async fn last_leave_destroys_the_room() {
    let state = test_app_state();
    let a = client();
    join(&state, "r1", "alice", &a).await;

    leave_room(&state, "r1", a.conn).await;

    assert!(room(&state, "r1").await.is_none());
}

#[tokio::test]
async fn leave_broadcasts_remaining_roster() {
    let state = test_app_state();
    let (a, mut b) = join_pair(&state, "r1").await;

    leave_room(&state, "r1", a.conn).await;

    let ServerMessage::LobbyUpdate { players, .. } = recv(&mut b.rx).await else {
        panic!("expected LOBBY_UPDATE");
    };
    assert_eq!(players, vec!["bob"]);
}

#[tokio::test]
async fn removing_an_unknown_connection_is_a_noop() {
    let state = test_app_state();
    let (a, mut b) = join_pair(&state, "r1").await;
    drop(a);

    leave_room(&state, "r1", Uuid::new_v4()).await;
    leave_room(&state, "ghost", Uuid::new_v4()).await;

    let shared = room(&state, "r1").await.expect("room survives");
    assert_eq!(shared.lock().await.roster.len(), 2);
    assert_empty(&mut b.rx).await;
}

#[tokio::test]
async fn disconnect_mid_session_tears_down_and_notifies_survivor() {
    // Scenario D.
    let state = test_app_state();
    let (mut a, mut b) = join_pair(&state, "r1").await;
    pair_up(&state, "r1", &mut a, &mut b).await;

    disconnect(&state, a.conn).await;

    let ServerMessage::LobbyUpdate { players, .. } = recv(&mut b.rx).await else {
        panic!("expected LOBBY_UPDATE");
    };
    assert_eq!(players, vec!["bob"]);

    let shared = room(&state, "r1").await.expect("room survives with one member");
    let room = shared.lock().await;
    assert!(room.session.is_none(), "abandonment destroys the session");
    assert!(!room.pairing_complete);
    assert_eq!(room.roster.len(), 1);
}

#[tokio::test]
async fn disconnect_removes_the_connection_from_every_room() {
    let state = test_app_state();
    let a = client();
    join(&state, "r1", "alice", &a).await;
    join(&state, "r2", "alice", &a).await;

    disconnect(&state, a.conn).await;

    assert!(room(&state, "r1").await.is_none());
    assert!(room(&state, "r2").await.is_none());
}

#[tokio::test]
async fn broadcast_skips_closed_receivers() {
    let state = test_app_state();
    let (a, mut b) = join_pair(&state, "r1").await;
    drop(a.rx); // alice's receiver is gone, sender stays on the roster

    let shared = room(&state, "r1").await.expect("room");
    {
        let room = shared.lock().await;
        broadcast(&room, &ServerMessage::LobbyUpdate { game: "r1".into(), players: room.player_names() });
    }

    // bob still hears it; the dead peer is skipped silently.
    let ServerMessage::LobbyUpdate { players, .. } = recv(&mut b.rx).await else {
        panic!("expected LOBBY_UPDATE");
    };
    assert_eq!(players, vec!["alice", "bob"]);
}
