//! End-to-end tests: a real server on a loopback port, driven by raw
//! protocol clients.

use std::sync::Arc;
use std::time::Duration;

use tictac::{NICKNAME_TOO_LONG, Registry, ShutdownHandle, TictacServer, version_mismatch_reason};
use tictac_game::Board;
use tictac_protocol::wire::{MAX_STRING_LEN, put_int};
use tictac_protocol::{ClientMessage, GameId, GameStatus, MessageKind, ServerMessage, Symbol};
use tictac_transport::{Connection, TcpConnection};
use tokio::io::{AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};

const RECV_TIMEOUT: Duration = Duration::from_secs(2);
const QUIET_WINDOW: Duration = Duration::from_millis(200);

// =========================================================================
// Harness
// =========================================================================

struct TestServer {
    addr: String,
    registry: Arc<Registry>,
    shutdown: ShutdownHandle,
    task: tokio::task::JoinHandle<Result<(), tictac::TictacError>>,
}

async fn start_server() -> TestServer {
    start_server_with(Some(Duration::from_secs(5))).await
}

async fn start_server_with(handshake_timeout: Option<Duration>) -> TestServer {
    let server = TictacServer::builder()
        .bind("127.0.0.1:0")
        .accept_poll_interval(Duration::from_millis(50))
        .handshake_timeout(handshake_timeout)
        .build()
        .await
        .unwrap();
    let addr = server.local_addr().unwrap().to_string();
    let registry = server.registry();
    let shutdown = server.shutdown_handle();
    let task = tokio::spawn(server.run());
    TestServer {
        addr,
        registry,
        shutdown,
        task,
    }
}

struct TestClient {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
}

impl TestClient {
    async fn connect(addr: &str) -> Self {
        let conn = TcpConnection::connect(addr).await.unwrap();
        let (reader, writer) = conn.into_split();
        Self {
            reader: BufReader::new(reader),
            writer,
        }
    }

    /// Connects and completes the handshake, returning the assigned nickname.
    async fn join(addr: &str, nickname: &str) -> (Self, String) {
        let mut client = Self::connect(addr).await;
        client.send(&ClientMessage::connect(nickname)).await;
        match client.recv().await {
            ServerMessage::Status { ok: true, detail } => (client, detail),
            other => panic!("expected STATUS ok, got {other:?}"),
        }
    }

    async fn send(&mut self, message: &ClientMessage) {
        self.send_raw(&message.encode().unwrap()).await;
    }

    async fn send_raw(&mut self, bytes: &[u8]) {
        self.writer.write_all(bytes).await.unwrap();
        self.writer.flush().await.unwrap();
    }

    async fn recv(&mut self) -> ServerMessage {
        tokio::time::timeout(RECV_TIMEOUT, ServerMessage::read_from(&mut self.reader))
            .await
            .expect("timed out waiting for a message")
            .unwrap()
            .expect("connection closed while waiting for a message")
    }

    async fn recv_n(&mut self, n: usize) -> Vec<ServerMessage> {
        let mut out = Vec::with_capacity(n);
        for _ in 0..n {
            out.push(self.recv().await);
        }
        out
    }

    /// Waits for the server to close the stream.
    async fn expect_closed(&mut self) {
        let read = tokio::time::timeout(RECV_TIMEOUT, ServerMessage::read_from(&mut self.reader))
            .await
            .expect("timed out waiting for close");
        assert!(matches!(read, Ok(None)), "expected EOF, got {read:?}");
    }

    /// Asserts nothing arrives for a short window.
    async fn expect_quiet(&mut self) {
        let read =
            tokio::time::timeout(QUIET_WINDOW, ServerMessage::read_from(&mut self.reader)).await;
        assert!(read.is_err(), "expected no message, got {read:?}");
    }
}

/// alice and bob in the lobby, with alice's join notice about bob consumed.
async fn alice_and_bob(addr: &str) -> (TestClient, TestClient) {
    let (mut alice, _) = TestClient::join(addr, "alice").await;
    let (bob, _) = TestClient::join(addr, "bob").await;
    assert_eq!(
        alice.recv().await,
        ServerMessage::PlayerUpdate {
            nickname: "bob".into(),
            score: 0
        }
    );
    (alice, bob)
}

/// alice (CROSS) and bob (NOUGHT) in game 1, all begin notices consumed.
async fn started_game(addr: &str) -> (TestClient, TestClient) {
    let (mut alice, mut bob) = alice_and_bob(addr).await;
    alice
        .send(&ClientMessage::RequestSend {
            nickname: "bob".into(),
        })
        .await;
    alice.recv().await;
    bob.recv().await;
    bob.send(&ClientMessage::RequestRespond {
        game_id: GameId(1),
        accept: true,
    })
    .await;
    alice.recv_n(2).await;
    bob.recv_n(2).await;
    (alice, bob)
}

fn mv(x: i32, y: i32) -> ClientMessage {
    ClientMessage::GameMove {
        game_id: GameId(1),
        x,
        y,
    }
}

fn update(can_move: bool, status: GameStatus) -> ServerMessage {
    ServerMessage::GameUpdate {
        game_id: GameId(1),
        can_move,
        status,
    }
}

// =========================================================================
// Handshake
// =========================================================================

#[tokio::test]
async fn test_handshake_duplicate_nicknames_get_suffixes() {
    let server = start_server().await;

    let (_a, first) = TestClient::join(&server.addr, "N").await;
    let (_b, second) = TestClient::join(&server.addr, "N").await;
    let (_c, third) = TestClient::join(&server.addr, "N").await;

    assert_eq!(first, "N");
    assert_eq!(second, "N [1]");
    assert_eq!(third, "N [2]");
    assert_eq!(server.registry.player_count().await, 3);
}

#[tokio::test]
async fn test_handshake_version_mismatch_rejected_and_closed() {
    let server = start_server().await;
    let mut client = TestClient::connect(&server.addr).await;
    client
        .send(&ClientMessage::Connect {
            version: 2,
            nickname: "alice".into(),
            reserved: 0,
        })
        .await;

    assert_eq!(
        client.recv().await,
        ServerMessage::Status {
            ok: false,
            detail: version_mismatch_reason(2)
        }
    );
    client.expect_closed().await;
    assert_eq!(server.registry.player_count().await, 0);
}

#[tokio::test]
async fn test_handshake_taken_nickname_without_room_for_suffix_is_rejected() {
    let server = start_server().await;
    let long = "x".repeat(MAX_STRING_LEN - 2);
    let (mut carol, _) = TestClient::join(&server.addr, "carol").await;
    let (mut first, _) = TestClient::join(&server.addr, &long).await;
    carol.recv().await;

    let mut second = TestClient::connect(&server.addr).await;
    second.send(&ClientMessage::connect(&long)).await;
    assert_eq!(
        second.recv().await,
        ServerMessage::Status {
            ok: false,
            detail: NICKNAME_TOO_LONG.into()
        }
    );
    second.expect_closed().await;

    // Everyone already in the lobby stays connected and hears nothing.
    carol.expect_quiet().await;
    first.expect_quiet().await;
    carol.send(&ClientMessage::PlayerGetList).await;
    assert_eq!(carol.recv_n(2).await.len(), 2);
    first.send(&ClientMessage::PlayerGetList).await;
    assert_eq!(first.recv_n(2).await.len(), 2);
    assert_eq!(server.registry.player_count().await, 2);
}

#[tokio::test]
async fn test_handshake_wrong_first_opcode_closes_without_reply() {
    let server = start_server().await;
    let mut client = TestClient::connect(&server.addr).await;
    client.send(&ClientMessage::PlayerGetList).await;

    client.expect_closed().await;
    assert_eq!(server.registry.player_count().await, 0);
}

#[tokio::test]
async fn test_handshake_timeout_closes_silent_connection() {
    let server = start_server_with(Some(Duration::from_millis(100))).await;
    let mut client = TestClient::connect(&server.addr).await;

    client.expect_closed().await;
    assert_eq!(server.registry.player_count().await, 0);
}

// =========================================================================
// Lobby
// =========================================================================

#[tokio::test]
async fn test_join_and_leave_are_broadcast() {
    let server = start_server().await;
    let (mut alice, bob) = alice_and_bob(&server.addr).await;

    drop(bob);
    assert_eq!(
        alice.recv().await,
        ServerMessage::PlayerLeave {
            nickname: "bob".into()
        }
    );
}

#[tokio::test]
async fn test_player_list_includes_requester_in_order() {
    let server = start_server().await;
    let (_alice, mut bob) = alice_and_bob(&server.addr).await;

    bob.send(&ClientMessage::PlayerGetList).await;
    assert_eq!(
        bob.recv_n(2).await,
        vec![
            ServerMessage::PlayerUpdate {
                nickname: "alice".into(),
                score: 0
            },
            ServerMessage::PlayerUpdate {
                nickname: "bob".into(),
                score: 0
            },
        ]
    );
}

#[tokio::test]
async fn test_unknown_opcode_is_ignored() {
    let server = start_server().await;
    let (mut alice, _) = TestClient::join(&server.addr, "alice").await;

    let mut bytes = Vec::new();
    put_int(&mut bytes, 999);
    alice.send_raw(&bytes).await;
    alice.send(&ClientMessage::PlayerGetList).await;

    assert_eq!(
        alice.recv().await,
        ServerMessage::PlayerUpdate {
            nickname: "alice".into(),
            score: 0
        }
    );
}

// =========================================================================
// Challenges
// =========================================================================

#[tokio::test]
async fn test_challenge_accept_and_first_move() {
    let server = start_server().await;
    let (mut alice, mut bob) = alice_and_bob(&server.addr).await;

    alice
        .send(&ClientMessage::RequestSend {
            nickname: "bob".into(),
        })
        .await;
    assert_eq!(
        alice.recv().await,
        ServerMessage::RequestSent {
            game_id: GameId(1),
            nickname: "bob".into()
        }
    );
    assert_eq!(
        bob.recv().await,
        ServerMessage::RequestReceived {
            game_id: GameId(1),
            from: "alice".into()
        }
    );

    bob.send(&ClientMessage::RequestRespond {
        game_id: GameId(1),
        accept: true,
    })
    .await;
    assert_eq!(
        alice.recv_n(2).await,
        vec![
            ServerMessage::GameBegin {
                game_id: GameId(1),
                opponent: "bob".into(),
                symbol: Symbol::Cross
            },
            update(true, GameStatus::InProgress),
        ]
    );
    assert_eq!(
        bob.recv_n(2).await,
        vec![
            ServerMessage::GameBegin {
                game_id: GameId(1),
                opponent: "alice".into(),
                symbol: Symbol::Nought
            },
            update(false, GameStatus::InProgress),
        ]
    );

    alice.send(&mv(0, 0)).await;
    let placed = ServerMessage::GameMove {
        game_id: GameId(1),
        x: 0,
        y: 0,
        symbol: Symbol::Cross,
    };
    assert_eq!(
        alice.recv_n(2).await,
        vec![placed.clone(), update(false, GameStatus::InProgress)]
    );
    assert_eq!(
        bob.recv_n(2).await,
        vec![placed, update(true, GameStatus::InProgress)]
    );
}

#[tokio::test]
async fn test_challenge_unknown_player_reports_not_found() {
    let server = start_server().await;
    let (mut alice, mut bob) = alice_and_bob(&server.addr).await;

    alice
        .send(&ClientMessage::RequestSend {
            nickname: "carol".into(),
        })
        .await;
    assert_eq!(
        alice.recv().await,
        ServerMessage::RequestSent {
            game_id: GameId::NONE,
            nickname: "carol".into()
        }
    );
    bob.expect_quiet().await;
    assert_eq!(server.registry.game_count().await, 0);
}

#[tokio::test]
async fn test_challenge_declined_notifies_initiator() {
    let server = start_server().await;
    let (mut alice, mut bob) = alice_and_bob(&server.addr).await;

    alice
        .send(&ClientMessage::RequestSend {
            nickname: "bob".into(),
        })
        .await;
    alice.recv().await;
    bob.recv().await;

    bob.send(&ClientMessage::RequestRespond {
        game_id: GameId(1),
        accept: false,
    })
    .await;
    assert_eq!(
        alice.recv().await,
        ServerMessage::Message {
            game_id: GameId::NONE,
            body: "bob declined your game request.".into(),
            title: "Game Request".into(),
            kind: MessageKind::INFORMATION
        }
    );
    bob.expect_quiet().await;
    assert!(server.registry.game(GameId(1)).await.is_none());
}

#[tokio::test]
async fn test_initiator_cannot_accept_own_challenge() {
    let server = start_server().await;
    let (mut alice, mut bob) = alice_and_bob(&server.addr).await;

    alice
        .send(&ClientMessage::RequestSend {
            nickname: "bob".into(),
        })
        .await;
    alice.recv().await;
    bob.recv().await;

    alice
        .send(&ClientMessage::RequestRespond {
            game_id: GameId(1),
            accept: true,
        })
        .await;
    assert!(matches!(
        alice.recv().await,
        ServerMessage::Message { kind: MessageKind::ERROR, .. }
    ));
    bob.expect_quiet().await;
}

// =========================================================================
// Play
// =========================================================================

#[tokio::test]
async fn test_out_of_turn_move_rejected_only_to_mover() {
    let server = start_server().await;
    let (mut alice, mut bob) = started_game(&server.addr).await;

    bob.send(&mv(1, 1)).await;
    assert_eq!(
        bob.recv().await,
        ServerMessage::Message {
            game_id: GameId(1),
            body: "You cannot make a move right now.".into(),
            title: "Game".into(),
            kind: MessageKind::ERROR
        }
    );
    alice.expect_quiet().await;

    let game = server.registry.game(GameId(1)).await.unwrap();
    assert_eq!(game.board().await, Board::new());
}

#[tokio::test]
async fn test_move_in_unknown_game_is_rejected() {
    let server = start_server().await;
    let (mut alice, _) = TestClient::join(&server.addr, "alice").await;

    alice
        .send(&ClientMessage::GameMove {
            game_id: GameId(42),
            x: 0,
            y: 0,
        })
        .await;
    assert_eq!(
        alice.recv().await,
        ServerMessage::Message {
            game_id: GameId::NONE,
            body: "That game does not exist.".into(),
            title: "Game".into(),
            kind: MessageKind::ERROR
        }
    );
}

#[tokio::test]
async fn test_full_board_draw_removes_game_and_next_gets_new_id() {
    let server = start_server().await;
    let (mut alice, mut bob) = started_game(&server.addr).await;

    // X O X / X O O / O X X
    let moves = [(0, 0), (1, 0), (2, 0), (1, 1), (0, 1), (2, 1), (1, 2), (0, 2)];
    for (i, &(x, y)) in moves.iter().enumerate() {
        let mover = if i % 2 == 0 { &mut alice } else { &mut bob };
        mover.send(&mv(x, y)).await;
        alice.recv_n(2).await;
        bob.recv_n(2).await;
    }

    alice.send(&mv(2, 2)).await;
    assert_eq!(alice.recv_n(2).await[1], update(false, GameStatus::Draw));
    assert_eq!(bob.recv_n(2).await[1], update(false, GameStatus::Draw));
    assert!(server.registry.game(GameId(1)).await.is_none());

    alice
        .send(&ClientMessage::RequestSend {
            nickname: "bob".into(),
        })
        .await;
    assert_eq!(
        alice.recv().await,
        ServerMessage::RequestSent {
            game_id: GameId(2),
            nickname: "bob".into()
        }
    );
}

#[tokio::test]
async fn test_win_reports_result_and_broadcasts_score() {
    let server = start_server().await;
    let (mut alice, mut bob) = started_game(&server.addr).await;

    for (i, &(x, y)) in [(0, 0), (1, 0), (0, 1), (1, 1)].iter().enumerate() {
        let mover = if i % 2 == 0 { &mut alice } else { &mut bob };
        mover.send(&mv(x, y)).await;
        alice.recv_n(2).await;
        bob.recv_n(2).await;
    }

    alice.send(&mv(0, 2)).await;
    let to_alice = alice.recv_n(3).await;
    let to_bob = bob.recv_n(3).await;
    assert_eq!(to_alice[1], update(false, GameStatus::Won));
    assert_eq!(to_bob[1], update(false, GameStatus::Lost));

    let score = ServerMessage::PlayerUpdate {
        nickname: "alice".into(),
        score: 1,
    };
    assert_eq!(to_alice[2], score);
    assert_eq!(to_bob[2], score);
    assert_eq!(
        server.registry.session("alice").await.unwrap().score(),
        1
    );
}

#[tokio::test]
async fn test_forfeit_tells_only_the_opponent() {
    let server = start_server().await;
    let (mut alice, mut bob) = started_game(&server.addr).await;

    bob.send(&ClientMessage::GameForfeit { game_id: GameId(1) })
        .await;
    assert_eq!(
        alice.recv_n(2).await,
        vec![
            ServerMessage::Message {
                game_id: GameId(1),
                body: "This game has terminated early because:\nbob forfeit.".into(),
                title: "Game Terminated".into(),
                kind: MessageKind::ERROR
            },
            update(false, GameStatus::Draw),
        ]
    );
    bob.expect_quiet().await;
    assert_eq!(server.registry.game_count().await, 0);
}

#[tokio::test]
async fn test_forfeit_before_start_is_rejected() {
    let server = start_server().await;
    let (mut alice, mut bob) = alice_and_bob(&server.addr).await;

    alice
        .send(&ClientMessage::RequestSend {
            nickname: "bob".into(),
        })
        .await;
    alice.recv().await;
    bob.recv().await;

    alice
        .send(&ClientMessage::GameForfeit { game_id: GameId(1) })
        .await;
    assert_eq!(
        alice.recv().await,
        ServerMessage::Message {
            game_id: GameId(1),
            body: "That game has not started.".into(),
            title: "Game".into(),
            kind: MessageKind::ERROR
        }
    );
    assert_eq!(server.registry.game_count().await, 1);
}

#[tokio::test]
async fn test_disconnect_mid_game_ends_it_for_survivor() {
    let server = start_server().await;
    let (alice, mut bob) = started_game(&server.addr).await;

    drop(alice);
    assert_eq!(
        bob.recv_n(3).await,
        vec![
            ServerMessage::PlayerLeave {
                nickname: "alice".into()
            },
            ServerMessage::Message {
                game_id: GameId(1),
                body: "This game has terminated early because:\nalice disconnected.".into(),
                title: "Game Terminated".into(),
                kind: MessageKind::ERROR
            },
            update(false, GameStatus::Draw),
        ]
    );
    assert!(server.registry.game(GameId(1)).await.is_none());
    assert_eq!(server.registry.player_count().await, 1);
}

// =========================================================================
// Shutdown
// =========================================================================

#[tokio::test]
async fn test_shutdown_stops_accept_loop() {
    let server = start_server().await;
    server.shutdown.stop();

    let result = tokio::time::timeout(RECV_TIMEOUT, server.task)
        .await
        .expect("accept loop did not stop")
        .unwrap();
    assert!(result.is_ok());
}
