//! Session types: the server's handle on one connected player.
//!
//! A [`SessionHandle`] is cheap to clone and shared between the
//! connection's reader task, the registry, and every game the player is
//! in. It tracks:
//! - WHO the player is (nickname and [`SessionId`])
//! - HOW they are doing (score)
//! - WHERE they are playing (set of [`GameId`]s)
//! - HOW to reach them (the outbound queue)

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicI32, AtomicU64, Ordering};

use tictac_protocol::{GameId, ServerMessage};
use tokio::sync::{Mutex, mpsc};

/// Counter for generating unique session IDs.
static NEXT_SESSION_ID: AtomicU64 = AtomicU64::new(1);

// ---------------------------------------------------------------------------
// SessionId
// ---------------------------------------------------------------------------

/// Process-unique identity of a session.
///
/// Nicknames can be reused once a player leaves, so identity checks
/// ("is the registry entry for `alice` still *this* connection?") compare
/// session ids, not names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(u64);

impl SessionId {
    fn next() -> Self {
        Self(NEXT_SESSION_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "S-{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Outbound
// ---------------------------------------------------------------------------

/// One item on a connection's outbound queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound<M> {
    /// Encode and write this message.
    Message(M),
    /// Write everything queued before this marker, then shut down the
    /// write half and stop.
    Close,
}

// ---------------------------------------------------------------------------
// SessionHandle
// ---------------------------------------------------------------------------

struct Inner {
    id: SessionId,
    nickname: String,
    score: AtomicI32,
    games: Mutex<HashSet<GameId>>,
    closed: AtomicBool,
    outbound: mpsc::UnboundedSender<Outbound<ServerMessage>>,
}

/// Shared handle on a registered session.
///
/// All methods take `&self`; mutable parts are atomics or behind the
/// session's own lock, so no caller ever needs exclusive access.
#[derive(Clone)]
pub struct SessionHandle {
    inner: Arc<Inner>,
}

impl SessionHandle {
    /// Creates a session with a final, already-arbitrated nickname.
    pub fn new(
        nickname: impl Into<String>,
        outbound: mpsc::UnboundedSender<Outbound<ServerMessage>>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                id: SessionId::next(),
                nickname: nickname.into(),
                score: AtomicI32::new(0),
                games: Mutex::new(HashSet::new()),
                closed: AtomicBool::new(false),
                outbound,
            }),
        }
    }

    pub fn id(&self) -> SessionId {
        self.inner.id
    }

    pub fn nickname(&self) -> &str {
        &self.inner.nickname
    }

    pub fn score(&self) -> i32 {
        self.inner.score.load(Ordering::Acquire)
    }

    /// Adds one win and returns the new score.
    pub fn record_win(&self) -> i32 {
        self.inner.score.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// The PLAYER_UPDATE announcing this session's current score.
    pub fn player_update(&self) -> ServerMessage {
        ServerMessage::PlayerUpdate {
            nickname: self.inner.nickname.clone(),
            score: self.score(),
        }
    }

    /// Queues a message for this peer.
    ///
    /// Never blocks. If the writer task is already gone the message is
    /// dropped: the connection is being torn down and cleanup will run
    /// from the reader side.
    pub fn send(&self, message: ServerMessage) {
        if self
            .inner
            .outbound
            .send(Outbound::Message(message))
            .is_err()
        {
            tracing::trace!(session = %self.inner.id, "outbound queue closed, dropping message");
        }
    }

    /// Queues the close marker. Messages queued earlier are still written.
    pub fn close(&self) {
        let _ = self.inner.outbound.send(Outbound::Close);
    }

    /// Marks the session as gone from the registry.
    ///
    /// Anything that links a session into new state (e.g. a freshly
    /// created game) checks this flag afterwards and unwinds if set.
    pub fn mark_closed(&self) {
        self.inner.closed.store(true, Ordering::Release);
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }

    pub async fn add_game(&self, game_id: GameId) {
        self.inner.games.lock().await.insert(game_id);
    }

    pub async fn remove_game(&self, game_id: GameId) {
        self.inner.games.lock().await.remove(&game_id);
    }

    /// Snapshot of the games this session participates in, sorted.
    pub async fn games(&self) -> Vec<GameId> {
        let mut games: Vec<GameId> = self.inner.games.lock().await.iter().copied().collect();
        games.sort_unstable();
        games
    }
}

impl fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionHandle")
            .field("id", &self.inner.id)
            .field("nickname", &self.inner.nickname)
            .field("score", &self.score())
            .field("closed", &self.is_closed())
            .finish()
    }
}

impl fmt::Display for SessionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.inner.nickname, self.inner.id)
    }
}
