//! # tictac-client
//!
//! Client side of the tictac protocol.
//!
//! [`Client`] owns the connection. Every server message it receives is
//! folded into a [`Mirror`]: a [`Lobby`] roster plus one [`GameView`]
//! per running game. Front ends watch the mirror through the
//! [`LobbyObserver`] and [`GameObserver`] traits.
//!
//! ```rust,no_run
//! use tictac_client::Client;
//!
//! # async fn play() -> Result<(), tictac_client::ClientError> {
//! let mut client = Client::connect("127.0.0.1:4000", "alice").await?;
//! client.request_players()?;
//! while let Some(message) = client.recv().await {
//!     println!("{message:?}");
//! }
//! # Ok(())
//! # }
//! ```

mod client;
mod error;
mod game_view;
mod lobby;
mod mirror;
mod observer;

pub use client::Client;
pub use error::ClientError;
pub use game_view::GameView;
pub use lobby::Lobby;
pub use mirror::Mirror;
pub use observer::{GameObserver, LobbyObserver};
