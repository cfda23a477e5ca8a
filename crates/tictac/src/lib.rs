//! # tictac
//!
//! Matchmaking and turn-based tic-tac-toe server.
//!
//! Clients connect over TCP, register a nickname, see who else is in the
//! lobby, challenge each other, and play 3×3 games. The server owns all
//! game state; clients only mirror it.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use tictac::TictacServer;
//!
//! # async fn start() -> Result<(), tictac::TictacError> {
//! let server = TictacServer::builder()
//!     .bind("0.0.0.0:4000")
//!     .build()
//!     .await?;
//! server.run().await
//! # }
//! ```
//!
//! ## Layers
//!
//! ```text
//! tictac-transport  TCP accept / connect, split halves
//! tictac-protocol   opcodes and the binary message codec
//! tictac-session    per-player handle, outbound queue, writer task
//! tictac-game       board and game rules
//! tictac            registry, shared games, connection handler, server
//! ```

mod error;
mod handler;
mod registry;
mod server;
mod table;

pub use error::TictacError;
pub use handler::version_mismatch_reason;
pub use registry::{NICKNAME_TOO_LONG, Registry};
pub use server::{ServerConfig, ShutdownHandle, TictacServer, TictacServerBuilder};
pub use table::GameHandle;
