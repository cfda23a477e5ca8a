//! Session layer for tictac.
//!
//! A session is the server's record of one connected, handshake-completed
//! client:
//!
//! 1. **Identity** ([`SessionHandle`]): nickname, score, the games it is
//!    playing, and a process-unique [`SessionId`]
//! 2. **Outbound delivery** ([`writer`]): a FIFO of [`Outbound`] items
//!    drained by exactly one writer task per connection
//! 3. **Nickname arbitration** ([`nickname::resolve`]): `"N"`, `"N [1]"`,
//!    `"N [2]"`, ...
//!
//! # How it fits in the stack
//!
//! ```text
//! Registry / Games (above)  ← hold SessionHandles, push ServerMessages
//!     ↕
//! Session Layer (this crate)  ← queues and writes messages per peer
//!     ↕
//! Protocol Layer (below)  ← provides ServerMessage and the wire codec
//! ```

mod error;
pub mod nickname;
mod session;
pub mod writer;

pub use error::SessionError;
pub use session::{Outbound, SessionHandle, SessionId};
