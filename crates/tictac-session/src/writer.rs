//! The per-connection writer task.
//!
//! Exactly one writer owns a connection's write half. Everything else
//! (reader task, registry broadcasts, game logic) only pushes onto the
//! unbounded queue, so a slow peer never blocks anyone but itself.

use tictac_protocol::Encode;
use tokio::io::{AsyncWrite, AsyncWriteExt, BufWriter};
use tokio::sync::mpsc;

use crate::{Outbound, SessionError};

/// Drains `queue` into `writer` until a [`Outbound::Close`] marker or
/// until every sender is dropped.
///
/// Messages are written in queue order. The buffer is flushed whenever
/// the queue is momentarily empty, so bursts (e.g. a roster replay) go
/// out in as few segments as possible without delaying a lone message.
/// On exit the write half is shut down, which the peer sees as EOF.
///
/// A message that cannot be encoded is logged and skipped; the peer
/// never sees it and the stream stays in sync.
///
/// # Errors
/// Returns the first I/O failure. The remaining queue is abandoned; the
/// reader side is expected to notice and clean up.
pub async fn run<W, M>(
    writer: W,
    mut queue: mpsc::UnboundedReceiver<Outbound<M>>,
) -> Result<(), SessionError>
where
    W: AsyncWrite + Unpin,
    M: Encode,
{
    let mut writer = BufWriter::new(writer);

    while let Some(item) = queue.recv().await {
        match item {
            Outbound::Message(message) => {
                match message.encode() {
                    Ok(bytes) => writer.write_all(&bytes).await?,
                    Err(e) => tracing::warn!(error = %e, "dropping message that cannot be encoded"),
                }
                if queue.is_empty() {
                    writer.flush().await?;
                }
            }
            Outbound::Close => break,
        }
    }

    writer.flush().await?;
    writer.shutdown().await?;
    Ok(())
}
