//! Primitive encoders and decoders.
//!
//! The layout matches a Java `DataOutputStream`:
//!
//! | Type     | Bytes                                      |
//! |----------|--------------------------------------------|
//! | `int`    | 4, big-endian two's complement             |
//! | `bool`   | 1, zero is `false`, anything else `true`   |
//! | `string` | `u16` big-endian byte length, then UTF-8   |
//!
//! Encoding appends to a `Vec<u8>` so a whole message is built in memory
//! and handed to the writer in one piece. Decoding reads straight from an
//! async stream; a short read surfaces as [`ProtocolError::Io`] with
//! `UnexpectedEof`.

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncRead, AsyncReadExt};

use crate::ProtocolError;

/// Longest string, in UTF-8 bytes, a `u16` length prefix can describe.
pub const MAX_STRING_LEN: usize = u16::MAX as usize;

// ---------------------------------------------------------------------------
// Encoding
// ---------------------------------------------------------------------------

pub fn put_int(buf: &mut Vec<u8>, value: i32) {
    buf.extend_from_slice(&value.to_be_bytes());
}

pub fn put_bool(buf: &mut Vec<u8>, value: bool) {
    buf.push(u8::from(value));
}

/// Appends a length-prefixed UTF-8 string.
///
/// # Errors
/// Returns [`ProtocolError::StringTooLong`] if the encoded string does not
/// fit a `u16` length prefix. Nothing is appended in that case.
pub fn put_string(buf: &mut Vec<u8>, value: &str) -> Result<(), ProtocolError> {
    let bytes = value.as_bytes();
    let len = u16::try_from(bytes.len()).map_err(|_| ProtocolError::StringTooLong(bytes.len()))?;
    buf.extend_from_slice(&len.to_be_bytes());
    buf.extend_from_slice(bytes);
    Ok(())
}

// ---------------------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------------------

pub async fn read_int<R>(reader: &mut R) -> Result<i32, ProtocolError>
where
    R: AsyncRead + Unpin,
{
    Ok(reader.read_i32().await?)
}

pub async fn read_bool<R>(reader: &mut R) -> Result<bool, ProtocolError>
where
    R: AsyncRead + Unpin,
{
    Ok(reader.read_u8().await? != 0)
}

pub async fn read_string<R>(reader: &mut R) -> Result<String, ProtocolError>
where
    R: AsyncRead + Unpin,
{
    let len = reader.read_u16().await?;
    let mut bytes = vec![0u8; usize::from(len)];
    reader.read_exact(&mut bytes).await?;
    String::from_utf8(bytes).map_err(|_| ProtocolError::InvalidUtf8)
}

/// Reads the opcode that starts every message.
///
/// Returns `Ok(None)` when the stream ended cleanly on a message boundary,
/// which is how a peer that simply closes its socket looks. A stream that
/// ends partway through the opcode is still an error.
pub async fn read_opcode<R>(reader: &mut R) -> Result<Option<i32>, ProtocolError>
where
    R: AsyncBufRead + Unpin,
{
    if reader.fill_buf().await?.is_empty() {
        return Ok(None);
    }
    read_int(reader).await.map(Some)
}
