//! Versioned binary wire format for block payloads.
//!
//! A request is a serialized ordered sequence of blocks; a reply is a
//! serialized sequence of result blocks with identical count and order. No
//! position metadata is transmitted: block identity is positional, so both
//! ends must iterate in the same order.
//!
//! Every message body starts with a three-byte header: magic, format
//! version, and message kind. The exit sentinel is the fixed body
//! `[MAGIC, VERSION, KIND_EXIT]`, which no payload body can collide with;
//! recipients check for it before attempting any payload decode.
//!
//! On the wire, bodies travel in frames: a big-endian `u32` body length
//! followed by the body itself. All multi-byte integers are big-endian.
//!
//! ## Payload body layout
//!
//! ```text
//! [MAGIC u8][VERSION u8][KIND_PAYLOAD u8][count u32]
//!   repeated count times:
//!     [rows u32][cols u32][rows * cols cells, row-major, one byte each]
//! ```

use crate::{CELL_SIZE, Error, Result};
use crate::grid::Block;
use bytes::{Buf, BufMut, Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// First byte of every gridcast message body.
pub const WIRE_MAGIC: u8 = 0x47;

/// Current wire format version. Both ends must agree.
pub const WIRE_VERSION: u8 = 1;

const KIND_PAYLOAD: u8 = 0x01;
const KIND_EXIT: u8 = 0x7f;

/// The fixed message body that tells a worker to terminate.
pub const EXIT_SENTINEL: [u8; 3] = [WIRE_MAGIC, WIRE_VERSION, KIND_EXIT];

/// Upper bound on a single frame body. Protects both ends from allocating
/// on a corrupt length prefix.
pub const MAX_FRAME_BYTES: usize = 1 << 30;

/// Returns `true` if `body` is the exit sentinel.
pub fn is_exit(body: &[u8]) -> bool {
    body == EXIT_SENTINEL
}

/// Serializes an ordered sequence of blocks into a payload body.
pub fn encode_payload(blocks: &[Block]) -> Bytes {
    let cells: usize = blocks.iter().map(|b| b.cells().len()).sum();
    let mut buf = BytesMut::with_capacity(3 + 4 + blocks.len() * 8 + cells * CELL_SIZE);

    buf.put_u8(WIRE_MAGIC);
    buf.put_u8(WIRE_VERSION);
    buf.put_u8(KIND_PAYLOAD);
    buf.put_u32(blocks.len() as u32);
    for block in blocks {
        buf.put_u32(block.rows() as u32);
        buf.put_u32(block.cols() as u32);
        buf.put_slice(block.cells());
    }
    buf.freeze()
}

/// Deserializes a payload body into its ordered sequence of blocks.
///
/// # Errors
///
/// Returns [`Error::Codec`] on a bad magic/version/kind byte, a truncated
/// body, trailing garbage, or a block whose declared dimensions overflow.
/// The exit sentinel is deliberately not decodable as a payload.
pub fn decode_payload(body: &[u8]) -> Result<Vec<Block>> {
    let mut buf = body;

    if buf.remaining() < 3 {
        return Err(Error::Codec {
            context: format!("body of {} bytes is shorter than the header", body.len()),
        });
    }
    let magic = buf.get_u8();
    let version = buf.get_u8();
    let kind = buf.get_u8();
    if magic != WIRE_MAGIC {
        return Err(Error::Codec {
            context: format!("bad magic byte 0x{magic:02x}"),
        });
    }
    if version != WIRE_VERSION {
        return Err(Error::Codec {
            context: format!("unsupported wire version {version} (expected {WIRE_VERSION})"),
        });
    }
    if kind != KIND_PAYLOAD {
        return Err(Error::Codec {
            context: format!("body kind 0x{kind:02x} is not a payload"),
        });
    }

    if buf.remaining() < 4 {
        return Err(Error::Codec {
            context: "payload truncated before block count".to_string(),
        });
    }
    let count = buf.get_u32() as usize;

    let mut blocks = Vec::with_capacity(count.min(1024));
    for i in 0..count {
        if buf.remaining() < 8 {
            return Err(Error::Codec {
                context: format!("payload truncated in header of block {i}"),
            });
        }
        let rows = buf.get_u32() as usize;
        let cols = buf.get_u32() as usize;
        let cells = rows.checked_mul(cols).ok_or_else(|| Error::Codec {
            context: format!("block {i} dimensions {rows}x{cols} overflow"),
        })?;
        if buf.remaining() < cells * CELL_SIZE {
            return Err(Error::Codec {
                context: format!(
                    "payload truncated in block {i}: need {} cell bytes, have {}",
                    cells * CELL_SIZE,
                    buf.remaining()
                ),
            });
        }
        let mut data = vec![0u8; cells];
        buf.copy_to_slice(&mut data);
        blocks.push(Block::from_cells(rows, cols, data)?);
    }

    if buf.has_remaining() {
        return Err(Error::Codec {
            context: format!("{} trailing bytes after the last block", buf.remaining()),
        });
    }
    Ok(blocks)
}

/// Writes one length-prefixed frame.
pub async fn write_frame<W>(writer: &mut W, body: &[u8]) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    if body.len() > MAX_FRAME_BYTES {
        return Err(Error::Codec {
            context: format!("frame body of {} bytes exceeds the frame limit", body.len()),
        });
    }
    writer.write_u32(body.len() as u32).await?;
    writer.write_all(body).await?;
    writer.flush().await?;
    Ok(())
}

/// Reads one length-prefixed frame body.
///
/// # Errors
///
/// Returns [`Error::Transport`] on socket failure or EOF, and
/// [`Error::Codec`] if the length prefix exceeds [`MAX_FRAME_BYTES`].
pub async fn read_frame<R>(reader: &mut R) -> Result<Vec<u8>>
where
    R: AsyncRead + Unpin,
{
    let len = reader.read_u32().await? as usize;
    if len > MAX_FRAME_BYTES {
        return Err(Error::Codec {
            context: format!("frame length prefix of {len} bytes exceeds the frame limit"),
        });
    }
    let mut body = vec![0u8; len];
    reader.read_exact(&mut body).await?;
    Ok(body)
}
