//! Chunked transfer of buffers larger than one report.
//!
//! Reads ask the firmware for successive chunks at a little-endian 16-bit
//! offset and splice each response's payload into the output. Writes cut the
//! source into `MSG_LEN - 4` byte chunks, each prefixed by its offset.
//! Both run strictly one round trip at a time.

use crate::comm::Dispatcher;
use crate::error::{Error, Result};
use crate::protocol::{le16, MSG_LEN};
use crate::transport::HidTransport;
use tracing::debug;

/// Payload bytes carried by one write chunk.
pub const WRITE_CHUNK_LEN: usize = MSG_LEN - 4;

/// Read `total_size` bytes using repeated `command` requests.
///
/// With `slice = Some(n)` every request carries the current chunk offset and
/// the payload of each response starts at byte `n`; the offset advances by
/// `MSG_LEN - n` per round trip. With `slice = None` no offset is sent and
/// whole responses are concatenated.
///
/// `until` is checked after every round trip against the bytes collected so
/// far; returning `true` stops the transfer early (the rest stays zero).
pub fn read_buffer<T: HidTransport>(
    d: &mut Dispatcher<T>,
    command: u8,
    total_size: usize,
    slice: Option<usize>,
    until: Option<&dyn Fn(&[u8]) -> bool>,
) -> Result<Vec<u8>> {
    let start = slice.unwrap_or(0);
    if start >= MSG_LEN {
        return Err(Error::InvalidSlice(start));
    }

    let mut buffer = vec![0u8; total_size];
    let mut offset = 0usize;
    let mut chunk_offset = 0usize;
    let mut rounds = 0usize;

    while offset < total_size {
        let args = match slice {
            Some(_) => le16(chunk_offset_u16(chunk_offset)?).to_vec(),
            None => Vec::new(),
        };
        let data = d.send_raw(command, &args)?;
        rounds += 1;

        let payload = data.get(start..).unwrap_or_default();
        let n = payload.len().min(total_size - offset);
        if n == 0 {
            return Err(Error::Protocol(format!(
                "empty chunk at offset {chunk_offset} ({} byte response)",
                data.len()
            )));
        }
        buffer[offset..offset + n].copy_from_slice(&payload[..n]);
        offset += n;

        if until.is_some_and(|done| done(&buffer[..offset])) {
            debug!(offset, total_size, "Buffer read stopped early");
            break;
        }
        chunk_offset += MSG_LEN - start;
    }

    debug!(command, total_size, rounds, "Buffer read complete");
    Ok(buffer)
}

/// Write `total_size` bytes of `source` using repeated `command` requests.
///
/// Bytes past the end of `source` are sent as zero.
pub fn write_buffer<T: HidTransport>(
    d: &mut Dispatcher<T>,
    command: u8,
    total_size: usize,
    source: &[u8],
) -> Result<()> {
    let mut offset = 0usize;
    let mut rounds = 0usize;

    while offset < total_size {
        let n = WRITE_CHUNK_LEN.min(total_size - offset);
        let mut args = Vec::with_capacity(2 + n);
        args.extend_from_slice(&le16(chunk_offset_u16(offset)?));
        args.extend((offset..offset + n).map(|i| source.get(i).copied().unwrap_or(0)));

        d.send_raw(command, &args)?;
        rounds += 1;
        offset += n;
    }

    debug!(command, total_size, rounds, "Buffer write complete");
    Ok(())
}

fn chunk_offset_u16(offset: usize) -> Result<u16> {
    u16::try_from(offset)
        .map_err(|_| Error::Protocol(format!("buffer offset {offset} exceeds 16 bits")))
}
