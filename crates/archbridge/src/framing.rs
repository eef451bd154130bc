//! Length-prefixed message framing over a byte stream.
//!
//! Each message is `[len: u32 LE][payload: len]`. A stream that ends exactly
//! on a message boundary is a clean close; ending anywhere else is a lost
//! connection. An oversized message is read off the stream and discarded, so
//! the reader stays on a message boundary.

use std::io;
use std::io::ErrorKind;
use std::io::Read;
use std::io::Write;

use crate::transport::Error;
use crate::transport::Result;

pub(crate) fn write_message<W: Write>(w: &mut W, payload: &[u8], limit: usize) -> Result<()> {
    if payload.len() > limit {
        return Err(Error::PayloadTooLarge { size: payload.len(), limit });
    }
    let len = u32::try_from(payload.len())
        .map_err(|_| Error::PayloadTooLarge { size: payload.len(), limit: u32::MAX as usize })?;

    w.write_all(&len.to_le_bytes())?;
    w.write_all(payload)?;
    w.flush()?;
    Ok(())
}

pub(crate) fn read_message<R: Read>(r: &mut R, limit: usize) -> Result<Option<Vec<u8>>> {
    let mut header = [0u8; 4];
    let mut filled = 0;
    while filled < header.len() {
        match r.read(&mut header[filled..]) {
            Ok(0) if filled == 0 => return Ok(None),
            Ok(0) => return Err(Error::ConnectionLost("stream ended inside a length prefix".into())),
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }

    let len = u32::from_le_bytes(header) as usize;
    if len > limit {
        let discarded = io::copy(&mut r.by_ref().take(len as u64), &mut io::sink())?;
        if discarded < len as u64 {
            return Err(Error::ConnectionLost("stream ended inside an oversized message".into()));
        }
        return Err(Error::PayloadTooLarge { size: len, limit });
    }

    let mut payload = vec![0u8; len];
    r.read_exact(&mut payload).map_err(|e| match e.kind() {
        ErrorKind::UnexpectedEof => Error::ConnectionLost("stream ended inside a message".into()),
        _ => Error::from(e),
    })?;
    Ok(Some(payload))
}
