//! ByteKiller, the LZ-style codec used for compressed bank payloads.
//!
//! A packed buffer is consumed from its end towards its start. The last three
//! big-endian words are, in reading order, the unpacked length, a checksum and
//! the first bit chunk; further chunks follow downwards. The output is also
//! produced back to front, which is why back-references point at *higher*
//! addresses than the write cursor.
//!
//! ```text
//! code   meaning              count            payload
//! 00     short literal run    3 bits + 1       8 bits per byte
//! 111    long literal run     8 bits + 9       8 bits per byte
//! 01     copy 2               -                8-bit offset
//! 100    copy 3               -                9-bit offset
//! 101    copy 4               -                10-bit offset
//! 110    copy n               8 bits + 1       12-bit offset
//! ```

mod cursor;
mod pack;
mod unpack;

pub use cursor::BackwardWriter;
pub use pack::pack;
pub use unpack::{unpack, ByteKillerError};

#[cfg(test)]
pub(crate) use pack::BitWriter;
